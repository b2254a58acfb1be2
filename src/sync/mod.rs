//! One-way tree reconciliation.
//!
//! A [`Synchronizer`] owns a master/slave root pair and repeatedly makes
//! the slave match the master: stale slave entries are removed, entries
//! present in both trees get their metadata and content reconciled, and
//! entries only the master has are copied over, in that fixed order each
//! pass. All state is derived live from the filesystem; nothing survives
//! between passes except the two roots and the running flag.

mod diff;
mod error;
mod fsops;
mod meta;
mod safety;
mod synchronizer;
mod walk;

pub use error::SyncError;
pub use synchronizer::{StopHandle, Synchronizer};
