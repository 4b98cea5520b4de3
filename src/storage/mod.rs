//! Persistent state.
//!
//! The only persisted state is the upload ledger, a flat JSON file loaded
//! wholesale at start-up.

mod ledger;

pub use ledger::{Ledger, LedgerEntry};
