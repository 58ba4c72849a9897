pub mod ai;
pub mod ledger;

pub use ai::{AiProvider, AiSettings};
pub use ledger::{EntryKind, LedgerEntry, NewLedgerEntry, OwnerId};
