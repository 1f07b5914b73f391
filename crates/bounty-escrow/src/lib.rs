pub mod entry;
pub mod ledger;

pub use entry::*;
pub use ledger::*;
