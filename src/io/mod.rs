// Moving entries in and out of the ledger

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;
