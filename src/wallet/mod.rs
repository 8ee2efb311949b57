pub mod address;
pub mod key;
pub mod ledger;
pub mod state;
pub mod sync;
pub mod types;
