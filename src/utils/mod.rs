//!
//! Utility module for the wallet.
//!
//! Re-exports the denomination helpers used by the ledger, the submission flow and the CLI.
/// Conversions between wei, gwei and ether
pub mod units;

pub use units::{UnitError, eth_to_wei, gwei_to_wei, wei_to_eth};
