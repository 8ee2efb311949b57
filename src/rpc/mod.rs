//! Remote ledger integration.
//!
//! This module provides the collaborator contract the wallet uses to talk to an Ethereum-like
//! node, the JSON-RPC client implementing it, and the wire types both share.

/// JSON-RPC client for the remote node
mod client;
/// Type definitions for node responses
mod types;

#[cfg(test)]
pub mod mock;

pub use client::{JsonRpcLedgerClient, RemoteLedgerClient};
pub use types::*;
