//! Wallet Synchronization Module
//!
//! This module provides the services that keep the local ledger in step with the remote chain:
//!
//! - `engine`: walks blocks from the cursor to the remote tip and merges each one.
//! - `events`: event types and handler traits used to report progress and discoveries.
//! - `progress_tracker`: per-run statistics and the final report.
//! - `repositories`: the byte-level store the wallet document lives in.
//! - `state_persistence`: the wallet state bound to its store, with the `mutate` boundary.

/// Block-by-block synchronization engine
pub mod engine;
/// Event system for decoupled reporting during sync
pub mod events;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// Storage backends for the wallet document
pub mod repositories;
/// Persistence boundary for wallet state
pub mod state_persistence;

pub use engine::{SyncConfig, WalletSyncEngine};
pub use progress_tracker::SyncReport;
pub use repositories::FileWalletStore;
pub use state_persistence::PersistentWallet;
