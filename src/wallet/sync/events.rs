//! Event system for wallet synchronization.
//!
//! This module defines the events emitted while the engine walks the chain, the handler trait
//! that consumes them, and the dispatcher that fans each event out to every registered handler.
//! Handlers never influence the outcome of a run: their failures are logged and skipped.

use crate::wallet::address::TransferDirection;
use crate::wallet::ledger::MergeResult;
use crate::wallet::types::{BlockRef, WalletError};

use primitive_types::U256;
use tracing::{debug, info, warn};

/// Events that occur during wallet synchronization
#[derive(Debug, Clone)]
pub enum SyncEvent {
	/// A block was merged into the ledger and persisted
	BlockMerged { block: BlockRef, result: MergeResult },
	/// A transaction touching the owned address was added to the ledger
	TransactionFound {
		block: U256,
		hash: String,
		direction: TransferDirection,
	},
	/// Share of the run completed after merging `current`
	Progress { current: U256, tip: U256, fraction: f64 },
	/// A block stayed unavailable; the run stopped before it
	Stalled { block: U256 },
	/// The ledger caught up with the tip
	Completed { cursor: U256 },
}

/// Trait for handling sync events.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), WalletError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
#[derive(Default)]
pub struct EventDispatcher {
	handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.handlers.push(handler);
	}

	/// Dispatch an event to all registered handlers.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub async fn dispatch(&mut self, event: &SyncEvent) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				warn!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}
}

/// Reports synchronization through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingHandler {
	last_logged_percent: Option<u64>,
}

#[async_trait::async_trait]
impl SyncEventHandler for LoggingHandler {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), WalletError> {
		match event {
			SyncEvent::BlockMerged { block, result } => debug!(
				"Merged block {}: {} added, {} already known, {} irrelevant, {} malformed",
				block.number,
				result.added,
				result.skipped_known,
				result.irrelevant,
				result.malformed
			),
			SyncEvent::TransactionFound {
				block,
				hash,
				direction,
			} => debug!("Recorded {:?} transaction {} from block {}", direction, hash, block),
			SyncEvent::Progress {
				current,
				tip,
				fraction,
			} => {
				let percent = (fraction * 100.0).floor() as u64;
				if self.last_logged_percent != Some(percent) {
					info!("Synchronizing: {}% (block {} of {})", percent, current, tip);
					self.last_logged_percent = Some(percent);
				}
			}
			SyncEvent::Stalled { block } => {
				warn!("Block {} is not available yet, stopping synchronization", block)
			}
			SyncEvent::Completed { cursor } => info!("Synchronized up to block {}", cursor),
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"logging"
	}
}
