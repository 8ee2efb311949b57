//! Wallet synchronization engine.
//!
//! This module defines the `WalletSyncEngine`, which brings the local ledger up to the remote tip.
//! A run re-scans the cursor block (it may have been merged before its transactions were all
//! known) and then walks forward one block at a time up to the tip observed at the start of the
//! run. Each block is merged and persisted through `PersistentWallet::mutate` before the next one
//! is fetched, so an aborted run never loses blocks it already merged.
//!
//! A block the node reports as missing is fetched again with exponential backoff for a bounded
//! window. If it is still missing the run stops there without moving the cursor past it, and the
//! next run resumes from the same place. Transport errors are not retried.

use crate::rpc::{BlockData, RemoteLedgerClient};
use crate::wallet::sync::events::{EventDispatcher, LoggingHandler, SyncEvent, SyncEventHandler};
use crate::wallet::sync::progress_tracker::{SyncOutcome, SyncProgressTracker, SyncReport};
use crate::wallet::sync::state_persistence::PersistentWallet;
use crate::wallet::types::{BlockRef, WalletError};

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry;
use primitive_types::U256;
use std::time::Duration;
use tracing::{debug, error, info};

/// Configuration for synchronization runs
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// How long a missing block is re-fetched before the run stops. Zero disables retries.
	pub not_found_retry_window: Duration,
	/// Delay before the first re-fetch of a missing block
	pub initial_retry_interval: Duration,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			not_found_retry_window: Duration::from_secs(5),
			initial_retry_interval: Duration::from_millis(250),
		}
	}
}

pub struct WalletSyncEngine<'a> {
	client: &'a dyn RemoteLedgerClient,
	config: SyncConfig,
	dispatcher: EventDispatcher,
}

impl<'a> WalletSyncEngine<'a> {
	/// Creates an engine that reports through a logging handler.
	pub fn new(client: &'a dyn RemoteLedgerClient, config: SyncConfig) -> Self {
		let mut dispatcher = EventDispatcher::new();
		dispatcher.register_handler(Box::new(LoggingHandler::default()));
		Self {
			client,
			config,
			dispatcher,
		}
	}

	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.dispatcher.register_handler(handler);
	}

	/// Merges every block from the cursor up to the current remote tip.
	pub async fn synchronize(
		&mut self,
		wallet: &mut PersistentWallet,
	) -> Result<SyncReport, WalletError> {
		let start = wallet.state().cursor().number;
		let tip = self.client.latest_block_number().await?;
		let mut tracker = SyncProgressTracker::new(start, tip);

		if tip < start {
			info!("Remote tip {} is behind the local cursor {}, nothing to do", tip, start);
			self.dispatcher
				.dispatch(&SyncEvent::Completed { cursor: start })
				.await;
			return Ok(tracker.finish(SyncOutcome::Completed));
		}

		info!("Starting synchronization from block {} to {}", start, tip);

		let mut number = start;
		loop {
			let block = match self.fetch_block(number).await {
				Ok(Some(block)) => block,
				Ok(None) => {
					self.dispatcher
						.dispatch(&SyncEvent::Stalled { block: number })
						.await;
					let report = tracker.finish(SyncOutcome::Stalled { block: number });
					info!("{}", report.stats.summary());
					return Ok(report);
				}
				Err(e) => {
					error!("Synchronization aborted at block {}: {}", number, e);
					return Err(e);
				}
			};

			let block_ref = BlockRef::new(number, block.timestamp);
			let result = wallet
				.mutate(|state| {
					Ok(state
						.ledger_mut()
						.merge_block(&block_ref, &block.transactions))
				})
				.await?;

			let fraction = tracker.record_block(number, &result);
			for (hash, direction) in &result.discovered {
				self.dispatcher
					.dispatch(&SyncEvent::TransactionFound {
						block: number,
						hash: hash.clone(),
						direction: *direction,
					})
					.await;
			}
			self.dispatcher
				.dispatch(&SyncEvent::BlockMerged {
					block: block_ref,
					result,
				})
				.await;
			self.dispatcher
				.dispatch(&SyncEvent::Progress {
					current: number,
					tip,
					fraction,
				})
				.await;

			if number >= tip {
				break;
			}
			number += U256::one();
		}

		self.dispatcher
			.dispatch(&SyncEvent::Completed {
				cursor: wallet.state().cursor().number,
			})
			.await;
		let report = tracker.finish(SyncOutcome::Completed);
		info!("{}", report.stats.summary());
		Ok(report)
	}

	/// Fetches a block, re-fetching it while the node reports it missing.
	///
	/// Returns `Ok(None)` once the retry window is exhausted.
	async fn fetch_block(&self, number: U256) -> Result<Option<BlockData>, WalletError> {
		if self.config.not_found_retry_window.is_zero() {
			return Ok(self.client.block_with_transactions(number).await?);
		}

		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.config.initial_retry_interval)
			.with_max_elapsed_time(Some(self.config.not_found_retry_window))
			.build();
		let client = self.client;

		let fetched = retry(policy, move || async move {
			match client.block_with_transactions(number).await {
				Ok(Some(block)) => Ok(block),
				Ok(None) => {
					debug!("Block {} not found, retrying", number);
					Err(backoff::Error::transient(WalletError::NotFound(number)))
				}
				Err(e) => Err(backoff::Error::permanent(WalletError::Transport(e))),
			}
		})
		.await;

		match fetched {
			Ok(block) => Ok(Some(block)),
			Err(WalletError::NotFound(_)) => Ok(None),
			Err(e) => Err(e),
		}
	}
}
