//! Progress tracking for wallet synchronization.
//!
//! This module provides the `SyncProgressTracker`, which accumulates per-run statistics while the
//! engine merges blocks, computes the completed share of the run and produces the final report.

use crate::wallet::ledger::MergeResult;

use primitive_types::U256;

/// Share of the range `start..=tip` completed once `current` has been merged.
///
/// A run whose tip equals its start is complete as soon as it begins.
pub fn progress_fraction(start: U256, current: U256, tip: U256) -> f64 {
	if tip <= start {
		return 1.0;
	}
	let span = tip - start;
	let done = current.saturating_sub(start).min(span);

	// Scale both into u64 range; block ranges rarely need it.
	let divisor = span / U256::from(u64::MAX) + U256::one();
	(done / divisor).low_u64() as f64 / (span / divisor).low_u64() as f64
}

/// Service for tracking synchronization progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
	/// Cursor block at the start of the run
	start_block: U256,
	/// Remote tip observed at the start of the run
	tip: U256,
	/// Highest block merged so far
	last_merged: Option<U256>,
	blocks_merged: usize,
	transactions_added: usize,
	transactions_skipped: usize,
	transactions_malformed: usize,
}

impl SyncProgressTracker {
	pub fn new(start_block: U256, tip: U256) -> Self {
		Self {
			start_block,
			tip,
			last_merged: None,
			blocks_merged: 0,
			transactions_added: 0,
			transactions_skipped: 0,
			transactions_malformed: 0,
		}
	}

	/// Record a merged block and return the completed share of the run
	pub fn record_block(&mut self, number: U256, result: &MergeResult) -> f64 {
		self.last_merged = Some(self.last_merged.map_or(number, |last| last.max(number)));
		self.blocks_merged += 1;
		self.transactions_added += result.added;
		self.transactions_skipped += result.skipped_known;
		self.transactions_malformed += result.malformed;
		progress_fraction(self.start_block, number, self.tip)
	}

	pub fn get_stats(&self) -> SyncStats {
		SyncStats {
			start_block: self.start_block,
			tip: self.tip,
			last_merged: self.last_merged,
			blocks_merged: self.blocks_merged,
			transactions_added: self.transactions_added,
			transactions_skipped: self.transactions_skipped,
			transactions_malformed: self.transactions_malformed,
		}
	}

	pub fn finish(&self, outcome: SyncOutcome) -> SyncReport {
		SyncReport {
			outcome,
			stats: self.get_stats(),
		}
	}
}

/// Statistics about one synchronization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
	pub start_block: U256,
	pub tip: U256,
	pub last_merged: Option<U256>,
	pub blocks_merged: usize,
	pub transactions_added: usize,
	pub transactions_skipped: usize,
	/// Relevant transactions that could not be recorded
	pub transactions_malformed: usize,
}

impl SyncStats {
	/// Get a human-readable summary of the sync statistics
	pub fn summary(&self) -> String {
		let mut summary = format!(
			"Sync from {} to {}: {} blocks merged, {} new transactions, {} already known",
			self.start_block,
			self.last_merged.unwrap_or(self.start_block),
			self.blocks_merged,
			self.transactions_added,
			self.transactions_skipped
		);
		if self.transactions_malformed > 0 {
			summary.push_str(&format!(
				", {} dropped with malformed addresses",
				self.transactions_malformed
			));
		}
		summary
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	/// Every block up to the tip observed at the start was merged
	Completed,
	/// `block` could not be fetched; the cursor stops before it
	Stalled { block: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
	pub outcome: SyncOutcome,
	pub stats: SyncStats,
}

impl SyncReport {
	pub fn is_complete(&self) -> bool {
		self.outcome == SyncOutcome::Completed
	}
}
