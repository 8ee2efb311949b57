//! Local transaction ledger.
//!
//! The ledger owns the deduplicated list of transactions touching the owned address and the
//! synchronization cursor (the last block it has fully incorporated). It never talks to the
//! network and never persists itself; callers go through the persistence protocol.

use crate::rpc::CandidateTransaction;
use crate::wallet::address::{Address, TransferDirection, classify};
use crate::wallet::types::{BlockRef, TransactionRecord, WalletError};

use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of merging one block into the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
	/// Records appended to the ledger.
	pub added: usize,
	/// Relevant transactions whose hash was already known.
	pub skipped_known: usize,
	/// Transactions that touch neither side of the owned address.
	pub irrelevant: usize,
	/// Relevant transactions dropped because a counterparty address does not decode.
	pub malformed: usize,
	/// Whether the cursor moved to the merged block.
	pub cursor_advanced: bool,
	/// Hash and direction of every appended record.
	pub discovered: Vec<(String, TransferDirection)>,
}

#[derive(Debug, Clone)]
pub struct TransactionLedger {
	owner: Address,
	cursor: BlockRef,
	records: Vec<TransactionRecord>,
	/// Lowercased hashes of `records`.
	known_hashes: HashSet<String>,
}

impl TransactionLedger {
	pub fn new(owner: Address, cursor: BlockRef) -> Self {
		Self {
			owner,
			cursor,
			records: Vec::new(),
			known_hashes: HashSet::new(),
		}
	}

	/// Rebuilds a ledger from persisted parts, keeping the records in their stored order.
	///
	/// Fails when a hash appears twice or a record does not touch `owner`.
	pub fn restore(
		owner: Address,
		cursor: BlockRef,
		records: Vec<TransactionRecord>,
	) -> Result<Self, WalletError> {
		let mut known_hashes = HashSet::with_capacity(records.len());
		for record in &records {
			if record.from != owner && record.to.as_ref() != Some(&owner) {
				return Err(WalletError::Persistence(format!(
					"stored transaction {} does not involve {}",
					record.hash, owner
				)));
			}
			if !known_hashes.insert(record.hash.to_lowercase()) {
				return Err(WalletError::Persistence(format!(
					"stored transaction {} appears more than once",
					record.hash
				)));
			}
		}

		Ok(Self {
			owner,
			cursor,
			records,
			known_hashes,
		})
	}

	pub fn owner(&self) -> &Address {
		&self.owner
	}

	pub fn cursor(&self) -> &BlockRef {
		&self.cursor
	}

	/// Records in insertion order.
	pub fn records(&self) -> &[TransactionRecord] {
		&self.records
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn contains_hash(&self, hash: &str) -> bool {
		self.known_hashes.contains(&hash.to_lowercase())
	}

	/// Merges the transactions of one block.
	///
	/// Re-merging a block is a no-op apart from the counters. The cursor only moves forward.
	pub fn merge_block(
		&mut self,
		block: &BlockRef,
		candidates: &[CandidateTransaction],
	) -> MergeResult {
		let mut result = MergeResult::default();

		for tx in candidates {
			debug!("Verifying transaction {}", tx.hash);

			let direction = classify(&self.owner, &tx.from, tx.to.as_deref());
			if !direction.is_relevant() {
				result.irrelevant += 1;
				continue;
			}

			if self.contains_hash(&tx.hash) {
				info!(
					"Not saving transaction {} locally because it is already known",
					tx.hash
				);
				result.skipped_known += 1;
				continue;
			}

			let (Ok(from), Ok(to)) = (
				Address::parse(&tx.from),
				tx.to.as_deref().map(Address::parse).transpose(),
			) else {
				warn!(
					"Dropping {:?} transaction {}: malformed address (from {}, to {:?})",
					direction, tx.hash, tx.from, tx.to
				);
				result.malformed += 1;
				continue;
			};

			match direction {
				TransferDirection::Incoming => {
					info!("Found incoming transaction with hash {}", tx.hash)
				}
				_ => info!("Found outgoing transaction with hash {}", tx.hash),
			}

			self.known_hashes.insert(tx.hash.to_lowercase());
			self.records.push(TransactionRecord {
				block: block.clone(),
				hash: tx.hash.clone(),
				from,
				to,
				amount: tx.value,
				fee: tx.fee(),
			});
			result.added += 1;
			result.discovered.push((tx.hash.clone(), direction));
		}

		if block.number >= self.cursor.number {
			self.cursor = block.clone();
			result.cursor_advanced = true;
		} else {
			debug!(
				"Keeping cursor at block {}; merged block {} is older",
				self.cursor.number, block.number
			);
		}

		result
	}

	/// Records sorted by block number, newest first.
	pub fn query(&self) -> LedgerQuery<'_> {
		let mut order: Vec<usize> = (0..self.records.len()).collect();
		// Stable sort keeps insertion order among records of the same block.
		order.sort_by(|a, b| self.records[*b].block.number.cmp(&self.records[*a].block.number));
		LedgerQuery {
			records: &self.records,
			order,
		}
	}
}

/// A sorted, read-only view of the ledger that can be iterated any number of times.
#[derive(Debug, Clone)]
pub struct LedgerQuery<'a> {
	records: &'a [TransactionRecord],
	order: Vec<usize>,
}

impl<'a> LedgerQuery<'a> {
	pub fn iter(&self) -> impl Iterator<Item = &'a TransactionRecord> + '_ {
		let records = self.records;
		self.order.iter().map(move |i| &records[*i])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use primitive_types::U256;

	const OWNER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
	const OTHER: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";
	const THIRD: &str = "0x00000000000000000000000000000000000000aa";

	fn block(number: u64) -> BlockRef {
		BlockRef::new(
			U256::from(number),
			Utc.timestamp_opt(1_600_000_000 + number as i64, 0).unwrap(),
		)
	}

	fn tx(hash: &str, from: &str, to: &str, value: u64) -> CandidateTransaction {
		CandidateTransaction {
			hash: hash.to_string(),
			from: from.to_string(),
			to: Some(to.to_string()),
			value: U256::from(value),
			gas: U256::from(21u64),
			gas_price: U256::from(1u64),
		}
	}

	fn ledger_at(number: u64) -> TransactionLedger {
		TransactionLedger::new(Address::parse(OWNER).unwrap(), block(number))
	}

	#[test]
	fn test_incoming_transfer_keeps_amount_without_fee() {
		let mut ledger = ledger_at(100);
		let result = ledger.merge_block(&block(100), &[tx("0xabc", OTHER, OWNER, 1000)]);

		assert_eq!(result.added, 1);
		assert_eq!(result.discovered, vec![("0xabc".to_string(), TransferDirection::Incoming)]);
		let record = &ledger.records()[0];
		assert!(record.is_incoming_for(ledger.owner()));
		assert_eq!(record.amount, U256::from(1000u64));
		assert_eq!(record.fee, U256::from(21u64));
		assert_eq!(record.block, block(100));
	}

	#[test]
	fn test_merging_same_block_twice_is_idempotent() {
		let txs = [
			tx("0xaaa", OTHER, OWNER, 1),
			tx("0xbbb", OWNER, OTHER, 2),
			tx("0xccc", OTHER, THIRD, 3),
		];
		let mut once = ledger_at(10);
		once.merge_block(&block(11), &txs);

		let mut twice = ledger_at(10);
		twice.merge_block(&block(11), &txs);
		let second = twice.merge_block(&block(11), &txs);

		assert_eq!(second.added, 0);
		assert_eq!(second.skipped_known, 2);
		assert_eq!(second.irrelevant, 1);
		assert_eq!(twice.len(), 2);
		assert_eq!(once.records(), twice.records());
		assert_eq!(once.cursor(), twice.cursor());
	}

	#[test]
	fn test_hash_dedup_ignores_case() {
		let mut ledger = ledger_at(1);
		ledger.merge_block(&block(1), &[tx("0xABCDEF", OTHER, OWNER, 5)]);
		let result = ledger.merge_block(&block(2), &[tx("0xabcdef", OTHER, OWNER, 5)]);

		assert_eq!(result.skipped_known, 1);
		assert_eq!(ledger.len(), 1);
		assert!(ledger.contains_hash("0xAbCdEf"));
	}

	#[test]
	fn test_only_relevant_transactions_are_kept() {
		let mut ledger = ledger_at(1);
		ledger.merge_block(
			&block(1),
			&[
				tx("0x01", OTHER, THIRD, 1),
				tx("0x02", &OWNER.to_lowercase(), THIRD, 1),
				tx("0x03", THIRD, &OWNER.to_uppercase().replace("0X", "0x"), 1),
				tx("0x04", OWNER, OWNER, 1),
			],
		);

		let owner = Address::parse(OWNER).unwrap();
		assert_eq!(ledger.len(), 3);
		assert!(
			ledger
				.records()
				.iter()
				.all(|r| r.from == owner || r.to.as_ref() == Some(&owner))
		);
	}

	#[test]
	fn test_contract_creation_from_owner_is_recorded() {
		let mut ledger = ledger_at(1);
		let mut creation = tx("0x05", OWNER, OTHER, 0);
		creation.to = None;
		let result = ledger.merge_block(&block(1), &[creation]);

		assert_eq!(result.added, 1);
		assert_eq!(ledger.records()[0].to, None);
	}

	#[test]
	fn test_cursor_never_moves_backwards() {
		let mut ledger = ledger_at(50);

		let result = ledger.merge_block(&block(40), &[tx("0x10", OTHER, OWNER, 1)]);
		assert!(!result.cursor_advanced);
		assert_eq!(ledger.cursor().number, U256::from(50u64));
		// Transactions from an older block are still recorded.
		assert_eq!(ledger.len(), 1);

		assert!(ledger.merge_block(&block(50), &[]).cursor_advanced);
		assert!(ledger.merge_block(&block(51), &[]).cursor_advanced);
		ledger.merge_block(&block(45), &[]);
		assert_eq!(ledger.cursor(), &block(51));
	}

	#[test]
	fn test_query_sorts_newest_first_and_keeps_insertion_order_for_ties() {
		let mut ledger = ledger_at(1);
		ledger.merge_block(&block(1), &[tx("0xa1", OTHER, OWNER, 1)]);
		ledger.merge_block(&block(3), &[tx("0xc1", OTHER, OWNER, 1), tx("0xc2", OWNER, OTHER, 1)]);
		ledger.merge_block(&block(2), &[tx("0xb1", OTHER, OWNER, 1)]);

		let query = ledger.query();
		let hashes: Vec<&str> = query.iter().map(|r| r.hash.as_str()).collect();
		assert_eq!(hashes, vec!["0xc1", "0xc2", "0xb1", "0xa1"]);

		// Restartable.
		let again: Vec<&str> = query.iter().map(|r| r.hash.as_str()).collect();
		assert_eq!(hashes, again);
		assert_eq!(ledger.records()[0].hash, "0xa1");
	}

	#[test]
	fn test_relevant_transaction_with_malformed_counterparty_is_counted() {
		let mut ledger = ledger_at(1);
		let result = ledger.merge_block(&block(2), &[tx("0x06", OWNER, "0xdeadbeef", 1)]);

		assert_eq!(result.added, 0);
		assert_eq!(result.irrelevant, 0);
		assert_eq!(result.malformed, 1);
		assert!(ledger.is_empty());
		assert!(!ledger.contains_hash("0x06"));
		assert!(result.cursor_advanced);
	}

	#[test]
	fn test_restore_rejects_inconsistent_records() {
		let mut source = ledger_at(1);
		source.merge_block(&block(2), &[tx("0x07", OTHER, OWNER, 1)]);
		let owner = Address::parse(OWNER).unwrap();

		let records = source.records().to_vec();
		let restored = TransactionLedger::restore(owner.clone(), block(2), records);
		assert!(restored.unwrap().contains_hash("0x07"));

		let mut duplicated = source.records().to_vec();
		duplicated.push(duplicated[0].clone());
		duplicated[1].hash = "0X07".to_string();
		assert!(matches!(
			TransactionLedger::restore(owner.clone(), block(2), duplicated),
			Err(WalletError::Persistence(_))
		));

		let stranger = Address::parse(THIRD).unwrap();
		assert!(matches!(
			TransactionLedger::restore(stranger, block(2), source.records().to_vec()),
			Err(WalletError::Persistence(_))
		));
	}
}
