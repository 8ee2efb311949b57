//! In-memory `RemoteLedgerClient` for tests.

use super::client::RemoteLedgerClient;
use super::types::{BlockData, CandidateTransaction, RpcError};
use crate::wallet::address::Address;

use chrono::{TimeZone, Utc};
use primitive_types::U256;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct MockState {
	tip: U256,
	blocks: HashMap<U256, BlockData>,
	/// Remaining fetches that answer `null`, per block.
	missing: HashMap<U256, usize>,
	failing: HashSet<U256>,
	tip_fails: bool,
	nonce: U256,
	balance: U256,
	submit_fails: bool,
	submitted: Vec<Vec<u8>>,
	block_fetches: Vec<U256>,
	nonce_queries: usize,
	balance_queries: Vec<U256>,
}

#[derive(Default)]
pub struct MockLedgerClient {
	state: Mutex<MockState>,
}

pub fn mock_timestamp(number: u64) -> chrono::DateTime<Utc> {
	Utc.timestamp_opt(1_600_000_000 + number as i64 * 12, 0)
		.unwrap()
}

impl MockLedgerClient {
	pub fn new(tip: u64) -> Self {
		let client = Self::default();
		client.state.lock().unwrap().tip = U256::from(tip);
		client
	}

	pub fn set_tip(&self, tip: u64) {
		self.state.lock().unwrap().tip = U256::from(tip);
	}

	pub fn add_block(&self, number: u64, transactions: Vec<CandidateTransaction>) {
		self.state.lock().unwrap().blocks.insert(
			U256::from(number),
			BlockData {
				number: U256::from(number),
				timestamp: mock_timestamp(number),
				transactions,
			},
		);
	}

	/// The node answers `null` for this block.
	pub fn set_missing(&self, number: u64) {
		self.set_missing_for(number, usize::MAX);
	}

	/// The node answers `null` for the next `fetches` requests of this block.
	pub fn set_missing_for(&self, number: u64, fetches: usize) {
		self.state.lock().unwrap().missing.insert(U256::from(number), fetches);
	}

	/// Fetching this block fails at the transport level.
	pub fn set_failing(&self, number: u64) {
		self.state.lock().unwrap().failing.insert(U256::from(number));
	}

	pub fn set_tip_fails(&self) {
		self.state.lock().unwrap().tip_fails = true;
	}

	pub fn set_nonce(&self, nonce: u64) {
		self.state.lock().unwrap().nonce = U256::from(nonce);
	}

	pub fn set_balance(&self, balance: u64) {
		self.state.lock().unwrap().balance = U256::from(balance);
	}

	pub fn set_submit_fails(&self) {
		self.state.lock().unwrap().submit_fails = true;
	}

	pub fn submitted(&self) -> Vec<Vec<u8>> {
		self.state.lock().unwrap().submitted.clone()
	}

	pub fn block_fetches(&self) -> Vec<U256> {
		self.state.lock().unwrap().block_fetches.clone()
	}

	pub fn nonce_queries(&self) -> usize {
		self.state.lock().unwrap().nonce_queries
	}

	pub fn balance_queries(&self) -> Vec<U256> {
		self.state.lock().unwrap().balance_queries.clone()
	}

	fn unavailable() -> RpcError {
		RpcError::JsonRpcError {
			code: -32000,
			message: "node unavailable".to_string(),
		}
	}
}

#[async_trait::async_trait]
impl RemoteLedgerClient for MockLedgerClient {
	async fn latest_block_number(&self) -> Result<U256, RpcError> {
		let state = self.state.lock().unwrap();
		if state.tip_fails {
			return Err(Self::unavailable());
		}
		Ok(state.tip)
	}

	async fn block_with_transactions(&self, number: U256) -> Result<Option<BlockData>, RpcError> {
		let mut state = self.state.lock().unwrap();
		state.block_fetches.push(number);
		if state.failing.contains(&number) {
			return Err(Self::unavailable());
		}
		if let Some(remaining) = state.missing.get_mut(&number) {
			if *remaining > 0 {
				*remaining -= 1;
				return Ok(None);
			}
		}
		// Blocks that were never added exist but are empty.
		Ok(Some(state.blocks.get(&number).cloned().unwrap_or_else(|| {
			BlockData {
				number,
				timestamp: mock_timestamp(number.low_u64()),
				transactions: Vec::new(),
			}
		})))
	}

	async fn transaction_count(
		&self,
		_address: &Address,
		_pending: bool,
	) -> Result<U256, RpcError> {
		let mut state = self.state.lock().unwrap();
		state.nonce_queries += 1;
		Ok(state.nonce)
	}

	async fn balance(&self, _address: &Address, at_block: U256) -> Result<U256, RpcError> {
		let mut state = self.state.lock().unwrap();
		state.balance_queries.push(at_block);
		Ok(state.balance)
	}

	async fn submit_raw_transaction(&self, raw: &[u8]) -> Result<String, RpcError> {
		let mut state = self.state.lock().unwrap();
		if state.submit_fails {
			return Err(Self::unavailable());
		}
		state.submitted.push(raw.to_vec());
		Ok(format!("0x{}", hex::encode(crate::transaction::signer::keccak256(raw))))
	}
}

/// A transfer between two addresses inside a mock block.
pub fn transfer(hash: &str, from: &str, to: &str, value: u64) -> CandidateTransaction {
	CandidateTransaction {
		hash: hash.to_string(),
		from: from.to_string(),
		to: Some(to.to_string()),
		value: U256::from(value),
		gas: U256::from(21u64),
		gas_price: U256::from(1u64),
	}
}
