//! Types for JSON-RPC node integration

use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// A transaction as listed in a block fetched from the node.
///
/// Addresses stay as the node reported them; the ledger decides whether they matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTransaction {
	/// The transaction hash.
	pub hash: String,
	/// Sender address.
	pub from: String,
	/// Recipient address, `null` for contract creation.
	pub to: Option<String>,
	/// Transferred value in wei.
	pub value: U256,
	/// Gas allowance of the transaction.
	pub gas: U256,
	/// Price per gas unit in wei.
	#[serde(default)]
	pub gas_price: U256,
}

impl CandidateTransaction {
	/// Fee charged to the sender, in wei (gas allowance multiplied by the gas price).
	pub fn fee(&self) -> U256 {
		self.gas.saturating_mul(self.gas_price)
	}
}

/// A block with its full transaction list, ready to merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
	pub number: U256,
	pub timestamp: DateTime<Utc>,
	pub transactions: Vec<CandidateTransaction>,
}

/// Raw `eth_getBlockByNumber` result with full transaction objects.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
	pub number: U256,
	pub timestamp: U256,
	#[serde(default)]
	pub transactions: Vec<CandidateTransaction>,
}

impl TryFrom<RpcBlock> for BlockData {
	type Error = RpcError;

	fn try_from(block: RpcBlock) -> Result<Self, Self::Error> {
		let timestamp = Some(block.timestamp)
			.filter(|ts| ts.bits() <= 63)
			.and_then(|ts| DateTime::from_timestamp(ts.low_u64() as i64, 0))
			.ok_or_else(|| {
				RpcError::InvalidResponse(format!(
					"block timestamp {} out of range",
					block.timestamp
				))
			})?;

		Ok(Self {
			number: block.number,
			timestamp,
			transactions: block.transactions,
		})
	}
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
	#[serde(default)]
	pub result: Option<serde_json::Value>,
	#[serde(default)]
	pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// Transport-level failures talking to the node.
///
/// A missing block is not an error: it is reported as `Ok(None)` by the client.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("JSON-RPC error {code}: {message}")]
	JsonRpcError { code: i64, message: String },

	#[error("No data returned")]
	NoData,

	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}
