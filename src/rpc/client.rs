//!
//! JSON-RPC client for an Ethereum-like node.
//!
//! This module defines the `RemoteLedgerClient` contract the synchronization engine and the
//! submission flow depend on, and an HTTP implementation of it. All methods are async and
//! designed for use with Tokio. No call is retried here; retry policy belongs to the caller.

use super::types::*;
use crate::wallet::address::Address;

use primitive_types::U256;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Operations the wallet needs from the remote ledger.
///
/// Every method can fail with a transport error. A block that the node does not know is a
/// structured `Ok(None)`, never an error.
#[async_trait::async_trait]
pub trait RemoteLedgerClient: Send + Sync {
	/// Number of the latest block known to the node.
	async fn latest_block_number(&self) -> Result<U256, RpcError>;

	/// Fetches a block and all of its transactions.
	async fn block_with_transactions(&self, number: U256) -> Result<Option<BlockData>, RpcError>;

	/// Number of transactions sent from `address`, optionally including pending ones.
	async fn transaction_count(&self, address: &Address, pending: bool) -> Result<U256, RpcError>;

	/// Balance of `address` in wei as of block `at_block`.
	async fn balance(&self, address: &Address, at_block: U256) -> Result<U256, RpcError>;

	/// Broadcasts a signed transaction and returns its hash.
	async fn submit_raw_transaction(&self, raw: &[u8]) -> Result<String, RpcError>;
}

/// HTTP JSON-RPC 2.0 client
pub struct JsonRpcLedgerClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The node endpoint.
	rpc_url: String,
	/// Request id counter.
	next_id: AtomicU64,
}

impl JsonRpcLedgerClient {
	/// Create a new client for the node at `rpc_url`.
	pub fn new(rpc_url: String) -> Result<Self, RpcError> {
		let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			next_id: AtomicU64::new(1),
		})
	}

	/// Chain id used for replay-protected signatures (`eth_chainId`).
	pub async fn chain_id(&self) -> Result<u64, RpcError> {
		let id: U256 = self.require("eth_chainId", json!([])).await?;
		if id.bits() > 64 {
			return Err(RpcError::InvalidResponse(format!("chain id {} out of range", id)));
		}
		Ok(id.low_u64())
	}

	/// Execute a JSON-RPC call. A `null` result is returned as `None`.
	pub async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<Option<T>, RpcError> {
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": self.next_id.fetch_add(1, Ordering::Relaxed),
			"method": method,
			"params": params,
		});

		debug!("Calling {} with {}", method, params);

		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?
			.error_for_status()?;

		let response: JsonRpcResponse = response.json().await?;

		if let Some(error) = response.error {
			return Err(RpcError::JsonRpcError {
				code: error.code,
				message: error.message,
			});
		}

		match response.result {
			None | Some(serde_json::Value::Null) => Ok(None),
			Some(value) => Ok(Some(serde_json::from_value(value)?)),
		}
	}

	async fn require<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<T, RpcError> {
		self.call(method, params).await?.ok_or(RpcError::NoData)
	}
}

#[async_trait::async_trait]
impl RemoteLedgerClient for JsonRpcLedgerClient {
	async fn latest_block_number(&self) -> Result<U256, RpcError> {
		self.require("eth_blockNumber", json!([])).await
	}

	async fn block_with_transactions(&self, number: U256) -> Result<Option<BlockData>, RpcError> {
		let block: Option<RpcBlock> = self
			.call("eth_getBlockByNumber", json!([number, true]))
			.await?;
		block.map(BlockData::try_from).transpose()
	}

	async fn transaction_count(&self, address: &Address, pending: bool) -> Result<U256, RpcError> {
		let tag = if pending { "pending" } else { "latest" };
		self.require("eth_getTransactionCount", json!([address, tag]))
			.await
	}

	async fn balance(&self, address: &Address, at_block: U256) -> Result<U256, RpcError> {
		self.require("eth_getBalance", json!([address, at_block]))
			.await
	}

	async fn submit_raw_transaction(&self, raw: &[u8]) -> Result<String, RpcError> {
		let payload = format!("0x{}", hex::encode(raw));
		self.require("eth_sendRawTransaction", json!([payload]))
			.await
	}
}
