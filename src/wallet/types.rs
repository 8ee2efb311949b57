use crate::rpc::RpcError;
use crate::transaction::builder::TransactionError;
use crate::transaction::signer::SignerError;
use crate::utils::{UnitError, wei_to_eth};
use crate::wallet::address::{Address, AddressError};

use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// A ledger checkpoint: the block number and the time the block was mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
	pub number: U256,
	pub timestamp: DateTime<Utc>,
}

impl BlockRef {
	pub fn new(number: U256, timestamp: DateTime<Utc>) -> Self {
		Self { number, timestamp }
	}
}

/// A transaction touching the owned address, as stored in the local ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
	pub block: BlockRef,
	pub hash: String,
	pub from: Address,
	/// Absent for contract creation.
	pub to: Option<Address>,
	/// Value transferred to the recipient in wei, not including the fee.
	pub amount: U256,
	/// Gas multiplied by gas price, in wei.
	pub fee: U256,
}

impl TransactionRecord {
	pub fn amount_in_eth(&self) -> String {
		wei_to_eth(self.amount)
	}

	pub fn fee_in_eth(&self) -> String {
		wei_to_eth(self.fee)
	}

	pub fn is_incoming_for(&self, owner: &Address) -> bool {
		self.to.as_ref().is_some_and(|to| to == owner)
	}
}

/// Errors surfaced by synchronization, submission and persistence.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("Invalid recipient: {0}")]
	InvalidRecipient(#[from] AddressError),

	#[error("Transport error: {0}")]
	Transport(#[from] RpcError),

	#[error("Block {0} not found on the remote node")]
	NotFound(U256),

	#[error(
		"Insufficient funds: transaction may require {required} wei, known balance is {available} wei"
	)]
	InsufficientFunds { required: U256, available: U256 },

	#[error("Signing integrity error: {0}")]
	SigningIntegrity(String),

	#[error("Persistence error: {0}")]
	Persistence(String),
}

impl From<UnitError> for WalletError {
	fn from(e: UnitError) -> Self {
		WalletError::InvalidInput(e.to_string())
	}
}

impl From<TransactionError> for WalletError {
	fn from(e: TransactionError) -> Self {
		WalletError::InvalidInput(e.to_string())
	}
}

impl From<SignerError> for WalletError {
	fn from(e: SignerError) -> Self {
		WalletError::SigningIntegrity(e.to_string())
	}
}

impl From<std::io::Error> for WalletError {
	fn from(e: std::io::Error) -> Self {
		WalletError::Persistence(e.to_string())
	}
}

impl From<serde_json::Error> for WalletError {
	fn from(e: serde_json::Error) -> Self {
		WalletError::Persistence(e.to_string())
	}
}
