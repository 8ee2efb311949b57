//! Transaction builder
//!
//! This module provides a builder pattern for constructing unsigned value transfers.

use crate::wallet::address::Address;

use primitive_types::U256;
use rlp::RlpStream;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
	#[error("Transaction validation error: {0}")]
	ValidationError(String),
}

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
	pub nonce: U256,
	pub gas_price: U256,
	pub gas_limit: U256,
	pub recipient: Address,
	pub amount: U256,
	pub data: Vec<u8>,
	/// EIP-155 chain id. `None` produces an unprotected signature.
	pub chain_id: Option<u64>,
}

impl UnsignedTransaction {
	/// Highest fee the transaction can be charged, `gas_price * gas_limit`.
	pub fn max_fee(&self) -> Option<U256> {
		self.gas_price.checked_mul(self.gas_limit)
	}

	/// Highest total the sender can be charged, fee plus amount.
	pub fn max_spend(&self) -> Option<U256> {
		self.max_fee()?.checked_add(self.amount)
	}

	/// Appends the six fields shared by the signing payload and the signed transaction.
	pub fn append_fields(&self, stream: &mut RlpStream) {
		stream
			.append(&self.nonce)
			.append(&self.gas_price)
			.append(&self.gas_limit)
			.append(&self.recipient.as_bytes().to_vec())
			.append(&self.amount)
			.append(&self.data);
	}
}

/// Builder for unsigned transactions
#[derive(Debug, Default)]
pub struct TransactionBuilder {
	recipient: Option<Address>,
	amount: Option<U256>,
	nonce: Option<U256>,
	gas_price: Option<U256>,
	gas_limit: Option<U256>,
	chain_id: Option<u64>,
}

impl TransactionBuilder {
	/// Creates a new transaction builder
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_recipient(mut self, recipient: Address) -> Self {
		self.recipient = Some(recipient);
		self
	}

	/// Sets the value to transfer, in wei
	pub fn with_amount(mut self, amount: U256) -> Self {
		self.amount = Some(amount);
		self
	}

	pub fn with_nonce(mut self, nonce: U256) -> Self {
		self.nonce = Some(nonce);
		self
	}

	/// Sets the price per gas unit, in wei
	pub fn with_gas_price(mut self, gas_price: U256) -> Self {
		self.gas_price = Some(gas_price);
		self
	}

	pub fn with_gas_limit(mut self, gas_limit: U256) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}

	pub fn with_chain_id(mut self, chain_id: Option<u64>) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Builds the unsigned transaction
	pub fn build(self) -> Result<UnsignedTransaction, TransactionError> {
		let missing = |field: &str| TransactionError::ValidationError(format!("missing {}", field));

		let tx = UnsignedTransaction {
			nonce: self.nonce.ok_or_else(|| missing("nonce"))?,
			gas_price: self.gas_price.ok_or_else(|| missing("gas price"))?,
			gas_limit: self.gas_limit.ok_or_else(|| missing("gas limit"))?,
			recipient: self.recipient.ok_or_else(|| missing("recipient"))?,
			amount: self.amount.ok_or_else(|| missing("amount"))?,
			data: Vec::new(),
			chain_id: self.chain_id,
		};

		if tx.gas_limit.is_zero() {
			return Err(TransactionError::ValidationError(
				"gas limit must be positive".to_string(),
			));
		}
		if tx.max_spend().is_none() {
			return Err(TransactionError::ValidationError(
				"amount plus maximum fee does not fit in 256 bits".to_string(),
			));
		}

		Ok(tx)
	}
}
