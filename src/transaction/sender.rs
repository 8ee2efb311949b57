//!
//! Transaction submission flow.
//!
//! Resolves the nonce, checks the transfer is affordable against the balance known at the
//! cursor, signs offline, verifies the signature and submits the raw transaction. The local
//! ledger is never touched: a sent transaction becomes known once a later synchronization
//! sees it mined.

use crate::rpc::RemoteLedgerClient;
use crate::transaction::builder::TransactionBuilder;
use crate::transaction::signer::Signer;
use crate::wallet::address::Address;
use crate::wallet::state::WalletState;
use crate::wallet::types::WalletError;

use primitive_types::U256;
use tracing::{debug, error, info, warn};

/// A value transfer requested by the user. All quantities are in wei.
#[derive(Debug, Clone)]
pub struct TransferRequest {
	pub recipient: String,
	pub amount: U256,
	pub gas_price: U256,
	pub gas_limit: U256,
	/// Skips the pending transaction count lookup when set.
	pub nonce_override: Option<U256>,
}

/// Transaction sender for submitting value transfers to the remote node
pub struct TransactionSender<'a> {
	client: &'a dyn RemoteLedgerClient,
	signer: &'a dyn Signer,
	chain_id: Option<u64>,
}

impl<'a> TransactionSender<'a> {
	/// Creates a new transaction sender
	pub fn new(
		client: &'a dyn RemoteLedgerClient,
		signer: &'a dyn Signer,
		chain_id: Option<u64>,
	) -> Self {
		Self {
			client,
			signer,
			chain_id,
		}
	}

	/// Signs and submits a transfer, returning the transaction hash reported by the node.
	pub async fn prepare_and_send(
		&self,
		wallet: &WalletState,
		request: &TransferRequest,
	) -> Result<String, WalletError> {
		let recipient = Address::parse(&request.recipient)?;

		let nonce = match request.nonce_override {
			Some(nonce) => {
				debug!("Using nonce override {}", nonce);
				nonce
			}
			None => self.client.transaction_count(wallet.address(), true).await?,
		};

		let max_spend = request
			.gas_price
			.checked_mul(request.gas_limit)
			.and_then(|fee| fee.checked_add(request.amount))
			.ok_or_else(|| {
				WalletError::InvalidInput("amount plus maximum fee overflows".to_string())
			})?;

		let cursor = wallet.cursor().number;
		let balance = self.client.balance(wallet.address(), cursor).await?;
		if max_spend > balance {
			warn!(
				"Transaction may cost up to {} wei but the balance at block {} is {} wei",
				max_spend, cursor, balance
			);
			return Err(WalletError::InsufficientFunds {
				required: max_spend,
				available: balance,
			});
		}

		let unsigned = TransactionBuilder::new()
			.with_recipient(recipient)
			.with_amount(request.amount)
			.with_nonce(nonce)
			.with_gas_price(request.gas_price)
			.with_gas_limit(request.gas_limit)
			.with_chain_id(self.chain_id)
			.build()?;

		let signed = self.signer.sign(wallet.key(), &unsigned)?;
		if !self.signer.verify(&signed) {
			error!("Signed transaction {} failed verification, not submitting", signed.hash);
			return Err(WalletError::SigningIntegrity(format!(
				"signed transaction {} failed verification",
				signed.hash
			)));
		}

		let hash = self.client.submit_raw_transaction(&signed.raw).await?;
		if !hash.eq_ignore_ascii_case(&signed.hash) {
			warn!("Node reported hash {} for transaction {}", hash, signed.hash);
		}
		info!("Sent transaction {} with nonce {}", hash, nonce);

		Ok(hash)
	}
}
