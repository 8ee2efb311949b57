//! Wallet operations behind the command line and the interactive menu.
//!
//! `WalletApp` wires the persisted wallet to the remote client and the signer. The rendering
//! helpers return plain strings so both front ends print the same output.

use crate::rpc::RemoteLedgerClient;
use crate::transaction::{Secp256k1Signer, TransactionSender, TransferRequest};
use crate::utils::{eth_to_wei, gwei_to_wei, wei_to_eth};
use crate::wallet::sync::events::SyncEventHandler;
use crate::wallet::sync::{PersistentWallet, SyncConfig, SyncReport, WalletSyncEngine};
use crate::wallet::types::{TransactionRecord, WalletError};

use primitive_types::U256;
use std::fmt::Write;

pub struct WalletApp<'a> {
	wallet: PersistentWallet,
	client: &'a dyn RemoteLedgerClient,
	signer: Secp256k1Signer,
	chain_id: Option<u64>,
	explorer_url: Option<String>,
	sync_config: SyncConfig,
}

impl<'a> WalletApp<'a> {
	pub fn new(
		wallet: PersistentWallet,
		client: &'a dyn RemoteLedgerClient,
		chain_id: Option<u64>,
		explorer_url: Option<String>,
		sync_config: SyncConfig,
	) -> Self {
		Self {
			wallet,
			client,
			signer: Secp256k1Signer::new(),
			chain_id,
			explorer_url,
			sync_config,
		}
	}

	pub fn wallet(&self) -> &PersistentWallet {
		&self.wallet
	}

	/// Runs a synchronization, reporting to `handlers` next to the logging handler.
	pub async fn synchronize(
		&mut self,
		handlers: Vec<Box<dyn SyncEventHandler>>,
	) -> Result<SyncReport, WalletError> {
		let mut engine = WalletSyncEngine::new(self.client, self.sync_config.clone());
		for handler in handlers {
			engine.register_handler(handler);
		}
		engine.synchronize(&mut self.wallet).await
	}

	pub async fn send(&self, request: &TransferRequest) -> Result<String, WalletError> {
		TransactionSender::new(self.client, &self.signer, self.chain_id)
			.prepare_and_send(self.wallet.state(), request)
			.await
	}

	/// Balance of the owned address as of the cursor block.
	pub async fn known_balance(&self) -> Result<U256, WalletError> {
		let state = self.wallet.state();
		Ok(self
			.client
			.balance(state.address(), state.cursor().number)
			.await?)
	}

	pub fn transaction_link(&self, hash: &str) -> Option<String> {
		self.explorer_url
			.as_ref()
			.map(|base| format!("{}/{}", base.trim_end_matches('/'), hash))
	}

	pub async fn status(&self) -> Result<String, WalletError> {
		let balance = self.known_balance().await?;
		Ok(self.render_status(balance))
	}

	pub fn render_status(&self, balance: U256) -> String {
		let state = self.wallet.state();
		let cursor = state.cursor();
		let mut out = String::new();
		let _ = writeln!(out, "Address: {}", state.address());
		let _ = writeln!(out, "Balance: {} ETH (at block {})", wei_to_eth(balance), cursor.number);
		let _ = writeln!(out, "Known transactions: {}", state.ledger().len());
		let _ = write!(
			out,
			"Balance and transactions were last updated at {}",
			cursor.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
		);
		out
	}

	/// Transaction history, newest block first.
	pub fn render_transactions(&self) -> String {
		let state = self.wallet.state();
		let mut out = String::from("Transaction history:\n");
		if state.ledger().is_empty() {
			out.push_str("\n\tNo known transactions. Synchronize to look for new ones.\n");
			return out;
		}

		for record in state.ledger().query().iter() {
			out.push('\n');
			self.render_record(&mut out, record);
		}
		out
	}

	fn render_record(&self, out: &mut String, record: &TransactionRecord) {
		let owner = self.wallet.state().address();
		let incoming = record.is_incoming_for(owner);

		if incoming {
			let _ = writeln!(out, "RECEIVED:");
			let _ = writeln!(out, "\tFrom: {}", record.from);
		} else {
			let _ = writeln!(out, "SENT:");
			match &record.to {
				Some(to) => {
					let _ = writeln!(out, "\tTo: {}", to);
				}
				None => {
					let _ = writeln!(out, "\tTo: <contract creation>");
				}
			}
		}
		let _ = writeln!(out, "\tHash: {}", record.hash);
		let _ = writeln!(
			out,
			"\tTime: {} (block {})",
			record.block.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
			record.block.number
		);
		let _ = writeln!(out, "\tAmount (without fee): {} ETH", record.amount_in_eth());
		// The sender pays the fee.
		if !incoming {
			let _ = writeln!(out, "\tPaid transaction fee: {} ETH", record.fee_in_eth());
		}
		if let Some(link) = self.transaction_link(&record.hash) {
			let _ = writeln!(out, "\t{}", link);
		}
	}
}

/// Builds a transfer from user-facing units: ETH amount and gwei gas price.
pub fn transfer_request(
	recipient: &str,
	amount_eth: &str,
	gas_price_gwei: u64,
	gas_limit: u64,
	nonce: Option<u64>,
) -> Result<TransferRequest, WalletError> {
	let gas_price = gwei_to_wei(U256::from(gas_price_gwei))
		.ok_or_else(|| WalletError::InvalidInput("gas price out of range".to_string()))?;

	Ok(TransferRequest {
		recipient: recipient.trim().to_string(),
		amount: eth_to_wei(amount_eth)?,
		gas_price,
		gas_limit: U256::from(gas_limit),
		nonce_override: nonce.map(U256::from),
	})
}
