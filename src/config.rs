//! Command line and environment configuration.

use crate::wallet::sync::SyncConfig;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
	name = "ledger-sync-wallet",
	version,
	about = "Single-address wallet with a local transaction ledger"
)]
pub struct Cli {
	/// Log at debug level
	#[arg(long, global = true)]
	pub verbose: bool,

	/// Wallet document, created on first use
	#[arg(long, env = "WALLET_FILE", default_value = "wallet.json", global = true)]
	pub wallet: PathBuf,

	/// JSON-RPC endpoint of the node
	#[arg(long, env = "ETH_RPC_URL", default_value = "http://localhost:8545", global = true)]
	pub rpc_url: String,

	/// Chain id for replay protection, queried from the node when absent
	#[arg(long, env = "ETH_CHAIN_ID", global = true)]
	pub chain_id: Option<u64>,

	/// Explorer page prefix for transaction links, e.g. https://sepolia.etherscan.io/tx
	#[arg(long, env = "EXPLORER_TX_URL", global = true)]
	pub explorer_url: Option<String>,

	/// How long a missing block is re-fetched before synchronization stops, in milliseconds
	#[arg(long, default_value_t = 5000, global = true)]
	pub retry_window_ms: u64,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// Synchronize the local ledger up to the remote tip
	Sync,
	/// List known transactions, newest first
	List,
	/// Show address, balance and cursor
	Status,
	/// Sign and send a value transfer
	Send {
		/// Recipient address (hex, optional 0x prefix)
		recipient: String,
		/// Amount in ETH
		amount: String,
		/// Gas price in gwei
		#[arg(long, default_value_t = 40)]
		gas_price_gwei: u64,
		#[arg(long, default_value_t = 21_000)]
		gas_limit: u64,
		/// Use this nonce instead of the pending transaction count
		#[arg(long)]
		nonce: Option<u64>,
	},
}

impl Cli {
	pub fn sync_config(&self) -> SyncConfig {
		SyncConfig {
			not_found_retry_window: Duration::from_millis(self.retry_window_ms),
			..Default::default()
		}
	}
}

/// Log filter from the `RUST_LOG` directives, `info` when unset or invalid.
///
/// `--verbose` raises the default level to debug.
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
	let configured = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok());
	match (configured, verbose) {
		(Some(filter), true) => filter.add_directive(Level::DEBUG.into()),
		(Some(filter), false) => filter,
		(None, true) => EnvFilter::new("debug"),
		(None, false) => EnvFilter::new("info"),
	}
}
