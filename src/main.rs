mod commands;
mod config;
mod console;
mod rpc;
mod transaction;
mod utils;
mod wallet;

use clap::Parser;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::commands::{WalletApp, transfer_request};
use crate::config::{Cli, Command, log_filter};
use crate::console::Console;
use crate::rpc::JsonRpcLedgerClient;
use crate::wallet::sync::{FileWalletStore, PersistentWallet};
use crate::wallet::types::WalletError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
	tracing_subscriber::fmt()
		.with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.init();

	match run(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{}", e);
			ExitCode::FAILURE
		}
	}
}

async fn run(cli: Cli) -> Result<(), WalletError> {
	let client = JsonRpcLedgerClient::new(cli.rpc_url.clone())?;
	info!("Using node at {}", cli.rpc_url);

	let store = Box::new(FileWalletStore::new());
	let wallet = PersistentWallet::load_or_create(store, cli.wallet.clone(), &client).await?;
	info!("Wallet file {}", wallet.path().display());

	// Only signing needs the chain id.
	let chain_id = match (&cli.command, cli.chain_id) {
		(_, Some(chain_id)) => Some(chain_id),
		(None | Some(Command::Send { .. }), None) => Some(client.chain_id().await?),
		_ => None,
	};

	let mut app = WalletApp::new(
		wallet,
		&client,
		chain_id,
		cli.explorer_url.clone(),
		cli.sync_config(),
	);

	match cli.command {
		None => {
			let mut console = Console::new(BufReader::new(tokio::io::stdin()));
			console.run(&mut app).await?;
		}
		Some(Command::Sync) => {
			let report = app.synchronize(Vec::new()).await?;
			println!("{}", report.stats.summary());
			if !report.is_complete() {
				println!("Stopped early, run sync again once the node has caught up");
			}
		}
		Some(Command::List) => println!("{}", app.render_transactions()),
		Some(Command::Status) => println!("{}", app.status().await?),
		Some(Command::Send {
			recipient,
			amount,
			gas_price_gwei,
			gas_limit,
			nonce,
		}) => {
			let request = transfer_request(&recipient, &amount, gas_price_gwei, gas_limit, nonce)?;
			let hash = app.send(&request).await?;
			println!("Transaction hash: {}", hash);
			if let Some(link) = app.transaction_link(&hash) {
				println!("{}", link);
			}
		}
	}

	Ok(())
}
