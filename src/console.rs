//! Interactive menu.
//!
//! Prompts read whole lines from any async reader so the menu can be driven by stdin or by a
//! scripted buffer.

use crate::commands::{WalletApp, transfer_request};
use crate::transaction::TRANSFER_GAS_LIMIT;
use crate::utils::{eth_to_wei, wei_to_eth};
use crate::wallet::address::Address;
use crate::wallet::sync::events::{SyncEvent, SyncEventHandler};
use crate::wallet::types::WalletError;

use primitive_types::U256;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::error;

const DEFAULT_GAS_PRICE_GWEI: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
	Synchronize,
	Send,
	List,
	Quit,
}

/// An entry of a numbered menu.
trait MenuItem: Copy {
	fn label(&self) -> &'static str;
}

impl MenuChoice {
	const ALL: [MenuChoice; 4] = [
		MenuChoice::Synchronize,
		MenuChoice::Send,
		MenuChoice::List,
		MenuChoice::Quit,
	];
}

impl MenuItem for MenuChoice {
	fn label(&self) -> &'static str {
		match self {
			MenuChoice::Synchronize => "Synchronize",
			MenuChoice::Send => "Send transaction",
			MenuChoice::List => "List transactions",
			MenuChoice::Quit => "Quit",
		}
	}
}

pub struct Console<R> {
	lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Console<R> {
	pub fn new(reader: R) -> Self {
		Self {
			lines: reader.lines(),
		}
	}

	/// Runs the menu until the user quits or input ends.
	pub async fn run(&mut self, app: &mut WalletApp<'_>) -> Result<(), WalletError> {
		loop {
			println!();
			println!("=============================================");
			println!();
			match app.status().await {
				Ok(status) => println!("{}", status),
				Err(e) => {
					error!("Failed to fetch balance: {}", e);
					println!("Address: {}", app.wallet().state().address());
				}
			}
			println!();

			let Some(choice) = self.menu(&MenuChoice::ALL).await? else {
				return Ok(());
			};

			match choice {
				MenuChoice::Synchronize => {
					let progress: Box<dyn SyncEventHandler> = Box::new(ProgressLine::default());
					let outcome = app.synchronize(vec![progress]).await;
					println!();
					match outcome {
						Ok(report) => println!("{}", report.stats.summary()),
						Err(e) => println!("FAILED: {}", e),
					}
				}
				MenuChoice::Send => {
					if self.send(app).await?.is_none() {
						return Ok(());
					}
				}
				MenuChoice::List => println!("{}", app.render_transactions()),
				MenuChoice::Quit => return Ok(()),
			}
		}
	}

	/// Prompts for a transfer, confirms it and sends it. `None` when input ended.
	async fn send(&mut self, app: &WalletApp<'_>) -> Result<Option<()>, WalletError> {
		let Some(recipient) = self.prompt_for_address("Recipient (hex notation)").await? else {
			return Ok(None);
		};
		let Some(amount) = self.prompt_for_amount("Amount (in ETH)").await? else {
			return Ok(None);
		};
		let Some(gas_price_gwei) = self
			.prompt_for_integer(
				&format!("Gas price (in Gwei) [{}]", DEFAULT_GAS_PRICE_GWEI),
				Some(DEFAULT_GAS_PRICE_GWEI),
			)
			.await?
		else {
			return Ok(None);
		};
		let Some(nonce) = self
			.prompt_for_optional_integer("Nonce override (empty == automatic) []")
			.await?
		else {
			return Ok(None);
		};

		let max_fee = U256::from(gas_price_gwei)
			.saturating_mul(U256::exp10(9))
			.saturating_mul(U256::from(TRANSFER_GAS_LIMIT));
		println!();
		println!("Do you want to send this transaction?");
		println!("\tFrom: {}", app.wallet().state().address());
		println!("\tTo: {}", recipient);
		println!("\tAmount: {} ETH", amount);
		println!("\tMax fee: {} ETH", wei_to_eth(max_fee));
		println!(
			"\tNonce: {}",
			nonce.map_or("<automatic>".to_string(), |n| n.to_string())
		);
		println!();

		let Some(confirmed) = self.confirm("Send").await? else {
			return Ok(None);
		};
		if !confirmed {
			println!("Transaction cancelled");
			return Ok(Some(()));
		}

		let request = transfer_request(
			recipient.as_str(),
			&amount,
			gas_price_gwei,
			TRANSFER_GAS_LIMIT,
			nonce,
		)?;
		print!("Sending... ");
		let _ = std::io::stdout().flush();
		match app.send(&request).await {
			Ok(hash) => {
				println!("done.");
				println!();
				println!("Transaction hash: {}", hash);
				if let Some(link) = app.transaction_link(&hash) {
					println!("You can see your transaction status at:");
					println!("\t{}", link);
				}
			}
			Err(WalletError::InsufficientFunds { .. }) => {
				println!("SORRY! I can not send this transaction:");
				println!();
				println!("\tThis transaction may require more ETH than you have.");
				println!("\tIf you think this is an error, try re-synchronizing the wallet.");
			}
			Err(e) => {
				println!("FAILED: {}", e);
				error!("Failed to send transaction: {}", e);
			}
		}
		Ok(Some(()))
	}

	async fn read_line(&mut self, message: &str) -> Result<Option<String>, WalletError> {
		print!("{}: ", message);
		let _ = std::io::stdout().flush();
		self.lines
			.next_line()
			.await
			.map(|line| line.map(|l| l.trim().to_string()))
			.map_err(|e| WalletError::InvalidInput(format!("Failed to read input: {}", e)))
	}

	async fn menu<T: MenuItem>(&mut self, choices: &[T]) -> Result<Option<T>, WalletError> {
		for (ix, choice) in choices.iter().enumerate() {
			println!("{}) {}", ix, choice.label());
		}
		println!();

		loop {
			let Some(line) = self.read_line("Choice").await? else {
				return Ok(None);
			};
			if let Some(choice) = line.parse::<usize>().ok().and_then(|ix| choices.get(ix)) {
				return Ok(Some(*choice));
			}
		}
	}

	async fn confirm(&mut self, action: &'static str) -> Result<Option<bool>, WalletError> {
		let choices = [Confirmation(action), Confirmation("Cancel")];
		Ok(self.menu(&choices).await?.map(|c| c.0 == action))
	}

	async fn prompt_for_address(&mut self, message: &str) -> Result<Option<Address>, WalletError> {
		loop {
			let Some(line) = self.read_line(message).await? else {
				return Ok(None);
			};
			if let Ok(address) = Address::parse(&line) {
				return Ok(Some(address));
			}
		}
	}

	/// Returns the amount as typed once it parses as ETH.
	async fn prompt_for_amount(&mut self, message: &str) -> Result<Option<String>, WalletError> {
		loop {
			let Some(line) = self.read_line(message).await? else {
				return Ok(None);
			};
			if eth_to_wei(&line).is_ok() {
				return Ok(Some(line));
			}
		}
	}

	async fn prompt_for_integer(
		&mut self,
		message: &str,
		default: Option<u64>,
	) -> Result<Option<u64>, WalletError> {
		loop {
			let Some(line) = self.read_line(message).await? else {
				return Ok(None);
			};
			if line.is_empty() {
				if let Some(default) = default {
					return Ok(Some(default));
				}
				continue;
			}
			if let Ok(value) = line.parse() {
				return Ok(Some(value));
			}
		}
	}

	/// Outer `None` when input ended, inner `None` when left empty.
	async fn prompt_for_optional_integer(
		&mut self,
		message: &str,
	) -> Result<Option<Option<u64>>, WalletError> {
		loop {
			let Some(line) = self.read_line(message).await? else {
				return Ok(None);
			};
			if line.is_empty() {
				return Ok(Some(None));
			}
			if let Ok(value) = line.parse() {
				return Ok(Some(Some(value)));
			}
		}
	}
}

/// Keeps a single console line with the percentage of the run done.
#[derive(Debug, Default)]
struct ProgressLine {
	last_percent: Option<u64>,
}

#[async_trait::async_trait]
impl SyncEventHandler for ProgressLine {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), WalletError> {
		if let SyncEvent::Progress { fraction, .. } = event {
			let percent = (fraction * 100.0).floor() as u64;
			if self.last_percent != Some(percent) {
				self.last_percent = Some(percent);
				print!("\rSynchronizing wallet with the network... {}%", percent);
				let _ = std::io::stdout().flush();
			}
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"console-progress"
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Confirmation(&'static str);

impl MenuItem for Confirmation {
	fn label(&self) -> &'static str {
		self.0
	}
}
