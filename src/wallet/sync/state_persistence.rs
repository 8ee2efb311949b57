//! State persistence for the wallet.
//!
//! This module provides `PersistentWallet`, which owns the in-memory `WalletState` together with
//! the store it is saved to. Every change goes through `mutate`, which applies the change and then
//! writes the complete document back in one unit. Synchronization and the command handlers only
//! ever see the state through this type.

use crate::rpc::RemoteLedgerClient;
use crate::wallet::key::PrivateKey;
use crate::wallet::state::WalletState;
use crate::wallet::sync::repositories::WalletStore;
use crate::wallet::types::{BlockRef, WalletError};

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// The wallet state bound to its backing document.
pub struct PersistentWallet {
	state: WalletState,
	store: Box<dyn WalletStore>,
	path: PathBuf,
}

impl PersistentWallet {
	/// Wraps an existing state without writing it.
	pub fn new(state: WalletState, store: Box<dyn WalletStore>, path: PathBuf) -> Self {
		Self { state, store, path }
	}

	/// Loads the wallet stored at `path`, or creates and saves a new one.
	///
	/// A new wallet gets a fresh key and starts at the current remote tip with an empty ledger.
	pub async fn load_or_create(
		store: Box<dyn WalletStore>,
		path: PathBuf,
		client: &dyn RemoteLedgerClient,
	) -> Result<Self, WalletError> {
		if store.exists(&path).await? {
			let bytes = store.read_all(&path).await?.ok_or_else(|| {
				WalletError::Persistence(format!("Wallet document {:?} vanished", path))
			})?;
			let state = WalletState::from_json(&bytes)?;
			info!(
				"Loaded wallet {} from {:?} at block {}",
				state.address(),
				path,
				state.cursor().number
			);
			return Ok(Self::new(state, store, path));
		}

		let tip = client.latest_block_number().await?;
		let timestamp = match client.block_with_transactions(tip).await {
			Ok(Some(block)) => block.timestamp,
			Ok(None) => {
				warn!("Tip block {} not found, using the current time as cursor timestamp", tip);
				Utc::now()
			}
			Err(e) => {
				warn!("Failed to fetch tip block {}: {}, using the current time", tip, e);
				Utc::now()
			}
		};

		let state = WalletState::new(PrivateKey::generate(), BlockRef::new(tip, timestamp));
		info!("Created new wallet {} starting at block {}", state.address(), tip);

		let wallet = Self::new(state, store, path);
		wallet.save().await?;
		Ok(wallet)
	}

	pub fn state(&self) -> &WalletState {
		&self.state
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Applies `change` to the state and persists the whole document.
	///
	/// Nothing is written when `change` fails. When the write fails the change stays applied in
	/// memory and is persisted by the next successful call.
	pub async fn mutate<F, T>(&mut self, change: F) -> Result<T, WalletError>
	where
		F: FnOnce(&mut WalletState) -> Result<T, WalletError>,
	{
		let output = change(&mut self.state)?;
		self.save().await?;
		Ok(output)
	}

	/// Writes the current state, fully replacing the stored document.
	pub async fn save(&self) -> Result<(), WalletError> {
		let bytes = self.state.to_json()?;
		self.store.write_all(&self.path, &bytes).await.map_err(|e| {
			error!("Failed to persist wallet to {:?}: {}", self.path, e);
			e
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::mock::{MockLedgerClient, mock_timestamp, transfer};
	use crate::wallet::sync::repositories::memory::MemoryWalletStore;
	use primitive_types::U256;
	use std::sync::Arc;

	const OTHER: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";

	fn path() -> PathBuf {
		PathBuf::from("wallet.json")
	}

	#[tokio::test]
	async fn test_creates_wallet_at_remote_tip() {
		let client = MockLedgerClient::new(1234);
		let store = Arc::new(MemoryWalletStore::default());

		let wallet = PersistentWallet::load_or_create(Box::new(store.clone()), path(), &client)
			.await
			.unwrap();

		assert_eq!(
			wallet.state().cursor(),
			&BlockRef::new(U256::from(1234u64), mock_timestamp(1234))
		);
		assert!(wallet.state().ledger().is_empty());
		assert_eq!(store.writes(), 1);
	}

	#[tokio::test]
	async fn test_new_wallet_falls_back_to_current_time() {
		let client = MockLedgerClient::new(5);
		client.set_missing(5);
		let store = Arc::new(MemoryWalletStore::default());

		let before = Utc::now();
		let wallet = PersistentWallet::load_or_create(Box::new(store), path(), &client)
			.await
			.unwrap();
		assert_eq!(wallet.state().cursor().number, U256::from(5u64));
		assert!(wallet.state().cursor().timestamp >= before);
	}

	#[tokio::test]
	async fn test_corrupt_document_is_not_replaced() {
		let client = MockLedgerClient::new(10);
		let store = Arc::new(MemoryWalletStore::default());
		store.insert(&path(), b"{broken".to_vec());

		let result =
			PersistentWallet::load_or_create(Box::new(store.clone()), path(), &client).await;

		assert!(matches!(result, Err(WalletError::Persistence(_))));
		assert_eq!(store.contents(&path()), Some(b"{broken".to_vec()));
		assert_eq!(store.writes(), 0);
	}

	#[tokio::test]
	async fn test_reloads_existing_wallet() {
		let client = MockLedgerClient::new(10);
		let store = Arc::new(MemoryWalletStore::default());
		let mut wallet = PersistentWallet::load_or_create(Box::new(store.clone()), path(), &client)
			.await
			.unwrap();
		let owner = wallet.state().address().to_string();
		wallet
			.mutate(|state| {
				state.ledger_mut().merge_block(
					&BlockRef::new(U256::from(11u64), mock_timestamp(11)),
					&[transfer("0x01", OTHER, &owner, 9)],
				);
				Ok(())
			})
			.await
			.unwrap();

		client.set_tip(500);
		let reloaded = PersistentWallet::load_or_create(Box::new(store.clone()), path(), &client)
			.await
			.unwrap();

		assert_eq!(reloaded.state().address(), wallet.state().address());
		assert_eq!(reloaded.state().cursor().number, U256::from(11u64));
		assert_eq!(reloaded.state().ledger().records(), wallet.state().ledger().records());
		assert_eq!(store.writes(), 2);
	}

	#[tokio::test]
	async fn test_failed_change_is_not_written() {
		let client = MockLedgerClient::new(1);
		let store = Arc::new(MemoryWalletStore::default());
		let mut wallet = PersistentWallet::load_or_create(Box::new(store.clone()), path(), &client)
			.await
			.unwrap();

		let result: Result<(), WalletError> = wallet
			.mutate(|_| Err(WalletError::InvalidInput("rejected".to_string())))
			.await;

		assert!(matches!(result, Err(WalletError::InvalidInput(_))));
		assert_eq!(store.writes(), 1);
	}

	#[tokio::test]
	async fn test_write_failure_keeps_change_in_memory_until_next_save() {
		let client = MockLedgerClient::new(1);
		let store = Arc::new(MemoryWalletStore::default());
		let mut wallet = PersistentWallet::load_or_create(Box::new(store.clone()), path(), &client)
			.await
			.unwrap();
		let advance = |number: u64| {
			move |state: &mut WalletState| {
				state
					.ledger_mut()
					.merge_block(&BlockRef::new(U256::from(number), mock_timestamp(number)), &[]);
				Ok::<(), WalletError>(())
			}
		};

		store.set_fail_writes(true);
		let err = wallet.mutate(advance(2)).await.unwrap_err();
		assert!(matches!(err, WalletError::Persistence(_)));
		assert_eq!(wallet.state().cursor().number, U256::from(2u64));

		let on_disk = WalletState::from_json(&store.contents(&path()).unwrap()).unwrap();
		assert_eq!(on_disk.cursor().number, U256::one());

		store.set_fail_writes(false);
		wallet.mutate(advance(3)).await.unwrap();
		let on_disk = WalletState::from_json(&store.contents(&path()).unwrap()).unwrap();
		assert_eq!(on_disk.cursor().number, U256::from(3u64));
	}

	#[tokio::test]
	async fn test_file_backed_wallet_survives_restart() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("wallet.json");
		let client = MockLedgerClient::new(77);
		let store = crate::wallet::sync::repositories::FileWalletStore::new();

		let created = PersistentWallet::load_or_create(Box::new(store), file.clone(), &client)
			.await
			.unwrap();
		let reopened = PersistentWallet::load_or_create(Box::new(store), file, &client)
			.await
			.unwrap();

		assert_eq!(created.state().address(), reopened.state().address());
		assert_eq!(created.state().key(), reopened.state().key());
	}
}
