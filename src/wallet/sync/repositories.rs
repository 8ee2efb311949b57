use crate::wallet::types::WalletError;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Byte-level backing store for the wallet document
#[async_trait::async_trait]
pub trait WalletStore: Send + Sync {
	async fn exists(&self, path: &Path) -> Result<bool, WalletError>;
	/// Returns `None` when nothing is stored at `path`.
	async fn read_all(&self, path: &Path) -> Result<Option<Vec<u8>>, WalletError>;
	/// Replaces whatever is stored at `path`. Readers never observe a partial write.
	async fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), WalletError>;
}

/// File-based implementation of WalletStore
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWalletStore;

impl FileWalletStore {
	pub fn new() -> Self {
		Self
	}

	fn temp_path(path: &Path) -> PathBuf {
		let mut name = path
			.file_name()
			.map(OsString::from)
			.unwrap_or_else(|| OsString::from("wallet"));
		name.push(".tmp");
		path.with_file_name(name)
	}
}

#[async_trait::async_trait]
impl WalletStore for FileWalletStore {
	async fn exists(&self, path: &Path) -> Result<bool, WalletError> {
		tokio::fs::try_exists(path).await.map_err(|e| {
			WalletError::Persistence(format!("Failed to check wallet file {:?}: {}", path, e))
		})
	}

	async fn read_all(&self, path: &Path) -> Result<Option<Vec<u8>>, WalletError> {
		match tokio::fs::read(path).await {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(WalletError::Persistence(format!(
				"Failed to read wallet file {:?}: {}",
				path, e
			))),
		}
	}

	async fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), WalletError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await.map_err(|e| {
				WalletError::Persistence(format!("Failed to create directory {:?}: {}", parent, e))
			})?;
		}

		let temp = Self::temp_path(path);
		let write = async {
			let mut file = tokio::fs::File::create(&temp).await?;
			file.write_all(bytes).await?;
			file.sync_all().await?;
			tokio::fs::rename(&temp, path).await
		};
		if let Err(e) = write.await {
			let _ = tokio::fs::remove_file(&temp).await;
			return Err(WalletError::Persistence(format!(
				"Failed to write wallet file {:?}: {}",
				path, e
			)));
		}

		debug!("Wrote {} bytes to {:?}", bytes.len(), path);
		Ok(())
	}
}
