//! In-memory wallet state and its persisted document form.
//!
//! The whole state (key, cursor and records) is always serialized as one JSON document.

use crate::wallet::address::Address;
use crate::wallet::key::PrivateKey;
use crate::wallet::ledger::TransactionLedger;
use crate::wallet::types::{BlockRef, TransactionRecord, WalletError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Highest document version this build reads and the version it writes.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
	1
}

/// On-disk representation of a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDocument {
	#[serde(default = "default_version")]
	pub version: u32,
	pub private_key: String,
	pub last_processed_block: BlockRef,
	#[serde(default)]
	pub known_transactions: Vec<TransactionRecord>,
	/// Top-level fields this version does not know about, written back untouched.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct WalletState {
	key: PrivateKey,
	ledger: TransactionLedger,
	extra: Map<String, Value>,
}

impl WalletState {
	/// A wallet with an empty ledger whose cursor starts at `cursor`.
	pub fn new(key: PrivateKey, cursor: BlockRef) -> Self {
		let ledger = TransactionLedger::new(key.address(), cursor);
		Self {
			key,
			ledger,
			extra: Map::new(),
		}
	}

	pub fn key(&self) -> &PrivateKey {
		&self.key
	}

	/// The owned address, always derived from the key.
	pub fn address(&self) -> &Address {
		self.ledger.owner()
	}

	pub fn cursor(&self) -> &BlockRef {
		self.ledger.cursor()
	}

	pub fn ledger(&self) -> &TransactionLedger {
		&self.ledger
	}

	pub fn ledger_mut(&mut self) -> &mut TransactionLedger {
		&mut self.ledger
	}

	pub fn to_document(&self) -> WalletDocument {
		WalletDocument {
			version: DOCUMENT_VERSION,
			private_key: self.key.to_hex(),
			last_processed_block: self.ledger.cursor().clone(),
			known_transactions: self.ledger.records().to_vec(),
			extra: self.extra.clone(),
		}
	}

	pub fn from_document(document: WalletDocument) -> Result<Self, WalletError> {
		if document.version > DOCUMENT_VERSION {
			return Err(WalletError::Persistence(format!(
				"wallet document version {} is newer than supported version {}",
				document.version, DOCUMENT_VERSION
			)));
		}

		let key = PrivateKey::from_hex(&document.private_key).map_err(|e| {
			WalletError::Persistence(format!("Invalid private key in wallet document: {}", e))
		})?;
		let ledger = TransactionLedger::restore(
			key.address(),
			document.last_processed_block,
			document.known_transactions,
		)?;

		Ok(Self {
			key,
			ledger,
			extra: document.extra,
		})
	}

	pub fn to_json(&self) -> Result<Vec<u8>, WalletError> {
		Ok(serde_json::to_vec_pretty(&self.to_document())?)
	}

	pub fn from_json(bytes: &[u8]) -> Result<Self, WalletError> {
		let document: WalletDocument = serde_json::from_slice(bytes)?;
		Self::from_document(document)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::mock::{mock_timestamp, transfer};
	use primitive_types::U256;

	const OTHER: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";

	fn populated_state() -> WalletState {
		let key = PrivateKey::generate();
		let owner = key.address().to_string();
		let mut state = WalletState::new(key, BlockRef::new(U256::from(7u64), mock_timestamp(7)));
		state.ledger_mut().merge_block(
			&BlockRef::new(U256::from(8u64), mock_timestamp(8)),
			&[
				transfer("0xaa01", OTHER, &owner, 1_000),
				transfer("0xaa02", &owner, OTHER, 250),
			],
		);
		state
	}

	#[test]
	fn test_json_round_trip_preserves_state() {
		let state = populated_state();
		let restored = WalletState::from_json(&state.to_json().unwrap()).unwrap();

		assert_eq!(restored.address(), state.address());
		assert_eq!(restored.cursor(), state.cursor());
		assert_eq!(restored.ledger().records(), state.ledger().records());
		assert!(restored.ledger().contains_hash("0xAA01"));
	}

	#[test]
	fn test_document_layout() {
		let state = populated_state();
		let json: Value = serde_json::from_slice(&state.to_json().unwrap()).unwrap();

		assert_eq!(json["version"], 1);
		assert_eq!(json["privateKey"], state.key().to_hex());
		assert_eq!(json["lastProcessedBlock"]["number"], "0x8");
		assert_eq!(json["knownTransactions"][0]["amount"], "0x3e8");
		assert_eq!(json["knownTransactions"][0]["fee"], "0x15");
		assert!(json.get("address").is_none());
	}

	#[test]
	fn test_unknown_fields_survive_round_trip() {
		let state = populated_state();
		let mut json: Value = serde_json::from_slice(&state.to_json().unwrap()).unwrap();
		json["label"] = Value::String("savings".to_string());

		let restored = WalletState::from_json(json.to_string().as_bytes()).unwrap();
		let rewritten: Value = serde_json::from_slice(&restored.to_json().unwrap()).unwrap();
		assert_eq!(rewritten["label"], "savings");
	}

	#[test]
	fn test_version_handling() {
		let state = populated_state();
		let mut json: Value = serde_json::from_slice(&state.to_json().unwrap()).unwrap();

		json.as_object_mut().unwrap().remove("version");
		assert!(WalletState::from_json(json.to_string().as_bytes()).is_ok());

		json["version"] = Value::from(2);
		assert!(matches!(
			WalletState::from_json(json.to_string().as_bytes()),
			Err(WalletError::Persistence(_))
		));
	}

	#[test]
	fn test_rejects_corrupt_document() {
		assert!(matches!(
			WalletState::from_json(b"{not json"),
			Err(WalletError::Persistence(_))
		));
	}

	#[test]
	fn test_rejects_document_with_duplicate_transactions() {
		let state = populated_state();
		let mut json: Value = serde_json::from_slice(&state.to_json().unwrap()).unwrap();
		let first = json["knownTransactions"][0].clone();
		json["knownTransactions"].as_array_mut().unwrap().push(first);

		assert!(matches!(
			WalletState::from_json(json.to_string().as_bytes()),
			Err(WalletError::Persistence(_))
		));
	}
}
