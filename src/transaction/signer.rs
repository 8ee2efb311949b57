//!
//! Offline transaction signing.
//!
//! Provides the `Signer` contract used by the submission flow and a secp256k1 implementation
//! producing legacy RLP transactions, replay-protected (EIP-155) when a chain id is known.

use crate::transaction::builder::UnsignedTransaction;
use crate::wallet::address::Address;
use crate::wallet::key::PrivateKey;

use primitive_types::U256;
use rlp::{DecoderError, Rlp, RlpStream};
use secp256k1::Message;
use secp256k1::Secp256k1;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use sha3::{Digest, Keccak256};
use thiserror::Error;
use tracing::debug;

/// Fields of a signed legacy transaction.
const SIGNED_FIELDS: usize = 9;

#[derive(Error, Debug)]
pub enum SignerError {
	#[error("malformed transaction encoding: {0}")]
	Encoding(#[from] DecoderError),
	#[error("signature error: {0}")]
	Signature(#[from] secp256k1::Error),
	#[error("malformed signed transaction: {0}")]
	Malformed(String),
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
	Keccak256::digest(data).into()
}

/// A signed transaction ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	/// RLP-encoded signed payload.
	pub raw: Vec<u8>,
	/// Address of the key that produced the signature.
	pub from: Address,
	/// Keccak-256 hash of `raw`, `0x`-prefixed.
	pub hash: String,
}

/// Offline signer collaborator. Stateless and synchronous.
pub trait Signer: Send + Sync {
	fn sign(
		&self,
		key: &PrivateKey,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, SignerError>;

	/// Checks that `signed.raw` is well formed and was signed by `signed.from`.
	fn verify(&self, signed: &SignedTransaction) -> bool;
}

/// Hash signed over: the six transaction fields, followed by `chain_id, 0, 0` under EIP-155.
fn signing_hash(fields: impl FnOnce(&mut RlpStream), chain_id: Option<U256>) -> Message {
	let mut stream = RlpStream::new_list(if chain_id.is_some() { 9 } else { 6 });
	fields(&mut stream);
	if let Some(chain_id) = chain_id {
		stream
			.append(&chain_id)
			.append(&U256::zero())
			.append(&U256::zero());
	}
	Message::from_digest(keccak256(&stream.out()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Signer;

impl Secp256k1Signer {
	pub fn new() -> Self {
		Self
	}

	/// Recovers the sender address from a signed legacy transaction.
	pub fn recover_sender(raw: &[u8]) -> Result<Address, SignerError> {
		let tx = Rlp::new(raw);
		if !tx.is_list() || tx.payload_info()?.total() != raw.len() {
			return Err(SignerError::Malformed("not a single RLP list".to_string()));
		}
		let count = tx.item_count()?;
		if count != SIGNED_FIELDS {
			return Err(SignerError::Malformed(format!(
				"expected {} fields, found {}",
				SIGNED_FIELDS, count
			)));
		}

		let v: U256 = tx.val_at(6)?;
		let (chain_id, recovery) = if v == U256::from(27u64) || v == U256::from(28u64) {
			(None, (v - 27u64).low_u64())
		} else if v >= U256::from(35u64) {
			let offset = v - 35u64;
			(Some(offset / 2u64), (offset % 2u64).low_u64())
		} else {
			return Err(SignerError::Malformed(format!("invalid v value {}", v)));
		};

		let mut compact = [0u8; 64];
		let (r, s) = compact.split_at_mut(32);
		for (index, target) in [(7, r), (8, s)] {
			let item = tx.at(index)?;
			let bytes = item.data()?;
			if bytes.len() > 32 {
				return Err(SignerError::Malformed("signature component too long".to_string()));
			}
			target[32 - bytes.len()..].copy_from_slice(bytes);
		}

		let mut fields = Vec::with_capacity(6);
		for index in 0..6 {
			fields.push(tx.at(index)?);
		}
		let message = signing_hash(
			|stream| {
				for field in &fields {
					stream.append_raw(field.as_raw(), 1);
				}
			},
			chain_id,
		);

		let signature =
			RecoverableSignature::from_compact(&compact, RecoveryId::from_i32(recovery as i32)?)?;
		let secp = Secp256k1::verification_only();
		let public_key = secp.recover_ecdsa(&message, &signature)?;
		secp.verify_ecdsa(&message, &signature.to_standard(), &public_key)?;

		Ok(Address::from_public_key(&public_key))
	}
}

impl Signer for Secp256k1Signer {
	fn sign(
		&self,
		key: &PrivateKey,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, SignerError> {
		let chain_id = tx.chain_id.map(U256::from);
		let message = signing_hash(|stream| tx.append_fields(stream), chain_id);

		let secp = Secp256k1::signing_only();
		let (recovery_id, compact) = secp
			.sign_ecdsa_recoverable(&message, key.secret())
			.serialize_compact();

		let recovery = U256::from(recovery_id.to_i32() as u64);
		let v = match chain_id {
			Some(chain_id) => chain_id * 2u64 + 35u64 + recovery,
			None => recovery + 27u64,
		};

		let mut stream = RlpStream::new_list(SIGNED_FIELDS);
		tx.append_fields(&mut stream);
		stream
			.append(&v)
			.append(&U256::from_big_endian(&compact[..32]))
			.append(&U256::from_big_endian(&compact[32..]));

		let raw = stream.out().to_vec();
		let hash = format!("0x{}", hex::encode(keccak256(&raw)));
		debug!("Signed transaction {} with nonce {}", hash, tx.nonce);

		Ok(SignedTransaction {
			raw,
			from: key.address(),
			hash,
		})
	}

	fn verify(&self, signed: &SignedTransaction) -> bool {
		match Self::recover_sender(&signed.raw) {
			Ok(sender) if sender == signed.from => {
				format!("0x{}", hex::encode(keccak256(&signed.raw))) == signed.hash
			}
			Ok(sender) => {
				debug!("Signature recovers to {} instead of {}", sender, signed.from);
				false
			}
			Err(e) => {
				debug!("Signed transaction failed verification: {}", e);
				false
			}
		}
	}
}
