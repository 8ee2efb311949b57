use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
	#[error("address is not valid hex: {0}")]
	InvalidHex(String),
	#[error("address must be 20 bytes, got {0}")]
	InvalidLength(usize),
}

/// A 20-byte account address.
///
/// The text the address was created from is kept for display; comparisons ignore case.
#[derive(Debug, Clone)]
pub struct Address {
	text: String,
	bytes: [u8; 20],
}

impl Address {
	pub fn parse(text: &str) -> Result<Self, AddressError> {
		let trimmed = text.trim();
		let digits = trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
			.unwrap_or(trimmed);
		let decoded = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
		let bytes: [u8; 20] = decoded
			.as_slice()
			.try_into()
			.map_err(|_| AddressError::InvalidLength(decoded.len()))?;

		Ok(Self {
			text: trimmed.to_string(),
			bytes,
		})
	}

	/// Builds an address from raw bytes, rendered with the EIP-55 mixed-case checksum.
	pub fn from_bytes(bytes: [u8; 20]) -> Self {
		Self {
			text: checksum_encode(&bytes),
			bytes,
		}
	}

	/// Derives the account address of a secp256k1 key: the last 20 bytes of the
	/// Keccak-256 hash of the uncompressed public key (without its 0x04 tag).
	pub fn from_secret_key(secret_key: &SecretKey) -> Self {
		let secp = Secp256k1::signing_only();
		Self::from_public_key(&PublicKey::from_secret_key(&secp, secret_key))
	}

	pub fn from_public_key(public_key: &PublicKey) -> Self {
		let uncompressed = public_key.serialize_uncompressed();
		let hash = Keccak256::digest(&uncompressed[1..]);
		let mut bytes = [0u8; 20];
		bytes.copy_from_slice(&hash[12..]);
		Self::from_bytes(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 20] {
		&self.bytes
	}

	pub fn as_str(&self) -> &str {
		&self.text
	}

	/// Case-insensitive comparison against an address in text form.
	///
	/// Text that does not decode to an address never matches.
	pub fn matches(&self, other: &str) -> bool {
		Address::parse(other)
			.map(|other| other.bytes == self.bytes)
			.unwrap_or(false)
	}
}

impl PartialEq for Address {
	fn eq(&self, other: &Self) -> bool {
		self.bytes == other.bytes
	}
}

impl Eq for Address {}

impl std::hash::Hash for Address {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.bytes.hash(state);
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.text)
	}
}

impl std::str::FromStr for Address {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Address::parse(s)
	}
}

impl Serialize for Address {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.text)
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Address::parse(&text).map_err(serde::de::Error::custom)
	}
}

/// How a transaction relates to the owned address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
	Incoming,
	Outgoing,
	/// Sent from the owned address to itself.
	SelfTransfer,
	Irrelevant,
}

impl TransferDirection {
	pub fn is_relevant(&self) -> bool {
		!matches!(self, TransferDirection::Irrelevant)
	}
}

/// Classifies a transaction by comparing its endpoints with `owner`.
pub fn classify(owner: &Address, from: &str, to: Option<&str>) -> TransferDirection {
	let from_me = owner.matches(from);
	let to_me = to.map(|to| owner.matches(to)).unwrap_or(false);

	match (from_me, to_me) {
		(true, true) => TransferDirection::SelfTransfer,
		(true, false) => TransferDirection::Outgoing,
		(false, true) => TransferDirection::Incoming,
		(false, false) => TransferDirection::Irrelevant,
	}
}

fn checksum_encode(bytes: &[u8; 20]) -> String {
	let lower = hex::encode(bytes);
	let hash = Keccak256::digest(lower.as_bytes());

	let mut out = String::with_capacity(42);
	out.push_str("0x");
	for (i, c) in lower.chars().enumerate() {
		let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
		if c.is_ascii_alphabetic() && nibble >= 8 {
			out.push(c.to_ascii_uppercase());
		} else {
			out.push(c);
		}
	}
	out
}
