use crate::wallet::address::Address;

use rand::Rng;
use secp256k1::SecretKey;
use std::fmt;

/// The wallet's secp256k1 signing key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
	secret: SecretKey,
}

impl PrivateKey {
	/// Generates a fresh key from the thread-local CSPRNG.
	pub fn generate() -> Self {
		loop {
			let mut seed = [0u8; 32];
			rand::rng().fill(&mut seed);
			// Retry on the (negligible) chance the bytes fall outside the curve order.
			if let Ok(secret) = SecretKey::from_slice(&seed) {
				return Self { secret };
			}
		}
	}

	pub fn from_hex(text: &str) -> Result<Self, secp256k1::Error> {
		let digits = text.trim().trim_start_matches("0x");
		let bytes = hex::decode(digits).map_err(|_| secp256k1::Error::InvalidSecretKey)?;
		Ok(Self {
			secret: SecretKey::from_slice(&bytes)?,
		})
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.secret.secret_bytes())
	}

	pub fn secret(&self) -> &SecretKey {
		&self.secret
	}

	pub fn address(&self) -> Address {
		Address::from_secret_key(&self.secret)
	}
}

impl fmt::Debug for PrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PrivateKey")
			.field("address", &self.address().as_str())
			.finish_non_exhaustive()
	}
}
