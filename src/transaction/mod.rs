/// Builder for unsigned transfers
pub mod builder;
/// Submission flow for signed transfers
pub mod sender;
/// Offline secp256k1 signing and verification
pub mod signer;

pub use sender::{TransactionSender, TransferRequest};
pub use signer::Secp256k1Signer;

/// Default gas limit for a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;
