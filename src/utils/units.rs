//! Denomination conversions.
//!
//! All values are carried as wei in a `U256`. Ether amounts only exist as exact decimal
//! strings at the edges (display and user input), so no conversion ever rounds.

use primitive_types::U256;
use thiserror::Error;

/// Number of decimal places between wei and ether.
pub const ETHER_DECIMALS: u32 = 18;

/// Number of decimal places between wei and gwei.
pub const GWEI_DECIMALS: u32 = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
	#[error("empty amount")]
	Empty,

	#[error("invalid character in amount: {0}")]
	InvalidDigit(String),

	#[error("amount has more than {0} decimal places")]
	TooPrecise(u32),

	#[error("amount does not fit in 256 bits")]
	Overflow,
}

/// Formats an integer amount with `decimals` implied decimal places, trimming trailing zeros.
pub fn format_token_amount(amount: U256, decimals: u32) -> String {
	let unit = U256::exp10(decimals as usize);
	let (whole, fraction) = amount.div_mod(unit);
	if fraction.is_zero() {
		return whole.to_string();
	}

	let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
	format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Parses a decimal string into an integer amount with `decimals` implied decimal places.
///
/// Fails instead of rounding when the input carries more precision than the unit allows.
pub fn parse_token_amount(text: &str, decimals: u32) -> Result<U256, UnitError> {
	let text = text.trim();
	if text.is_empty() || text == "." {
		return Err(UnitError::Empty);
	}

	let (whole, fraction) = match text.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (text, ""),
	};

	if let Some(bad) = whole
		.chars()
		.chain(fraction.chars())
		.find(|c| !c.is_ascii_digit())
	{
		return Err(UnitError::InvalidDigit(bad.to_string()));
	}

	let fraction = fraction.trim_end_matches('0');
	if fraction.len() > decimals as usize {
		return Err(UnitError::TooPrecise(decimals));
	}

	let whole = if whole.is_empty() {
		U256::zero()
	} else {
		U256::from_dec_str(whole).map_err(|_| UnitError::Overflow)?
	};
	let fraction = if fraction.is_empty() {
		U256::zero()
	} else {
		U256::from_dec_str(fraction).map_err(|_| UnitError::Overflow)?
			* U256::exp10(decimals as usize - fraction.len())
	};

	whole
		.checked_mul(U256::exp10(decimals as usize))
		.and_then(|scaled| scaled.checked_add(fraction))
		.ok_or(UnitError::Overflow)
}

/// Renders a wei amount in ether.
pub fn wei_to_eth(wei: U256) -> String {
	format_token_amount(wei, ETHER_DECIMALS)
}

/// Parses an ether amount into wei.
pub fn eth_to_wei(eth: &str) -> Result<U256, UnitError> {
	parse_token_amount(eth, ETHER_DECIMALS)
}

/// Scales a gwei amount to wei. Returns `None` if the result does not fit in 256 bits.
pub fn gwei_to_wei(gwei: U256) -> Option<U256> {
	gwei.checked_mul(U256::exp10(GWEI_DECIMALS as usize))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wei_to_eth_formats_exactly() {
		assert_eq!(wei_to_eth(U256::zero()), "0");
		assert_eq!(wei_to_eth(U256::exp10(18)), "1");
		assert_eq!(wei_to_eth(U256::from(1u64)), "0.000000000000000001");
		assert_eq!(
			wei_to_eth(U256::from(1_500_000_000_000_000_000u128)),
			"1.5"
		);
		assert_eq!(wei_to_eth(U256::from(21_000u64) * U256::exp10(9) * 40u64), "0.00084");
	}

	#[test]
	fn test_eth_to_wei_round_trips() {
		for text in ["0", "1", "0.1", "12.345", "0.000000000000000001", "1000000"] {
			let wei = eth_to_wei(text).expect("valid amount");
			assert_eq!(wei_to_eth(wei), text);
		}
		assert_eq!(eth_to_wei(".5").unwrap(), U256::exp10(17) * 5u64);
		assert_eq!(eth_to_wei("2.50").unwrap(), U256::exp10(17) * 25u64);
	}

	#[test]
	fn test_eth_to_wei_rejects_bad_input() {
		assert_eq!(eth_to_wei(""), Err(UnitError::Empty));
		assert_eq!(eth_to_wei("1,5"), Err(UnitError::InvalidDigit(",".to_string())));
		assert_eq!(eth_to_wei("-1"), Err(UnitError::InvalidDigit("-".to_string())));
		assert_eq!(
			eth_to_wei("0.0000000000000000001"),
			Err(UnitError::TooPrecise(ETHER_DECIMALS))
		);
		assert_eq!(eth_to_wei(&"9".repeat(80)), Err(UnitError::Overflow));
	}

	#[test]
	fn test_gwei_to_wei_appends_nine_zeros() {
		assert_eq!(gwei_to_wei(U256::zero()), Some(U256::zero()));
		assert_eq!(gwei_to_wei(U256::from(40u64)), Some(U256::from(40_000_000_000u64)));
		assert_eq!(
			gwei_to_wei(U256::from(123_456u64)).map(|w| w.to_string()),
			Some("123456000000000".to_string())
		);
		assert_eq!(gwei_to_wei(U256::MAX), None);
	}
}
