//! Normalization of client-supplied identifiers.
//!
//! Clients send addresses, class hashes and selectors as hex strings of any
//! case, with or without leading zeros. Everything that is looked up or
//! compared goes through [normalize] first so that equal values compare equal.
use crate::{Felt, HexParseError};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid address {raw:?}: {source}")]
pub struct InvalidAddress {
    pub raw: String,
    #[source]
    pub source: HexParseError,
}

/// Parses a "0x" prefixed hex identifier into its canonical [Felt].
///
/// The prefix is mandatory and at least one digit must follow it.
pub fn normalize(raw: &str) -> Result<Felt, InvalidAddress> {
    let invalid = |source| InvalidAddress {
        raw: raw.to_owned(),
        source,
    };

    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| invalid(HexParseError::InvalidNibble(raw.bytes().next().unwrap_or(b' '))))?;

    if digits.is_empty() {
        return Err(invalid(HexParseError::InvalidLength {
            max: 64,
            actual: 0,
        }));
    }

    // Felt::from_hex_str would accept a second prefix.
    if let Some(bad) = digits.bytes().find(|b| !b.is_ascii_hexdigit()) {
        return Err(invalid(HexParseError::InvalidNibble(bad)));
    }

    Felt::from_hex_str(digits).map_err(invalid)
}
