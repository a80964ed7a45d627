//! Shape validation of `starknet_call` calldata.
//!
//! Only the encoding is checked here. Whether the values make sense for the
//! called entry point is up to the engine.
use lantern_common::{codec, CallParam, Felt};
use serde_json::Value;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCalldata {
    #[error("Calldata element {index} is not a string")]
    NotAString { index: usize },
    #[error("Calldata element {index} is not a field element: {reason}")]
    NotAFelt { index: usize, reason: String },
}

/// Converts every element into a [CallParam].
///
/// Elements must be JSON strings holding either a `0x` prefixed hex numeral
/// of at most 64 digits or a decimal numeral. Both must be below the field
/// modulus.
pub fn validate(calldata: &[Value]) -> Result<Vec<CallParam>, InvalidCalldata> {
    calldata
        .iter()
        .enumerate()
        .map(|(index, element)| {
            let Value::String(element) = element else {
                return Err(InvalidCalldata::NotAString { index });
            };

            parse_element(element)
                .map(CallParam)
                .map_err(|reason| InvalidCalldata::NotAFelt { index, reason })
        })
        .collect()
}

fn parse_element(element: &str) -> Result<Felt, String> {
    if element.starts_with("0x") || element.starts_with("0X") {
        codec::normalize(element).map_err(|e| e.source.to_string())
    } else {
        Felt::from_decimal_str(element).map_err(|e| e.to_string())
    }
}
