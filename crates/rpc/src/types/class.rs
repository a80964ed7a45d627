use std::io::Write;

use anyhow::Context;
use lantern_common::class_definition::{Cairo, CairoEntryPoints, SelectorAndOffset};
use lantern_common::{ByteCodeOffset, EntryPoint};
use serde::Serialize;

use crate::felt::RpcFelt;

/// A class definition as served by `starknet_getClass` and
/// `starknet_getClassAt`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ContractClass {
    /// Base64 encoded, gzip compressed program JSON.
    pub program: String,
    pub entry_points_by_type: ContractEntryPoints,
}

impl ContractClass {
    /// Converts a stored class definition into its RPC form.
    pub fn from_definition_bytes(data: &[u8]) -> anyhow::Result<ContractClass> {
        let class = Cairo::from_json(data).context("Parsing class definition")?;

        // Program is expected to be a gzip-compressed then base64 encoded representation of the JSON.
        let mut gzip_encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        gzip_encoder
            .write_all(class.program.get().as_bytes())
            .context("Compressing program")?;
        let compressed_program = gzip_encoder
            .finish()
            .context("Finalizing program compression")?;
        let program = base64::encode(compressed_program);

        Ok(ContractClass {
            program,
            entry_points_by_type: ContractEntryPoints::from(&class.entry_points_by_type),
        })
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ContractEntryPoints {
    pub constructor: Vec<ContractEntryPoint>,
    pub external: Vec<ContractEntryPoint>,
    pub l1_handler: Vec<ContractEntryPoint>,
}

impl From<&CairoEntryPoints> for ContractEntryPoints {
    fn from(value: &CairoEntryPoints) -> Self {
        let convert = |entries: &[SelectorAndOffset]| {
            entries
                .iter()
                .map(|entry| ContractEntryPoint {
                    offset: entry.offset,
                    selector: entry.selector,
                })
                .collect()
        };

        Self {
            constructor: convert(&value.constructor),
            external: convert(&value.external),
            l1_handler: convert(&value.l1_handler),
        }
    }
}

#[serde_with::serde_as]
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ContractEntryPoint {
    #[serde_as(as = "RpcFelt")]
    pub offset: ByteCodeOffset,
    #[serde_as(as = "RpcFelt")]
    pub selector: EntryPoint,
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use pretty_assertions_sorted::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_utils::BALANCE_CONTRACT_DEFINITION;

    #[test]
    fn entry_points_use_rpc_felts() {
        let class = ContractClass::from_definition_bytes(BALANCE_CONTRACT_DEFINITION).unwrap();

        let entry_points = serde_json::to_value(&class.entry_points_by_type).unwrap();

        let expected = json!({
            "CONSTRUCTOR": [
                {
                    "offset": "0x035",
                    "selector": "0x028ffe4ff0f226a9107253e17a904099aa4f63a02a5621de0576e5aa71bc5194"
                }
            ],
            "EXTERNAL": [
                {
                    "offset": "0x054",
                    "selector": "0x0362398bec32bc0ebb411203221a35a0301193a96f317ebe5e40be9f60d15320"
                },
                {
                    "offset": "0x076",
                    "selector": "0x039e11d48192e4333233c7eb19d10ad67c362bb28580c604d67884c85da39695"
                },
                {
                    "offset": "0x0a1",
                    "selector": "0x03cd0a5d52a5573221431e4a61c6bdffd7f157bd278be73f332f0b10f12d895b"
                }
            ],
            "L1_HANDLER": []
        });
        assert_eq!(entry_points, expected);
    }

    #[test]
    fn program_is_compressed_json() {
        let class = ContractClass::from_definition_bytes(BALANCE_CONTRACT_DEFINITION).unwrap();

        let compressed = base64::decode(&class.program).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut program = String::new();
        decoder.read_to_string(&mut program).unwrap();

        let program = serde_json::from_str::<serde_json::Value>(&program).unwrap();
        let definition =
            serde_json::from_slice::<serde_json::Value>(BALANCE_CONTRACT_DEFINITION).unwrap();
        assert_eq!(program, definition["program"]);
    }

    #[test]
    fn output_has_no_abi() {
        let class = ContractClass::from_definition_bytes(BALANCE_CONTRACT_DEFINITION).unwrap();

        let json = serde_json::to_value(class).unwrap();

        let mut keys = json.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec!["entry_points_by_type", "program"]);
    }

    #[test]
    fn invalid_definition() {
        ContractClass::from_definition_bytes(br#"{"program": {}}"#).unwrap_err();
    }
}
