//! Field elements and the typed wrappers shared by the storage, executor and
//! RPC crates.
use serde::{Deserialize, Serialize};

pub mod class_definition;
pub mod codec;
mod felt;
mod macros;

pub use felt::{DecimalParseError, Felt, HexParseError, OverflowError};

macros::felt_newtypes!(
    BlockHash,
    ByteCodeOffset,
    CallParam,
    CallResultValue,
    ClassHash,
    ContractAddress,
    EntryPoint,
);

impl EntryPoint {
    /// The selector of a function name: its keccak256 digest masked to 250
    /// bits.
    pub fn hashed(name: &[u8]) -> Self {
        use sha3::Digest;

        let digest: [u8; 32] = sha3::Keccak256::digest(name).into();
        EntryPoint(Felt::from_masked_be_bytes(digest))
    }

    /// Selector of `constructor`.
    pub const CONSTRUCTOR: Self =
        entry_point!("0x028FFE4FF0F226A9107253E17A904099AA4F63A02A5621DE0576E5AA71BC5194");
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockNumber(pub u64);

/// The block a query is evaluated against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum BlockId {
    #[serde(rename = "block_number")]
    Number(BlockNumber),
    #[serde(rename = "block_hash")]
    Hash(BlockHash),
    #[serde(rename = "latest")]
    Latest,
    #[serde(rename = "pending")]
    Pending,
}

impl BlockId {
    pub fn is_latest(&self) -> bool {
        matches!(self, BlockId::Latest)
    }
}

/// Origins allowed to make cross-origin requests to the RPC server.
#[derive(Clone, Debug, PartialEq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl<S: ToString> From<S> for AllowedOrigins {
    fn from(origin: S) -> Self {
        match origin.to_string() {
            any if any == "*" => Self::Any,
            origin => Self::List(vec![origin]),
        }
    }
}
