//! [RpcFelt], the output encoding of field elements in query responses.
//!
//! Fields opt in with `#[serde_as(as = "RpcFelt")]`, or `Vec<RpcFelt>` and
//! friends for containers, via [serde_with::SerializeAs].

use lantern_common::{
    ByteCodeOffset,
    CallParam,
    CallResultValue,
    ClassHash,
    ContractAddress,
    EntryPoint,
    Felt,
};

/// Serializes as `0x0` followed by the minimal lowercase hex digits, so
/// `0x45` is written as `0x045` and zero as `0x00`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcFelt(pub Felt);

impl From<Felt> for RpcFelt {
    fn from(value: Felt) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for RpcFelt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let minimal = self.0.to_hex_str();
        write!(f, "0x0{}", &minimal[2..])
    }
}

impl serde::Serialize for RpcFelt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<T: Into<RpcFelt> + Clone> serde_with::SerializeAs<T> for RpcFelt {
    fn serialize_as<S: serde::Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.clone().into())
    }
}

macro_rules! newtype_into_rpc_felt {
    ($($newtype:ident),+ $(,)?) => {
        $(
            impl From<$newtype> for RpcFelt {
                fn from(value: $newtype) -> Self {
                    RpcFelt(value.0)
                }
            }
        )+
    };
}

newtype_into_rpc_felt!(
    ByteCodeOffset,
    CallParam,
    CallResultValue,
    ClassHash,
    ContractAddress,
    EntryPoint,
);
