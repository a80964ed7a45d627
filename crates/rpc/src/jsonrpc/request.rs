use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::jsonrpc::{RequestId, RpcError};

/// A single JSON-RPC 2.0 request whose params are left unparsed until the
/// method is known.
#[derive(Debug)]
pub struct RpcRequest<'a> {
    pub method: Cow<'a, str>,
    pub params: RawParams<'a>,
    pub id: RequestId,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawParams<'a>(#[serde(borrow)] pub Option<&'a RawValue>);

impl<'a> RawParams<'a> {
    /// Parses the params as `T`. Both the by-name (object) and by-position
    /// (array) forms are accepted as long as `T` derives [Deserialize].
    pub fn deserialize<T: Deserialize<'a>>(&self) -> Result<T, RpcError> {
        let json = self.0.map(RawValue::get).unwrap_or_default();
        serde_json::from_str(json).map_err(|e| RpcError::InvalidParams(e.to_string()))
    }
}

/// Tells a missing `id` member apart from an explicit `null`, which serde
/// would otherwise both turn into `None`.
#[derive(Default)]
enum IdMember {
    #[default]
    Missing,
    Present(Value),
}

impl<'de> Deserialize<'de> for IdMember {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(IdMember::Present)
    }
}

impl TryFrom<IdMember> for RequestId {
    type Error = &'static str;

    // Numbers arrive as plain values since arbitrary precision numbers do
    // not survive an untagged enum.
    fn try_from(member: IdMember) -> Result<Self, Self::Error> {
        let value = match member {
            IdMember::Missing => return Ok(RequestId::Notification),
            IdMember::Present(value) => value,
        };

        match value {
            Value::Null => Ok(RequestId::Null),
            Value::String(s) => Ok(RequestId::String(s)),
            Value::Number(n) => n
                .as_i64()
                .map(RequestId::Number)
                .ok_or("id must be an integer"),
            _ => Err("id must be a number, string or null"),
        }
    }
}

impl<'de> Deserialize<'de> for RpcRequest<'de> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct Envelope<'a> {
            #[serde(borrow)]
            jsonrpc: Cow<'a, str>,
            #[serde(default)]
            id: IdMember,
            #[serde(borrow)]
            method: Cow<'a, str>,
            #[serde(default, borrow)]
            params: RawParams<'a>,
        }

        let envelope = Envelope::deserialize(deserializer)?;

        if envelope.jsonrpc != "2.0" {
            return Err(D::Error::custom("Jsonrpc version must be 2.0"));
        }

        Ok(Self {
            id: RequestId::try_from(envelope.id).map_err(D::Error::custom)?,
            method: envelope.method,
            params: envelope.params,
        })
    }
}
