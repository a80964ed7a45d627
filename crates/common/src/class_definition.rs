//! Cairo class definitions as they are stored and served.
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_with::serde_as;

use crate::{ByteCodeOffset, EntryPoint, Felt};

#[derive(Debug, Deserialize, Serialize)]
pub struct Cairo<'a> {
    /// Contract ABI, which has no schema definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Cow<'a, RawValue>>,

    /// Main program definition. __We assume that this is valid JSON.__
    pub program: Cow<'a, RawValue>,

    /// The contract entry points.
    pub entry_points_by_type: CairoEntryPoints,
}

impl<'a> Cairo<'a> {
    /// Parses a stored definition, checking the entry point tables.
    pub fn from_json(definition: &'a [u8]) -> Result<Self, ClassDefinitionError> {
        let class: Self = serde_json::from_slice(definition)?;
        class.entry_points_by_type.validate()?;
        Ok(class)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassDefinitionError {
    #[error("Invalid class definition JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{ty} entry point offsets are not in ascending order")]
    UnorderedOffsets { ty: EntryPointType },
    #[error("Duplicate {ty} entry point selector {selector}")]
    DuplicateSelector {
        ty: EntryPointType,
        selector: EntryPoint,
    },
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CairoEntryPoints {
    #[serde(rename = "EXTERNAL", default)]
    pub external: Vec<SelectorAndOffset>,
    #[serde(rename = "L1_HANDLER", default)]
    pub l1_handler: Vec<SelectorAndOffset>,
    #[serde(rename = "CONSTRUCTOR", default)]
    pub constructor: Vec<SelectorAndOffset>,
}

impl CairoEntryPoints {
    pub fn of_type(&self, ty: EntryPointType) -> &[SelectorAndOffset] {
        match ty {
            EntryPointType::External => &self.external,
            EntryPointType::L1Handler => &self.l1_handler,
            EntryPointType::Constructor => &self.constructor,
        }
    }

    /// Each table must have unique selectors and non-decreasing offsets.
    pub fn validate(&self) -> Result<(), ClassDefinitionError> {
        for ty in [
            EntryPointType::External,
            EntryPointType::L1Handler,
            EntryPointType::Constructor,
        ] {
            let entries = self.of_type(ty);

            if entries.windows(2).any(|w| w[0].offset > w[1].offset) {
                return Err(ClassDefinitionError::UnorderedOffsets { ty });
            }

            let mut seen = HashSet::with_capacity(entries.len());
            if let Some(duplicate) = entries.iter().find(|e| !seen.insert(e.selector)) {
                return Err(ClassDefinitionError::DuplicateSelector {
                    ty,
                    selector: duplicate.selector,
                });
            }
        }

        Ok(())
    }
}

#[derive(Copy, Clone, Debug, serde::Deserialize, serde::Serialize, PartialEq, Hash, Eq)]
#[serde(deny_unknown_fields)]
pub enum EntryPointType {
    #[serde(rename = "EXTERNAL")]
    External,
    #[serde(rename = "L1_HANDLER")]
    L1Handler,
    #[serde(rename = "CONSTRUCTOR")]
    Constructor,
}

impl fmt::Display for EntryPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EntryPointType::*;
        f.pad(match self {
            External => "EXTERNAL",
            L1Handler => "L1_HANDLER",
            Constructor => "CONSTRUCTOR",
        })
    }
}

#[serde_as]
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SelectorAndOffset {
    pub selector: EntryPoint,
    #[serde_as(as = "OffsetSerde")]
    pub offset: ByteCodeOffset,
}

/// Offsets appear either as hex strings or as plain integers.
pub struct OffsetSerde;

impl serde_with::SerializeAs<ByteCodeOffset> for OffsetSerde {
    fn serialize_as<S>(source: &ByteCodeOffset, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Felt::serialize(&source.0, serializer)
    }
}

impl<'de> serde_with::DeserializeAs<'de, ByteCodeOffset> for OffsetSerde {
    fn deserialize_as<D>(deserializer: D) -> Result<ByteCodeOffset, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // Going through Value keeps integers intact under arbitrary precision.
        let offset = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(hex) => Felt::from_hex_str(&hex).map_err(D::Error::custom)?,
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(Felt::from_u64)
                .ok_or_else(|| D::Error::custom("offset is not an unsigned integer"))?,
            other => {
                return Err(D::Error::custom(format!(
                    "expected an offset, got {other}"
                )))
            }
        };
        Ok(ByteCodeOffset(offset))
    }
}
