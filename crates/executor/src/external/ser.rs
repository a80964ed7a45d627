//! The json serializable types

use lantern_common::class_definition::EntryPointType;
use lantern_common::{ByteCodeOffset, CallParam, ClassHash, ContractAddress, EntryPoint};

use crate::engine::EntryPointCall;

/// The command we send to the engine loop.
#[derive(serde::Serialize, Debug)]
pub(super) struct ChildCommand<'a> {
    pub command: Verb,
    pub contract_address: &'a ContractAddress,
    pub class_hash: &'a ClassHash,
    pub entry_point_type: EntryPointType,
    pub selector: &'a EntryPoint,
    pub offset: &'a ByteCodeOffset,
    pub calldata: &'a [CallParam],
}

impl<'a> From<&'a EntryPointCall> for ChildCommand<'a> {
    fn from(call: &'a EntryPointCall) -> Self {
        Self {
            command: Verb::Call,
            contract_address: &call.contract_address,
            class_hash: &call.class_hash,
            entry_point_type: call.entry_point.entry_point_type,
            selector: &call.entry_point.selector,
            offset: &call.entry_point.offset,
            calldata: &call.calldata,
        }
    }
}

#[derive(serde::Serialize, Debug)]
pub(super) enum Verb {
    #[serde(rename = "call")]
    Call,
}
