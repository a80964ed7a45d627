use lantern_common::{CallParam, CallResultValue, ClassHash, ContractAddress};

use crate::entry_point::ResolvedEntryPoint;
use crate::error::EngineFailure;

/// Everything an engine needs to run a single read-only call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPointCall {
    pub contract_address: ContractAddress,
    pub class_hash: ClassHash,
    pub entry_point: ResolvedEntryPoint,
    pub calldata: Vec<CallParam>,
}

/// A virtual machine capable of running Cairo entry points.
///
/// Implementations must not persist any state changes made by the call.
#[async_trait::async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn run(&self, call: EntryPointCall) -> Result<Vec<CallResultValue>, EngineFailure>;
}

/// Stands in when no engine has been configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableEngine;

#[async_trait::async_trait]
impl ExecutionEngine for UnavailableEngine {
    async fn run(&self, _call: EntryPointCall) -> Result<Vec<CallResultValue>, EngineFailure> {
        Err(EngineFailure::Internal(anyhow::anyhow!(
            "No execution engine configured"
        )))
    }
}
