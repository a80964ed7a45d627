use std::collections::HashMap;
use std::sync::Arc;

use lantern_common::{CallParam, CallResultValue, ContractAddress, EntryPoint};

use crate::engine::{EntryPointCall, ExecutionEngine};
use crate::error::EngineFailure;

type Script =
    Arc<dyn Fn(&[CallParam]) -> Result<Vec<CallResultValue>, EngineFailure> + Send + Sync>;

/// An engine whose behaviour is scripted per contract and selector.
///
/// Calls to an unscripted contract fail with [EngineFailure::NoSuchContract]
/// and unscripted selectors with [EngineFailure::InvalidEntryPoint].
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<(ContractAddress, EntryPoint), Script>,
}

impl ScriptedEngine {
    pub fn with<F>(mut self, contract_address: ContractAddress, selector: EntryPoint, f: F) -> Self
    where
        F: Fn(&[CallParam]) -> Result<Vec<CallResultValue>, EngineFailure> + Send + Sync + 'static,
    {
        self.scripts
            .insert((contract_address, selector), Arc::new(f));
        self
    }
}

#[async_trait::async_trait]
impl ExecutionEngine for ScriptedEngine {
    async fn run(&self, call: EntryPointCall) -> Result<Vec<CallResultValue>, EngineFailure> {
        match self
            .scripts
            .get(&(call.contract_address, call.entry_point.selector))
        {
            Some(script) => script(&call.calldata),
            None if self
                .scripts
                .keys()
                .any(|(address, _)| address == &call.contract_address) =>
            {
                Err(EngineFailure::InvalidEntryPoint)
            }
            None => Err(EngineFailure::NoSuchContract),
        }
    }
}
