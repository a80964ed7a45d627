use std::sync::Arc;

use lantern_common::CallResultValue;

use crate::engine::{EntryPointCall, ExecutionEngine};
use crate::error::CallError;

/// Runs resolved calls on the configured [ExecutionEngine] and translates
/// its failures into [CallError]s.
#[derive(Clone)]
pub struct ExecutionAdapter {
    engine: Arc<dyn ExecutionEngine>,
}

impl ExecutionAdapter {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self, call: EntryPointCall) -> Result<Vec<CallResultValue>, CallError> {
        let contract_address = call.contract_address;
        let selector = call.entry_point.selector;

        match self.engine.run(call).await {
            Ok(output) => {
                tracing::trace!(%contract_address, %selector, values=%output.len(), "Call succeeded");
                Ok(output)
            }
            Err(failure) => {
                tracing::debug!(%contract_address, %selector, ?failure, "Call failed");
                Err(failure.into())
            }
        }
    }
}

impl std::fmt::Debug for ExecutionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionAdapter").finish_non_exhaustive()
    }
}
