use std::num::NonZeroUsize;
use std::sync::Arc;

use lantern_executor::{ExecutionAdapter, ExecutionEngine, UnavailableEngine};
use lantern_storage::Storage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcConfig {
    /// Maximum number of requests of a single batch executed at once.
    pub batch_concurrency_limit: NonZeroUsize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            batch_concurrency_limit: NonZeroUsize::MIN,
        }
    }
}

/// Everything a JSON-RPC method has access to while serving a request.
#[derive(Clone)]
pub struct RpcContext {
    pub storage: Storage,
    pub executor: ExecutionAdapter,
    pub config: RpcConfig,
}

impl RpcContext {
    pub fn new(storage: Storage, executor: ExecutionAdapter, config: RpcConfig) -> Self {
        Self {
            storage,
            executor,
            config,
        }
    }

    /// A context whose calls fail with an internal error since nothing can
    /// execute them.
    pub fn without_engine(storage: Storage, config: RpcConfig) -> Self {
        Self::new(
            storage,
            ExecutionAdapter::new(Arc::new(UnavailableEngine)),
            config,
        )
    }

    pub fn with_engine(self, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            executor: ExecutionAdapter::new(engine),
            ..self
        }
    }

    /// Storage holding the balance contract fixture, served by an engine
    /// scripted to behave like that contract.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let storage = crate::test_utils::setup_storage();
        Self::new(
            storage,
            ExecutionAdapter::new(Arc::new(crate::test_utils::balance_engine())),
            RpcConfig::default(),
        )
    }
}
