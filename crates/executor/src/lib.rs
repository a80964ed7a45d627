pub(crate) mod call;
pub(crate) mod engine;
pub(crate) mod entry_point;
pub(crate) mod error;
pub mod external;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use call::ExecutionAdapter;
pub use engine::{EntryPointCall, ExecutionEngine, UnavailableEngine};
pub use entry_point::{resolve, ResolvedEntryPoint};
pub use error::{CallError, EngineFailure};
