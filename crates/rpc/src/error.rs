//! Application level errors of the query methods and their JSON-RPC codes.
//!
//! Methods declare their own narrower error enums with
//! [generate_rpc_error_subset!].
#![macro_use]

/// The JSON-RPC error variants.
#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error("Contract not found")]
    ContractNotFound,
    #[error("Invalid message selector")]
    InvalidMessageSelector,
    #[error("Invalid call data")]
    InvalidCallData,
    #[error("Class hash not found")]
    ClassHashNotFound,
    #[error("{0}")]
    TransactionError(TransactionFailure),
    /// Logged server side, the caller only sees "Internal error".
    #[error("Internal error")]
    Internal(anyhow::Error),
}

/// Reasons a call was rejected as a failed transaction. All of them share the
/// same error code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionFailure {
    /// The engine's diagnostic, passed through untouched.
    #[error("{0}")]
    EngineTrap(String),
    #[error("Calls with block_id != 'latest' are not supported currently.")]
    UnsupportedBlock,
}

impl ApplicationError {
    pub fn code(&self) -> i32 {
        match self {
            ApplicationError::ContractNotFound => 20,
            ApplicationError::InvalidMessageSelector => 21,
            ApplicationError::InvalidCallData => 22,
            ApplicationError::ClassHashNotFound => 28,
            ApplicationError::TransactionError(_) => -1,
            // https://www.jsonrpc.org/specification#error_object
            ApplicationError::Internal(_) => -32603,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<TransactionFailure> for ApplicationError {
    fn from(value: TransactionFailure) -> Self {
        Self::TransactionError(value)
    }
}

/// Declares a method specific error enum holding a subset of the unit
/// [ApplicationError] variants, plus the `Internal` variant every method can
/// produce.
///
/// ```ignore
/// generate_rpc_error_subset!(Error: ContractNotFound, ClassHashNotFound);
/// ```
///
/// Conversions from [anyhow::Error] (as `Internal`) and into
/// [ApplicationError] are generated alongside the enum.
#[allow(unused_macros)]
macro_rules! generate_rpc_error_subset {
    ($enum_name:ident $(: $($variant:ident),* $(,)?)?) => {
        #[derive(Debug)]
        pub enum $enum_name {
            /// See [`crate::error::ApplicationError::Internal`]
            Internal(anyhow::Error),
            $($($variant,)*)?
        }

        impl From<anyhow::Error> for $enum_name {
            fn from(e: anyhow::Error) -> Self {
                Self::Internal(e)
            }
        }

        impl From<$enum_name> for crate::error::ApplicationError {
            fn from(value: $enum_name) -> Self {
                match value {
                    $($($enum_name::$variant => Self::$variant,)*)?
                    $enum_name::Internal(e) => Self::Internal(e),
                }
            }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use generate_rpc_error_subset;
