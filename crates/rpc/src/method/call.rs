use anyhow::Context;
use lantern_common::class_definition::{Cairo, CairoEntryPoints, EntryPointType};
use lantern_common::{codec, BlockId, CallResultValue, ClassHash, ContractAddress, EntryPoint};
use lantern_executor::EntryPointCall;
use serde::Deserialize;
use serde_json::Value;

use crate::calldata;
use crate::context::RpcContext;
use crate::error::{ApplicationError, TransactionFailure};
use crate::felt::RpcFelt;

#[derive(Debug)]
pub enum CallError {
    Internal(anyhow::Error),
    ContractNotFound,
    InvalidMessageSelector,
    InvalidCallData,
    TransactionError(TransactionFailure),
}

impl From<anyhow::Error> for CallError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}

impl From<lantern_executor::CallError> for CallError {
    fn from(value: lantern_executor::CallError) -> Self {
        use lantern_executor::CallError::*;
        match value {
            ContractNotFound => Self::ContractNotFound,
            InvalidMessageSelector => Self::InvalidMessageSelector,
            ExecutionTrap(message) => {
                Self::TransactionError(TransactionFailure::EngineTrap(message))
            }
            Internal(e) => Self::Internal(e),
        }
    }
}

impl From<CallError> for ApplicationError {
    fn from(value: CallError) -> Self {
        match value {
            CallError::ContractNotFound => ApplicationError::ContractNotFound,
            CallError::InvalidMessageSelector => ApplicationError::InvalidMessageSelector,
            CallError::InvalidCallData => ApplicationError::InvalidCallData,
            CallError::TransactionError(reason) => ApplicationError::TransactionError(reason),
            CallError::Internal(e) => ApplicationError::Internal(e),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct Input {
    pub request: FunctionCall,
    /// Kept raw: anything other than `"latest"`, including values which are
    /// not block ids at all, is answered with the same unsupported block
    /// error.
    pub block_id: Value,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub contract_address: String,
    pub entry_point_selector: String,
    pub calldata: Vec<Value>,
}

#[serde_with::serde_as]
#[derive(Debug, serde::Serialize, PartialEq, Eq)]
pub struct Output {
    #[serde_as(as = "Vec<RpcFelt>")]
    pub result: Vec<CallResultValue>,
}

pub async fn call(context: RpcContext, input: Input) -> Result<Output, CallError> {
    let contract_address = contract_address(&input.request.contract_address)?;
    let (class_hash, entry_points) = load_entry_points(&context, contract_address).await?;

    let selector = selector(&input.request.entry_point_selector)?;
    let entry_point =
        lantern_executor::resolve(&entry_points, selector, EntryPointType::External)?;

    let calldata = calldata::validate(&input.request.calldata).map_err(|error| {
        tracing::debug!(%error, "Rejecting calldata");
        CallError::InvalidCallData
    })?;

    ensure_latest(&input.block_id)?;

    let result = context
        .executor
        .execute(EntryPointCall {
            contract_address,
            class_hash,
            entry_point,
            calldata,
        })
        .await?;

    Ok(Output { result })
}

fn contract_address(raw: &str) -> Result<ContractAddress, CallError> {
    codec::normalize(raw).map(ContractAddress).map_err(|error| {
        tracing::debug!(%error, "Malformed contract address");
        CallError::ContractNotFound
    })
}

fn selector(raw: &str) -> Result<EntryPoint, CallError> {
    codec::normalize(raw).map(EntryPoint).map_err(|error| {
        tracing::debug!(%error, "Malformed entry point selector");
        CallError::InvalidMessageSelector
    })
}

fn ensure_latest(block_id: &Value) -> Result<(), CallError> {
    match serde_json::from_value::<BlockId>(block_id.clone()) {
        Ok(block_id) if block_id.is_latest() => Ok(()),
        _ => Err(CallError::TransactionError(
            TransactionFailure::UnsupportedBlock,
        )),
    }
}

/// Looks up the deployed class and its entry point tables in a single
/// transaction.
async fn load_entry_points(
    context: &RpcContext,
    contract_address: ContractAddress,
) -> Result<(ClassHash, CairoEntryPoints), CallError> {
    let storage = context.storage.clone();
    let span = tracing::Span::current();

    tokio::task::spawn_blocking(move || -> Result<_, CallError> {
        let _g = span.enter();
        let mut db = storage
            .connection()
            .context("Opening database connection")?;
        let tx = db.transaction().context("Creating database transaction")?;

        let class_hash = tx
            .contract_class_hash(contract_address)
            .context("Fetching class hash")?
            .ok_or(CallError::ContractNotFound)?;

        // Deployments always reference a stored class.
        let definition = tx
            .class_definition(class_hash)
            .context("Fetching class definition")?
            .with_context(|| format!("Class {class_hash} of deployed contract is missing"))?;

        let class = Cairo::from_json(&definition).context("Parsing class definition")?;

        Ok((class_hash, class.entry_points_by_type))
    })
    .await
    .context("Joining blocking task")?
}
