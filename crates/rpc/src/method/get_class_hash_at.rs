use anyhow::Context;
use lantern_common::{codec, ClassHash, ContractAddress};
use serde::Deserialize;

use crate::context::RpcContext;
use crate::felt::RpcFelt;

crate::error::generate_rpc_error_subset!(Error: ContractNotFound);

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Input {
    contract_address: String,
}

#[serde_with::serde_as]
#[derive(Debug, serde::Serialize, PartialEq, Eq)]
pub struct Output(#[serde_as(as = "RpcFelt")] ClassHash);

pub async fn get_class_hash_at(context: RpcContext, input: Input) -> Result<Output, Error> {
    let contract_address = match codec::normalize(&input.contract_address) {
        Ok(address) => ContractAddress(address),
        Err(error) => {
            tracing::debug!(%error, "Malformed contract address");
            return Err(Error::ContractNotFound);
        }
    };

    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || -> Result<Output, Error> {
        let _g = span.enter();
        let mut db = context
            .storage
            .connection()
            .context("Opening database connection")?;

        let tx = db.transaction().context("Creating database transaction")?;

        tx.contract_class_hash(contract_address)
            .context("Fetching class hash from database")?
            .ok_or(Error::ContractNotFound)
            .map(Output)
    })
    .await
    .context("Joining blocking task")?
}
