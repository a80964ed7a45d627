use anyhow::Context;
use lantern_common::{codec, ClassHash};
use serde::Deserialize;

use crate::context::RpcContext;
use crate::types::class::ContractClass;

crate::error::generate_rpc_error_subset!(Error: ClassHashNotFound);

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Input {
    class_hash: String,
}

pub async fn get_class(context: RpcContext, input: Input) -> Result<ContractClass, Error> {
    let class_hash = match codec::normalize(&input.class_hash) {
        Ok(hash) => ClassHash(hash),
        Err(error) => {
            tracing::debug!(%error, "Malformed class hash");
            return Err(Error::ClassHashNotFound);
        }
    };

    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || -> Result<ContractClass, Error> {
        let _g = span.enter();
        let mut db = context
            .storage
            .connection()
            .context("Opening database connection")?;

        let tx = db.transaction().context("Creating database transaction")?;

        let definition = tx
            .class_definition(class_hash)
            .context("Fetching class definition")?
            .ok_or(Error::ClassHashNotFound)?;

        let class = ContractClass::from_definition_bytes(&definition)
            .with_context(|| format!("Converting class {class_hash}"))?;

        Ok(class)
    })
    .await
    .context("Joining blocking task")?
}
