//! Seeding a database from a JSON dump of declared classes and deployed
//! contracts.
//!
//! The dump has the shape
//!
//! ```json
//! {
//!     "classes": [{"class_hash": "0x..", "definition": { .. }}],
//!     "contracts": [{"address": "0x..", "class_hash": "0x.."}]
//! }
//! ```
//!
//! and is written in a single transaction, so either all of it becomes
//! visible or none of it does.
use std::path::Path;

use anyhow::Context;
use lantern_common::{ClassHash, ContractAddress};
use lantern_storage::Storage;
use serde::Deserialize;
use serde_json::value::RawValue;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateDump<'a> {
    #[serde(borrow, default)]
    classes: Vec<DeclaredClass<'a>>,
    #[serde(default)]
    contracts: Vec<DeployedContract>,
}

#[derive(Debug, Deserialize)]
struct DeclaredClass<'a> {
    class_hash: ClassHash,
    #[serde(borrow)]
    definition: &'a RawValue,
}

#[derive(Debug, Deserialize)]
struct DeployedContract {
    address: ContractAddress,
    class_hash: ClassHash,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub classes: usize,
    pub contracts: usize,
}

pub fn import_state(storage: &Storage, path: &Path) -> anyhow::Result<ImportSummary> {
    let dump = std::fs::read(path)
        .with_context(|| format!("Reading state dump {}", path.display()))?;

    let summary = import_slice(storage, &dump)?;

    tracing::info!(
        path=%path.display(),
        classes=%summary.classes,
        contracts=%summary.contracts,
        "State imported"
    );

    Ok(summary)
}

fn import_slice(storage: &Storage, dump: &[u8]) -> anyhow::Result<ImportSummary> {
    let dump: StateDump<'_> = serde_json::from_slice(dump).context("Parsing state dump")?;

    let mut db = storage.connection().context("Opening database connection")?;
    let tx = db.transaction().context("Creating database transaction")?;

    for class in &dump.classes {
        tx.insert_cairo_class_definition(class.class_hash, class.definition.get().as_bytes())
            .with_context(|| format!("Inserting class {}", class.class_hash))?;
    }

    for contract in &dump.contracts {
        tx.insert_contract(contract.address, contract.class_hash)
            .with_context(|| format!("Inserting contract {}", contract.address))?;
    }

    tx.commit().context("Committing state import")?;

    Ok(ImportSummary {
        classes: dump.classes.len(),
        contracts: dump.contracts.len(),
    })
}
