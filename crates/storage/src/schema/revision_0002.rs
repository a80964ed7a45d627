use anyhow::Context;

/// Indexes deployed contracts by class hash.
pub(crate) fn migrate(tx: &rusqlite::Transaction<'_>) -> anyhow::Result<()> {
    tracing::info!("Creating contracts class hash index");

    tx.execute(
        "CREATE INDEX contracts_class_hash ON contracts(class_hash)",
        [],
    )
    .context("Creating contracts_class_hash index")?;

    Ok(())
}
