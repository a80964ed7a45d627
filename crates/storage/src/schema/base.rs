use anyhow::Context;

/// Creates the class and contract tables.
pub(crate) fn base_schema(tx: &rusqlite::Transaction<'_>) -> anyhow::Result<()> {
    tx.execute_batch(
        r"
CREATE TABLE class_definitions (
    hash       BLOB PRIMARY KEY NOT NULL,
    definition BLOB NOT NULL
);

CREATE TABLE contracts (
    address    BLOB PRIMARY KEY NOT NULL,
    class_hash BLOB NOT NULL REFERENCES class_definitions(hash)
);",
    )
    .context("Creating class and contract tables")
}
