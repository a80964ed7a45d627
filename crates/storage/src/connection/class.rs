use anyhow::Context;
use lantern_common::class_definition::Cairo;
use lantern_common::ClassHash;

use crate::prelude::*;

/// Definitions are large json documents which compress well.
const COMPRESSION_LEVEL: i32 = 10;

impl Transaction<'_> {
    /// Validates and stores a class definition. Storing a hash a second time
    /// keeps the first definition.
    pub fn insert_cairo_class_definition(
        &self,
        class_hash: ClassHash,
        definition: &[u8],
    ) -> anyhow::Result<()> {
        Cairo::from_json(definition)
            .with_context(|| format!("Invalid definition for class {class_hash}"))?;

        let compressed = zstd::bulk::compress(definition, COMPRESSION_LEVEL)
            .with_context(|| format!("Compressing definition of class {class_hash}"))?;

        self.inner()
            .execute(
                "INSERT OR IGNORE INTO class_definitions (hash, definition) VALUES (?, ?)",
                params![&class_hash, &compressed],
            )
            .with_context(|| format!("Storing definition of class {class_hash}"))?;

        Ok(())
    }

    /// The definition as it was stored, or `None` for an unknown class.
    pub fn class_definition(&self, class_hash: ClassHash) -> anyhow::Result<Option<Vec<u8>>> {
        let compressed: Option<Vec<u8>> = self
            .inner()
            .prepare_cached("SELECT definition FROM class_definitions WHERE hash = ?")
            .context("Preparing class definition query")?
            .query_row(params![&class_hash], |row| row.get_blob(0).map(<[u8]>::to_vec))
            .optional()
            .with_context(|| format!("Loading definition of class {class_hash}"))?;

        compressed
            .map(|compressed| zstd::decode_all(compressed.as_slice()))
            .transpose()
            .with_context(|| format!("Decompressing definition of class {class_hash}"))
    }

    pub fn class_definition_exists(&self, class_hash: ClassHash) -> anyhow::Result<bool> {
        self.inner()
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM class_definitions WHERE hash = ?)")
            .context("Preparing class existence query")?
            .query_row(params![&class_hash], |row| row.get(0))
            .with_context(|| format!("Checking whether class {class_hash} exists"))
    }
}
