mod base;

mod revision_0002;

pub(crate) use base::base_schema;

type MigrationFn = fn(&rusqlite::Transaction<'_>) -> anyhow::Result<()>;

/// The full list of migrations applied on top of the base schema.
pub fn migrations() -> &'static [MigrationFn] {
    MIGRATIONS
}

/// The revision created by the [base schema](base::base_schema).
pub(crate) const BASE_SCHEMA_REVISION: usize = 1;

const MIGRATIONS: &[MigrationFn] = &[revision_0002::migrate];
