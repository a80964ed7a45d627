mod class;
mod contract;

type PooledConnection = r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>;

/// A connection borrowed from a [Storage](crate::Storage) pool.
pub struct Connection(PooledConnection);

impl Connection {
    pub(crate) fn from_inner(inner: PooledConnection) -> Self {
        Self(inner)
    }

    /// Every query runs inside a transaction. Dropping it without
    /// [Transaction::commit] rolls back.
    pub fn transaction(&mut self) -> anyhow::Result<Transaction<'_>> {
        use anyhow::Context;

        self.0
            .transaction()
            .map(Transaction)
            .context("Beginning database transaction")
    }
}

/// The class and contract queries are implemented on this type.
pub struct Transaction<'tx>(rusqlite::Transaction<'tx>);

impl Transaction<'_> {
    pub(crate) fn inner(&self) -> &rusqlite::Connection {
        &self.0
    }

    pub fn commit(self) -> anyhow::Result<()> {
        use anyhow::Context;

        self.0.commit().context("Committing database transaction")
    }
}
