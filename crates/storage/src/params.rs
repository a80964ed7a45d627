//! Binding and reading our felt newtypes as sqlite blobs.
//!
//! The newtypes live in `lantern-common`, so the orphan rule keeps us from
//! implementing rusqlite's traits for them directly. [ToSql] and [RowExt]
//! stand in, together with the [params!](crate::params!) and
//! [named_params!](crate::named_params!) macros which bind through them.
use lantern_common::{ClassHash, ContractAddress, Felt};
use rusqlite::types::{FromSqlError, ToSqlOutput, ValueRef};
use rusqlite::RowIndex;

pub trait ToSql {
    fn to_sql(&self) -> ToSqlOutput<'_>;
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Borrowed(ValueRef::Blob(self))
    }
}

impl ToSql for &[u8] {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Borrowed(ValueRef::Blob(self))
    }
}

/// Felts are stored as their 32 big-endian bytes.
macro_rules! felt_blob {
    ($($target:ty),+ $(,)?) => {
        $(
            impl ToSql for $target {
                fn to_sql(&self) -> ToSqlOutput<'_> {
                    ToSqlOutput::Borrowed(ValueRef::Blob(self.as_inner().as_be_bytes()))
                }
            }
        )+
    };
}

felt_blob!(ClassHash, ContractAddress);

pub trait RowExt {
    fn get_blob<I: RowIndex>(&self, index: I) -> rusqlite::Result<&[u8]>;

    fn get_felt<I: RowIndex>(&self, index: I) -> rusqlite::Result<Felt> {
        Felt::from_be_slice(self.get_blob(index)?)
            .map_err(|e| FromSqlError::Other(Box::new(e)).into())
    }

    fn get_class_hash<I: RowIndex>(&self, index: I) -> rusqlite::Result<ClassHash> {
        self.get_felt(index).map(ClassHash)
    }
}

impl RowExt for &rusqlite::Row<'_> {
    fn get_blob<I: RowIndex>(&self, index: I) -> rusqlite::Result<&[u8]> {
        Ok(self.get_ref(index)?.as_blob()?)
    }
}

/// [rusqlite::params!] for values implementing our [ToSql].
#[macro_export]
macro_rules! params {
    [] => {
        rusqlite::params![]
    };
    [$($param:expr),+ $(,)?] => {
        rusqlite::params![$(&crate::params::ToSql::to_sql($param)),+]
    };
}

/// [rusqlite::named_params!] for values implementing our [ToSql].
#[macro_export]
macro_rules! named_params {
    () => {
        rusqlite::named_params![]
    };
    ($($param_name:literal: $param_val:expr),+ $(,)?) => {
        rusqlite::named_params![$($param_name: crate::params::ToSql::to_sql($param_val)),+]
    };
}
