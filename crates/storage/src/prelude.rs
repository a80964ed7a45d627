//! Imports shared by the query modules.
pub(crate) use rusqlite::OptionalExtension;

pub(crate) use crate::params::RowExt;
pub(crate) use crate::{named_params, params, Transaction};
