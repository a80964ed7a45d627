//! Common data types used by the RPC methods.
pub mod class;
