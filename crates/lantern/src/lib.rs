//! Start-up helpers of the lantern node.
pub mod import;
