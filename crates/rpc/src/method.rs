pub mod call;
pub mod get_class;
pub mod get_class_at;
pub mod get_class_hash_at;

pub use call::call;
pub use get_class::get_class;
pub use get_class_at::get_class_at;
pub use get_class_hash_at::get_class_hash_at;

use crate::jsonrpc::{RpcRouter, RpcRouterBuilder};

/// Registers the query methods served by the node.
pub fn register_routes() -> RpcRouterBuilder {
    RpcRouter::builder()
        .register("starknet_call", call)
        .register("starknet_getClass", get_class)
        .register("starknet_getClassAt", get_class_at)
        .register("starknet_getClassHashAt", get_class_hash_at)
}
