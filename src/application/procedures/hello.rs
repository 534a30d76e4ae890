//! hello 路由 - 公开过程

use crate::application::rpc::{RouterBuilder, RpcError, RpcValue};

pub fn hello_router() -> RouterBuilder {
    RouterBuilder::new().public_query("world", |call| async move {
        match &call.input {
            RpcValue::String(name) => Ok(format!("Hello {}", name)),
            v if v.is_nullish() => Ok("Hello world".to_string()),
            _ => Err(RpcError::bad_request("Expected input to be a string")),
        }
    })
}
