//! Data Transfer Objects
//!
//! RPC 响应信封与非 RPC 路由的统一响应结构

use serde::Serialize;
use serde_json::{json, Value};

use crate::application::rpc::{encode, RpcError, RpcValue};

// ============================================================================
// RPC 响应信封
// ============================================================================

/// 成功：`{ "result": { "data": <transformed> } }`
pub fn rpc_success(value: &RpcValue) -> Value {
    json!({ "result": { "data": encode(value) } })
}

/// 失败：`{ "error": <transformed shape> }`
///
/// 错误结构同样经过 transformer，客户端用同一套解码逻辑处理
pub fn rpc_error(error: &RpcError, path: Option<&str>) -> Value {
    json!({ "error": encode(&RpcValue::from_plain(error.shape(path))) })
}

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}
