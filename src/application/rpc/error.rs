//! RPC 错误定义
//!
//! 错误码与 JSON-RPC 数值码、HTTP 状态码一一对应。
//! UNAUTHORIZED 是本层唯一自行产生的领域错误，其余错误由协作方产生后原样透传。

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::application::ports::RepositoryError;

/// 认证失败的固定消息
pub const NOT_AUTHENTICATED: &str = "Not authenticated";

/// RPC 错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorCode {
    ParseError,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotSupported,
    Timeout,
    Conflict,
    PreconditionFailed,
    PayloadTooLarge,
    UnprocessableContent,
    TooManyRequests,
    InternalServerError,
}

impl RpcErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorCode::ParseError => "PARSE_ERROR",
            RpcErrorCode::BadRequest => "BAD_REQUEST",
            RpcErrorCode::Unauthorized => "UNAUTHORIZED",
            RpcErrorCode::Forbidden => "FORBIDDEN",
            RpcErrorCode::NotFound => "NOT_FOUND",
            RpcErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            RpcErrorCode::Timeout => "TIMEOUT",
            RpcErrorCode::Conflict => "CONFLICT",
            RpcErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            RpcErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            RpcErrorCode::UnprocessableContent => "UNPROCESSABLE_CONTENT",
            RpcErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
            RpcErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// JSON-RPC 2.0 数值码
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            RpcErrorCode::ParseError => -32700,
            RpcErrorCode::BadRequest => -32600,
            RpcErrorCode::InternalServerError => -32603,
            RpcErrorCode::Unauthorized => -32001,
            RpcErrorCode::Forbidden => -32003,
            RpcErrorCode::NotFound => -32004,
            RpcErrorCode::MethodNotSupported => -32005,
            RpcErrorCode::Timeout => -32008,
            RpcErrorCode::Conflict => -32009,
            RpcErrorCode::PreconditionFailed => -32012,
            RpcErrorCode::PayloadTooLarge => -32013,
            RpcErrorCode::UnprocessableContent => -32022,
            RpcErrorCode::TooManyRequests => -32029,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            RpcErrorCode::ParseError => 400,
            RpcErrorCode::BadRequest => 400,
            RpcErrorCode::Unauthorized => 401,
            RpcErrorCode::Forbidden => 403,
            RpcErrorCode::NotFound => 404,
            RpcErrorCode::MethodNotSupported => 405,
            RpcErrorCode::Timeout => 408,
            RpcErrorCode::Conflict => 409,
            RpcErrorCode::PreconditionFailed => 412,
            RpcErrorCode::PayloadTooLarge => 413,
            RpcErrorCode::UnprocessableContent => 422,
            RpcErrorCode::TooManyRequests => 429,
            RpcErrorCode::InternalServerError => 500,
        }
    }
}

/// RPC 错误
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{code:?}: {message}")]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(RpcErrorCode::Unauthorized, NOT_AUTHENTICATED)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::NotFound, message)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::ParseError, message)
    }

    pub fn method_not_supported(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::MethodNotSupported, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InternalServerError, message)
    }

    /// 生成返回给调用方的错误结构
    ///
    /// `{ message, code, data: { code, httpStatus, path } }`
    pub fn shape(&self, path: Option<&str>) -> Value {
        json!({
            "message": self.message,
            "code": self.code.json_rpc_code(),
            "data": {
                "code": self.code.as_str(),
                "httpStatus": self.code.http_status(),
                "path": path,
            }
        })
    }
}

impl From<RepositoryError> for RpcError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(msg) => RpcError::not_found(msg),
            RepositoryError::Duplicate(msg) => RpcError::new(RpcErrorCode::Conflict, msg),
            RepositoryError::DatabaseError(msg) | RepositoryError::SerializationError(msg) => {
                RpcError::internal(msg)
            }
        }
    }
}
