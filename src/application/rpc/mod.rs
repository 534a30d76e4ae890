//! Typed RPC 层
//!
//! - error: 错误码与错误结构
//! - transformer: 富类型线格式
//! - router: 过程注册与调用
//! - middleware: 认证门

pub mod error;
pub mod middleware;
pub mod router;
pub mod transformer;

pub use error::{RpcError, RpcErrorCode, NOT_AUTHENTICATED};
pub use middleware::require_auth;
pub use router::{
    Procedure, ProcedureKind, ProtectedCall, PublicCall, RouterBuildError, RouterBuilder,
    RpcRouter, Tier,
};
pub use transformer::{decode, encode, IntoRpcValue, RpcValue, TransformError};
