//! RPC Router - 过程注册与调用
//!
//! 启动时用 [`RouterBuilder`] 注册全部过程，`build()` 之后得到不可变的
//! [`RpcRouter`]，以 `Arc` 共享给请求处理路径。

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::application::context::RequestContext;
use crate::application::rpc::error::RpcError;
use crate::application::rpc::middleware::require_auth;
use crate::application::rpc::transformer::{IntoRpcValue, RpcValue};
use crate::domain::Identity;

/// 过程类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl ProcedureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 授权层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Public,
    Protected,
}

/// 公开过程的调用参数
pub struct PublicCall {
    pub ctx: Arc<RequestContext>,
    pub input: RpcValue,
}

/// 受保护过程的调用参数，`user` 已通过认证门
pub struct ProtectedCall {
    pub ctx: Arc<RequestContext>,
    pub user: Identity,
    pub input: RpcValue,
}

type HandlerFuture = BoxFuture<'static, Result<RpcValue, RpcError>>;

enum Handler {
    Public(Arc<dyn Fn(PublicCall) -> HandlerFuture + Send + Sync>),
    Protected(Arc<dyn Fn(ProtectedCall) -> HandlerFuture + Send + Sync>),
}

/// 已注册的过程
pub struct Procedure {
    kind: ProcedureKind,
    handler: Handler,
}

impl Procedure {
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn tier(&self) -> Tier {
        match self.handler {
            Handler::Public(_) => Tier::Public,
            Handler::Protected(_) => Tier::Protected,
        }
    }
}

/// 路由构建错误
#[derive(Debug, Error, PartialEq)]
pub enum RouterBuildError {
    #[error("Duplicate procedure path: {0}")]
    DuplicatePath(String),

    #[error("Invalid procedure path: {0:?}")]
    InvalidPath(String),
}

/// 路由构建器
#[derive(Default)]
pub struct RouterBuilder {
    procedures: Vec<(String, Procedure)>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public_query<F, Fut, T>(self, name: &str, f: F) -> Self
    where
        F: Fn(PublicCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: IntoRpcValue,
    {
        self.public(name, ProcedureKind::Query, f)
    }

    pub fn public_mutation<F, Fut, T>(self, name: &str, f: F) -> Self
    where
        F: Fn(PublicCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: IntoRpcValue,
    {
        self.public(name, ProcedureKind::Mutation, f)
    }

    pub fn protected_query<F, Fut, T>(self, name: &str, f: F) -> Self
    where
        F: Fn(ProtectedCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: IntoRpcValue,
    {
        self.protected(name, ProcedureKind::Query, f)
    }

    pub fn protected_mutation<F, Fut, T>(self, name: &str, f: F) -> Self
    where
        F: Fn(ProtectedCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: IntoRpcValue,
    {
        self.protected(name, ProcedureKind::Mutation, f)
    }

    /// 以 `prefix.` 为前缀合并子路由
    pub fn merge(mut self, prefix: &str, other: RouterBuilder) -> Self {
        for (name, procedure) in other.procedures {
            self.procedures.push((format!("{}.{}", prefix, name), procedure));
        }
        self
    }

    pub fn build(self) -> Result<RpcRouter, RouterBuildError> {
        let mut procedures = HashMap::with_capacity(self.procedures.len());
        for (path, procedure) in self.procedures {
            if !is_valid_path(&path) {
                return Err(RouterBuildError::InvalidPath(path));
            }
            if procedures.contains_key(&path) {
                return Err(RouterBuildError::DuplicatePath(path));
            }
            procedures.insert(path, procedure);
        }
        Ok(RpcRouter { procedures })
    }

    fn public<F, Fut, T>(mut self, name: &str, kind: ProcedureKind, f: F) -> Self
    where
        F: Fn(PublicCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: IntoRpcValue,
    {
        let handler = Handler::Public(Arc::new(move |call: PublicCall| -> HandlerFuture {
            let fut = f(call);
            Box::pin(async move { fut.await.map(IntoRpcValue::into_rpc_value) })
        }));
        self.procedures
            .push((name.to_string(), Procedure { kind, handler }));
        self
    }

    fn protected<F, Fut, T>(mut self, name: &str, kind: ProcedureKind, f: F) -> Self
    where
        F: Fn(ProtectedCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: IntoRpcValue,
    {
        let handler = Handler::Protected(Arc::new(move |call: ProtectedCall| -> HandlerFuture {
            let fut = f(call);
            Box::pin(async move { fut.await.map(IntoRpcValue::into_rpc_value) })
        }));
        self.procedures
            .push((name.to_string(), Procedure { kind, handler }));
        self
    }
}

/// 路径由非空段组成，段之间用 `.` 分隔；`,` 保留给批量调用
fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('.')
            .all(|seg| !seg.is_empty() && !seg.contains([',', '/']) && !seg.contains(char::is_whitespace))
}

/// 不可变的过程路由表
pub struct RpcRouter {
    procedures: HashMap<String, Procedure>,
}

impl RpcRouter {
    pub fn get(&self, path: &str) -> Option<&Procedure> {
        self.procedures.get(path)
    }

    /// 已注册的路径（排序后）
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.procedures.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// 调用过程
    ///
    /// 顺序固定：查找过程 → 认证门（受保护过程）→ 处理器
    pub async fn call(
        &self,
        path: &str,
        kind: ProcedureKind,
        ctx: Arc<RequestContext>,
        input: RpcValue,
    ) -> Result<RpcValue, RpcError> {
        let procedure = self.procedures.get(path).ok_or_else(|| {
            RpcError::not_found(format!("No \"{}\"-procedure on path \"{}\"", kind, path))
        })?;

        if procedure.kind != kind {
            return Err(RpcError::method_not_supported(format!(
                "Unsupported {} call to {} procedure at path \"{}\"",
                kind, procedure.kind, path
            )));
        }

        match &procedure.handler {
            Handler::Public(handler) => handler(PublicCall { ctx, input }).await,
            Handler::Protected(handler) => {
                let user = require_auth(&ctx.auth)?;
                handler(ProtectedCall { ctx, user, input }).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::rpc::error::RpcErrorCode;
    use crate::config::Bindings;
    use crate::domain::Auth;
    use crate::infrastructure::memory::{InMemorySessionStore, InMemoryUserRepository};
    use crate::application::context::ResponseHeaders;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(auth: Auth) -> Arc<RequestContext> {
        Arc::new(RequestContext {
            auth,
            bindings: Arc::new(Bindings::default()),
            users: Arc::new(InMemoryUserRepository::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            response_headers: ResponseHeaders::new(),
        })
    }

    fn counting_router(hits: Arc<AtomicUsize>) -> RpcRouter {
        let public_hits = hits.clone();
        RouterBuilder::new()
            .public_query("open", move |_call| {
                let hits = public_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok("open")
                }
            })
            .protected_query("secret", move |call| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(call.user.user_id.to_string())
                }
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_protected_rejects_anonymous_before_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_router(hits.clone());

        let err = router
            .call("secret", ProcedureKind::Query, ctx(Auth::Anonymous), RpcValue::Undefined)
            .await
            .unwrap_err();

        assert_eq!(err.code, RpcErrorCode::Unauthorized);
        assert_eq!(err.message, "Not authenticated");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_protected_handler_observes_identity() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_router(hits.clone());
        let auth = Auth::Authenticated(Identity::new("test-user"));

        let result = router
            .call("secret", ProcedureKind::Query, ctx(auth), RpcValue::Undefined)
            .await
            .unwrap();

        assert_eq!(result, RpcValue::String("test-user".into()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_public_runs_regardless_of_auth() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_router(hits.clone());

        for auth in [Auth::Anonymous, Auth::Authenticated(Identity::new("u"))] {
            router
                .call("open", ProcedureKind::Query, ctx(auth), RpcValue::Undefined)
                .await
                .unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_path_and_kind_mismatch() {
        let router = counting_router(Arc::new(AtomicUsize::new(0)));

        let err = router
            .call("nope", ProcedureKind::Query, ctx(Auth::Anonymous), RpcValue::Undefined)
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcErrorCode::NotFound);
        assert_eq!(err.message, "No \"query\"-procedure on path \"nope\"");

        let err = router
            .call("open", ProcedureKind::Mutation, ctx(Auth::Anonymous), RpcValue::Undefined)
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcErrorCode::MethodNotSupported);
    }

    #[test]
    fn test_merge_prefixes_and_rejects_duplicates() {
        let child = || RouterBuilder::new().public_query("world", |_| async { Ok("hi") });
        let router = RouterBuilder::new().merge("hello", child()).build().unwrap();
        assert_eq!(router.paths(), vec!["hello.world"]);
        assert_eq!(router.get("hello.world").unwrap().tier(), Tier::Public);

        let err = RouterBuilder::new()
            .merge("hello", child())
            .merge("hello", child())
            .build()
            .err()
            .unwrap();
        assert_eq!(err, RouterBuildError::DuplicatePath("hello.world".into()));
    }

    #[test]
    fn test_batch_separator_is_not_a_valid_path() {
        let err = RouterBuilder::new()
            .public_query("a,b", |_| async { Ok(()) })
            .build()
            .err()
            .unwrap();
        assert_eq!(err, RouterBuildError::InvalidPath("a,b".into()));
    }
}
