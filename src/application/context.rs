//! Context Builder - 请求上下文
//!
//! 每个 HTTP 请求或定时触发构造一次 [`RequestContext`]。
//! 构造完成后只有响应头累加器可变。

use std::sync::{Arc, Mutex};

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, VARY};

use crate::application::ports::{SessionStorePort, SessionValidatorPort, UserRepositoryPort};
use crate::config::Bindings;
use crate::domain::{Auth, Identity};

/// 响应头累加器
///
/// 处理器通过共享引用追加响应头，传输层在返回前合并到 HTTP 响应
#[derive(Debug, Default)]
pub struct ResponseHeaders {
    inner: Mutex<HeaderMap>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, name: HeaderName, value: HeaderValue) {
        if let Ok(mut headers) = self.inner.lock() {
            headers.append(name, value);
        }
    }

    /// 取出已累加的响应头
    pub fn take(&self) -> HeaderMap {
        self.inner
            .lock()
            .map(|mut headers| std::mem::take(&mut *headers))
            .unwrap_or_default()
    }
}

/// 请求上下文
pub struct RequestContext {
    pub auth: Auth,
    pub bindings: Arc<Bindings>,
    pub users: Arc<dyn UserRepositoryPort>,
    pub sessions: Arc<dyn SessionStorePort>,
    pub response_headers: ResponseHeaders,
}

impl RequestContext {
    pub fn identity(&self) -> Option<&Identity> {
        self.auth.identity()
    }
}

/// 上下文构造器
///
/// 启动时创建一次，之后只读共享
pub struct ContextBuilder {
    bindings: Arc<Bindings>,
    validator: Arc<dyn SessionValidatorPort>,
    users: Arc<dyn UserRepositoryPort>,
    sessions: Arc<dyn SessionStorePort>,
}

impl ContextBuilder {
    pub fn new(
        bindings: Arc<Bindings>,
        validator: Arc<dyn SessionValidatorPort>,
        users: Arc<dyn UserRepositoryPort>,
        sessions: Arc<dyn SessionStorePort>,
    ) -> Self {
        Self {
            bindings,
            validator,
            users,
            sessions,
        }
    }

    /// 从 HTTP 请求头构造上下文
    ///
    /// 缺少或无效的凭证得到匿名上下文，不视为错误
    pub async fn from_request(&self, headers: &HeaderMap) -> RequestContext {
        let response_headers = ResponseHeaders::new();

        let auth = match bearer_token(headers) {
            None => Auth::Anonymous,
            Some(token) => {
                // 响应随凭证变化
                response_headers.append(VARY, HeaderValue::from_static("authorization"));

                match self.validator.validate(token).await {
                    Ok(identity) => Auth::from(identity),
                    Err(e) => {
                        tracing::warn!(error = %e, "Session validation failed, treating caller as anonymous");
                        Auth::Anonymous
                    }
                }
            }
        };

        if let Some(identity) = auth.identity() {
            tracing::debug!(user_id = %identity.user_id, "Request authenticated");
        }

        self.build(auth, response_headers)
    }

    /// 定时任务上下文（没有 HTTP 请求，也就没有用户）
    pub fn for_scheduled(&self) -> RequestContext {
        self.build(Auth::Anonymous, ResponseHeaders::new())
    }

    fn build(&self, auth: Auth, response_headers: ResponseHeaders) -> RequestContext {
        RequestContext {
            auth,
            bindings: self.bindings.clone(),
            users: self.users.clone(),
            sessions: self.sessions.clone(),
            response_headers,
        }
    }
}

/// 提取 `Authorization: Bearer <token>`（scheme 不区分大小写）
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AuthError;
    use crate::infrastructure::memory::{InMemorySessionStore, InMemoryUserRepository};
    use async_trait::async_trait;

    /// 只接受 "valid-<user>" 形式令牌的验证器
    struct PrefixValidator;

    #[async_trait]
    impl SessionValidatorPort for PrefixValidator {
        async fn validate(&self, token: &str) -> Result<Option<Identity>, AuthError> {
            if token == "boom" {
                return Err(AuthError::ValidationFailed("store offline".into()));
            }
            Ok(token.strip_prefix("valid-").map(Identity::new))
        }
    }

    fn builder() -> ContextBuilder {
        ContextBuilder::new(
            Arc::new(Bindings::default()),
            Arc::new(PrefixValidator),
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("bearer   abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let ctx = builder().from_request(&HeaderMap::new()).await;
        assert_eq!(ctx.auth, Auth::Anonymous);
        assert!(ctx.response_headers.take().is_empty());
    }

    #[tokio::test]
    async fn test_valid_token_resolves_identity() {
        let ctx = builder().from_request(&headers_with("Bearer valid-test-user")).await;
        assert_eq!(ctx.identity().unwrap().user_id.as_str(), "test-user");
        let headers = ctx.response_headers.take();
        assert_eq!(headers.get(VARY).unwrap().to_str().unwrap(), "authorization");
    }

    #[tokio::test]
    async fn test_invalid_token_is_anonymous() {
        let ctx = builder().from_request(&headers_with("Bearer forged")).await;
        assert_eq!(ctx.auth, Auth::Anonymous);
    }

    #[tokio::test]
    async fn test_validator_failure_is_anonymous() {
        let ctx = builder().from_request(&headers_with("Bearer boom")).await;
        assert_eq!(ctx.auth, Auth::Anonymous);
    }

    #[test]
    fn test_scheduled_context_has_no_user() {
        let ctx = builder().for_scheduled();
        assert!(!ctx.auth.is_authenticated());
    }
}
