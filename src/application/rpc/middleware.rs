//! Auth Middleware - 受保护过程的认证门
//!
//! 路由器对每个受保护过程无条件调用 [`require_auth`]，处理器只能拿到非空身份。

use crate::application::rpc::error::RpcError;
use crate::domain::{Auth, Identity};

/// 要求调用者已认证
pub fn require_auth(auth: &Auth) -> Result<Identity, RpcError> {
    match auth {
        Auth::Anonymous => Err(RpcError::unauthorized()),
        Auth::Authenticated(identity) => Ok(identity.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::rpc::error::{RpcErrorCode, NOT_AUTHENTICATED};

    #[test]
    fn test_anonymous_is_rejected() {
        let err = require_auth(&Auth::Anonymous).unwrap_err();
        assert_eq!(err.code, RpcErrorCode::Unauthorized);
        assert_eq!(err.message, NOT_AUTHENTICATED);
    }

    #[test]
    fn test_authenticated_passes_identity_through() {
        let identity = Identity::new("u1");
        let narrowed = require_auth(&Auth::Authenticated(identity.clone())).unwrap();
        assert_eq!(narrowed, identity);
    }
}
