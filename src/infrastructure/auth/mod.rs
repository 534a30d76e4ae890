//! Auth Adapters - 会话令牌验证实现

mod jwt_validator;

pub use jwt_validator::{JwtSessionValidator, DEFAULT_TOKEN_TTL_SECS};
