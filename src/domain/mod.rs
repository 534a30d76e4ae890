//! 领域层
//!
//! - identity: 调用者身份与认证状态

pub mod identity;

pub use identity::{Auth, Identity, UserId};
