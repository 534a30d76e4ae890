//! 应用路由
//!
//! 启动时构建一次，之后不可变

mod hello;
mod user;

pub use hello::hello_router;
pub use user::user_router;

use crate::application::rpc::{RouterBuildError, RouterBuilder, RpcRouter};

/// 构建应用的完整过程路由
pub fn app_router() -> Result<RpcRouter, RouterBuildError> {
    RouterBuilder::new()
        .merge("hello", hello_router())
        .merge("user", user_router())
        .build()
}
