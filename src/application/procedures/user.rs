//! user 路由
//!
//! - `user.current`  受保护查询：当前用户（无记录时返回 null）
//! - `user.update`   受保护变更：更新当前用户邮箱
//! - `user.all`      公开查询：所有用户

use crate::application::ports::UserRecord;
use crate::application::rpc::{IntoRpcValue, RouterBuilder, RpcError, RpcValue};

impl IntoRpcValue for UserRecord {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::object([
            ("id", self.id.to_string().into_rpc_value()),
            ("email", self.email.into_rpc_value()),
            ("createdAt", self.created_at.into_rpc_value()),
        ])
    }
}

pub fn user_router() -> RouterBuilder {
    RouterBuilder::new()
        .protected_query("current", |call| async move {
            let user = call.ctx.users.find_by_id(&call.user.user_id).await?;
            Ok::<_, RpcError>(user)
        })
        .protected_mutation("update", |call| async move {
            let email = call
                .input
                .get("email")
                .and_then(RpcValue::as_str)
                .ok_or_else(|| RpcError::bad_request("Expected `email` to be a string"))?;
            if !email.contains('@') {
                return Err(RpcError::bad_request(format!("Invalid email: {}", email)));
            }

            let user = call.ctx.users.update_email(&call.user.user_id, email).await?;
            tracing::info!(user_id = %user.id, "User email updated");
            Ok::<_, RpcError>(user)
        })
        .public_query("all", |call| async move {
            let users = call.ctx.users.find_all().await?;
            Ok::<_, RpcError>(users)
        })
}
