//! Application State
//!
//! 启动时构建，之后只读共享

use std::sync::Arc;

use crate::application::context::ContextBuilder;
use crate::application::rpc::RpcRouter;
use crate::application::scheduled::Dispatcher;

/// 应用状态
pub struct AppState {
    pub router: Arc<RpcRouter>,
    pub contexts: Arc<ContextBuilder>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        router: Arc<RpcRouter>,
        contexts: Arc<ContextBuilder>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            router,
            contexts,
            dispatcher,
        }
    }
}
