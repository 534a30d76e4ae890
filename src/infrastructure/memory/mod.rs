//! In-Memory Adapters
//!
//! 仓储与会话存储的内存实现

mod session_store;
mod user_repo;

pub use session_store::InMemorySessionStore;
pub use user_repo::InMemoryUserRepository;
