//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod session_store;
mod user_repo;

pub use database::*;
pub use session_store::*;
pub use user_repo::*;
