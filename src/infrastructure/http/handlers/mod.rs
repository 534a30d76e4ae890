//! HTTP Handlers

mod ping;
mod scheduled;
mod trpc;

pub use ping::*;
pub use scheduled::*;
pub use trpc::*;
