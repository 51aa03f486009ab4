pub mod error;
pub mod handlers;
pub mod server;
pub mod ui;

pub use error::ApiError;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
