pub mod context;
pub mod errors;
pub mod generator;
pub mod ids;

pub use context::{ContextManager, Exchange, DEFAULT_WINDOW};
pub use errors::{ContextError, GenerateError};
pub use generator::{Generator, TruncationSide};
pub use ids::SessionId;
