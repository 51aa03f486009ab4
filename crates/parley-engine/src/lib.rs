pub mod chat;
pub mod error;
pub mod sessions;

pub use chat::{ChatReply, ChatService};
pub use error::ChatError;
pub use sessions::{Session, SessionRegistry};
