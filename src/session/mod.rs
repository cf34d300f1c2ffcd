//! Session (attempt) lifecycle: types, persistence, and prompt compilation.

pub mod store;
pub mod types;

pub use store::{NewSession, SessionStore};
pub use types::{compile_prompt, Message, MessageRole, Session, SessionStatus};
