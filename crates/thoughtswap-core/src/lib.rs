pub mod config;
pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{ConnId, JoinCode, PromptKind, RoomState, UserId, UserRole};
