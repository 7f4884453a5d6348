//! Live Room state and its supporting cast: the Room Registry (§4.4, §4.9),
//! the per-Room state machine (§4.5), the Event Logger (§4.7), and the Admin
//! Projection (§4.8). Everything in this crate is in-memory and volatile —
//! durable state lives in `thoughtswap-store`.

pub mod admin;
pub mod error;
pub mod logger;
pub mod registry;
pub mod room;
pub mod types;

pub use error::{CoreError, Result};
pub use registry::{AutoEndMessage, RoomRegistry};
pub use room::{LeaveResult, Room};
pub use types::{CurrentPrompt, DistEntry, Distribution, Effect, Outcome, Participant, Target};
