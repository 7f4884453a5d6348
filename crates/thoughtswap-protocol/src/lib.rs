pub mod events;
pub mod frames;
pub mod handshake;
pub mod payloads;

pub use frames::{ErrorPayload, InboundEvent, OutboundEvent};
pub use handshake::{ConsentStatus, IdentityHint, GUEST_EMAIL_PREFIX};
