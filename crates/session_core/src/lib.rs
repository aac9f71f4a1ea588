//! Conversational session against a remote logic-programming engine.

pub mod controller;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod messages;
pub mod transcript;

pub use controller::{
    ActivationOutcome, DispatchOutcome, DomainState, SessionConfig, SessionController,
    SessionEvent,
};
pub use engine::{EngineClient, EngineError, HttpEngineClient};
pub use error::SessionError;
pub use messages::Messages;
pub use transcript::{EntryId, EntryKind, Origin, TranscriptEntry, TranscriptLog};
