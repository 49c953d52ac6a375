// Use cases layer: application workflows for the session server.

pub mod actions;
pub mod game;
pub mod session;
pub mod sync;
pub mod types;

pub use actions::{ActionKind, NetworkAction, RejectReason, SubmitOutcome};
pub use session::{
    GameSession, RegistrySettings, SessionError, SessionHandle, SessionPlayer, SessionRegistry,
    SessionSettings,
};
pub use types::{DeltaEvent, SessionEvent, SessionStatus, StateDelta, now_ms};
