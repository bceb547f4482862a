//! Tone events and the call session that owns them

pub mod session;
pub mod tone_event;

pub use session::{CallSession, CallStatus, SessionEvent};
pub use tone_event::{
    AssociatedRequest, Direction, EventHandlers, NewTone, Originator, Outcome, OutcomeKind,
    SendOptions, Session, ToneEvent, ToneEventState,
};
