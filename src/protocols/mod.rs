//! Protocol implementations for the DTMF relay

pub mod sip;
pub mod dtmf;

pub use dtmf::{RelayPayload, Tone, ToneInput};
pub use sip::{Cause, Dialog, InfoRequest, OutgoingRequest, SipMethod, SipResponse};
