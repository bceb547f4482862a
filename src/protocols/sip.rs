//! SIP boundary types used by the DTMF relay
//!
//! Message parsing and the transaction layer live outside this crate; this
//! module only describes what crosses the boundary: the outgoing INFO
//! request, the responses and inbound requests the dialog hands back, and
//! the failure causes derived from response codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SIP request methods a tone event sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SipMethod {
    Info,
}

impl SipMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SipMethod::Info => "INFO",
        }
    }
}

impl fmt::Display for SipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response delivered by the dialog layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipResponse {
    pub status_code: u16,
    pub reason_phrase: String,
}

impl SipResponse {
    pub fn new<S: Into<String>>(status_code: u16, reason_phrase: S) -> Self {
        Self {
            status_code,
            reason_phrase: reason_phrase.into(),
        }
    }

    pub fn class(&self) -> ResponseClass {
        ResponseClass::from_status(self.status_code)
    }
}

impl fmt::Display for SipResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.reason_phrase)
    }
}

/// How a tone event treats a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Provisional,
    Success,
    Failure,
}

impl ResponseClass {
    pub fn from_status(status_code: u16) -> Self {
        match status_code {
            100..=199 => ResponseClass::Provisional,
            200..=299 => ResponseClass::Success,
            _ => ResponseClass::Failure,
        }
    }
}

/// Why a tone (or the call carrying it) failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    ConnectionError,
    RequestTimeout,
    DialogError,
    Redirected,
    Busy,
    Rejected,
    NotFound,
    Unavailable,
    AddressIncomplete,
    IncompatibleSdp,
    AuthenticationError,
    Canceled,
    SipFailureCode,
}

impl Cause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::ConnectionError => "Connection Error",
            Cause::RequestTimeout => "Request Timeout",
            Cause::DialogError => "Dialog Error",
            Cause::Redirected => "Redirected",
            Cause::Busy => "Busy",
            Cause::Rejected => "Rejected",
            Cause::NotFound => "Not Found",
            Cause::Unavailable => "Unavailable",
            Cause::AddressIncomplete => "Address Incomplete",
            Cause::IncompatibleSdp => "Incompatible SDP",
            Cause::AuthenticationError => "Authentication Error",
            Cause::Canceled => "Canceled",
            Cause::SipFailureCode => "SIP Failure Code",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a final non-2xx status code to a failure cause
pub fn sip_error_cause(status_code: u16) -> Cause {
    match status_code {
        300..=399 => Cause::Redirected,
        486 | 600 => Cause::Busy,
        403 | 603 => Cause::Rejected,
        404 | 604 => Cause::NotFound,
        408 => Cause::RequestTimeout,
        410 | 430 | 480 => Cause::Unavailable,
        424 | 484 => Cause::AddressIncomplete,
        488 | 606 => Cause::IncompatibleSdp,
        401 | 407 => Cause::AuthenticationError,
        487 => Cause::Canceled,
        _ => Cause::SipFailureCode,
    }
}

/// Request description handed to the dialog layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// Tone event the dialog reports terminal signals for
    pub event_id: String,
    pub method: SipMethod,
    pub extra_headers: Vec<String>,
    pub body: String,
}

/// An INFO request received on an established dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRequest {
    pub call_id: String,
    pub cseq: u32,
    pub body: Option<String>,
}

impl InfoRequest {
    pub fn new<S: Into<String>>(call_id: S, cseq: u32, body: Option<String>) -> Self {
        Self {
            call_id: call_id.into(),
            cseq,
            body,
        }
    }
}

/// The dialog/transaction layer
///
/// `send_request` must return without waiting for the network. For every
/// request it accepts, the owner of the tone event later delivers exactly
/// one terminal signal: a final response, a timeout, a transport error or a
/// dialog error.
pub trait Dialog {
    fn send_request(&mut self, request: OutgoingRequest);

    fn reply(&mut self, request: &InfoRequest, status_code: u16);
}
