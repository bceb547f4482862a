//! Call session owning DTMF tone events

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DtmfConfig;
use crate::core::tone_event::{
    Direction, NewTone, Originator, SendOptions, Session, ToneEvent,
};
use crate::protocols::dtmf::{Tone, ToneInput, MAX_DURATION, MIN_DURATION, MIN_INTER_TONE_GAP};
use crate::protocols::sip::{Cause, Dialog, InfoRequest, SipResponse};
use crate::Result;

/// Call states as seen by in-dialog signaling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Null,
    InviteSent,
    Provisional,
    WaitingForAnswer,
    InviteReceived,
    WaitingForAck,
    Confirmed,
    Canceled,
    Terminated,
}

impl CallStatus {
    /// In-dialog requests may only be sent once the dialog exists
    pub fn is_dialog_capable(&self) -> bool {
        matches!(self, CallStatus::Confirmed | CallStatus::WaitingForAck)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallStatus::Null => "null",
            CallStatus::InviteSent => "invite sent",
            CallStatus::Provisional => "provisional",
            CallStatus::WaitingForAnswer => "waiting for answer",
            CallStatus::InviteReceived => "invite received",
            CallStatus::WaitingForAck => "waiting for ACK",
            CallStatus::Confirmed => "confirmed",
            CallStatus::Canceled => "canceled",
            CallStatus::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Session events
#[derive(Debug, Clone)]
pub enum SessionEvent {
    NewDtmf {
        session_id: String,
        event_id: String,
        originator: Originator,
        direction: Direction,
        tone: Tone,
        duration: u32,
        at: DateTime<Utc>,
    },
    Ended {
        session_id: String,
        cause: Cause,
    },
}

pub struct CallSession {
    id: String,
    call_id: String,
    status: CallStatus,
    config: DtmfConfig,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl CallSession {
    pub fn new<S: Into<String>>(call_id: S, config: DtmfConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            id: Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            status: CallStatus::Null,
            config,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.event_rx.take()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn set_status(&mut self, status: CallStatus) {
        debug!("Session {} status {} -> {}", self.id, self.status, status);
        self.status = status;
    }

    /// Sends one tone, clamping its duration to the allowed range first.
    pub fn send_dtmf<T: Into<ToneInput>>(
        &mut self,
        dialog: &mut dyn Dialog,
        tone: T,
        mut options: SendOptions,
    ) -> Result<ToneEvent> {
        let requested = options.duration.unwrap_or(self.config.default_duration);
        options.duration = Some(self.clamp_duration(requested));

        ToneEvent::send(self, dialog, tone, options)
    }

    pub fn receive_info(&mut self, dialog: &mut dyn Dialog, request: InfoRequest) -> ToneEvent {
        ToneEvent::receive(self, dialog, request)
    }

    /// Pause to leave between successive tones
    pub fn inter_tone_gap(&self) -> Duration {
        let gap = self.config.inter_tone_gap;
        if gap < MIN_INTER_TONE_GAP {
            debug!("Inter-tone gap {} ms raised to {} ms", gap, MIN_INTER_TONE_GAP);
        }
        Duration::from_millis(gap.max(MIN_INTER_TONE_GAP).into())
    }

    fn clamp_duration(&self, duration: u32) -> u32 {
        if duration < MIN_DURATION {
            debug!("DTMF duration {} ms raised to {} ms", duration, MIN_DURATION);
            MIN_DURATION
        } else if duration > MAX_DURATION {
            debug!("DTMF duration {} ms lowered to {} ms", duration, MAX_DURATION);
            MAX_DURATION
        } else {
            duration
        }
    }

    fn end(&mut self, cause: Cause) {
        if self.status == CallStatus::Terminated {
            debug!("Session {} already terminated, ignoring {}", self.id, cause);
            return;
        }

        warn!("Session {} ended: {}", self.id, cause);
        self.status = CallStatus::Terminated;
        let _ = self.event_tx.send(SessionEvent::Ended {
            session_id: self.id.clone(),
            cause,
        });
    }
}

impl Session for CallSession {
    fn status(&self) -> CallStatus {
        self.status
    }

    fn default_duration(&self) -> u32 {
        self.clamp_duration(self.config.default_duration)
    }

    fn new_dtmf(&mut self, notification: NewTone<'_>) {
        let event = notification.event;
        let (Some(tone), Some(duration)) = (event.tone(), event.duration()) else {
            return;
        };

        info!(
            "DTMF {} ({} ms) {:?} on session {}",
            tone, duration, notification.originator, self.id
        );

        let _ = self.event_tx.send(SessionEvent::NewDtmf {
            session_id: self.id.clone(),
            event_id: event.id().to_string(),
            originator: notification.originator,
            direction: event.direction(),
            tone,
            duration,
            at: Utc::now(),
        });
    }

    fn on_request_timeout(&mut self) {
        self.end(Cause::RequestTimeout);
    }

    fn on_transport_error(&mut self) {
        self.end(Cause::ConnectionError);
    }

    fn on_dialog_error(&mut self, response: &SipResponse) {
        debug!("Dialog error on session {}: {}", self.id, response);
        self.end(Cause::DialogError);
    }
}
