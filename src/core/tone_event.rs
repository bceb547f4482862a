//! DTMF tone event carried over SIP INFO
//!
//! A [`ToneEvent`] is created per outgoing tone by [`ToneEvent::send`] or per
//! received INFO request by [`ToneEvent::receive`]. Outgoing events stay
//! pending until the dialog layer reports a final response, a timeout, a
//! transport error or a dialog error; the first of those resolves the event
//! and any later one is dropped.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::session::CallStatus;
use crate::protocols::dtmf::{self, RelayPayload, Tone, ToneInput};
use crate::protocols::sip::{
    sip_error_cause, Cause, Dialog, InfoRequest, OutgoingRequest, ResponseClass, SipMethod,
    SipResponse,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Which side produced a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Originator {
    Local,
    Remote,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneEventState {
    Pending,
    Succeeded,
    Failed,
    Received,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Succeeded,
    Failed,
}

/// Terminal result of an outgoing tone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded {
        originator: Originator,
        response: SipResponse,
    },
    Failed {
        originator: Originator,
        response: Option<SipResponse>,
        cause: Cause,
    },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Succeeded { .. } => OutcomeKind::Succeeded,
            Outcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    pub fn originator(&self) -> Originator {
        match self {
            Outcome::Succeeded { originator, .. } | Outcome::Failed { originator, .. } => {
                *originator
            }
        }
    }

    pub fn cause(&self) -> Option<Cause> {
        match self {
            Outcome::Succeeded { .. } => None,
            Outcome::Failed { cause, .. } => Some(*cause),
        }
    }
}

pub type OutcomeCallback = Box<dyn FnMut(&Outcome)>;

/// Outcome subscriptions, invoked in registration order
#[derive(Default)]
pub struct EventHandlers {
    subscriptions: Vec<(OutcomeKind, OutcomeCallback)>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, kind: OutcomeKind, callback: F) -> Self
    where
        F: FnMut(&Outcome) + 'static,
    {
        self.subscribe(kind, callback);
        self
    }

    pub fn subscribe<F>(&mut self, kind: OutcomeKind, callback: F)
    where
        F: FnMut(&Outcome) + 'static,
    {
        self.subscriptions.push((kind, Box::new(callback)));
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.subscriptions.iter().filter(|(k, _)| *k == kind).count()
    }

    fn notify(&mut self, outcome: &Outcome) {
        let kind = outcome.kind();
        for (_, callback) in self.subscriptions.iter_mut().filter(|(k, _)| *k == kind) {
            callback(outcome);
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("succeeded", &self.count(OutcomeKind::Succeeded))
            .field("failed", &self.count(OutcomeKind::Failed))
            .finish()
    }
}

/// Options for an outgoing tone
#[derive(Debug, Default)]
pub struct SendOptions {
    pub extra_headers: Vec<String>,
    pub event_handlers: EventHandlers,
    /// Falls back to [`Session::default_duration`]
    pub duration: Option<u32>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_header<S: Into<String>>(mut self, header: S) -> Self {
        self.extra_headers.push(header.into());
        self
    }

    pub fn on<F>(mut self, kind: OutcomeKind, callback: F) -> Self
    where
        F: FnMut(&Outcome) + 'static,
    {
        self.event_handlers.subscribe(kind, callback);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociatedRequest {
    Outgoing(OutgoingRequest),
    Incoming(InfoRequest),
}

/// "New tone" notification delivered to the owning session
#[derive(Debug)]
pub struct NewTone<'a> {
    pub originator: Originator,
    pub event: &'a ToneEvent,
}

impl NewTone<'_> {
    pub fn request(&self) -> Option<&AssociatedRequest> {
        self.event.request()
    }
}

/// The call that owns tone events
pub trait Session {
    fn status(&self) -> CallStatus;

    fn default_duration(&self) -> u32 {
        dtmf::DEFAULT_DURATION
    }

    fn new_dtmf(&mut self, notification: NewTone<'_>);

    fn on_request_timeout(&mut self);

    fn on_transport_error(&mut self);

    fn on_dialog_error(&mut self, response: &SipResponse);
}

#[derive(Debug)]
pub struct ToneEvent {
    id: String,
    direction: Direction,
    tone: Option<Tone>,
    duration: Option<u32>,
    request: Option<AssociatedRequest>,
    handlers: EventHandlers,
    state: ToneEventState,
    outcome: Option<Outcome>,
}

impl ToneEvent {
    /// Builds and dispatches an INFO request carrying `tone`.
    ///
    /// Fails with [`Error::InvalidState`] unless the call is confirmed or
    /// waiting for ACK, and with [`Error::Validation`] for a tone outside
    /// `0-9 A-D # *`. In both cases nothing is notified or sent.
    pub fn send<T: Into<ToneInput>>(
        session: &mut dyn Session,
        dialog: &mut dyn Dialog,
        tone: T,
        options: SendOptions,
    ) -> Result<Self> {
        let status = session.status();
        if !status.is_dialog_capable() {
            return Err(Error::invalid_state(format!(
                "cannot send DTMF while call is {}",
                status
            )));
        }

        let tone = tone.into().normalize()?;
        let duration = options.duration.unwrap_or_else(|| session.default_duration());

        let SendOptions {
            mut extra_headers,
            event_handlers,
            ..
        } = options;
        extra_headers.push(format!("Content-Type: {}", dtmf::CONTENT_TYPE));

        let id = Uuid::new_v4().to_string();
        let request = OutgoingRequest {
            event_id: id.clone(),
            method: SipMethod::Info,
            extra_headers,
            body: RelayPayload::new(tone, duration).encode(),
        };

        let event = Self {
            id,
            direction: Direction::Outgoing,
            tone: Some(tone),
            duration: Some(duration),
            request: Some(AssociatedRequest::Outgoing(request.clone())),
            handlers: event_handlers,
            state: ToneEventState::Pending,
            outcome: None,
        };

        debug!("Sending DTMF tone {} ({} ms) as event {}", tone, duration, event.id);

        session.new_dtmf(NewTone {
            originator: Originator::Local,
            event: &event,
        });
        dialog.send_request(request);

        Ok(event)
    }

    /// Handles an INFO request received on the dialog.
    ///
    /// The request is answered with 200 before the body is examined. A body
    /// that is not a valid relay payload yields a discarded event and no
    /// session notification.
    pub fn receive(
        session: &mut dyn Session,
        dialog: &mut dyn Dialog,
        request: InfoRequest,
    ) -> Self {
        dialog.reply(&request, 200);

        let (tone, duration) = match request.body.as_deref().and_then(dtmf::split_relay_lines) {
            Some((signal, duration)) => (
                dtmf::parse_signal_line(signal),
                dtmf::parse_duration_line(duration),
            ),
            None => (None, None),
        };

        let received = tone.is_some() && duration.is_some();
        let event = Self {
            id: Uuid::new_v4().to_string(),
            direction: Direction::Incoming,
            tone,
            duration,
            request: Some(AssociatedRequest::Incoming(request)),
            handlers: EventHandlers::default(),
            state: if received {
                ToneEventState::Received
            } else {
                ToneEventState::Discarded
            },
            outcome: None,
        };

        if received {
            session.new_dtmf(NewTone {
                originator: Originator::Remote,
                event: &event,
            });
        } else {
            debug!("Invalid INFO DTMF received, discarded (event {})", event.id);
        }

        event
    }

    /// Classifies a response to the outgoing request.
    pub fn receive_response(&mut self, response: SipResponse) {
        match response.class() {
            ResponseClass::Provisional => {
                debug!("Ignoring provisional response {} for DTMF event {}", response, self.id);
            }
            ResponseClass::Success => {
                self.resolve(Outcome::Succeeded {
                    originator: Originator::Remote,
                    response,
                });
            }
            ResponseClass::Failure => {
                let cause = sip_error_cause(response.status_code);
                self.resolve(Outcome::Failed {
                    originator: Originator::Remote,
                    response: Some(response),
                    cause,
                });
            }
        }
    }

    /// Only outgoing events carry a request the dialog can time out; the
    /// terminal signals below are ignored on incoming events.
    pub fn on_request_timeout(&mut self, session: &mut dyn Session) {
        if !self.is_outgoing("request timeout") {
            return;
        }
        self.resolve(Outcome::Failed {
            originator: Originator::System,
            response: None,
            cause: Cause::RequestTimeout,
        });
        session.on_request_timeout();
    }

    pub fn on_transport_error(&mut self, session: &mut dyn Session) {
        if !self.is_outgoing("transport error") {
            return;
        }
        self.resolve(Outcome::Failed {
            originator: Originator::System,
            response: None,
            cause: Cause::ConnectionError,
        });
        session.on_transport_error();
    }

    pub fn on_dialog_error(&mut self, response: SipResponse, session: &mut dyn Session) {
        if !self.is_outgoing("dialog error") {
            return;
        }
        self.resolve(Outcome::Failed {
            originator: Originator::Remote,
            response: Some(response.clone()),
            cause: Cause::DialogError,
        });
        session.on_dialog_error(&response);
    }

    /// Adds an outcome subscription after construction
    pub fn on<F>(&mut self, kind: OutcomeKind, callback: F) -> &mut Self
    where
        F: FnMut(&Outcome) + 'static,
    {
        self.handlers.subscribe(kind, callback);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn tone(&self) -> Option<Tone> {
        self.tone
    }

    pub fn duration(&self) -> Option<u32> {
        self.duration
    }

    /// `None` once an outgoing event has resolved
    pub fn request(&self) -> Option<&AssociatedRequest> {
        self.request.as_ref()
    }

    pub fn state(&self) -> ToneEventState {
        self.state
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    fn is_outgoing(&self, signal: &str) -> bool {
        if self.direction != Direction::Outgoing {
            warn!("Ignoring {} on incoming DTMF event {}", signal, self.id);
            return false;
        }
        true
    }

    fn resolve(&mut self, outcome: Outcome) -> bool {
        if self.direction != Direction::Outgoing {
            warn!("Ignoring {:?} outcome on incoming DTMF event {}", outcome.kind(), self.id);
            return false;
        }
        if self.outcome.is_some() {
            warn!("DTMF event {} already resolved, dropping {:?} outcome", self.id, outcome.kind());
            return false;
        }

        self.state = match outcome.kind() {
            OutcomeKind::Succeeded => ToneEventState::Succeeded,
            OutcomeKind::Failed => ToneEventState::Failed,
        };
        self.request = None;

        match &outcome {
            Outcome::Succeeded { .. } => info!("DTMF event {} succeeded", self.id),
            Outcome::Failed { cause, .. } => info!("DTMF event {} failed: {}", self.id, cause),
        }

        self.handlers.notify(&outcome);
        self.outcome = Some(outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct MockSession {
        status: CallStatus,
        log: Log,
        notified: Vec<(Originator, Option<Tone>, Option<u32>, bool)>,
    }

    impl MockSession {
        fn new(status: CallStatus, log: &Log) -> Self {
            Self {
                status,
                log: Rc::clone(log),
                notified: Vec::new(),
            }
        }
    }

    impl Session for MockSession {
        fn status(&self) -> CallStatus {
            self.status
        }

        fn new_dtmf(&mut self, notification: NewTone<'_>) {
            self.log.borrow_mut().push("new_dtmf".to_string());
            self.notified.push((
                notification.originator,
                notification.event.tone(),
                notification.event.duration(),
                notification.request().is_some(),
            ));
        }

        fn on_request_timeout(&mut self) {
            self.log.borrow_mut().push("session_timeout".to_string());
        }

        fn on_transport_error(&mut self) {
            self.log.borrow_mut().push("session_transport_error".to_string());
        }

        fn on_dialog_error(&mut self, response: &SipResponse) {
            self.log
                .borrow_mut()
                .push(format!("session_dialog_error {}", response.status_code));
        }
    }

    struct MockDialog {
        log: Log,
        sent: Vec<OutgoingRequest>,
        replies: Vec<u16>,
    }

    impl MockDialog {
        fn new(log: &Log) -> Self {
            Self {
                log: Rc::clone(log),
                sent: Vec::new(),
                replies: Vec::new(),
            }
        }
    }

    impl Dialog for MockDialog {
        fn send_request(&mut self, request: OutgoingRequest) {
            self.log.borrow_mut().push("send_request".to_string());
            self.sent.push(request);
        }

        fn reply(&mut self, _request: &InfoRequest, status_code: u16) {
            self.log.borrow_mut().push(format!("reply {}", status_code));
            self.replies.push(status_code);
        }
    }

    fn fixtures(status: CallStatus) -> (Log, MockSession, MockDialog) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let session = MockSession::new(status, &log);
        let dialog = MockDialog::new(&log);
        (log, session, dialog)
    }

    fn recorder() -> (Rc<RefCell<Vec<Outcome>>>, SendOptions) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let on_success = Rc::clone(&seen);
        let on_failure = Rc::clone(&seen);
        let options = SendOptions::new()
            .with_duration(100)
            .on(OutcomeKind::Succeeded, move |o| on_success.borrow_mut().push(o.clone()))
            .on(OutcomeKind::Failed, move |o| on_failure.borrow_mut().push(o.clone()));
        (seen, options)
    }

    #[test]
    fn test_send_valid_tones() {
        let inputs: Vec<(ToneInput, char)> = vec![
            ("1".into(), '1'),
            ("a".into(), 'A'),
            ("D".into(), 'D'),
            ("#".into(), '#'),
            ("*".into(), '*'),
            (0u8.into(), '0'),
            (9i32.into(), '9'),
        ];

        for (input, expected) in inputs {
            let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
            let event =
                ToneEvent::send(&mut session, &mut dialog, input, SendOptions::new()).unwrap();

            assert_eq!(event.tone().map(Tone::as_char), Some(expected));
            assert_eq!(dialog.sent.len(), 1);
            let first_line = dialog.sent[0].body.split("\r\n").next().unwrap();
            assert_eq!(first_line, format!("Signal={}", expected));
        }
    }

    #[test]
    fn test_send_builds_request() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::WaitingForAck);
        let options = SendOptions::new()
            .with_header("X-Trace: abc")
            .with_duration(250);
        let event = ToneEvent::send(&mut session, &mut dialog, '5', options).unwrap();

        let request = &dialog.sent[0];
        assert_eq!(request.method, SipMethod::Info);
        assert_eq!(request.event_id, event.id());
        assert_eq!(request.body, "Signal=5\r\nDuration=250");
        assert_eq!(
            request.extra_headers,
            vec![
                "X-Trace: abc".to_string(),
                "Content-Type: application/dtmf-relay".to_string()
            ]
        );
        assert_eq!(event.direction(), Direction::Outgoing);
        assert_eq!(event.state(), ToneEventState::Pending);
    }

    #[test]
    fn test_send_uses_session_default_duration() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let event = ToneEvent::send(&mut session, &mut dialog, "7", SendOptions::new()).unwrap();
        assert_eq!(event.duration(), Some(dtmf::DEFAULT_DURATION));
        assert_eq!(dialog.sent[0].body, "Signal=7\r\nDuration=100");
    }

    #[test]
    fn test_send_rejects_invalid_tone() {
        for input in ["E", "10", ""] {
            let (log, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
            let err =
                ToneEvent::send(&mut session, &mut dialog, input, SendOptions::new()).unwrap_err();
            assert!(err.is_validation());
            assert!(dialog.sent.is_empty());
            assert!(log.borrow().is_empty());
        }
    }

    #[test]
    fn test_send_requires_established_call() {
        for status in [
            CallStatus::Null,
            CallStatus::InviteSent,
            CallStatus::Provisional,
            CallStatus::WaitingForAnswer,
            CallStatus::InviteReceived,
            CallStatus::Canceled,
            CallStatus::Terminated,
        ] {
            let (log, mut session, mut dialog) = fixtures(status);
            let err =
                ToneEvent::send(&mut session, &mut dialog, "1", SendOptions::new()).unwrap_err();
            assert!(err.is_invalid_state());
            assert!(session.notified.is_empty());
            assert!(log.borrow().is_empty());
        }
    }

    #[test]
    fn test_session_notified_before_dispatch() {
        let (log, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        ToneEvent::send(&mut session, &mut dialog, "3", SendOptions::new()).unwrap();

        assert_eq!(*log.borrow(), vec!["new_dtmf", "send_request"]);
        let (originator, tone, _, has_request) = session.notified[0];
        assert_eq!(originator, Originator::Local);
        assert_eq!(tone.map(Tone::as_char), Some('3'));
        assert!(has_request);
    }

    #[test]
    fn test_response_classification() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let (seen, options) = recorder();
        let mut event = ToneEvent::send(&mut session, &mut dialog, "1", options).unwrap();

        event.receive_response(SipResponse::new(180, "Ringing"));
        assert!(seen.borrow().is_empty());
        assert_eq!(event.state(), ToneEventState::Pending);
        assert!(event.request().is_some());

        event.receive_response(SipResponse::new(200, "OK"));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].kind(), OutcomeKind::Succeeded);
        assert_eq!(seen.borrow()[0].originator(), Originator::Remote);
        assert_eq!(event.state(), ToneEventState::Succeeded);
        assert!(event.request().is_none());

        event.receive_response(SipResponse::new(486, "Busy Here"));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(event.state(), ToneEventState::Succeeded);
    }

    #[test]
    fn test_failure_response_carries_cause() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let (seen, options) = recorder();
        let mut event = ToneEvent::send(&mut session, &mut dialog, "1", options).unwrap();

        event.receive_response(SipResponse::new(486, "Busy Here"));

        let outcomes = seen.borrow();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Outcome::Failed {
                originator,
                response,
                cause,
            } => {
                assert_eq!(*originator, Originator::Remote);
                assert_eq!(response.as_ref().map(|r| r.status_code), Some(486));
                assert_eq!(*cause, Cause::Busy);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(event.outcome().and_then(Outcome::cause), Some(Cause::Busy));
    }

    #[test]
    fn test_timeout_and_transport_error() {
        let (log, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let (seen, options) = recorder();
        let mut event = ToneEvent::send(&mut session, &mut dialog, "1", options).unwrap();

        event.on_request_timeout(&mut session);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].originator(), Originator::System);
        assert_eq!(seen.borrow()[0].cause(), Some(Cause::RequestTimeout));
        assert!(log.borrow().contains(&"session_timeout".to_string()));

        event.on_transport_error(&mut session);
        assert_eq!(seen.borrow().len(), 1);
        assert!(log.borrow().contains(&"session_transport_error".to_string()));

        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let (seen, options) = recorder();
        let mut event = ToneEvent::send(&mut session, &mut dialog, "2", options).unwrap();
        event.on_transport_error(&mut session);
        assert_eq!(seen.borrow()[0].cause(), Some(Cause::ConnectionError));
        assert_eq!(seen.borrow()[0].originator(), Originator::System);
    }

    #[test]
    fn test_dialog_error() {
        let (log, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let (seen, options) = recorder();
        let mut event = ToneEvent::send(&mut session, &mut dialog, "1", options).unwrap();

        event.on_dialog_error(
            SipResponse::new(481, "Call/Transaction Does Not Exist"),
            &mut session,
        );

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].originator(), Originator::Remote);
        assert_eq!(seen.borrow()[0].cause(), Some(Cause::DialogError));
        assert!(log.borrow().contains(&"session_dialog_error 481".to_string()));
    }

    #[test]
    fn test_multiple_subscriptions_all_invoked() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let hits = Rc::new(RefCell::new(Vec::new()));
        let (first, second, third) = (Rc::clone(&hits), Rc::clone(&hits), Rc::clone(&hits));

        let options = SendOptions::new()
            .on(OutcomeKind::Succeeded, move |_| first.borrow_mut().push(1))
            .on(OutcomeKind::Succeeded, move |_| second.borrow_mut().push(2));
        let mut event = ToneEvent::send(&mut session, &mut dialog, "9", options).unwrap();
        event.on(OutcomeKind::Succeeded, move |_| third.borrow_mut().push(3));

        event.receive_response(SipResponse::new(200, "OK"));
        assert_eq!(*hits.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_receive_valid_body() {
        let (log, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let request = InfoRequest::new("call-1", 5, Some("Signal=5\r\nDuration=160".into()));

        let event = ToneEvent::receive(&mut session, &mut dialog, request);

        assert_eq!(event.direction(), Direction::Incoming);
        assert_eq!(event.state(), ToneEventState::Received);
        assert_eq!(event.tone().map(Tone::as_char), Some('5'));
        assert_eq!(event.duration(), Some(160));
        assert_eq!(dialog.replies, vec![200]);
        assert_eq!(*log.borrow(), vec!["reply 200", "new_dtmf"]);

        let (originator, _, _, has_request) = session.notified[0];
        assert_eq!(originator, Originator::Remote);
        assert!(has_request);
    }

    #[test]
    fn test_receive_invalid_bodies_still_acknowledged() {
        let bodies = [
            Some("Signal=5"),
            Some("Garbage"),
            Some("Signal=5\r\nDuration=abc"),
            Some("Signal=x\r\nDuration=100"),
            None,
        ];

        for body in bodies {
            let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
            let request = InfoRequest::new("call-1", 7, body.map(str::to_string));

            let event = ToneEvent::receive(&mut session, &mut dialog, request);

            assert_eq!(dialog.replies, vec![200], "body {:?}", body);
            assert!(session.notified.is_empty(), "body {:?}", body);
            assert_eq!(event.state(), ToneEventState::Discarded);
        }
    }

    #[test]
    fn test_receive_keeps_partial_fields() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let request = InfoRequest::new("call-1", 8, Some("Signal=#\r\nDuration=".into()));

        let event = ToneEvent::receive(&mut session, &mut dialog, request);
        assert_eq!(event.tone().map(Tone::as_char), Some('#'));
        assert_eq!(event.duration(), None);
        assert_eq!(event.state(), ToneEventState::Discarded);
    }

    #[test]
    fn test_receive_accepts_unranged_duration() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let request = InfoRequest::new("call-1", 9, Some("Signal=1\r\nDuration=0".into()));

        let event = ToneEvent::receive(&mut session, &mut dialog, request);
        assert_eq!(event.duration(), Some(0));
        assert_eq!(session.notified.len(), 1);
    }

    #[test]
    fn test_incoming_event_ignores_responses() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let request = InfoRequest::new("call-1", 10, Some("Signal=1\r\nDuration=100".into()));
        let mut event = ToneEvent::receive(&mut session, &mut dialog, request);

        event.receive_response(SipResponse::new(200, "OK"));
        assert!(!event.is_resolved());
        assert_eq!(event.state(), ToneEventState::Received);
    }

    #[test]
    fn test_receive_ignores_trailing_content() {
        let (_, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let body = "Signal=12\r\nDuration=160 ms".to_string();
        let request = InfoRequest::new("call-1", 11, Some(body));

        let event = ToneEvent::receive(&mut session, &mut dialog, request);

        assert_eq!(event.state(), ToneEventState::Received);
        assert_eq!(event.tone().map(Tone::as_char), Some('1'));
        assert_eq!(event.duration(), Some(160));
        assert_eq!(dialog.replies, vec![200]);
        assert_eq!(session.notified.len(), 1);
    }

    #[test]
    fn test_incoming_event_does_not_forward_terminal_signals() {
        let (log, mut session, mut dialog) = fixtures(CallStatus::Confirmed);
        let request = InfoRequest::new("call-1", 12, Some("Signal=4\r\nDuration=100".into()));
        let mut event = ToneEvent::receive(&mut session, &mut dialog, request);
        log.borrow_mut().clear();

        event.on_request_timeout(&mut session);
        event.on_transport_error(&mut session);
        event.on_dialog_error(SipResponse::new(481, "Call Leg Does Not Exist"), &mut session);

        assert!(log.borrow().is_empty());
        assert!(!event.is_resolved());
        assert_eq!(event.state(), ToneEventState::Received);
    }
}
