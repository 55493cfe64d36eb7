/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX session state machine.
//!
//! [`SessionMachine`] is pure session logic: it consumes transport events
//! (connected, message, timer tick, closed) and emits [`SessionOutput`]
//! instructions for the connection driver to execute. It performs no I/O and
//! never reads the clock; every entry point takes the current [`Instant`].
//! That keeps the full protocol state space reachable from plain unit tests.
//!
//! Lifecycle: `Disconnected -> LogonPending -> Active -> LogoutPending ->
//! Disconnected`. The first inbound message on a connection must be a Logon;
//! once active, the machine enforces sequencing, answers admin traffic, and
//! surfaces application messages for delivery.

use exfix_core::message::{Message, MsgType, WireMessage};
use exfix_core::tags;
use exfix_core::types::{SeqNum, SessionId};
use smallvec::SmallVec;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::admin;
use crate::config::SessionConfig;
use crate::heartbeat::HeartbeatMonitor;
use crate::sequence::{SeqCheck, validate};

/// Connection status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No transport attached.
    Disconnected,
    /// Transport connected, waiting for the counterparty's Logon.
    LogonPending,
    /// Logon exchange complete; normal traffic flows.
    Active,
    /// Our Logout is out, waiting for the acknowledgment.
    LogoutPending,
}

/// Why the machine decided to drop the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// No Logon arrived within the configured window.
    LogonTimeout,
    /// An outstanding TestRequest went unanswered.
    HeartbeatTimeout,
    /// Inbound sequence number below expected without PossDupFlag.
    LowSeqNum {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
    /// The counterparty broke session-level rules.
    ProtocolViolation(String),
    /// An orderly logout handshake finished.
    LogoutComplete,
    /// The counterparty never acknowledged our Logout.
    LogoutTimeout,
}

/// One instruction from the machine to the connection driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    /// Encode and send this message body on the session.
    Transmit(Message),
    /// Replay stored outbound messages `begin..=end` (`end` zero means
    /// everything sent so far).
    FulfillResend {
        /// First requested sequence number.
        begin: SeqNum,
        /// Last requested sequence number, or zero for open-ended.
        end: SeqNum,
    },
    /// Notify the application that the session is logged on.
    AppLogon,
    /// Notify the application that the session is logged off.
    AppLogout,
    /// Hand this message to the application.
    Deliver(WireMessage),
    /// Reset the store for this session; both sequence numbers return to 1.
    ResetStore,
    /// Drop the transport.
    Disconnect(DisconnectReason),
}

/// Outputs produced by one machine entry point.
pub type Outputs = SmallVec<[SessionOutput; 4]>;

/// Session logic for one concrete session identity.
#[derive(Debug)]
pub struct SessionMachine {
    config: SessionConfig,
    status: SessionStatus,
    expected_inbound: SeqNum,
    heartbeat: Option<HeartbeatMonitor>,
    connected_at: Option<Instant>,
    logout_deadline: Option<Instant>,
    /// Requested resend window; at most one outstanding.
    pending_resend: Option<(SeqNum, SeqNum)>,
    app_logged_on: bool,
}

impl SessionMachine {
    /// Creates a machine for a concrete (non-template) session config.
    ///
    /// `expected_inbound` is the next sequence number the store expects from
    /// the counterparty.
    #[must_use]
    pub fn new(config: SessionConfig, expected_inbound: SeqNum) -> Self {
        debug_assert!(!config.is_template(), "machine requires a bound config");
        Self {
            config,
            status: SessionStatus::Disconnected,
            expected_inbound,
            heartbeat: None,
            connected_at: None,
            logout_deadline: None,
            pending_resend: None,
            app_logged_on: false,
        }
    }

    /// Returns the session identity.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.config.session_id()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the next inbound sequence number the machine expects.
    ///
    /// The driver persists this to the store after processing a batch.
    #[must_use]
    pub fn expected_inbound(&self) -> SeqNum {
        self.expected_inbound
    }

    /// A transport attached; the logon window opens.
    pub fn on_connected(&mut self, now: Instant) {
        self.status = SessionStatus::LogonPending;
        self.connected_at = Some(now);
    }

    /// The transport closed without a logout handshake.
    #[must_use]
    pub fn on_transport_closed(&mut self) -> Outputs {
        let mut outputs = Outputs::new();
        if self.app_logged_on {
            self.app_logged_on = false;
            outputs.push(SessionOutput::AppLogout);
        }
        self.status = SessionStatus::Disconnected;
        outputs
    }

    /// The driver transmitted a message outside the machine's own outputs
    /// (an application send); keeps the heartbeat schedule accurate.
    pub fn on_sent(&mut self, now: Instant) {
        if let Some(hb) = &mut self.heartbeat {
            hb.on_sent(now);
        }
    }

    /// Processes one inbound message.
    #[must_use]
    pub fn on_message(&mut self, wire: WireMessage, now: Instant) -> Outputs {
        let mut outputs = Outputs::new();
        if let Some(hb) = &mut self.heartbeat {
            hb.on_received(now);
        }

        match self.status {
            SessionStatus::Disconnected => {}
            SessionStatus::LogonPending => self.handle_logon(&mut outputs, wire, now),
            SessionStatus::Active | SessionStatus::LogoutPending => {
                self.handle_established(&mut outputs, wire, now);
            }
        }
        outputs
    }

    /// Runs the timer checks. Call on a fixed cadence.
    #[must_use]
    pub fn on_tick(&mut self, now: Instant) -> Outputs {
        let mut outputs = Outputs::new();
        match self.status {
            SessionStatus::Disconnected => {}
            SessionStatus::LogonPending => {
                if let Some(connected_at) = self.connected_at
                    && now.duration_since(connected_at) >= self.config.logon_timeout
                {
                    self.disconnect(&mut outputs, DisconnectReason::LogonTimeout);
                }
            }
            SessionStatus::Active => self.tick_active(&mut outputs, now),
            SessionStatus::LogoutPending => {
                if let Some(deadline) = self.logout_deadline
                    && now >= deadline
                {
                    self.disconnect(&mut outputs, DisconnectReason::LogoutTimeout);
                }
            }
        }
        outputs
    }

    /// Starts an orderly logout. No-op unless the session is active.
    #[must_use]
    pub fn initiate_logout(&mut self, text: Option<&str>, now: Instant) -> Outputs {
        let mut outputs = Outputs::new();
        if self.status == SessionStatus::Active {
            self.transmit(&mut outputs, admin::logout(text), now);
            self.status = SessionStatus::LogoutPending;
            self.logout_deadline = Some(now + self.config.logout_timeout);
        }
        outputs
    }

    fn handle_logon(&mut self, outputs: &mut Outputs, wire: WireMessage, now: Instant) {
        if wire.body.msg_type() != &MsgType::Logon {
            self.disconnect(
                outputs,
                DisconnectReason::ProtocolViolation(format!(
                    "first message must be a Logon, got MsgType={}",
                    wire.body.msg_type()
                )),
            );
            return;
        }

        // The counterparty writes the identity flipped: their sender is our
        // target.
        if wire.begin_string != self.config.begin_string
            || wire.sender != self.config.target
            || wire.target != self.config.sender
        {
            self.disconnect(
                outputs,
                DisconnectReason::ProtocolViolation(format!(
                    "logon identity {}:{}->{} does not match session {}",
                    wire.begin_string,
                    wire.sender,
                    wire.target,
                    self.session_id()
                )),
            );
            return;
        }

        let interval = wire
            .body
            .get_u64(tags::HEART_BT_INT)
            .map(Duration::from_secs)
            .unwrap_or(self.config.heartbeat_interval);

        let reset = self.config.reset_on_logon
            || wire.body.get_bool(tags::RESET_SEQ_NUM_FLAG).unwrap_or(false);
        if reset {
            outputs.push(SessionOutput::ResetStore);
            self.expected_inbound = SeqNum::START;
        }

        match validate(self.expected_inbound, wire.seq) {
            SeqCheck::TooLow => {
                self.disconnect(
                    outputs,
                    DisconnectReason::LowSeqNum {
                        expected: self.expected_inbound.value(),
                        received: wire.seq.value(),
                    },
                );
                return;
            }
            SeqCheck::Expected => {
                self.expected_inbound = self.expected_inbound.next();
            }
            SeqCheck::Gap => {
                // Accept the logon, then recover the missing range.
                debug!(
                    session = %self.session_id(),
                    expected = self.expected_inbound.value(),
                    received = wire.seq.value(),
                    "sequence gap at logon"
                );
            }
        }

        self.heartbeat = Some(HeartbeatMonitor::new(interval, now));
        self.status = SessionStatus::Active;
        self.app_logged_on = true;
        self.transmit(outputs, admin::logon_ack(interval.as_secs(), reset), now);
        outputs.push(SessionOutput::AppLogon);

        if wire.seq > self.expected_inbound {
            let end = SeqNum::new(wire.seq.value() - 1);
            self.request_resend(outputs, end, now);
        }
    }

    fn handle_established(&mut self, outputs: &mut Outputs, wire: WireMessage, now: Instant) {
        // SequenceReset carries an intentionally out-of-band sequence number
        // and is applied before validation.
        if wire.body.msg_type() == &MsgType::SequenceReset {
            self.handle_sequence_reset(outputs, &wire, now);
            return;
        }

        match validate(self.expected_inbound, wire.seq) {
            SeqCheck::TooLow => {
                if wire.poss_dup {
                    debug!(
                        session = %self.session_id(),
                        seq = wire.seq.value(),
                        "discarding duplicate"
                    );
                } else {
                    self.disconnect(
                        outputs,
                        DisconnectReason::LowSeqNum {
                            expected: self.expected_inbound.value(),
                            received: wire.seq.value(),
                        },
                    );
                }
            }
            SeqCheck::Gap => {
                // A logout must still be honored so the counterparty is not
                // left hanging mid-handshake.
                if wire.body.msg_type() == &MsgType::Logout {
                    self.handle_logout(outputs, now);
                    return;
                }
                if self.pending_resend.is_none() {
                    let end = SeqNum::new(wire.seq.value() - 1);
                    self.request_resend(outputs, end, now);
                }
                debug!(
                    session = %self.session_id(),
                    expected = self.expected_inbound.value(),
                    received = wire.seq.value(),
                    "discarding message ahead of sequence"
                );
            }
            SeqCheck::Expected => {
                self.expected_inbound = self.expected_inbound.next();
                if let Some((_, end)) = self.pending_resend
                    && self.expected_inbound > end
                {
                    self.pending_resend = None;
                }
                self.dispatch(outputs, wire, now);
            }
        }
    }

    fn dispatch(&mut self, outputs: &mut Outputs, wire: WireMessage, now: Instant) {
        match wire.body.msg_type() {
            MsgType::Heartbeat => {}
            MsgType::TestRequest => {
                let echo = wire.body.get(tags::TEST_REQ_ID);
                self.transmit(outputs, admin::heartbeat(echo), now);
            }
            MsgType::ResendRequest => {
                let begin = wire.body.get_u64(tags::BEGIN_SEQ_NO);
                let end = wire.body.get_u64(tags::END_SEQ_NO);
                match (begin, end) {
                    (Ok(begin), Ok(end)) => outputs.push(SessionOutput::FulfillResend {
                        begin: SeqNum::new(begin),
                        end: SeqNum::new(end),
                    }),
                    _ => {
                        self.transmit(
                            outputs,
                            admin::reject(
                                wire.seq,
                                "2",
                                admin::REJECT_REASON_VALUE_INCORRECT,
                                "BeginSeqNo/EndSeqNo missing or invalid",
                            ),
                            now,
                        );
                    }
                }
            }
            MsgType::Reject => {
                warn!(
                    session = %self.session_id(),
                    text = wire.body.get(tags::TEXT).unwrap_or(""),
                    ref_seq = wire.body.get(tags::REF_SEQ_NUM).unwrap_or(""),
                    "counterparty rejected a message"
                );
            }
            MsgType::Logout => self.handle_logout(outputs, now),
            MsgType::Logon => {
                self.disconnect(
                    outputs,
                    DisconnectReason::ProtocolViolation(
                        "Logon received on an established session".to_string(),
                    ),
                );
            }
            // Handled before dispatch.
            MsgType::SequenceReset => {}
            _ => outputs.push(SessionOutput::Deliver(wire)),
        }
    }

    fn handle_sequence_reset(&mut self, outputs: &mut Outputs, wire: &WireMessage, now: Instant) {
        let new_seq = match wire.body.get_u64(tags::NEW_SEQ_NO) {
            Ok(value) => SeqNum::new(value),
            Err(_) => {
                self.transmit(
                    outputs,
                    admin::reject(
                        wire.seq,
                        "4",
                        admin::REJECT_REASON_VALUE_INCORRECT,
                        "NewSeqNo missing or invalid",
                    ),
                    now,
                );
                return;
            }
        };

        if new_seq > self.expected_inbound {
            debug!(
                session = %self.session_id(),
                from = self.expected_inbound.value(),
                to = new_seq.value(),
                "sequence reset"
            );
            self.expected_inbound = new_seq;
            if let Some((_, end)) = self.pending_resend
                && self.expected_inbound > end
            {
                self.pending_resend = None;
            }
        } else if new_seq < self.expected_inbound {
            self.transmit(
                outputs,
                admin::reject(
                    wire.seq,
                    "4",
                    admin::REJECT_REASON_VALUE_INCORRECT,
                    "NewSeqNo may not decrease",
                ),
                now,
            );
        }
    }

    fn handle_logout(&mut self, outputs: &mut Outputs, now: Instant) {
        if self.status == SessionStatus::Active {
            // Counterparty initiated; acknowledge before dropping.
            self.transmit(outputs, admin::logout(None), now);
        }
        if self.app_logged_on {
            self.app_logged_on = false;
            outputs.push(SessionOutput::AppLogout);
        }
        self.disconnect(outputs, DisconnectReason::LogoutComplete);
    }

    fn tick_active(&mut self, outputs: &mut Outputs, now: Instant) {
        let Some(hb) = &mut self.heartbeat else {
            return;
        };

        if hb.timed_out(now) {
            let elapsed = hb.silence_ms(now);
            warn!(
                session = %self.session_id(),
                silence_ms = elapsed,
                "test request unanswered"
            );
            self.disconnect(outputs, DisconnectReason::HeartbeatTimeout);
            return;
        }
        if hb.test_request_due(now) {
            let id = hb.mark_test_request(now);
            self.transmit(outputs, admin::test_request(&id), now);
            return;
        }
        if hb.heartbeat_due(now) {
            self.transmit(outputs, admin::heartbeat(None), now);
        }
    }

    fn request_resend(&mut self, outputs: &mut Outputs, end: SeqNum, now: Instant) {
        self.pending_resend = Some((self.expected_inbound, end));
        self.transmit(outputs, admin::resend_request(self.expected_inbound, end), now);
    }

    fn transmit(&mut self, outputs: &mut Outputs, msg: Message, now: Instant) {
        if let Some(hb) = &mut self.heartbeat {
            hb.on_sent(now);
        }
        outputs.push(SessionOutput::Transmit(msg));
    }

    fn disconnect(&mut self, outputs: &mut Outputs, reason: DisconnectReason) {
        self.status = SessionStatus::Disconnected;
        outputs.push(SessionOutput::Disconnect(reason));
    }
}
