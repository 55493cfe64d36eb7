/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat scheduling and liveness tracking.
//!
//! Every method takes the current [`Instant`] explicitly so the schedule can
//! be driven by tests without real sleeps. The monitor never reads the clock
//! itself.
//!
//! Liveness rules:
//! - no outbound traffic for one interval: a Heartbeat is due
//! - no inbound traffic for 1.2 intervals: a TestRequest is due
//! - no inbound traffic for one further interval after the TestRequest:
//!   the counterparty is dead

use std::time::{Duration, Instant};

/// Numerator/denominator of the inbound grace factor (1.2).
const GRACE_NUM: u32 = 6;
const GRACE_DEN: u32 = 5;

/// Tracks heartbeat deadlines for one session.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    test_request_at: Option<Instant>,
    test_request_count: u64,
}

impl HeartbeatMonitor {
    /// Creates a monitor with both clocks starting at `now`.
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_sent: now,
            last_received: now,
            test_request_at: None,
            test_request_count: 0,
        }
    }

    /// Returns the negotiated heartbeat interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Records an outbound transmission.
    pub fn on_sent(&mut self, now: Instant) {
        self.last_sent = now;
    }

    /// Records an inbound message. Any inbound traffic proves liveness and
    /// cancels an outstanding TestRequest.
    pub fn on_received(&mut self, now: Instant) {
        self.last_received = now;
        self.test_request_at = None;
    }

    /// Returns true when a Heartbeat should be sent to keep us alive from
    /// the counterparty's point of view.
    #[must_use]
    pub fn heartbeat_due(&self, now: Instant) -> bool {
        now.duration_since(self.last_sent) >= self.interval
    }

    /// Returns true when the counterparty has been quiet long enough to
    /// warrant a TestRequest, and none is outstanding.
    #[must_use]
    pub fn test_request_due(&self, now: Instant) -> bool {
        self.test_request_at.is_none()
            && now.duration_since(self.last_received) >= self.grace_window()
    }

    /// Records that a TestRequest was issued and returns a unique id for
    /// its TestReqID (112) field.
    pub fn mark_test_request(&mut self, now: Instant) -> String {
        self.test_request_at = Some(now);
        self.test_request_count += 1;
        format!("TEST-{}", self.test_request_count)
    }

    /// Returns true when an outstanding TestRequest has gone unanswered for
    /// a full further interval.
    #[must_use]
    pub fn timed_out(&self, now: Instant) -> bool {
        match self.test_request_at {
            Some(sent_at) => now.duration_since(sent_at) >= self.interval,
            None => false,
        }
    }

    /// Milliseconds since the last inbound message.
    #[must_use]
    pub fn silence_ms(&self, now: Instant) -> u64 {
        now.duration_since(self.last_received).as_millis() as u64
    }

    fn grace_window(&self) -> Duration {
        self.interval * GRACE_NUM / GRACE_DEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(30);

    #[test]
    fn test_heartbeat_due_after_interval() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(INTERVAL, start);

        assert!(!monitor.heartbeat_due(start + Duration::from_secs(29)));
        assert!(monitor.heartbeat_due(start + Duration::from_secs(30)));

        monitor.on_sent(start + Duration::from_secs(30));
        assert!(!monitor.heartbeat_due(start + Duration::from_secs(59)));
        assert!(monitor.heartbeat_due(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_test_request_after_grace() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(INTERVAL, start);

        // Grace window is interval * 1.2 = 36s.
        assert!(!monitor.test_request_due(start + Duration::from_secs(35)));
        assert!(monitor.test_request_due(start + Duration::from_secs(36)));

        let id = monitor.mark_test_request(start + Duration::from_secs(36));
        assert_eq!(id, "TEST-1");
        // One outstanding at a time.
        assert!(!monitor.test_request_due(start + Duration::from_secs(40)));
    }

    #[test]
    fn test_inbound_cancels_test_request() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(INTERVAL, start);

        monitor.mark_test_request(start + Duration::from_secs(36));
        monitor.on_received(start + Duration::from_secs(40));

        assert!(!monitor.timed_out(start + Duration::from_secs(120)));
        assert!(!monitor.test_request_due(start + Duration::from_secs(41)));
    }

    #[test]
    fn test_timeout_one_interval_after_test_request() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(INTERVAL, start);

        assert!(!monitor.timed_out(start + Duration::from_secs(300)));

        monitor.mark_test_request(start + Duration::from_secs(36));
        assert!(!monitor.timed_out(start + Duration::from_secs(65)));
        assert!(monitor.timed_out(start + Duration::from_secs(66)));
    }

    #[test]
    fn test_test_request_ids_are_unique() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(INTERVAL, start);

        let first = monitor.mark_test_request(start);
        monitor.on_received(start + Duration::from_secs(1));
        let second = monitor.mark_test_request(start + Duration::from_secs(40));
        assert_ne!(first, second);
    }
}
