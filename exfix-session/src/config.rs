/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! A [`SessionConfig`] describes one session an acceptor is willing to host.
//! CompIDs may be wildcards (`*`), in which case the config acts as a
//! template that binds to concrete identities at logon time.

use exfix_core::types::{CompId, SessionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default heartbeat interval when the initiator does not negotiate one.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default window for the first Logon to arrive after connect.
pub const DEFAULT_LOGON_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for the counterparty's Logout acknowledgment.
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on messages replayed per resend request.
pub const DEFAULT_MAX_RESEND_BATCH: u64 = 2500;

/// Configuration for one FIX session (or one session template).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// FIX protocol version (tag 8).
    pub begin_string: String,
    /// Our CompID (outbound tag 49). May be the wildcard in templates.
    pub sender: CompId,
    /// Counterparty CompID (outbound tag 56). May be the wildcard in
    /// templates.
    pub target: CompId,
    /// Heartbeat interval; superseded by the initiator's HeartBtInt (108).
    pub heartbeat_interval: Duration,
    /// How long a fresh connection may sit without a Logon.
    pub logon_timeout: Duration,
    /// How long to wait for a Logout acknowledgment before dropping.
    pub logout_timeout: Duration,
    /// Maximum messages replayed for a single resend request.
    pub max_resend_batch: u64,
    /// Reset both sequence numbers to 1 at every logon.
    pub reset_on_logon: bool,
}

impl SessionConfig {
    /// Starts building a config for the given session identity.
    #[must_use]
    pub fn builder(
        begin_string: impl Into<String>,
        sender: CompId,
        target: CompId,
    ) -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self {
                begin_string: begin_string.into(),
                sender,
                target,
                heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
                logon_timeout: DEFAULT_LOGON_TIMEOUT,
                logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
                max_resend_batch: DEFAULT_MAX_RESEND_BATCH,
                reset_on_logon: false,
            },
        }
    }

    /// Starts building a template that accepts any CompID pair.
    #[must_use]
    pub fn template(begin_string: impl Into<String>) -> SessionConfigBuilder {
        Self::builder(begin_string, CompId::wildcard(), CompId::wildcard())
    }

    /// Returns the session identity this config describes.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        SessionId::new(
            self.begin_string.clone(),
            self.sender.clone(),
            self.target.clone(),
        )
    }

    /// Returns true if either CompID is a wildcard.
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.sender.is_wildcard() || self.target.is_wildcard()
    }

    /// Returns a copy of this template bound to a concrete identity.
    ///
    /// `remote_sender`/`remote_target` are the CompIDs as the counterparty
    /// wrote them, so our sender binds to their target and vice versa.
    #[must_use]
    pub fn bind(&self, remote_sender: &CompId, remote_target: &CompId) -> Self {
        let mut bound = self.clone();
        if bound.sender.is_wildcard() {
            bound.sender = remote_target.clone();
        }
        if bound.target.is_wildcard() {
            bound.target = remote_sender.clone();
        }
        bound
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Sets the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Sets the logon timeout.
    #[must_use]
    pub fn logon_timeout(mut self, timeout: Duration) -> Self {
        self.config.logon_timeout = timeout;
        self
    }

    /// Sets the logout timeout.
    #[must_use]
    pub fn logout_timeout(mut self, timeout: Duration) -> Self {
        self.config.logout_timeout = timeout;
        self
    }

    /// Caps the number of messages replayed per resend request.
    #[must_use]
    pub fn max_resend_batch(mut self, max: u64) -> Self {
        self.config.max_resend_batch = max;
        self
    }

    /// Resets sequence numbers at every logon.
    #[must_use]
    pub fn reset_on_logon(mut self, reset: bool) -> Self {
        self.config.reset_on_logon = reset;
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }
}
