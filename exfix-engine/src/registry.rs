/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session registry.
//!
//! Holds the session configs an acceptor is willing to host, concrete and
//! template alike. A connection's first Logon is matched here; wildcard
//! templates bind to the concrete CompID pair at that moment, so one
//! template can serve any number of counterparties.

use exfix_core::types::CompId;
use exfix_session::config::SessionConfig;

/// The set of sessions an acceptor accepts logons for.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    entries: Vec<SessionConfig>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session config or template.
    pub fn register(&mut self, config: SessionConfig) {
        self.entries.push(config);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, config: SessionConfig) -> Self {
        self.register(config);
        self
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches a logon identity against the registry.
    ///
    /// `remote_sender`/`remote_target` are tags 49/56 as the counterparty
    /// wrote them. Concrete entries win over templates; the first registered
    /// match is used. The returned config is always fully bound.
    #[must_use]
    pub fn resolve(
        &self,
        begin_string: &str,
        remote_sender: &CompId,
        remote_target: &CompId,
    ) -> Option<SessionConfig> {
        let matches = |entry: &&SessionConfig| {
            entry.begin_string == begin_string
                && entry.target.accepts(remote_sender)
                && entry.sender.accepts(remote_target)
        };

        self.entries
            .iter()
            .filter(|e| !e.is_template())
            .find(matches)
            .or_else(|| self.entries.iter().filter(|e| e.is_template()).find(matches))
            .map(|entry| entry.bind(remote_sender, remote_target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(s: &str) -> CompId {
        CompId::new(s).unwrap()
    }

    #[test]
    fn test_concrete_match() {
        let registry = SessionRegistry::new().with(
            SessionConfig::builder("FIX.4.4", comp("EXEC"), comp("BANZAI")).build(),
        );

        let bound = registry
            .resolve("FIX.4.4", &comp("BANZAI"), &comp("EXEC"))
            .unwrap();
        assert_eq!(bound.sender.as_str(), "EXEC");
        assert_eq!(bound.target.as_str(), "BANZAI");

        assert!(registry.resolve("FIX.4.2", &comp("BANZAI"), &comp("EXEC")).is_none());
        assert!(registry.resolve("FIX.4.4", &comp("OTHER"), &comp("EXEC")).is_none());
    }

    #[test]
    fn test_template_binds_any_pair() {
        let registry = SessionRegistry::new().with(SessionConfig::template("FIX.4.4").build());

        let first = registry
            .resolve("FIX.4.4", &comp("BANZAI"), &comp("EXEC"))
            .unwrap();
        assert_eq!(first.sender.as_str(), "EXEC");
        assert_eq!(first.target.as_str(), "BANZAI");

        let second = registry
            .resolve("FIX.4.4", &comp("ALPHA"), &comp("BETA"))
            .unwrap();
        assert_eq!(second.sender.as_str(), "BETA");
        assert_eq!(second.target.as_str(), "ALPHA");
    }

    #[test]
    fn test_concrete_wins_over_template() {
        let registry = SessionRegistry::new()
            .with(SessionConfig::template("FIX.4.4").build())
            .with(
                SessionConfig::builder("FIX.4.4", comp("EXEC"), comp("BANZAI"))
                    .reset_on_logon(true)
                    .build(),
            );

        let bound = registry
            .resolve("FIX.4.4", &comp("BANZAI"), &comp("EXEC"))
            .unwrap();
        assert!(bound.reset_on_logon, "concrete entry should take precedence");
    }

    #[test]
    fn test_template_begin_string_still_checked() {
        let registry = SessionRegistry::new().with(SessionConfig::template("FIX.4.4").build());
        assert!(registry.resolve("FIX.4.2", &comp("A"), &comp("B")).is_none());
    }
}
