/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message store abstraction.
//!
//! The store owns sequence number allocation and the per-session archive of
//! sent and received frames. Resend requests are served from the outbound
//! archive byte-for-byte; the store never re-encodes.

use async_trait::async_trait;
use bytes::Bytes;
use exfix_core::error::StoreError;
use exfix_core::types::{Direction, SeqNum, SessionId};

/// Per-session persistence of messages and sequence state.
///
/// Implementations must be safe to share across connection tasks. All
/// sequence state for a session survives disconnection; only [`reset`]
/// discards it.
///
/// [`reset`]: MessageStore::reset
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Archives a frame under `(session, direction, seq)`.
    ///
    /// Appending the same key twice keeps the first write. A message resent
    /// with PossDupFlag must not overwrite the original.
    ///
    /// # Errors
    /// Returns [`StoreError::AppendFailed`] if the frame cannot be persisted.
    async fn append(
        &self,
        session: &SessionId,
        direction: Direction,
        seq: SeqNum,
        raw: &[u8],
    ) -> Result<(), StoreError>;

    /// Retrieves archived frames for `begin..=end` in sequence order.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] naming the first sequence number in
    /// the range with no archived frame.
    async fn range(
        &self,
        session: &SessionId,
        direction: Direction,
        begin: SeqNum,
        end: SeqNum,
    ) -> Result<Vec<Bytes>, StoreError>;

    /// Allocates the next outbound sequence number.
    ///
    /// Allocation and increment are a single atomic step; two concurrent
    /// senders can never obtain the same number.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if sequence state cannot be read or written.
    async fn next_outbound_seq(&self, session: &SessionId) -> Result<SeqNum, StoreError>;

    /// Returns the highest outbound sequence number allocated so far.
    ///
    /// Zero (an invalid [`SeqNum`]) before anything has been sent. Used to
    /// resolve an open-ended resend request (`EndSeqNo=0`).
    ///
    /// # Errors
    /// Returns a [`StoreError`] if sequence state cannot be read.
    async fn current_outbound_seq(&self, session: &SessionId) -> Result<SeqNum, StoreError>;

    /// Returns the next inbound sequence number this session expects.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if sequence state cannot be read.
    async fn expected_inbound_seq(&self, session: &SessionId) -> Result<SeqNum, StoreError>;

    /// Overwrites the expected inbound sequence number.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if sequence state cannot be written.
    async fn set_expected_inbound_seq(
        &self,
        session: &SessionId,
        seq: SeqNum,
    ) -> Result<(), StoreError>;

    /// Discards all archived messages and returns both sequence numbers to 1.
    ///
    /// Invoked when a logon carries ResetSeqNumFlag (141=Y).
    ///
    /// # Errors
    /// Returns a [`StoreError`] if state cannot be cleared.
    async fn reset(&self, session: &SessionId) -> Result<(), StoreError>;
}
