/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store.
//!
//! Keeps all state in process memory behind a single `parking_lot` RwLock.
//! Suitable for acceptors whose sessions reset sequence numbers at logon;
//! nothing survives a restart.

use async_trait::async_trait;
use bytes::Bytes;
use exfix_core::error::StoreError;
use exfix_core::types::{Direction, SeqNum, SessionId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::traits::MessageStore;

#[derive(Debug, Default)]
struct SessionRecord {
    inbound: BTreeMap<u64, Bytes>,
    outbound: BTreeMap<u64, Bytes>,
    next_outbound: u64,
    expected_inbound: u64,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            inbound: BTreeMap::new(),
            outbound: BTreeMap::new(),
            next_outbound: 1,
            expected_inbound: 1,
        }
    }

    fn archive(&mut self, direction: Direction) -> &mut BTreeMap<u64, Bytes> {
        match direction {
            Direction::Inbound => &mut self.inbound,
            Direction::Outbound => &mut self.outbound,
        }
    }
}

/// Message store holding every session in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<R>(&self, session: &SessionId, f: impl FnOnce(&mut SessionRecord) -> R) -> R {
        let mut sessions = self.sessions.write();
        let record = sessions
            .entry(session.clone())
            .or_insert_with(SessionRecord::new);
        f(record)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(
        &self,
        session: &SessionId,
        direction: Direction,
        seq: SeqNum,
        raw: &[u8],
    ) -> Result<(), StoreError> {
        self.with_record(session, |record| {
            record
                .archive(direction)
                .entry(seq.value())
                .or_insert_with(|| Bytes::copy_from_slice(raw));
        });
        Ok(())
    }

    async fn range(
        &self,
        session: &SessionId,
        direction: Direction,
        begin: SeqNum,
        end: SeqNum,
    ) -> Result<Vec<Bytes>, StoreError> {
        self.with_record(session, |record| {
            let archive = record.archive(direction);
            let mut frames = Vec::with_capacity((end.value().saturating_sub(begin.value()) + 1) as usize);
            for seq in begin.value()..=end.value() {
                match archive.get(&seq) {
                    Some(raw) => frames.push(raw.clone()),
                    None => return Err(StoreError::NotFound { seq }),
                }
            }
            Ok(frames)
        })
    }

    async fn next_outbound_seq(&self, session: &SessionId) -> Result<SeqNum, StoreError> {
        Ok(self.with_record(session, |record| {
            let seq = record.next_outbound;
            record.next_outbound += 1;
            SeqNum::new(seq)
        }))
    }

    async fn current_outbound_seq(&self, session: &SessionId) -> Result<SeqNum, StoreError> {
        Ok(self.with_record(session, |record| SeqNum::new(record.next_outbound - 1)))
    }

    async fn expected_inbound_seq(&self, session: &SessionId) -> Result<SeqNum, StoreError> {
        Ok(self.with_record(session, |record| SeqNum::new(record.expected_inbound)))
    }

    async fn set_expected_inbound_seq(
        &self,
        session: &SessionId,
        seq: SeqNum,
    ) -> Result<(), StoreError> {
        self.with_record(session, |record| {
            record.expected_inbound = seq.value();
        });
        Ok(())
    }

    async fn reset(&self, session: &SessionId) -> Result<(), StoreError> {
        self.with_record(session, |record| {
            *record = SessionRecord::new();
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exfix_core::types::CompId;

    fn session() -> SessionId {
        SessionId::new(
            "FIX.4.4",
            CompId::new("EXEC").unwrap(),
            CompId::new("BANZAI").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fresh_session_state() {
        let store = MemoryStore::new();
        let id = session();

        assert_eq!(store.expected_inbound_seq(&id).await.unwrap(), SeqNum::START);
        assert_eq!(
            store.current_outbound_seq(&id).await.unwrap(),
            SeqNum::new(0)
        );
        assert_eq!(store.next_outbound_seq(&id).await.unwrap(), SeqNum::START);
        assert_eq!(store.next_outbound_seq(&id).await.unwrap(), SeqNum::new(2));
        assert_eq!(
            store.current_outbound_seq(&id).await.unwrap(),
            SeqNum::new(2)
        );
    }

    #[tokio::test]
    async fn test_append_and_range() {
        let store = MemoryStore::new();
        let id = session();

        for seq in 1..=3u64 {
            store
                .append(
                    &id,
                    Direction::Outbound,
                    SeqNum::new(seq),
                    format!("frame-{seq}").as_bytes(),
                )
                .await
                .unwrap();
        }

        let frames = store
            .range(&id, Direction::Outbound, SeqNum::new(2), SeqNum::new(3))
            .await
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"frame-2");
        assert_eq!(&frames[1][..], b"frame-3");
    }

    #[tokio::test]
    async fn test_range_reports_first_missing_seq() {
        let store = MemoryStore::new();
        let id = session();

        store
            .append(&id, Direction::Outbound, SeqNum::new(1), b"one")
            .await
            .unwrap();
        store
            .append(&id, Direction::Outbound, SeqNum::new(3), b"three")
            .await
            .unwrap();

        let err = store
            .range(&id, Direction::Outbound, SeqNum::new(1), SeqNum::new(3))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound { seq: 2 });
    }

    #[tokio::test]
    async fn test_append_is_first_write_wins() {
        let store = MemoryStore::new();
        let id = session();

        store
            .append(&id, Direction::Outbound, SeqNum::new(1), b"original")
            .await
            .unwrap();
        store
            .append(&id, Direction::Outbound, SeqNum::new(1), b"duplicate")
            .await
            .unwrap();

        let frames = store
            .range(&id, Direction::Outbound, SeqNum::new(1), SeqNum::new(1))
            .await
            .unwrap();
        assert_eq!(&frames[0][..], b"original");
    }

    #[tokio::test]
    async fn test_directions_are_independent() {
        let store = MemoryStore::new();
        let id = session();

        store
            .append(&id, Direction::Inbound, SeqNum::new(1), b"in")
            .await
            .unwrap();

        let err = store
            .range(&id, Direction::Outbound, SeqNum::new(1), SeqNum::new(1))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound { seq: 1 });
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = MemoryStore::new();
        let a = session();
        let b = a.flipped();

        store.next_outbound_seq(&a).await.unwrap();
        store.next_outbound_seq(&a).await.unwrap();

        assert_eq!(store.next_outbound_seq(&b).await.unwrap(), SeqNum::START);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_is_gapless() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let id = session();
        let tasks = 64u64;

        let mut handles = Vec::with_capacity(tasks as usize);
        for _ in 0..tasks {
            let store = std::sync::Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.next_outbound_seq(&id).await.unwrap().value()
            }));
        }

        let mut allocated = std::collections::BTreeSet::new();
        for handle in handles {
            assert!(allocated.insert(handle.await.unwrap()), "duplicate seq");
        }
        let expected: std::collections::BTreeSet<u64> = (1..=tasks).collect();
        assert_eq!(allocated, expected);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = MemoryStore::new();
        let id = session();

        store
            .append(&id, Direction::Outbound, SeqNum::new(1), b"frame")
            .await
            .unwrap();
        store.next_outbound_seq(&id).await.unwrap();
        store
            .set_expected_inbound_seq(&id, SeqNum::new(9))
            .await
            .unwrap();

        store.reset(&id).await.unwrap();

        assert_eq!(store.expected_inbound_seq(&id).await.unwrap(), SeqNum::START);
        assert_eq!(store.next_outbound_seq(&id).await.unwrap(), SeqNum::START);
        assert!(
            store
                .range(&id, Direction::Outbound, SeqNum::new(1), SeqNum::new(1))
                .await
                .is_err()
        );
    }
}
