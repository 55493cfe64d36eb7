/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! TCP acceptor runtime.
//!
//! [`Acceptor::bind`] starts a listener and returns an [`AcceptorHandle`].
//! Each accepted connection runs as its own task: a framed reader drives the
//! [`SessionMachine`], a writer task drains the outbound byte queue, and a
//! fixed-cadence tick feeds the machine's timers. The machine makes every
//! protocol decision; this module only executes its outputs against the
//! store, the application, and the socket.

use bytes::Bytes;
use exfix_codec::encoder::{encode_message, encode_poss_dup};
use exfix_codec::framing::FixFrameCodec;
use exfix_core::error::{FixError, Result, SessionError, StoreError};
use exfix_core::message::{Message, WireMessage};
use exfix_core::types::{Direction, SeqNum, SessionId, UtcTimestamp};
use exfix_session::admin;
use exfix_session::config::SessionConfig;
use exfix_session::machine::{Outputs, SessionMachine, SessionOutput, SessionStatus};
use exfix_store::MessageStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::application::Application;
use crate::registry::SessionRegistry;

/// Runtime settings for the acceptor.
#[derive(Debug, Clone)]
pub struct AcceptorConfig {
    /// How long a fresh connection may wait before its first frame.
    pub logon_timeout: Duration,
    /// Cadence of the session timer checks.
    pub tick_interval: Duration,
    /// How long `stop` waits for logout handshakes to drain.
    pub drain_timeout: Duration,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue: usize,
    /// Maximum accepted frame size in bytes.
    pub max_frame_size: usize,
}

impl Default for AcceptorConfig {
    fn default() -> Self {
        Self {
            logon_timeout: Duration::from_secs(10),
            tick_interval: Duration::from_millis(250),
            drain_timeout: Duration::from_secs(5),
            outbound_queue: 64,
            max_frame_size: exfix_codec::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

type SessionMap = Arc<RwLock<HashMap<SessionId, mpsc::Sender<Message>>>>;

/// A FIX acceptor ready to bind.
pub struct Acceptor {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn MessageStore>,
    app: Arc<dyn Application>,
    config: AcceptorConfig,
}

impl Acceptor {
    /// Creates an acceptor from its three collaborators.
    pub fn new(
        registry: SessionRegistry,
        store: Arc<dyn MessageStore>,
        app: Arc<dyn Application>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            app,
            config: AcceptorConfig::default(),
        }
    }

    /// Overrides the runtime settings.
    #[must_use]
    pub fn with_config(mut self, config: AcceptorConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// # Errors
    /// Returns the I/O error if the address cannot be bound.
    pub async fn bind(self, addr: impl ToSocketAddrs) -> Result<AcceptorHandle> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let sessions: SessionMap = Arc::new(RwLock::new(HashMap::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(addr = %local_addr, "acceptor listening");

        let drain_timeout = self.config.drain_timeout;
        let join = tokio::spawn(accept_loop(
            listener,
            self.registry,
            self.store,
            self.app,
            self.config,
            Arc::clone(&sessions),
            shutdown_rx,
        ));

        Ok(AcceptorHandle {
            local_addr,
            sessions,
            shutdown: shutdown_tx,
            drain_timeout,
            join,
        })
    }
}

/// Handle to a running acceptor.
pub struct AcceptorHandle {
    local_addr: SocketAddr,
    sessions: SessionMap,
    shutdown: watch::Sender<bool>,
    drain_timeout: Duration,
    join: tokio::task::JoinHandle<()>,
}

impl AcceptorHandle {
    /// The address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Identities of the sessions currently logged on.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Sends an application message on an active session.
    ///
    /// # Errors
    /// Returns [`SessionError::SessionNotFound`] if no active session has
    /// this identity, or [`SessionError::ConnectionClosed`] if its
    /// connection is tearing down.
    pub async fn send(&self, session: &SessionId, msg: Message) -> Result<()> {
        let tx = self
            .sessions
            .read()
            .get(session)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound {
                session: session.to_string(),
            })?;
        tx.send(msg).await.map_err(|_| {
            FixError::Session(SessionError::ConnectionClosed {
                reason: "session outbound queue closed".to_string(),
            })
        })
    }

    /// Stops accepting, logs active sessions out, and waits for the drain.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if timeout(self.drain_timeout + Duration::from_secs(1), self.join)
            .await
            .is_err()
        {
            warn!("acceptor did not drain in time");
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    store: Arc<dyn MessageStore>,
    app: Arc<dyn Application>,
    config: AcceptorConfig,
    sessions: SessionMap,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "connection accepted");
                    connections.spawn(handle_connection(
                        stream,
                        peer,
                        Arc::clone(&registry),
                        Arc::clone(&store),
                        Arc::clone(&app),
                        config.clone(),
                        Arc::clone(&sessions),
                        shutdown.clone(),
                    ));
                }
                Err(err) => warn!(error = %err, "accept failed"),
            },
            _ = shutdown.changed() => break,
            // Reap finished connection tasks as we go.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    // Connections observe the same shutdown signal and run their logout
    // handshakes; give them the drain window, then cut the stragglers.
    let drain = async {
        while connections.join_next().await.is_some() {}
    };
    if timeout(config.drain_timeout, drain).await.is_err() {
        warn!("dropping connections that did not finish logout");
        connections.abort_all();
    }
    info!("acceptor stopped");
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<SessionRegistry>,
    store: Arc<dyn MessageStore>,
    app: Arc<dyn Application>,
    config: AcceptorConfig,
    sessions: SessionMap,
    mut shutdown: watch::Receiver<bool>,
) {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    let mut framed = FramedRead::new(
        read_half,
        FixFrameCodec::with_max_frame_size(config.max_frame_size),
    );

    // The first frame must arrive within the logon window and must match a
    // registered session before any state is created.
    let first = match timeout(config.logon_timeout, framed.next()).await {
        Ok(Some(Ok(wire))) => wire,
        Ok(Some(Err(err))) => {
            warn!(peer = %peer, error = %err, "unreadable first frame");
            return;
        }
        Ok(None) => {
            debug!(peer = %peer, "closed before logon");
            return;
        }
        Err(_) => {
            warn!(peer = %peer, "no logon within {:?}", config.logon_timeout);
            return;
        }
    };

    let Some(bound) = registry.resolve(&first.begin_string, &first.sender, &first.target) else {
        warn!(
            peer = %peer,
            identity = %first.remote_session_id(),
            "logon rejected: no matching session"
        );
        return;
    };
    let session_id = bound.session_id();

    let expected = match store.expected_inbound_seq(&session_id).await {
        Ok(seq) => seq,
        Err(err) => {
            error!(session = %session_id, error = %err, "store unavailable");
            return;
        }
    };

    let (writer_tx, writer_rx) = mpsc::channel::<Bytes>(config.outbound_queue);
    let writer = tokio::spawn(writer_loop(write_half, writer_rx));

    let conn = Connection {
        session_id: session_id.clone(),
        config: bound.clone(),
        store,
        app,
        writer_tx,
    };
    let mut machine = SessionMachine::new(bound, expected);
    machine.on_connected(Instant::now());

    let outputs = match conn.archive_inbound(&first).await {
        Ok(()) => machine.on_message(first, Instant::now()),
        Err(err) => {
            error!(session = %session_id, error = %err, "store unavailable");
            machine.on_transport_closed()
        }
    };
    let mut open = match conn.process(outputs).await {
        Ok(open) => open,
        Err(err) => {
            error!(session = %session_id, error = %err, "session failed");
            false
        }
    };
    conn.persist_expected(&machine).await;

    let (app_tx, mut app_rx) = mpsc::channel::<Message>(config.outbound_queue);
    if open {
        sessions.write().insert(session_id.clone(), app_tx);
    }

    let mut tick = tokio::time::interval(config.tick_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while open {
        let outputs: Outputs = tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(wire)) => match conn.archive_inbound(&wire).await {
                    Ok(()) => machine.on_message(wire, Instant::now()),
                    Err(err) => {
                        error!(session = %session_id, error = %err, "store unavailable");
                        machine.on_transport_closed()
                    }
                },
                Some(Err(err)) => {
                    error!(session = %session_id, error = %err, "read failed");
                    machine.on_transport_closed()
                }
                None => machine.on_transport_closed(),
            },
            msg = app_rx.recv() => match msg {
                Some(msg) => {
                    if machine.status() == SessionStatus::Active {
                        if let Err(err) = conn.send_message(&msg).await {
                            error!(session = %session_id, error = %err, "send failed");
                            break;
                        }
                        machine.on_sent(Instant::now());
                    } else {
                        debug!(session = %session_id, "dropping app message, session not active");
                    }
                    continue;
                }
                None => continue,
            },
            _ = tick.tick() => machine.on_tick(Instant::now()),
            _ = shutdown.changed() => machine.initiate_logout(Some("acceptor shutting down"), Instant::now()),
        };

        match conn.process(outputs).await {
            Ok(still_open) => open = still_open,
            Err(err) => {
                error!(session = %session_id, error = %err, "session failed");
                open = false;
            }
        }
        conn.persist_expected(&machine).await;

        if machine.status() == SessionStatus::Disconnected {
            open = false;
        }
    }

    sessions.write().remove(&session_id);
    drop(conn);
    let _ = writer.await;
    debug!(session = %session_id, peer = %peer, "connection finished");
}

async fn writer_loop(mut write_half: OwnedWriteHalf, mut rx: mpsc::Receiver<Bytes>) {
    while let Some(frame) = rx.recv().await {
        if let Err(err) = write_half.write_all(&frame).await {
            warn!(error = %err, "socket write failed");
            break;
        }
    }
    let _ = write_half.shutdown().await;
}

/// Executes machine outputs against the store, application, and socket.
struct Connection {
    session_id: SessionId,
    config: SessionConfig,
    store: Arc<dyn MessageStore>,
    app: Arc<dyn Application>,
    writer_tx: mpsc::Sender<Bytes>,
}

impl Connection {
    /// Runs one batch of outputs. Returns false once the connection should
    /// close.
    async fn process(&self, outputs: Outputs) -> Result<bool> {
        for output in outputs {
            match output {
                SessionOutput::Transmit(msg) => self.send_message(&msg).await?,
                SessionOutput::FulfillResend { begin, end } => {
                    self.fulfill_resend(begin, end).await?;
                }
                SessionOutput::Deliver(wire) => self.deliver(wire).await?,
                SessionOutput::AppLogon => self.app.on_logon(&self.session_id).await,
                SessionOutput::AppLogout => self.app.on_logout(&self.session_id).await,
                SessionOutput::ResetStore => self.store.reset(&self.session_id).await?,
                SessionOutput::Disconnect(reason) => {
                    info!(session = %self.session_id, reason = ?reason, "disconnecting");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Assigns a sequence number, encodes, archives, and queues one message.
    async fn send_message(&self, body: &Message) -> Result<()> {
        let seq = self.store.next_outbound_seq(&self.session_id).await?;
        let frame = encode_message(body, &self.session_id, seq, UtcTimestamp::now())
            .map_err(FixError::Encode)?;
        self.store
            .append(&self.session_id, Direction::Outbound, seq, &frame)
            .await?;
        self.write(frame.freeze()).await
    }

    /// Replays stored outbound frames byte-identically; gaps in the archive
    /// are covered with a SequenceReset-GapFill.
    async fn fulfill_resend(&self, begin: SeqNum, end: SeqNum) -> Result<()> {
        let current = self.store.current_outbound_seq(&self.session_id).await?;
        if !current.is_valid() || begin > current {
            return Ok(());
        }

        // EndSeqNo of zero means "everything sent so far".
        let mut end = if end.value() == 0 || end > current {
            current
        } else {
            end
        };
        let cap = SeqNum::new(begin.value() + self.config.max_resend_batch - 1);
        if end > cap {
            warn!(
                session = %self.session_id,
                begin = begin.value(),
                end = end.value(),
                cap = cap.value(),
                "resend request truncated"
            );
            end = cap;
        }

        info!(
            session = %self.session_id,
            begin = begin.value(),
            end = end.value(),
            "replaying stored messages"
        );

        let mut seq = begin;
        while seq <= end {
            if let Some(frame) = self.fetch_outbound(seq).await? {
                self.write(frame).await?;
                seq = seq.next();
                continue;
            }

            // Walk to the end of the missing run, then skip it with a single
            // GapFill whose NewSeqNo points at the next frame that will
            // actually go out.
            let run_start = seq;
            seq = seq.next();
            let mut resume: Option<Bytes> = None;
            while seq <= end {
                if let Some(frame) = self.fetch_outbound(seq).await? {
                    resume = Some(frame);
                    break;
                }
                seq = seq.next();
            }
            warn!(
                session = %self.session_id,
                from = run_start.value(),
                new_seq = seq.value(),
                "archive incomplete, gap-filling missing run"
            );
            let gap_fill = admin::sequence_reset_gap_fill(seq);
            let frame =
                encode_poss_dup(&gap_fill, &self.session_id, run_start, UtcTimestamp::now())
                    .map_err(FixError::Encode)?;
            self.write(frame.freeze()).await?;
            if let Some(frame) = resume {
                self.write(frame).await?;
                seq = seq.next();
            }
        }
        Ok(())
    }

    /// Looks up one archived outbound frame; a missing sequence is a gap,
    /// not an error.
    async fn fetch_outbound(&self, seq: SeqNum) -> Result<Option<Bytes>> {
        match self
            .store
            .range(&self.session_id, Direction::Outbound, seq, seq)
            .await
        {
            Ok(mut frames) => Ok(frames.pop()),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Archives a decoded inbound frame. The append is idempotent, so
    /// possible-duplicate replays land on the first stored copy.
    async fn archive_inbound(&self, wire: &WireMessage) -> Result<()> {
        self.store
            .append(&self.session_id, Direction::Inbound, wire.seq, &wire.raw)
            .await?;
        Ok(())
    }

    /// Hands an in-sequence application message to the application and
    /// sends back its reply or a session-level reject.
    async fn deliver(&self, wire: WireMessage) -> Result<()> {
        match self.app.on_message(&self.session_id, &wire.body).await {
            Ok(Some(reply)) => self.send_message(&reply).await,
            Ok(None) => Ok(()),
            Err(reason) => {
                debug!(
                    session = %self.session_id,
                    seq = wire.seq.value(),
                    reason = %reason.text,
                    "application rejected message"
                );
                let reject = admin::reject(
                    wire.seq,
                    wire.body.msg_type().code(),
                    admin::REJECT_REASON_OTHER,
                    &reason.text,
                );
                self.send_message(&reject).await
            }
        }
    }

    async fn persist_expected(&self, machine: &SessionMachine) {
        if let Err(err) = self
            .store
            .set_expected_inbound_seq(&self.session_id, machine.expected_inbound())
            .await
        {
            error!(session = %self.session_id, error = %err, "failed to persist inbound seq");
        }
    }

    async fn write(&self, frame: Bytes) -> Result<()> {
        self.writer_tx.send(frame).await.map_err(|_| {
            FixError::Session(SessionError::ConnectionClosed {
                reason: "writer task gone".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::FillApplication;
    use bytes::BytesMut;
    use exfix_codec::decoder::FrameDecoder;
    use exfix_core::message::MsgType;
    use exfix_core::tags;
    use exfix_core::types::CompId;
    use exfix_store::MemoryStore;

    fn session_id() -> SessionId {
        SessionId::new(
            "FIX.4.4",
            CompId::new("EXEC").unwrap(),
            CompId::new("BANZAI").unwrap(),
        )
    }

    /// Builds a connection whose outbound archive holds `archived` sequence
    /// numbers out of `allocated` ever assigned.
    async fn connection_with_archive(
        archived: &[u64],
        allocated: u64,
    ) -> (Connection, mpsc::Receiver<Bytes>) {
        let id = session_id();
        let store: Arc<dyn MessageStore> = Arc::new(MemoryStore::new());
        for _ in 0..allocated {
            store.next_outbound_seq(&id).await.unwrap();
        }
        for &seq in archived {
            let mut body = Message::new(MsgType::ExecutionReport);
            body.set(tags::CL_ORD_ID, format!("ORD-{seq}"));
            let frame =
                encode_message(&body, &id, SeqNum::new(seq), UtcTimestamp::from_millis(0))
                    .unwrap();
            store
                .append(&id, Direction::Outbound, SeqNum::new(seq), &frame)
                .await
                .unwrap();
        }

        let (writer_tx, writer_rx) = mpsc::channel(64);
        let conn = Connection {
            session_id: id.clone(),
            config: SessionConfig::builder(
                "FIX.4.4",
                CompId::new("EXEC").unwrap(),
                CompId::new("BANZAI").unwrap(),
            )
            .build(),
            store,
            app: Arc::new(FillApplication::new()),
            writer_tx,
        };
        (conn, writer_rx)
    }

    fn drain_frames(rx: &mut mpsc::Receiver<Bytes>) -> Vec<WireMessage> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let mut buf = BytesMut::from(frame.as_ref());
            frames.push(decoder.decode(&mut buf).unwrap().unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_resend_replays_around_missing_sequence() {
        let (conn, mut rx) = connection_with_archive(&[1, 2, 4], 4).await;
        conn.fulfill_resend(SeqNum::new(1), SeqNum::new(4))
            .await
            .unwrap();
        drop(conn);

        // Archived frames 1 and 2 replay as stored, the missing seq 3
        // becomes a GapFill pointing at 4, and 4 replays as stored.
        let sent = drain_frames(&mut rx);
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].seq, SeqNum::new(1));
        assert_eq!(sent[0].body.get(tags::CL_ORD_ID), Some("ORD-1"));
        assert_eq!(sent[1].seq, SeqNum::new(2));
        assert_eq!(sent[1].body.get(tags::CL_ORD_ID), Some("ORD-2"));
        assert_eq!(sent[2].seq, SeqNum::new(3));
        assert_eq!(sent[2].body.msg_type(), &MsgType::SequenceReset);
        assert_eq!(sent[2].body.get(tags::GAP_FILL_FLAG), Some("Y"));
        assert_eq!(sent[2].body.get(tags::NEW_SEQ_NO), Some("4"));
        assert!(sent[2].poss_dup);
        assert_eq!(sent[3].seq, SeqNum::new(4));
        assert_eq!(sent[3].body.get(tags::CL_ORD_ID), Some("ORD-4"));
    }

    #[tokio::test]
    async fn test_resend_gap_fills_trailing_missing_run() {
        let (conn, mut rx) = connection_with_archive(&[1, 2], 4).await;
        conn.fulfill_resend(SeqNum::new(1), SeqNum::new(4))
            .await
            .unwrap();
        drop(conn);

        let sent = drain_frames(&mut rx);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].seq, SeqNum::new(1));
        assert_eq!(sent[1].seq, SeqNum::new(2));
        assert_eq!(sent[2].seq, SeqNum::new(3));
        assert_eq!(sent[2].body.msg_type(), &MsgType::SequenceReset);
        assert_eq!(sent[2].body.get(tags::NEW_SEQ_NO), Some("5"));
    }
}
