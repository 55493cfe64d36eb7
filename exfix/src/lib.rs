/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # exfix
//!
//! A FIX session engine for acceptors: framing and checksum validation,
//! sequence-number bookkeeping with gap recovery, heartbeat liveness, and a
//! clean application boundary that only ever sees in-sequence business
//! messages.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use exfix::prelude::*;
//!
//! # async fn run() -> exfix::core::Result<()> {
//! let registry = SessionRegistry::new().with(SessionConfig::template("FIX.4.4").build());
//! let acceptor = Acceptor::new(
//!     registry,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(FillApplication::new()),
//! );
//! let handle = acceptor.bind("127.0.0.1:9876").await?;
//! println!("listening on {}", handle.local_addr());
//! # Ok(())
//! # }
//! ```

/// Core types, message model, and errors.
pub use exfix_core as core;

/// Wire encoding, streaming decoding, and framing.
pub use exfix_codec as codec;

/// Message persistence.
pub use exfix_store as store;

/// Session state machine and configuration.
pub use exfix_session as session;

/// Acceptor runtime and application boundary.
pub use exfix_engine as engine;

/// The commonly used subset of the API.
pub mod prelude {
    pub use exfix_core::error::{FixError, Result};
    pub use exfix_core::message::{Message, MsgType, WireMessage};
    pub use exfix_core::tags;
    pub use exfix_core::types::{CompId, Direction, SeqNum, SessionId, UtcTimestamp};
    pub use exfix_engine::{
        Acceptor, AcceptorConfig, AcceptorHandle, Application, FillApplication, RejectReason,
        SessionRegistry,
    };
    pub use exfix_session::config::SessionConfig;
    pub use exfix_store::{MemoryStore, MessageStore};
}
