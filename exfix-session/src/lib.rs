/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # exfix-session
//!
//! Session-layer logic for the exfix FIX session engine.
//!
//! This crate provides:
//! - [`SessionMachine`]: the pure session state machine (no I/O, no clock)
//! - [`SessionConfig`]: per-session settings and acceptor templates
//! - [`HeartbeatMonitor`]: heartbeat and TestRequest scheduling
//! - [`admin`]: administrative message builders
//! - [`sequence`]: inbound sequence validation

pub mod admin;
pub mod config;
pub mod heartbeat;
pub mod machine;
pub mod sequence;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use heartbeat::HeartbeatMonitor;
pub use machine::{DisconnectReason, Outputs, SessionMachine, SessionOutput, SessionStatus};
pub use sequence::{SeqCheck, validate};
