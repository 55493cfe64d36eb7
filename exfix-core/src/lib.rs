/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # exfix-core
//!
//! Core types, message model, and error definitions for the exfix FIX
//! session engine.
//!
//! This crate provides:
//! - Session identity and sequencing primitives ([`SessionId`], [`SeqNum`],
//!   [`CompId`], [`Direction`])
//! - The ordered tag=value message model ([`Message`], [`WireMessage`],
//!   [`MsgType`])
//! - The unified error hierarchy ([`FixError`] and the per-layer error types)
//! - Standard field tag constants ([`tags`])

pub mod error;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{DecodeError, EncodeError, FixError, Result, SessionError, StoreError};
pub use message::{Field, Message, MsgType, WireMessage};
pub use types::{
    CompId, Direction, ExecType, OrdStatus, SeqNum, SessionId, Side, UtcTimestamp,
};
