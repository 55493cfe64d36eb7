/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # exfix-store
//!
//! Message persistence for the exfix FIX session engine.
//!
//! This crate provides:
//! - [`MessageStore`]: the async store abstraction owning sequence numbers
//!   and the per-session frame archive
//! - [`MemoryStore`]: the in-process implementation

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::MessageStore;
