/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # exfix-engine
//!
//! The runnable FIX acceptor: TCP listener, per-connection tasks, and the
//! application callback boundary.
//!
//! This crate provides:
//! - [`Acceptor`] / [`AcceptorHandle`]: bind, serve, send, stop
//! - [`SessionRegistry`]: concrete sessions and wildcard templates
//! - [`Application`]: the business-logic trait, with [`FillApplication`]
//!   as a working example

pub mod acceptor;
pub mod application;
pub mod registry;

pub use acceptor::{Acceptor, AcceptorConfig, AcceptorHandle};
pub use application::{Application, FillApplication, RejectReason};
pub use registry::SessionRegistry;
