/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # exfix-codec
//!
//! Tag=value wire codec for the exfix FIX session engine.
//!
//! This crate provides:
//! - [`encoder`]: message serialization with canonical header ordering and
//!   computed BodyLength/CheckSum
//! - [`decoder`]: streaming frame decoding with checksum validation and
//!   garbage resynchronization
//! - [`framing`]: a `tokio_util` codec adapter for framed transports
//! - [`checksum`]: the mod-256 trailer checksum

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod framing;

pub use checksum::{checksum_of, format_checksum, parse_checksum};
pub use decoder::{DEFAULT_MAX_FRAME_SIZE, FrameDecoder, parse_frame};
pub use encoder::{SOH, encode_message, encode_poss_dup};
pub use framing::FixFrameCodec;
