/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec adapter for FIX framing.
//!
//! [`FixFrameCodec`] wraps [`FrameDecoder`] for use with
//! `tokio_util::codec::FramedRead`. `FramedRead` terminates the stream after
//! any decoder error, so recoverable frame errors (bad checksum, garbage
//! between frames) are logged and skipped here; only unrecoverable
//! conditions surface as stream errors.

use crate::decoder::FrameDecoder;
use bytes::{Bytes, BytesMut};
use exfix_core::error::{DecodeError, FixError};
use exfix_core::message::WireMessage;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Codec producing [`WireMessage`] frames from a byte stream.
#[derive(Debug, Clone, Default)]
pub struct FixFrameCodec {
    inner: FrameDecoder,
}

impl FixFrameCodec {
    /// Creates a codec with the default frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FrameDecoder::new(),
        }
    }

    /// Creates a codec with a custom frame size limit.
    #[must_use]
    pub fn with_max_frame_size(size: usize) -> Self {
        Self {
            inner: FrameDecoder::new().with_max_frame_size(size),
        }
    }
}

impl Decoder for FixFrameCodec {
    type Item = WireMessage;
    type Error = FixError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.inner.decode(src) {
                Ok(result) => return Ok(result),
                Err(err @ DecodeError::FrameTooLarge { .. }) => {
                    return Err(FixError::Decode(err));
                }
                Err(err) => {
                    // The offending bytes are already consumed; keep reading.
                    warn!(error = %err, "discarding undecodable frame");
                }
            }
        }
    }
}

/// Outbound frames are pre-encoded; the encoder is a passthrough.
impl Encoder<Bytes> for FixFrameCodec {
    type Error = FixError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
