/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the exfix FIX session engine.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across all exfix operations. The taxonomy separates
//! recoverable decode-time failures (bad frame, keep streaming) from fatal
//! session-level failures (the session disconnects).

use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all exfix operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while decoding FIX wire data.
///
/// With the exception of [`DecodeError::NeedMoreData`], all variants describe
/// a bad frame. The caller discards the offending frame and keeps streaming;
/// decode errors never tear down the listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer does not yet hold a complete message.
    #[error("need more data to complete the frame")]
    NeedMoreData,

    /// The frame is structurally invalid.
    #[error("malformed message: {reason}")]
    Malformed {
        /// Description of the structural problem.
        reason: String,
    },

    /// Message does not start with a `8=FIX` BeginString field.
    #[error("invalid begin string: frame must start with 8=")]
    InvalidBeginString,

    /// The BodyLength field (tag 9) is missing or not a valid integer.
    #[error("invalid body length field (tag 9)")]
    InvalidBodyLength,

    /// The MsgType field (tag 35) is missing.
    #[error("missing msg type field (tag 35)")]
    MissingMsgType,

    /// Declared and calculated trailer checksums disagree.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Checksum calculated over the received bytes.
        calculated: u8,
        /// Checksum declared in the trailer (tag 10).
        declared: u8,
    },

    /// A required field is absent.
    #[error("missing required field: tag {tag}")]
    MissingField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// A field value cannot be parsed as the expected type.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Why the value is invalid.
        reason: String,
    },

    /// Field data is not valid UTF-8.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The declared frame exceeds the configured size limit.
    #[error("frame too large: {size} bytes exceeds maximum {max_size}")]
    FrameTooLarge {
        /// Declared frame size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },
}

/// Errors that occur while encoding a FIX message.
///
/// Encoding failures indicate misuse of the API by the caller (for example a
/// session identity with a wildcard CompID) and are surfaced immediately
/// rather than swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A required header component is absent or unusable.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// A field value cannot be written to the wire.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Why the value is invalid.
        reason: String,
    },
}

/// Errors in FIX session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Inbound sequence number below expected without the PossDup flag.
    /// Fatal: the session disconnects.
    #[error("sequence number too low: expected {expected}, received {received}")]
    LowSeqNum {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// Inbound sequence number above expected. Recoverable via ResendRequest.
    #[error("sequence gap detected: expected {expected}, received {received}")]
    HighSeqNum {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// No Logon arrived within the configured window after connect.
    #[error("logon timeout after {elapsed_ms} milliseconds")]
    LogonTimeout {
        /// Milliseconds elapsed since the transport connected.
        elapsed_ms: u64,
    },

    /// A TestRequest went unanswered. Fatal: the session disconnects.
    #[error("heartbeat timeout after {elapsed_ms} milliseconds")]
    HeartbeatTimeout {
        /// Milliseconds elapsed since the last inbound message.
        elapsed_ms: u64,
    },

    /// Logon arrived for an identity no configured template matches.
    #[error("logon rejected: {reason}")]
    LogonRejected {
        /// Why the logon was refused.
        reason: String,
    },

    /// A send was addressed to a session that is not currently active.
    /// Reported to the caller, non-fatal.
    #[error("session not found: {session}")]
    SessionNotFound {
        /// Display form of the requested session identity.
        session: String,
    },

    /// The counterparty violated session-level protocol rules.
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// Description of the violation.
        reason: String,
    },

    /// The outbound queue for the session is gone; the connection is closing.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Why the connection is no longer writable.
        reason: String,
    },
}

/// Errors in message store operations.
///
/// A store failure is fatal for its session: sequencing must never silently
/// diverge from what is persisted, so the session disconnects instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A requested sequence number has no stored message.
    #[error("message not found: seq={seq}")]
    NotFound {
        /// Sequence number of the missing message.
        seq: u64,
    },

    /// The store rejected a write.
    #[error("failed to store message seq={seq}: {reason}")]
    AppendFailed {
        /// Sequence number of the message.
        seq: u64,
        /// Why the write failed.
        reason: String,
    },

    /// Persisted state is internally inconsistent.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the corruption.
        reason: String,
    },

    /// I/O error in a persistent backend.
    #[error("store i/o error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ChecksumMismatch {
            calculated: 17,
            declared: 240,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: calculated 17, declared 240"
        );
    }

    #[test]
    fn test_fix_error_from_decode() {
        let err: FixError = DecodeError::NeedMoreData.into();
        assert!(matches!(err, FixError::Decode(DecodeError::NeedMoreData)));
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::HighSeqNum {
            expected: 3,
            received: 5,
        };
        assert_eq!(
            err.to_string(),
            "sequence gap detected: expected 3, received 5"
        );

        let err = SessionError::SessionNotFound {
            session: "FIX.4.4:A->B".to_string(),
        };
        assert_eq!(err.to_string(), "session not found: FIX.4.4:A->B");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound { seq: 7 };
        assert_eq!(err.to_string(), "message not found: seq=7");
    }
}
