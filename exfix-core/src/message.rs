/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message model for FIX session processing.
//!
//! This module provides:
//! - [`MsgType`]: the message types the session core routes on
//! - [`Message`]: an ordered (tag, value) message body with typed accessors
//! - [`WireMessage`]: a decoded frame with its session envelope and raw bytes

use crate::error::DecodeError;
use crate::types::{CompId, SeqNum, SessionId};
use bytes::Bytes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// FIX message type (tag 35).
///
/// The seven administrative types are handled entirely inside the session
/// state machine; everything else is forwarded to the application boundary.
/// Types outside the set the engine names explicitly travel as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MsgType {
    /// Heartbeat (0) - session level.
    #[default]
    Heartbeat,
    /// Test Request (1) - session level.
    TestRequest,
    /// Resend Request (2) - session level.
    ResendRequest,
    /// Reject (3) - session level.
    Reject,
    /// Sequence Reset (4) - session level.
    SequenceReset,
    /// Logout (5) - session level.
    Logout,
    /// Execution Report (8).
    ExecutionReport,
    /// Logon (A) - session level.
    Logon,
    /// New Order Single (D).
    NewOrderSingle,
    /// Any other message type, carried verbatim.
    Custom(String),
}

impl MsgType {
    /// Maps a wire code (tag 35 value) to a message type.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "8" => Self::ExecutionReport,
            "A" => Self::Logon,
            "D" => Self::NewOrderSingle,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the wire code for this message type.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::ExecutionReport => "8",
            Self::Logon => "A",
            Self::NewOrderSingle => "D",
            Self::Custom(code) => code.as_str(),
        }
    }

    /// Returns true for session-level administrative message types.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// Returns true for application-level message types.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One tag=value pair within a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// The field tag number.
    pub tag: u32,
    /// The field value as it appears on the wire.
    pub value: String,
}

/// A FIX message body: a message type plus ordered fields.
///
/// Fields keep their insertion order and duplicate tags are permitted, which
/// is what repeating groups reduce to at this layer. Header fields (tags 8,
/// 9, 35, 49, 56, 34, 52, 43) and the trailer are not part of the body; the
/// codec owns those and the session envelope carries their decoded values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    msg_type: MsgType,
    fields: SmallVec<[Field; 16]>,
}

impl Message {
    /// Creates an empty message of the given type.
    #[must_use]
    pub fn new(msg_type: MsgType) -> Self {
        Self {
            msg_type,
            fields: SmallVec::new(),
        }
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Appends a field. Duplicate tags are allowed.
    pub fn set(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.fields.push(Field {
            tag,
            value: value.into(),
        });
        self
    }

    /// Appends an unsigned integer field.
    pub fn set_u64(&mut self, tag: u32, value: u64) -> &mut Self {
        self.set(tag, value.to_string())
    }

    /// Appends a decimal field.
    pub fn set_decimal(&mut self, tag: u32, value: Decimal) -> &mut Self {
        self.set(tag, value.to_string())
    }

    /// Appends a single character field.
    pub fn set_char(&mut self, tag: u32, value: char) -> &mut Self {
        self.set(tag, value.to_string())
    }

    /// Appends a boolean field as `Y`/`N`.
    pub fn set_bool(&mut self, tag: u32, value: bool) -> &mut Self {
        self.set(tag, if value { "Y" } else { "N" })
    }

    /// Returns the first value for `tag`, if present.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }

    /// Returns all values for `tag` in order.
    pub fn get_all(&self, tag: u32) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(move |f| f.tag == tag)
            .map(|f| f.value.as_str())
    }

    /// Parses the first value for `tag` as a u64.
    ///
    /// # Errors
    /// Returns [`DecodeError::MissingField`] if absent, or
    /// [`DecodeError::InvalidFieldValue`] if not a valid integer.
    pub fn get_u64(&self, tag: u32) -> Result<u64, DecodeError> {
        self.parse_field(tag)
    }

    /// Parses the first value for `tag` as a decimal.
    ///
    /// # Errors
    /// Returns [`DecodeError::MissingField`] or
    /// [`DecodeError::InvalidFieldValue`].
    pub fn get_decimal(&self, tag: u32) -> Result<Decimal, DecodeError> {
        self.parse_field(tag)
    }

    /// Returns the first value for `tag` as a single ASCII character.
    ///
    /// # Errors
    /// Returns [`DecodeError::MissingField`] or
    /// [`DecodeError::InvalidFieldValue`].
    pub fn get_char(&self, tag: u32) -> Result<char, DecodeError> {
        let value = self.get(tag).ok_or(DecodeError::MissingField { tag })?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(c),
            _ => Err(DecodeError::InvalidFieldValue {
                tag,
                reason: "expected single ASCII character".to_string(),
            }),
        }
    }

    /// Returns the first value for `tag` as a FIX boolean (`Y`/`N`).
    ///
    /// Absent fields read as `false`, matching FIX optional-flag semantics.
    ///
    /// # Errors
    /// Returns [`DecodeError::InvalidFieldValue`] for anything other than
    /// `Y` or `N`.
    pub fn get_bool(&self, tag: u32) -> Result<bool, DecodeError> {
        match self.get(tag) {
            None => Ok(false),
            Some("Y") => Ok(true),
            Some("N") => Ok(false),
            Some(_) => Err(DecodeError::InvalidFieldValue {
                tag,
                reason: "expected 'Y' or 'N'".to_string(),
            }),
        }
    }

    /// Returns an iterator over all fields in order.
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the number of body fields.
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn parse_field<T: std::str::FromStr>(&self, tag: u32) -> Result<T, DecodeError> {
        let value = self.get(tag).ok_or(DecodeError::MissingField { tag })?;
        value.parse().map_err(|_| DecodeError::InvalidFieldValue {
            tag,
            reason: format!(
                "failed to parse '{}' as {}",
                value,
                std::any::type_name::<T>()
            ),
        })
    }
}

/// A decoded inbound frame: session envelope plus message body.
///
/// The envelope carries the header fields the codec strips out of the body.
/// `session_id` is the identity as the *counterparty* wrote it (their sender,
/// our target); flip it to address replies. `raw` holds the exact received
/// bytes so the store can replay them byte-identically on resend.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    /// BeginString (tag 8) of the frame.
    pub begin_string: String,
    /// SenderCompID (tag 49) as received.
    pub sender: CompId,
    /// TargetCompID (tag 56) as received.
    pub target: CompId,
    /// MsgSeqNum (tag 34).
    pub seq: SeqNum,
    /// SendingTime (tag 52), verbatim; empty if absent.
    pub sending_time: String,
    /// PossDupFlag (tag 43).
    pub poss_dup: bool,
    /// The message body.
    pub body: Message,
    /// The complete frame as received, including header and trailer.
    pub raw: Bytes,
}

impl WireMessage {
    /// Returns the session identity as written by the counterparty.
    #[must_use]
    pub fn remote_session_id(&self) -> SessionId {
        SessionId::new(
            self.begin_string.clone(),
            self.sender.clone(),
            self.target.clone(),
        )
    }
}

/// Convenience re-export of the tag constants next to the message model.
pub use crate::tags as field_tags;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_msg_type_codes() {
        assert_eq!(MsgType::from_code("0"), MsgType::Heartbeat);
        assert_eq!(MsgType::from_code("A"), MsgType::Logon);
        assert_eq!(MsgType::from_code("D"), MsgType::NewOrderSingle);
        assert_eq!(MsgType::Logon.code(), "A");
        assert_eq!(MsgType::ExecutionReport.code(), "8");

        let custom = MsgType::from_code("AE");
        assert!(matches!(custom, MsgType::Custom(_)));
        assert_eq!(custom.code(), "AE");
    }

    #[test]
    fn test_msg_type_is_admin() {
        for admin in ["0", "1", "2", "3", "4", "5", "A"] {
            assert!(MsgType::from_code(admin).is_admin(), "{admin} should be admin");
        }
        assert!(MsgType::NewOrderSingle.is_app());
        assert!(MsgType::ExecutionReport.is_app());
        assert!(MsgType::from_code("AE").is_app());
    }

    #[test]
    fn test_message_set_get() {
        let mut msg = Message::new(MsgType::NewOrderSingle);
        msg.set(tags::SYMBOL, "XYZ")
            .set_u64(tags::ORDER_QTY, 100)
            .set_char(tags::SIDE, '1');

        assert_eq!(msg.get(tags::SYMBOL), Some("XYZ"));
        assert_eq!(msg.get_u64(tags::ORDER_QTY).unwrap(), 100);
        assert_eq!(msg.get_char(tags::SIDE).unwrap(), '1');
        assert_eq!(msg.field_count(), 3);
    }

    #[test]
    fn test_message_duplicate_tags() {
        let mut msg = Message::new(MsgType::Custom("B".to_string()));
        msg.set(58, "first").set(58, "second");

        assert_eq!(msg.get(58), Some("first"));
        let all: Vec<&str> = msg.get_all(58).collect();
        assert_eq!(all, vec!["first", "second"]);
    }

    #[test]
    fn test_message_typed_getters() {
        let mut msg = Message::new(MsgType::NewOrderSingle);
        msg.set_decimal(tags::PRICE, Decimal::from_str("50.5").unwrap())
            .set_bool(tags::POSS_DUP_FLAG, true);

        assert_eq!(
            msg.get_decimal(tags::PRICE).unwrap(),
            Decimal::from_str("50.5").unwrap()
        );
        assert!(msg.get_bool(tags::POSS_DUP_FLAG).unwrap());
        assert!(!msg.get_bool(tags::GAP_FILL_FLAG).unwrap());
    }

    #[test]
    fn test_message_missing_field() {
        let msg = Message::new(MsgType::Heartbeat);
        assert!(matches!(
            msg.get_u64(tags::TEST_REQ_ID),
            Err(DecodeError::MissingField { tag: 112 })
        ));
    }

    #[test]
    fn test_wire_message_remote_session_id() {
        let wire = WireMessage {
            begin_string: "FIX.4.4".to_string(),
            sender: CompId::new("BANZAI").unwrap(),
            target: CompId::new("EXEC").unwrap(),
            seq: SeqNum::new(1),
            sending_time: String::new(),
            poss_dup: false,
            body: Message::new(MsgType::Logon),
            raw: Bytes::new(),
        };

        let remote = wire.remote_session_id();
        assert_eq!(remote.to_string(), "FIX.4.4:BANZAI->EXEC");
        assert_eq!(remote.flipped().to_string(), "FIX.4.4:EXEC->BANZAI");
    }
}
