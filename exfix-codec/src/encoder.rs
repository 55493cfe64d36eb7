/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message encoding.
//!
//! Serializes a [`Message`] body into a complete wire frame in canonical
//! order: standard header (BeginString, BodyLength, MsgType, SenderCompID,
//! TargetCompID, MsgSeqNum, SendingTime), body fields in insertion order,
//! CheckSum trailer last. BodyLength and CheckSum are computed here; callers
//! never set them.

use crate::checksum::{checksum_of, format_checksum};
use bytes::{BufMut, BytesMut};
use exfix_core::error::EncodeError;
use exfix_core::message::Message;
use exfix_core::tags;
use exfix_core::types::{SeqNum, SessionId, UtcTimestamp};

/// SOH field delimiter.
pub const SOH: u8 = 0x01;

/// Encodes a message into a complete wire frame.
///
/// # Arguments
/// * `msg` - The message body
/// * `session` - Session identity supplying BeginString and the CompID pair
/// * `seq` - The outbound sequence number assigned to this transmission
/// * `sending_time` - The SendingTime (tag 52) stamp
///
/// # Errors
/// Returns [`EncodeError::MissingRequiredField`] if the session identity
/// cannot fill a required header field (empty BeginString, wildcard CompID,
/// or an invalid sequence number).
pub fn encode_message(
    msg: &Message,
    session: &SessionId,
    seq: SeqNum,
    sending_time: UtcTimestamp,
) -> Result<BytesMut, EncodeError> {
    encode_with(msg, session, seq, sending_time, false)
}

/// Encodes a message with PossDupFlag (tag 43) set.
///
/// Used for administrative gap fills during resend processing; regular
/// resends replay stored bytes verbatim instead.
///
/// # Errors
/// Same conditions as [`encode_message`].
pub fn encode_poss_dup(
    msg: &Message,
    session: &SessionId,
    seq: SeqNum,
    sending_time: UtcTimestamp,
) -> Result<BytesMut, EncodeError> {
    encode_with(msg, session, seq, sending_time, true)
}

fn encode_with(
    msg: &Message,
    session: &SessionId,
    seq: SeqNum,
    sending_time: UtcTimestamp,
    poss_dup: bool,
) -> Result<BytesMut, EncodeError> {
    if session.begin_string.is_empty() {
        return Err(EncodeError::MissingRequiredField {
            tag: tags::BEGIN_STRING,
        });
    }
    if session.sender.is_wildcard() {
        return Err(EncodeError::MissingRequiredField {
            tag: tags::SENDER_COMP_ID,
        });
    }
    if session.target.is_wildcard() {
        return Err(EncodeError::MissingRequiredField {
            tag: tags::TARGET_COMP_ID,
        });
    }
    if !seq.is_valid() {
        return Err(EncodeError::InvalidFieldValue {
            tag: tags::MSG_SEQ_NUM,
            reason: "sequence numbers start at 1".to_string(),
        });
    }

    let mut body = BytesMut::with_capacity(128 + msg.field_count() * 16);
    put_field(&mut body, tags::MSG_TYPE, msg.msg_type().code().as_bytes());
    put_field(
        &mut body,
        tags::SENDER_COMP_ID,
        session.sender.as_str().as_bytes(),
    );
    put_field(
        &mut body,
        tags::TARGET_COMP_ID,
        session.target.as_str().as_bytes(),
    );
    put_uint_field(&mut body, tags::MSG_SEQ_NUM, seq.value());
    if poss_dup {
        put_field(&mut body, tags::POSS_DUP_FLAG, b"Y");
    }
    put_field(
        &mut body,
        tags::SENDING_TIME,
        sending_time.format_fix().as_bytes(),
    );

    for field in msg.fields() {
        put_field(&mut body, field.tag, field.value.as_bytes());
    }

    let mut frame = BytesMut::with_capacity(body.len() + 32);
    frame.put_slice(b"8=");
    frame.put_slice(session.begin_string.as_bytes());
    frame.put_u8(SOH);
    frame.put_slice(b"9=");
    let mut len_buf = itoa::Buffer::new();
    frame.put_slice(len_buf.format(body.len()).as_bytes());
    frame.put_u8(SOH);
    frame.put_slice(&body);

    let checksum = checksum_of(&frame);
    frame.put_slice(b"10=");
    frame.put_slice(&format_checksum(checksum));
    frame.put_u8(SOH);

    Ok(frame)
}

#[inline]
fn put_field(buf: &mut BytesMut, tag: u32, value: &[u8]) {
    let mut tag_buf = itoa::Buffer::new();
    buf.put_slice(tag_buf.format(tag).as_bytes());
    buf.put_u8(b'=');
    buf.put_slice(value);
    buf.put_u8(SOH);
}

#[inline]
fn put_uint_field(buf: &mut BytesMut, tag: u32, value: u64) {
    let mut value_buf = itoa::Buffer::new();
    put_field(buf, tag, value_buf.format(value).as_bytes());
}
