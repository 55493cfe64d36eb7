/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Streaming FIX frame decoding.
//!
//! [`FrameDecoder`] operates on an accumulating buffer fed from a
//! byte-oriented transport. Truncated input reports "need more bytes" by
//! returning `Ok(None)` without consuming anything, so a message split
//! across any number of reads decodes exactly as it would from a single
//! buffer. Bad frames (checksum mismatch, structural garbage) are consumed
//! before the error is returned, allowing the caller to keep streaming.

use crate::checksum::{checksum_of, parse_checksum};
use bytes::{Bytes, BytesMut};
use exfix_core::error::DecodeError;
use exfix_core::message::{Message, MsgType, WireMessage};
use exfix_core::tags;
use exfix_core::types::{CompId, SeqNum};
use memchr::memchr;

use crate::encoder::SOH;

/// Default maximum frame size: 1 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Smallest frame worth inspecting: `8=FIX.N.N|9=N|35=0|...|10=XXX|`.
const MIN_FRAME_LEN: usize = 20;

/// Length of the `10=XXX|` trailer.
const TRAILER_LEN: usize = 7;

/// Streaming decoder for FIX wire frames.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    /// Maximum accepted frame size in bytes.
    max_frame_size: usize,
}

impl FrameDecoder {
    /// Creates a decoder with the default frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Sets the maximum accepted frame size.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Attempts to decode one complete frame from the front of `buf`.
    ///
    /// # Returns
    /// - `Ok(Some(wire))`: one frame was consumed and decoded
    /// - `Ok(None)`: the buffer holds no complete frame yet; nothing consumed
    ///
    /// # Errors
    /// - [`DecodeError::ChecksumMismatch`] / [`DecodeError::Malformed`] and
    ///   friends: the offending bytes were consumed; decoding can continue
    /// - [`DecodeError::FrameTooLarge`]: the peer declared a frame beyond the
    ///   configured limit; the caller should disconnect
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<WireMessage>, DecodeError> {
        if buf.len() < MIN_FRAME_LEN {
            return Ok(None);
        }

        if &buf[0..2] != b"8=" {
            resync(buf);
            return Err(DecodeError::InvalidBeginString);
        }

        // BeginString value ends at the first SOH.
        let Some(first_soh) = memchr(SOH, buf) else {
            return self.need_more(buf);
        };

        // BodyLength must follow immediately.
        let len_start = first_soh + 1;
        if buf.len() < len_start + 2 {
            return self.need_more(buf);
        }
        if &buf[len_start..len_start + 2] != b"9=" {
            let _ = buf.split_to(len_start);
            return Err(DecodeError::Malformed {
                reason: "body length (tag 9) must follow begin string".to_string(),
            });
        }
        let Some(len_soh_rel) = memchr(SOH, &buf[len_start..]) else {
            return self.need_more(buf);
        };
        let len_soh = len_start + len_soh_rel;

        let body_length = match parse_uint(&buf[len_start + 2..len_soh]) {
            Some(n) => n as usize,
            None => {
                let _ = buf.split_to(len_soh + 1);
                return Err(DecodeError::InvalidBodyLength);
            }
        };

        // Total frame: header through body, plus the fixed-width trailer.
        let total = len_soh + 1 + body_length + TRAILER_LEN;
        if total > self.max_frame_size {
            return Err(DecodeError::FrameTooLarge {
                size: total,
                max_size: self.max_frame_size,
            });
        }

        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }

        let trailer_start = total - TRAILER_LEN;
        if &buf[trailer_start..trailer_start + 3] != b"10=" {
            let _ = buf.split_to(total);
            return Err(DecodeError::Malformed {
                reason: "checksum (tag 10) not found where body length points".to_string(),
            });
        }

        let declared = match parse_checksum(&buf[trailer_start + 3..trailer_start + 6]) {
            Some(value) => value,
            None => {
                let _ = buf.split_to(total);
                return Err(DecodeError::Malformed {
                    reason: "checksum is not three digits".to_string(),
                });
            }
        };
        let calculated = checksum_of(&buf[..trailer_start]);

        let frame = buf.split_to(total).freeze();
        if calculated != declared {
            return Err(DecodeError::ChecksumMismatch {
                calculated,
                declared,
            });
        }

        parse_frame(frame).map(Some)
    }

    /// "Need more bytes", unless the unframed backlog already exceeds the
    /// size limit. A peer streaming header bytes with no SOH must not grow
    /// the accumulating buffer without bound.
    fn need_more(&self, buf: &BytesMut) -> Result<Option<WireMessage>, DecodeError> {
        if buf.len() > self.max_frame_size {
            return Err(DecodeError::FrameTooLarge {
                size: buf.len(),
                max_size: self.max_frame_size,
            });
        }
        Ok(None)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a checksum-validated frame into a [`WireMessage`].
///
/// Header and trailer tags are lifted into the envelope; everything else
/// stays in the body in wire order.
///
/// # Errors
/// Returns a [`DecodeError`] for structurally bad fields or a missing
/// required header field. The frame is already consumed from the stream.
pub fn parse_frame(frame: Bytes) -> Result<WireMessage, DecodeError> {
    let mut begin_string: Option<String> = None;
    let mut msg_type: Option<MsgType> = None;
    let mut sender: Option<CompId> = None;
    let mut target: Option<CompId> = None;
    let mut seq: Option<SeqNum> = None;
    let mut sending_time = String::new();
    let mut poss_dup = false;
    let mut body_fields: Vec<(u32, String)> = Vec::new();

    let mut offset = 0;
    while offset < frame.len() {
        let rest = &frame[offset..];
        let Some(eq_pos) = memchr(b'=', rest) else {
            return Err(DecodeError::Malformed {
                reason: "field without '=' delimiter".to_string(),
            });
        };
        let tag = parse_uint(&rest[..eq_pos]).ok_or_else(|| DecodeError::Malformed {
            reason: "field tag is not a number".to_string(),
        })? as u32;

        let value_start = eq_pos + 1;
        let Some(soh_rel) = memchr(SOH, &rest[value_start..]) else {
            return Err(DecodeError::Malformed {
                reason: "field without SOH terminator".to_string(),
            });
        };
        let value = std::str::from_utf8(&rest[value_start..value_start + soh_rel])?;
        offset += value_start + soh_rel + 1;

        match tag {
            tags::BEGIN_STRING => begin_string = Some(value.to_string()),
            tags::BODY_LENGTH | tags::CHECK_SUM => {}
            tags::MSG_TYPE => msg_type = Some(MsgType::from_code(value)),
            tags::SENDER_COMP_ID => {
                sender = Some(CompId::new(value).ok_or(DecodeError::InvalidFieldValue {
                    tag,
                    reason: "empty or oversized CompID".to_string(),
                })?);
            }
            tags::TARGET_COMP_ID => {
                target = Some(CompId::new(value).ok_or(DecodeError::InvalidFieldValue {
                    tag,
                    reason: "empty or oversized CompID".to_string(),
                })?);
            }
            tags::MSG_SEQ_NUM => {
                let n = parse_uint(value.as_bytes()).ok_or(DecodeError::InvalidFieldValue {
                    tag,
                    reason: "sequence number is not a positive integer".to_string(),
                })?;
                seq = Some(SeqNum::new(n));
            }
            tags::SENDING_TIME => sending_time = value.to_string(),
            tags::POSS_DUP_FLAG => poss_dup = value == "Y",
            _ => body_fields.push((tag, value.to_string())),
        }
    }

    let msg_type = msg_type.ok_or(DecodeError::MissingMsgType)?;
    let mut body = Message::new(msg_type);
    for (tag, value) in body_fields {
        body.set(tag, value);
    }

    Ok(WireMessage {
        begin_string: begin_string.ok_or(DecodeError::InvalidBeginString)?,
        sender: sender.ok_or(DecodeError::MissingField {
            tag: tags::SENDER_COMP_ID,
        })?,
        target: target.ok_or(DecodeError::MissingField {
            tag: tags::TARGET_COMP_ID,
        })?,
        seq: seq.ok_or(DecodeError::MissingField {
            tag: tags::MSG_SEQ_NUM,
        })?,
        sending_time,
        poss_dup,
        body,
        raw: frame,
    })
}

/// Drops garbage from the front of the buffer up to the next plausible
/// frame start (an SOH followed by `8=`), or empties it entirely.
fn resync(buf: &mut BytesMut) {
    let mut search_from = 0;
    while let Some(pos) = memchr(SOH, &buf[search_from..]) {
        let candidate = search_from + pos + 1;
        if buf.len() >= candidate + 2 && &buf[candidate..candidate + 2] == b"8=" {
            let _ = buf.split_to(candidate);
            return;
        }
        search_from = candidate;
    }
    buf.clear();
}

#[inline]
fn parse_uint(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() || bytes.len() > 19 {
        return None;
    }
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_message;
    use exfix_core::message::MsgType;
    use exfix_core::types::{SessionId, UtcTimestamp};

    fn encoded(msg: &Message, seq: u64) -> BytesMut {
        let session = SessionId::new(
            "FIX.4.4",
            CompId::new("BANZAI").unwrap(),
            CompId::new("EXEC").unwrap(),
        );
        encode_message(msg, &session, SeqNum::new(seq), UtcTimestamp::from_millis(0)).unwrap()
    }

    #[test]
    fn test_decode_round_trip() {
        let mut order = Message::new(MsgType::NewOrderSingle);
        order
            .set(tags::CL_ORD_ID, "ORD-1")
            .set(tags::SYMBOL, "XYZ")
            .set_u64(tags::ORDER_QTY, 100)
            .set(tags::PRICE, "50.5")
            .set_char(tags::SIDE, '1');

        let mut buf = encoded(&order, 2);
        let mut decoder = FrameDecoder::new();
        let wire = decoder.decode(&mut buf).unwrap().unwrap();

        assert!(buf.is_empty());
        assert_eq!(wire.body, order);
        assert_eq!(wire.seq, SeqNum::new(2));
        assert_eq!(wire.sender.as_str(), "BANZAI");
        assert_eq!(wire.target.as_str(), "EXEC");
        assert_eq!(wire.begin_string, "FIX.4.4");
        assert!(!wire.poss_dup);
    }

    #[test]
    fn test_decode_split_at_every_boundary() {
        let mut msg = Message::new(MsgType::Heartbeat);
        msg.set(tags::TEST_REQ_ID, "SPLIT");
        let whole = encoded(&msg, 7);

        for split in 1..whole.len() {
            let mut decoder = FrameDecoder::new();
            let mut buf = BytesMut::from(&whole[..split]);
            assert_eq!(
                decoder.decode(&mut buf).unwrap(),
                None,
                "split at {split} decoded early"
            );
            assert_eq!(buf.len(), split, "partial input was consumed at {split}");

            buf.extend_from_slice(&whole[split..]);
            let wire = decoder.decode(&mut buf).unwrap().unwrap();
            assert_eq!(wire.body, msg);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_decode_two_frames_in_one_buffer() {
        let first = encoded(&Message::new(MsgType::Heartbeat), 3);
        let second = encoded(&Message::new(MsgType::Logout), 4);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);

        let mut decoder = FrameDecoder::new();
        let a = decoder.decode(&mut buf).unwrap().unwrap();
        let b = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(a.body.msg_type(), &MsgType::Heartbeat);
        assert_eq!(b.body.msg_type(), &MsgType::Logout);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_checksum_mismatch_consumes_frame() {
        let mut frame = encoded(&Message::new(MsgType::Heartbeat), 1);
        let trailer = frame.len() - 2;
        // Corrupt one checksum digit.
        frame[trailer] = if frame[trailer] == b'0' { b'1' } else { b'0' };

        let follow_on = encoded(&Message::new(MsgType::Logout), 2);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&frame);
        buf.extend_from_slice(&follow_on);

        let mut decoder = FrameDecoder::new();
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(DecodeError::ChecksumMismatch { .. })
        ));

        // The stream recovers on the next frame.
        let wire = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(wire.body.msg_type(), &MsgType::Logout);
    }

    #[test]
    fn test_decode_resyncs_after_garbage() {
        let good = encoded(&Message::new(MsgType::Heartbeat), 1);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"noise noise noise no\x01");
        buf.extend_from_slice(&good);

        let mut decoder = FrameDecoder::new();
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(DecodeError::InvalidBeginString)
        ));
        let wire = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(wire.body.msg_type(), &MsgType::Heartbeat);
    }

    #[test]
    fn test_decode_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"8=FIX.4.4\x019=999999\x0135=D\x01");

        let mut decoder = FrameDecoder::new().with_max_frame_size(512);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(DecodeError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_headerless_stream_bounded() {
        // A peer that opens with "8=" and then streams bytes without ever
        // sending an SOH must hit the size limit, not grow the buffer
        // forever on Ok(None).
        let max = 1024;
        let mut decoder = FrameDecoder::new().with_max_frame_size(max);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"8=");

        let mut rejected = false;
        for _ in 0..64 {
            buf.extend_from_slice(&[b'A'; 256]);
            match decoder.decode(&mut buf) {
                Ok(None) => assert!(buf.len() <= max, "buffer grew past the limit"),
                Err(DecodeError::FrameTooLarge { size, max_size }) => {
                    assert!(size > max_size);
                    rejected = true;
                    break;
                }
                other => panic!("unexpected decode result: {other:?}"),
            }
        }
        assert!(rejected, "oversized headerless stream was never rejected");
    }

    #[test]
    fn test_decode_poss_dup() {
        let session = SessionId::new(
            "FIX.4.4",
            CompId::new("BANZAI").unwrap(),
            CompId::new("EXEC").unwrap(),
        );
        let mut buf = crate::encoder::encode_poss_dup(
            &Message::new(MsgType::SequenceReset),
            &session,
            SeqNum::new(5),
            UtcTimestamp::from_millis(0),
        )
        .unwrap();

        let wire = FrameDecoder::new().decode(&mut buf).unwrap().unwrap();
        assert!(wire.poss_dup);
        assert_eq!(wire.body.msg_type(), &MsgType::SequenceReset);
    }

    #[test]
    fn test_raw_bytes_preserved() {
        let original = encoded(&Message::new(MsgType::Heartbeat), 9);
        let mut buf = original.clone();

        let wire = FrameDecoder::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(wire.raw.as_ref(), original.as_ref());
    }
}
