/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Administrative message builders.
//!
//! These produce message bodies only; sequence numbers, identity, and
//! SendingTime are stamped by the encoder at transmission time.

use exfix_core::message::{Message, MsgType};
use exfix_core::tags;
use exfix_core::types::SeqNum;

/// Builds a Logon (A) acknowledging a successful logon.
#[must_use]
pub fn logon_ack(heartbeat_secs: u64, reset_seq_num: bool) -> Message {
    let mut msg = Message::new(MsgType::Logon);
    msg.set_u64(tags::ENCRYPT_METHOD, 0)
        .set_u64(tags::HEART_BT_INT, heartbeat_secs);
    if reset_seq_num {
        msg.set_bool(tags::RESET_SEQ_NUM_FLAG, true);
    }
    msg
}

/// Builds a Heartbeat (0), echoing a TestReqID when answering a TestRequest.
#[must_use]
pub fn heartbeat(test_req_id: Option<&str>) -> Message {
    let mut msg = Message::new(MsgType::Heartbeat);
    if let Some(id) = test_req_id {
        msg.set(tags::TEST_REQ_ID, id);
    }
    msg
}

/// Builds a TestRequest (1).
#[must_use]
pub fn test_request(test_req_id: &str) -> Message {
    let mut msg = Message::new(MsgType::TestRequest);
    msg.set(tags::TEST_REQ_ID, test_req_id);
    msg
}

/// Builds a ResendRequest (2) for `begin..=end`. `end` of zero means
/// "everything from `begin` onward".
#[must_use]
pub fn resend_request(begin: SeqNum, end: SeqNum) -> Message {
    let mut msg = Message::new(MsgType::ResendRequest);
    msg.set_u64(tags::BEGIN_SEQ_NO, begin.value())
        .set_u64(tags::END_SEQ_NO, end.value());
    msg
}

/// Builds a Logout (5).
#[must_use]
pub fn logout(text: Option<&str>) -> Message {
    let mut msg = Message::new(MsgType::Logout);
    if let Some(text) = text {
        msg.set(tags::TEXT, text);
    }
    msg
}

/// Builds a SequenceReset-GapFill (4) advancing the counterparty's expected
/// sequence number to `new_seq`. Sent in place of messages that will not be
/// resent; always transmitted with PossDupFlag set.
#[must_use]
pub fn sequence_reset_gap_fill(new_seq: SeqNum) -> Message {
    let mut msg = Message::new(MsgType::SequenceReset);
    msg.set_bool(tags::GAP_FILL_FLAG, true)
        .set_u64(tags::NEW_SEQ_NO, new_seq.value());
    msg
}

/// SessionRejectReason (373): value is incorrect for this tag.
pub const REJECT_REASON_VALUE_INCORRECT: u64 = 5;

/// SessionRejectReason (373): other.
pub const REJECT_REASON_OTHER: u64 = 99;

/// Builds a session-level Reject (3) referencing the offending message.
#[must_use]
pub fn reject(ref_seq: SeqNum, ref_msg_type: &str, reason: u64, text: &str) -> Message {
    let mut msg = Message::new(MsgType::Reject);
    msg.set_u64(tags::REF_SEQ_NUM, ref_seq.value())
        .set(tags::REF_MSG_TYPE, ref_msg_type)
        .set_u64(tags::SESSION_REJECT_REASON, reason)
        .set(tags::TEXT, text);
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logon_ack() {
        let msg = logon_ack(30, false);
        assert_eq!(msg.msg_type(), &MsgType::Logon);
        assert_eq!(msg.get(tags::ENCRYPT_METHOD), Some("0"));
        assert_eq!(msg.get(tags::HEART_BT_INT), Some("30"));
        assert_eq!(msg.get(tags::RESET_SEQ_NUM_FLAG), None);

        let reset = logon_ack(30, true);
        assert_eq!(reset.get(tags::RESET_SEQ_NUM_FLAG), Some("Y"));
    }

    #[test]
    fn test_heartbeat_echo() {
        assert_eq!(heartbeat(None).get(tags::TEST_REQ_ID), None);
        assert_eq!(
            heartbeat(Some("PING")).get(tags::TEST_REQ_ID),
            Some("PING")
        );
    }

    #[test]
    fn test_resend_request_range() {
        let msg = resend_request(SeqNum::new(3), SeqNum::new(4));
        assert_eq!(msg.get(tags::BEGIN_SEQ_NO), Some("3"));
        assert_eq!(msg.get(tags::END_SEQ_NO), Some("4"));

        let open = resend_request(SeqNum::new(3), SeqNum::new(0));
        assert_eq!(open.get(tags::END_SEQ_NO), Some("0"));
    }

    #[test]
    fn test_gap_fill() {
        let msg = sequence_reset_gap_fill(SeqNum::new(8));
        assert_eq!(msg.msg_type(), &MsgType::SequenceReset);
        assert_eq!(msg.get(tags::GAP_FILL_FLAG), Some("Y"));
        assert_eq!(msg.get(tags::NEW_SEQ_NO), Some("8"));
    }

    #[test]
    fn test_reject_references_message() {
        let msg = reject(
            SeqNum::new(9),
            "4",
            REJECT_REASON_VALUE_INCORRECT,
            "NewSeqNo may not decrease",
        );
        assert_eq!(msg.get(tags::REF_SEQ_NUM), Some("9"));
        assert_eq!(msg.get(tags::REF_MSG_TYPE), Some("4"));
        assert_eq!(msg.get(tags::SESSION_REJECT_REASON), Some("5"));
        assert_eq!(msg.get(tags::TEXT), Some("NewSeqNo may not decrease"));
    }
}
