/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Standard FIX field tag numbers used by the engine.
//!
//! Only the tags the session core and the reference order-fill application
//! actually touch are listed; user-defined tags pass through untouched.

/// Account (1).
pub const ACCOUNT: u32 = 1;
/// AvgPx (6).
pub const AVG_PX: u32 = 6;
/// BeginSeqNo (7).
pub const BEGIN_SEQ_NO: u32 = 7;
/// BeginString (8).
pub const BEGIN_STRING: u32 = 8;
/// BodyLength (9).
pub const BODY_LENGTH: u32 = 9;
/// CheckSum (10).
pub const CHECK_SUM: u32 = 10;
/// ClOrdID (11).
pub const CL_ORD_ID: u32 = 11;
/// CumQty (14).
pub const CUM_QTY: u32 = 14;
/// EndSeqNo (16).
pub const END_SEQ_NO: u32 = 16;
/// ExecID (17).
pub const EXEC_ID: u32 = 17;
/// LastPx (31).
pub const LAST_PX: u32 = 31;
/// LastQty (32).
pub const LAST_QTY: u32 = 32;
/// MsgSeqNum (34).
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType (35).
pub const MSG_TYPE: u32 = 35;
/// NewSeqNo (36).
pub const NEW_SEQ_NO: u32 = 36;
/// OrderID (37).
pub const ORDER_ID: u32 = 37;
/// OrderQty (38).
pub const ORDER_QTY: u32 = 38;
/// OrdStatus (39).
pub const ORD_STATUS: u32 = 39;
/// PossDupFlag (43).
pub const POSS_DUP_FLAG: u32 = 43;
/// Price (44).
pub const PRICE: u32 = 44;
/// RefSeqNum (45).
pub const REF_SEQ_NUM: u32 = 45;
/// SenderCompID (49).
pub const SENDER_COMP_ID: u32 = 49;
/// SendingTime (52).
pub const SENDING_TIME: u32 = 52;
/// Side (54).
pub const SIDE: u32 = 54;
/// Symbol (55).
pub const SYMBOL: u32 = 55;
/// TargetCompID (56).
pub const TARGET_COMP_ID: u32 = 56;
/// Text (58).
pub const TEXT: u32 = 58;
/// TransactTime (60).
pub const TRANSACT_TIME: u32 = 60;
/// EncryptMethod (98).
pub const ENCRYPT_METHOD: u32 = 98;
/// HeartBtInt (108).
pub const HEART_BT_INT: u32 = 108;
/// TestReqID (112).
pub const TEST_REQ_ID: u32 = 112;
/// GapFillFlag (123).
pub const GAP_FILL_FLAG: u32 = 123;
/// ResetSeqNumFlag (141).
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// ExecType (150).
pub const EXEC_TYPE: u32 = 150;
/// LeavesQty (151).
pub const LEAVES_QTY: u32 = 151;
/// RefMsgType (372).
pub const REF_MSG_TYPE: u32 = 372;
/// SessionRejectReason (373).
pub const SESSION_REJECT_REASON: u32 = 373;
