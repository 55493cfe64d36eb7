/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core types for FIX session operations.
//!
//! This module provides the fundamental types used throughout the exfix
//! engine:
//! - [`SeqNum`]: message sequence number
//! - [`Direction`]: message flow direction relative to this process
//! - [`CompId`]: component identifier with wildcard support for templates
//! - [`SessionId`]: the (BeginString, SenderCompID, TargetCompID) identity
//! - [`UtcTimestamp`]: FIX-formatted UTC timestamp
//! - [`Side`], [`OrdStatus`], [`ExecType`]: order field enumerations

use arrayvec::ArrayString;
use chrono::{DateTime, Utc};
use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for CompID strings in bytes.
pub const COMP_ID_MAX_LEN: usize = 32;

/// FIX message sequence number.
///
/// Sequence numbers start at 1 and increase strictly with no gaps for
/// messages actually transmitted on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SeqNum(u64);

impl SeqNum {
    /// First valid sequence number on a fresh session.
    pub const START: Self = Self(1);

    /// Creates a sequence number from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the following sequence number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true for valid FIX sequence numbers (>= 1).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 1
    }
}

impl Default for SeqNum {
    fn default() -> Self {
        Self::START
    }
}

impl From<u64> for SeqNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SeqNum> for u64 {
    fn from(seq: SeqNum) -> Self {
        seq.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message flow direction relative to this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Received from the counterparty.
    Inbound,
    /// Sent by this process.
    Outbound,
}

impl Direction {
    /// Returns a short lowercase label, useful for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "in",
            Self::Outbound => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component identifier for FIX sessions.
///
/// Used for SenderCompID (tag 49) and TargetCompID (tag 56). The single
/// character `*` is reserved as the wildcard used by acceptor session
/// templates; it matches any concrete CompID during logon binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct CompId(ArrayString<COMP_ID_MAX_LEN>);

impl CompId {
    /// Creates a CompId from a string slice.
    ///
    /// Returns `None` if the string is empty or exceeds [`COMP_ID_MAX_LEN`].
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the wildcard CompId used by acceptor templates.
    #[must_use]
    pub fn wildcard() -> Self {
        Self(ArrayString::from("*").unwrap_or_default())
    }

    /// Returns true if this is the template wildcard.
    #[inline]
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.as_str() == "*"
    }

    /// Returns true if this id accepts `concrete` during template binding.
    ///
    /// A wildcard accepts anything; otherwise the ids must be equal.
    #[must_use]
    pub fn accepts(&self, concrete: &CompId) -> bool {
        self.is_wildcard() || self == concrete
    }

    /// Returns the CompId as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for CompId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompId {
    type Err = arrayvec::CapacityError<()>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(arrayvec::CapacityError::new(()));
        }
        ArrayString::try_from(s)
            .map(Self)
            .map_err(|_| arrayvec::CapacityError::new(()))
    }
}

/// Identity of one logical FIX session.
///
/// The tuple (BeginString, SenderCompID, TargetCompID) uniquely addresses one
/// connection's sequencing state. Immutable once the session starts; the
/// sender/target pair is written from this process's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    /// FIX protocol version string (tag 8, e.g. "FIX.4.4").
    pub begin_string: String,
    /// Our CompID (tag 49 on outbound messages).
    pub sender: CompId,
    /// Counterparty CompID (tag 56 on outbound messages).
    pub target: CompId,
}

impl SessionId {
    /// Creates a session identity.
    #[must_use]
    pub fn new(begin_string: impl Into<String>, sender: CompId, target: CompId) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender,
            target,
        }
    }

    /// Returns the counterparty's view of this session.
    ///
    /// Inbound messages carry the flipped identity: their sender is our
    /// target and vice versa.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            begin_string: self.begin_string.clone(),
            sender: self.target.clone(),
            target: self.sender.clone(),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}->{}", self.begin_string, self.sender, self.target)
    }
}

/// FIX UTC timestamp (tag 52 SendingTime and friends).
///
/// Formatted as `YYYYMMDD-HH:MM:SS.sss` with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtcTimestamp {
    /// Milliseconds since the Unix epoch.
    millis_since_epoch: u64,
}

impl UtcTimestamp {
    /// Returns the current UTC timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self {
            millis_since_epoch: Utc::now().timestamp_millis().max(0) as u64,
        }
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            millis_since_epoch: millis,
        }
    }

    /// Returns milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.millis_since_epoch
    }

    /// Formats the timestamp in FIX wire format.
    #[must_use]
    pub fn format_fix(self) -> ArrayString<21> {
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(self.millis_since_epoch as i64)
            .unwrap_or_default();
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(&mut buf, format_args!("{}", dt.format("%Y%m%d-%H:%M:%S%.3f")));
        buf
    }
}

impl Default for UtcTimestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fix())
    }
}

/// Order side (tag 54).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    Buy = b'1',
    /// Sell order.
    Sell = b'2',
    /// Sell short.
    SellShort = b'5',
    /// Sell short exempt.
    SellShortExempt = b'6',
    /// Cross (both sides).
    Cross = b'8',
}

impl Side {
    /// Creates a Side from its wire character, or `None` if unknown.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Buy),
            '2' => Some(Self::Sell),
            '5' => Some(Self::SellShort),
            '6' => Some(Self::SellShortExempt),
            '8' => Some(Self::Cross),
            _ => None,
        }
    }

    /// Returns the wire character for this side.
    #[must_use]
    pub const fn as_char(self) -> char {
        self as u8 as char
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Order status (tag 39).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrdStatus {
    /// Order accepted, nothing executed.
    New = b'0',
    /// Partially executed.
    PartiallyFilled = b'1',
    /// Fully executed.
    Filled = b'2',
    /// Canceled.
    Canceled = b'4',
    /// Rejected.
    Rejected = b'8',
}

impl OrdStatus {
    /// Returns the wire character for this status.
    #[must_use]
    pub const fn as_char(self) -> char {
        self as u8 as char
    }
}

/// Execution report type (tag 150).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecType {
    /// Order accepted.
    New = b'0',
    /// Order canceled.
    Canceled = b'4',
    /// Order rejected.
    Rejected = b'8',
    /// Trade (fill or partial fill).
    Trade = b'F',
}

impl ExecType {
    /// Returns the wire character for this exec type.
    #[must_use]
    pub const fn as_char(self) -> char {
        self as u8 as char
    }
}
