/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback boundary.
//!
//! The engine owns every session-level concern; implementations of
//! [`Application`] only ever see clean, in-sequence application messages.
//! Admin traffic, duplicates, and gap recovery never reach this trait.

use async_trait::async_trait;
use exfix_core::message::{Message, MsgType};
use exfix_core::tags;
use exfix_core::types::{ExecType, OrdStatus, SessionId, UtcTimestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Why the application refused a message.
///
/// Turned into a session-level Reject (3) referencing the offending
/// sequence number; the session itself stays up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason {
    /// Human-readable reason, sent as Text (58).
    pub text: String,
}

impl RejectReason {
    /// Creates a reject reason.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Business logic hosted behind the session engine.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    /// A session completed its logon exchange.
    async fn on_logon(&self, session: &SessionId);

    /// A session logged out or its transport dropped.
    async fn on_logout(&self, session: &SessionId);

    /// An in-sequence application message arrived.
    ///
    /// Returning `Ok(Some(reply))` sends the reply on the same session.
    ///
    /// # Errors
    /// Returning [`RejectReason`] sends a session-level Reject referencing
    /// the message; the session stays connected.
    async fn on_message(
        &self,
        session: &SessionId,
        msg: &Message,
    ) -> Result<Option<Message>, RejectReason>;
}

/// Demo application that fills every order at its limit price.
///
/// Each NewOrderSingle is answered with a fully-filled ExecutionReport
/// echoing the order's economics. Order and execution ids come from a
/// process-local counter and restart from 1 with the process.
#[derive(Debug, Default)]
pub struct FillApplication {
    next_id: AtomicU64,
}

impl FillApplication {
    /// Creates the application with ids starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn fill(&self, order: &Message) -> Result<Message, RejectReason> {
        let cl_ord_id = order
            .get(tags::CL_ORD_ID)
            .ok_or_else(|| RejectReason::new("ClOrdID (11) is required"))?;
        let symbol = order
            .get(tags::SYMBOL)
            .ok_or_else(|| RejectReason::new("Symbol (55) is required"))?;
        let side = order
            .get(tags::SIDE)
            .ok_or_else(|| RejectReason::new("Side (54) is required"))?;
        let qty = order
            .get_decimal(tags::ORDER_QTY)
            .map_err(|_| RejectReason::new("OrderQty (38) missing or invalid"))?;
        let price = order
            .get_decimal(tags::PRICE)
            .map_err(|_| RejectReason::new("Price (44) missing or invalid"))?;

        let id = self.allocate_id();
        let mut report = Message::new(MsgType::ExecutionReport);
        report
            .set_u64(tags::ORDER_ID, id)
            .set_u64(tags::EXEC_ID, id)
            .set_char(tags::EXEC_TYPE, ExecType::Trade.as_char())
            .set_char(tags::ORD_STATUS, OrdStatus::Filled.as_char())
            .set(tags::CL_ORD_ID, cl_ord_id)
            .set(tags::SYMBOL, symbol)
            .set(tags::SIDE, side)
            .set_decimal(tags::ORDER_QTY, qty)
            .set_decimal(tags::LAST_QTY, qty)
            .set_decimal(tags::LAST_PX, price)
            .set_decimal(tags::CUM_QTY, qty)
            .set_u64(tags::LEAVES_QTY, 0)
            .set_decimal(tags::AVG_PX, price)
            .set(tags::TRANSACT_TIME, UtcTimestamp::now().format_fix().as_str());
        if let Some(account) = order.get(tags::ACCOUNT) {
            report.set(tags::ACCOUNT, account);
        }
        Ok(report)
    }
}

#[async_trait]
impl Application for FillApplication {
    async fn on_logon(&self, session: &SessionId) {
        info!(session = %session, "logon");
    }

    async fn on_logout(&self, session: &SessionId) {
        info!(session = %session, "logout");
    }

    async fn on_message(
        &self,
        _session: &SessionId,
        msg: &Message,
    ) -> Result<Option<Message>, RejectReason> {
        match msg.msg_type() {
            MsgType::NewOrderSingle => self.fill(msg).map(Some),
            other => Err(RejectReason::new(format!(
                "unsupported message type: {other}"
            ))),
        }
    }
}
