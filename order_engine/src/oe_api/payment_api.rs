//! Cash-on-delivery reconciliation.
//!
//! When a wholesaler (or an operator on their behalf) confirms that cash was collected for a delivered COD order, a
//! single ledger entry is written and the order is flagged as paid.
//!
//! The ledger holds at most one entry per order, enforced by the store. This makes the operation safe to retry: if
//! an entry already exists, all that is left to do is make sure the order is flagged as paid. A concurrent duplicate
//! insert is treated exactly the same way.
//!
//! The ledger write and the paid flag are separate writes. If the flag cannot be set after the entry was written,
//! the call still succeeds, with [`PaymentOutcome::PartiallySettled`]. Retrying completes the settlement.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Actor, LedgerEntry, NewLedgerEntry, Order, OrderId, OrderStatusType, Paise, Role},
    events::{EventProducers, OrderChange, OrderUpdatedEvent},
    oe_api::{
        errors::OrderFlowError,
        notification_api::send_payment_notice,
        order_flow_api::require_order,
        order_objects::{FailedNotification, FanOutReport, PaymentNotice, PaymentOutcome, PaymentResult},
        state_machine::is_owning_wholesaler,
    },
    traits::{LedgerManagement, NotificationManagement, OrderManagement, StoreError},
};

/// The transaction fee on collected cash, in basis points (1%).
pub const COD_FEE_BASIS_POINTS: i64 = 100;

/// The fee charged on a collected amount. Rounded half up to the nearest paisa.
pub fn cod_fee(amount: Paise) -> Option<Paise> {
    amount.checked_basis_points(COD_FEE_BASIS_POINTS)
}

pub struct PaymentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentApi<B>
where B: OrderManagement + LedgerManagement + NotificationManagement
{
    /// Records that the cash for a delivered COD order has been collected.
    ///
    /// Preconditions are checked in this order, each with its own error: the caller is a wholesaler or an operator,
    /// the order exists, a wholesaler caller owns it, it is delivered, it is cash-on-delivery, and it is not already
    /// paid without a ledger entry.
    pub async fn mark_payment_received(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<PaymentResult, OrderFlowError> {
        if !matches!(actor.role, Role::Wholesaler | Role::Operator) {
            return Err(OrderFlowError::unauthorized("Only wholesalers and operators can record cash payments."));
        }
        let order = require_order(&self.db, order_id).await?;
        if actor.role == Role::Wholesaler && !is_owning_wholesaler(&order, actor) {
            return Err(OrderFlowError::unauthorized(format!(
                "Order {} belongs to another wholesaler.",
                order_id.short()
            )));
        }
        if order.status != OrderStatusType::Delivered {
            return Err(OrderFlowError::OrderNotDelivered(order_id.clone()));
        }
        if !order.is_cash_on_delivery() {
            return Err(OrderFlowError::NotCashOnDelivery(order_id.clone()));
        }
        if let Some(entry) = self.db.fetch_ledger_entry(order_id).await? {
            debug!("💰️ Order {order_id} already has ledger entry #{}", entry.id);
            return self.resume_settlement(order, entry).await;
        }
        if order.is_paid() {
            return Err(OrderFlowError::AlreadyPaid(order_id.clone()));
        }

        let amount = order.total_amount;
        let fee = cod_fee(amount)
            .ok_or_else(|| OrderFlowError::InvalidRequest(format!("The fee on {amount} cannot be computed.")))?;
        let entry = NewLedgerEntry {
            order_id: order_id.clone(),
            amount,
            fee,
            payment_method: order.payment_method,
            recorded_by: actor.user_id.clone(),
        };
        let entry = match self.db.insert_ledger_entry(entry).await {
            Ok(entry) => entry,
            Err(StoreError::UniqueViolation(_)) => {
                info!("💰️ Another caller recorded the payment for order {order_id} first");
                let entry = self.db.fetch_ledger_entry(order_id).await?.ok_or_else(|| {
                    error!("💰️ Ledger rejected a duplicate entry for order {order_id}, but none can be found");
                    OrderFlowError::Conflict(order_id.clone())
                })?;
                return self.resume_settlement(order, entry).await;
            },
            Err(e) => {
                warn!("💰️ Could not write the ledger entry for order {order_id}. {e}");
                return Err(e.into());
            },
        };
        info!("💰️ Cash payment of {amount} (fee {}) recorded for order {order_id} by {actor}", entry.fee);

        match self.db.mark_order_paid(order_id).await {
            Ok(order) => {
                let fan_out = self.notify(&order, PaymentNotice::Success).await;
                self.publish(&order).await;
                Ok(PaymentResult { outcome: PaymentOutcome::Settled, order, entry, fan_out })
            },
            Err(e) => Ok(self.partially_settled(order, entry, e).await),
        }
    }

    /// The ledger entry exists, so the payment has been taken. Make sure the order reflects that.
    async fn resume_settlement(&self, order: Order, entry: LedgerEntry) -> Result<PaymentResult, OrderFlowError> {
        if order.is_paid() {
            return Ok(PaymentResult {
                outcome: PaymentOutcome::AlreadySettled,
                order,
                entry,
                fan_out: FanOutReport::default(),
            });
        }
        match self.db.mark_order_paid(&order.id).await {
            Ok(order) => {
                info!("💰️ Order {} flagged as paid against existing ledger entry #{}", order.id, entry.id);
                let fan_out = self.notify(&order, PaymentNotice::Success).await;
                self.publish(&order).await;
                Ok(PaymentResult { outcome: PaymentOutcome::AlreadySettled, order, entry, fan_out })
            },
            Err(e) => Ok(self.partially_settled(order, entry, e).await),
        }
    }

    async fn partially_settled(&self, order: Order, entry: LedgerEntry, e: StoreError) -> PaymentResult {
        warn!(
            "💰️ Ledger entry #{} for order {} exists, but the order could not be flagged as paid. {e}",
            entry.id, order.id
        );
        let fan_out = self.notify(&order, PaymentNotice::Pending).await;
        let reason = format!("The payment was recorded, but order {} is not yet marked as paid. {e}", order.id.short());
        PaymentResult { outcome: PaymentOutcome::PartiallySettled { reason }, order, entry, fan_out }
    }

    /// Tells the retailer and the wholesaler about the payment.
    async fn notify(&self, order: &Order, notice: PaymentNotice) -> FanOutReport {
        let mut report = FanOutReport::default();
        for user_id in [&order.retailer_id, &order.wholesaler_id] {
            match send_payment_notice(&self.db, &order.id, notice, user_id).await {
                Ok(_) => report.notified.push(user_id.clone()),
                Err(e) => {
                    warn!("💰️ Could not notify {user_id} about the payment for order {}. {e}", order.id);
                    report.failed.push(FailedNotification { user_id: user_id.clone(), reason: e.to_string() });
                },
            }
        }
        report
    }

    async fn publish(&self, order: &Order) {
        self.producers.publish_order_updated(OrderUpdatedEvent::new(order.clone(), OrderChange::PaymentSettled)).await;
    }
}
