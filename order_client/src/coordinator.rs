//! The per-session order coordinator.
//!
//! [`OrderCoordinator`] holds the list of orders the session's actor can see and, optionally, one active order in
//! full detail. Reads replace that state. Mutations go to the backend and then patch the local copy with exactly the
//! fields the operation changes, so nothing the session has not touched is overwritten with data from another read.
//!
//! A conflict from the backend means the local copy is stale. The coordinator refreshes before handing the error back
//! so the user retries against current data.
use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use order_engine::{
    db_types::{Notification, Order, OrderId, UserId},
    order_objects::{
        AssignPartnerRequest,
        DeliveryProofRequest,
        DeliveryUpdateRequest,
        DeliveryUpdateResult,
        NewOrderRequest,
        OrderDetail,
        PaymentOutcome,
        PaymentResult,
        PlacedOrder,
        ProofResult,
        ResolvedOrder,
        StatusChangeRequest,
        TransitionResult,
    },
};
use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};

use crate::{
    backend::OrderBackend,
    cache::{Clock, SystemClock, TtlCache},
    errors::ClientError,
    hints::PushHint,
    metrics::DashboardMetrics,
};

pub struct OrderCoordinator<B> {
    backend: B,
    orders: Vec<Order>,
    active: Option<ResolvedOrder>,
    metrics: TtlCache<UserId, DashboardMetrics>,
}

impl<B: OrderBackend> std::fmt::Debug for OrderCoordinator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderCoordinator ({}, {} orders)", self.backend.actor(), self.orders.len())
    }
}

impl<B: OrderBackend> OrderCoordinator<B> {
    pub fn new(backend: B, metrics_ttl: chrono::Duration) -> Self {
        Self::with_clock(backend, metrics_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: B, metrics_ttl: chrono::Duration, clock: Arc<dyn Clock>) -> Self {
        Self { backend, orders: Vec::new(), active: None, metrics: TtlCache::with_clock(metrics_ttl, clock) }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == order_id)
    }

    pub fn active_order(&self) -> Option<&ResolvedOrder> {
        self.active.as_ref()
    }

    //------------------------------------------   Reads   ------------------------------------------------------------

    /// Replaces the order list with the backend's current view.
    pub async fn fetch_orders(&mut self) -> Result<&[Order], ClientError> {
        let orders = self.backend.fetch_orders().await?;
        debug!("🧭️ Loaded {} orders for {}", orders.len(), self.backend.actor());
        self.orders = orders;
        self.invalidate_metrics();
        Ok(&self.orders)
    }

    /// Resolves `token` and makes the result the active order.
    pub async fn fetch_order_by_id(&mut self, token: &str) -> Result<&ResolvedOrder, ClientError> {
        let resolved = self.backend.resolve_order(token).await?;
        debug!("🧭️ '{token}' resolved to {} by {}", resolved.detail.order.id, resolved.strategy);
        Ok(self.active.insert(resolved))
    }

    pub async fn unread_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        self.backend.unread_notifications().await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ClientError> {
        self.backend.mark_notification_read(notification_id).await
    }

    /// Dashboard metrics for the session's actor. Served from the cache until the TTL runs out or the order list is
    /// changed.
    pub fn dashboard_metrics(&mut self) -> DashboardMetrics {
        let key = self.backend.actor().user_id.clone();
        if let Some(metrics) = self.metrics.get(&key) {
            return metrics;
        }
        let metrics = DashboardMetrics::from_orders(&self.orders);
        trace!("🧭️ Dashboard metrics recomputed for {key}");
        self.metrics.insert(key, metrics.clone());
        metrics
    }

    //------------------------------------------  Mutations  ----------------------------------------------------------

    /// Places an order, then reloads the full order list.
    pub async fn place_order(&mut self, request: NewOrderRequest) -> Result<PlacedOrder, ClientError> {
        let placed = self.backend.place_order(request).await?;
        info!("🧭️ Order {} placed", placed.order.id);
        if let Err(e) = self.fetch_orders().await {
            warn!("🧭️ Order {} was placed, but the order list could not be reloaded. {e}", placed.order.id);
        }
        Ok(placed)
    }

    pub async fn update_status(
        &mut self,
        order_id: &OrderId,
        request: StatusChangeRequest,
    ) -> Result<TransitionResult, ClientError> {
        let set_partner = request.delivery_partner_id.is_some();
        let set_notes = request.notes.is_some();
        let result = self.backend.update_status(order_id, request).await;
        let result = self.refresh_on_conflict(order_id, result).await?;
        self.patch_order(&result.order, |local, remote| {
            local.status = remote.status;
            local.updated_at = remote.updated_at;
            if set_partner {
                local.delivery_partner_id = remote.delivery_partner_id.clone();
            }
            if set_notes {
                local.notes = remote.notes.clone();
            }
        });
        Ok(result)
    }

    pub async fn assign_delivery_partner(
        &mut self,
        order_id: &OrderId,
        request: AssignPartnerRequest,
    ) -> Result<DeliveryUpdateResult, ClientError> {
        let result = self.backend.assign_delivery_partner(order_id, request).await;
        let result = self.refresh_on_conflict(order_id, result).await?;
        self.patch_order(&result.order, |local, remote| {
            local.delivery_partner_id = remote.delivery_partner_id.clone();
            local.updated_at = remote.updated_at;
        });
        if let Some(detail) = self.active_detail_mut(order_id) {
            detail.timeline.push(result.update.clone());
        }
        Ok(result)
    }

    pub async fn post_delivery_update(
        &mut self,
        order_id: &OrderId,
        request: DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResult, ClientError> {
        let result = self.backend.post_delivery_update(order_id, request).await;
        let result = self.refresh_on_conflict(order_id, result).await?;
        // Only a completed delivery moves the order status
        self.patch_order(&result.order, |local, remote| {
            local.status = remote.status;
            local.updated_at = remote.updated_at;
        });
        if let Some(detail) = self.active_detail_mut(order_id) {
            detail.timeline.push(result.update.clone());
        }
        Ok(result)
    }

    pub async fn submit_delivery_proof(
        &mut self,
        order_id: &OrderId,
        request: DeliveryProofRequest,
    ) -> Result<ProofResult, ClientError> {
        let result = self.backend.submit_delivery_proof(order_id, request).await;
        let result = self.refresh_on_conflict(order_id, result).await?;
        if let Some(detail) = self.active_detail_mut(order_id) {
            detail.proof = Some(result.proof.clone());
        }
        Ok(result)
    }

    /// Records cash received for a delivered COD order. A partially settled payment is still a success: the ledger
    /// entry exists and calling this again completes it.
    pub async fn mark_payment_received(&mut self, order_id: &OrderId) -> Result<PaymentResult, ClientError> {
        let result = self.backend.mark_payment_received(order_id).await;
        let result = self.refresh_on_conflict(order_id, result).await?;
        if let PaymentOutcome::PartiallySettled { reason } = &result.outcome {
            warn!("🧭️ Cash for {order_id} is recorded but the order is not yet marked paid. {reason}");
        }
        self.patch_order(&result.order, |local, remote| {
            local.payment_status = remote.payment_status;
            local.updated_at = remote.updated_at;
        });
        if let Some(detail) = self.active_detail_mut(order_id) {
            detail.ledger_entry = Some(result.entry.clone());
        }
        Ok(result)
    }

    //------------------------------------------  Refreshing  ---------------------------------------------------------

    /// Reloads the order list, and the active order if it is `order_id` (or unconditionally when `order_id` is
    /// `None`).
    pub async fn refresh(&mut self, order_id: Option<&OrderId>) -> Result<(), ClientError> {
        self.fetch_orders().await?;
        let active_id = match &self.active {
            Some(active) if order_id.map_or(true, |id| id == &active.detail.order.id) => active.detail.order.id.clone(),
            _ => return Ok(()),
        };
        self.fetch_order_by_id(active_id.as_str()).await?;
        Ok(())
    }

    /// Keeps the view fresh until `shutdown` completes. Refreshes every `poll_interval` and whenever a hint arrives.
    /// If the hint channel closes, polling carries on alone.
    pub async fn watch<S>(&mut self, poll_interval: Duration, hints: &mut mpsc::Receiver<PushHint>, shutdown: S)
    where S: Future<Output = ()> {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut hints_open = true;
        tokio::pin!(shutdown);
        info!("🧭️ Watching orders for {} every {}s", self.backend.actor(), poll_interval.as_secs());
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh(None).await {
                        warn!("🧭️ Scheduled refresh failed. Will try again next interval. {e}");
                    }
                },
                hint = hints.recv(), if hints_open => match hint {
                    Some(hint) => {
                        trace!("🧭️ Push hint received: {hint:?}");
                        if let Err(e) = self.refresh(hint.order_id.as_ref()).await {
                            warn!("🧭️ Refresh after push hint failed. The next poll will catch up. {e}");
                        }
                    },
                    None => {
                        debug!("🧭️ Push hints are no longer available. Polling only.");
                        hints_open = false;
                    },
                },
            }
        }
        info!("🧭️ Stopped watching orders for {}", self.backend.actor());
    }

    /// Drops all local state, including cached metrics.
    pub fn close(&mut self) {
        self.orders.clear();
        self.active = None;
        self.metrics.clear();
    }

    async fn refresh_on_conflict<T>(
        &mut self,
        order_id: &OrderId,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        if let Err(e) = &result {
            if e.should_refresh() {
                info!("🧭️ Order {order_id} was changed elsewhere. Refreshing before retry.");
                if let Err(refresh_err) = self.refresh(Some(order_id)).await {
                    warn!("🧭️ Could not refresh after a conflict. {refresh_err}");
                }
            }
        }
        result
    }

    fn patch_order<F>(&mut self, remote: &Order, patch: F)
    where F: Fn(&mut Order, &Order) {
        for local in self.orders.iter_mut().filter(|o| o.id == remote.id) {
            patch(local, remote);
        }
        if let Some(detail) = self.active_detail_mut(&remote.id) {
            patch(&mut detail.order, remote);
        }
        self.invalidate_metrics();
    }

    fn active_detail_mut(&mut self, order_id: &OrderId) -> Option<&mut OrderDetail> {
        self.active.as_mut().map(|a| &mut a.detail).filter(|d| &d.order.id == order_id)
    }

    fn invalidate_metrics(&mut self) {
        let key = self.backend.actor().user_id.clone();
        self.metrics.invalidate(&key);
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use mockall::mock;
    use order_engine::{
        db_types::{Actor, OrderStatusType, Paise, PaymentMethod, PaymentStatus},
        order_objects::FanOutReport,
        ErrorKind,
        OrderFlowError,
    };

    use super::*;

    mock! {
        pub Backend {}
        impl OrderBackend for Backend {
            fn actor(&self) -> &Actor;
            async fn place_order(&self, request: NewOrderRequest) -> Result<PlacedOrder, ClientError>;
            async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError>;
            async fn resolve_order(&self, token: &str) -> Result<ResolvedOrder, ClientError>;
            async fn update_status(&self, order_id: &OrderId, request: StatusChangeRequest) -> Result<TransitionResult, ClientError>;
            async fn assign_delivery_partner(&self, order_id: &OrderId, request: AssignPartnerRequest) -> Result<DeliveryUpdateResult, ClientError>;
            async fn post_delivery_update(&self, order_id: &OrderId, request: DeliveryUpdateRequest) -> Result<DeliveryUpdateResult, ClientError>;
            async fn submit_delivery_proof(&self, order_id: &OrderId, request: DeliveryProofRequest) -> Result<ProofResult, ClientError>;
            async fn mark_payment_received(&self, order_id: &OrderId) -> Result<PaymentResult, ClientError>;
            async fn unread_notifications(&self) -> Result<Vec<Notification>, ClientError>;
            async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ClientError>;
        }
    }

    fn order(status: OrderStatusType) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::from("order-1"),
            retailer_id: "ravi".into(),
            wholesaler_id: "wasim".into(),
            delivery_partner_id: None,
            reference_number: None,
            total_amount: Paise::from_rupees(500),
            status,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn backend() -> MockBackend {
        let mut backend = MockBackend::new();
        backend.expect_actor().return_const(Actor::wholesaler("wasim"));
        backend
    }

    #[tokio::test]
    async fn conflicts_refresh_before_returning() {
        let mut backend = backend();
        let mut fetches = 0;
        backend.expect_fetch_orders().times(2).returning(move || {
            fetches += 1;
            // The first load sees the order as placed. By the time of the conflict, it has been confirmed elsewhere.
            let status = if fetches == 1 { OrderStatusType::Placed } else { OrderStatusType::Confirmed };
            Ok(vec![order(status)])
        });
        backend
            .expect_update_status()
            .times(1)
            .returning(|id, _| Err(OrderFlowError::Conflict(id.clone()).into()));
        let mut coordinator = OrderCoordinator::new(backend, chrono::Duration::seconds(60));
        coordinator.fetch_orders().await.unwrap();
        assert_eq!(coordinator.orders()[0].status, OrderStatusType::Placed);

        let id = OrderId::from("order-1");
        let err = coordinator.update_status(&id, StatusChangeRequest::new(OrderStatusType::Confirmed)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(coordinator.orders()[0].status, OrderStatusType::Confirmed);
    }

    #[tokio::test]
    async fn mutations_patch_only_what_they_change() {
        let mut backend = backend();
        backend.expect_fetch_orders().times(1).returning(|| Ok(vec![order(OrderStatusType::Placed)]));
        backend.expect_update_status().times(1).returning(|_, _| {
            let mut remote = order(OrderStatusType::Confirmed);
            // Changed by someone else, and not part of this request
            remote.notes = Some("Deliver after 4pm".into());
            remote.updated_at = Utc::now();
            Ok(TransitionResult { order: remote, fan_out: FanOutReport::default() })
        });
        let mut coordinator = OrderCoordinator::new(backend, chrono::Duration::seconds(60));
        coordinator.fetch_orders().await.unwrap();
        let metrics = coordinator.dashboard_metrics();
        assert_eq!(metrics.count(OrderStatusType::Placed), 1);

        let id = OrderId::from("order-1");
        coordinator.update_status(&id, StatusChangeRequest::new(OrderStatusType::Confirmed)).await.unwrap();
        let local = coordinator.order(&id).unwrap();
        assert_eq!(local.status, OrderStatusType::Confirmed);
        assert_eq!(local.notes, None);
        // Patching invalidates the cached metrics
        let metrics = coordinator.dashboard_metrics();
        assert_eq!(metrics.count(OrderStatusType::Placed), 0);
        assert_eq!(metrics.count(OrderStatusType::Confirmed), 1);
    }

    #[tokio::test]
    async fn other_errors_do_not_refresh() {
        let mut backend = backend();
        backend.expect_fetch_orders().never();
        backend
            .expect_mark_payment_received()
            .times(1)
            .returning(|id| Err(OrderFlowError::OrderNotDelivered(id.clone()).into()));
        let mut coordinator = OrderCoordinator::new(backend, chrono::Duration::seconds(60));
        let err = coordinator.mark_payment_received(&OrderId::from("order-1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(coordinator.orders().is_empty());
    }
}
