//! Order resolution.
//!
//! Users refer to orders in many ways: the full id, the 8-character short id printed on receipts and notifications,
//! the id of a notification about the order, an external reference number, or a fragment of the id pasted from
//! somewhere. [`OrderResolver::resolve`] tries each of these in a fixed priority order and stops at the first hit.
//!
//! A miss in one strategy is never an error. Only a store failure, or running out of strategies, ends the search.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Actor, Order, OrderId},
    oe_api::{
        errors::OrderFlowError,
        order_flow_api::load_order_detail,
        order_objects::{ResolutionStrategy, ResolvedOrder},
    },
    traits::{DeliveryManagement, LedgerManagement, NotificationManagement, OrderManagement},
};

pub const DEFAULT_CANDIDATE_LIMIT: u32 = 100;
pub const TRUNCATED_ID_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How many of the most recent orders the prefix and substring strategies scan.
    pub candidate_limit: u32,
    pub truncated_length: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { candidate_limit: DEFAULT_CANDIDATE_LIMIT, truncated_length: TRUNCATED_ID_LENGTH }
    }
}

pub struct OrderResolver<B> {
    db: B,
    config: ResolverConfig,
}

impl<B> Debug for OrderResolver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderResolver ({:?})", self.config)
    }
}

impl<B> OrderResolver<B> {
    pub fn new(db: B) -> Self {
        Self { db, config: ResolverConfig::default() }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderResolver<B>
where B: OrderManagement + NotificationManagement
{
    /// Resolves `token` to an order, reporting which strategy found it.
    ///
    /// When the prefix or substring strategies match more than one candidate, the most recently created order wins.
    pub async fn resolve(&self, token: &str) -> Result<(Order, ResolutionStrategy), OrderFlowError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(OrderFlowError::NotFound("No order reference was given".into()));
        }
        match self.find(token).await? {
            Some((order, strategy)) => {
                debug!("🔎️ '{token}' resolved to order {} by {strategy}", order.id);
                Ok((order, strategy))
            },
            None => {
                debug!("🔎️ '{token}' did not match any order");
                Err(OrderFlowError::NotFound(format!("No order matches '{token}'")))
            },
        }
    }

    async fn find(&self, token: &str) -> Result<Option<(Order, ResolutionStrategy)>, OrderFlowError> {
        if let Some(order) = self.by_exact_id(token).await? {
            return Ok(Some((order, ResolutionStrategy::ExactId)));
        }
        // Both scans share the same candidate window, fetched lazily
        let mut candidates: Option<Vec<Order>> = None;
        if token.chars().count() == self.config.truncated_length {
            let recent = self.candidates(&mut candidates).await?;
            if let Some(order) = best_match(recent, token, |id, t| id.starts_with(t)) {
                return Ok(Some((order, ResolutionStrategy::TruncatedId)));
            }
        }
        if let Some(order) = self.by_notification(token).await? {
            return Ok(Some((order, ResolutionStrategy::NotificationReference)));
        }
        if let Some(order) = self.by_reference_number(token).await? {
            return Ok(Some((order, ResolutionStrategy::ReferenceNumber)));
        }
        let recent = self.candidates(&mut candidates).await?;
        if let Some(order) = best_match(recent, token, |id, t| id.contains(t)) {
            return Ok(Some((order, ResolutionStrategy::Substring)));
        }
        Ok(None)
    }

    async fn by_exact_id(&self, token: &str) -> Result<Option<Order>, OrderFlowError> {
        let order = self.db.fetch_order(&OrderId::from(token)).await?;
        Ok(order)
    }

    async fn by_notification(&self, token: &str) -> Result<Option<Order>, OrderFlowError> {
        let Some(notification) = self.db.fetch_notification(token).await? else {
            return Ok(None);
        };
        let Some(order_id) = notification.related_order() else {
            trace!("🔎️ Notification {token} does not refer to an order");
            return Ok(None);
        };
        self.by_exact_id(order_id.as_str()).await
    }

    async fn by_reference_number(&self, token: &str) -> Result<Option<Order>, OrderFlowError> {
        if !self.db.supports_reference_numbers().await? {
            trace!("🔎️ Store has no reference numbers. Skipping.");
            return Ok(None);
        }
        let order = self.db.fetch_order_by_reference(token).await?;
        Ok(order)
    }

    async fn candidates<'a>(&self, cache: &'a mut Option<Vec<Order>>) -> Result<&'a [Order], OrderFlowError> {
        if cache.is_none() {
            let recent = self.db.fetch_recent_orders(self.config.candidate_limit).await?;
            trace!("🔎️ Scanning {} candidate orders", recent.len());
            *cache = Some(recent);
        }
        Ok(cache.as_deref().unwrap_or_default())
    }
}

impl<B> OrderResolver<B>
where B: OrderManagement + NotificationManagement + DeliveryManagement + LedgerManagement
{
    /// Resolves `token` on behalf of `actor` and loads the full order detail. Resolving an order the actor may not
    /// see is an authorization error, not a miss.
    pub async fn resolve_detail(&self, actor: &Actor, token: &str) -> Result<ResolvedOrder, OrderFlowError> {
        let (order, strategy) = self.resolve(token).await?;
        if !order.is_visible_to(actor) {
            return Err(OrderFlowError::unauthorized(format!("Order {} is not one of yours.", order.id.short())));
        }
        let detail = load_order_detail(&self.db, order).await?;
        Ok(ResolvedOrder { strategy, detail })
    }
}

/// Case-insensitive scan over `candidates`, which are ordered most recent first, so the first match is the most
/// recent one.
fn best_match<F>(candidates: &[Order], token: &str, matches: F) -> Option<Order>
where F: Fn(&str, &str) -> bool {
    let token = token.to_lowercase();
    let mut hits = candidates.iter().filter(|o| matches(&o.id.as_str().to_lowercase(), &token));
    let first = hits.next().cloned();
    let others = hits.count();
    if others > 0 {
        debug!("🔎️ '{token}' is ambiguous. {} other orders also match. Using the most recent.", others);
    }
    first
}
