//! B2B Order Engine
//!
//! The order engine is the core of the B2B marketplace's order lifecycle. Retailers place orders with wholesalers,
//! wholesalers confirm, reject and dispatch them, delivery partners carry them through the delivery pipeline, and
//! cash collected on delivery is reconciled against a ledger. Every change fans out notifications to the parties on
//! the order.
//!
//! The library is divided into three main sections:
//! 1. Store contracts ([`mod@traits`]) and the SQLite backend ([`mod@sqlite`]). You should never need to touch the
//!    database directly. Use the public API instead. The data types stored in the database are defined in
//!    [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@oe_api`]). This is written against the store traits only, so any backend that
//!    implements them can drive the engine.
//! 3. Events ([`mod@events`]). Every committed change to an order publishes an [`events::OrderUpdatedEvent`]. A simple
//!    pub-sub framework lets you hook into these and react, for example by pushing refresh hints to clients.
pub mod db_types;
pub mod events;
pub mod oe_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use oe_api::{
    delivery_api::DeliveryApi,
    errors::{ErrorKind, OrderFlowError},
    notification_api::NotificationApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_api::PaymentApi,
    resolver_api::{OrderResolver, ResolverConfig},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    DeliveryManagement,
    LedgerManagement,
    NotificationManagement,
    OrderDatabase,
    OrderManagement,
    OrderQueryFilter,
    StoreError,
};
