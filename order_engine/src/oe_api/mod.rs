//! # Order engine public API
//!
//! The `oe_api` module exposes the programmatic API for the order lifecycle. Each API is constructed from a store
//! backend that implements the traits it needs, so callers only pull in what they use.
//!
//! * [`resolver_api`] turns whatever a user typed or clicked into an order.
//! * [`order_flow_api`] places orders and drives the order state machine.
//! * [`delivery_api`] assigns delivery partners, records the delivery pipeline and captures proof of delivery.
//! * [`payment_api`] reconciles cash-on-delivery payments against the ledger.
//! * [`notification_api`] fans out notifications to the parties on an order, and serves their inbox.
//!
//! [`state_machine`] holds the pure transition rules that the APIs enforce.
//!
//! # API usage
//!
//! ```rust,ignore
//! use order_engine::{OrderFlowApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url("sqlite://data/b2b_orders.db", 25).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let placed = api.place_order(&retailer, request).await?;
//! ```
pub mod delivery_api;
pub mod errors;
pub mod notification_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
pub mod resolver_api;
pub mod state_machine;
