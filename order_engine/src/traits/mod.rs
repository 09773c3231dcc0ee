//! # Order store contracts
//!
//! This module defines the interfaces that order store *backends* must provide. The engine APIs in
//! [`crate::oe_api`] are written against these traits only, so a backend is free to choose how it persists data,
//! provided it honours the atomicity rules documented on each method.
//!
//! * [`OrderManagement`] stores orders and their line items, and performs compare-and-swap status updates.
//! * [`DeliveryManagement`] maintains the append-only delivery timeline, partner assignment and delivery proofs.
//! * [`LedgerManagement`] records settled payments (at most one per order) and flips the order's paid flag.
//! * [`NotificationManagement`] is the per-recipient notification inbox.
//! * [`OrderDatabase`] ties the four together for backends that implement all of them.
mod data_objects;
mod delivery_management;
mod ledger_management;
mod notification_management;
mod order_management;

pub use data_objects::{OrderQueryFilter, StatusUpdate, StoreError};
pub use delivery_management::DeliveryManagement;
pub use ledger_management::LedgerManagement;
pub use notification_management::NotificationManagement;
pub use order_management::OrderManagement;

/// The full set of behaviour needed to back the order engine.
pub trait OrderDatabase:
    Clone + OrderManagement + DeliveryManagement + LedgerManagement + NotificationManagement
{
    /// The URL of the database
    fn url(&self) -> &str;
}
