//! # B2B order client
//!
//! The client side of the order lifecycle. Each user session owns one [`coordinator::OrderCoordinator`], which holds
//! the caller's view of their orders and keeps it fresh:
//!
//! * Reads replace local state wholesale. Mutations patch the local copy in place with the fields the operation
//!   changed, so the UI reflects the change without waiting for a full reload.
//! * A watch loop refreshes on a fixed interval and whenever a push hint arrives. Hints are only a prompt to poll early;
//!   the interval poll is what guarantees the view converges.
//! * Dashboard metrics are derived from the order list and cached per actor with a TTL.
//!
//! The coordinator talks to the engine through the [`backend::OrderBackend`] trait. [`backend::HttpBackend`] calls a
//! remote order server, and [`backend::LocalBackend`] drives the engine APIs in-process.
pub mod backend;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod hints;
pub mod metrics;

pub use backend::{HttpBackend, LocalBackend, OrderBackend};
pub use config::ClientConfig;
pub use coordinator::OrderCoordinator;
pub use errors::ClientError;
