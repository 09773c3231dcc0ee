//! # B2B order server
//! This crate hosts the HTTP surface of the order engine. It is responsible for:
//! * Identifying the caller from the headers placed on every request by the upstream session gateway.
//! * Translating JSON requests into calls on the order engine APIs.
//! * Mapping engine errors onto HTTP status codes, with a machine-readable error kind in the body.
//! * Logging every order change published on the engine's event bus.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`: Place an order (`POST`) or list the caller's orders (`GET`).
//! * `/api/order/{token}`: Resolve an order reference and return the full order detail.
//! * `/api/order/{id}/status`, `/assign`, `/delivery`, `/timeline`, `/proof` and `/payment/cod`: The order lifecycle.
//! * `/api/notifications`: The caller's unread notifications, and `/api/notifications/{id}/read` to dismiss one.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod events;
pub mod identity;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
