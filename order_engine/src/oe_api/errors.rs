use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::StoreError,
};

/// The error taxonomy shared by the engine, the HTTP surface and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The order (or other entity) could not be found.
    NotFound,
    /// The caller's role or identity does not permit the operation.
    Unauthorized,
    /// A state machine or business precondition does not hold.
    InvalidTransition,
    /// Another writer got there first. Refresh and retry.
    Conflict,
    /// Some, but not all, effects of a multi-step operation were committed. Never reported as a failure.
    PartialSuccess,
    /// The store or another dependency is unavailable.
    Upstream,
    /// The request itself was malformed.
    InvalidRequest,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::InvalidTransition => "invalid_transition",
            Self::Conflict => "conflict",
            Self::PartialSuccess => "partial_success",
            Self::Upstream => "upstream",
            Self::InvalidRequest => "invalid_request",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    NotFound(String),
    #[error("You are not allowed to do that. {0}")]
    Unauthorized(String),
    #[error("Order {order_id} is {from} and cannot be moved to {to}.")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, to: String },
    #[error("Order {0} has not been delivered yet, so payment cannot be recorded.")]
    OrderNotDelivered(OrderId),
    #[error("Order {0} is not a cash-on-delivery order.")]
    NotCashOnDelivery(OrderId),
    #[error("Order {0} is already marked as paid.")]
    AlreadyPaid(OrderId),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("Order {0} was changed by someone else. Refresh and try again.")]
    Conflict(OrderId),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The order store is unavailable. {0}")]
    Upstream(#[from] StoreError),
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InvalidTransition { .. } |
            Self::OrderNotDelivered(_) |
            Self::NotCashOnDelivery(_) |
            Self::AlreadyPaid(_) |
            Self::PreconditionFailed(_) => ErrorKind::InvalidTransition,
            Self::Conflict(_) | Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Upstream(StoreError::QueryError(_)) => ErrorKind::InvalidRequest,
            Self::Upstream(_) => ErrorKind::Upstream,
        }
    }

    pub fn invalid_transition<S: Display>(order_id: &OrderId, from: OrderStatusType, to: S) -> Self {
        Self::InvalidTransition { order_id: order_id.clone(), from, to: to.to_string() }
    }

    pub fn unauthorized<S: Into<String>>(reason: S) -> Self {
        Self::Unauthorized(reason.into())
    }
}
