use order_engine::{ErrorKind, OrderFlowError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("{message}")]
    Api { kind: ErrorKind, message: String },
    #[error("Could not reach the order server. {0}")]
    Transport(String),
    #[error("Unexpected response from the order server. {0}")]
    InvalidResponse(String),
    #[error("Invalid client configuration. {0}")]
    Configuration(String),
}

/// The error body returned by the order server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::Transport(_) | Self::InvalidResponse(_) => ErrorKind::Upstream,
            Self::Configuration(_) => ErrorKind::InvalidRequest,
        }
    }

    /// A conflict means the local copy is stale. Refresh, then let the user retry.
    pub fn should_refresh(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// A message that tells the user what they can do about the error.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::NotFound => "We couldn't find that order. Check the order number and try again.".into(),
            ErrorKind::Unauthorized => "You don't have access to this order.".into(),
            ErrorKind::InvalidTransition => format!("That action isn't available for this order right now. {self}"),
            ErrorKind::Conflict => {
                "Someone else updated this order. We've refreshed it, so please review and try again.".into()
            },
            ErrorKind::PartialSuccess => "Done, but a follow-up step is still pending. Try again to complete it.".into(),
            ErrorKind::Upstream => "The order service is unavailable at the moment. Please try again shortly.".into(),
            ErrorKind::InvalidRequest => format!("Please check the details you entered. {self}"),
        }
    }
}

impl From<OrderFlowError> for ClientError {
    fn from(e: OrderFlowError) -> Self {
        Self::Api { kind: e.kind(), message: e.to_string() }
    }
}

impl From<ErrorBody> for ClientError {
    fn from(body: ErrorBody) -> Self {
        Self::Api { kind: body.kind, message: body.error }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        Self::Configuration(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use order_engine::db_types::OrderId;

    use super::*;

    #[test]
    fn user_messages_are_actionable() {
        let conflict = ClientError::from(OrderFlowError::Conflict(OrderId::from("abc")));
        assert!(conflict.should_refresh());
        assert!(conflict.user_message().contains("refreshed"));

        let transport = ClientError::Transport("connection refused".into());
        assert_eq!(transport.kind(), ErrorKind::Upstream);
        assert!(!transport.should_refresh());

        let body: ErrorBody =
            serde_json::from_str(r#"{"error": "Order #abc has not been delivered yet", "kind": "invalid_transition"}"#)
                .unwrap();
        let err = ClientError::from(body);
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(err.user_message().ends_with("Order #abc has not been delivered yet"));
    }
}
