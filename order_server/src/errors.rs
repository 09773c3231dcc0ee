use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use order_engine::{ErrorKind, OrderFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Caller identity is missing or invalid. {0}")]
    MissingIdentity(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ServerError {
    /// The error kind reported to clients in the response body.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderFlow(e) => e.kind(),
            Self::MissingIdentity(_) => ErrorKind::Unauthorized,
            Self::InvalidRequestBody(_) => ErrorKind::InvalidRequest,
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                ErrorKind::Upstream
            },
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingIdentity(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::OrderFlow(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                ErrorKind::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Upstream => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
                // Partial success is reported as a successful outcome and never reaches this point
                ErrorKind::PartialSuccess => StatusCode::OK,
            },
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("💻️ Request failed with {status}. {self}");
        } else {
            debug!("💻️ Request failed with {status}. {self}");
        }
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string(), "kind": self.kind() }).to_string())
    }
}
