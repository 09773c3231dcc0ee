//! Caller identity.
//!
//! Authentication happens upstream. The session gateway places the caller's user id and role on every request it
//! forwards, and this module turns them into an [`Actor`] for the engine APIs.
use std::{future::Future, pin::Pin, str::FromStr};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use log::*;
use order_engine::db_types::{Actor, Role};

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "x-b2b-user-id";
pub const ROLE_HEADER: &str = "x-b2b-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Actor);

impl Caller {
    pub fn actor(&self) -> &Actor {
        &self.0
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = actor_from_headers(req.headers()).map(Caller);
        Box::pin(async move { result })
    }
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ServerError> {
    let user_id = header_value(headers, USER_ID_HEADER)?;
    let role = header_value(headers, ROLE_HEADER)?;
    let role = Role::from_str(role).map_err(|e| {
        debug!("💻️ Rejecting request with unknown role. {e}");
        ServerError::MissingIdentity(e.to_string())
    })?;
    trace!("💻️ Request made by {user_id} ({role})");
    Ok(Actor::new(user_id, role))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ServerError> {
    let value = headers
        .get(name)
        .ok_or_else(|| ServerError::MissingIdentity(format!("The {name} header is missing.")))?
        .to_str()
        .map_err(|e| ServerError::MissingIdentity(format!("The {name} header is not valid text. {e}")))?
        .trim();
    if value.is_empty() {
        return Err(ServerError::MissingIdentity(format!("The {name} header is empty.")));
    }
    Ok(value)
}
