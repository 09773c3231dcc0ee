use std::{env, str::FromStr, time::Duration};

use b2b_common::helpers::parse_env_var;
use log::*;
use order_engine::db_types::{Actor, Role};
use url::Url;

use crate::errors::ClientError;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8370";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_METRICS_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    /// The session's identity. Every request is made on behalf of this actor.
    pub actor: Actor,
    /// How often the watch loop refreshes, push hints or not.
    pub poll_interval: Duration,
    /// How long dashboard metrics are served from the cache before being recomputed.
    pub metrics_ttl: chrono::Duration,
}

impl ClientConfig {
    pub fn new(server_url: Url, actor: Actor) -> Self {
        Self {
            server_url,
            actor,
            poll_interval: DEFAULT_POLL_INTERVAL,
            metrics_ttl: chrono::Duration::seconds(DEFAULT_METRICS_TTL_SECS),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_metrics_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.metrics_ttl = ttl;
        self
    }

    /// Reads the client configuration from `B2B_SERVER_URL`, `B2B_CLIENT_USER_ID`, `B2B_CLIENT_ROLE`,
    /// `B2B_POLL_INTERVAL_SECS` and `B2B_METRICS_TTL_SECS`. The identity has no default.
    pub fn from_env() -> Result<Self, ClientError> {
        let url = env::var("B2B_SERVER_URL").unwrap_or_else(|_| {
            info!("🪛️ B2B_SERVER_URL is not set. Using {DEFAULT_SERVER_URL}.");
            DEFAULT_SERVER_URL.to_string()
        });
        let server_url = Url::parse(&url)?;
        let user_id = env::var("B2B_CLIENT_USER_ID")
            .map_err(|e| ClientError::Configuration(format!("{e} [B2B_CLIENT_USER_ID]")))?;
        let role = env::var("B2B_CLIENT_ROLE").map_err(|e| ClientError::Configuration(format!("{e} [B2B_CLIENT_ROLE]")))?;
        let role = Role::from_str(&role).map_err(|e| ClientError::Configuration(e.to_string()))?;
        let mut config = Self::new(server_url, Actor::new(user_id, role));
        match parse_env_var::<u64>("B2B_POLL_INTERVAL_SECS") {
            Some(Ok(secs)) if secs > 0 => config.poll_interval = Duration::from_secs(secs),
            Some(_) => warn!("🪛️ Invalid B2B_POLL_INTERVAL_SECS. Using the default of 30s."),
            None => {},
        }
        match parse_env_var::<i64>("B2B_METRICS_TTL_SECS") {
            Some(Ok(secs)) if secs >= 0 => config.metrics_ttl = chrono::Duration::seconds(secs),
            Some(_) => warn!("🪛️ Invalid B2B_METRICS_TTL_SECS. Using the default of {DEFAULT_METRICS_TTL_SECS}s."),
            None => {},
        }
        Ok(config)
    }
}
