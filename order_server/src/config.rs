use std::{env, fmt::Display, str::FromStr};

use b2b_common::helpers::{parse_boolean_flag, parse_env_var};
use log::*;
use order_engine::ResolverConfig;

const DEFAULT_B2B_HOST: &str = "127.0.0.1";
const DEFAULT_B2B_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/b2b_orders.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// How many of the most recent orders the resolver scans when matching truncated ids and fragments.
    pub resolver_candidates: u32,
    /// Capacity of the order event channel. Publishers wait when it is full.
    pub event_buffer: usize,
    /// If true, outstanding schema migrations are applied before the server starts accepting requests.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_B2B_HOST.to_string(),
            port: DEFAULT_B2B_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            resolver_candidates: ResolverConfig::default().candidate_limit,
            event_buffer: DEFAULT_EVENT_BUFFER,
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("B2B_HOST").ok().unwrap_or_else(|| DEFAULT_B2B_HOST.into());
        let port = env_or_default("B2B_PORT", defaults.port);
        let database_url = env::var("B2B_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ B2B_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env_or_default("B2B_DB_MAX_CONNECTIONS", defaults.max_connections);
        let resolver_candidates = env_or_default("B2B_RESOLVER_CANDIDATES", defaults.resolver_candidates);
        let event_buffer = env_or_default("B2B_EVENT_BUFFER", defaults.event_buffer);
        let run_migrations = parse_boolean_flag(env::var("B2B_RUN_MIGRATIONS").ok(), true);
        if !run_migrations {
            info!("🪛️ Automatic migrations are disabled. Make sure the database schema is up to date.");
        }
        Self { host, port, database_url, max_connections, resolver_candidates, event_buffer, run_migrations }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig { candidate_limit: self.resolver_candidates, ..Default::default() }
    }
}

fn env_or_default<T>(name: &str, default: T) -> T
where T: FromStr + Display + Copy {
    match parse_env_var::<T>(name) {
        Some(Ok(v)) => v,
        Some(Err(raw)) => {
            error!("🪛️ {raw} is not a valid value for {name}. Using the default, {default}, instead.");
            default
        },
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}
