use std::env;
use std::time::Duration;

/// Timeout for calls to the sibling services (seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Process configuration, read from the environment once at startup and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub route_service_url: String,
    pub stop_service_url: String,
    pub bus_service_url: String,
    pub request_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:5005"),
            database_url: env_or("DATABASE_URL", "sqlite://schedule.db"),
            route_service_url: env_or("ROUTE_SERVICE_URL", "http://localhost:5002"),
            stop_service_url: env_or("STOP_SERVICE_URL", "http://localhost:5003"),
            bus_service_url: env_or("BUS_SERVICE_URL", "http://localhost:5004"),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
