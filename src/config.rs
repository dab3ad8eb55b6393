//! Server configuration from the environment

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_IDLE_SECS: u64 = 1800;

/// Server settings. Unparseable values fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Sessions untouched for this long are dropped
    pub session_idle: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let bind = var("ASSISTANT_BIND")
            .and_then(|b| b.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let port = var("ASSISTANT_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let idle_secs = var("ASSISTANT_SESSION_IDLE_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_IDLE_SECS);

        Self {
            bind,
            port,
            session_idle: Duration::from_secs(idle_secs),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// How often the idle sweeper runs
    pub fn sweep_interval(&self) -> Duration {
        (self.session_idle / 10).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }
}
