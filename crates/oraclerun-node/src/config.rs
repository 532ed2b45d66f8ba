//! Node configuration.

use std::time::Duration;

use clap::Parser;

/// Node configuration, from flags or environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "oraclerun-node")]
#[command(about = "oraclerun job pipeline node", long_about = None)]
#[command(version)]
pub struct Config {
    /// HTTP API bind address
    #[arg(long, env = "ORACLERUN_HTTP_ADDR", default_value = "127.0.0.1:6688")]
    pub http_bind_addr: String,

    /// Base URL bridges call back on; callbacks are disabled when unset
    #[arg(long, env = "ORACLERUN_BRIDGE_RESPONSE_URL")]
    pub bridge_response_url: Option<String>,

    /// Minimum block confirmations applied to every task
    #[arg(long, env = "ORACLERUN_MIN_INCOMING_CONFIRMATIONS", default_value_t = 0)]
    pub min_incoming_confirmations: u32,

    /// Seconds between passes over pending runs
    #[arg(long, env = "ORACLERUN_RESUME_INTERVAL_SECS", default_value_t = 15)]
    pub resume_interval_secs: u64,

    /// Timeout for outgoing bridge requests (seconds)
    #[arg(long, env = "ORACLERUN_BRIDGE_TIMEOUT_SECS", default_value_t = 30)]
    pub bridge_timeout_secs: u64,
}

impl Config {
    pub fn resume_interval(&self) -> Duration {
        Duration::from_secs(self.resume_interval_secs.max(1))
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:6688".to_string(),
            bridge_response_url: None,
            min_incoming_confirmations: 0,
            resume_interval_secs: 15,
            bridge_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "oraclerun-node",
            "--http-bind-addr",
            "0.0.0.0:7000",
            "--min-incoming-confirmations",
            "3",
        ]);
        assert_eq!(config.http_bind_addr, "0.0.0.0:7000");
        assert_eq!(config.min_incoming_confirmations, 3);
        assert_eq!(config.resume_interval(), Duration::from_secs(15));
    }
}
