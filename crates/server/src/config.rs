//! Server configuration from CLI flags and environment.

use clap::Parser;
use std::path::PathBuf;

use crate::report::TelemetryInputs;

#[derive(Debug, Parser)]
#[command(name = "soc-server", about = "SOC platform API server")]
pub struct ServerConfig {
    /// Address to bind the HTTP API on.
    #[arg(long, default_value = "127.0.0.1:3400")]
    pub bind: String,

    /// SQLite database path.
    #[arg(long, default_value = "soc.db")]
    pub db_path: PathBuf,

    /// Directory for rotated log files.
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Completion API endpoint.
    #[arg(long, default_value = "https://api.anthropic.com/v1/messages")]
    pub completion_url: String,

    /// Completion API key. Empty disables the remote call, so every
    /// chat reply comes from the local fallback.
    #[arg(long, env = "SOC_COMPLETION_API_KEY", default_value = "")]
    pub completion_api_key: String,

    /// Completion model identifier.
    #[arg(long, default_value = "claude-sonnet-4-5-20250929")]
    pub completion_model: String,

    /// Mean alert response time, from the ops telemetry pipeline.
    #[arg(long, default_value_t = 0.0)]
    pub avg_response_time_ms: f64,

    /// Measured platform uptime percentage for the reporting period.
    #[arg(long, default_value_t = 0.0)]
    pub system_uptime_pct: f64,
}

impl ServerConfig {
    pub fn telemetry(&self) -> TelemetryInputs {
        TelemetryInputs {
            avg_response_time_ms: self.avg_response_time_ms,
            system_uptime_pct: self.system_uptime_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let config = ServerConfig::parse_from(["soc-server"]);
        assert_eq!(config.bind, "127.0.0.1:3400");
        assert_eq!(config.telemetry(), TelemetryInputs::default());
    }

    #[test]
    fn telemetry_flags_flow_through() {
        let config = ServerConfig::parse_from([
            "soc-server",
            "--avg-response-time-ms",
            "340",
            "--system-uptime-pct",
            "99.95",
        ]);
        let telemetry = config.telemetry();
        assert_eq!(telemetry.avg_response_time_ms, 340.0);
        assert_eq!(telemetry.system_uptime_pct, 99.95);
    }
}
