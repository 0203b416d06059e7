use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::config::GEOBRIDGE_ENV_VAR_PREFIX;
use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub python: PythonConfig,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        Self::figment()
            .extract()
            .map_err(|e| CommonError::invalid(e.to_string()))
    }

    fn figment() -> Figment {
        Figment::from(Toml::string(DEFAULT_CONFIG)).admerge(
            Env::prefixed(GEOBRIDGE_ENV_VAR_PREFIX).map(|p| p.as_str().replace("__", ".").into()),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub default_log_filter: String,
    pub trace_to_console: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_log_filter: "info".to_string(),
            trace_to_console: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonConfig {
    pub slow_call_warn_ms: u64,
    pub forward_point_tolerance: bool,
}

impl PythonConfig {
    /// Returns `None` when the slow call warning is disabled.
    pub fn slow_call_threshold(&self) -> Option<Duration> {
        (self.slow_call_warn_ms > 0).then(|| Duration::from_millis(self.slow_call_warn_ms))
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            slow_call_warn_ms: 30_000,
            forward_point_tolerance: false,
        }
    }
}
