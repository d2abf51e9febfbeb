use crate::application::anomaly_detector::DEFAULT_THRESHOLD;
use crate::domain::telemetry::Metric;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub bus: BusSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StorageSettings {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    #[serde(default = "default_window_minutes")]
    pub default_window_minutes: u32,
    #[serde(default = "default_metrics")]
    pub stats_metrics: Vec<Metric>,
    #[serde(default = "default_metrics")]
    pub anomaly_metrics: Vec<Metric>,
    #[serde(default = "default_threshold")]
    pub anomaly_threshold: f64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_window_minutes: default_window_minutes(),
            stats_metrics: default_metrics(),
            anomaly_metrics: default_metrics(),
            anomaly_threshold: default_threshold(),
        }
    }
}

/// MQTT broker connection used for telemetry subscription and command publishing
#[derive(Debug, Deserialize, Clone)]
pub struct BusSettings {
    #[serde(default = "default_bus_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bus_host")]
    pub host: String,
    #[serde(default = "default_bus_port")]
    pub port: u16,
    #[serde(default = "default_bus_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl BusSettings {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            enabled: default_bus_enabled(),
            host: default_bus_host(),
            port: default_bus_port(),
            client_id: default_bus_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
            channel_capacity: default_channel_capacity(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_db_path() -> String {
    "data.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_window_minutes() -> u32 {
    60
}

fn default_metrics() -> Vec<Metric> {
    Metric::DEFAULT_SET.to_vec()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_bus_enabled() -> bool {
    true
}

fn default_bus_host() -> String {
    "localhost".to_string()
}

fn default_bus_port() -> u16 {
    1883
}

fn default_bus_client_id() -> String {
    "fleet-telemetry".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    100
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

/// Load `config/service.toml` (optional) with `FLEET__SECTION__KEY` env overrides
pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/service").required(false))
        .add_source(
            config::Environment::with_prefix("FLEET")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("query.stats_metrics")
                .with_list_parse_key("query.anomaly_metrics")
                .try_parsing(true),
        )
        .build()?;

    let config: ServiceConfig = settings.try_deserialize()?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ServiceConfig) -> anyhow::Result<()> {
    if config.query.default_window_minutes == 0 {
        anyhow::bail!("query.default_window_minutes must be positive");
    }
    if !(config.query.anomaly_threshold.is_finite() && config.query.anomaly_threshold > 0.0) {
        anyhow::bail!("query.anomaly_threshold must be a positive number");
    }
    check_metric_set("query.stats_metrics", &config.query.stats_metrics)?;
    check_metric_set("query.anomaly_metrics", &config.query.anomaly_metrics)?;
    if config.bus.enabled {
        if config.bus.host.trim().is_empty() {
            anyhow::bail!("bus.host must not be empty");
        }
        if config.bus.client_id.is_empty() || config.bus.client_id.starts_with(' ') {
            anyhow::bail!("bus.client_id must be non-empty and must not start with a space");
        }
        if config.bus.channel_capacity == 0 {
            anyhow::bail!("bus.channel_capacity must be positive");
        }
    }
    Ok(())
}

fn check_metric_set(key: &str, metrics: &[Metric]) -> anyhow::Result<()> {
    if metrics.is_empty() {
        anyhow::bail!("{} must name at least one metric", key);
    }
    let mut seen = BTreeSet::new();
    for metric in metrics {
        if !seen.insert(metric) {
            anyhow::bail!("{} lists {} more than once", key, metric);
        }
    }
    Ok(())
}
