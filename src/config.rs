use std::env;
use std::sync::OnceLock;
use std::time::Duration;

static CONFIG: OnceLock<Config> = OnceLock::new();

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    pub stats: StatsConfig,
    pub hub: HubConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn global() -> &'static Config {
        CONFIG.get_or_init(Self::load)
    }

    fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            server: ServerConfig::load(),
            broker: BrokerConfig::load(),
            stats: StatsConfig::load(),
            hub: HubConfig::load(),
            log: LogConfig::load(),
        }
    }
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
}

impl ServerConfig {
    fn load() -> Self {
        Self {
            addr: get_env("SERVER_ADDR", "0.0.0.0:8080"),
        }
    }
}

// BROKER
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub monitor_url: String,
    pub connect_timeout_ms: u64,
    pub list_wait_ms: u64,
    pub publish_stall_ms: u64,
    pub fetch_wait_ms: u64,
}

impl BrokerConfig {
    fn load() -> Self {
        Self {
            url:                get_env("BROKER_URL", "nats://localhost:4222"),
            monitor_url:        get_env("BROKER_MONITOR_URL", "http://localhost:8222"),
            connect_timeout_ms: get_env("BROKER_CONNECT_TIMEOUT_MS", "10000"),
            list_wait_ms:       get_env("BROKER_LIST_WAIT_MS", "100"),
            publish_stall_ms:   get_env("BROKER_PUBLISH_STALL_MS", "5000"),
            fetch_wait_ms:      get_env("BROKER_FETCH_WAIT_MS", "1000"),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn list_wait(&self) -> Duration {
        Duration::from_millis(self.list_wait_ms)
    }

    pub fn publish_stall(&self) -> Duration {
        Duration::from_millis(self.publish_stall_ms)
    }

    pub fn fetch_wait(&self) -> Duration {
        Duration::from_millis(self.fetch_wait_ms)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            monitor_url: "http://localhost:8222".to_string(),
            connect_timeout_ms: 10_000,
            list_wait_ms: 100,
            publish_stall_ms: 5_000,
            fetch_wait_ms: 1_000,
        }
    }
}

// STATS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSource {
    /// Reduce the stream listing on every tick.
    Streams,
    /// Sample the broker monitoring endpoint (`/jsz`).
    Monitor,
}

impl std::str::FromStr for StatsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streams" => Ok(StatsSource::Streams),
            "monitor" => Ok(StatsSource::Monitor),
            other => Err(format!("unknown statistics source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub interval_ms: u64,
    pub source: StatsSource,
}

impl StatsConfig {
    fn load() -> Self {
        Self {
            interval_ms: get_env("STATS_INTERVAL_MS", "1000"),
            source:      get_env("STATS_SOURCE", "streams"),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            source: StatsSource::Streams,
        }
    }
}

// HUB
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub client_queue_capacity: usize,
}

impl HubConfig {
    fn load() -> Self {
        Self {
            client_queue_capacity: get_env("HUB_CLIENT_QUEUE_CAP", "64"),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { client_queue_capacity: 64 }
    }
}

// LOG
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
}

impl LogConfig {
    fn load() -> Self {
        Self {
            level: get_env("LOG_LEVEL", "info"),
        }
    }
}

// --- PRIVATE HELPER ---

fn get_env<T: std::str::FromStr>(key: &str, default: &str) -> T {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .unwrap_or_else(|_| panic!("Config error: {} must be valid (got '{}')", key, raw))
}
