use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::models::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl RemoteConfig {
    pub const MIN_TIMEOUT_MS: u64 = 10_000;
    pub const MAX_TIMEOUT_MS: u64 = 15_000;
    pub const DEFAULT_TIMEOUT_MS: u64 = 12_000;

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub read_retry_delay_ms: u64,
    pub stale_ms: StalenessConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            read_retry_delay_ms: 1000,
            stale_ms: StalenessConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn read_retry_delay(&self) -> Duration {
        Duration::from_millis(self.read_retry_delay_ms)
    }
}

/// How long a cached read stays fresh, per entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    pub content: u64,
    pub events: u64,
    pub event_requests: u64,
    pub clients: u64,
    pub comments: u64,
    pub admin_tasks: u64,
    pub notifications: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            content: 30_000,
            events: 30_000,
            event_requests: 30_000,
            clients: 60_000,
            comments: 10_000,
            admin_tasks: 30_000,
            notifications: 15_000,
        }
    }
}

impl StalenessConfig {
    pub fn for_kind(&self, kind: EntityKind) -> Duration {
        let ms = match kind {
            EntityKind::Content => self.content,
            EntityKind::Event => self.events,
            EntityKind::EventRequest => self.event_requests,
            EntityKind::Client => self.clients,
            EntityKind::Comment => self.comments,
            EntityKind::AdminTask => self.admin_tasks,
            EntityKind::Notification => self.notifications,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub public_url: Option<String>,
    pub url_expiry_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: None,
            access_key_id: None,
            secret_access_key: None,
            region: "auto".to_string(),
            public_url: None,
            url_expiry_secs: 3600,
        }
    }
}

impl StorageConfig {
    /// Names of required settings that are absent or blank.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let checks = [
            ("STORAGE_ENDPOINT", &self.endpoint),
            ("STORAGE_BUCKET", &self.bucket),
            ("STORAGE_ACCESS_KEY_ID", &self.access_key_id),
            ("STORAGE_SECRET_ACCESS_KEY", &self.secret_access_key),
            ("STORAGE_PUBLIC_URL", &self.public_url),
        ];
        for (name, value) in checks {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                missing.push(name);
            }
        }
        missing
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let timeout_ms = parsed_var("REMOTE_TIMEOUT_MS", RemoteConfig::DEFAULT_TIMEOUT_MS)
            .clamp(RemoteConfig::MIN_TIMEOUT_MS, RemoteConfig::MAX_TIMEOUT_MS);

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed_var("SERVER_PORT", 3000),
            },
            remote: RemoteConfig {
                url: optional_var("REMOTE_URL"),
                api_key: optional_var("REMOTE_API_KEY"),
                timeout_ms,
            },
            cache: CacheConfig {
                capacity: parsed_var("CACHE_CAPACITY", 1000),
                read_retry_delay_ms: parsed_var("CACHE_READ_RETRY_DELAY_MS", 1000),
                stale_ms: StalenessConfig::default(),
            },
            storage: StorageConfig {
                endpoint: optional_var("STORAGE_ENDPOINT"),
                bucket: optional_var("STORAGE_BUCKET"),
                access_key_id: optional_var("STORAGE_ACCESS_KEY_ID"),
                secret_access_key: optional_var("STORAGE_SECRET_ACCESS_KEY"),
                region: env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
                public_url: optional_var("STORAGE_PUBLIC_URL"),
                url_expiry_secs: parsed_var("STORAGE_URL_EXPIRY_SECS", 3600),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
