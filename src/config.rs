//! Runtime configuration, loaded from optional TOML files and the environment.

use std::time::Duration;

use serde::Deserialize;

use crate::sync_error::SyncResult;

pub const ENV_PREFIX: &str = "SHELTER_PHOTOS";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub reconcile: RetryPolicy,
}

/// Connection settings for the bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// S3-compatible endpoint, e.g. `https://<project>.supabase.co/storage/v1/s3`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Project URL that public object URLs are built from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_bucket() -> String {
    "cat-photos".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:54321".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            bucket: default_bucket(),
            endpoint: None,
            region: default_region(),
            access_key: None,
            secret_key: None,
            public_base_url: default_public_base_url(),
        }
    }
}

impl StoreConfig {
    /// Path segment that precedes the object path in every public URL.
    pub fn public_marker(&self) -> String {
        format!("/object/public/{}/", self.bucket)
    }

    pub fn public_url_prefix(&self) -> String {
        format!(
            "{}/storage/v1{}",
            self.public_base_url.trim_end_matches('/'),
            self.public_marker()
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocatorConfig {
    /// Shared object shown when an entity has no photos.
    #[serde(default = "default_placeholder_path")]
    pub placeholder_path: String,
    /// Used when even the placeholder object is missing.
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
}

fn default_placeholder_path() -> String {
    "default/placeholder.jpg".to_string()
}

fn default_fallback_url() -> String {
    "https://images.unsplash.com/photo-1514888286974-6c03e2ca1dba?w=400&h=300&fit=crop".to_string()
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            placeholder_path: default_placeholder_path(),
            fallback_url: default_fallback_url(),
        }
    }
}

/// Bounded re-fetch used after mutations: `max_attempts` fetches, `delay_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_delay_ms() -> u64 {
    1500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Fetches allowed per triggering event, whatever the configuration says.
pub const MAX_RECONCILE_ATTEMPTS: u32 = 2;

impl RetryPolicy {
    /// Configured attempts clamped to `1..=MAX_RECONCILE_ATTEMPTS`.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_RECONCILE_ATTEMPTS)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl PhotoConfig {
    /// Loads `config/default.toml`, `config/{RUN_MODE}.toml` and
    /// `SHELTER_PHOTOS__*` environment variables, later sources winning.
    pub fn load() -> SyncResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shelter_bucket() {
        let config = PhotoConfig::default();
        assert_eq!(config.store.bucket, "cat-photos");
        assert_eq!(config.reconcile.max_attempts, 2);
        assert_eq!(config.reconcile.delay(), Duration::from_millis(1500));
        assert_eq!(config.locator.placeholder_path, "default/placeholder.jpg");
    }

    #[test]
    fn attempts_are_bounded() {
        let eager = RetryPolicy { max_attempts: 10, delay_ms: 0 };
        assert_eq!(eager.attempts(), 2);
        let none = RetryPolicy { max_attempts: 0, delay_ms: 0 };
        assert_eq!(none.attempts(), 1);
    }

    #[test]
    fn public_prefix_ends_with_marker() {
        let store = StoreConfig {
            public_base_url: "https://demo.supabase.co/".to_string(),
            ..StoreConfig::default()
        };
        assert_eq!(
            store.public_url_prefix(),
            "https://demo.supabase.co/storage/v1/object/public/cat-photos/"
        );
    }
}
