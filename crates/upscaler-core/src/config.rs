//! Configuration module
//!
//! Deployment settings for the upscale pipeline: the service-account key, the
//! prediction endpoint coordinates and the memory gate tuning. Values come from
//! the environment (optionally seeded from a `.env` file).

use std::env;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_REGION: &str = "us-central1";
const DEFAULT_PUBLISHER: &str = "google";
const DEFAULT_MODEL: &str = "imagen-4.0-upscale-preview";
pub const DEFAULT_FILE_PREFIX: &str = "UHQ ";
const DEFAULT_SAMPLE_COUNT: u32 = 1;
const DEFAULT_MIN_FREE_MEMORY_MB: u64 = 1024;
const DEFAULT_MEMORY_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_MEMORY_MAX_WAIT_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Upscale factor accepted by the prediction model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum UpscaleFactor {
    #[default]
    #[serde(rename = "x2")]
    X2,
    #[serde(rename = "x4")]
    X4,
}

impl FromStr for UpscaleFactor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x2" | "2" => Ok(UpscaleFactor::X2),
            "x4" | "4" => Ok(UpscaleFactor::X4),
            _ => Err(anyhow::anyhow!("Invalid upscale factor: {}", s)),
        }
    }
}

impl Display for UpscaleFactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UpscaleFactor::X2 => write!(f, "x2"),
            UpscaleFactor::X4 => write!(f, "x4"),
        }
    }
}

/// What the memory gate does once `max_wait` has elapsed without enough free memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateTimeoutPolicy {
    /// Run the job anyway; a job is never starved forever.
    #[default]
    RunAnyway,
    /// Give up and report `InsufficientMemory` without running the job.
    Abort,
}

impl FromStr for GateTimeoutPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" | "run_anyway" => Ok(GateTimeoutPolicy::RunAnyway),
            "abort" => Ok(GateTimeoutPolicy::Abort),
            _ => Err(anyhow::anyhow!("Invalid gate timeout policy: {}", s)),
        }
    }
}

impl Display for GateTimeoutPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GateTimeoutPolicy::RunAnyway => write!(f, "run"),
            GateTimeoutPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Upscale pipeline configuration
#[derive(Clone)]
pub struct UpscaleConfig {
    /// Base64-encoded service-account JSON.
    ///
    /// WARNING: secret. Never log this field; the `Debug` impl redacts it.
    pub service_account_key: String,
    pub project_id: String,
    pub region: String,
    pub publisher: String,
    pub model: String,
    pub upscale_factor: UpscaleFactor,
    pub sample_count: u32,
    /// Prefix prepended to the original file name for the upscaled copy
    pub file_prefix: String,
    pub min_free_memory_bytes: u64,
    pub memory_poll_interval_ms: u64,
    pub memory_max_wait_secs: u64,
    pub gate_timeout_policy: GateTimeoutPolicy,
    pub http_timeout_secs: u64,
    /// Overrides the credential's `token_uri`
    pub token_uri: Option<String>,
    /// Overrides `https://{region}-aiplatform.googleapis.com`
    pub prediction_base_url: Option<String>,
}

impl Debug for UpscaleConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("UpscaleConfig")
            .field("service_account_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("publisher", &self.publisher)
            .field("model", &self.model)
            .field("upscale_factor", &self.upscale_factor)
            .field("sample_count", &self.sample_count)
            .field("file_prefix", &self.file_prefix)
            .field("min_free_memory_bytes", &self.min_free_memory_bytes)
            .field("memory_poll_interval_ms", &self.memory_poll_interval_ms)
            .field("memory_max_wait_secs", &self.memory_max_wait_secs)
            .field("gate_timeout_policy", &self.gate_timeout_policy)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("token_uri", &self.token_uri)
            .field("prediction_base_url", &self.prediction_base_url)
            .finish()
    }
}

impl UpscaleConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let upscale_factor = match get("UPSCALE_FACTOR") {
            Some(v) => v.parse()?,
            None => UpscaleFactor::default(),
        };

        let gate_timeout_policy = match get("UPSCALE_GATE_TIMEOUT_POLICY") {
            Some(v) => v.parse()?,
            None => GateTimeoutPolicy::default(),
        };

        let min_free_memory_mb: u64 = parse_number(
            get("UPSCALE_MIN_FREE_MEMORY_MB"),
            "UPSCALE_MIN_FREE_MEMORY_MB",
            DEFAULT_MIN_FREE_MEMORY_MB,
        )?;
        let min_free_memory_bytes = min_free_memory_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            anyhow::anyhow!(
                "UPSCALE_MIN_FREE_MEMORY_MB is too large: {} MB does not fit in bytes",
                min_free_memory_mb
            )
        })?;

        let config = UpscaleConfig {
            service_account_key: get("GOOGLE_SERVICE_ACCOUNT_JSON_KEY").ok_or_else(|| {
                anyhow::anyhow!("GOOGLE_SERVICE_ACCOUNT_JSON_KEY must be set")
            })?,
            project_id: get("UPSCALE_PROJECT_ID")
                .ok_or_else(|| anyhow::anyhow!("UPSCALE_PROJECT_ID must be set"))?,
            region: get("UPSCALE_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            publisher: get("UPSCALE_PUBLISHER").unwrap_or_else(|| DEFAULT_PUBLISHER.to_string()),
            model: get("UPSCALE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            upscale_factor,
            sample_count: parse_number(
                get("UPSCALE_SAMPLE_COUNT"),
                "UPSCALE_SAMPLE_COUNT",
                DEFAULT_SAMPLE_COUNT,
            )?,
            // Only the prefix may legitimately end in whitespace, so read it raw.
            file_prefix: lookup("UPSCALE_FILE_PREFIX")
                .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string()),
            min_free_memory_bytes,
            memory_poll_interval_ms: parse_number(
                get("UPSCALE_MEMORY_POLL_INTERVAL_MS"),
                "UPSCALE_MEMORY_POLL_INTERVAL_MS",
                DEFAULT_MEMORY_POLL_INTERVAL_MS,
            )?,
            memory_max_wait_secs: parse_number(
                get("UPSCALE_MEMORY_MAX_WAIT_SECS"),
                "UPSCALE_MEMORY_MAX_WAIT_SECS",
                DEFAULT_MEMORY_MAX_WAIT_SECS,
            )?,
            gate_timeout_policy,
            http_timeout_secs: parse_number(
                get("UPSCALE_HTTP_TIMEOUT_SECS"),
                "UPSCALE_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            token_uri: get("UPSCALE_TOKEN_URI"),
            prediction_base_url: get("UPSCALE_PREDICTION_BASE_URL"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.service_account_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "GOOGLE_SERVICE_ACCOUNT_JSON_KEY must not be empty"
            ));
        }

        for (name, value) in [
            ("UPSCALE_PROJECT_ID", &self.project_id),
            ("UPSCALE_REGION", &self.region),
            ("UPSCALE_PUBLISHER", &self.publisher),
            ("UPSCALE_MODEL", &self.model),
        ] {
            if value.trim().is_empty() || value.contains('/') {
                return Err(anyhow::anyhow!("{} must be a non-empty path segment", name));
            }
        }

        if self.sample_count == 0 {
            return Err(anyhow::anyhow!("UPSCALE_SAMPLE_COUNT must be at least 1"));
        }

        if self.memory_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "UPSCALE_MEMORY_POLL_INTERVAL_MS must be greater than 0"
            ));
        }

        Ok(())
    }

    pub fn memory_poll_interval(&self) -> Duration {
        Duration::from_millis(self.memory_poll_interval_ms)
    }

    pub fn memory_max_wait(&self) -> Duration {
        Duration::from_secs(self.memory_max_wait_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Parse a numeric setting, falling back to `default` only when it is unset.
fn parse_number<T: FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, anyhow::Error> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}
