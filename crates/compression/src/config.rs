//! Engine configuration: TOML file, environment overrides, builder.

use crate::{BrotliCodec, Codec, CompressionOptions, Engine};
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Files probed when no explicit config path is given.
const CONFIG_CANDIDATES: [&str; 3] = [
    "brotli-buffer.toml",
    ".brotli-buffer.toml",
    ".config/brotli-buffer.toml",
];

/// Overrides `worker_threads`.
pub const ENV_WORKERS: &str = "BROTLI_BUFFER_WORKERS";
/// Overrides `defaults.quality`.
pub const ENV_QUALITY: &str = "BROTLI_BUFFER_QUALITY";

/// Errors raised while loading configuration or building an engine.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`EngineConfig`]
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that was parsed
        path: String,
        /// Underlying error
        source: toml::de::Error,
    },

    /// A setting has an unusable value
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// Offending value
        value: String,
    },

    /// The worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dedicated worker count; unset uses the process-wide pool
    pub worker_threads: Option<usize>,
    /// Prefix for dedicated worker thread names
    pub thread_name_prefix: String,
    /// Options applied under every compress call
    pub defaults: CompressionOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name_prefix: "brotli-worker".to_string(),
            defaults: CompressionOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or the first candidate file found, or defaults;
    /// then apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config_path = path.map(String::from).or_else(find_config_file);

        let config = match config_path {
            Some(ref p) => Self::from_file(p)?,
            None => Self::default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `BROTLI_BUFFER_*` overrides read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_WORKERS) {
            let workers = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_WORKERS,
                value: raw.clone(),
            })?;
            self.worker_threads = Some(workers);
        }

        if let Some(raw) = lookup(ENV_QUALITY) {
            let quality = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_QUALITY,
                value: raw.clone(),
            })?;
            self.defaults.quality = Some(quality);
        }

        Ok(self)
    }
}

fn find_config_file() -> Option<String> {
    CONFIG_CANDIDATES
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(String::from)
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    codec: Arc<dyn Codec>,
    worker_threads: Option<usize>,
    thread_name_prefix: String,
    defaults: CompressionOptions,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Brotli, process-wide pool, no defaults.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            codec: Arc::new(BrotliCodec),
            worker_threads: config.worker_threads,
            thread_name_prefix: config.thread_name_prefix,
            defaults: config.defaults,
        }
    }

    /// Seed the builder from a loaded config.
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.worker_threads = config.worker_threads;
        self.thread_name_prefix.clone_from(&config.thread_name_prefix);
        self.defaults = config.defaults;
        self
    }

    /// Use another codec.
    pub fn codec(mut self, codec: impl Codec) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Run on a dedicated pool of `n` workers.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n);
        self
    }

    /// Prefix for dedicated worker thread names.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Options applied under every compress call.
    pub fn defaults(mut self, defaults: CompressionOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Start the pool, if any, and build the engine.
    pub fn build(self) -> Result<Engine, ConfigError> {
        let pool = match self.worker_threads {
            None => None,
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "worker_threads",
                    value: "0".to_string(),
                });
            }
            Some(n) => {
                let prefix = self.thread_name_prefix;
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(move |i| format!("{prefix}-{i}"))
                    .build()?;
                tracing::debug!(workers = n, "started dedicated worker pool");
                Some(Arc::new(pool))
            }
        };

        Ok(Engine::from_parts(self.codec, pool, self.defaults))
    }
}

impl Engine {
    /// Build an engine from a loaded config.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        EngineBuilder::new().config(config).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert!(config.worker_threads.is_none());
        assert_eq!(config.thread_name_prefix, "brotli-worker");
        assert_eq!(config.defaults, CompressionOptions::default());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "worker_threads = 2\nthread_name_prefix = \"br\"\n\n[defaults]\nquality = 5\nmode = \"text\"\n"
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.thread_name_prefix, "br");
        assert_eq!(config.defaults.quality, Some(5));
        assert_eq!(config.defaults.mode, Some(1));
    }

    #[test]
    fn test_config_missing_file_is_an_error() {
        let err = EngineConfig::load(Some("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_config_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_threads = \"many\"").unwrap();
        assert!(matches!(
            EngineConfig::from_file(file.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::default()
            .with_env_overrides(|key| match key {
                ENV_WORKERS => Some("3".to_string()),
                ENV_QUALITY => Some(" 7 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.worker_threads, Some(3));
        assert_eq!(config.defaults.quality, Some(7));

        let err = EngineConfig::default()
            .with_env_overrides(|key| (key == ENV_WORKERS).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_WORKERS, .. }));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            Engine::builder().worker_threads(0).build().unwrap_err(),
            ConfigError::InvalidValue { key: "worker_threads", .. }
        ));
    }

    #[test]
    fn test_dedicated_pool_names_threads() {
        let engine = Engine::builder()
            .worker_threads(1)
            .thread_name_prefix("unit-pool")
            .build()
            .unwrap();

        let (tx, rx) = mpsc::channel();
        engine.compress(b"abc".to_vec(), CompressionOptions::new().quality(1), move |outcome| {
            let name = std::thread::current().name().map(String::from);
            tx.send((name, outcome.is_ok())).unwrap();
        });

        let (name, ok) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(ok);
        assert_eq!(name.as_deref(), Some("unit-pool-0"));
    }

    #[test]
    fn test_from_config_applies_defaults() {
        let config = EngineConfig {
            defaults: CompressionOptions::new().quality(2),
            ..EngineConfig::default()
        };
        let engine = Engine::from_config(&config).unwrap();
        assert_eq!(engine.defaults().quality, Some(2));
    }
}
