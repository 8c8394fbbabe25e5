use crate::error::{Result, ThinkingError};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Sequential thinking service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThinkingConfig {
    /// Process store configuration
    pub store: StoreConfig,
    /// Input validation limits
    pub validation: ValidationConfig,
    /// Server configuration
    pub server: ServerConfig,
}

/// What `start_thinking` does when the capacity sweep frees nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// Create the process anyway, exceeding `max_processes`
    #[default]
    Grow,
    /// Refuse the new process with `CapacityExceeded`
    Reject,
}

/// Process store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Live process count that triggers an eviction sweep
    pub max_processes: usize,
    /// Processes started longer ago than this are evictable
    pub retention_secs: u64,
    pub capacity_policy: CapacityPolicy,
}

/// Input validation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub max_problem_length: usize,
    pub max_thought_length: usize,
    pub max_total_thoughts: u32,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name/identifier
    pub name: String,
    /// Server version
    pub version: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_processes: 100,
            retention_secs: 60 * 60,
            capacity_policy: CapacityPolicy::Grow,
        }
    }
}

impl StoreConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.retention_secs).unwrap_or(i64::MAX))
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_problem_length: 10_000,
            max_thought_length: 10_000,
            max_total_thoughts: 1000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "sequential-thinking".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ThinkingConfig {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load() -> Result<Self> {
        let config_file = match std::env::var("THINKING_MCP_CONFIG") {
            Ok(path) => {
                tracing::info!("Using THINKING_MCP_CONFIG: {}", path);
                path
            }
            Err(_) => "sequential-thinking.toml".to_string(),
        };

        Self::load_from(&config_file)
    }

    /// Load configuration using `config_file` as the file layer (missing files are skipped)
    pub fn load_from(config_file: &str) -> Result<Self> {
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("store.max_processes", defaults.store.max_processes as i64)?
            .set_default("store.retention_secs", defaults.store.retention_secs as i64)?
            .set_default("store.capacity_policy", "grow")?
            .set_default(
                "validation.max_problem_length",
                defaults.validation.max_problem_length as i64,
            )?
            .set_default(
                "validation.max_thought_length",
                defaults.validation.max_thought_length as i64,
            )?
            .set_default(
                "validation.max_total_thoughts",
                i64::from(defaults.validation.max_total_thoughts),
            )?
            .set_default("server.name", defaults.server.name)?
            .set_default("server.version", defaults.server.version)?
            .add_source(File::with_name(config_file).required(false))
            // THINKING_MCP__STORE__MAX_PROCESSES=50
            .add_source(
                Environment::with_prefix("THINKING_MCP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.max_processes == 0 {
            return Err(ThinkingError::Validation {
                field: "store.max_processes".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.validation.max_problem_length == 0
            || self.validation.max_thought_length == 0
            || self.validation.max_total_thoughts == 0
        {
            return Err(ThinkingError::Validation {
                field: "validation".to_string(),
                reason: "length limits must be at least 1".to_string(),
            });
        }

        tracing::info!(
            "Configuration validated: max_processes={}, retention={}s, policy={:?}",
            self.store.max_processes,
            self.store.retention_secs,
            self.store.capacity_policy
        );
        Ok(())
    }
}
