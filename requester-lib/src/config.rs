//! Dispatcher configuration and configuration file handling.
//!
//! [`DispatcherConfig`] is the value a [`Dispatcher`](crate::Dispatcher) is
//! built from. The rest of this module loads layered defaults for it from
//! TOML files and `REQUESTER_*` environment variables.

use crate::error::RequesterError;
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of workers used when the caller asks for zero.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Capacity of the pending-request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Upper bound accepted for worker count and queue capacity in config files.
pub const MAX_CONFIGURED_LIMIT: usize = 1000;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("requester/", env!("CARGO_PKG_VERSION"));

/// Callback invoked with the original request and the full response body.
pub type SuccessHandler = Arc<dyn Fn(Request, Vec<u8>) + Send + Sync>;

/// Callback invoked with the execution error of a failed request.
pub type FailureHandler = Arc<dyn Fn(RequesterError) + Send + Sync>;

/// Settings a dispatcher is constructed with.
///
/// Handlers run concurrently on several workers, so they must be `Send + Sync`.
/// Any state they share needs its own synchronization.
///
/// # Example
///
/// ```rust
/// use requester_lib::DispatcherConfig;
///
/// let config = DispatcherConfig::default()
///     .with_worker_count(4)
///     .on_success(|request, body| println!("{} -> {} bytes", request, body.len()))
///     .on_failure(|err| eprintln!("{}", err));
///
/// assert_eq!(config.effective_worker_count(), 4);
/// ```
#[derive(Clone)]
pub struct DispatcherConfig {
    /// Number of workers; 0 means [`DEFAULT_WORKER_COUNT`]
    pub worker_count: usize,

    /// Bounded queue size; 0 means [`DEFAULT_QUEUE_CAPACITY`]
    pub queue_capacity: usize,

    /// `User-Agent` sent with every request
    pub user_agent: String,

    /// Called once per successful request
    pub on_success: Option<SuccessHandler>,

    /// Called once per failed request
    pub on_failure: Option<FailureHandler>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            on_success: None,
            on_failure: None,
        }
    }
}

impl DispatcherConfig {
    /// Set the worker count. Zero falls back to the default at construction.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the queue capacity. Zero falls back to the default at construction.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_user_agent<U: Into<String>>(mut self, user_agent: U) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Register the success callback.
    pub fn on_success<F>(mut self, handler: F) -> Self
    where
        F: Fn(Request, Vec<u8>) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(handler));
        self
    }

    /// Register the failure callback.
    pub fn on_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(RequesterError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(handler));
        self
    }

    /// Worker count after applying the default for zero.
    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            self.worker_count
        }
    }

    /// Queue capacity after applying the default for zero.
    pub fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            self.queue_capacity
        }
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("user_agent", &self.user_agent)
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Worker count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,

    /// HTTP verb used for every URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body used for every URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Overlay file defaults onto a dispatcher configuration.
    pub fn apply_to(&self, mut config: DispatcherConfig) -> DispatcherConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(parallel) = defaults.parallel {
                config.worker_count = parallel;
            }
            if let Some(capacity) = defaults.queue_capacity {
                config.queue_capacity = capacity;
            }
            if let Some(user_agent) = &defaults.user_agent {
                config.user_agent = user_agent.clone();
            }
        }
        config
    }

    pub fn method(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.method.as_deref())
    }

    pub fn body(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.body.as_deref())
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `FileError` if the file is missing or unreadable, and
    /// `ConfigError` if it fails to parse or validate.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, RequesterError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RequesterError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            RequesterError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is the lowest precedence, then the home directory, then the
    /// current directory. Files that fail to load are skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, RequesterError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                debug!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./requester.toml", "./.requester.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".requester.toml", "requester.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("requester").join("config.toml");
        path.exists().then_some(path)
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), RequesterError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(parallel) = defaults.parallel {
            if parallel == 0 || parallel > MAX_CONFIGURED_LIMIT {
                return Err(RequesterError::config(format!(
                    "parallel must be between 1 and {}",
                    MAX_CONFIGURED_LIMIT
                )));
            }
        }

        if let Some(capacity) = defaults.queue_capacity {
            if capacity == 0 || capacity > MAX_CONFIGURED_LIMIT {
                return Err(RequesterError::config(format!(
                    "queue_capacity must be between 1 and {}",
                    MAX_CONFIGURED_LIMIT
                )));
            }
        }

        if let Some(method) = &defaults.method {
            if method.trim().is_empty() {
                return Err(RequesterError::config("method cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Merge two configurations; values from `higher` win.
fn merge_configs(lower: FileConfig, higher: FileConfig) -> FileConfig {
    let defaults = match (lower.defaults, higher.defaults) {
        (Some(lower), Some(higher)) => Some(DefaultsConfig {
            parallel: higher.parallel.or(lower.parallel),
            method: higher.method.or(lower.method),
            body: higher.body.or(lower.body),
            queue_capacity: higher.queue_capacity.or(lower.queue_capacity),
            user_agent: higher.user_agent.or(lower.user_agent),
        }),
        (lower, higher) => higher.or(lower),
    };

    FileConfig { defaults }
}

/// Configuration values set through `REQUESTER_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub parallel: Option<usize>,
    pub method: Option<String>,
    pub user_agent: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    pub fn apply_to(&self, mut config: DispatcherConfig) -> DispatcherConfig {
        if let Some(parallel) = self.parallel {
            config.worker_count = parallel;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    parse_env_config(|key| env::var(key).ok())
}

fn parse_env_config<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("REQUESTER_PARALLEL") {
        match val.trim().parse::<usize>() {
            Ok(parallel) if parallel > 0 && parallel <= MAX_CONFIGURED_LIMIT => {
                debug!(parallel, "using REQUESTER_PARALLEL");
                env_config.parallel = Some(parallel);
            }
            _ => warn!(
                value = %val,
                "invalid REQUESTER_PARALLEL, must be 1-{}",
                MAX_CONFIGURED_LIMIT
            ),
        }
    }

    if let Some(method) = lookup("REQUESTER_METHOD") {
        if method.trim().is_empty() {
            warn!("ignoring empty REQUESTER_METHOD");
        } else {
            env_config.method = Some(method.trim().to_string());
        }
    }

    if let Some(user_agent) = lookup("REQUESTER_USER_AGENT") {
        if !user_agent.trim().is_empty() {
            env_config.user_agent = Some(user_agent);
        }
    }

    if let Some(path) = lookup("REQUESTER_CONFIG") {
        if !path.trim().is_empty() {
            env_config.config = Some(path);
        }
    }

    env_config
}
