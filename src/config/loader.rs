//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "GPS_BRIDGE";

/// Config file looked for in the working directory
const LOCAL_CONFIG_FILE: &str = "gps-bridge.toml";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "GPS_BRIDGE_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `GPS_BRIDGE_CONFIG` environment variable (explicit path)
    /// 2. `./gps-bridge.toml`
    /// 3. `config.toml` in the platform config directory
    /// 4. Built-in defaults
    ///
    /// Environment variables override whatever the file says.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config, env_lookup)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config, env_lookup)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Defaults plus environment overrides; never touches the filesystem.
    ///
    /// Unparseable overrides are ignored here.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if apply_env_overrides(&mut config, env_lookup).is_err() || validate(&config).is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    default_config_path().filter(|path| path.exists())
}

/// Where a user-level config file lives on this platform.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gps-bridge").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Apply `GPS_BRIDGE_<SECTION>_<KEY>` overrides.
///
/// - `GPS_BRIDGE_DISCOVERY_PREAMBLE=any-talker`
/// - `GPS_BRIDGE_DISCOVERY_EXCLUDE_PORTS=/dev/ttyS0,/dev/ttyS1`
/// - `GPS_BRIDGE_LOGGING_LEVEL=debug`
/// - `GPS_BRIDGE_LOGGING_FORMAT=compact`
pub(crate) fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| format!("{}_{}", ENV_PREFIX, key);

    if let Some(val) = lookup(&var("DISCOVERY_PREAMBLE")) {
        config.discovery.preamble = val
            .parse()
            .map_err(|e: String| ConfigError::env(var("DISCOVERY_PREAMBLE"), e))?;
    }
    if let Some(val) = lookup(&var("DISCOVERY_EXCLUDE_PORTS")) {
        config.discovery.exclude_ports = val
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(val) = lookup(&var("LOGGING_LEVEL")) {
        config.logging.level = val;
    }
    if let Some(val) = lookup(&var("LOGGING_FORMAT")) {
        config.logging.format = val
            .parse()
            .map_err(|e: String| ConfigError::env(var("LOGGING_FORMAT"), e))?;
    }

    Ok(())
}

/// Reject values that deserialize fine but cannot be used.
pub fn validate(config: &Config) -> ConfigResult<()> {
    let level = config.logging.level.trim();
    if level.is_empty() {
        return Err(ConfigError::invalid("logging.level", "must not be empty"));
    }
    EnvFilter::try_new(level)
        .map_err(|e| ConfigError::invalid("logging.level", e.to_string()))?;

    if let Some(port) = config.discovery.exclude_ports.iter().find(|p| p.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "discovery.exclude_ports",
            format!("blank port name {:?}", port),
        ));
    }

    Ok(())
}
