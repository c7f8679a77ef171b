//! Configuration for the GPS bridge.
//!
//! TOML files with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `GPS_BRIDGE_CONFIG` environment variable (explicit path)
//! 2. `./gps-bridge.toml` (current directory)
//! 3. `config.toml` under the platform config directory
//!    (`~/.config/gps-bridge/` on Linux, `%APPDATA%\gps-bridge\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `GPS_BRIDGE_<SECTION>_<KEY>`:
//! - `GPS_BRIDGE_DISCOVERY_PREAMBLE=any-talker`
//! - `GPS_BRIDGE_DISCOVERY_EXCLUDE_PORTS=/dev/ttyS0,/dev/ttyS1`
//! - `GPS_BRIDGE_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use gps_port_bridge::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Preamble check: {}", loader.config().discovery.preamble.as_str());
//! # Ok::<(), gps_port_bridge::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, resolve_config_path, validate, ConfigLoader};
pub use schema::{Config, DiscoveryConfig, LogFormat, LoggingConfig};
