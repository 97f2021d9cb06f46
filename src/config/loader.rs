//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use crate::channel::WriteMode;
use crate::port::BaudRate;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_PAIR";

/// Config file name
const CONFIG_FILE_NAME: &str = "serial-pair.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_PAIR_CONFIG";

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
    /// 1. `SERIAL_PAIR_CONFIG` environment variable (explicit path)
    /// 2. `./serial-pair.toml` (current directory)
    /// 3. `serial-pair.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, no overrides).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Platform config directory for this tool, e.g. `~/.config/serial-pair`.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-pair").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Platform config file path for this tool.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Read `SERIAL_PAIR_<key>` and parse it, if set.
fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}"))),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_PAIR_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_PAIR_DISCOVERY_MAX_PORT=32`
/// - `SERIAL_PAIR_LINE_DEFAULT_BAUD=115200`
/// - `SERIAL_PAIR_SESSION_RECEIVE_DEADLINE_MS=2000`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Discovery overrides
    if let Some(val) = env_value::<u16>("DISCOVERY_MAX_PORT", "port number")? {
        config.discovery.max_port = val;
    }
    if let Ok(val) = std::env::var(format!("{}_DISCOVERY_PORT_TEMPLATE", ENV_PREFIX)) {
        config.discovery.port_template = val;
    }

    // Line overrides
    if let Some(val) = env_value::<u32>("LINE_DEFAULT_BAUD", "baud rate")? {
        config.line.default_baud = BaudRate::try_from(val).map_err(|message| {
            ConfigError::env_parse(format!("{}_LINE_DEFAULT_BAUD", ENV_PREFIX), message)
        })?;
    }

    // Timeout overrides
    if let Some(val) = env_value::<u64>("TIMEOUTS_READ_CONSTANT_MS", "timeout")? {
        config.timeouts.read_constant_ms = val;
    }
    if let Some(val) = env_value::<u64>("TIMEOUTS_WRITE_CONSTANT_MS", "timeout")? {
        config.timeouts.write_constant_ms = val;
    }

    // Session overrides
    if let Some(val) = env_value::<u64>("SESSION_RECEIVE_DEADLINE_MS", "deadline")? {
        config.session.receive_deadline_ms = Some(val);
    }
    if let Some(val) = env_value::<u64>("SESSION_NO_DATA_PAUSE_MS", "pause")? {
        config.session.no_data_pause_ms = val;
    }
    if let Ok(val) = std::env::var(format!("{}_SESSION_WRITE_MODE", ENV_PREFIX)) {
        config.session.write_mode = match val.to_lowercase().as_str() {
            "single_attempt" => WriteMode::SingleAttempt,
            "write_all" => WriteMode::WriteAll,
            _ => {
                return Err(ConfigError::env_parse(
                    format!("{}_SESSION_WRITE_MODE", ENV_PREFIX),
                    "Expected single_attempt or write_all",
                ))
            }
        };
    }

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{}_LOGGING_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(format!("{}_LOGGING_FORMAT", ENV_PREFIX)) {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::env_parse(
                    format!("{}_LOGGING_FORMAT", ENV_PREFIX),
                    "Expected json, pretty or compact",
                ))
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use std::time::Duration;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().discovery.max_port, 256);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let file = write_config("[discovery]\nmax_port = 12\n\n[session]\nno_data_pause_ms = 0\n");

        let loader = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(loader.config().discovery.max_port, 12);
        assert_eq!(loader.config().session.no_data_pause(), Duration::ZERO);
        assert_eq!(loader.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::load_from("/definitely/not/here/serial-pair.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_rejected() {
        let file = write_config("[discovery]\nmax_port = 0\n");
        let err = ConfigLoader::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));

        let file = write_config("[discovery\n");
        let err = ConfigLoader::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        let file = write_config("");
        env::set_var("SERIAL_PAIR_DISCOVERY_MAX_PORT", "9");
        env::set_var("SERIAL_PAIR_SESSION_WRITE_MODE", "write_all");
        env::set_var("SERIAL_PAIR_LINE_DEFAULT_BAUD", "57600");

        let result = ConfigLoader::load_from(file.path());

        env::remove_var("SERIAL_PAIR_DISCOVERY_MAX_PORT");
        env::remove_var("SERIAL_PAIR_SESSION_WRITE_MODE");
        env::remove_var("SERIAL_PAIR_LINE_DEFAULT_BAUD");

        let config = result.unwrap().into_config();
        assert_eq!(config.discovery.max_port, 9);
        assert_eq!(config.session.write_mode, WriteMode::WriteAll);
        assert_eq!(config.line.default_baud, BaudRate::B57600);
    }

    #[test]
    #[serial]
    fn test_bad_env_value() {
        let file = write_config("");
        env::set_var("SERIAL_PAIR_LINE_DEFAULT_BAUD", "12345");
        let result = ConfigLoader::load_from(file.path());
        env::remove_var("SERIAL_PAIR_LINE_DEFAULT_BAUD");

        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    #[serial]
    fn test_config_path_env_is_honoured() {
        let file = write_config("[discovery]\nmax_port = 3\n");
        env::set_var(CONFIG_PATH_ENV, file.path());
        let resolved = resolve_config_path();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(resolved.as_deref(), Some(file.path()));
    }
}
