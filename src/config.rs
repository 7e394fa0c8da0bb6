use crate::error::{Error, Result};
use crate::middleware::builtin::CorsConfig;
use crate::routing::ParamPriority;
use serde::{Deserialize, Serialize};
use std::env;
#[cfg(feature = "config")]
use std::fs;
#[cfg(feature = "config")]
use std::path::Path;

/// Environment the application runs in; selects the `config.{env}.toml` overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name; anything unrecognised is development
    pub fn parse(env: &str) -> Self {
        match env.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Production => "prod",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for in-flight requests after a shutdown signal
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Log the route table when the server starts
    #[serde(default)]
    pub print_routes: bool,

    /// Include each route's middleware names in the route table
    #[serde(default)]
    pub print_middleware: bool,

    #[serde(default)]
    pub param_priority: ParamPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_shutdown_timeout() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` as accepted by [`Server::serve`](crate::Server::serve)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// The configured level as a `log` filter; unknown names fall back to `Info`
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            log::warn!("Unknown log level '{}', using 'info'", self.level);
            log::LevelFilter::Info
        })
    }
}

#[cfg(feature = "config")]
impl AppConfig {
    /// Load `config.toml` (plus the environment overlay) from the working directory
    pub fn load() -> Result<Self> {
        Self::load_with_base_dir(".")
    }

    /// Load configuration from `base_dir`, then apply `NEX_*` environment overrides
    pub fn load_with_base_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let env = Self::detect_environment();
        let mut config = Self::from_files(base_dir, env)?;

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        log::info!(
            "Configuration loaded (environment: {})",
            config.environment.as_str()
        );
        Ok(config)
    }

    /// Merge `config.toml` with `config.{env}.toml` from `base_dir`
    ///
    /// Missing files are skipped, so an empty directory yields the defaults.
    /// Values from the environment file win key by key.
    pub fn from_files<P: AsRef<Path>>(base_dir: P, env: Environment) -> Result<Self> {
        let base_dir = base_dir.as_ref();

        let base_path = base_dir.join("config.toml");
        let mut merged = if base_path.exists() {
            Self::load_toml_value(&base_path)?
        } else {
            log::debug!("No config.toml in {}, using defaults", base_dir.display());
            toml::Value::Table(toml::map::Map::new())
        };

        let env_path = base_dir.join(format!("config.{}.toml", env.as_str()));
        if env_path.exists() {
            log::debug!(
                "Loading environment-specific config from: {}",
                env_path.display()
            );
            let overlay = Self::load_toml_value(&env_path)?;
            merged = serde_toml_merge::merge(merged, overlay).map_err(|e| {
                Error::config(format!("Failed to merge configuration files: {}", e))
            })?;
        }

        let mut config = merged
            .try_into::<AppConfig>()
            .map_err(|e| Error::config(format!("Invalid configuration: {}", e)))?;
        config.environment = env;
        config.validate()?;
        Ok(config)
    }

    /// Load a single TOML file without overlays or overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn load_toml_value(path: &Path) -> Result<toml::Value> {
        let content = read_config(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(feature = "config")]
fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })
}

impl AppConfig {
    /// Defaults with `NEX_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig {
            environment: Self::detect_environment(),
            ..Default::default()
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Environment named by `NEX_ENV`, development when unset
    pub fn detect_environment() -> Environment {
        env::var("NEX_ENV")
            .map(|value| Environment::parse(&value))
            .unwrap_or_default()
    }

    /// Apply overrides looked up by variable name
    ///
    /// Recognised keys: `NEX_HOST`, `NEX_PORT`, `NEX_SHUTDOWN_TIMEOUT`,
    /// `NEX_LOG_LEVEL`, `NEX_PRINT_ROUTES`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("NEX_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("NEX_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config(format!("Invalid NEX_PORT value '{}'", port)))?;
        }
        if let Some(timeout) = lookup("NEX_SHUTDOWN_TIMEOUT") {
            self.server.shutdown_timeout = timeout.parse().map_err(|_| {
                Error::config(format!("Invalid NEX_SHUTDOWN_TIMEOUT value '{}'", timeout))
            })?;
        }
        if let Some(level) = lookup("NEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(print) = lookup("NEX_PRINT_ROUTES") {
            self.router.print_routes = crate::http::parse_bool(&print).ok_or_else(|| {
                Error::config(format!("Invalid NEX_PRINT_ROUTES value '{}'", print))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("Server port cannot be 0"));
        }
        if self.server.shutdown_timeout == 0 {
            return Err(Error::config("Shutdown timeout must be at least one second"));
        }
        if self.router.print_middleware && !self.router.print_routes {
            log::warn!("router.print_middleware has no effect without router.print_routes");
        }
        Ok(())
    }
}
