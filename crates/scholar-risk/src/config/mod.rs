use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_MODEL_PATHS: [&str; 4] = [
    "data/models/student-model.json",
    "assets/models/student-model.json",
    "student-model.json",
    "../data/models/student-model.json",
];

const DEFAULT_ENCODER_PATHS: [&str; 4] = [
    "data/models/encoders.json",
    "assets/models/encoders.json",
    "encoders.json",
    "../data/models/encoders.json",
];

const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub models: ModelConfig,
    pub history_limit: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let models = ModelConfig {
            model_paths: path_list("MODEL_PATHS", &DEFAULT_MODEL_PATHS),
            encoder_paths: path_list("ENCODER_PATHS", &DEFAULT_ENCODER_PATHS),
        };

        let history_limit = match env::var("HISTORY_LIMIT") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidHistoryLimit),
            },
            Err(_) => DEFAULT_HISTORY_LIMIT,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            models,
            history_limit,
        })
    }
}

fn path_list(key: &str, defaults: &[&str]) -> Vec<PathBuf> {
    let configured: Vec<PathBuf> = env::var(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    if configured.is_empty() {
        defaults.iter().map(PathBuf::from).collect()
    } else {
        configured
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Candidate locations for the trained artifacts, probed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub model_paths: Vec<PathBuf>,
    pub encoder_paths: Vec<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_paths: DEFAULT_MODEL_PATHS.iter().map(PathBuf::from).collect(),
            encoder_paths: DEFAULT_ENCODER_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidHistoryLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidHistoryLimit => {
                write!(f, "HISTORY_LIMIT must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidHistoryLimit => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
