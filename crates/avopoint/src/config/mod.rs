use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub storage: StorageConfig,
    pub anthropic: AnthropicConfig,
    pub letter: LetterConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upload_dir =
            PathBuf::from(env::var("APP_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));
        let results_dir =
            PathBuf::from(env::var("APP_RESULTS_DIR").unwrap_or_else(|_| "results".to_string()));

        let latex_timeout_secs = env::var("APP_LATEX_TIMEOUT_SECS")
            .unwrap_or_else(|_| "45".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidLatexTimeout)?;

        let anthropic = AnthropicConfig {
            api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|key| !key.is_empty()),
            api_version: env::var("ANTHROPIC_API_VERSION")
                .unwrap_or_else(|_| "2023-06-01".to_string()),
            extraction_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            validation_model: env::var("ANTHROPIC_VALIDATION_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string()),
        };

        let letter = LetterConfig {
            latex_timeout: Duration::from_secs(latex_timeout_secs),
            lawyer_email: env::var("AVOPOINT_LAWYER_EMAIL")
                .unwrap_or_else(|_| "avocat@cabinet-martin.fr".to_string()),
            form_url: env::var("AVOPOINT_FORM_URL").unwrap_or_else(|_| {
                "https://contacts-demarches.interieur.gouv.fr/saisine-par-voie-electronique/demande-de-cliche-de-controle-automatise/"
                    .to_string()
            }),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                upload_dir,
                results_dir,
            },
            anthropic,
            letter,
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Directories owning uploaded documents and rendered letters.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
}

/// Credentials and model selection for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub api_version: String,
    pub extraction_model: String,
    pub validation_model: String,
}

impl AnthropicConfig {
    /// Serving requires a key up front; a missing key is a startup error,
    /// never a per-task failure.
    pub fn require_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

/// Knobs for the contestation-letter renderer and the form-filling agent.
#[derive(Debug, Clone)]
pub struct LetterConfig {
    pub latex_timeout: Duration,
    pub lawyer_email: String,
    pub form_url: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLatexTimeout,
    MissingApiKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLatexTimeout => {
                write!(f, "APP_LATEX_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::MissingApiKey => {
                write!(f, "ANTHROPIC_API_KEY must be set to serve document extraction")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
