use crate::llm::{PollPolicy, RunDefaults};
use clap::{Parser, ValueEnum};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `RELAY_SERVER__PORT=8000`.
pub const ENV_PREFIX: &str = "RELAY";

/// Largest accepted `run.backoff_factor`.
pub const MAX_BACKOFF_FACTOR: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// API key for the ScanSoles shoe generation service
    #[arg(long, env = "SCANSOLES_API_KEY", hide_env_values = true)]
    pub scansoles_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub run: RunConfig,
    pub http: HttpConfig,
    pub scansoles: ScanSolesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Whole-request timeout; must outlast the longest run budget.
    pub request_timeout_secs: u64,
    pub cors_permissive: bool,
    /// Directory of static frontend assets served for unmatched paths.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

/// Server-side polling policy and run defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    pub budget_secs: u64,
    pub max_budget_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub backoff_factor: f64,
    pub default_model: String,
    pub default_temperature: f64,
}

/// Outbound HTTP client settings shared by all remote calls.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct ScanSolesConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ScanSolesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSolesConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives; `RUST_LOG` is used when unset.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 150)?
            .set_default("server.cors_permissive", true)?
            .set_default("run.budget_secs", 30)?
            .set_default("run.max_budget_secs", 120)?
            .set_default("run.poll_interval_ms", 1000)?
            .set_default("run.max_poll_interval_ms", 5000)?
            .set_default("run.backoff_factor", 1.0)?
            .set_default("run.default_model", "gpt-4")?
            .set_default("run.default_temperature", 0.7)?
            .set_default("http.connect_timeout_secs", 10)?
            .set_default("http.request_timeout_secs", 20)?
            .set_default("scansoles.base_url", crate::shoe::DEFAULT_SCANSOLES_URL)?
            .set_default("logging.format", LogFormat::Compact.as_str())?;

        // 2. Config file: an explicit path must exist, ./config.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment variables, e.g. RELAY_RUN__BUDGET_SECS=45
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags and their env aliases
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("logging.format", format.as_str())?;
        }
        if let Some(key) = cli.scansoles_api_key {
            builder = builder.set_override("scansoles.api_key", key)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject polling and timeout settings that contradict each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.run;
        if run.budget_secs == 0 {
            return Err(invalid("run.budget_secs must be positive"));
        }
        if run.poll_interval_ms == 0 {
            return Err(invalid("run.poll_interval_ms must be positive"));
        }
        if !run.backoff_factor.is_finite() || run.backoff_factor < 1.0 {
            return Err(invalid("run.backoff_factor must be at least 1.0"));
        }
        if run.backoff_factor > MAX_BACKOFF_FACTOR {
            return Err(invalid(&format!(
                "run.backoff_factor must not exceed {MAX_BACKOFF_FACTOR}"
            )));
        }
        if run.max_budget_secs < run.budget_secs {
            return Err(invalid("run.max_budget_secs must not be below run.budget_secs"));
        }
        if run.max_poll_interval_ms < run.poll_interval_ms {
            return Err(invalid(
                "run.max_poll_interval_ms must not be below run.poll_interval_ms",
            ));
        }
        if !(0.0..=2.0).contains(&run.default_temperature) {
            return Err(invalid("run.default_temperature must be between 0 and 2"));
        }
        if self.server.request_timeout_secs <= run.max_budget_secs {
            return Err(invalid(
                "server.request_timeout_secs must exceed run.max_budget_secs",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            budget: Duration::from_secs(self.run.budget_secs),
            max_budget: Duration::from_secs(self.run.max_budget_secs),
            interval: Duration::from_millis(self.run.poll_interval_ms),
            max_interval: Duration::from_millis(self.run.max_poll_interval_ms),
            backoff_factor: self.run.backoff_factor,
        }
    }

    #[must_use]
    pub fn run_defaults(&self) -> RunDefaults {
        RunDefaults {
            model: self.run.default_model.clone(),
            temperature: self.run.default_temperature,
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }

    #[must_use]
    pub fn outbound_request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Message(message.to_string())
}
