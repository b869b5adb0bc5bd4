use crate::session::{
    DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_SECS, DEFAULT_SWEEP_INTERVAL, SessionSettings,
    SettingsError,
};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use tracing::warn;

/// Environment variable overriding the session lifetime, in seconds.
pub const SESSION_MAX_AGE_VAR: &str = "SESSION_MAX_AGE";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub max_age_secs: u64,
    pub cookie_name: String,
    pub secure: bool,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("session.max_age_secs", DEFAULT_MAX_AGE_SECS)?
            .set_default("session.cookie_name", DEFAULT_COOKIE_NAME)?
            .set_default("session.secure", false)?
            .set_default(
                "session.sweep_interval_secs",
                DEFAULT_SWEEP_INTERVAL.as_secs(),
            )?;

        // 2. Config file: explicit path must exist, ./config.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment variables prefixed with APP_, e.g. APP_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. SESSION_MAX_AGE, only when it holds a usable lifetime
        if let Ok(raw) = env::var(SESSION_MAX_AGE_VAR) {
            match parse_max_age(&raw) {
                Some(secs) => {
                    builder = builder.set_override("session.max_age_secs", secs)?;
                }
                None => warn!(
                    name: "config.invalid_max_age",
                    value = %raw,
                    "Ignoring invalid {SESSION_MAX_AGE_VAR}"
                ),
            }
        }

        // 5. CLI flags (PORT is mapped by clap)
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Validated registry settings for this configuration.
    pub fn session_settings(&self) -> Result<SessionSettings, SettingsError> {
        SessionSettings::try_from(&self.session)
    }
}

/// Parse a `SESSION_MAX_AGE` value. Anything that is not a lifetime the
/// registry accepts yields `None`.
fn parse_max_age(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| SessionSettings::with_max_age(*secs).is_ok())
}
