//! Handles settings for the application. Configuration is read from
//! `householder.toml` (or the file passed with `--config`) and can be
//! overridden with `HOUSEHOLDER__*` environment variables, e.g.
//! `HOUSEHOLDER__APP__LEVEL=debug` or `HOUSEHOLDER__DATABASE=memory`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "householder.db"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_FILE: &str = "householder";
const DEFAULT_SQLITE_PATH: &str = "householder.db";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite(DEFAULT_SQLITE_PATH.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    #[serde(default)]
    pub database: Database,
}

impl Settings {
    /// Loads settings from `path`, or from the optional default file when no
    /// path is given.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load(
            path.unwrap_or(DEFAULT_FILE),
            path.is_some(),
            Environment::with_prefix("HOUSEHOLDER").separator("__"),
        )
    }

    fn load(file: &str, required: bool, env: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(file).required(required))
            .add_source(env)
            .build()?;

        settings.try_deserialize()
    }
}
