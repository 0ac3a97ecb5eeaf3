use std::path::Path;

use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

/// Environment prefix; nested keys use `__`, e.g. `FEVAL_BACKTEST__SLIPPAGE`.
pub const ENV_PREFIX: &str = "FEVAL_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from `config/Config.toml`, environment variables and
    /// `config/Config.json`, on top of the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged values are invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads configuration from a specific TOML file.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged values are invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let figment = Self::base()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Config.json"));

        Self::extract(&figment)
    }

    /// Loads configuration with a profile overlay (`config/Config.<profile>.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged values are invalid.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let figment = Self::base()
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Config.json"));

        Self::extract(&figment)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    fn extract(figment: &Figment) -> Result<AppConfig> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }
}
