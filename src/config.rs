use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use serde::Deserialize;
use snafu::ResultExt as _;

use crate::auth::Authenticator;
use crate::database::{Database, DatabaseConfig};
use crate::error::{ApplicationError, ConfigLoadSnafu};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address", default = "default_host")]
    pub host: SocketAddr,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(flatten)]
    pub token: TokenConfig,
    #[serde(flatten)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    #[serde(rename = "secret_key")]
    pub secret: SecretString,
    #[serde(rename = "token_algorithm", default = "default_algorithm")]
    pub algorithm: Algorithm,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SyncConfig {
    #[serde(
        rename = "sync_idle_timeout",
        default,
        deserialize_with = "humantime_option"
    )]
    pub idle_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn authenticator(&self, database: &Database) -> Authenticator {
        Authenticator::new(
            self.token.secret.clone(),
            self.token.algorithm,
            database.clone(),
        )
    }
}

fn default_host() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_algorithm() -> Algorithm {
    Algorithm::HS256
}

fn humantime_option<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    text.filter(|text| !text.trim().is_empty())
        .map(|text| humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom))
        .transpose()
}
