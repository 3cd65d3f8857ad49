use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Public address of this service. Used to patch "try it now" links and as the base
    /// that relative references resolve against.
    #[serde(default)]
    pub public_url: Option<Url>,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub loader: LoaderConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RepositoryConfig {
    /// Local checkout directory or an http(s) raw-content prefix.
    pub root: String,
    /// Directory inside each branch holding the spec files.
    #[serde(default)]
    pub dir: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoaderConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_reference_depth")]
    pub max_reference_depth: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_reference_depth() -> usize {
    32
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_reference_depth: default_max_reference_depth(),
        }
    }
}

impl Config {
    pub fn parse_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Credentials {
    /// A blank username disables authentication. The password may be empty.
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty()
    }
}
