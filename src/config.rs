use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::environment::{Environment, EnvironmentScope, EnvironmentStore};

const ENV_PREFIX: &str = "NODEPANEL_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_json: bool,
    pub request_timeout_secs: u64,
    pub watch_interval_secs: u64,
    pub environments: Vec<EnvironmentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_json: false,
            request_timeout_secs: 10,
            watch_interval_secs: 15,
            environments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub scope: EnvironmentScope,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("nodepanel").join("config.yaml"))
    }
}

/// Load defaults, then the YAML file, then `NODEPANEL_*` environment variables.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file {} does not exist", p.display());
            }
            p.to_path_buf()
        }
        None => Config::path()?,
    };

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("loading configuration from {}", path.display()))
}

/// Environment store backed by the `environments` config section.
pub struct ConfigEnvironmentStore {
    environments: Vec<EnvironmentConfig>,
}

impl ConfigEnvironmentStore {
    pub fn new(environments: Vec<EnvironmentConfig>) -> Self {
        Self { environments }
    }
}

#[async_trait]
impl EnvironmentStore for ConfigEnvironmentStore {
    async fn get_environments(&self, scope: EnvironmentScope) -> Result<Vec<Environment>> {
        Ok(self
            .environments
            .iter()
            .filter(|env| env.scope == scope)
            .map(|env| Environment {
                id: env.id.clone(),
                url: env.url.clone(),
                username: env.username.clone(),
                token: env.token.clone(),
            })
            .collect())
    }
}
