use anyhow::Context;
use irc_core::{EngineConfig, Identity};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub server: String,
    pub identity: Identity,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_greet")]
    pub greet: bool,
    #[serde(default = "default_connect_retry")]
    pub connect_retry_secs: u64,
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logging")
}

fn default_greet() -> bool {
    true
}

fn default_connect_retry() -> u64 {
    30
}

fn default_restart_delay() -> u64 {
    60
}

impl BotConfig {
    pub fn new(server: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            identity: Identity::new(nick),
            channels: Vec::new(),
            admins: Vec::new(),
            log_dir: default_log_dir(),
            greet: default_greet(),
            connect_retry_secs: default_connect_retry(),
            restart_delay_secs: default_restart_delay(),
            engine: EngineConfig::default(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<BotConfig>(raw).context("parse config")?;
        if config.identity.nick.trim().is_empty() {
            anyhow::bail!("identity.nick must not be empty");
        }
        Ok(config)
    }
}
