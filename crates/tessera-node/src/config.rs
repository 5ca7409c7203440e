//! Node configuration.
//!
//! [`NodeConfig`] holds node settings together with the chain parameters and
//! genesis state handed to the core as plain data. [`NodeConfig::load`]
//! layers an optional TOML file under `TESSERA_`-prefixed environment
//! variables, nested keys separated by `__` (`TESSERA_CHAIN__BLOCK_REWARD`).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};

use tessera_chain::GenesisConfig;
use tessera_core::config::ChainConfig;

use crate::error::NodeError;

pub const ENV_PREFIX: &str = "TESSERA";

/// Log output format: human-readable text or one JSON object per line.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::UnknownLogFormat(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    /// Root directory for node data.
    pub data_dir: PathBuf,
    /// Log filter string (e.g. "info", "tessera_chain=debug").
    pub log_level: String,
    pub log_format: LogFormat,
    pub chain: ChainConfig,
    pub genesis: GenesisConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tessera");

        Self {
            data_dir,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            chain: ChainConfig::default(),
            genesis: GenesisConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Default location of the JSON block log replayed at startup.
    pub fn block_log_path(&self) -> PathBuf {
        self.data_dir.join("blocks.json")
    }

    /// Defaults, overridden by the TOML file at `path` (which must exist when
    /// given), overridden by the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, NodeError> {
        Self::load_with_env(path, None)
    }

    /// [`NodeConfig::load`] reading variables from `env` instead of the
    /// process environment when it is `Some`.
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, NodeError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);
        let settings = builder.add_source(environment).build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tessera_core::types::AccountName;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const NODE_TOML: &str = r#"
log_level = "debug"
log_format = "json"
data_dir = "/tmp/tessera-test"

[chain]
block_reward = 5000

[genesis]
initial_producer = "init"

[[genesis.accounts]]
name = "alice"
liquid = 100
"#;

    // ---- Defaults ----

    #[test]
    fn defaults() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert_eq!(cfg.chain, ChainConfig::default());
        assert!(cfg.data_dir.ends_with("tessera"), "data_dir should end with 'tessera': {:?}", cfg.data_dir);
    }

    #[test]
    fn block_log_lives_in_data_dir() {
        let cfg = NodeConfig { data_dir: PathBuf::from("/tmp/t"), ..NodeConfig::default() };
        assert_eq!(cfg.block_log_path(), PathBuf::from("/tmp/t/blocks.json"));
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!(matches!("xml".parse::<LogFormat>(), Err(NodeError::UnknownLogFormat(f)) if f == "xml"));
    }

    // ---- Loading ----

    #[test]
    fn empty_sources_give_defaults() {
        let cfg = NodeConfig::load_with_env(None, Some(Map::new())).unwrap();
        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_toml(NODE_TOML);
        let cfg = NodeConfig::load_with_env(Some(file.path()), Some(Map::new())).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/tessera-test"));
        assert_eq!(cfg.chain.block_reward, 5_000);
        assert_eq!(cfg.chain.reward_interval_count, ChainConfig::default().reward_interval_count);
        assert_eq!(cfg.genesis.initial_producer, AccountName::new("init").unwrap());
        assert_eq!(cfg.genesis.accounts.len(), 1);
        assert_eq!(cfg.genesis.accounts[0].liquid, 100);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_toml(NODE_TOML);
        let env = Map::from([
            ("TESSERA_LOG_LEVEL".to_string(), "warn".to_string()),
            ("TESSERA_CHAIN__BLOCK_REWARD".to_string(), "7".to_string()),
            ("OTHER_LOG_LEVEL".to_string(), "trace".to_string()),
        ]);
        let cfg = NodeConfig::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.chain.block_reward, 7);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn named_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(NodeConfig::load_with_env(Some(&missing), Some(Map::new())), Err(NodeError::Config(_))));
    }
}
