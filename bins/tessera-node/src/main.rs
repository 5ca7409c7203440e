//! Tessera node binary.
//!
//! Loads configuration, builds the genesis state, replays a JSON block log
//! through the node and prints the resulting head as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use tessera_core::block::SignedBlock;
use tessera_node_lib::{init_logging, DatabaseApi, LogFormat, Node, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "tessera-node", version, about = "Tessera state-transition node")]
struct Args {
    /// TOML configuration file. `TESSERA_*` environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory (overrides the configuration)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// JSON array of blocks to replay. Defaults to `blocks.json` in the data directory.
    #[arg(long)]
    blocks: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(NodeConfig, Option<PathBuf>)> {
        let mut config = NodeConfig::load(self.config.as_deref()).context("loading configuration")?;
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok((config, self.blocks))
    }
}

fn read_blocks(path: &Path) -> Result<Vec<SignedBlock>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading block log {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing block log {}", path.display()))
}

fn main() -> Result<()> {
    let (config, blocks) = Args::parse().into_config()?;
    init_logging(&config.log_level, config.log_format)?;

    info!("Tessera node v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);

    let node = Arc::new(Node::from_config(&config).context("building genesis state")?);
    let api = DatabaseApi::new(Arc::clone(&node));
    node.set_block_applied_callback(|applied| {
        info!(block_num = applied.block_num, transactions = applied.transaction_count, "block applied");
        Ok(())
    });

    let log = match blocks {
        Some(path) => Some(path),
        None => Some(config.block_log_path()).filter(|p| p.exists()),
    };
    match log {
        Some(path) => {
            let blocks = read_blocks(&path)?;
            info!(count = blocks.len(), path = %path.display(), "replaying block log");
            for block in &blocks {
                node.push_block(block)
                    .with_context(|| format!("applying block {}", block.block_num()))?;
            }
        }
        None => warn!("no block log found; staying at genesis"),
    }

    let head = api.get_head_info()?;
    println!("{}", serde_json::to_string_pretty(&head)?);
    Ok(())
}
