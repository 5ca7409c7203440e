use thiserror::Error;

use tessera_chain::ChainError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)] Chain(#[from] ChainError),
    #[error("configuration: {0}")] Config(#[from] config::ConfigError),
    #[error("unknown log format: {0}")] UnknownLogFormat(String),
    #[error("logging: {0}")] Logging(String),
}
