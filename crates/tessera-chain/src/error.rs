//! The umbrella error for chain state transitions.
use thiserror::Error;

use tessera_core::error::{BlockError, EvaluationError, MathError, ValidationError};
use tessera_store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] Evaluation(#[from] EvaluationError),
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Block(#[from] BlockError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error("operation {op_index} failed: {source}")] Operation { op_index: usize, source: Box<ChainError> },
    #[error("transaction {index} failed: {source}")] Transaction { index: usize, source: Box<ChainError> },
    #[error("internal: {0}")] Internal(String),
}

impl ChainError {
    /// Store, math and internal errors mean state is inconsistent. They abort
    /// block application instead of merely rejecting a transaction.
    pub fn is_fatal(&self) -> bool {
        match self {
            ChainError::Math(_) | ChainError::Store(_) | ChainError::Internal(_) => true,
            ChainError::Operation { source, .. } | ChainError::Transaction { source, .. } => source.is_fatal(),
            ChainError::Validation(_) | ChainError::Evaluation(_) | ChainError::Block(_) => false,
        }
    }

    /// The innermost error, with operation and transaction wrappers removed.
    pub fn root(&self) -> &ChainError {
        match self {
            ChainError::Operation { source, .. } | ChainError::Transaction { source, .. } => source.root(),
            other => other,
        }
    }
}
