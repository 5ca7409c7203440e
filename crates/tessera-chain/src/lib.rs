//! # tessera-chain — State-transition engine.
//!
//! Owns chain state in a [`tessera_store::ObjectDatabase`] and mutates it
//! through evaluators, the reward engine and per-block maintenance loops.
//! [`Chain`] is the entry point: blocks and transactions in, state and
//! virtual operations out.

pub mod chain;
pub mod database;
pub mod error;
pub mod evaluator;
pub mod evaluators;
pub mod genesis;
pub mod maintenance;
pub mod objects;
pub mod rewards;

pub use chain::Chain;
pub use database::Database;
pub use error::ChainError;
pub use evaluator::{Evaluator, EvaluatorRegistry, OperationEvaluator};
pub use genesis::{GenesisAccount, GenesisConfig};
