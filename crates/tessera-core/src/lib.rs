//! # tessera-core — Protocol types and deterministic reward math.
//!
//! Everything in this crate is pure: no storage, no clocks, no I/O.
//! Chain time arrives through block headers and every monetary
//! computation uses integer arithmetic with 128-bit intermediates.

pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod math;
pub mod merkle;
pub mod operations;
pub mod reward;
pub mod types;

pub use config::ChainConfig;
pub use error::{BlockError, EvaluationError, MathError, ValidationError};
pub use operations::{Operation, OperationKind, VirtualOperation};
pub use types::{AccountName, Asset, AssetSymbol, Authority, Hash256, Price, TimePoint, TimeSpan};
