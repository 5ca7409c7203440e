//! Error types for the Tessera protocol.
//!
//! [`ValidationError`] is raised by stateless `validate()` before any state is
//! touched. [`EvaluationError`] is a semantic precondition failure against
//! current state; the enclosing undo session is rolled back. [`MathError`]
//! in a consensus path means stored state is inconsistent and is fatal.
use thiserror::Error;

use crate::types::AuthorityLevel;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid account name: {0:?}")] InvalidAccountName(String),
    #[error("invalid asset symbol: {0:?}")] InvalidSymbol(String),
    #[error("amount must be positive: {0}")] NonPositiveAmount(i64),
    #[error("amount must not be negative: {0}")] NegativeAmount(i64),
    #[error("unexpected symbol: expected {expected}, got {got}")] UnexpectedSymbol { expected: String, got: String },
    #[error("cannot {0} to self")] SelfReference(&'static str),
    #[error("required field is empty: {0}")] EmptyField(&'static str),
    #[error("{field} too long: {len} > {max}")] TooLong { field: &'static str, len: usize, max: usize },
    #[error("{field} out of range: {value}")] OutOfRange { field: &'static str, value: i64 },
    #[error("conflicting flags: {0}")] ConflictingFlags(&'static str),
    #[error("authority is impossible to satisfy")] ImpossibleAuthority,
    #[error("transaction has no operations")] EmptyTransaction,
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("unknown account: {0}")] UnknownAccount(String),
    #[error("account already exists: {0}")] AccountExists(String),
    #[error("insufficient funds for {account}: have {have}, need {need}")] InsufficientFunds { account: String, have: i64, need: i64 },
    #[error("missing {level} authority of {account}")] MissingAuthority { account: String, level: AuthorityLevel },
    #[error("{0} already exists")] AlreadyExists(&'static str),
    #[error("{0} not found")] NotFound(&'static str),
    #[error("wrong recovery account: expected {expected}, got {got}")] WrongRecoveryAccount { expected: String, got: String },
    #[error("recent owner authority not found in history")] RecentOwnerNotFound,
    #[error("new owner authority does not match the recovery request")] AuthorityMismatch,
    #[error("owner authority updated too recently")] OwnerUpdateTooSoon,
    #[error("account cannot vote: {0}")] CannotVote(String),
    #[error("too soon: next allowed at {next_allowed}")] TooSoon { next_allowed: String },
    #[error("time must be in the future: {0}")] NotInFuture(String),
    #[error("transaction expired at {0}")] TransactionExpired(String),
    #[error("transaction expiration too far in the future: {0}")] ExpirationTooFar(String),
    #[error("duplicate transaction: {0}")] DuplicateTransaction(String),
    #[error("not enough producer votes: have {have}, need {need}")] NotEnoughProducerVotes { have: u16, need: u16 },
    #[error("not enough staked equity: have {have}, need {need}")] InsufficientStake { have: i64, need: i64 },
    #[error("unknown producer: {0}")] UnknownProducer(String),
    #[error("precondition failed: {0}")] Precondition(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] Overflow,
    #[error("division by zero")] DivisionByZero,
    #[error("symbol mismatch: {left} vs {right}")] SymbolMismatch { left: String, right: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("block does not link to head: expected previous {expected}, got {got}")] UnlinkableBlock { expected: String, got: String },
    #[error("timestamp {got} is not after head time {head}")] TimestampNotAfterHead { got: String, head: String },
    #[error("block produced in the same slot as head")] SameSlot,
    #[error("invalid merkle root")] InvalidMerkleRoot,
    #[error("unknown producer: {0}")] UnknownProducer(String),
    #[error("no block to pop")] NothingToPop,
}
