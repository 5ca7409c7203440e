//! Protocol constants.
//!
//! Values that operators may tune live in [`crate::config::ChainConfig`];
//! the ones here are fixed by the protocol and used by stateless validation.
use crate::types::TimeSpan;

/// Base units per whole asset (8 decimal places).
pub const BLOCKCHAIN_PRECISION: i64 = 100_000_000;
pub const BLOCKCHAIN_PRECISION_DIGITS: usize = 8;

/// Percentages are expressed in basis points of this value.
pub const PERCENT_100: u32 = 10_000;
pub const PERCENT_1: u32 = PERCENT_100 / 100;

/// 0.7884 seconds per block, exactly 40 million blocks per year.
pub const BLOCK_INTERVAL: TimeSpan = TimeSpan::from_micros(788_400);

pub const SYMBOL_COIN: &str = "COIN";
pub const SYMBOL_EQUITY: &str = "EQUITY";
pub const SYMBOL_USD: &str = "USD";

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;

pub const MAX_MEMO_SIZE: usize = 2048;
pub const MAX_PERMLINK_LENGTH: usize = 2048;
pub const MAX_TITLE_LENGTH: usize = 256;
pub const MAX_REQUEST_ID_LENGTH: usize = 64;

/// Transactions may not expire further than this past the head block.
pub const MAX_TIME_UNTIL_EXPIRATION: TimeSpan = TimeSpan::hours(1);

/// Shortest interval accepted for a recurring transfer.
pub const MIN_RECURRING_TRANSFER_INTERVAL: TimeSpan = TimeSpan::days(1);
pub const MAX_RECURRING_TRANSFER_PAYMENTS: u32 = 1000;

/// Number of ranked producer votes an account may hold.
pub const MAX_ACCOUNT_PRODUCER_VOTES: u16 = 50;

/// Curve constant `s` for content reward curves.
pub const CONTENT_CONSTANT: u128 = 2_000_000_000_000;

/// Width of the participation bitmask in the global properties.
pub const PARTICIPATION_WINDOW: u8 = 128;

/// Upper bound on retained undo history (blocks).
pub const MAX_UNDO_HISTORY: usize = 10_000;

/// Staked equity, in base units, needed before any activity reward is paid.
pub const MIN_ACTIVITY_REWARD_STAKE: i64 = BLOCKCHAIN_PRECISION;

/// Staked equity, in whole units, that doubles the activity reward share.
pub const ACTIVITY_STAKE_DOUBLING_THRESHOLD: i64 = 10;
