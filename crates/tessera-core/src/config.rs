//! Chain parameters passed into the state-transition core.
//!
//! The core never reads files or the environment; a node loads these values
//! and hands them over as plain data.

use serde::{Deserialize, Serialize};

use crate::constants::{BLOCKCHAIN_PRECISION, CONTENT_CONSTANT, MAX_UNDO_HISTORY, PERCENT_1, PERCENT_100};
use crate::error::ValidationError;
use crate::reward::RewardCurve;
use crate::types::{Asset, Price, TimeSpan};

/// Activity reward multipliers per membership tier, in basis points.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ActivityBoosts {
    pub standard_percent: u32,
    pub mid_percent: u32,
    pub top_percent: u32,
}

impl Default for ActivityBoosts {
    fn default() -> Self {
        Self {
            standard_percent: 125 * PERCENT_1,
            mid_percent: 150 * PERCENT_1,
            top_percent: 200 * PERCENT_1,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    /// Curve constant `s` for content rewards.
    pub content_constant: u128,
    pub author_reward_curve: RewardCurve,
    /// Time between successive cashouts of one piece of content.
    pub reward_interval: TimeSpan,
    /// Cashout periods over which content rewards decay to zero.
    pub reward_interval_count: u32,
    /// Window over which the fund's recent content claims decay.
    pub content_reward_decay_rate: TimeSpan,
    /// Window over which recent activity claims decay.
    pub activity_reward_decay_rate: TimeSpan,
    /// Minimum spacing between two activity reward claims of one account.
    pub activity_claim_interval: TimeSpan,
    /// Producer votes an account needs before claiming activity rewards.
    pub min_activity_producers: u16,
    pub activity_boosts: ActivityBoosts,
    /// Coin minted with each block, in base units.
    pub block_reward: i64,
    /// Share of the block reward added to the content fund, basis points.
    pub content_reward_percent: u32,
    /// Share of the block reward added to the activity fund, basis points.
    pub activity_reward_percent: u32,
    /// Content payouts worth less than this are dust.
    pub min_payout: Asset,
    /// Median price of the core coin.
    pub coin_price: Price,
    pub owner_auth_recovery_period: TimeSpan,
    pub account_recovery_request_expiration: TimeSpan,
    /// Minimum spacing between two owner authority changes.
    pub owner_update_limit: TimeSpan,
    /// Delay before a change of recovery account takes effect.
    pub change_recovery_account_delay: TimeSpan,
    pub transfer_request_duration: TimeSpan,
    pub decline_voting_rights_duration: TimeSpan,
    /// Undo sessions retained for fork switching.
    pub max_undo_history: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            content_constant: CONTENT_CONSTANT,
            author_reward_curve: RewardCurve::ConvergentSemiQuadratic,
            reward_interval: TimeSpan::days(1),
            reward_interval_count: 7,
            content_reward_decay_rate: TimeSpan::days(30),
            activity_reward_decay_rate: TimeSpan::days(30),
            activity_claim_interval: TimeSpan::days(1),
            min_activity_producers: 10,
            activity_boosts: ActivityBoosts::default(),
            block_reward: 25 * BLOCKCHAIN_PRECISION,
            content_reward_percent: 25 * PERCENT_1,
            activity_reward_percent: 25 * PERCENT_1 / 10,
            min_payout: Asset::usd(BLOCKCHAIN_PRECISION / 100),
            coin_price: Price::new(Asset::coin(BLOCKCHAIN_PRECISION), Asset::usd(BLOCKCHAIN_PRECISION)),
            owner_auth_recovery_period: TimeSpan::days(30),
            account_recovery_request_expiration: TimeSpan::days(1),
            owner_update_limit: TimeSpan::minutes(60),
            change_recovery_account_delay: TimeSpan::days(30),
            transfer_request_duration: TimeSpan::days(7),
            decline_voting_rights_duration: TimeSpan::days(30),
            max_undo_history: MAX_UNDO_HISTORY,
        }
    }
}

impl ChainConfig {
    /// Reject parameters the reward engine cannot honour.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.block_reward < 0 {
            return Err(ValidationError::NegativeAmount(self.block_reward));
        }
        let fund_percent = u64::from(self.content_reward_percent) + u64::from(self.activity_reward_percent);
        if fund_percent > u64::from(PERCENT_100) {
            return Err(ValidationError::OutOfRange { field: "fund reward percent", value: fund_percent as i64 });
        }
        if self.reward_interval_count == 0 {
            return Err(ValidationError::OutOfRange { field: "reward_interval_count", value: 0 });
        }
        Ok(())
    }
}
