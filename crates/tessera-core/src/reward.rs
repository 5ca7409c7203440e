//! Reward curves and pro-rata payout math.
//!
//! Reward shares accumulated by content are mapped through a curve into a
//! claim weight; a fund pays each claimant `fund * weight / total_weight`.
//! Every division floors, so rounding always favours the fund.

use serde::{Deserialize, Serialize};

use crate::config::ActivityBoosts;
use crate::constants::{ACTIVITY_STAKE_DOUBLING_THRESHOLD, BLOCKCHAIN_PRECISION};
use crate::error::MathError;
use crate::math::{apply_percent, approx_sqrt, mul_div};
use crate::types::{Asset, MembershipTier, Price};

/// Shape applied to reward shares before pro-rating.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardCurve {
    /// `(r + s)^2 - s^2`
    Quadratic,
    /// `r^2 / (2s + r)`
    QuadraticCuration,
    /// `r`
    Linear,
    /// `approx_sqrt(r)`
    SquareRoot,
    /// `((r + s)^1.5 - s^1.5) / (r + 4s)`, scaled by the unexpired share
    /// of the decay window.
    #[default]
    ConvergentSemiQuadratic,
}

/// Position of a claimant within its decay window.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DecayWindow {
    /// Payout periods already received.
    pub claims_received: u32,
    /// Total periods over which the weight decays to zero.
    pub periods: u32,
}

impl DecayWindow {
    pub fn new(claims_received: u32, periods: u32) -> Self {
        Self { claims_received, periods }
    }

    /// Periods still remaining, `max(0, periods - claims_received)`.
    pub fn remaining(&self) -> u32 {
        self.periods.saturating_sub(self.claims_received)
    }
}

/// `x^1.5`, using the approximate square root.
fn pow_three_halves(x: u128) -> Result<u128, MathError> {
    x.checked_mul(u128::from(approx_sqrt(x))).ok_or(MathError::Overflow)
}

/// Map reward shares through `curve` into a claim weight.
///
/// `content_constant` is the curve constant `s`. The decay window only
/// affects [`RewardCurve::ConvergentSemiQuadratic`], which returns zero once
/// every period has been claimed.
///
/// # Errors
///
/// [`MathError::Overflow`] if an intermediate exceeds 128 bits.
pub fn evaluate_reward_curve(
    reward_shares: u64,
    curve: RewardCurve,
    decay_window: DecayWindow,
    content_constant: u128,
) -> Result<u128, MathError> {
    let r = u128::from(reward_shares);
    let s = content_constant;
    if r == 0 {
        return Ok(0);
    }

    match curve {
        RewardCurve::Quadratic => {
            let rs = r.checked_add(s).ok_or(MathError::Overflow)?;
            let rs_2 = rs.checked_mul(rs).ok_or(MathError::Overflow)?;
            let s_2 = s.checked_mul(s).ok_or(MathError::Overflow)?;
            Ok(rs_2 - s_2)
        }
        RewardCurve::QuadraticCuration => {
            // r < 2^64, so r^2 is exact in 128 bits.
            let r_2 = r * r;
            let divisor = s
                .checked_mul(2)
                .and_then(|two_s| two_s.checked_add(r))
                .ok_or(MathError::Overflow)?;
            Ok(r_2 / divisor)
        }
        RewardCurve::Linear => Ok(r),
        RewardCurve::SquareRoot => Ok(u128::from(approx_sqrt(r))),
        RewardCurve::ConvergentSemiQuadratic => {
            let remaining = decay_window.remaining();
            if remaining == 0 {
                return Ok(0);
            }
            let rs = r.checked_add(s).ok_or(MathError::Overflow)?;
            let numerator = pow_three_halves(rs)?
                .checked_sub(pow_three_halves(s)?)
                .ok_or(MathError::Overflow)?;
            let divisor = s
                .checked_mul(4)
                .and_then(|four_s| four_s.checked_add(r))
                .ok_or(MathError::Overflow)?;
            let weight = numerator / divisor;
            mul_div(weight, u128::from(remaining), u128::from(decay_window.periods))
        }
    }
}

/// Inputs for pricing a single content payout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentRewardContext {
    /// Net reward shares of the content.
    pub reward_shares: i64,
    /// Curve weight of the content's claim.
    pub claim_weight: u128,
    /// Sum of curve weights across the fund's recent claims.
    pub total_claims: u128,
    /// Fund balance in the core coin.
    pub reward_fund: Asset,
    /// Author's payout cap, usually in USD.
    pub max_accepted_payout: Asset,
    /// Price of the core coin.
    pub coin_price: Price,
    /// Payouts worth less than this are dust.
    pub min_payout: Asset,
}

/// True when `payout` is worth less than `min_payout` at `price`.
///
/// An unconvertible pair (null price, foreign symbol) is treated as an
/// error rather than as dust.
pub fn is_comment_payout_dust(price: &Price, payout: &Asset, min_payout: &Asset) -> Result<bool, MathError> {
    let value = if payout.symbol == min_payout.symbol {
        payout.clone()
    } else {
        price.convert(payout)?
    };
    Ok(value.amount < min_payout.amount)
}

/// Coin payout for one content claim: pro-rata share of the fund, forced to
/// zero when dust, and capped at the author's maximum accepted payout.
///
/// Returns zero when there are no shares, no claims, or no fund.
///
/// # Errors
///
/// - [`MathError::Overflow`] if the claim weight exceeds the total claims.
/// - Conversion errors from the price.
pub fn get_comment_reward(ctx: &CommentRewardContext) -> Result<Asset, MathError> {
    let zero = ctx.reward_fund.zero_of();
    if ctx.reward_shares <= 0 || ctx.total_claims == 0 || ctx.reward_fund.amount <= 0 {
        return Ok(zero);
    }

    let fund = ctx.reward_fund.amount as u128;
    let payout = mul_div(fund, ctx.claim_weight, ctx.total_claims)?;
    if payout > fund {
        return Err(MathError::Overflow);
    }
    // payout <= fund <= i64::MAX
    let mut payout = Asset::new(payout as i64, ctx.reward_fund.symbol.clone());

    if is_comment_payout_dust(&ctx.coin_price, &payout, &ctx.min_payout)? {
        return Ok(zero);
    }

    let cap = if ctx.max_accepted_payout.symbol == payout.symbol {
        ctx.max_accepted_payout.clone()
    } else {
        ctx.coin_price.convert(&ctx.max_accepted_payout)?
    };
    payout.amount = payout.amount.min(cap.amount.max(0));
    Ok(payout)
}

/// Activity shares for one claim: one whole unit, doubled with enough staked
/// equity, then boosted by membership tier.
pub fn activity_reward_shares(
    staked_equity: i64,
    membership: MembershipTier,
    boosts: &ActivityBoosts,
) -> Result<u128, MathError> {
    let mut shares = BLOCKCHAIN_PRECISION as u128;
    if staked_equity >= ACTIVITY_STAKE_DOUBLING_THRESHOLD * BLOCKCHAIN_PRECISION {
        shares *= 2;
    }
    match membership {
        MembershipTier::None => Ok(shares),
        MembershipTier::Standard => apply_percent(shares, boosts.standard_percent),
        MembershipTier::Mid => apply_percent(shares, boosts.mid_percent),
        MembershipTier::Top => apply_percent(shares, boosts.top_percent),
    }
}

/// `fund * shares / recent_claims`, floored. Zero claims pay nothing.
pub fn pro_rata(fund: i64, shares: u128, recent_claims: u128) -> Result<i64, MathError> {
    if fund <= 0 || recent_claims == 0 {
        return Ok(0);
    }
    let payout = mul_div(fund as u128, shares, recent_claims)?;
    i64::try_from(payout).map_err(|_| MathError::Overflow)
}
