//! Reward engine: block reward issuance, content cashouts and activity
//! reward claims.
//!
//! Both funds keep a linearly decaying sum of recent claims. A claimant is
//! paid `fund * weight / recent_claims` with the claim already counted, so
//! early claimants in a quiet period never drain the pool.

use tracing::debug;

use tessera_core::config::ChainConfig;
use tessera_core::constants::MIN_ACTIVITY_REWARD_STAKE;
use tessera_core::error::{EvaluationError, MathError};
use tessera_core::math::{apply_percent, decay_linear};
use tessera_core::operations::VirtualOperation;
use tessera_core::reward::{
    activity_reward_shares, evaluate_reward_curve, get_comment_reward, pro_rata, CommentRewardContext, DecayWindow,
};
use tessera_core::types::{AccountName, Asset, AssetSymbol, TimePoint};
use tessera_store::ObjectId;

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluators::adjust_producer_votes;
use crate::objects::{CommentObject, ProducerObject};

/// Issue the block reward for `producer`: the content and activity shares go
/// into their funds and the remainder is staked to the producer.
pub fn process_funds(db: &mut Database, producer: &AccountName) -> Result<(), ChainError> {
    let config = db.config();
    let reward = config.block_reward;
    if reward <= 0 {
        return Ok(());
    }
    let share = |percent| -> Result<i64, ChainError> {
        let amount = apply_percent(reward as u128, percent)?;
        Ok(i64::try_from(amount).map_err(|_| MathError::Overflow)?)
    };
    let content = share(config.content_reward_percent)?;
    let activity = share(config.activity_reward_percent)?;
    let funds = content.checked_add(activity).ok_or(MathError::Overflow)?;
    let producer_share = reward.checked_sub(funds).filter(|s| *s >= 0).ok_or_else(|| {
        ChainError::Internal(format!("fund shares {funds} exceed block reward {reward}"))
    })?;

    let fund = db.reward_fund()?;
    let content_balance = fund.content_reward_balance.amount.checked_add(content).ok_or(MathError::Overflow)?;
    let activity_balance = fund.activity_reward_balance.amount.checked_add(activity).ok_or(MathError::Overflow)?;
    let supply = db.dynamic_global_properties()?.current_supply.amount.checked_add(reward).ok_or(MathError::Overflow)?;
    db.modify_reward_fund(|fund| {
        fund.content_reward_balance.amount = content_balance;
        fund.activity_reward_balance.amount = activity_balance;
    })?;
    db.adjust_supply(&AssetSymbol::coin(), reward, funds)?;
    db.modify_dynamic_global_properties(|g| g.current_supply.amount = supply)?;

    let producer_id = db.get_producer(producer)?.id;
    db.store_mut().modify::<ProducerObject>(producer_id, |p| p.total_blocks += 1)?;
    if producer_share > 0 {
        db.adjust_staked_balance(producer, &Asset::coin(producer_share))?;
        adjust_producer_votes(db, producer, producer_share)?;
        db.push_virtual_op(VirtualOperation::ProducerReward {
            producer: producer.clone(),
            reward: Asset::coin(producer_share),
        });
    }
    Ok(())
}

/// Pay out every comment whose cashout time has arrived.
///
/// Weights of all due comments are added to the fund's recent claims before
/// any of them is priced, so the payouts of one block do not depend on the
/// order comments are visited in.
pub fn process_comment_cashout(db: &mut Database) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    let config = db.config().clone();
    let fund = db.reward_fund()?.clone();
    let mut recent_claims = decay_linear(
        fund.recent_content_claims,
        now.saturating_since(fund.last_content_update),
        config.content_reward_decay_rate,
    )?;

    let due: Vec<CommentObject> = db
        .store()
        .table::<CommentObject>()?
        .iter_by(CommentObject::BY_CASHOUT_TIME)?
        .take_while(|c| c.next_cashout <= now)
        .cloned()
        .collect();

    let mut weights = Vec::with_capacity(due.len());
    for comment in &due {
        let weight = if comment.allow_rewards && comment.net_reward > 0 {
            evaluate_reward_curve(
                comment.net_reward as u64,
                fund.author_reward_curve,
                DecayWindow::new(comment.cashouts_received, config.reward_interval_count),
                fund.content_constant,
            )?
        } else {
            0
        };
        recent_claims = recent_claims.checked_add(weight).ok_or(MathError::Overflow)?;
        weights.push(weight);
    }

    let mut paid = 0i64;
    for (comment, weight) in due.iter().zip(weights) {
        let reward = get_comment_reward(&CommentRewardContext {
            reward_shares: comment.net_reward,
            claim_weight: weight,
            total_claims: recent_claims,
            reward_fund: fund.content_reward_balance.clone(),
            max_accepted_payout: comment.max_accepted_payout.clone(),
            coin_price: config.coin_price.clone(),
            min_payout: config.min_payout.clone(),
        })?;
        if reward.amount > 0 {
            db.adjust_reward_balance(&comment.author, &reward)?;
            paid += reward.amount;
            db.push_virtual_op(VirtualOperation::AuthorReward {
                author: comment.author.clone(),
                permlink: comment.permlink.clone(),
                reward: reward.clone(),
            });
        }
        advance_cashout(db, comment.id, reward.amount, now, &config)?;
    }

    db.modify_reward_fund(|f| {
        f.content_reward_balance.amount -= paid;
        f.recent_content_claims = recent_claims;
        f.last_content_update = now;
    })?;
    if paid > 0 {
        db.adjust_supply(&AssetSymbol::coin(), 0, -paid)?;
    }
    if !due.is_empty() {
        debug!(comments = due.len(), paid, "content cashout");
    }
    Ok(())
}

fn advance_cashout(
    db: &mut Database,
    id: ObjectId,
    payout: i64,
    now: TimePoint,
    config: &ChainConfig,
) -> Result<(), ChainError> {
    db.store_mut().modify::<CommentObject>(id, |c| {
        c.total_payout += payout;
        c.cashouts_received += 1;
        c.next_cashout = if c.cashouts_received >= config.reward_interval_count {
            TimePoint::MAX
        } else {
            now + config.reward_interval
        };
    })?;
    Ok(())
}

/// Pay `account` its activity reward, crediting `producer`.
///
/// # Errors
///
/// - [`EvaluationError::UnknownProducer`] if `producer` is not a producer.
/// - [`EvaluationError::NotEnoughProducerVotes`] below the configured minimum.
/// - [`EvaluationError::InsufficientStake`] with less than one staked EQUITY.
/// - [`EvaluationError::TooSoon`] within the claim interval of the last claim.
pub fn claim_activity_reward(db: &mut Database, account: &AccountName, producer: &AccountName) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    let config = db.config().clone();
    let voter = db.get_account(account)?.clone();
    let producer_id = db.get_producer(producer)?.id;

    if voter.producer_vote_count < config.min_activity_producers {
        return Err(EvaluationError::NotEnoughProducerVotes {
            have: voter.producer_vote_count,
            need: config.min_activity_producers,
        }
        .into());
    }
    let staked_equity = db.staked_balance(account, &AssetSymbol::equity())?;
    if staked_equity < MIN_ACTIVITY_REWARD_STAKE {
        return Err(EvaluationError::InsufficientStake { have: staked_equity, need: MIN_ACTIVITY_REWARD_STAKE }.into());
    }
    let next_allowed = voter.last_activity_reward + config.activity_claim_interval;
    if now < next_allowed {
        return Err(EvaluationError::TooSoon { next_allowed: next_allowed.to_string() }.into());
    }

    let shares = activity_reward_shares(staked_equity, voter.membership, &config.activity_boosts)?;

    let fund = db.reward_fund()?.clone();
    let recent_claims = decay_linear(
        fund.recent_activity_claims,
        now.saturating_since(fund.last_activity_update),
        config.activity_reward_decay_rate,
    )?
    .checked_add(shares)
    .ok_or(MathError::Overflow)?;
    let payout = pro_rata(fund.activity_reward_balance.amount, shares, recent_claims)?;

    db.modify_reward_fund(|f| {
        f.activity_reward_balance.amount -= payout;
        f.recent_activity_claims = recent_claims;
        f.last_activity_update = now;
    })?;
    if payout > 0 {
        db.adjust_supply(&AssetSymbol::coin(), 0, -payout)?;
        db.adjust_reward_balance(account, &Asset::coin(payout))?;
    }

    let stake = db.staked_balance(account, &AssetSymbol::coin())?;
    db.modify_account(account, |a| a.last_activity_reward = now)?;
    db.store_mut().modify::<ProducerObject>(producer_id, |p| p.accumulated_activity_stake += stake)?;
    db.push_virtual_op(VirtualOperation::ActivityRewardPaid {
        account: account.clone(),
        producer: producer.clone(),
        reward: Asset::coin(payout),
    });
    debug!(account = %account, producer = %producer, payout, "activity reward claimed");
    Ok(())
}
