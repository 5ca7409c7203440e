use tessera_core::constants::PERCENT_100;
use tessera_core::error::{EvaluationError, MathError};
use tessera_core::operations::{ActivityRewardOperation, CommentOperation, VoteOperation};
use tessera_core::types::{AssetSymbol, TimePoint};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluator::OperationEvaluator;
use crate::objects::{CommentObject, CommentVoteObject};
use crate::rewards::claim_activity_reward;

pub struct CommentEvaluator;

impl OperationEvaluator for CommentEvaluator {
    type Op = CommentOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &CommentOperation) -> Result<(), ChainError> {
        db.get_account(&op.author)?;
        if let Some(parent_author) = &op.parent_author {
            let parent = CommentObject::key(parent_author, &op.parent_permlink);
            if db.store().find_by::<CommentObject>(CommentObject::BY_PERMLINK, &parent)?.is_none() {
                return Err(EvaluationError::NotFound("parent comment").into());
            }
        }

        let now = db.head_block_time()?;
        let key = CommentObject::key(&op.author, &op.permlink);
        let existing = db.store().find_by::<CommentObject>(CommentObject::BY_PERMLINK, &key)?.cloned();

        match existing {
            Some(comment) => {
                if comment.parent_author != op.parent_author || comment.parent_permlink != op.parent_permlink {
                    return Err(EvaluationError::Precondition("comment parent cannot change").into());
                }
                if op.max_accepted_payout.symbol != comment.max_accepted_payout.symbol
                    || op.max_accepted_payout.amount > comment.max_accepted_payout.amount
                {
                    return Err(EvaluationError::Precondition("max accepted payout cannot increase").into());
                }
                if op.allow_rewards && !comment.allow_rewards {
                    return Err(EvaluationError::Precondition("rewards cannot be re-enabled").into());
                }
                db.store_mut().modify::<CommentObject>(comment.id, |c| {
                    c.title = op.title.clone();
                    c.body = op.body.clone();
                    c.max_accepted_payout = op.max_accepted_payout.clone();
                    c.allow_rewards = op.allow_rewards;
                    c.last_update = now;
                })?;
            }
            None => {
                let next_cashout = now + db.config().reward_interval;
                db.store_mut().create::<CommentObject>(|c| {
                    c.author = op.author.clone();
                    c.permlink = op.permlink.clone();
                    c.parent_author = op.parent_author.clone();
                    c.parent_permlink = op.parent_permlink.clone();
                    c.title = op.title.clone();
                    c.body = op.body.clone();
                    c.created = now;
                    c.last_update = now;
                    c.next_cashout = next_cashout;
                    c.max_accepted_payout = op.max_accepted_payout.clone();
                    c.allow_rewards = op.allow_rewards;
                })?;
            }
        }
        Ok(())
    }
}

fn vote_direction(weight: i16) -> i32 {
    i32::from(weight.signum())
}

pub struct VoteEvaluator;

impl OperationEvaluator for VoteEvaluator {
    type Op = VoteOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &VoteOperation) -> Result<(), ChainError> {
        if !db.get_account(&op.voter)?.can_vote {
            return Err(EvaluationError::CannotVote(op.voter.to_string()).into());
        }
        let key = CommentObject::key(&op.author, &op.permlink);
        let comment = db
            .store()
            .find_by::<CommentObject>(CommentObject::BY_PERMLINK, &key)?
            .cloned()
            .ok_or(EvaluationError::NotFound("comment"))?;
        if comment.next_cashout == TimePoint::MAX {
            return Err(EvaluationError::Precondition("comment is no longer voteable").into());
        }

        let power = db.staked_balance(&op.voter, &AssetSymbol::coin())?;
        let shares = i64::try_from(i128::from(power) * i128::from(op.weight) / i128::from(PERCENT_100))
            .map_err(|_| MathError::Overflow)?;
        let now = db.head_block_time()?;
        let existing = db
            .store()
            .find_by::<CommentVoteObject>(CommentVoteObject::BY_COMMENT_VOTER, &CommentVoteObject::key(comment.id, &op.voter))?
            .cloned();

        let (reward_delta, votes_delta) = match existing {
            Some(vote) => {
                if vote.weight == op.weight {
                    return Err(EvaluationError::Precondition("vote unchanged").into());
                }
                db.store_mut().modify::<CommentVoteObject>(vote.id, |v| {
                    v.weight = op.weight;
                    v.reward_shares = shares;
                    v.last_update = now;
                })?;
                (shares - vote.reward_shares, vote_direction(op.weight) - vote_direction(vote.weight))
            }
            None => {
                if op.weight == 0 {
                    return Err(EvaluationError::Precondition("a new vote needs a weight").into());
                }
                db.store_mut().create::<CommentVoteObject>(|v| {
                    v.voter = op.voter.clone();
                    v.comment = comment.id;
                    v.weight = op.weight;
                    v.reward_shares = shares;
                    v.last_update = now;
                })?;
                (shares, vote_direction(op.weight))
            }
        };

        db.store_mut().modify::<CommentObject>(comment.id, |c| {
            c.net_reward += reward_delta;
            c.net_votes += votes_delta;
        })?;
        Ok(())
    }
}

pub struct ActivityRewardEvaluator;

impl OperationEvaluator for ActivityRewardEvaluator {
    type Op = ActivityRewardOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &ActivityRewardOperation) -> Result<(), ChainError> {
        claim_activity_reward(db, &op.account, &op.producer)
    }
}
