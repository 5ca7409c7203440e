use tracing::{debug, info};

use tessera_core::constants::MAX_ACCOUNT_PRODUCER_VOTES;
use tessera_core::error::EvaluationError;
use tessera_core::operations::{AccountProducerVoteOperation, ProducerUpdateOperation};
use tessera_core::types::{AccountName, AssetSymbol};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluator::OperationEvaluator;
use crate::objects::{AccountObject, ProducerObject, ProducerVoteObject};

fn votes_of(db: &Database, account: &AccountName) -> Result<Vec<ProducerVoteObject>, ChainError> {
    let key = AccountObject::key(account);
    Ok(db
        .store()
        .table::<ProducerVoteObject>()?
        .prefix(ProducerVoteObject::BY_ACCOUNT_PRODUCER, &key)?
        .cloned()
        .collect())
}

fn adjust_producer(db: &mut Database, producer: &AccountName, power: i64, votes: i32) -> Result<(), ChainError> {
    let id = db.get_producer(producer)?.id;
    db.store_mut().modify::<ProducerObject>(id, |p| {
        p.voting_power += power;
        p.vote_count = p.vote_count.saturating_add_signed(votes);
    })?;
    Ok(())
}

/// Add `delta` to the voting power of every producer `account` votes for.
pub(crate) fn adjust_producer_votes(db: &mut Database, account: &AccountName, delta: i64) -> Result<(), ChainError> {
    if delta == 0 {
        return Ok(());
    }
    for vote in votes_of(db, account)? {
        adjust_producer(db, &vote.producer, delta, 0)?;
    }
    Ok(())
}

/// Withdraw every producer vote cast by `account`.
pub(crate) fn remove_all_producer_votes(db: &mut Database, account: &AccountName) -> Result<(), ChainError> {
    let power = db.staked_balance(account, &AssetSymbol::coin())?;
    let votes = votes_of(db, account)?;
    for vote in &votes {
        adjust_producer(db, &vote.producer, -power, -1)?;
        db.store_mut().remove::<ProducerVoteObject>(vote.id)?;
    }
    db.modify_account(account, |a| a.producer_vote_count = 0)?;
    debug!(account = %account, removed = votes.len(), "producer votes cleared");
    Ok(())
}

pub struct ProducerUpdateEvaluator;

impl OperationEvaluator for ProducerUpdateEvaluator {
    type Op = ProducerUpdateOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &ProducerUpdateOperation) -> Result<(), ChainError> {
        db.get_account(&op.owner)?;
        let now = db.head_block_time()?;
        match db.find_producer(&op.owner)?.map(|p| p.id) {
            Some(id) => {
                db.store_mut().modify::<ProducerObject>(id, |p| {
                    p.details = op.details.clone();
                    p.active = op.active;
                })?;
            }
            None => {
                db.store_mut().create::<ProducerObject>(|p| {
                    p.owner = op.owner.clone();
                    p.details = op.details.clone();
                    p.active = op.active;
                    p.created = now;
                })?;
                info!(producer = %op.owner, "producer registered");
            }
        }
        Ok(())
    }
}

pub struct AccountProducerVoteEvaluator;

impl OperationEvaluator for AccountProducerVoteEvaluator {
    type Op = AccountProducerVoteOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &AccountProducerVoteOperation) -> Result<(), ChainError> {
        let account = db.get_account(&op.account)?;
        if !account.can_vote {
            return Err(EvaluationError::CannotVote(op.account.to_string()).into());
        }
        if account.proxy.is_some() {
            return Err(EvaluationError::Precondition("account votes through a proxy").into());
        }
        let vote_count = account.producer_vote_count;
        db.get_producer(&op.producer)?;

        let store = db.store();
        let existing = store
            .find_by::<ProducerVoteObject>(
                ProducerVoteObject::BY_ACCOUNT_PRODUCER,
                &ProducerVoteObject::key(&op.account, &op.producer),
            )?
            .cloned();
        let rank_holder = store
            .find_by::<ProducerVoteObject>(
                ProducerVoteObject::BY_ACCOUNT_RANK,
                &AccountObject::key(&op.account).with(op.vote_rank),
            )?
            .map(|v| v.id);
        let power = db.staked_balance(&op.account, &AssetSymbol::coin())?;

        match (existing, op.approved) {
            (Some(vote), true) => {
                if vote.vote_rank == op.vote_rank {
                    return Err(EvaluationError::Precondition("producer vote is unchanged").into());
                }
                if rank_holder.is_some() {
                    return Err(EvaluationError::AlreadyExists("producer vote rank").into());
                }
                db.store_mut().modify::<ProducerVoteObject>(vote.id, |v| v.vote_rank = op.vote_rank)?;
            }
            (None, true) => {
                if vote_count >= MAX_ACCOUNT_PRODUCER_VOTES {
                    return Err(EvaluationError::Precondition("too many producer votes").into());
                }
                if rank_holder.is_some() {
                    return Err(EvaluationError::AlreadyExists("producer vote rank").into());
                }
                db.store_mut().create::<ProducerVoteObject>(|v| {
                    v.account = op.account.clone();
                    v.producer = op.producer.clone();
                    v.vote_rank = op.vote_rank;
                })?;
                adjust_producer(db, &op.producer, power, 1)?;
                db.modify_account(&op.account, |a| a.producer_vote_count += 1)?;
            }
            (Some(vote), false) => {
                db.store_mut().remove::<ProducerVoteObject>(vote.id)?;
                adjust_producer(db, &op.producer, -power, -1)?;
                db.modify_account(&op.account, |a| a.producer_vote_count = a.producer_vote_count.saturating_sub(1))?;
            }
            (None, false) => return Err(EvaluationError::NotFound("producer vote").into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::testing::{name, Fixture};
    use tessera_core::operations::StakeAssetOperation;
    use tessera_core::types::Asset;

    fn register(f: &mut Fixture, producer: &str) {
        f.apply(ProducerUpdateOperation { owner: name(producer), details: "node".into(), active: true }).unwrap();
    }

    fn vote(account: &str, producer: &str, rank: u16, approved: bool) -> AccountProducerVoteOperation {
        AccountProducerVoteOperation { account: name(account), producer: name(producer), vote_rank: rank, approved }
    }

    fn producer(f: &Fixture, owner: &str) -> ProducerObject {
        f.db.get_producer(&name(owner)).unwrap().clone()
    }

    /// Bob stakes 500 and votes for alice.
    fn voting() -> Fixture {
        let mut f = Fixture::new();
        register(&mut f, "alice");
        register(&mut f, "carol");
        f.apply(StakeAssetOperation { from: name("bob"), to: name("bob"), amount: Asset::coin(500) }).unwrap();
        f.apply(vote("bob", "alice", 1, true)).unwrap();
        f
    }

    // ---- producer_update ----

    #[test]
    fn producer_update_creates_then_modifies() {
        let mut f = Fixture::new();
        register(&mut f, "alice");
        let created = producer(&f, "alice");
        assert!(created.active);
        assert_eq!(created.created, f.now());
        f.apply(ProducerUpdateOperation { owner: name("alice"), details: "retired".into(), active: false }).unwrap();
        let updated = producer(&f, "alice");
        assert_eq!((updated.details.as_str(), updated.active, updated.id), ("retired", false, created.id));
    }

    // ---- account_producer_vote ----

    #[test]
    fn vote_adds_staked_power() {
        let f = voting();
        let alice = producer(&f, "alice");
        assert_eq!((alice.voting_power, alice.vote_count), (500, 1));
        assert_eq!(f.db.get_account(&name("bob")).unwrap().producer_vote_count, 1);
    }

    #[test]
    fn staking_more_raises_voted_producers() {
        let mut f = voting();
        f.apply(StakeAssetOperation { from: name("alice"), to: name("bob"), amount: Asset::coin(200) }).unwrap();
        assert_eq!(producer(&f, "alice").voting_power, 700);
        assert_eq!(producer(&f, "carol").voting_power, 0);
    }

    #[test]
    fn rank_clash_rejected() {
        let mut f = voting();
        let err = f.apply(vote("bob", "carol", 1, true)).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::AlreadyExists("producer vote rank")));
        f.apply(vote("bob", "carol", 2, true)).unwrap();
        assert_eq!(producer(&f, "carol").voting_power, 500);
    }

    #[test]
    fn rerank_existing_vote() {
        let mut f = voting();
        f.apply(vote("bob", "alice", 3, true)).unwrap();
        let stored = f.db.store().table::<ProducerVoteObject>().unwrap().iter().next().cloned().unwrap();
        assert_eq!(stored.vote_rank, 3);
        assert_eq!(producer(&f, "alice").vote_count, 1);
    }

    #[test]
    fn remove_vote_restores_counts() {
        let mut f = voting();
        f.apply(vote("bob", "alice", 1, false)).unwrap();
        assert_eq!(producer(&f, "alice").voting_power, 0);
        assert_eq!(f.db.get_account(&name("bob")).unwrap().producer_vote_count, 0);
        assert_eq!(
            f.apply(vote("bob", "alice", 1, false)).unwrap_err(),
            ChainError::Evaluation(EvaluationError::NotFound("producer vote"))
        );
    }

    #[test]
    fn vote_for_unknown_producer() {
        let mut f = Fixture::new();
        let err = f.apply(vote("bob", "carol", 1, true)).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::UnknownProducer("carol".into())));
    }

    #[test]
    fn account_without_voting_rights() {
        let mut f = voting();
        f.db.modify_account(&name("bob"), |a| a.can_vote = false).unwrap();
        let err = f.apply(vote("bob", "carol", 2, true)).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::CannotVote("bob".into())));
    }

    #[test]
    fn remove_all_votes_clears_everything() {
        let mut f = voting();
        f.apply(vote("bob", "carol", 2, true)).unwrap();
        remove_all_producer_votes(&mut f.db, &name("bob")).unwrap();
        assert!(f.db.store().table::<ProducerVoteObject>().unwrap().is_empty());
        assert_eq!(producer(&f, "alice").voting_power, 0);
        assert_eq!(producer(&f, "carol").vote_count, 0);
        assert_eq!(f.db.get_account(&name("bob")).unwrap().producer_vote_count, 0);
    }
}
