use tracing::debug;

use tessera_core::error::EvaluationError;
use tessera_core::operations::{
    ClaimRewardBalanceOperation, StakeAssetOperation, TransferAcceptOperation, TransferOperation,
    TransferRecurringOperation, TransferRequestOperation,
};
use tessera_core::types::{Asset, AssetSymbol};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluator::OperationEvaluator;
use crate::evaluators::adjust_producer_votes;
use crate::objects::{RecurringTransferObject, TransferRequestObject};

pub struct TransferEvaluator;

impl OperationEvaluator for TransferEvaluator {
    type Op = TransferOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &TransferOperation) -> Result<(), ChainError> {
        db.get_account(&op.from)?;
        db.get_account(&op.to)?;
        db.transfer_liquid(&op.from, &op.to, &op.amount)
    }
}

pub struct TransferRequestEvaluator;

impl OperationEvaluator for TransferRequestEvaluator {
    type Op = TransferRequestOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &TransferRequestOperation) -> Result<(), ChainError> {
        db.get_account(&op.to)?;
        db.get_account(&op.from)?;
        let key = TransferRequestObject::key(&op.to, &op.request_id);
        let existing = db
            .store()
            .find_by::<TransferRequestObject>(TransferRequestObject::BY_REQUEST_ID, &key)?
            .map(|r| r.id);

        if op.requested {
            if existing.is_some() {
                return Err(EvaluationError::AlreadyExists("transfer request").into());
            }
            let expiration = db.head_block_time()? + db.config().transfer_request_duration;
            db.store_mut().create::<TransferRequestObject>(|r| {
                r.to = op.to.clone();
                r.from = op.from.clone();
                r.amount = op.amount.clone();
                r.memo = op.memo.clone();
                r.request_id = op.request_id.clone();
                r.expiration = expiration;
            })?;
        } else {
            let id = existing.ok_or(EvaluationError::NotFound("transfer request"))?;
            db.store_mut().remove::<TransferRequestObject>(id)?;
        }
        Ok(())
    }
}

pub struct TransferAcceptEvaluator;

impl OperationEvaluator for TransferAcceptEvaluator {
    type Op = TransferAcceptOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &TransferAcceptOperation) -> Result<(), ChainError> {
        let key = TransferRequestObject::key(&op.to, &op.request_id);
        let request = db
            .store()
            .find_by::<TransferRequestObject>(TransferRequestObject::BY_REQUEST_ID, &key)?
            .cloned()
            .ok_or(EvaluationError::NotFound("transfer request"))?;
        if request.from != op.from {
            return Err(EvaluationError::Precondition("transfer request is addressed to another account").into());
        }
        if op.accepted {
            db.transfer_liquid(&request.from, &request.to, &request.amount)?;
        }
        db.store_mut().remove::<TransferRequestObject>(request.id)?;
        Ok(())
    }
}

pub struct TransferRecurringEvaluator;

impl OperationEvaluator for TransferRecurringEvaluator {
    type Op = TransferRecurringOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &TransferRecurringOperation) -> Result<(), ChainError> {
        db.get_account(&op.from)?;
        db.get_account(&op.to)?;
        let key = RecurringTransferObject::key(&op.from, &op.transfer_id);
        let existing = db
            .store()
            .find_by::<RecurringTransferObject>(RecurringTransferObject::BY_TRANSFER_ID, &key)?
            .map(|t| t.id);

        if !op.active {
            let id = existing.ok_or(EvaluationError::NotFound("recurring transfer"))?;
            db.store_mut().remove::<RecurringTransferObject>(id)?;
            debug!(from = %op.from, transfer_id = %op.transfer_id, "recurring transfer cancelled");
            return Ok(());
        }

        let now = db.head_block_time()?;
        if op.begin < now {
            return Err(EvaluationError::NotInFuture(op.begin.to_string()).into());
        }
        let have = db.liquid_balance(&op.from, &op.amount.symbol)?;
        if have < op.amount.amount {
            return Err(EvaluationError::InsufficientFunds {
                account: op.from.to_string(),
                have,
                need: op.amount.amount,
            }
            .into());
        }

        let end = op.begin + op.interval * i64::from(op.payments.saturating_sub(1));
        let fill = |t: &mut RecurringTransferObject| {
            t.from = op.from.clone();
            t.to = op.to.clone();
            t.amount = op.amount.clone();
            t.transfer_id = op.transfer_id.clone();
            t.memo = op.memo.clone();
            t.begin = op.begin;
            t.end = end;
            t.interval = op.interval;
            t.next_transfer = op.begin;
            t.payments_remaining = op.payments;
            t.extensible = op.extensible;
            t.fill_or_kill = op.fill_or_kill;
        };
        match existing {
            Some(id) => {
                db.store_mut().modify::<RecurringTransferObject>(id, fill)?;
            }
            None => {
                db.store_mut().create::<RecurringTransferObject>(fill)?;
            }
        }
        Ok(())
    }
}

pub struct StakeAssetEvaluator;

impl OperationEvaluator for StakeAssetEvaluator {
    type Op = StakeAssetOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &StakeAssetOperation) -> Result<(), ChainError> {
        db.get_account(&op.from)?;
        db.get_account(&op.to)?;
        db.adjust_liquid_balance(&op.from, &Asset::new(-op.amount.amount, op.amount.symbol.clone()))?;
        db.adjust_staked_balance(&op.to, &op.amount)?;
        if op.amount.symbol == AssetSymbol::coin() {
            adjust_producer_votes(db, &op.to, op.amount.amount)?;
        }
        Ok(())
    }
}

pub struct ClaimRewardBalanceEvaluator;

impl OperationEvaluator for ClaimRewardBalanceEvaluator {
    type Op = ClaimRewardBalanceOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &ClaimRewardBalanceOperation) -> Result<(), ChainError> {
        db.get_account(&op.account)?;
        let have = db.find_balance(&op.account, &op.reward.symbol)?.map_or(0, |b| b.reward);
        if have < op.reward.amount {
            return Err(EvaluationError::InsufficientFunds {
                account: op.account.to_string(),
                have,
                need: op.reward.amount,
            }
            .into());
        }
        db.adjust_reward_balance(&op.account, &Asset::new(-op.reward.amount, op.reward.symbol.clone()))?;
        db.adjust_liquid_balance(&op.account, &op.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::testing::{name, Fixture};
    use tessera_core::types::{TimePoint, TimeSpan};

    fn transfer(from: &str, to: &str, amount: i64) -> TransferOperation {
        TransferOperation { from: name(from), to: name(to), amount: Asset::coin(amount), memo: String::new() }
    }

    fn request(requested: bool) -> TransferRequestOperation {
        TransferRequestOperation {
            to: name("bob"),
            from: name("alice"),
            amount: Asset::coin(250),
            memo: "invoice".into(),
            request_id: "inv-1".into(),
            requested,
        }
    }

    fn accept(accepted: bool) -> TransferAcceptOperation {
        TransferAcceptOperation { from: name("alice"), to: name("bob"), request_id: "inv-1".into(), accepted }
    }

    fn recurring(begin: TimePoint) -> TransferRecurringOperation {
        TransferRecurringOperation {
            from: name("alice"),
            to: name("bob"),
            amount: Asset::coin(100),
            transfer_id: "rent".into(),
            memo: String::new(),
            begin,
            interval: TimeSpan::days(1),
            payments: 3,
            extensible: false,
            fill_or_kill: false,
            active: true,
        }
    }

    // ---- transfer ----

    #[test]
    fn transfer_moves_liquid_funds() {
        let mut f = Fixture::new();
        f.apply(transfer("alice", "bob", 300)).unwrap();
        assert_eq!((f.liquid("alice"), f.liquid("bob")), (700, 1_300));
    }

    #[test]
    fn transfer_to_unknown_account() {
        let mut f = Fixture::new();
        let err = f.apply(transfer("alice", "zed", 1)).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::UnknownAccount("zed".into())));
        assert_eq!(f.liquid("alice"), 1_000);
    }

    // ---- transfer_request / transfer_accept ----

    #[test]
    fn accepted_request_pays_and_is_removed() {
        let mut f = Fixture::new();
        f.apply(request(true)).unwrap();
        assert_eq!(
            f.apply(request(true)).unwrap_err(),
            ChainError::Evaluation(EvaluationError::AlreadyExists("transfer request"))
        );
        f.apply(accept(true)).unwrap();
        assert_eq!((f.liquid("alice"), f.liquid("bob")), (750, 1_250));
        assert_eq!(
            f.apply(accept(true)).unwrap_err(),
            ChainError::Evaluation(EvaluationError::NotFound("transfer request"))
        );
    }

    #[test]
    fn rejected_request_is_removed_without_payment() {
        let mut f = Fixture::new();
        f.apply(request(true)).unwrap();
        f.apply(accept(false)).unwrap();
        assert_eq!(f.liquid("alice"), 1_000);
        assert!(f.db.store().table::<TransferRequestObject>().unwrap().is_empty());
    }

    #[test]
    fn request_expiration_uses_configured_duration() {
        let mut f = Fixture::new();
        f.apply(request(true)).unwrap();
        let stored = f.db.store().table::<TransferRequestObject>().unwrap().iter().next().cloned().unwrap();
        assert_eq!(stored.expiration, f.now() + TimeSpan::days(7));
    }

    #[test]
    fn only_the_payer_can_accept() {
        let mut f = Fixture::new();
        f.apply(request(true)).unwrap();
        let mut op = accept(true);
        op.from = name("carol");
        assert!(matches!(f.apply(op).unwrap_err(), ChainError::Evaluation(EvaluationError::Precondition(_))));
    }

    // ---- transfer_recurring ----

    #[test]
    fn recurring_create_update_cancel() {
        let mut f = Fixture::new();
        let begin = f.now() + TimeSpan::hours(1);
        f.apply(recurring(begin)).unwrap();
        let table = f.db.store().table::<RecurringTransferObject>().unwrap();
        let t = table.iter().next().cloned().unwrap();
        assert_eq!(t.end, begin + TimeSpan::days(2));
        assert_eq!(t.payments_remaining, 3);

        let mut update = recurring(begin);
        update.amount = Asset::coin(40);
        update.payments = 5;
        f.apply(update).unwrap();
        let table = f.db.store().table::<RecurringTransferObject>().unwrap();
        assert_eq!(table.len(), 1);
        let t = table.iter().next().unwrap();
        assert_eq!((t.amount.amount, t.payments_remaining), (40, 5));

        let mut cancel = recurring(begin);
        cancel.active = false;
        f.apply(cancel.clone()).unwrap();
        assert!(f.db.store().table::<RecurringTransferObject>().unwrap().is_empty());
        assert_eq!(
            f.apply(cancel).unwrap_err(),
            ChainError::Evaluation(EvaluationError::NotFound("recurring transfer"))
        );
    }

    #[test]
    fn recurring_begin_in_the_past_rejected() {
        let mut f = Fixture::new();
        let begin = f.now() - TimeSpan::seconds(1);
        assert!(matches!(f.apply(recurring(begin)).unwrap_err(), ChainError::Evaluation(EvaluationError::NotInFuture(_))));
    }

    // ---- stake_asset / claim_reward_balance ----

    #[test]
    fn stake_moves_liquid_to_staked() {
        let mut f = Fixture::new();
        f.apply(StakeAssetOperation { from: name("alice"), to: name("bob"), amount: Asset::coin(400) }).unwrap();
        assert_eq!(f.liquid("alice"), 600);
        assert_eq!(f.staked("bob"), 400);
    }

    #[test]
    fn claim_reward_balance_requires_rewards() {
        let mut f = Fixture::new();
        let claim = ClaimRewardBalanceOperation { account: name("bob"), reward: Asset::coin(10) };
        assert!(matches!(
            f.apply(claim.clone()).unwrap_err(),
            ChainError::Evaluation(EvaluationError::InsufficientFunds { have: 0, need: 10, .. })
        ));
        f.db.adjust_reward_balance(&name("bob"), &Asset::coin(25)).unwrap();
        f.apply(claim).unwrap();
        assert_eq!(f.liquid("bob"), 1_010);
        assert_eq!(f.db.find_balance(&name("bob"), &AssetSymbol::coin()).unwrap().unwrap().reward, 15);
    }
}
