use tracing::info;

use tessera_core::error::EvaluationError;
use tessera_core::operations::{
    ChangeRecoveryAccountOperation, RecoverAccountOperation, RequestAccountRecoveryOperation,
};
use tessera_core::types::{AccountName, Authority};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluator::OperationEvaluator;
use crate::objects::{
    AccountAuthorityObject, AccountObject, AccountRecoveryRequestObject, ChangeRecoveryAccountRequestObject,
    OwnerAuthorityHistoryObject,
};

/// Replace the owner authority of `account`, keeping the old one in the
/// owner history so it can later prove ownership during a recovery.
pub(crate) fn update_owner_authority(
    db: &mut Database,
    account: &AccountName,
    new_owner: &Authority,
) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    let auth = db.get_authority(account)?.clone();
    let store = db.store_mut();
    store.create::<OwnerAuthorityHistoryObject>(|h| {
        h.account = account.clone();
        h.previous_owner_authority = auth.owner.clone();
        h.last_valid_time = now;
    })?;
    store.modify::<AccountAuthorityObject>(auth.id, |a| {
        a.owner = new_owner.clone();
        a.last_owner_update = now;
    })?;
    Ok(())
}

pub struct RequestAccountRecoveryEvaluator;

impl OperationEvaluator for RequestAccountRecoveryEvaluator {
    type Op = RequestAccountRecoveryOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &RequestAccountRecoveryOperation) -> Result<(), ChainError> {
        let account = db.get_account(&op.account_to_recover)?;
        if account.recovery_account.as_ref() != Some(&op.recovery_account) {
            return Err(EvaluationError::WrongRecoveryAccount {
                expected: account.recovery_account.as_ref().map_or_else(String::new, |r| r.to_string()),
                got: op.recovery_account.to_string(),
            }
            .into());
        }
        for name in op.new_owner_authority.account_auths.keys() {
            db.get_account(name)?;
        }

        let key = AccountObject::key(&op.account_to_recover);
        let existing = db
            .store()
            .find_by::<AccountRecoveryRequestObject>(AccountRecoveryRequestObject::BY_ACCOUNT, &key)?
            .map(|r| r.id);
        let expires = db.head_block_time()? + db.config().account_recovery_request_expiration;
        let cancel = op.new_owner_authority.weight_threshold == 0;

        match existing {
            None => {
                if cancel || op.new_owner_authority.is_impossible() {
                    return Err(EvaluationError::Precondition("cannot recover to an impossible authority").into());
                }
                db.store_mut().create::<AccountRecoveryRequestObject>(|r| {
                    r.account_to_recover = op.account_to_recover.clone();
                    r.new_owner_authority = op.new_owner_authority.clone();
                    r.expires = expires;
                })?;
            }
            Some(id) if cancel => {
                db.store_mut().remove::<AccountRecoveryRequestObject>(id)?;
            }
            Some(id) => {
                db.store_mut().modify::<AccountRecoveryRequestObject>(id, |r| {
                    r.new_owner_authority = op.new_owner_authority.clone();
                    r.expires = expires;
                })?;
            }
        }
        Ok(())
    }
}

pub struct RecoverAccountEvaluator;

impl OperationEvaluator for RecoverAccountEvaluator {
    type Op = RecoverAccountOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &RecoverAccountOperation) -> Result<(), ChainError> {
        let now = db.head_block_time()?;
        let auth = db.get_authority(&op.account_to_recover)?;
        if now.saturating_since(auth.last_owner_update) <= db.config().owner_update_limit {
            return Err(EvaluationError::OwnerUpdateTooSoon.into());
        }

        let key = AccountObject::key(&op.account_to_recover);
        let request = db
            .store()
            .find_by::<AccountRecoveryRequestObject>(AccountRecoveryRequestObject::BY_ACCOUNT, &key)?
            .cloned()
            .ok_or(EvaluationError::NotFound("account recovery request"))?;
        if request.new_owner_authority != op.new_owner_authority {
            return Err(EvaluationError::AuthorityMismatch.into());
        }

        let period = db.config().owner_auth_recovery_period;
        let proven = db
            .store()
            .table::<OwnerAuthorityHistoryObject>()?
            .prefix(OwnerAuthorityHistoryObject::BY_ACCOUNT, &key)?
            .any(|h| h.previous_owner_authority == op.recent_owner_authority && h.last_valid_time + period > now);
        if !proven {
            return Err(EvaluationError::RecentOwnerNotFound.into());
        }

        db.store_mut().remove::<AccountRecoveryRequestObject>(request.id)?;
        update_owner_authority(db, &op.account_to_recover, &op.new_owner_authority)?;
        info!(account = %op.account_to_recover, "account recovered");
        Ok(())
    }
}

pub struct ChangeRecoveryAccountEvaluator;

impl OperationEvaluator for ChangeRecoveryAccountEvaluator {
    type Op = ChangeRecoveryAccountOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &ChangeRecoveryAccountOperation) -> Result<(), ChainError> {
        db.get_account(&op.new_recovery_account)?;
        let account = db.get_account(&op.account_to_recover)?;
        let unchanged = account.recovery_account.as_ref() == Some(&op.new_recovery_account);

        let key = AccountObject::key(&op.account_to_recover);
        let existing = db
            .store()
            .find_by::<ChangeRecoveryAccountRequestObject>(ChangeRecoveryAccountRequestObject::BY_ACCOUNT, &key)?
            .map(|r| r.id);
        let effective_on = db.head_block_time()? + db.config().change_recovery_account_delay;

        match (existing, unchanged) {
            // Changing back to the current recovery account cancels the request.
            (Some(id), true) => {
                db.store_mut().remove::<ChangeRecoveryAccountRequestObject>(id)?;
            }
            (None, true) => {}
            (Some(id), false) => {
                db.store_mut().modify::<ChangeRecoveryAccountRequestObject>(id, |r| {
                    r.recovery_account = op.new_recovery_account.clone();
                    r.effective_on = effective_on;
                })?;
            }
            (None, false) => {
                db.store_mut().create::<ChangeRecoveryAccountRequestObject>(|r| {
                    r.account_to_recover = op.account_to_recover.clone();
                    r.recovery_account = op.new_recovery_account.clone();
                    r.effective_on = effective_on;
                })?;
            }
        }
        Ok(())
    }
}
