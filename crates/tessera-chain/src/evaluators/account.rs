use tracing::info;

use tessera_core::error::EvaluationError;
use tessera_core::operations::{AccountCreateOperation, AccountUpdateProxyOperation, DeclineVotingRightsOperation};
use tessera_core::types::{AccountName, Asset};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluator::OperationEvaluator;
use crate::objects::{AccountAuthorityObject, AccountObject, DeclineVotingRightsRequestObject};

/// Longest proxy chain followed when checking for loops.
const MAX_PROXY_DEPTH: usize = 4;

fn require_accounts_exist(db: &Database, names: impl IntoIterator<Item = AccountName>) -> Result<(), ChainError> {
    for name in names {
        db.get_account(&name)?;
    }
    Ok(())
}

pub struct AccountCreateEvaluator;

impl OperationEvaluator for AccountCreateEvaluator {
    type Op = AccountCreateOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &AccountCreateOperation) -> Result<(), ChainError> {
        db.get_account(&op.creator)?;
        if db.find_account(&op.new_account_name)?.is_some() {
            return Err(EvaluationError::AccountExists(op.new_account_name.to_string()).into());
        }
        for authority in [&op.owner, &op.active, &op.posting] {
            require_accounts_exist(db, authority.account_auths.keys().cloned())?;
        }

        // The fee is taken from the creator and staked for the new account.
        if op.fee.amount > 0 {
            db.adjust_liquid_balance(&op.creator, &Asset::new(-op.fee.amount, op.fee.symbol.clone()))?;
            db.adjust_staked_balance(&op.new_account_name, &op.fee)?;
        }

        let now = db.head_block_time()?;
        let store = db.store_mut();
        store.create::<AccountObject>(|a| {
            a.name = op.new_account_name.clone();
            a.created = now;
            a.recovery_account = Some(op.creator.clone());
            a.can_vote = true;
        })?;
        store.create::<AccountAuthorityObject>(|a| {
            a.account = op.new_account_name.clone();
            a.owner = op.owner.clone();
            a.active = op.active.clone();
            a.posting = op.posting.clone();
        })?;
        info!(account = %op.new_account_name, creator = %op.creator, "account created");
        Ok(())
    }
}

pub struct AccountUpdateProxyEvaluator;

impl OperationEvaluator for AccountUpdateProxyEvaluator {
    type Op = AccountUpdateProxyOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &AccountUpdateProxyOperation) -> Result<(), ChainError> {
        let account = db.get_account(&op.account)?;
        if account.proxy == op.proxy {
            return Err(EvaluationError::Precondition("proxy is unchanged").into());
        }
        if let Some(proxy) = &op.proxy {
            // Walk the new proxy's chain; reaching the account again is a loop.
            let mut next = Some(db.get_account(proxy)?);
            for _ in 0..MAX_PROXY_DEPTH {
                let Some(current) = next else { break };
                if current.name == op.account {
                    return Err(EvaluationError::Precondition("proxy loop").into());
                }
                next = match &current.proxy {
                    Some(p) => Some(db.get_account(p)?),
                    None => None,
                };
            }
        }
        db.modify_account(&op.account, |a| a.proxy = op.proxy.clone())
    }
}

pub struct DeclineVotingRightsEvaluator;

impl OperationEvaluator for DeclineVotingRightsEvaluator {
    type Op = DeclineVotingRightsOperation;

    fn evaluate_and_apply(&self, db: &mut Database, op: &DeclineVotingRightsOperation) -> Result<(), ChainError> {
        let account = db.get_account(&op.account)?;
        let key = AccountObject::key(&op.account);
        let existing = db
            .store()
            .find_by::<DeclineVotingRightsRequestObject>(DeclineVotingRightsRequestObject::BY_ACCOUNT, &key)?
            .map(|r| r.id);

        if op.declined {
            if !account.can_vote {
                return Err(EvaluationError::CannotVote(op.account.to_string()).into());
            }
            if existing.is_some() {
                return Err(EvaluationError::AlreadyExists("decline voting rights request").into());
            }
            let effective_date = db.head_block_time()? + db.config().decline_voting_rights_duration;
            db.store_mut().create::<DeclineVotingRightsRequestObject>(|r| {
                r.account = op.account.clone();
                r.effective_date = effective_date;
            })?;
        } else {
            let id = existing.ok_or(EvaluationError::NotFound("decline voting rights request"))?;
            db.store_mut().remove::<DeclineVotingRightsRequestObject>(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::testing::{name, Fixture};
    use tessera_core::types::{AssetSymbol, Authority};
    use tessera_store::IndexKey;

    /// Names of every account whose proxy is `proxy`.
    fn proxied_accounts(db: &Database, proxy: &AccountName) -> Result<Vec<AccountName>, ChainError> {
        let key = IndexKey::new().with(proxy.as_str());
        Ok(db
            .store()
            .table::<AccountObject>()?
            .prefix(AccountObject::BY_PROXY, &key)?
            .map(|a| a.name.clone())
            .collect())
    }

    fn create(new_name: &str, fee: i64) -> AccountCreateOperation {
        AccountCreateOperation {
            creator: name("alice"),
            new_account_name: name(new_name),
            owner: Authority::from_key("k1"),
            active: Authority::from_key("k2"),
            posting: Authority::from_key("k3"),
            fee: Asset::coin(fee),
        }
    }

    // ---- account_create ----

    #[test]
    fn create_stakes_fee_for_new_account() {
        let mut f = Fixture::new();
        f.apply(create("dave", 100)).unwrap();
        let dave = f.db.get_account(&name("dave")).unwrap();
        assert_eq!(dave.recovery_account, Some(name("alice")));
        assert!(dave.can_vote);
        assert_eq!(f.liquid("alice"), 900);
        assert_eq!(f.staked("dave"), 100);
        assert_eq!(f.db.get_authority(&name("dave")).unwrap().posting, Authority::from_key("k3"));
    }

    #[test]
    fn create_twice_is_rejected() {
        let mut f = Fixture::new();
        f.apply(create("dave", 0)).unwrap();
        let err = f.apply(create("dave", 0)).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::AccountExists("dave".into())));
    }

    #[test]
    fn create_with_unaffordable_fee_leaves_no_account() {
        let mut f = Fixture::new();
        let err = f.apply(create("dave", 5_000)).unwrap_err();
        assert!(matches!(err, ChainError::Evaluation(EvaluationError::InsufficientFunds { .. })));
        assert!(f.db.find_account(&name("dave")).unwrap().is_none());
        assert!(f.db.find_balance(&name("dave"), &AssetSymbol::coin()).unwrap().is_none());
    }

    #[test]
    fn create_with_unknown_account_authority() {
        let mut f = Fixture::new();
        let mut op = create("dave", 0);
        op.active.account_auths.insert(name("nobody"), 1);
        let err = f.apply(op).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::UnknownAccount("nobody".into())));
    }

    // ---- account_update_proxy ----

    #[test]
    fn proxy_set_and_cleared() {
        let mut f = Fixture::new();
        f.apply(AccountUpdateProxyOperation { account: name("bob"), proxy: Some(name("alice")) }).unwrap();
        assert_eq!(proxied_accounts(&f.db, &name("alice")).unwrap(), vec![name("bob")]);
        f.apply(AccountUpdateProxyOperation { account: name("bob"), proxy: None }).unwrap();
        assert!(proxied_accounts(&f.db, &name("alice")).unwrap().is_empty());
    }

    #[test]
    fn proxy_loop_rejected() {
        let mut f = Fixture::new();
        f.apply(AccountUpdateProxyOperation { account: name("bob"), proxy: Some(name("carol")) }).unwrap();
        let err = f.apply(AccountUpdateProxyOperation { account: name("carol"), proxy: Some(name("bob")) }).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::Precondition("proxy loop")));
    }

    #[test]
    fn unchanged_proxy_rejected() {
        let mut f = Fixture::new();
        let err = f.apply(AccountUpdateProxyOperation { account: name("bob"), proxy: None }).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::Precondition("proxy is unchanged")));
    }

    // ---- decline_voting_rights ----

    #[test]
    fn decline_request_lifecycle() {
        let mut f = Fixture::new();
        let op = DeclineVotingRightsOperation { account: name("bob"), declined: true };
        f.apply(op.clone()).unwrap();
        assert_eq!(
            f.apply(op).unwrap_err(),
            ChainError::Evaluation(EvaluationError::AlreadyExists("decline voting rights request"))
        );
        f.apply(DeclineVotingRightsOperation { account: name("bob"), declined: false }).unwrap();
        assert_eq!(
            f.apply(DeclineVotingRightsOperation { account: name("bob"), declined: false }).unwrap_err(),
            ChainError::Evaluation(EvaluationError::NotFound("decline voting rights request"))
        );
    }
}
