//! [`Database`]: the object store plus chain parameters and the virtual
//! operation log, with the typed helpers evaluators build on.
use tessera_core::config::ChainConfig;
use tessera_core::error::{EvaluationError, MathError};
use tessera_core::operations::VirtualOperation;
use tessera_core::types::{AccountName, Asset, AssetSymbol, TimePoint};
use tessera_store::{ObjectDatabase, ObjectId};

use crate::error::ChainError;
use crate::objects::{
    register_tables, AccountAuthorityObject, AccountBalanceObject, AccountObject, AssetDynamicDataObject,
    DynamicGlobalPropertyObject, ProducerObject, RewardFundObject,
};

/// Id of the singleton objects.
pub const SINGLETON_ID: ObjectId = 0;

/// Which of the three balances of an [`AccountBalanceObject`] to adjust.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceKind {
    Liquid,
    Staked,
    Reward,
}

impl BalanceKind {
    fn slot(self, balance: &mut AccountBalanceObject) -> &mut i64 {
        match self {
            BalanceKind::Liquid => &mut balance.liquid,
            BalanceKind::Staked => &mut balance.staked,
            BalanceKind::Reward => &mut balance.reward,
        }
    }
}

#[derive(Debug)]
pub struct Database {
    store: ObjectDatabase,
    config: ChainConfig,
    virtual_ops: Vec<VirtualOperation>,
}

impl Database {
    /// Empty database with every chain table registered and the singletons
    /// created. Nothing is undoable until the first session opens.
    pub fn new(config: ChainConfig) -> Result<Self, ChainError> {
        config.validate()?;
        let mut store = ObjectDatabase::new();
        register_tables(&mut store)?;
        store.create::<DynamicGlobalPropertyObject>(|_| {})?;
        store.create::<RewardFundObject>(|fund| {
            fund.content_constant = config.content_constant;
            fund.author_reward_curve = config.author_reward_curve;
        })?;
        Ok(Self { store, config, virtual_ops: Vec::new() })
    }

    pub fn store(&self) -> &ObjectDatabase {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ObjectDatabase {
        &mut self.store
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    // ---- Virtual operations ----

    pub fn push_virtual_op(&mut self, op: VirtualOperation) {
        self.virtual_ops.push(op);
    }

    /// Virtual operations recorded since the current block started.
    pub fn virtual_ops(&self) -> &[VirtualOperation] {
        &self.virtual_ops
    }

    pub fn clear_virtual_ops(&mut self) {
        self.virtual_ops.clear();
    }

    /// Drop every virtual operation recorded after the first `len`.
    pub fn truncate_virtual_ops(&mut self, len: usize) {
        self.virtual_ops.truncate(len);
    }

    /// Run `f` in a nested undo session. On error every store mutation and
    /// virtual operation made by `f` is discarded; on success the session is
    /// merged into the enclosing one.
    pub fn with_undo<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, ChainError>) -> Result<R, ChainError> {
        self.store.begin_undo();
        let mark = self.virtual_ops.len();
        match f(self) {
            Ok(value) => {
                self.store.squash()?;
                Ok(value)
            }
            Err(e) => {
                self.store.undo()?;
                self.virtual_ops.truncate(mark);
                Err(e)
            }
        }
    }

    // ---- Singletons ----

    pub fn dynamic_global_properties(&self) -> Result<&DynamicGlobalPropertyObject, ChainError> {
        Ok(self.store.get(SINGLETON_ID)?)
    }

    pub fn modify_dynamic_global_properties(
        &mut self,
        f: impl FnOnce(&mut DynamicGlobalPropertyObject),
    ) -> Result<(), ChainError> {
        self.store.modify(SINGLETON_ID, f)?;
        Ok(())
    }

    pub fn reward_fund(&self) -> Result<&RewardFundObject, ChainError> {
        Ok(self.store.get(SINGLETON_ID)?)
    }

    pub fn modify_reward_fund(&mut self, f: impl FnOnce(&mut RewardFundObject)) -> Result<(), ChainError> {
        self.store.modify(SINGLETON_ID, f)?;
        Ok(())
    }

    /// Chain time: the timestamp of the head block.
    pub fn head_block_time(&self) -> Result<TimePoint, ChainError> {
        Ok(self.dynamic_global_properties()?.time)
    }

    pub fn head_block_num(&self) -> Result<u32, ChainError> {
        Ok(self.dynamic_global_properties()?.head_block_number)
    }

    // ---- Accounts ----

    pub fn find_account(&self, name: &AccountName) -> Result<Option<&AccountObject>, ChainError> {
        Ok(self.store.find_by(AccountObject::BY_NAME, &AccountObject::key(name))?)
    }

    /// # Errors
    ///
    /// [`EvaluationError::UnknownAccount`] if no such account exists.
    pub fn get_account(&self, name: &AccountName) -> Result<&AccountObject, ChainError> {
        self.find_account(name)?
            .ok_or_else(|| EvaluationError::UnknownAccount(name.to_string()).into())
    }

    pub fn modify_account(&mut self, name: &AccountName, f: impl FnOnce(&mut AccountObject)) -> Result<(), ChainError> {
        let id = self.get_account(name)?.id;
        self.store.modify(id, f)?;
        Ok(())
    }

    /// Authorities of an existing account. Absence is an internal error.
    pub fn get_authority(&self, name: &AccountName) -> Result<&AccountAuthorityObject, ChainError> {
        Ok(self.store.get_by(AccountAuthorityObject::BY_ACCOUNT, &AccountObject::key(name))?)
    }

    pub fn find_producer(&self, owner: &AccountName) -> Result<Option<&ProducerObject>, ChainError> {
        Ok(self.store.find_by(ProducerObject::BY_NAME, &AccountObject::key(owner))?)
    }

    /// # Errors
    ///
    /// [`EvaluationError::UnknownProducer`] if `owner` is not a producer.
    pub fn get_producer(&self, owner: &AccountName) -> Result<&ProducerObject, ChainError> {
        self.find_producer(owner)?
            .ok_or_else(|| EvaluationError::UnknownProducer(owner.to_string()).into())
    }

    // ---- Balances ----

    pub fn find_balance(
        &self,
        owner: &AccountName,
        symbol: &AssetSymbol,
    ) -> Result<Option<&AccountBalanceObject>, ChainError> {
        Ok(self
            .store
            .find_by(AccountBalanceObject::BY_OWNER_SYMBOL, &AccountBalanceObject::key(owner, symbol))?)
    }

    /// Liquid balance, zero when the account never held the asset.
    pub fn liquid_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Result<i64, ChainError> {
        Ok(self.find_balance(owner, symbol)?.map_or(0, |b| b.liquid))
    }

    pub fn staked_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Result<i64, ChainError> {
        Ok(self.find_balance(owner, symbol)?.map_or(0, |b| b.staked))
    }

    /// Add `delta` (possibly negative) to one balance of `owner`, creating
    /// the balance object on first credit.
    ///
    /// # Errors
    ///
    /// - [`EvaluationError::InsufficientFunds`] if the balance would go negative.
    /// - [`MathError::Overflow`] if it would exceed `i64`.
    pub fn adjust_balance(&mut self, owner: &AccountName, delta: &Asset, kind: BalanceKind) -> Result<(), ChainError> {
        let existing = self.find_balance(owner, &delta.symbol)?.cloned();
        let exists = existing.is_some();
        let mut balance = existing.unwrap_or_else(|| AccountBalanceObject {
            owner: owner.clone(),
            symbol: delta.symbol.clone(),
            ..Default::default()
        });
        let slot = kind.slot(&mut balance);
        let updated = slot.checked_add(delta.amount).ok_or(MathError::Overflow)?;
        if updated < 0 {
            return Err(EvaluationError::InsufficientFunds {
                account: owner.to_string(),
                have: *slot,
                need: delta.amount.saturating_neg(),
            }
            .into());
        }
        *slot = updated;
        if exists {
            self.store.modify::<AccountBalanceObject>(balance.id, |b| *b = balance)?;
        } else {
            self.store.create::<AccountBalanceObject>(|b| *b = balance)?;
        }
        Ok(())
    }

    pub fn adjust_liquid_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), ChainError> {
        self.adjust_balance(owner, delta, BalanceKind::Liquid)
    }

    pub fn adjust_staked_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), ChainError> {
        self.adjust_balance(owner, delta, BalanceKind::Staked)
    }

    pub fn adjust_reward_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), ChainError> {
        self.adjust_balance(owner, delta, BalanceKind::Reward)
    }

    /// Move `amount` between the liquid balances of two accounts.
    pub fn transfer_liquid(&mut self, from: &AccountName, to: &AccountName, amount: &Asset) -> Result<(), ChainError> {
        self.adjust_liquid_balance(from, &Asset::new(-amount.amount, amount.symbol.clone()))?;
        self.adjust_liquid_balance(to, amount)
    }

    // ---- Supply ----

    pub fn find_asset_dynamic_data(&self, symbol: &AssetSymbol) -> Result<Option<&AssetDynamicDataObject>, ChainError> {
        Ok(self
            .store
            .find_by(AssetDynamicDataObject::BY_SYMBOL, &AssetDynamicDataObject::key(symbol))?)
    }

    /// Adjust the total and pending supply counters of `symbol`.
    ///
    /// Negative results mean the books no longer balance and are reported as
    /// internal errors.
    pub fn adjust_supply(&mut self, symbol: &AssetSymbol, total_delta: i64, pending_delta: i64) -> Result<(), ChainError> {
        let existing = self.find_asset_dynamic_data(symbol)?.cloned();
        let exists = existing.is_some();
        let mut data = existing.unwrap_or_else(|| AssetDynamicDataObject { symbol: symbol.clone(), ..Default::default() });
        data.total_supply = data.total_supply.checked_add(total_delta).ok_or(MathError::Overflow)?;
        data.pending_supply = data.pending_supply.checked_add(pending_delta).ok_or(MathError::Overflow)?;
        if data.total_supply < 0 || data.pending_supply < 0 {
            return Err(ChainError::Internal(format!(
                "negative supply for {symbol}: total {}, pending {}",
                data.total_supply, data.pending_supply
            )));
        }
        if exists {
            self.store.modify::<AssetDynamicDataObject>(data.id, |d| *d = data)?;
        } else {
            self.store.create::<AssetDynamicDataObject>(|d| *d = data)?;
        }
        Ok(())
    }
}
