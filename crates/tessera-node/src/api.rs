//! Read-only query surface.
//!
//! Every method takes the node's read lock once and returns owned,
//! serialisable snapshots, so a response never mixes state from two blocks.
//! `get_*` fails when the object is absent; `find_*` returns `None`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tessera_chain::objects::{
    AccountBalanceObject, AccountObject, AccountRecoveryRequestObject, ChangeRecoveryAccountRequestObject,
    CommentObject, DeclineVotingRightsRequestObject, DynamicGlobalPropertyObject, OwnerAuthorityHistoryObject,
    ProducerObject, RecurringTransferObject, RewardFundObject, TransferRequestObject,
};
use tessera_chain::{ChainError, Database};
use tessera_core::types::{AccountName, AssetSymbol, Hash256, TimePoint};
use tessera_core::VirtualOperation;

use crate::error::NodeError;
use crate::node::Node;

/// Head of the chain as seen by one query.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HeadInfo {
    pub head_block_num: u32,
    pub head_block_id: Hash256,
    pub head_block_time: TimePoint,
    pub last_irreversible_block_num: u32,
    pub pending_transactions: usize,
}

#[derive(Clone)]
pub struct DatabaseApi {
    node: Arc<Node>,
}

impl DatabaseApi {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    fn read<R>(&self, f: impl FnOnce(&Database) -> Result<R, ChainError>) -> Result<R, NodeError> {
        Ok(self.node.with_read_lock(|chain| f(chain.db()))?)
    }

    pub fn get_head_info(&self) -> Result<HeadInfo, NodeError> {
        Ok(self.node.with_read_lock(|chain| -> Result<HeadInfo, ChainError> {
            Ok(HeadInfo {
                head_block_num: chain.head_block_num()?,
                head_block_id: chain.head_block_id()?,
                head_block_time: chain.head_block_time()?,
                last_irreversible_block_num: chain.last_irreversible_block_num(),
                pending_transactions: chain.pending_transactions().count(),
            })
        })?)
    }

    pub fn get_dynamic_global_properties(&self) -> Result<DynamicGlobalPropertyObject, NodeError> {
        self.read(|db| Ok(db.dynamic_global_properties()?.clone()))
    }

    pub fn get_reward_fund(&self) -> Result<RewardFundObject, NodeError> {
        self.read(|db| Ok(db.reward_fund()?.clone()))
    }

    /// Virtual operations of the head block and the pending transactions.
    pub fn get_virtual_operations(&self) -> Vec<VirtualOperation> {
        self.node.with_read_lock(|chain| chain.virtual_ops().to_vec())
    }

    // ---- Accounts ----

    pub fn get_account(&self, name: &AccountName) -> Result<AccountObject, NodeError> {
        self.read(|db| Ok(db.get_account(name)?.clone()))
    }

    pub fn find_account(&self, name: &AccountName) -> Result<Option<AccountObject>, NodeError> {
        self.read(|db| Ok(db.find_account(name)?.cloned()))
    }

    pub fn get_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Result<AccountBalanceObject, NodeError> {
        self.read(|db| {
            let key = AccountBalanceObject::key(owner, symbol);
            Ok(db.store().get_by::<AccountBalanceObject>(AccountBalanceObject::BY_OWNER_SYMBOL, &key)?.clone())
        })
    }

    pub fn find_balance(
        &self,
        owner: &AccountName,
        symbol: &AssetSymbol,
    ) -> Result<Option<AccountBalanceObject>, NodeError> {
        self.read(|db| Ok(db.find_balance(owner, symbol)?.cloned()))
    }

    /// Zero when the account never held `symbol`.
    pub fn get_liquid_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Result<i64, NodeError> {
        self.read(|db| db.liquid_balance(owner, symbol))
    }

    // ---- Recovery ----

    pub fn find_recovery_request(
        &self,
        account: &AccountName,
    ) -> Result<Option<AccountRecoveryRequestObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .find_by::<AccountRecoveryRequestObject>(
                    AccountRecoveryRequestObject::BY_ACCOUNT,
                    &AccountObject::key(account),
                )?
                .cloned())
        })
    }

    pub fn find_change_recovery_request(
        &self,
        account: &AccountName,
    ) -> Result<Option<ChangeRecoveryAccountRequestObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .find_by::<ChangeRecoveryAccountRequestObject>(
                    ChangeRecoveryAccountRequestObject::BY_ACCOUNT,
                    &AccountObject::key(account),
                )?
                .cloned())
        })
    }

    /// Previous owner authorities of `account`, most recent first.
    pub fn get_owner_history(&self, account: &AccountName) -> Result<Vec<OwnerAuthorityHistoryObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .table::<OwnerAuthorityHistoryObject>()?
                .prefix(OwnerAuthorityHistoryObject::BY_ACCOUNT, &AccountObject::key(account))?
                .cloned()
                .collect())
        })
    }

    pub fn find_decline_voting_request(
        &self,
        account: &AccountName,
    ) -> Result<Option<DeclineVotingRightsRequestObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .find_by::<DeclineVotingRightsRequestObject>(
                    DeclineVotingRightsRequestObject::BY_ACCOUNT,
                    &AccountObject::key(account),
                )?
                .cloned())
        })
    }

    // ---- Transfers ----

    /// Recurring transfers paid by `from`, ordered by transfer id.
    pub fn get_recurring_transfers_from(&self, from: &AccountName) -> Result<Vec<RecurringTransferObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .table::<RecurringTransferObject>()?
                .prefix(RecurringTransferObject::BY_TRANSFER_ID, &AccountObject::key(from))?
                .cloned()
                .collect())
        })
    }

    pub fn find_transfer_request(
        &self,
        to: &AccountName,
        request_id: &str,
    ) -> Result<Option<TransferRequestObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .find_by::<TransferRequestObject>(
                    TransferRequestObject::BY_REQUEST_ID,
                    &TransferRequestObject::key(to, request_id),
                )?
                .cloned())
        })
    }

    // ---- Content and producers ----

    pub fn find_comment(&self, author: &AccountName, permlink: &str) -> Result<Option<CommentObject>, NodeError> {
        self.read(|db| {
            Ok(db
                .store()
                .find_by::<CommentObject>(CommentObject::BY_PERMLINK, &CommentObject::key(author, permlink))?
                .cloned())
        })
    }

    pub fn get_producer(&self, owner: &AccountName) -> Result<ProducerObject, NodeError> {
        self.read(|db| Ok(db.get_producer(owner)?.clone()))
    }
}
