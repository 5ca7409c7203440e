//! Block and transaction application.
//!
//! Every applied block is one undo session on the store, stacked so the most
//! recent blocks can be popped. Transactions run in nested sessions squashed
//! into their block. Transactions pushed between blocks live in a separate
//! pending session that is rolled back before the next block and replayed on
//! top of it.

use tracing::{debug, info, warn};

use tessera_core::block::{AppliedBlock, AuthorizationContext, SignedBlock, SignedTransaction};
use tessera_core::config::ChainConfig;
use tessera_core::constants::{BLOCK_INTERVAL, MAX_TIME_UNTIL_EXPIRATION, PARTICIPATION_WINDOW};
use tessera_core::error::{BlockError, EvaluationError};
use tessera_core::operations::VirtualOperation;
use tessera_core::types::{Hash256, TimePoint};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluator::EvaluatorRegistry;
use crate::genesis::{init_genesis, GenesisConfig};
use crate::maintenance::{
    account_recovery_processing, clear_expired_transactions, clear_expired_transfer_requests,
    process_decline_voting_rights, process_recurring_transfers,
};
use crate::objects::TransactionObject;
use crate::rewards::{process_comment_cashout, process_funds};

/// Validate and apply one transaction against the current state.
///
/// Does not open a session; callers wrap it so a failure rolls back.
fn apply_transaction(
    db: &mut Database,
    registry: &EvaluatorRegistry,
    tx: &SignedTransaction,
    auth: &AuthorizationContext,
) -> Result<(), ChainError> {
    let trx = &tx.transaction;
    trx.validate()?;

    let now = db.head_block_time()?;
    if trx.expiration <= now {
        return Err(EvaluationError::TransactionExpired(trx.expiration.to_string()).into());
    }
    if trx.expiration > now + MAX_TIME_UNTIL_EXPIRATION {
        return Err(EvaluationError::ExpirationTooFar(trx.expiration.to_string()).into());
    }
    auth.check(&trx.required_authorities())?;

    let trx_id = tx.id()?;
    if db
        .store()
        .find_by::<TransactionObject>(TransactionObject::BY_TRX_ID, &TransactionObject::key(&trx_id))?
        .is_some()
    {
        return Err(EvaluationError::DuplicateTransaction(trx_id.to_string()).into());
    }
    db.store_mut().create::<TransactionObject>(|t| {
        t.trx_id = trx_id;
        t.expiration = trx.expiration;
    })?;

    for (op_index, op) in trx.operations.iter().enumerate() {
        registry
            .apply(db, op)
            .map_err(|e| ChainError::Operation { op_index, source: Box::new(e) })?;
    }
    Ok(())
}

/// Shift `slots` slots into the participation mask: one per missed slot,
/// then a filled slot for the block being applied.
fn shift_participation(mask: u128, slots: u64) -> u128 {
    let missed = slots.saturating_sub(1);
    let shifted = if missed >= u64::from(PARTICIPATION_WINDOW) { 0 } else { mask << missed };
    (shifted << 1) | 1
}

fn update_global_dynamic_data(
    db: &mut Database,
    block: &SignedBlock,
    block_id: Hash256,
    slots: u64,
) -> Result<(), ChainError> {
    let header = &block.header;
    db.modify_dynamic_global_properties(|g| {
        g.recent_slots_filled = shift_participation(g.recent_slots_filled, slots);
        g.participation_count = g.recent_slots_filled.count_ones() as u8;
        g.head_block_number = header.block_num();
        g.head_block_id = block_id;
        g.time = header.timestamp;
        g.current_producer = header.producer.clone();
        g.current_aslot += slots;
    })?;
    if slots > 1 {
        debug!(missed = slots - 1, block_num = header.block_num(), "missed slots before block");
    }
    Ok(())
}

#[derive(Debug)]
pub struct Chain {
    db: Database,
    registry: EvaluatorRegistry,
    pending: Vec<(SignedTransaction, AuthorizationContext)>,
    pending_open: bool,
    /// Length of the virtual-op log when the pending session opened.
    pending_vops_mark: usize,
    last_irreversible: u32,
}

impl Chain {
    /// A chain at the genesis state with the default evaluators.
    pub fn new(config: ChainConfig, genesis: &GenesisConfig) -> Result<Self, ChainError> {
        let mut db = Database::new(config)?;
        init_genesis(&mut db, genesis)?;
        Ok(Self::from_database(db, EvaluatorRegistry::with_default_evaluators()))
    }

    pub fn from_database(db: Database, registry: EvaluatorRegistry) -> Self {
        Self { db, registry, pending: Vec::new(), pending_open: false, pending_vops_mark: 0, last_irreversible: 0 }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn head_block_num(&self) -> Result<u32, ChainError> {
        self.db.head_block_num()
    }

    pub fn head_block_id(&self) -> Result<Hash256, ChainError> {
        Ok(self.db.dynamic_global_properties()?.head_block_id)
    }

    pub fn head_block_time(&self) -> Result<TimePoint, ChainError> {
        self.db.head_block_time()
    }

    pub fn last_irreversible_block_num(&self) -> u32 {
        self.last_irreversible
    }

    /// Virtual operations of the last applied block, followed by those of
    /// pending transactions.
    pub fn virtual_ops(&self) -> &[VirtualOperation] {
        self.db.virtual_ops()
    }

    pub fn pending_transactions(&self) -> impl Iterator<Item = &SignedTransaction> {
        self.pending.iter().map(|(tx, _)| tx)
    }

    // ---- Transactions ----

    /// Apply `tx` on top of the pending state.
    ///
    /// Either every operation takes effect or none does. Accepted
    /// transactions are kept pending and replayed after each block.
    pub fn push_transaction(&mut self, tx: SignedTransaction, auth: AuthorizationContext) -> Result<(), ChainError> {
        if !self.pending_open {
            self.db.store_mut().begin_undo();
            self.pending_open = true;
            self.pending_vops_mark = self.db.virtual_ops().len();
        }
        let registry = &self.registry;
        self.db.with_undo(|db| apply_transaction(db, registry, &tx, &auth))?;
        self.pending.push((tx, auth));
        Ok(())
    }

    /// Roll back the pending session and its virtual operations, returning
    /// the transactions it held.
    fn clear_pending(&mut self) -> Result<Vec<(SignedTransaction, AuthorizationContext)>, ChainError> {
        if self.pending_open {
            self.db.store_mut().undo()?;
            self.db.truncate_virtual_ops(self.pending_vops_mark);
            self.pending_open = false;
        }
        Ok(std::mem::take(&mut self.pending))
    }

    fn replay_pending(&mut self, pending: Vec<(SignedTransaction, AuthorizationContext)>) {
        for (tx, auth) in pending {
            if let Err(e) = self.push_transaction(tx, auth) {
                warn!(error = %e, "dropped pending transaction");
            }
        }
    }

    // ---- Blocks ----

    /// Validate and apply `block` on top of the head.
    ///
    /// On any error the state is exactly as before the call.
    pub fn apply_block(&mut self, block: &SignedBlock) -> Result<AppliedBlock, ChainError> {
        let pending = self.clear_pending()?;
        let result = self.apply_block_inner(block);
        if let Err(e) = &result {
            warn!(block_num = block.block_num(), error = %e, "block rejected");
        }
        self.replay_pending(pending);
        result
    }

    fn apply_block_inner(&mut self, block: &SignedBlock) -> Result<AppliedBlock, ChainError> {
        let header = &block.header;
        let head_id = self.head_block_id()?;
        let head_time = self.db.head_block_time()?;
        if header.previous != head_id {
            return Err(BlockError::UnlinkableBlock { expected: head_id.to_string(), got: header.previous.to_string() }
                .into());
        }
        if header.timestamp <= head_time {
            return Err(BlockError::TimestampNotAfterHead {
                got: header.timestamp.to_string(),
                head: head_time.to_string(),
            }
            .into());
        }
        let slots = (header.timestamp - head_time).as_micros() / BLOCK_INTERVAL.as_micros();
        if slots <= 0 {
            return Err(BlockError::SameSlot.into());
        }
        if block.compute_merkle_root()? != header.transaction_merkle_root {
            return Err(BlockError::InvalidMerkleRoot.into());
        }
        if self.db.find_producer(&header.producer)?.is_none() {
            return Err(BlockError::UnknownProducer(header.producer.to_string()).into());
        }
        let block_id = block.id()?;

        self.db.store_mut().begin_undo();
        self.db.clear_virtual_ops();
        match self.apply_block_body(block, block_id, slots as u64) {
            Ok(()) => {}
            Err(e) => {
                self.db.store_mut().undo()?;
                self.db.clear_virtual_ops();
                return Err(e);
            }
        }

        let max_undo = self.db.config().max_undo_history;
        let store = self.db.store_mut();
        if store.undo_depth() > max_undo {
            let revision = store.revision() - max_undo as i64;
            store.commit(revision);
            self.last_irreversible = self.last_irreversible.max(revision.max(0) as u32);
        }

        info!(
            block_num = header.block_num(),
            producer = %header.producer,
            transactions = block.transactions.len(),
            virtual_ops = self.db.virtual_ops().len(),
            "applied block"
        );
        Ok(AppliedBlock {
            block_num: header.block_num(),
            block_id,
            header: header.clone(),
            transaction_count: block.transactions.len(),
        })
    }

    fn apply_block_body(&mut self, block: &SignedBlock, block_id: Hash256, slots: u64) -> Result<(), ChainError> {
        let producer = block.header.producer.clone();
        self.db.modify_dynamic_global_properties(|g| g.current_producer = producer.clone())?;

        let registry = &self.registry;
        for (index, tx) in block.transactions.iter().enumerate() {
            let auth = tx.authorization();
            self.db
                .with_undo(|db| apply_transaction(db, registry, tx, &auth))
                .map_err(|e| ChainError::Transaction { index, source: Box::new(e) })?;
        }

        let db = &mut self.db;
        update_global_dynamic_data(db, block, block_id, slots)?;
        process_funds(db, &producer)?;
        process_comment_cashout(db)?;
        process_recurring_transfers(db)?;
        clear_expired_transfer_requests(db)?;
        clear_expired_transactions(db)?;
        account_recovery_processing(db)?;
        process_decline_voting_rights(db)?;
        Ok(())
    }

    /// Undo the head block. Irreversible blocks cannot be popped.
    pub fn pop_block(&mut self) -> Result<(), ChainError> {
        let pending = self.clear_pending()?;
        let result = self.pop_block_inner();
        self.replay_pending(pending);
        result
    }

    fn pop_block_inner(&mut self) -> Result<(), ChainError> {
        if self.db.store().undo_depth() == 0 {
            return Err(BlockError::NothingToPop.into());
        }
        let block_num = self.head_block_num()?;
        self.db.store_mut().undo()?;
        self.db.clear_virtual_ops();
        info!(block_num, "popped block");
        Ok(())
    }

    /// Make every block up to `block_num` permanent.
    pub fn set_irreversible(&mut self, block_num: u32) -> Result<(), ChainError> {
        let block_num = block_num.min(self.head_block_num()?);
        if block_num <= self.last_irreversible {
            return Ok(());
        }
        let pending = self.clear_pending()?;
        self.db.store_mut().commit(i64::from(block_num));
        self.last_irreversible = block_num;
        debug!(block_num, "irreversible");
        self.replay_pending(pending);
        Ok(())
    }
}
