//! Node composition around a single [`Chain`].
//!
//! All mutation goes through one write lock; queries share a read lock and
//! see whole blocks only. The block-applied callback runs after the write
//! lock is released, so subscribers may query the node.

use std::panic::{self, AssertUnwindSafe};

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use tessera_chain::Chain;
use tessera_core::block::{AppliedBlock, SignedBlock, SignedTransaction};

use crate::config::NodeConfig;
use crate::error::NodeError;

pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Notified once per applied block. Returning an error or panicking ends the
/// subscription.
pub type BlockAppliedCallback = Box<dyn FnMut(&AppliedBlock) -> Result<(), CallbackError> + Send>;

pub struct Node {
    chain: RwLock<Chain>,
    block_applied: Mutex<Option<BlockAppliedCallback>>,
}

impl Node {
    pub fn new(chain: Chain) -> Self {
        Self { chain: RwLock::new(chain), block_applied: Mutex::new(None) }
    }

    /// A node at the configured genesis state.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let chain = Chain::new(config.chain.clone(), &config.genesis)?;
        info!(
            producer = %config.genesis.initial_producer,
            accounts = config.genesis.accounts.len(),
            "node initialised"
        );
        Ok(Self::new(chain))
    }

    /// Run `f` against one consistent view of the chain.
    ///
    /// The read lock is held for the whole closure and released on every exit
    /// path, unwinding included. `f` must not call back into the node's write
    /// methods.
    pub fn with_read_lock<R>(&self, f: impl FnOnce(&Chain) -> R) -> R {
        let chain = self.chain.read();
        f(&chain)
    }

    /// Replace the block-applied subscription.
    ///
    /// The callback must not register a new callback itself.
    pub fn set_block_applied_callback(
        &self,
        callback: impl FnMut(&AppliedBlock) -> Result<(), CallbackError> + Send + 'static,
    ) {
        *self.block_applied.lock() = Some(Box::new(callback));
    }

    pub fn has_block_applied_callback(&self) -> bool {
        self.block_applied.lock().is_some()
    }

    // ---- Writes ----

    pub fn push_block(&self, block: &SignedBlock) -> Result<AppliedBlock, NodeError> {
        let applied = self.chain.write().apply_block(block)?;
        self.notify_block_applied(&applied);
        Ok(applied)
    }

    /// Apply `tx` to the pending state under the approvals it carries.
    pub fn push_transaction(&self, tx: SignedTransaction) -> Result<(), NodeError> {
        let auth = tx.authorization();
        self.chain.write().push_transaction(tx, auth)?;
        Ok(())
    }

    pub fn pop_block(&self) -> Result<(), NodeError> {
        self.chain.write().pop_block()?;
        Ok(())
    }

    pub fn set_irreversible(&self, block_num: u32) -> Result<(), NodeError> {
        self.chain.write().set_irreversible(block_num)?;
        Ok(())
    }

    fn notify_block_applied(&self, applied: &AppliedBlock) {
        let mut slot = self.block_applied.lock();
        let Some(callback) = slot.as_mut() else {
            return;
        };
        let reason = match panic::catch_unwind(AssertUnwindSafe(|| callback(applied))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "callback panicked".to_string(),
        };
        warn!(block_num = applied.block_num, %reason, "dropping block-applied subscription");
        *slot = None;
    }
}
