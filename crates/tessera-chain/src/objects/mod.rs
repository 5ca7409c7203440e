//! Chain state objects and their secondary indices.
//!
//! Every object lives in its own table of the [`tessera_store::ObjectDatabase`].
//! Index names are associated constants on each type so lookups cannot drift
//! from the declarations.

/// Implement [`tessera_store::Object`] for a struct with an `id` field.
macro_rules! chain_object {
    ($ty:ident, $name:literal { $($kind:ident $index:path => |$o:ident| $key:expr),* $(,)? }) => {
        impl tessera_store::Object for $ty {
            const TYPE_NAME: &'static str = $name;

            fn id(&self) -> tessera_store::ObjectId {
                self.id
            }

            fn set_id(&mut self, id: tessera_store::ObjectId) {
                self.id = id;
            }

            fn indices() -> Vec<tessera_store::IndexSpec<Self>> {
                vec![$(tessera_store::IndexSpec::<Self>::$kind($index, |$o: &$ty| $key)),*]
            }
        }
    };
}
pub(crate) use chain_object;

mod account;
mod balance;
mod comment;
mod global;
mod producer;
mod recovery;
mod transfer;

pub use account::{AccountAuthorityObject, AccountObject, OwnerAuthorityHistoryObject};
pub use balance::{AccountBalanceObject, AssetDynamicDataObject};
pub use comment::{CommentObject, CommentVoteObject};
pub use global::{DynamicGlobalPropertyObject, RewardFundObject, TransactionObject};
pub use producer::{ProducerObject, ProducerVoteObject};
pub use recovery::{AccountRecoveryRequestObject, ChangeRecoveryAccountRequestObject, DeclineVotingRightsRequestObject};
pub use transfer::{RecurringTransferObject, TransferRequestObject};

use tessera_store::{ObjectDatabase, StoreError};

/// Register a table for every chain object type.
pub fn register_tables(db: &mut ObjectDatabase) -> Result<(), StoreError> {
    db.add_table::<DynamicGlobalPropertyObject>()?;
    db.add_table::<RewardFundObject>()?;
    db.add_table::<TransactionObject>()?;
    db.add_table::<AccountObject>()?;
    db.add_table::<AccountAuthorityObject>()?;
    db.add_table::<OwnerAuthorityHistoryObject>()?;
    db.add_table::<AccountBalanceObject>()?;
    db.add_table::<AssetDynamicDataObject>()?;
    db.add_table::<AccountRecoveryRequestObject>()?;
    db.add_table::<ChangeRecoveryAccountRequestObject>()?;
    db.add_table::<DeclineVotingRightsRequestObject>()?;
    db.add_table::<TransferRequestObject>()?;
    db.add_table::<RecurringTransferObject>()?;
    db.add_table::<ProducerObject>()?;
    db.add_table::<ProducerVoteObject>()?;
    db.add_table::<CommentObject>()?;
    db.add_table::<CommentVoteObject>()?;
    Ok(())
}
