use serde::{Deserialize, Serialize};

use tessera_core::constants::PARTICIPATION_WINDOW;
use tessera_core::reward::RewardCurve;
use tessera_core::types::{AccountName, Asset, Hash256, TimePoint};
use tessera_store::{IndexKey, ObjectId};

use super::chain_object;

/// Chain-wide head state. Exactly one instance, id 0.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DynamicGlobalPropertyObject {
    pub id: ObjectId,
    pub head_block_number: u32,
    pub head_block_id: Hash256,
    pub time: TimePoint,
    pub current_producer: AccountName,
    /// Absolute slot number since genesis, counting missed slots.
    pub current_aslot: u64,
    /// One bit per recent slot, most recent in the lowest bit.
    pub recent_slots_filled: u128,
    /// Number of set bits in `recent_slots_filled`.
    pub participation_count: u8,
    /// Core coin in existence, mirroring the coin's supply counter.
    pub current_supply: Asset,
}

impl Default for DynamicGlobalPropertyObject {
    fn default() -> Self {
        Self {
            id: 0,
            head_block_number: 0,
            head_block_id: Hash256::ZERO,
            time: TimePoint::EPOCH,
            current_producer: AccountName::default(),
            current_aslot: 0,
            recent_slots_filled: u128::MAX,
            participation_count: PARTICIPATION_WINDOW,
            current_supply: Asset::coin(0),
        }
    }
}

chain_object!(DynamicGlobalPropertyObject, "dynamic_global_property" {});

/// Content and activity reward pools. Exactly one instance, id 0.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RewardFundObject {
    pub id: ObjectId,
    pub content_reward_balance: Asset,
    pub activity_reward_balance: Asset,
    /// Decaying sum of content claim weights.
    pub recent_content_claims: u128,
    /// Decaying sum of activity claim shares.
    pub recent_activity_claims: u128,
    pub last_content_update: TimePoint,
    pub last_activity_update: TimePoint,
    pub content_constant: u128,
    pub author_reward_curve: RewardCurve,
}

impl Default for RewardFundObject {
    fn default() -> Self {
        Self {
            id: 0,
            content_reward_balance: Asset::coin(0),
            activity_reward_balance: Asset::coin(0),
            recent_content_claims: 0,
            recent_activity_claims: 0,
            last_content_update: TimePoint::EPOCH,
            last_activity_update: TimePoint::EPOCH,
            content_constant: 0,
            author_reward_curve: RewardCurve::default(),
        }
    }
}

chain_object!(RewardFundObject, "reward_fund" {});

/// Id of an applied transaction, kept until it expires to reject replays.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct TransactionObject {
    pub id: ObjectId,
    pub trx_id: Hash256,
    pub expiration: TimePoint,
}

impl TransactionObject {
    pub const BY_TRX_ID: &'static str = "by_trx_id";
    pub const BY_EXPIRATION: &'static str = "by_expiration";

    pub fn key(trx_id: &Hash256) -> IndexKey {
        IndexKey::new().with(&trx_id.as_bytes()[..])
    }
}

chain_object!(TransactionObject, "transaction" {
    unique TransactionObject::BY_TRX_ID => |t| TransactionObject::key(&t.trx_id),
    non_unique TransactionObject::BY_EXPIRATION => |t| IndexKey::new().with(t.expiration.as_micros()),
});
