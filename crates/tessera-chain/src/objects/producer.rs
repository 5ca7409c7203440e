use serde::{Deserialize, Serialize};

use tessera_core::types::{AccountName, TimePoint};
use tessera_store::{desc, IndexKey, ObjectId};

use super::{chain_object, AccountObject};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ProducerObject {
    pub id: ObjectId,
    pub owner: AccountName,
    pub details: String,
    pub active: bool,
    pub created: TimePoint,
    /// Staked equity of all accounts voting for this producer.
    pub voting_power: i64,
    pub vote_count: u32,
    /// Voting power credited by activity reward claims naming this producer.
    pub accumulated_activity_stake: i64,
    pub total_blocks: u64,
}

impl ProducerObject {
    pub const BY_NAME: &'static str = "by_name";
    pub const BY_VOTING_POWER: &'static str = "by_voting_power";
}

chain_object!(ProducerObject, "producer" {
    unique ProducerObject::BY_NAME => |p| AccountObject::key(&p.owner),
    non_unique ProducerObject::BY_VOTING_POWER => |p| IndexKey::new().with(desc(p.voting_power)),
});

/// One ranked approval of `producer` by `account`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ProducerVoteObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub producer: AccountName,
    pub vote_rank: u16,
}

impl ProducerVoteObject {
    pub const BY_ACCOUNT_PRODUCER: &'static str = "by_account_producer";
    pub const BY_ACCOUNT_RANK: &'static str = "by_account_rank";
    pub const BY_PRODUCER: &'static str = "by_producer";

    pub fn key(account: &AccountName, producer: &AccountName) -> IndexKey {
        AccountObject::key(account).with(producer.as_str())
    }
}

chain_object!(ProducerVoteObject, "producer_vote" {
    unique ProducerVoteObject::BY_ACCOUNT_PRODUCER => |v| ProducerVoteObject::key(&v.account, &v.producer),
    unique ProducerVoteObject::BY_ACCOUNT_RANK => |v| AccountObject::key(&v.account).with(v.vote_rank),
    non_unique ProducerVoteObject::BY_PRODUCER => |v| AccountObject::key(&v.producer),
});
