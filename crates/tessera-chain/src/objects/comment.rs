use serde::{Deserialize, Serialize};

use tessera_core::types::{AccountName, Asset, TimePoint};
use tessera_store::{IndexKey, ObjectId};

use super::{chain_object, AccountObject};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct CommentObject {
    pub id: ObjectId,
    pub author: AccountName,
    pub permlink: String,
    pub parent_author: Option<AccountName>,
    pub parent_permlink: String,
    pub title: String,
    pub body: String,
    pub created: TimePoint,
    pub last_update: TimePoint,
    /// Sum of signed vote reward shares.
    pub net_reward: i64,
    pub net_votes: i32,
    pub cashouts_received: u32,
    /// [`TimePoint::MAX`] once the decay window is exhausted.
    pub next_cashout: TimePoint,
    pub max_accepted_payout: Asset,
    pub allow_rewards: bool,
    /// Total coin paid to the author so far.
    pub total_payout: i64,
}

impl CommentObject {
    pub const BY_PERMLINK: &'static str = "by_permlink";
    pub const BY_CASHOUT_TIME: &'static str = "by_cashout_time";

    pub fn key(author: &AccountName, permlink: &str) -> IndexKey {
        AccountObject::key(author).with(permlink)
    }
}

chain_object!(CommentObject, "comment" {
    unique CommentObject::BY_PERMLINK => |c| CommentObject::key(&c.author, &c.permlink),
    non_unique CommentObject::BY_CASHOUT_TIME => |c| IndexKey::new().with(c.next_cashout.as_micros()),
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct CommentVoteObject {
    pub id: ObjectId,
    pub voter: AccountName,
    pub comment: ObjectId,
    pub weight: i16,
    /// Signed reward shares this vote contributed to the comment.
    pub reward_shares: i64,
    pub last_update: TimePoint,
}

impl CommentVoteObject {
    pub const BY_COMMENT_VOTER: &'static str = "by_comment_voter";
    pub const BY_VOTER: &'static str = "by_voter";

    pub fn key(comment: ObjectId, voter: &AccountName) -> IndexKey {
        IndexKey::new().with(comment).with(voter.as_str())
    }
}

chain_object!(CommentVoteObject, "comment_vote" {
    unique CommentVoteObject::BY_COMMENT_VOTER => |v| CommentVoteObject::key(v.comment, &v.voter),
    non_unique CommentVoteObject::BY_VOTER => |v| AccountObject::key(&v.voter),
});
