use serde::{Deserialize, Serialize};

use tessera_core::types::{AccountName, Authority, MembershipTier, TimePoint};
use tessera_store::{desc, IndexKey, ObjectId};

use super::chain_object;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountObject {
    pub id: ObjectId,
    pub name: AccountName,
    pub created: TimePoint,
    /// Account allowed to start an owner recovery. `None` means nobody can.
    pub recovery_account: Option<AccountName>,
    pub proxy: Option<AccountName>,
    pub can_vote: bool,
    pub producer_vote_count: u16,
    pub last_activity_reward: TimePoint,
    pub membership: MembershipTier,
}

impl AccountObject {
    pub const BY_NAME: &'static str = "by_name";
    pub const BY_PROXY: &'static str = "by_proxy";

    pub fn key(name: &AccountName) -> IndexKey {
        IndexKey::new().with(name.as_str())
    }
}

chain_object!(AccountObject, "account" {
    unique AccountObject::BY_NAME => |a| AccountObject::key(&a.name),
    non_unique AccountObject::BY_PROXY => |a| IndexKey::new().with(a.proxy.as_ref().map_or("", |p| p.as_str())),
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountAuthorityObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub last_owner_update: TimePoint,
}

impl AccountAuthorityObject {
    pub const BY_ACCOUNT: &'static str = "by_account";
}

chain_object!(AccountAuthorityObject, "account_authority" {
    unique AccountAuthorityObject::BY_ACCOUNT => |a| AccountObject::key(&a.account),
});

/// A previous owner authority, usable to prove ownership during recovery
/// until `last_valid_time + owner_auth_recovery_period`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct OwnerAuthorityHistoryObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub previous_owner_authority: Authority,
    pub last_valid_time: TimePoint,
}

impl OwnerAuthorityHistoryObject {
    /// Most recent entry first within one account.
    pub const BY_ACCOUNT: &'static str = "by_account";
    pub const BY_LAST_VALID: &'static str = "by_last_valid";
}

chain_object!(OwnerAuthorityHistoryObject, "owner_authority_history" {
    non_unique OwnerAuthorityHistoryObject::BY_ACCOUNT =>
        |h| AccountObject::key(&h.account).with(desc(h.last_valid_time.as_micros())),
    non_unique OwnerAuthorityHistoryObject::BY_LAST_VALID => |h| IndexKey::new().with(h.last_valid_time.as_micros()),
});
