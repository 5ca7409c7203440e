use serde::{Deserialize, Serialize};

use tessera_core::types::{AccountName, Authority, TimePoint};
use tessera_store::{IndexKey, ObjectId};

use super::{chain_object, AccountObject};

/// Pending owner-authority replacement proposed by the recovery account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountRecoveryRequestObject {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expires: TimePoint,
}

impl AccountRecoveryRequestObject {
    pub const BY_ACCOUNT: &'static str = "by_account";
    pub const BY_EXPIRATION: &'static str = "by_expiration";
}

chain_object!(AccountRecoveryRequestObject, "account_recovery_request" {
    unique AccountRecoveryRequestObject::BY_ACCOUNT => |r| AccountObject::key(&r.account_to_recover),
    non_unique AccountRecoveryRequestObject::BY_EXPIRATION => |r| IndexKey::new().with(r.expires.as_micros()),
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ChangeRecoveryAccountRequestObject {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub recovery_account: AccountName,
    pub effective_on: TimePoint,
}

impl ChangeRecoveryAccountRequestObject {
    pub const BY_ACCOUNT: &'static str = "by_account";
    pub const BY_EFFECTIVE_DATE: &'static str = "by_effective_date";
}

chain_object!(ChangeRecoveryAccountRequestObject, "change_recovery_account_request" {
    unique ChangeRecoveryAccountRequestObject::BY_ACCOUNT => |r| AccountObject::key(&r.account_to_recover),
    non_unique ChangeRecoveryAccountRequestObject::BY_EFFECTIVE_DATE =>
        |r| IndexKey::new().with(r.effective_on.as_micros()),
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct DeclineVotingRightsRequestObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub effective_date: TimePoint,
}

impl DeclineVotingRightsRequestObject {
    pub const BY_ACCOUNT: &'static str = "by_account";
    pub const BY_EFFECTIVE_DATE: &'static str = "by_effective_date";
}

chain_object!(DeclineVotingRightsRequestObject, "decline_voting_rights_request" {
    unique DeclineVotingRightsRequestObject::BY_ACCOUNT => |r| AccountObject::key(&r.account),
    non_unique DeclineVotingRightsRequestObject::BY_EFFECTIVE_DATE =>
        |r| IndexKey::new().with(r.effective_date.as_micros()),
});
