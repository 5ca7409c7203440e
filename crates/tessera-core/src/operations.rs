//! Operations: the closed set of state transitions a transaction may carry,
//! and the virtual operations the engine records while applying them.
//!
//! Every payload implements [`OperationRules`]: a stateless `validate()` and
//! the authorities it requires. [`Operation`] ties the payloads into one sum
//! type whose [`OperationKind`] tag indexes the evaluator registry.

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_ACCOUNT_PRODUCER_VOTES, MAX_MEMO_SIZE, MAX_PERMLINK_LENGTH, MAX_RECURRING_TRANSFER_PAYMENTS,
    MAX_REQUEST_ID_LENGTH, MAX_TITLE_LENGTH, MIN_RECURRING_TRANSFER_INTERVAL, PERCENT_100,
    SYMBOL_COIN, SYMBOL_USD,
};
use crate::error::ValidationError;
use crate::types::{AccountName, Asset, Authority, AuthorityLevel, TimePoint, TimeSpan};

/// Accounts and levels an operation must be approved by.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredAuthorities {
    entries: Vec<(AccountName, AuthorityLevel)>,
}

impl RequiredAuthorities {
    pub fn require(&mut self, account: &AccountName, level: AuthorityLevel) {
        self.entries.push((account.clone(), level));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(AccountName, AuthorityLevel)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stateless rules shared by every operation payload.
pub trait OperationRules {
    /// Structural checks only. Never touches chain state.
    fn validate(&self) -> Result<(), ValidationError>;

    fn required_authorities(&self, auths: &mut RequiredAuthorities);
}

/// Links a payload type to its variant of [`Operation`].
pub trait OperationPayload: OperationRules + Sized {
    const KIND: OperationKind;

    fn from_operation(op: &Operation) -> Option<&Self>;
}

// ---- Shared validation helpers ----

fn positive(amount: &Asset) -> Result<(), ValidationError> {
    amount.symbol.validate()?;
    if amount.amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount.amount));
    }
    Ok(())
}

fn symbol_is(amount: &Asset, expected: &str) -> Result<(), ValidationError> {
    if amount.symbol.as_str() != expected {
        return Err(ValidationError::UnexpectedSymbol {
            expected: expected.to_string(),
            got: amount.symbol.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong { field, len: value.len(), max });
    }
    Ok(())
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

fn possible(authority: &Authority) -> Result<(), ValidationError> {
    authority.validate()?;
    if authority.weight_threshold == 0 || authority.is_impossible() {
        return Err(ValidationError::ImpossibleAuthority);
    }
    Ok(())
}

// ---- Payloads ----

/// Register a new account, paid for by `creator`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct AccountCreateOperation {
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub fee: Asset,
}

impl OperationRules for AccountCreateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.creator.validate()?;
        self.new_account_name.validate()?;
        possible(&self.owner)?;
        possible(&self.active)?;
        possible(&self.posting)?;
        symbol_is(&self.fee, SYMBOL_COIN)?;
        if self.fee.amount < 0 {
            return Err(ValidationError::NegativeAmount(self.fee.amount));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.creator, AuthorityLevel::Active);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl OperationRules for TransferOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.from.validate()?;
        self.to.validate()?;
        if self.from == self.to {
            return Err(ValidationError::SelfReference("transfer"));
        }
        positive(&self.amount)?;
        max_len("memo", &self.memo, MAX_MEMO_SIZE)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.from, AuthorityLevel::Active);
    }
}

/// `to` asks `from` for a payment. `requested == false` withdraws the request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TransferRequestOperation {
    pub to: AccountName,
    pub from: AccountName,
    pub amount: Asset,
    pub memo: String,
    pub request_id: String,
    pub requested: bool,
}

impl OperationRules for TransferRequestOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.to.validate()?;
        self.from.validate()?;
        if self.from == self.to {
            return Err(ValidationError::SelfReference("request a transfer"));
        }
        positive(&self.amount)?;
        non_empty("request_id", &self.request_id)?;
        max_len("request_id", &self.request_id, MAX_REQUEST_ID_LENGTH)?;
        max_len("memo", &self.memo, MAX_MEMO_SIZE)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.to, AuthorityLevel::Active);
    }
}

/// `from` pays (or rejects) a pending transfer request from `to`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TransferAcceptOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub request_id: String,
    pub accepted: bool,
}

impl OperationRules for TransferAcceptOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.from.validate()?;
        self.to.validate()?;
        non_empty("request_id", &self.request_id)?;
        max_len("request_id", &self.request_id, MAX_REQUEST_ID_LENGTH)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.from, AuthorityLevel::Active);
    }
}

/// Create, update or (with `active == false`) cancel a recurring transfer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TransferRecurringOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub transfer_id: String,
    pub memo: String,
    pub begin: TimePoint,
    pub interval: TimeSpan,
    pub payments: u32,
    /// Slide the schedule forward instead of skipping a payment when funds are short.
    pub extensible: bool,
    /// Cancel the whole schedule the first time funds are short.
    pub fill_or_kill: bool,
    pub active: bool,
}

impl OperationRules for TransferRecurringOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.from.validate()?;
        self.to.validate()?;
        if self.from == self.to {
            return Err(ValidationError::SelfReference("transfer"));
        }
        positive(&self.amount)?;
        non_empty("transfer_id", &self.transfer_id)?;
        max_len("transfer_id", &self.transfer_id, MAX_REQUEST_ID_LENGTH)?;
        max_len("memo", &self.memo, MAX_MEMO_SIZE)?;
        if self.interval < MIN_RECURRING_TRANSFER_INTERVAL {
            return Err(ValidationError::OutOfRange { field: "interval", value: self.interval.as_secs() });
        }
        if self.payments == 0 || self.payments > MAX_RECURRING_TRANSFER_PAYMENTS {
            return Err(ValidationError::OutOfRange { field: "payments", value: i64::from(self.payments) });
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.from, AuthorityLevel::Active);
    }
}

/// The recovery account proposes a new owner authority for a lost account.
/// A zero weight threshold cancels an existing request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct RequestAccountRecoveryOperation {
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
}

impl OperationRules for RequestAccountRecoveryOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.recovery_account.validate()?;
        self.account_to_recover.validate()?;
        self.new_owner_authority.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.recovery_account, AuthorityLevel::Active);
    }
}

/// Complete a recovery by proving a recent owner authority.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct RecoverAccountOperation {
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub recent_owner_authority: Authority,
}

impl OperationRules for RecoverAccountOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account_to_recover.validate()?;
        if self.new_owner_authority == self.recent_owner_authority {
            return Err(ValidationError::ConflictingFlags("new owner equals recent owner"));
        }
        possible(&self.new_owner_authority)?;
        possible(&self.recent_owner_authority)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account_to_recover, AuthorityLevel::Owner);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ChangeRecoveryAccountOperation {
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

impl OperationRules for ChangeRecoveryAccountOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account_to_recover.validate()?;
        self.new_recovery_account.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account_to_recover, AuthorityLevel::Owner);
    }
}

/// Schedule (or withdraw) the permanent loss of voting rights.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DeclineVotingRightsOperation {
    pub account: AccountName,
    pub declined: bool,
}

impl OperationRules for DeclineVotingRightsOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account, AuthorityLevel::Owner);
    }
}

/// Set or clear (`None`) the account that votes on this account's behalf.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct AccountUpdateProxyOperation {
    pub account: AccountName,
    pub proxy: Option<AccountName>,
}

impl OperationRules for AccountUpdateProxyOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account.validate()?;
        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
            if proxy == &self.account {
                return Err(ValidationError::SelfReference("proxy"));
            }
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account, AuthorityLevel::Active);
    }
}

/// Register as, or update, a block producer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ProducerUpdateOperation {
    pub owner: AccountName,
    pub details: String,
    pub active: bool,
}

impl OperationRules for ProducerUpdateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.owner.validate()?;
        max_len("details", &self.details, MAX_MEMO_SIZE)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.owner, AuthorityLevel::Active);
    }
}

/// Add, re-rank or (with `approved == false`) remove a producer vote.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct AccountProducerVoteOperation {
    pub account: AccountName,
    pub producer: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl OperationRules for AccountProducerVoteOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account.validate()?;
        self.producer.validate()?;
        if self.approved && (self.vote_rank == 0 || self.vote_rank > MAX_ACCOUNT_PRODUCER_VOTES) {
            return Err(ValidationError::OutOfRange { field: "vote_rank", value: i64::from(self.vote_rank) });
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account, AuthorityLevel::Active);
    }
}

/// Move liquid funds of `from` into the staked balance of `to`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct StakeAssetOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl OperationRules for StakeAssetOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.from.validate()?;
        self.to.validate()?;
        positive(&self.amount)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.from, AuthorityLevel::Active);
    }
}

/// Publish or edit a post. Posts are identified by `(author, permlink)`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct CommentOperation {
    pub author: AccountName,
    pub permlink: String,
    pub parent_author: Option<AccountName>,
    pub parent_permlink: String,
    pub title: String,
    pub body: String,
    pub max_accepted_payout: Asset,
    pub allow_rewards: bool,
}

impl OperationRules for CommentOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.author.validate()?;
        if let Some(parent) = &self.parent_author {
            parent.validate()?;
            non_empty("parent_permlink", &self.parent_permlink)?;
        }
        non_empty("permlink", &self.permlink)?;
        max_len("permlink", &self.permlink, MAX_PERMLINK_LENGTH)?;
        max_len("parent_permlink", &self.parent_permlink, MAX_PERMLINK_LENGTH)?;
        max_len("title", &self.title, MAX_TITLE_LENGTH)?;
        non_empty("body", &self.body)?;
        symbol_is(&self.max_accepted_payout, SYMBOL_USD)?;
        if self.max_accepted_payout.amount < 0 {
            return Err(ValidationError::NegativeAmount(self.max_accepted_payout.amount));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.author, AuthorityLevel::Posting);
    }
}

/// Vote on a post with a signed weight in basis points.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct VoteOperation {
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub weight: i16,
}

impl OperationRules for VoteOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.voter.validate()?;
        self.author.validate()?;
        non_empty("permlink", &self.permlink)?;
        let limit = PERCENT_100 as i64;
        if !(-limit..=limit).contains(&i64::from(self.weight)) {
            return Err(ValidationError::OutOfRange { field: "weight", value: i64::from(self.weight) });
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.voter, AuthorityLevel::Posting);
    }
}

/// Claim the daily activity reward, crediting activity stake to `producer`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ActivityRewardOperation {
    pub account: AccountName,
    pub producer: AccountName,
}

impl OperationRules for ActivityRewardOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account.validate()?;
        self.producer.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account, AuthorityLevel::Posting);
    }
}

/// Move earned rewards into the liquid balance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ClaimRewardBalanceOperation {
    pub account: AccountName,
    pub reward: Asset,
}

impl OperationRules for ClaimRewardBalanceOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.account.validate()?;
        positive(&self.reward)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.require(&self.account, AuthorityLevel::Posting);
    }
}

// ---- The operation sum type ----

/// Every state transition a transaction can carry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Operation {
    AccountCreate(AccountCreateOperation),
    Transfer(TransferOperation),
    TransferRequest(TransferRequestOperation),
    TransferAccept(TransferAcceptOperation),
    TransferRecurring(TransferRecurringOperation),
    RequestAccountRecovery(RequestAccountRecoveryOperation),
    RecoverAccount(RecoverAccountOperation),
    ChangeRecoveryAccount(ChangeRecoveryAccountOperation),
    DeclineVotingRights(DeclineVotingRightsOperation),
    AccountUpdateProxy(AccountUpdateProxyOperation),
    ProducerUpdate(ProducerUpdateOperation),
    AccountProducerVote(AccountProducerVoteOperation),
    StakeAsset(StakeAssetOperation),
    Comment(CommentOperation),
    Vote(VoteOperation),
    ActivityReward(ActivityRewardOperation),
    ClaimRewardBalance(ClaimRewardBalanceOperation),
}

macro_rules! operations {
    ($($variant:ident($payload:ident) = $name:literal),* $(,)?) => {
        /// Tag of an [`Operation`] variant, used as the evaluator registry index.
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(rename_all = "snake_case")]
        #[repr(u8)]
        pub enum OperationKind {
            $($variant),*
        }

        impl OperationKind {
            pub const ALL: &'static [OperationKind] = &[$(OperationKind::$variant),*];
            pub const COUNT: usize = Self::ALL.len();

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(OperationKind::$variant => $name),*
                }
            }
        }

        impl Operation {
            pub fn kind(&self) -> OperationKind {
                match self {
                    $(Operation::$variant(_) => OperationKind::$variant),*
                }
            }
        }

        impl OperationRules for Operation {
            fn validate(&self) -> Result<(), ValidationError> {
                match self {
                    $(Operation::$variant(op) => op.validate()),*
                }
            }

            fn required_authorities(&self, auths: &mut RequiredAuthorities) {
                match self {
                    $(Operation::$variant(op) => op.required_authorities(auths)),*
                }
            }
        }

        $(
            impl OperationPayload for $payload {
                const KIND: OperationKind = OperationKind::$variant;

                fn from_operation(op: &Operation) -> Option<&Self> {
                    match op {
                        Operation::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$payload> for Operation {
                fn from(op: $payload) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

operations! {
    AccountCreate(AccountCreateOperation) = "account_create",
    Transfer(TransferOperation) = "transfer",
    TransferRequest(TransferRequestOperation) = "transfer_request",
    TransferAccept(TransferAcceptOperation) = "transfer_accept",
    TransferRecurring(TransferRecurringOperation) = "transfer_recurring",
    RequestAccountRecovery(RequestAccountRecoveryOperation) = "request_account_recovery",
    RecoverAccount(RecoverAccountOperation) = "recover_account",
    ChangeRecoveryAccount(ChangeRecoveryAccountOperation) = "change_recovery_account",
    DeclineVotingRights(DeclineVotingRightsOperation) = "decline_voting_rights",
    AccountUpdateProxy(AccountUpdateProxyOperation) = "account_update_proxy",
    ProducerUpdate(ProducerUpdateOperation) = "producer_update",
    AccountProducerVote(AccountProducerVoteOperation) = "account_producer_vote",
    StakeAsset(StakeAssetOperation) = "stake_asset",
    Comment(CommentOperation) = "comment",
    Vote(VoteOperation) = "vote",
    ActivityReward(ActivityRewardOperation) = "activity_reward",
    ClaimRewardBalance(ClaimRewardBalanceOperation) = "claim_reward_balance",
}

// ---- Virtual operations ----

/// Effects generated by the engine itself. Recorded for history, never
/// submitted or validated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VirtualOperation {
    AuthorReward { author: AccountName, permlink: String, reward: Asset },
    ActivityRewardPaid { account: AccountName, producer: AccountName, reward: Asset },
    ProducerReward { producer: AccountName, reward: Asset },
    FillRecurringTransfer { from: AccountName, to: AccountName, amount: Asset, transfer_id: String, payments_remaining: u32 },
    RecurringTransferSkipped { from: AccountName, to: AccountName, amount: Asset, transfer_id: String, cancelled: bool },
    TransferRequestExpired { from: AccountName, to: AccountName, request_id: String },
    AccountRecoveryExpired { account: AccountName },
    ChangeRecoveryAccountApplied { account: AccountName, recovery_account: AccountName },
    VotingRightsDeclined { account: AccountName },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn transfer(from: &str, to: &str, amount: i64) -> TransferOperation {
        TransferOperation { from: name(from), to: name(to), amount: Asset::coin(amount), memo: String::new() }
    }

    fn recurring() -> TransferRecurringOperation {
        TransferRecurringOperation {
            from: name("alice"),
            to: name("bob"),
            amount: Asset::coin(100),
            transfer_id: "rent".into(),
            memo: String::new(),
            begin: TimePoint::from_secs(1_000),
            interval: TimeSpan::days(7),
            payments: 4,
            extensible: false,
            fill_or_kill: false,
            active: true,
        }
    }

    #[test]
    fn kinds_index_in_declaration_order() {
        assert_eq!(OperationKind::COUNT, 17);
        for (i, kind) in OperationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        let op: Operation = transfer("alice", "bob", 1).into();
        assert_eq!(op.kind(), OperationKind::Transfer);
        assert_eq!(op.kind().name(), "transfer");
    }

    #[test]
    fn payload_extraction_matches_variant() {
        let op: Operation = transfer("alice", "bob", 1).into();
        assert!(TransferOperation::from_operation(&op).is_some());
        assert!(VoteOperation::from_operation(&op).is_none());
    }

    #[test]
    fn self_transfer_rejected() {
        assert_eq!(
            transfer("alice", "alice", 5).validate(),
            Err(ValidationError::SelfReference("transfer"))
        );
    }

    #[test]
    fn non_positive_transfer_rejected() {
        assert_eq!(transfer("alice", "bob", 0).validate(), Err(ValidationError::NonPositiveAmount(0)));
    }

    #[test]
    fn recurring_rules() {
        assert!(recurring().validate().is_ok());

        let mut op = recurring();
        op.extensible = true;
        op.fill_or_kill = true;
        assert!(op.validate().is_ok());

        let mut op = recurring();
        op.interval = TimeSpan::hours(1);
        assert!(matches!(op.validate(), Err(ValidationError::OutOfRange { field: "interval", .. })));

        let mut op = recurring();
        op.payments = 0;
        assert!(matches!(op.validate(), Err(ValidationError::OutOfRange { field: "payments", .. })));
    }

    #[test]
    fn comment_requires_body_and_usd_cap() {
        let mut op = CommentOperation {
            author: name("alice"),
            permlink: "hello".into(),
            parent_author: None,
            parent_permlink: String::new(),
            title: "Hello".into(),
            body: "world".into(),
            max_accepted_payout: Asset::usd(1_000),
            allow_rewards: true,
        };
        assert!(op.validate().is_ok());
        op.body.clear();
        assert_eq!(op.validate(), Err(ValidationError::EmptyField("body")));
        op.body = "x".into();
        op.max_accepted_payout = Asset::coin(1);
        assert!(matches!(op.validate(), Err(ValidationError::UnexpectedSymbol { .. })));
    }

    #[test]
    fn vote_weight_bounds() {
        let mut op = VoteOperation { voter: name("bob"), author: name("alice"), permlink: "p".into(), weight: 10_000 };
        assert!(op.validate().is_ok());
        op.weight = 10_001;
        assert!(op.validate().is_err());
        op.weight = -10_000;
        assert!(op.validate().is_ok());
    }

    #[test]
    fn recover_account_requires_distinct_authorities() {
        let op = RecoverAccountOperation {
            account_to_recover: name("alice"),
            new_owner_authority: Authority::from_key("K1"),
            recent_owner_authority: Authority::from_key("K1"),
        };
        assert!(matches!(op.validate(), Err(ValidationError::ConflictingFlags(_))));
    }

    #[test]
    fn required_authorities_per_operation() {
        let mut auths = RequiredAuthorities::default();
        Operation::from(DeclineVotingRightsOperation { account: name("alice"), declined: true })
            .required_authorities(&mut auths);
        Operation::from(transfer("bob", "carol", 1)).required_authorities(&mut auths);
        let got: Vec<_> = auths.iter().cloned().collect();
        assert_eq!(
            got,
            vec![(name("alice"), AuthorityLevel::Owner), (name("bob"), AuthorityLevel::Active)]
        );
    }

    #[test]
    fn json_shape_is_tagged() {
        let op: Operation = transfer("alice", "bob", 3).into();
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "transfer");
        assert_eq!(json["value"]["amount"]["amount"], 3);
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
