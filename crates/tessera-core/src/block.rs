//! Transactions, blocks, and the authorization context they are applied under.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EvaluationError, ValidationError};
use crate::merkle::merkle_root;
use crate::operations::{Operation, OperationRules, RequiredAuthorities};
use crate::types::{AccountName, AuthorityLevel, Hash256, TimePoint};

fn sha256_encoded<T: bincode::Encode>(value: &T) -> Result<Hash256, ValidationError> {
    let bytes = bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| ValidationError::Serialization(e.to_string()))?;
    Ok(Hash256(Sha256::digest(&bytes).into()))
}

/// An ordered list of operations applied atomically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    /// Low 16 bits of a recent block number (replay scoping).
    pub ref_block_num: u16,
    pub expiration: TimePoint,
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// SHA-256 of the canonical bincode encoding.
    pub fn id(&self) -> Result<Hash256, ValidationError> {
        sha256_encoded(self)
    }

    /// Stateless checks over every operation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.operations.is_empty() {
            return Err(ValidationError::EmptyTransaction);
        }
        self.operations.iter().try_for_each(|op| op.validate())
    }

    pub fn required_authorities(&self) -> RequiredAuthorities {
        let mut auths = RequiredAuthorities::default();
        for op in &self.operations {
            op.required_authorities(&mut auths);
        }
        auths
    }
}

/// An account approval already verified by the signature layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Approval {
    pub account: AccountName,
    pub level: AuthorityLevel,
}

/// A transaction together with the approvals its signatures established.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub approvals: Vec<Approval>,
}

impl SignedTransaction {
    pub fn id(&self) -> Result<Hash256, ValidationError> {
        self.transaction.id()
    }

    pub fn authorization(&self) -> AuthorizationContext {
        let mut ctx = AuthorizationContext::default();
        for approval in &self.approvals {
            ctx.insert(approval.account.clone(), approval.level);
        }
        ctx
    }
}

/// Highest authority level each account has approved with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationContext {
    approvals: BTreeMap<AccountName, AuthorityLevel>,
}

impl AuthorizationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`AuthorizationContext::insert`].
    pub fn with(mut self, account: AccountName, level: AuthorityLevel) -> Self {
        self.insert(account, level);
        self
    }

    /// Record an approval, keeping the highest level seen per account.
    pub fn insert(&mut self, account: AccountName, level: AuthorityLevel) {
        let entry = self.approvals.entry(account).or_insert(level);
        if level > *entry {
            *entry = level;
        }
    }

    /// Owner approval satisfies active and posting; active satisfies posting.
    pub fn satisfies(&self, account: &AccountName, level: AuthorityLevel) -> bool {
        self.approvals.get(account).is_some_and(|approved| *approved >= level)
    }

    /// # Errors
    ///
    /// [`EvaluationError::MissingAuthority`] for the first unmet requirement.
    pub fn check(&self, required: &RequiredAuthorities) -> Result<(), EvaluationError> {
        for (account, level) in required.iter() {
            if !self.satisfies(account, *level) {
                return Err(EvaluationError::MissingAuthority { account: account.to_string(), level: *level });
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct BlockHeader {
    pub previous: Hash256,
    pub timestamp: TimePoint,
    pub producer: AccountName,
    pub transaction_merkle_root: Hash256,
}

impl BlockHeader {
    pub fn block_num(&self) -> u32 {
        self.previous.block_num() + 1
    }

    /// SHA-256 of the header with the block number stamped in front.
    pub fn id(&self) -> Result<Hash256, ValidationError> {
        Ok(sha256_encoded(self)?.with_block_num(self.block_num()))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct SignedBlock {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl SignedBlock {
    pub fn block_num(&self) -> u32 {
        self.header.block_num()
    }

    pub fn id(&self) -> Result<Hash256, ValidationError> {
        self.header.id()
    }

    /// Merkle root over the ids of the contained transactions.
    pub fn compute_merkle_root(&self) -> Result<Hash256, ValidationError> {
        let ids = self
            .transactions
            .iter()
            .map(SignedTransaction::id)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(merkle_root(&ids))
    }
}

/// Header summary handed to block-applied subscribers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AppliedBlock {
    pub block_num: u32,
    pub block_id: Hash256,
    pub header: BlockHeader,
    pub transaction_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::TransferOperation;
    use crate::types::Asset;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn tx(amount: i64) -> Transaction {
        Transaction {
            ref_block_num: 0,
            expiration: TimePoint::from_secs(60),
            operations: vec![
                TransferOperation { from: name("alice"), to: name("bob"), amount: Asset::coin(amount), memo: String::new() }
                    .into(),
            ],
        }
    }

    #[test]
    fn transaction_id_is_content_addressed() {
        assert_eq!(tx(1).id().unwrap(), tx(1).id().unwrap());
        assert_ne!(tx(1).id().unwrap(), tx(2).id().unwrap());
    }

    #[test]
    fn empty_transaction_rejected() {
        let mut t = tx(1);
        t.operations.clear();
        assert_eq!(t.validate(), Err(ValidationError::EmptyTransaction));
    }

    #[test]
    fn block_id_carries_block_number() {
        let header = BlockHeader {
            previous: Hash256::ZERO.with_block_num(41),
            timestamp: TimePoint::from_secs(10),
            producer: name("genesis"),
            transaction_merkle_root: Hash256::ZERO,
        };
        assert_eq!(header.block_num(), 42);
        assert_eq!(header.id().unwrap().block_num(), 42);
    }

    #[test]
    fn authority_levels_imply_lower_levels() {
        let ctx = AuthorizationContext::new()
            .with(name("alice"), AuthorityLevel::Owner)
            .with(name("bob"), AuthorityLevel::Posting)
            .with(name("alice"), AuthorityLevel::Posting);
        assert!(ctx.satisfies(&name("alice"), AuthorityLevel::Active));
        assert!(ctx.satisfies(&name("bob"), AuthorityLevel::Posting));
        assert!(!ctx.satisfies(&name("bob"), AuthorityLevel::Active));
        assert!(!ctx.satisfies(&name("carol"), AuthorityLevel::Posting));
    }

    #[test]
    fn check_reports_missing_authority() {
        let ctx = AuthorizationContext::new().with(name("bob"), AuthorityLevel::Active);
        let err = ctx.check(&tx(1).required_authorities()).unwrap_err();
        assert_eq!(err, EvaluationError::MissingAuthority { account: "alice".into(), level: AuthorityLevel::Active });
    }

    #[test]
    fn merkle_root_changes_with_transactions() {
        let mut block = SignedBlock {
            header: BlockHeader {
                previous: Hash256::ZERO,
                timestamp: TimePoint::from_secs(1),
                producer: name("genesis"),
                transaction_merkle_root: Hash256::ZERO,
            },
            transactions: vec![],
        };
        assert_eq!(block.compute_merkle_root().unwrap(), Hash256::ZERO);
        block.transactions.push(SignedTransaction { transaction: tx(1), approvals: vec![] });
        assert_ne!(block.compute_merkle_root().unwrap(), Hash256::ZERO);
    }
}
