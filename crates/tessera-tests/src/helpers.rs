//! Shared helpers for scenario tests.

use std::sync::Arc;

use tessera_chain::{GenesisAccount, GenesisConfig};
use tessera_core::block::{AppliedBlock, Approval, BlockHeader, SignedBlock, SignedTransaction, Transaction};
use tessera_core::constants::BLOCK_INTERVAL;
use tessera_core::merkle::merkle_root;
use tessera_core::operations::Operation;
use tessera_core::types::{AccountName, AuthorityLevel, Hash256, TimePoint, TimeSpan};
use tessera_node_lib::{DatabaseApi, Node, NodeConfig, NodeError};

pub const PRODUCER: &str = "genesis";

pub fn name(s: &str) -> AccountName {
    AccountName::new(s).unwrap()
}

/// Genesis account with liquid and staked COIN in base units.
pub fn account(name_str: &str, liquid: i64, staked: i64) -> GenesisAccount {
    GenesisAccount { name: name(name_str), key: None, liquid, staked }
}

/// A node plus its query API.
pub struct TestNet {
    pub node: Arc<Node>,
    pub api: DatabaseApi,
}

impl TestNet {
    pub fn new(accounts: Vec<GenesisAccount>) -> Self {
        let config = NodeConfig { genesis: GenesisConfig { accounts, ..GenesisConfig::default() }, ..NodeConfig::default() };
        let node = Arc::new(Node::from_config(&config).unwrap());
        let api = DatabaseApi::new(Arc::clone(&node));
        Self { node, api }
    }

    pub fn head_time(&self) -> TimePoint {
        self.api.get_head_info().unwrap().head_block_time
    }

    pub fn head_num(&self) -> u32 {
        self.api.get_head_info().unwrap().head_block_num
    }

    /// `operations` approved at active level by every account in `signers`.
    pub fn tx(&self, operations: Vec<Operation>, signers: &[&str]) -> SignedTransaction {
        let approvals: Vec<(&str, AuthorityLevel)> = signers.iter().map(|s| (*s, AuthorityLevel::Active)).collect();
        self.signed(operations, &approvals)
    }

    pub fn signed(&self, operations: Vec<Operation>, approvals: &[(&str, AuthorityLevel)]) -> SignedTransaction {
        SignedTransaction {
            transaction: Transaction {
                ref_block_num: (self.head_num() & 0xffff) as u16,
                expiration: self.head_time() + TimeSpan::seconds(30),
                operations,
            },
            approvals: approvals
                .iter()
                .map(|(account, level)| Approval { account: name(account), level: *level })
                .collect(),
        }
    }

    /// The next block, produced at least `after` past the head.
    pub fn block_after(&self, after: TimeSpan, transactions: Vec<SignedTransaction>) -> SignedBlock {
        let interval = BLOCK_INTERVAL.as_micros();
        let slots = ((after.as_micros() + interval - 1) / interval).max(1);
        let ids: Vec<Hash256> = transactions.iter().map(|t| t.id().unwrap()).collect();
        let head = self.api.get_head_info().unwrap();
        SignedBlock {
            header: BlockHeader {
                previous: head.head_block_id,
                timestamp: head.head_block_time + BLOCK_INTERVAL * slots,
                producer: name(PRODUCER),
                transaction_merkle_root: merkle_root(&ids),
            },
            transactions,
        }
    }

    pub fn produce(&self, transactions: Vec<SignedTransaction>) -> Result<AppliedBlock, NodeError> {
        self.node.push_block(&self.block_after(BLOCK_INTERVAL, transactions))
    }

    /// Produce one empty block at least `span` after the head.
    pub fn advance(&self, span: TimeSpan) -> AppliedBlock {
        self.node.push_block(&self.block_after(span, vec![])).unwrap()
    }
}
