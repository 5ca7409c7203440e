//! Scenario tests driving a node block by block.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use tessera_chain::ChainError;
use tessera_core::block::SignedBlock;
use tessera_core::constants::{BLOCKCHAIN_PRECISION, BLOCK_INTERVAL};
use tessera_core::error::EvaluationError;
use tessera_core::operations::{
    ChangeRecoveryAccountOperation, CommentOperation, Operation, RequestAccountRecoveryOperation,
    TransferOperation, TransferRecurringOperation, VoteOperation,
};
use tessera_core::types::{Asset, AssetSymbol, Authority, AuthorityLevel, TimePoint, TimeSpan};
use tessera_core::VirtualOperation;
use tessera_node_lib::NodeError;
use tessera_tests::helpers::*;

fn transfer(from: &str, to: &str, amount: i64) -> Operation {
    TransferOperation { from: name(from), to: name(to), amount: Asset::coin(amount), memo: String::new() }.into()
}

fn recurring(id: &str, amount: i64, begin: TimePoint, payments: u32, extensible: bool, fill_or_kill: bool) -> Operation {
    TransferRecurringOperation {
        from: name("alice"),
        to: name("bob"),
        amount: Asset::coin(amount),
        transfer_id: id.into(),
        memo: String::new(),
        begin,
        interval: TimeSpan::days(1),
        payments,
        extensible,
        fill_or_kill,
        active: true,
    }
    .into()
}

fn liquid(net: &TestNet, account: &str) -> i64 {
    net.api.get_liquid_balance(&name(account), &AssetSymbol::coin()).unwrap()
}

fn vops(net: &TestNet) -> Vec<VirtualOperation> {
    net.api.get_virtual_operations()
}

// ---- Transfers ----

#[test]
fn committed_transfer_survives_failed_transfer() {
    let net = TestNet::new(vec![account("alice", 1_000, 0), account("bob", 0, 0)]);
    net.produce(vec![net.tx(vec![transfer("alice", "bob", 300)], &["alice"])]).unwrap();
    net.node.set_irreversible(1).unwrap();
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (700, 300));

    let err = net.produce(vec![net.tx(vec![transfer("alice", "bob", 10_000)], &["alice"])]).unwrap_err();
    let NodeError::Chain(err) = err else { panic!("unexpected error {err:?}") };
    assert!(matches!(err.root(), ChainError::Evaluation(EvaluationError::InsufficientFunds { .. })));
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (700, 300));
    assert_eq!(net.head_num(), 1);

    assert!(net.node.push_transaction(net.tx(vec![transfer("alice", "bob", 10_000)], &["alice"])).is_err());
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (700, 300));
    assert_eq!(net.api.get_head_info().unwrap().pending_transactions, 0);
}

#[test]
fn partially_valid_transaction_changes_nothing() {
    let net = TestNet::new(vec![account("alice", 1_000, 0), account("bob", 0, 0)]);
    let tx = net.tx(vec![transfer("alice", "bob", 600), transfer("alice", "bob", 600)], &["alice"]);
    assert!(net.node.push_transaction(tx).is_err());
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (1_000, 0));
}

#[test]
fn popped_block_reverts_and_pending_transaction_is_replayed() {
    let net = TestNet::new(vec![account("alice", 1_000, 0), account("bob", 0, 0)]);
    net.produce(vec![net.tx(vec![transfer("alice", "bob", 300)], &["alice"])]).unwrap();
    net.node.push_transaction(net.tx(vec![transfer("alice", "bob", 50)], &["alice"])).unwrap();
    assert_eq!(liquid(&net, "alice"), 650);

    net.node.pop_block().unwrap();
    assert_eq!(net.head_num(), 0);
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (950, 50));
    assert_eq!(net.api.get_head_info().unwrap().pending_transactions, 1);
}

// ---- Recovery ----

#[test]
fn unclaimed_recovery_request_expires() {
    let net = TestNet::new(vec![account("bob", 10, 0)]);
    let request = RequestAccountRecoveryOperation {
        recovery_account: name(PRODUCER),
        account_to_recover: name("bob"),
        new_owner_authority: Authority::from_key("bob-new"),
    };
    net.produce(vec![net.tx(vec![request.into()], &[PRODUCER])]).unwrap();
    let stored = net.api.find_recovery_request(&name("bob")).unwrap().unwrap();
    assert_eq!(stored.new_owner_authority, Authority::from_key("bob-new"));

    net.advance(TimeSpan::hours(12));
    assert!(net.api.find_recovery_request(&name("bob")).unwrap().is_some());

    net.advance(TimeSpan::hours(13));
    assert_eq!(net.api.find_recovery_request(&name("bob")).unwrap(), None);
    assert!(vops(&net).contains(&VirtualOperation::AccountRecoveryExpired { account: name("bob") }));
}

#[test]
fn recovery_account_change_waits_for_delay() {
    let net = TestNet::new(vec![account("alice", 0, 0), account("bob", 0, 0)]);
    let change = ChangeRecoveryAccountOperation { account_to_recover: name("bob"), new_recovery_account: name("alice") };
    net.produce(vec![net.signed(vec![change.into()], &[("bob", AuthorityLevel::Owner)])]).unwrap();
    assert!(net.api.find_change_recovery_request(&name("bob")).unwrap().is_some());
    assert_eq!(net.api.get_account(&name("bob")).unwrap().recovery_account, Some(name(PRODUCER)));

    net.advance(TimeSpan::days(30));
    assert_eq!(net.api.get_account(&name("bob")).unwrap().recovery_account, Some(name("alice")));
    assert_eq!(net.api.find_change_recovery_request(&name("bob")).unwrap(), None);
    assert!(vops(&net).iter().any(|v| matches!(v, VirtualOperation::ChangeRecoveryAccountApplied { .. })));
}

// ---- Recurring transfers ----

#[test]
fn funded_recurring_transfer_pays_out_and_is_removed() {
    let net = TestNet::new(vec![account("alice", 1_000, 0), account("bob", 0, 0)]);
    let begin = net.head_time() + TimeSpan::days(1);
    net.produce(vec![net.tx(vec![recurring("rent", 100, begin, 2, false, false)], &["alice"])]).unwrap();

    net.advance(TimeSpan::days(1));
    assert_eq!(liquid(&net, "bob"), 100);
    let left = net.api.get_recurring_transfers_from(&name("alice")).unwrap();
    assert_eq!((left.len(), left[0].payments_remaining), (1, 1));

    net.advance(TimeSpan::days(1));
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (800, 200));
    assert!(net.api.get_recurring_transfers_from(&name("alice")).unwrap().is_empty());
}

#[test]
fn unfunded_fill_or_kill_is_cancelled_while_extensible_slides() {
    let net = TestNet::new(vec![account("alice", 150, 0), account("bob", 0, 0)]);
    let begin = net.head_time() + TimeSpan::days(1);
    let ops = vec![
        recurring("fok", 100, begin, 3, false, true),
        recurring("ext", 100, begin, 2, true, false),
        transfer("alice", "bob", 100),
    ];
    net.produce(vec![net.tx(ops, &["alice"])]).unwrap();
    let before = net.api.get_recurring_transfers_from(&name("alice")).unwrap();
    assert_eq!(before.len(), 2);
    let ext_end = before.iter().find(|t| t.transfer_id == "ext").map(|t| t.end).unwrap();

    net.advance(TimeSpan::days(1));
    let left = net.api.get_recurring_transfers_from(&name("alice")).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].transfer_id, "ext");
    assert_eq!(left[0].payments_remaining, 2);
    assert_eq!(left[0].end, ext_end + TimeSpan::days(1));
    assert_eq!(left[0].next_transfer, begin + TimeSpan::days(1));
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (50, 100));

    let skipped: Vec<(String, bool)> = vops(&net)
        .into_iter()
        .filter_map(|v| match v {
            VirtualOperation::RecurringTransferSkipped { transfer_id, cancelled, .. } => Some((transfer_id, cancelled)),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![("fok".to_string(), true), ("ext".to_string(), false)]);
}

#[test]
fn underfunded_transfer_with_both_flags_is_removed_not_extended() {
    let net = TestNet::new(vec![account("alice", 50, 0), account("bob", 0, 0)]);
    let begin = net.head_time() + TimeSpan::days(1);
    net.produce(vec![net.tx(vec![recurring("both", 100, begin, 3, true, true)], &["alice"])]).unwrap();
    let stored = net.api.get_recurring_transfers_from(&name("alice")).unwrap();
    assert!(stored[0].extensible && stored[0].fill_or_kill);

    net.advance(TimeSpan::days(1));
    assert!(net.api.get_recurring_transfers_from(&name("alice")).unwrap().is_empty());
    assert_eq!((liquid(&net, "alice"), liquid(&net, "bob")), (50, 0));
    assert!(vops(&net).iter().any(|v| matches!(
        v,
        VirtualOperation::RecurringTransferSkipped { transfer_id, cancelled: true, .. } if transfer_id == "both"
    )));
}

// ---- Rewards ----

fn author_reward(net: &TestNet) -> i64 {
    vops(net)
        .into_iter()
        .find_map(|v| match v {
            VirtualOperation::AuthorReward { reward, .. } => Some(reward.amount),
            _ => None,
        })
        .unwrap_or(0)
}

#[test]
fn content_rewards_decay_across_cashouts() {
    let net = TestNet::new(vec![account("alice", 0, 800 * BLOCKCHAIN_PRECISION), account("bob", 0, 0)]);
    let post = CommentOperation {
        author: name("bob"),
        permlink: "intro".into(),
        parent_author: None,
        parent_permlink: "general".into(),
        title: "hello".into(),
        body: "first post".into(),
        max_accepted_payout: Asset::usd(1_000_000 * BLOCKCHAIN_PRECISION),
        allow_rewards: true,
    };
    let vote = VoteOperation { voter: name("alice"), author: name("bob"), permlink: "intro".into(), weight: 10_000 };
    net.produce(vec![net.tx(vec![post.into(), vote.into()], &["alice", "bob"])]).unwrap();

    net.advance(TimeSpan::days(1));
    let first = author_reward(&net);
    net.advance(TimeSpan::days(1));
    let second = author_reward(&net);
    assert!(first > second && second > 0, "first {first}, second {second}");

    let comment = net.api.find_comment(&name("bob"), "intro").unwrap().unwrap();
    assert_eq!(comment.cashouts_received, 2);
    assert_eq!(comment.total_payout, first + second);
    assert_eq!(net.api.get_balance(&name("bob"), &AssetSymbol::coin()).unwrap().reward, first + second);
}

#[test]
fn block_rewards_accrue_to_funds_and_producer() {
    let net = TestNet::new(vec![account("alice", 1_000, 0)]);
    let supply_before = net.api.get_dynamic_global_properties().unwrap().current_supply;
    for _ in 0..4 {
        net.produce(vec![]).unwrap();
    }
    let props = net.api.get_dynamic_global_properties().unwrap();
    let fund = net.api.get_reward_fund().unwrap();
    let producer = net.api.get_producer(&name(PRODUCER)).unwrap();
    assert_eq!(producer.total_blocks, 4);
    assert!(fund.content_reward_balance.amount > 0 && fund.activity_reward_balance.amount > 0);
    assert!(props.current_supply.amount > supply_before.amount);
    let staked = net.api.get_balance(&name(PRODUCER), &AssetSymbol::coin()).unwrap().staked;
    assert_eq!(
        supply_before.amount + staked + fund.content_reward_balance.amount + fund.activity_reward_balance.amount,
        props.current_supply.amount
    );
}

// ---- Subscriptions ----

#[test]
fn failing_subscriber_does_not_stop_block_production() {
    let net = TestNet::new(vec![account("alice", 1_000, 0)]);
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    net.node.set_block_applied_callback(move |applied| {
        counter.fetch_add(1, Ordering::SeqCst);
        if applied.block_num == 2 { Err("subscriber closed".into()) } else { Ok(()) }
    });
    for _ in 0..4 {
        net.produce(vec![]).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(net.head_num(), 4);
    assert!(!net.node.has_block_applied_callback());
}

// ---- Block log ----

#[test]
fn json_block_log_replays_to_the_same_head() {
    let genesis = || vec![account("alice", 1_000, 0), account("bob", 0, 0)];
    let source = TestNet::new(genesis());
    let mut log = Vec::new();
    for amount in [100, 200, 300] {
        let block = source.block_after(BLOCK_INTERVAL, vec![source.tx(vec![transfer("alice", "bob", amount)], &["alice"])]);
        source.node.push_block(&block).unwrap();
        log.push(block);
    }
    let json = serde_json::to_string(&log).unwrap();

    let replica = TestNet::new(genesis());
    let blocks: Vec<SignedBlock> = serde_json::from_str(&json).unwrap();
    for block in &blocks {
        replica.node.push_block(block).unwrap();
    }
    assert_eq!(replica.api.get_head_info().unwrap(), source.api.get_head_info().unwrap());
    assert_eq!(liquid(&replica, "bob"), 600);
}

// ---- Properties ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn liquid_coin_is_conserved_across_blocks(amounts in proptest::collection::vec(1i64..600, 1..8)) {
        let net = TestNet::new(vec![account("alice", 1_000, 0), account("bob", 0, 0)]);
        let mut expected_alice = 1_000;
        for amount in amounts {
            let result = net.produce(vec![net.tx(vec![transfer("alice", "bob", amount)], &["alice"])]);
            prop_assert_eq!(result.is_ok(), amount <= expected_alice);
            if result.is_ok() {
                expected_alice -= amount;
            }
            prop_assert_eq!(liquid(&net, "alice"), expected_alice);
            prop_assert_eq!(liquid(&net, "alice") + liquid(&net, "bob"), 1_000);
        }
    }
}
