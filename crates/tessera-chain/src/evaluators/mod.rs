//! One evaluator per operation kind.

mod account;
mod content;
mod producer;
mod recovery;
mod transfer;

pub use account::{AccountCreateEvaluator, AccountUpdateProxyEvaluator, DeclineVotingRightsEvaluator};
pub use content::{ActivityRewardEvaluator, CommentEvaluator, VoteEvaluator};
pub use producer::{AccountProducerVoteEvaluator, ProducerUpdateEvaluator};
pub use recovery::{ChangeRecoveryAccountEvaluator, RecoverAccountEvaluator, RequestAccountRecoveryEvaluator};
pub use transfer::{
    ClaimRewardBalanceEvaluator, StakeAssetEvaluator, TransferAcceptEvaluator, TransferEvaluator,
    TransferRecurringEvaluator, TransferRequestEvaluator,
};

pub(crate) use producer::{adjust_producer_votes, remove_all_producer_votes};
pub(crate) use recovery::update_owner_authority;

use crate::evaluator::EvaluatorRegistry;

pub(crate) fn register_all(registry: &mut EvaluatorRegistry) {
    registry.register(AccountCreateEvaluator);
    registry.register(TransferEvaluator);
    registry.register(TransferRequestEvaluator);
    registry.register(TransferAcceptEvaluator);
    registry.register(TransferRecurringEvaluator);
    registry.register(RequestAccountRecoveryEvaluator);
    registry.register(RecoverAccountEvaluator);
    registry.register(ChangeRecoveryAccountEvaluator);
    registry.register(DeclineVotingRightsEvaluator);
    registry.register(AccountUpdateProxyEvaluator);
    registry.register(ProducerUpdateEvaluator);
    registry.register(AccountProducerVoteEvaluator);
    registry.register(StakeAssetEvaluator);
    registry.register(CommentEvaluator);
    registry.register(VoteEvaluator);
    registry.register(ActivityRewardEvaluator);
    registry.register(ClaimRewardBalanceEvaluator);
}
