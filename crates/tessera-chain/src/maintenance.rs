//! Per-block sweeps over time-indexed queues.
//!
//! Every loop peeks the earliest entry of its trigger-time index and, while
//! that entry is due, processes it and peeks again. Processing always removes
//! the entry or moves its trigger forward, so each loop terminates. Errors
//! here mean stored state is inconsistent and abort the block.

use tracing::debug;

use tessera_core::operations::VirtualOperation;
use tessera_core::types::TimeSpan;

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluators::remove_all_producer_votes;
use crate::objects::{
    AccountRecoveryRequestObject, ChangeRecoveryAccountRequestObject, DeclineVotingRightsRequestObject,
    OwnerAuthorityHistoryObject, RecurringTransferObject, TransactionObject, TransferRequestObject,
};

/// What happened to one due recurring transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecurringOutcome {
    Paid,
    Cancelled,
    Extended,
    Skipped,
}

/// Decide the fate of a due transfer. Order matters: fill-or-kill beats
/// extensible, which beats skipping one of several remaining payments.
fn recurring_outcome(transfer: &RecurringTransferObject, funded: bool) -> RecurringOutcome {
    if funded {
        RecurringOutcome::Paid
    } else if transfer.fill_or_kill {
        RecurringOutcome::Cancelled
    } else if transfer.extensible {
        RecurringOutcome::Extended
    } else if transfer.payments_remaining > 1 {
        RecurringOutcome::Skipped
    } else {
        RecurringOutcome::Cancelled
    }
}

pub fn process_recurring_transfers(db: &mut Database) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    loop {
        let Some(transfer) = db
            .store()
            .first_by::<RecurringTransferObject>(RecurringTransferObject::BY_NEXT_TRANSFER)?
            .cloned()
        else {
            break;
        };
        if transfer.next_transfer > now {
            break;
        }
        if transfer.interval <= TimeSpan::ZERO {
            return Err(ChainError::Internal(format!(
                "recurring transfer {}/{} has a non-positive interval",
                transfer.from, transfer.transfer_id
            )));
        }

        let funded = db.liquid_balance(&transfer.from, &transfer.amount.symbol)? >= transfer.amount.amount;
        match recurring_outcome(&transfer, funded) {
            RecurringOutcome::Paid => {
                db.transfer_liquid(&transfer.from, &transfer.to, &transfer.amount)?;
                let remaining = transfer.payments_remaining.saturating_sub(1);
                db.push_virtual_op(VirtualOperation::FillRecurringTransfer {
                    from: transfer.from.clone(),
                    to: transfer.to.clone(),
                    amount: transfer.amount.clone(),
                    transfer_id: transfer.transfer_id.clone(),
                    payments_remaining: remaining,
                });
                if remaining == 0 {
                    db.store_mut().remove::<RecurringTransferObject>(transfer.id)?;
                    debug!(from = %transfer.from, transfer_id = %transfer.transfer_id, "removed recurring transfer");
                } else {
                    db.store_mut().modify::<RecurringTransferObject>(transfer.id, |t| {
                        t.next_transfer += t.interval;
                        t.payments_remaining = remaining;
                    })?;
                    debug!(from = %transfer.from, transfer_id = %transfer.transfer_id, remaining, "processed recurring transfer");
                }
            }
            outcome => {
                let cancelled = outcome == RecurringOutcome::Cancelled;
                db.push_virtual_op(VirtualOperation::RecurringTransferSkipped {
                    from: transfer.from.clone(),
                    to: transfer.to.clone(),
                    amount: transfer.amount.clone(),
                    transfer_id: transfer.transfer_id.clone(),
                    cancelled,
                });
                match outcome {
                    RecurringOutcome::Extended => {
                        db.store_mut().modify::<RecurringTransferObject>(transfer.id, |t| {
                            t.next_transfer += t.interval;
                            t.end += t.interval;
                        })?;
                    }
                    RecurringOutcome::Skipped => {
                        db.store_mut().modify::<RecurringTransferObject>(transfer.id, |t| {
                            t.next_transfer += t.interval;
                            t.payments_remaining -= 1;
                        })?;
                    }
                    _ => {
                        db.store_mut().remove::<RecurringTransferObject>(transfer.id)?;
                    }
                }
                debug!(
                    from = %transfer.from,
                    transfer_id = %transfer.transfer_id,
                    outcome = ?outcome,
                    "recurring transfer not funded"
                );
            }
        }
    }
    Ok(())
}

pub fn clear_expired_transfer_requests(db: &mut Database) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    while let Some(request) = db
        .store()
        .first_by::<TransferRequestObject>(TransferRequestObject::BY_EXPIRATION)?
        .filter(|r| r.expiration <= now)
        .cloned()
    {
        db.store_mut().remove::<TransferRequestObject>(request.id)?;
        db.push_virtual_op(VirtualOperation::TransferRequestExpired {
            from: request.from.clone(),
            to: request.to.clone(),
            request_id: request.request_id.clone(),
        });
        debug!(to = %request.to, request_id = %request.request_id, "transfer request expired");
    }
    Ok(())
}

/// Forget applied transaction ids once they can no longer be replayed.
pub fn clear_expired_transactions(db: &mut Database) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    while let Some(id) = db
        .store()
        .first_by::<TransactionObject>(TransactionObject::BY_EXPIRATION)?
        .filter(|t| t.expiration <= now)
        .map(|t| t.id)
    {
        db.store_mut().remove::<TransactionObject>(id)?;
    }
    Ok(())
}

/// Expire recovery requests, prune owner history past the recovery period
/// and apply matured recovery-account changes.
pub fn account_recovery_processing(db: &mut Database) -> Result<(), ChainError> {
    let now = db.head_block_time()?;

    while let Some(request) = db
        .store()
        .first_by::<AccountRecoveryRequestObject>(AccountRecoveryRequestObject::BY_EXPIRATION)?
        .filter(|r| r.expires <= now)
        .cloned()
    {
        db.store_mut().remove::<AccountRecoveryRequestObject>(request.id)?;
        db.push_virtual_op(VirtualOperation::AccountRecoveryExpired { account: request.account_to_recover.clone() });
        debug!(account = %request.account_to_recover, "account recovery request expired");
    }

    let period = db.config().owner_auth_recovery_period;
    while let Some(id) = db
        .store()
        .first_by::<OwnerAuthorityHistoryObject>(OwnerAuthorityHistoryObject::BY_LAST_VALID)?
        .filter(|h| h.last_valid_time + period <= now)
        .map(|h| h.id)
    {
        db.store_mut().remove::<OwnerAuthorityHistoryObject>(id)?;
    }

    while let Some(change) = db
        .store()
        .first_by::<ChangeRecoveryAccountRequestObject>(ChangeRecoveryAccountRequestObject::BY_EFFECTIVE_DATE)?
        .filter(|c| c.effective_on <= now)
        .cloned()
    {
        db.modify_account(&change.account_to_recover, |a| a.recovery_account = Some(change.recovery_account.clone()))?;
        db.store_mut().remove::<ChangeRecoveryAccountRequestObject>(change.id)?;
        db.push_virtual_op(VirtualOperation::ChangeRecoveryAccountApplied {
            account: change.account_to_recover.clone(),
            recovery_account: change.recovery_account.clone(),
        });
        debug!(account = %change.account_to_recover, recovery_account = %change.recovery_account, "recovery account changed");
    }
    Ok(())
}

/// Strip voting rights once a decline request matures.
pub fn process_decline_voting_rights(db: &mut Database) -> Result<(), ChainError> {
    let now = db.head_block_time()?;
    while let Some(request) = db
        .store()
        .first_by::<DeclineVotingRightsRequestObject>(DeclineVotingRightsRequestObject::BY_EFFECTIVE_DATE)?
        .filter(|r| r.effective_date <= now)
        .cloned()
    {
        remove_all_producer_votes(db, &request.account)?;
        db.modify_account(&request.account, |a| {
            a.can_vote = false;
            a.proxy = None;
        })?;
        db.store_mut().remove::<DeclineVotingRightsRequestObject>(request.id)?;
        db.push_virtual_op(VirtualOperation::VotingRightsDeclined { account: request.account.clone() });
        debug!(account = %request.account, "voting rights declined");
    }
    Ok(())
}
