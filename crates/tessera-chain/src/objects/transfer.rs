use serde::{Deserialize, Serialize};

use tessera_core::types::{AccountName, Asset, TimePoint, TimeSpan};
use tessera_store::{IndexKey, ObjectId};

use super::{chain_object, AccountObject};

/// `to` asking `from` for a payment, pending until accepted or expired.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct TransferRequestObject {
    pub id: ObjectId,
    pub to: AccountName,
    pub from: AccountName,
    pub amount: Asset,
    pub memo: String,
    pub request_id: String,
    pub expiration: TimePoint,
}

impl TransferRequestObject {
    pub const BY_REQUEST_ID: &'static str = "by_request_id";
    pub const BY_EXPIRATION: &'static str = "by_expiration";
    pub const BY_FROM: &'static str = "by_from";

    pub fn key(to: &AccountName, request_id: &str) -> IndexKey {
        AccountObject::key(to).with(request_id)
    }
}

chain_object!(TransferRequestObject, "transfer_request" {
    unique TransferRequestObject::BY_REQUEST_ID => |r| TransferRequestObject::key(&r.to, &r.request_id),
    non_unique TransferRequestObject::BY_EXPIRATION => |r| IndexKey::new().with(r.expiration.as_micros()),
    non_unique TransferRequestObject::BY_FROM => |r| AccountObject::key(&r.from),
});

/// A scheduled series of payments from `from` to `to`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct RecurringTransferObject {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub transfer_id: String,
    pub memo: String,
    pub begin: TimePoint,
    /// Deadline of the last payment. Extensible transfers slide it forward.
    pub end: TimePoint,
    pub interval: TimeSpan,
    pub next_transfer: TimePoint,
    pub payments_remaining: u32,
    pub extensible: bool,
    pub fill_or_kill: bool,
}

impl RecurringTransferObject {
    pub const BY_TRANSFER_ID: &'static str = "by_transfer_id";
    pub const BY_NEXT_TRANSFER: &'static str = "by_next_transfer";
    pub const BY_TO: &'static str = "by_to";

    pub fn key(from: &AccountName, transfer_id: &str) -> IndexKey {
        AccountObject::key(from).with(transfer_id)
    }
}

chain_object!(RecurringTransferObject, "recurring_transfer" {
    unique RecurringTransferObject::BY_TRANSFER_ID => |t| RecurringTransferObject::key(&t.from, &t.transfer_id),
    non_unique RecurringTransferObject::BY_NEXT_TRANSFER => |t| IndexKey::new().with(t.next_transfer.as_micros()),
    non_unique RecurringTransferObject::BY_TO => |t| AccountObject::key(&t.to),
});
