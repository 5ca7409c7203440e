use serde::{Deserialize, Serialize};

use tessera_core::types::{AccountName, Asset, AssetSymbol};
use tessera_store::{IndexKey, ObjectId};

use super::chain_object;

/// Holdings of one account in one asset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountBalanceObject {
    pub id: ObjectId,
    pub owner: AccountName,
    pub symbol: AssetSymbol,
    pub liquid: i64,
    pub staked: i64,
    /// Earned but unclaimed rewards.
    pub reward: i64,
}

impl AccountBalanceObject {
    pub const BY_OWNER_SYMBOL: &'static str = "by_owner_symbol";

    pub fn key(owner: &AccountName, symbol: &AssetSymbol) -> IndexKey {
        IndexKey::new().with(owner.as_str()).with(symbol.as_str())
    }

    pub fn liquid_asset(&self) -> Asset {
        Asset::new(self.liquid, self.symbol.clone())
    }

    pub fn staked_asset(&self) -> Asset {
        Asset::new(self.staked, self.symbol.clone())
    }

    pub fn reward_asset(&self) -> Asset {
        Asset::new(self.reward, self.symbol.clone())
    }
}

chain_object!(AccountBalanceObject, "account_balance" {
    unique AccountBalanceObject::BY_OWNER_SYMBOL => |b| AccountBalanceObject::key(&b.owner, &b.symbol),
});

/// Supply counters of one asset. `pending_supply` is minted supply that
/// sits in reward funds and has not been paid to anyone yet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct AssetDynamicDataObject {
    pub id: ObjectId,
    pub symbol: AssetSymbol,
    pub total_supply: i64,
    pub pending_supply: i64,
}

impl AssetDynamicDataObject {
    pub const BY_SYMBOL: &'static str = "by_symbol";

    pub fn key(symbol: &AssetSymbol) -> IndexKey {
        IndexKey::new().with(symbol.as_str())
    }
}

chain_object!(AssetDynamicDataObject, "asset_dynamic_data" {
    unique AssetDynamicDataObject::BY_SYMBOL => |d| AssetDynamicDataObject::key(&d.symbol),
});
