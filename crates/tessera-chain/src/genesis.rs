//! Initial chain state.
use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_core::error::EvaluationError;
use tessera_core::types::{AccountName, Asset, AssetSymbol, Authority, TimePoint};

use crate::database::Database;
use crate::error::ChainError;
use crate::objects::{AccountAuthorityObject, AccountObject, ProducerObject};

/// 2026-01-01T00:00:00Z.
pub const DEFAULT_GENESIS_TIME: TimePoint = TimePoint::from_secs(1_767_225_600);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GenesisAccount {
    pub name: AccountName,
    /// Owner, active and posting key. Defaults to the account name.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub liquid: i64,
    #[serde(default)]
    pub staked: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GenesisConfig {
    pub genesis_time: TimePoint,
    /// Producer of the first blocks. Created as an account if not listed.
    pub initial_producer: AccountName,
    pub accounts: Vec<GenesisAccount>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            genesis_time: DEFAULT_GENESIS_TIME,
            initial_producer: AccountName::new("genesis").unwrap_or_default(),
            accounts: Vec::new(),
        }
    }
}

fn create_account(
    db: &mut Database,
    name: &AccountName,
    key: &str,
    recovery: Option<&AccountName>,
    now: TimePoint,
) -> Result<(), ChainError> {
    name.validate()?;
    if db.find_account(name)?.is_some() {
        return Err(EvaluationError::AccountExists(name.to_string()).into());
    }
    let store = db.store_mut();
    store.create::<AccountObject>(|a| {
        a.name = name.clone();
        a.created = now;
        a.recovery_account = recovery.cloned();
        a.can_vote = true;
    })?;
    store.create::<AccountAuthorityObject>(|a| {
        a.account = name.clone();
        a.owner = Authority::from_key(key);
        a.active = Authority::from_key(key);
        a.posting = Authority::from_key(key);
    })?;
    Ok(())
}

/// Populate a fresh database with the genesis state. Runs outside any undo
/// session and leaves the store at revision 0.
pub fn init_genesis(db: &mut Database, genesis: &GenesisConfig) -> Result<(), ChainError> {
    let now = genesis.genesis_time;
    let producer = &genesis.initial_producer;
    db.modify_dynamic_global_properties(|g| {
        g.time = now;
        g.current_producer = producer.clone();
    })?;

    if !genesis.accounts.iter().any(|a| &a.name == producer) {
        create_account(db, producer, producer.as_str(), None, now)?;
    }
    let mut supply = 0i64;
    for account in &genesis.accounts {
        let recovery = (&account.name != producer).then_some(producer);
        let key = account.key.as_deref().unwrap_or(account.name.as_str());
        create_account(db, &account.name, key, recovery, now)?;
        if account.liquid != 0 {
            db.adjust_liquid_balance(&account.name, &Asset::coin(account.liquid))?;
        }
        if account.staked != 0 {
            db.adjust_staked_balance(&account.name, &Asset::coin(account.staked))?;
        }
        supply += account.liquid + account.staked;
    }

    db.store_mut().create::<ProducerObject>(|p| {
        p.owner = producer.clone();
        p.details = "genesis".into();
        p.active = true;
        p.created = now;
    })?;
    db.adjust_supply(&AssetSymbol::coin(), supply, 0)?;
    db.modify_dynamic_global_properties(|g| g.current_supply = Asset::coin(supply))?;
    db.store_mut().set_revision(0)?;
    info!(accounts = genesis.accounts.len(), supply, producer = %producer, "genesis state initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::config::ChainConfig;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn genesis() -> GenesisConfig {
        GenesisConfig {
            accounts: vec![
                GenesisAccount { name: name("alice"), key: None, liquid: 1_000, staked: 0 },
                GenesisAccount { name: name("bob"), key: Some("bob-key".into()), liquid: 0, staked: 50 },
            ],
            ..GenesisConfig::default()
        }
    }

    #[test]
    fn genesis_creates_accounts_supply_and_producer() {
        let mut db = Database::new(ChainConfig::default()).unwrap();
        init_genesis(&mut db, &genesis()).unwrap();
        assert_eq!(db.head_block_time().unwrap(), DEFAULT_GENESIS_TIME);
        assert_eq!(db.liquid_balance(&name("alice"), &AssetSymbol::coin()).unwrap(), 1_000);
        assert_eq!(db.staked_balance(&name("bob"), &AssetSymbol::coin()).unwrap(), 50);
        assert_eq!(db.get_account(&name("alice")).unwrap().recovery_account, Some(name("genesis")));
        assert_eq!(db.get_authority(&name("bob")).unwrap().owner, Authority::from_key("bob-key"));
        assert!(db.get_producer(&name("genesis")).unwrap().active);
        let supply = db.find_asset_dynamic_data(&AssetSymbol::coin()).unwrap().unwrap();
        assert_eq!(supply.total_supply, 1_050);
        assert_eq!(db.dynamic_global_properties().unwrap().current_supply, Asset::coin(1_050));
        assert_eq!(db.store().revision(), 0);
    }

    #[test]
    fn duplicate_genesis_account_rejected() {
        let mut config = genesis();
        config.accounts.push(config.accounts[0].clone());
        let mut db = Database::new(ChainConfig::default()).unwrap();
        let err = init_genesis(&mut db, &config).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::AccountExists("alice".into())));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: GenesisConfig = serde_json::from_str(r#"{"accounts": [{"name": "alice", "liquid": 5}]}"#).unwrap();
        assert_eq!(config.genesis_time, DEFAULT_GENESIS_TIME);
        assert_eq!(config.initial_producer, name("genesis"));
        assert_eq!(config.accounts[0].staked, 0);
    }
}
