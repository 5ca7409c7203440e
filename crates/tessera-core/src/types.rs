//! Primitive protocol types: hashes, account names, assets, prices, time, authorities.
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::{
    BLOCKCHAIN_PRECISION, BLOCKCHAIN_PRECISION_DIGITS, MAX_ACCOUNT_NAME_LENGTH,
    MIN_ACCOUNT_NAME_LENGTH, SYMBOL_COIN, SYMBOL_EQUITY, SYMBOL_USD,
};
use crate::error::{MathError, ValidationError};

/// A 256-bit hash used for block and transaction identifiers.
///
/// Block ids carry the block number big-endian in their first four bytes,
/// so the height of any block can be recovered from its id alone.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash. Used as the id of the (virtual) block before genesis.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Block number encoded in the first four bytes of a block id.
    pub fn block_num(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Replace the first four bytes with `block_num`, big-endian.
    pub fn with_block_num(mut self, block_num: u32) -> Self {
        self.0[..4].copy_from_slice(&block_num.to_be_bytes());
        self
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// ---- Account names ----

/// A validated account name.
///
/// Names are 3 to 16 characters of lowercase ASCII letters, digits, `-`
/// and `.`, and must begin with a letter. Deserialization does not
/// validate; operations re-check their names in `validate()`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Create a name, rejecting anything that fails [`AccountName::is_valid`].
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(ValidationError::InvalidAccountName(name))
        }
    }

    pub fn is_valid(name: &str) -> bool {
        let len = name.len();
        if !(MIN_ACCOUNT_NAME_LENGTH..=MAX_ACCOUNT_NAME_LENGTH).contains(&len) {
            return false;
        }
        let mut chars = name.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        starts_with_letter
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    }

    /// Re-check a name that may have arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if Self::is_valid(&self.0) {
            Ok(())
        } else {
            Err(ValidationError::InvalidAccountName(self.0.clone()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for AccountName {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ---- Assets ----

/// Ticker symbol of an asset.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct AssetSymbol(String);

impl AssetSymbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// The liquid core coin.
    pub fn coin() -> Self {
        Self(SYMBOL_COIN.to_string())
    }

    /// The staked governance asset.
    pub fn equity() -> Self {
        Self(SYMBOL_EQUITY.to_string())
    }

    /// The stable unit prices are quoted in.
    pub fn usd() -> Self {
        Self(SYMBOL_USD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbols are 1 to 8 uppercase ASCII letters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let ok = (1..=8).contains(&self.0.len()) && self.0.chars().all(|c| c.is_ascii_uppercase());
        if ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidSymbol(self.0.clone()))
        }
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of one asset, in units of `1 / BLOCKCHAIN_PRECISION`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Asset {
    pub amount: i64,
    pub symbol: AssetSymbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: AssetSymbol) -> Self {
        Self { amount, symbol }
    }

    pub fn coin(amount: i64) -> Self {
        Self::new(amount, AssetSymbol::coin())
    }

    pub fn equity(amount: i64) -> Self {
        Self::new(amount, AssetSymbol::equity())
    }

    pub fn usd(amount: i64) -> Self {
        Self::new(amount, AssetSymbol::usd())
    }

    /// Zero of the same symbol.
    pub fn zero_of(&self) -> Self {
        Self::new(0, self.symbol.clone())
    }

    /// Add two amounts of the same asset.
    ///
    /// # Errors
    ///
    /// - [`MathError::SymbolMismatch`] if the symbols differ.
    /// - [`MathError::Overflow`] if the sum does not fit in `i64`.
    pub fn checked_add(&self, other: &Asset) -> Result<Asset, MathError> {
        self.same_symbol(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or(MathError::Overflow)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    /// Subtract `other` from `self`. The result may be negative.
    ///
    /// # Errors
    ///
    /// Same as [`Asset::checked_add`].
    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, MathError> {
        self.same_symbol(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(MathError::Overflow)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    fn same_symbol(&self, other: &Asset) -> Result<(), MathError> {
        if self.symbol == other.symbol {
            Ok(())
        } else {
            Err(MathError::SymbolMismatch {
                left: self.symbol.to_string(),
                right: other.symbol.to_string(),
            })
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let precision = BLOCKCHAIN_PRECISION as u64;
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / precision,
            abs % precision,
            self.symbol,
            width = BLOCKCHAIN_PRECISION_DIGITS
        )
    }
}

/// Exchange rate between two assets: `base` is worth `quote`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Self { base, quote }
    }

    pub fn is_null(&self) -> bool {
        self.base.amount == 0 || self.quote.amount == 0
    }

    /// Convert `asset` across this price pair, flooring.
    ///
    /// An asset in the base symbol becomes the quote symbol and vice versa.
    /// Intermediates use 128 bits.
    ///
    /// # Errors
    ///
    /// - [`MathError::SymbolMismatch`] if `asset` is neither side of the pair.
    /// - [`MathError::DivisionByZero`] for a null price.
    /// - [`MathError::Overflow`] if the result does not fit in `i64`.
    pub fn convert(&self, asset: &Asset) -> Result<Asset, MathError> {
        let (from, to) = if asset.symbol == self.base.symbol {
            (&self.base, &self.quote)
        } else if asset.symbol == self.quote.symbol {
            (&self.quote, &self.base)
        } else {
            return Err(MathError::SymbolMismatch {
                left: asset.symbol.to_string(),
                right: format!("{}/{}", self.base.symbol, self.quote.symbol),
            });
        };
        if from.amount == 0 {
            return Err(MathError::DivisionByZero);
        }
        let value = i128::from(asset.amount)
            .checked_mul(i128::from(to.amount))
            .ok_or(MathError::Overflow)?
            / i128::from(from.amount);
        let amount = i64::try_from(value).map_err(|_| MathError::Overflow)?;
        Ok(Asset::new(amount, to.symbol.clone()))
    }
}

// ---- Time ----

/// Microseconds since the Unix epoch.
///
/// Chain time is always the timestamp of the head block; nothing in the
/// core reads the system clock.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct TimePoint(i64);

impl TimePoint {
    pub const EPOCH: Self = Self(0);
    /// Sentinel for "never": used for finished cashouts.
    pub const MAX: Self = Self(i64::MAX);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1_000_000)
    }

    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    pub const fn as_secs(&self) -> i64 {
        self.0 / 1_000_000
    }

    /// Span elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: TimePoint) -> TimeSpan {
        TimeSpan(self.0.saturating_sub(earlier.0).max(0))
    }

    /// RFC 3339 rendering for snapshots and logs.
    pub fn to_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_micros(self.0)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_else(|| format!("{}us", self.0))
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Add<TimeSpan> for TimePoint {
    type Output = TimePoint;

    fn add(self, rhs: TimeSpan) -> TimePoint {
        TimePoint(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<TimeSpan> for TimePoint {
    fn add_assign(&mut self, rhs: TimeSpan) {
        *self = *self + rhs;
    }
}

impl Sub<TimeSpan> for TimePoint {
    type Output = TimePoint;

    fn sub(self, rhs: TimeSpan) -> TimePoint {
        TimePoint(self.0.saturating_sub(rhs.0))
    }
}

impl Sub<TimePoint> for TimePoint {
    type Output = TimeSpan;

    fn sub(self, rhs: TimePoint) -> TimeSpan {
        TimeSpan(self.0.saturating_sub(rhs.0))
    }
}

/// A signed span of time in microseconds.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct TimeSpan(i64);

impl TimeSpan {
    pub const ZERO: Self = Self(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn seconds(secs: i64) -> Self {
        Self(secs * 1_000_000)
    }

    pub const fn minutes(minutes: i64) -> Self {
        Self::seconds(minutes * 60)
    }

    pub const fn hours(hours: i64) -> Self {
        Self::minutes(hours * 60)
    }

    pub const fn days(days: i64) -> Self {
        Self::hours(days * 24)
    }

    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    pub const fn as_secs(&self) -> i64 {
        self.0 / 1_000_000
    }
}

impl Mul<i64> for TimeSpan {
    type Output = TimeSpan;

    fn mul(self, rhs: i64) -> TimeSpan {
        TimeSpan(self.0.saturating_mul(rhs))
    }
}

// ---- Authorities ----

/// Weighted multi-signature authority.
///
/// Satisfied when the weights of approving accounts and keys reach
/// `weight_threshold`. Key strings are opaque; signature checking happens
/// outside the core.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<String, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn from_key(key: impl Into<String>) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key.into(), 1);
        Self { weight_threshold: 1, account_auths: BTreeMap::new(), key_auths }
    }

    pub fn total_weight(&self) -> u64 {
        self.account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| u64::from(*w))
            .sum()
    }

    /// True when no combination of approvals can reach the threshold.
    pub fn is_impossible(&self) -> bool {
        self.total_weight() < u64::from(self.weight_threshold)
    }

    pub fn num_auths(&self) -> usize {
        self.account_auths.len() + self.key_auths.len()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in self.account_auths.keys() {
            name.validate()?;
        }
        if self.key_auths.keys().any(|k| k.is_empty()) {
            return Err(ValidationError::EmptyField("key_auths"));
        }
        Ok(())
    }
}

/// Level of authority an approval carries. Higher levels imply lower ones.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    Posting,
    Active,
    Owner,
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Posting => "posting",
            Self::Active => "active",
            Self::Owner => "owner",
        })
    }
}

/// Membership tier of an account, boosting activity rewards.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    #[default]
    None,
    Standard,
    Mid,
    Top,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_rules() {
        assert!(AccountName::is_valid("alice"));
        assert!(AccountName::is_valid("a.b-c9"));
        assert!(!AccountName::is_valid("al"));
        assert!(!AccountName::is_valid("Alice"));
        assert!(!AccountName::is_valid("9lives"));
        assert!(!AccountName::is_valid("abcdefghijklmnopq"));
        assert!(matches!(
            AccountName::new("x"),
            Err(ValidationError::InvalidAccountName(_))
        ));
    }

    #[test]
    fn asset_display_uses_eight_decimals() {
        assert_eq!(Asset::coin(150_000_000).to_string(), "1.50000000 COIN");
        assert_eq!(Asset::usd(-1).to_string(), "-0.00000001 USD");
    }

    #[test]
    fn asset_arithmetic_checks_symbols() {
        let a = Asset::coin(10);
        assert_eq!(a.checked_add(&Asset::coin(5)).unwrap().amount, 15);
        assert_eq!(a.checked_sub(&Asset::coin(15)).unwrap().amount, -5);
        assert!(matches!(
            a.checked_add(&Asset::usd(1)),
            Err(MathError::SymbolMismatch { .. })
        ));
        assert_eq!(
            Asset::coin(i64::MAX).checked_add(&Asset::coin(1)),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn price_converts_both_directions() {
        // 2 USD per 1 COIN.
        let price = Price::new(Asset::coin(100), Asset::usd(200));
        assert_eq!(price.convert(&Asset::coin(7)).unwrap(), Asset::usd(14));
        assert_eq!(price.convert(&Asset::usd(7)).unwrap(), Asset::coin(3));
        assert!(price.convert(&Asset::equity(1)).is_err());
        let null = Price::new(Asset::coin(0), Asset::usd(1));
        assert_eq!(null.convert(&Asset::coin(1)), Err(MathError::DivisionByZero));
    }

    #[test]
    fn block_num_roundtrips_through_id() {
        let id = Hash256([0xAB; 32]).with_block_num(0x0102_0304);
        assert_eq!(id.block_num(), 0x0102_0304);
        assert_eq!(id.0[4], 0xAB);
    }

    #[test]
    fn time_arithmetic() {
        let t = TimePoint::from_secs(100);
        assert_eq!((t + TimeSpan::minutes(1)).as_secs(), 160);
        assert_eq!(t - TimePoint::from_secs(40), TimeSpan::seconds(60));
        assert_eq!(TimePoint::from_secs(1).saturating_since(t), TimeSpan::ZERO);
        assert_eq!(TimeSpan::days(1).as_secs(), 86_400);
        assert_eq!(TimePoint::from_secs(0).to_rfc3339(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn impossible_authority() {
        let mut auth = Authority::from_key("K1");
        assert!(!auth.is_impossible());
        auth.weight_threshold = 2;
        assert!(auth.is_impossible());
        assert_eq!(auth.num_auths(), 1);
    }

    #[test]
    fn authority_levels_are_ordered() {
        assert!(AuthorityLevel::Owner > AuthorityLevel::Active);
        assert!(AuthorityLevel::Active > AuthorityLevel::Posting);
    }
}
