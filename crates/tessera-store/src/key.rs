//! Composite keys for secondary indices.
//!
//! An [`IndexKey`] is a tuple of [`KeyPart`]s compared lexicographically, so
//! every key sharing a prefix sorts contiguously and "all entries for
//! account X" is a prefix scan. Wrapping a part in [`desc`] reverses the
//! order of that component only.
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Int(i128),
    Uint(u128),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    /// Reverse the ordering of the wrapped part.
    Desc(Box<KeyPart>),
}

impl KeyPart {
    fn rank(&self) -> u8 {
        match self {
            KeyPart::Int(_) => 0,
            KeyPart::Uint(_) => 1,
            KeyPart::Bool(_) => 2,
            KeyPart::Str(_) => 3,
            KeyPart::Bytes(_) => 4,
            KeyPart::Desc(_) => 5,
        }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Int(a), KeyPart::Int(b)) => a.cmp(b),
            (KeyPart::Uint(a), KeyPart::Uint(b)) => a.cmp(b),
            (KeyPart::Bool(a), KeyPart::Bool(b)) => a.cmp(b),
            (KeyPart::Str(a), KeyPart::Str(b)) => a.cmp(b),
            (KeyPart::Bytes(a), KeyPart::Bytes(b)) => a.cmp(b),
            (KeyPart::Desc(a), KeyPart::Desc(b)) => b.cmp(a),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{v}"),
            KeyPart::Uint(v) => write!(f, "{v}"),
            KeyPart::Bool(v) => write!(f, "{v}"),
            KeyPart::Str(v) => write!(f, "{v:?}"),
            KeyPart::Bytes(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            KeyPart::Desc(v) => write!(f, "desc({v})"),
        }
    }
}

macro_rules! int_parts {
    ($variant:ident: $($t:ty),*) => {
        $(impl From<$t> for KeyPart {
            fn from(v: $t) -> Self {
                KeyPart::$variant(v.into())
            }
        })*
    };
}

int_parts!(Int: i8, i16, i32, i64, u8, u16, u32, u64);
int_parts!(Uint: u128);

impl From<bool> for KeyPart {
    fn from(v: bool) -> Self {
        KeyPart::Bool(v)
    }
}

impl From<&str> for KeyPart {
    fn from(v: &str) -> Self {
        KeyPart::Str(v.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(v: String) -> Self {
        KeyPart::Str(v)
    }
}

impl From<&String> for KeyPart {
    fn from(v: &String) -> Self {
        KeyPart::Str(v.clone())
    }
}

impl From<&[u8]> for KeyPart {
    fn from(v: &[u8]) -> Self {
        KeyPart::Bytes(v.to_vec())
    }
}

/// Wrap a part so it sorts in descending order.
pub fn desc(part: impl Into<KeyPart>) -> KeyPart {
    KeyPart::Desc(Box::new(part.into()))
}

/// Ordered tuple key. A shorter key sorts before every key it prefixes.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(Vec<KeyPart>);

impl IndexKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Append a component.
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &IndexKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

/// Build an [`IndexKey`] from parts: `key!["alice", 42u64]`.
#[macro_export]
macro_rules! key {
    ($($part:expr),* $(,)?) => {
        $crate::IndexKey::from_parts(vec![$($crate::KeyPart::from($part)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuples_compare_lexicographically() {
        assert!(key!["alice", 2u64] < key!["alice", 10u64]);
        assert!(key!["alice", 99u64] < key!["bob", 0u64]);
        assert!(key!["alice"] < key!["alice", 0u64]);
    }

    #[test]
    fn desc_reverses_one_component() {
        let newer = IndexKey::new().with("alice").with(desc(200i64));
        let older = IndexKey::new().with("alice").with(desc(100i64));
        assert!(newer < older);
        let other = IndexKey::new().with("bob").with(desc(999i64));
        assert!(older < other);
    }

    #[test]
    fn prefix_detection() {
        assert!(key!["alice", 1u64].starts_with(&key!["alice"]));
        assert!(!key!["alicia", 1u64].starts_with(&key!["alice"]));
        assert!(key!["x"].starts_with(&IndexKey::new()));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(key!["alice", 7u32].to_string(), "(\"alice\", 7)");
    }
}
