//! Surrogate keys.
//!
//! A surrogate key correlates a logical record with its rendered node. It is
//! minted by the core and is independent of any identity field the
//! application defines.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Surrogate key of an item.
///
/// Keys render as plain decimal strings when stored as node attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(u64);

impl ItemKey {
    /// Mint a new unique key.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn mint() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw key value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemKey {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_keys_are_unique() {
        let k1 = ItemKey::mint();
        let k2 = ItemKey::mint();
        let k3 = ItemKey::mint();

        assert_ne!(k1, k2);
        assert_ne!(k2, k3);
        assert_ne!(k1, k3);
    }

    #[test]
    fn keys_survive_attribute_form() {
        let key = ItemKey::mint();
        let attr = key.to_string();
        assert_eq!(attr.parse::<ItemKey>().unwrap(), key);
        assert!("not-a-key".parse::<ItemKey>().is_err());
    }
}
