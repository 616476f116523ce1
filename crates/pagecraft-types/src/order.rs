//! Fractional order keys.
//!
//! Blocks are ranked by a base-62 string compared lexicographically. A new key
//! can always be generated strictly between two neighbours, so inserting or
//! moving a block re-ranks that block only; no other stored key changes.
//!
//! Keys never end in the zero digit (`'0'`). That keeps the keyspace dense:
//! for any `a < b` there is a key `k` with `a < k < b`, and there is always a
//! key below the first one.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base-62 digit alphabet in ascending ASCII order.
pub(crate) const BASE62: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Rank of a block within its page.
///
/// Serialized as a bare string; deserializing checks the keyspace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderKey(String);

/// A string that is not a valid order key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order key {0:?}")]
pub struct InvalidOrderKey(pub String);

impl OrderKey {
    /// Key for the only block of an empty page.
    pub fn initial() -> Self {
        Self::between(None, None)
    }

    /// Compute a key strictly between `prev` and `next`.
    ///
    /// `None` means "no neighbour on that side". Callers must pass
    /// `prev < next`; the store guarantees this by taking both from its
    /// ordered list.
    pub fn between(prev: Option<&OrderKey>, next: Option<&OrderKey>) -> Self {
        debug_assert!(
            match (prev, next) {
                (Some(p), Some(n)) => p < n,
                _ => true,
            },
            "order keys must be passed in ascending order"
        );
        let lo = prev.map(|k| digits(&k.0)).unwrap_or_default();
        let hi = next.map(|k| digits(&k.0));
        let mid = midpoint(&lo, hi.as_deref());
        Self(mid.into_iter().map(|d| BASE62[d] as char).collect())
    }

    /// Parse a stored key, rejecting anything outside the keyspace.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s.bytes().all(|b| BASE62.contains(&b))
            && !s.ends_with('0');
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderKey {
    type Error = InvalidOrderKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match Self::parse(&s) {
            Some(key) => Ok(key),
            None => Err(InvalidOrderKey(s)),
        }
    }
}

impl From<OrderKey> for String {
    fn from(key: OrderKey) -> Self {
        key.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderKey({})", self.0)
    }
}

fn digits(s: &str) -> Vec<usize> {
    s.bytes()
        .map(|b| BASE62.iter().position(|&c| c == b).unwrap_or(0))
        .collect()
}

/// Digit-wise midpoint of `lo` and `hi` (`None` = unbounded above).
///
/// Requires `lo < hi` with neither ending in digit 0. `lo` is read as if
/// padded with zeros.
fn midpoint(lo: &[usize], hi: Option<&[usize]>) -> Vec<usize> {
    if let Some(hi) = hi {
        let mut n = 0;
        while n < hi.len() && lo.get(n).copied().unwrap_or(0) == hi[n] {
            n += 1;
        }
        if n > 0 {
            let mut out = hi[..n].to_vec();
            out.extend(midpoint(lo.get(n..).unwrap_or(&[]), Some(&hi[n..])));
            return out;
        }
    }

    let d_lo = lo.first().copied().unwrap_or(0);
    let d_hi = hi.and_then(|h| h.first().copied()).unwrap_or(BASE62.len());

    if d_hi.saturating_sub(d_lo) > 1 {
        return vec![(d_lo + d_hi) / 2];
    }
    match hi {
        // `hi[0]` alone sorts below `hi` and above `lo`.
        Some(hi) if hi.len() > 1 => vec![hi[0]],
        _ => {
            let mut out = vec![d_lo];
            out.extend(midpoint(lo.get(1..).unwrap_or(&[]), None));
            out
        }
    }
}
