//! Tokens — immutable timestamped values residing in places.

use crate::time::VirtualTime;

// ── Token ID ──────────────────────────────────────────────────────────

/// A net-wide unique, strictly-increasing token identifier.
///
/// The monotonic nature of `TokenId` defines insertion order: among
/// tokens of a place with equal availability time, the one with the
/// smaller id was deposited first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenId(u64);

impl TokenId {
    /// Wrap a raw u64 into a `TokenId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        TokenId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "K#{}", self.0)
    }
}

/// Deterministic, strictly-increasing token-ID generator.
///
/// Each `Net` owns exactly one of these.
#[derive(Debug, Clone, Default)]
pub struct TokenIdGen {
    next: u64,
}

impl TokenIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        TokenIdGen { next: 0 }
    }

    /// Mint the next token ID.
    pub fn next_id(&mut self) -> TokenId {
        let id = TokenId(self.next);
        self.next += 1;
        id
    }
}

// ── TokenValue ────────────────────────────────────────────────────────

/// Payload carried by tokens.
///
/// `kind` is the tag a place checks on every deposit, so each place holds
/// exactly one payload shape decided when the model is built.
pub trait TokenValue: Clone + std::fmt::Debug {
    /// Name of the payload variant, e.g. `"queue"` or `"server"`.
    fn kind(&self) -> &'static str;
}

// ── Token ─────────────────────────────────────────────────────────────

/// A value plus the instant it becomes available for consumption.
///
/// Tokens are never mutated in place: an event that "updates" a value
/// consumes the old token and deposits a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<V> {
    id: TokenId,
    value: V,
    time: VirtualTime,
}

impl<V> Token<V> {
    pub(crate) fn new(id: TokenId, value: V, time: VirtualTime) -> Self {
        Token { id, value, time }
    }

    /// The token's identity (and insertion rank).
    #[inline]
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// The payload.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// When the token becomes available.
    #[inline]
    pub fn time(&self) -> VirtualTime {
        self.time
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }
}

impl<V: std::fmt::Debug> std::fmt::Display for Token<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}", self.value, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_id_monotonic() {
        let mut gen = TokenIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert!(a < b);
    }

    #[test]
    fn test_display() {
        let t = Token::new(TokenId::new(0), 5u32, VirtualTime::new(10.0));
        assert_eq!(t.time(), VirtualTime::new(10.0));
        assert_eq!(format!("{}", t), "5@T=10.000");
    }
}
