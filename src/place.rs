//! Places — named multiset containers of timed tokens.

use crate::error::{SimError, SimResult};
use crate::time::VirtualTime;
use crate::token::{Token, TokenId, TokenValue};

/// Index of a place inside its `Net`, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaceId(usize);

impl PlaceId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        PlaceId(index)
    }

    /// Declaration index of the place.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A named multiset of tokens that all carry the same payload kind.
///
/// Tokens are stored in insertion order. A place remembers the latest
/// availability time it has handed out so a later deposit can never
/// land before it.
#[derive(Debug, Clone)]
pub struct Place<V> {
    id: PlaceId,
    name: String,
    kind: &'static str,
    tokens: Vec<Token<V>>,
    last_consumed: Option<VirtualTime>,
}

impl<V: TokenValue> Place<V> {
    pub(crate) fn new(id: PlaceId, name: &str, kind: &'static str) -> Self {
        Place {
            id,
            name: name.to_string(),
            kind,
            tokens: Vec::new(),
            last_consumed: None,
        }
    }

    pub fn id(&self) -> PlaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload kind this place accepts.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Every resident token, in insertion order.
    pub fn peek_all(&self) -> &[Token<V>] {
        &self.tokens
    }

    /// Number of resident tokens, available or not.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Deposit a token after checking its kind and timestamp.
    pub(crate) fn put(&mut self, token: Token<V>) -> SimResult<()> {
        let actual = token.value().kind();
        if actual != self.kind {
            return Err(SimError::KindMismatch {
                place: self.name.clone(),
                expected: self.kind,
                actual,
            });
        }
        if let Some(consumed) = self.last_consumed {
            if token.time() < consumed {
                return Err(SimError::TimeTravel {
                    place: self.name.clone(),
                    time: token.time().as_f64(),
                    consumed: consumed.as_f64(),
                });
            }
        }
        self.tokens.push(token);
        Ok(())
    }

    fn position(&self, id: TokenId) -> SimResult<usize> {
        self.tokens
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| SimError::NotAvailable {
                place: self.name.clone(),
                token: id.raw(),
            })
    }

    /// A resident token, without removing it.
    pub(crate) fn get(&self, id: TokenId) -> SimResult<&Token<V>> {
        Ok(&self.tokens[self.position(id)?])
    }

    /// Remove a specific token.
    ///
    /// Fails with `NotAvailable` if the token has already been taken.
    pub(crate) fn take(&mut self, id: TokenId) -> SimResult<Token<V>> {
        let pos = self.position(id)?;
        let token = self.tokens.remove(pos);
        self.last_consumed = Some(match self.last_consumed {
            Some(prev) => prev.max(token.time()),
            None => token.time(),
        });
        Ok(token)
    }
}
