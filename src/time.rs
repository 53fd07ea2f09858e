/// Virtual time for the deterministic simulation.
///
/// Represents a logical instant with no dependency on `std::time`.
/// Time advances only when the kernel fires an event — never from
/// wall-clock observation.

use std::cmp::Ordering;

use crate::error::{SimError, SimResult};

/// A point on the simulation clock.
///
/// Wraps a finite, non-negative `f64`. Construction rejects NaN and
/// infinities, which is what makes the total `Ord` below sound.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(f64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    /// Create a `VirtualTime`, rejecting negative or non-finite values.
    pub fn try_new(at: f64) -> SimResult<Self> {
        if at.is_finite() && at >= 0.0 {
            // Normalise -0.0 so equality and hashing agree.
            Ok(VirtualTime(at + 0.0))
        } else {
            Err(SimError::InvalidTime(at))
        }
    }

    /// Create a `VirtualTime` from a literal known to be valid.
    ///
    /// # Panics
    /// Panics on negative or non-finite input.
    #[inline]
    pub fn new(at: f64) -> Self {
        assert!(
            at.is_finite() && at >= 0.0,
            "invalid virtual time: {}",
            at
        );
        VirtualTime(at + 0.0)
    }

    /// Return the raw value.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Compute the instant `delay` after `self`.
    ///
    /// Fails if `delay` is negative or non-finite, or the sum overflows.
    pub fn plus(self, delay: f64) -> SimResult<VirtualTime> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidTime(delay));
        }
        VirtualTime::try_new(self.0 + delay)
    }

    /// The smallest representable instant strictly after `self`.
    ///
    /// Used by guards that need a strict "more than" threshold.
    pub fn next_after(self) -> VirtualTime {
        if self.0 == 0.0 {
            return VirtualTime(f64::from_bits(1));
        }
        VirtualTime(f64::from_bits(self.0.to_bits() + 1))
    }

    /// Returns the elapsed time since `earlier`, or `None` if `earlier`
    /// is after `self`.
    #[inline]
    pub fn duration_since(self, earlier: VirtualTime) -> Option<f64> {
        if earlier.0 <= self.0 {
            Some(self.0 - earlier.0)
        } else {
            None
        }
    }
}

impl Eq for VirtualTime {}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for VirtualTime {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={:.3}", self.0)
    }
}
