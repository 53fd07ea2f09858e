//! Queueing model parameters.

use crate::error::{SimError, SimResult};
use crate::rng::Dist;

// ── Reneging policy ───────────────────────────────────────────────────

/// Probability that a customer who has waited past the threshold leaves
/// at a reneging check.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum RenegePolicy {
    /// The same probability whatever the servers are doing.
    Constant(f64),
    /// `while_on_break` applies when no server is busy and at least one
    /// is on break; otherwise `while_working`.
    ServerAware {
        while_working: f64,
        while_on_break: f64,
    },
}

impl RenegePolicy {
    /// Abandonment probability given how many servers are busy and how
    /// many are on break.
    pub fn probability(&self, busy: usize, on_break: usize) -> f64 {
        match *self {
            RenegePolicy::Constant(p) => p,
            RenegePolicy::ServerAware {
                while_working,
                while_on_break,
            } => {
                if busy == 0 && on_break > 0 {
                    while_on_break
                } else {
                    while_working
                }
            }
        }
    }

    fn validate(&self) -> SimResult<()> {
        match *self {
            RenegePolicy::Constant(p) => check_probability("renege", p),
            RenegePolicy::ServerAware {
                while_working,
                while_on_break,
            } => {
                check_probability("renege.while_working", while_working)?;
                check_probability("renege.while_on_break", while_on_break)
            }
        }
    }
}

impl Default for RenegePolicy {
    fn default() -> Self {
        RenegePolicy::ServerAware {
            while_working: 0.05,
            while_on_break: 1.0,
        }
    }
}

/// When the first customer arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum FirstArrival {
    /// At a fixed instant.
    At(f64),
    /// One inter-arrival gap after time zero.
    Draw,
}

// ── ModelConfig ───────────────────────────────────────────────────────

/// Parameters of the single-queue service model. Times are in minutes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelConfig {
    /// Gap between consecutive arrivals.
    pub interarrival: Dist,
    /// Service duration.
    pub service: Dist,
    /// A customer may renege once it has waited strictly longer than this.
    pub renege_threshold: f64,
    /// Delay before the waiting line is rechecked when customers stayed.
    pub recheck_delay: f64,
    pub renege: RenegePolicy,
    /// Chance that a server takes a break after finishing a job.
    pub break_probability: f64,
    pub break_duration: Dist,
    pub servers: u32,
    pub first_arrival: FirstArrival,
    pub seed: u64,
    pub horizon: f64,
    /// Abort a run after this many firings.
    pub step_limit: Option<u64>,
}

impl ModelConfig {
    /// The baseline: one arrival every 30 minutes on average, uniform
    /// 15-30 minute service, 30% break chance, three hour horizon.
    pub fn baseline() -> Self {
        ModelConfig {
            interarrival: Dist::exponential_mean(30.0),
            service: Dist::Uniform {
                low: 15.0,
                high: 30.0,
            },
            renege_threshold: 10.0,
            recheck_delay: 5.0,
            renege: RenegePolicy::default(),
            break_probability: 0.3,
            break_duration: Dist::Uniform {
                low: 15.0,
                high: 35.0,
            },
            servers: 1,
            first_arrival: FirstArrival::At(0.0),
            seed: 0,
            horizon: 180.0,
            step_limit: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_interarrival(mut self, dist: Dist) -> Self {
        self.interarrival = dist;
        self
    }

    pub fn with_service(mut self, dist: Dist) -> Self {
        self.service = dist;
        self
    }

    pub fn with_renege(mut self, policy: RenegePolicy) -> Self {
        self.renege = policy;
        self
    }

    pub fn with_breaks(mut self, probability: f64, duration: Dist) -> Self {
        self.break_probability = probability;
        self.break_duration = duration;
        self
    }

    pub fn with_servers(mut self, servers: u32) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_first_arrival(mut self, first: FirstArrival) -> Self {
        self.first_arrival = first;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Reject parameters that would make the model meaningless or let
    /// it spin without advancing the clock.
    pub fn validate(&self) -> SimResult<()> {
        self.interarrival.validate("interarrival")?;
        self.service.validate("service")?;
        self.break_duration.validate("break_duration")?;
        self.renege.validate()?;
        check_probability("break_probability", self.break_probability)?;

        if !(self.renege_threshold.is_finite() && self.renege_threshold >= 0.0) {
            return Err(invalid("renege_threshold", self.renege_threshold));
        }
        // A zero recheck delay re-fires the check at the same instant forever.
        if !(self.recheck_delay.is_finite() && self.recheck_delay > 0.0) {
            return Err(invalid("recheck_delay", self.recheck_delay));
        }
        if !(self.horizon.is_finite() && self.horizon >= 0.0) {
            return Err(invalid("horizon", self.horizon));
        }
        if let FirstArrival::At(t) = self.first_arrival {
            if !(t.is_finite() && t >= 0.0) {
                return Err(invalid("first_arrival", t));
            }
        }
        if self.servers == 0 {
            return Err(SimError::InvalidConfig("servers: must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

fn check_probability(label: &str, p: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(invalid(label, p))
    }
}

fn invalid(label: &str, value: f64) -> SimError {
    SimError::InvalidConfig(format!("{}: {}", label, value))
}
