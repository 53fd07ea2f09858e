/// Simulation execution loop.
///
/// `Net` owns the places, the events, the virtual clock and the random
/// source. Each step collects the best binding of every event, picks the
/// earliest one (ties by declaration order), advances the clock to it and
/// fires it. The loop is synchronous and single-threaded, so a run is a
/// pure function of the model and the seed.

use tracing::{debug, info, trace};

use crate::binding::{best_binding, Binding};
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventBuilder, EventId, FireContext};
use crate::eventlog::{hash_bytes, hash_combine};
use crate::place::{Place, PlaceId};
use crate::report::{Deposit, Firing, Reporter};
use crate::rng::SimRng;
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;
use crate::token::{Token, TokenId, TokenIdGen, TokenValue};
use crate::visual::{EventInfo, PlaceInfo, Topology};

// ── Run summary ───────────────────────────────────────────────────────

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The next candidate was at or beyond the horizon.
    Horizon,
    /// No event had an enabled binding.
    Exhausted,
}

/// Outcome of `run_until` / `simulate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Firings performed by this call.
    pub steps: u64,
    /// Clock value when the run stopped.
    pub clock: VirtualTime,
    pub stop: StopReason,
}

// ── Net ───────────────────────────────────────────────────────────────

/// A timed token net and its simulation state.
#[derive(Debug)]
pub struct Net<V: TokenValue + 'static> {
    places: Vec<Place<V>>,
    events: Vec<Event<V>>,
    clock: VirtualTime,
    rng: SimRng,
    token_ids: TokenIdGen,
    scheduler: Scheduler,
    steps: u64,
    step_limit: Option<u64>,
}

impl<V: TokenValue + 'static> Net<V> {
    /// Create an empty net at time zero with a seeded random source.
    pub fn new(seed: u64) -> Self {
        Net {
            places: Vec::new(),
            events: Vec::new(),
            clock: VirtualTime::ZERO,
            rng: SimRng::new(seed),
            token_ids: TokenIdGen::new(),
            scheduler: Scheduler::new(),
            steps: 0,
            step_limit: None,
        }
    }

    /// Fail a run once the net has fired `limit` times in total.
    ///
    /// Guards against zero-delay cycles that would otherwise never let
    /// the clock reach the horizon.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    // ── Model construction ────────────────────────────────────────

    /// Declare a place accepting tokens of the given payload kind.
    pub fn add_place(&mut self, name: &str, kind: &'static str) -> SimResult<PlaceId> {
        if self.places.iter().any(|p| p.name() == name) {
            return Err(SimError::DuplicatePlace(name.to_string()));
        }
        let id = PlaceId::new(self.places.len());
        self.places.push(Place::new(id, name, kind));
        Ok(id)
    }

    /// Start building an event. See [`EventBuilder`].
    pub fn event(&mut self, name: &str) -> EventBuilder<'_, V, 0, 0> {
        EventBuilder::new(self, name)
    }

    /// Validate an event's wiring and assign it the next declaration index.
    pub(crate) fn add_event(&mut self, mut event: Event<V>) -> SimResult<EventId> {
        if event.inputs.is_empty() {
            return Err(SimError::NoInputs(event.name));
        }
        if self.events.iter().any(|e| e.name == event.name) {
            return Err(SimError::DuplicateEvent(event.name));
        }
        let wired = event
            .inputs
            .iter()
            .chain(&event.outputs)
            .chain(&event.observes);
        for place in wired {
            if place.index() >= self.places.len() {
                return Err(SimError::GuardEvaluation {
                    event: event.name,
                    place: place.index(),
                });
            }
        }
        for (i, place) in event.inputs.iter().enumerate() {
            if event.inputs[..i].contains(place) {
                return Err(SimError::DuplicateInput {
                    event: event.name,
                    place: self.places[place.index()].name().to_string(),
                });
            }
        }

        let id = EventId::new(self.events.len());
        event.id = id;
        debug!(event = %event.name, %id, "registered event");
        self.events.push(event);
        Ok(id)
    }

    // ── Token operations ──────────────────────────────────────────

    /// Place a token that becomes available at `time`.
    pub fn put(&mut self, place: PlaceId, value: V, time: f64) -> SimResult<TokenId> {
        let time = VirtualTime::try_new(time)?;
        let id = self.token_ids.next_id();
        self.place_mut(place)?.put(Token::new(id, value, time))?;
        Ok(id)
    }

    /// Every token resident in `place`, in insertion order.
    pub fn peek_all(&self, place: PlaceId) -> SimResult<&[Token<V>]> {
        Ok(self.place(place)?.peek_all())
    }

    /// Remove a specific token from `place`.
    pub fn take(&mut self, place: PlaceId, token: TokenId) -> SimResult<Token<V>> {
        self.place_mut(place)?.take(token)
    }

    pub fn place(&self, id: PlaceId) -> SimResult<&Place<V>> {
        self.places
            .get(id.index())
            .ok_or(SimError::UnknownPlace(id.index()))
    }

    fn place_mut(&mut self, id: PlaceId) -> SimResult<&mut Place<V>> {
        self.places
            .get_mut(id.index())
            .ok_or(SimError::UnknownPlace(id.index()))
    }

    /// Look a place up by name.
    pub fn place_by_name(&self, name: &str) -> Option<PlaceId> {
        self.places.iter().find(|p| p.name() == name).map(|p| p.id())
    }

    pub fn places(&self) -> &[Place<V>] {
        &self.places
    }

    pub fn events(&self) -> &[Event<V>] {
        &self.events
    }

    // ── Accessors ─────────────────────────────────────────────────

    /// Current virtual time.
    pub fn clock(&self) -> VirtualTime {
        self.clock
    }

    /// Total firings since the net was created.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// The net's random source, for draws made while setting up a model.
    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    // ── Scheduling ────────────────────────────────────────────────

    fn collect_candidates(&mut self) {
        self.scheduler.clear();
        for event in &self.events {
            if let Some(binding) = best_binding(&self.places, event, self.clock) {
                trace!(event = %event.name, time = binding.time.as_f64(), "candidate");
                self.scheduler.push(binding);
            }
        }
    }

    /// Every enabled event's best binding, in firing priority.
    pub fn candidates(&mut self) -> Vec<Binding> {
        self.collect_candidates();
        self.scheduler.drain_ordered()
    }

    /// The binding the next step would fire, if any.
    pub fn next_binding(&mut self) -> Option<Binding> {
        self.collect_candidates();
        let next = self.scheduler.pop_next();
        self.scheduler.clear();
        next
    }

    // ── Firing ────────────────────────────────────────────────────

    fn fire(&mut self, binding: Binding, reporter: &mut dyn Reporter<V>) -> SimResult<Firing<V>> {
        let index = binding.event.index();
        if index >= self.events.len() {
            return Err(SimError::GuardEvaluation {
                event: binding.event.to_string(),
                place: usize::MAX,
            });
        }

        // Virtual time must never go backward.
        debug_assert!(binding.time >= self.clock);
        let now = binding.time;

        let observed: Vec<usize> = self.events[index]
            .observes
            .iter()
            .map(|p| self.places[p.index()].len())
            .collect();

        // Tokens stay resident until the action and its outputs check out,
        // so a failed firing leaves the marking untouched.
        let mut values = Vec::with_capacity(binding.tokens.len());
        for &(place, token) in &binding.tokens {
            values.push(self.place(place)?.get(token)?.value().clone());
        }

        let event = &mut self.events[index];
        let mut ctx = FireContext {
            now,
            rng: &mut self.rng,
            observed: &observed,
        };
        let outputs = event.action.fire(&mut ctx, values)?;

        if outputs.len() != event.outputs.len() {
            return Err(SimError::ArityMismatch {
                event: event.name.clone(),
                expected: event.outputs.len(),
                actual: outputs.len(),
            });
        }
        let name = event.name.clone();
        let targets = event.outputs.clone();

        // Check every production before depositing any of them.
        let mut deposits = Vec::with_capacity(outputs.len());
        for (&place, out) in targets.iter().zip(outputs) {
            match out {
                None => deposits.push(None),
                Some(p) => {
                    if !p.delay.is_finite() || p.delay < 0.0 {
                        return Err(SimError::InvalidDelay {
                            event: name,
                            delay: p.delay,
                        });
                    }
                    let target = &self.places[place.index()];
                    if p.value.kind() != target.kind() {
                        return Err(SimError::KindMismatch {
                            place: target.name().to_string(),
                            expected: target.kind(),
                            actual: p.value.kind(),
                        });
                    }
                    deposits.push(Some(Deposit {
                        place,
                        time: now.plus(p.delay)?,
                        value: p.value,
                    }));
                }
            }
        }

        self.clock = now;
        let mut consumed = Vec::with_capacity(binding.tokens.len());
        for &(place, token) in &binding.tokens {
            consumed.push(self.place_mut(place)?.take(token)?.into_value());
        }
        for deposit in deposits.iter().flatten() {
            let id = self.token_ids.next_id();
            self.places[deposit.place.index()].put(Token::new(
                id,
                deposit.value.clone(),
                deposit.time,
            ))?;
        }

        self.steps += 1;
        debug!(
            step = self.steps,
            time = self.clock.as_f64(),
            event = %name,
            "fired"
        );

        let firing = Firing {
            step: self.steps,
            event: binding.event,
            name,
            time: self.clock,
            consumed,
            produced: deposits,
        };
        reporter.report(&firing);
        Ok(firing)
    }

    /// Fire the next candidate, whatever its time.
    ///
    /// Returns `None` if no event is enabled.
    pub fn step(&mut self, reporter: &mut dyn Reporter<V>) -> SimResult<Option<Firing<V>>> {
        match self.next_binding() {
            Some(binding) => self.fire_checked(binding, reporter).map(Some),
            None => Ok(None),
        }
    }

    /// Fire `binding` unless the step limit has been reached.
    fn fire_checked(
        &mut self,
        binding: Binding,
        reporter: &mut dyn Reporter<V>,
    ) -> SimResult<Firing<V>> {
        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(SimError::StepLimitExceeded {
                    limit,
                    time: self.clock.as_f64(),
                });
            }
        }
        self.fire(binding, reporter)
    }

    /// Fire until no candidate remains or the next one is at or beyond
    /// `horizon`. A horizon of 0 therefore fires nothing.
    pub fn run_until(
        &mut self,
        horizon: f64,
        reporter: &mut dyn Reporter<V>,
    ) -> SimResult<RunSummary> {
        let horizon = VirtualTime::try_new(horizon)?;
        let start = self.steps;

        let stop = loop {
            let binding = match self.next_binding() {
                Some(b) => b,
                None => break StopReason::Exhausted,
            };
            if binding.time >= horizon {
                break StopReason::Horizon;
            }
            self.fire_checked(binding, reporter)?;
        };

        Ok(RunSummary {
            steps: self.steps - start,
            clock: self.clock,
            stop,
        })
    }

    /// Fire at most `max_steps` candidates, ignoring any horizon.
    ///
    /// Returns the number of firings performed.
    pub fn run_for(&mut self, max_steps: u64, reporter: &mut dyn Reporter<V>) -> SimResult<u64> {
        let mut fired = 0u64;
        while fired < max_steps {
            if self.step(reporter)?.is_none() {
                break;
            }
            fired += 1;
        }
        Ok(fired)
    }

    /// Run to `horizon`, logging the start and end of the run.
    pub fn simulate(
        &mut self,
        horizon: f64,
        reporter: &mut dyn Reporter<V>,
    ) -> SimResult<RunSummary> {
        info!(
            horizon,
            seed = self.seed(),
            places = self.places.len(),
            events = self.events.len(),
            "simulation started"
        );
        let summary = self.run_until(horizon, reporter)?;
        info!(
            steps = summary.steps,
            clock = summary.clock.as_f64(),
            stop = ?summary.stop,
            "simulation finished"
        );
        Ok(summary)
    }

    // ── Inspection ────────────────────────────────────────────────

    /// Snapshot of places (with resident token counts) and events.
    pub fn topology(&self) -> Topology {
        let name_of = |p: &PlaceId| self.places[p.index()].name().to_string();
        Topology {
            places: self
                .places
                .iter()
                .map(|p| PlaceInfo {
                    name: p.name().to_string(),
                    kind: p.kind().to_string(),
                    tokens: p.len(),
                })
                .collect(),
            events: self
                .events
                .iter()
                .map(|e| EventInfo {
                    name: e.name().to_string(),
                    inputs: e.inputs().iter().map(name_of).collect(),
                    outputs: e.outputs().iter().map(name_of).collect(),
                    observes: e.observes().iter().map(name_of).collect(),
                })
                .collect(),
        }
    }

    /// Deterministic hash of the clock and every resident token.
    pub fn state_hash(&self) -> u64 {
        let mut h = hash_combine(0, self.clock.as_f64().to_bits());
        for place in &self.places {
            h = hash_combine(h, hash_bytes(place.name().as_bytes()));
            for token in place.peek_all() {
                h = hash_combine(h, token.id().raw());
                h = hash_combine(h, token.time().as_f64().to_bits());
                h = hash_combine(h, hash_bytes(format!("{:?}", token.value()).as_bytes()));
            }
        }
        h
    }
}
