/// Events (transitions) of a timed token net.
///
/// An event consumes one token from each input place, may read the token
/// counts of observed places, and deposits at most one token into each
/// output place, each after its own delay. Guards decide whether (and from
/// when) a candidate binding is enabled; actions compute what to deposit.
/// Both receive the bound values explicitly, never shared state.

use std::marker::PhantomData;

use crate::error::{SimError, SimResult};
use crate::place::PlaceId;
use crate::rng::{Dist, SimRng};
use crate::simulation::Net;
use crate::time::VirtualTime;
use crate::token::TokenValue;

// ── Event ID ──────────────────────────────────────────────────────────

/// Index of an event inside its `Net`, in declaration order.
///
/// Declaration order breaks ties between events ready at the same
/// instant: the event registered first fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(usize);

impl EventId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        EventId(index)
    }

    /// Declaration index of the event.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Produce / Rearm ───────────────────────────────────────────────────

/// A token an action wants deposited, `delay` after the firing instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Produce<V> {
    pub value: V,
    pub delay: f64,
}

impl<V> Produce<V> {
    /// Deposit immediately (delay 0).
    pub fn now(value: V) -> Self {
        Produce { value, delay: 0.0 }
    }

    /// Deposit after `delay`.
    pub fn after(value: V, delay: f64) -> Self {
        Produce { value, delay }
    }
}

/// The token a recurring event re-deposits into its trigger place.
#[derive(Debug, Clone, PartialEq)]
pub struct Rearm<V> {
    pub value: V,
    pub after: f64,
}

impl<V> Rearm<V> {
    pub fn after(value: V, after: f64) -> Self {
        Rearm { value, after }
    }
}

// ── FireContext ───────────────────────────────────────────────────────

/// What an action sees besides its bound values.
pub struct FireContext<'a> {
    pub(crate) now: VirtualTime,
    pub(crate) rng: &'a mut SimRng,
    pub(crate) observed: &'a [usize],
}

impl<'a> FireContext<'a> {
    /// The firing instant (the just-advanced clock).
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// The net's random source.
    pub fn rng(&mut self) -> &mut SimRng {
        self.rng
    }

    /// Draw from `dist` using the net's random source.
    pub fn sample(&mut self, dist: &Dist) -> f64 {
        self.rng.sample(dist)
    }

    /// Bernoulli trial using the net's random source.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.chance(p)
    }

    /// Resident token count of the `i`-th observed place, or 0 if the
    /// event observes fewer places.
    pub fn observed(&self, i: usize) -> usize {
        self.observed.get(i).copied().unwrap_or(0)
    }
}

// ── Guard / Action traits ─────────────────────────────────────────────

/// Decides from when a candidate binding is enabled.
///
/// Guards are read-only: they may be evaluated many times per step and
/// must not depend on anything but their arguments.
pub trait Guard<V> {
    /// Earliest instant at or after `from` at which the binding holds,
    /// or `None` if it never will with these values.
    fn ready_at(&self, from: VirtualTime, values: &[&V]) -> Option<VirtualTime>;
}

/// Computes the tokens an event deposits.
pub trait Action<V> {
    /// Consume `values` (one per input place) and return one optional
    /// production per output place.
    fn fire(
        &mut self,
        ctx: &mut FireContext<'_>,
        values: Vec<V>,
    ) -> SimResult<Vec<Option<Produce<V>>>>;
}

/// Boolean guard evaluated at the binding's earliest instant.
struct Predicate<F, const I: usize> {
    f: F,
}

impl<V, F, const I: usize> Guard<V> for Predicate<F, I>
where
    F: Fn(VirtualTime, &[&V; I]) -> bool,
{
    fn ready_at(&self, from: VirtualTime, values: &[&V]) -> Option<VirtualTime> {
        let values: &[&V; I] = values.try_into().ok()?;
        if (self.f)(from, values) {
            Some(from)
        } else {
            None
        }
    }
}

/// Guard that computes its own earliest instant.
struct ReadyWhen<F, const I: usize> {
    f: F,
}

impl<V, F, const I: usize> Guard<V> for ReadyWhen<F, I>
where
    F: Fn(VirtualTime, &[&V; I]) -> Option<VirtualTime>,
{
    fn ready_at(&self, from: VirtualTime, values: &[&V]) -> Option<VirtualTime> {
        let values: &[&V; I] = values.try_into().ok()?;
        (self.f)(from, values).map(|at| at.max(from))
    }
}

struct ArrayAction<F, V, const I: usize, const O: usize> {
    name: String,
    f: F,
    _values: PhantomData<fn(V)>,
}

impl<V, F, const I: usize, const O: usize> Action<V> for ArrayAction<F, V, I, O>
where
    F: FnMut(&mut FireContext<'_>, [V; I]) -> SimResult<[Option<Produce<V>>; O]>,
{
    fn fire(
        &mut self,
        ctx: &mut FireContext<'_>,
        values: Vec<V>,
    ) -> SimResult<Vec<Option<Produce<V>>>> {
        let actual = values.len();
        let values: [V; I] = values.try_into().map_err(|_| SimError::ArityMismatch {
            event: self.name.clone(),
            expected: I,
            actual,
        })?;
        Ok(Vec::from((self.f)(ctx, values)?))
    }
}

/// Self-scheduling action: always re-arms its trigger place first.
struct RecurringAction<F, V, const I: usize, const O: usize> {
    name: String,
    f: F,
    _values: PhantomData<fn(V)>,
}

impl<V, F, const I: usize, const O: usize> Action<V> for RecurringAction<F, V, I, O>
where
    F: FnMut(&mut FireContext<'_>, [V; I]) -> SimResult<(Rearm<V>, [Option<Produce<V>>; O])>,
{
    fn fire(
        &mut self,
        ctx: &mut FireContext<'_>,
        values: Vec<V>,
    ) -> SimResult<Vec<Option<Produce<V>>>> {
        let actual = values.len();
        let values: [V; I] = values.try_into().map_err(|_| SimError::ArityMismatch {
            event: self.name.clone(),
            expected: I,
            actual,
        })?;
        let (rearm, rest) = (self.f)(ctx, values)?;
        let mut out = Vec::with_capacity(O + 1);
        out.push(Some(Produce::after(rearm.value, rearm.after)));
        out.extend(rest);
        Ok(out)
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A registered transition.
pub struct Event<V> {
    pub(crate) id: EventId,
    pub(crate) name: String,
    pub(crate) inputs: Vec<PlaceId>,
    pub(crate) outputs: Vec<PlaceId>,
    pub(crate) observes: Vec<PlaceId>,
    pub(crate) guard: Option<Box<dyn Guard<V>>>,
    pub(crate) action: Box<dyn Action<V>>,
}

impl<V> Event<V> {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[PlaceId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PlaceId] {
        &self.outputs
    }

    pub fn observes(&self) -> &[PlaceId] {
        &self.observes
    }

    /// Evaluate the guard for a candidate binding.
    pub(crate) fn ready_at(&self, from: VirtualTime, values: &[&V]) -> Option<VirtualTime> {
        match &self.guard {
            Some(guard) => guard.ready_at(from, values),
            None => Some(from),
        }
    }
}

impl<V> std::fmt::Debug for Event<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("observes", &self.observes)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

// ── EventBuilder ──────────────────────────────────────────────────────

/// Fluent builder for registering an event on a [`Net`].
///
/// The const parameters track the number of input (`I`) and output (`O`)
/// places so that guards and actions are type-checked against the
/// declared arcs.
///
/// # Example
/// ```rust
/// use tokensim::{Net, Produce, TokenValue};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Job(u32);
/// impl TokenValue for Job {
///     fn kind(&self) -> &'static str { "job" }
/// }
///
/// let mut net: Net<Job> = Net::new(7);
/// let todo = net.add_place("todo", "job").unwrap();
/// let done = net.add_place("done", "job").unwrap();
/// net.put(todo, Job(1), 0.0).unwrap();
///
/// net.event("work")
///     .inputs([todo])
///     .outputs([done])
///     .guard(|_, [job]| job.0 > 0)
///     .action(|_, [job]| Ok([Some(Produce::after(job, 3.0))]))
///     .register()
///     .unwrap();
/// ```
pub struct EventBuilder<'n, V: TokenValue + 'static, const I: usize, const O: usize> {
    net: &'n mut Net<V>,
    name: String,
    inputs: Vec<PlaceId>,
    outputs: Vec<PlaceId>,
    observes: Vec<PlaceId>,
    rearm: Option<PlaceId>,
    guard: Option<(usize, Box<dyn Guard<V>>)>,
    action: Option<((usize, usize), Box<dyn Action<V>>)>,
}

impl<'n, V: TokenValue + 'static> EventBuilder<'n, V, 0, 0> {
    pub(crate) fn new(net: &'n mut Net<V>, name: &str) -> Self {
        EventBuilder {
            net,
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            observes: Vec::new(),
            rearm: None,
            guard: None,
            action: None,
        }
    }
}

impl<'n, V: TokenValue + 'static, const I: usize, const O: usize> EventBuilder<'n, V, I, O> {
    /// Declare the input places, in binding order.
    pub fn inputs<const N: usize>(self, places: [PlaceId; N]) -> EventBuilder<'n, V, N, O> {
        EventBuilder {
            net: self.net,
            name: self.name,
            inputs: places.to_vec(),
            outputs: self.outputs,
            observes: self.observes,
            rearm: self.rearm,
            guard: self.guard,
            action: self.action,
        }
    }

    /// Declare the output places, in production order.
    pub fn outputs<const N: usize>(self, places: [PlaceId; N]) -> EventBuilder<'n, V, I, N> {
        EventBuilder {
            net: self.net,
            name: self.name,
            inputs: self.inputs,
            outputs: places.to_vec(),
            observes: self.observes,
            rearm: self.rearm,
            guard: self.guard,
            action: self.action,
        }
    }

    /// Places whose resident token counts the action may read.
    pub fn observes(mut self, places: impl IntoIterator<Item = PlaceId>) -> Self {
        self.observes = places.into_iter().collect();
        self
    }

    /// Boolean guard, evaluated at the binding's earliest instant.
    pub fn guard<F>(mut self, f: F) -> Self
    where
        F: Fn(VirtualTime, &[&V; I]) -> bool + 'static,
    {
        let guard: Box<dyn Guard<V>> = Box::new(Predicate::<F, I> { f });
        self.guard = Some((I, guard));
        self
    }

    /// Guard returning the earliest instant (at or after its first
    /// argument) from which the binding is enabled.
    pub fn ready_when<F>(mut self, f: F) -> Self
    where
        F: Fn(VirtualTime, &[&V; I]) -> Option<VirtualTime> + 'static,
    {
        let guard: Box<dyn Guard<V>> = Box::new(ReadyWhen::<F, I> { f });
        self.guard = Some((I, guard));
        self
    }

    /// The action, producing exactly one optional token per output.
    pub fn action<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut FireContext<'_>, [V; I]) -> SimResult<[Option<Produce<V>>; O]> + 'static,
    {
        let action: Box<dyn Action<V>> = Box::new(ArrayAction::<F, V, I, O> {
            name: self.name.clone(),
            f,
            _values: PhantomData,
        });
        self.rearm = None;
        self.action = Some(((I, O), action));
        self
    }

    /// A self-scheduling action: besides its regular outputs it always
    /// re-deposits one token into `trigger`, so the event keeps firing
    /// until the horizon without recursion.
    pub fn recurring_action<F>(mut self, trigger: PlaceId, f: F) -> Self
    where
        F: FnMut(&mut FireContext<'_>, [V; I]) -> SimResult<(Rearm<V>, [Option<Produce<V>>; O])>
            + 'static,
    {
        let action: Box<dyn Action<V>> = Box::new(RecurringAction::<F, V, I, O> {
            name: self.name.clone(),
            f,
            _values: PhantomData,
        });
        self.rearm = Some(trigger);
        self.action = Some(((I, O + 1), action));
        self
    }

    /// Validate the wiring and add the event to the net.
    pub fn register(self) -> SimResult<EventId> {
        let (arity, action) = self
            .action
            .ok_or_else(|| SimError::MissingAction(self.name.clone()))?;

        let outputs: Vec<PlaceId> = self.rearm.into_iter().chain(self.outputs).collect();

        if arity != (self.inputs.len(), outputs.len()) {
            let (expected, actual) = if arity.0 != self.inputs.len() {
                (self.inputs.len(), arity.0)
            } else {
                (outputs.len(), arity.1)
            };
            return Err(SimError::ArityMismatch {
                event: self.name,
                expected,
                actual,
            });
        }

        let guard = match self.guard {
            Some((n, _)) if n != self.inputs.len() => {
                return Err(SimError::ArityMismatch {
                    event: self.name,
                    expected: self.inputs.len(),
                    actual: n,
                });
            }
            Some((_, g)) => Some(g),
            None => None,
        };

        self.net.add_event(Event {
            id: EventId::new(0),
            name: self.name,
            inputs: self.inputs,
            outputs,
            observes: self.observes,
            guard,
            action,
        })
    }
}
