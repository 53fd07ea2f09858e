//! Single-queue service model.
//!
//! Customers arrive into one waiting line and are served first come,
//! first served. Servers alternate between working and taking breaks,
//! and customers who wait too long may give up (renege).
//!
//! ```text
//!   event              consumes                  produces
//!   arrive             arrival, waiting          arrival (re-armed), waiting
//!   start_service      free, waiting             busy, waiting | free, waiting
//!   end_service        busy, served, *_times     free, served, *_times
//!   reneging_event     waiting, gone, recheck    waiting, gone, recheck (reads busy, break)
//!   choose_break       free                      free | break
//!   instructor_return  break                     free
//! ```
//!
//! The waiting line is always handed back immediately, so arrivals and
//! service starts never wait on a reneging check. The check is paced by
//! its own timer token in `recheck`.

pub mod config;
pub mod events;
pub mod value;

#[cfg(test)]
mod tests;

use std::fmt;

use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::event::{Produce, Rearm};
use crate::place::PlaceId;
use crate::report::Reporter;
use crate::simulation::Net;
use crate::time::VirtualTime;
use crate::token::TokenValue;

pub use config::{FirstArrival, ModelConfig, RenegePolicy};
pub use events::BreakDecision;
pub use value::{Busy, Customer, Server, Value};

/// Handles to the model's places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Places {
    /// Counter token that drives the arrival generator.
    pub arrival: PlaceId,
    pub waiting: PlaceId,
    pub free: PlaceId,
    pub busy: PlaceId,
    pub on_break: PlaceId,
    pub served: PlaceId,
    pub gone: PlaceId,
    /// Timer that paces `reneging_event`.
    pub recheck: PlaceId,
    pub service_times: PlaceId,
    pub waiting_times: PlaceId,
}

// ── QueueModel ────────────────────────────────────────────────────────

/// The queueing model wired onto a [`Net`].
#[derive(Debug)]
pub struct QueueModel {
    config: ModelConfig,
    net: Net<Value>,
    places: Places,
}

impl QueueModel {
    /// Validate `config` and build the net in its initial state.
    pub fn new(config: ModelConfig) -> SimResult<Self> {
        config.validate()?;

        let mut net = Net::new(config.seed);
        net.set_step_limit(config.step_limit);
        let places = declare_places(&mut net)?;
        seed_tokens(&mut net, &places, &config)?;
        register_events(&mut net, &places, &config)?;
        debug!(seed = config.seed, servers = config.servers, "queue model built");

        Ok(QueueModel { config, net, places })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn places(&self) -> &Places {
        &self.places
    }

    pub fn net(&self) -> &Net<Value> {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut Net<Value> {
        &mut self.net
    }

    /// Run until `horizon` and summarise the final state.
    pub fn simulate(
        &mut self,
        horizon: f64,
        reporter: &mut dyn Reporter<Value>,
    ) -> SimResult<Summary> {
        self.net.simulate(horizon, reporter)?;
        self.summary()
    }

    /// Run until the configured horizon.
    pub fn run(&mut self, reporter: &mut dyn Reporter<Value>) -> SimResult<Summary> {
        let horizon = self.config.horizon;
        self.simulate(horizon, reporter)
    }

    /// Read the aggregates out of the current marking.
    pub fn summary(&self) -> SimResult<Summary> {
        let p = &self.places;
        let next = self.single(p.arrival)?.clone().into_counter()?;
        let in_service = self
            .net
            .peek_all(p.busy)?
            .iter()
            .filter_map(|t| t.value().as_busy())
            .map(|b| b.customer.clone())
            .collect();

        Ok(Summary {
            clock: self.net.clock(),
            steps: self.net.steps(),
            arrived: next.saturating_sub(1),
            served: self.single(p.served)?.clone().into_customers()?,
            gone: self.single(p.gone)?.clone().into_customers()?,
            waiting: self.single(p.waiting)?.clone().into_queue()?,
            in_service,
            service_times: self.single(p.service_times)?.clone().into_samples()?,
            waiting_times: self.single(p.waiting_times)?.clone().into_samples()?,
        })
    }

    /// The value of a place that always holds exactly one token.
    fn single(&self, place: PlaceId) -> SimResult<&Value> {
        let tokens = self.net.peek_all(place)?;
        match tokens.first() {
            Some(token) => Ok(token.value()),
            None => Err(SimError::NotAvailable {
                place: self.net.place(place)?.name().to_string(),
                token: 0,
            }),
        }
    }
}

// ── Summary ───────────────────────────────────────────────────────────

/// Final state of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub clock: VirtualTime,
    /// Total firings.
    pub steps: u64,
    /// Customers created by `arrive`.
    pub arrived: u64,
    pub served: Vec<Customer>,
    pub gone: Vec<Customer>,
    /// Still in line when the run stopped.
    pub waiting: Vec<Customer>,
    /// Being served when the run stopped.
    pub in_service: Vec<Customer>,
    pub service_times: Vec<f64>,
    pub waiting_times: Vec<f64>,
}

impl Summary {
    /// Every arrived customer is accounted for exactly once.
    pub fn is_conserved(&self) -> bool {
        let accounted =
            self.served.len() + self.gone.len() + self.waiting.len() + self.in_service.len();
        accounted as u64 == self.arrived
    }

    pub fn mean_service_time(&self) -> Option<f64> {
        mean(&self.service_times)
    }

    pub fn mean_waiting_time(&self) -> Option<f64> {
        mean(&self.waiting_times)
    }
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "clock       {}", self.clock)?;
        writeln!(f, "firings     {}", self.steps)?;
        writeln!(f, "arrived     {}", self.arrived)?;
        writeln!(f, "served      {}", self.served.len())?;
        writeln!(f, "gone        {}", self.gone.len())?;
        writeln!(f, "waiting     {}", self.waiting.len())?;
        writeln!(f, "in service  {}", self.in_service.len())?;
        match self.mean_service_time() {
            Some(m) => writeln!(f, "mean service time {:.2}", m)?,
            None => writeln!(f, "mean service time -")?,
        }
        match self.mean_waiting_time() {
            Some(m) => write!(f, "mean waiting time {:.2}", m),
            None => write!(f, "mean waiting time -"),
        }
    }
}

// ── Wiring ────────────────────────────────────────────────────────────

fn declare_places(net: &mut Net<Value>) -> SimResult<Places> {
    Ok(Places {
        arrival: net.add_place("arrival", value::COUNTER)?,
        waiting: net.add_place("waiting", value::QUEUE)?,
        free: net.add_place("free", value::SERVER)?,
        busy: net.add_place("busy", value::BUSY)?,
        on_break: net.add_place("break", value::SERVER)?,
        served: net.add_place("served", value::CUSTOMERS)?,
        gone: net.add_place("gone", value::CUSTOMERS)?,
        recheck: net.add_place("recheck", value::TIMER)?,
        service_times: net.add_place("service_times", value::SAMPLES)?,
        waiting_times: net.add_place("waiting_times", value::SAMPLES)?,
    })
}

fn seed_tokens(net: &mut Net<Value>, p: &Places, config: &ModelConfig) -> SimResult<()> {
    let first = match config.first_arrival {
        FirstArrival::At(t) => t,
        FirstArrival::Draw => net.rng_mut().sample(&config.interarrival),
    };
    net.put(p.arrival, Value::Counter(1), first)?;
    net.put(p.waiting, Value::Queue(Vec::new()), 0.0)?;
    for id in 0..config.servers {
        // Released, so every server makes a break decision at t=0.
        net.put(p.free, Value::Server(Server { id, released: true }), 0.0)?;
    }
    net.put(p.served, Value::Customers(Vec::new()), 0.0)?;
    net.put(p.gone, Value::Customers(Vec::new()), 0.0)?;
    net.put(p.recheck, Value::Timer, 0.0)?;
    net.put(p.service_times, Value::Samples(Vec::new()), 0.0)?;
    net.put(p.waiting_times, Value::Samples(Vec::new()), 0.0)?;
    Ok(())
}

/// Register the six events. Declaration order is the tie-break order.
fn register_events(net: &mut Net<Value>, p: &Places, config: &ModelConfig) -> SimResult<()> {
    let interarrival = config.interarrival;
    net.event("arrive")
        .inputs([p.arrival, p.waiting])
        .outputs([p.waiting])
        .recurring_action(p.arrival, move |ctx, [counter, queue]| {
            let counter = counter.into_counter()?;
            let queue = queue.into_queue()?;
            let gap = ctx.sample(&interarrival);
            let (next, queue) = events::arrive(ctx.now(), counter, queue);
            Ok((
                Rearm::after(Value::Counter(next), gap),
                [Some(Produce::now(Value::Queue(queue)))],
            ))
        })
        .register()?;

    let service = config.service;
    net.event("start_service")
        .inputs([p.free, p.waiting])
        .outputs([p.busy, p.waiting, p.free])
        .guard(|_, [server, queue]| {
            server.as_server().map_or(false, |s| !s.released)
                && queue.as_queue().map_or(false, |q| !q.is_empty())
        })
        .action(move |ctx, [server, queue]| {
            let server = server.into_server()?;
            match events::start_service(queue.into_queue()?) {
                Some((customer, rest)) => {
                    let duration = ctx.sample(&service);
                    let busy = Busy {
                        server,
                        customer,
                        started_at: ctx.now(),
                    };
                    Ok([
                        Some(Produce::after(Value::Busy(busy), duration)),
                        Some(Produce::now(Value::Queue(rest))),
                        None,
                    ])
                }
                None => {
                    warn!(server = server.id, "start_service found an empty queue");
                    Ok([
                        None,
                        Some(Produce::now(Value::Queue(Vec::new()))),
                        Some(Produce::now(Value::Server(server))),
                    ])
                }
            }
        })
        .register()?;

    net.event("end_service")
        .inputs([p.busy, p.served, p.service_times, p.waiting_times])
        .outputs([p.free, p.served, p.service_times, p.waiting_times])
        .action(|ctx, [busy, served, service_times, waiting_times]| {
            let done = events::end_service(
                ctx.now(),
                busy.into_busy()?,
                served.into_customers()?,
                service_times.into_samples()?,
                waiting_times.into_samples()?,
            );
            Ok([
                Some(Produce::now(Value::Server(done.server))),
                Some(Produce::now(Value::Customers(done.served))),
                Some(Produce::now(Value::Samples(done.service_times))),
                Some(Produce::now(Value::Samples(done.waiting_times))),
            ])
        })
        .register()?;

    let threshold = config.renege_threshold;
    let recheck_delay = config.recheck_delay;
    let policy = config.renege;
    net.event("reneging_event")
        .inputs([p.waiting, p.gone, p.recheck])
        .outputs([p.waiting, p.gone, p.recheck])
        .observes([p.busy, p.on_break])
        .ready_when(move |_, [queue, _, _]| {
            queue
                .as_queue()
                .and_then(|q| events::reneging_ready_at(q, threshold))
        })
        .action(move |ctx, [queue, gone, _]| {
            let queue = queue.into_queue()?;
            let mut gone = gone.into_customers()?;
            let now = ctx.now();
            let prob = policy.probability(ctx.observed(0), ctx.observed(1));
            let (remaining, leaving) =
                events::renege(now, queue, threshold, |_| ctx.chance(prob));
            if !leaving.is_empty() {
                debug!(count = leaving.len(), time = now.as_f64(), "customers reneged");
            }
            gone.extend(leaving);
            let delay = if remaining.is_empty() { 0.0 } else { recheck_delay };
            Ok([
                Some(Produce::now(Value::Queue(remaining))),
                Some(Produce::now(Value::Customers(gone))),
                Some(Produce::after(Value::Timer, delay)),
            ])
        })
        .register()?;

    let break_probability = config.break_probability;
    let break_duration = config.break_duration;
    net.event("choose_break")
        .inputs([p.free])
        .outputs([p.free, p.on_break])
        .guard(|_, [server]| server.as_server().map_or(false, |s| s.released))
        .action(move |ctx, [server]| {
            let server = server.into_server()?;
            let take_break = ctx.chance(break_probability);
            match events::choose_break(server, take_break) {
                BreakDecision::Work(s) => Ok([Some(Produce::now(Value::Server(s))), None]),
                BreakDecision::Rest(s) => {
                    let duration = ctx.sample(&break_duration);
                    Ok([None, Some(Produce::after(Value::Server(s), duration))])
                }
            }
        })
        .register()?;

    net.event("instructor_return")
        .inputs([p.on_break])
        .outputs([p.free])
        .action(|_, [server]| {
            let server = events::instructor_return(server.into_server()?);
            Ok([Some(Produce::now(Value::Server(server)))])
        })
        .register()?;

    Ok(())
}

/// Where every server token currently is, as `(server id, place kind)`.
///
/// Exposed for invariant checks: each server must appear exactly once.
pub fn server_locations(model: &QueueModel) -> SimResult<Vec<(u32, &'static str)>> {
    let p = model.places();
    let net = model.net();
    let mut out = Vec::new();
    for (place, label) in [(p.free, "free"), (p.busy, "busy"), (p.on_break, "break")] {
        for token in net.peek_all(place)? {
            let id = match token.value() {
                Value::Server(s) => s.id,
                Value::Busy(b) => b.server.id,
                other => {
                    return Err(SimError::UnexpectedValue {
                        expected: value::SERVER,
                        actual: other.kind(),
                    })
                }
            };
            out.push((id, label));
        }
    }
    Ok(out)
}
