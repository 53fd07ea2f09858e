//! Firing reports.
//!
//! After every firing the kernel hands a [`Firing`] to a [`Reporter`].
//! Reporters only observe; nothing they do feeds back into scheduling.

use std::fmt;
use std::io::{self, Write};

use tracing::{info, warn};

use crate::event::EventId;
use crate::place::PlaceId;
use crate::time::VirtualTime;

// ── Firing ────────────────────────────────────────────────────────────

/// A token deposited by a firing.
#[derive(Debug, Clone, PartialEq)]
pub struct Deposit<V> {
    pub place: PlaceId,
    pub value: V,
    /// Availability time of the new token (`clock + delay`).
    pub time: VirtualTime,
}

/// Everything observable about one firing.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing<V> {
    /// 1-based index of the firing within the run.
    pub step: u64,
    pub event: EventId,
    pub name: String,
    /// The clock value the event fired at.
    pub time: VirtualTime,
    /// Consumed values, one per input place.
    pub consumed: Vec<V>,
    /// One entry per output place; `None` where nothing was produced.
    pub produced: Vec<Option<Deposit<V>>>,
}

impl<V: fmt::Debug> fmt::Display for Firing<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} consumed=[", self.step, self.time, self.name)?;
        for (i, v) in self.consumed.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", v)?;
        }
        write!(f, "] produced=[")?;
        for (i, d) in self.produced.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match d {
                Some(d) => write!(f, "{}:{:?}@{}", d.place, d.value, d.time)?,
                None => write!(f, "-")?,
            }
        }
        write!(f, "]")
    }
}

// ── Reporter trait ────────────────────────────────────────────────────

/// Observer of firings.
pub trait Reporter<V> {
    /// Called once per firing, after its tokens have been deposited.
    fn report(&mut self, firing: &Firing<V>);
}

/// A reporter backed by a closure, handy in tests.
impl<V, F> Reporter<V> for F
where
    F: FnMut(&Firing<V>),
{
    fn report(&mut self, firing: &Firing<V>) {
        (self)(firing);
    }
}

/// Discards every firing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl<V> Reporter<V> for NullReporter {
    fn report(&mut self, _firing: &Firing<V>) {}
}

/// Writes one line per firing.
#[derive(Debug)]
pub struct PrintReporter<W: Write> {
    out: W,
    failed: bool,
}

impl PrintReporter<io::Stdout> {
    /// Print to standard output.
    pub fn stdout() -> Self {
        PrintReporter::new(io::stdout())
    }
}

impl<W: Write> PrintReporter<W> {
    pub fn new(out: W) -> Self {
        PrintReporter { out, failed: false }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<V: fmt::Debug, W: Write> Reporter<V> for PrintReporter<W> {
    fn report(&mut self, firing: &Firing<V>) {
        if self.failed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", firing) {
            // Report once, then stay quiet for the rest of the run.
            warn!(error = %e, "firing reporter output failed");
            self.failed = true;
        }
    }
}

/// Emits each firing as a `tracing` event at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl<V: fmt::Debug> Reporter<V> for TracingReporter {
    fn report(&mut self, firing: &Firing<V>) {
        info!(
            step = firing.step,
            time = firing.time.as_f64(),
            event = %firing.name,
            consumed = ?firing.consumed,
            produced = firing.produced.iter().flatten().count(),
            "fired"
        );
    }
}

/// Forwards every firing to two reporters, in order.
#[derive(Debug, Clone, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<V, A: Reporter<V>, B: Reporter<V>> Reporter<V> for Tee<A, B> {
    fn report(&mut self, firing: &Firing<V>) {
        self.0.report(firing);
        self.1.report(firing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firing() -> Firing<u32> {
        Firing {
            step: 3,
            event: EventId::new(1),
            name: "start_service".into(),
            time: VirtualTime::new(5.0),
            consumed: vec![7, 8],
            produced: vec![
                Some(Deposit {
                    place: PlaceId::new(2),
                    value: 9,
                    time: VirtualTime::new(15.0),
                }),
                None,
            ],
        }
    }

    #[test]
    fn test_display_line() {
        assert_eq!(
            firing().to_string(),
            "#3 T=5.000 start_service consumed=[7, 8] produced=[P2:9@T=15.000, -]"
        );
    }

    #[test]
    fn test_print_reporter_writes_lines() {
        let mut r = PrintReporter::new(Vec::new());
        r.report(&firing());
        r.report(&firing());
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("#3 T=5.000 start_service"));
    }

    #[test]
    fn test_closure_and_tee() {
        let mut names: Vec<String> = Vec::new();
        let mut count = 0;
        {
            let mut tee = Tee(
                |f: &Firing<u32>| names.push(f.name.clone()),
                |_: &Firing<u32>| count += 1,
            );
            tee.report(&firing());
            tee.report(&firing());
        }
        assert_eq!(names, vec!["start_service", "start_service"]);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_null_reporter() {
        let mut r = NullReporter;
        Reporter::<u32>::report(&mut r, &firing());
    }
}
