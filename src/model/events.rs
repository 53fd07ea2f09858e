//! The model's event logic as plain functions over bound values.
//!
//! Random draws are made by the callers in `model/mod.rs`; these
//! functions only rearrange values, so each can be tested on its own.

use crate::model::value::{Busy, Customer, Server};
use crate::time::VirtualTime;

// ── Arrival ───────────────────────────────────────────────────────────

/// Append customer `counter`, arriving `now`, to the waiting line.
/// Returns the next counter value and the new line.
pub fn arrive(now: VirtualTime, counter: u64, mut queue: Vec<Customer>) -> (u64, Vec<Customer>) {
    queue.push(Customer::new(counter, now));
    (counter + 1, queue)
}

// ── Service ───────────────────────────────────────────────────────────

/// Pop the head of the line, or `None` if it is empty.
pub fn start_service(mut queue: Vec<Customer>) -> Option<(Customer, Vec<Customer>)> {
    if queue.is_empty() {
        return None;
    }
    let head = queue.remove(0);
    Some((head, queue))
}

/// Aggregates after a completed service.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The server, released so it can decide on a break.
    pub server: Server,
    pub served: Vec<Customer>,
    pub service_times: Vec<f64>,
    pub waiting_times: Vec<f64>,
}

/// Finish serving `busy.customer` at `now`.
///
/// The recorded service time runs from arrival to completion; the
/// waiting time from arrival to the start of service.
pub fn end_service(
    now: VirtualTime,
    busy: Busy,
    mut served: Vec<Customer>,
    mut service_times: Vec<f64>,
    mut waiting_times: Vec<f64>,
) -> Completion {
    let arrival = busy.customer.arrival_time;
    service_times.push(now.duration_since(arrival).unwrap_or(0.0));
    waiting_times.push(busy.started_at.duration_since(arrival).unwrap_or(0.0));
    served.push(busy.customer);
    Completion {
        server: Server {
            released: true,
            ..busy.server
        },
        served,
        service_times,
        waiting_times,
    }
}

// ── Reneging ──────────────────────────────────────────────────────────

/// Whether `customer` has waited strictly longer than `threshold` at `now`.
pub fn has_waited_too_long(now: VirtualTime, customer: &Customer, threshold: f64) -> bool {
    match customer.arrival_time.plus(threshold) {
        Ok(limit) => now > limit,
        Err(_) => false,
    }
}

/// Earliest instant at which some customer in `queue` has waited
/// strictly longer than `threshold`.
pub fn reneging_ready_at(queue: &[Customer], threshold: f64) -> Option<VirtualTime> {
    queue
        .iter()
        .filter_map(|c| c.arrival_time.plus(threshold).ok())
        .min()
        .map(VirtualTime::next_after)
}

/// Split the line into customers who stay and customers who leave.
///
/// `leaves` is asked once per customer past the threshold, in line
/// order; everybody else stays without a draw.
pub fn renege(
    now: VirtualTime,
    queue: Vec<Customer>,
    threshold: f64,
    mut leaves: impl FnMut(&Customer) -> bool,
) -> (Vec<Customer>, Vec<Customer>) {
    let mut remaining = Vec::with_capacity(queue.len());
    let mut leaving = Vec::new();
    for customer in queue {
        if has_waited_too_long(now, &customer, threshold) && leaves(&customer) {
            leaving.push(customer);
        } else {
            remaining.push(customer);
        }
    }
    (remaining, leaving)
}

// ── Breaks ────────────────────────────────────────────────────────────

/// Outcome of a released server's break decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Back to `free`, ready to serve.
    Work(Server),
    /// Into `break`.
    Rest(Server),
}

pub fn choose_break(server: Server, take_break: bool) -> BreakDecision {
    let server = Server {
        released: false,
        ..server
    };
    if take_break {
        BreakDecision::Rest(server)
    } else {
        BreakDecision::Work(server)
    }
}

/// A server coming back from its break goes straight back to work.
pub fn instructor_return(server: Server) -> Server {
    Server {
        released: false,
        ..server
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t: f64) -> VirtualTime {
        VirtualTime::new(t)
    }

    fn line(arrivals: &[f64]) -> Vec<Customer> {
        arrivals
            .iter()
            .enumerate()
            .map(|(i, &t)| Customer::new(i as u64 + 1, at(t)))
            .collect()
    }

    #[test]
    fn test_arrive_appends() {
        let (next, queue) = arrive(at(4.0), 3, line(&[1.0]));
        assert_eq!(next, 4);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1], Customer::new(3, at(4.0)));
    }

    #[test]
    fn test_start_service_is_fifo() {
        let (head, rest) = start_service(line(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(head.id, "g1");
        assert_eq!(rest.len(), 2);
        assert!(start_service(Vec::new()).is_none());
    }

    #[test]
    fn test_end_service_records() {
        let busy = Busy {
            server: Server {
                id: 2,
                released: false,
            },
            customer: Customer::new(1, at(5.0)),
            started_at: at(8.0),
        };
        let done = end_service(at(20.0), busy, Vec::new(), vec![1.0], Vec::new());
        assert_eq!(done.service_times, vec![1.0, 15.0]);
        assert_eq!(done.waiting_times, vec![3.0]);
        assert_eq!(done.served[0].id, "g1");
        assert_eq!(
            done.server,
            Server {
                id: 2,
                released: true
            }
        );
    }

    #[test]
    fn test_reneging_ready_at() {
        assert_eq!(reneging_ready_at(&[], 10.0), None);
        let ready = reneging_ready_at(&line(&[7.0, 3.0]), 10.0).unwrap();
        assert!(ready > at(13.0));
        assert!(ready < at(13.000001));
    }

    #[test]
    fn test_threshold_is_strict() {
        let c = Customer::new(1, at(0.0));
        assert!(!has_waited_too_long(at(10.0), &c, 10.0));
        assert!(has_waited_too_long(at(10.0).next_after(), &c, 10.0));
    }

    #[test]
    fn test_renege_only_asks_for_overdue() {
        let mut asked = Vec::new();
        let (stay, gone) = renege(at(15.0), line(&[1.0, 5.0, 12.0]), 10.0, |c| {
            asked.push(c.id.clone());
            true
        });
        // g2 waited exactly 10: not overdue.
        assert_eq!(asked, vec!["g1"]);
        assert_eq!(gone.len(), 1);
        assert_eq!(stay.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["g2", "g3"]);
    }

    #[test]
    fn test_renege_keeps_when_coin_fails() {
        let (stay, gone) = renege(at(100.0), line(&[1.0, 2.0]), 10.0, |_| false);
        assert_eq!(stay.len(), 2);
        assert!(gone.is_empty());
    }

    #[test]
    fn test_break_decision_clears_release() {
        let s = Server {
            id: 0,
            released: true,
        };
        assert_eq!(
            choose_break(s, true),
            BreakDecision::Rest(Server {
                id: 0,
                released: false
            })
        );
        assert_eq!(
            choose_break(s, false),
            BreakDecision::Work(Server {
                id: 0,
                released: false
            })
        );
        assert!(!instructor_return(s).released);
    }
}
