//! Binding enumeration.
//!
//! A binding assigns one resident token to every input place of an event.
//! For each event the kernel walks the Cartesian product of the input
//! places' tokens and keeps the binding that becomes ready earliest.

use crate::event::{Event, EventId};
use crate::place::{Place, PlaceId};
use crate::time::VirtualTime;
use crate::token::{TokenId, TokenValue};

/// A candidate firing: which tokens an event would consume, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The event this binding enables.
    pub event: EventId,
    /// Earliest instant at which the binding is enabled.
    pub time: VirtualTime,
    /// One `(place, token)` pair per input place, in input order.
    pub tokens: Vec<(PlaceId, TokenId)>,
}

/// Find the earliest-ready binding of `event`, or `None` if the event is
/// not enabled by any combination of resident tokens.
///
/// A binding's evaluation instant is the latest availability time of its
/// tokens, but never earlier than `clock`. The guard may push it later.
/// Combinations are visited in lexicographic order (first input place
/// most significant, tokens in insertion order) and only a strictly
/// earlier binding replaces the current best, so ties resolve to place
/// declaration order, then token insertion order.
pub(crate) fn best_binding<V: TokenValue>(
    places: &[Place<V>],
    event: &Event<V>,
    clock: VirtualTime,
) -> Option<Binding> {
    let pools: Vec<&Place<V>> = event
        .inputs()
        .iter()
        .map(|p| places.get(p.index()))
        .collect::<Option<Vec<_>>>()?;

    if pools.iter().any(|p| p.is_empty()) {
        return None;
    }

    let mut cursor = vec![0usize; pools.len()];
    let mut best: Option<(VirtualTime, Vec<usize>)> = None;
    let mut values: Vec<&V> = Vec::with_capacity(pools.len());

    loop {
        let from = cursor
            .iter()
            .zip(&pools)
            .map(|(&i, p)| p.peek_all()[i].time())
            .fold(clock, Ord::max);

        let can_improve = match &best {
            Some((t, _)) => from < *t,
            None => true,
        };

        if can_improve {
            values.clear();
            values.extend(
                cursor
                    .iter()
                    .zip(&pools)
                    .map(|(&i, p)| p.peek_all()[i].value()),
            );
            if let Some(at) = event.ready_at(from, &values) {
                let improves = match &best {
                    Some((t, _)) => at < *t,
                    None => true,
                };
                if improves {
                    best = Some((at, cursor.clone()));
                    if at == clock {
                        // Nothing can be ready before the clock.
                        break;
                    }
                }
            }
        }

        if !advance(&mut cursor, &pools) {
            break;
        }
    }

    best.map(|(time, cursor)| Binding {
        event: event.id(),
        time,
        tokens: cursor
            .iter()
            .zip(&pools)
            .map(|(&i, p)| (p.id(), p.peek_all()[i].id()))
            .collect(),
    })
}

/// Odometer step over the Cartesian product; the last input varies
/// fastest. Returns `false` once every combination has been visited.
fn advance<V: TokenValue>(cursor: &mut [usize], pools: &[&Place<V>]) -> bool {
    for pos in (0..cursor.len()).rev() {
        cursor[pos] += 1;
        if cursor[pos] < pools[pos].len() {
            return true;
        }
        cursor[pos] = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::event::Produce;
    use crate::simulation::Net;
    use crate::time::VirtualTime;
    use crate::token::TokenValue;

    #[derive(Debug, Clone, PartialEq)]
    struct N(u32);

    impl TokenValue for N {
        fn kind(&self) -> &'static str {
            "n"
        }
    }

    fn two_place_net() -> (Net<N>, crate::place::PlaceId, crate::place::PlaceId) {
        let mut net = Net::new(0);
        let a = net.add_place("a", "n").unwrap();
        let b = net.add_place("b", "n").unwrap();
        (net, a, b)
    }

    #[test]
    fn test_earliest_max_time_wins() {
        let (mut net, a, b) = two_place_net();
        net.put(a, N(1), 8.0).unwrap();
        net.put(a, N(2), 2.0).unwrap();
        net.put(b, N(3), 5.0).unwrap();
        net.event("join")
            .inputs([a, b])
            .outputs([])
            .action(|_, [_, _]| Ok([]))
            .register()
            .unwrap();

        let binding = net.next_binding().unwrap();
        // max(2, 5) = 5 beats max(8, 5) = 8.
        assert_eq!(binding.time, VirtualTime::new(5.0));
        let a_token = net.peek_all(a).unwrap()[1].id();
        assert_eq!(binding.tokens[0], (a, a_token));
    }

    #[test]
    fn test_ties_resolve_to_insertion_order() {
        let (mut net, a, b) = two_place_net();
        net.put(a, N(1), 1.0).unwrap();
        net.put(a, N(2), 1.0).unwrap();
        net.put(b, N(3), 1.0).unwrap();
        net.put(b, N(4), 1.0).unwrap();
        net.event("join")
            .inputs([a, b])
            .outputs([])
            .action(|_, [_, _]| Ok([]))
            .register()
            .unwrap();

        let binding = net.next_binding().unwrap();
        let first_a = net.peek_all(a).unwrap()[0].id();
        let first_b = net.peek_all(b).unwrap()[0].id();
        assert_eq!(binding.tokens, vec![(a, first_a), (b, first_b)]);
    }

    #[test]
    fn test_guard_filters_combinations() {
        let (mut net, a, b) = two_place_net();
        net.put(a, N(1), 0.0).unwrap();
        net.put(a, N(2), 0.0).unwrap();
        net.put(b, N(2), 0.0).unwrap();
        net.event("match")
            .inputs([a, b])
            .outputs([a])
            .guard(|_, [x, y]| x.0 == y.0)
            .action(|_, [x, _]| Ok([Some(Produce::now(x))]))
            .register()
            .unwrap();

        let binding = net.next_binding().unwrap();
        let second_a = net.peek_all(a).unwrap()[1].id();
        assert_eq!(binding.tokens[0], (a, second_a));
    }

    #[test]
    fn test_empty_input_disables() {
        let (mut net, a, b) = two_place_net();
        net.put(a, N(1), 0.0).unwrap();
        net.event("join")
            .inputs([a, b])
            .outputs([])
            .action(|_, [_, _]| Ok([]))
            .register()
            .unwrap();
        assert!(net.next_binding().is_none());
    }

    #[test]
    fn test_ready_when_defers_binding() {
        let (mut net, a, _) = two_place_net();
        net.put(a, N(1), 0.0).unwrap();
        net.event("later")
            .inputs([a])
            .outputs([])
            .ready_when(|from, [n]| from.plus(n.0 as f64 * 10.0).ok())
            .action(|_, [_]| Ok([]))
            .register()
            .unwrap();
        assert_eq!(net.next_binding().unwrap().time, VirtualTime::new(10.0));
    }
}
