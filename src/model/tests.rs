//! Scenario and property tests for the queueing model.

use proptest::prelude::*;

use crate::eventlog::FiringLog;
use crate::model::events::has_waited_too_long;
use crate::model::{
    server_locations, Customer, FirstArrival, ModelConfig, QueueModel, RenegePolicy, Value,
};
use crate::report::{Firing, NullReporter, PrintReporter};
use crate::rng::Dist;
use crate::time::VirtualTime;
use crate::visual::{DotVisualizer, Visualizer};

/// Deterministic single-server setup: no breaks, nobody reneges.
fn quiet() -> ModelConfig {
    ModelConfig::default()
        .with_breaks(0.0, Dist::Fixed(1.0))
        .with_renege(RenegePolicy::Constant(0.0))
}

fn fired(log: &[Firing<Value>], name: &str) -> Vec<f64> {
    log.iter()
        .filter(|f| f.name == name)
        .map(|f| f.time.as_f64())
        .collect()
}

/// Step the model to `horizon`, checking server placement after every
/// firing, and return the firings.
fn run_checked(model: &mut QueueModel, horizon: f64) -> Vec<Firing<Value>> {
    let limit = VirtualTime::new(horizon);
    let servers = model.config().servers;
    let mut log = Vec::new();
    loop {
        match model.net_mut().next_binding() {
            Some(b) if b.time < limit => {}
            _ => break,
        }
        let firing = model.net_mut().step(&mut NullReporter).unwrap().unwrap();

        let mut ids: Vec<u32> = server_locations(model)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        assert_eq!(
            ids,
            (0..servers).collect::<Vec<_>>(),
            "server tokens duplicated or lost after {}",
            firing
        );
        log.push(firing);
    }
    log
}

// ── Scenarios ─────────────────────────────────────────────────────────

#[test]
fn test_horizon_zero_fires_nothing() {
    let mut model = QueueModel::new(ModelConfig::default()).unwrap();
    let mut count = 0;
    let summary = model
        .simulate(0.0, &mut |_: &Firing<Value>| count += 1)
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(summary.steps, 0);
    assert_eq!(summary.arrived, 0);
    assert!(summary.served.is_empty());
    assert!(summary.gone.is_empty());
}

#[test]
fn test_fixed_arrival_and_service() {
    let config = quiet()
        .with_interarrival(Dist::Fixed(5.0))
        .with_first_arrival(FirstArrival::Draw)
        .with_service(Dist::Fixed(10.0));
    let mut model = QueueModel::new(config).unwrap();
    let log = run_checked(&mut model, 16.0);

    assert_eq!(fired(&log, "arrive")[0], 5.0);
    assert_eq!(fired(&log, "start_service")[0], 5.0);
    assert_eq!(fired(&log, "end_service"), vec![15.0]);

    let summary = model.summary().unwrap();
    assert_eq!(summary.service_times, vec![10.0]);
    assert_eq!(summary.waiting_times, vec![0.0]);
    assert_eq!(summary.served[0].id, "g1");
}

#[test]
fn test_customer_reneges_while_server_on_break() {
    let config = ModelConfig::default()
        .with_interarrival(Dist::Fixed(1000.0))
        .with_first_arrival(FirstArrival::At(0.0))
        .with_breaks(1.0, Dist::Fixed(1000.0));
    let mut model = QueueModel::new(config).unwrap();
    let log = run_checked(&mut model, 50.0);

    let renege = fired(&log, "reneging_event");
    assert_eq!(renege.len(), 1);
    assert!(renege[0] > 10.0 && renege[0] < 10.001, "reneged at {}", renege[0]);

    let summary = model.summary().unwrap();
    assert_eq!(
        summary.gone,
        vec![Customer::new(1, VirtualTime::ZERO)]
    );
    assert!(summary.served.is_empty());
    assert!(summary.is_conserved());
}

#[test]
fn test_working_server_keeps_patient_customers() {
    let config = ModelConfig::default()
        .with_interarrival(Dist::Fixed(1.0))
        .with_service(Dist::Fixed(100.0))
        .with_breaks(0.0, Dist::Fixed(1.0))
        .with_renege(RenegePolicy::ServerAware {
            while_working: 0.0,
            while_on_break: 1.0,
        });
    let mut model = QueueModel::new(config).unwrap();
    let summary = model.simulate(60.0, &mut NullReporter).unwrap();
    assert_eq!(summary.arrived, 60);
    assert!(summary.gone.is_empty());
    assert_eq!(summary.in_service.len(), 1);
    assert!(summary.waiting.len() > 1);
    assert!(summary.is_conserved());
}

#[test]
fn test_arrivals_keep_their_gaps_under_load() {
    let config = quiet()
        .with_interarrival(Dist::Fixed(1.0))
        .with_service(Dist::Fixed(1000.0));
    let mut model = QueueModel::new(config).unwrap();
    let log = run_checked(&mut model, 40.0);

    // Reneging checks run throughout without delaying the arrival stream.
    assert!(fired(&log, "reneging_event").len() > 1);
    let expected: Vec<f64> = (0..40).map(f64::from).collect();
    assert_eq!(fired(&log, "arrive"), expected);

    let summary = model.summary().unwrap();
    assert_eq!(summary.arrived, 40);
    assert_eq!(summary.waiting.len(), 39);
    for (i, customer) in summary.waiting.iter().enumerate() {
        assert_eq!(customer.arrival_time, VirtualTime::new((i + 1) as f64));
    }
}

#[test]
fn test_returning_server_starts_at_once() {
    let config = ModelConfig::default()
        .with_interarrival(Dist::Fixed(1000.0))
        .with_first_arrival(FirstArrival::At(0.0))
        .with_breaks(1.0, Dist::Fixed(12.0))
        .with_renege(RenegePolicy::Constant(0.0));
    let mut model = QueueModel::new(config).unwrap();
    let log = run_checked(&mut model, 30.0);

    let renege = fired(&log, "reneging_event");
    assert!(!renege.is_empty() && renege[0] > 10.0 && renege[0] < 12.0);
    assert_eq!(fired(&log, "instructor_return"), vec![12.0]);
    assert_eq!(fired(&log, "start_service"), vec![12.0]);
}

#[test]
fn test_break_empties_free_until_return() {
    let config = ModelConfig::default()
        .with_first_arrival(FirstArrival::At(1000.0))
        .with_breaks(1.0, Dist::Fixed(20.0));
    let mut model = QueueModel::new(config).unwrap();
    let free = model.places().free;
    let on_break = model.places().on_break;

    let first = model.net_mut().step(&mut NullReporter).unwrap().unwrap();
    assert_eq!(first.name, "choose_break");
    assert_eq!(first.time, VirtualTime::ZERO);
    assert!(model.net().peek_all(free).unwrap().is_empty());
    assert_eq!(
        model.net().peek_all(on_break).unwrap()[0].time(),
        VirtualTime::new(20.0)
    );

    let second = model.net_mut().step(&mut NullReporter).unwrap().unwrap();
    assert_eq!(second.name, "instructor_return");
    assert_eq!(second.time, VirtualTime::new(20.0));
    assert_eq!(model.net().peek_all(free).unwrap().len(), 1);
    assert!(model.net().peek_all(on_break).unwrap().is_empty());
}

#[test]
fn test_two_servers_work_in_parallel() {
    let config = quiet()
        .with_servers(2)
        .with_interarrival(Dist::Fixed(1.0))
        .with_service(Dist::Fixed(10.0));
    let mut model = QueueModel::new(config).unwrap();
    run_checked(&mut model, 1.5);

    let busy = model.net().peek_all(model.places().busy).unwrap();
    assert_eq!(busy.len(), 2);
    let mut ids: Vec<u32> = busy
        .iter()
        .filter_map(|t| t.value().as_busy())
        .map(|b| b.server.id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn test_default_run_reports_and_renders() {
    let mut model = QueueModel::new(ModelConfig::default().with_seed(11)).unwrap();
    let mut printer = PrintReporter::new(Vec::new());
    let summary = model.run(&mut printer).unwrap();
    let text = String::from_utf8(printer.into_inner()).unwrap();

    assert_eq!(text.lines().count() as u64, summary.steps);
    assert!(summary.clock < VirtualTime::new(180.0));
    assert!(summary.is_conserved());

    let topo = model.net().topology();
    let names: Vec<&str> = topo.events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "arrive",
            "start_service",
            "end_service",
            "reneging_event",
            "choose_break",
            "instructor_return"
        ]
    );
    assert_eq!(topo.places.len(), 10);
    let dot = DotVisualizer::new("queue").render(&topo);
    assert!(dot.contains("\"p:waiting\" -> \"e:reneging_event\";"));
    assert!(dot.contains("\"p:break\" -> \"e:reneging_event\" [style=dashed];"));
    assert!(dot.contains("\"e:reneging_event\" -> \"p:recheck\";"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = QueueModel::new(ModelConfig::default().with_servers(0)).unwrap_err();
    assert!(matches!(err, crate::error::SimError::InvalidConfig(_)));
}

// ── Properties ────────────────────────────────────────────────────────

fn config_strategy() -> impl Strategy<Value = ModelConfig> {
    let policy = prop_oneof![
        (0.0..=1.0f64).prop_map(RenegePolicy::Constant),
        (0.0..=1.0f64, 0.0..=1.0f64).prop_map(|(w, b)| RenegePolicy::ServerAware {
            while_working: w,
            while_on_break: b,
        }),
    ];
    (
        any::<u64>(),
        1u32..=3,
        0.0..=1.0f64,
        policy,
        5.0..60.0f64,
        0.0..300.0f64,
    )
        .prop_map(|(seed, servers, brk, renege, mean_gap, horizon)| {
            ModelConfig::default()
                .with_seed(seed)
                .with_servers(servers)
                .with_breaks(brk, Dist::Uniform { low: 15.0, high: 35.0 })
                .with_renege(renege)
                .with_interarrival(Dist::exponential_mean(mean_gap))
                .with_horizon(horizon)
                .with_step_limit(100_000)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_model_invariants(config in config_strategy()) {
        let horizon = config.horizon;
        let threshold = config.renege_threshold;
        let mut model = QueueModel::new(config).unwrap();
        let log = run_checked(&mut model, horizon);
        let summary = model.summary().unwrap();

        // Conservation.
        prop_assert!(summary.is_conserved(), "{:?}", summary);

        // Monotonic clock.
        for pair in log.windows(2) {
            prop_assert!(pair[0].time <= pair[1].time);
        }
        prop_assert!(log.iter().all(|f| f.time < VirtualTime::new(horizon)));

        let mut started: Vec<Customer> = Vec::new();
        for firing in &log {
            match firing.name.as_str() {
                "reneging_event" => {
                    // Only customers past the threshold leave.
                    let before = match &firing.consumed[1] {
                        Value::Customers(c) => c.len(),
                        other => panic!("unexpected {:?}", other),
                    };
                    let after = match firing.produced[1].as_ref().map(|d| &d.value) {
                        Some(Value::Customers(c)) => c.clone(),
                        other => panic!("unexpected {:?}", other),
                    };
                    for c in &after[before..] {
                        prop_assert!(has_waited_too_long(firing.time, c, threshold));
                    }
                }
                "start_service" => {
                    if let Some(Value::Busy(b)) = firing.produced[0].as_ref().map(|d| &d.value) {
                        started.push(b.customer.clone());
                    }
                }
                _ => {}
            }
        }

        // FIFO: service starts in arrival order.
        for pair in started.windows(2) {
            prop_assert!(pair[0].arrival_time <= pair[1].arrival_time);
        }
    }

    #[test]
    fn prop_same_seed_same_trace(seed in any::<u64>(), horizon in 0.0..240.0f64) {
        let run = || {
            let config = ModelConfig::default().with_seed(seed).with_horizon(horizon);
            let mut model = QueueModel::new(config).unwrap();
            let mut log = FiringLog::new();
            model.run(&mut log).unwrap();
            (log.log_hash(), log.len(), model.net().state_hash())
        };
        prop_assert_eq!(run(), run());
    }
}
