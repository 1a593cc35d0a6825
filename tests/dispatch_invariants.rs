//! Properties every optimal dispatch must satisfy, checked on random
//! single-bus networks with a grid connection and one battery.

use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use site_dispatch::domain::{GeneratorSpec, Horizon, Network, StorageSpec};
use site_dispatch::optimizer::{DispatchStrategy, LpDispatch};
use site_dispatch::results::DispatchResult;

const EPS: f64 = 1e-3;

#[derive(Debug, Clone)]
struct Case {
    load: Vec<f64>,
    prices: Vec<f64>,
    e_nom: f64,
    efficiency: f64,
    standing_loss: f64,
    /// Initial stored energy as a share of `e_nom`
    initial: f64,
    step_minutes: i64,
}

impl Case {
    fn dt(&self) -> f64 {
        self.step_minutes as f64 / 60.0
    }

    fn e_initial(&self) -> f64 {
        self.initial * self.e_nom
    }
}

fn case() -> impl Strategy<Value = Case> {
    (2usize..8).prop_flat_map(|n| {
        (
            prop::collection::vec(0.0f64..100.0, n),
            prop::collection::vec(1.0f64..50.0, n),
            0.0f64..50.0,
            0.8f64..=1.0,
            0.0f64..0.01,
            0.0f64..=0.9,
            prop::sample::select(vec![15i64, 30, 60]),
        )
            .prop_map(|(load, prices, e_nom, efficiency, standing_loss, initial, step_minutes)| Case {
                load,
                prices,
                e_nom,
                efficiency,
                standing_loss,
                initial,
                step_minutes,
            })
    })
}

fn network(case: &Case, with_storage: bool) -> Network {
    let horizon = Horizon::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Duration::minutes(case.step_minutes),
        case.load.len(),
    );
    let network = Network::new(horizon, case.load.clone())
        .with_generator(GeneratorSpec::grid(1000.0, case.prices.clone()));
    if !with_storage {
        return network;
    }
    network.with_storage(
        StorageSpec::new("battery", case.e_nom)
            .with_window(0.0, 0.9)
            .with_efficiency(case.efficiency, case.efficiency)
            .with_standing_loss(case.standing_loss)
            .with_initial(case.e_initial()),
    )
}

fn solve(network: &Network) -> DispatchResult {
    let solution = LpDispatch::default().dispatch(network).unwrap();
    DispatchResult::extract(network, solution)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_power_balance_holds(case in case()) {
        let result = solve(&network(&case, true));
        for snapshot in result.snapshots() {
            prop_assert!(snapshot.verify_power_balance(EPS), "{snapshot}");
        }
    }

    #[test]
    fn test_storage_follows_transition_law(case in case()) {
        let result = solve(&network(&case, true));
        let battery = result.storage("battery").unwrap();
        prop_assert!((battery.e[0] - case.e_initial()).abs() < EPS);
        let dt = case.dt();
        for t in 0..case.load.len() {
            let expected = battery.e[t] * (1.0 - case.standing_loss)
                + (battery.store[t] * case.efficiency - battery.dispatch[t] / case.efficiency) * dt;
            prop_assert!((battery.e[t + 1] - expected).abs() < EPS);
        }
    }

    #[test]
    fn test_bounds_respected(case in case()) {
        let result = solve(&network(&case, true));
        let battery = result.storage("battery").unwrap();
        for e in &battery.e[1..] {
            prop_assert!(*e >= -EPS);
            prop_assert!(*e <= 0.9 * case.e_nom + EPS);
        }
        let grid = result.generator("grid").unwrap();
        for p in &grid.p {
            prop_assert!(*p >= -EPS && *p <= 1000.0 + EPS);
        }
    }

    #[test]
    fn test_objective_matches_recomputed_cost(case in case()) {
        let result = solve(&network(&case, true));
        prop_assert!((result.objective - result.recomputed_objective).abs() < EPS * (1.0 + result.objective.abs()));
    }

    #[test]
    fn test_storage_never_raises_cost(case in case()) {
        let with = solve(&network(&case, true));
        let without = solve(&network(&case, false));
        prop_assert!(with.objective <= without.objective + EPS * (1.0 + without.objective.abs()));
    }
}

#[test]
fn test_flat_prices_give_no_arbitrage() {
    let case = Case {
        load: vec![10.0; 4],
        prices: vec![5.0; 4],
        e_nom: 20.0,
        efficiency: 0.9,
        standing_loss: 0.0,
        initial: 0.0,
        step_minutes: 60,
    };
    let with = solve(&network(&case, true));
    let without = solve(&network(&case, false));
    assert_relative_eq!(without.objective, 200.0, epsilon = 1e-4);
    assert_relative_eq!(with.objective, without.objective, epsilon = 1e-4);
    let battery = with.storage("battery").unwrap();
    assert!(battery.dispatch.iter().all(|p| *p < 1e-4));
}
