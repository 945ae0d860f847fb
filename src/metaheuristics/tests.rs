//! Tests for the local search layer.

use super::*;
use crate::primitives::random::make_rng;
use std::time::Duration;

fn sphere() -> FnEvaluator {
    FnEvaluator::new(|x: &[f64]| x.iter().map(|xi| xi * xi).sum())
}

#[test]
fn test_search_space_dimension() {
    let space = SearchSpace::continuous(3, -1.0, 1.0)
        .with_integer(0.0, 10.0)
        .with_discrete(2);
    assert_eq!(space.dimension(), 5);
    assert!(!space.is_empty());
    assert!(SearchSpace::new().is_empty());
}

#[test]
fn test_search_space_project() {
    let space = SearchSpace::new()
        .with_continuous(0.0, 1.0)
        .with_integer(18.0, 65.0)
        .with_discrete(3);
    assert_eq!(space.project(&[2.0, 17.2, 7.0]), vec![1.0, 18.0, 2.0]);
    assert_eq!(space.project(&[0.25, 30.4, 1.0]), vec![0.25, 30.0, 1.0]);
    assert_eq!(space.project(&[]), vec![0.0, 18.0, 0.0]);
}

#[test]
fn test_integer_projection_stays_inside_fractional_bounds() {
    let v = Variable::Continuous {
        lower: 0.5,
        upper: 2.5,
        integer: true,
    };
    assert_eq!(v.project(2.6), 2.0);
    assert_eq!(v.project(0.4), 1.0);
}

#[test]
fn test_neighbors_stay_in_domain() {
    let space = SearchSpace::new()
        .with_continuous(-2.0, 3.0)
        .with_integer(18.0, 65.0)
        .with_discrete(4);
    let mut rng = make_rng(Some(9));
    let mut point = space.project(&[0.0, 30.0, 1.0]);
    for _ in 0..500 {
        for (i, variable) in space.variables().iter().enumerate() {
            point[i] = variable.neighbor(point[i], 0.5, 0.3, &mut rng);
        }
        assert!(space.contains(&point), "left domain: {point:?}");
    }
}

#[test]
fn test_wide_continuous_neighbors_stay_finite() {
    let wide = Variable::Continuous {
        lower: -1e308,
        upper: 1e308,
        integer: false,
    };
    let open = Variable::Continuous {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
        integer: false,
    };
    let mut rng = make_rng(Some(4));
    let (mut x, mut y) = (0.5, 0.5);
    for _ in 0..500 {
        x = wide.neighbor(x, 0.1, 0.5, &mut rng);
        y = open.neighbor(y, 0.1, 0.5, &mut rng);
        assert!(x.is_finite() && wide.contains(x), "{x}");
        assert!(y.is_finite(), "{y}");
    }
}

#[test]
fn test_discrete_neighbor_changes_index() {
    let v = Variable::Discrete { cardinality: 3 };
    let mut rng = make_rng(Some(1));
    for _ in 0..100 {
        assert_ne!(v.neighbor(1.0, 0.1, 0.3, &mut rng), 1.0);
    }
    let single = Variable::Discrete { cardinality: 1 };
    assert_eq!(single.neighbor(0.0, 0.1, 0.3, &mut rng), 0.0);
}

#[test]
fn test_termination_order() {
    let cancel = CancelHandle::new();
    let termination = Termination::new().with_max_steps(3).with_cancel(cancel.clone());
    assert_eq!(termination.check(2), None);
    assert_eq!(termination.check(3), Some(TerminationReason::StepLimit));
    cancel.cancel();
    assert_eq!(termination.check(0), Some(TerminationReason::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_termination_deadline() {
    let termination = Termination::new().with_timeout(Duration::from_secs(1));
    assert_eq!(termination.check(0), None);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(termination.check(0), Some(TerminationReason::TimeLimit));
}

#[tokio::test]
async fn test_cancel_handle_wakes_waiter() {
    let cancel = CancelHandle::new();
    let waiter = {
        let cancel = cancel.clone();
        tokio::spawn(async move { cancel.cancelled().await })
    };
    cancel.cancel();
    waiter.await.unwrap();
    cancel.cancelled().await;
}

#[test]
fn test_sa_default_validates() {
    let sa = SimulatedAnnealing::default();
    assert!(sa.validate().is_ok());
    assert_eq!(sa.moves_per_step, 8);
    assert!(sa.seed().is_none());
    assert!(sa.clone().with_cooling_rate(1.5).validate().is_err());
    assert!(sa.clone().with_moves_per_step(0).validate().is_err());
    assert!(sa.with_initial_temperature(0.0).validate().is_err());
}

#[tokio::test]
async fn test_sa_minimizes_sphere() {
    let sa = SimulatedAnnealing::default().with_seed(42);
    let space = SearchSpace::continuous(2, -5.0, 5.0);
    let termination = Termination::new().with_max_steps(1_000);
    let result = sa
        .solve(&sphere(), &space, &[4.0, -4.0], &termination)
        .await
        .unwrap();

    assert!(result.objective_value < 1.0, "got {}", result.objective_value);
    assert!(space.contains(&result.solution));
    assert_eq!(result.steps, 1_000);
    assert_eq!(result.evaluations, 1 + 1_000 * 8);
    assert_eq!(result.termination, TerminationReason::StepLimit);
}

#[tokio::test]
async fn test_sa_history_is_monotone() {
    let sa = SimulatedAnnealing::default().with_seed(7);
    let space = SearchSpace::continuous(3, -3.0, 3.0);
    let termination = Termination::new().with_max_steps(200);
    let result = sa
        .solve(&sphere(), &space, &[3.0, 3.0, 3.0], &termination)
        .await
        .unwrap();
    assert!(result.history.windows(2).all(|w| w[1] <= w[0]));
    assert!(result.objective_value <= 27.0);
}

#[tokio::test]
async fn test_sa_is_deterministic_with_seed() {
    let space = SearchSpace::continuous(2, -5.0, 5.0).with_discrete(5);
    let termination = Termination::new().with_max_steps(100);
    let run = || async {
        SimulatedAnnealing::default()
            .with_seed(3)
            .solve(&sphere(), &space, &[1.0, 1.0, 4.0], &termination)
            .await
            .unwrap()
    };
    assert_eq!(run().await, run().await);
}

#[tokio::test]
async fn test_sa_empty_space_converges_immediately() {
    let result = SimulatedAnnealing::default()
        .solve(&sphere(), &SearchSpace::new(), &[], &Termination::new())
        .await
        .unwrap();
    assert_eq!(result.termination, TerminationReason::Converged);
    assert_eq!(result.steps, 0);
    assert_eq!(result.objective_value, 0.0);
}

#[tokio::test]
async fn test_sa_unimproved_limit_converges() {
    // Flat objective never improves.
    let flat = FnEvaluator::new(|_: &[f64]| 1.0);
    let sa = SimulatedAnnealing::default()
        .with_seed(1)
        .with_unimproved_step_limit(5);
    let result = sa
        .solve(&flat, &SearchSpace::continuous(1, 0.0, 1.0), &[0.5], &Termination::new())
        .await
        .unwrap();
    assert_eq!(result.termination, TerminationReason::Converged);
    assert_eq!(result.steps, 5);
}

#[tokio::test]
async fn test_sa_respects_cancellation() {
    let cancel = CancelHandle::new();
    cancel.cancel();
    let termination = Termination::new().with_cancel(cancel);
    let result = SimulatedAnnealing::default()
        .solve(&sphere(), &SearchSpace::continuous(1, 0.0, 1.0), &[0.5], &termination)
        .await
        .unwrap();
    assert_eq!(result.termination, TerminationReason::Cancelled);
    assert_eq!(result.steps, 0);
    assert_eq!(result.solution, vec![0.5]);
}
