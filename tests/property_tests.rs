//! Property-based tests using proptest.
//!
//! These tests verify invariants of linearization, sampling and the numeric
//! kernel.

use explicar::feature::{linearize, Feature};
use explicar::interpret::quantify_explainability;
use explicar::linear_model::WeightedLinearRegression;
use explicar::perturbation::{perturb, PerturbationContext};
use explicar::primitives::{JitterConfig, Matrix, Vector};
use proptest::prelude::*;

// Strategy for scalar and text leaves
fn leaf_strategy() -> impl Strategy<Value = Feature> {
    prop_oneof![
        ("[a-z]{1,4}", -1e6f64..1e6).prop_map(|(name, x)| Feature::number(name, x)),
        ("[a-z]{1,4}", any::<bool>()).prop_map(|(name, b)| Feature::boolean(name, b)),
        ("[a-z]{1,4}", "[a-z]{1,6}").prop_map(|(name, v)| Feature::categorical(name, v)),
        ("[a-z]{1,4}", "[a-z]{1,6}( {1,2}[a-z]{1,6}){0,3}")
            .prop_map(|(name, text)| Feature::text(name, text)),
    ]
}

// Strategy for feature trees nested at most 5 levels deep
fn feature_strategy() -> impl Strategy<Value = Feature> {
    leaf_strategy().prop_recursive(5, 48, 4, |inner| {
        ("[a-z]{1,4}", proptest::collection::vec(inner, 0..4))
            .prop_map(|(name, children)| Feature::composite(name, children))
    })
}

fn features_strategy() -> impl Strategy<Value = Vec<Feature>> {
    proptest::collection::vec(feature_strategy(), 0..5)
}

// Strategy for singular square matrices M = A·B with rank(A·B) < n
fn singular_matrix_strategy() -> impl Strategy<Value = Matrix<f64>> {
    (2usize..=4)
        .prop_flat_map(|n| (Just(n), 1..n))
        .prop_flat_map(|(n, r)| {
            (
                Just(n),
                Just(r),
                proptest::collection::vec(-3.0f64..3.0, n * r),
                proptest::collection::vec(-3.0f64..3.0, r * n),
            )
        })
        .prop_map(|(n, r, a, b)| {
            let a = Matrix::from_vec(n, r, a).expect("n x r data");
            let b = Matrix::from_vec(r, n, b).expect("r x n data");
            a.matmul(&b).expect("inner dimensions agree")
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn linearize_round_trips(features in features_strategy()) {
        let (linear, layout) = linearize(&features);
        prop_assert_eq!(layout.len(), linear.len());
        let restored = layout.unflatten(&linear).expect("same width");
        prop_assert_eq!(restored, features);
    }

    #[test]
    fn perturbed_leaves_keep_structure(features in features_strategy(), seed in any::<u64>()) {
        let (linear, layout) = linearize(&features);
        let mut ctx = PerturbationContext::new(Some(seed), 2);
        let neighbor = perturb(&linear, &mut ctx);
        let restored = layout.unflatten(&neighbor).expect("same width");
        prop_assert_eq!(restored.len(), features.len());
        for (a, b) in restored.iter().zip(&features) {
            prop_assert_eq!(a.name(), b.name());
            prop_assert_eq!(a.feature_type(), b.feature_type());
        }
    }

    #[test]
    fn perturb_is_deterministic(
        features in features_strategy(),
        seed in any::<u64>(),
        size in 0usize..4,
    ) {
        let mut a = PerturbationContext::new(Some(seed), size);
        let mut b = PerturbationContext::new(Some(seed), size);
        for _ in 0..3 {
            prop_assert_eq!(perturb(&features, &mut a), perturb(&features, &mut b));
        }
    }

    #[test]
    fn safe_invert_is_a_generalized_inverse(m in singular_matrix_strategy()) {
        let pinv = m.safe_invert(&JitterConfig::default()).expect("jitter recovers");
        prop_assert!(m.pseudo_inverse_residual(&pinv) < 1e-4);
    }

    #[test]
    fn weighted_regression_recovers_exact_coefficients(
        x in proptest::collection::vec(-10.0f64..10.0, 20 * 3),
        beta in proptest::collection::vec(-5.0f64..5.0, 3),
        intercept in -5.0f64..5.0,
        weights in proptest::collection::vec(0.1f64..2.0, 20),
    ) {
        let x = Matrix::from_vec(20, 3, x).expect("20 x 3 data");
        let y = x
            .matvec(&Vector::from_slice(&beta))
            .expect("3 coefficients")
            .add_scalar(intercept);
        let fit = WeightedLinearRegression::new()
            .fit(&x, &y, &Vector::from_vec(weights))
            .expect("consistent system");
        for (got, want) in fit.coefficients.iter().zip(&beta) {
            prop_assert!((got - want).abs() < 1e-6, "{} vs {}", got, want);
        }
        prop_assert!((fit.intercept - intercept).abs() < 1e-6);
        prop_assert!(fit.mse < 1e-6);
    }

    #[test]
    fn explainability_is_bounded(
        inputs in 0usize..1000,
        outputs in 0usize..1000,
        interaction in -2.0f64..3.0,
    ) {
        let score = quantify_explainability(inputs, outputs, interaction);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(quantify_explainability(0, outputs, interaction), 0.0);
        prop_assert_eq!(quantify_explainability(inputs, 0, interaction), 0.0);
    }
}
