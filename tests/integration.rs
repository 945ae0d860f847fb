//! Integration tests for Explicar.
//!
//! These tests verify end-to-end workflows combining multiple components.

use explicar::counterfactual::{
    CounterfactualConfig, CounterfactualExplainer, CounterfactualRequest,
};
use explicar::interpret::{impact_score, FeatureSelection, LimeConfig, LimeExplainer};
use explicar::linear_model::{Criterion, LarsPath, LassoLarsIc};
use explicar::metaheuristics::TerminationReason;
use explicar::prelude::*;

fn credit_model() -> ParallelPredictionProvider {
    ParallelPredictionProvider::new(
        |input: &PredictionInput| {
            let age = input.feature("age").map_or(0.0, |f| f.value().as_number());
            let employed = input
                .feature("employed")
                .and_then(|f| f.value().as_bool())
                .unwrap_or(false);
            let score = 0.05 * age + if employed { 1.0 } else { 0.0 };
            Ok(PredictionOutput::new(vec![
                Output::number("score", score),
                Output::boolean("approved", age >= 30.0 && employed, 1.0),
            ]))
        },
        4,
    )
}

fn credit_input(age: f64, employed: bool) -> PredictionInput {
    PredictionInput::new(vec![
        Feature::number("age", age),
        Feature::boolean("employed", employed),
        Feature::categorical("city", "lyon"),
    ])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lime_workflow_with_parallel_model() {
    let model = credit_model();
    let input = credit_input(35.0, true);
    let output = model.predict(vec![input.clone()]).await.unwrap().remove(0);
    let prediction = Prediction::new(input, output);

    let explainer = LimeExplainer::new(LimeConfig::default().with_seed(Some(17)).with_samples(400));
    let saliency = explainer.explain(&prediction, &model).await.unwrap();

    assert_eq!(saliency.len(), 2);
    // score = 2.75 + 1.75·Δage/35 − [employed flipped]
    let score = &saliency["score"];
    assert!((score.score("age").unwrap() - 1.75).abs() < 1e-6);
    assert!((score.score("employed").unwrap() + 1.0).abs() < 1e-6);
    assert!(score.score("city").unwrap().abs() < 1e-6);
    assert!((score.intercept - 2.75).abs() < 1e-6);
    assert!(score.r_squared > 0.99);

    let approved = &saliency["approved"];
    assert_eq!(approved.per_feature_importance.len(), 3);
    assert!(approved.score("age").unwrap() > 0.0);
    assert!(approved.score("employed").unwrap() < 0.0);
}

#[tokio::test]
async fn test_lime_nested_input_is_linearized() {
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let x = match input.features[0].value() {
                    Value::Composite(children) => children[1].value().as_number(),
                    _ => f64::NAN,
                };
                PredictionOutput::new(vec![Output::number("y", 4.0 * x)])
            })
            .collect())
    });
    let input = PredictionInput::new(vec![Feature::composite(
        "profile",
        vec![Feature::boolean("member", true), Feature::number("visits", 3.0)],
    )]);
    let prediction = Prediction::new(input, PredictionOutput::new(vec![Output::number("y", 12.0)]));

    let saliency = LimeExplainer::new(LimeConfig::default().with_seed(Some(1)))
        .explain(&prediction, &model)
        .await
        .unwrap();
    let y = &saliency["y"];
    assert!((y.score("profile.visits").unwrap() - 12.0).abs() < 1e-6);
    assert!(y.score("profile.member").unwrap().abs() < 1e-6);
}

#[tokio::test]
async fn test_sparse_lime_and_impact_score() {
    let model = credit_model();
    let input = credit_input(35.0, true);
    let output = model.predict(vec![input.clone()]).await.unwrap().remove(0);
    let prediction = Prediction::new(input, output);

    let config = LimeConfig::default()
        .with_seed(Some(3))
        .with_normalize_weights(true)
        .with_feature_selection(FeatureSelection {
            criterion: Criterion::Aic,
            max_features: Some(1),
        });
    let saliency = LimeExplainer::new(config)
        .explain(&prediction, &model)
        .await
        .unwrap();
    let approved = &saliency["approved"];
    let explained = approved
        .per_feature_importance
        .iter()
        .filter(|fi| fi.score != 0.0)
        .count();
    assert!(explained <= 1);

    let top: Vec<_> = approved.top_features(1).into_iter().cloned().collect();
    let impact = impact_score(&model, &prediction, &top).await.unwrap();
    assert!((0.0..=1.0).contains(&impact));
}

#[tokio::test]
async fn test_stability_gate_on_separable_model() {
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let x0 = input.feature("x0").map_or(0.0, |f| f.value().as_number());
                PredictionOutput::new(vec![Output::boolean("approved", x0 > 10.0, 1.0)])
            })
            .collect())
    });
    let prediction = Prediction::new(
        PredictionInput::new(vec![Feature::number("x0", 12.0), Feature::number("x1", 3.0)]),
        PredictionOutput::new(vec![Output::boolean("approved", true, 1.0)]),
    );
    LimeExplainer::new(LimeConfig::default().with_seed(Some(99)))
        .validate_local_saliency_stability(&prediction, &model, 1, 0.5, 0.5)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_counterfactual_age_range_and_boolean_goal() {
    let model = credit_model();
    let request = CounterfactualRequest::new(
        credit_input(22.0, true),
        PredictionOutput::new(vec![Output::boolean("approved", true, 1.0)]),
    )
    .with_domains(vec![
        FeatureDomain::numerical(18.0, 70.0).unwrap(),
        FeatureDomain::boolean(),
        FeatureDomain::Empty,
    ]);

    let explainer = CounterfactualExplainer::new(
        CounterfactualConfig::default()
            .with_seed(Some(5))
            .with_max_steps(800),
    );
    let result = explainer.explain(&request, &model).await.unwrap();

    assert!(result.is_valid);
    for (entity, domain) in result.entities.iter().zip(&request.domains) {
        assert!(domain.contains(entity.feature().value()));
    }
    let age = result.features()[0].value().as_number();
    assert!((30.0..=70.0).contains(&age));
    assert_eq!(result.features()[2].value(), &Value::from("lyon"));
    assert_eq!(result.termination, TerminationReason::StepLimit);
    assert!(result.evaluations > 800);
}

#[test]
fn test_weighted_regression_exact_fit() {
    // y = 1.5 + 2·x0 − 0.5·x1
    let x = Matrix::from_rows(&[
        vec![1.0, 2.0],
        vec![2.0, 1.0],
        vec![3.0, 5.0],
        vec![4.0, 3.0],
        vec![5.0, 8.0],
        vec![6.0, 0.0],
    ])
    .unwrap();
    let y = Vector::from_slice(&[2.5, 5.0, 5.0, 8.0, 7.5, 13.5]);
    let w = Vector::from_slice(&[1.0, 0.5, 2.0, 1.0, 0.25, 3.0]);

    let fit = WeightedLinearRegression::new().fit(&x, &y, &w).unwrap();
    assert!((fit.coefficients[0] - 2.0).abs() < 1e-6);
    assert!((fit.coefficients[1] + 0.5).abs() < 1e-6);
    assert!((fit.intercept - 1.5).abs() < 1e-6);
    assert!(fit.mse < 1e-6);
    assert!((fit.r_squared - 1.0).abs() < 1e-9);
}

#[test]
fn test_lasso_lars_ic_recovers_two_active_variables() {
    // y = 2 + 3·x0 − 2·x2; x1 is a distractor
    let x = Matrix::from_rows(&[
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![1.0, 1.0, 1.0],
        vec![2.0, 0.0, 1.0],
        vec![1.0, 2.0, 0.0],
        vec![0.0, 1.0, 2.0],
        vec![2.0, 1.0, 0.0],
    ])
    .unwrap();
    let y: Vector<f64> = (0..x.n_rows())
        .map(|i| 2.0 + 3.0 * x.get(i, 0) - 2.0 * x.get(i, 2))
        .collect();

    for criterion in [Criterion::Aic, Criterion::Bic] {
        let fit = LassoLarsIc::new(criterion).fit(&x, &y).unwrap();
        assert_eq!(fit.selected(), vec![0, 2], "{criterion:?}");
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-6);
        assert!((fit.coefficients[2] + 2.0).abs() < 1e-6);
        assert!((fit.intercept - 2.0).abs() < 1e-6);
    }

    let path = LarsPath::new().fit(&x, &y).unwrap();
    assert_eq!(path.alphas.last().copied(), Some(0.0));
    assert_eq!(path.alphas.len(), path.coefs.len());
}
