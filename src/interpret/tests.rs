use super::*;
use crate::error::ExplicarError;
use crate::feature::{Feature, FeatureDomain};
use crate::linear_model::Criterion;
use crate::prediction::{Output, Prediction, PredictionInput, PredictionOutput};
use crate::traits::FnPredictionProvider;

fn number(input: &PredictionInput, name: &str) -> f64 {
    input.feature(name).map_or(f64::NAN, |f| f.value().as_number())
}

/// y = 2·x0 − 3·x1, x2 ignored
fn linear_model() -> FnPredictionProvider {
    FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let y = 2.0 * number(input, "x0") - 3.0 * number(input, "x1");
                PredictionOutput::new(vec![Output::number("y", y)])
            })
            .collect())
    })
}

fn linear_prediction() -> Prediction {
    Prediction::new(
        PredictionInput::new(vec![
            Feature::number("x0", 10.0),
            Feature::number("x1", 5.0),
            Feature::number("x2", 1.0),
        ]),
        PredictionOutput::new(vec![Output::number("y", 5.0)]),
    )
}

fn approval_model() -> FnPredictionProvider {
    FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let approved = number(input, "x0") > 10.0;
                PredictionOutput::new(vec![Output::boolean("approved", approved, 1.0)])
            })
            .collect())
    })
}

fn approval_prediction() -> Prediction {
    Prediction::new(
        PredictionInput::new(vec![Feature::number("x0", 12.0), Feature::number("x1", 3.0)]),
        PredictionOutput::new(vec![Output::boolean("approved", true, 1.0)]),
    )
}

fn seeded(seed: u64) -> LimeExplainer {
    LimeExplainer::new(LimeConfig::default().with_seed(Some(seed)))
}

#[test]
fn test_lime_config_defaults() {
    let config = LimeConfig::default();
    assert_eq!(config.samples, 300);
    assert_eq!(config.perturbations, 1);
    assert!((config.kernel_width - 0.75).abs() < 1e-12);
    assert!(config.seed.is_none());
    assert!(!config.normalize_weights);
    assert!(config.feature_selection.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_lime_config_validation() {
    assert!(LimeConfig::default().with_samples(1).validate().is_err());
    assert!(LimeConfig::default().with_perturbations(0).validate().is_err());
    assert!(LimeConfig::default().with_kernel_width(0.0).validate().is_err());
    assert!(LimeConfig::default()
        .with_kernel_width(f64::INFINITY)
        .validate()
        .is_err());
    let selection = FeatureSelection {
        criterion: Criterion::Aic,
        max_features: Some(0),
    };
    assert!(LimeConfig::default()
        .with_feature_selection(selection)
        .validate()
        .is_err());
}

#[tokio::test]
async fn test_lime_recovers_linear_model() {
    let saliencies = seeded(3)
        .explain(&linear_prediction(), &linear_model())
        .await
        .unwrap();
    let saliency = &saliencies["y"];

    assert!((saliency.score("x0").unwrap() - 20.0).abs() < 1e-6);
    assert!((saliency.score("x1").unwrap() + 15.0).abs() < 1e-6);
    assert!(saliency.score("x2").unwrap().abs() < 1e-6);
    assert!((saliency.intercept - 5.0).abs() < 1e-6);
    assert!(saliency.mse < 1e-9);

    let top: Vec<&str> = saliency
        .top_features(2)
        .iter()
        .map(|fi| fi.feature.name())
        .collect();
    assert_eq!(top, vec!["x0", "x1"]);
    assert_eq!(saliency.positive_features(1)[0].feature.name(), "x0");
    assert_eq!(saliency.negative_features(1)[0].feature.name(), "x1");
}

#[tokio::test]
async fn test_lime_is_deterministic_with_seed() {
    let a = seeded(11)
        .explain(&approval_prediction(), &approval_model())
        .await
        .unwrap();
    let b = seeded(11)
        .explain(&approval_prediction(), &approval_model())
        .await
        .unwrap();
    assert_eq!(a["approved"].scores(), b["approved"].scores());
}

#[tokio::test]
async fn test_lime_boolean_output_favours_decisive_feature() {
    let saliencies = seeded(5)
        .explain(&approval_prediction(), &approval_model())
        .await
        .unwrap();
    let saliency = &saliencies["approved"];
    assert!(saliency.score("x0").unwrap() > 0.0);
    assert_eq!(saliency.top_features(1)[0].feature.name(), "x0");
}

#[tokio::test]
async fn test_lime_constant_feature_is_unexplained() {
    // A single-valued domain never changes, so the column never varies.
    let fixed = Feature::categorical("region", "north")
        .with_domain(FeatureDomain::categorical(["north"]).unwrap())
        .unwrap();
    let prediction = Prediction::new(
        PredictionInput::new(vec![Feature::number("x0", 10.0), fixed]),
        PredictionOutput::new(vec![Output::number("y", 20.0)]),
    );
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                PredictionOutput::new(vec![Output::number("y", 2.0 * number(input, "x0"))])
            })
            .collect())
    });

    let saliencies = seeded(2).explain(&prediction, &model).await.unwrap();
    let region = saliencies["y"]
        .per_feature_importance
        .iter()
        .find(|fi| fi.feature.name() == "region")
        .unwrap();
    assert_eq!(region.score, 0.0);
    assert!(region.p_value.is_nan());
}

#[tokio::test]
async fn test_lime_feature_selection_keeps_relevant_features() {
    let selection = FeatureSelection {
        criterion: Criterion::Bic,
        max_features: Some(2),
    };
    let explainer = LimeExplainer::new(
        LimeConfig::default()
            .with_seed(Some(8))
            .with_feature_selection(selection),
    );
    let saliencies = explainer
        .explain(&linear_prediction(), &linear_model())
        .await
        .unwrap();
    let saliency = &saliencies["y"];
    assert!((saliency.score("x0").unwrap() - 20.0).abs() < 1e-6);
    assert!((saliency.score("x1").unwrap() + 15.0).abs() < 1e-6);
    assert_eq!(saliency.score("x2"), Some(0.0));
}

#[tokio::test]
async fn test_lime_rejects_wrong_output_count() {
    let model = FnPredictionProvider::new(|_: &[PredictionInput]| {
        Ok(vec![PredictionOutput::new(vec![Output::number("y", 1.0)])])
    });
    let err = seeded(1)
        .explain(&linear_prediction(), &model)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::PredictionFailure { .. }));
}

#[tokio::test]
async fn test_lime_propagates_model_error() {
    let model = FnPredictionProvider::new(|_: &[PredictionInput]| {
        Err(ExplicarError::invalid_input("model offline"))
    });
    let err = seeded(1)
        .explain(&linear_prediction(), &model)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::PredictionFailure { .. }));
    assert!(err.to_string().contains("model offline"));
}

#[tokio::test]
async fn test_lime_missing_output_fails_whole_call() {
    let prediction = Prediction::new(
        linear_prediction().input,
        PredictionOutput::new(vec![Output::number("y", 5.0), Output::number("z", 1.0)]),
    );
    let err = seeded(1)
        .explain(&prediction, &linear_model())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::PredictionFailure { .. }));
}

#[tokio::test]
async fn test_lime_rejects_empty_input() {
    let prediction = Prediction::new(
        PredictionInput::new(vec![]),
        PredictionOutput::new(vec![Output::number("y", 0.0)]),
    );
    let err = seeded(1)
        .explain(&prediction, &linear_model())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_stability_gate_passes_for_separable_model() {
    let explainer = seeded(21);
    explainer
        .validate_local_saliency_stability(&approval_prediction(), &approval_model(), 1, 0.5, 0.5)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stability_rates_for_linear_model() {
    let rates = seeded(4)
        .local_saliency_stability(&linear_prediction(), &linear_model(), 2, 3)
        .await
        .unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].output, "y");
    assert_eq!(rates[0].k, 1);
    assert!((rates[0].positive - 1.0).abs() < 1e-12);
    assert!((rates[0].negative - 1.0).abs() < 1e-12);
}

#[tokio::test]
async fn test_stability_gate_rejects_impossible_threshold() {
    let err = seeded(4)
        .validate_local_saliency_stability(&linear_prediction(), &linear_model(), 1, 1.5, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::Validation { .. }));
}

#[tokio::test]
async fn test_stability_rejects_zero_top_k() {
    let err = seeded(4)
        .local_saliency_stability(&linear_prediction(), &linear_model(), 0, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::InvalidHyperparameter { .. }));
}

#[test]
fn test_quantify_explainability_bounds() {
    assert_eq!(quantify_explainability(0, 0, 0.5), 0.0);
    assert_eq!(quantify_explainability(3, 0, 0.0), 0.0);
    assert!((quantify_explainability(1, 1, 0.0) - 1.0).abs() < 1e-12);
    assert!((quantify_explainability(2, 4, 0.5) - (0.5 + 0.25 + 0.5) / 3.0).abs() < 1e-12);
    let score = quantify_explainability(7, 2, 3.0);
    assert!((0.0..=1.0).contains(&score));
}

#[tokio::test]
async fn test_impact_score_counts_changed_outputs() {
    let prediction = linear_prediction();
    let saliencies = seeded(3)
        .explain(&prediction, &linear_model())
        .await
        .unwrap();
    let top: Vec<FeatureImportance> = saliencies["y"]
        .top_features(1)
        .into_iter()
        .cloned()
        .collect();

    let score = impact_score(&linear_model(), &prediction, &top).await.unwrap();
    assert!((score - 1.0).abs() < 1e-12);

    let irrelevant = vec![FeatureImportance::unexplained(Feature::number("x2", 1.0))];
    let score = impact_score(&linear_model(), &prediction, &irrelevant)
        .await
        .unwrap();
    assert_eq!(score, 0.0);
}

#[test]
fn test_saliency_views_keep_input_order_on_ties() {
    let importance = |name: &str, score: f64| FeatureImportance {
        score,
        ..FeatureImportance::unexplained(Feature::number(name, 0.0))
    };
    let saliency = Saliency {
        output: Output::number("y", 0.0),
        per_feature_importance: vec![
            importance("a", 1.0),
            importance("b", -2.0),
            importance("c", 1.0),
            importance("d", 0.0),
        ],
        intercept: 0.0,
        mse: 0.0,
        r_squared: 1.0,
    };

    let top: Vec<&str> = saliency.top_features(3).iter().map(|fi| fi.feature.name()).collect();
    assert_eq!(top, vec!["b", "a", "c"]);
    let positive: Vec<&str> = saliency
        .positive_features(5)
        .iter()
        .map(|fi| fi.feature.name())
        .collect();
    assert_eq!(positive, vec!["a", "c"]);
    assert_eq!(saliency.negative_features(5).len(), 1);
    assert_eq!(saliency.score("missing"), None);
}
