use super::objective::{goal_penalty, total_penalty};
use super::*;
use crate::feature::Value;
use crate::prediction::Output;
use crate::traits::FnPredictionProvider;
use async_trait::async_trait;
use chrono::NaiveTime;

fn number(input: &PredictionInput, name: &str) -> f64 {
    input.feature(name).map_or(f64::NAN, |f| f.value().as_number())
}

fn loan_model() -> FnPredictionProvider {
    FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let student = input
                    .feature("student")
                    .and_then(|f| f.value().as_bool())
                    .unwrap_or(false);
                let approved = number(input, "age") >= 40.0 && !student;
                PredictionOutput::new(vec![Output::boolean("approved", approved, 0.9)])
            })
            .collect())
    })
}

fn loan_request() -> CounterfactualRequest {
    CounterfactualRequest::new(
        PredictionInput::new(vec![
            Feature::number("age", 25.0),
            Feature::boolean("student", false),
            Feature::number("income", 1200.0),
        ]),
        PredictionOutput::new(vec![Output::boolean("approved", true, 1.0)]),
    )
    .with_domains(vec![
        FeatureDomain::numerical(18.0, 65.0).unwrap(),
        FeatureDomain::boolean(),
        FeatureDomain::numerical(0.0, 10_000.0).unwrap(),
    ])
    .with_fixed(vec![false, false, true])
}

fn explainer(seed: u64, steps: usize) -> CounterfactualExplainer {
    CounterfactualExplainer::new(
        CounterfactualConfig::default()
            .with_seed(Some(seed))
            .with_max_steps(steps),
    )
}

#[test]
fn test_config_defaults_and_validation() {
    let config = CounterfactualConfig::default();
    assert!((config.goal_threshold - 0.01).abs() < 1e-12);
    assert_eq!(config.max_steps, 5_000);
    assert_eq!(config.moves_per_step, 8);
    assert!(config.validate().is_ok());
    assert!(config.clone().with_goal_threshold(-1.0).validate().is_err());
    assert!(config.with_moves_per_step(0).validate().is_err());
}

#[tokio::test]
async fn test_counterfactual_reaches_age_and_boolean_goal() {
    let request = loan_request();
    let result = explainer(11, 1_000)
        .explain(&request, &loan_model())
        .await
        .unwrap();

    assert!(result.is_valid);
    assert_eq!(result.output.by_name("approved").unwrap().value, Value::Boolean(true));
    for (entity, domain) in result.entities.iter().zip(&request.domains) {
        assert!(domain.contains(entity.feature().value()), "{entity:?}");
    }
    let age = result.entities[0].feature().value().as_number();
    assert!((40.0..=65.0).contains(&age));
    assert_eq!(age.fract(), 0.0);
    assert_eq!(result.entities[1].feature().value(), &Value::Boolean(false));
    assert!(!result.entities[2].is_changed());
    assert_eq!(result.changed_entities().len(), 1);
    assert_eq!(result.termination, TerminationReason::StepLimit);
    assert_eq!(result.steps, 1_000);
}

#[tokio::test]
async fn test_counterfactual_numeric_goal_is_met_exactly() {
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| PredictionOutput::new(vec![Output::number("y", 2.0 * number(input, "x"))]))
            .collect())
    });
    let request = CounterfactualRequest::new(
        PredictionInput::new(vec![Feature::number("x", 1.0)]),
        PredictionOutput::new(vec![Output::number("y", 10.0)]),
    )
    .with_domains(vec![FeatureDomain::numerical(0.0, 10.0).unwrap()]);

    let result = explainer(5, 500).explain(&request, &model).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(result.entities[0].feature().value(), &Value::Number(5.0));
    // Distance of the closest valid candidate: |5 - 1| / 10.
    assert!((result.objective - 0.4).abs() < 1e-12);
}

#[tokio::test]
async fn test_counterfactual_categorical_goal() {
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let tier = match input.feature("color").map(|f| f.value().as_string()) {
                    Some(color) if color == "blue" => "premium",
                    _ => "basic",
                };
                PredictionOutput::new(vec![Output::categorical("tier", tier, 1.0)])
            })
            .collect())
    });
    let color = Feature::categorical("color", "red")
        .with_domain(FeatureDomain::categorical(["red", "green", "blue"]).unwrap())
        .unwrap();
    let request = CounterfactualRequest::new(
        PredictionInput::new(vec![color]),
        PredictionOutput::new(vec![Output::categorical("tier", "premium", 1.0)]),
    );

    let result = explainer(2, 50).explain(&request, &model).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(result.features()[0].value(), &Value::from("blue"));
}

#[tokio::test]
async fn test_counterfactual_all_fixed_returns_original() {
    let request = loan_request().with_fixed(vec![true, true, true]);
    let result = explainer(1, 100)
        .explain(&request, &loan_model())
        .await
        .unwrap();
    assert!(!result.is_valid);
    assert!(result.changed_entities().is_empty());
    assert_eq!(result.termination, TerminationReason::Converged);
    assert_eq!(result.evaluations, 1);
}

#[tokio::test]
async fn test_counterfactual_domain_count_mismatch() {
    let request = loan_request().with_domains(vec![FeatureDomain::Empty]);
    let err = explainer(1, 10)
        .explain(&request, &loan_model())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::DimensionMismatch { .. }));

    let request = loan_request().with_fixed(vec![false]);
    let err = explainer(1, 10)
        .explain(&request, &loan_model())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn test_counterfactual_incompatible_domain() {
    let request = CounterfactualRequest::new(
        PredictionInput::new(vec![Feature::categorical("color", "red")]),
        PredictionOutput::new(vec![Output::categorical("tier", "premium", 1.0)]),
    )
    .with_domains(vec![FeatureDomain::numerical(0.0, 1.0).unwrap()]);
    let err = explainer(1, 10)
        .explain(&request, &loan_model())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_counterfactual_missing_goal_output() {
    let request = CounterfactualRequest::new(
        loan_request().input,
        PredictionOutput::new(vec![Output::number("score", 1.0)]),
    )
    .with_domains(loan_request().domains);
    let err = explainer(1, 10)
        .explain(&request, &loan_model())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplicarError::PredictionFailure { .. }));
}

/// Model that takes 20 ms per batch.
struct SlowModel;

#[async_trait]
impl PredictionProvider for SlowModel {
    async fn predict(&self, inputs: Vec<PredictionInput>) -> Result<Vec<PredictionOutput>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(inputs
            .iter()
            .map(|input| PredictionOutput::new(vec![Output::number("y", number(input, "x"))]))
            .collect())
    }
}

#[tokio::test(start_paused = true)]
async fn test_counterfactual_deadline_returns_best_so_far() {
    let request = CounterfactualRequest::new(
        PredictionInput::new(vec![Feature::number("x", 0.5)]),
        PredictionOutput::new(vec![Output::number("y", 1_000.0)]),
    )
    .with_domains(vec![FeatureDomain::numerical(0.0, 1.0).unwrap()])
    .with_max_running_time(Duration::from_millis(50));

    let result = explainer(3, 1_000_000)
        .explain(&request, &SlowModel)
        .await
        .unwrap();
    assert_eq!(result.termination, TerminationReason::TimeLimit);
    assert!(!result.is_valid);
    assert!(result.evaluations >= 1);
    assert!(result.output.by_name("y").is_some());
    assert!(result.steps < 5);
}

#[tokio::test]
async fn test_counterfactual_cancelled_before_start() {
    let cancel = CancelHandle::new();
    cancel.cancel();
    let result = explainer(1, 100)
        .explain_with_cancel(&loan_request(), &loan_model(), cancel)
        .await
        .unwrap();
    assert_eq!(result.termination, TerminationReason::Cancelled);
    assert!(!result.is_valid);
    assert!(result.changed_entities().is_empty());
}

#[test]
fn test_goal_penalty() {
    let goal = Output::number("y", 10.0);
    assert_eq!(goal_penalty(&goal, &Output::number("y", 10.005), 0.01), 0.0);
    let far = goal_penalty(&goal, &Output::number("y", 20.0), 0.01);
    assert!((far - (1.0 + 1.0_f64.tanh())).abs() < 1e-12);
    assert_eq!(
        goal_penalty(&goal, &Output::categorical("y", "ten", 1.0), 0.01),
        2.0
    );

    let goal = Output::boolean("ok", true, 1.0);
    assert_eq!(goal_penalty(&goal, &Output::boolean("ok", true, 0.2), 0.01), 0.0);
    assert_eq!(goal_penalty(&goal, &Output::boolean("ok", false, 0.2), 0.01), 2.0);
}

#[test]
fn test_total_penalty_requires_every_goal() {
    let goals = vec![Output::number("a", 1.0), Output::number("b", 2.0)];
    let actual = PredictionOutput::new(vec![Output::number("a", 1.0)]);
    assert!(total_penalty(&goals, &actual, 0.01).is_err());
    let actual = PredictionOutput::new(vec![Output::number("b", 2.0), Output::number("a", 1.0)]);
    assert_eq!(total_penalty(&goals, &actual, 0.01).unwrap(), 0.0);
}

#[test]
fn test_entity_encoding() {
    let age = CounterfactualEntity::new(
        Feature::number("age", 30.0),
        FeatureDomain::numerical(18.0, 68.0).unwrap(),
        false,
    )
    .unwrap();
    assert!(age.is_searchable());
    assert_eq!(
        age.variable(),
        Some(crate::metaheuristics::Variable::Continuous {
            lower: 18.0,
            upper: 68.0,
            integer: true
        })
    );
    assert_eq!(age.start(), 30.0);
    assert!((age.distance(&age.decode(40.0)) - 0.2).abs() < 1e-12);

    let color = CounterfactualEntity::new(
        Feature::categorical("color", "purple"),
        FeatureDomain::categorical(["red", "green"]).unwrap(),
        false,
    )
    .unwrap();
    assert_eq!(color.start(), 0.0);
    assert_eq!(color.decode(1.0).value(), &Value::from("green"));
    assert_eq!(color.distance(&color.decode(1.0)), 1.0);

    let fixed =
        CounterfactualEntity::new(Feature::number("x", 1.0), FeatureDomain::Empty, false).unwrap();
    assert!(!fixed.is_searchable());
    assert!(fixed.variable().is_none());
}

#[test]
fn test_entity_time_decode_wraps() {
    let entity = CounterfactualEntity::new(
        Feature::time("at", NaiveTime::from_hms_opt(23, 0, 0).unwrap()),
        FeatureDomain::numerical(0.0, 90_000.0).unwrap(),
        false,
    )
    .unwrap();
    let decoded = entity.decode(86_400.0 + 60.0);
    assert_eq!(
        decoded.value(),
        &Value::Time(NaiveTime::from_hms_opt(0, 1, 0).unwrap())
    );
}

#[test]
fn test_entity_assign_tracks_change() {
    let mut entity = CounterfactualEntity::new(
        Feature::boolean("student", true),
        FeatureDomain::boolean(),
        false,
    )
    .unwrap();
    assert_eq!(entity.start(), 1.0);
    assert!(!entity.is_changed());
    entity.assign(0.0);
    assert!(entity.is_changed());
    assert_eq!(entity.original().value(), &Value::Boolean(true));
}
