use super::*;

fn design() -> (Matrix<f64>, Vector<f64>) {
    // y = 0.5 + 2 x0 - 3 x1
    let rows = vec![
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![2.0, 1.0],
        vec![3.0, -1.0],
        vec![-1.0, 2.0],
        vec![4.0, 0.5],
    ];
    let x = Matrix::from_rows(&rows).expect("rectangular");
    let y = rows
        .iter()
        .map(|r| 0.5 + 2.0 * r[0] - 3.0 * r[1])
        .collect();
    (x, y)
}

#[test]
fn test_exact_system_recovers_coefficients() {
    let (x, y) = design();
    let w = Vector::from_slice(&[1.0, 0.5, 2.0, 1.5, 0.25, 1.0]);
    let fit = WeightedLinearRegression::new().fit(&x, &y, &w).expect("well posed");
    assert!((fit.coefficients[0] - 2.0).abs() < 1e-6);
    assert!((fit.coefficients[1] + 3.0).abs() < 1e-6);
    assert!((fit.intercept - 0.5).abs() < 1e-6);
    assert!(fit.mse.abs() < 1e-6);
    assert!((fit.r_squared - 1.0).abs() < 1e-6);
}

#[test]
fn test_without_intercept() {
    let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1");
    let y = Vector::from_slice(&[2.0, 4.0, 6.0]);
    let fit = WeightedLinearRegression::new()
        .with_intercept(false)
        .fit(&x, &y, &Vector::ones(3))
        .expect("well posed");
    assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
    assert!(fit.intercept.abs() < f64::EPSILON);
}

#[test]
fn test_weights_change_the_fit() {
    // Two clusters disagreeing on the slope; the heavier one wins.
    let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 0.0, 1.0]).expect("4x1");
    let y = Vector::from_slice(&[0.0, 1.0, 0.0, -1.0]);
    let heavy_first = Vector::from_slice(&[100.0, 100.0, 1.0, 1.0]);
    let heavy_second = Vector::from_slice(&[1.0, 1.0, 100.0, 100.0]);
    let model = WeightedLinearRegression::new();
    let a = model.fit(&x, &y, &heavy_first).expect("well posed");
    let b = model.fit(&x, &y, &heavy_second).expect("well posed");
    assert!(a.coefficients[0] > 0.9);
    assert!(b.coefficients[0] < -0.9);
}

#[test]
fn test_standard_errors_and_p_values() {
    let x = Matrix::from_vec(6, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("6x1");
    let y = Vector::from_slice(&[1.1, 1.9, 3.2, 3.9, 5.1, 5.8]);
    let fit = WeightedLinearRegression::new()
        .fit(&x, &y, &Vector::ones(6))
        .expect("well posed");
    assert!(fit.std_errors[0] > 0.0 && fit.std_errors[0] < 0.1);
    assert!(fit.p_values[0] < 1e-4, "slope is clearly significant");
    assert!(fit.mse > 0.0);
}

#[test]
fn test_irrelevant_feature_has_large_p_value() {
    let x = Matrix::from_rows(&[
        vec![1.0, 1.0],
        vec![2.0, -1.0],
        vec![3.0, 1.0],
        vec![4.0, -1.0],
        vec![5.0, 1.0],
        vec![6.0, -1.0],
        vec![7.0, 1.0],
        vec![8.0, -1.0],
    ])
    .expect("rectangular");
    let y = Vector::from_slice(&[2.1, 3.9, 6.2, 7.8, 10.1, 12.0, 13.9, 16.1]);
    let fit = WeightedLinearRegression::new()
        .fit(&x, &y, &Vector::ones(8))
        .expect("well posed");
    assert!(fit.p_values[0] < 1e-6);
    assert!(fit.p_values[1] > 0.05);
}

#[test]
fn test_no_residual_dof_gives_nan_inference() {
    let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("2x1");
    let y = Vector::from_slice(&[1.0, 3.0]);
    let fit = WeightedLinearRegression::new()
        .fit(&x, &y, &Vector::ones(2))
        .expect("solvable");
    assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
    assert!(fit.std_errors[0].is_nan());
    assert!(fit.p_values[0].is_nan());
}

#[test]
fn test_rank_deficient_falls_back_to_jitter() {
    // Duplicate column: any split of the slope is acceptable, predictions are not.
    let x = Matrix::from_rows(&[
        vec![1.0, 1.0],
        vec![2.0, 2.0],
        vec![3.0, 3.0],
        vec![4.0, 4.0],
    ])
    .expect("rectangular");
    let y = Vector::from_slice(&[2.0, 4.0, 6.0, 8.0]);
    let fit = WeightedLinearRegression::new()
        .fit(&x, &y, &Vector::ones(4))
        .expect("jitter recovers");
    let predicted = fit.predict(&x).expect("2 columns");
    for i in 0..4 {
        assert!((predicted[i] - y[i]).abs() < 1e-4);
    }
}

#[test]
fn test_dimension_mismatch() {
    let (x, y) = design();
    let model = WeightedLinearRegression::new();
    assert!(matches!(
        model.fit(&x, &y.slice(0, 3), &Vector::ones(6)),
        Err(ExplicarError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        model.fit(&x, &y, &Vector::ones(5)),
        Err(ExplicarError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_degenerate_inputs() {
    let model = WeightedLinearRegression::new();
    let x = Matrix::from_vec(1, 1, vec![1.0]).expect("1x1");
    assert!(matches!(
        model.fit(&x, &Vector::ones(1), &Vector::ones(1)),
        Err(ExplicarError::DegenerateInput { .. })
    ));

    let (x, y) = design();
    assert!(matches!(
        model.fit(&x, &y, &Vector::zeros(6)),
        Err(ExplicarError::DegenerateInput { .. })
    ));
}

#[test]
fn test_negative_weight_rejected() {
    let (x, y) = design();
    let mut w = Vector::ones(6);
    w[2] = -1.0;
    assert!(matches!(
        WeightedLinearRegression::new().fit(&x, &y, &w),
        Err(ExplicarError::InvalidInput { .. })
    ));
}
