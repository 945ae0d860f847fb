use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn hadamard() -> (Matrix<f64>, Vector<f64>) {
    let x0 = [1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
    let x1 = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0];
    let x2 = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
    let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![x0[i], x1[i], x2[i]]).collect();
    let y = (0..8).map(|i| 2.0 + 3.0 * x0[i] - 2.0 * x2[i]).collect();
    (Matrix::from_rows(&rows).expect("rectangular"), y)
}

fn random_problem(seed: u64, n: usize, p: usize) -> (Matrix<f64>, Vector<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n * p).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let x = Matrix::from_vec(n, p, data).expect("n*p entries");
    let y = (0..n)
        .map(|i| 1.5 * x.get(i, 0) - 2.0 * x.get(i, 2) + 0.3 * rng.gen_range(-1.0..1.0))
        .collect();
    (x, y)
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_lars_identity_path() {
    let x = Matrix::eye(4);
    let y = Vector::from_slice(&[0.5, -3.0, 2.0, 1.0]);
    let path = LarsPath::new().fit(&x, &y).expect("valid input");

    assert_eq!(path.active, vec![1, 2, 3, 0]);
    let expected_alphas = [0.75, 0.5, 0.25, 0.125, 0.0];
    assert_eq!(path.alphas.len(), expected_alphas.len());
    for (a, e) in path.alphas.iter().zip(expected_alphas) {
        assert_close(*a, e, 1e-12);
    }
    let last = path.final_coefs().expect("non-empty path");
    for j in 0..4 {
        assert_close(last[j], y[j], 1e-12);
    }
    assert_close(path.coefs[1][1], -1.0, 1e-12);
}

#[test]
fn test_lars_max_iter_truncates_path() {
    let x = Matrix::eye(4);
    let y = Vector::from_slice(&[0.5, -3.0, 2.0, 1.0]);
    let full = LarsPath::new().fit(&x, &y).expect("valid input");
    for k in 1..=3 {
        let partial = LarsPath::new().with_max_iter(k).fit(&x, &y).expect("valid input");
        assert_eq!(partial.active, full.active[..k].to_vec());
        assert_eq!(partial.n_iter, k);
        for (a, e) in partial.alphas.iter().zip(&full.alphas) {
            assert_close(*a, *e, 1e-6);
        }
    }
}

#[test]
fn test_lars_orthogonal_path() {
    let (x, y) = hadamard();
    let path = LarsPath::new().fit(&x, &y).expect("valid input");
    assert_eq!(path.active, vec![0, 2]);
    assert_eq!(path.alphas.len(), 3);
    for (a, e) in path.alphas.iter().zip([3.0, 2.0, 0.0]) {
        assert_close(*a, e, 1e-9);
    }
    let expected = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0, 0.0, -2.0]];
    for (coef, row) in path.coefs.iter().zip(expected) {
        for j in 0..3 {
            assert_close(coef[j], row[j], 1e-9);
        }
    }
}

#[test]
fn test_lars_return_path_false_keeps_last_step() {
    let (x, y) = hadamard();
    let path = LarsPath::new().with_return_path(false).fit(&x, &y).expect("valid input");
    assert_eq!(path.alphas, vec![0.0]);
    assert_eq!(path.coefs.len(), 1);
    assert_close(path.coefs[0][0], 3.0, 1e-9);
}

#[test]
fn test_lars_alphas_track_max_correlation() {
    let (x, y) = random_problem(17, 30, 6);
    let n = x.n_rows() as f64;
    let path = LarsPath::new().fit(&x, &y).expect("valid input");

    for w in path.alphas.windows(2) {
        assert!(w[1] <= w[0] + 1e-12, "alphas must not increase: {:?}", path.alphas);
    }
    for (alpha, coef) in path.alphas.iter().zip(&path.coefs) {
        let residual = y.sub(&x.matvec(coef).expect("p columns"));
        let max_corr = (0..x.n_cols())
            .map(|j| x.column(j).dot(&residual).abs())
            .fold(0.0, f64::max);
        assert_close(max_corr / n, *alpha, 1e-8);
    }
    let mut seen = path.active.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), path.active.len(), "active set has duplicates");
}

/// Correlated design whose lasso path removes features 2 and then 3
/// before reaching the exact solution `[0.75, -3.5, 0.375, 0.5]`.
fn crossing_problem() -> (Matrix<f64>, Vector<f64>) {
    let x = Matrix::from_rows(&[
        vec![-1.0, 1.0, 2.0, 1.0],
        vec![2.0, 0.0, 0.0, -1.0],
        vec![0.0, -1.0, 0.0, -1.0],
        vec![2.0, 1.0, 0.0, 2.0],
    ])
    .expect("rectangular");
    (x, Vector::from_slice(&[-3.0, 1.0, 3.0, -1.0]))
}

#[test]
fn test_lars_drops_variable_on_sign_change() {
    let (x, y) = crossing_problem();
    let n = x.n_rows() as f64;
    let path = LarsPath::new().fit(&x, &y).expect("valid input");

    let nonzero: Vec<usize> = path
        .coefs
        .iter()
        .map(|c| c.iter().filter(|v| **v != 0.0).count())
        .collect();
    assert!(
        nonzero.windows(2).any(|w| w[1] < w[0]),
        "no feature left the active set: {nonzero:?}"
    );
    let left = (0..x.n_cols()).any(|j| {
        path.coefs
            .windows(2)
            .any(|w| w[0][j] != 0.0 && w[1][j] == 0.0)
    });
    assert!(left);

    // Active correlations sit at ±alpha, inactive ones below it.
    for (alpha, coef) in path.alphas.iter().zip(&path.coefs) {
        let residual = y.sub(&x.matvec(coef).expect("p columns"));
        for j in 0..x.n_cols() {
            let corr = x.column(j).dot(&residual) / n;
            if coef[j] == 0.0 {
                assert!(corr.abs() <= alpha + 1e-9, "inactive {j}: {corr} > {alpha}");
            } else {
                assert_close(corr, coef[j].signum() * alpha, 1e-9);
            }
        }
    }

    for w in path.alphas.windows(2) {
        assert!(w[1] <= w[0] + 1e-12, "alphas must not increase: {:?}", path.alphas);
    }
    let mut seen = path.active.clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
    let last = path.final_coefs().expect("non-empty path");
    for (j, expected) in [0.75, -3.5, 0.375, 0.5].into_iter().enumerate() {
        assert_close(last[j], expected, 1e-9);
    }
}

#[test]
fn test_lars_degenerate_regressor_does_not_crash() {
    let (x, y) = random_problem(3, 12, 3);
    let rows: Vec<Vec<f64>> = (0..12)
        .map(|i| vec![x.get(i, 0), x.get(i, 1), x.get(i, 2), x.get(i, 0)])
        .collect();
    let duplicated = Matrix::from_rows(&rows).expect("rectangular");
    let path = LarsPath::new().fit(&duplicated, &y).expect("valid input");
    for coef in &path.coefs {
        assert!(coef.iter().all(|c| c.is_finite()));
    }
    assert_close(path.alphas.last().copied().unwrap_or(f64::NAN), 0.0, 1e-12);
}

#[test]
fn test_lars_dimension_mismatch() {
    let x = Matrix::eye(3);
    let y = Vector::from_slice(&[1.0, 2.0]);
    assert!(matches!(
        LarsPath::new().fit(&x, &y),
        Err(ExplicarError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_lars_rejects_negative_alpha_min() {
    let x = Matrix::eye(2);
    let y = Vector::from_slice(&[1.0, 2.0]);
    assert!(matches!(
        LarsPath::new().with_alpha_min(-1.0).fit(&x, &y),
        Err(ExplicarError::InvalidHyperparameter { .. })
    ));
}

#[test]
fn test_lasso_lars_ic_recovers_sparse_model() {
    let (x, y) = hadamard();
    for criterion in [Criterion::Aic, Criterion::Bic] {
        let fit = LassoLarsIc::new(criterion).fit(&x, &y).expect("valid input");
        assert_eq!(fit.selected(), vec![0, 2]);
        assert_close(fit.coefficients[0], 3.0, 1e-6);
        assert_close(fit.coefficients[1], 0.0, 1e-6);
        assert_close(fit.coefficients[2], -2.0, 1e-6);
        assert_close(fit.intercept, 2.0, 1e-6);
        assert_eq!(fit.best_step, 2);
        assert_close(fit.alpha, 0.0, 1e-12);
    }
}

#[test]
fn test_lasso_lars_ic_aic_values() {
    let (x, y) = hadamard();
    let fit = LassoLarsIc::new(Criterion::Aic).fit(&x, &y).expect("valid input");
    let expected = [8.0, 8.0 * 8.0 / 13.0 + 2.0, 4.0];
    assert_eq!(fit.criterion_values.len(), 3);
    for (v, e) in fit.criterion_values.iter().zip(expected) {
        assert_close(*v, e, 1e-6);
    }
}

#[test]
fn test_lasso_lars_ic_constant_target_selects_empty_model() {
    // Constant y: the path stops at the empty model.
    let x = Matrix::from_vec(4, 1, vec![1.0, -1.0, 1.0, -1.0]).expect("4x1");
    let y = Vector::from_slice(&[5.0, 5.0, 5.0, 5.0]);
    let fit = LassoLarsIc::new(Criterion::Aic).fit(&x, &y).expect("valid input");
    assert_eq!(fit.best_step, 0);
    assert!(fit.selected().is_empty());
    assert_close(fit.intercept, 5.0, 1e-12);
}

#[test]
fn test_lasso_lars_ic_unnormalized_matches_normalized_on_orthogonal_design() {
    let (x, y) = hadamard();
    let a = LassoLarsIc::new(Criterion::Bic).fit(&x, &y).expect("valid input");
    let b = LassoLarsIc::new(Criterion::Bic)
        .with_normalize(false)
        .fit(&x, &y)
        .expect("valid input");
    for j in 0..3 {
        assert_close(a.coefficients[j], b.coefficients[j], 1e-9);
    }
}

#[test]
fn test_lasso_lars_ic_dimension_mismatch() {
    let x = Matrix::eye(3);
    let y = Vector::from_slice(&[1.0]);
    assert!(LassoLarsIc::new(Criterion::Aic).fit(&x, &y).is_err());
}
