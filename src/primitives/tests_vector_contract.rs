// Contract checks for the Vector primitive.
//
// References:
//   - Cauchy-Schwarz inequality: |dot(u,v)| <= norm(u) * norm(v)

use super::*;

/// Dot product is commutative.
#[test]
fn vector_dot_commutative() {
    let u = Vector::from_slice(&[1.0, 2.0, 3.0]);
    let v = Vector::from_slice(&[4.0, 5.0, 6.0]);
    assert!((u.dot(&v) - v.dot(&u)).abs() < 1e-12);
    assert!((u.dot(&v) - 32.0).abs() < 1e-12);
}

/// Cauchy-Schwarz holds.
#[test]
fn vector_cauchy_schwarz() {
    let u = Vector::from_slice(&[1.0, -2.0, 3.5]);
    let v = Vector::from_slice(&[-4.0, 0.5, 2.0]);
    assert!(u.dot(&v).abs() <= u.norm() * v.norm() + 1e-12);
}

#[test]
fn vector_mean_and_population_variance() {
    let v = Vector::from_slice(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    assert!((v.mean() - 5.0).abs() < 1e-12);
    assert!((v.variance() - 4.0).abs() < 1e-12);
    assert!((v.std() - 2.0).abs() < 1e-12);
}

#[test]
fn vector_empty_statistics_are_nan() {
    let v = Vector::<f64>::zeros(0);
    assert!(v.is_empty());
    assert!(v.mean().is_nan());
    assert!(v.variance().is_nan());
    assert!((v.max_abs()).abs() < f64::EPSILON);
}

#[test]
fn vector_weighted_mean() {
    let v = Vector::from_slice(&[1.0, 3.0]);
    assert!((v.weighted_mean(&Vector::from_slice(&[1.0, 3.0])) - 2.5).abs() < 1e-12);
    assert!(v.weighted_mean(&Vector::zeros(2)).is_nan());
}

#[test]
fn vector_select_and_slice() {
    let v = Vector::from_slice(&[10.0, 20.0, 30.0, 40.0]);
    assert_eq!(v.select(&[3, 0]).as_slice(), &[40.0, 10.0]);
    assert_eq!(v.slice(1, 3).as_slice(), &[20.0, 30.0]);
}

#[test]
fn vector_scalar_ops_and_sub() {
    let v = Vector::from_slice(&[1.0, -2.0]);
    assert_eq!(v.add_scalar(1.0).as_slice(), &[2.0, -1.0]);
    assert_eq!(v.mul_scalar(-2.0).as_slice(), &[-2.0, 4.0]);
    assert_eq!(v.sub(&Vector::ones(2)).as_slice(), &[0.0, -3.0]);
    assert!((v.max_abs() - 2.0).abs() < 1e-12);
}
