use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};

use super::{Element, cast_array, new_rng, normal_array2};

#[test]
fn test_normal_array2_statistics() {
    let mut rng = new_rng(Some(7));
    let samples: Array2<f64> = normal_array2(0.5, 2.0, (200, 50), &mut rng);
    assert_eq!(samples.shape(), &[200, 50]);

    let n = samples.len() as f64;
    let mean = samples.sum() / n;
    let var = samples.mapv(|v| (v - mean).powi(2)).sum() / n;
    assert_abs_diff_eq!(mean, 0.5, epsilon = 0.1);
    assert_abs_diff_eq!(var.sqrt(), 2.0, epsilon = 0.1);
}

#[test]
fn test_normal_array2_odd_size() {
    // 元素个数为奇数时，最后一对Box-Muller样本只用到一个
    let mut rng = new_rng(Some(1));
    let samples: Array2<f32> = normal_array2(0.0, 1.0, (3, 3), &mut rng);
    assert_eq!(samples.len(), 9);
    assert!(samples.iter().all(|v| v.is_finite()));
}

#[test]
fn test_seeded_rng_is_reproducible() {
    let a: Array2<f32> = normal_array2(0.0, 1e-2, (4, 6), &mut new_rng(Some(42)));
    let b: Array2<f32> = normal_array2(0.0, 1e-2, (4, 6), &mut new_rng(Some(42)));
    let c: Array2<f32> = normal_array2(0.0, 1e-2, (4, 6), &mut new_rng(Some(43)));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_zero_std_gives_constant() {
    let samples: Array2<f64> = normal_array2(3.0, 0.0, (2, 5), &mut new_rng(None));
    assert!(samples.iter().all(|&v| v == 3.0));
}

#[test]
fn test_cast_array() {
    let x: Array2<f64> = array![[1.0, 0.1], [-2.5, 1e-10]];
    let y: Array2<f32> = cast_array(&x);
    assert_eq!(y[[0, 0]], 1.0f32);
    assert_eq!(y[[0, 1]], 0.1f32);
    assert_eq!(y[[1, 0]], -2.5f32);

    let back: Array2<f64> = cast_array(&y);
    assert_abs_diff_eq!(back[[0, 1]], 0.1, epsilon = 1e-7);
    assert_eq!(<f32 as Element>::NAME, "f32");
    assert_eq!(<f64 as Element>::NAME, "f64");
}
