use approx::assert_abs_diff_eq;
use corrnet::distance::{clip_to_psd, to_correlation, to_distance, validate_correlation};
use corrnet::error::CorrnetError;
use corrnet::synth::block_correlation_matrix;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{array, Array2};

fn block_matrix() -> Array2<f64> {
    block_correlation_matrix(&[0, 0, 1, 1, 2], 0.7, 0.1)
}

#[test]
fn distance_is_symmetric_nonnegative_with_zero_diagonal() {
    let d = to_distance(&block_matrix());
    let n = d.nrows();
    for i in 0..n {
        assert_eq!(d[[i, i]], 0.0);
        for j in 0..n {
            assert!(d[[i, j]] >= 0.0);
            assert_abs_diff_eq!(d[[i, j]], d[[j, i]], epsilon = 1e-12);
        }
    }
}

#[test]
fn distance_satisfies_triangle_inequality() {
    let d = to_distance(&block_matrix());
    let n = d.nrows();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                assert!(
                    d[[i, j]] <= d[[i, k]] + d[[k, j]] + 1e-12,
                    "triangle inequality violated at ({}, {}, {})",
                    i,
                    j,
                    k
                );
            }
        }
    }
}

#[test]
fn identity_correlation_maps_to_sqrt_two() {
    let d = to_distance(&Array2::<f64>::eye(5));
    for i in 0..5 {
        for j in 0..5 {
            if i != j {
                assert_abs_diff_eq!(d[[i, j]], 2.0_f64.sqrt(), epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn out_of_range_values_are_clamped_not_rejected() {
    let c = array![[1.0, -1.0000004], [-1.0000004, 1.0]];
    let d = to_distance(&c);
    assert_abs_diff_eq!(d[[0, 1]], 2.0, epsilon = 1e-12);
}

#[test]
fn distance_round_trips_through_inverse_transform() {
    for &rho in &[-1.0_f64, -0.5, 0.0, 0.3, 0.99, 1.0] {
        let d = (2.0 * (1.0 - rho)).max(0.0).sqrt();
        assert_abs_diff_eq!(to_correlation(d), rho, epsilon = 1e-12);
    }
}

#[test]
fn validate_rejects_non_square_and_asymmetric_matrices() {
    let wide = Array2::<f64>::zeros((2, 3));
    assert!(matches!(
        validate_correlation(&wide),
        Err(CorrnetError::InvalidInput(_))
    ));

    let mut skew = Array2::<f64>::eye(3);
    skew[[0, 1]] = 0.5;
    skew[[1, 0]] = -0.5;
    assert!(matches!(
        validate_correlation(&skew),
        Err(CorrnetError::InvalidInput(_))
    ));

    let tiny = Array2::<f64>::eye(1);
    assert!(matches!(
        validate_correlation(&tiny),
        Err(CorrnetError::InvalidInput(_))
    ));
}

#[test]
fn psd_repair_clips_negative_eigenvalues() {
    // An indefinite "correlation" matrix: rho(0,1) = rho(1,2) = 0.9 but
    // rho(0,2) = -0.9 cannot hold simultaneously.
    let c = array![[1.0, 0.9, -0.9], [0.9, 1.0, 0.9], [-0.9, 0.9, 1.0]];
    let repaired = clip_to_psd(&c, 1e-6).expect("repair failed");

    let n = repaired.nrows();
    for i in 0..n {
        assert_abs_diff_eq!(repaired[[i, i]], 1.0, epsilon = 1e-12);
        for j in 0..n {
            assert_abs_diff_eq!(repaired[[i, j]], repaired[[j, i]], epsilon = 1e-12);
        }
    }

    let m = DMatrix::from_fn(n, n, |i, j| repaired[[i, j]]);
    let eigen = SymmetricEigen::new(m);
    for &v in eigen.eigenvalues.iter() {
        assert!(v >= -1e-8, "eigenvalue {} still negative after repair", v);
    }
}

#[test]
fn psd_repair_rejects_malformed_matrices() {
    let mut skew = Array2::<f64>::eye(3);
    skew[[0, 1]] = 0.5;
    skew[[1, 0]] = -0.5;
    assert!(matches!(
        clip_to_psd(&skew, 1e-6),
        Err(CorrnetError::InvalidInput(_))
    ));

    let mut covariance = Array2::<f64>::eye(3);
    covariance[[1, 1]] = 4.0;
    assert!(matches!(
        clip_to_psd(&covariance, 1e-6),
        Err(CorrnetError::InvalidInput(_))
    ));

    let wide = Array2::<f64>::zeros((2, 3));
    assert!(matches!(
        clip_to_psd(&wide, 1e-6),
        Err(CorrnetError::InvalidInput(_))
    ));
}

#[test]
fn psd_repair_leaves_valid_matrices_close_to_input() {
    let c = block_matrix();
    let repaired = clip_to_psd(&c, 1e-9).expect("repair failed");
    for i in 0..c.nrows() {
        for j in 0..c.ncols() {
            assert_abs_diff_eq!(repaired[[i, j]], c[[i, j]], epsilon = 1e-6);
        }
    }
}
