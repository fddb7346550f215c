// src/distance.rs

//! Correlation-matrix validation, positive semi-definite repair, and the
//! correlation-to-distance transform used by all graph filters.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::prelude::*;

use crate::error::{CorrnetError, Result};

const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Checks that `c` is a plausible correlation matrix: square with at least
/// two rows, symmetric within tolerance, unit diagonal.
pub fn validate_correlation(c: &Array2<f64>) -> Result<()> {
    let n = c.nrows();
    if n != c.ncols() {
        return Err(CorrnetError::InvalidInput(format!(
            "correlation matrix must be square, got {}x{}",
            c.nrows(),
            c.ncols()
        )));
    }
    if n < 2 {
        return Err(CorrnetError::InvalidInput(format!(
            "correlation matrix needs at least 2 assets, got {}",
            n
        )));
    }
    for i in 0..n {
        if (c[[i, i]] - 1.0).abs() > SYMMETRY_TOLERANCE {
            return Err(CorrnetError::InvalidInput(format!(
                "diagonal entry ({}, {}) is {}, expected 1",
                i,
                i,
                c[[i, i]]
            )));
        }
        for j in (i + 1)..n {
            if (c[[i, j]] - c[[j, i]]).abs() > SYMMETRY_TOLERANCE {
                return Err(CorrnetError::InvalidInput(format!(
                    "matrix is not symmetric at ({}, {})",
                    i, j
                )));
            }
        }
    }
    Ok(())
}

/// Maps a correlation matrix to the metric distance `d = sqrt(2 (1 - c))`.
///
/// Perfect correlation maps to 0, no correlation to sqrt(2), perfect
/// anti-correlation to 2. Entries outside `[-1, 1]` are clamped rather than
/// rejected so that floating-point noise from upstream estimation cannot
/// poison a frame. The diagonal is forced to zero.
pub fn to_distance(c: &Array2<f64>) -> Array2<f64> {
    let n = c.nrows();
    let mut d = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let rho = c[[i, j]].clamp(-1.0, 1.0);
            d[[i, j]] = (2.0 * (1.0 - rho)).max(0.0).sqrt();
        }
    }
    d
}

/// Inverse of [`to_distance`] for a single entry: `c = 1 - d^2 / 2`.
pub fn to_correlation(distance: f64) -> f64 {
    (1.0 - distance * distance / 2.0).clamp(-1.0, 1.0)
}

/// Repairs a correlation matrix into positive semi-definite form by clipping
/// its eigenvalues at `epsilon` and renormalising the diagonal back to one.
///
/// The input must pass [`validate_correlation`]; a malformed matrix is
/// rejected as `InvalidInput` instead of being silently repaired. This is an
/// explicit, documented transform of the input, not an error swallow: callers
/// that need the unrepaired matrix should not call it. Fails with
/// `NumericDegeneracy` when the renormalisation itself breaks down (a
/// non-positive diagonal after clipping).
pub fn clip_to_psd(c: &Array2<f64>, epsilon: f64) -> Result<Array2<f64>> {
    validate_correlation(c)?;
    let n = c.nrows();

    let m = DMatrix::from_fn(n, n, |i, j| 0.5 * (c[[i, j]] + c[[j, i]]));
    let eigen = SymmetricEigen::new(m);
    let clipped = eigen.eigenvalues.map(|v| if v < epsilon { epsilon } else { v });
    let q = &eigen.eigenvectors;
    let repaired = q * DMatrix::from_diagonal(&clipped) * q.transpose();

    // Renormalise so the diagonal is exactly one again.
    let mut scale = Vec::with_capacity(n);
    for i in 0..n {
        let d = repaired[(i, i)];
        if d <= 0.0 || !d.is_finite() {
            return Err(CorrnetError::NumericDegeneracy(format!(
                "diagonal entry {} is {} after eigenvalue clipping",
                i, d
            )));
        }
        scale.push(1.0 / d.sqrt());
    }

    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            out[[i, j]] = repaired[(i, j)] * scale[i] * scale[j];
        }
    }
    // Exact symmetry and unit diagonal, independent of rounding above.
    for i in 0..n {
        out[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let avg = 0.5 * (out[[i, j]] + out[[j, i]]);
            out[[i, j]] = avg;
            out[[j, i]] = avg;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn distance_of_identity_is_sqrt_two() {
        let c = Array2::<f64>::eye(3);
        let d = to_distance(&c);
        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    assert_eq!(d[[i, j]], 0.0);
                } else {
                    assert!((d[[i, j]] - 2.0_f64.sqrt()).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn out_of_range_correlations_are_clamped() {
        let c = array![[1.0, 1.0 + 1e-9], [1.0 + 1e-9, 1.0]];
        let d = to_distance(&c);
        assert_eq!(d[[0, 1]], 0.0);
    }
}
