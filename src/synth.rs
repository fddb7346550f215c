// src/synth.rs

//! Synthetic returns with a smoothly evolving block (sector) correlation
//! structure. Used by the CLI when no panel is supplied and by the tests.

use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::distance;
use crate::error::{CorrnetError, Result};

const PSD_EPSILON: f64 = 1e-6;
const MEAN_REVERSION: f64 = 0.95;
const CORRELATION_CLIP: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub n_assets: usize,
    pub total_steps: usize,
    /// Volatility of the correlation diffusion process.
    pub process_volatility: f64,
    /// Per-step return volatility.
    pub return_volatility: f64,
    pub seed: u64,
    /// Sector count; defaults to `max(3, n_assets / 5)`.
    pub n_sectors: Option<usize>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            n_assets: 20,
            total_steps: 500,
            process_volatility: 0.05,
            return_volatility: 0.02,
            seed: 42,
            n_sectors: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    /// `total_steps x n_assets` panel of returns.
    pub returns: Array2<f64>,
    /// Sector assignment per asset, for colouring.
    pub sectors: Vec<usize>,
    /// The true correlation matrix behind each step.
    pub true_correlations: Vec<Array2<f64>>,
}

/// A fixed block correlation matrix: `within` inside a sector, `cross`
/// between sectors, unit diagonal. Handy for deterministic scenarios.
pub fn block_correlation_matrix(sectors: &[usize], within: f64, cross: f64) -> Array2<f64> {
    let n = sectors.len();
    let mut c = Array2::<f64>::eye(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let rho = if sectors[i] == sectors[j] { within } else { cross };
            c[[i, j]] = rho;
            c[[j, i]] = rho;
        }
    }
    c
}

fn base_correlation(rng: &mut ChaCha8Rng, sectors: &[usize]) -> Result<Array2<f64>> {
    let n = sectors.len();
    let mut c = Array2::<f64>::eye(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let rho = if sectors[i] == sectors[j] {
                rng.gen_range(0.4..0.8)
            } else {
                rng.gen_range(-0.1..0.3)
            };
            c[[i, j]] = rho;
            c[[j, i]] = rho;
        }
    }
    distance::clip_to_psd(&c, PSD_EPSILON)
}

/// One Ornstein-Uhlenbeck style step of the lower-triangle correlations,
/// followed by PSD repair.
fn evolve_correlation(
    rng: &mut ChaCha8Rng,
    current: &Array2<f64>,
    volatility: f64,
) -> Result<Array2<f64>> {
    let n = current.nrows();
    let mut next = Array2::<f64>::eye(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let noise: f64 = rng.sample(StandardNormal);
            let rho = (MEAN_REVERSION * current[[i, j]] + noise * volatility)
                .clamp(-CORRELATION_CLIP, CORRELATION_CLIP);
            next[[i, j]] = rho;
            next[[j, i]] = rho;
        }
    }
    distance::clip_to_psd(&next, PSD_EPSILON)
}

/// Draws one multivariate-normal return row with the given correlation,
/// scaled by `volatility`.
fn sample_returns(
    rng: &mut ChaCha8Rng,
    correlation: &Array2<f64>,
    volatility: f64,
) -> Result<Vec<f64>> {
    let n = correlation.nrows();
    let cov = DMatrix::from_fn(n, n, |i, j| correlation[[i, j]] * volatility * volatility);
    let chol = Cholesky::new(cov).ok_or_else(|| {
        CorrnetError::NumericDegeneracy(
            "Cholesky factorisation failed on a repaired correlation matrix".to_string(),
        )
    })?;
    let z = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
    let r = chol.l() * z;
    Ok(r.iter().copied().collect())
}

/// Generates the full synthetic series: sector assignment, base correlation,
/// a diffusion over the correlation parameters, and one return row per step.
/// Fully reproducible from `config.seed`.
pub fn generate(config: &SyntheticConfig) -> Result<SyntheticSeries> {
    if config.n_assets < 2 {
        return Err(CorrnetError::InvalidInput(format!(
            "synthetic series needs at least 2 assets, got {}",
            config.n_assets
        )));
    }
    if config.total_steps == 0 {
        return Err(CorrnetError::InvalidInput(
            "synthetic series needs at least 1 step".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let n_sectors = config
        .n_sectors
        .unwrap_or_else(|| 3.max(config.n_assets / 5))
        .max(1);
    let sectors: Vec<usize> = (0..config.n_assets)
        .map(|_| rng.gen_range(0..n_sectors))
        .collect();

    let mut current = base_correlation(&mut rng, &sectors)?;
    let mut true_correlations = Vec::with_capacity(config.total_steps);
    let mut returns = Array2::<f64>::zeros((config.total_steps, config.n_assets));

    for step in 0..config.total_steps {
        if step > 0 {
            current = evolve_correlation(&mut rng, &current, config.process_volatility)?;
        }
        let row = sample_returns(&mut rng, &current, config.return_volatility)?;
        for (j, value) in row.into_iter().enumerate() {
            returns[[step, j]] = value;
        }
        true_correlations.push(current.clone());
    }

    Ok(SyntheticSeries {
        returns,
        sectors,
        true_correlations,
    })
}
