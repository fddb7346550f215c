// src/estimator.rs

//! Rolling-window Pearson correlation over a `T x N` returns panel, plus the
//! CSV panel loader and the bulk matrix dump used by the CLI.

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::prelude::*;
use ndarray_npy::write_npy;
use rayon::prelude::*;

use crate::error::{CorrnetError, Result};

/// One rolling-window estimate. `timestamp` is the panel row index just past
/// the window, so the window covers rows `timestamp - window .. timestamp`.
#[derive(Debug, Clone)]
pub struct CorrelationEstimate {
    pub timestamp: usize,
    pub window: usize,
    pub matrix: Array2<f64>,
}

/// Sample Pearson correlation of the rows in `window`.
///
/// Columns with zero variance get zero correlation against everything (the
/// statistic is undefined there); the diagonal stays one.
fn pearson_correlation(window: &ArrayView2<f64>) -> Array2<f64> {
    let rows = window.nrows();
    let cols = window.ncols();
    let mut means = vec![0.0; cols];
    for j in 0..cols {
        means[j] = window.column(j).sum() / rows as f64;
    }
    let mut sds = vec![0.0; cols];
    for j in 0..cols {
        let ss: f64 = window.column(j).iter().map(|&x| (x - means[j]).powi(2)).sum();
        sds[j] = (ss / (rows as f64 - 1.0)).sqrt();
    }

    let mut corr = Array2::<f64>::eye(cols);
    for i in 0..cols {
        for j in (i + 1)..cols {
            let value = if sds[i] > 0.0 && sds[j] > 0.0 {
                let cov: f64 = window
                    .column(i)
                    .iter()
                    .zip(window.column(j).iter())
                    .map(|(&a, &b)| (a - means[i]) * (b - means[j]))
                    .sum::<f64>()
                    / (rows as f64 - 1.0);
                (cov / (sds[i] * sds[j])).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            corr[[i, j]] = value;
            corr[[j, i]] = value;
        }
    }
    corr
}

/// Slides a window of `window` rows one step at a time over the panel and
/// produces one correlation estimate per step: `T - window` estimates in
/// total. Fails with `InsufficientData` when the window does not fit.
pub fn estimate_correlations(
    returns: &Array2<f64>,
    window: usize,
) -> Result<Vec<CorrelationEstimate>> {
    let rows = returns.nrows();
    if returns.ncols() < 2 {
        return Err(CorrnetError::InvalidInput(format!(
            "returns panel needs at least 2 assets, got {}",
            returns.ncols()
        )));
    }
    if window < 2 {
        return Err(CorrnetError::InvalidInput(format!(
            "window must be at least 2 rows, got {}",
            window
        )));
    }
    if rows <= window {
        return Err(CorrnetError::InsufficientData { rows, window });
    }

    let mut estimates = Vec::with_capacity(rows - window);
    for end in window..rows {
        let slice = returns.slice(s![end - window..end, ..]);
        estimates.push(CorrelationEstimate {
            timestamp: end,
            window,
            matrix: pearson_correlation(&slice),
        });
    }
    Ok(estimates)
}

/// A returns panel loaded from CSV: row labels (first column, typically
/// dates), asset names (header), and the numeric panel itself.
#[derive(Debug, Clone)]
pub struct ReturnsPanel {
    pub row_labels: Vec<String>,
    pub asset_names: Vec<String>,
    pub returns: Array2<f64>,
}

/// Loads a returns panel from a CSV file with a header row. The first column
/// holds row labels; every other column is one asset's return series.
pub fn load_returns_csv<P: AsRef<Path>>(path: P) -> Result<ReturnsPanel> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.len() < 3 {
        return Err(CorrnetError::InvalidInput(format!(
            "panel CSV needs a label column plus at least 2 assets, got {} columns",
            headers.len()
        )));
    }
    let asset_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(CorrnetError::InvalidInput(format!(
                "row {} has {} fields, expected {}",
                row_labels.len() + 1,
                record.len(),
                headers.len()
            )));
        }
        row_labels.push(record[0].to_string());
        for field in record.iter().skip(1) {
            let parsed: f64 = field.trim().parse().map_err(|_| {
                CorrnetError::InvalidInput(format!("non-numeric return value '{}'", field))
            })?;
            values.push(parsed);
        }
    }

    let rows = row_labels.len();
    let cols = asset_names.len();
    let returns = Array2::from_shape_vec((rows, cols), values).map_err(|e| {
        CorrnetError::InvalidInput(format!("panel shape mismatch: {}", e))
    })?;
    Ok(ReturnsPanel {
        row_labels,
        asset_names,
        returns,
    })
}

/// Writes a one-row-per-estimate summary CSV: timestamp plus the mean
/// off-diagonal correlation of that window.
pub fn write_summary_csv<P: AsRef<Path>>(
    path: P,
    estimates: &[CorrelationEstimate],
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(["timestamp", "mean_correlation"])?;
    for est in estimates {
        let n = est.matrix.nrows();
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += est.matrix[[i, j]];
            }
        }
        let pairs = (n * (n - 1) / 2) as f64;
        wtr.write_record([est.timestamp.to_string(), format!("{}", sum / pairs)])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Dumps every estimate's matrix as `corr_{timestamp:06}.npy` under `dir`,
/// one file per window, in parallel. The estimates are frame-independent, so
/// the fan-out is safe.
pub fn dump_matrices_npy<P: AsRef<Path>>(
    dir: P,
    estimates: &[CorrelationEstimate],
) -> Result<()> {
    std::fs::create_dir_all(&dir)?;
    let dir = dir.as_ref();
    estimates
        .par_iter()
        .try_for_each(|est| -> std::io::Result<()> {
            let path = dir.join(format!("corr_{:06}.npy", est.timestamp));
            write_npy(&path, &est.matrix)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;
    Ok(())
}
