use corrnet::distance::validate_correlation;
use corrnet::error::CorrnetError;
use corrnet::estimator::estimate_correlations;
use corrnet::synth::{block_correlation_matrix, generate, SyntheticConfig};

#[test]
fn block_matrix_has_the_requested_structure() {
    let c = block_correlation_matrix(&[0, 0, 1, 1, 2], 0.7, 0.1);
    assert_eq!(c.nrows(), 5);
    assert_eq!(c[[0, 0]], 1.0);
    assert_eq!(c[[0, 1]], 0.7);
    assert_eq!(c[[1, 0]], 0.7);
    assert_eq!(c[[0, 2]], 0.1);
    assert_eq!(c[[2, 3]], 0.7);
    assert_eq!(c[[3, 4]], 0.1);
}

#[test]
fn generated_series_has_the_configured_shape() {
    let config = SyntheticConfig {
        n_assets: 8,
        total_steps: 40,
        ..SyntheticConfig::default()
    };
    let series = generate(&config).unwrap();
    assert_eq!(series.returns.nrows(), 40);
    assert_eq!(series.returns.ncols(), 8);
    assert_eq!(series.sectors.len(), 8);
    assert_eq!(series.true_correlations.len(), 40);
}

#[test]
fn generation_is_reproducible_from_the_seed() {
    let config = SyntheticConfig {
        n_assets: 6,
        total_steps: 25,
        ..SyntheticConfig::default()
    };
    let a = generate(&config).unwrap();
    let b = generate(&config).unwrap();
    assert_eq!(a.returns, b.returns);
    assert_eq!(a.sectors, b.sectors);
    assert_eq!(a.true_correlations, b.true_correlations);

    let c = generate(&SyntheticConfig {
        seed: 99,
        ..config
    })
    .unwrap();
    assert_ne!(a.returns, c.returns);
}

#[test]
fn true_correlations_are_valid_and_bounded() {
    let config = SyntheticConfig {
        n_assets: 7,
        total_steps: 30,
        ..SyntheticConfig::default()
    };
    let series = generate(&config).unwrap();
    for matrix in &series.true_correlations {
        validate_correlation(matrix).expect("generated matrix is malformed");
        for &v in matrix.iter() {
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}

#[test]
fn correlations_drift_but_stay_anchored() {
    let config = SyntheticConfig {
        n_assets: 6,
        total_steps: 50,
        process_volatility: 0.1,
        ..SyntheticConfig::default()
    };
    let series = generate(&config).unwrap();
    let first = &series.true_correlations[0];
    let last = &series.true_correlations[49];
    assert_ne!(first, last);

    // Mean reversion keeps off-diagonal drift bounded over 50 steps.
    let mut max_step = 0.0_f64;
    for pair in series.true_correlations.windows(2) {
        for (a, b) in pair[0].iter().zip(pair[1].iter()) {
            max_step = max_step.max((a - b).abs());
        }
    }
    assert!(max_step < 1.0, "single-step jump too large: {}", max_step);
}

#[test]
fn sectors_fall_in_the_configured_range() {
    let config = SyntheticConfig {
        n_assets: 30,
        total_steps: 5,
        n_sectors: Some(4),
        ..SyntheticConfig::default()
    };
    let series = generate(&config).unwrap();
    assert!(series.sectors.iter().all(|&s| s < 4));
}

#[test]
fn degenerate_configs_are_rejected() {
    assert!(matches!(
        generate(&SyntheticConfig {
            n_assets: 1,
            ..SyntheticConfig::default()
        }),
        Err(CorrnetError::InvalidInput(_))
    ));
    assert!(matches!(
        generate(&SyntheticConfig {
            total_steps: 0,
            ..SyntheticConfig::default()
        }),
        Err(CorrnetError::InvalidInput(_))
    ));
}

#[test]
fn generated_panel_feeds_the_estimator() {
    let config = SyntheticConfig {
        n_assets: 5,
        total_steps: 60,
        ..SyntheticConfig::default()
    };
    let series = generate(&config).unwrap();
    let estimates = estimate_correlations(&series.returns, 20).unwrap();
    assert_eq!(estimates.len(), 40);
    for est in &estimates {
        validate_correlation(&est.matrix).expect("estimated matrix is malformed");
    }
}
