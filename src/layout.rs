// src/layout.rs

//! Force-directed layout with a deterministic seed, and the temporally
//! smoothed per-frame sequence that keeps node motion continuous across an
//! animation instead of re-randomising every frame.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{CorrnetError, Result};
use crate::filter::FilteredGraph;

/// Node positions for one frame, indexed by node id, in roughly `[-1, 1]^2`.
pub type LayoutFrame = Vec<[f64; 2]>;

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Blend weight of the previous frame: 0 = fully responsive,
    /// 1 = positions frozen after frame 0.
    pub smoothing_factor: f64,
    /// Scales the target inter-node spacing `k = spacing_factor / sqrt(n)`.
    pub spacing_factor: f64,
    /// Relaxation budget for the cold start on frame 0.
    pub cold_iterations: usize,
    /// Relaxation budget for every subsequent frame, seeded from the
    /// previous positions.
    pub warm_iterations: usize,
    pub seed: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            smoothing_factor: 0.3,
            spacing_factor: 2.0,
            cold_iterations: 50,
            warm_iterations: 10,
            seed: 42,
        }
    }
}

fn validate_options(opts: &LayoutOptions) -> Result<()> {
    if !(0.0..=1.0).contains(&opts.smoothing_factor) {
        return Err(CorrnetError::InvalidInput(format!(
            "smoothing factor must be in [0, 1], got {}",
            opts.smoothing_factor
        )));
    }
    if opts.spacing_factor <= 0.0 || !opts.spacing_factor.is_finite() {
        return Err(CorrnetError::InvalidInput(format!(
            "spacing factor must be positive, got {}",
            opts.spacing_factor
        )));
    }
    Ok(())
}

fn random_positions(n: usize, rng: &mut ChaCha8Rng) -> LayoutFrame {
    (0..n)
        .map(|_| [rng.gen::<f64>() * 2.0 - 1.0, rng.gen::<f64>() * 2.0 - 1.0])
        .collect()
}

/// Fruchterman-Reingold relaxation in place. Pure given its inputs: no
/// randomness, so a warm start from the previous frame stays reproducible.
///
/// `k` is the target inter-node spacing. The temperature starts at a tenth of
/// the unit domain and cools linearly, the usual schedule for this layout.
fn relax(graph: &FilteredGraph, positions: &mut LayoutFrame, k: f64, iterations: usize) {
    let n = positions.len();
    if n < 2 || iterations == 0 {
        return;
    }
    let min_dist = 0.01 * k;
    let mut temperature = 0.1 * 2.0;
    let cooling = temperature / (iterations as f64 + 1.0);

    for _ in 0..iterations {
        let mut disp = vec![[0.0_f64; 2]; n];

        // Repulsion between all pairs.
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = positions[i][0] - positions[j][0];
                let dy = positions[i][1] - positions[j][1];
                let dist = (dx * dx + dy * dy).sqrt().max(min_dist);
                let force = k * k / (dist * dist);
                let ux = dx / dist;
                let uy = dy / dist;
                disp[i][0] += ux * force;
                disp[i][1] += uy * force;
                disp[j][0] -= ux * force;
                disp[j][1] -= uy * force;
            }
        }

        // Attraction along edges.
        for &(i, j, _) in graph.edges() {
            let dx = positions[i][0] - positions[j][0];
            let dy = positions[i][1] - positions[j][1];
            let dist = (dx * dx + dy * dy).sqrt().max(min_dist);
            let force = dist * dist / k;
            let ux = dx / dist;
            let uy = dy / dist;
            disp[i][0] -= ux * force;
            disp[i][1] -= uy * force;
            disp[j][0] += ux * force;
            disp[j][1] += uy * force;
        }

        // Displace, capped by the current temperature.
        for i in 0..n {
            let dx = disp[i][0];
            let dy = disp[i][1];
            let len = (dx * dx + dy * dy).sqrt();
            if len > 0.0 {
                let capped = len.min(temperature);
                positions[i][0] += dx / len * capped;
                positions[i][1] += dy / len * capped;
            }
        }
        temperature -= cooling;
        if temperature <= 0.0 {
            break;
        }
    }
}

/// Centers the frame on the origin and scales the furthest node onto the
/// unit circle, so successive frames stay comparable before blending.
fn rescale(positions: &mut LayoutFrame) {
    let n = positions.len();
    if n == 0 {
        return;
    }
    let cx = positions.iter().map(|p| p[0]).sum::<f64>() / n as f64;
    let cy = positions.iter().map(|p| p[1]).sum::<f64>() / n as f64;
    let mut max_norm = 0.0_f64;
    for p in positions.iter_mut() {
        p[0] -= cx;
        p[1] -= cy;
        max_norm = max_norm.max((p[0] * p[0] + p[1] * p[1]).sqrt());
    }
    if max_norm > 0.0 {
        for p in positions.iter_mut() {
            p[0] /= max_norm;
            p[1] /= max_norm;
        }
    }
}

/// One cold relaxation of a single graph; this is the static-layout mode,
/// where the same frame is reused for the whole animation.
pub fn static_layout(graph: &FilteredGraph, opts: &LayoutOptions) -> Result<LayoutFrame> {
    validate_options(opts)?;
    let n = graph.node_count();
    if n == 0 {
        return Err(CorrnetError::InvalidInput("layout of an empty graph".to_string()));
    }
    let k = opts.spacing_factor / (n as f64).sqrt();
    let mut rng = ChaCha8Rng::seed_from_u64(opts.seed);
    let mut positions = random_positions(n, &mut rng);
    relax(graph, &mut positions, k, opts.cold_iterations);
    rescale(&mut positions);
    Ok(positions)
}

/// Computes one layout frame per graph.
///
/// Frame 0 is a cold relaxation. Every later frame runs a short relaxation of
/// the current graph seeded from the previous frame's positions, then blends
/// `pos = s * prev + (1 - s) * relaxed` per node. The running position state
/// is owned here and threaded through as an explicit fold; nothing else
/// mutates it mid-sequence. Output is bit-for-bit reproducible for a fixed
/// seed: randomness is only consumed for the frame-0 initialisation.
pub fn layout_sequence(graphs: &[FilteredGraph], opts: &LayoutOptions) -> Result<Vec<LayoutFrame>> {
    validate_options(opts)?;
    let Some(first) = graphs.first() else {
        return Err(CorrnetError::InvalidInput("empty graph sequence".to_string()));
    };
    let n = first.node_count();
    if graphs.iter().any(|g| g.node_count() != n) {
        return Err(CorrnetError::InvalidInput(
            "all frames must share the same node set".to_string(),
        ));
    }

    let k = opts.spacing_factor / (n as f64).sqrt();
    let s = opts.smoothing_factor;

    let mut rng = ChaCha8Rng::seed_from_u64(opts.seed);
    let mut current = random_positions(n, &mut rng);
    relax(first, &mut current, k, opts.cold_iterations);
    rescale(&mut current);

    let mut frames = Vec::with_capacity(graphs.len());
    frames.push(current.clone());

    for graph in &graphs[1..] {
        if s >= 1.0 {
            // Fully smoothed: relaxation is skipped, positions never move.
            frames.push(current.clone());
            continue;
        }
        let mut relaxed = current.clone();
        relax(graph, &mut relaxed, k, opts.warm_iterations);
        rescale(&mut relaxed);
        for i in 0..n {
            current[i][0] = s * current[i][0] + (1.0 - s) * relaxed[i][0];
            current[i][1] = s * current[i][1] + (1.0 - s) * relaxed[i][1];
        }
        frames.push(current.clone());
    }
    Ok(frames)
}
