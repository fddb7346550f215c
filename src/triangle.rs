// src/triangle.rs

//! 3-clique enumeration with a per-face correlation score, used only for
//! rendering shaded faces.

use ndarray::prelude::*;

use crate::distance;
use crate::filter::FilteredGraph;

/// A triangular face: three mutually adjacent nodes in ascending order, plus
/// the mean pairwise correlation of its vertices. The score is advisory; it
/// stays in `[-1, 1]` under nominal input.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub nodes: [usize; 3],
    pub score: f64,
}

/// Enumerates every 3-clique of `graph`, in ascending `(a, b, c)` order.
///
/// When the originating correlation matrix is supplied the score is the mean
/// of the three pairwise correlations; otherwise it is recovered from the
/// edge weights through the inverse distance transform `c = 1 - d^2 / 2`.
pub fn triangles(graph: &FilteredGraph, correlation: Option<&Array2<f64>>) -> Vec<Triangle> {
    let n = graph.node_count();
    let mut found = Vec::new();
    for a in 0..n {
        let mut higher: Vec<usize> = graph
            .neighbors(a)
            .iter()
            .map(|&(w, _)| w)
            .filter(|&w| w > a)
            .collect();
        higher.sort_unstable();
        for (bi, &b) in higher.iter().enumerate() {
            for &c in &higher[bi + 1..] {
                if !graph.has_edge(b, c) {
                    continue;
                }
                let score = match correlation {
                    Some(m) => (m[[a, b]] + m[[a, c]] + m[[b, c]]) / 3.0,
                    None => {
                        let pairs = [(a, b), (a, c), (b, c)];
                        let sum: f64 = pairs
                            .iter()
                            .map(|&(u, v)| {
                                distance::to_correlation(graph.weight(u, v).unwrap_or(0.0))
                            })
                            .sum();
                        sum / 3.0
                    }
                };
                found.push(Triangle {
                    nodes: [a, b, c],
                    score: score.clamp(-1.0, 1.0),
                });
            }
        }
    }
    found
}
