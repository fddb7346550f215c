use std::fs;

use corrnet::filter::FilteredGraph;
use corrnet::render::{
    render_comparison_gif, render_gif, render_still, Canvas, FrameMeta, FrameSpec, RenderOptions,
};
use corrnet::triangle::triangles;
use tempfile::TempDir;

fn small_options() -> RenderOptions {
    RenderOptions {
        width: 64,
        height: 48,
        ..RenderOptions::default()
    }
}

fn triangle_graph() -> FilteredGraph {
    let mut g = FilteredGraph::with_nodes(4);
    g.add_edge(0, 1, 0.5);
    g.add_edge(1, 2, 0.8);
    g.add_edge(0, 2, 0.6);
    g.add_edge(2, 3, 1.1);
    g
}

fn positions() -> Vec<[f64; 2]> {
    vec![[-0.8, -0.6], [0.7, -0.5], [0.0, 0.8], [0.9, 0.9]]
}

fn meta(label: &str, graph: &FilteredGraph) -> FrameMeta {
    FrameMeta {
        label: label.to_string(),
        edge_count: graph.edge_count(),
        average_degree: graph.average_degree(),
    }
}

#[test]
fn tga_still_has_the_expected_size_and_header() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("still.tga");
    let canvas = Canvas::new(64, 48);
    canvas.write_tga(&path).expect("tga write failed");

    let bytes = fs::read(&path).expect("read tga");
    assert_eq!(bytes.len(), 18 + 64 * 48 * 3);
    assert_eq!(bytes[2], 2); // uncompressed truecolor
    assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 64);
    assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 48);
    assert_eq!(bytes[16], 24);
}

#[test]
fn still_render_draws_over_the_background() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("frame.tga");
    let graph = triangle_graph();
    let pos = positions();
    let faces = triangles(&graph, None);
    assert_eq!(faces.len(), 1);

    let spec = FrameSpec {
        graph: &graph,
        positions: &pos,
        triangles: Some(&faces),
        meta: meta("still", &graph),
    };
    render_still(&path, &spec, Some(&[0, 0, 1, 1]), &small_options())
        .expect("still render failed");

    let bytes = fs::read(&path).expect("read tga");
    // Background is (12, 12, 16); nodes and edges must have changed pixels.
    let touched = bytes[18..]
        .chunks_exact(3)
        .filter(|px| *px != [16, 12, 12])
        .count();
    assert!(touched > 0, "nothing was drawn");
}

#[test]
fn gif_animation_is_written_and_non_trivial() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("anim.gif");
    let graph = triangle_graph();
    let pos_a = positions();
    let pos_b: Vec<[f64; 2]> = positions().iter().map(|p| [p[0] * 0.5, p[1] * 0.5]).collect();

    let frames = vec![
        FrameSpec {
            graph: &graph,
            positions: &pos_a,
            triangles: None,
            meta: meta("t=0", &graph),
        },
        FrameSpec {
            graph: &graph,
            positions: &pos_b,
            triangles: None,
            meta: meta("t=1", &graph),
        },
    ];
    render_gif(&path, &frames, None, &small_options()).expect("gif render failed");

    let bytes = fs::read(&path).expect("read gif");
    assert!(bytes.len() > 6);
    assert_eq!(&bytes[..6], b"GIF89a");
}

#[test]
fn comparison_gif_spans_all_panels() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("compare.gif");
    let graph = triangle_graph();
    let pos = positions();

    let panel = || {
        vec![FrameSpec {
            graph: &graph,
            positions: &pos,
            triangles: None,
            meta: meta("panel", &graph),
        }]
    };
    let panels = vec![panel(), panel(), panel()];
    let opts = small_options();
    render_comparison_gif(&path, &panels, None, &opts).expect("comparison render failed");

    let bytes = fs::read(&path).expect("read gif");
    assert_eq!(&bytes[..6], b"GIF89a");
    // Logical screen width is three panels wide.
    assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]) as u32, opts.width * 3);
}

#[test]
fn face_scores_follow_the_supplied_correlation() {
    let graph = triangle_graph();
    let corr = ndarray::array![
        [1.0, 0.9, 0.6, 0.0],
        [0.9, 1.0, 0.3, 0.0],
        [0.6, 0.3, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0]
    ];
    let faces = triangles(&graph, Some(&corr));
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].nodes, [0, 1, 2]);
    assert!((faces[0].score - 0.6).abs() < 1e-12);
}
