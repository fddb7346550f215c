use clap::{Args, Parser, Subcommand};
use corrnet::{
    distance,
    error::Result,
    estimator::{self, CorrelationEstimate},
    filter::{self, FilterMethod, FilteredGraph, DEFAULT_TMFG_LOOKAHEAD},
    layout::{self, LayoutOptions},
    progress, render, synth,
    triangle::{self, Triangle},
};
use ndarray::prelude::*;
use rayon::prelude::*;
use std::path::PathBuf;

/// Corrnet: filtered correlation network animation
#[derive(Parser, Debug)]
#[command(
    name = "corrnet",
    about = "Turn rolling correlations of a returns panel into animated MST/PMFG/TMFG networks",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Animate one filter method over the rolling-correlation sequence
    Animate(AnimateArgs),
    /// Animate MST, PMFG and TMFG side by side
    Compare(CompareArgs),
    /// Render the last window as a shaded-triangle TGA still
    Still(StillArgs),
    /// Compute rolling correlation estimates without rendering
    Estimate(EstimateArgs),
}

#[derive(Args, Debug, Clone)]
struct PanelArgs {
    /// Returns panel CSV (label column + one column per asset); when absent
    /// a synthetic panel is generated
    #[arg(long, value_name = "CSV")]
    input: Option<PathBuf>,
    /// Number of synthetic assets
    #[arg(long, default_value_t = 20)]
    assets: usize,
    /// Number of synthetic observations
    #[arg(long, default_value_t = 500)]
    days: usize,
    /// Volatility of the synthetic correlation diffusion
    #[arg(long, default_value_t = 0.05)]
    process_volatility: f64,
    /// Seed for synthetic data and layout initialisation
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug, Clone)]
struct WindowArgs {
    /// Rolling window length in rows
    #[arg(long, default_value_t = 100)]
    window: usize,
    /// Keep only every k-th estimate to cap the frame count
    #[arg(long, default_value_t = 1, value_name = "K")]
    stride: usize,
}

#[derive(Args, Debug, Clone)]
struct LayoutArgs {
    /// Blend weight of the previous frame (0 = responsive, 1 = frozen)
    #[arg(long, default_value_t = 0.3)]
    smoothing: f64,
    /// Node spacing factor (larger = more spread out)
    #[arg(long, default_value_t = 2.0)]
    spacing: f64,
    /// Compute one layout from the first frame and reuse it everywhere
    #[arg(long, default_value_t = false)]
    static_layout: bool,
}

#[derive(Args, Debug)]
struct AnimateArgs {
    #[command(flatten)]
    panel: PanelArgs,
    #[command(flatten)]
    window: WindowArgs,
    #[command(flatten)]
    layout: LayoutArgs,
    /// Filter method: mst, pmfg or tmfg
    #[arg(long, default_value = "pmfg")]
    method: String,
    /// TMFG candidate lookahead per insertion step
    #[arg(long, default_value_t = DEFAULT_TMFG_LOOKAHEAD)]
    lookahead: usize,
    /// Shade triangular faces by mean correlation
    #[arg(long, default_value_t = false)]
    triangles: bool,
    /// Output GIF path
    #[arg(short, long, value_name = "GIF", default_value = "network.gif")]
    output: PathBuf,
    /// Delay between frames in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u32,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[command(flatten)]
    panel: PanelArgs,
    #[command(flatten)]
    window: WindowArgs,
    #[command(flatten)]
    layout: LayoutArgs,
    /// TMFG candidate lookahead per insertion step
    #[arg(long, default_value_t = DEFAULT_TMFG_LOOKAHEAD)]
    lookahead: usize,
    /// Output GIF path
    #[arg(short, long, value_name = "GIF", default_value = "comparison.gif")]
    output: PathBuf,
    /// Delay between frames in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u32,
}

#[derive(Args, Debug)]
struct StillArgs {
    #[command(flatten)]
    panel: PanelArgs,
    #[command(flatten)]
    window: WindowArgs,
    /// Filter method: mst, pmfg or tmfg
    #[arg(long, default_value = "pmfg")]
    method: String,
    /// TMFG candidate lookahead per insertion step
    #[arg(long, default_value_t = DEFAULT_TMFG_LOOKAHEAD)]
    lookahead: usize,
    /// Output TGA path
    #[arg(short, long, value_name = "TGA", default_value = "network.tga")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[command(flatten)]
    panel: PanelArgs,
    #[command(flatten)]
    window: WindowArgs,
    /// Write each window's correlation matrix as a .npy file under this dir
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,
    /// Write a per-window summary CSV (timestamp, mean correlation)
    #[arg(long, value_name = "CSV")]
    summary: Option<PathBuf>,
    /// Print the last window's correlation matrix as a terminal heatmap
    #[arg(long, default_value_t = false)]
    heatmap: bool,
}

/// Panel plus optional sector assignment (known only for synthetic data).
struct Panel {
    returns: Array2<f64>,
    sectors: Option<Vec<usize>>,
}

fn load_panel(args: &PanelArgs) -> Result<Panel> {
    match &args.input {
        Some(path) => {
            let panel = estimator::load_returns_csv(path)?;
            eprintln!(
                "[corrnet] Loaded {} rows x {} assets from {}",
                panel.returns.nrows(),
                panel.returns.ncols(),
                path.display()
            );
            Ok(Panel {
                returns: panel.returns,
                sectors: None,
            })
        }
        None => {
            let config = synth::SyntheticConfig {
                n_assets: args.assets,
                total_steps: args.days,
                process_volatility: args.process_volatility,
                seed: args.seed,
                ..synth::SyntheticConfig::default()
            };
            let series = synth::generate(&config)?;
            eprintln!(
                "[corrnet] Generated synthetic panel: {} steps x {} assets (seed {})",
                args.days, args.assets, args.seed
            );
            Ok(Panel {
                returns: series.returns,
                sectors: Some(series.sectors),
            })
        }
    }
}

fn estimate(panel: &Panel, window: &WindowArgs) -> Result<Vec<CorrelationEstimate>> {
    let mut estimates = estimator::estimate_correlations(&panel.returns, window.window)?;
    if window.stride > 1 {
        estimates = estimates
            .into_iter()
            .step_by(window.stride)
            .collect();
    }
    eprintln!("[corrnet] {} correlation estimates", estimates.len());
    Ok(estimates)
}

fn build_filter(d: &Array2<f64>, method: FilterMethod, lookahead: usize) -> Result<FilteredGraph> {
    match method {
        FilterMethod::Tmfg => filter::tmfg_with_lookahead(d, lookahead),
        _ => filter::filter_graph(d, method),
    }
}

/// Per-frame graphs and optional faces, computed in parallel across frames
/// (each frame depends only on its own estimate) and collected in order.
fn build_graphs(
    estimates: &[CorrelationEstimate],
    method: FilterMethod,
    lookahead: usize,
    want_triangles: bool,
) -> Result<Vec<(FilteredGraph, Option<Vec<Triangle>>)>> {
    let pb = progress::frame_progress_bar(format!("[{}]", method.label()), estimates.len() as u64);
    let result = estimates
        .par_iter()
        .map(|est| {
            let repaired = distance::clip_to_psd(&est.matrix, 1e-9)?;
            let d = distance::to_distance(&repaired);
            let graph = build_filter(&d, method, lookahead)?;
            let faces = if want_triangles {
                Some(triangle::triangles(&graph, Some(&repaired)))
            } else {
                None
            };
            pb.inc(1);
            Ok((graph, faces))
        })
        .collect::<Result<Vec<_>>>();
    pb.finish_and_clear();
    result
}

fn layout_frames(
    graphs: &[FilteredGraph],
    layout_args: &LayoutArgs,
    seed: u64,
) -> Result<Vec<layout::LayoutFrame>> {
    let opts = LayoutOptions {
        smoothing_factor: layout_args.smoothing,
        spacing_factor: layout_args.spacing,
        seed,
        ..LayoutOptions::default()
    };
    let pb = progress::spinner("[layout]", "relaxing frame sequence");
    let frames = if layout_args.static_layout {
        let Some(first) = graphs.first() else {
            return Err(corrnet::error::CorrnetError::InvalidInput(
                "no frames to lay out".to_string(),
            ));
        };
        let fixed = layout::static_layout(first, &opts)?;
        vec![fixed; graphs.len()]
    } else {
        layout::layout_sequence(graphs, &opts)?
    };
    pb.finish_and_clear();
    Ok(frames)
}

fn frame_specs<'a>(
    method: FilterMethod,
    estimates: &[CorrelationEstimate],
    graphs: &'a [(FilteredGraph, Option<Vec<Triangle>>)],
    layouts: &'a [layout::LayoutFrame],
) -> Vec<render::FrameSpec<'a>> {
    graphs
        .iter()
        .zip(layouts)
        .zip(estimates)
        .map(|(((graph, faces), positions), est)| render::FrameSpec {
            graph,
            positions,
            triangles: faces.as_deref(),
            meta: render::FrameMeta {
                label: format!("{} t={}", method.label(), est.timestamp),
                edge_count: graph.edge_count(),
                average_degree: graph.average_degree(),
            },
        })
        .collect()
}

fn run_animate(args: AnimateArgs) -> Result<()> {
    let method = FilterMethod::parse(&args.method)?;
    let panel = load_panel(&args.panel)?;
    let estimates = estimate(&panel, &args.window)?;

    let graphs = build_graphs(&estimates, method, args.lookahead, args.triangles)?;
    let graph_only: Vec<FilteredGraph> = graphs.iter().map(|(g, _)| g.clone()).collect();
    let layouts = layout_frames(&graph_only, &args.layout, args.panel.seed)?;

    let specs = frame_specs(method, &estimates, &graphs, &layouts);
    let opts = render::RenderOptions {
        frame_delay_ms: args.delay_ms,
        ..render::RenderOptions::default()
    };
    render::render_gif(&args.output, &specs, panel.sectors.as_deref(), &opts)?;
    eprintln!(
        "[corrnet] Wrote {} {} frames to {}",
        specs.len(),
        method.label(),
        args.output.display()
    );
    Ok(())
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let panel = load_panel(&args.panel)?;
    let estimates = estimate(&panel, &args.window)?;

    let methods = [FilterMethod::Mst, FilterMethod::Pmfg, FilterMethod::Tmfg];
    let mut all_graphs = Vec::new();
    let mut all_layouts = Vec::new();
    for &method in &methods {
        let graphs = build_graphs(&estimates, method, args.lookahead, false)?;
        let graph_only: Vec<FilteredGraph> = graphs.iter().map(|(g, _)| g.clone()).collect();
        let layouts = layout_frames(&graph_only, &args.layout, args.panel.seed)?;
        all_graphs.push(graphs);
        all_layouts.push(layouts);
    }

    let panels: Vec<Vec<render::FrameSpec<'_>>> = methods
        .iter()
        .zip(all_graphs.iter().zip(all_layouts.iter()))
        .map(|(&method, (graphs, layouts))| frame_specs(method, &estimates, graphs, layouts))
        .collect();

    let opts = render::RenderOptions {
        width: 450,
        height: 450,
        frame_delay_ms: args.delay_ms,
        node_radius: 5,
        ..render::RenderOptions::default()
    };
    render::render_comparison_gif(&args.output, &panels, panel.sectors.as_deref(), &opts)?;
    eprintln!(
        "[corrnet] Wrote {}-frame comparison to {}",
        estimates.len(),
        args.output.display()
    );
    Ok(())
}

fn run_still(args: StillArgs) -> Result<()> {
    let method = FilterMethod::parse(&args.method)?;
    let panel = load_panel(&args.panel)?;
    let estimates = estimate(&panel, &args.window)?;
    let Some(last) = estimates.last() else {
        return Err(corrnet::error::CorrnetError::InvalidInput(
            "no estimates produced".to_string(),
        ));
    };

    let repaired = distance::clip_to_psd(&last.matrix, 1e-9)?;
    let d = distance::to_distance(&repaired);
    let graph = build_filter(&d, method, args.lookahead)?;
    let faces = triangle::triangles(&graph, Some(&repaired));
    let positions = layout::static_layout(
        &graph,
        &LayoutOptions {
            cold_iterations: 200,
            seed: args.panel.seed,
            ..LayoutOptions::default()
        },
    )?;

    let spec = render::FrameSpec {
        graph: &graph,
        positions: &positions,
        triangles: Some(&faces),
        meta: render::FrameMeta {
            label: format!("{} t={}", method.label(), last.timestamp),
            edge_count: graph.edge_count(),
            average_degree: graph.average_degree(),
        },
    };
    render::render_still(&args.output, &spec, panel.sectors.as_deref(), &render::RenderOptions::default())?;
    eprintln!(
        "[corrnet] Wrote {} still ({} edges, {} triangles, avg degree {:.1}) to {}",
        method.label(),
        graph.edge_count(),
        faces.len(),
        graph.average_degree(),
        args.output.display()
    );
    Ok(())
}

fn run_estimate(args: EstimateArgs) -> Result<()> {
    let panel = load_panel(&args.panel)?;
    let estimates = estimate(&panel, &args.window)?;

    if let Some(dir) = &args.dump_dir {
        estimator::dump_matrices_npy(dir, &estimates)?;
        eprintln!(
            "[corrnet] Dumped {} matrices under {}",
            estimates.len(),
            dir.display()
        );
    }
    if let Some(path) = &args.summary {
        estimator::write_summary_csv(path, &estimates)?;
        eprintln!("[corrnet] Wrote summary to {}", path.display());
    }
    if args.heatmap {
        if let Some(last) = estimates.last() {
            render::print_correlation_heatmap(&last.matrix.view());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Animate(args) => run_animate(args),
        Command::Compare(args) => run_compare(args),
        Command::Still(args) => run_still(args),
        Command::Estimate(args) => run_estimate(args),
    };
    if let Err(err) = outcome {
        eprintln!("[corrnet error] {}", err);
        std::process::exit(1);
    }
}
