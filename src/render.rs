// src/render.rs

//! Rasterisation of layout frames into stills and animations. The core stays
//! agnostic to pixels; this module is the rendering collaborator that
//! consumes completed (graph, layout, faces) snapshots in frame order.
//!
//! Output formats: animated GIF (via the image crate's encoder) and a single
//! uncompressed 24-bit TGA for stills. A termcolor heatmap covers quick
//! terminal previews of a correlation matrix.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageBuffer, Rgba, RgbaImage};
use ndarray::prelude::*;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::error::Result;
use crate::filter::FilteredGraph;
use crate::layout::LayoutFrame;
use crate::triangle::Triangle;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Per-frame delay in milliseconds.
    pub frame_delay_ms: u32,
    pub node_radius: i32,
    /// Opacity of shaded triangle faces, 0..1.
    pub triangle_alpha: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            width: 900,
            height: 700,
            frame_delay_ms: 100,
            node_radius: 7,
            triangle_alpha: 0.35,
        }
    }
}

/// Frame metadata handed along with each rendered frame; recorded for
/// logging, not rasterised (there is no text renderer here).
#[derive(Debug, Clone)]
pub struct FrameMeta {
    pub label: String,
    pub edge_count: usize,
    pub average_degree: f64,
}

/// Everything the renderer needs for one frame of one panel.
pub struct FrameSpec<'a> {
    pub graph: &'a FilteredGraph,
    pub positions: &'a LayoutFrame,
    pub triangles: Option<&'a [Triangle]>,
    pub meta: FrameMeta,
}

const BACKGROUND: (u8, u8, u8) = (12, 12, 16);
const EDGE_COLOR: (u8, u8, u8) = (110, 110, 110);

/// A plain RGB raster; all drawing happens here before the buffer is handed
/// to the GIF encoder or the TGA writer.
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    buf: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buf = vec![0u8; (width as usize) * (height as usize) * 3];
        for px in buf.chunks_exact_mut(3) {
            px[0] = BACKGROUND.0;
            px[1] = BACKGROUND.1;
            px[2] = BACKGROUND.2;
        }
        Canvas { width, height, buf }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: (u8, u8, u8)) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.buf[idx] = color.0;
        self.buf[idx + 1] = color.1;
        self.buf[idx + 2] = color.2;
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: (u8, u8, u8), alpha: f64) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let mix = |old: u8, new: u8| -> u8 {
            ((1.0 - alpha) * old as f64 + alpha * new as f64).round() as u8
        };
        self.buf[idx] = mix(self.buf[idx], color.0);
        self.buf[idx + 1] = mix(self.buf[idx + 1], color.1);
        self.buf[idx + 2] = mix(self.buf[idx + 2], color.2);
    }

    /// Bresenham line with optional thickness (drawn as parallel offsets).
    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: (u8, u8, u8), thickness: i32) {
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -((y1 - y0).abs());
        let sy = if y0 < y1 { 1 } else { -1 };
        let steep = dy.abs() > dx;
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            for t in 0..thickness.max(1) {
                let off = t - thickness / 2;
                if steep {
                    self.set_pixel(x + off, y, color);
                } else {
                    self.set_pixel(x, y + off, color);
                }
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn filled_circle(&mut self, cx: i32, cy: i32, radius: i32, color: (u8, u8, u8)) {
        let rr = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= rr {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Scanline fill of a triangle, alpha-blended over the existing raster.
    fn filled_triangle(&mut self, pts: [(i32, i32); 3], color: (u8, u8, u8), alpha: f64) {
        let min_y = pts.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let max_y = pts
            .iter()
            .map(|p| p.1)
            .max()
            .unwrap_or(0)
            .min(self.height as i32 - 1);
        for y in min_y..=max_y {
            let mut xs: Vec<f64> = Vec::with_capacity(3);
            for k in 0..3 {
                let (x0, y0) = pts[k];
                let (x1, y1) = pts[(k + 1) % 3];
                if y0 == y1 {
                    continue;
                }
                let (ya, yb) = (y0.min(y1), y0.max(y1));
                if y < ya || y > yb {
                    continue;
                }
                let t = (y - y0) as f64 / (y1 - y0) as f64;
                xs.push(x0 as f64 + t * (x1 - x0) as f64);
            }
            if xs.len() < 2 {
                continue;
            }
            xs.sort_by(|a, b| a.total_cmp(b));
            let start = xs[0].floor() as i32;
            let end = xs[xs.len() - 1].ceil() as i32;
            for x in start..=end {
                self.blend_pixel(x, y, color, alpha);
            }
        }
    }

    pub fn into_rgba(self) -> RgbaImage {
        let mut img: RgbaImage = ImageBuffer::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = (y as usize * self.width as usize + x as usize) * 3;
                img.put_pixel(
                    x,
                    y,
                    Rgba([self.buf[idx], self.buf[idx + 1], self.buf[idx + 2], 255]),
                );
            }
        }
        img
    }

    /// Writes the raster as an uncompressed 24-bit TGA (pixels in BGR order).
    pub fn write_tga<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut header = [0u8; 18];
        header[2] = 2; // uncompressed truecolor
        header[12] = (self.width & 0xFF) as u8;
        header[13] = ((self.width >> 8) & 0xFF) as u8;
        header[14] = (self.height & 0xFF) as u8;
        header[15] = ((self.height >> 8) & 0xFF) as u8;
        header[16] = 24; // bits per pixel
        header[17] = 0x20; // top-left origin

        let f = File::create(path)?;
        let mut w = BufWriter::new(f);
        w.write_all(&header)?;
        for px in self.buf.chunks_exact(3) {
            w.write_all(&[px[2], px[1], px[0]])?;
        }
        w.flush()
    }
}

/// HSL to RGB, h in degrees, s and l in 0..1.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hh = h / 60.0;
    let x = c * (1.0 - (hh % 2.0 - 1.0).abs());
    let (mut r, mut g, mut b) = match hh as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    r += m;
    g += m;
    b += m;
    ((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// Node colour: hue from the sector when sectors are known, otherwise from
/// the node index itself. Bright and saturated against the dark background.
fn node_color(index: usize, sectors: Option<&[usize]>) -> (u8, u8, u8) {
    let key = match sectors {
        Some(s) if index < s.len() => s[index] * 67 + 13,
        _ => index * 47 + 29,
    };
    hsl_to_rgb((key % 360) as f64, 0.9, 0.55)
}

/// Face colour on a blue-to-red scale: blue for anti-correlated faces, red
/// for strongly correlated ones.
fn score_color(score: f64) -> (u8, u8, u8) {
    let t = ((score + 1.0) / 2.0).clamp(0.0, 1.0);
    let r = (40.0 + 200.0 * t) as u8;
    let g = (70.0 + 60.0 * (1.0 - (2.0 * t - 1.0).abs())) as u8;
    let b = (40.0 + 200.0 * (1.0 - t)) as u8;
    (r, g, b)
}

/// Draws one frame into a sub-rectangle of the canvas: shaded faces first,
/// then edges with width proportional to affinity, then node discs with a
/// glow ring.
pub fn draw_frame(
    canvas: &mut Canvas,
    rect: (i32, i32, i32, i32),
    spec: &FrameSpec<'_>,
    sectors: Option<&[usize]>,
    opts: &RenderOptions,
) {
    let (rx, ry, rw, rh) = rect;
    let margin = 0.08;
    let to_pixel = |p: [f64; 2]| -> (i32, i32) {
        let nx = (p[0] + 1.0) / 2.0;
        let ny = (p[1] + 1.0) / 2.0;
        let x = rx as f64 + (margin + nx * (1.0 - 2.0 * margin)) * rw as f64;
        let y = ry as f64 + (margin + ny * (1.0 - 2.0 * margin)) * rh as f64;
        (x.round() as i32, y.round() as i32)
    };

    if let Some(faces) = spec.triangles {
        for face in faces {
            let pts = [
                to_pixel(spec.positions[face.nodes[0]]),
                to_pixel(spec.positions[face.nodes[1]]),
                to_pixel(spec.positions[face.nodes[2]]),
            ];
            canvas.filled_triangle(pts, score_color(face.score), opts.triangle_alpha);
        }
    }

    let max_affinity = spec
        .graph
        .edges()
        .iter()
        .map(|&(_, _, w)| 1.0 / (1.0 + w))
        .fold(f64::MIN, f64::max)
        .max(1e-12);
    for &(u, v, w) in spec.graph.edges() {
        let (x0, y0) = to_pixel(spec.positions[u]);
        let (x1, y1) = to_pixel(spec.positions[v]);
        let affinity = (1.0 / (1.0 + w)) / max_affinity;
        let thickness = (3.0 * affinity).round().max(1.0) as i32;
        canvas.line(x0, y0, x1, y1, EDGE_COLOR, thickness);
    }

    for (i, &pos) in spec.positions.iter().enumerate() {
        let (cx, cy) = to_pixel(pos);
        let (r, g, b) = node_color(i, sectors);
        let glow = (
            (r as f64 * 0.5) as u8 + 50,
            (g as f64 * 0.5) as u8 + 50,
            (b as f64 * 0.5) as u8 + 50,
        );
        canvas.filled_circle(cx, cy, opts.node_radius + 3, glow);
        canvas.filled_circle(cx, cy, opts.node_radius, (r, g, b));
    }
}

fn encode_gif<P: AsRef<Path>>(path: P, frames: Vec<Frame>) -> Result<()> {
    let mut gif_data = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut gif_data);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            encoder.encode_frame(frame)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(&gif_data)?;
    Ok(())
}

/// Renders a sequence of frames into an animated GIF at `path`.
pub fn render_gif<P: AsRef<Path>>(
    path: P,
    frames: &[FrameSpec<'_>],
    sectors: Option<&[usize]>,
    opts: &RenderOptions,
) -> Result<()> {
    let mut encoded = Vec::with_capacity(frames.len());
    for spec in frames {
        let mut canvas = Canvas::new(opts.width, opts.height);
        draw_frame(
            &mut canvas,
            (0, 0, opts.width as i32, opts.height as i32),
            spec,
            sectors,
            opts,
        );
        encoded.push(Frame::from_parts(
            canvas.into_rgba(),
            0,
            0,
            Delay::from_numer_denom_ms(opts.frame_delay_ms, 1),
        ));
    }
    encode_gif(path, encoded)
}

/// Renders several methods side by side, one panel per method, into one wide
/// GIF. All panels must have the same frame count.
pub fn render_comparison_gif<P: AsRef<Path>>(
    path: P,
    panels: &[Vec<FrameSpec<'_>>],
    sectors: Option<&[usize]>,
    opts: &RenderOptions,
) -> Result<()> {
    let frame_count = panels.first().map(|p| p.len()).unwrap_or(0);
    let total_width = opts.width * panels.len() as u32;
    let mut encoded = Vec::with_capacity(frame_count);
    for frame_idx in 0..frame_count {
        let mut canvas = Canvas::new(total_width, opts.height);
        for (panel_idx, panel) in panels.iter().enumerate() {
            draw_frame(
                &mut canvas,
                (
                    (panel_idx as u32 * opts.width) as i32,
                    0,
                    opts.width as i32,
                    opts.height as i32,
                ),
                &panel[frame_idx],
                sectors,
                opts,
            );
        }
        encoded.push(Frame::from_parts(
            canvas.into_rgba(),
            0,
            0,
            Delay::from_numer_denom_ms(opts.frame_delay_ms, 1),
        ));
    }
    encode_gif(path, encoded)
}

/// Renders a single frame to an uncompressed TGA still.
pub fn render_still<P: AsRef<Path>>(
    path: P,
    spec: &FrameSpec<'_>,
    sectors: Option<&[usize]>,
    opts: &RenderOptions,
) -> Result<()> {
    let mut canvas = Canvas::new(opts.width, opts.height);
    draw_frame(
        &mut canvas,
        (0, 0, opts.width as i32, opts.height as i32),
        spec,
        sectors,
        opts,
    );
    canvas.write_tga(path)?;
    Ok(())
}

/// Prints a correlation matrix as a terminal heatmap: red for positive,
/// blue for negative, black for zero.
pub fn print_correlation_heatmap(matrix: &ArrayView2<f64>) {
    let stdout = StandardStream::stdout(ColorChoice::Always);
    let mut stdout = stdout.lock();
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            let value = matrix[[i, j]].clamp(-1.0, 1.0);
            let t = (value + 1.0) / 2.0;
            let color = if value == 0.0 {
                Color::Black
            } else {
                Color::Rgb((t * 255.0) as u8, 0, ((1.0 - t) * 255.0) as u8)
            };
            let mut spec = ColorSpec::new();
            spec.set_fg(Some(color));
            let _ = stdout.set_color(&spec);
            let _ = write!(stdout, "██");
        }
        let _ = stdout.reset();
        let _ = writeln!(stdout);
    }
}
