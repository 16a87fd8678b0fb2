//! Static SVG snapshot renderer.
//!
//! An orthographic, painter-sorted projection of the constellation: faint
//! baseline edges, glowing points, and any live pulses drawn bright in
//! their category's pulse color with endpoints swelled by the envelope.
//! This is a consumer of the core data structures, not part of them; an
//! interactive scene would consume the same inputs.

use crate::graph::pulse::{node_scale, PulseFrame};
use crate::graph::ProximityGraph;
use crate::holders::Category;
use crate::layout::{palette, PlacedPoint};
use std::collections::HashMap;

pub struct SvgRenderer {
    pub width: u32,
    pub height: u32,
}

const BG: &str = "#02020a";
const PADDING: f64 = 48.0;
/// World-to-screen boost applied to point sizes, which live on a much
/// smaller scale than the layout radii.
const SIZE_BOOST: f64 = 6.0;

struct Projection {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    /// Fit the XY extents of the cloud into the viewport.
    fn fit(points: &[PlacedPoint], width: f64, height: f64) -> Self {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.position.x);
            max_x = max_x.max(p.position.x);
            min_y = min_y.min(p.position.y);
            max_y = max_y.max(p.position.y);
        }
        if points.is_empty() {
            return Self {
                scale: 1.0,
                offset_x: width / 2.0,
                offset_y: height / 2.0,
            };
        }

        let extent_x = (max_x - min_x).max(1e-6);
        let extent_y = (max_y - min_y).max(1e-6);
        let scale = ((width - PADDING * 2.0) / extent_x).min((height - PADDING * 2.0) / extent_y);
        Self {
            scale,
            offset_x: width / 2.0 - (min_x + max_x) / 2.0 * scale,
            offset_y: height / 2.0 - (min_y + max_y) / 2.0 * scale,
        }
    }

    fn apply(&self, p: &PlacedPoint) -> (f64, f64) {
        (
            p.position.x * self.scale + self.offset_x,
            p.position.y * self.scale + self.offset_y,
        )
    }
}

impl SvgRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render one frame. `pulses` is the output of the graph's `advance`
    /// for the same instant; pass an empty slice for a still snapshot.
    pub fn render(
        &self,
        points: &[PlacedPoint],
        graph: &ProximityGraph,
        pulses: &[PulseFrame],
    ) -> String {
        let proj = Projection::fit(points, self.width as f64, self.height as f64);
        let pulse_by_edge: HashMap<usize, f64> =
            pulses.iter().map(|f| (f.edge, f.intensity)).collect();
        let scales = endpoint_scales(points.len(), graph, &pulse_by_edge);

        let max_depth = points
            .iter()
            .map(|p| p.position.z.abs())
            .fold(0.0f64, f64::max)
            .max(1e-6);

        let mut body = String::new();

        // Baseline edges first, pulses on top of them, points above all.
        for (index, edge) in graph.edges().iter().enumerate() {
            if pulse_by_edge.contains_key(&index) {
                continue;
            }
            let (x1, y1) = proj.apply(&points[edge.a as usize]);
            let (x2, y2) = proj.apply(&points[edge.b as usize]);
            body.push_str(&format!(
                r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{}" stroke-width="0.6" opacity="0.08"/>"#,
                category_color(edge.category),
            ));
            body.push('\n');
        }

        for frame in pulses {
            let edge = &graph.edges()[frame.edge];
            let (x1, y1) = proj.apply(&points[edge.a as usize]);
            let (x2, y2) = proj.apply(&points[edge.b as usize]);
            body.push_str(&format!(
                r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{}" stroke-width="1.6" opacity="{:.2}" stroke-linecap="round"/>"#,
                palette::pulse_color(edge.category),
                frame.intensity,
            ));
            body.push('\n');
        }

        // Painter order: far points first.
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.sort_by(|&a, &b| {
            points[a]
                .position
                .z
                .partial_cmp(&points[b].position.z)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for index in order {
            let point = &points[index];
            let (x, y) = proj.apply(point);
            let radius =
                (point.size * SIZE_BOOST * proj.scale * scales[index]).max(1.0);
            // Depth cue: points deep along z fade out.
            let depth = point.position.z.abs() / max_depth;
            let opacity = (1.0 / (1.0 + depth.powi(3))).max(0.35);

            body.push_str(&format!(
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="{:.1}" fill="url(#glow_{})" opacity="{:.2}"/>"#,
                radius * 2.5,
                point.category,
                opacity * 0.6,
            ));
            body.push('\n');
            body.push_str(&format!(
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="{radius:.1}" fill="{}" opacity="{opacity:.2}"/>"#,
                point.color,
            ));
            body.push('\n');
        }

        self.wrap_svg(&body)
    }

    fn wrap_svg(&self, content: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">
  <defs>
{defs}  </defs>
  <rect width="100%" height="100%" fill="{BG}"/>
  {content}
</svg>"#,
            w = self.width,
            h = self.height,
            defs = glow_defs(),
        )
    }
}

fn category_color(category: Category) -> String {
    palette::hsl_to_hex(
        palette::category_hue(category),
        palette::category_saturation(category),
        0.55,
    )
}

/// One radial glow gradient per category.
fn glow_defs() -> String {
    let mut defs = String::new();
    for category in [Category::Primary, Category::Secondary, Category::Shared] {
        let color = palette::pulse_color(category);
        defs.push_str(&format!(
            r#"    <radialGradient id="glow_{category}">
      <stop offset="0%" stop-color="{color}" stop-opacity="0.5"/>
      <stop offset="60%" stop-color="{color}" stop-opacity="0.15"/>
      <stop offset="100%" stop-color="{color}" stop-opacity="0"/>
    </radialGradient>
"#,
        ));
    }
    defs
}

/// Per-point scale factors from live pulses: both endpoints of a pulsing
/// edge swell with its intensity.
fn endpoint_scales(
    point_count: usize,
    graph: &ProximityGraph,
    pulse_by_edge: &HashMap<usize, f64>,
) -> Vec<f64> {
    let mut scales: Vec<f64> = vec![1.0; point_count];
    for (&index, &intensity) in pulse_by_edge {
        let edge = &graph.edges()[index];
        let scale = node_scale(intensity);
        scales[edge.a as usize] = scales[edge.a as usize].max(scale);
        scales[edge.b as usize] = scales[edge.b as usize].max(scale);
    }
    scales
}
