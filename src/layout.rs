//! Layout generator - golden-angle spherical spiral with concentric shells.
//!
//! Maps an ordered record list to points in 3D space. Placement is
//! deterministic in its shell, expected radius, and spiral angle, with
//! intentional uniform jitter layered on top so repeated generation never
//! produces a static-looking cloud. The random source is injected, so tests
//! can pin it.

use crate::error::{Error, Result};
use crate::holders::{Category, Record};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Color palette for holder categories.
///
/// Base hues follow the original holder groups: violet for the primary
/// token, amber for the secondary, desaturated ice-white for shared
/// wallets. Brightness rises with magnitude and saturates below pure white
/// so large holders glow without blowing out.
pub(crate) mod palette {
    use crate::holders::Category;

    pub const HUE_PRIMARY: f64 = 271.0;
    pub const HUE_SECONDARY: f64 = 39.0;
    pub const HUE_SHARED: f64 = 210.0;

    /// Magnitude at which a point reaches full brightness.
    pub const MAGNITUDE_FULL_BRIGHTNESS: f64 = 10_000_000.0;

    /// Convert HSL to hex color string.
    pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
        let h = ((h % 360.0) + 360.0) % 360.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = if h < 60.0 {
            (c, x, 0.0)
        } else if h < 120.0 {
            (x, c, 0.0)
        } else if h < 180.0 {
            (0.0, c, x)
        } else if h < 240.0 {
            (0.0, x, c)
        } else if h < 300.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        let r = ((r + m) * 255.0) as u8;
        let g = ((g + m) * 255.0) as u8;
        let b = ((b + m) * 255.0) as u8;

        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    pub fn category_hue(category: Category) -> f64 {
        match category {
            Category::Primary => HUE_PRIMARY,
            Category::Secondary => HUE_SECONDARY,
            Category::Shared => HUE_SHARED,
        }
    }

    pub fn category_saturation(category: Category) -> f64 {
        match category {
            Category::Primary | Category::Secondary => 0.75,
            Category::Shared => 0.15,
        }
    }

    /// Brighter variant used while an edge pulse is live.
    pub fn pulse_color(category: Category) -> String {
        hsl_to_hex(category_hue(category), category_saturation(category), 0.72)
    }
}

/// 3D point or offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A record placed in space. Created once during layout generation and
/// never mutated afterward; regenerating redraws the jitter.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedPoint {
    pub position: Vec3,
    pub category: Category,
    pub magnitude: f64,
    /// Render size derived from magnitude.
    pub size: f64,
    /// Derived hex color; purely presentational.
    pub color: String,
}

/// Tunable constants for the spiral layout. All knobs the duplicated
/// source variants disagreed on live here as configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Number of concentric shells the normalized index range is split into.
    pub shell_count: u32,
    /// Radius of the innermost shell.
    pub radius_base: f64,
    /// Radius gap between consecutive shells.
    pub radius_step: f64,
    /// Radius jitter as a fraction of `radius_step` (±).
    pub radius_jitter_fraction: f64,
    /// Width of the per-axis uniform jitter band.
    pub position_jitter: f64,
    /// Uniform scale on all axes; 1.0 is the plain sphere.
    pub expansion_factor: f64,
    /// Z compression; values below 1.0 flatten the sphere into a disc.
    pub flattening_factor: f64,
    /// Base render size before magnitude scaling.
    pub base_size: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            shell_count: 5,
            radius_base: 100.0,
            radius_step: 50.0,
            radius_jitter_fraction: 0.2,
            position_jitter: 30.0,
            expansion_factor: 1.0,
            flattening_factor: 1.0,
            base_size: 1.5,
        }
    }
}

impl LayoutParams {
    /// Flat-disc preset: the spiral-disc variant of the same algorithm.
    pub fn disc() -> Self {
        Self {
            expansion_factor: 1.6,
            flattening_factor: 0.12,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.shell_count == 0 {
            return Err(Error::Domain("shell_count must be at least 1".into()));
        }
        if self.radius_base < 0.0 || self.radius_step <= 0.0 {
            return Err(Error::Domain(format!(
                "radii must be positive (base {}, step {})",
                self.radius_base, self.radius_step
            )));
        }
        if self.radius_jitter_fraction < 0.0 || self.position_jitter < 0.0 {
            return Err(Error::Domain("jitter amounts must be non-negative".into()));
        }
        if self.expansion_factor <= 0.0
            || self.flattening_factor <= 0.0
            || self.flattening_factor > 1.0
        {
            return Err(Error::Domain(format!(
                "expansion must be positive and flattening in (0, 1], got {} / {}",
                self.expansion_factor, self.flattening_factor
            )));
        }
        if self.base_size <= 0.0 {
            return Err(Error::Domain("base_size must be positive".into()));
        }
        Ok(())
    }
}

/// Golden angle in radians, `π(3 − √5)` ≈ 137.508°. Irrational relative to
/// π, so no two indices land on the same ray.
pub fn golden_angle() -> f64 {
    PI * (3.0 - 5.0_f64.sqrt())
}

/// Places records on the golden-angle spiral.
pub struct LayoutGenerator {
    params: LayoutParams,
}

impl LayoutGenerator {
    pub fn new(params: LayoutParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Shell this index falls in. Indices at or past `total` land in or
    /// beyond the outermost shell; callers wanting overlap may pass them.
    pub fn shell_index(&self, index: usize, total: usize) -> Result<u32> {
        if total == 0 {
            return Err(Error::Domain("total record count must be at least 1".into()));
        }
        let normalized = index as f64 / total as f64;
        Ok((normalized * self.params.shell_count as f64).floor() as u32)
    }

    /// Jitter-free radius for an index: base plus one step per shell.
    pub fn expected_radius(&self, index: usize, total: usize) -> Result<f64> {
        let shell = self.shell_index(index, total)?;
        Ok(self.params.radius_base + shell as f64 * self.params.radius_step)
    }

    /// Spiral angle for an index.
    pub fn theta(&self, index: usize) -> f64 {
        index as f64 * golden_angle()
    }

    /// Place a single record.
    ///
    /// The polar angle ramps over the shell population via an arccos
    /// transform, covering each shell's sphere surface uniformly rather
    /// than crowding the equator. The modulo-by-shell-population term is
    /// load-bearing: it restarts the ramp in every shell.
    pub fn place(&self, index: usize, total: usize, rng: &mut impl Rng) -> Result<Vec3> {
        let shell = self.shell_index(index, total)?;

        let radius_jitter =
            rng.gen_range(-1.0..1.0) * self.params.radius_jitter_fraction * self.params.radius_step;
        let radius = self.params.radius_base + shell as f64 * self.params.radius_step + radius_jitter;

        let theta = self.theta(index);

        let per_shell = total as f64 / self.params.shell_count as f64;
        let ramp = (index as f64 % per_shell) / per_shell;
        let phi = (1.0 - 2.0 * ramp).acos();

        let x = radius * phi.sin() * theta.cos();
        let y = radius * phi.sin() * theta.sin();
        let z = radius * phi.cos();

        let jitter = self.params.position_jitter;
        let x = x + rng.gen_range(-0.5..0.5) * jitter;
        let y = y + rng.gen_range(-0.5..0.5) * jitter;
        let z = z + rng.gen_range(-0.5..0.5) * jitter;

        let e = self.params.expansion_factor;
        Ok(Vec3::new(
            x * e,
            y * e,
            z * e * self.params.flattening_factor,
        ))
    }

    /// Render size for a magnitude: logarithmic scaling with a small random
    /// variation. Magnitudes at or below 1 collapse to the base size.
    pub fn point_size(&self, magnitude: f64, rng: &mut impl Rng) -> f64 {
        let value_modifier = 1.0 + magnitude.max(1.0).log10() * 0.1;
        let random_factor = rng.gen_range(0.85..1.15);
        self.params.base_size * value_modifier * random_factor
    }

    /// Derived color: fixed hue per category, brightness rising with
    /// magnitude and saturating below pure white.
    pub fn point_color(&self, category: Category, magnitude: f64) -> String {
        let hue = palette::category_hue(category);
        let saturation = palette::category_saturation(category);
        let lightness =
            (0.45 + magnitude.max(0.0) / palette::MAGNITUDE_FULL_BRIGHTNESS * 0.35).min(0.80);
        palette::hsl_to_hex(hue, saturation, lightness)
    }

    /// Place an entire record sequence. An empty input yields an empty
    /// layout; data still loading is not an error.
    pub fn place_all(&self, records: &[Record], rng: &mut impl Rng) -> Result<Vec<PlacedPoint>> {
        let total = records.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let position = self.place(index, total, rng)?;
                Ok(PlacedPoint {
                    position,
                    category: record.category,
                    magnitude: record.magnitude,
                    size: self.point_size(record.magnitude, rng),
                    color: self.point_color(record.category, record.magnitude),
                })
            })
            .collect()
    }
}
