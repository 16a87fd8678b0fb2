//! Nebula - token-holder constellation visualization core.
//!
//! Places an ordered list of holder records on a golden-angle spherical
//! spiral, builds a per-category nearest-neighbor proximity graph over the
//! placed points, and animates timed pulses across the graph's edges. The
//! rendering layer is a consumer of these data structures; a static SVG
//! snapshot renderer is included for inspection.

pub mod config;
pub mod error;
pub mod graph;
pub mod holders;
pub mod layout;
pub mod render;

pub use config::NebulaConfig;
pub use error::{Error, Result};
pub use graph::{GraphParams, ProximityGraph};
pub use holders::{Category, Record};
pub use layout::{LayoutGenerator, LayoutParams, PlacedPoint, Vec3};
