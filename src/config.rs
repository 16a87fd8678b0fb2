//! Configuration loading for Nebula.
//!
//! Configuration is loaded from TOML files with environment variable
//! overrides. Every constant the layout, graph, and pulse stages use is a
//! named, overridable parameter here.

use crate::graph::pulse::PulseParams;
use crate::graph::GraphParams;
use crate::layout::LayoutParams;
use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config.default.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NebulaConfig {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub pulse: PulseConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_shell_count")]
    pub shell_count: u32,

    #[serde(default = "default_radius_base")]
    pub radius_base: f64,

    #[serde(default = "default_radius_step")]
    pub radius_step: f64,

    #[serde(default = "default_radius_jitter_fraction")]
    pub radius_jitter_fraction: f64,

    #[serde(default = "default_position_jitter")]
    pub position_jitter: f64,

    #[serde(default = "default_expansion_factor")]
    pub expansion_factor: f64,

    #[serde(default = "default_flattening_factor")]
    pub flattening_factor: f64,

    #[serde(default = "default_base_size")]
    pub base_size: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            shell_count: default_shell_count(),
            radius_base: default_radius_base(),
            radius_step: default_radius_step(),
            radius_jitter_fraction: default_radius_jitter_fraction(),
            position_jitter: default_position_jitter(),
            expansion_factor: default_expansion_factor(),
            flattening_factor: default_flattening_factor(),
            base_size: default_base_size(),
        }
    }
}

fn default_shell_count() -> u32 {
    5
}

fn default_radius_base() -> f64 {
    100.0
}

fn default_radius_step() -> f64 {
    50.0
}

fn default_radius_jitter_fraction() -> f64 {
    0.2
}

fn default_position_jitter() -> f64 {
    30.0
}

fn default_expansion_factor() -> f64 {
    1.0
}

fn default_flattening_factor() -> f64 {
    1.0
}

fn default_base_size() -> f64 {
    1.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: u32,

    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: u32,

    #[serde(default = "default_same_category_only")]
    pub same_category_only: bool,

    #[serde(default = "default_grid_threshold")]
    pub grid_threshold: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_neighbors: default_min_neighbors(),
            max_neighbors: default_max_neighbors(),
            same_category_only: default_same_category_only(),
            grid_threshold: default_grid_threshold(),
        }
    }
}

fn default_min_neighbors() -> u32 {
    3
}

fn default_max_neighbors() -> u32 {
    6
}

fn default_same_category_only() -> bool {
    true
}

fn default_grid_threshold() -> usize {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_pulse_duration")]
    pub duration: f64,

    #[serde(default = "default_trigger_interval")]
    pub trigger_interval: f64,

    #[serde(default = "default_max_active")]
    pub max_active: usize,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            duration: default_pulse_duration(),
            trigger_interval: default_trigger_interval(),
            max_active: default_max_active(),
        }
    }
}

fn default_pulse_duration() -> f64 {
    1.0
}

fn default_trigger_interval() -> f64 {
    0.5
}

fn default_max_active() -> usize {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default)]
    pub save_stats: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            width: default_width(),
            height: default_height(),
            save_stats: false,
        }
    }
}

fn default_directory() -> String {
    "output".to_string()
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    1024
}

impl NebulaConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("NEBULA").separator("_"))
            .build()?;

        let nebula_config: NebulaConfig = config.try_deserialize().unwrap_or_default();
        Ok(nebula_config)
    }

    /// Layout parameters from the `[layout]` section.
    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            shell_count: self.layout.shell_count,
            radius_base: self.layout.radius_base,
            radius_step: self.layout.radius_step,
            radius_jitter_fraction: self.layout.radius_jitter_fraction,
            position_jitter: self.layout.position_jitter,
            expansion_factor: self.layout.expansion_factor,
            flattening_factor: self.layout.flattening_factor,
            base_size: self.layout.base_size,
        }
    }

    /// Graph parameters from the `[graph]` section.
    pub fn graph_params(&self) -> GraphParams {
        GraphParams {
            min_neighbors: self.graph.min_neighbors,
            max_neighbors: self.graph.max_neighbors,
            same_category_only: self.graph.same_category_only,
            grid_threshold: self.graph.grid_threshold,
        }
    }

    /// Pulse parameters from the `[pulse]` section.
    pub fn pulse_params(&self) -> PulseParams {
        PulseParams {
            duration: self.pulse.duration,
            trigger_interval: self.pulse.trigger_interval,
            max_active: self.pulse.max_active,
        }
    }
}
