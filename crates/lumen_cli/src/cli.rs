use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use lumen_renderer::{RenderConfig, VisualizationMode};

/// Log levels selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Which solver produces the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Recursive ray tracing (photon-map indirect light with --gather-indirect)
    Raytrace,
    /// Progressive radiosity, displayed per patch
    Radiosity,
}

/// Quantity shown in radiosity mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Visualize {
    Materials,
    Lights,
    Undistributed,
    Absorbed,
    Radiance,
    FormFactors,
}

impl From<Visualize> for VisualizationMode {
    fn from(v: Visualize) -> Self {
        match v {
            Visualize::Materials => VisualizationMode::Materials,
            Visualize::Lights => VisualizationMode::Lights,
            Visualize::Undistributed => VisualizationMode::Undistributed,
            Visualize::Absorbed => VisualizationMode::Absorbed,
            Visualize::Radiance => VisualizationMode::Radiance,
            Visualize::FormFactors => VisualizationMode::FormFactors,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Ray tracing, photon mapping and radiosity renderer")]
pub struct Args {
    /// Scene description (JSON)
    pub scene: PathBuf,

    /// Render config (JSON); defaults are used for missing keys
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, default_value = "render.png")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 400)]
    pub width: u32,

    #[arg(long, default_value_t = 400)]
    pub height: u32,

    #[arg(short, long, value_enum, default_value_t = Mode::Raytrace)]
    pub mode: Mode,

    /// Times to split every patch into four before solving
    #[arg(long, default_value_t = 0)]
    pub subdivide: u32,

    /// Sphere tessellation (slices around, stacks pole to pole)
    #[arg(long, default_value_t = 16)]
    pub sphere_slices: usize,

    #[arg(long, default_value_t = 8)]
    pub sphere_stacks: usize,

    /// Radiosity shots before giving up
    #[arg(long, default_value_t = 10_000)]
    pub max_iterations: usize,

    /// Stop radiosity once undistributed energy falls below this
    #[arg(long, default_value_t = 0.001)]
    pub threshold: f32,

    #[arg(long, value_enum, default_value_t = Visualize::Radiance)]
    pub visualize: Visualize,

    /// Show flat per-patch radiance instead of corner-interpolated
    #[arg(long)]
    pub flat: bool,

    /// Enable photon-map indirect light (overrides the config)
    #[arg(long)]
    pub gather_indirect: bool,

    /// Worker threads (overrides the config; 0 = all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Base random seed (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Args {
    /// Fold command-line overrides into a loaded config.
    pub fn apply_overrides(&self, config: &mut RenderConfig) {
        if self.gather_indirect {
            config.gather_indirect = true;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
    }
}
