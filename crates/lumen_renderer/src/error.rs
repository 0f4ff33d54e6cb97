//! Renderer error type.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised when a solver refuses to run.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scene has no patches to solve radiosity over")]
    NoPatches,

    #[error("indirect gathering is enabled but no photon map was traced")]
    PhotonsNotTraced,

    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

pub type RenderResult<T> = Result<T, RenderError>;
