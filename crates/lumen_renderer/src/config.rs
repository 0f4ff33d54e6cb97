//! Render configuration shared by every solver.
//!
//! Nothing here is global: the config is passed by reference into the ray
//! tracer, photon map and radiosity solver, so two renders with different
//! settings can run side by side.

use std::fs;
use std::path::Path;

use lumen_math::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::DEFAULT_BUCKET_SIZE;

/// Errors from loading or validating a [`RenderConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for `{option}`: {reason}")]
    Invalid { option: &'static str, reason: String },
}

/// Tunable render options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Constant light added to every diffuse surface
    pub ambient_light: Color,
    /// Shadow rays per area light (1 = light centroid only)
    pub num_shadow_samples: u32,
    /// Maximum reflection / photon bounce depth
    pub num_bounces: u32,
    /// Jittered rays per glossy reflection (1 = perfect mirror)
    pub num_glossy_samples: u32,
    pub num_photons_to_shoot: usize,
    /// Photons used per indirect gather
    pub num_photons_to_collect: usize,
    /// Monte Carlo samples per patch pair when computing form factors
    pub num_form_factor_samples: u32,
    /// Accept hits on the back side of surfaces
    pub intersect_backfacing: bool,
    /// Add photon-map indirect light during ray tracing
    pub gather_indirect: bool,
    /// Slack when deciding whether a shadow ray reached its target
    pub shadow_tolerance: f32,
    /// Rays per pixel when the adaptive pass refines a pixel
    pub num_antialias_samples: u32,
    /// Per-channel spread that triggers adaptive refinement
    pub antialias_variance_limit: f32,
    pub bucket_size: u32,
    /// Worker threads (0 = available parallelism)
    pub num_threads: usize,
    /// Base seed for every per-task random generator
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ambient_light: Color::splat(0.1),
            num_shadow_samples: 1,
            num_bounces: 1,
            num_glossy_samples: 1,
            num_photons_to_shoot: 10_000,
            num_photons_to_collect: 100,
            num_form_factor_samples: 1,
            intersect_backfacing: false,
            gather_indirect: false,
            shadow_tolerance: 0.01,
            num_antialias_samples: 8,
            antialias_variance_limit: 0.05,
            bucket_size: DEFAULT_BUCKET_SIZE,
            num_threads: 0,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Load a config from a JSON file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let config = Self::from_json_str(&source)?;
        log::info!("Loaded render config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a config from a JSON string.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the solvers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |option, reason: &str| {
            Err(ConfigError::Invalid {
                option,
                reason: reason.to_string(),
            })
        };

        if self.ambient_light.min_element() < 0.0 || !self.ambient_light.is_finite() {
            return invalid("ambient_light", "must be finite and non-negative");
        }
        if self.num_shadow_samples == 0 {
            return invalid("num_shadow_samples", "must be at least 1");
        }
        if self.num_glossy_samples == 0 {
            return invalid("num_glossy_samples", "must be at least 1");
        }
        if self.num_form_factor_samples == 0 {
            return invalid("num_form_factor_samples", "must be at least 1");
        }
        if self.gather_indirect && self.num_photons_to_collect == 0 {
            return invalid("num_photons_to_collect", "must be at least 1 when gathering");
        }
        if !(self.shadow_tolerance >= 0.0 && self.shadow_tolerance.is_finite()) {
            return invalid("shadow_tolerance", "must be finite and non-negative");
        }
        if self.num_antialias_samples == 0 {
            return invalid("num_antialias_samples", "must be at least 1");
        }
        if !(self.antialias_variance_limit >= 0.0) {
            return invalid("antialias_variance_limit", "must be non-negative");
        }
        if self.bucket_size == 0 {
            return invalid("bucket_size", "must be at least 1");
        }
        Ok(())
    }

    /// Number of worker threads to spawn.
    pub fn worker_count(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            RenderConfig::from_json_str(r#"{ "num_shadow_samples": 9, "gather_indirect": true }"#)
                .unwrap();
        assert_eq!(config.num_shadow_samples, 9);
        assert!(config.gather_indirect);
        assert_eq!(config.num_bounces, RenderConfig::default().num_bounces);
    }

    #[test]
    fn test_zero_shadow_samples_rejected() {
        let err = RenderConfig::from_json_str(r#"{ "num_shadow_samples": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                option: "num_shadow_samples",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = RenderConfig {
            shadow_tolerance: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_json() {
        let err = RenderConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_worker_count() {
        let config = RenderConfig {
            num_threads: 3,
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 3);
        assert!(RenderConfig::default().worker_count() >= 1);
    }
}
