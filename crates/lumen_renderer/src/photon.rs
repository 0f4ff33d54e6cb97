//! A stored photon.

use lumen_math::{Color, Vec3};

/// Light energy deposited on a diffuse surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    /// Where the photon landed
    pub position: Vec3,
    /// Unit direction the photon was travelling when it arrived
    pub direction: Vec3,
    /// Carried energy (RGB)
    pub energy: Color,
    /// Bounces taken before landing (always >= 1 for stored photons)
    pub bounces: u32,
}

impl Photon {
    pub fn new(position: Vec3, direction: Vec3, energy: Color, bounces: u32) -> Self {
        Self {
            position,
            direction,
            energy,
            bounces,
        }
    }
}
