//! Direction and point sampling helpers.
//!
//! Every sampler takes the caller's generator so renders stay reproducible
//! for a given seed.

use std::f32::consts::PI;

use lumen_math::Vec3;
use rand::{Rng, RngCore};

/// Mirror `direction` about `normal`.
#[inline]
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Two unit vectors completing an orthonormal basis with `n`.
///
/// Branchless construction from Duff et al., "Building an Orthonormal
/// Basis, Revisited" (2017).
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0_f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (tangent, bitangent)
}

/// Cosine-weighted direction in the hemisphere around `normal`.
pub fn random_diffuse_direction(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();

    let phi = 2.0 * PI * r1;
    let radius = r2.sqrt();
    let (tangent, bitangent) = orthonormal_basis(normal);

    let local = tangent * (radius * phi.cos())
        + bitangent * (radius * phi.sin())
        + normal * (1.0 - r2).max(0.0).sqrt();
    local.normalize_or_zero()
}

/// Uniform point in the cube [-0.5, 0.5)^3.
pub fn random_in_unit_cube(rng: &mut dyn RngCore) -> Vec3 {
    Vec3::new(
        rng.gen::<f32>() - 0.5,
        rng.gen::<f32>() - 0.5,
        rng.gen::<f32>() - 0.5,
    )
}

/// `count` jittered (u, v) samples in distinct cells of a square grid.
///
/// The grid is ceil(sqrt(count)) cells on a side. Cells are chosen at random
/// without replacement, so when `count` is a perfect square every cell
/// receives exactly one sample.
pub fn stratified_samples(count: usize, rng: &mut dyn RngCore) -> Vec<(f32, f32)> {
    if count == 0 {
        return Vec::new();
    }
    let side = (count as f32).sqrt().ceil() as usize;
    let cell = 1.0 / side as f32;

    rand::seq::index::sample(rng, side * side, count)
        .into_iter()
        .map(|index| {
            let (row, col) = (index / side, index % side);
            (
                (col as f32 + rng.gen::<f32>()) * cell,
                (row as f32 + rng.gen::<f32>()) * cell,
            )
        })
        .collect()
}
