//! Local illumination for a single light sample.

use lumen_core::Material;
use lumen_math::{Color, Ray, Vec3};

use crate::hit::Hit;
use crate::sampling::reflect;

/// Lambertian plus Phong response of `material` at `hit` to light arriving
/// along `dir_to_light` with the given intensity.
///
/// Returns black when the light is behind the surface.
pub fn shade(
    ray: &Ray,
    hit: &Hit,
    dir_to_light: Vec3,
    light_intensity: Color,
    material: &Material,
) -> Color {
    let normal = hit.normal;
    let to_light = dir_to_light.normalize_or_zero();

    let n_dot_l = normal.dot(to_light);
    if n_dot_l <= 0.0 {
        return Color::ZERO;
    }

    let diffuse = material.diffuse_at(hit.u, hit.v) * n_dot_l;

    // Phong lobe around the mirrored light direction, tinted by the
    // reflective color
    let mirrored = reflect(-to_light, normal);
    let to_eye = -ray.direction();
    let specular = material.reflective_color
        * mirrored.dot(to_eye).max(0.0).powf(material.shininess.max(0.0));

    light_intensity * (diffuse + specular)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_hit() -> Hit {
        let mut hit = Hit::new();
        hit.set(1.0, 0, Vec3::Y, 0.5, 0.5);
        hit
    }

    #[test]
    fn test_lambert_cosine() {
        let material = Material::new("grey", Color::splat(0.5));
        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
        let hit = floor_hit();

        let overhead = shade(&ray, &hit, Vec3::Y, Color::ONE, &material);
        assert!((overhead - Color::splat(0.5)).length() < 1e-5);

        let oblique = shade(&ray, &hit, Vec3::new(1.0, 1.0, 0.0), Color::ONE, &material);
        let expected = 0.5 * std::f32::consts::FRAC_1_SQRT_2;
        assert!((oblique.x - expected).abs() < 1e-5);
    }

    #[test]
    fn test_light_behind_surface_is_black() {
        let material = Material::new("grey", Color::splat(0.5)).with_reflective(Color::ONE);
        let ray = Ray::new(Vec3::Y, -Vec3::Y);
        let color = shade(&ray, &floor_hit(), -Vec3::Y, Color::splat(10.0), &material);
        assert_eq!(color, Color::ZERO);
    }

    #[test]
    fn test_specular_peak_along_mirror() {
        let material = Material::new("shiny", Color::ZERO).with_reflective(Color::splat(0.25));
        // Eye straight above, light straight above: mirror direction hits the eye
        let ray = Ray::new(Vec3::Y, -Vec3::Y);
        let color = shade(&ray, &floor_hit(), Vec3::Y, Color::splat(2.0), &material);
        assert!((color - Color::splat(0.5)).length() < 1e-4);
    }
}
