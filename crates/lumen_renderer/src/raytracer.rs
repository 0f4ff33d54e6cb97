//! Recursive ray tracer.
//!
//! Computes the color seen along a ray: emission, ambient, direct light from
//! every area light (with optional stratified soft shadows), optional
//! photon-map indirect light, and recursive mirror or glossy reflection.
//!
//! The tracer also serves as the visibility oracle for the photon map and
//! the radiosity solver through [`RayTracer::cast_ray`].

use std::f32::consts::PI;

use lumen_core::{Face, Material, Scene};
use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

use crate::config::RenderConfig;
use crate::hit::{Hit, Intersect};
use crate::photon_map::PhotonMap;
use crate::sampling::{random_in_unit_cube, reflect, stratified_samples};
use crate::shading::shade;

/// Rays are pushed this far along their direction before being cast.
pub const RAY_OFFSET: f32 = 1e-4;

/// Hard cap on reflection recursion regardless of configuration.
const MAX_BOUNCES: u32 = 32;

/// Squared distances below this are treated as coincident points.
const MIN_DISTANCE_SQUARED: f32 = 1e-10;

/// Ray tracer over a borrowed scene and configuration.
///
/// Cheap to construct; solvers build one wherever they need visibility.
#[derive(Clone, Copy)]
pub struct RayTracer<'a> {
    scene: &'a Scene,
    config: &'a RenderConfig,
    photon_map: Option<&'a PhotonMap>,
}

impl<'a> RayTracer<'a> {
    pub fn new(scene: &'a Scene, config: &'a RenderConfig) -> Self {
        Self {
            scene,
            config,
            photon_map: None,
        }
    }

    /// Use `photon_map` for indirect light when `gather_indirect` is set.
    pub fn with_photon_map(mut self, photon_map: &'a PhotonMap) -> Self {
        self.photon_map = Some(photon_map);
        self
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    pub fn config(&self) -> &'a RenderConfig {
        self.config
    }

    pub fn photon_map(&self) -> Option<&'a PhotonMap> {
        self.photon_map
    }

    /// Find the closest intersection along `ray`.
    ///
    /// Authored quads are always tested. Spheres are tested analytically,
    /// or through their rasterized patches when `use_rasterized_patches`
    /// is set (radiosity needs visibility against the same geometry it
    /// solves over). Returns true if anything was hit.
    pub fn cast_ray(&self, ray: &Ray, hit: &mut Hit, use_rasterized_patches: bool) -> bool {
        let backfaces = self.config.intersect_backfacing;
        let mesh = &self.scene.mesh;
        let mut found = false;

        for quad in mesh.original_quads() {
            found |= quad.intersect(ray, hit, backfaces);
        }

        if use_rasterized_patches {
            for (id, face) in mesh.rasterized_primitive_faces() {
                if face.intersect(ray, hit, backfaces) {
                    hit.face = Some(id);
                    found = true;
                }
            }
        } else {
            for sphere in &self.scene.spheres {
                found |= sphere.intersect(ray, hit, backfaces);
            }
        }

        found
    }

    /// Find the closest current patch along `ray`, recording its index.
    ///
    /// Used to display radiosity results, where every subdivided patch
    /// carries its own color.
    pub fn cast_patches(&self, ray: &Ray, hit: &mut Hit) -> bool {
        let backfaces = self.config.intersect_backfacing;
        let mut found = false;
        for (id, face) in self.scene.mesh.faces().iter().enumerate() {
            if face.intersect(ray, hit, backfaces) {
                hit.face = Some(id);
                found = true;
            }
        }
        found
    }

    /// Color seen along `ray`, recursing through at most `bounce_budget`
    /// reflections. `hit` receives the primary intersection.
    pub fn trace_ray(
        &self,
        ray: &Ray,
        hit: &mut Hit,
        bounce_budget: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let bounce_budget = bounce_budget.min(MAX_BOUNCES);
        let ray = ray.offset(RAY_OFFSET);

        *hit = Hit::new();
        if !self.cast_ray(&ray, hit, false) {
            return self.scene.background_linear();
        }
        let Some(material_id) = hit.material else {
            return self.scene.background_linear();
        };
        let material = self.scene.material(material_id);

        if material.is_emissive() {
            return material.emitted_color;
        }

        let point = ray.at(hit.t);
        let diffuse = material.diffuse_at(hit.u, hit.v);

        let mut color = diffuse * (self.config.ambient_light + self.indirect(point, hit.normal, &ray));

        for light in self.scene.lights() {
            color += self.direct_light(&ray, hit, point, light, material, rng);
        }

        if bounce_budget > 0 && material.is_reflective() {
            color += material.reflective_color
                * self.reflection(&ray, hit, point, material, bounce_budget - 1, rng);
        }

        color
    }

    /// Indirect diffuse light from the photon map, if gathering is enabled.
    fn indirect(&self, point: Vec3, normal: Vec3, ray: &Ray) -> Color {
        match self.photon_map {
            Some(photon_map) if self.config.gather_indirect => photon_map.gather_indirect(
                point,
                normal,
                ray.direction(),
                self.config.num_photons_to_collect,
            ),
            _ => Color::ZERO,
        }
    }

    /// Direct contribution of one area light.
    fn direct_light(
        &self,
        ray: &Ray,
        hit: &Hit,
        point: Vec3,
        light: &Face,
        material: &Material,
        rng: &mut dyn RngCore,
    ) -> Color {
        let area = light.area();
        let distance_squared = point.distance_squared(light.centroid());
        if area <= 0.0 || distance_squared < MIN_DISTANCE_SQUARED {
            return Color::ZERO;
        }

        let emitted = self.scene.material(light.material()).emitted_color;
        let intensity = emitted * area / (PI * distance_squared);

        let samples = self.config.num_shadow_samples.max(1) as usize;
        let targets: Vec<Vec3> = if samples == 1 {
            vec![light.centroid()]
        } else {
            stratified_samples(samples, rng)
                .into_iter()
                .map(|(u, v)| light.point_at(u, v))
                .collect()
        };

        let weight = 1.0 / samples as f32;
        let mut total = Color::ZERO;
        for target in targets {
            let to_light = target - point;
            let distance = to_light.length();
            if distance * distance < MIN_DISTANCE_SQUARED {
                continue;
            }
            let direction = to_light / distance;
            if self.reaches(point, direction, distance) {
                total += shade(ray, hit, direction, intensity, material) * weight;
            }
        }
        total
    }

    /// Check that a shadow ray from `point` travels `distance` unblocked.
    fn reaches(&self, point: Vec3, direction: Vec3, distance: f32) -> bool {
        let shadow_ray = Ray::new(point, direction).offset(RAY_OFFSET);
        let mut shadow_hit = Hit::new();
        self.cast_ray(&shadow_ray, &mut shadow_hit, false);
        shadow_hit.t > distance - RAY_OFFSET - self.config.shadow_tolerance
    }

    /// Mirror or glossy reflection arriving at `point`.
    fn reflection(
        &self,
        ray: &Ray,
        hit: &Hit,
        point: Vec3,
        material: &Material,
        bounce_budget: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let mirror = reflect(ray.direction(), hit.normal);
        let mut bounce = Hit::new();

        let glossy = self.config.num_glossy_samples > 1 && material.roughness > 0.0;
        if !glossy {
            return self.trace_ray(&Ray::new(point, mirror), &mut bounce, bounce_budget, rng);
        }

        let jittered = self.config.num_glossy_samples as usize;
        let mut total = self.trace_ray(&Ray::new(point, mirror), &mut bounce, bounce_budget, rng);
        for _ in 0..jittered {
            let mut direction = mirror + random_in_unit_cube(rng) * material.roughness;
            // Keep jittered rays on the visible side of the surface
            if direction.dot(hit.normal) <= 0.0 {
                direction = mirror;
            }
            total += self.trace_ray(&Ray::new(point, direction), &mut bounce, bounce_budget, rng);
        }
        total / (jittered + 1) as f32
    }
}
