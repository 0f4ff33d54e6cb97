//! Photon map for indirect diffuse illumination.
//!
//! Photons leave every light in proportion to its area, bounce through the
//! scene by Russian roulette and are stored where they land on diffuse
//! surfaces after at least one bounce. Indirect light at a point is then
//! estimated from the density of nearby photons.

use lumen_core::Face;
use lumen_math::{magnitude, Aabb, Color, Ray, Vec3};
use rand::{Rng, RngCore};

use crate::hit::Hit;
use crate::kdtree::KdTree;
use crate::photon::Photon;
use crate::raytracer::RayTracer;
use crate::sampling::{random_diffuse_direction, reflect};

/// Hard cap on photon path length regardless of configuration.
const MAX_PHOTON_BOUNCES: u32 = 64;

/// Photons travelling further than this multiple of the scene diagonal are
/// discarded.
const MAX_TRAVEL_FACTOR: f32 = 2.0;

/// Initial gather radius as a fraction of the photon bounds diagonal.
const INITIAL_GATHER_FRACTION: f32 = 0.01;

/// Gather box doublings before giving up.
const MAX_GATHER_EXPANSIONS: usize = 16;

/// Lower bound on the density-estimate radius.
const MIN_GATHER_RADIUS: f32 = 1e-4;

/// Counters describing a traced photon map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhotonMapStats {
    pub photons_shot: usize,
    pub photons_stored: usize,
    pub leaves: usize,
    pub depth: usize,
}

/// Photon map built by [`PhotonMap::trace_photons`].
#[derive(Debug, Clone, Default)]
pub struct PhotonMap {
    kdtree: Option<KdTree>,
    photons_shot: usize,
}

impl PhotonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if photons have been traced (the map may still be empty).
    pub fn is_traced(&self) -> bool {
        self.kdtree.is_some()
    }

    pub fn kdtree(&self) -> Option<&KdTree> {
        self.kdtree.as_ref()
    }

    pub fn num_photons(&self) -> usize {
        self.kdtree.as_ref().map_or(0, KdTree::len)
    }

    pub fn stats(&self) -> PhotonMapStats {
        match &self.kdtree {
            Some(tree) => PhotonMapStats {
                photons_shot: self.photons_shot,
                photons_stored: tree.len(),
                leaves: tree.num_leaves(),
                depth: tree.depth(),
            },
            None => PhotonMapStats::default(),
        }
    }

    /// Discard all stored photons.
    pub fn clear(&mut self) {
        self.kdtree = None;
        self.photons_shot = 0;
    }

    /// Rebuild the map by shooting `num_photons_to_shoot` photons.
    ///
    /// Each light emits a share proportional to its area; every photon
    /// carries `emitted * area / count` of its light's energy. Returns the
    /// number of photons stored.
    pub fn trace_photons(&mut self, tracer: &RayTracer, rng: &mut dyn RngCore) -> usize {
        let scene = tracer.scene();
        let config = tracer.config();

        let bounds = scene.bounding_box().expanded(0.01);
        let mut kdtree = KdTree::new(bounds);
        let mut shot = 0;

        let total_area = scene.total_light_area();
        if total_area <= 0.0 {
            log::warn!("Scene has no light area; photon map left empty");
            self.kdtree = Some(kdtree);
            self.photons_shot = 0;
            return 0;
        }

        let mut walker = PhotonWalker {
            tracer,
            kdtree: &mut kdtree,
            max_bounces: config.num_bounces.min(MAX_PHOTON_BOUNCES),
            max_distance: bounds.diagonal() * MAX_TRAVEL_FACTOR,
        };

        for light in scene.lights() {
            let share = light.area() / total_area;
            let count = (config.num_photons_to_shoot as f64 * share as f64) as usize;
            if count == 0 {
                continue;
            }
            let emitted = scene.material(light.material()).emitted_color;
            let energy = emitted * (light.area() / count as f32);

            for _ in 0..count {
                walker.emit(light, energy, rng);
            }
            shot += count;
        }

        let stored = kdtree.len();
        log::info!(
            "Traced {} photons, stored {} ({} leaves, depth {})",
            shot,
            stored,
            kdtree.num_leaves(),
            kdtree.depth()
        );

        self.kdtree = Some(kdtree);
        self.photons_shot = shot;
        stored
    }

    /// Estimate indirect diffuse light arriving at `point`.
    ///
    /// Grows a box around the point until it holds at least `count` photons
    /// arriving on the front of the surface, then divides the energy of the
    /// `count` nearest by the square of half the distance to the farthest
    /// of them. Returns black when too few photons exist.
    pub fn gather_indirect(
        &self,
        point: Vec3,
        normal: Vec3,
        _direction_from: Vec3,
        count: usize,
    ) -> Color {
        let Some(kdtree) = &self.kdtree else {
            return Color::ZERO;
        };
        if count == 0 || kdtree.len() < count {
            return Color::ZERO;
        }

        let tree_bounds = *kdtree.bounds();
        let mut radius = (tree_bounds.diagonal() * INITIAL_GATHER_FRACTION).max(MIN_GATHER_RADIUS);
        let mut found = Vec::new();
        let mut candidates: Vec<(f32, Color)> = Vec::new();

        for _ in 0..MAX_GATHER_EXPANSIONS {
            let query = Aabb::around(point, radius);

            found.clear();
            kdtree.collect_photons_in_box(&query, &mut found);

            // Only photons that arrived on the front side of the surface
            candidates.clear();
            candidates.extend(
                found
                    .iter()
                    .filter(|p| normal.dot(p.direction) <= 0.0)
                    .map(|p| (p.position.distance(point), p.energy)),
            );

            if candidates.len() >= count || query.encloses(&tree_bounds) {
                break;
            }
            radius *= 2.0;
        }

        if candidates.len() < count {
            return Color::ZERO;
        }

        candidates.select_nth_unstable_by(count - 1, |a, b| a.0.total_cmp(&b.0));
        let farthest = candidates[count - 1].0;
        let estimate_radius = (farthest / 2.0).max(MIN_GATHER_RADIUS);

        let energy: Color = candidates[..count].iter().map(|(_, e)| *e).sum();
        energy / (estimate_radius * estimate_radius)
    }
}

/// Per-trace state threaded through a photon's bounces.
struct PhotonWalker<'t, 'a> {
    tracer: &'t RayTracer<'a>,
    kdtree: &'t mut KdTree,
    max_bounces: u32,
    max_distance: f32,
}

impl PhotonWalker<'_, '_> {
    /// Emit one photon from a uniformly chosen point on `light`.
    fn emit(&mut self, light: &Face, energy: Color, rng: &mut dyn RngCore) {
        let origin = light.random_point(rng);
        let direction = random_diffuse_direction(light.normal(), rng);
        self.trace_photon(origin, direction, energy, 0, rng);
    }

    /// Follow one photon path, storing it where it is absorbed.
    fn trace_photon(
        &mut self,
        position: Vec3,
        direction: Vec3,
        energy: Color,
        bounces: u32,
        rng: &mut dyn RngCore,
    ) {
        let ray = Ray::new(position, direction);
        let mut hit = Hit::new();
        if !self.tracer.cast_ray(&ray, &mut hit, false) || hit.t > self.max_distance {
            return;
        }
        let Some(material_id) = hit.material else {
            return;
        };

        let material = self.tracer.scene().material(material_id);
        let point = ray.at(hit.t);
        let diffuse = material.diffuse_at(hit.u, hit.v);
        let reflective = material.reflective_color;
        let (reflect_weight, _) = material.scatter_weights();
        let diffuse_weight = magnitude(diffuse);

        // The first hit always bounces: its roll is scaled to the total
        // scattering weight so absorption cannot be chosen.
        let scale = if bounces == 0 {
            reflect_weight + diffuse_weight
        } else {
            1.0
        };
        let roll = rng.gen::<f32>() * scale;
        let can_bounce = bounces < self.max_bounces;

        if can_bounce && reflect_weight > 0.0 && roll < reflect_weight {
            let energy = energy * reflective * (scale / reflect_weight);
            let bounced = reflect(ray.direction(), hit.normal);
            self.trace_photon(point, bounced, energy, bounces + 1, rng);
        } else if can_bounce && diffuse_weight > 0.0 && roll < reflect_weight + diffuse_weight {
            let energy = energy * diffuse * (scale / diffuse_weight);
            let bounced = random_diffuse_direction(hit.normal, rng);
            self.trace_photon(point, bounced, energy, bounces + 1, rng);
        } else if bounces > 0 {
            self.kdtree
                .add_photon(Photon::new(point, ray.direction(), energy, bounces));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use lumen_core::{CameraSettings, Material, Mesh, Scene};

    /// Closed unit-ish box with a light in the ceiling.
    fn lit_box() -> Scene {
        let mut mesh = Mesh::new();
        let p = [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(-1.0, 2.0, -1.0),
            Vec3::new(1.0, 2.0, -1.0),
            Vec3::new(1.0, 2.0, 1.0),
            Vec3::new(-1.0, 2.0, 1.0),
        ];
        let v: Vec<_> = p.iter().map(|&x| mesh.add_vertex(x)).collect();
        // Inward-facing walls
        for quad in [
            [v[0], v[3], v[2], v[1]], // floor
            [v[4], v[5], v[6], v[7]], // ceiling
            [v[0], v[1], v[5], v[4]], // back
            [v[3], v[7], v[6], v[2]], // front
            [v[0], v[4], v[7], v[3]], // left
            [v[1], v[2], v[6], v[5]], // right
        ] {
            mesh.add_quad(quad, 0).unwrap();
        }
        let l = [
            mesh.add_vertex(Vec3::new(-0.25, 1.99, -0.25)),
            mesh.add_vertex(Vec3::new(0.25, 1.99, -0.25)),
            mesh.add_vertex(Vec3::new(0.25, 1.99, 0.25)),
            mesh.add_vertex(Vec3::new(-0.25, 1.99, 0.25)),
        ];
        mesh.add_quad(l, 1).unwrap();

        Scene::new(
            mesh,
            vec![],
            vec![
                Material::new("wall", Color::splat(0.7)),
                Material::light("light", Color::splat(10.0)),
            ],
            Color::ZERO,
            CameraSettings::default(),
        )
        .unwrap()
    }

    fn seeded() -> rand::rngs::StdRng {
        use rand::SeedableRng;
        rand::rngs::StdRng::seed_from_u64(1234)
    }

    #[test]
    fn test_box_walls_face_inward() {
        let scene = lit_box();
        let center = Vec3::new(0.0, 1.0, 0.0);
        for face in scene.mesh.original_quads() {
            assert!(face.normal().dot(center - face.centroid()) > 0.0);
        }
    }

    #[test]
    fn test_untraced_gather_is_black() {
        let map = PhotonMap::new();
        assert!(!map.is_traced());
        assert_eq!(map.gather_indirect(Vec3::ZERO, Vec3::Y, -Vec3::Y, 10), Color::ZERO);
    }

    #[test]
    fn test_trace_stores_bounced_photons() {
        let scene = lit_box();
        let config = RenderConfig {
            num_photons_to_shoot: 2000,
            num_bounces: 3,
            ..Default::default()
        };
        let tracer = RayTracer::new(&scene, &config);
        let mut map = PhotonMap::new();
        let stored = map.trace_photons(&tracer, &mut seeded());

        assert!(stored > 0);
        let stats = map.stats();
        assert_eq!(stats.photons_shot, 2000);
        assert_eq!(stats.photons_stored, stored);
        assert!(stats.leaves >= 1);

        let mut all = Vec::new();
        map.kdtree()
            .unwrap()
            .collect_photons_in_box(map.kdtree().unwrap().bounds(), &mut all);
        assert_eq!(all.len(), stored);
        assert!(all.iter().all(|p| p.bounces >= 1 && p.bounces <= 3));
    }

    #[test]
    fn test_zero_bounces_stores_nothing() {
        let scene = lit_box();
        let config = RenderConfig {
            num_photons_to_shoot: 500,
            num_bounces: 0,
            ..Default::default()
        };
        let tracer = RayTracer::new(&scene, &config);
        let mut map = PhotonMap::new();
        assert_eq!(map.trace_photons(&tracer, &mut seeded()), 0);
        assert!(map.is_traced());
    }

    #[test]
    fn test_gather_on_floor() {
        let scene = lit_box();
        let config = RenderConfig {
            num_photons_to_shoot: 5000,
            num_bounces: 2,
            ..Default::default()
        };
        let tracer = RayTracer::new(&scene, &config);
        let mut map = PhotonMap::new();
        map.trace_photons(&tracer, &mut seeded());

        let indirect = map.gather_indirect(Vec3::new(0.0, 0.0, 0.0), Vec3::Y, -Vec3::Y, 20);
        assert!(indirect.min_element() > 0.0);
        assert!(indirect.is_finite());

        // Asking for more photons than exist yields black
        let too_many = map.num_photons() + 1;
        assert_eq!(map.gather_indirect(Vec3::ZERO, Vec3::Y, -Vec3::Y, too_many), Color::ZERO);
    }

    #[test]
    fn test_gather_ignores_photons_from_behind() {
        let mut map = PhotonMap::new();
        let mut tree = KdTree::new(Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        for i in 0..10 {
            let p = Vec3::new(i as f32 * 0.01, 0.0, 0.0);
            // Travelling upward: arrived from below the floor
            tree.add_photon(Photon::new(p, Vec3::Y, Color::ONE, 1));
        }
        map.kdtree = Some(tree);
        assert_eq!(map.gather_indirect(Vec3::ZERO, Vec3::Y, -Vec3::Y, 5), Color::ZERO);
    }

    #[test]
    fn test_gather_estimate_formula() {
        let mut map = PhotonMap::new();
        let mut tree = KdTree::new(Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        let energy = Color::splat(0.5);
        for &x in &[0.1, -0.1, 0.2, -0.2] {
            tree.add_photon(Photon::new(Vec3::new(x, 0.0, 0.0), -Vec3::Y, energy, 1));
        }
        map.kdtree = Some(tree);

        // The 4 nearest reach out to 0.2, so the estimate radius is 0.1
        let estimate = map.gather_indirect(Vec3::ZERO, Vec3::Y, -Vec3::Y, 4);
        let expected = 4.0 * 0.5 / (0.1 * 0.1);
        assert!((estimate.x - expected).abs() < 1e-2, "{}", estimate.x);
    }

    #[test]
    fn test_no_lights_leaves_map_empty() {
        let mut mesh = Mesh::new();
        let v = [
            mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0)),
            mesh.add_vertex(Vec3::new(1.0, 0.0, 1.0)),
            mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0)),
        ];
        mesh.add_quad(v, 0).unwrap();
        let scene = Scene::new(
            mesh,
            vec![],
            vec![Material::default()],
            Color::ZERO,
            CameraSettings::default(),
        )
        .unwrap();
        let config = RenderConfig::default();
        let tracer = RayTracer::new(&scene, &config);

        let mut map = PhotonMap::new();
        assert_eq!(map.trace_photons(&tracer, &mut seeded()), 0);
        assert_eq!(map.num_photons(), 0);
    }
}
