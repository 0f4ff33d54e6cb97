//! Progressive shooting radiosity.
//!
//! Every patch tracks three energies:
//!
//! - **radiance**: light leaving the patch (what is displayed)
//! - **undistributed**: light received but not yet shot onward
//! - **absorbed**: light the patch soaked up
//!
//! Each [`Radiosity::iterate`] picks the patch with the most undistributed
//! energy (weighted by area) and shoots it to every other patch through the
//! form-factor matrix. Form factors are estimated by Monte Carlo sampling
//! with ray-cast visibility, one matrix row per rayon task.

use std::f32::consts::PI;

use lumen_core::{Face, FaceId, Scene};
use lumen_math::{Color, Ray, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::{RenderError, RenderResult};
use crate::hit::Hit;
use crate::raytracer::RayTracer;

/// Neighbouring faces whose normals agree at least this much are blended
/// when interpolating radiance at a corner.
const SMOOTHING_NORMAL_DOT: f32 = 0.5;

/// Scale applied to the form-factor visualization.
const FORM_FACTOR_DISPLAY_SCALE: f32 = 0.2;

/// Per-patch display quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualizationMode {
    /// Diffuse albedo
    Materials,
    /// Emitted color
    Lights,
    Undistributed,
    Absorbed,
    #[default]
    Radiance,
    /// Form factors from the current shooter to each patch
    FormFactors,
}

/// Radiosity solver state for one scene topology.
#[derive(Debug, Clone)]
pub struct Radiosity {
    num_faces: usize,
    revision: u64,
    area: Vec<f32>,
    undistributed: Vec<Color>,
    absorbed: Vec<Color>,
    radiance: Vec<Color>,
    /// Row-major `F[i * n + j]`: fraction of energy leaving i that reaches j
    form_factors: Option<Vec<f32>>,
    max_undistributed_patch: Option<FaceId>,
    total_undistributed: f32,
    total_area: f32,
}

impl Radiosity {
    /// Create solver state sized to the scene's current patches.
    pub fn new(scene: &Scene) -> RenderResult<Self> {
        if scene.mesh.num_faces() == 0 {
            return Err(RenderError::NoPatches);
        }
        let mut radiosity = Self {
            num_faces: 0,
            revision: scene.mesh.revision(),
            area: Vec::new(),
            undistributed: Vec::new(),
            absorbed: Vec::new(),
            radiance: Vec::new(),
            form_factors: None,
            max_undistributed_patch: None,
            total_undistributed: 0.0,
            total_area: 0.0,
        };
        radiosity.reset(scene);
        Ok(radiosity)
    }

    /// Restart the solution from the lights' emission.
    ///
    /// Absorbed energy is zeroed; undistributed energy and radiance are set
    /// to each patch's emitted color. Form factors survive unless the mesh
    /// topology changed since they were computed.
    pub fn reset(&mut self, scene: &Scene) {
        let faces = scene.mesh.faces();
        let n = faces.len();

        if self.is_stale(scene) {
            log::debug!("Patch topology changed; discarding form factors");
            self.form_factors = None;
            self.revision = scene.mesh.revision();
            self.num_faces = n;
        }

        self.area = faces.iter().map(Face::area).collect();
        self.total_area = self.area.iter().sum();
        self.radiance = faces
            .iter()
            .map(|f| scene.material(f.material()).emitted_color)
            .collect();
        self.undistributed = self.radiance.clone();
        self.absorbed = vec![Color::ZERO; n];

        self.find_max_undistributed();
    }

    /// Check if the state no longer matches the scene's patches.
    pub fn is_stale(&self, scene: &Scene) -> bool {
        self.revision != scene.mesh.revision() || self.num_faces != scene.mesh.num_faces()
    }

    /// Estimate the full form-factor matrix.
    ///
    /// `F[i][j]` averages `num_form_factor_samples` point pairs: the first
    /// pair is centroid to centroid, the rest are uniform random points on
    /// each patch. Each row is normalized to sum to 1; a row with no
    /// visible receivers stays all zero.
    pub fn compute_form_factors(&mut self, tracer: &RayTracer) -> RenderResult<()> {
        let scene = tracer.scene();
        if scene.mesh.num_faces() == 0 {
            return Err(RenderError::NoPatches);
        }
        if self.is_stale(scene) {
            self.reset(scene);
        }

        let config = tracer.config();
        let faces = scene.mesh.faces();
        let n = faces.len();
        let samples = config.num_form_factor_samples.max(1);

        log::info!("Computing {}x{} form factors ({} samples per pair)", n, n, samples);

        let mut matrix = vec![0.0_f32; n * n];
        matrix.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
            let mut rng = StdRng::seed_from_u64(config.seed ^ i as u64);
            let source = &faces[i];
            if source.area() <= 0.0 {
                return;
            }

            for (j, receiver) in faces.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut sum = 0.0;
                for k in 0..samples {
                    let (from, to) = if k == 0 {
                        (source.centroid(), receiver.centroid())
                    } else {
                        (source.random_point(&mut rng), receiver.random_point(&mut rng))
                    };
                    sum += point_form_factor(tracer, source, receiver, from, to);
                }
                row[j] = sum / samples as f32;
            }

            let total: f32 = row.iter().sum();
            if total > 0.0 {
                for value in row.iter_mut() {
                    *value /= total;
                }
            }
        });

        self.form_factors = Some(matrix);
        Ok(())
    }

    /// Shoot the patch with the most undistributed energy.
    ///
    /// Each receiver j gets `shot * F[shooter][j]`; the diffuse fraction is
    /// added to its radiance and undistributed energy and the rest is
    /// absorbed. A shooter that sees nothing absorbs its own energy.
    /// Form factors are computed on first use. Returns the total
    /// undistributed energy (sum of magnitude times area) after the step.
    pub fn iterate(&mut self, tracer: &RayTracer) -> RenderResult<f32> {
        let scene = tracer.scene();
        if self.is_stale(scene) {
            self.reset(scene);
        }
        if self.form_factors.is_none() {
            self.compute_form_factors(tracer)?;
        }

        let Some(shooter) = self.max_undistributed_patch else {
            return Ok(self.total_undistributed);
        };
        let n = self.num_faces;
        let shot = self.undistributed[shooter];
        self.undistributed[shooter] = Color::ZERO;

        let Some(form_factors) = &self.form_factors else {
            return Ok(self.total_undistributed);
        };
        let row = &form_factors[shooter * n..(shooter + 1) * n];

        if row.iter().sum::<f32>() <= 0.0 {
            self.absorbed[shooter] += shot;
        } else {
            for (j, &factor) in row.iter().enumerate() {
                if j == shooter || factor <= 0.0 {
                    continue;
                }
                let albedo = scene
                    .face_material(j)
                    .average_diffuse()
                    .clamp(Color::ZERO, Color::ONE);
                let incoming = shot * factor;
                let reflected = incoming * albedo;

                self.radiance[j] += reflected;
                self.undistributed[j] += reflected;
                self.absorbed[j] += incoming - reflected;
            }
        }

        self.find_max_undistributed();
        Ok(self.total_undistributed)
    }

    /// Iterate until the undistributed total drops below `threshold` or
    /// `max_iterations` shots have been taken. Returns the shot count.
    pub fn solve(
        &mut self,
        tracer: &RayTracer,
        max_iterations: usize,
        threshold: f32,
    ) -> RenderResult<usize> {
        let mut iterations = 0;
        while iterations < max_iterations && self.total_undistributed >= threshold {
            let remaining = self.iterate(tracer)?;
            iterations += 1;
            log::trace!("Radiosity iteration {}: undistributed {:.6}", iterations, remaining);
        }
        log::info!(
            "Radiosity finished after {} iterations (undistributed {:.6})",
            iterations,
            self.total_undistributed
        );
        Ok(iterations)
    }

    /// Recompute the shooter and the undistributed total.
    fn find_max_undistributed(&mut self) {
        self.max_undistributed_patch = None;
        self.total_undistributed = 0.0;

        let mut best = 0.0;
        for (i, (undistributed, area)) in self.undistributed.iter().zip(&self.area).enumerate() {
            let amount = undistributed.length() * area;
            self.total_undistributed += amount;
            if amount > best {
                best = amount;
                self.max_undistributed_patch = Some(i);
            }
        }
    }

    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    pub fn area(&self, face: FaceId) -> f32 {
        self.area[face]
    }

    pub fn total_area(&self) -> f32 {
        self.total_area
    }

    pub fn radiance(&self, face: FaceId) -> Color {
        self.radiance[face]
    }

    pub fn undistributed(&self, face: FaceId) -> Color {
        self.undistributed[face]
    }

    pub fn absorbed(&self, face: FaceId) -> Color {
        self.absorbed[face]
    }

    /// Patch that will shoot next, if any energy remains.
    pub fn max_undistributed_patch(&self) -> Option<FaceId> {
        self.max_undistributed_patch
    }

    pub fn total_undistributed(&self) -> f32 {
        self.total_undistributed
    }

    pub fn has_form_factors(&self) -> bool {
        self.form_factors.is_some()
    }

    /// `F[i][j]`, or zero before form factors are computed.
    pub fn form_factor(&self, i: FaceId, j: FaceId) -> f32 {
        self.form_factors
            .as_ref()
            .map_or(0.0, |f| f[i * self.num_faces + j])
    }

    /// Flat display color of a patch.
    pub fn patch_color(&self, scene: &Scene, mode: VisualizationMode, face: FaceId) -> Color {
        match mode {
            VisualizationMode::Materials => scene.face_material(face).average_diffuse(),
            VisualizationMode::Lights => scene.face_material(face).emitted_color,
            VisualizationMode::Undistributed => self.undistributed[face],
            VisualizationMode::Absorbed => self.absorbed[face],
            VisualizationMode::Radiance => self.radiance[face],
            VisualizationMode::FormFactors => {
                let (Some(shooter), true) = (self.max_undistributed_patch, self.area[face] > 0.0)
                else {
                    return Color::ZERO;
                };
                let scale = FORM_FACTOR_DISPLAY_SCALE * self.total_area / self.area[face];
                Color::splat(scale * self.form_factor(shooter, face))
            }
        }
    }

    /// Radiance at one corner of a patch, area-averaged over the patches
    /// sharing that corner vertex whose normals roughly agree.
    pub fn interpolated_radiance(&self, scene: &Scene, face: FaceId, corner: usize) -> Color {
        let this = scene.mesh.face(face);
        let vertex = this.vertices()[corner % 4];

        let mut total = Color::ZERO;
        let mut weight = 0.0;
        for &other in scene.mesh.faces_with_vertex(vertex) {
            if other >= self.num_faces {
                continue;
            }
            if scene.mesh.face(other).normal().dot(this.normal()) < SMOOTHING_NORMAL_DOT {
                continue;
            }
            total += self.radiance[other] * self.area[other];
            weight += self.area[other];
        }

        if weight > 0.0 {
            total / weight
        } else {
            self.radiance[face]
        }
    }

    /// Display color at surface coordinates (u, v) of a patch.
    ///
    /// With `interpolate` in Radiance mode the four corner radiances are
    /// blended bilinearly; every other case is flat per patch.
    pub fn color_at(
        &self,
        scene: &Scene,
        mode: VisualizationMode,
        face: FaceId,
        u: f32,
        v: f32,
        interpolate: bool,
    ) -> Color {
        if !(interpolate && mode == VisualizationMode::Radiance) {
            return self.patch_color(scene, mode, face);
        }
        let [c0, c1, c2, c3] =
            [0, 1, 2, 3].map(|corner| self.interpolated_radiance(scene, face, corner));
        let bottom = c0.lerp(c1, u);
        let top = c3.lerp(c2, u);
        bottom.lerp(top, v)
    }
}

/// Differential form factor between two sample points on two patches.
fn point_form_factor(
    tracer: &RayTracer,
    source: &Face,
    receiver: &Face,
    from: Vec3,
    to: Vec3,
) -> f32 {
    let offset = to - from;
    let distance_squared = offset.length_squared();
    if distance_squared <= f32::EPSILON {
        return 0.0;
    }
    let distance = distance_squared.sqrt();
    let direction = offset / distance;

    let cos_source = source.normal().dot(direction).max(0.0);
    let cos_receiver = receiver.normal().dot(-direction).max(0.0);
    if cos_source == 0.0 || cos_receiver == 0.0 {
        return 0.0;
    }

    let visibility = visibility(tracer, from, to, distance);
    if visibility == 0.0 {
        return 0.0;
    }

    visibility * cos_source * cos_receiver / (PI * distance_squared) / source.area()
}

/// Fraction of the two shadow rays (there and back) that reach the other
/// point unobstructed.
fn visibility(tracer: &RayTracer, from: Vec3, to: Vec3, distance: f32) -> f32 {
    let tolerance = tracer.config().shadow_tolerance;
    let reaches = |start: Vec3, end: Vec3| {
        let mut hit = Hit::new();
        tracer.cast_ray(&Ray::between(start, end), &mut hit, true);
        hit.t >= distance - tolerance
    };

    let blocked = [reaches(from, to), reaches(to, from)]
        .iter()
        .filter(|&&clear| !clear)
        .count();
    1.0 - blocked as f32 * 0.5
}
