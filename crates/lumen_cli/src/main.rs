//! `lumen`: render a scene file to an image.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use lumen_core::{load_scene, Scene};
use lumen_renderer::{
    generate_buckets, render, BucketResult, Camera, ImageBuffer, PhotonMap, PixelSource, Radiosity,
    RadiosityView, RayTracer, RenderConfig, RenderControl,
};

mod cli;

use cli::{Args, Mode};

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().context("Invalid render config")?;

    let mut scene = load_scene(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;
    prepare_geometry(&mut scene, &args);

    let mut camera = Camera::from_settings(&scene.camera).with_resolution(args.width, args.height);
    camera.initialize();

    let image = match args.mode {
        Mode::Raytrace => render_raytraced(&scene, &config, &camera)?,
        Mode::Radiosity => render_radiosity(&scene, &config, &camera, &args)?,
    };

    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Wrote {}", args.output.display());

    Ok(())
}

/// Tessellate spheres (radiosity only) and subdivide patches.
fn prepare_geometry(scene: &mut Scene, args: &Args) {
    if args.mode == Mode::Radiosity && !scene.spheres.is_empty() {
        scene.rasterize_primitives(args.sphere_slices, args.sphere_stacks);
    }
    for _ in 0..args.subdivide {
        scene.subdivide();
    }
    log::info!("{} patches", scene.mesh.num_faces());
}

fn render_raytraced(scene: &Scene, config: &RenderConfig, camera: &Camera) -> Result<ImageBuffer> {
    let mut photon_map = PhotonMap::new();
    if config.gather_indirect {
        let mut rng = StdRng::seed_from_u64(config.seed);
        photon_map.trace_photons(&RayTracer::new(scene, config), &mut rng);
    }

    let mut tracer = RayTracer::new(scene, config);
    if photon_map.is_traced() {
        tracer = tracer.with_photon_map(&photon_map);
    }
    render_image(camera, &tracer, config)
}

fn render_radiosity(
    scene: &Scene,
    config: &RenderConfig,
    camera: &Camera,
    args: &Args,
) -> Result<ImageBuffer> {
    let tracer = RayTracer::new(scene, config);
    let mut radiosity = Radiosity::new(scene).context("Cannot solve radiosity")?;
    radiosity
        .solve(&tracer, args.max_iterations, args.threshold)
        .context("Radiosity failed")?;

    let view = RadiosityView {
        tracer,
        radiosity: &radiosity,
        mode: args.visualize.into(),
        interpolate: !args.flat,
    };
    render_image(camera, &view, config)
}

fn render_image(
    camera: &Camera,
    source: &dyn PixelSource,
    config: &RenderConfig,
) -> Result<ImageBuffer> {
    let total = generate_buckets(camera.image_width, camera.image_height, config.bucket_size).len();
    let mut done = 0;
    let progress = |result: &BucketResult| {
        done += 1;
        log::debug!(
            "Bucket {} at ({}, {}) done [{}/{}]",
            result.bucket.index,
            result.bucket.x,
            result.bucket.y,
            done,
            total
        );
    };

    let image = render(camera, source, config, &RenderControl::new(), progress)
        .context("Render failed")?;
    Ok(image)
}
