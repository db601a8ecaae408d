//! Flies a camera down through the water plane and logs what each frame ran.
//!
//! Runs on a headless GPU when one is available and falls back to recording
//! frames otherwise. `RUST_LOG=debug` shows rebuilds and surface crossings,
//! `RUST_LOG=trace` every pass and draw.

use seascape::render_graph::TextureRegistry;
use seascape::{
    CameraView, Effect, EffectConfig, FrameRecorder, FrameReport, GpuContext, GpuExecutor, NodeId,
    OceanScene, OceanSurface, PassExecutor, SceneMask, Vec3, Viewport,
};

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;
const FRAMES: u32 = 9;

struct FlatWater {
    height: f32,
    recompiles: u32,
}

impl OceanSurface for FlatWater {
    fn node(&self) -> NodeId {
        NodeId(0)
    }

    fn is_visible(&self, _camera: &CameraView, _above_water: bool) -> bool {
        true
    }

    fn surface_height(&self) -> f32 {
        self.height
    }

    fn set_surface_height(&mut self, height: f32) {
        self.height = height;
    }

    fn mark_dirty(&mut self) {
        self.recompiles += 1;
    }
}

/// Eye height drops from 20 to -20 over the run.
fn camera_for(frame: u32) -> CameraView {
    let z = 20.0 - 40.0 * frame as f32 / (FRAMES - 1) as f32;
    CameraView::looking_at(
        Vec3::new(0.0, -60.0, z),
        Vec3::new(0.0, 0.0, z * 0.5),
        60.0,
        Viewport::new(0, 0, WIDTH, HEIGHT),
    )
    .with_name("MainCamera")
}

fn log_report(frame: u32, report: &FrameReport) {
    log::info!(
        "frame {frame}: {:?}{}, main cull: {}, passes: [{}]",
        report.branch,
        if report.rebuilt { " (rebuilt)" } else { "" },
        report.main_cull_ran,
        report.passes.join(", ")
    );
}

fn populate(scene: &mut OceanScene) {
    scene.add_node(
        NodeId(1),
        SceneMask::REFLECTION | SceneMask::REFRACTION | SceneMask::NORMAL | SceneMask::HEIGHTMAP,
    );
    scene.add_node(NodeId(2), SceneMask::REFLECTION | SceneMask::NORMAL);
    scene.add_node(NodeId(3), SceneMask::REFLECTION);
}

/// Halfway down, swap glare for depth of field.
fn script(frame: u32, scene: &mut OceanScene) {
    if frame == FRAMES / 2 {
        scene.toggle_effect(Effect::Glare);
        scene.toggle_effect(Effect::DepthOfField);
    }
}

fn run_on_gpu(gpu: &GpuContext, scene: &mut OceanScene, surface: &mut FlatWater) {
    // Targets are allocated on the first frame's rebuild.
    let mut executor = GpuExecutor::new(gpu, &TextureRegistry::new());

    for frame in 0..FRAMES {
        script(frame, scene);
        executor.begin_frame();
        let report = scene.traverse(&camera_for(frame), surface, &mut executor);
        let draws = executor.finish_frame();
        log_report(frame, &report);
        log::debug!("frame {frame}: {draws} draws submitted");
    }

    executor.begin_frame();
    shadow_frame(scene, surface, &mut executor);
    executor.finish_frame();
}

fn run_recorded(scene: &mut OceanScene, surface: &mut FlatWater) {
    let mut recorder = FrameRecorder::new();
    for frame in 0..FRAMES {
        script(frame, scene);
        let report = scene.traverse(&camera_for(frame), surface, &mut recorder);
        log_report(frame, &report);
        log::debug!("frame {frame}: {} events", recorder.take().len());
    }

    shadow_frame(scene, surface, &mut recorder);
}

fn shadow_frame<E: PassExecutor>(
    scene: &mut OceanScene,
    surface: &mut FlatWater,
    executor: &mut E,
) {
    let camera = camera_for(0).with_name("ShadowCamera");
    let report = scene.traverse(&camera, surface, executor);
    log::info!("shadow camera: {:?}", report.branch);
}

fn main() -> seascape::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EffectConfig::new()
        .with_screen_size(WIDTH, HEIGHT)
        .with_effect(Effect::Reflections, true)
        .with_effect(Effect::Refractions, true)
        .with_effect(Effect::Heightmap, true)
        .with_effect(Effect::GodRays, true)
        .with_effect(Effect::Glare, true)
        .with_effect(Effect::Silt, true);
    let mut scene = OceanScene::new(config)?;
    populate(&mut scene);

    let mut surface = FlatWater {
        height: 0.0,
        recompiles: 0,
    };

    match GpuContext::headless(WIDTH, HEIGHT) {
        Ok(gpu) => run_on_gpu(&gpu, &mut scene, &mut surface),
        Err(err) => {
            log::warn!("No GPU available ({err}), recording frames instead");
            run_recorded(&mut scene, &mut surface);
        }
    }

    log::info!(
        "{} rebuilds, {} surface recompiles",
        scene.rebuild_count(),
        surface.recompiles
    );
    Ok(())
}
