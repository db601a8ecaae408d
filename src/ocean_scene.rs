//! The per-frame effect orchestrator.
//!
//! [`OceanScene`] owns the effect configuration, the host's scene content
//! registration and the [`Pipeline`] built from them. Every frame the host
//! calls [`OceanScene::traverse`] with the active camera, its ocean surface
//! and an executor. The orchestrator then:
//!
//! 1. rebuilds the pipeline if a setter or a surface height change asked for it
//! 2. picks the above- or below-water branch and swaps fog presets on a crossing
//! 3. refreshes the per-frame uniforms
//! 4. runs the refraction and heightmap captures
//! 5. runs the branch's pre-render passes (reflection and glare above, god
//!    rays and depth of field below)
//! 6. culls the main view unless a chain capture already drew it
//! 7. runs the branch's composites
//!
//! Cameras whose [`CameraRole`](crate::CameraRole) bypasses effects get a
//! plain traversal instead.
//!
//! # Example
//!
//! ```ignore
//! let mut scene = OceanScene::new(EffectConfig::new().with_effect(Effect::Reflections, true))?;
//! scene.add_node(NodeId(1), SceneMask::REFLECTION | SceneMask::NORMAL);
//!
//! let mut recorder = FrameRecorder::new();
//! let report = scene.traverse(&camera, &mut surface, &mut recorder);
//! println!("{:?}: {:?}", report.branch, report.passes);
//! ```

use glam::{Mat4, Vec3};

use crate::camera::CameraView;
use crate::config::{Effect, EffectConfig};
use crate::effects::reflection_view;
use crate::error::Result;
use crate::pipeline::{Pipeline, build_pipeline};
use crate::render_graph::{
    ClipPlane, DrawCommand, PassChain, PassContent, PassExecutor, PassInvocation, RenderPass,
    StateLayer,
};
use crate::scene_index::{NodeId, SceneContent, SceneIndex};
use crate::scene_mask::SceneMask;
use crate::uniforms::UniformKey;

/// The ocean surface technique, seen from the orchestrator.
///
/// Wave simulation and surface geometry live behind this trait; the
/// orchestrator only needs visibility, the water height and a way to ask for
/// a shader recompile.
pub trait OceanSurface {
    /// Scene node carrying the surface geometry.
    fn node(&self) -> NodeId;

    /// Whether any part of the surface can be seen from `camera`.
    fn is_visible(&self, camera: &CameraView, above_water: bool) -> bool;

    fn surface_height(&self) -> f32;

    fn set_surface_height(&mut self, height: f32);

    /// Requests a shader rebuild after the defines it compiles against changed.
    fn mark_dirty(&mut self);

    /// A disabled surface is never drawn, but captures still run.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Per-frame hook, called once per traversal before any pass runs.
    fn update(&mut self, _camera: &CameraView) {}
}

/// Whether the next traversal must rebuild the pipeline first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    RebuildPending,
    Ready,
}

/// Which branch a traversal took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaterBranch {
    AboveWater,
    BelowWater,
    /// Shadow or analysis camera: plain traversal, no effects.
    Bypass,
}

/// What one traversal did.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub branch: WaterBranch,
    pub rebuilt: bool,
    pub surface_visible: bool,
    pub main_cull_ran: bool,
    /// Labels of executed passes, in execution order.
    pub passes: Vec<String>,
}

/// The eye counts as above water when level with the surface.
pub fn is_above_water(eye_z: f32, surface_height: f32) -> bool {
    eye_z >= surface_height
}

/// Orchestrates the ocean effect passes around a host scene.
#[derive(Debug)]
pub struct OceanScene {
    config: EffectConfig,
    content: SceneContent,
    state: OrchestratorState,
    pipeline: Option<Pipeline>,
    index: SceneIndex,
    eye_above_previous_frame: bool,
    rebuild_count: usize,
}

impl OceanScene {
    /// Creates an orchestrator. The pipeline is built on the first traversal.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate.
    pub fn new(config: EffectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            content: SceneContent::new(),
            state: OrchestratorState::RebuildPending,
            pipeline: None,
            index: SceneIndex::default(),
            eye_above_previous_frame: true,
            rebuild_count: 0,
        })
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// The current pipeline, once the first traversal has built it.
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Number of rebuilds performed so far.
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    pub fn content(&self) -> &SceneContent {
        &self.content
    }

    /// Registers scene content. Takes effect at the next rebuild.
    pub fn add_node(&mut self, node: NodeId, mask: SceneMask) {
        self.content.insert(node, mask);
        self.mark_dirty();
    }

    pub fn remove_node(&mut self, node: NodeId) -> bool {
        let removed = self.content.remove(node);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub fn set_effect_enabled(&mut self, effect: Effect, enabled: bool) {
        self.config.set_enabled(effect, enabled);
        self.mark_dirty();
    }

    /// Flips `effect`, returning its new state.
    pub fn toggle_effect(&mut self, effect: Effect) -> bool {
        let enabled = !self.config.is_enabled(effect);
        self.set_effect_enabled(effect, enabled);
        log::debug!("{} {}", effect.name(), if enabled { "on" } else { "off" });
        enabled
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate; the current configuration is kept.
    pub fn set_config(&mut self, config: EffectConfig) -> Result<()> {
        if let Err(err) = config.validate() {
            log::warn!("Rejected effect configuration: {err}");
            return Err(err);
        }
        self.config = config;
        self.mark_dirty();
        Ok(())
    }

    /// Edits a copy of the configuration and applies it if it validates.
    pub fn update_config(&mut self, edit: impl FnOnce(&mut EffectConfig)) -> Result<()> {
        let mut config = self.config.clone();
        edit(&mut config);
        self.set_config(config)
    }

    /// Raises (or with a negative `delta`, lowers) the water plane.
    pub fn adjust_surface_height<S>(&mut self, surface: &mut S, delta: f32)
    where
        S: OceanSurface + ?Sized,
    {
        let height = surface.surface_height() + delta;
        surface.set_surface_height(height);
        log::debug!("surface height now {height}");
        self.mark_dirty();
    }

    pub fn mark_dirty(&mut self) {
        self.state = OrchestratorState::RebuildPending;
    }

    /// Rebuilds the pipeline and the content index right away.
    pub fn rebuild<S>(&mut self, surface: &mut S)
    where
        S: OceanSurface + ?Sized,
    {
        let height = surface.surface_height();
        let previous_defines = self.pipeline.as_ref().map(Pipeline::shader_defines);
        let pipeline = build_pipeline(&self.config, height);

        if previous_defines != Some(pipeline.shader_defines()) {
            surface.mark_dirty();
        }

        self.index = SceneIndex::build(
            &self.content,
            Some(surface.node()),
            pipeline.silt().is_some(),
        );
        self.pipeline = Some(pipeline);
        // Fog was reset to the above-water preset with the uniform tables.
        self.eye_above_previous_frame = true;
        self.state = OrchestratorState::Ready;
        self.rebuild_count += 1;
    }

    /// Runs one frame for `camera`.
    ///
    /// # Panics
    ///
    /// Panics if a pass without content is reached, or if the executor
    /// rejects the call sequence.
    pub fn traverse<S, E>(
        &mut self,
        camera: &CameraView,
        surface: &mut S,
        executor: &mut E,
    ) -> FrameReport
    where
        S: OceanSurface + ?Sized,
        E: PassExecutor + ?Sized,
    {
        if camera.role.bypasses_effects() {
            return self.plain_traversal(camera, surface, executor);
        }

        let height = surface.surface_height();
        let rebuilt = match self.state {
            OrchestratorState::RebuildPending => {
                log::debug!("rebuilding pipeline: configuration changed");
                true
            }
            OrchestratorState::Ready
                if self.pipeline.as_ref().map(Pipeline::surface_height) != Some(height) =>
            {
                log::debug!("rebuilding pipeline: surface height moved to {height}");
                true
            }
            OrchestratorState::Ready => false,
        };
        if rebuilt {
            self.rebuild(surface);
            if let Some(pipeline) = &self.pipeline {
                executor.pipeline_rebuilt(pipeline.textures());
            }
        }

        surface.update(camera);

        let eye = camera.eye();
        let above = is_above_water(eye.z, height);
        let surface_visible = surface.is_visible(camera, above);

        let Some(pipeline) = self.pipeline.as_mut() else {
            panic!("pipeline missing after rebuild");
        };

        if above != self.eye_above_previous_frame {
            log::debug!(
                "eye crossed the surface, now {} water",
                if above { "above" } else { "below" }
            );
            apply_fog(pipeline, above);
            self.eye_above_previous_frame = above;
        }

        let config = pipeline.config();
        let reflection_visible =
            above && config.reflections && eye.z < config.reflection_cutoff - height;
        let refraction_allowed = eye.z > config.refraction_cutoff;
        refresh_uniforms(pipeline, camera, eye, above, height, reflection_visible);

        let pipeline: &Pipeline = pipeline;
        let mut frame = FrameRun {
            pipeline,
            index: &self.index,
            camera,
            above,
            draw_surface: surface_visible && surface.is_enabled(),
            passes: Vec::new(),
        };

        if surface_visible && refraction_allowed {
            if let Some(refraction) = pipeline.refraction() {
                frame.run_capture(executor, camera_matched(&refraction.pass, camera));
            }
            if let (Some(_), Some(heightmap)) = (pipeline.refraction(), pipeline.heightmap()) {
                frame.run_capture(executor, camera_matched(&heightmap.pass, camera));
            }
        }

        if above {
            if let Some(reflection) = pipeline.reflection() {
                if surface_visible && reflection_visible {
                    frame.run_capture(
                        executor,
                        PassInvocation {
                            pass: &reflection.pass,
                            view: reflection_view(camera.view, height),
                            projection: camera.projection,
                        },
                    );
                }
            }
            if let Some(glare) = pipeline.glare() {
                frame.run_leading(executor, glare);
            }
        } else {
            if let Some(god_rays) = pipeline.god_rays() {
                frame.run_pass(executor, camera_matched(&god_rays.pre, camera));
            }
            if let Some(dof) = pipeline.dof() {
                frame.run_leading(executor, dof);
            }
        }

        // A chain capture already drew the full scene.
        let chain_captured = if above {
            pipeline.glare().is_some()
        } else {
            pipeline.dof().is_some()
        };
        if !chain_captured {
            frame.main_cull(executor);
        }

        if above {
            if let Some(glare) = pipeline.glare() {
                frame.run_pass(executor, PassInvocation::fixed(glare.last()));
            }
        } else {
            if let Some(dof) = pipeline.dof() {
                frame.run_pass(executor, PassInvocation::fixed(dof.last()));
            }
            if let Some(god_rays) = pipeline.god_rays() {
                frame.run_pass(executor, PassInvocation::fixed(&god_rays.post));
            }
        }

        FrameReport {
            branch: if above {
                WaterBranch::AboveWater
            } else {
                WaterBranch::BelowWater
            },
            rebuilt,
            surface_visible,
            main_cull_ran: !chain_captured,
            passes: frame.passes,
        }
    }

    fn plain_traversal<S, E>(
        &self,
        camera: &CameraView,
        surface: &S,
        executor: &mut E,
    ) -> FrameReport
    where
        S: OceanSurface + ?Sized,
        E: PassExecutor + ?Sized,
    {
        log::debug!(
            "camera `{}` ({:?}) bypasses ocean effects",
            camera.name,
            camera.role
        );
        let silt = self
            .pipeline
            .as_ref()
            .is_some_and(|pipeline| pipeline.silt().is_some());
        let index = SceneIndex::build(&self.content, Some(surface.node()), silt);
        let items = index.matching(camera.traversal_mask);
        if !items.is_empty() {
            executor.draw(DrawCommand::Scene {
                category: camera.traversal_mask,
                items: &items,
                clip_planes: &[],
            });
        }

        FrameReport {
            branch: WaterBranch::Bypass,
            rebuilt: false,
            surface_visible: false,
            main_cull_ran: false,
            passes: Vec::new(),
        }
    }
}

fn apply_fog(pipeline: &mut Pipeline, above: bool) {
    let preset = if above {
        pipeline.config().above_water_fog
    } else {
        pipeline.config().underwater_fog
    };
    let global = pipeline.global_uniforms_mut();
    global.set(UniformKey::FogDensity, preset.density);
    global.set(UniformKey::FogColor, preset.color);
}

fn refresh_uniforms(
    pipeline: &mut Pipeline,
    camera: &CameraView,
    eye: Vec3,
    above: bool,
    height: f32,
    reflection_visible: bool,
) {
    let refractions = pipeline.config().refractions;

    let global = pipeline.global_uniforms_mut();
    global.set(UniformKey::EyeUnderwater, !above);
    global.set(UniformKey::EyePosition, eye);
    global.set(UniformKey::WaterHeight, height);

    let surface = pipeline.surface_uniforms_mut();
    surface.set(
        UniformKey::ViewportDimensions,
        camera.viewport.size().as_vec2(),
    );
    surface.set(UniformKey::EnableRefractions, refractions);
    surface.set(UniformKey::EnableReflections, reflection_visible);
    surface.set(
        UniformKey::RefractionInverseTransform,
        inverse_view_projection(camera),
    );
}

/// Maps clip space back to world space for `camera`.
pub fn inverse_view_projection(camera: &CameraView) -> Mat4 {
    (camera.projection * camera.view).inverse()
}

fn camera_matched<'a>(pass: &'a RenderPass, camera: &CameraView) -> PassInvocation<'a> {
    PassInvocation {
        pass,
        view: camera.view,
        projection: camera.projection,
    }
}

/// Borrowed state for the passes of one frame.
struct FrameRun<'a> {
    pipeline: &'a Pipeline,
    index: &'a SceneIndex,
    camera: &'a CameraView,
    above: bool,
    draw_surface: bool,
    passes: Vec<String>,
}

impl FrameRun<'_> {
    /// Runs a scene capture with the global state active.
    fn run_capture<E>(&mut self, executor: &mut E, invocation: PassInvocation<'_>)
    where
        E: PassExecutor + ?Sized,
    {
        executor.push_state(StateLayer::Global, self.pipeline.global_uniforms());
        self.run_pass(executor, invocation);
        executor.pop_state(StateLayer::Global);
    }

    /// Runs every pass of `chain` but the last. The head follows the camera.
    fn run_leading<E>(&mut self, executor: &mut E, chain: &PassChain)
    where
        E: PassExecutor + ?Sized,
    {
        for (i, pass) in chain.leading().iter().enumerate() {
            let invocation = if i == 0 {
                camera_matched(pass, self.camera)
            } else {
                PassInvocation::fixed(pass)
            };
            self.run_pass(executor, invocation);
        }
    }

    fn run_pass<E>(&mut self, executor: &mut E, invocation: PassInvocation<'_>)
    where
        E: PassExecutor + ?Sized,
    {
        let pass = invocation.pass;
        assert!(
            !matches!(pass.content, PassContent::Unset),
            "pass `{}` has no content attached",
            pass.label
        );
        log::trace!("pass `{}`", pass.label);
        self.passes.push(pass.label.clone());

        executor.begin_pass(&invocation);
        let has_state = !pass.state.is_empty();
        if has_state {
            executor.push_state(StateLayer::Pass, &pass.state);
        }

        match &pass.content {
            PassContent::SceneSubset => {
                self.draw_subset(executor, pass.cull_mask, &pass.clip_planes)
            }
            PassContent::FullScene => self.main_cull(executor),
            PassContent::Quad(quad) => executor.draw(DrawCommand::Quad(quad)),
            PassContent::GodRays(geometry) => executor.draw(DrawCommand::GodRays(geometry)),
            PassContent::Unset => unreachable!(),
        }

        if has_state {
            executor.pop_state(StateLayer::Pass);
        }
        executor.end_pass(pass);
    }

    /// Surface, then normal content, then silt below water.
    fn main_cull<E>(&mut self, executor: &mut E)
    where
        E: PassExecutor + ?Sized,
    {
        executor.push_state(StateLayer::Global, self.pipeline.global_uniforms());
        if self.draw_surface {
            executor.push_state(StateLayer::Surface, self.pipeline.surface_uniforms());
            self.draw_category(executor, SceneMask::SURFACE, &[]);
            executor.pop_state(StateLayer::Surface);
        }
        self.draw_category(executor, SceneMask::NORMAL, &[]);
        executor.pop_state(StateLayer::Global);

        if !self.above {
            if let Some(layer) = self.pipeline.silt() {
                let items = self.index.category(SceneMask::SILT);
                if self.camera.traversal_mask.contains(SceneMask::SILT) && !items.is_empty() {
                    executor.draw(DrawCommand::Silt { items, layer });
                }
            }
        }
    }

    fn draw_category<E>(&self, executor: &mut E, category: SceneMask, clip_planes: &[ClipPlane])
    where
        E: PassExecutor + ?Sized,
    {
        if !self.camera.traversal_mask.contains(category) {
            return;
        }
        let items = self.index.category(category);
        if !items.is_empty() {
            executor.draw(DrawCommand::Scene {
                category,
                items,
                clip_planes,
            });
        }
    }

    fn draw_subset<E>(&self, executor: &mut E, mask: SceneMask, clip_planes: &[ClipPlane])
    where
        E: PassExecutor + ?Sized,
    {
        let category = mask & self.camera.traversal_mask;
        if category.is_empty() {
            return;
        }
        let items = self.index.matching(category);
        if !items.is_empty() {
            executor.draw(DrawCommand::Scene {
                category,
                items: &items,
                clip_planes,
            });
        }
    }
}
