//! # Seascape
//!
//! **Render-pass orchestration for ocean scenes.**
//!
//! Seascape decides, every frame, which off-screen passes an ocean scene
//! needs and runs them in the right order: planar reflection, refraction
//! with depth, a shoreline heightmap, god rays, depth of field, glare and
//! underwater silt. Which effects exist is configuration; which of them run
//! depends on where the eye is relative to the water.
//!
//! ## Quick Start
//!
//! ```no_run
//! use seascape::*;
//!
//! struct FlatWater {
//!     height: f32,
//! }
//!
//! impl OceanSurface for FlatWater {
//!     fn node(&self) -> NodeId {
//!         NodeId(0)
//!     }
//!     fn is_visible(&self, _camera: &CameraView, _above_water: bool) -> bool {
//!         true
//!     }
//!     fn surface_height(&self) -> f32 {
//!         self.height
//!     }
//!     fn set_surface_height(&mut self, height: f32) {
//!         self.height = height;
//!     }
//!     fn mark_dirty(&mut self) {}
//! }
//!
//! let config = EffectConfig::new()
//!     .with_effect(Effect::Reflections, true)
//!     .with_effect(Effect::Refractions, true);
//! let mut scene = OceanScene::new(config)?;
//! scene.add_node(NodeId(1), SceneMask::REFLECTION | SceneMask::REFRACTION | SceneMask::NORMAL);
//!
//! let camera = CameraView::looking_at(
//!     Vec3::new(0.0, -40.0, 12.0),
//!     Vec3::ZERO,
//!     60.0,
//!     Viewport::new(0, 0, 1024, 768),
//! );
//! let mut surface = FlatWater { height: 0.0 };
//! let mut recorder = FrameRecorder::new();
//! let report = scene.traverse(&camera, &mut surface, &mut recorder);
//! assert_eq!(report.passes, ["refraction", "reflection"]);
//! # Ok::<(), SeascapeError>(())
//! ```
//!
//! ## Layout
//!
//! - [`EffectConfig`] - which effects exist and how they are tuned
//! - [`Pipeline`] - the passes, textures and uniform tables built from a config
//! - [`OceanScene`] - owns the pipeline and runs it per camera
//! - [`render_graph`] - pass data, the [`PassExecutor`] seam and its executors
//!
//! Frames run through a [`PassExecutor`]. [`FrameRecorder`] writes them down
//! for inspection; [`GpuExecutor`] encodes them with wgpu on a headless
//! [`GpuContext`].

mod camera;
mod config;
pub mod effects;
mod error;
mod gpu;
mod ocean_scene;
mod pipeline;
pub mod render_graph;
mod scene_index;
mod scene_mask;
mod shader;
mod uniforms;

pub use camera::{CameraRole, CameraView, Viewport};
pub use config::{
    DofSettings, Effect, EffectConfig, FogPreset, GlareSettings, GodRaySettings, SiltSettings,
    TextureUnits,
};
pub use error::{Result, SeascapeError};
pub use gpu::GpuContext;
pub use ocean_scene::{
    FrameReport, OceanScene, OceanSurface, OrchestratorState, WaterBranch,
    inverse_view_projection, is_above_water,
};
pub use pipeline::{ClipAttachment, PassSignature, Pipeline, build_pipeline};
pub use render_graph::{FrameRecorder, GpuExecutor, PassExecutor};
pub use scene_index::{DrawItem, NodeId, SceneContent, SceneIndex};
pub use scene_mask::SceneMask;
pub use shader::{ShaderDefines, ShaderProgram};
pub use uniforms::{
    GlobalUniformBlock, PassUniformBlock, SurfaceUniformBlock, UniformKey, UniformTable, UniformValue,
    default_global_uniforms, default_surface_uniforms, exp2_fog_density,
};

// Re-export glam math types for convenience
pub use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
