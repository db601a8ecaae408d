//! The seam between the orchestrator and whatever executes passes.

use glam::Mat4;

use crate::effects::SiltLayer;
use crate::render_graph::{ClipPlane, GodRayGeometry, RenderPass, ScreenQuad, TextureRegistry};
use crate::scene_index::DrawItem;
use crate::scene_mask::SceneMask;
use crate::uniforms::UniformTable;

/// Which shared table a push or pop refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateLayer {
    Global,
    Surface,
    /// A pass's own uniforms, active between its begin and end.
    Pass,
}

/// A pass about to run, with the matrices it runs under this frame.
///
/// Camera-matched passes (captures and chain heads) get the active camera's
/// matrices; quad passes get their own fixed ones.
#[derive(Clone, Copy, Debug)]
pub struct PassInvocation<'a> {
    pub pass: &'a RenderPass,
    pub view: Mat4,
    pub projection: Mat4,
}

impl<'a> PassInvocation<'a> {
    /// Runs `pass` with its own matrices.
    pub fn fixed(pass: &'a RenderPass) -> Self {
        Self {
            pass,
            view: pass.view,
            projection: pass.projection,
        }
    }
}

/// A draw issued inside a pass or straight into the main view.
#[derive(Clone, Copy, Debug)]
pub enum DrawCommand<'a> {
    /// Scene content of `category`, clipped by `clip_planes`.
    Scene {
        category: SceneMask,
        items: &'a [DrawItem],
        clip_planes: &'a [ClipPlane],
    },
    Quad(&'a ScreenQuad),
    GodRays(&'a GodRayGeometry),
    /// Underwater particulate with its tuning, clipped by `layer.clip`.
    Silt {
        items: &'a [DrawItem],
        layer: &'a SiltLayer,
    },
}

/// Executes the orchestrator's per-frame sequence.
///
/// Calls arrive strictly in frame order: a pass is bracketed by
/// [`begin_pass`](Self::begin_pass) and [`end_pass`](Self::end_pass), state
/// pushes are always balanced by pops of the same layer, and draws outside
/// any pass target the main view.
///
/// # Implementing an Executor
///
/// ```ignore
/// struct Logger;
///
/// impl PassExecutor for Logger {
///     fn begin_pass(&mut self, invocation: &PassInvocation<'_>) {
///         println!("begin {}", invocation.pass.label);
///     }
///     fn end_pass(&mut self, pass: &RenderPass) {
///         println!("end {}", pass.label);
///     }
///     fn push_state(&mut self, _layer: StateLayer, _uniforms: &UniformTable) {}
///     fn pop_state(&mut self, _layer: StateLayer) {}
///     fn draw(&mut self, command: DrawCommand<'_>) {
///         println!("draw {command:?}");
///     }
/// }
/// ```
pub trait PassExecutor {
    /// Called once after every pipeline rebuild, before the frame's first
    /// pass, with the rebuilt pipeline's textures.
    fn pipeline_rebuilt(&mut self, _textures: &TextureRegistry) {}

    fn begin_pass(&mut self, invocation: &PassInvocation<'_>);

    fn end_pass(&mut self, pass: &RenderPass);

    /// Makes `uniforms` active until the matching [`pop_state`](Self::pop_state).
    fn push_state(&mut self, layer: StateLayer, uniforms: &UniformTable);

    fn pop_state(&mut self, layer: StateLayer);

    fn draw(&mut self, command: DrawCommand<'_>);
}
