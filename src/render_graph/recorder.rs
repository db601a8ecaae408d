//! A [`PassExecutor`] that writes the frame down instead of rendering it.
//!
//! Useful for logging a frame's pass sequence, and for asserting on it in
//! tests without a GPU.
//!
//! # Example
//!
//! ```ignore
//! let mut recorder = FrameRecorder::new();
//! scene.traverse(&camera, &mut surface, &mut recorder);
//! for label in recorder.pass_labels() {
//!     println!("{label}");
//! }
//! ```

use glam::Mat4;

use crate::config::SiltSettings;
use crate::render_graph::{
    ClipPlane, DrawCommand, GodRayGeometry, PassExecutor, PassInvocation, RenderPass, StateLayer,
    TextureRegistry,
};
use crate::scene_index::DrawItem;
use crate::scene_mask::SceneMask;
use crate::shader::ShaderProgram;
use crate::uniforms::UniformTable;

/// One recorded executor call.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    /// The pipeline was rebuilt with this many textures.
    PipelineRebuilt {
        textures: usize,
    },
    BeginPass {
        label: String,
        view: Mat4,
        projection: Mat4,
    },
    EndPass {
        label: String,
    },
    /// A push, with the table as it was at push time.
    PushState(StateLayer, UniformTable),
    PopState(StateLayer),
    DrawScene {
        category: SceneMask,
        items: Vec<DrawItem>,
        clip_planes: Vec<ClipPlane>,
    },
    DrawQuad(ShaderProgram),
    DrawGodRays(GodRayGeometry),
    DrawSilt {
        items: Vec<DrawItem>,
        clip: ClipPlane,
        settings: SiltSettings,
    },
}

/// Records every executor call of a frame.
///
/// # Panics
///
/// Panics on unbalanced state pops or mismatched pass brackets, since the
/// orchestrator must never produce them.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    events: Vec<FrameEvent>,
    state_stack: Vec<StateLayer>,
    open_pass: Option<String>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[FrameEvent] {
        &self.events
    }

    /// Drains the recorded events, e.g. between frames.
    pub fn take(&mut self) -> Vec<FrameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Labels of executed passes in execution order.
    pub fn pass_labels(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                FrameEvent::BeginPass { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every scene item drawn in the frame, across all passes and the main view.
    pub fn drawn_items(&self) -> Vec<DrawItem> {
        self.events
            .iter()
            .filter_map(|event| match event {
                FrameEvent::DrawScene { items, .. } | FrameEvent::DrawSilt { items, .. } => {
                    Some(items.iter().copied())
                }
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Matrices a pass ran under, if it ran.
    pub fn pass_matrices(&self, label: &str) -> Option<(Mat4, Mat4)> {
        self.events.iter().find_map(|event| match event {
            FrameEvent::BeginPass {
                label: l,
                view,
                projection,
            } if l == label => Some((*view, *projection)),
            _ => None,
        })
    }

    /// Whether the stack is empty and no pass is open.
    pub fn is_balanced(&self) -> bool {
        self.state_stack.is_empty() && self.open_pass.is_none()
    }
}

impl PassExecutor for FrameRecorder {
    fn pipeline_rebuilt(&mut self, textures: &TextureRegistry) {
        assert!(
            self.open_pass.is_none(),
            "pipeline rebuilt inside pass `{}`",
            self.open_pass.as_deref().unwrap_or_default()
        );
        self.events.push(FrameEvent::PipelineRebuilt {
            textures: textures.len(),
        });
    }

    fn begin_pass(&mut self, invocation: &PassInvocation<'_>) {
        assert!(
            self.open_pass.is_none(),
            "pass `{}` began inside `{}`",
            invocation.pass.label,
            self.open_pass.as_deref().unwrap_or_default()
        );
        self.open_pass = Some(invocation.pass.label.clone());
        self.events.push(FrameEvent::BeginPass {
            label: invocation.pass.label.clone(),
            view: invocation.view,
            projection: invocation.projection,
        });
    }

    fn end_pass(&mut self, pass: &RenderPass) {
        assert_eq!(
            self.open_pass.as_deref(),
            Some(pass.label.as_str()),
            "ended a pass that was not open"
        );
        self.open_pass = None;
        self.events.push(FrameEvent::EndPass {
            label: pass.label.clone(),
        });
    }

    fn push_state(&mut self, layer: StateLayer, uniforms: &UniformTable) {
        self.state_stack.push(layer);
        self.events
            .push(FrameEvent::PushState(layer, uniforms.clone()));
    }

    fn pop_state(&mut self, layer: StateLayer) {
        assert_eq!(
            self.state_stack.pop(),
            Some(layer),
            "unbalanced pop of {layer:?}"
        );
        self.events.push(FrameEvent::PopState(layer));
    }

    fn draw(&mut self, command: DrawCommand<'_>) {
        let event = match command {
            DrawCommand::Scene {
                category,
                items,
                clip_planes,
            } => FrameEvent::DrawScene {
                category,
                items: items.to_vec(),
                clip_planes: clip_planes.to_vec(),
            },
            DrawCommand::Quad(quad) => FrameEvent::DrawQuad(quad.program),
            DrawCommand::GodRays(geometry) => FrameEvent::DrawGodRays(*geometry),
            DrawCommand::Silt { items, layer } => FrameEvent::DrawSilt {
                items: items.to_vec(),
                clip: layer.clip,
                settings: layer.settings,
            },
        };
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;

    #[test]
    fn records_pass_brackets_in_order() {
        let pass = RenderPass::new("a", Viewport::new(0, 0, 4, 4));
        let mut recorder = FrameRecorder::new();
        recorder.begin_pass(&PassInvocation::fixed(&pass));
        recorder.end_pass(&pass);
        assert_eq!(recorder.pass_labels(), ["a"]);
        assert!(recorder.is_balanced());
    }

    #[test]
    #[should_panic(expected = "unbalanced pop")]
    fn unbalanced_pop_panics() {
        let mut recorder = FrameRecorder::new();
        recorder.push_state(StateLayer::Global, &UniformTable::new());
        recorder.pop_state(StateLayer::Surface);
    }
}
