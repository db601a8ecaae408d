//! The pass node of the effect graph.
//!
//! A [`RenderPass`] describes one GPU pass completely: camera matrices,
//! viewport, clear behaviour, output attachments and what it draws. It holds
//! no GPU objects and no references to the scene; an executor turns it into
//! real work.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::camera::Viewport;
use crate::render_graph::TextureId;
use crate::scene_mask::SceneMask;
use crate::shader::ShaderProgram;
use crate::uniforms::UniformTable;

/// Which attachment slot a pass output is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color(u32),
    Depth,
}

/// One output of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassTarget {
    pub texture: TextureId,
    pub attachment: Attachment,
}

/// What a pass clears before drawing. `None` keeps the existing contents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearMode {
    pub color: Option<Vec4>,
    pub depth: Option<f32>,
}

impl ClearMode {
    /// Opaque black and far depth.
    pub const COLOR_AND_DEPTH: ClearMode = ClearMode {
        color: Some(Vec4::new(0.0, 0.0, 0.0, 1.0)),
        depth: Some(1.0),
    };

    pub const DEPTH_ONLY: ClearMode = ClearMode {
        color: None,
        depth: Some(1.0),
    };

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = Some(color);
        self
    }
}

impl Default for ClearMode {
    fn default() -> Self {
        Self::COLOR_AND_DEPTH
    }
}

/// How a pass's matrices relate to the scene transform stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReferenceFrame {
    /// Matrices compose with parent transforms.
    #[default]
    Relative,
    /// Matrices replace parent transforms; the main viewpoint is still used
    /// for level-of-detail decisions.
    Absolute,
}

/// A clip plane `ax + by + cz + d >= 0` keeps geometry on its positive side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipPlane {
    /// Hardware clip distance slot.
    pub index: u32,
    pub equation: Vec4,
}

impl ClipPlane {
    /// Keeps geometry above `height`.
    pub fn above(index: u32, height: f32) -> Self {
        Self {
            index,
            equation: Vec4::new(0.0, 0.0, 1.0, -height),
        }
    }

    /// Keeps geometry at or below `height`.
    pub fn below(index: u32, height: f32) -> Self {
        Self {
            index,
            equation: Vec4::new(0.0, 0.0, -1.0, height),
        }
    }

    /// Signed distance of `point` from the plane.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.equation.truncate().dot(point) + self.equation.w
    }
}

/// A texture sampled by a quad on a given unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub unit: u32,
    pub texture: TextureId,
}

/// A full-screen quad drawn with a fixed program.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenQuad {
    pub program: ShaderProgram,
    /// Quad extent in the pass's orthographic units.
    pub size: Vec2,
    /// Texture coordinate range across the quad.
    pub tex_coord_scale: Vec2,
    pub inputs: Vec<TextureBinding>,
    pub uniforms: UniformTable,
    /// Enables the distortion term of [`ShaderProgram::Distortion`].
    pub distortion: bool,
}

impl ScreenQuad {
    pub fn new(program: ShaderProgram, size: Vec2) -> Self {
        Self {
            program,
            size,
            tex_coord_scale: Vec2::ONE,
            inputs: Vec::new(),
            uniforms: UniformTable::new(),
            distortion: false,
        }
    }

    pub fn with_tex_coord_scale(mut self, scale: Vec2) -> Self {
        self.tex_coord_scale = scale;
        self
    }

    pub fn with_input(mut self, unit: u32, texture: TextureId) -> Self {
        self.inputs.push(TextureBinding { unit, texture });
        self
    }

    pub fn with_uniforms(mut self, uniforms: UniformTable) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_distortion(mut self, enabled: bool) -> Self {
        self.distortion = enabled;
        self
    }

    /// Texture bound on `unit`, if any.
    pub fn input(&self, unit: u32) -> Option<TextureId> {
        self.inputs
            .iter()
            .find(|binding| binding.unit == unit)
            .map(|binding| binding.texture)
    }
}

/// Parameters handed to the external god-ray geometry generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GodRayGeometry {
    pub ray_count: u32,
    pub sun_direction: Vec3,
    pub surface_height: f32,
}

/// What a pass draws.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PassContent {
    /// Nothing attached yet. Executing such a pass is a programming error.
    #[default]
    Unset,
    /// Scene content matching the pass's cull mask.
    SceneSubset,
    /// The complete main-view cull (surface, normal content and silt).
    FullScene,
    Quad(ScreenQuad),
    GodRays(GodRayGeometry),
}

/// One GPU pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    pub label: String,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
    pub clear: ClearMode,
    pub reference_frame: ReferenceFrame,
    /// Output attachments. Empty means the pass renders into the frame.
    pub targets: Vec<PassTarget>,
    pub content: PassContent,
    /// Content selection for [`PassContent::SceneSubset`].
    pub cull_mask: SceneMask,
    pub clip_planes: Vec<ClipPlane>,
    pub face_culling: bool,
    pub depth_compare: Option<wgpu::CompareFunction>,
    /// Replaces the programs of everything drawn in this pass.
    pub program_override: Option<ShaderProgram>,
    /// Pass-local uniforms, active while the pass runs.
    pub state: UniformTable,
}

impl RenderPass {
    /// An empty pass rendering into the frame.
    pub fn new(label: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            label: label.into(),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport,
            clear: ClearMode::default(),
            reference_frame: ReferenceFrame::default(),
            targets: Vec::new(),
            content: PassContent::Unset,
            cull_mask: SceneMask::empty(),
            clip_planes: Vec::new(),
            face_culling: true,
            depth_compare: None,
            program_override: None,
            state: UniformTable::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_matrices(mut self, view: Mat4, projection: Mat4) -> Self {
        self.view = view;
        self.projection = projection;
        self
    }

    pub fn with_clear(mut self, clear: ClearMode) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_reference_frame(mut self, frame: ReferenceFrame) -> Self {
        self.reference_frame = frame;
        self
    }

    /// Draws scene content tagged with any bit of `mask`.
    pub fn with_scene(mut self, mask: SceneMask) -> Self {
        self.content = PassContent::SceneSubset;
        self.cull_mask = mask;
        self
    }

    /// Draws the complete main-view cull.
    pub fn with_full_scene(mut self) -> Self {
        self.content = PassContent::FullScene;
        self
    }

    pub fn with_quad(mut self, quad: ScreenQuad) -> Self {
        self.content = PassContent::Quad(quad);
        self
    }

    pub fn with_god_rays(mut self, geometry: GodRayGeometry) -> Self {
        self.content = PassContent::GodRays(geometry);
        self
    }

    pub fn with_clip_plane(mut self, plane: ClipPlane) -> Self {
        self.clip_planes.push(plane);
        self
    }

    pub fn with_face_culling(mut self, enabled: bool) -> Self {
        self.face_culling = enabled;
        self
    }

    pub fn with_depth_compare(mut self, compare: wgpu::CompareFunction) -> Self {
        self.depth_compare = Some(compare);
        self
    }

    pub fn with_program_override(mut self, program: ShaderProgram) -> Self {
        self.program_override = Some(program);
        self
    }

    pub fn with_state(mut self, state: UniformTable) -> Self {
        self.state = state;
        self
    }

    /// Texture written to `attachment`, if any.
    pub fn target(&self, attachment: Attachment) -> Option<TextureId> {
        self.targets
            .iter()
            .find(|target| target.attachment == attachment)
            .map(|target| target.texture)
    }

    /// The quad this pass draws.
    ///
    /// # Panics
    ///
    /// Panics if the pass does not draw a quad.
    pub fn quad(&self) -> &ScreenQuad {
        match &self.content {
            PassContent::Quad(quad) => quad,
            other => panic!("pass `{}` draws {:?}, not a quad", self.label, other),
        }
    }

    pub fn renders_to_frame(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_plane_above_keeps_points_over_the_surface() {
        let plane = ClipPlane::above(0, 3.0);
        assert!(plane.distance(Vec3::new(0.0, 0.0, 4.0)) > 0.0);
        assert!(plane.distance(Vec3::new(0.0, 0.0, 2.0)) < 0.0);
    }

    #[test]
    fn clip_plane_below_keeps_points_under_the_surface() {
        let plane = ClipPlane::below(1, -2.0);
        assert!(plane.distance(Vec3::new(5.0, 1.0, -3.0)) > 0.0);
        assert!(plane.distance(Vec3::new(5.0, 1.0, -1.0)) < 0.0);
    }

    #[test]
    fn new_pass_has_no_content() {
        let pass = RenderPass::new("empty", Viewport::new(0, 0, 4, 4));
        assert_eq!(pass.content, PassContent::Unset);
        assert!(pass.renders_to_frame());
        assert_eq!(pass.clear, ClearMode::COLOR_AND_DEPTH);
    }

    #[test]
    #[should_panic(expected = "not a quad")]
    fn quad_accessor_panics_on_scene_pass() {
        RenderPass::new("scene", Viewport::new(0, 0, 4, 4))
            .with_scene(SceneMask::NORMAL)
            .quad();
    }
}
