//! Planar reflection, refraction and heightmap captures.
//!
//! All three render a scene subset with the main camera's projection into
//! textures the ocean surface shader samples. Only the reflection alters the
//! view: it renders the world mirrored across the water plane.

use glam::{Mat4, Vec4};

use crate::config::EffectConfig;
use crate::render_graph::{
    Attachment, COLOR_FORMAT, ClearMode, ClipPlane, DEPTH_FORMAT, RenderPass, TextureId,
    TextureRegistry, render_to_multiple_targets, render_to_texture,
};
use crate::scene_mask::SceneMask;
use crate::shader::ShaderProgram;

/// Clear colour of the refraction capture: deep water seen through the surface.
pub const REFRACTION_CLEAR: Vec4 = Vec4::new(0.160784, 0.231372, 0.325490, 0.0);

/// Clip slot used by the reflection's water-plane clip.
pub const REFLECTION_CLIP_INDEX: u32 = 0;

/// Reflection across the plane `z = surface_height`.
///
/// Negates Z, then translates by `2 * surface_height` so that a point `d`
/// above the plane lands `d` below it.
pub fn mirror_matrix(surface_height: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::X,
        Vec4::Y,
        Vec4::new(0.0, 0.0, -1.0, 0.0),
        Vec4::new(0.0, 0.0, 2.0 * surface_height, 1.0),
    )
}

/// View matrix of the reflection pass: mirror the world, then view it.
pub fn reflection_view(camera_view: Mat4, surface_height: f32) -> Mat4 {
    camera_view * mirror_matrix(surface_height)
}

/// A capture pass and the textures it writes.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub pass: RenderPass,
    pub color: Option<TextureId>,
    pub depth: Option<TextureId>,
}

/// Reflection of the `REFLECTION` content, clipped to above the water.
///
/// Face culling is off because mirroring flips triangle winding.
pub fn build_reflection(
    registry: &mut TextureRegistry,
    config: &EffectConfig,
    surface_height: f32,
) -> Capture {
    let texture = registry.create("reflection", config.reflection_texture_size, COLOR_FORMAT);
    let pass = render_to_texture(registry, "reflection", texture)
        .with_clear(ClearMode::COLOR_AND_DEPTH.with_color(Vec4::ZERO))
        .with_scene(SceneMask::REFLECTION)
        .with_clip_plane(ClipPlane::above(REFLECTION_CLIP_INDEX, surface_height))
        .with_face_culling(false);

    Capture {
        pass,
        color: Some(texture),
        depth: None,
    }
}

/// Colour and depth of the `REFRACTION` content under the main camera.
pub fn build_refraction(registry: &mut TextureRegistry, config: &EffectConfig) -> Capture {
    let size = config.refraction_texture_size;
    let color = registry.create("refraction", size, COLOR_FORMAT);
    let depth = registry.create("refraction depth", size, DEPTH_FORMAT);
    let pass = render_to_multiple_targets(
        registry,
        "refraction",
        color,
        Attachment::Color(0),
        depth,
        Attachment::Depth,
    )
    .with_clear(ClearMode {
        color: Some(REFRACTION_CLEAR),
        depth: Some(1.0),
    })
    .with_scene(SceneMask::REFRACTION);

    Capture {
        pass,
        color: Some(color),
        depth: Some(depth),
    }
}

/// Depth of the `HEIGHTMAP` content, sampled by the surface for shoreline effects.
pub fn build_heightmap(registry: &mut TextureRegistry, config: &EffectConfig) -> Capture {
    let depth = registry.create("heightmap", config.refraction_texture_size, DEPTH_FORMAT);
    let pass = render_to_texture(registry, "heightmap", depth)
        .with_clear(ClearMode::DEPTH_ONLY)
        .with_depth_compare(wgpu::CompareFunction::Less)
        .with_program_override(ShaderProgram::Heightmap)
        .with_scene(SceneMask::HEIGHTMAP);

    Capture {
        pass,
        color: None,
        depth: Some(depth),
    }
}
