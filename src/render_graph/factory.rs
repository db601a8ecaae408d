//! Constructors for off-screen passes.
//!
//! Factory passes clear colour and depth, use an absolute reference frame and
//! cover their first target with the viewport. They come back without content;
//! the caller attaches a scene subset, a quad or god-ray geometry.

use glam::{Mat4, UVec2, Vec2};

use crate::camera::Viewport;
use crate::render_graph::{
    Attachment, ClearMode, PassTarget, ReferenceFrame, RenderPass, TextureId, TextureRegistry,
};

/// A pass rendering into a single colour or depth texture.
///
/// Depth-format textures bind to the depth attachment, anything else to
/// colour slot 0.
///
/// # Panics
///
/// Panics if the target has a zero dimension.
pub fn render_to_texture(
    registry: &TextureRegistry,
    label: impl Into<String>,
    target: TextureId,
) -> RenderPass {
    let desc = registry.get(target);
    let attachment = if desc.is_depth() {
        Attachment::Depth
    } else {
        Attachment::Color(0)
    };
    offscreen_pass(registry, label.into(), &[(target, attachment)])
}

/// A pass writing two textures at once, e.g. colour plus depth or colour
/// plus luminance.
///
/// The viewport covers `target0`.
///
/// # Panics
///
/// Panics if either target has a zero dimension or both use the same slot.
pub fn render_to_multiple_targets(
    registry: &TextureRegistry,
    label: impl Into<String>,
    target0: TextureId,
    buffer0: Attachment,
    target1: TextureId,
    buffer1: Attachment,
) -> RenderPass {
    assert_ne!(
        buffer0, buffer1,
        "multi-target pass needs two distinct attachment slots"
    );
    offscreen_pass(
        registry,
        label.into(),
        &[(target0, buffer0), (target1, buffer1)],
    )
}

fn offscreen_pass(
    registry: &TextureRegistry,
    label: String,
    outputs: &[(TextureId, Attachment)],
) -> RenderPass {
    for (texture, _) in outputs {
        let size = registry.get(*texture).size;
        assert!(
            size.x > 0 && size.y > 0,
            "pass `{label}` cannot render into a {}x{} texture",
            size.x,
            size.y
        );
    }

    let size = registry.get(outputs[0].0).size;
    let mut pass = RenderPass::new(label, Viewport::full(size))
        .with_clear(ClearMode::COLOR_AND_DEPTH)
        .with_reference_frame(ReferenceFrame::Absolute);
    pass.targets = outputs
        .iter()
        .map(|(texture, attachment)| PassTarget {
            texture: *texture,
            attachment: *attachment,
        })
        .collect();
    pass
}

/// A pass rendering into the frame itself rather than a texture.
pub fn render_to_frame(label: impl Into<String>, size: UVec2) -> RenderPass {
    RenderPass::new(label, Viewport::full(size))
        .with_clear(ClearMode::COLOR_AND_DEPTH)
        .with_reference_frame(ReferenceFrame::Absolute)
}

/// Pixel-space orthographic projection with the origin at the lower left.
pub fn pixel_projection(size: Vec2, far: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, size.x, 0.0, size.y, 1.0, far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::{COLOR_FORMAT, DEPTH_FORMAT, LUMINANCE_FORMAT, PassContent};

    #[test]
    fn single_target_pass_covers_its_texture() {
        let mut registry = TextureRegistry::new();
        let tex = registry.create("reflection", UVec2::new(512, 256), COLOR_FORMAT);
        let pass = render_to_texture(&registry, "reflection", tex);

        assert_eq!(pass.viewport, Viewport::new(0, 0, 512, 256));
        assert_eq!(pass.clear, ClearMode::COLOR_AND_DEPTH);
        assert_eq!(pass.reference_frame, ReferenceFrame::Absolute);
        assert_eq!(pass.target(Attachment::Color(0)), Some(tex));
        assert_eq!(pass.content, PassContent::Unset);
    }

    #[test]
    fn depth_texture_binds_to_depth_slot() {
        let mut registry = TextureRegistry::new();
        let tex = registry.create("heightmap", UVec2::new(64, 64), DEPTH_FORMAT);
        let pass = render_to_texture(&registry, "heightmap", tex);
        assert_eq!(pass.target(Attachment::Depth), Some(tex));
        assert_eq!(pass.target(Attachment::Color(0)), None);
    }

    #[test]
    fn multi_target_pass_uses_first_target_viewport() {
        let mut registry = TextureRegistry::new();
        let color = registry.create("color", UVec2::new(320, 200), COLOR_FORMAT);
        let lum = registry.create("luminance", UVec2::new(320, 200), LUMINANCE_FORMAT);
        let pass = render_to_multiple_targets(
            &registry,
            "capture",
            color,
            Attachment::Color(0),
            lum,
            Attachment::Color(1),
        );
        assert_eq!(pass.targets.len(), 2);
        assert_eq!(pass.viewport.size(), UVec2::new(320, 200));
        assert_eq!(pass.target(Attachment::Color(1)), Some(lum));
    }

    #[test]
    #[should_panic(expected = "distinct attachment slots")]
    fn multi_target_pass_rejects_shared_slot() {
        let mut registry = TextureRegistry::new();
        let a = registry.create("a", UVec2::new(4, 4), COLOR_FORMAT);
        let b = registry.create("b", UVec2::new(4, 4), COLOR_FORMAT);
        render_to_multiple_targets(&registry, "bad", a, Attachment::Color(0), b, Attachment::Color(0));
    }

    #[test]
    fn pixel_projection_maps_corners_to_clip_edges() {
        let proj = pixel_projection(Vec2::new(200.0, 100.0), 10.0);
        let lower_left = proj.project_point3(glam::Vec3::new(0.0, 0.0, -2.0));
        let upper_right = proj.project_point3(glam::Vec3::new(200.0, 100.0, -2.0));
        assert!((lower_left.x + 1.0).abs() < 1e-5 && (lower_left.y + 1.0).abs() < 1e-5);
        assert!((upper_right.x - 1.0).abs() < 1e-5 && (upper_right.y - 1.0).abs() < 1e-5);
    }
}
