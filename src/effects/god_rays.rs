//! Underwater god rays.
//!
//! Ray volumes are rendered from below the surface into a half resolution
//! texture, then blended over the finished frame without clearing it.

use glam::{Mat4, Vec2, Vec4};

use crate::config::EffectConfig;
use crate::render_graph::{
    COLOR_FORMAT, ClearMode, GodRayGeometry, RenderPass, ScreenQuad, TextureId, TextureRegistry,
    render_to_frame, render_to_texture,
};
use crate::shader::ShaderProgram;
use crate::uniforms::{UniformKey, UniformTable};

/// Ambient colour the god-ray capture clears to.
pub const GOD_RAY_CLEAR: Vec4 = Vec4::new(0.0745098, 0.10588235, 0.1529411, 1.0);

/// The two halves of the god-ray effect.
///
/// `pre` renders the ray volumes with the camera matrices into a half
/// resolution texture; `post` blends that texture over the finished frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GodRayPasses {
    pub pre: RenderPass,
    pub post: RenderPass,
    pub texture: TextureId,
}

pub fn build_god_rays(
    registry: &mut TextureRegistry,
    config: &EffectConfig,
    surface_height: f32,
) -> GodRayPasses {
    let settings = config.god_ray_settings;
    let texture = registry.create("god rays", config.god_ray_texture_size(), COLOR_FORMAT);

    let pre = render_to_texture(registry, "god rays", texture)
        .with_clear(ClearMode::COLOR_AND_DEPTH.with_color(GOD_RAY_CLEAR))
        .with_god_rays(GodRayGeometry {
            ray_count: settings.ray_count,
            sun_direction: config.sun_direction,
            surface_height,
        });

    // The blend quad spans clip space directly.
    let blend = ScreenQuad::new(ShaderProgram::GodRayBlend, Vec2::splat(2.0))
        .with_input(0, texture)
        .with_uniforms(
            UniformTable::new()
                .with(UniformKey::SunDirection, config.sun_direction)
                .with(UniformKey::GodRayEccentricity, settings.eccentricity)
                .with(UniformKey::GodRayIntensity, settings.intensity),
        );

    let post = render_to_frame("god ray blend", config.screen_size)
        .with_clear(ClearMode::DEPTH_ONLY)
        .with_matrices(
            Mat4::IDENTITY,
            Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, 1.0, 500.0),
        )
        .with_quad(blend);

    GodRayPasses { pre, post, texture }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::PassContent;
    use glam::{UVec2, Vec3};

    #[test]
    fn capture_is_half_resolution() {
        let mut registry = TextureRegistry::new();
        let passes = build_god_rays(&mut registry, &EffectConfig::default(), 0.0);
        assert_eq!(registry.get(passes.texture).size, UVec2::new(512, 384));
        assert_eq!(passes.pre.clear.color, Some(GOD_RAY_CLEAR));
    }

    #[test]
    fn geometry_tracks_sun_and_surface() {
        let config = EffectConfig::default().with_sun_direction(Vec3::new(0.2, 0.1, -1.0));
        let mut registry = TextureRegistry::new();
        let passes = build_god_rays(&mut registry, &config, -4.0);
        match passes.pre.content {
            PassContent::GodRays(geometry) => {
                assert_eq!(geometry.ray_count, 10);
                assert_eq!(geometry.surface_height, -4.0);
                assert_eq!(geometry.sun_direction, Vec3::new(0.2, 0.1, -1.0));
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn blend_keeps_frame_colour() {
        let mut registry = TextureRegistry::new();
        let passes = build_god_rays(&mut registry, &EffectConfig::default(), 0.0);
        assert_eq!(passes.post.clear, ClearMode::DEPTH_ONLY);
        assert!(passes.post.renders_to_frame());
        assert_eq!(passes.post.quad().input(0), Some(passes.texture));
        assert_eq!(
            passes.post.quad().uniforms.get_f32(UniformKey::GodRayEccentricity),
            0.3
        );
    }
}
