//! Underwater depth of field.
//!
//! Six passes in fixed order:
//!
//! ```text
//! capture   scene -> full colour + luminance      (camera matrices)
//! downsample full colour -> quarter res
//! blur x    quarter res -> blur x
//! blur y    blur x -> blur y
//! combine   full colour, luminance, blur y -> combined
//! composite combined -> frame (distortion surface)
//! ```
//!
//! The blur is separable so its cost grows linearly with the kernel radius.

use glam::Vec2;

use crate::config::EffectConfig;
use crate::render_graph::{
    Attachment, COLOR_FORMAT, LUMINANCE_FORMAT, PassChain, ScreenQuad, TextureId, TextureRegistry,
    pixel_projection, render_to_frame, render_to_multiple_targets, render_to_texture,
};
use crate::shader::ShaderProgram;
use crate::uniforms::{UniformKey, UniformTable};

/// Number of passes in a depth-of-field chain.
pub const DOF_PASS_COUNT: usize = 6;

/// Textures shared between the chain's passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DofTextures {
    pub full_color: TextureId,
    pub full_luminance: TextureId,
    pub downsized: TextureId,
    pub blur_x: TextureId,
    pub blur_y: TextureId,
    pub combined: TextureId,
}

/// Circle-of-confusion parameters active while the capture pass renders.
pub fn dof_state(config: &EffectConfig) -> UniformTable {
    UniformTable::new()
        .with(UniformKey::DofNear, config.dof.near)
        .with(UniformKey::DofFar, config.dof.far)
        .with(UniformKey::DofFarClamp, config.dof.far_clamp)
        .with(UniformKey::DofFocus, config.dof.focus)
}

/// Builds the depth-of-field chain.
///
/// # Panics
///
/// Panics if the screen is smaller than 4x4, since the blur buffers would be empty.
pub fn build_dof_chain(registry: &mut TextureRegistry, config: &EffectConfig) -> PassChain {
    let screen = config.screen_size;
    let low = config.low_res_size();
    let screen_f = screen.as_vec2();
    let low_f = low.as_vec2();

    let textures = DofTextures {
        full_color: registry.create("dof full colour", screen, COLOR_FORMAT),
        full_luminance: registry.create("dof full luminance", screen, LUMINANCE_FORMAT),
        downsized: registry.create("dof downsized", low, COLOR_FORMAT),
        blur_x: registry.create("dof blur x", low, COLOR_FORMAT),
        blur_y: registry.create("dof blur y", low, COLOR_FORMAT),
        combined: registry.create("dof combined", screen, COLOR_FORMAT),
    };

    let mut chain = PassChain::new();

    chain.push(
        render_to_multiple_targets(
            registry,
            "dof capture",
            textures.full_color,
            Attachment::Color(0),
            textures.full_luminance,
            Attachment::Color(1),
        )
        .with_full_scene()
        .with_state(dof_state(config)),
    );

    chain.push(
        render_to_texture(registry, "dof downsample", textures.downsized)
            .with_matrices(glam::Mat4::IDENTITY, pixel_projection(low_f, 10.0))
            .with_quad(
                ScreenQuad::new(ShaderProgram::Downsample, low_f)
                    .with_tex_coord_scale(screen_f)
                    .with_input(0, textures.full_color)
                    .with_uniforms(UniformTable::new().with(UniformKey::ColorTexture, 0)),
            ),
    );

    for (label, program, input, output) in [
        ("dof blur x", ShaderProgram::GaussianX, textures.downsized, textures.blur_x),
        ("dof blur y", ShaderProgram::GaussianY, textures.blur_x, textures.blur_y),
    ] {
        chain.push(
            render_to_texture(registry, label, output)
                .with_matrices(glam::Mat4::IDENTITY, pixel_projection(low_f, 10.0))
                .with_quad(
                    ScreenQuad::new(program, low_f)
                        .with_tex_coord_scale(low_f)
                        .with_input(0, input)
                        .with_uniforms(UniformTable::new().with(UniformKey::GaussianTexture, 0)),
                ),
        );
    }

    chain.push(
        render_to_texture(registry, "dof combine", textures.combined)
            .with_matrices(glam::Mat4::IDENTITY, pixel_projection(screen_f, 10.0))
            .with_quad(
                ScreenQuad::new(ShaderProgram::DofCombiner, screen_f)
                    .with_input(0, textures.full_color)
                    .with_input(1, textures.full_luminance)
                    .with_input(2, textures.blur_y)
                    .with_uniforms(
                        UniformTable::new()
                            .with(UniformKey::ColorTexture, 0)
                            .with(UniformKey::LuminanceTexture, 1)
                            .with(UniformKey::BlurTexture, 2)
                            .with(UniformKey::ScreenResolution, screen_f)
                            .with(UniformKey::ScreenResolutionInverse, Vec2::ONE / screen_f)
                            .with(UniformKey::LowResolution, screen_f * 0.25),
                    ),
            ),
    );

    chain.push(
        render_to_frame("dof composite", screen)
            .with_matrices(glam::Mat4::IDENTITY, pixel_projection(screen_f, 500.0))
            .with_quad(
                ScreenQuad::new(ShaderProgram::Distortion, screen_f)
                    .with_tex_coord_scale(screen_f)
                    .with_input(0, textures.combined)
                    .with_distortion(config.distortion),
            ),
    );

    debug_assert_eq!(chain.len(), DOF_PASS_COUNT);
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::PassContent;
    use glam::UVec2;

    #[test]
    fn chain_has_six_passes_in_order() {
        let mut registry = TextureRegistry::new();
        let chain = build_dof_chain(&mut registry, &EffectConfig::default());
        let labels: Vec<_> = chain.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "dof capture",
                "dof downsample",
                "dof blur x",
                "dof blur y",
                "dof combine",
                "dof composite"
            ]
        );
    }

    #[test]
    fn pass_count_does_not_depend_on_resolution() {
        for (w, h) in [(4, 4), (640, 480), (3840, 2160)] {
            let mut registry = TextureRegistry::new();
            let config = EffectConfig::default().with_screen_size(w, h);
            assert_eq!(build_dof_chain(&mut registry, &config).len(), DOF_PASS_COUNT);
        }
    }

    #[test]
    fn blur_runs_at_quarter_resolution() {
        let mut registry = TextureRegistry::new();
        let chain = build_dof_chain(&mut registry, &EffectConfig::default());
        for index in 1..4 {
            assert_eq!(chain.get(index).unwrap().viewport.size(), UVec2::new(256, 192));
        }
    }

    #[test]
    fn each_quad_samples_the_previous_output() {
        let mut registry = TextureRegistry::new();
        let chain = build_dof_chain(&mut registry, &EffectConfig::default());
        for pair in chain.leading()[1..].windows(2) {
            let written = pair[0].target(Attachment::Color(0)).unwrap();
            let quad = pair[1].quad();
            assert!(quad.inputs.iter().any(|b| b.texture == written), "{}", pair[1].label);
        }
        let combined = chain.get(4).unwrap().target(Attachment::Color(0));
        assert_eq!(chain.last().quad().input(0), combined);
    }

    #[test]
    fn capture_carries_coc_state_and_composite_hits_the_frame() {
        let mut registry = TextureRegistry::new();
        let config = EffectConfig::default().with_effect(crate::Effect::Distortion, true);
        let chain = build_dof_chain(&mut registry, &config);
        let capture = chain.get(0).unwrap();
        assert_eq!(capture.content, PassContent::FullScene);
        assert_eq!(capture.state.get_f32(UniformKey::DofFar), 160.0);
        assert!(chain.last().renders_to_frame());
        assert!(chain.last().quad().distortion);
    }
}
