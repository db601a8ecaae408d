//! Above-water lens glare.
//!
//! The capture renders the scene plus luminance at full resolution, a
//! thresholding downsample keeps the bright pixels, and four diagonal streak
//! directions each run two compounding passes over the low-resolution buffer:
//! the second pass samples at twice the offset of the first, stretching a
//! short kernel into a long trail. The composite adds all four trails onto
//! the scene colour.

use glam::{Mat4, Vec2};

use crate::config::EffectConfig;
use crate::render_graph::{
    Attachment, COLOR_FORMAT, ClearMode, LUMINANCE_FORMAT, PassChain, ScreenQuad, TextureId,
    TextureRegistry, pixel_projection, render_to_frame, render_to_multiple_targets,
    render_to_texture,
};
use crate::shader::ShaderProgram;
use crate::uniforms::{UniformKey, UniformTable};

/// Streak directions in normalised screen space, in build order.
pub const STREAK_DIRECTIONS: [Vec2; 4] = [
    Vec2::new(0.5, 0.5),
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
    Vec2::new(-0.5, 0.5),
];

/// Passes per streak direction.
pub const STREAK_PASSES: u32 = 2;

/// capture + downsample + 4 directions x 2 passes + composite.
pub const GLARE_PASS_COUNT: usize = 1 + 1 + STREAK_DIRECTIONS.len() * STREAK_PASSES as usize + 1;

/// Builds the glare chain.
pub fn build_glare_chain(registry: &mut TextureRegistry, config: &EffectConfig) -> PassChain {
    let screen = config.screen_size;
    let low = config.low_res_size();
    let screen_f = screen.as_vec2();
    let low_f = low.as_vec2();

    let full_color = registry.create("glare full colour", screen, COLOR_FORMAT);
    let full_luminance = registry.create("glare full luminance", screen, LUMINANCE_FORMAT);
    let downsized = registry.create("glare downsized", low, COLOR_FORMAT);

    let mut chain = PassChain::new();

    chain.push(
        render_to_multiple_targets(
            registry,
            "glare capture",
            full_color,
            Attachment::Color(0),
            full_luminance,
            Attachment::Color(1),
        )
        .with_full_scene()
        .with_state(UniformTable::new().with(UniformKey::EnableGlare, true)),
    );

    chain.push(
        render_to_texture(registry, "glare downsample", downsized)
            .with_matrices(Mat4::IDENTITY, pixel_projection(low_f, 10.0))
            .with_quad(
                ScreenQuad::new(ShaderProgram::DownsampleGlare, low_f)
                    .with_tex_coord_scale(screen_f)
                    .with_input(0, full_color)
                    .with_input(1, full_luminance)
                    .with_uniforms(
                        UniformTable::new()
                            .with(UniformKey::ColorTexture, 0)
                            .with(UniformKey::LuminanceTexture, 1)
                            .with(UniformKey::GlareThreshold, config.glare_settings.threshold),
                    ),
            ),
    );

    let mut trails: Vec<TextureId> = Vec::with_capacity(STREAK_DIRECTIONS.len());
    for (d, direction) in STREAK_DIRECTIONS.into_iter().enumerate() {
        let mut input = downsized;
        for pass in 1..=STREAK_PASSES {
            let label = format!("glare streak {} pass {}", d + 1, pass);
            let output = registry.create(label.clone(), low, COLOR_FORMAT);
            chain.push(
                render_to_texture(registry, label, output)
                    .with_clear(ClearMode::COLOR_AND_DEPTH.with_color(glam::Vec4::ZERO))
                    .with_matrices(Mat4::IDENTITY, pixel_projection(low_f, 500.0))
                    .with_quad(
                        ScreenQuad::new(ShaderProgram::Streak, low_f)
                            .with_tex_coord_scale(low_f)
                            .with_input(0, input)
                            .with_uniforms(streak_uniforms(config, pass, direction)),
                    ),
            );
            input = output;
        }
        trails.push(input);
    }

    let mut composite = ScreenQuad::new(ShaderProgram::GlareComposite, screen_f)
        .with_tex_coord_scale(screen_f)
        .with_input(0, full_color);
    let mut uniforms = UniformTable::new().with(UniformKey::ColorTexture, 0);
    for (slot, trail) in (1u8..).zip(trails) {
        composite = composite.with_input(u32::from(slot), trail);
        uniforms.set(UniformKey::StreakBuffer(slot), i32::from(slot));
    }

    chain.push(
        render_to_frame("glare composite", screen)
            .with_matrices(Mat4::IDENTITY, pixel_projection(screen_f, 500.0))
            .with_quad(composite.with_uniforms(uniforms)),
    );

    debug_assert_eq!(chain.len(), GLARE_PASS_COUNT);
    chain
}

fn streak_uniforms(config: &EffectConfig, pass: u32, direction: Vec2) -> UniformTable {
    UniformTable::new()
        .with(UniformKey::StreakSource, 0)
        .with(UniformKey::StreakPass, pass as f32)
        .with(UniformKey::StreakDirection, direction)
        .with(UniformKey::StreakAttenuation, config.glare_settings.attenuation)
}
