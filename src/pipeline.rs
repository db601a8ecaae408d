//! Pipeline assembly.
//!
//! [`build_pipeline`] turns an [`EffectConfig`] and the current surface height
//! into a [`Pipeline`]: every pass and chain the enabled effects need, the
//! textures they share, the clip planes they attach and fresh copies of the
//! global and surface uniform tables. The function is pure; calling it twice
//! with the same inputs yields structurally identical pipelines.

use crate::camera::Viewport;
use crate::config::{Effect, EffectConfig};
use crate::effects::{
    Capture, GodRayPasses, SiltLayer, build_dof_chain, build_glare_chain, build_god_rays,
    build_heightmap, build_reflection, build_refraction, build_silt,
};
use crate::render_graph::{
    ClipPlane, PassChain, RenderPass, TextureBinding, TextureRegistry,
};
use crate::scene_mask::SceneMask;
use crate::shader::{ShaderDefines, ShaderProgram};
use crate::uniforms::{UniformTable, default_global_uniforms, default_surface_uniforms};

/// A clip plane scoped to the content of one category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipAttachment {
    pub plane: ClipPlane,
    pub scope: SceneMask,
}

/// Structural summary of one pass, for comparing rebuilds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassSignature {
    pub label: String,
    pub viewport: Viewport,
    pub formats: Vec<wgpu::TextureFormat>,
}

/// Everything built for one configuration at one surface height.
///
/// The pipeline exclusively owns its passes and chains; the orchestrator only
/// borrows them while a frame runs.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: EffectConfig,
    surface_height: f32,
    textures: TextureRegistry,
    reflection: Option<Capture>,
    refraction: Option<Capture>,
    god_rays: Option<GodRayPasses>,
    heightmap: Option<Capture>,
    dof: Option<PassChain>,
    glare: Option<PassChain>,
    silt: Option<SiltLayer>,
    clip_attachments: Vec<ClipAttachment>,
    global: UniformTable,
    surface: UniformTable,
    surface_textures: Vec<TextureBinding>,
    shader_defines: ShaderDefines,
    default_program: Option<ShaderProgram>,
}

/// Builds the pass graph for `config` with the water plane at `surface_height`.
///
/// Effects are assembled in a fixed order: reflection, refraction, god rays,
/// heightmap, depth of field, glare, silt.
///
/// # Panics
///
/// Panics if `config` fails [`EffectConfig::validate`]. Hosts validate before
/// handing a configuration over, so reaching this is a programming error.
pub fn build_pipeline(config: &EffectConfig, surface_height: f32) -> Pipeline {
    if let Err(err) = config.validate() {
        panic!("cannot build a pipeline from an invalid configuration: {err}");
    }

    let units = config.texture_units;
    let mut textures = TextureRegistry::new();
    let mut clip_attachments = Vec::new();
    let mut surface_textures = Vec::new();

    let reflection = config.reflections.then(|| {
        let capture = build_reflection(&mut textures, config, surface_height);
        for plane in &capture.pass.clip_planes {
            clip_attachments.push(ClipAttachment {
                plane: *plane,
                scope: SceneMask::REFLECTION,
            });
        }
        if let Some(color) = capture.color {
            surface_textures.push(TextureBinding {
                unit: units.reflection,
                texture: color,
            });
        }
        capture
    });

    let refraction = config.refractions.then(|| {
        let capture = build_refraction(&mut textures, config);
        if let Some(color) = capture.color {
            surface_textures.push(TextureBinding {
                unit: units.refraction,
                texture: color,
            });
        }
        if let Some(depth) = capture.depth {
            surface_textures.push(TextureBinding {
                unit: units.refraction_depth,
                texture: depth,
            });
        }
        capture
    });

    let god_rays = config
        .god_rays
        .then(|| build_god_rays(&mut textures, config, surface_height));

    let heightmap = config.heightmap.then(|| {
        let capture = build_heightmap(&mut textures, config);
        if let Some(depth) = capture.depth {
            surface_textures.push(TextureBinding {
                unit: units.heightmap,
                texture: depth,
            });
        }
        capture
    });

    let dof = config
        .depth_of_field
        .then(|| build_dof_chain(&mut textures, config));

    let glare = config
        .glare
        .then(|| build_glare_chain(&mut textures, config));

    let silt = config.silt.then(|| {
        let layer = build_silt(config, surface_height);
        clip_attachments.push(ClipAttachment {
            plane: layer.clip,
            scope: SceneMask::SILT,
        });
        layer
    });

    let pipeline = Pipeline {
        config: config.clone(),
        surface_height,
        textures,
        reflection,
        refraction,
        god_rays,
        heightmap,
        dof,
        glare,
        silt,
        clip_attachments,
        global: default_global_uniforms(config, surface_height),
        surface: default_surface_uniforms(config),
        surface_textures,
        shader_defines: ShaderDefines {
            shore_to_sinus: config.heightmap,
            light_index: config.light_index,
        },
        default_program: config.default_shader.then_some(ShaderProgram::Scene),
    };

    log::info!(
        "Pipeline built at surface height {}: {:?}, {} passes, {} textures",
        surface_height,
        config
            .enabled_effects()
            .iter()
            .map(|effect| effect.name())
            .collect::<Vec<_>>(),
        pipeline.pass_count(),
        pipeline.textures.len()
    );

    pipeline
}

impl Pipeline {
    /// The configuration this pipeline was built from.
    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    pub fn surface_height(&self) -> f32 {
        self.surface_height
    }

    pub fn is_enabled(&self, effect: Effect) -> bool {
        self.config.is_enabled(effect)
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn reflection(&self) -> Option<&Capture> {
        self.reflection.as_ref()
    }

    pub fn refraction(&self) -> Option<&Capture> {
        self.refraction.as_ref()
    }

    pub fn god_rays(&self) -> Option<&GodRayPasses> {
        self.god_rays.as_ref()
    }

    pub fn heightmap(&self) -> Option<&Capture> {
        self.heightmap.as_ref()
    }

    pub fn dof(&self) -> Option<&PassChain> {
        self.dof.as_ref()
    }

    pub fn glare(&self) -> Option<&PassChain> {
        self.glare.as_ref()
    }

    pub fn silt(&self) -> Option<&SiltLayer> {
        self.silt.as_ref()
    }

    pub fn clip_attachments(&self) -> &[ClipAttachment] {
        &self.clip_attachments
    }

    pub fn global_uniforms(&self) -> &UniformTable {
        &self.global
    }

    pub fn surface_uniforms(&self) -> &UniformTable {
        &self.surface
    }

    pub(crate) fn global_uniforms_mut(&mut self) -> &mut UniformTable {
        &mut self.global
    }

    pub(crate) fn surface_uniforms_mut(&mut self) -> &mut UniformTable {
        &mut self.surface
    }

    /// Textures the surface shader samples, by texture unit.
    pub fn surface_textures(&self) -> &[TextureBinding] {
        &self.surface_textures
    }

    pub fn shader_defines(&self) -> ShaderDefines {
        self.shader_defines
    }

    /// Program installed on the global state for ordinary scene content.
    pub fn default_program(&self) -> Option<ShaderProgram> {
        self.default_program
    }

    /// Every pass in build order.
    pub fn passes(&self) -> Vec<&RenderPass> {
        let mut passes = Vec::with_capacity(self.pass_count());
        passes.extend(self.reflection.as_ref().map(|c| &c.pass));
        passes.extend(self.refraction.as_ref().map(|c| &c.pass));
        if let Some(god_rays) = &self.god_rays {
            passes.push(&god_rays.pre);
            passes.push(&god_rays.post);
        }
        passes.extend(self.heightmap.as_ref().map(|c| &c.pass));
        for chain in [&self.dof, &self.glare].into_iter().flatten() {
            passes.extend(chain.iter());
        }
        passes
    }

    pub fn pass_count(&self) -> usize {
        let captures = [&self.reflection, &self.refraction, &self.heightmap]
            .into_iter()
            .filter(|capture| capture.is_some())
            .count();
        let god_rays = if self.god_rays.is_some() { 2 } else { 0 };
        let chains: usize = [&self.dof, &self.glare]
            .into_iter()
            .flatten()
            .map(PassChain::len)
            .sum();
        captures + god_rays + chains
    }

    /// Label, viewport and output formats of every pass, in build order.
    pub fn signature(&self) -> Vec<PassSignature> {
        self.passes()
            .into_iter()
            .map(|pass| PassSignature {
                label: pass.label.clone(),
                viewport: pass.viewport,
                formats: pass
                    .targets
                    .iter()
                    .map(|target| self.textures.get(target.texture).format)
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{DOF_PASS_COUNT, GLARE_PASS_COUNT, REFRACTION_CLEAR};
    use crate::render_graph::{Attachment, COLOR_FORMAT, DEPTH_FORMAT};
    use crate::uniforms::UniformKey;

    fn everything() -> EffectConfig {
        let mut config = EffectConfig::default();
        for effect in Effect::ALL {
            config.set_enabled(effect, true);
        }
        config
    }

    #[test]
    fn nothing_enabled_builds_no_passes() {
        let pipeline = build_pipeline(&EffectConfig::default(), 0.0);
        assert_eq!(pipeline.pass_count(), 0);
        assert!(pipeline.textures().is_empty());
        assert!(pipeline.clip_attachments().is_empty());
        assert_eq!(pipeline.default_program(), Some(ShaderProgram::Scene));
    }

    #[test]
    fn reflection_is_one_pass_and_one_clip_attachment() {
        let config = EffectConfig::default().with_effect(Effect::Reflections, true);
        let pipeline = build_pipeline(&config, 2.0);
        assert_eq!(pipeline.pass_count(), 1);
        assert_eq!(
            pipeline.clip_attachments(),
            [ClipAttachment {
                plane: ClipPlane::above(0, 2.0),
                scope: SceneMask::REFLECTION,
            }]
        );
    }

    #[test]
    fn refraction_is_one_multi_target_pass() {
        let config = EffectConfig::default().with_effect(Effect::Refractions, true);
        let pipeline = build_pipeline(&config, 0.0);
        assert_eq!(pipeline.pass_count(), 1);
        let pass = &pipeline.refraction().unwrap().pass;
        assert_eq!(pass.targets.len(), 2);
        assert!(pass.target(Attachment::Color(0)).is_some());
        assert!(pass.target(Attachment::Depth).is_some());
        assert_eq!(pass.clear.color, Some(REFRACTION_CLEAR));
    }

    #[test]
    fn chain_lengths_are_fixed_for_any_resolution() {
        for (w, h) in [(64, 64), (1024, 768), (2560, 1440)] {
            let config = EffectConfig::default()
                .with_screen_size(w, h)
                .with_effect(Effect::DepthOfField, true)
                .with_effect(Effect::Glare, true);
            let pipeline = build_pipeline(&config, 0.0);
            assert_eq!(pipeline.dof().unwrap().len(), DOF_PASS_COUNT);
            assert_eq!(pipeline.glare().unwrap().len(), GLARE_PASS_COUNT);
        }
    }

    #[test]
    fn passes_follow_build_order() {
        let pipeline = build_pipeline(&everything(), 0.0);
        let labels: Vec<_> = pipeline.passes().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(&labels[..5], ["reflection", "refraction", "god rays", "god ray blend", "heightmap"]);
        assert_eq!(labels[5], "dof capture");
        assert_eq!(labels[5 + DOF_PASS_COUNT], "glare capture");
        assert_eq!(labels.len(), 5 + DOF_PASS_COUNT + GLARE_PASS_COUNT);
        assert_eq!(pipeline.pass_count(), labels.len());
    }

    #[test]
    fn rebuilding_is_structurally_idempotent() {
        let config = everything();
        let first = build_pipeline(&config, -1.5);
        let second = build_pipeline(&config, -1.5);
        assert_eq!(first.signature(), second.signature());
        assert_eq!(first.passes(), second.passes());
        assert_eq!(first.global_uniforms(), second.global_uniforms());
    }

    #[test]
    fn surface_samples_every_capture_on_its_unit() {
        let pipeline = build_pipeline(&everything(), 0.0);
        let units: Vec<_> = pipeline.surface_textures().iter().map(|b| b.unit).collect();
        assert_eq!(units, [1, 2, 3, 7]);
        let formats: Vec<_> = pipeline
            .surface_textures()
            .iter()
            .map(|b| pipeline.textures().get(b.texture).format)
            .collect();
        assert_eq!(formats, [COLOR_FORMAT, COLOR_FORMAT, DEPTH_FORMAT, DEPTH_FORMAT]);
    }

    #[test]
    fn heightmap_turns_on_shore_attenuation() {
        let plain = build_pipeline(&EffectConfig::default(), 0.0);
        let shore = build_pipeline(
            &EffectConfig::default().with_effect(Effect::Heightmap, true),
            0.0,
        );
        assert!(!plain.shader_defines().shore_to_sinus);
        assert!(shore.shader_defines().shore_to_sinus);
    }

    #[test]
    fn uniform_tables_reset_to_configuration() {
        let config = EffectConfig::default().with_effect(Effect::Glare, true);
        let pipeline = build_pipeline(&config, 4.0);
        assert!(pipeline.global_uniforms().get_bool(UniformKey::EnableGlare));
        assert_eq!(pipeline.global_uniforms().get_f32(UniformKey::WaterHeight), 4.0);
        assert!(!pipeline.surface_uniforms().get_bool(UniformKey::EnableReflections));
    }

    #[test]
    fn silt_clip_follows_the_surface() {
        let config = EffectConfig::default().with_effect(Effect::Silt, true);
        let pipeline = build_pipeline(&config, -3.0);
        let silt = pipeline.silt().unwrap();
        assert_eq!(silt.clip, ClipPlane::below(1, -3.0));
        assert_eq!(pipeline.clip_attachments()[0].scope, SceneMask::SILT);
    }

    #[test]
    #[should_panic(expected = "invalid configuration")]
    fn invalid_configuration_panics() {
        build_pipeline(&EffectConfig::default().with_screen_size(2, 2), 0.0);
    }
}
