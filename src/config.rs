//! Effect configuration.
//!
//! [`EffectConfig`] is plain data: which effects are on and the numeric
//! parameters they are built from. The orchestrator owns one and rebuilds its
//! pass graph from it whenever it changes.
//!
//! # Example
//!
//! ```ignore
//! use seascape::{Effect, EffectConfig};
//!
//! let config = EffectConfig::new()
//!     .with_effect(Effect::Reflections, true)
//!     .with_effect(Effect::Refractions, true)
//!     .with_screen_size(1920, 1080)
//!     .with_reflection_cutoff(250.0);
//! config.validate()?;
//! ```

use glam::{UVec2, Vec3, Vec4};

use crate::error::{Result, SeascapeError};

/// Every toggleable effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    Reflections,
    Refractions,
    GodRays,
    Heightmap,
    DepthOfField,
    Glare,
    Silt,
    UnderwaterScattering,
    Distortion,
}

impl Effect {
    /// All effects, in pipeline build order followed by the shader-only toggles.
    pub const ALL: [Effect; 9] = [
        Effect::Reflections,
        Effect::Refractions,
        Effect::GodRays,
        Effect::Heightmap,
        Effect::DepthOfField,
        Effect::Glare,
        Effect::Silt,
        Effect::UnderwaterScattering,
        Effect::Distortion,
    ];

    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Effect::Reflections => "reflections",
            Effect::Refractions => "refractions",
            Effect::GodRays => "god rays",
            Effect::Heightmap => "heightmap",
            Effect::DepthOfField => "depth of field",
            Effect::Glare => "glare",
            Effect::Silt => "silt",
            Effect::UnderwaterScattering => "underwater scattering",
            Effect::Distortion => "distortion",
        }
    }
}

/// Exponential-squared fog preset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogPreset {
    pub density: f32,
    pub color: Vec4,
}

/// Circle-of-confusion parameters for the depth-of-field combiner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DofSettings {
    pub near: f32,
    pub far: f32,
    pub focus: f32,
    pub far_clamp: f32,
}

impl Default for DofSettings {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: 160.0,
            focus: 30.0,
            far_clamp: 1.0,
        }
    }
}

/// Luminance threshold and per-pass falloff for the glare streaks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlareSettings {
    pub threshold: f32,
    pub attenuation: f32,
}

impl Default for GlareSettings {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            attenuation: 0.75,
        }
    }
}

/// Underwater particulate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiltSettings {
    pub intensity: f32,
    pub particle_speed: f32,
}

impl Default for SiltSettings {
    fn default() -> Self {
        Self {
            intensity: 0.07,
            particle_speed: 0.025,
        }
    }
}

/// Volumetric light shafts seen from below the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GodRaySettings {
    /// Number of ray volumes the external geometry generator emits.
    pub ray_count: u32,
    /// Falloff of the screen-space blend around the sun position.
    pub eccentricity: f32,
    pub intensity: f32,
}

impl Default for GodRaySettings {
    fn default() -> Self {
        Self {
            ray_count: 10,
            eccentricity: 0.3,
            intensity: 0.1,
        }
    }
}

/// Sampler units the surface shader reads its captures from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUnits {
    pub reflection: u32,
    pub refraction: u32,
    pub refraction_depth: u32,
    pub heightmap: u32,
}

impl Default for TextureUnits {
    fn default() -> Self {
        Self {
            reflection: 1,
            refraction: 2,
            refraction_depth: 3,
            heightmap: 7,
        }
    }
}

/// Enabled effects plus the parameters the pass graph is built from.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectConfig {
    pub reflections: bool,
    pub refractions: bool,
    pub god_rays: bool,
    pub heightmap: bool,
    pub depth_of_field: bool,
    pub glare: bool,
    pub silt: bool,
    pub underwater_scattering: bool,
    pub distortion: bool,
    /// Install the default scene program on the global state.
    pub default_shader: bool,

    pub reflection_texture_size: UVec2,
    pub refraction_texture_size: UVec2,
    pub screen_size: UVec2,

    /// Reflections render only while `eye.z < reflection_cutoff - surface_height`.
    pub reflection_cutoff: f32,
    /// Refraction renders only while `eye.z > refraction_cutoff`.
    pub refraction_cutoff: f32,

    pub sun_direction: Vec3,
    pub light_index: u32,

    pub above_water_fog: FogPreset,
    pub underwater_fog: FogPreset,
    pub underwater_diffuse: Vec4,
    pub underwater_attenuation: Vec3,

    pub dof: DofSettings,
    pub glare_settings: GlareSettings,
    pub silt_settings: SiltSettings,
    pub god_ray_settings: GodRaySettings,
    pub texture_units: TextureUnits,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            reflections: false,
            refractions: false,
            god_rays: false,
            heightmap: false,
            depth_of_field: false,
            glare: false,
            silt: false,
            underwater_scattering: false,
            distortion: false,
            default_shader: true,

            reflection_texture_size: UVec2::new(512, 512),
            refraction_texture_size: UVec2::new(512, 512),
            screen_size: UVec2::new(1024, 768),

            reflection_cutoff: f32::MAX,
            refraction_cutoff: f32::MIN,

            sun_direction: Vec3::new(0.0, 0.0, -1.0),
            light_index: 0,

            above_water_fog: FogPreset {
                density: 0.0012,
                color: Vec4::new(0.7, 0.8, 0.9, 1.0),
            },
            underwater_fog: FogPreset {
                density: 0.01,
                color: Vec4::new(0.2274509, 0.4352941, 0.7294117, 1.0),
            },
            underwater_diffuse: Vec4::new(0.1843137, 0.3372549, 0.4470588, 1.0),
            underwater_attenuation: Vec3::new(0.015, 0.0075, 0.005),

            dof: DofSettings::default(),
            glare_settings: GlareSettings::default(),
            silt_settings: SiltSettings::default(),
            god_ray_settings: GodRaySettings::default(),
            texture_units: TextureUnits::default(),
        }
    }
}

impl EffectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, effect: Effect) -> bool {
        match effect {
            Effect::Reflections => self.reflections,
            Effect::Refractions => self.refractions,
            Effect::GodRays => self.god_rays,
            Effect::Heightmap => self.heightmap,
            Effect::DepthOfField => self.depth_of_field,
            Effect::Glare => self.glare,
            Effect::Silt => self.silt,
            Effect::UnderwaterScattering => self.underwater_scattering,
            Effect::Distortion => self.distortion,
        }
    }

    pub fn set_enabled(&mut self, effect: Effect, enabled: bool) {
        let flag = match effect {
            Effect::Reflections => &mut self.reflections,
            Effect::Refractions => &mut self.refractions,
            Effect::GodRays => &mut self.god_rays,
            Effect::Heightmap => &mut self.heightmap,
            Effect::DepthOfField => &mut self.depth_of_field,
            Effect::Glare => &mut self.glare,
            Effect::Silt => &mut self.silt,
            Effect::UnderwaterScattering => &mut self.underwater_scattering,
            Effect::Distortion => &mut self.distortion,
        };
        *flag = enabled;
    }

    /// Effects currently switched on, in [`Effect::ALL`] order.
    pub fn enabled_effects(&self) -> Vec<Effect> {
        Effect::ALL
            .into_iter()
            .filter(|effect| self.is_enabled(*effect))
            .collect()
    }

    pub fn with_effect(mut self, effect: Effect, enabled: bool) -> Self {
        self.set_enabled(effect, enabled);
        self
    }

    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = UVec2::new(width, height);
        self
    }

    pub fn with_reflection_texture_size(mut self, width: u32, height: u32) -> Self {
        self.reflection_texture_size = UVec2::new(width, height);
        self
    }

    pub fn with_refraction_texture_size(mut self, width: u32, height: u32) -> Self {
        self.refraction_texture_size = UVec2::new(width, height);
        self
    }

    pub fn with_reflection_cutoff(mut self, cutoff: f32) -> Self {
        self.reflection_cutoff = cutoff;
        self
    }

    pub fn with_refraction_cutoff(mut self, cutoff: f32) -> Self {
        self.refraction_cutoff = cutoff;
        self
    }

    pub fn with_sun_direction(mut self, direction: Vec3) -> Self {
        self.sun_direction = direction;
        self
    }

    pub fn with_above_water_fog(mut self, density: f32, color: Vec4) -> Self {
        self.above_water_fog = FogPreset { density, color };
        self
    }

    pub fn with_underwater_fog(mut self, density: f32, color: Vec4) -> Self {
        self.underwater_fog = FogPreset { density, color };
        self
    }

    pub fn with_dof(mut self, dof: DofSettings) -> Self {
        self.dof = dof;
        self
    }

    pub fn with_glare(mut self, glare: GlareSettings) -> Self {
        self.glare_settings = glare;
        self
    }

    /// Low-resolution buffer size shared by the DOF and glare chains.
    pub fn low_res_size(&self) -> UVec2 {
        self.screen_size / 4
    }

    /// Size of the god-ray capture.
    pub fn god_ray_texture_size(&self) -> UVec2 {
        self.screen_size / 2
    }

    /// Checks sizes and parameters before they reach the pass factory.
    pub fn validate(&self) -> Result<()> {
        for (target, size) in [
            ("reflection", self.reflection_texture_size),
            ("refraction", self.refraction_texture_size),
        ] {
            if size.x == 0 || size.y == 0 {
                return Err(SeascapeError::InvalidTextureSize {
                    target,
                    width: size.x,
                    height: size.y,
                });
            }
        }

        if self.screen_size.x < 4 || self.screen_size.y < 4 {
            return Err(SeascapeError::ScreenTooSmall {
                width: self.screen_size.x,
                height: self.screen_size.y,
            });
        }

        let finite = [
            ("above_water_fog.density", self.above_water_fog.density),
            ("underwater_fog.density", self.underwater_fog.density),
            ("dof.near", self.dof.near),
            ("dof.far", self.dof.far),
            ("dof.focus", self.dof.focus),
            ("dof.far_clamp", self.dof.far_clamp),
            ("glare.threshold", self.glare_settings.threshold),
            ("glare.attenuation", self.glare_settings.attenuation),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(SeascapeError::NonFiniteParameter(name));
            }
        }

        if !self.sun_direction.is_finite() {
            return Err(SeascapeError::NonFiniteParameter("sun_direction"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_every_effect() {
        let config = EffectConfig::default();
        assert!(config.enabled_effects().is_empty());
        assert!(config.default_shader);
    }

    #[test]
    fn set_enabled_round_trips_every_effect() {
        let mut config = EffectConfig::new();
        for effect in Effect::ALL {
            config.set_enabled(effect, true);
            assert!(config.is_enabled(effect), "{}", effect.name());
        }
        assert_eq!(config.enabled_effects(), Effect::ALL.to_vec());
    }

    #[test]
    fn derived_sizes_follow_screen() {
        let config = EffectConfig::new().with_screen_size(1280, 720);
        assert_eq!(config.low_res_size(), UVec2::new(320, 180));
        assert_eq!(config.god_ray_texture_size(), UVec2::new(640, 360));
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(EffectConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_sized_reflection() {
        let err = EffectConfig::new()
            .with_reflection_texture_size(0, 512)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SeascapeError::InvalidTextureSize {
                target: "reflection",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_tiny_screen() {
        let err = EffectConfig::new().with_screen_size(3, 600).validate().unwrap_err();
        assert!(matches!(err, SeascapeError::ScreenTooSmall { width: 3, height: 600 }));
    }

    #[test]
    fn validate_rejects_nan_parameters() {
        let config = EffectConfig::new().with_above_water_fog(f32::NAN, Vec4::ONE);
        assert!(matches!(
            config.validate(),
            Err(SeascapeError::NonFiniteParameter("above_water_fog.density"))
        ));
    }
}
