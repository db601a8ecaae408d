//! Shared uniform state.
//!
//! The pipeline keeps two [`UniformTable`]s: a global one pushed around every
//! scene capture and the main view, and a surface one pushed only while the
//! ocean surface draws. Post-process quads carry their own small tables.
//!
//! Tables are keyed by [`UniformKey`]; the string a shader binds under is
//! [`UniformKey::name`]. For GPU upload the tables are packed into the
//! `#[repr(C)]` blocks at the bottom of this module.

use std::collections::BTreeMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::config::EffectConfig;

/// `log2(e)`, used by the exponential-squared fog term.
pub const LOG2E: f32 = 1.442695;

/// Converts an EXP2 fog density into the form the shaders consume.
///
/// The shaders evaluate `exp2(d * z * z)`, so the density is stored as
/// `-density² · log2(e)`.
pub fn exp2_fog_density(density: f32) -> f32 {
    -density * density * LOG2E
}

/// Identifies one shared shader parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UniformKey {
    // Global
    EnableDof,
    EnableGlare,
    EnableUnderwaterScattering,
    EyeUnderwater,
    EyePosition,
    WaterHeight,
    UnderwaterFogColor,
    AboveWaterFogColor,
    UnderwaterFogDensity,
    AboveWaterFogDensity,
    UnderwaterDiffuse,
    UnderwaterAttenuation,
    FogDensity,
    FogColor,

    // Surface
    EnableReflections,
    EnableRefractions,
    ReflectionMap,
    RefractionMap,
    RefractionDepthMap,
    HeightMap,
    RefractionInverseTransform,
    ViewportDimensions,

    // Depth of field
    DofNear,
    DofFar,
    DofFocus,
    DofFarClamp,
    ScreenResolution,
    ScreenResolutionInverse,
    LowResolution,

    // Post-process samplers
    ColorTexture,
    LuminanceTexture,
    GaussianTexture,
    BlurTexture,

    // Glare
    GlareThreshold,
    StreakSource,
    StreakPass,
    StreakDirection,
    StreakAttenuation,
    /// Combiner input for streak direction `n` (1..=4).
    StreakBuffer(u8),

    // God rays
    SunDirection,
    GodRayEccentricity,
    GodRayIntensity,
}

impl UniformKey {
    /// Name the uniform is bound under in shader source.
    pub fn name(self) -> &'static str {
        match self {
            UniformKey::EnableDof => "ocean_enable_dof",
            UniformKey::EnableGlare => "ocean_enable_glare",
            UniformKey::EnableUnderwaterScattering => "ocean_enable_underwater_scattering",
            UniformKey::EyeUnderwater => "ocean_eye_underwater",
            UniformKey::EyePosition => "ocean_eye",
            UniformKey::WaterHeight => "ocean_water_height",
            UniformKey::UnderwaterFogColor => "ocean_underwater_fog_color",
            UniformKey::AboveWaterFogColor => "ocean_above_water_fog_color",
            UniformKey::UnderwaterFogDensity => "ocean_underwater_fog_density",
            UniformKey::AboveWaterFogDensity => "ocean_above_water_fog_density",
            UniformKey::UnderwaterDiffuse => "ocean_underwater_diffuse",
            UniformKey::UnderwaterAttenuation => "ocean_underwater_attenuation",
            UniformKey::FogDensity => "ocean_fog_density",
            UniformKey::FogColor => "ocean_fog_color",
            UniformKey::EnableReflections => "ocean_enable_reflections",
            UniformKey::EnableRefractions => "ocean_enable_refractions",
            UniformKey::ReflectionMap => "ocean_reflection_map",
            UniformKey::RefractionMap => "ocean_refraction_map",
            UniformKey::RefractionDepthMap => "ocean_refraction_depth_map",
            UniformKey::HeightMap => "ocean_heightmap",
            UniformKey::RefractionInverseTransform => "ocean_refraction_inverse_transform",
            UniformKey::ViewportDimensions => "ocean_viewport_dimensions",
            UniformKey::DofNear => "dof_near",
            UniformKey::DofFar => "dof_far",
            UniformKey::DofFocus => "dof_focus",
            UniformKey::DofFarClamp => "dof_far_clamp",
            UniformKey::ScreenResolution => "screen_res",
            UniformKey::ScreenResolutionInverse => "screen_res_inv",
            UniformKey::LowResolution => "low_res",
            UniformKey::ColorTexture => "color_texture",
            UniformKey::LuminanceTexture => "luminance_texture",
            UniformKey::GaussianTexture => "gaussian_texture",
            UniformKey::BlurTexture => "blur_texture",
            UniformKey::GlareThreshold => "glare_threshold",
            UniformKey::StreakSource => "streak_source",
            UniformKey::StreakPass => "streak_pass",
            UniformKey::StreakDirection => "streak_direction",
            UniformKey::StreakAttenuation => "streak_attenuation",
            UniformKey::StreakBuffer(1) => "streak_buffer_1",
            UniformKey::StreakBuffer(2) => "streak_buffer_2",
            UniformKey::StreakBuffer(3) => "streak_buffer_3",
            UniformKey::StreakBuffer(4) => "streak_buffer_4",
            UniformKey::StreakBuffer(n) => panic!("glare combines four streak buffers, got {n}"),
            UniformKey::SunDirection => "sun_direction",
            UniformKey::GodRayEccentricity => "god_ray_eccentricity",
            UniformKey::GodRayIntensity => "god_ray_intensity",
        }
    }
}

/// A typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Key/value table of shared shader parameters.
///
/// Lookups of absent keys panic: a missing uniform means the table was read
/// before the pipeline that fills it was built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformTable {
    values: BTreeMap<UniformKey, UniformValue>,
}

macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        /// Typed lookup.
        ///
        /// # Panics
        ///
        /// Panics if the key is absent or holds a different type.
        pub fn $fn_name(&self, key: UniformKey) -> $ty {
            match self.get(key) {
                UniformValue::$variant(v) => v,
                other => panic!(
                    "uniform `{}` holds {:?}, expected {}",
                    key.name(),
                    other,
                    stringify!($variant)
                ),
            }
        }
    };
}

impl UniformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing any previous one.
    pub fn set(&mut self, key: UniformKey, value: impl Into<UniformValue>) {
        self.values.insert(key, value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: UniformKey, value: impl Into<UniformValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Looks a value up.
    ///
    /// # Panics
    ///
    /// Panics if `key` is absent.
    pub fn get(&self, key: UniformKey) -> UniformValue {
        match self.values.get(&key) {
            Some(value) => *value,
            None => panic!("uniform `{}` queried before it was set", key.name()),
        }
    }

    pub fn try_get(&self, key: UniformKey) -> Option<UniformValue> {
        self.values.get(&key).copied()
    }

    pub fn contains(&self, key: UniformKey) -> bool {
        self.values.contains_key(&key)
    }

    typed_getter!(get_bool, Bool, bool);
    typed_getter!(get_int, Int, i32);
    typed_getter!(get_f32, Float, f32);
    typed_getter!(get_vec2, Vec2, Vec2);
    typed_getter!(get_vec3, Vec3, Vec3);
    typed_getter!(get_vec4, Vec4, Vec4);
    typed_getter!(get_mat4, Mat4, Mat4);

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UniformKey, UniformValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// Global table as it stands right after a rebuild.
///
/// Fog starts on the above-water preset; per-frame entries (eye position,
/// underwater flag) hold neutral values until the first traversal.
pub fn default_global_uniforms(config: &EffectConfig, surface_height: f32) -> UniformTable {
    let above = config.above_water_fog;
    let below = config.underwater_fog;
    UniformTable::new()
        .with(UniformKey::EnableDof, config.depth_of_field)
        .with(UniformKey::EnableGlare, config.glare)
        .with(UniformKey::EnableUnderwaterScattering, config.underwater_scattering)
        .with(UniformKey::EyeUnderwater, false)
        .with(UniformKey::EyePosition, Vec3::ZERO)
        .with(UniformKey::WaterHeight, surface_height)
        .with(UniformKey::UnderwaterFogColor, below.color)
        .with(UniformKey::AboveWaterFogColor, above.color)
        .with(UniformKey::UnderwaterFogDensity, exp2_fog_density(below.density))
        .with(UniformKey::AboveWaterFogDensity, exp2_fog_density(above.density))
        .with(UniformKey::UnderwaterDiffuse, config.underwater_diffuse)
        .with(UniformKey::UnderwaterAttenuation, config.underwater_attenuation)
        .with(UniformKey::FogDensity, above.density)
        .with(UniformKey::FogColor, above.color)
}

/// Surface table as it stands right after a rebuild.
pub fn default_surface_uniforms(config: &EffectConfig) -> UniformTable {
    let units = config.texture_units;
    UniformTable::new()
        .with(UniformKey::EnableReflections, config.reflections)
        .with(UniformKey::EnableRefractions, config.refractions)
        .with(UniformKey::ReflectionMap, units.reflection as i32)
        .with(UniformKey::RefractionMap, units.refraction as i32)
        .with(UniformKey::RefractionDepthMap, units.refraction_depth as i32)
        .with(UniformKey::HeightMap, units.heightmap as i32)
        .with(UniformKey::RefractionInverseTransform, Mat4::IDENTITY)
        .with(UniformKey::ViewportDimensions, config.screen_size.as_vec2())
}

/// Packed global uniforms for GPU upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniformBlock {
    pub eye: [f32; 3],
    pub water_height: f32,
    pub underwater_fog_color: [f32; 4],
    pub above_water_fog_color: [f32; 4],
    pub fog_color: [f32; 4],
    pub underwater_diffuse: [f32; 4],
    pub underwater_attenuation: [f32; 3],
    pub fog_density: f32,
    pub underwater_fog_density: f32,
    pub above_water_fog_density: f32,
    /// Bit 0 DOF, bit 1 glare, bit 2 underwater scattering, bit 3 eye underwater.
    pub flags: u32,
    pub _padding: f32,
}

impl GlobalUniformBlock {
    pub fn pack(table: &UniformTable) -> Self {
        let mut flags = 0;
        for (bit, key) in [
            UniformKey::EnableDof,
            UniformKey::EnableGlare,
            UniformKey::EnableUnderwaterScattering,
            UniformKey::EyeUnderwater,
        ]
        .into_iter()
        .enumerate()
        {
            if table.get_bool(key) {
                flags |= 1 << bit;
            }
        }

        Self {
            eye: table.get_vec3(UniformKey::EyePosition).to_array(),
            water_height: table.get_f32(UniformKey::WaterHeight),
            underwater_fog_color: table.get_vec4(UniformKey::UnderwaterFogColor).to_array(),
            above_water_fog_color: table.get_vec4(UniformKey::AboveWaterFogColor).to_array(),
            fog_color: table.get_vec4(UniformKey::FogColor).to_array(),
            underwater_diffuse: table.get_vec4(UniformKey::UnderwaterDiffuse).to_array(),
            underwater_attenuation: table.get_vec3(UniformKey::UnderwaterAttenuation).to_array(),
            fog_density: table.get_f32(UniformKey::FogDensity),
            underwater_fog_density: table.get_f32(UniformKey::UnderwaterFogDensity),
            above_water_fog_density: table.get_f32(UniformKey::AboveWaterFogDensity),
            flags,
            _padding: 0.0,
        }
    }
}

/// Packed surface uniforms for GPU upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceUniformBlock {
    pub refraction_inverse_transform: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    /// Bit 0 reflections, bit 1 refractions.
    pub flags: u32,
    pub _padding: f32,
}

impl SurfaceUniformBlock {
    pub fn pack(table: &UniformTable) -> Self {
        let mut flags = 0;
        if table.get_bool(UniformKey::EnableReflections) {
            flags |= 1;
        }
        if table.get_bool(UniformKey::EnableRefractions) {
            flags |= 2;
        }
        Self {
            refraction_inverse_transform: table
                .get_mat4(UniformKey::RefractionInverseTransform)
                .to_cols_array_2d(),
            viewport: table.get_vec2(UniformKey::ViewportDimensions).to_array(),
            flags,
            _padding: 0.0,
        }
    }
}

/// Packed pass-local uniforms for GPU upload.
///
/// Pass tables carry only what their pass sets, so absent keys pack as zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PassUniformBlock {
    pub dof_near: f32,
    pub dof_far: f32,
    pub dof_focus: f32,
    pub dof_far_clamp: f32,
    /// Bit 0 glare.
    pub flags: u32,
    pub _padding: [u32; 3],
}

impl PassUniformBlock {
    pub fn pack(table: &UniformTable) -> Self {
        let float = |key| match table.try_get(key) {
            Some(UniformValue::Float(value)) => value,
            _ => 0.0,
        };
        let glare = matches!(
            table.try_get(UniformKey::EnableGlare),
            Some(UniformValue::Bool(true))
        );

        Self {
            dof_near: float(UniformKey::DofNear),
            dof_far: float(UniformKey::DofFar),
            dof_focus: float(UniformKey::DofFocus),
            dof_far_clamp: float(UniformKey::DofFarClamp),
            flags: glare as u32,
            _padding: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fog_density_is_negated_square_times_log2e() {
        let d = exp2_fog_density(0.01);
        assert!((d - (-0.0001 * LOG2E)).abs() < 1e-9);
        assert_eq!(exp2_fog_density(0.0), 0.0);
    }

    #[test]
    fn global_defaults_start_above_water() {
        let config = EffectConfig::default();
        let table = default_global_uniforms(&config, 2.5);
        assert_eq!(table.get_f32(UniformKey::FogDensity), 0.0012);
        assert_eq!(table.get_vec4(UniformKey::FogColor), config.above_water_fog.color);
        assert_eq!(table.get_f32(UniformKey::WaterHeight), 2.5);
        assert!(!table.get_bool(UniformKey::EyeUnderwater));
    }

    #[test]
    fn surface_defaults_bind_configured_units() {
        let table = default_surface_uniforms(&EffectConfig::default());
        assert_eq!(table.get_int(UniformKey::ReflectionMap), 1);
        assert_eq!(table.get_int(UniformKey::RefractionMap), 2);
        assert_eq!(table.get_int(UniformKey::RefractionDepthMap), 3);
        assert_eq!(table.get_int(UniformKey::HeightMap), 7);
        assert_eq!(
            table.get_vec2(UniformKey::ViewportDimensions),
            Vec2::new(1024.0, 768.0)
        );
    }

    #[test]
    #[should_panic(expected = "queried before it was set")]
    fn missing_uniform_panics() {
        UniformTable::new().get(UniformKey::EyePosition);
    }

    #[test]
    #[should_panic(expected = "expected Float")]
    fn mistyped_uniform_panics() {
        let table = UniformTable::new().with(UniformKey::WaterHeight, true);
        table.get_f32(UniformKey::WaterHeight);
    }

    #[test]
    fn global_block_packs_flags() {
        let config = EffectConfig::default()
            .with_effect(crate::Effect::Glare, true)
            .with_effect(crate::Effect::UnderwaterScattering, true);
        let mut table = default_global_uniforms(&config, 0.0);
        table.set(UniformKey::EyeUnderwater, true);
        let block = GlobalUniformBlock::pack(&table);
        assert_eq!(block.flags, 0b1110);
        assert_eq!(std::mem::size_of::<GlobalUniformBlock>() % 16, 0);
    }

    #[test]
    fn surface_block_is_std140_sized() {
        let block = SurfaceUniformBlock::pack(&default_surface_uniforms(&EffectConfig::default()));
        assert_eq!(block.viewport, [1024.0, 768.0]);
        assert_eq!(std::mem::size_of::<SurfaceUniformBlock>(), 80);
    }

    #[test]
    fn pass_block_carries_circle_of_confusion() {
        let config = EffectConfig::default();
        let block = PassUniformBlock::pack(&crate::effects::dof_state(&config));
        assert_ne!(block, PassUniformBlock::pack(&UniformTable::new()));
        assert_eq!(block.dof_far, config.dof.far);
        assert_eq!(block.dof_focus, config.dof.focus);
        assert_eq!(block.dof_far_clamp, config.dof.far_clamp);
        assert_eq!(block.flags, 0);
    }

    #[test]
    fn pass_block_flags_glare_capture() {
        let block = PassUniformBlock::pack(&UniformTable::new().with(UniformKey::EnableGlare, true));
        assert_eq!(block.flags, 1);
        assert_eq!(block.dof_far, 0.0);
        assert_eq!(std::mem::size_of::<PassUniformBlock>(), 32);
    }
}
