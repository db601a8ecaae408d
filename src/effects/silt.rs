//! Underwater silt particles.
//!
//! The layer is drawn with the main cull below water only, clipped at the
//! surface, with its [`SiltSettings`] attached to the draw.

use crate::config::{EffectConfig, SiltSettings};
use crate::render_graph::ClipPlane;

/// Clip slot used by the silt layer.
pub const SILT_CLIP_INDEX: u32 = 1;

/// Underwater particulate, drawn only below the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiltLayer {
    pub settings: SiltSettings,
    /// Keeps particles at or below the water plane.
    pub clip: ClipPlane,
}

pub fn build_silt(config: &EffectConfig, surface_height: f32) -> SiltLayer {
    SiltLayer {
        settings: config.silt_settings,
        clip: ClipPlane::below(SILT_CLIP_INDEX, surface_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn silt_is_clipped_at_the_surface() {
        let silt = build_silt(&EffectConfig::default(), 3.0);
        assert_eq!(silt.settings.intensity, 0.07);
        assert!(silt.clip.distance(Vec3::new(0.0, 0.0, 2.0)) > 0.0);
        assert!(silt.clip.distance(Vec3::new(0.0, 0.0, 4.0)) < 0.0);
    }
}
