//! Builders for each effect's passes.
//!
//! Every builder is a plain function of the configuration and the current
//! surface height. Textures go into the caller's registry; the returned
//! passes are owned by the caller.

mod capture;
mod dof;
mod glare;
mod god_rays;
mod silt;

pub use capture::{
    Capture, REFLECTION_CLIP_INDEX, REFRACTION_CLEAR, build_heightmap, build_reflection,
    build_refraction, mirror_matrix, reflection_view,
};
pub use dof::{DOF_PASS_COUNT, DofTextures, build_dof_chain, dof_state};
pub use glare::{GLARE_PASS_COUNT, STREAK_DIRECTIONS, STREAK_PASSES, build_glare_chain};
pub use god_rays::{GOD_RAY_CLEAR, GodRayPasses, build_god_rays};
pub use silt::{SILT_CLIP_INDEX, SiltLayer, build_silt};
