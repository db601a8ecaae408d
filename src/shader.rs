//! Shader program keys and compile-time defines.
//!
//! Shader source and compilation live with the host. Passes name the program
//! they need with a [`ShaderProgram`] and the host's shader manager resolves
//! it, typically by [`ShaderProgram::key`].

/// Every program the pass graph refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Default lit scene program installed on the global state.
    Scene,
    /// Depth-only program used by the heightmap capture.
    Heightmap,
    /// Quarter-resolution downsample.
    Downsample,
    /// Downsample that keeps only pixels above the glare threshold.
    DownsampleGlare,
    GaussianX,
    GaussianY,
    /// Blends sharp and blurred colour by circle of confusion.
    DofCombiner,
    /// Full-screen composite surface with optional refraction wobble.
    Distortion,
    /// One directional streak step.
    Streak,
    /// Adds the four streak directions onto the scene colour.
    GlareComposite,
    /// Volumetric ray geometry.
    GodRays,
    /// Screen-space blend of the god-ray capture.
    GodRayBlend,
}

impl ShaderProgram {
    /// Stable lookup key for the host's shader manager.
    pub fn key(self) -> &'static str {
        match self {
            ShaderProgram::Scene => "ocean_scene",
            ShaderProgram::Heightmap => "heightmap",
            ShaderProgram::Downsample => "downsample",
            ShaderProgram::DownsampleGlare => "downsample_glare",
            ShaderProgram::GaussianX => "gaussian_x",
            ShaderProgram::GaussianY => "gaussian_y",
            ShaderProgram::DofCombiner => "dof_combiner",
            ShaderProgram::Distortion => "distortion",
            ShaderProgram::Streak => "streak",
            ShaderProgram::GlareComposite => "glare_composite",
            ShaderProgram::GodRays => "god_rays",
            ShaderProgram::GodRayBlend => "god_ray_blend",
        }
    }
}

/// Preprocessor defines that select shader permutations.
///
/// The ocean surface compiles against these; when they change across a
/// rebuild the surface is told to recompile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    /// Attenuate waves towards the shore using the heightmap capture.
    pub shore_to_sinus: bool,
    /// Light the scene programs read the sun from.
    pub light_index: u32,
}

impl ShaderDefines {
    /// `(name, value)` pairs in the form a preprocessor expects.
    pub fn pairs(&self) -> [(&'static str, String); 2] {
        [
            ("SHORE_TO_SINUS", u32::from(self.shore_to_sinus).to_string()),
            ("LIGHT_ID", self.light_index.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_render_as_integers() {
        let defines = ShaderDefines {
            shore_to_sinus: true,
            light_index: 2,
        };
        let pairs = defines.pairs();
        assert_eq!(pairs[0], ("SHORE_TO_SINUS", "1".to_string()));
        assert_eq!(pairs[1], ("LIGHT_ID", "2".to_string()));
    }
}
