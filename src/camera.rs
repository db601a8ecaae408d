use glam::{Mat4, UVec2, Vec3};

use crate::scene_mask::SceneMask;

/// What a camera is rendering for.
///
/// Shadow and analysis cameras must not see reflections, refractions or
/// post effects, so the orchestrator gives them a plain traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CameraRole {
    #[default]
    Main,
    Shadow,
    Analysis,
}

impl CameraRole {
    /// Recognises the conventional camera names used by shadow and analysis passes.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ShadowCamera" => CameraRole::Shadow,
            "AnalysisCamera" => CameraRole::Analysis,
            _ => CameraRole::Main,
        }
    }

    pub fn bypasses_effects(self) -> bool {
        !matches!(self, CameraRole::Main)
    }
}

/// A viewport rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport covering a whole target of the given size.
    pub fn full(size: UVec2) -> Self {
        Self::new(0, 0, size.x, size.y)
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

/// The camera the current traversal is rendering from.
///
/// Matrices follow glam's column-vector convention: a world point `p` lands in
/// clip space as `projection * view * p`.
#[derive(Clone, Debug)]
pub struct CameraView {
    pub name: String,
    pub role: CameraRole,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
    /// Only content intersecting this mask is ever drawn for this camera.
    pub traversal_mask: SceneMask,
}

impl CameraView {
    pub fn new(view: Mat4, projection: Mat4, viewport: Viewport) -> Self {
        Self {
            name: String::new(),
            role: CameraRole::Main,
            view,
            projection,
            viewport,
            traversal_mask: SceneMask::all(),
        }
    }

    /// Right-handed camera at `eye` looking at `target` with +Z up.
    pub fn looking_at(eye: Vec3, target: Vec3, fov_degrees: f32, viewport: Viewport) -> Self {
        let aspect = viewport.width as f32 / viewport.height.max(1) as f32;
        let view = Mat4::look_at_rh(eye, target, Vec3::Z);
        let projection = Mat4::perspective_rh(fov_degrees.to_radians(), aspect, 1.0, 5000.0);
        Self::new(view, projection, viewport)
    }

    /// Sets the name and derives the role from it.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.role = CameraRole::from_name(&self.name);
        self
    }

    pub fn with_role(mut self, role: CameraRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_traversal_mask(mut self, mask: SceneMask) -> Self {
        self.traversal_mask = mask;
        self
    }

    /// World-space eye position recovered from the view matrix.
    pub fn eye(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_is_recovered_from_view() {
        let viewport = Viewport::new(0, 0, 800, 600);
        let camera = CameraView::looking_at(Vec3::new(3.0, -4.0, 12.0), Vec3::ZERO, 60.0, viewport);
        assert!(camera.eye().abs_diff_eq(Vec3::new(3.0, -4.0, 12.0), 1e-4));
    }

    #[test]
    fn role_follows_conventional_names() {
        let camera = CameraView::new(Mat4::IDENTITY, Mat4::IDENTITY, Viewport::full(UVec2::ONE));
        assert_eq!(camera.clone().with_name("ShadowCamera").role, CameraRole::Shadow);
        assert_eq!(camera.clone().with_name("AnalysisCamera").role, CameraRole::Analysis);
        assert_eq!(camera.with_name("Main").role, CameraRole::Main);
        assert!(CameraRole::Shadow.bypasses_effects());
        assert!(!CameraRole::Main.bypasses_effects());
    }
}
