//! Scene-content categories.
//!
//! Every piece of scene content is tagged with a [`SceneMask`]. Passes select
//! what they render by intersecting their cull mask with those tags, so a node
//! tagged `REFLECTION | NORMAL` shows up in the planar reflection and in the
//! main view but never in the refraction capture.
//!
//! # Example
//!
//! ```ignore
//! use seascape::SceneMask;
//!
//! let boat = SceneMask::REFLECTION | SceneMask::REFRACTION | SceneMask::NORMAL;
//! assert!(boat.intersects(SceneMask::REFLECTION));
//! assert!(!boat.intersects(SceneMask::SILT));
//! ```

use bitflags::bitflags;

bitflags! {
    /// Disjoint category bits partitioning scene content.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SceneMask: u32 {
        /// Rendered into the planar reflection.
        const REFLECTION = 1 << 0;
        /// Rendered into the refraction colour/depth capture.
        const REFRACTION = 1 << 1;
        /// Rendered in the main view.
        const NORMAL     = 1 << 2;
        /// The ocean surface geometry.
        const SURFACE    = 1 << 3;
        /// Underwater particulate.
        const SILT       = 1 << 4;
        /// Rendered into the shoreline heightmap.
        const HEIGHTMAP  = 1 << 5;
    }
}

impl SceneMask {
    /// Number of category bits.
    pub const CATEGORY_COUNT: usize = 6;

    /// Every single-bit category, in bit order.
    pub const CATEGORIES: [SceneMask; Self::CATEGORY_COUNT] = [
        SceneMask::REFLECTION,
        SceneMask::REFRACTION,
        SceneMask::NORMAL,
        SceneMask::SURFACE,
        SceneMask::SILT,
        SceneMask::HEIGHTMAP,
    ];

    /// Bits only the orchestrator may hand out. Host content never carries them.
    pub const RESERVED: SceneMask = SceneMask::SURFACE.union(SceneMask::SILT);

    /// Index of a single-bit category within [`CATEGORIES`](Self::CATEGORIES).
    ///
    /// # Panics
    ///
    /// Panics if `self` is not exactly one category bit.
    pub fn category_index(self) -> usize {
        assert!(
            self.bits().count_ones() == 1,
            "expected a single scene category, got {self:?}"
        );
        self.bits().trailing_zeros() as usize
    }
}
