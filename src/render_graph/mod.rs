//! Pass graph building blocks and the executors that run them.
//!
//! The effect pipeline is a small, fixed-topology graph of render passes.
//! Passes are plain data ([`RenderPass`]) built once per rebuild by the pass
//! factory and the chain builders; textures live in a [`TextureRegistry`] and
//! are referred to by [`TextureId`] so a capture can feed any later pass.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ pre-render   │───▶│  main view   │───▶│ post-render  │
//! │ captures,    │    │  surface +   │    │ composites   │
//! │ chain heads  │    │  normal      │    │ (chain tail) │
//! └──────────────┘    └──────────────┘    └──────────────┘
//!        │                                       ▲
//!        ▼                                       │
//!   registry textures ───────────────────────────┘
//! ```
//!
//! Frames are driven through the [`PassExecutor`] trait: [`FrameRecorder`]
//! writes the frame down for inspection, [`GpuExecutor`] encodes it with wgpu.
//!
//! # Example
//!
//! ```ignore
//! use seascape::render_graph::{TextureRegistry, COLOR_FORMAT, render_to_texture};
//! use seascape::SceneMask;
//!
//! let mut registry = TextureRegistry::new();
//! let target = registry.create("capture", UVec2::new(512, 512), COLOR_FORMAT);
//! let pass = render_to_texture(&registry, "capture", target).with_scene(SceneMask::NORMAL);
//! ```

mod chain;
mod executor;
mod factory;
mod gpu_executor;
mod recorder;
mod render_pass;
mod render_target;

pub use chain::PassChain;
pub use executor::{DrawCommand, PassExecutor, PassInvocation, StateLayer};
pub use factory::{pixel_projection, render_to_frame, render_to_multiple_targets, render_to_texture};
pub use gpu_executor::{GpuExecutor, UNIFORM_GROUP, UNIFORM_SLOTS, UniformBindings};
pub use recorder::{FrameEvent, FrameRecorder};
pub use render_pass::{
    Attachment, ClearMode, ClipPlane, GodRayGeometry, PassContent, PassTarget, ReferenceFrame,
    RenderPass, ScreenQuad, TextureBinding,
};
pub use render_target::{
    COLOR_FORMAT, DEPTH_FORMAT, GpuTargets, LUMINANCE_FORMAT, RenderTarget, TextureDesc,
    TextureId, TextureRegistry,
};
