//! Error types.
//!
//! Only two boundaries in this crate can fail at runtime: validating an
//! [`EffectConfig`](crate::EffectConfig) handed in by the host, and creating
//! the headless GPU backend. Everything else (zero-sized textures reaching the
//! pass factory, uniform lookups before a rebuild, executing a pass with no
//! content) is a programming error and panics.

use thiserror::Error;

/// Errors surfaced to the host application.
#[derive(Error, Debug)]
pub enum SeascapeError {
    /// A render target size in the configuration has a zero component.
    #[error("{target} texture size must be non-zero, got {width}x{height}")]
    InvalidTextureSize {
        target: &'static str,
        width: u32,
        height: u32,
    },

    /// The screen is too small for the quarter-resolution post-process buffers.
    #[error("screen size {width}x{height} is too small, both sides must be at least 4")]
    ScreenTooSmall { width: u32, height: u32 },

    /// A numeric parameter is NaN or infinite.
    #[error("parameter `{0}` must be finite")]
    NonFiniteParameter(&'static str),

    /// No compatible GPU adapter was found.
    #[error("failed to request GPU adapter: {0}")]
    AdapterRequestFailed(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SeascapeError>;
