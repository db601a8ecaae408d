//! Headless GPU context.
//!
//! [`GpuContext`] holds the wgpu device and queue that
//! [`GpuExecutor`](crate::GpuExecutor) records pass work on. There is no
//! surface: final composites land in an off-screen frame target sized by
//! [`width`](GpuContext::width) and [`height`](GpuContext::height).
//!
//! # Example
//!
//! ```no_run
//! use seascape::GpuContext;
//!
//! let gpu = GpuContext::headless(1024, 768)?;
//! println!("frame: {}x{}", gpu.width(), gpu.height());
//! # Ok::<(), seascape::SeascapeError>(())
//! ```

use crate::error::Result;

/// Device, queue and frame size for off-screen rendering.
pub struct GpuContext {
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Format of the off-screen frame the final composites render into.
    pub frame_format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl GpuContext {
    /// Creates a device without a presentation surface.
    ///
    /// Blocks on adapter and device creation with `pollster`.
    ///
    /// # Errors
    ///
    /// Fails if no adapter is available or the device cannot be created.
    pub fn headless(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Seascape Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        Ok(Self {
            device,
            queue,
            frame_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: width.max(1),
            height: height.max(1),
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}
