//! A [`PassExecutor`] that encodes the frame with wgpu.
//!
//! Every [`RenderPass`] becomes one wgpu render pass over its registry
//! textures (or the off-screen frame), with the pass's clear behaviour and
//! viewport. Shared uniform tables are packed into their `#[repr(C)]` blocks
//! and written into one persistent uniform buffer per [`StateLayer`]. Each
//! push takes a fresh dynamic-offset slot, so every pass sees the values
//! current at the time it runs, and the executor keeps
//! [`UniformBindings::bind_group`] bound at [`UNIFORM_GROUP`] with the
//! offsets of the innermost push of each layer. Pipelines and draw submission
//! belong to the host's shader layer, which builds its pipeline layouts from
//! [`UniformBindings::layout`]; draws are counted and traced here.
//!
//! The shader side of the bind group:
//!
//! ```wgsl
//! @group(0) @binding(0) var<uniform> global: GlobalUniforms;
//! @group(0) @binding(1) var<uniform> surface: SurfaceUniforms;
//! @group(0) @binding(2) var<uniform> pass: PassUniforms;
//! ```
//!
//! # Example
//!
//! ```ignore
//! let gpu = GpuContext::headless(1024, 768)?;
//! let mut executor = GpuExecutor::new(&gpu, &TextureRegistry::new());
//! executor.begin_frame();
//! scene.traverse(&camera, &mut surface, &mut executor);
//! executor.finish_frame();
//! ```

use glam::{UVec2, Vec4};

use crate::camera::Viewport;
use crate::gpu::GpuContext;
use crate::render_graph::{
    Attachment, DEPTH_FORMAT, DrawCommand, GpuTargets, PassExecutor, PassInvocation,
    RenderPass, RenderTarget, StateLayer, TextureDesc, TextureId, TextureRegistry,
};
use crate::uniforms::{GlobalUniformBlock, PassUniformBlock, SurfaceUniformBlock, UniformTable};

/// Bind group index the shared uniform blocks are bound at in every pass.
pub const UNIFORM_GROUP: u32 = 0;

/// Dynamic-offset slots per layer buffer. Slot 0 stays zeroed.
pub const UNIFORM_SLOTS: u64 = 64;

/// Encodes frames onto a [`GpuContext`].
pub struct GpuExecutor<'a> {
    gpu: &'a GpuContext,
    targets: GpuTargets,
    frame: RenderTarget,
    frame_depth: RenderTarget,
    uniforms: UniformBindings,
    encoder: Option<wgpu::CommandEncoder>,
    active: Option<wgpu::RenderPass<'static>>,
    main_view_open: bool,
    draws: usize,
}

impl<'a> GpuExecutor<'a> {
    /// Allocates every texture in `registry` plus a frame the size of `gpu`.
    pub fn new(gpu: &'a GpuContext, registry: &TextureRegistry) -> Self {
        let size = UVec2::new(gpu.width(), gpu.height());
        let (frame, frame_depth) = frame_descs(size, gpu.frame_format);

        Self {
            gpu,
            targets: GpuTargets::allocate(gpu, registry),
            frame: RenderTarget::new(gpu, &frame),
            frame_depth: RenderTarget::new(gpu, &frame_depth),
            uniforms: UniformBindings::new(gpu),
            encoder: None,
            active: None,
            main_view_open: false,
            draws: 0,
        }
    }

    /// Reallocates targets to match a rebuilt pipeline.
    pub fn sync_targets(&mut self, registry: &TextureRegistry) {
        self.targets.sync(self.gpu, registry);
    }

    /// The off-screen frame the composites and main view render into.
    pub fn frame(&self) -> &RenderTarget {
        &self.frame
    }

    /// Layout and bind group of the shared uniform blocks.
    pub fn uniforms(&self) -> &UniformBindings {
        &self.uniforms
    }

    /// Starts a frame and clears the frame target.
    pub fn begin_frame(&mut self) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Seascape Frame Encoder"),
            });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame clear"),
                color_attachments: &[Some(color_attachment(
                    &self.frame.view,
                    Some(Vec4::new(0.0, 0.0, 0.0, 1.0)),
                ))],
                depth_stencil_attachment: Some(depth_attachment(&self.frame_depth.view, Some(1.0))),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.encoder = Some(encoder);
        self.uniforms.reset();
        self.draws = 0;
    }

    /// Submits the frame. Returns the number of draws issued.
    pub fn finish_frame(&mut self) -> usize {
        self.close_main_view();
        if let Some(encoder) = self.encoder.take() {
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        }
        log::trace!("frame submitted with {} draws", self.draws);
        self.draws
    }

    fn close_main_view(&mut self) {
        if self.main_view_open {
            self.active = None;
            self.main_view_open = false;
        }
    }

    /// Draws outside any pass land in the frame on top of what is already there.
    fn open_main_view(&mut self) {
        let plan = AttachmentPlan::main_view();
        let viewport = Viewport::full(self.frame.desc().size);
        self.open_pass("main view", &plan, viewport);
        self.main_view_open = true;
    }

    fn open_pass(&mut self, label: &str, plan: &AttachmentPlan, viewport: Viewport) {
        let frame = &self.frame;
        let frame_depth = &self.frame_depth;
        let targets = &self.targets;
        let resolve = |source: AttachmentSource| match source {
            AttachmentSource::Frame => frame,
            AttachmentSource::FrameDepth => frame_depth,
            AttachmentSource::Texture(id) => targets.get(id),
        };

        let colors: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = plan
            .colors
            .iter()
            .map(|slot| slot.map(|(source, clear)| color_attachment(&resolve(source).view, clear)))
            .collect();
        let depth = plan
            .depth
            .map(|(source, clear)| depth_attachment(&resolve(source).view, clear));
        let attachment_size = plan
            .first_source()
            .map_or(frame.desc().size, |source| resolve(source).desc().size);

        let mut render_pass = open_encoder(&mut self.encoder)
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &colors,
                depth_stencil_attachment: depth,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

        if let Some(viewport) = clamp_viewport(viewport, attachment_size) {
            render_pass.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
        }
        self.active = Some(render_pass);
        self.bind_uniforms();
    }

    /// Rebinds the shared uniforms with the current per-layer offsets.
    fn bind_uniforms(&mut self) {
        if let Some(pass) = self.active.as_mut() {
            pass.set_bind_group(
                UNIFORM_GROUP,
                self.uniforms.bind_group(),
                &self.uniforms.offsets(),
            );
        }
    }
}

impl PassExecutor for GpuExecutor<'_> {
    fn pipeline_rebuilt(&mut self, textures: &TextureRegistry) {
        self.sync_targets(textures);
    }

    fn begin_pass(&mut self, invocation: &PassInvocation<'_>) {
        self.close_main_view();
        let pass: &RenderPass = invocation.pass;
        log::trace!("begin pass `{}`", pass.label);
        self.open_pass(&pass.label, &AttachmentPlan::for_pass(pass), pass.viewport);
    }

    fn end_pass(&mut self, pass: &RenderPass) {
        self.active = None;
        log::trace!("end pass `{}`", pass.label);
    }

    fn push_state(&mut self, layer: StateLayer, uniforms: &UniformTable) {
        let queue = &self.gpu.queue;
        match layer {
            StateLayer::Global => {
                let block = GlobalUniformBlock::pack(uniforms);
                self.uniforms.write(queue, layer, bytemuck::bytes_of(&block));
            }
            StateLayer::Surface => {
                let block = SurfaceUniformBlock::pack(uniforms);
                self.uniforms.write(queue, layer, bytemuck::bytes_of(&block));
            }
            StateLayer::Pass => {
                let block = PassUniformBlock::pack(uniforms);
                self.uniforms.write(queue, layer, bytemuck::bytes_of(&block));
            }
        }
        self.bind_uniforms();
    }

    fn pop_state(&mut self, layer: StateLayer) {
        self.uniforms.pop(layer);
        self.bind_uniforms();
    }

    fn draw(&mut self, command: DrawCommand<'_>) {
        if self.active.is_none() {
            self.open_main_view();
        }
        self.draws += 1;
        match command {
            DrawCommand::Scene {
                category, items, ..
            } => log::trace!("draw {} items of {:?}", items.len(), category),
            DrawCommand::Quad(quad) => log::trace!("draw quad {}", quad.program.key()),
            DrawCommand::GodRays(geometry) => log::trace!("draw {} god rays", geometry.ray_count),
            DrawCommand::Silt { items, layer } => log::trace!(
                "draw {} silt items at intensity {}",
                items.len(),
                layer.settings.intensity
            ),
        }
    }
}

/// The persistent uniform buffers of the three state layers and the bind
/// group exposing them.
pub struct UniformBindings {
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    global: LayerBuffer,
    surface: LayerBuffer,
    pass: LayerBuffer,
}

struct LayerBuffer {
    buffer: wgpu::Buffer,
    cursor: SlotCursor,
}

impl UniformBindings {
    fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment.max(1));

        let layer = |label: &str, block_size: usize| {
            let block_size = block_size as u64;
            let stride = slot_stride(block_size, alignment);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: stride * UNIFORM_SLOTS,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (
                LayerBuffer {
                    buffer,
                    cursor: SlotCursor::new(stride, UNIFORM_SLOTS),
                },
                block_size,
            )
        };
        let (global, global_size) =
            layer("Global Uniforms", std::mem::size_of::<GlobalUniformBlock>());
        let (surface, surface_size) =
            layer("Surface Uniforms", std::mem::size_of::<SurfaceUniformBlock>());
        let (pass, pass_size) = layer("Pass Uniforms", std::mem::size_of::<PassUniformBlock>());

        let layout_entry = |binding: u32, size: u64| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(size),
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Seascape Uniforms Bind Group Layout"),
            entries: &[
                layout_entry(0, global_size),
                layout_entry(1, surface_size),
                layout_entry(2, pass_size),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Seascape Uniforms Bind Group"),
            layout: &layout,
            entries: &[
                slot_entry(0, &global.buffer, global_size),
                slot_entry(1, &surface.buffer, surface_size),
                slot_entry(2, &pass.buffer, pass_size),
            ],
        });

        Self {
            layout,
            bind_group,
            global,
            surface,
            pass,
        }
    }

    /// Layout for the host's pipeline layouts, at [`UNIFORM_GROUP`].
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Dynamic offsets of the innermost push of each layer, in binding order.
    pub fn offsets(&self) -> [wgpu::DynamicOffset; 3] {
        [
            self.global.cursor.current() as wgpu::DynamicOffset,
            self.surface.cursor.current() as wgpu::DynamicOffset,
            self.pass.cursor.current() as wgpu::DynamicOffset,
        ]
    }

    fn layer_mut(&mut self, layer: StateLayer) -> &mut LayerBuffer {
        match layer {
            StateLayer::Global => &mut self.global,
            StateLayer::Surface => &mut self.surface,
            StateLayer::Pass => &mut self.pass,
        }
    }

    fn write(&mut self, queue: &wgpu::Queue, layer: StateLayer, bytes: &[u8]) {
        let target = self.layer_mut(layer);
        let offset = target.cursor.push();
        queue.write_buffer(&target.buffer, offset, bytes);
    }

    fn pop(&mut self, layer: StateLayer) {
        self.layer_mut(layer).cursor.pop(layer);
    }

    fn reset(&mut self) {
        self.global.cursor.reset();
        self.surface.cursor.reset();
        self.pass.cursor.reset();
    }
}

/// Binds one block-sized window of `buffer`; the dynamic offset picks the slot.
fn slot_entry(binding: u32, buffer: &wgpu::Buffer, size: u64) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer,
            offset: 0,
            size: wgpu::BufferSize::new(size),
        }),
    }
}

/// Hands out one slot per push and tracks the push stack of a layer.
#[derive(Debug)]
struct SlotCursor {
    stride: u64,
    capacity: u64,
    next: u64,
    stack: Vec<u64>,
}

impl SlotCursor {
    fn new(stride: u64, capacity: u64) -> Self {
        Self {
            stride,
            capacity,
            next: 1,
            stack: Vec::new(),
        }
    }

    /// Reserves the next slot and makes it current. Returns its byte offset.
    fn push(&mut self) -> u64 {
        assert!(
            self.next < self.capacity,
            "more than {} uniform pushes of one layer in a frame",
            self.capacity - 1
        );
        let offset = self.next * self.stride;
        self.next += 1;
        self.stack.push(offset);
        offset
    }

    fn pop(&mut self, layer: StateLayer) {
        assert!(self.stack.pop().is_some(), "popped {layer:?} with nothing pushed");
    }

    /// Byte offset of the innermost push, or the zeroed slot 0.
    fn current(&self) -> u64 {
        self.stack.last().copied().unwrap_or(0)
    }

    fn reset(&mut self) {
        self.next = 1;
        self.stack.clear();
    }
}

/// Rounds a block up to the device's dynamic-offset alignment.
fn slot_stride(block_size: u64, alignment: u64) -> u64 {
    block_size.div_ceil(alignment) * alignment
}

/// Colour and depth descriptions of the off-screen frame.
fn frame_descs(size: UVec2, format: wgpu::TextureFormat) -> (TextureDesc, TextureDesc) {
    let size = size.max(UVec2::ONE);
    (
        TextureDesc {
            label: "frame".to_string(),
            size,
            format,
        },
        TextureDesc {
            label: "frame depth".to_string(),
            size,
            format: DEPTH_FORMAT,
        },
    )
}

/// Where an attachment's texture comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
enum AttachmentSource {
    Frame,
    FrameDepth,
    Texture(TextureId),
}

/// The attachments of one wgpu pass, with their clear values. `None` clears
/// mean load.
#[derive(Clone, Debug, PartialEq)]
struct AttachmentPlan {
    colors: Vec<Option<(AttachmentSource, Option<Vec4>)>>,
    depth: Option<(AttachmentSource, Option<f32>)>,
}

impl AttachmentPlan {
    fn for_pass(pass: &RenderPass) -> Self {
        if pass.renders_to_frame() {
            return Self {
                colors: vec![Some((AttachmentSource::Frame, pass.clear.color))],
                depth: Some((AttachmentSource::FrameDepth, pass.clear.depth)),
            };
        }

        let mut colors = Vec::new();
        let mut depth = None;
        for target in &pass.targets {
            let source = AttachmentSource::Texture(target.texture);
            match target.attachment {
                Attachment::Color(slot) => {
                    let slot = slot as usize;
                    while colors.len() <= slot {
                        colors.push(None);
                    }
                    colors[slot] = Some((source, pass.clear.color));
                }
                Attachment::Depth => depth = Some((source, pass.clear.depth)),
            }
        }
        Self { colors, depth }
    }

    /// Loads both frame attachments.
    fn main_view() -> Self {
        Self {
            colors: vec![Some((AttachmentSource::Frame, None))],
            depth: Some((AttachmentSource::FrameDepth, None)),
        }
    }

    /// The attachment the viewport is clamped against.
    fn first_source(&self) -> Option<AttachmentSource> {
        self.colors
            .iter()
            .flatten()
            .map(|(source, _)| *source)
            .chain(self.depth.map(|(source, _)| source))
            .next()
    }
}

fn open_encoder(encoder: &mut Option<wgpu::CommandEncoder>) -> &mut wgpu::CommandEncoder {
    match encoder.as_mut() {
        Some(encoder) => encoder,
        None => panic!("GpuExecutor::begin_frame must run before any pass"),
    }
}

fn color_attachment(
    view: &wgpu::TextureView,
    clear: Option<Vec4>,
) -> wgpu::RenderPassColorAttachment<'_> {
    let load = match clear {
        Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
            r: c.x as f64,
            g: c.y as f64,
            b: c.z as f64,
            a: c.w as f64,
        }),
        None => wgpu::LoadOp::Load,
    };
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

fn depth_attachment(
    view: &wgpu::TextureView,
    clear: Option<f32>,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    let load = match clear {
        Some(depth) => wgpu::LoadOp::Clear(depth),
        None => wgpu::LoadOp::Load,
    };
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

/// Fits `viewport` inside an attachment of `size`. `None` if nothing is left.
fn clamp_viewport(viewport: Viewport, size: UVec2) -> Option<Viewport> {
    let width = viewport.width.min(size.x.saturating_sub(viewport.x));
    let height = viewport.height.min(size.y.saturating_sub(viewport.y));
    (width > 0 && height > 0).then(|| Viewport::new(viewport.x, viewport.y, width, height))
}
