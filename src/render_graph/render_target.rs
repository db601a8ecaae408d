//! Texture descriptions for pass outputs and their GPU allocation.
//!
//! Passes never own textures. The pipeline records every texture it needs in
//! a [`TextureRegistry`] and passes refer to them through [`TextureId`]
//! handles, so one capture can be written by one pass and sampled by any
//! number of later passes (or by the ocean surface shader).

use glam::UVec2;

use crate::gpu::GpuContext;

/// Colour targets: scene captures, blur and streak buffers.
///
/// Three-channel buffers use this format too since wgpu has no RGB8 target.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Single-channel luminance written alongside scene captures.
pub const LUMINANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
/// Depth captures (refraction depth, heightmap).
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Type-safe handle to a texture recorded in a [`TextureRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) usize);

impl TextureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Size, format and debug label of a pass output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub size: UVec2,
    pub format: wgpu::TextureFormat,
}

impl TextureDesc {
    pub fn is_depth(&self) -> bool {
        self.format.is_depth_stencil_format()
    }
}

/// Every texture a pipeline renders into or samples from.
#[derive(Clone, Debug, Default)]
pub struct TextureRegistry {
    textures: Vec<TextureDesc>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new texture.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn create(
        &mut self,
        label: impl Into<String>,
        size: UVec2,
        format: wgpu::TextureFormat,
    ) -> TextureId {
        let label = label.into();
        assert!(
            size.x > 0 && size.y > 0,
            "texture `{label}` must have a non-zero size, got {}x{}",
            size.x,
            size.y
        );
        self.textures.push(TextureDesc {
            label,
            size,
            format,
        });
        TextureId(self.textures.len() - 1)
    }

    /// # Panics
    ///
    /// Panics if `id` came from another registry.
    pub fn get(&self, id: TextureId) -> &TextureDesc {
        self.textures
            .get(id.0)
            .unwrap_or_else(|| panic!("texture {id:?} is not part of this pipeline"))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &TextureDesc)> + '_ {
        self.textures
            .iter()
            .enumerate()
            .map(|(i, desc)| (TextureId(i), desc))
    }
}

/// A GPU texture allocated for one [`TextureDesc`].
///
/// Created with both `RENDER_ATTACHMENT` and `TEXTURE_BINDING` usage so a pass
/// can write it and any later pass can sample it.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used for attachments and sampling.
    pub view: wgpu::TextureView,
    desc: TextureDesc,
}

impl RenderTarget {
    /// Allocates a texture matching `desc`.
    ///
    /// # Arguments
    ///
    /// * `gpu` - The GPU context providing the device
    /// * `desc` - Size, format and debug label
    pub fn new(gpu: &GpuContext, desc: &TextureDesc) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.size.x,
                height: desc.size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            desc: desc.clone(),
        }
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    /// Reallocates if `desc` no longer matches what was allocated.
    pub fn ensure_matches(&mut self, gpu: &GpuContext, desc: &TextureDesc) {
        if self.desc != *desc {
            *self = Self::new(gpu, desc);
        }
    }
}

/// GPU allocations for every texture in a registry, indexed by [`TextureId`].
#[derive(Default)]
pub struct GpuTargets {
    targets: Vec<RenderTarget>,
}

impl GpuTargets {
    pub fn allocate(gpu: &GpuContext, registry: &TextureRegistry) -> Self {
        let mut targets = Self::default();
        targets.sync(gpu, registry);
        targets
    }

    /// Brings the allocations in line with `registry` after a rebuild.
    ///
    /// Targets whose description did not change keep their GPU texture.
    pub fn sync(&mut self, gpu: &GpuContext, registry: &TextureRegistry) {
        self.targets.truncate(registry.len());
        for (id, desc) in registry.iter() {
            match self.targets.get_mut(id.0) {
                Some(target) => target.ensure_matches(gpu, desc),
                None => self.targets.push(RenderTarget::new(gpu, desc)),
            }
        }
        log::debug!("{} render targets allocated", self.targets.len());
    }

    /// # Panics
    ///
    /// Panics if `id` was never allocated.
    pub fn get(&self, id: TextureId) -> &RenderTarget {
        self.targets
            .get(id.0)
            .unwrap_or_else(|| panic!("texture {id:?} has no GPU allocation"))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_index_in_creation_order() {
        let mut registry = TextureRegistry::new();
        let a = registry.create("a", UVec2::new(4, 4), COLOR_FORMAT);
        let b = registry.create("b", UVec2::new(8, 2), DEPTH_FORMAT);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.get(b).size, UVec2::new(8, 2));
        assert!(registry.get(b).is_depth());
        assert!(!registry.get(a).is_depth());
    }

    #[test]
    #[should_panic(expected = "non-zero size")]
    fn zero_sized_texture_panics() {
        TextureRegistry::new().create("bad", UVec2::new(0, 16), COLOR_FORMAT);
    }
}
