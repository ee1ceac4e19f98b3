//! GPU Backend Abstraction
//!
//! Every GPU-side object the pipeline touches (textures, framebuffers, linked
//! programs, vertex/index buffers) is referenced through an opaque handle and
//! owned by a [`RenderBackend`]. Higher layers only allocate and release
//! handles; they never hold API objects directly.
//!
//! Two implementations ship with the crate:
//!
//! - [`WgpuBackend`]: records passes with wgpu and presents to a window surface.
//! - [`HeadlessBackend`]: no GPU at all. Tracks every handle, validates the
//!   same invariants and keeps an event log of what a frame did.
//!
//! # Frame protocol
//!
//! ```text
//! begin_frame
//!   begin_pass(target)          exactly one target active at a time
//!     bind_texture(unit, tex)*
//!     draw(program, uniforms, mesh)*
//!     unbind_texture(unit)*
//!   end_pass
//!   ...
//! end_frame                     submit + present
//! ```

pub mod headless;
mod tracked_pass;
pub mod wgpu_backend;

pub use headless::{BackendEvent, HeadlessBackend};
pub use wgpu_backend::{WgpuBackend, WgpuContext};

use slotmap::new_key_type;

use crate::errors::{Result, SssError};
use crate::renderer::shader::LinkedProgram;
use crate::resources::VertexLayout;

new_key_type! {
    /// A GPU texture.
    pub struct TextureHandle;
    /// A set of textures bound together as a draw target.
    pub struct FramebufferHandle;
    /// A linked vertex + fragment program with its fixed-function state.
    pub struct ProgramHandle;
    /// An uploaded vertex buffer with an optional index buffer.
    pub struct MeshHandle;
}

/// Maximum number of texture units a program may declare.
pub const MAX_TEXTURE_UNITS: u32 = 16;
/// Binding slot of the shared filtering sampler in group 1.
pub const LINEAR_SAMPLER_BINDING: u32 = 16;
/// Binding slot of the shared comparison sampler in group 1.
pub const SHADOW_SAMPLER_BINDING: u32 = 17;

// ─── Descriptors ──────────────────────────────────────────────────────────────

/// What a texture will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Rendered into by a pass and sampled by later passes.
    RenderTarget,
    /// Uploaded once from the CPU and sampled.
    Sampled,
}

#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: TextureUsage,
}

/// Size and format of a live texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

#[derive(Debug, Clone)]
pub struct FramebufferDesc<'a> {
    pub label: &'a str,
    /// Color attachments, indexed by slot.
    pub colors: &'a [TextureHandle],
    pub depth_stencil: Option<TextureHandle>,
}

/// Depth test configuration baked into a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthMode {
    pub test: bool,
    pub write: bool,
}

impl DepthMode {
    pub const DISABLED: Self = Self {
        test: false,
        write: false,
    };
    pub const READ_WRITE: Self = Self {
        test: true,
        write: true,
    };
}

/// Stencil behaviour baked into a program. The reference value comes from
/// the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilMode {
    Disabled,
    /// Replace the stencil value with the reference on every covered pixel.
    Write,
    /// Only shade pixels whose stencil equals the reference.
    TestEqual,
}

/// Everything needed to turn a [`LinkedProgram`] into a drawable pipeline.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub linked: &'a LinkedProgram,
    pub vertex_layout: &'a VertexLayout,
    pub color_formats: &'a [wgpu::TextureFormat],
    pub depth_stencil_format: Option<wgpu::TextureFormat>,
    pub depth: DepthMode,
    pub stencil: StencilMode,
    pub cull_back_faces: bool,
}

#[derive(Debug, Clone)]
pub struct MeshDesc<'a> {
    pub label: &'a str,
    pub vertices: &'a [u8],
    pub vertex_count: u32,
    /// Empty for non-indexed meshes.
    pub indices: &'a [u32],
    pub layout: &'a VertexLayout,
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassTarget {
    Framebuffer(FramebufferHandle),
    /// The swap-chain image of the current frame.
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadAction<T> {
    Clear(T),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PassDesc<'a> {
    pub label: &'a str,
    pub target: PassTarget,
    pub color: LoadAction<wgpu::Color>,
    pub depth: LoadAction<f32>,
    pub stencil: LoadAction<u32>,
    pub stencil_reference: u32,
    pub viewport: Viewport,
}

/// Device limits the pipeline needs to respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendLimits {
    pub max_texture_dimension: u32,
}

/// Number of live objects of each kind, for leak checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub textures: usize,
    pub framebuffers: usize,
    pub programs: usize,
    pub meshes: usize,
}

impl ResourceCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.textures + self.framebuffers + self.programs + self.meshes
    }
}

// ─── Backend Trait ────────────────────────────────────────────────────────────

/// The seam between the pipeline and a graphics API.
///
/// All methods are called from the single render thread. Destroying an
/// unknown or already destroyed handle is a no-op.
pub trait RenderBackend {
    fn limits(&self) -> BackendLimits;

    fn surface_size(&self) -> (u32, u32);

    fn surface_format(&self) -> wgpu::TextureFormat;

    /// Reconfigures the presentation surface. Zero sizes are ignored.
    fn resize_surface(&mut self, width: u32, height: u32);

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle>;

    /// Uploads tightly packed texel rows covering the whole texture.
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<()>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo>;

    /// Binds textures together as a draw target after checking completeness.
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle>;

    fn destroy_program(&mut self, program: ProgramHandle);

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<MeshHandle>;

    fn destroy_mesh(&mut self, mesh: MeshHandle);

    fn begin_frame(&mut self) -> Result<()>;

    fn begin_pass(&mut self, desc: &PassDesc) -> Result<()>;

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<()>;

    fn unbind_texture(&mut self, unit: u32);

    /// Draws `mesh` with `program`; `uniforms` is the program's uniform block.
    fn draw(&mut self, program: ProgramHandle, uniforms: &[u8], mesh: MeshHandle) -> Result<()>;

    fn end_pass(&mut self) -> Result<()>;

    /// Submits recorded work and presents the surface.
    fn end_frame(&mut self) -> Result<()>;

    fn resource_counts(&self) -> ResourceCounts;
}

// ─── Shared Validation ────────────────────────────────────────────────────────

/// Rejects zero-sized textures and textures beyond the device limit.
pub fn validate_texture_size(desc: &TextureDesc, limits: BackendLimits) -> Result<()> {
    let max = limits.max_texture_dimension;
    if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
        return Err(SssError::TextureTooLarge {
            label: desc.label.to_string(),
            width: desc.width,
            height: desc.height,
            max,
        });
    }
    Ok(())
}

/// Framebuffer completeness check shared by all backends.
///
/// Returns the common attachment size on success.
pub fn validate_framebuffer(
    desc: &FramebufferDesc,
    lookup: impl Fn(TextureHandle) -> Option<TextureInfo>,
) -> Result<(u32, u32)> {
    let incomplete = |reason: String| SssError::FramebufferIncomplete {
        target: desc.label.to_string(),
        reason,
    };

    if desc.colors.is_empty() && desc.depth_stencil.is_none() {
        return Err(incomplete("no attachments".into()));
    }

    let mut size: Option<(u32, u32)> = None;
    let mut check_size = |info: &TextureInfo, slot: &str| -> Result<()> {
        match size {
            None => {
                size = Some((info.width, info.height));
                Ok(())
            }
            Some((w, h)) if (w, h) == (info.width, info.height) => Ok(()),
            Some((w, h)) => Err(incomplete(format!(
                "{slot} is {}x{} but other attachments are {w}x{h}",
                info.width, info.height
            ))),
        }
    };

    for (slot, &texture) in desc.colors.iter().enumerate() {
        let info =
            lookup(texture).ok_or_else(|| incomplete(format!("color {slot} is not a live texture")))?;
        if info.format.is_depth_stencil_format() {
            return Err(incomplete(format!(
                "color {slot} has depth format {:?}",
                info.format
            )));
        }
        check_size(&info, &format!("color {slot}"))?;
    }

    if let Some(texture) = desc.depth_stencil {
        let info = lookup(texture)
            .ok_or_else(|| incomplete("depth-stencil is not a live texture".into()))?;
        if !info.format.is_depth_stencil_format() {
            return Err(incomplete(format!(
                "depth-stencil has color format {:?}",
                info.format
            )));
        }
        check_size(&info, "depth-stencil")?;
    }

    size.ok_or_else(|| incomplete("no attachments".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn textures() -> (SlotMap<TextureHandle, TextureInfo>, [TextureHandle; 3]) {
        let mut map = SlotMap::with_key();
        let color = map.insert(TextureInfo {
            width: 64,
            height: 32,
            format: wgpu::TextureFormat::Rgba16Float,
        });
        let depth = map.insert(TextureInfo {
            width: 64,
            height: 32,
            format: wgpu::TextureFormat::Depth24PlusStencil8,
        });
        let small = map.insert(TextureInfo {
            width: 32,
            height: 32,
            format: wgpu::TextureFormat::Rgba8Unorm,
        });
        (map, [color, depth, small])
    }

    #[test]
    fn complete_framebuffer_reports_size() {
        let (map, [color, depth, _]) = textures();
        let desc = FramebufferDesc {
            label: "ok",
            colors: &[color],
            depth_stencil: Some(depth),
        };
        let size = validate_framebuffer(&desc, |h| map.get(h).copied()).unwrap();
        assert_eq!(size, (64, 32));
    }

    #[test]
    fn mismatched_sizes_are_incomplete() {
        let (map, [color, _, small]) = textures();
        let desc = FramebufferDesc {
            label: "mismatch",
            colors: &[color, small],
            depth_stencil: None,
        };
        let err = validate_framebuffer(&desc, |h| map.get(h).copied()).unwrap_err();
        assert!(matches!(err, SssError::FramebufferIncomplete { .. }));
    }

    #[test]
    fn depth_format_in_color_slot_is_incomplete() {
        let (map, [_, depth, _]) = textures();
        let desc = FramebufferDesc {
            label: "swapped",
            colors: &[depth],
            depth_stencil: None,
        };
        assert!(validate_framebuffer(&desc, |h| map.get(h).copied()).is_err());
    }

    #[test]
    fn empty_framebuffer_is_incomplete() {
        let desc = FramebufferDesc {
            label: "empty",
            colors: &[],
            depth_stencil: None,
        };
        assert!(validate_framebuffer(&desc, |_| None).is_err());
    }
}
