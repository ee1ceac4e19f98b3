//! Render Graph Context System
//!
//! Two phase-separated contexts for the render graph:
//!
//! - [`CompileContext`]: used once at init. Passes load, compile and link
//!   their programs against the formats of the targets they write.
//! - [`ExecuteContext`]: handed to every pass each frame. Carries the scene,
//!   the configuration surface and the shared GPU assets passes draw with.

use glam::Vec3;

use crate::renderer::RendererSettings;
use crate::renderer::backend::{RenderBackend, TextureHandle};
use crate::renderer::config::RenderConfig;
use crate::renderer::gpu_assets::{DefaultTextures, GpuModel};
use crate::renderer::graph::targets::{AttachmentSlot, RenderTargets};
use crate::renderer::shader::ShaderLibrary;
use crate::resources::GpuMesh;
use crate::scene::SceneState;

// ─── Graph Resource Enum ──────────────────────────────────────────────────────

/// Logical identifier for textures passed between passes.
///
/// Passes declare their inputs by *role*; the graph resolves each role to a
/// live texture at the moment the pass runs.
///
/// | Variant | Backing texture |
/// |---------|-----------------|
/// | `ShadowDepth` | `shadow` depth |
/// | `GBufferPosition` | `gbuffer` color 0 (xyz world, w linear view depth) |
/// | `GBufferNormal` | `gbuffer` color 1 (w specular strength) |
/// | `GBufferAlbedo` | `gbuffer` color 2 |
/// | `GBufferUv` | `gbuffer` color 3 |
/// | `GBufferIrradiance` | `gbuffer` color 4 |
/// | `SsssPing` | `ssss_ping` color 0 |
/// | `SsssBlurred` | `ssss_blur` color 0 |
/// | `SceneHdr` | `scene_hdr` color 0 |
/// | `SkinTransmittanceLut` | built-in 256×1 profile |
/// | `DiffuseLighting` | `SsssBlurred` if `enableBlur`, else `GBufferIrradiance` |
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GraphResource {
    ShadowDepth,
    GBufferPosition,
    GBufferNormal,
    GBufferAlbedo,
    GBufferUv,
    GBufferIrradiance,
    SsssPing,
    SsssBlurred,
    SceneHdr,
    SkinTransmittanceLut,
    /// Resolved every frame from the configuration surface.
    DiffuseLighting,
}

impl GraphResource {
    /// Follows the per-frame indirection of [`GraphResource::DiffuseLighting`].
    #[must_use]
    pub fn resolve_role(self, config: &RenderConfig) -> Self {
        match self {
            Self::DiffuseLighting if config.enable_blur() => Self::SsssBlurred,
            Self::DiffuseLighting => Self::GBufferIrradiance,
            other => other,
        }
    }

    /// The render target attachment backing a concrete role.
    #[must_use]
    pub fn attachment(self) -> Option<(&'static str, AttachmentSlot)> {
        use AttachmentSlot::{Color, DepthStencil};
        Some(match self {
            Self::ShadowDepth => ("shadow", DepthStencil),
            Self::GBufferPosition => ("gbuffer", Color(0)),
            Self::GBufferNormal => ("gbuffer", Color(1)),
            Self::GBufferAlbedo => ("gbuffer", Color(2)),
            Self::GBufferUv => ("gbuffer", Color(3)),
            Self::GBufferIrradiance => ("gbuffer", Color(4)),
            Self::SsssPing => ("ssss_ping", Color(0)),
            Self::SsssBlurred => ("ssss_blur", Color(0)),
            Self::SceneHdr => ("scene_hdr", Color(0)),
            Self::SkinTransmittanceLut | Self::DiffuseLighting => return None,
        })
    }
}

// ─── Shared Assets ────────────────────────────────────────────────────────────

/// Renderer-owned GPU assets that passes draw with.
#[derive(Clone, Copy)]
pub struct FrameAssets<'a> {
    pub screen_quad: &'a GpuMesh,
    pub defaults: &'a DefaultTextures,
    pub transmittance_lut: TextureHandle,
    /// RGB tint applied to transmitted light.
    pub transmission_tint: Vec3,
    /// Thickness mapped to the last texel of the transmittance LUT.
    pub max_thickness: f32,
    pub model: Option<&'a GpuModel>,
}

// ─── Compile Context ──────────────────────────────────────────────────────────

pub struct CompileContext<'a> {
    pub backend: &'a mut dyn RenderBackend,
    pub shaders: &'a ShaderLibrary,
    /// Declared targets; formats are read from their specs.
    pub targets: &'a RenderTargets,
    pub settings: &'a RendererSettings,
}

// ─── Execute Context ──────────────────────────────────────────────────────────

pub struct ExecuteContext<'a> {
    pub backend: &'a mut dyn RenderBackend,
    pub scene: &'a SceneState,
    pub config: &'a RenderConfig,
    pub targets: &'a RenderTargets,
    pub assets: FrameAssets<'a>,
}

impl ExecuteContext<'_> {
    /// Resolves a role to the texture backing it this frame.
    #[must_use]
    pub fn resource(&self, role: GraphResource) -> Option<TextureHandle> {
        match role.resolve_role(self.config) {
            GraphResource::SkinTransmittanceLut => Some(self.assets.transmittance_lut),
            concrete => {
                let (set, slot) = concrete.attachment()?;
                self.targets.texture(set, slot)
            }
        }
    }

    /// Size of a render target set, or of the surface.
    #[must_use]
    pub fn target_size(&self, set: &str) -> (u32, u32) {
        self.targets
            .get(set)
            .map_or_else(|| self.backend.surface_size(), |s| s.size())
    }
}
