//! Renderer Settings
//!
//! Start-up configuration consumed once by [`WgpuContext::new`] and
//! [`Renderer::new`]. Values that change while the application runs (blur,
//! exposure, light direction, …) live in [`RenderConfig`] instead.
//!
//! ```rust,ignore
//! use sss::renderer::RendererSettings;
//!
//! let settings = RendererSettings {
//!     vsync: false,
//!     shadow_map_size: 4096,
//!     ..Default::default()
//! };
//! ```
//!
//! [`WgpuContext::new`]: crate::renderer::backend::WgpuContext::new
//! [`Renderer::new`]: crate::renderer::Renderer::new
//! [`RenderConfig`]: crate::renderer::RenderConfig

use std::path::PathBuf;

/// Global configuration for renderer initialization.
///
/// # Fields
///
/// | Field                  | Description                               | Default               |
/// |------------------------|-------------------------------------------|-----------------------|
/// | `vsync`                | Vertical sync enabled                     | `true`                |
/// | `power_preference`     | GPU adapter selection strategy            | `HighPerformance`     |
/// | `clear_color`          | Clear color of the lit scene target       | Black (0,0,0,1)       |
/// | `required_features`    | Required wgpu features                    | Empty                 |
/// | `required_limits`      | Required wgpu limits                      | Default               |
/// | `depth_stencil_format` | G-buffer depth + stencil format           | `Depth24PlusStencil8` |
/// | `hdr_format`           | Format of the HDR intermediates           | `Rgba16Float`         |
/// | `shadow_map_size`      | Edge length of the shadow map             | 2048                  |
/// | `shader_dir`           | Directory WGSL sources are loaded from    | `"shaders"`           |
/// | `max_texture_dimension`| Upper bound on any render target edge     | 8192                  |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Enable vertical synchronization (VSync).
    ///
    /// When `true`, the frame rate is capped to the display refresh rate.
    /// When `false`, frames are presented as fast as they are produced.
    pub vsync: bool,

    /// GPU adapter selection preference.
    ///
    /// - `HighPerformance`: Prefer discrete / dedicated GPU
    /// - `LowPower`: Prefer integrated GPU (better battery life)
    pub power_preference: wgpu::PowerPreference,

    /// Background color of the lit scene target.
    ///
    /// Pixels not covered by skin keep this color through tone mapping.
    pub clear_color: wgpu::Color,

    /// Required wgpu features that must be supported by the adapter.
    pub required_features: wgpu::Features,

    /// Required wgpu limits (max buffer sizes, binding counts, etc.).
    pub required_limits: wgpu::Limits,

    /// Depth-stencil format of the G-buffer.
    ///
    /// Must carry a stencil aspect: the G-buffer pass marks skin pixels and
    /// every later screen-space pass tests against that mark.
    pub depth_stencil_format: wgpu::TextureFormat,

    /// Format of the HDR intermediates (blur ping-pong and lit scene).
    pub hdr_format: wgpu::TextureFormat,

    /// Edge length in texels of the square shadow map.
    pub shadow_map_size: u32,

    /// Directory the WGSL sources are read from.
    pub shader_dir: PathBuf,

    /// Largest render target edge the renderer will allocate.
    ///
    /// The effective limit is the smaller of this and the device limit.
    pub max_texture_dimension: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            depth_stencil_format: wgpu::TextureFormat::Depth24PlusStencil8,
            hdr_format: wgpu::TextureFormat::Rgba16Float,
            shadow_map_size: 2048,
            shader_dir: PathBuf::from("shaders"),
            max_texture_dimension: 8192,
        }
    }
}
