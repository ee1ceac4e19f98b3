use std::path::Path;

use crate::errors::{Result, SssError};
use crate::renderer::backend::{RenderBackend, TextureDesc, TextureHandle, TextureUsage};

/// How texel values should be interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Color maps (albedo, ambient).
    Srgb,
    /// Data maps (normals, specular, shininess).
    Linear,
}

impl ColorSpace {
    #[must_use]
    pub fn rgba8_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A decoded image expanded to RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file before expansion.
    pub channels: u8,
    pub format: wgpu::TextureFormat,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn decode(bytes: &[u8], color_space: ColorSpace, label: &str) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| {
            SssError::ImageDecodeError(format!("Failed to decode image {label}: {e}"))
        })?;

        let channels = img.color().channel_count();
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            label: label.to_string(),
            width,
            height,
            channels,
            format: color_space.rgba8_format(),
            pixels: rgba.into_vec(),
        })
    }

    pub fn open(path: &Path, color_space: ColorSpace) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| SssError::AssetNotFound(format!("{}: {e}", path.display())))?;
        Self::decode(&bytes, color_space, &path.display().to_string())
    }

    /// A 1×1 image of a single color.
    #[must_use]
    pub fn solid(label: &str, rgba: [u8; 4], color_space: ColorSpace) -> Self {
        Self {
            label: label.to_string(),
            width: 1,
            height: 1,
            channels: 4,
            format: color_space.rgba8_format(),
            pixels: rgba.to_vec(),
        }
    }

    pub fn upload(&self, backend: &mut dyn RenderBackend) -> Result<TextureHandle> {
        let texture = backend.create_texture(&TextureDesc {
            label: &self.label,
            width: self.width,
            height: self.height,
            format: self.format,
            usage: TextureUsage::Sampled,
        })?;
        if let Err(e) = backend.write_texture(texture, &self.pixels) {
            backend.destroy_texture(texture);
            return Err(e);
        }
        Ok(texture)
    }
}
