//! GPU-side copies of loaded assets and the renderer's built-in textures.

use glam::Vec3;

use crate::assets::{ColorSpace, ImageData, ModelAsset};
use crate::errors::Result;
use crate::renderer::backend::{RenderBackend, TextureDesc, TextureHandle, TextureUsage};
use crate::resources::GpuMesh;
use crate::skin::{SkinParams, TRANSMITTANCE_LUT_WIDTH, TransmittanceProfile};

/// Neutral 1×1 textures bound wherever a material has no map.
#[derive(Debug)]
pub struct DefaultTextures {
    pub white: TextureHandle,
    pub flat_normal: TextureHandle,
    pub specular: TextureHandle,
}

impl DefaultTextures {
    pub fn create(backend: &mut dyn RenderBackend) -> Result<Self> {
        let white = ImageData::solid("default.white", [255; 4], ColorSpace::Srgb).upload(backend)?;
        let flat_normal = match ImageData::solid("default.normal", [128, 128, 255, 255], ColorSpace::Linear)
            .upload(backend)
        {
            Ok(t) => t,
            Err(e) => {
                backend.destroy_texture(white);
                return Err(e);
            }
        };
        let specular = match ImageData::solid("default.specular", [255; 4], ColorSpace::Linear)
            .upload(backend)
        {
            Ok(t) => t,
            Err(e) => {
                backend.destroy_texture(white);
                backend.destroy_texture(flat_normal);
                return Err(e);
            }
        };
        Ok(Self {
            white,
            flat_normal,
            specular,
        })
    }

    pub fn release(&self, backend: &mut dyn RenderBackend) {
        backend.destroy_texture(self.white);
        backend.destroy_texture(self.flat_normal);
        backend.destroy_texture(self.specular);
    }
}

/// Uploads the skin transmittance profile as a `width`×1 `Rgba16Float`
/// texture.
pub fn create_transmittance_lut(
    backend: &mut dyn RenderBackend,
    params: &SkinParams,
) -> Result<TextureHandle> {
    let profile = TransmittanceProfile::compute(params, TRANSMITTANCE_LUT_WIDTH);
    let texture = backend.create_texture(&TextureDesc {
        label: "skin.transmittance_lut",
        width: profile.width(),
        height: 1,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: TextureUsage::Sampled,
    })?;
    if let Err(e) = backend.write_texture(texture, profile.as_bytes()) {
        backend.destroy_texture(texture);
        return Err(e);
    }
    Ok(texture)
}

/// Material constants and maps as the G-buffer pass consumes them.
#[derive(Debug, Clone)]
pub struct GpuMaterial {
    pub diffuse: Vec3,
    pub specular: f32,
    pub diffuse_map: Option<TextureHandle>,
    pub specular_map: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
}

#[derive(Debug)]
pub struct GpuModelMesh {
    pub mesh: GpuMesh,
    pub material: usize,
    pub opaque: bool,
}

/// A [`ModelAsset`] living on the backend.
#[derive(Debug, Default)]
pub struct GpuModel {
    pub meshes: Vec<GpuModelMesh>,
    pub materials: Vec<GpuMaterial>,
    textures: Vec<TextureHandle>,
}

impl GpuModel {
    /// Uploads every mesh and image of `asset`.
    ///
    /// Images that fail to upload log a warning and leave the map unset.
    /// A mesh that fails to upload releases everything and returns the
    /// error.
    pub fn upload(backend: &mut dyn RenderBackend, asset: &ModelAsset) -> Result<Self> {
        let mut model = Self::default();

        let images: Vec<Option<TextureHandle>> = asset
            .images
            .iter()
            .map(|image| match image.upload(backend) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("Texture \"{}\" not uploaded, using default: {e}", image.label);
                    None
                }
            })
            .collect();
        model.textures = images.iter().flatten().copied().collect();

        let map = |index: Option<usize>| index.and_then(|i| images.get(i).copied().flatten());
        model.materials = asset
            .materials
            .iter()
            .map(|m| GpuMaterial {
                diffuse: m.diffuse,
                specular: m.specular_intensity(),
                diffuse_map: map(m.diffuse_map),
                specular_map: map(m.specular_map),
                normal_map: map(m.normal_map),
            })
            .collect();

        for mesh in &asset.meshes {
            match GpuMesh::upload(backend, &mesh.data) {
                Ok(gpu) => model.meshes.push(GpuModelMesh {
                    mesh: gpu,
                    material: mesh.material,
                    opaque: asset.material_of(mesh).is_none_or(|m| m.is_opaque()),
                }),
                Err(e) => {
                    model.release(backend);
                    return Err(e);
                }
            }
        }
        Ok(model)
    }

    /// Meshes drawn by the deferred passes.
    pub fn opaque_meshes(&self) -> impl Iterator<Item = &GpuModelMesh> {
        self.meshes.iter().filter(|m| m.opaque)
    }

    #[must_use]
    pub fn material(&self, index: usize) -> Option<&GpuMaterial> {
        self.materials.get(index)
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        for mesh in &mut self.meshes {
            mesh.mesh.release(backend);
        }
        self.meshes.clear();
        for texture in self.textures.drain(..) {
            backend.destroy_texture(texture);
        }
        self.materials.clear();
    }
}
