//! Wavefront OBJ loading.

use std::path::{Path, PathBuf};

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::image::{ColorSpace, ImageData};
use super::model::{ModelAsset, ModelMesh};
use crate::errors::{Result, SssError};
use crate::resources::{Material, MeshData, MeshVertex, TextureIndex};

/// Decoded images keyed by resolved path, so maps shared between materials
/// are decoded once. `None` records a map that failed to load.
#[derive(Default)]
struct TextureCache {
    entries: FxHashMap<(PathBuf, ColorSpace), Option<TextureIndex>>,
    images: Vec<ImageData>,
}

impl TextureCache {
    fn load(&mut self, base: &Path, file: &str, color_space: ColorSpace) -> Option<TextureIndex> {
        let path = base.join(file.trim());
        if let Some(&cached) = self.entries.get(&(path.clone(), color_space)) {
            return cached;
        }

        let index = match ImageData::open(&path, color_space) {
            Ok(image) => {
                log::debug!(
                    "Loaded texture {} ({}x{}, {} channels)",
                    path.display(),
                    image.width,
                    image.height,
                    image.channels
                );
                self.images.push(image);
                Some(self.images.len() - 1)
            }
            Err(e) => {
                log::warn!("Texture map unavailable, using default: {e}");
                None
            }
        };
        self.entries.insert((path, color_space), index);
        index
    }
}

fn convert_material(src: &tobj::Material, base: &Path, cache: &mut TextureCache) -> Material {
    let mut map = |file: &Option<String>, color_space| {
        file.as_deref()
            .filter(|f| !f.trim().is_empty())
            .and_then(|f| cache.load(base, f, color_space))
    };

    Material {
        name: src.name.clone(),
        ambient: src.ambient.map_or(Vec3::ZERO, Vec3::from),
        diffuse: src.diffuse.map_or(Vec3::ONE, Vec3::from),
        specular: src.specular.map_or(Vec3::ZERO, Vec3::from),
        shininess: src.shininess.unwrap_or(0.0),
        dissolve: src.dissolve.unwrap_or(1.0),
        ambient_map: map(&src.ambient_texture, ColorSpace::Srgb),
        diffuse_map: map(&src.diffuse_texture, ColorSpace::Srgb),
        specular_map: map(&src.specular_texture, ColorSpace::Linear),
        shininess_map: map(&src.shininess_texture, ColorSpace::Linear),
        normal_map: map(&src.normal_texture, ColorSpace::Linear),
        has_opacity_map: src
            .dissolve_texture
            .as_deref()
            .is_some_and(|f| !f.trim().is_empty()),
    }
}

fn convert_mesh(model: &tobj::Model) -> MeshData<MeshVertex> {
    let mesh = &model.mesh;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_uvs = mesh.texcoords.len() / 2 == mesh.positions.len() / 3;

    let vertices = mesh
        .positions
        .chunks_exact(3)
        .enumerate()
        .map(|(i, p)| MeshVertex {
            position: [p[0], p[1], p[2]],
            normal: if has_normals {
                [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
            } else {
                [0.0; 3]
            },
            // OBJ puts v = 0 at the bottom of the image.
            uv: if has_uvs {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            },
            ..Default::default()
        })
        .collect();

    let mut data = MeshData::new(model.name.clone(), vertices, mesh.indices.clone());
    if !has_normals {
        data.compute_vertex_normals();
    }
    data.compute_tangents();
    data
}

impl ModelAsset {
    /// Loads an OBJ file and its MTL library.
    ///
    /// A missing or unparsable OBJ is an error. Missing MTL files and
    /// texture maps only log a warning; affected materials fall back to
    /// defaults.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SssError::AssetNotFound(path.display().to_string()));
        }

        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| SssError::MeshLoad(format!("{}: {e}", path.display())))?;

        if models.is_empty() {
            return Err(SssError::MeshLoad(format!(
                "{}: no meshes in file",
                path.display()
            )));
        }

        let src_materials = materials.unwrap_or_else(|e| {
            log::warn!("Material library for {} unavailable: {e}", path.display());
            Vec::new()
        });

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut cache = TextureCache::default();
        let mut materials: Vec<Material> = src_materials
            .iter()
            .map(|m| convert_material(m, base, &mut cache))
            .collect();

        let mut meshes = Vec::with_capacity(models.len());
        for model in &models {
            let material = match model.mesh.material_id {
                Some(id) if id < materials.len() => id,
                _ => {
                    // Meshes without a usable material share one default.
                    if materials.last().is_none_or(|m| m.name != DEFAULT_MATERIAL) {
                        materials.push(Material {
                            name: DEFAULT_MATERIAL.into(),
                            diffuse: Vec3::ONE,
                            ..Default::default()
                        });
                    }
                    materials.len() - 1
                }
            };
            meshes.push(ModelMesh {
                data: convert_mesh(model),
                material,
            });
        }

        let mut asset = Self {
            name: path
                .file_stem()
                .map_or_else(|| "model".into(), |s| s.to_string_lossy().into_owned()),
            meshes,
            materials,
            images: cache.images,
        };
        asset.sort_opaque_first();

        log::info!(
            "Loaded {}: {} meshes, {} triangles, {} materials, {} textures",
            path.display(),
            asset.meshes.len(),
            asset.triangle_count(),
            asset.materials.len(),
            asset.images.len()
        );
        Ok(asset)
    }
}

const DEFAULT_MATERIAL: &str = "__default";
