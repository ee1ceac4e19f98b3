use glam::Vec3;

use super::image::ImageData;
use crate::resources::{Material, MeshData, MeshVertex, unit_cube};

/// One drawable piece of a model and the material it is shaded with.
#[derive(Debug, Clone)]
pub struct ModelMesh {
    pub data: MeshData<MeshVertex>,
    /// Index into [`ModelAsset::materials`].
    pub material: usize,
}

/// A model decoded on the CPU, ready for upload.
///
/// Opaque meshes come before transparent ones.
#[derive(Debug, Clone, Default)]
pub struct ModelAsset {
    pub name: String,
    pub meshes: Vec<ModelMesh>,
    pub materials: Vec<Material>,
    /// Decoded texture maps, referenced by index from the materials.
    pub images: Vec<ImageData>,
}

impl ModelAsset {
    /// The built-in cube with a single skin-toned material.
    #[must_use]
    pub fn unit_cube() -> Self {
        Self {
            name: "unit_cube".into(),
            meshes: vec![ModelMesh {
                data: unit_cube(),
                material: 0,
            }],
            materials: vec![Material {
                name: "skin".into(),
                ambient: Vec3::splat(0.1),
                diffuse: Vec3::new(0.85, 0.64, 0.55),
                specular: Vec3::splat(0.3),
                shininess: 32.0,
                ..Default::default()
            }],
            images: Vec::new(),
        }
    }

    /// Stable partition: opaque meshes first, original order kept within
    /// each group.
    pub fn sort_opaque_first(&mut self) {
        let materials = &self.materials;
        self.meshes.sort_by_key(|m| {
            !materials
                .get(m.material)
                .is_none_or(Material::is_opaque)
        });
    }

    #[must_use]
    pub fn material_of(&self, mesh: &ModelMesh) -> Option<&Material> {
        self.materials.get(mesh.material)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.data.vertices.len()).sum()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.data.triangle_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_meshes_sort_last() {
        let mut model = ModelAsset::unit_cube();
        model.materials.push(Material {
            name: "glass".into(),
            dissolve: 0.3,
            ..Default::default()
        });
        let mut glass = model.meshes[0].clone();
        glass.material = 1;
        glass.data.label = "glass".into();
        model.meshes.insert(0, glass);

        model.sort_opaque_first();
        assert_eq!(model.meshes[0].data.label, "unit_cube");
        assert_eq!(model.meshes[1].data.label, "glass");
    }

    #[test]
    fn cube_counts() {
        let model = ModelAsset::unit_cube();
        assert_eq!(model.vertex_count(), 36);
        assert_eq!(model.triangle_count(), 12);
    }
}
