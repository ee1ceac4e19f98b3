use glam::{Vec2, Vec3};

use super::vertex::{MeshVertex, Vertex};
use crate::errors::{Result, SssError};
use crate::renderer::backend::{MeshDesc, MeshHandle, RenderBackend};
use crate::renderer::shader::ShaderProgram;

/// CPU-side mesh: interleaved vertices plus an optional index list.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData<V: Vertex> {
    pub label: String,
    pub vertices: Vec<V>,
    /// Empty for non-indexed meshes.
    pub indices: Vec<u32>,
}

impl<V: Vertex> MeshData<V> {
    pub fn new(label: impl Into<String>, vertices: Vec<V>, indices: Vec<u32>) -> Self {
        Self {
            label: label.into(),
            vertices,
            indices,
        }
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        if self.is_indexed() {
            self.indices.len() / 3
        } else {
            self.vertices.len() / 3
        }
    }

    /// Triangle corner indices, whether or not the mesh is indexed.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let count = self.triangle_count();
        (0..count).map(move |t| {
            if self.is_indexed() {
                [
                    self.indices[t * 3] as usize,
                    self.indices[t * 3 + 1] as usize,
                    self.indices[t * 3 + 2] as usize,
                ]
            } else {
                [t * 3, t * 3 + 1, t * 3 + 2]
            }
        })
    }
}

impl MeshData<MeshVertex> {
    /// Area-weighted vertex normals from the triangle list.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for [i0, i1, i2] in self.triangles() {
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                continue;
            }
            let v0 = Vec3::from(self.vertices[i0].position);
            let v1 = Vec3::from(self.vertices[i1].position);
            let v2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (v1 - v0).cross(v2 - v0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = n.normalize_or_zero().to_array();
        }
    }

    /// Per-vertex tangent frames from positions and texture coordinates.
    ///
    /// Tangents are orthogonalized against the normal. Vertices whose UVs are
    /// degenerate get an arbitrary frame perpendicular to the normal.
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![Vec3::ZERO; self.vertices.len()];
        let mut bitangents = vec![Vec3::ZERO; self.vertices.len()];

        for [i0, i1, i2] in self.triangles() {
            if i0 >= tangents.len() || i1 >= tangents.len() || i2 >= tangents.len() {
                continue;
            }
            let (a, b, c) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);
            let e1 = Vec3::from(b.position) - Vec3::from(a.position);
            let e2 = Vec3::from(c.position) - Vec3::from(a.position);
            let d1 = Vec2::from(b.uv) - Vec2::from(a.uv);
            let d2 = Vec2::from(c.uv) - Vec2::from(a.uv);

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let bt = (e2 * d1.x - e1 * d2.x) * r;
            for i in [i0, i1, i2] {
                tangents[i] += t;
                bitangents[i] += bt;
            }
        }

        for (vertex, (t, bt)) in self.vertices.iter_mut().zip(tangents.into_iter().zip(bitangents)) {
            let n = Vec3::from(vertex.normal).normalize_or_zero();
            let mut tangent = (t - n * n.dot(t)).normalize_or_zero();
            if tangent == Vec3::ZERO {
                tangent = n.any_orthonormal_vector();
            }
            let mut bitangent = n.cross(tangent);
            if bitangent.dot(bt) < 0.0 {
                bitangent = -bitangent;
            }
            vertex.tangent = tangent.to_array();
            vertex.bitangent = bitangent.to_array();
        }
    }
}

/// A mesh uploaded to the backend.
#[derive(Debug)]
pub struct GpuMesh {
    label: String,
    handle: Option<MeshHandle>,
    vertex_count: u32,
    index_count: u32,
}

impl GpuMesh {
    pub fn upload<V: Vertex>(backend: &mut dyn RenderBackend, data: &MeshData<V>) -> Result<Self> {
        let layout = V::layout();
        let handle = backend.create_mesh(&MeshDesc {
            label: &data.label,
            vertices: bytemuck::cast_slice(&data.vertices),
            vertex_count: data.vertices.len() as u32,
            indices: &data.indices,
            layout: &layout,
        })?;
        log::debug!(
            "Uploaded mesh \"{}\" ({} vertices, {} indices)",
            data.label,
            data.vertices.len(),
            data.indices.len()
        );
        Ok(Self {
            label: data.label.clone(),
            handle: Some(handle),
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        })
    }

    /// Draws the mesh with `program`'s current uniforms. Textures must
    /// already be bound.
    pub fn draw(&self, backend: &mut dyn RenderBackend, program: &ShaderProgram) -> Result<()> {
        let mesh = self
            .handle
            .ok_or_else(|| SssError::ResourceNotFound(format!("released mesh \"{}\"", self.label)))?;
        let handle = program.handle().ok_or_else(|| {
            SssError::ResourceNotFound(format!("released program \"{}\"", program.label()))
        })?;
        backend.draw(handle, program.uniform_bytes(), mesh)
    }

    /// Safe to call more than once.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.handle.take() {
            backend.destroy_mesh(handle);
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn handle(&self) -> Option<MeshHandle> {
        self.handle
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// 0 for non-indexed meshes.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3], uv: [f32; 2]) -> MeshVertex {
        MeshVertex {
            position,
            uv,
            ..Default::default()
        }
    }

    #[test]
    fn tangent_follows_u_direction() {
        let mut mesh = MeshData::new(
            "tri",
            vec![
                vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
                vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
                vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        );
        mesh.compute_vertex_normals();
        mesh.compute_tangents();

        let v = mesh.vertices[0];
        assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        assert!((Vec3::from(v.tangent) - Vec3::X).length() < 1e-5);
        assert!((Vec3::from(v.bitangent) - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn degenerate_uvs_still_give_orthonormal_frame() {
        let mut mesh = MeshData::new(
            "flat-uv",
            vec![
                vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
                vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
                vertex([0.0, 0.0, 1.0], [0.5, 0.5]),
            ],
            Vec::new(),
        );
        mesh.compute_vertex_normals();
        mesh.compute_tangents();

        let n = Vec3::from(mesh.vertices[1].normal);
        let t = Vec3::from(mesh.vertices[1].tangent);
        assert!((t.length() - 1.0).abs() < 1e-5);
        assert!(n.dot(t).abs() < 1e-5);
    }
}
