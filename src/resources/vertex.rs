//! Vertex Formats
//!
//! Plain `#[repr(C)]` vertex structs uploaded verbatim to the GPU, plus the
//! [`VertexLayout`] describing how shader `@location`s map onto them.

use bytemuck::{Pod, Zeroable};

/// Stride and attribute list of one interleaved vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    /// Returns the attribute bound to `location`, if any.
    #[must_use]
    pub fn attribute(&self, location: u32) -> Option<&wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .find(|a| a.shader_location == location)
    }
}

/// Number of scalar components carried by a vertex format.
#[must_use]
pub fn format_components(format: wgpu::VertexFormat) -> u8 {
    use wgpu::VertexFormat as F;
    match format {
        F::Float32 | F::Uint32 | F::Sint32 => 1,
        F::Float32x2 | F::Uint32x2 | F::Sint32x2 | F::Float16x2 | F::Unorm16x2 => 2,
        F::Float32x3 | F::Uint32x3 | F::Sint32x3 => 3,
        _ => 4,
    }
}

/// A vertex type with a fixed GPU layout.
pub trait Vertex: Pod {
    fn layout() -> VertexLayout;
}

/// Full shading vertex used by loaded models.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for MeshVertex {
    fn layout() -> VertexLayout {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x3,
            4 => Float32x3
        ];
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: ATTRIBUTES.to_vec(),
        }
    }
}

/// Screen-space quad vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl Vertex for QuadVertex {
    fn layout() -> VertexLayout {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: ATTRIBUTES.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_vertex_layout_matches_struct() {
        let layout = MeshVertex::layout();
        assert_eq!(layout.stride, 56);
        assert_eq!(layout.attribute(2).map(|a| a.offset), Some(24));
        assert_eq!(layout.attribute(4).map(|a| a.offset), Some(44));
        assert!(layout.attribute(5).is_none());
    }
}
