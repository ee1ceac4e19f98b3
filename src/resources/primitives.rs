//! Built-in meshes.

use glam::Vec3;

use super::mesh::MeshData;
use super::vertex::{MeshVertex, QuadVertex};

/// Full-screen quad in normalized device coordinates.
#[must_use]
pub fn screen_quad() -> MeshData<QuadVertex> {
    let vertices = vec![
        QuadVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
        QuadVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
        QuadVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
        QuadVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
    ];
    let indices = vec![0, 1, 2, 1, 3, 2];
    MeshData::new("screen_quad", vertices, indices)
}

#[rustfmt::skip]
const CUBE_POSITIONS: [[f32; 3]; 36] = [
    [-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5],
    [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5], [-0.5, -0.5, -0.5],

    [-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5],
    [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5, -0.5,  0.5],

    [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5], [-0.5, -0.5, -0.5],
    [-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5],

    [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [ 0.5, -0.5, -0.5],
    [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5],

    [-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5],
    [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5], [-0.5, -0.5, -0.5],

    [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5],
    [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5],
];

/// Axis-aligned cube spanning ±0.5, 36 non-indexed vertices.
///
/// Each face gets a flat normal, UVs projected onto the face plane and a
/// tangent frame along those UVs. Triangles are wound counter-clockwise
/// when seen from outside.
#[must_use]
pub fn unit_cube() -> MeshData<MeshVertex> {
    let mut vertices = Vec::with_capacity(CUBE_POSITIONS.len());

    for tri in CUBE_POSITIONS.chunks_exact(3) {
        let p: [Vec3; 3] = [tri[0].into(), tri[1].into(), tri[2].into()];

        // The face axis is the one all three corners share.
        let axis = (0..3)
            .find(|&a| p[0][a] == p[1][a] && p[1][a] == p[2][a])
            .unwrap_or(2);
        let mut normal = Vec3::ZERO;
        normal[axis] = p[0][axis].signum();

        // In-plane axes, ordered so that u × v points along the normal.
        let (ua, va) = ((axis + 1) % 3, (axis + 2) % 3);
        let mut tangent = Vec3::ZERO;
        tangent[ua] = 1.0;
        let mut bitangent = Vec3::ZERO;
        bitangent[va] = 1.0;
        if tangent.cross(bitangent).dot(normal) < 0.0 {
            std::mem::swap(&mut tangent, &mut bitangent);
        }

        let corners = if (p[1] - p[0]).cross(p[2] - p[0]).dot(normal) < 0.0 {
            [p[0], p[2], p[1]]
        } else {
            p
        };

        for c in corners {
            vertices.push(MeshVertex {
                position: c.to_array(),
                normal: normal.to_array(),
                uv: [c.dot(tangent) + 0.5, c.dot(bitangent) + 0.5],
                tangent: tangent.to_array(),
                bitangent: bitangent.to_array(),
            });
        }
    }

    MeshData::new("unit_cube", vertices, Vec::new())
}
