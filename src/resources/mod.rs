//! CPU-side render resources: vertex formats, meshes, primitives and
//! materials.

pub mod material;
pub mod mesh;
pub mod primitives;
pub mod vertex;

pub use material::{Material, TextureIndex};
pub use mesh::{GpuMesh, MeshData};
pub use primitives::{screen_quad, unit_cube};
pub use vertex::{MeshVertex, QuadVertex, Vertex, VertexLayout};
