//! Program handles and uniform storage
//!
//! [`ShaderLibrary`] resolves program sources from the shader directory and
//! [`ShaderProgram`] keeps the CPU side of a program's uniform block,
//! addressed through [`UniformLocation`]s.

use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{LinkedProgram, ShaderStage, UniformMember, compile, link};
use crate::errors::{Result, SssError};
use crate::renderer::backend::{DepthMode, ProgramDesc, ProgramHandle, RenderBackend, StencilMode};
use crate::resources::VertexLayout;

// ─── Uniform Values ───────────────────────────────────────────────────────────

/// Byte offset of a member inside a program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

impl UniformLocation {
    /// Returned for names the program does not declare. Setting it is a no-op.
    pub const NOT_FOUND: Self = Self(u32::MAX);

    #[inline]
    #[must_use]
    pub fn is_found(self) -> bool {
        self != Self::NOT_FOUND
    }
}

/// A CPU value that can be written into a WGSL uniform slot.
pub trait UniformValue {
    fn to_uniform_bytes(&self) -> SmallVec<[u8; 64]>;
}

macro_rules! impl_pod_uniform {
    ($($ty:ty),*) => {$(
        impl UniformValue for $ty {
            fn to_uniform_bytes(&self) -> SmallVec<[u8; 64]> {
                SmallVec::from_slice(bytemuck::bytes_of(self))
            }
        }
    )*};
}

impl_pod_uniform!(i32, u32, f32, Vec2, Vec3, Vec4, Mat4);

impl UniformValue for bool {
    fn to_uniform_bytes(&self) -> SmallVec<[u8; 64]> {
        u32::from(*self).to_uniform_bytes()
    }
}

impl UniformValue for Mat3 {
    /// Each column is padded to 16 bytes.
    fn to_uniform_bytes(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();
        for column in self.to_cols_array_2d() {
            bytes.extend_from_slice(bytemuck::bytes_of(&Vec4::new(
                column[0], column[1], column[2], 0.0,
            )));
        }
        bytes
    }
}

impl UniformValue for &[Vec4] {
    fn to_uniform_bytes(&self) -> SmallVec<[u8; 64]> {
        SmallVec::from_slice(bytemuck::cast_slice::<Vec4, u8>(self))
    }
}

// ─── Shader Program ───────────────────────────────────────────────────────────

/// Fixed-function state a program is created with.
#[derive(Debug, Clone, Copy)]
pub struct FixedFunction<'a> {
    pub vertex_layout: &'a VertexLayout,
    pub color_formats: &'a [wgpu::TextureFormat],
    pub depth_stencil_format: Option<wgpu::TextureFormat>,
    pub depth: DepthMode,
    pub stencil: StencilMode,
    pub cull_back_faces: bool,
}

/// A linked program living on the backend, plus a CPU copy of its uniforms.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    handle: Option<ProgramHandle>,
    members: Vec<UniformMember>,
    lookup: FxHashMap<String, usize>,
    shadow: Vec<u8>,
}

impl ShaderProgram {
    /// Validates the program's interface against `state` and creates it on
    /// the backend.
    pub fn create(
        backend: &mut dyn RenderBackend,
        linked: &LinkedProgram,
        state: &FixedFunction,
    ) -> Result<Self> {
        linked.check_vertex_layout(state.vertex_layout)?;
        linked.check_color_targets(state.color_formats.len())?;

        let handle = backend.create_program(&ProgramDesc {
            label: &linked.label,
            linked,
            vertex_layout: state.vertex_layout,
            color_formats: state.color_formats,
            depth_stencil_format: state.depth_stencil_format,
            depth: state.depth,
            stencil: state.stencil,
            cull_back_faces: state.cull_back_faces,
        })?;

        let members = linked.uniforms.clone();
        let lookup = members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();

        Ok(Self {
            label: linked.label.clone(),
            handle: Some(handle),
            members,
            lookup,
            shadow: vec![0; linked.uniform_size as usize],
        })
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Backend handle, or `None` once released.
    #[must_use]
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    #[must_use]
    pub fn uniform_location(&self, name: &str) -> UniformLocation {
        self.lookup
            .get(name)
            .map_or(UniformLocation::NOT_FOUND, |&i| {
                UniformLocation(self.members[i].offset)
            })
    }

    /// Writes `value` into the slot at `location`, truncated to the slot size.
    pub fn set_uniform(&mut self, location: UniformLocation, value: impl UniformValue) {
        if !location.is_found() {
            return;
        }
        let Some(member) = self.members.iter().find(|m| m.offset == location.0) else {
            return;
        };
        let bytes = value.to_uniform_bytes();
        let start = member.offset as usize;
        let len = bytes.len().min(member.size as usize);
        if let Some(slot) = self.shadow.get_mut(start..start + len) {
            slot.copy_from_slice(&bytes[..len]);
        }
    }

    pub fn set_uniform_by_name(&mut self, name: &str, value: impl UniformValue) {
        let location = self.uniform_location(name);
        self.set_uniform(location, value);
    }

    /// Current contents of the uniform block.
    #[must_use]
    pub fn uniform_bytes(&self) -> &[u8] {
        &self.shadow
    }

    /// Destroys the backend program. Safe to call more than once.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.handle.take() {
            backend.destroy_program(handle);
            log::debug!("Released program \"{}\"", self.label);
        }
    }
}

// ─── Shader Library ───────────────────────────────────────────────────────────

/// Loads WGSL sources from a directory and turns them into programs.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    root: PathBuf,
}

impl ShaderLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads `<root>/<file>`.
    pub fn load(&self, file: &str) -> Result<String> {
        let path = self.root.join(file);
        std::fs::read_to_string(&path)
            .map_err(|e| SssError::AssetNotFound(format!("{}: {e}", path.display())))
    }

    pub fn compile_file(&self, file: &str, stage: ShaderStage) -> Result<super::ShaderUnit> {
        let source = self.load(file)?;
        compile(&source, stage, file)
    }

    pub fn link_files(&self, vertex: &str, fragment: &str, label: &str) -> Result<LinkedProgram> {
        let vs = self.compile_file(vertex, ShaderStage::Vertex)?;
        let fs = self.compile_file(fragment, ShaderStage::Fragment)?;
        link(vs, fs, label)
    }

    /// Load, compile, link and create in one step.
    pub fn program(
        &self,
        backend: &mut dyn RenderBackend,
        label: &str,
        vertex: &str,
        fragment: &str,
        state: &FixedFunction,
    ) -> Result<ShaderProgram> {
        let linked = self.link_files(vertex, fragment, label)?;
        let program = ShaderProgram::create(backend, &linked, state)?;
        log::info!("Created program \"{label}\" ({vertex} + {fragment})");
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mat3_is_padded_to_three_vec4_columns() {
        let bytes = Mat3::IDENTITY.to_uniform_bytes();
        assert_eq!(bytes.len(), 48);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[4..8], &[0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn bool_is_written_as_u32() {
        assert_eq!(true.to_uniform_bytes().as_slice(), &1u32.to_ne_bytes());
        assert_eq!(false.to_uniform_bytes().as_slice(), &0u32.to_ne_bytes());
    }

    #[test]
    fn missing_shader_file_is_asset_not_found() {
        let library = ShaderLibrary::new("/nonexistent/shader/dir");
        let err = library.load("nope.vert.wgsl").unwrap_err();
        assert!(matches!(err, SssError::AssetNotFound(_)));
    }
}
