//! Render pass wrapper that skips redundant state changes.

use super::{MeshHandle, ProgramHandle};

#[derive(Clone, Copy, PartialEq)]
struct BindGroupState {
    id: u64,
    offset: Option<u32>,
}

pub struct TrackedRenderPass<'a> {
    pass: wgpu::RenderPass<'a>,
    current_pipeline: Option<ProgramHandle>,
    current_bind_groups: [Option<BindGroupState>; 2],
    current_mesh: Option<MeshHandle>,
}

impl<'a> TrackedRenderPass<'a> {
    #[must_use]
    pub fn new(pass: wgpu::RenderPass<'a>) -> Self {
        Self {
            pass,
            current_pipeline: None,
            current_bind_groups: [None; 2],
            current_mesh: None,
        }
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.pass.set_viewport(x, y, width, height, 0.0, 1.0);
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        self.pass.set_stencil_reference(reference);
    }

    pub fn set_pipeline(&mut self, program: ProgramHandle, pipeline: &'a wgpu::RenderPipeline) {
        if self.current_pipeline != Some(program) {
            self.pass.set_pipeline(pipeline);
            self.current_pipeline = Some(program);
            // A new pipeline layout invalidates what was bound under the old one.
            self.current_bind_groups = [None; 2];
        }
    }

    /// `id` must change whenever the bind group object changes.
    pub fn set_bind_group(
        &mut self,
        index: u32,
        id: u64,
        bind_group: &'a wgpu::BindGroup,
        offset: Option<u32>,
    ) {
        let slot = index as usize;
        let state = BindGroupState { id, offset };
        if self.current_bind_groups[slot] != Some(state) {
            match offset {
                Some(offset) => self.pass.set_bind_group(index, bind_group, &[offset]),
                None => self.pass.set_bind_group(index, bind_group, &[]),
            }
            self.current_bind_groups[slot] = Some(state);
        }
    }

    pub fn set_mesh(
        &mut self,
        mesh: MeshHandle,
        vertices: &'a wgpu::Buffer,
        indices: Option<&'a wgpu::Buffer>,
    ) {
        if self.current_mesh != Some(mesh) {
            self.pass.set_vertex_buffer(0, vertices.slice(..));
            if let Some(indices) = indices {
                self.pass
                    .set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
            }
            self.current_mesh = Some(mesh);
        }
    }

    pub fn draw(&mut self, vertices: std::ops::Range<u32>) {
        self.pass.draw(vertices, 0..1);
    }

    pub fn draw_indexed(&mut self, indices: std::ops::Range<u32>) {
        self.pass.draw_indexed(indices, 0, 0..1);
    }
}
