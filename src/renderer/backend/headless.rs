//! Headless Backend
//!
//! A [`RenderBackend`] without a GPU. Objects are bookkeeping entries in slot
//! maps, so handle lifetimes, framebuffer completeness and the frame protocol
//! are enforced exactly like on a device. Every frame command is appended to
//! an event log tests can inspect.

use slotmap::SlotMap;
use smallvec::SmallVec;

use super::{
    BackendLimits, FramebufferDesc, FramebufferHandle, MAX_TEXTURE_UNITS, MeshDesc, MeshHandle,
    PassDesc, PassTarget, ProgramDesc, ProgramHandle, RenderBackend, ResourceCounts, TextureDesc,
    TextureHandle, TextureInfo, validate_framebuffer, validate_texture_size,
};
use crate::errors::{Result, SssError};
use crate::renderer::shader::TextureBinding;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    BeginFrame { index: u64 },
    BeginPass { label: String, target: PassTarget },
    BindTexture { unit: u32, texture: TextureHandle },
    Draw { program: ProgramHandle, mesh: MeshHandle },
    UnbindTexture { unit: u32 },
    EndPass,
    Present,
}

struct HeadlessTexture {
    label: String,
    info: TextureInfo,
}

struct HeadlessFramebuffer {
    colors: SmallVec<[TextureHandle; 5]>,
    depth_stencil: Option<TextureHandle>,
}

struct HeadlessProgram {
    label: String,
    textures: Vec<TextureBinding>,
    uniform_size: usize,
    color_formats: SmallVec<[wgpu::TextureFormat; 5]>,
    depth_stencil_format: Option<wgpu::TextureFormat>,
}

struct HeadlessMesh {
    label: String,
}

pub struct HeadlessBackend {
    limits: BackendLimits,
    surface_size: (u32, u32),
    textures: SlotMap<TextureHandle, HeadlessTexture>,
    framebuffers: SlotMap<FramebufferHandle, HeadlessFramebuffer>,
    programs: SlotMap<ProgramHandle, HeadlessProgram>,
    meshes: SlotMap<MeshHandle, HeadlessMesh>,

    frame_index: u64,
    in_frame: bool,
    current_pass: Option<PassTarget>,
    bound: [Option<TextureHandle>; MAX_TEXTURE_UNITS as usize],
    events: Vec<BackendEvent>,
}

impl HeadlessBackend {
    pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_limits(
            width,
            height,
            BackendLimits {
                max_texture_dimension: 8192,
            },
        )
    }

    #[must_use]
    pub fn with_limits(width: u32, height: u32, limits: BackendLimits) -> Self {
        Self {
            limits,
            surface_size: (width, height),
            textures: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            frame_index: 0,
            in_frame: false,
            current_pass: None,
            bound: [None; MAX_TEXTURE_UNITS as usize],
            events: Vec::new(),
        }
    }

    /// Everything recorded since the last [`clear_events`](Self::clear_events).
    #[must_use]
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn texture_label(&self, texture: TextureHandle) -> Option<&str> {
        self.textures.get(texture).map(|t| t.label.as_str())
    }

    #[must_use]
    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(program).map(|p| p.label.as_str())
    }

    #[must_use]
    pub fn mesh_label(&self, mesh: MeshHandle) -> Option<&str> {
        self.meshes.get(mesh).map(|m| m.label.as_str())
    }

    fn state(&self) -> String {
        match (self.in_frame, self.current_pass) {
            (false, _) => "idle".into(),
            (true, None) => "in frame".into(),
            (true, Some(target)) => format!("in pass ({target:?})"),
        }
    }

    fn invalid(&self, operation: &'static str) -> SssError {
        SssError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    fn target_formats(
        &self,
        target: PassTarget,
    ) -> Option<(SmallVec<[wgpu::TextureFormat; 5]>, Option<wgpu::TextureFormat>)> {
        match target {
            PassTarget::Surface => Some((SmallVec::from_slice(&[Self::SURFACE_FORMAT]), None)),
            PassTarget::Framebuffer(handle) => {
                let fb = self.framebuffers.get(handle)?;
                let colors = fb
                    .colors
                    .iter()
                    .map(|&t| self.textures.get(t).map(|t| t.info.format))
                    .collect::<Option<_>>()?;
                let depth = match fb.depth_stencil {
                    Some(t) => Some(self.textures.get(t)?.info.format),
                    None => None,
                };
                Some((colors, depth))
            }
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn surface_format(&self) -> wgpu::TextureFormat {
        Self::SURFACE_FORMAT
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_size = (width, height);
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        validate_texture_size(desc, self.limits)?;
        Ok(self.textures.insert(HeadlessTexture {
            label: desc.label.to_string(),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
            },
        }))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<()> {
        let tex = self
            .textures
            .get(texture)
            .ok_or_else(|| SssError::ResourceNotFound(format!("texture {texture:?}")))?;
        let texel = tex.info.format.block_copy_size(None).unwrap_or(4) as usize;
        let expected = tex.info.width as usize * tex.info.height as usize * texel;
        if data.len() != expected {
            return Err(SssError::InvalidState {
                operation: "write_texture",
                state: format!(
                    "\"{}\" expects {expected} bytes, got {}",
                    tex.label,
                    data.len()
                ),
            });
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(texture);
    }

    fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo> {
        self.textures.get(texture).map(|t| t.info)
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle> {
        validate_framebuffer(desc, |h| self.texture_info(h))?;
        Ok(self.framebuffers.insert(HeadlessFramebuffer {
            colors: SmallVec::from_slice(desc.colors),
            depth_stencil: desc.depth_stencil,
        }))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.framebuffers.remove(framebuffer);
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle> {
        Ok(self.programs.insert(HeadlessProgram {
            label: desc.label.to_string(),
            textures: desc.linked.textures.clone(),
            uniform_size: desc.linked.uniform_size as usize,
            color_formats: SmallVec::from_slice(desc.color_formats),
            depth_stencil_format: desc.depth_stencil_format,
        }))
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.programs.remove(program);
    }

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<MeshHandle> {
        let expected = desc.vertex_count as usize * desc.layout.stride as usize;
        if desc.vertices.len() != expected {
            return Err(SssError::MeshLoad(format!(
                "\"{}\": {} vertex bytes for {} vertices of stride {}",
                desc.label,
                desc.vertices.len(),
                desc.vertex_count,
                desc.layout.stride
            )));
        }
        if let Some(&bad) = desc.indices.iter().find(|&&i| i >= desc.vertex_count) {
            return Err(SssError::MeshLoad(format!(
                "\"{}\": index {bad} out of range for {} vertices",
                desc.label, desc.vertex_count
            )));
        }
        Ok(self.meshes.insert(HeadlessMesh {
            label: desc.label.to_string(),
        }))
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        self.meshes.remove(mesh);
    }

    fn begin_frame(&mut self) -> Result<()> {
        if self.in_frame {
            return Err(self.invalid("begin_frame"));
        }
        self.in_frame = true;
        self.frame_index += 1;
        self.events.push(BackendEvent::BeginFrame {
            index: self.frame_index,
        });
        Ok(())
    }

    fn begin_pass(&mut self, desc: &PassDesc) -> Result<()> {
        if !self.in_frame || self.current_pass.is_some() {
            return Err(self.invalid("begin_pass"));
        }
        if let PassTarget::Framebuffer(fb) = desc.target
            && !self.framebuffers.contains_key(fb)
        {
            return Err(SssError::ResourceNotFound(format!(
                "framebuffer for pass \"{}\"",
                desc.label
            )));
        }
        self.current_pass = Some(desc.target);
        self.bound = [None; MAX_TEXTURE_UNITS as usize];
        self.events.push(BackendEvent::BeginPass {
            label: desc.label.to_string(),
            target: desc.target,
        });
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<()> {
        let Some(target) = self.current_pass else {
            return Err(self.invalid("bind_texture"));
        };
        if unit >= MAX_TEXTURE_UNITS {
            return Err(SssError::ResourceNotFound(format!("texture unit {unit}")));
        }
        let Some(tex) = self.textures.get(texture) else {
            return Err(SssError::ResourceNotFound(format!("texture {texture:?}")));
        };
        if let PassTarget::Framebuffer(fb) = target
            && let Some(fb) = self.framebuffers.get(fb)
            && (fb.colors.contains(&texture) || fb.depth_stencil == Some(texture))
        {
            return Err(SssError::InvalidState {
                operation: "bind_texture",
                state: format!("\"{}\" is an attachment of the active target", tex.label),
            });
        }
        self.bound[unit as usize] = Some(texture);
        self.events.push(BackendEvent::BindTexture { unit, texture });
        Ok(())
    }

    fn unbind_texture(&mut self, unit: u32) {
        if let Some(slot) = self.bound.get_mut(unit as usize) {
            *slot = None;
            self.events.push(BackendEvent::UnbindTexture { unit });
        }
    }

    fn draw(&mut self, program: ProgramHandle, uniforms: &[u8], mesh: MeshHandle) -> Result<()> {
        let Some(target) = self.current_pass else {
            return Err(self.invalid("draw"));
        };
        let prog = self
            .programs
            .get(program)
            .ok_or_else(|| SssError::ResourceNotFound(format!("program {program:?}")))?;
        if !self.meshes.contains_key(mesh) {
            return Err(SssError::ResourceNotFound(format!("mesh {mesh:?}")));
        }
        if uniforms.len() < prog.uniform_size {
            return Err(SssError::InvalidState {
                operation: "draw",
                state: format!(
                    "\"{}\" needs {} uniform bytes, got {}",
                    prog.label,
                    prog.uniform_size,
                    uniforms.len()
                ),
            });
        }
        for binding in &prog.textures {
            let live = self.bound[binding.unit as usize].is_some_and(|t| self.textures.contains_key(t));
            if !live {
                return Err(SssError::InvalidState {
                    operation: "draw",
                    state: format!(
                        "\"{}\" samples `{}` at unit {} but nothing is bound",
                        prog.label, binding.name, binding.unit
                    ),
                });
            }
        }
        let (colors, depth) = self
            .target_formats(target)
            .ok_or_else(|| SssError::ResourceNotFound(format!("attachments of {target:?}")))?;
        if colors != prog.color_formats || depth != prog.depth_stencil_format {
            return Err(SssError::InvalidState {
                operation: "draw",
                state: format!(
                    "\"{}\" targets {:?}/{:?} but the pass has {:?}/{:?}",
                    prog.label, prog.color_formats, prog.depth_stencil_format, colors, depth
                ),
            });
        }
        self.events.push(BackendEvent::Draw { program, mesh });
        Ok(())
    }

    fn end_pass(&mut self) -> Result<()> {
        if self.current_pass.take().is_none() {
            return Err(self.invalid("end_pass"));
        }
        self.bound = [None; MAX_TEXTURE_UNITS as usize];
        self.events.push(BackendEvent::EndPass);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if !self.in_frame || self.current_pass.is_some() {
            return Err(self.invalid("end_frame"));
        }
        self.in_frame = false;
        self.events.push(BackendEvent::Present);
        Ok(())
    }

    fn resource_counts(&self) -> ResourceCounts {
        ResourceCounts {
            textures: self.textures.len(),
            framebuffers: self.framebuffers.len(),
            programs: self.programs.len(),
            meshes: self.meshes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::{LoadAction, TextureUsage, Viewport};

    fn target(backend: &mut HeadlessBackend) -> (FramebufferHandle, TextureHandle) {
        let color = backend
            .create_texture(&TextureDesc {
                label: "color",
                width: 4,
                height: 4,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: TextureUsage::RenderTarget,
            })
            .unwrap();
        let fb = backend
            .create_framebuffer(&FramebufferDesc {
                label: "target",
                colors: &[color],
                depth_stencil: None,
            })
            .unwrap();
        (fb, color)
    }

    fn pass(target: PassTarget) -> PassDesc<'static> {
        PassDesc {
            label: "test",
            target,
            color: LoadAction::Load,
            depth: LoadAction::Load,
            stencil: LoadAction::Load,
            stencil_reference: 0,
            viewport: Viewport::full(4, 4),
        }
    }

    #[test]
    fn pass_outside_frame_is_rejected() {
        let mut backend = HeadlessBackend::new(4, 4);
        let err = backend.begin_pass(&pass(PassTarget::Surface)).unwrap_err();
        assert!(matches!(err, SssError::InvalidState { operation: "begin_pass", .. }));
    }

    #[test]
    fn nested_passes_are_rejected() {
        let mut backend = HeadlessBackend::new(4, 4);
        backend.begin_frame().unwrap();
        backend.begin_pass(&pass(PassTarget::Surface)).unwrap();
        assert!(backend.begin_pass(&pass(PassTarget::Surface)).is_err());
    }

    #[test]
    fn sampling_the_active_attachment_is_rejected() {
        let mut backend = HeadlessBackend::new(4, 4);
        let (fb, color) = target(&mut backend);
        backend.begin_frame().unwrap();
        backend.begin_pass(&pass(PassTarget::Framebuffer(fb))).unwrap();
        assert!(backend.bind_texture(0, color).is_err());
    }

    #[test]
    fn texture_upload_size_is_checked() {
        let mut backend = HeadlessBackend::new(4, 4);
        let (_, color) = target(&mut backend);
        assert!(backend.write_texture(color, &[0; 4 * 4 * 8]).is_ok());
        assert!(backend.write_texture(color, &[0; 16]).is_err());
    }

    #[test]
    fn destroyed_objects_leave_counts() {
        let mut backend = HeadlessBackend::new(4, 4);
        let (fb, color) = target(&mut backend);
        assert_eq!(backend.resource_counts().total(), 2);
        backend.destroy_framebuffer(fb);
        backend.destroy_texture(color);
        backend.destroy_texture(color);
        assert_eq!(backend.resource_counts(), ResourceCounts::default());
    }
}
