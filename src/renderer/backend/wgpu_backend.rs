//! wgpu Backend
//!
//! [`WgpuContext`] owns the device, queue and window surface. [`WgpuBackend`]
//! implements [`RenderBackend`] on top of it.
//!
//! Passes are recorded as plain command lists while the graph executes and
//! encoded in one go at [`end_frame`](RenderBackend::end_frame). Deferring the
//! encode lets every draw's uniform block live in a single per-frame arena
//! buffer (one dynamic offset per draw) that is uploaded once, right before
//! submission.

use std::borrow::Cow;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::tracked_pass::TrackedRenderPass;
use super::{
    BackendLimits, FramebufferDesc, FramebufferHandle, LINEAR_SAMPLER_BINDING, LoadAction,
    MAX_TEXTURE_UNITS, MeshDesc, MeshHandle, PassDesc, PassTarget, ProgramDesc, ProgramHandle,
    RenderBackend, ResourceCounts, SHADOW_SAMPLER_BINDING, StencilMode, TextureDesc,
    TextureHandle, TextureInfo, TextureUsage, Viewport, validate_framebuffer,
    validate_texture_size,
};
use crate::errors::{Result, SssError};
use crate::renderer::settings::RendererSettings;
use crate::renderer::shader::{TextureBinding, TextureKind};

// ─── Context ──────────────────────────────────────────────────────────────────

/// Core wgpu handles: device, queue, surface and its configuration.
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl WgpuContext {
    pub async fn new<W>(
        window: W,
        settings: &RendererSettings,
        width: u32,
        height: u32,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| SssError::SurfaceError(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| SssError::AdapterRequestFailed(e.to_string()))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("SSS Device"),
                required_features: settings.required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                SssError::SurfaceError("Surface not supported by adapter".to_string())
            })?;

        config.present_mode = if settings.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        surface.configure(&device, &config);

        Ok(Self {
            device,
            queue,
            surface,
            config,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

// ─── GPU Objects ──────────────────────────────────────────────────────────────

struct GpuTexture {
    texture: wgpu::Texture,
    /// Full view, used as a render attachment.
    view: wgpu::TextureView,
    /// Depth-only view for depth-stencil formats, the full view otherwise.
    sample_view: wgpu::TextureView,
    info: TextureInfo,
}

struct GpuFramebuffer {
    label: String,
    colors: SmallVec<[TextureHandle; 5]>,
    depth_stencil: Option<TextureHandle>,
}

struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    textures: Vec<TextureBinding>,
    uses_linear_sampler: bool,
    uses_shadow_sampler: bool,
    uniform_size: u32,
    /// Bind group over the uniform arena, tagged with the arena generation.
    uniform_group: Option<(u64, u64, wgpu::BindGroup)>,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_count: u32,
}

// ─── Recorded Commands ────────────────────────────────────────────────────────

type TextureGroupKey = (ProgramHandle, SmallVec<[TextureHandle; 8]>);

struct DrawCommand {
    program: ProgramHandle,
    mesh: MeshHandle,
    uniform_offset: u32,
    textures: TextureGroupKey,
}

struct RecordedPass {
    label: String,
    target: PassTarget,
    color: LoadAction<wgpu::Color>,
    depth: LoadAction<f32>,
    stencil: LoadAction<u32>,
    stencil_reference: u32,
    viewport: Viewport,
    draws: Vec<DrawCommand>,
}

struct UniformArena {
    buffer: wgpu::Buffer,
    capacity: u64,
    generation: u64,
    staging: Vec<u8>,
    alignment: u64,
}

impl UniformArena {
    const INITIAL_CAPACITY: u64 = 64 * 1024;

    fn new(device: &wgpu::Device) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        Self {
            buffer: Self::create_buffer(device, Self::INITIAL_CAPACITY),
            capacity: Self::INITIAL_CAPACITY,
            generation: 0,
            staging: Vec::with_capacity(Self::INITIAL_CAPACITY as usize),
            alignment,
        }
    }

    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Appends one uniform block and returns its dynamic offset.
    fn push(&mut self, bytes: &[u8], block_size: u32) -> u32 {
        let aligned = (self.staging.len() as u64).next_multiple_of(self.alignment) as usize;
        self.staging.resize(aligned, 0);
        let len = bytes.len().min(block_size as usize);
        self.staging.extend_from_slice(&bytes[..len]);
        self.staging.resize(aligned + block_size as usize, 0);
        aligned as u32
    }

    /// Makes sure the GPU buffer can hold the staged bytes and uploads them.
    fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.staging.is_empty() {
            return;
        }
        let needed = self.staging.len() as u64;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            log::info!(
                "Recreating uniform arena ({} -> {} bytes)",
                self.capacity,
                capacity
            );
            self.buffer = Self::create_buffer(device, capacity);
            self.capacity = capacity;
            self.generation += 1;
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
        self.staging.clear();
    }
}

// ─── Backend ──────────────────────────────────────────────────────────────────

pub struct WgpuBackend {
    ctx: WgpuContext,
    limits: BackendLimits,

    textures: SlotMap<TextureHandle, GpuTexture>,
    framebuffers: SlotMap<FramebufferHandle, GpuFramebuffer>,
    programs: SlotMap<ProgramHandle, GpuProgram>,
    meshes: SlotMap<MeshHandle, GpuMesh>,

    linear_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    texture_groups: FxHashMap<TextureGroupKey, (u64, wgpu::BindGroup)>,
    next_group_id: u64,
    arena: UniformArena,

    frame: Option<wgpu::SurfaceTexture>,
    passes: Vec<RecordedPass>,
    current_pass: Option<RecordedPass>,
    bound: [Option<TextureHandle>; MAX_TEXTURE_UNITS as usize],
}

impl WgpuBackend {
    #[must_use]
    pub fn new(ctx: WgpuContext, settings: &RendererSettings) -> Self {
        let device_max = ctx.device.limits().max_texture_dimension_2d;
        let limits = BackendLimits {
            max_texture_dimension: settings.max_texture_dimension.min(device_max),
        };

        let linear_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let arena = UniformArena::new(&ctx.device);

        Self {
            ctx,
            limits,
            textures: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            linear_sampler,
            shadow_sampler,
            texture_groups: FxHashMap::default(),
            next_group_id: 0,
            arena,
            frame: None,
            passes: Vec::new(),
            current_pass: None,
            bound: [None; MAX_TEXTURE_UNITS as usize],
        }
    }

    #[must_use]
    pub fn context(&self) -> &WgpuContext {
        &self.ctx
    }

    fn state(&self) -> String {
        match (&self.frame, &self.current_pass) {
            (None, _) => "idle".into(),
            (Some(_), None) => "in frame".into(),
            (Some(_), Some(pass)) => format!("in pass \"{}\"", pass.label),
        }
    }

    fn invalid(&self, operation: &'static str) -> SssError {
        SssError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    fn texture_layout_entries(
        textures: &[TextureBinding],
        linear: bool,
        shadow: bool,
    ) -> Vec<wgpu::BindGroupLayoutEntry> {
        let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let mut entries: Vec<_> = textures
            .iter()
            .map(|t| wgpu::BindGroupLayoutEntry {
                binding: t.unit,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: match t.kind {
                        TextureKind::Float => wgpu::TextureSampleType::Float { filterable: true },
                        TextureKind::Depth => wgpu::TextureSampleType::Depth,
                        TextureKind::Sint => wgpu::TextureSampleType::Sint,
                        TextureKind::Uint => wgpu::TextureSampleType::Uint,
                    },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        if linear {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: LINEAR_SAMPLER_BINDING,
                visibility,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        if shadow {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: SHADOW_SAMPLER_BINDING,
                visibility,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            });
        }
        entries
    }

    fn stencil_state(mode: StencilMode, format: wgpu::TextureFormat) -> wgpu::StencilState {
        if !format.has_stencil_aspect() {
            return wgpu::StencilState::default();
        }
        let face = match mode {
            StencilMode::Disabled => return wgpu::StencilState::default(),
            StencilMode::Write => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Always,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Replace,
            },
            StencilMode::TestEqual => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Equal,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: 0xFF,
        }
    }

    /// Returns the cached texture bind group for `key`, creating it on first use.
    fn texture_group(&mut self, key: &TextureGroupKey) -> Result<u64> {
        if let Some((id, _)) = self.texture_groups.get(key) {
            return Ok(*id);
        }
        let program = self
            .programs
            .get(key.0)
            .ok_or_else(|| SssError::ResourceNotFound(format!("program {:?}", key.0)))?;

        let mut entries = Vec::with_capacity(program.textures.len() + 2);
        for (binding, &handle) in program.textures.iter().zip(key.1.iter()) {
            let texture = self
                .textures
                .get(handle)
                .ok_or_else(|| SssError::ResourceNotFound(format!("texture {handle:?}")))?;
            entries.push(wgpu::BindGroupEntry {
                binding: binding.unit,
                resource: wgpu::BindingResource::TextureView(&texture.sample_view),
            });
        }
        if program.uses_linear_sampler {
            entries.push(wgpu::BindGroupEntry {
                binding: LINEAR_SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
            });
        }
        if program.uses_shadow_sampler {
            entries.push(wgpu::BindGroupEntry {
                binding: SHADOW_SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
            });
        }

        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.label.as_str()),
            layout: &program.texture_layout,
            entries: &entries,
        });
        let id = self.next_group_id;
        self.next_group_id += 1;
        self.texture_groups.insert(key.clone(), (id, bind_group));
        Ok(id)
    }

    /// Rebuilds uniform bind groups that point at an outdated arena buffer.
    fn refresh_uniform_groups(&mut self) {
        let generation = self.arena.generation;
        for program in self.programs.values_mut() {
            if program.uniform_size == 0 {
                continue;
            }
            if matches!(program.uniform_group, Some((g, _, _)) if g == generation) {
                continue;
            }
            let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(program.label.as_str()),
                layout: &program.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.arena.buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(u64::from(program.uniform_size)),
                    }),
                }],
            });
            program.uniform_group = Some((generation, self.next_group_id, bind_group));
            self.next_group_id += 1;
        }
    }

    fn encode(&self, passes: &[RecordedPass], surface_view: &wgpu::TextureView) -> wgpu::CommandBuffer {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        for pass in passes {
            encoder.push_debug_group(&pass.label);
            self.encode_pass(&mut encoder, pass, surface_view);
            encoder.pop_debug_group();
        }

        encoder.finish()
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &RecordedPass,
        surface_view: &wgpu::TextureView,
    ) {
        let color_ops = wgpu::Operations {
            load: match pass.color {
                LoadAction::Clear(c) => wgpu::LoadOp::Clear(c),
                LoadAction::Load => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        };

        let mut color_views: SmallVec<[&wgpu::TextureView; 5]> = SmallVec::new();
        let mut depth_texture: Option<&GpuTexture> = None;
        match pass.target {
            PassTarget::Surface => color_views.push(surface_view),
            PassTarget::Framebuffer(handle) => {
                if let Some(fb) = self.framebuffers.get(handle) {
                    color_views.extend(
                        fb.colors
                            .iter()
                            .filter_map(|&t| self.textures.get(t).map(|t| &t.view)),
                    );
                    depth_texture = fb.depth_stencil.and_then(|t| self.textures.get(t));
                }
            }
        }

        let color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment>; 5]> =
            color_views
                .into_iter()
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: color_ops,
                        depth_slice: None,
                    })
                })
                .collect();

        let depth_stencil_attachment = depth_texture.map(|texture| {
            let format = texture.info.format;
            wgpu::RenderPassDepthStencilAttachment {
                view: &texture.view,
                depth_ops: format.has_depth_aspect().then(|| wgpu::Operations {
                    load: match pass.depth {
                        LoadAction::Clear(d) => wgpu::LoadOp::Clear(d),
                        LoadAction::Load => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: format.has_stencil_aspect().then(|| wgpu::Operations {
                    load: match pass.stencil {
                        LoadAction::Clear(s) => wgpu::LoadOp::Clear(s),
                        LoadAction::Load => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
            }
        });

        let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label.as_str()),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            ..Default::default()
        });

        let mut tracked = TrackedRenderPass::new(render_pass);
        let vp = pass.viewport;
        tracked.set_viewport(vp.x as f32, vp.y as f32, vp.width as f32, vp.height as f32);
        tracked.set_stencil_reference(pass.stencil_reference);

        for draw in &pass.draws {
            let (Some(program), Some(mesh)) =
                (self.programs.get(draw.program), self.meshes.get(draw.mesh))
            else {
                continue;
            };
            tracked.set_pipeline(draw.program, &program.pipeline);

            if let Some((_, id, group)) = &program.uniform_group {
                tracked.set_bind_group(0, *id, group, Some(draw.uniform_offset));
            }
            if let Some((id, group)) = self.texture_groups.get(&draw.textures) {
                tracked.set_bind_group(1, *id, group, None);
            }

            tracked.set_mesh(draw.mesh, &mesh.vertex_buffer, mesh.index_buffer.as_ref());
            if mesh.index_buffer.is_some() {
                tracked.draw_indexed(0..mesh.index_count);
            } else {
                tracked.draw(0..mesh.vertex_count);
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn surface_size(&self) -> (u32, u32) {
        self.ctx.size()
    }

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.ctx.config.format
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        validate_texture_size(desc, self.limits)?;

        let usage = match desc.usage {
            TextureUsage::RenderTarget => {
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
            }
            TextureUsage::Sampled => {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            }
        };
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sample_view = if desc.format.has_stencil_aspect() && desc.format.has_depth_aspect() {
            texture.create_view(&wgpu::TextureViewDescriptor {
                aspect: wgpu::TextureAspect::DepthOnly,
                ..Default::default()
            })
        } else {
            view.clone()
        };

        Ok(self.textures.insert(GpuTexture {
            texture,
            view,
            sample_view,
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
            },
        }))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<()> {
        let gpu = self
            .textures
            .get(texture)
            .ok_or_else(|| SssError::ResourceNotFound(format!("texture {texture:?}")))?;
        let TextureInfo {
            width,
            height,
            format,
        } = gpu.info;
        let texel = format.block_copy_size(None).unwrap_or(4);
        let expected = width as usize * height as usize * texel as usize;
        if data.len() != expected {
            return Err(SssError::InvalidState {
                operation: "write_texture",
                state: format!("expected {expected} bytes, got {}", data.len()),
            });
        }

        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * texel),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(gpu) = self.textures.remove(texture) {
            gpu.texture.destroy();
            self.texture_groups.retain(|key, _| !key.1.contains(&texture));
        }
    }

    fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo> {
        self.textures.get(texture).map(|t| t.info)
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle> {
        validate_framebuffer(desc, |h| self.texture_info(h))?;
        Ok(self.framebuffers.insert(GpuFramebuffer {
            label: desc.label.to_string(),
            colors: SmallVec::from_slice(desc.colors),
            depth_stencil: desc.depth_stencil,
        }))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if let Some(fb) = self.framebuffers.remove(framebuffer) {
            log::debug!("Destroyed framebuffer \"{}\"", fb.label);
        }
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle> {
        let device = &self.ctx.device;
        let linked = desc.linked;

        let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(linked.vertex.label.as_str()),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&linked.vertex.source)),
        });
        let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(linked.fragment.label.as_str()),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&linked.fragment.source)),
        });

        let mut uniform_entries = Vec::with_capacity(1);
        if linked.uniform_size > 0 {
            uniform_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(u64::from(linked.uniform_size)),
                },
                count: None,
            });
        }
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniforms Layout"),
            entries: &uniform_entries,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Textures Layout"),
            entries: &Self::texture_layout_entries(
                &linked.textures,
                linked.uses_linear_sampler,
                linked.uses_shadow_sampler,
            ),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[Some(&uniform_layout), Some(&texture_layout)],
            immediate_size: 0,
        });

        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: desc.vertex_layout.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &desc.vertex_layout.attributes,
        }];
        let targets: SmallVec<[Option<wgpu::ColorTargetState>; 5]> = desc
            .color_formats
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let depth_stencil = desc.depth_stencil_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(desc.depth.write),
            depth_compare: if desc.depth.test {
                Some(wgpu::CompareFunction::Less)
            } else {
                Some(wgpu::CompareFunction::Always)
            },
            stencil: Self::stencil_state(desc.stencil, format),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(linked.vertex.entry_point.as_str()),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(linked.fragment.entry_point.as_str()),
                targets: &targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: desc.cull_back_faces.then_some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(self.programs.insert(GpuProgram {
            label: desc.label.to_string(),
            pipeline,
            uniform_layout,
            texture_layout,
            textures: linked.textures.clone(),
            uses_linear_sampler: linked.uses_linear_sampler,
            uses_shadow_sampler: linked.uses_shadow_sampler,
            uniform_size: linked.uniform_size,
            uniform_group: None,
        }))
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program).is_some() {
            self.texture_groups.retain(|key, _| key.0 != program);
        }
    }

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<MeshHandle> {
        use wgpu::util::DeviceExt;

        let expected = desc.vertex_count as usize * desc.layout.stride as usize;
        if desc.vertices.len() != expected || desc.vertices.is_empty() {
            return Err(SssError::MeshLoad(format!(
                "\"{}\": {} vertex bytes for {} vertices",
                desc.label,
                desc.vertices.len(),
                desc.vertex_count
            )));
        }

        let vertex_buffer = self
            .ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.vertices,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = (!desc.indices.is_empty()).then(|| {
            self.ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(desc.label),
                    contents: bytemuck::cast_slice(desc.indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });

        Ok(self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: desc.vertex_count,
            index_count: desc.indices.len() as u32,
        }))
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        if let Some(gpu) = self.meshes.remove(mesh) {
            gpu.vertex_buffer.destroy();
            if let Some(indices) = gpu.index_buffer {
                indices.destroy();
            }
        }
    }

    fn begin_frame(&mut self) -> Result<()> {
        if self.frame.is_some() {
            return Err(self.invalid("begin_frame"));
        }
        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            e @ (wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                let (w, h) = self.ctx.size();
                self.ctx.resize(w, h);
                return Err(SssError::SurfaceError(format!("{e:?}, surface reconfigured")));
            }
            e => return Err(SssError::SurfaceError(format!("{e:?}"))),
        };
        self.frame = Some(output);
        self.passes.clear();
        Ok(())
    }

    fn begin_pass(&mut self, desc: &PassDesc) -> Result<()> {
        if self.frame.is_none() || self.current_pass.is_some() {
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
        self.bound = [None; MAX_TEXTURE_UNITS as usize];
        self.current_pass = Some(RecordedPass {
            label: desc.label.to_string(),
            target: desc.target,
            color: desc.color,
            depth: desc.depth,
            stencil: desc.stencil,
            stencil_reference: desc.stencil_reference,
            viewport: desc.viewport,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<()> {
        let Some(pass) = &self.current_pass else {
            return Err(self.invalid("bind_texture"));
        };
        if unit >= MAX_TEXTURE_UNITS {
            return Err(SssError::ResourceNotFound(format!("texture unit {unit}")));
        }
        if !self.textures.contains_key(texture) {
            return Err(SssError::ResourceNotFound(format!("texture {texture:?}")));
        }
        if let PassTarget::Framebuffer(fb) = pass.target
            && let Some(fb) = self.framebuffers.get(fb)
            && (fb.colors.contains(&texture) || fb.depth_stencil == Some(texture))
        {
            return Err(SssError::InvalidState {
                operation: "bind_texture",
                state: format!("texture is an attachment of \"{}\"", fb.label),
            });
        }
        self.bound[unit as usize] = Some(texture);
        Ok(())
    }

    fn unbind_texture(&mut self, unit: u32) {
        if let Some(slot) = self.bound.get_mut(unit as usize) {
            *slot = None;
        }
    }

    fn draw(&mut self, program: ProgramHandle, uniforms: &[u8], mesh: MeshHandle) -> Result<()> {
        if self.current_pass.is_none() {
            return Err(self.invalid("draw"));
        }
        let gpu = self
            .programs
            .get(program)
            .ok_or_else(|| SssError::ResourceNotFound(format!("program {program:?}")))?;
        if !self.meshes.contains_key(mesh) {
            return Err(SssError::ResourceNotFound(format!("mesh {mesh:?}")));
        }

        let mut textures = SmallVec::new();
        for binding in &gpu.textures {
            let Some(texture) = self.bound[binding.unit as usize] else {
                return Err(SssError::InvalidState {
                    operation: "draw",
                    state: format!(
                        "\"{}\" samples `{}` at unit {} but nothing is bound",
                        gpu.label, binding.name, binding.unit
                    ),
                });
            };
            textures.push(texture);
        }
        let uniform_size = gpu.uniform_size;

        let key = (program, textures);
        self.texture_group(&key)?;
        let uniform_offset = if uniform_size > 0 {
            self.arena.push(uniforms, uniform_size)
        } else {
            0
        };

        if let Some(pass) = &mut self.current_pass {
            pass.draws.push(DrawCommand {
                program,
                mesh,
                uniform_offset,
                textures: key,
            });
        }
        Ok(())
    }

    fn end_pass(&mut self) -> Result<()> {
        let Some(pass) = self.current_pass.take() else {
            return Err(self.invalid("end_pass"));
        };
        self.bound = [None; MAX_TEXTURE_UNITS as usize];
        self.passes.push(pass);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if self.current_pass.is_some() {
            return Err(self.invalid("end_frame"));
        }
        let Some(output) = self.frame.take() else {
            return Err(self.invalid("end_frame"));
        };

        self.arena.flush(&self.ctx.device, &self.ctx.queue);
        self.refresh_uniform_groups();

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let passes = std::mem::take(&mut self.passes);
        let commands = self.encode(&passes, &view);
        self.passes = passes;
        self.passes.clear();

        self.ctx.queue.submit(std::iter::once(commands));
        output.present();
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
