//! Render Target Sets
//!
//! A [`RenderTargetSet`] is a named group of textures bound together as one
//! framebuffer. [`RenderTargets`] owns every set the pipeline declares and
//! handles viewport rebuilds.
//!
//! ```text
//!  RenderTargets
//!  ├── shadow      Fixed(2048²)   [DS: Depth32Float]
//!  ├── gbuffer     Viewport       [C0..C4, DS]  ◄──────────┐
//!  ├── ssss_ping   Viewport       [C0, DS → gbuffer.DS] ───┤ shared
//!  ├── ssss_blur   Viewport       [C0, DS → gbuffer.DS] ───┤
//!  └── scene_hdr   Viewport       [C0, DS → gbuffer.DS] ───┘
//! ```
//!
//! Shared attachments reference a texture owned by an earlier set; releasing
//! the borrowing set never deletes them.

use smallvec::SmallVec;

use crate::errors::{Result, SssError};
use crate::renderer::backend::{
    FramebufferDesc, FramebufferHandle, RenderBackend, TextureDesc, TextureHandle, TextureUsage,
};

/// How a set is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// Never resized.
    Fixed { width: u32, height: u32 },
    /// Tracks the last viewport passed to [`RenderTargets::rebuild_viewport`].
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Color(u32),
    DepthStencil,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentSource {
    /// A texture allocated and released with the set.
    Owned { format: wgpu::TextureFormat },
    /// A texture owned by another, earlier declared set.
    Shared {
        set: &'static str,
        slot: AttachmentSlot,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentSpec {
    pub slot: AttachmentSlot,
    pub source: AttachmentSource,
}

impl AttachmentSpec {
    #[must_use]
    pub fn owned(slot: AttachmentSlot, format: wgpu::TextureFormat) -> Self {
        Self {
            slot,
            source: AttachmentSource::Owned { format },
        }
    }

    #[must_use]
    pub fn shared(slot: AttachmentSlot, set: &'static str) -> Self {
        Self {
            slot,
            source: AttachmentSource::Shared { set, slot },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetSpec {
    pub name: &'static str,
    pub size: SizeClass,
    pub attachments: Vec<AttachmentSpec>,
}

#[derive(Debug, Clone, Copy)]
struct Attachment {
    slot: AttachmentSlot,
    texture: TextureHandle,
    format: wgpu::TextureFormat,
    owned: bool,
}

/// A live framebuffer and its attachments.
#[derive(Debug)]
pub struct RenderTargetSet {
    name: &'static str,
    framebuffer: Option<FramebufferHandle>,
    attachments: SmallVec<[Attachment; 6]>,
    width: u32,
    height: u32,
}

impl RenderTargetSet {
    /// Allocates the owned textures of `spec` at `width`×`height`, resolves
    /// shared attachments through `shared` and builds the framebuffer.
    ///
    /// On failure everything allocated so far is released again.
    pub fn create(
        backend: &mut dyn RenderBackend,
        spec: &RenderTargetSpec,
        width: u32,
        height: u32,
        shared: impl Fn(&'static str, AttachmentSlot) -> Option<(TextureHandle, wgpu::TextureFormat)>,
    ) -> Result<Self> {
        let mut set = Self {
            name: spec.name,
            framebuffer: None,
            attachments: SmallVec::new(),
            width,
            height,
        };
        if let Err(e) = set.allocate(backend, spec, &shared) {
            set.release(backend);
            return Err(e);
        }
        log::debug!(
            "Created render target \"{}\" ({}x{}, {} attachments)",
            spec.name,
            width,
            height,
            set.attachments.len()
        );
        Ok(set)
    }

    fn allocate(
        &mut self,
        backend: &mut dyn RenderBackend,
        spec: &RenderTargetSpec,
        shared: &impl Fn(&'static str, AttachmentSlot) -> Option<(TextureHandle, wgpu::TextureFormat)>,
    ) -> Result<()> {
        for attachment in &spec.attachments {
            let (texture, format, owned) = match &attachment.source {
                AttachmentSource::Owned { format } => {
                    let label = format!("{}.{}", spec.name, slot_name(attachment.slot));
                    let texture = backend.create_texture(&TextureDesc {
                        label: &label,
                        width: self.width,
                        height: self.height,
                        format: *format,
                        usage: TextureUsage::RenderTarget,
                    })?;
                    (texture, *format, true)
                }
                AttachmentSource::Shared { set, slot } => {
                    let (texture, format) =
                        shared(*set, *slot).ok_or_else(|| SssError::FramebufferIncomplete {
                            target: spec.name.to_string(),
                            reason: format!(
                                "shared attachment {}.{} is not available",
                                set,
                                slot_name(*slot)
                            ),
                        })?;
                    (texture, format, false)
                }
            };
            self.attachments.push(Attachment {
                slot: attachment.slot,
                texture,
                format,
                owned,
            });
        }

        let mut colors: SmallVec<[(u32, TextureHandle); 6]> = self
            .attachments
            .iter()
            .filter_map(|a| match a.slot {
                AttachmentSlot::Color(i) => Some((i, a.texture)),
                AttachmentSlot::DepthStencil => None,
            })
            .collect();
        colors.sort_by_key(|(i, _)| *i);
        if colors.iter().enumerate().any(|(n, (i, _))| n as u32 != *i) {
            return Err(SssError::FramebufferIncomplete {
                target: spec.name.to_string(),
                reason: "color slots are not contiguous from 0".into(),
            });
        }
        let color_textures: SmallVec<[TextureHandle; 6]> = colors.iter().map(|(_, t)| *t).collect();

        self.framebuffer = Some(backend.create_framebuffer(&FramebufferDesc {
            label: spec.name,
            colors: &color_textures,
            depth_stencil: self.texture(AttachmentSlot::DepthStencil),
        })?);
        Ok(())
    }

    /// Deletes owned textures and the framebuffer. Safe to call more than
    /// once.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        let was_live = self.framebuffer.is_some() || !self.attachments.is_empty();
        if let Some(framebuffer) = self.framebuffer.take() {
            backend.destroy_framebuffer(framebuffer);
        }
        for attachment in self.attachments.drain(..) {
            if attachment.owned {
                backend.destroy_texture(attachment.texture);
            }
        }
        if was_live {
            log::debug!("Released render target \"{}\"", self.name);
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.framebuffer.is_some()
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn texture(&self, slot: AttachmentSlot) -> Option<TextureHandle> {
        self.attachment(slot).map(|a| a.texture)
    }

    #[must_use]
    pub fn format(&self, slot: AttachmentSlot) -> Option<wgpu::TextureFormat> {
        self.attachment(slot).map(|a| a.format)
    }

    /// Textures this set allocated itself.
    pub fn owned_textures(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.attachments.iter().filter(|a| a.owned).map(|a| a.texture)
    }

    fn attachment(&self, slot: AttachmentSlot) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.slot == slot)
    }
}

fn slot_name(slot: AttachmentSlot) -> String {
    match slot {
        AttachmentSlot::Color(i) => format!("color{i}"),
        AttachmentSlot::DepthStencil => "depth_stencil".into(),
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Every render target set of the pipeline, in declaration order.
#[derive(Debug)]
pub struct RenderTargets {
    specs: Vec<RenderTargetSpec>,
    sets: Vec<Option<RenderTargetSet>>,
    viewport: (u32, u32),
}

impl RenderTargets {
    #[must_use]
    pub fn new(specs: Vec<RenderTargetSpec>) -> Self {
        let sets = specs.iter().map(|_| None).collect();
        Self {
            specs,
            sets,
            viewport: (0, 0),
        }
    }

    /// Creates fixed-resolution sets only.
    pub fn create_fixed(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        for index in 0..self.specs.len() {
            if let SizeClass::Fixed { width, height } = self.specs[index].size {
                self.create_at(backend, index, width, height)?;
            }
        }
        Ok(())
    }

    /// Releases every viewport-sized set, then re-creates all of them at
    /// `width`×`height`.
    ///
    /// If a set fails to build, the viewport sets created so far are
    /// released again and the error is returned; fixed sets are untouched.
    pub fn rebuild_viewport(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.release_where(backend, |size| size == SizeClass::Viewport);

        for index in 0..self.specs.len() {
            if self.specs[index].size != SizeClass::Viewport {
                continue;
            }
            if let Err(e) = self.create_at(backend, index, width, height) {
                self.release_where(backend, |size| size == SizeClass::Viewport);
                return Err(e);
            }
        }
        self.viewport = (width, height);
        log::info!("Rebuilt viewport render targets at {width}x{height}");
        Ok(())
    }

    /// Releases every set in reverse declaration order.
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        self.release_where(backend, |_| true);
    }

    fn release_where(&mut self, backend: &mut dyn RenderBackend, pred: impl Fn(SizeClass) -> bool) {
        for (spec, slot) in self.specs.iter().zip(self.sets.iter_mut()).rev() {
            if pred(spec.size)
                && let Some(mut set) = slot.take()
            {
                set.release(backend);
            }
        }
    }

    fn create_at(
        &mut self,
        backend: &mut dyn RenderBackend,
        index: usize,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let spec = &self.specs[index];
        for attachment in &spec.attachments {
            if let AttachmentSource::Shared { set, .. } = attachment.source {
                let source = self.specs[..index].iter().find(|s| s.name == set);
                let valid = match source {
                    Some(source) => {
                        !(matches!(spec.size, SizeClass::Fixed { .. })
                            && source.size == SizeClass::Viewport)
                    }
                    None => false,
                };
                if !valid {
                    return Err(SssError::FramebufferIncomplete {
                        target: spec.name.to_string(),
                        reason: format!(
                            "\"{set}\" must be declared earlier with a compatible size class"
                        ),
                    });
                }
            }
        }

        let sets = &self.sets;
        let specs = &self.specs;
        let lookup = |name: &'static str, slot: AttachmentSlot| {
            let position = specs.iter().position(|s| s.name == name)?;
            let set = sets[position].as_ref()?;
            Some((set.texture(slot)?, set.format(slot)?))
        };
        let set = RenderTargetSet::create(backend, spec, width, height, lookup)?;
        self.sets[index] = Some(set);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RenderTargetSet> {
        let index = self.specs.iter().position(|s| s.name == name)?;
        self.sets[index].as_ref()
    }

    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&RenderTargetSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn texture(&self, name: &str, slot: AttachmentSlot) -> Option<TextureHandle> {
        self.get(name)?.texture(slot)
    }

    #[must_use]
    pub fn framebuffer(&self, name: &str) -> Option<FramebufferHandle> {
        self.get(name)?.framebuffer()
    }

    /// Color formats of `name` in slot order, from its declaration.
    #[must_use]
    pub fn color_formats(&self, name: &str) -> Vec<wgpu::TextureFormat> {
        let Some(spec) = self.spec(name) else {
            return Vec::new();
        };
        let mut colors: Vec<(u32, wgpu::TextureFormat)> = spec
            .attachments
            .iter()
            .filter_map(|a| match a.slot {
                AttachmentSlot::Color(i) => Some((i, self.declared_format(a)?)),
                AttachmentSlot::DepthStencil => None,
            })
            .collect();
        colors.sort_by_key(|(i, _)| *i);
        colors.into_iter().map(|(_, f)| f).collect()
    }

    /// Depth-stencil format of `name`, from its declaration.
    #[must_use]
    pub fn depth_format(&self, name: &str) -> Option<wgpu::TextureFormat> {
        let spec = self.spec(name)?;
        let attachment = spec
            .attachments
            .iter()
            .find(|a| a.slot == AttachmentSlot::DepthStencil)?;
        self.declared_format(attachment)
    }

    fn declared_format(&self, attachment: &AttachmentSpec) -> Option<wgpu::TextureFormat> {
        match &attachment.source {
            AttachmentSource::Owned { format } => Some(*format),
            AttachmentSource::Shared { set, slot } => {
                let source = self.spec(set)?;
                let owner = source.attachments.iter().find(|a| a.slot == *slot)?;
                self.declared_format(owner)
            }
        }
    }

    /// The viewport size of the last successful rebuild.
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderTargetSet> {
        self.sets.iter().flatten()
    }
}
