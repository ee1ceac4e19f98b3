//! Rendering System
//!
//! The renderer is organised in layers, leaf first:
//!
//! - [`backend`]: opaque GPU handles behind the [`RenderBackend`] trait
//! - [`shader`]: WGSL compile/link and uniform storage
//! - [`graph`]: render target sets, the pass trait and the graph executor
//! - [`Renderer`]: the pipeline state machine tying them together
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──init──► Ready ──render_frame──► Ready ──teardown──► Torndown
//!        │                 │  ▲                                         ▲
//!        └── init error ───┼──┼─────────────────────────────────────────┘
//!                          └──┘ on_resize (rebuild deferred to next frame)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sss::renderer::{Renderer, RendererSettings, RenderConfig};
//! use sss::renderer::backend::HeadlessBackend;
//! use sss::scene::SceneState;
//!
//! let mut renderer = Renderer::new(HeadlessBackend::new(800, 450), RendererSettings::default());
//! renderer.init(800, 450)?;
//! let report = renderer.render_frame(&SceneState::default(), &RenderConfig::default())?;
//! renderer.teardown();
//! ```

pub mod backend;
pub mod config;
pub mod gpu_assets;
pub mod graph;
pub mod settings;
pub mod shader;

pub use config::{ParamDesc, ParamRange, ParamValue, RenderConfig};
pub use settings::RendererSettings;

use std::fmt;

use glam::Vec3;

use self::backend::{RenderBackend, TextureHandle};
use self::gpu_assets::{DefaultTextures, GpuModel, create_transmittance_lut};
use self::graph::{
    CompileContext, ExecuteContext, FrameAssets, FrameReport, RenderGraph, RenderTargets,
    pipeline_graph, pipeline_targets,
};
use self::shader::ShaderLibrary;
use crate::assets::ModelAsset;
use crate::errors::{Result, SssError};
use crate::resources::{GpuMesh, screen_quad};
use crate::scene::SceneState;
use crate::skin::{SkinParams, transmission_tint};

/// State of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Torndown,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Ready => "Ready",
            Self::Torndown => "Torndown",
        };
        f.write_str(name)
    }
}

/// Renderer-owned GPU assets created at init.
struct PipelineAssets {
    screen_quad: GpuMesh,
    defaults: DefaultTextures,
    transmittance_lut: TextureHandle,
    transmission_tint: Vec3,
    max_thickness: f32,
}

impl PipelineAssets {
    fn create(backend: &mut dyn RenderBackend, skin: &SkinParams) -> Result<Self> {
        let mut screen_quad = GpuMesh::upload(backend, &screen_quad())?;
        let defaults = match DefaultTextures::create(backend) {
            Ok(defaults) => defaults,
            Err(e) => {
                screen_quad.release(backend);
                return Err(e);
            }
        };
        let transmittance_lut = match create_transmittance_lut(backend, skin) {
            Ok(lut) => lut,
            Err(e) => {
                defaults.release(backend);
                screen_quad.release(backend);
                return Err(e);
            }
        };
        Ok(Self {
            screen_quad,
            defaults,
            transmittance_lut,
            transmission_tint: transmission_tint(),
            max_thickness: skin.max_thickness_cm,
        })
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        backend.destroy_texture(self.transmittance_lut);
        self.defaults.release(backend);
        self.screen_quad.release(backend);
    }
}

/// The pipeline orchestrator.
///
/// Owns every render target set, pass program and mesh it creates. Scene
/// state and configuration are borrowed per frame.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    settings: RendererSettings,
    skin: SkinParams,
    shaders: ShaderLibrary,
    targets: RenderTargets,
    graph: RenderGraph,

    state: PipelineState,
    viewport: (u32, u32),
    pending_resize: Option<(u32, u32)>,
    frame_index: u64,

    assets: Option<PipelineAssets>,
    model: Option<GpuModel>,
}

impl<B: RenderBackend> Renderer<B> {
    /// Creates an uninitialized renderer. Nothing is allocated until
    /// [`Renderer::init`].
    pub fn new(backend: B, settings: RendererSettings) -> Self {
        let shaders = ShaderLibrary::new(settings.shader_dir.clone());
        let targets = RenderTargets::new(pipeline_targets(&settings));
        Self {
            backend,
            settings,
            skin: SkinParams::default(),
            shaders,
            targets,
            graph: pipeline_graph(),
            state: PipelineState::Uninitialized,
            viewport: (0, 0),
            pending_resize: None,
            frame_index: 0,
            assets: None,
            model: None,
        }
    }

    /// Skin parameters the transmittance LUT is computed from at init.
    #[must_use]
    pub fn with_skin_params(mut self, skin: SkinParams) -> Self {
        self.skin = skin;
        self
    }

    /// Creates fixed targets, viewport targets and pass programs, in that
    /// order, followed by the built-in assets.
    ///
    /// Any failure tears the pipeline down and returns the first error.
    pub fn init(&mut self, width: u32, height: u32) -> Result<()> {
        if self.state != PipelineState::Uninitialized {
            return Err(self.invalid("init"));
        }

        match self.try_init(width, height) {
            Ok(()) => {
                self.state = PipelineState::Ready;
                log::info!(
                    "Pipeline ready at {width}x{height} ({} passes)",
                    self.graph.node_count()
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Pipeline initialization failed: {e}");
                self.teardown();
                Err(e)
            }
        }
    }

    fn try_init(&mut self, width: u32, height: u32) -> Result<()> {
        self.backend.resize_surface(width, height);
        self.targets.create_fixed(&mut self.backend)?;
        self.targets.rebuild_viewport(&mut self.backend, width, height)?;
        self.viewport = (width, height);

        self.graph.compile(&mut CompileContext {
            backend: &mut self.backend,
            shaders: &self.shaders,
            targets: &self.targets,
            settings: &self.settings,
        })?;

        self.assets = Some(PipelineAssets::create(&mut self.backend, &self.skin)?);
        Ok(())
    }

    /// Uploads a model, replacing the current one.
    pub fn load_model(&mut self, asset: &ModelAsset) -> Result<()> {
        self.require_ready("load_model")?;
        let model = GpuModel::upload(&mut self.backend, asset)?;
        if let Some(mut old) = self.model.replace(model) {
            old.release(&mut self.backend);
        }
        log::info!(
            "Loaded model \"{}\": {} meshes, {} triangles",
            asset.name,
            asset.meshes.len(),
            asset.triangle_count()
        );
        Ok(())
    }

    /// Schedules a viewport rebuild for the start of the next frame.
    ///
    /// Zero-sized viewports (minimized window) are ignored.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.require_ready("on_resize")?;
        if width == 0 || height == 0 {
            log::debug!("Ignoring zero-sized resize {width}x{height}");
            return Ok(());
        }
        self.pending_resize = Some((width, height));
        Ok(())
    }

    /// Renders one frame.
    ///
    /// A pending resize is applied first. If that rebuild fails the frame is
    /// dropped and the error returned; the renderer stays `Ready` and the
    /// rebuild is retried next frame.
    pub fn render_frame(&mut self, scene: &SceneState, config: &RenderConfig) -> Result<FrameReport> {
        self.require_ready("render_frame")?;

        if let Some((width, height)) = self.pending_resize {
            self.backend.resize_surface(width, height);
            self.targets.rebuild_viewport(&mut self.backend, width, height)?;
            self.pending_resize = None;
            self.viewport = (width, height);
        }

        let Some(assets) = &self.assets else {
            return Err(self.invalid("render_frame"));
        };

        self.backend.begin_frame()?;
        let mut ctx = ExecuteContext {
            backend: &mut self.backend,
            scene,
            config,
            targets: &self.targets,
            assets: FrameAssets {
                screen_quad: &assets.screen_quad,
                defaults: &assets.defaults,
                transmittance_lut: assets.transmittance_lut,
                transmission_tint: assets.transmission_tint,
                max_thickness: assets.max_thickness,
                model: self.model.as_ref(),
            },
        };
        let result = self.graph.execute(&mut ctx, self.frame_index);
        let ended = self.backend.end_frame();
        self.frame_index += 1;

        let report = result?;
        ended?;
        Ok(report)
    }

    /// Releases every target, program, mesh and texture the renderer owns.
    /// Valid in any state; later calls do nothing.
    pub fn teardown(&mut self) {
        if self.state == PipelineState::Torndown {
            return;
        }

        if let Some(mut model) = self.model.take() {
            model.release(&mut self.backend);
        }
        if let Some(mut assets) = self.assets.take() {
            assets.release(&mut self.backend);
        }
        self.graph.release(&mut self.backend);
        self.targets.release_all(&mut self.backend);
        self.pending_resize = None;

        if self.state == PipelineState::Ready {
            log::info!("Pipeline torn down after {} frames", self.frame_index);
        }
        self.state = PipelineState::Torndown;
    }

    fn require_ready(&self, operation: &'static str) -> Result<()> {
        if self.state == PipelineState::Ready {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> SssError {
        SssError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    #[must_use]
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Size the viewport targets were last built at.
    #[inline]
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    #[inline]
    #[must_use]
    pub fn has_pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

impl<B: RenderBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
