//! # SSS Engine
//!
//! Real-time screen-space subsurface scattering for skin, built on wgpu.
//!
//! A frame runs a fixed deferred pipeline:
//!
//! ```text
//! shadow → gbuffer → [ssss_blur_h → ssss_blur_v] → composite → final
//! ```
//!
//! - [`renderer`]: backends, shaders, render targets, passes and the
//!   [`Renderer`] state machine
//! - [`scene`]: camera, light and model transform
//! - [`resources`]: vertex formats, meshes and materials
//! - [`assets`]: OBJ models and images
//! - [`skin`]: spectral absorption model and the lookup data derived from it
//! - [`app`]: winit window shell (feature `winit`)

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod skin;
pub mod utils;

#[cfg(feature = "winit")]
pub mod app;

pub use assets::{ColorSpace, ModelAsset};
pub use errors::{Result, SssError};
pub use renderer::backend::{HeadlessBackend, RenderBackend, WgpuBackend, WgpuContext};
pub use renderer::{PipelineState, RenderConfig, Renderer, RendererSettings};
pub use resources::{Material, MeshData};
pub use scene::{Camera, Light, SceneState};

#[cfg(feature = "winit")]
pub use app::{App, AppContext, AppHandler};
