//! Render Graph
//!
//! Provides:
//! - [`RenderTargetSet`] / [`RenderTargets`]: named framebuffers and their
//!   textures, created and rebuilt as a unit
//! - [`GraphResource`]: texture roles passes read from
//! - [`RenderNode`]: the pass trait
//! - [`RenderGraph`]: the linear executor and its [`FrameReport`]
//! - [`passes`]: the built-in skin pipeline

pub mod context;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod node;
pub mod passes;
pub mod targets;

pub use context::{CompileContext, ExecuteContext, FrameAssets, GraphResource};
pub use graph::{BoundInput, FrameReport, PassRecord, RenderGraph};
pub use node::{OutputTarget, PassInputs, PassOutput, RenderNode};
pub use passes::{pipeline_graph, pipeline_targets};
pub use targets::{
    AttachmentSlot, AttachmentSource, AttachmentSpec, RenderTargetSet, RenderTargetSpec,
    RenderTargets, SizeClass,
};
