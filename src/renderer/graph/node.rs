//! Render Node Trait
//!
//! Every pass of the pipeline implements [`RenderNode`]. The graph owns the
//! pass protocol (begin pass, bind inputs, draw, unbind, end pass); a node
//! only describes its output and inputs and issues its draw calls.

use smallvec::SmallVec;

use super::context::{CompileContext, ExecuteContext, GraphResource};
use crate::errors::Result;
use crate::renderer::backend::{LoadAction, RenderBackend};
use crate::renderer::config::RenderConfig;

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// A render target set by name.
    Set(&'static str),
    /// The swap-chain image.
    Surface,
}

/// Output target of a pass with its load operations.
///
/// The viewport always covers the whole target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassOutput {
    pub target: OutputTarget,
    pub color: LoadAction<wgpu::Color>,
    pub depth: LoadAction<f32>,
    pub stencil: LoadAction<u32>,
    pub stencil_reference: u32,
}

impl PassOutput {
    /// Loads everything, no stencil reference.
    #[must_use]
    pub fn load(target: OutputTarget) -> Self {
        Self {
            target,
            color: LoadAction::Load,
            depth: LoadAction::Load,
            stencil: LoadAction::Load,
            stencil_reference: 0,
        }
    }
}

/// Texture units a pass samples, with the role bound at each.
pub type PassInputs = SmallVec<[(u32, GraphResource); 8]>;

pub trait RenderNode {
    /// Name used for pass labels and frame reports.
    fn name(&self) -> &'static str;

    /// Evaluated fresh every frame.
    fn enabled(&self, _config: &RenderConfig) -> bool {
        true
    }

    fn output(&self) -> PassOutput;

    /// Texture units bound by the graph around [`RenderNode::draw`].
    fn inputs(&self, config: &RenderConfig) -> PassInputs;

    /// Creates the node's programs.
    fn compile(&mut self, ctx: &mut CompileContext) -> Result<()>;

    /// Destroys the node's programs. Safe to call more than once.
    fn release(&mut self, backend: &mut dyn RenderBackend);

    /// Issues draw calls. The output target is active and inputs are bound.
    fn draw(&mut self, ctx: &mut ExecuteContext) -> Result<()>;
}
