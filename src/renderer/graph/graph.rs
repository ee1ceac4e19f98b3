//! Render Graph Executor
//!
//! `RenderGraph` runs its nodes linearly in declaration order. Within a
//! frame the declared order is the only synchronization between passes: a
//! pass only ever samples targets written by earlier passes.

use smallvec::SmallVec;

use super::context::{CompileContext, ExecuteContext, GraphResource};
use super::node::{OutputTarget, RenderNode};
use crate::errors::{Result, SssError};
use crate::renderer::backend::{PassDesc, PassTarget, RenderBackend, TextureHandle, Viewport};

/// One texture unit bound for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundInput {
    pub unit: u32,
    /// The role as declared by the pass.
    pub declared: GraphResource,
    /// The concrete role it resolved to this frame.
    pub resolved: GraphResource,
    pub texture: TextureHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    pub name: &'static str,
    pub inputs: SmallVec<[BoundInput; 8]>,
}

/// What a frame executed, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub passes: Vec<PassRecord>,
}

impl FrameReport {
    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|p| p.name)
    }

    #[must_use]
    pub fn pass(&self, name: &str) -> Option<&PassRecord> {
        self.passes.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn input(&self, pass: &str, unit: u32) -> Option<&BoundInput> {
        self.pass(pass)?.inputs.iter().find(|i| i.unit == unit)
    }
}

/// Ordered list of render nodes.
#[derive(Default)]
pub struct RenderGraph {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes run in the order they are added.
    #[inline]
    pub fn add_node(&mut self, node: Box<dyn RenderNode>) {
        self.nodes.push(node);
    }

    #[inline]
    #[must_use]
    pub fn with_node(mut self, node: Box<dyn RenderNode>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn compile(&mut self, ctx: &mut CompileContext) -> Result<()> {
        for node in &mut self.nodes {
            node.compile(ctx)?;
        }
        Ok(())
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        for node in self.nodes.iter_mut().rev() {
            node.release(backend);
        }
    }

    /// Runs every enabled node. Must be called between `begin_frame` and
    /// `end_frame`.
    ///
    /// A failing node still gets its pass closed before the error is
    /// returned.
    pub fn execute(&mut self, ctx: &mut ExecuteContext, frame_index: u64) -> Result<FrameReport> {
        let mut report = FrameReport {
            frame_index,
            passes: Vec::with_capacity(self.nodes.len()),
        };

        for node in &mut self.nodes {
            if !node.enabled(ctx.config) {
                continue;
            }
            let name = node.name();
            let output = node.output();

            let (target, (width, height)) = match output.target {
                OutputTarget::Set(set) => {
                    let framebuffer = ctx.targets.framebuffer(set).ok_or_else(|| {
                        SssError::ResourceNotFound(format!("render target \"{set}\" for pass {name}"))
                    })?;
                    (PassTarget::Framebuffer(framebuffer), ctx.target_size(set))
                }
                OutputTarget::Surface => (PassTarget::Surface, ctx.backend.surface_size()),
            };

            let mut inputs: SmallVec<[BoundInput; 8]> = SmallVec::new();
            for (unit, declared) in node.inputs(ctx.config) {
                let resolved = declared.resolve_role(ctx.config);
                let texture = ctx.resource(resolved).ok_or_else(|| {
                    SssError::ResourceNotFound(format!("{resolved:?} for pass {name}"))
                })?;
                inputs.push(BoundInput {
                    unit,
                    declared,
                    resolved,
                    texture,
                });
            }

            ctx.backend.begin_pass(&PassDesc {
                label: name,
                target,
                color: output.color,
                depth: output.depth,
                stencil: output.stencil,
                stencil_reference: output.stencil_reference,
                viewport: Viewport::full(width, height),
            })?;

            let result = Self::run_node(node.as_mut(), ctx, &inputs);

            for input in &inputs {
                ctx.backend.unbind_texture(input.unit);
            }
            let ended = ctx.backend.end_pass();
            result?;
            ended?;

            report.passes.push(PassRecord { name, inputs });
        }

        Ok(report)
    }

    fn run_node(node: &mut dyn RenderNode, ctx: &mut ExecuteContext, inputs: &[BoundInput]) -> Result<()> {
        for input in inputs {
            ctx.backend.bind_texture(input.unit, input.texture)?;
        }
        node.draw(ctx)
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.nodes.iter().map(|n| n.name())
    }
}
