//! Final Output Pass
//!
//! Exposure tone maps the HDR scene onto the surface. Gamma is applied in
//! the shader only when the surface format does not encode sRGB itself.

use super::{compiled, release_program};
use crate::errors::Result;
use crate::renderer::backend::{DepthMode, LoadAction, RenderBackend, StencilMode};
use crate::renderer::config::RenderConfig;
use crate::renderer::graph::context::{CompileContext, ExecuteContext, GraphResource};
use crate::renderer::graph::node::{OutputTarget, PassInputs, PassOutput, RenderNode};
use crate::renderer::shader::{FixedFunction, ShaderProgram};
use crate::resources::{QuadVertex, Vertex};

pub struct FinalOutputPass {
    program: Option<ShaderProgram>,
    apply_gamma: bool,
}

impl Default for FinalOutputPass {
    fn default() -> Self {
        Self::new()
    }
}

impl FinalOutputPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: None,
            apply_gamma: true,
        }
    }
}

impl RenderNode for FinalOutputPass {
    fn name(&self) -> &'static str {
        "final"
    }

    fn output(&self) -> PassOutput {
        PassOutput {
            color: LoadAction::Clear(wgpu::Color::BLACK),
            ..PassOutput::load(OutputTarget::Surface)
        }
    }

    fn inputs(&self, _config: &RenderConfig) -> PassInputs {
        PassInputs::from_slice(&[(0, GraphResource::SceneHdr)])
    }

    fn compile(&mut self, ctx: &mut CompileContext) -> Result<()> {
        let layout = QuadVertex::layout();
        let surface_format = ctx.backend.surface_format();
        self.program = Some(ctx.shaders.program(
            ctx.backend,
            "final",
            "quad.vert.wgsl",
            "final.frag.wgsl",
            &FixedFunction {
                vertex_layout: &layout,
                color_formats: &[surface_format],
                depth_stencil_format: None,
                depth: DepthMode::DISABLED,
                stencil: StencilMode::Disabled,
                cull_back_faces: false,
            },
        )?);
        self.apply_gamma = !surface_format.is_srgb();
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        release_program(&mut self.program, backend);
    }

    fn draw(&mut self, ctx: &mut ExecuteContext) -> Result<()> {
        let program = compiled(&mut self.program, "final")?;
        program.set_uniform_by_name("exposure", ctx.config.exposure());
        program.set_uniform_by_name("apply_gamma", self.apply_gamma);
        ctx.assets.screen_quad.draw(ctx.backend, program)
    }
}
