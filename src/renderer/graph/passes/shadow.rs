//! Shadow Map Pass
//!
//! Renders the model's depth from the light into the fixed-size `shadow`
//! target. Depth is cleared to 1 every frame.

use super::{compiled, release_program};
use crate::errors::Result;
use crate::renderer::backend::{DepthMode, LoadAction, RenderBackend, StencilMode};
use crate::renderer::config::RenderConfig;
use crate::renderer::graph::context::{CompileContext, ExecuteContext};
use crate::renderer::graph::node::{OutputTarget, PassInputs, PassOutput, RenderNode};
use crate::renderer::shader::{FixedFunction, ShaderProgram, UniformLocation};
use crate::resources::{MeshVertex, Vertex};

pub struct ShadowPass {
    program: Option<ShaderProgram>,
    light_mvp: UniformLocation,
}

impl Default for ShadowPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: None,
            light_mvp: UniformLocation::NOT_FOUND,
        }
    }
}

impl RenderNode for ShadowPass {
    fn name(&self) -> &'static str {
        "shadow"
    }

    fn output(&self) -> PassOutput {
        PassOutput {
            depth: LoadAction::Clear(1.0),
            ..PassOutput::load(OutputTarget::Set("shadow"))
        }
    }

    fn inputs(&self, _config: &RenderConfig) -> PassInputs {
        PassInputs::new()
    }

    fn compile(&mut self, ctx: &mut CompileContext) -> Result<()> {
        let layout = MeshVertex::layout();
        let program = ctx.shaders.program(
            ctx.backend,
            "shadow",
            "shadow.vert.wgsl",
            "shadow.frag.wgsl",
            &FixedFunction {
                vertex_layout: &layout,
                color_formats: &[],
                depth_stencil_format: ctx.targets.depth_format("shadow"),
                depth: DepthMode::READ_WRITE,
                stencil: StencilMode::Disabled,
                cull_back_faces: false,
            },
        )?;
        self.light_mvp = program.uniform_location("light_mvp");
        self.program = Some(program);
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        release_program(&mut self.program, backend);
    }

    fn draw(&mut self, ctx: &mut ExecuteContext) -> Result<()> {
        let program = compiled(&mut self.program, "shadow")?;
        let Some(model) = ctx.assets.model else {
            return Ok(());
        };

        let light_mvp = ctx.scene.light.view_projection() * ctx.scene.model_transform;
        program.set_uniform(self.light_mvp, light_mvp);
        for mesh in model.opaque_meshes() {
            mesh.mesh.draw(ctx.backend, program)?;
        }
        Ok(())
    }
}
