//! Screen-Space Subsurface Scattering
//!
//! A separable blur of the G-buffer irradiance, run as two passes. The
//! horizontal pass writes `ssss_ping`; the vertical pass reads it back,
//! blends with the unblurred irradiance by `sssWeight` and writes
//! `ssss_blur`. Both passes share the G-buffer depth-stencil and only touch
//! pixels marked as skin.
//!
//! Both passes are skipped while `enableBlur` is off; the composite then
//! reads the raw irradiance instead.

use glam::Vec2;

use super::gbuffer::SKIN_STENCIL;
use super::{compiled, release_program};
use crate::errors::Result;
use crate::renderer::backend::{DepthMode, LoadAction, RenderBackend, StencilMode};
use crate::renderer::config::RenderConfig;
use crate::renderer::graph::context::{CompileContext, ExecuteContext, GraphResource};
use crate::renderer::graph::node::{OutputTarget, PassInputs, PassOutput, RenderNode};
use crate::renderer::shader::{FixedFunction, ShaderProgram};
use crate::resources::{QuadVertex, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    fn pass_name(self) -> &'static str {
        match self {
            Self::Horizontal => "ssss_blur_h",
            Self::Vertical => "ssss_blur_v",
        }
    }

    fn target(self) -> &'static str {
        match self {
            Self::Horizontal => "ssss_ping",
            Self::Vertical => "ssss_blur",
        }
    }

    /// Texture the pass blurs.
    fn source(self) -> GraphResource {
        match self {
            Self::Horizontal => GraphResource::GBufferIrradiance,
            Self::Vertical => GraphResource::SsssPing,
        }
    }

    /// Step direction in uv units, corrected so one step covers the same
    /// distance on screen along either axis.
    fn step(self, aspect: f32) -> Vec2 {
        match self {
            Self::Horizontal => Vec2::new(1.0 / aspect, 0.0),
            Self::Vertical => Vec2::new(0.0, 1.0),
        }
    }
}

pub struct SsssBlurPass {
    direction: BlurDirection,
    program: Option<ShaderProgram>,
}

impl SsssBlurPass {
    #[must_use]
    pub fn new(direction: BlurDirection) -> Self {
        Self {
            direction,
            program: None,
        }
    }

    #[must_use]
    pub fn direction(&self) -> BlurDirection {
        self.direction
    }
}

impl RenderNode for SsssBlurPass {
    fn name(&self) -> &'static str {
        self.direction.pass_name()
    }

    fn enabled(&self, config: &RenderConfig) -> bool {
        config.enable_blur()
    }

    fn output(&self) -> PassOutput {
        PassOutput {
            color: LoadAction::Clear(wgpu::Color::TRANSPARENT),
            stencil_reference: SKIN_STENCIL,
            ..PassOutput::load(OutputTarget::Set(self.direction.target()))
        }
    }

    fn inputs(&self, _config: &RenderConfig) -> PassInputs {
        PassInputs::from_slice(&[
            (0, self.direction.source()),
            (1, GraphResource::GBufferPosition),
            (2, GraphResource::GBufferIrradiance),
        ])
    }

    fn compile(&mut self, ctx: &mut CompileContext) -> Result<()> {
        let target = self.direction.target();
        let layout = QuadVertex::layout();
        let color_formats = ctx.targets.color_formats(target);
        self.program = Some(ctx.shaders.program(
            ctx.backend,
            self.direction.pass_name(),
            "quad.vert.wgsl",
            "ssss_blur.frag.wgsl",
            &FixedFunction {
                vertex_layout: &layout,
                color_formats: &color_formats,
                depth_stencil_format: ctx.targets.depth_format(target),
                depth: DepthMode::DISABLED,
                stencil: StencilMode::TestEqual,
                cull_back_faces: false,
            },
        )?);
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        release_program(&mut self.program, backend);
    }

    fn draw(&mut self, ctx: &mut ExecuteContext) -> Result<()> {
        let program = compiled(&mut self.program, self.direction.pass_name())?;

        let (width, height) = ctx.target_size(self.direction.target());
        let aspect = width as f32 / height.max(1) as f32;
        let projection_scale = 1.0 / (ctx.scene.camera.fovy().to_radians() * 0.5).tan();

        program.set_uniform_by_name("direction", self.direction.step(aspect));
        program.set_uniform_by_name("sss_width", ctx.config.sss_width());
        program.set_uniform_by_name("sss_weight", ctx.config.sss_weight());
        program.set_uniform_by_name("kernel_size", ctx.config.kernel_size());
        program.set_uniform_by_name(
            "blend_original",
            self.direction == BlurDirection::Vertical,
        );
        program.set_uniform_by_name("projection_scale", projection_scale);

        ctx.assets.screen_quad.draw(ctx.backend, program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_pass_reads_the_horizontal_result() {
        let v = SsssBlurPass::new(BlurDirection::Vertical);
        let inputs = v.inputs(&RenderConfig::default());
        assert_eq!(inputs[0], (0, GraphResource::SsssPing));
        assert_eq!(v.output().target, OutputTarget::Set("ssss_blur"));
    }

    #[test]
    fn horizontal_step_is_aspect_corrected() {
        let step = BlurDirection::Horizontal.step(16.0 / 9.0);
        assert!((step.x - 9.0 / 16.0).abs() < 1e-6);
        assert_eq!(step.y, 0.0);
    }
}
