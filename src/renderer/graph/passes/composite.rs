//! Lighting Composite Pass
//!
//! Combines the diffuse term (blurred or raw, depending on `enableBlur`)
//! with Blinn-Phong specular, ambient and, when `enableTransmittance` is on,
//! light transmitted through thin skin. Thickness is the distance between the
//! shaded point and the first occluder in the shadow map, looked up in the
//! transmittance LUT. Writes the HDR scene target; only skin pixels are
//! shaded, the rest keep the clear colour.

use super::gbuffer::SKIN_STENCIL;
use super::{compiled, release_program};
use crate::errors::Result;
use crate::renderer::backend::{DepthMode, LoadAction, RenderBackend, StencilMode};
use crate::renderer::config::RenderConfig;
use crate::renderer::graph::context::{CompileContext, ExecuteContext, GraphResource};
use crate::renderer::graph::node::{OutputTarget, PassInputs, PassOutput, RenderNode};
use crate::renderer::shader::{FixedFunction, ShaderProgram};
use crate::resources::{QuadVertex, Vertex};

/// Model units are metres; the LUT is parameterized in centimetres.
const THICKNESS_SCALE: f32 = 100.0;
const SHININESS: f32 = 32.0;

pub struct CompositePass {
    program: Option<ShaderProgram>,
    clear_color: wgpu::Color,
}

impl Default for CompositePass {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositePass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: None,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

impl RenderNode for CompositePass {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn output(&self) -> PassOutput {
        PassOutput {
            color: LoadAction::Clear(self.clear_color),
            stencil_reference: SKIN_STENCIL,
            ..PassOutput::load(OutputTarget::Set("scene_hdr"))
        }
    }

    fn inputs(&self, _config: &RenderConfig) -> PassInputs {
        PassInputs::from_slice(&[
            (0, GraphResource::DiffuseLighting),
            (1, GraphResource::GBufferPosition),
            (2, GraphResource::GBufferNormal),
            (3, GraphResource::GBufferAlbedo),
            (4, GraphResource::ShadowDepth),
            (5, GraphResource::SkinTransmittanceLut),
        ])
    }

    fn compile(&mut self, ctx: &mut CompileContext) -> Result<()> {
        let layout = QuadVertex::layout();
        let color_formats = ctx.targets.color_formats("scene_hdr");
        self.program = Some(ctx.shaders.program(
            ctx.backend,
            "composite",
            "quad.vert.wgsl",
            "composite.frag.wgsl",
            &FixedFunction {
                vertex_layout: &layout,
                color_formats: &color_formats,
                depth_stencil_format: ctx.targets.depth_format("scene_hdr"),
                depth: DepthMode::DISABLED,
                stencil: StencilMode::TestEqual,
                cull_back_faces: false,
            },
        )?);
        self.clear_color = ctx.settings.clear_color;
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        release_program(&mut self.program, backend);
    }

    fn draw(&mut self, ctx: &mut ExecuteContext) -> Result<()> {
        let program = compiled(&mut self.program, "composite")?;
        let light = &ctx.scene.light;
        let config = ctx.config;

        program.set_uniform_by_name("light_view_proj", light.view_projection());
        program.set_uniform_by_name("light_pos", light.position());
        program.set_uniform_by_name("light_dir", light.direction());
        program.set_uniform_by_name("light_color", light.color());
        program.set_uniform_by_name("spot_cos_cutoff", light.spot_cos_cutoff());
        program.set_uniform_by_name("light_near", light.near());
        program.set_uniform_by_name("light_far", light.far());
        program.set_uniform_by_name("camera_pos", ctx.scene.camera.position());
        program.set_uniform_by_name("ambient", config.ambient());
        program.set_uniform_by_name("enable_transmittance", config.enable_transmittance());
        program.set_uniform_by_name("shininess", SHININESS);
        program.set_uniform_by_name("transmission_tint", ctx.assets.transmission_tint);
        program.set_uniform_by_name("max_thickness", ctx.assets.max_thickness);
        program.set_uniform_by_name("thickness_scale", THICKNESS_SCALE);

        ctx.assets.screen_quad.draw(ctx.backend, program)
    }
}
