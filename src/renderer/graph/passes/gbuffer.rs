//! G-Buffer Pass
//!
//! Rasterizes the opaque meshes into five colour attachments and marks every
//! covered pixel with stencil 1:
//!
//! | Slot | Contents                                       |
//! |------|------------------------------------------------|
//! | 0    | world position, view-space depth in `w`        |
//! | 1    | shading normal, specular intensity in `w`      |
//! | 2    | albedo                                         |
//! | 3    | texture coordinates                            |
//! | 4    | shadowed direct irradiance (input of the blur) |
//!
//! The shadow map is bound by the graph at unit 0; material maps occupy
//! units 1..=3 and are rebound per mesh.

use glam::{Mat3, Vec3};

use super::{compiled, release_program};
use crate::errors::Result;
use crate::renderer::backend::{DepthMode, LoadAction, RenderBackend, StencilMode, TextureHandle};
use crate::renderer::config::RenderConfig;
use crate::renderer::graph::context::{CompileContext, ExecuteContext, GraphResource};
use crate::renderer::graph::node::{OutputTarget, PassInputs, PassOutput, RenderNode};
use crate::renderer::gpu_assets::{DefaultTextures, GpuMaterial, GpuModel};
use crate::renderer::shader::{FixedFunction, ShaderProgram, UniformLocation};
use crate::resources::{MeshVertex, Vertex};

const ALBEDO_UNIT: u32 = 1;
const SPECULAR_UNIT: u32 = 2;
const NORMAL_UNIT: u32 = 3;

/// Depth bias applied before the shadow comparison.
const SHADOW_BIAS: f32 = 0.0015;

/// Stencil value written under skin pixels.
pub(crate) const SKIN_STENCIL: u32 = 1;

#[derive(Clone, Copy)]
struct Locations {
    model: UniformLocation,
    view_proj: UniformLocation,
    view: UniformLocation,
    light_view_proj: UniformLocation,
    normal_matrix: UniformLocation,
    light_pos: UniformLocation,
    light_color: UniformLocation,
    light_dir: UniformLocation,
    shadow_bias: UniformLocation,
    spot_cos_cutoff: UniformLocation,
    has_albedo_tex: UniformLocation,
    has_specular_tex: UniformLocation,
    has_normal_map: UniformLocation,
    fallback_albedo: UniformLocation,
    fallback_specular: UniformLocation,
}

impl Locations {
    fn lookup(program: &ShaderProgram) -> Self {
        let at = |name| program.uniform_location(name);
        Self {
            model: at("model"),
            view_proj: at("view_proj"),
            view: at("view"),
            light_view_proj: at("light_view_proj"),
            normal_matrix: at("normal_matrix"),
            light_pos: at("light_pos"),
            light_color: at("light_color"),
            light_dir: at("light_dir"),
            shadow_bias: at("shadow_bias"),
            spot_cos_cutoff: at("spot_cos_cutoff"),
            has_albedo_tex: at("has_albedo_tex"),
            has_specular_tex: at("has_specular_tex"),
            has_normal_map: at("has_normal_map"),
            fallback_albedo: at("fallback_albedo"),
            fallback_specular: at("fallback_specular"),
        }
    }
}

pub struct GBufferPass {
    program: Option<ShaderProgram>,
    locations: Option<Locations>,
}

impl Default for GBufferPass {
    fn default() -> Self {
        Self::new()
    }
}

impl GBufferPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: None,
            locations: None,
        }
    }

    fn draw_meshes(
        program: &mut ShaderProgram,
        loc: Locations,
        backend: &mut dyn RenderBackend,
        model: &GpuModel,
        defaults: &DefaultTextures,
    ) -> Result<()> {
        for mesh in model.opaque_meshes() {
            let material = model.material(mesh.material);
            bind_material(program, loc, backend, material, defaults)?;
            mesh.mesh.draw(backend, program)?;
        }
        Ok(())
    }
}

/// Binds a material's maps, or the neutral defaults, and sets the matching
/// flags and fallback constants.
fn bind_material(
    program: &mut ShaderProgram,
    loc: Locations,
    backend: &mut dyn RenderBackend,
    material: Option<&GpuMaterial>,
    defaults: &DefaultTextures,
) -> Result<()> {
    let map = |f: fn(&GpuMaterial) -> Option<TextureHandle>| material.and_then(f);
    let albedo = map(|m| m.diffuse_map);
    let specular = map(|m| m.specular_map);
    let normal = map(|m| m.normal_map);

    backend.bind_texture(ALBEDO_UNIT, albedo.unwrap_or(defaults.white))?;
    backend.bind_texture(SPECULAR_UNIT, specular.unwrap_or(defaults.specular))?;
    backend.bind_texture(NORMAL_UNIT, normal.unwrap_or(defaults.flat_normal))?;

    program.set_uniform(loc.has_albedo_tex, albedo.is_some());
    program.set_uniform(loc.has_specular_tex, specular.is_some());
    program.set_uniform(loc.has_normal_map, normal.is_some());
    program.set_uniform(loc.fallback_albedo, material.map_or(Vec3::ONE, |m| m.diffuse));
    program.set_uniform(loc.fallback_specular, material.map_or(0.0, |m| m.specular));
    Ok(())
}

impl RenderNode for GBufferPass {
    fn name(&self) -> &'static str {
        "gbuffer"
    }

    fn output(&self) -> PassOutput {
        PassOutput {
            target: OutputTarget::Set("gbuffer"),
            color: LoadAction::Clear(wgpu::Color::TRANSPARENT),
            depth: LoadAction::Clear(1.0),
            stencil: LoadAction::Clear(0),
            stencil_reference: SKIN_STENCIL,
        }
    }

    fn inputs(&self, _config: &RenderConfig) -> PassInputs {
        PassInputs::from_slice(&[(0, GraphResource::ShadowDepth)])
    }

    fn compile(&mut self, ctx: &mut CompileContext) -> Result<()> {
        let layout = MeshVertex::layout();
        let color_formats = ctx.targets.color_formats("gbuffer");
        let program = ctx.shaders.program(
            ctx.backend,
            "gbuffer",
            "gbuffer.vert.wgsl",
            "gbuffer.frag.wgsl",
            &FixedFunction {
                vertex_layout: &layout,
                color_formats: &color_formats,
                depth_stencil_format: ctx.targets.depth_format("gbuffer"),
                depth: DepthMode::READ_WRITE,
                stencil: StencilMode::Write,
                cull_back_faces: true,
            },
        )?;
        self.locations = Some(Locations::lookup(&program));
        self.program = Some(program);
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        release_program(&mut self.program, backend);
        self.locations = None;
    }

    fn draw(&mut self, ctx: &mut ExecuteContext) -> Result<()> {
        let program = compiled(&mut self.program, "gbuffer")?;
        let (Some(loc), Some(model)) = (self.locations, ctx.assets.model) else {
            return Ok(());
        };

        let scene = ctx.scene;
        let camera = &scene.camera;
        let light = &scene.light;
        let model_matrix = scene.model_transform;

        program.set_uniform(loc.model, model_matrix);
        program.set_uniform(loc.view_proj, camera.projection_matrix() * camera.view_matrix());
        program.set_uniform(loc.view, camera.view_matrix());
        program.set_uniform(loc.light_view_proj, light.view_projection());
        program.set_uniform(
            loc.normal_matrix,
            Mat3::from_mat4(model_matrix).inverse().transpose(),
        );
        program.set_uniform(loc.light_pos, light.position());
        program.set_uniform(loc.light_color, light.color());
        program.set_uniform(loc.light_dir, light.direction());
        program.set_uniform(loc.shadow_bias, SHADOW_BIAS);
        program.set_uniform(loc.spot_cos_cutoff, light.spot_cos_cutoff());

        let result = Self::draw_meshes(program, loc, ctx.backend, model, ctx.assets.defaults);
        for unit in [ALBEDO_UNIT, SPECULAR_UNIT, NORMAL_UNIT] {
            ctx.backend.unbind_texture(unit);
        }
        result
    }
}
