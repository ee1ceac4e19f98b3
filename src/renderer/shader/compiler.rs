//! WGSL compilation, reflection and linking.

use naga::{AddressSpace, Binding, Handle, ImageClass, Module, ScalarKind, Type, TypeInner};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use rustc_hash::FxHashMap;

use super::ShaderStage;
use crate::errors::{Result, SssError};
use crate::renderer::backend::{LINEAR_SAMPLER_BINDING, MAX_TEXTURE_UNITS, SHADOW_SAMPLER_BINDING};
use crate::resources::{VertexLayout, vertex::format_components};

// ─── Reflection Types ─────────────────────────────────────────────────────────

/// One member of a uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// The `var<uniform>` block at group 0, binding 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformBlock {
    pub size: u32,
    pub members: Vec<UniformMember>,
}

/// How a texture unit is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Float,
    Depth,
    Sint,
    Uint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub unit: u32,
    pub name: String,
    pub kind: TextureKind,
}

/// Scalar kind and component count of a stage input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoType {
    pub kind: ScalarKind,
    pub components: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoSlot {
    pub location: u32,
    pub ty: IoType,
}

/// A single compiled stage with its reflected interface.
#[derive(Debug, Clone)]
pub struct ShaderUnit {
    pub label: String,
    pub stage: ShaderStage,
    pub source: String,
    pub entry_point: String,
    pub uniforms: Option<UniformBlock>,
    pub textures: Vec<TextureBinding>,
    pub uses_linear_sampler: bool,
    pub uses_shadow_sampler: bool,
    pub inputs: Vec<IoSlot>,
    pub outputs: Vec<IoSlot>,
}

// ─── Compile ──────────────────────────────────────────────────────────────────

/// Parses, validates and reflects one WGSL stage.
///
/// The source must contain exactly one entry point for `stage`.
pub fn compile(source: &str, stage: ShaderStage, label: &str) -> Result<ShaderUnit> {
    let fail = |diagnostic: String| SssError::ShaderCompile {
        label: label.to_string(),
        stage,
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| fail(e.emit_to_string(source)))?;

    let entries: Vec<_> = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == stage.to_naga())
        .collect();
    let [entry] = entries.as_slice() else {
        return Err(fail(format!(
            "expected exactly one {stage} entry point, found {}",
            entries.len()
        )));
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_io(&module, arg.ty, arg.binding.as_ref(), &mut inputs);
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_io(&module, result.ty, result.binding.as_ref(), &mut outputs);
    }
    inputs.sort_by_key(|s| s.location);
    outputs.sort_by_key(|s| s.location);

    let uniforms = reflect_uniforms(&module).map_err(&fail)?;
    let resources = reflect_resources(&module).map_err(&fail)?;

    log::debug!(
        "Compiled {stage} shader \"{label}\": {} inputs, {} outputs, {} textures",
        inputs.len(),
        outputs.len(),
        resources.textures.len()
    );

    Ok(ShaderUnit {
        label: label.to_string(),
        stage,
        source: source.to_string(),
        entry_point: entry.name.clone(),
        uniforms,
        textures: resources.textures,
        uses_linear_sampler: resources.linear_sampler,
        uses_shadow_sampler: resources.shadow_sampler,
        inputs,
        outputs,
    })
}

fn collect_io(module: &Module, ty: Handle<Type>, binding: Option<&Binding>, out: &mut Vec<IoSlot>) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(IoSlot {
            location: *location,
            ty: io_type(&module.types[ty].inner),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_io(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn io_type(inner: &TypeInner) -> IoType {
    match inner {
        TypeInner::Scalar(scalar) => IoType {
            kind: scalar.kind,
            components: 1,
        },
        TypeInner::Vector { size, scalar } => IoType {
            kind: scalar.kind,
            components: match size {
                naga::VectorSize::Bi => 2,
                naga::VectorSize::Tri => 3,
                naga::VectorSize::Quad => 4,
            },
        },
        _ => IoType {
            kind: ScalarKind::Float,
            components: 0,
        },
    }
}

fn reflect_uniforms(module: &Module) -> std::result::Result<Option<UniformBlock>, String> {
    let mut block = None;

    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        let Some(binding) = &var.binding else {
            return Err(format!("uniform `{name}` has no binding"));
        };
        if (binding.group, binding.binding) != (0, 0) {
            return Err(format!(
                "uniform `{name}` must use @group(0) @binding(0), found @group({}) @binding({})",
                binding.group, binding.binding
            ));
        }
        if block.is_some() {
            return Err("only one uniform block is supported".into());
        }

        let ty = &module.types[var.ty];
        let size = ty.inner.size(module.to_ctx());
        let members = match &ty.inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| UniformMember {
                    name: m.name.clone().unwrap_or_default(),
                    offset: m.offset,
                    size: module.types[m.ty].inner.size(module.to_ctx()),
                })
                .collect(),
            _ => vec![UniformMember {
                name,
                offset: 0,
                size,
            }],
        };
        block = Some(UniformBlock { size, members });
    }

    Ok(block)
}

#[derive(Default)]
struct ReflectedResources {
    textures: Vec<TextureBinding>,
    linear_sampler: bool,
    shadow_sampler: bool,
}

fn reflect_resources(module: &Module) -> std::result::Result<ReflectedResources, String> {
    let mut out = ReflectedResources::default();

    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Handle {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        let Some(binding) = &var.binding else {
            continue;
        };
        if binding.group != 1 {
            return Err(format!("`{name}` must be declared in @group(1)"));
        }

        match &module.types[var.ty].inner {
            TypeInner::Image {
                dim,
                arrayed,
                class,
            } => {
                if *dim != naga::ImageDimension::D2 || *arrayed {
                    return Err(format!("texture `{name}` must be a non-arrayed 2D texture"));
                }
                if binding.binding >= MAX_TEXTURE_UNITS {
                    return Err(format!(
                        "texture `{name}` uses binding {} beyond the {MAX_TEXTURE_UNITS} texture units",
                        binding.binding
                    ));
                }
                let kind = match class {
                    ImageClass::Sampled {
                        kind: ScalarKind::Sint,
                        ..
                    } => TextureKind::Sint,
                    ImageClass::Sampled {
                        kind: ScalarKind::Uint,
                        ..
                    } => TextureKind::Uint,
                    ImageClass::Sampled { .. } => TextureKind::Float,
                    ImageClass::Depth { .. } => TextureKind::Depth,
                    _ => return Err(format!("texture `{name}` has an unsupported image class")),
                };
                out.textures.push(TextureBinding {
                    unit: binding.binding,
                    name,
                    kind,
                });
            }
            TypeInner::Sampler { comparison } => match (binding.binding, comparison) {
                (LINEAR_SAMPLER_BINDING, false) => out.linear_sampler = true,
                (SHADOW_SAMPLER_BINDING, true) => out.shadow_sampler = true,
                (b, _) => {
                    return Err(format!(
                        "sampler `{name}` at binding {b} does not match the shared samplers \
                         (linear at {LINEAR_SAMPLER_BINDING}, comparison at {SHADOW_SAMPLER_BINDING})"
                    ));
                }
            },
            _ => return Err(format!("`{name}` is not a texture or sampler")),
        }
    }

    out.textures.sort_by_key(|t| t.unit);
    Ok(out)
}

// ─── Link ─────────────────────────────────────────────────────────────────────

/// A vertex + fragment pair whose interfaces agree.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub label: String,
    pub vertex: ShaderUnit,
    pub fragment: ShaderUnit,
    /// Size of the merged uniform block; 0 when neither stage declares one.
    pub uniform_size: u32,
    /// Union of both stages' uniform members, ordered by offset.
    pub uniforms: Vec<UniformMember>,
    pub textures: Vec<TextureBinding>,
    pub uses_linear_sampler: bool,
    pub uses_shadow_sampler: bool,
}

/// Links two compiled stages.
pub fn link(vertex: ShaderUnit, fragment: ShaderUnit, label: &str) -> Result<LinkedProgram> {
    let fail = |reason: String| SssError::ShaderLink {
        label: label.to_string(),
        reason,
    };

    if vertex.stage != ShaderStage::Vertex {
        return Err(fail(format!("\"{}\" is not a vertex shader", vertex.label)));
    }
    if fragment.stage != ShaderStage::Fragment {
        return Err(fail(format!("\"{}\" is not a fragment shader", fragment.label)));
    }

    for input in &fragment.inputs {
        let Some(output) = vertex.outputs.iter().find(|o| o.location == input.location) else {
            return Err(fail(format!(
                "fragment input @location({}) is not written by the vertex stage",
                input.location
            )));
        };
        if output.ty != input.ty {
            return Err(fail(format!(
                "@location({}) is {:?}x{} in the vertex stage but {:?}x{} in the fragment stage",
                input.location,
                output.ty.kind,
                output.ty.components,
                input.ty.kind,
                input.ty.components
            )));
        }
    }

    let mut members: FxHashMap<&str, &UniformMember> = FxHashMap::default();
    let mut uniform_size = 0;
    for block in [&vertex.uniforms, &fragment.uniforms].into_iter().flatten() {
        uniform_size = uniform_size.max(block.size);
        for member in &block.members {
            match members.get(member.name.as_str()) {
                Some(existing) if existing.offset != member.offset || existing.size != member.size => {
                    return Err(fail(format!(
                        "uniform `{}` is at offset {} (size {}) in one stage and offset {} (size {}) in the other",
                        member.name, existing.offset, existing.size, member.offset, member.size
                    )));
                }
                Some(_) => {}
                None => {
                    members.insert(&member.name, member);
                }
            }
        }
    }
    let mut uniforms: Vec<UniformMember> = members.into_values().cloned().collect();
    uniforms.sort_by_key(|m| m.offset);

    let mut textures: Vec<TextureBinding> = vertex.textures.clone();
    for binding in &fragment.textures {
        match textures.iter().find(|t| t.unit == binding.unit) {
            Some(existing) if existing.kind != binding.kind => {
                return Err(fail(format!(
                    "texture unit {} is sampled as {:?} and {:?}",
                    binding.unit, existing.kind, binding.kind
                )));
            }
            Some(_) => {}
            None => textures.push(binding.clone()),
        }
    }
    textures.sort_by_key(|t| t.unit);

    Ok(LinkedProgram {
        label: label.to_string(),
        uses_linear_sampler: vertex.uses_linear_sampler || fragment.uses_linear_sampler,
        uses_shadow_sampler: vertex.uses_shadow_sampler || fragment.uses_shadow_sampler,
        vertex,
        fragment,
        uniform_size,
        uniforms,
        textures,
    })
}

impl LinkedProgram {
    /// Checks that every vertex input is fed by the mesh layout.
    pub fn check_vertex_layout(&self, layout: &VertexLayout) -> Result<()> {
        for input in &self.vertex.inputs {
            let Some(attribute) = layout.attribute(input.location) else {
                return Err(SssError::ShaderLink {
                    label: self.label.clone(),
                    reason: format!(
                        "vertex input @location({}) is not provided by the mesh layout",
                        input.location
                    ),
                });
            };
            if format_components(attribute.format) != input.ty.components {
                return Err(SssError::ShaderLink {
                    label: self.label.clone(),
                    reason: format!(
                        "vertex input @location({}) expects {} components, mesh provides {:?}",
                        input.location, input.ty.components, attribute.format
                    ),
                });
            }
        }
        Ok(())
    }

    /// Checks that every fragment output has a color attachment.
    pub fn check_color_targets(&self, color_count: usize) -> Result<()> {
        if let Some(output) = self
            .fragment
            .outputs
            .iter()
            .find(|o| o.location as usize >= color_count)
        {
            return Err(SssError::ShaderLink {
                label: self.label.clone(),
                reason: format!(
                    "fragment output @location({}) has no color attachment ({color_count} available)",
                    output.location
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r"
struct Uniforms {
    mvp: mat4x4<f32>,
    tint: vec3<f32>,
    exposure: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = u.mvp * vec4<f32>(position, 0.0, 1.0);
    out.uv = uv;
    return out;
}
";

    const FS: &str = r"
struct Uniforms {
    mvp: mat4x4<f32>,
    tint: vec3<f32>,
    exposure: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var color_tex: texture_2d<f32>;
@group(1) @binding(16) var linear_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let c = textureSample(color_tex, linear_sampler, uv).rgb * u.tint * u.exposure;
    return vec4<f32>(c, 1.0);
}
";

    #[test]
    fn reflects_uniform_offsets() {
        let unit = compile(VS, ShaderStage::Vertex, "test.vert").unwrap();
        let block = unit.uniforms.unwrap();
        assert_eq!(block.size, 80);
        let tint = block.members.iter().find(|m| m.name == "tint").unwrap();
        assert_eq!((tint.offset, tint.size), (64, 12));
        let exposure = block.members.iter().find(|m| m.name == "exposure").unwrap();
        assert_eq!(exposure.offset, 76);
    }

    #[test]
    fn reflects_textures_and_io() {
        let unit = compile(FS, ShaderStage::Fragment, "test.frag").unwrap();
        assert_eq!(unit.textures.len(), 1);
        assert_eq!(unit.textures[0].kind, TextureKind::Float);
        assert!(unit.uses_linear_sampler);
        assert_eq!(unit.inputs[0].ty.components, 2);
        assert_eq!(unit.outputs[0].location, 0);
    }

    #[test]
    fn missing_entry_point_is_compile_error() {
        let err = compile(VS, ShaderStage::Fragment, "vs-as-fs").unwrap_err();
        assert!(matches!(err, SssError::ShaderCompile { .. }));
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let err = compile("fn broken( {", ShaderStage::Vertex, "broken").unwrap_err();
        let SssError::ShaderCompile { diagnostic, .. } = err else {
            panic!("expected compile error");
        };
        assert!(!diagnostic.is_empty());
    }

    #[test]
    fn links_matching_stages() {
        let vs = compile(VS, ShaderStage::Vertex, "vs").unwrap();
        let fs = compile(FS, ShaderStage::Fragment, "fs").unwrap();
        let program = link(vs, fs, "quad").unwrap();
        assert_eq!(program.uniform_size, 80);
        assert_eq!(program.uniforms.len(), 3);
        assert_eq!(program.uniforms[0].name, "mvp");
    }

    #[test]
    fn mismatched_varying_fails_to_link() {
        let fs_src = FS.replace("@location(0) uv: vec2<f32>", "@location(0) uv: vec3<f32>")
            .replace("linear_sampler, uv)", "linear_sampler, uv.xy)");
        let vs = compile(VS, ShaderStage::Vertex, "vs").unwrap();
        let fs = compile(&fs_src, ShaderStage::Fragment, "fs").unwrap();
        let err = link(vs, fs, "bad").unwrap_err();
        assert!(matches!(err, SssError::ShaderLink { .. }));
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let vs = compile(VS, ShaderStage::Vertex, "vs").unwrap();
        let fs = compile(FS, ShaderStage::Fragment, "fs").unwrap();
        assert!(link(fs, vs, "swapped").is_err());
    }
}
