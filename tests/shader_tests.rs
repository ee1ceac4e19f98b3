//! Shader tests
//!
//! Tests for:
//! - Every shipped WGSL pair compiles and links
//! - Reflected texture units and uniform members the passes rely on
//! - Interface checks against vertex layouts and color targets
//! - Uniform storage through `ShaderProgram`

use std::path::PathBuf;

use glam::{Mat4, Vec3};
use sss::errors::SssError;
use sss::renderer::backend::{DepthMode, HeadlessBackend, RenderBackend, StencilMode};
use sss::renderer::shader::{
    FixedFunction, LinkedProgram, ShaderLibrary, ShaderProgram, TextureKind, UniformLocation,
};
use sss::resources::{MeshVertex, QuadVertex, Vertex};

// ============================================================================
// Helper
// ============================================================================

fn library() -> ShaderLibrary {
    ShaderLibrary::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders"))
}

fn link(vertex: &str, fragment: &str) -> LinkedProgram {
    library()
        .link_files(vertex, fragment, fragment)
        .unwrap_or_else(|e| panic!("{vertex} + {fragment}: {e}"))
}

fn has_uniform(program: &LinkedProgram, name: &str) -> bool {
    program.uniforms.iter().any(|m| m.name == name)
}

fn units(program: &LinkedProgram) -> Vec<u32> {
    program.textures.iter().map(|t| t.unit).collect()
}

// ============================================================================
// Shipped Shaders
// ============================================================================

#[test]
fn shadow_program_links() {
    let program = link("shadow.vert.wgsl", "shadow.frag.wgsl");
    assert!(has_uniform(&program, "light_mvp"));
    assert!(program.textures.is_empty());
    assert!(program.fragment.outputs.is_empty(), "depth only");
    program.check_vertex_layout(&MeshVertex::layout()).unwrap();
    program.check_color_targets(0).unwrap();
}

#[test]
fn gbuffer_program_links() {
    let program = link("gbuffer.vert.wgsl", "gbuffer.frag.wgsl");
    assert_eq!(units(&program), [0, 1, 2, 3]);
    assert_eq!(program.textures[0].kind, TextureKind::Depth);
    assert!(program.uses_shadow_sampler);
    assert!(program.uses_linear_sampler);

    for name in ["model", "view_proj", "normal_matrix", "light_view_proj", "shadow_bias"] {
        assert!(has_uniform(&program, name), "gbuffer should declare `{name}`");
    }
    assert_eq!(program.fragment.outputs.len(), 5);
    program.check_vertex_layout(&MeshVertex::layout()).unwrap();
    program.check_color_targets(5).unwrap();
}

#[test]
fn blur_program_links() {
    let program = link("quad.vert.wgsl", "ssss_blur.frag.wgsl");
    assert_eq!(units(&program), [0, 1, 2]);
    for name in [
        "direction",
        "sss_width",
        "sss_weight",
        "kernel_size",
        "blend_original",
        "projection_scale",
    ] {
        assert!(has_uniform(&program, name), "blur should declare `{name}`");
    }
    program.check_vertex_layout(&QuadVertex::layout()).unwrap();
}

#[test]
fn composite_program_links() {
    let program = link("quad.vert.wgsl", "composite.frag.wgsl");
    assert_eq!(units(&program), [0, 1, 2, 3, 4, 5]);
    assert_eq!(program.textures[4].kind, TextureKind::Depth);
    for name in ["enable_transmittance", "transmission_tint", "max_thickness", "thickness_scale"] {
        assert!(has_uniform(&program, name), "composite should declare `{name}`");
    }
}

#[test]
fn final_program_links() {
    let program = link("quad.vert.wgsl", "final.frag.wgsl");
    assert_eq!(units(&program), [0]);
    assert!(has_uniform(&program, "exposure"));
    assert!(has_uniform(&program, "apply_gamma"));
    program.check_color_targets(1).unwrap();
}

// ============================================================================
// Interface Checks
// ============================================================================

#[test]
fn quad_shader_rejects_mesh_layout_mismatch() {
    let program = link("quad.vert.wgsl", "final.frag.wgsl");
    // Location 0 is a vec2 in the quad shader but a vec3 in MeshVertex.
    let err = program.check_vertex_layout(&MeshVertex::layout()).unwrap_err();
    assert!(matches!(err, SssError::ShaderLink { .. }));
}

#[test]
fn gbuffer_needs_all_color_targets() {
    let program = link("gbuffer.vert.wgsl", "gbuffer.frag.wgsl");
    assert!(program.check_color_targets(4).is_err());
}

#[test]
fn vertex_shader_as_fragment_fails_to_compile() {
    let err = library()
        .link_files("quad.vert.wgsl", "quad.vert.wgsl", "bad")
        .unwrap_err();
    assert!(matches!(err, SssError::ShaderCompile { .. }));
}

// ============================================================================
// ShaderProgram Uniforms
// ============================================================================

fn final_program(backend: &mut HeadlessBackend) -> ShaderProgram {
    let layout = QuadVertex::layout();
    library()
        .program(
            backend,
            "final",
            "quad.vert.wgsl",
            "final.frag.wgsl",
            &FixedFunction {
                vertex_layout: &layout,
                color_formats: &[HeadlessBackend::SURFACE_FORMAT],
                depth_stencil_format: None,
                depth: DepthMode::DISABLED,
                stencil: StencilMode::Disabled,
                cull_back_faces: false,
            },
        )
        .unwrap()
}

#[test]
fn uniform_location_lookup() {
    let mut backend = HeadlessBackend::new(64, 64);
    let program = final_program(&mut backend);

    assert_eq!(program.uniform_location("exposure"), UniformLocation(0));
    assert_eq!(program.uniform_location("apply_gamma"), UniformLocation(4));
    assert_eq!(
        program.uniform_location("no_such_uniform"),
        UniformLocation::NOT_FOUND
    );
}

#[test]
fn set_uniform_writes_block_bytes() {
    let mut backend = HeadlessBackend::new(64, 64);
    let mut program = final_program(&mut backend);

    program.set_uniform_by_name("exposure", 2.5_f32);
    program.set_uniform_by_name("apply_gamma", true);
    // Unknown names are ignored.
    program.set_uniform_by_name("missing", Vec3::ONE);

    let bytes = program.uniform_bytes();
    assert_eq!(&bytes[0..4], &2.5_f32.to_ne_bytes());
    assert_eq!(&bytes[4..8], &1u32.to_ne_bytes());
}

#[test]
fn oversized_value_is_truncated_to_slot() {
    let mut backend = HeadlessBackend::new(64, 64);
    let mut program = final_program(&mut backend);
    let size = program.uniform_bytes().len();

    // A mat4 written into a 4-byte slot must not touch its neighbour.
    program.set_uniform_by_name("exposure", Mat4::from_diagonal(glam::Vec4::splat(3.0)));
    assert_eq!(program.uniform_bytes().len(), size);
    assert_eq!(&program.uniform_bytes()[4..8], &0u32.to_ne_bytes());
}

#[test]
fn program_release_is_idempotent() {
    let mut backend = HeadlessBackend::new(64, 64);
    let mut program = final_program(&mut backend);
    assert_eq!(backend.resource_counts().programs, 1);

    program.release(&mut backend);
    program.release(&mut backend);
    assert!(program.handle().is_none());
    assert_eq!(backend.resource_counts().programs, 0);
}
