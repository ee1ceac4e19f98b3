//! Asset loading tests
//!
//! Tests for:
//! - OBJ + MTL loading with texture maps
//! - Missing texture maps and material libraries fall back to defaults
//! - Missing model files
//! - Generated normals, tangents and flipped texture coordinates
//! - Uploading a loaded model through the renderer

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use glam::Vec3;
use sss::assets::ModelAsset;
use sss::errors::SssError;
use sss::renderer::backend::{HeadlessBackend, RenderBackend};
use sss::renderer::{Renderer, RendererSettings};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

/// A unit quad in the XY plane without normals.
const QUAD_OBJ: &str = "\
mtllib skin.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl skin
f 1/1 2/2 3/3 4/4
";

/// Fresh scratch directory per test.
fn scratch_dir(test: &str) -> anyhow::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("sss_{}_{test}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

fn write_png(path: &Path) -> anyhow::Result<()> {
    image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 150, 120, 255])).save(path)?;
    Ok(())
}

// ============================================================================
// OBJ / MTL
// ============================================================================

#[test]
fn loads_quad_with_diffuse_map() -> anyhow::Result<()> {
    let dir = scratch_dir("diffuse_map")?;
    fs::write(dir.join("quad.obj"), QUAD_OBJ)?;
    fs::write(
        dir.join("skin.mtl"),
        "newmtl skin\nKd 0.8 0.6 0.5\nKs 0.2 0.3 0.1\nNs 40\nmap_Kd albedo.png\n",
    )?;
    write_png(&dir.join("albedo.png"))?;

    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;

    assert_eq!(model.name, "quad");
    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.triangle_count(), 2);
    assert_eq!(model.images.len(), 1);
    assert_eq!((model.images[0].width, model.images[0].height), (2, 2));

    let material = model
        .material_of(&model.meshes[0])
        .context("mesh has no material")?;
    assert_eq!(material.name, "skin");
    assert!(vec3_approx(material.diffuse, Vec3::new(0.8, 0.6, 0.5)));
    assert_eq!(material.specular_intensity(), 0.3);
    assert_eq!(material.diffuse_map, Some(0));
    assert!(material.is_opaque());

    Ok(())
}

#[test]
fn missing_texture_map_falls_back() -> anyhow::Result<()> {
    let dir = scratch_dir("missing_map")?;
    fs::write(dir.join("quad.obj"), QUAD_OBJ)?;
    fs::write(
        dir.join("skin.mtl"),
        "newmtl skin\nKd 1 1 1\nmap_Kd nowhere.png\nmap_Ks also_missing.png\n",
    )?;

    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;
    let material = model
        .material_of(&model.meshes[0])
        .context("mesh has no material")?;
    assert_eq!(material.diffuse_map, None);
    assert_eq!(material.specular_map, None);
    assert!(model.images.is_empty());

    Ok(())
}

#[test]
fn shared_map_is_decoded_once() -> anyhow::Result<()> {
    let dir = scratch_dir("shared_map")?;
    let obj = format!("{QUAD_OBJ}o second\nusemtl other\nf 1/1 2/2 3/3\n");
    fs::write(dir.join("quad.obj"), obj)?;
    fs::write(
        dir.join("skin.mtl"),
        "newmtl skin\nmap_Kd albedo.png\n\nnewmtl other\nmap_Kd albedo.png\n",
    )?;
    write_png(&dir.join("albedo.png"))?;

    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;
    assert_eq!(model.meshes.len(), 2);
    assert_eq!(model.images.len(), 1);
    assert!(model.materials.iter().all(|m| m.diffuse_map == Some(0)));

    Ok(())
}

#[test]
fn missing_material_library_uses_default_material() -> anyhow::Result<()> {
    let dir = scratch_dir("missing_mtl")?;
    fs::write(dir.join("quad.obj"), QUAD_OBJ)?;

    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;
    let material = model
        .material_of(&model.meshes[0])
        .context("mesh has no material")?;
    assert_eq!(material.diffuse, Vec3::ONE);
    assert_eq!(material.diffuse_map, None);

    Ok(())
}

#[test]
fn missing_model_is_asset_not_found() -> anyhow::Result<()> {
    let dir = scratch_dir("missing_obj")?;
    let err = ModelAsset::load_obj(dir.join("absent.obj")).unwrap_err();
    assert!(matches!(err, SssError::AssetNotFound(_)));

    Ok(())
}

// ============================================================================
// Vertex Attributes
// ============================================================================

#[test]
fn normals_and_tangents_are_generated() -> anyhow::Result<()> {
    let dir = scratch_dir("generated")?;
    fs::write(dir.join("quad.obj"), QUAD_OBJ)?;

    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;
    for vertex in &model.meshes[0].data.vertices {
        assert!(
            vec3_approx(Vec3::from(vertex.normal), Vec3::Z),
            "normal {:?}",
            vertex.normal
        );
        let tangent = Vec3::from(vertex.tangent);
        assert!((tangent.length() - 1.0).abs() < 1e-4, "tangent {tangent}");
        assert!(tangent.dot(Vec3::Z).abs() < 1e-4);
    }

    Ok(())
}

#[test]
fn texture_v_is_flipped() -> anyhow::Result<()> {
    let dir = scratch_dir("uv_flip")?;
    fs::write(dir.join("quad.obj"), QUAD_OBJ)?;

    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;
    let origin = model.meshes[0]
        .data
        .vertices
        .iter()
        .find(|v| v.position == [0.0, 0.0, 0.0])
        .context("no vertex at the origin")?;
    assert_eq!(origin.uv, [0.0, 1.0]);

    Ok(())
}

// ============================================================================
// Upload
// ============================================================================

#[test]
fn loaded_model_uploads_its_textures() -> anyhow::Result<()> {
    let dir = scratch_dir("upload")?;
    fs::write(dir.join("quad.obj"), QUAD_OBJ)?;
    fs::write(dir.join("skin.mtl"), "newmtl skin\nmap_Kd albedo.png\n")?;
    write_png(&dir.join("albedo.png"))?;
    let model = ModelAsset::load_obj(dir.join("quad.obj"))?;

    let mut renderer = Renderer::new(
        HeadlessBackend::new(320, 240),
        RendererSettings {
            shader_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders"),
            ..Default::default()
        },
    );
    renderer.init(320, 240)?;
    let before = renderer.backend().resource_counts();

    renderer.load_model(&model)?;
    let after = renderer.backend().resource_counts();
    assert_eq!(after.textures, before.textures + 1);
    assert_eq!(after.meshes, before.meshes + 1);

    Ok(())
}
