//! Pipeline tests (headless backend)
//!
//! Tests for:
//! - Renderer state machine (Uninitialized → Ready → Torndown)
//! - Pass order and blur toggling
//! - Per-frame resolution of the diffuse lighting input
//! - Deferred viewport rebuilds, including failed ones
//! - Init failure cleanup and idempotent teardown
//! - Model upload and draw routing
//! - Transmittance lookup texture

use std::path::PathBuf;

use sss::assets::ModelAsset;
use sss::errors::SssError;
use sss::renderer::backend::{
    BackendEvent, BackendLimits, HeadlessBackend, PassTarget, RenderBackend,
};
use sss::renderer::graph::{AttachmentSlot, GraphResource};
use sss::renderer::{PipelineState, RenderConfig, Renderer, RendererSettings};
use sss::scene::SceneState;
use sss::skin::{SkinParams, TRANSMITTANCE_LUT_WIDTH};

// ============================================================================
// Helper
// ============================================================================

const FULL_ORDER: [&str; 6] = [
    "shadow",
    "gbuffer",
    "ssss_blur_h",
    "ssss_blur_v",
    "composite",
    "final",
];

fn settings() -> RendererSettings {
    RendererSettings {
        shader_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders"),
        ..Default::default()
    }
}

fn ready_renderer() -> Renderer<HeadlessBackend> {
    let mut renderer = Renderer::new(HeadlessBackend::new(800, 450), settings());
    renderer.init(800, 450).unwrap();
    renderer
}

/// Number of draws recorded inside each pass, in pass order.
fn draws_per_pass(events: &[BackendEvent]) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = Vec::new();
    for event in events {
        match event {
            BackendEvent::BeginPass { label, .. } => out.push((label.clone(), 0)),
            BackendEvent::Draw { .. } => {
                if let Some(last) = out.last_mut() {
                    last.1 += 1;
                }
            }
            _ => {}
        }
    }
    out
}

// ============================================================================
// State Machine
// ============================================================================

#[test]
fn init_moves_to_ready() {
    let renderer = ready_renderer();
    assert_eq!(renderer.state(), PipelineState::Ready);
    assert_eq!(renderer.viewport(), (800, 450));

    let counts = renderer.backend().resource_counts();
    assert_eq!(counts.programs, 6, "one program per pass");
    assert_eq!(counts.framebuffers, 5);
    assert_eq!(counts.meshes, 1, "screen quad");
}

#[test]
fn operations_before_init_are_invalid() {
    let mut renderer = Renderer::new(HeadlessBackend::new(800, 450), settings());
    let scene = SceneState::default();
    let config = RenderConfig::default();

    let err = renderer.render_frame(&scene, &config).unwrap_err();
    assert!(matches!(
        err,
        SssError::InvalidState {
            operation: "render_frame",
            ..
        }
    ));
    assert!(renderer.on_resize(1024, 576).is_err());
    assert!(renderer.load_model(&ModelAsset::unit_cube()).is_err());
    assert_eq!(renderer.state(), PipelineState::Uninitialized);
}

#[test]
fn init_twice_is_invalid() {
    let mut renderer = ready_renderer();
    let err = renderer.init(800, 450).unwrap_err();
    assert!(matches!(err, SssError::InvalidState { operation: "init", .. }));
    assert_eq!(renderer.state(), PipelineState::Ready);
}

#[test]
fn missing_shaders_fail_init_and_leak_nothing() {
    let mut renderer = Renderer::new(
        HeadlessBackend::new(800, 450),
        RendererSettings {
            shader_dir: PathBuf::from("/nonexistent/shader/dir"),
            ..Default::default()
        },
    );

    let err = renderer.init(800, 450).unwrap_err();
    assert!(matches!(err, SssError::AssetNotFound(_)));
    assert_eq!(renderer.state(), PipelineState::Torndown);
    assert_eq!(renderer.backend().resource_counts().total(), 0);
}

#[test]
fn oversized_init_fails_cleanly() {
    let mut renderer = Renderer::new(
        HeadlessBackend::with_limits(
            800,
            450,
            BackendLimits {
                max_texture_dimension: 1024,
            },
        ),
        settings(),
    );

    // The 2048² shadow map alone exceeds the limit.
    let err = renderer.init(800, 450).unwrap_err();
    assert!(matches!(err, SssError::TextureTooLarge { .. }));
    assert_eq!(renderer.state(), PipelineState::Torndown);
    assert_eq!(renderer.backend().resource_counts().total(), 0);
}

#[test]
fn teardown_is_idempotent() {
    let mut renderer = ready_renderer();
    renderer.load_model(&ModelAsset::unit_cube()).unwrap();

    renderer.teardown();
    assert_eq!(renderer.state(), PipelineState::Torndown);
    assert_eq!(renderer.backend().resource_counts().total(), 0);
    assert!(!renderer.has_model());

    renderer.teardown();
    assert_eq!(renderer.backend().resource_counts().total(), 0);

    let err = renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap_err();
    assert!(matches!(err, SssError::InvalidState { .. }));
}

// ============================================================================
// Pass Order
// ============================================================================

#[test]
fn frame_runs_passes_in_order() {
    let mut renderer = ready_renderer();
    let report = renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap();

    let names: Vec<_> = report.pass_names().collect();
    assert_eq!(names, FULL_ORDER);
    assert_eq!(report.frame_index, 0);
    assert_eq!(renderer.frame_index(), 1);
}

#[test]
fn blur_disabled_skips_blur_passes() {
    let mut renderer = ready_renderer();
    let mut config = RenderConfig::default();
    config.set("enableBlur", false).unwrap();

    let report = renderer.render_frame(&SceneState::default(), &config).unwrap();
    let names: Vec<_> = report.pass_names().collect();
    assert_eq!(names, ["shadow", "gbuffer", "composite", "final"]);
}

#[test]
fn screen_passes_draw_one_quad() {
    let mut renderer = ready_renderer();
    renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap();

    let draws = draws_per_pass(renderer.backend().events());
    for (pass, count) in &draws {
        let expected = match pass.as_str() {
            // No model loaded.
            "shadow" | "gbuffer" => 0,
            _ => 1,
        };
        assert_eq!(*count, expected, "draws in {pass}");
    }
    assert!(matches!(
        renderer.backend().events().last(),
        Some(BackendEvent::Present)
    ));
}

// ============================================================================
// Diffuse Lighting Resolution
// ============================================================================

#[test]
fn composite_reads_blurred_or_raw_lighting_per_frame() {
    let mut renderer = ready_renderer();
    let scene = SceneState::default();
    let mut config = RenderConfig::default();

    for frame in 0..4 {
        let blur = frame % 2 == 0;
        config.set("enableBlur", blur).unwrap();
        let report = renderer.render_frame(&scene, &config).unwrap();

        let input = report.input("composite", 0).unwrap();
        assert_eq!(input.declared, GraphResource::DiffuseLighting);

        let targets = renderer.targets();
        if blur {
            assert_eq!(input.resolved, GraphResource::SsssBlurred);
            assert_eq!(
                Some(input.texture),
                targets.texture("ssss_blur", AttachmentSlot::Color(0)),
                "frame {frame}"
            );
        } else {
            assert_eq!(input.resolved, GraphResource::GBufferIrradiance);
            assert_eq!(
                Some(input.texture),
                targets.texture("gbuffer", AttachmentSlot::Color(4)),
                "frame {frame}"
            );
        }
    }
}

#[test]
fn vertical_blur_reads_horizontal_output() {
    let mut renderer = ready_renderer();
    let report = renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap();

    let ping = renderer.targets().texture("ssss_ping", AttachmentSlot::Color(0));
    assert_eq!(Some(report.input("ssss_blur_v", 0).unwrap().texture), ping);

    let irradiance = renderer.targets().texture("gbuffer", AttachmentSlot::Color(4));
    assert_eq!(Some(report.input("ssss_blur_h", 0).unwrap().texture), irradiance);
    assert_eq!(Some(report.input("ssss_blur_h", 2).unwrap().texture), irradiance);
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_is_deferred_to_next_frame() {
    let mut renderer = ready_renderer();
    let baseline = renderer.backend().resource_counts();

    renderer.on_resize(1600, 900).unwrap();
    assert!(renderer.has_pending_resize());
    assert_eq!(renderer.viewport(), (800, 450), "no rebuild before the frame");

    renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap();

    assert!(!renderer.has_pending_resize());
    assert_eq!(renderer.viewport(), (1600, 900));
    assert_eq!(renderer.backend().surface_size(), (1600, 900));
    for name in ["gbuffer", "ssss_ping", "ssss_blur", "scene_hdr"] {
        assert_eq!(renderer.targets().get(name).unwrap().size(), (1600, 900));
    }
    assert_eq!(renderer.targets().get("shadow").unwrap().size(), (2048, 2048));
    assert_eq!(renderer.backend().resource_counts(), baseline, "rebuild leaked");
}

#[test]
fn resize_with_blur_disabled_rebuilds_targets_end_to_end() {
    let mut renderer = ready_renderer();
    let mut config = RenderConfig::default();
    config.set("enableBlur", false).unwrap();
    let scene = SceneState::default();
    let mut frames: Vec<Vec<&'static str>> = Vec::new();

    let report = renderer.render_frame(&scene, &config).unwrap();
    frames.push(report.pass_names().collect());

    let old = [
        renderer.targets().texture("gbuffer", AttachmentSlot::Color(0)).unwrap(),
        renderer.targets().texture("gbuffer", AttachmentSlot::DepthStencil).unwrap(),
        renderer.targets().texture("scene_hdr", AttachmentSlot::Color(0)).unwrap(),
    ];

    renderer.on_resize(1600, 900).unwrap();
    renderer.backend_mut().clear_events();
    let report = renderer.render_frame(&scene, &config).unwrap();
    frames.push(report.pass_names().collect());

    for handle in old {
        assert!(
            renderer.backend().texture_info(handle).is_none(),
            "texture from the old viewport still alive"
        );
    }

    let shadow_fb = renderer.targets().framebuffer("shadow").unwrap();
    let rebuilt: Vec<_> = ["gbuffer", "ssss_ping", "ssss_blur", "scene_hdr"]
        .into_iter()
        .map(|name| {
            let set = renderer.targets().get(name).unwrap();
            assert_eq!(set.size(), (1600, 900), "{name}");
            set.framebuffer().unwrap()
        })
        .collect();

    let mut surface_passes = 0;
    for event in renderer.backend().events() {
        if let BackendEvent::BeginPass { label, target } = event {
            match target {
                PassTarget::Framebuffer(fb) => assert!(
                    *fb == shadow_fb || rebuilt.contains(fb),
                    "pass {label} wrote to a stale framebuffer"
                ),
                PassTarget::Surface => surface_passes += 1,
            }
        }
    }
    assert_eq!(surface_passes, 1);
    assert_eq!(renderer.backend().surface_size(), (1600, 900));

    let report = renderer.render_frame(&scene, &config).unwrap();
    frames.push(report.pass_names().collect());

    for (index, names) in frames.iter().enumerate() {
        assert_eq!(names, &["shadow", "gbuffer", "composite", "final"], "frame {index}");
        assert!(!names.iter().any(|n| n.starts_with("ssss")));
    }
}

#[test]
fn zero_sized_resize_is_ignored() {
    let mut renderer = ready_renderer();
    renderer.on_resize(0, 450).unwrap();
    renderer.on_resize(800, 0).unwrap();
    assert!(!renderer.has_pending_resize());
}

#[test]
fn failed_rebuild_keeps_renderer_ready() {
    let mut renderer = Renderer::new(
        HeadlessBackend::with_limits(
            800,
            450,
            BackendLimits {
                max_texture_dimension: 4096,
            },
        ),
        settings(),
    );
    renderer.init(800, 450).unwrap();
    let baseline = renderer.backend().resource_counts();
    let scene = SceneState::default();
    let config = RenderConfig::default();

    renderer.on_resize(10_000, 450).unwrap();
    let err = renderer.render_frame(&scene, &config).unwrap_err();
    assert!(matches!(err, SssError::TextureTooLarge { .. }));
    assert_eq!(renderer.state(), PipelineState::Ready);
    assert!(renderer.has_pending_resize(), "rebuild is retried");

    renderer.on_resize(1024, 576).unwrap();
    renderer.render_frame(&scene, &config).unwrap();
    assert_eq!(renderer.viewport(), (1024, 576));
    assert_eq!(renderer.backend().resource_counts(), baseline);
}

// ============================================================================
// Models
// ============================================================================

#[test]
fn loaded_model_draws_in_geometry_passes() {
    let mut renderer = ready_renderer();
    renderer.load_model(&ModelAsset::unit_cube()).unwrap();
    assert!(renderer.has_model());
    renderer.backend_mut().clear_events();

    renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap();

    let draws = draws_per_pass(renderer.backend().events());
    assert_eq!(draws[0], ("shadow".to_string(), 1));
    assert_eq!(draws[1], ("gbuffer".to_string(), 1));
}

#[test]
fn replacing_model_releases_previous() {
    let mut renderer = ready_renderer();
    renderer.load_model(&ModelAsset::unit_cube()).unwrap();
    let with_one = renderer.backend().resource_counts();

    renderer.load_model(&ModelAsset::unit_cube()).unwrap();
    assert_eq!(renderer.backend().resource_counts(), with_one);
}

// ============================================================================
// Transmittance LUT
// ============================================================================

#[test]
fn composite_samples_the_transmittance_lut() {
    let mut renderer = Renderer::new(HeadlessBackend::new(800, 450), settings()).with_skin_params(
        SkinParams {
            melanin_fraction: 0.2,
            ..SkinParams::default()
        },
    );
    renderer.init(800, 450).unwrap();
    let report = renderer
        .render_frame(&SceneState::default(), &RenderConfig::default())
        .unwrap();

    let lut = report.input("composite", 5).unwrap();
    assert_eq!(lut.resolved, GraphResource::SkinTransmittanceLut);

    let backend = renderer.backend();
    assert_eq!(backend.texture_label(lut.texture), Some("skin.transmittance_lut"));
    let info = backend.texture_info(lut.texture).unwrap();
    assert_eq!((info.width, info.height), (TRANSMITTANCE_LUT_WIDTH, 1));
    assert_eq!(info.format, wgpu::TextureFormat::Rgba16Float);
}
