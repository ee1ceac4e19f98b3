//! Render target set tests
//!
//! Tests for:
//! - Fixed vs viewport-sized sets
//! - Viewport rebuilds (sizes, idempotence, no leaks)
//! - Shared depth-stencil between sets
//! - Failure cleanup and idempotent release

use sss::errors::SssError;
use sss::renderer::RendererSettings;
use sss::renderer::backend::{BackendLimits, HeadlessBackend, RenderBackend};
use sss::renderer::graph::{AttachmentSlot, RenderTargets, pipeline_targets};

// ============================================================================
// Helper
// ============================================================================

const VIEWPORT_SETS: [&str; 4] = ["gbuffer", "ssss_ping", "ssss_blur", "scene_hdr"];

fn pipeline(backend: &mut HeadlessBackend, width: u32, height: u32) -> RenderTargets {
    let mut targets = RenderTargets::new(pipeline_targets(&RendererSettings::default()));
    targets.create_fixed(backend).unwrap();
    targets.rebuild_viewport(backend, width, height).unwrap();
    targets
}

// ============================================================================
// Sizing
// ============================================================================

#[test]
fn viewport_sets_match_viewport() {
    let mut backend = HeadlessBackend::new(800, 450);
    let targets = pipeline(&mut backend, 800, 450);

    for name in VIEWPORT_SETS {
        let set = targets.get(name).unwrap();
        assert!(set.is_live(), "{name} should be live");
        assert_eq!(set.size(), (800, 450), "{name} size");
    }
    assert_eq!(targets.viewport(), (800, 450));
}

#[test]
fn shadow_set_is_fixed() {
    let mut backend = HeadlessBackend::new(800, 450);
    let mut targets = pipeline(&mut backend, 800, 450);
    let shadow = targets.texture("shadow", AttachmentSlot::DepthStencil).unwrap();

    targets.rebuild_viewport(&mut backend, 1600, 900).unwrap();

    assert_eq!(targets.get("shadow").unwrap().size(), (2048, 2048));
    assert_eq!(
        targets.texture("shadow", AttachmentSlot::DepthStencil),
        Some(shadow),
        "fixed sets keep their textures across rebuilds"
    );
    assert_eq!(targets.get("gbuffer").unwrap().size(), (1600, 900));
}

#[test]
fn gbuffer_has_five_color_slots() {
    let targets = RenderTargets::new(pipeline_targets(&RendererSettings::default()));
    let formats = targets.color_formats("gbuffer");
    assert_eq!(formats.len(), 5);
    assert_eq!(formats[3], wgpu::TextureFormat::Rg16Float);
    assert_eq!(
        targets.depth_format("scene_hdr"),
        Some(wgpu::TextureFormat::Depth24PlusStencil8)
    );
    assert!(targets.color_formats("shadow").is_empty());
}

// ============================================================================
// Rebuild
// ============================================================================

#[test]
fn rebuild_at_same_size_is_idempotent() {
    let mut backend = HeadlessBackend::new(800, 450);
    let mut targets = pipeline(&mut backend, 800, 450);
    let before = backend.resource_counts();

    for _ in 0..2 {
        targets.rebuild_viewport(&mut backend, 800, 450).unwrap();
        assert_eq!(backend.resource_counts(), before);

        for name in VIEWPORT_SETS {
            let set = targets.get(name).unwrap();
            assert!(set.is_live(), "{name}");
            assert_eq!(set.size(), (800, 450), "{name}");

            for attachment in &targets.spec(name).unwrap().attachments {
                let handle = set.texture(attachment.slot).unwrap();
                let info = backend.texture_info(handle).unwrap();
                assert_eq!(
                    (info.width, info.height),
                    (800, 450),
                    "{name} {:?}",
                    attachment.slot
                );
                assert_eq!(Some(info.format), set.format(attachment.slot));
            }

            let colors: Vec<_> = (0..targets.color_formats(name).len() as u32)
                .map(|i| set.format(AttachmentSlot::Color(i)).unwrap())
                .collect();
            assert_eq!(colors, targets.color_formats(name), "{name}");
            assert_eq!(
                set.format(AttachmentSlot::DepthStencil),
                targets.depth_format(name),
                "{name}"
            );
        }
    }
}

#[test]
fn rebuild_does_not_leak_across_sizes() {
    let mut backend = HeadlessBackend::new(800, 450);
    let mut targets = pipeline(&mut backend, 800, 450);
    let before = backend.resource_counts();

    for (w, h) in [(1600, 900), (320, 240), (800, 450)] {
        targets.rebuild_viewport(&mut backend, w, h).unwrap();
        assert_eq!(backend.resource_counts(), before, "after rebuild at {w}x{h}");
    }
}

#[test]
fn screen_space_sets_share_gbuffer_depth() {
    let mut backend = HeadlessBackend::new(800, 450);
    let targets = pipeline(&mut backend, 800, 450);
    let depth = targets.texture("gbuffer", AttachmentSlot::DepthStencil).unwrap();

    for name in ["ssss_ping", "ssss_blur", "scene_hdr"] {
        assert_eq!(
            targets.texture(name, AttachmentSlot::DepthStencil),
            Some(depth),
            "{name} should borrow the gbuffer depth"
        );
    }

    // 1 shadow + 6 gbuffer + 1 each for ping, blur and scene.
    assert_eq!(backend.resource_counts().textures, 10);
    assert_eq!(backend.resource_counts().framebuffers, 5);
}

#[test]
fn oversized_rebuild_releases_viewport_sets() {
    let mut backend = HeadlessBackend::with_limits(
        800,
        450,
        BackendLimits {
            max_texture_dimension: 4096,
        },
    );
    let mut targets = pipeline(&mut backend, 800, 450);

    let err = targets.rebuild_viewport(&mut backend, 5000, 450).unwrap_err();
    assert!(matches!(err, SssError::TextureTooLarge { max: 4096, .. }));

    for name in VIEWPORT_SETS {
        assert!(targets.get(name).is_none(), "{name} should be released");
    }
    assert!(targets.get("shadow").unwrap().is_live());
    assert_eq!(backend.resource_counts().textures, 1);
    assert_eq!(backend.resource_counts().framebuffers, 1);
    // The last good viewport is kept.
    assert_eq!(targets.viewport(), (800, 450));

    targets.rebuild_viewport(&mut backend, 1024, 576).unwrap();
    assert_eq!(targets.get("gbuffer").unwrap().size(), (1024, 576));
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn release_all_is_idempotent() {
    let mut backend = HeadlessBackend::new(800, 450);
    let mut targets = pipeline(&mut backend, 800, 450);

    targets.release_all(&mut backend);
    assert_eq!(backend.resource_counts().total(), 0);
    assert_eq!(targets.iter().count(), 0);

    targets.release_all(&mut backend);
    assert_eq!(backend.resource_counts().total(), 0);
}

#[test]
fn lookups_on_released_targets_return_none() {
    let mut backend = HeadlessBackend::new(800, 450);
    let mut targets = pipeline(&mut backend, 800, 450);
    targets.release_all(&mut backend);

    assert!(targets.framebuffer("gbuffer").is_none());
    assert!(targets.texture("gbuffer", AttachmentSlot::Color(0)).is_none());
    // Declared formats survive release.
    assert_eq!(targets.color_formats("gbuffer").len(), 5);
}
