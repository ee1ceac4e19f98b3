//! Built-in Render Passes
//!
//! ```text
//!  shadow ──► gbuffer ──► ssss_blur_h ──► ssss_blur_v ──► composite ──► final
//!                │        (enableBlur)    (enableBlur)       ▲
//!                └───────── irradiance (blur disabled) ──────┘
//! ```
//!
//! [`pipeline_targets`] declares the render target sets these passes write
//! and [`pipeline_graph`] wires the passes in their fixed order.

mod composite;
mod final_output;
mod gbuffer;
mod shadow;
mod ssss;

pub use composite::CompositePass;
pub use final_output::FinalOutputPass;
pub use gbuffer::GBufferPass;
pub use shadow::ShadowPass;
pub use ssss::{BlurDirection, SsssBlurPass};

use crate::errors::{Result, SssError};
use crate::renderer::RendererSettings;
use crate::renderer::backend::RenderBackend;
use crate::renderer::graph::RenderGraph;
use crate::renderer::graph::targets::{AttachmentSlot, AttachmentSpec, RenderTargetSpec, SizeClass};
use crate::renderer::shader::ShaderProgram;

/// Render target sets of the pipeline, in creation order.
#[must_use]
pub fn pipeline_targets(settings: &RendererSettings) -> Vec<RenderTargetSpec> {
    use AttachmentSlot::{Color, DepthStencil};
    use wgpu::TextureFormat as F;

    let hdr = settings.hdr_format;
    vec![
        RenderTargetSpec {
            name: "shadow",
            size: SizeClass::Fixed {
                width: settings.shadow_map_size,
                height: settings.shadow_map_size,
            },
            attachments: vec![AttachmentSpec::owned(DepthStencil, F::Depth32Float)],
        },
        RenderTargetSpec {
            name: "gbuffer",
            size: SizeClass::Viewport,
            attachments: vec![
                AttachmentSpec::owned(Color(0), F::Rgba16Float),
                AttachmentSpec::owned(Color(1), F::Rgba16Float),
                AttachmentSpec::owned(Color(2), F::Rgba8Unorm),
                AttachmentSpec::owned(Color(3), F::Rg16Float),
                AttachmentSpec::owned(Color(4), F::Rgba16Float),
                AttachmentSpec::owned(DepthStencil, settings.depth_stencil_format),
            ],
        },
        RenderTargetSpec {
            name: "ssss_ping",
            size: SizeClass::Viewport,
            attachments: vec![
                AttachmentSpec::owned(Color(0), F::Rgba16Float),
                AttachmentSpec::shared(DepthStencil, "gbuffer"),
            ],
        },
        RenderTargetSpec {
            name: "ssss_blur",
            size: SizeClass::Viewport,
            attachments: vec![
                AttachmentSpec::owned(Color(0), F::Rgba16Float),
                AttachmentSpec::shared(DepthStencil, "gbuffer"),
            ],
        },
        RenderTargetSpec {
            name: "scene_hdr",
            size: SizeClass::Viewport,
            attachments: vec![
                AttachmentSpec::owned(Color(0), hdr),
                AttachmentSpec::shared(DepthStencil, "gbuffer"),
            ],
        },
    ]
}

/// The passes in their fixed execution order.
#[must_use]
pub fn pipeline_graph() -> RenderGraph {
    RenderGraph::new()
        .with_node(Box::new(ShadowPass::new()))
        .with_node(Box::new(GBufferPass::new()))
        .with_node(Box::new(SsssBlurPass::new(BlurDirection::Horizontal)))
        .with_node(Box::new(SsssBlurPass::new(BlurDirection::Vertical)))
        .with_node(Box::new(CompositePass::new()))
        .with_node(Box::new(FinalOutputPass::new()))
}

/// The program of a pass, or an error if `compile` has not run.
fn compiled<'a>(program: &'a mut Option<ShaderProgram>, pass: &str) -> Result<&'a mut ShaderProgram> {
    program
        .as_mut()
        .ok_or_else(|| SssError::ResourceNotFound(format!("program of pass {pass}")))
}

fn release_program(program: &mut Option<ShaderProgram>, backend: &mut dyn RenderBackend) {
    if let Some(mut program) = program.take() {
        program.release(backend);
    }
}
