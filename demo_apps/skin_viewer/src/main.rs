//! Skin viewer
//!
//! Renders an OBJ model (first command-line argument) through the full
//! subsurface scattering pipeline. Without an argument a unit cube with a
//! skin material is shown.
//!
//! Controls: WASD/QE move, left-drag looks around, B toggles blur,
//! T toggles transmittance, +/- change exposure.

use std::path::PathBuf;

use glam::{Mat4, Vec3};
use sss::app::{App, AppContext, AppHandler, default_controls};
use sss::assets::ModelAsset;
use sss::errors::Result;
use sss::renderer::RendererSettings;

struct SkinViewer;

impl AppHandler for SkinViewer {
    fn init(ctx: &mut AppContext) -> Result<Self> {
        let model = match std::env::args().nth(1) {
            Some(path) => ModelAsset::load_obj(path)?,
            None => {
                log::info!("No model given, showing the unit cube");
                ModelAsset::unit_cube()
            }
        };
        ctx.renderer.load_model(&model)?;

        ctx.scene.model_transform = Mat4::IDENTITY;
        ctx.scene.camera.set_position(Vec3::new(0.0, 0.0, 2.0));
        ctx.move_speed = 1.5;
        Ok(Self)
    }

    fn update(&mut self, ctx: &mut AppContext) {
        default_controls(ctx);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let shader_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shaders");
    App::new()
        .with_title("sss")
        .with_size(1024, 576)
        .with_settings(RendererSettings {
            shader_dir,
            ..Default::default()
        })
        .run::<SkinViewer>()
}
