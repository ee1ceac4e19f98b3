//! Scene State
//!
//! The camera, the single light and the model transform. Owned by the
//! application and handed to the renderer by reference each frame.

pub mod camera;
pub mod light;

pub use camera::{Camera, FreeFlyCamera, MoveDirection, TrackballCamera};
pub use light::Light;

use glam::Mat4;

use crate::renderer::RenderConfig;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneState {
    pub camera: Camera,
    pub light: Light,
    pub model_transform: Mat4,
}

impl SceneState {
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            light: Light::default(),
            model_transform: Mat4::IDENTITY,
        }
    }

    /// Copies the light parameters of `config` onto the light.
    pub fn apply_config(&mut self, config: &RenderConfig) {
        self.light.set_angles(config.light_pitch(), config.light_yaw());
        self.light.set_color(config.light_color());
    }
}
