use glam::{Mat4, Vec3};

/// A spot light orbiting a target, used for shading and the shadow map.
///
/// Position comes from `pitch`/`yaw` (degrees) at `distance` from `target`.
/// The shadow frustum is a square perspective of `fovy` degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pitch: f32,
    yaw: f32,
    target: Vec3,
    distance: f32,
    fovy: f32,
    near: f32,
    far: f32,
    color: Vec3,

    position: Vec3,
    direction: Vec3,
    view: Mat4,
    projection: Mat4,
}

impl Default for Light {
    fn default() -> Self {
        let mut light = Self {
            pitch: 30.0,
            yaw: 45.0,
            target: Vec3::ZERO,
            distance: 3.0,
            fovy: 45.0,
            near: 0.1,
            far: 20.0,
            color: Vec3::ONE,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        light.update();
        light
    }
}

impl Light {
    fn update(&mut self) {
        let (pitch, yaw) = (self.pitch.to_radians(), self.yaw.to_radians());
        let offset = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.position = self.target + offset * self.distance;
        self.direction = -offset;

        let up = if self.direction.y.abs() > 0.99 {
            Vec3::X
        } else {
            Vec3::Y
        };
        self.view = Mat4::look_at_rh(self.position, self.target, up);
        self.projection = Mat4::perspective_rh(self.fovy.to_radians(), 1.0, self.near, self.far);
    }

    /// Pitch is clamped to [-89, 89], yaw wraps into [-180, 180).
    pub fn set_angles(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch.clamp(-89.0, 89.0);
        self.yaw = (yaw + 180.0).rem_euclid(360.0) - 180.0;
        self.update();
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.max(f32::EPSILON);
        self.update();
    }

    pub fn set_frustum(&mut self, fovy: f32, near: f32, far: f32) {
        self.fovy = fovy;
        self.near = near;
        self.far = far;
        self.update();
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit vector from the light towards its target.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Full cone angle in degrees.
    #[must_use]
    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    /// Cosine of the half cone angle; fragments outside are unlit.
    #[must_use]
    pub fn spot_cos_cutoff(&self) -> f32 {
        (self.fovy * 0.5).to_radians().cos()
    }

    #[must_use]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[must_use]
    pub fn far(&self) -> f32 {
        self.far
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_projects_to_shadow_map_centre() {
        let mut light = Light::default();
        light.set_angles(60.0, -120.0);
        let clip = light.view_projection() * light.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0.0..1.0).contains(&ndc.z));
    }

    #[test]
    fn yaw_wraps_into_half_open_range() {
        let mut light = Light::default();
        light.set_angles(0.0, 190.0);
        assert!((light.yaw() + 170.0).abs() < 1e-4);
        light.set_angles(120.0, 0.0);
        assert_eq!(light.pitch(), 89.0);
    }
}
