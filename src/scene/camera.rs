//! Cameras
//!
//! Both variants derive their frame from yaw/pitch angles:
//!
//! ```text
//! inv_dir = (cos yaw · cos pitch, sin pitch, sin yaw · cos pitch)
//! right   = normalize(Y × inv_dir)
//! up      = normalize(inv_dir × right)
//! view    = look_at(position, position − inv_dir, up)
//! ```
//!
//! Every mutator recomputes the cached matrices before returning, so
//! [`Camera::view_matrix`] and [`Camera::projection_matrix`] are never stale.

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Front,
    Back,
    Right,
    Left,
    Up,
    Down,
}

/// Orientation, projection and cached matrices shared by both variants.
#[derive(Debug, Clone, PartialEq)]
struct CameraFrame {
    position: Vec3,
    inv_direction: Vec3,
    right: Vec3,
    up: Vec3,
    speed: f32,

    /// Degrees.
    yaw: f32,
    /// Degrees, clamped to [-89, 89].
    pitch: f32,

    screen_width: u32,
    screen_height: u32,
    /// Degrees.
    fovy: f32,
    near: f32,
    far: f32,

    view: Mat4,
    projection: Mat4,
}

impl Default for CameraFrame {
    fn default() -> Self {
        let mut frame = Self {
            position: Vec3::ZERO,
            inv_direction: Vec3::Z,
            right: Vec3::NEG_X,
            up: Vec3::Y,
            speed: 1.0,
            yaw: 90.0,
            pitch: 0.0,
            screen_width: 1280,
            screen_height: 720,
            fovy: 60.0,
            near: 0.1,
            far: 5000.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        frame.update_vectors();
        frame.update_view();
        frame.update_projection();
        frame
    }
}

impl CameraFrame {
    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.inv_direction = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = Vec3::Y.cross(self.inv_direction).normalize();
        self.up = self.inv_direction.cross(self.right).normalize();
    }

    fn update_view(&mut self) {
        self.view = Mat4::look_at_rh(self.position, self.position - self.inv_direction, self.up);
    }

    fn update_projection(&mut self) {
        let aspect = self.screen_width as f32 / self.screen_height as f32;
        self.projection = Mat4::perspective_rh(self.fovy.to_radians(), aspect, self.near, self.far);
    }

    fn rotate_by(&mut self, yaw: f32, pitch: f32) {
        self.yaw = (self.yaw + yaw).rem_euclid(360.0);
        self.pitch = (self.pitch + pitch).clamp(-89.0, 89.0);
        self.update_vectors();
    }

    fn offset(&self, direction: MoveDirection) -> Vec3 {
        let step = self.speed;
        match direction {
            MoveDirection::Front => -self.inv_direction * step,
            MoveDirection::Back => self.inv_direction * step,
            MoveDirection::Right => self.right * step,
            MoveDirection::Left => -self.right * step,
            MoveDirection::Up => self.up * step,
            MoveDirection::Down => -self.up * step,
        }
    }
}

// ─── Free-fly ─────────────────────────────────────────────────────────────────

/// Moves its own position; mouse deltas are scaled by a sensitivity.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeFlyCamera {
    frame: CameraFrame,
    rotation_sensitivity: f32,
}

impl Default for FreeFlyCamera {
    fn default() -> Self {
        Self {
            frame: CameraFrame::default(),
            rotation_sensitivity: 0.1,
        }
    }
}

impl FreeFlyCamera {
    fn apply_move(&mut self, direction: MoveDirection) {
        self.frame.position += self.frame.offset(direction);
        self.frame.update_view();
    }

    fn apply_rotate(&mut self, dx: f32, dy: f32) {
        let s = self.rotation_sensitivity;
        self.frame.rotate_by(dx * s, dy * s);
        self.frame.update_view();
    }

    fn set_position(&mut self, position: Vec3) {
        self.frame.position = position;
        self.frame.update_view();
    }

    pub fn set_rotation_sensitivity(&mut self, sensitivity: f32) {
        self.rotation_sensitivity = sensitivity;
    }
}

// ─── Trackball ────────────────────────────────────────────────────────────────

/// Orbits a subject point at a fixed distance.
///
/// Moves translate the subject; the camera follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackballCamera {
    frame: CameraFrame,
    subject: Vec3,
    distance: f32,
}

impl Default for TrackballCamera {
    fn default() -> Self {
        let mut camera = Self {
            frame: CameraFrame::default(),
            subject: Vec3::ZERO,
            distance: 0.5,
        };
        camera.update_position();
        camera
    }
}

impl TrackballCamera {
    fn update_position(&mut self) {
        self.frame.position = self.subject + self.frame.inv_direction * self.distance;
        self.frame.update_view();
    }

    fn apply_move(&mut self, direction: MoveDirection) {
        self.subject += self.frame.offset(direction);
        self.update_position();
    }

    fn apply_rotate(&mut self, dx: f32, dy: f32) {
        self.frame.rotate_by(dx, dy);
        self.update_position();
    }

    #[must_use]
    pub fn subject(&self) -> Vec3 {
        self.subject
    }

    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.max(0.0);
        self.update_position();
    }
}

// ─── Camera ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Camera {
    FreeFly(FreeFlyCamera),
    Trackball(TrackballCamera),
}

impl Default for Camera {
    fn default() -> Self {
        Self::FreeFly(FreeFlyCamera::default())
    }
}

impl Camera {
    #[must_use]
    pub fn free_fly() -> Self {
        Self::FreeFly(FreeFlyCamera::default())
    }

    #[must_use]
    pub fn trackball() -> Self {
        Self::Trackball(TrackballCamera::default())
    }

    fn frame(&self) -> &CameraFrame {
        match self {
            Self::FreeFly(c) => &c.frame,
            Self::Trackball(c) => &c.frame,
        }
    }

    fn frame_mut(&mut self) -> &mut CameraFrame {
        match self {
            Self::FreeFly(c) => &mut c.frame,
            Self::Trackball(c) => &mut c.frame,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.frame().position
    }

    /// Unit vector the camera looks along.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        -self.frame().inv_direction
    }

    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.frame().yaw
    }

    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.frame().pitch
    }

    #[must_use]
    pub fn fovy(&self) -> f32 {
        self.frame().fovy
    }

    #[must_use]
    pub fn near(&self) -> f32 {
        self.frame().near
    }

    #[must_use]
    pub fn far(&self) -> f32 {
        self.frame().far
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.frame().view
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.frame().projection
    }

    #[must_use]
    pub fn model_view_projection(&self, model: Mat4) -> Mat4 {
        let frame = self.frame();
        frame.projection * frame.view * model
    }

    pub fn apply_move(&mut self, direction: MoveDirection) {
        match self {
            Self::FreeFly(c) => c.apply_move(direction),
            Self::Trackball(c) => c.apply_move(direction),
        }
    }

    /// Rotates by mouse deltas, yaw from `dx` and pitch from `dy`.
    pub fn apply_rotate(&mut self, dx: f32, dy: f32) {
        match self {
            Self::FreeFly(c) => c.apply_rotate(dx, dy),
            Self::Trackball(c) => c.apply_rotate(dx, dy),
        }
    }

    /// Free-fly: the eye position. Trackball: the subject position.
    pub fn set_position(&mut self, position: Vec3) {
        match self {
            Self::FreeFly(c) => c.set_position(position),
            Self::Trackball(c) => {
                c.subject = position;
                c.update_position();
            }
        }
    }

    /// Vertical field of view in degrees.
    pub fn set_fovy(&mut self, fovy: f32) {
        let frame = self.frame_mut();
        frame.fovy = fovy;
        frame.update_projection();
    }

    /// Zero sizes are ignored.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let frame = self.frame_mut();
        frame.screen_width = width;
        frame.screen_height = height;
        frame.update_projection();
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.frame_mut().speed = speed;
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        let frame = self.frame_mut();
        frame.near = near;
        frame.far = far;
        frame.update_projection();
    }
}
