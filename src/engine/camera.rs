// Orbit camera around the sculpting slab
//
// Camera model:
//   - Looks at a fixed target (the slab centre)
//   - Pitch (elevation) and yaw (horizontal rotation) around the target
//   - Left-drag rotates, mouse wheel zooms by changing distance
//   - Screen rays for picking the surface under the cursor

use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::event::MouseButton;

use super::input::InputState;

/// A world-space ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin:    Vec3,
    pub direction: Vec3,
}

pub struct OrbitCamera {
    /// Point the camera orbits and looks at.
    pub target: Vec3,

    /// Private: always clamped to [min_distance, max_distance] in update().
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Elevation angle in radians (0 = horizontal, PI/2 = straight down)
    pitch: f32,

    /// Horizontal rotation in radians (0 = eye on the +Z side of the target)
    pub yaw: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Radians per pixel of mouse drag
    pub rotate_speed: f32,

    /// Distance change per scroll line, as a fraction of current distance
    pub zoom_speed: f32,
}

const MIN_PITCH: f32 = 0.05;
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitCamera {
    /// Eye at (0, 3, 2) looking at the origin, 75° vertical fov.
    pub fn new() -> Self {
        let eye = Vec3::new(0.0, 3.0, 2.0);
        Self {
            target: Vec3::ZERO,
            distance: eye.length(),
            min_distance: 0.5,
            max_distance: 20.0,
            pitch: eye.y.atan2(eye.z),
            yaw: 0.0,
            fov: 75.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
            rotate_speed: 0.008,
            zoom_speed: 0.1,
        }
    }

    /// Update orbit from input. Call once per frame before rendering.
    /// `pointer_free` is false while the UI or a paint stroke owns the mouse.
    pub fn update(&mut self, input: &InputState, pointer_free: bool) {
        if pointer_free && input.is_button_held(MouseButton::Left) {
            self.orbit(input.mouse_delta);
        }
        if pointer_free && input.scroll_delta != 0.0 {
            self.zoom(input.scroll_delta);
        }
    }

    /// Rotate by a mouse drag in pixels.
    pub fn orbit(&mut self, drag: Vec2) {
        self.yaw -= drag.x * self.rotate_speed;
        self.pitch = (self.pitch + drag.y * self.rotate_speed).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Scroll up (positive) zooms in.
    pub fn zoom(&mut self, scroll_lines: f32) {
        self.distance *= 1.0 - scroll_lines * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        self.target + self.eye_offset()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Ray from the eye through a cursor position in physical pixels.
    pub fn screen_ray(&self, cursor: Vec2, window_size: (u32, u32)) -> Option<Ray> {
        let (w, h) = (window_size.0 as f32, window_size.1 as f32);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let ndc = Vec2::new(2.0 * cursor.x / w - 1.0, 1.0 - 2.0 * cursor.y / h);
        let inverse = self.view_projection(w / h).inverse();

        // wgpu clip space depth runs 0 (near) to 1 (far).
        let near = inverse * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inverse * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;

        let direction = (far - near).try_normalize()?;
        Some(Ray { origin: near, direction })
    }

    // Offset from target to camera eye based on pitch, yaw, and distance.
    fn eye_offset(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos() * self.distance,
            self.pitch.sin() * self.distance,
            self.yaw.cos() * self.pitch.cos() * self.distance,
        )
    }
}
