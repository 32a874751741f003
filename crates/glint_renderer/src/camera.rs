//! Camera: pinhole by default, with an optional thin-lens aperture.

use glint_math::{Quat, Ray, Vec2, Vec3};

#[derive(Debug, Clone)]
pub struct Camera {
    pub pos: Vec3,
    user_up: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    /// Distance to the last point() target; orbits pivot around it and
    /// the lens focuses there by default.
    target_dist: f32,
    fov_x: f32,
    aspect: f32,
    tan_half_x: f32,
    tan_half_y: f32,
    /// Lens radius; 0 is a pinhole.
    pub aperture: f32,
    /// Focus distance; 0 focuses at the target.
    pub focus: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub const DEFAULT_ASPECT: f32 = 4.0 / 3.0;
    pub const DEFAULT_HORIZ_FOV: f32 = std::f32::consts::FRAC_PI_4;

    pub fn new() -> Self {
        let mut camera = Self {
            pos: Vec3::ZERO,
            user_up: Vec3::Y,
            forward: Vec3::Z,
            up: Vec3::Y,
            right: Vec3::X,
            target_dist: 1.0,
            fov_x: Self::DEFAULT_HORIZ_FOV,
            aspect: Self::DEFAULT_ASPECT,
            tan_half_x: 0.0,
            tan_half_y: 0.0,
            aperture: 0.0,
            focus: 0.0,
        };
        camera.set_aspect(Self::DEFAULT_ASPECT);
        camera
    }

    pub fn move_to(&mut self, pos: Vec3) {
        self.pos = pos;
    }

    pub fn move_by(&mut self, offset: Vec3) {
        self.pos += offset;
    }

    /// Aim at a world-space target point.
    pub fn point(&mut self, target: Vec3) {
        self.target_dist = (target - self.pos).length().max(1e-3);
        self.point_dir(target - self.pos);
    }

    /// Aim along a direction, keeping the user's up reference.
    pub fn point_dir(&mut self, dir: Vec3) {
        self.forward = dir.normalize();
        self.right = self.user_up.cross(self.forward).normalize();
        self.up = self.forward.cross(self.right).normalize();
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.set_horiz_fov(self.fov_x);
    }

    pub fn set_horiz_fov(&mut self, fov: f32) {
        self.fov_x = fov;
        self.tan_half_x = (fov / 2.0).tan();
        self.tan_half_y = self.tan_half_x / self.aspect;
    }

    /// Magnify by `factor` (> 1 narrows the field of view).
    pub fn zoom(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        self.tan_half_x /= factor;
        self.tan_half_y /= factor;
        self.fov_x = 2.0 * self.tan_half_x.atan();
    }

    /// Rotate the camera orientation in place.
    pub fn rotate(&mut self, rot: Quat) {
        self.forward = (rot * self.forward).normalize();
        self.up = (rot * self.up).normalize();
        self.right = (rot * self.right).normalize();
        self.user_up = rot * self.user_up;
    }

    /// Revolve the camera around its current target, keeping it aimed
    /// there.
    pub fn orbit(&mut self, rot: Quat) {
        let target = self.pos + self.forward * self.target_dist;
        self.pos = target + rot * (self.pos - target);
        self.point(target);
    }

    /// Map pixel `(x, y)` of a `width`-by-`height` image to a camera
    /// ray. `jitter` is the in-pixel offset in `[0,1)^2`; `lens` picks
    /// the aperture point for depth of field.
    pub fn generate_ray(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        jitter: Vec2,
        lens: Vec2,
    ) -> Ray {
        // Image y grows downward; camera v grows upward.
        let fx = x as f32 + jitter.x;
        let fy = height as f32 - (y as f32 + jitter.y);
        let u = fx / width as f32;
        let v = fy / height as f32;

        let dir = self.forward
            + self.right * (2.0 * (u - 0.5) * self.tan_half_x)
            + self.up * (2.0 * (v - 0.5) * self.tan_half_y);

        if self.aperture <= 0.0 {
            return Ray::new(self.pos, dir, 0.0, f32::INFINITY);
        }

        // Thin lens: perturb the origin on the aperture disc and aim
        // through the focal plane.
        let focus = if self.focus > 0.0 {
            self.focus
        } else {
            self.target_dist
        };
        let focal_point = self.pos + dir * focus;

        let r = self.aperture * lens.x.sqrt();
        let phi = 2.0 * std::f32::consts::PI * lens.y;
        let origin = self.pos + self.right * (r * phi.cos()) + self.up * (r * phi.sin());

        Ray::new(origin, focal_point - origin, 0.0, f32::INFINITY)
    }
}
