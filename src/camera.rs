use crate::math::{Point3, Vec3};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// A pinhole camera: a position, an orthonormal basis `(x, y, z)` with `-z`
/// as the view direction, and the perspective parameters needed to map
/// normalized film coordinates onto the near plane.
///
/// The two projection operators are
/// `world_of(local)` — basis transform of a camera-local point — and
/// `film_of(i, j)` with `i, j ∈ [0, 1]`, which places
/// `(W·(i−½), −H·(j−½), −near)` in the world, where `H = tan(θ/2)·near`
/// and `W = H·aspect`.
#[derive(Debug, Clone)]
pub struct Eye {
    axes: [Vec3; 3],
    position: Point3,
    aspect_ratio: f32,
    tan_theta: f32,
    near: f32,
}

impl Default for Eye {
    fn default() -> Self {
        // tan_theta = 1 is a 90° vertical field of view.
        Self {
            axes: [Vec3::unit_x(), Vec3::unit_y(), Vec3::unit_z()],
            position: Point3::zero(),
            aspect_ratio: 1.0,
            tan_theta: 1.0,
            near: 0.1,
        }
    }
}

impl Eye {
    pub fn axis(&self, i: usize) -> Vec3 {
        self.axes[i]
    }

    pub fn position(&self) -> Point3 {
        self.position
    }

    pub fn set_position(&mut self, p: Point3) {
        self.position = p;
    }

    /// Translates along one of the camera's own axes (0 = right, 1 = up,
    /// 2 = backward), the motion the interactive viewer maps its keys to.
    pub fn move_axis(&mut self, axis: usize, factor: f32) {
        self.position += self.axes[axis] * factor;
    }

    pub fn set_axes(&mut self, x: Vec3, y: Vec3, z: Vec3) {
        self.axes = [x, y, z];
    }

    /// Points the camera along `to`, with `up` resolving the roll.
    pub fn look(&mut self, to: Vec3, up: Vec3) {
        let z = -to;
        let x = up.cross(z).normalized();
        let y = z.cross(x);
        self.axes = [x, y, z];
    }

    /// Vertical field of view `theta` (radians), width/height aspect ratio,
    /// and near-plane distance.
    pub fn perspective(&mut self, theta: f32, aspect_ratio: f32, near: f32) {
        self.tan_theta = (theta * 0.5).tan();
        self.aspect_ratio = aspect_ratio;
        self.near = near;
    }

    /// Camera-local point into world space.
    pub fn world_of(&self, local: Vec3) -> Point3 {
        self.position + self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z
    }

    /// Near-plane point the film coordinate `(i, j)` projects through.
    /// `(0, 0)` is the top-left film corner, `(1, 1)` the bottom-right.
    pub fn film_of(&self, i: f32, j: f32) -> Point3 {
        let h = self.tan_theta * self.near;
        let w = h * self.aspect_ratio;
        self.world_of(Vec3::new(w * (i - 0.5), -h * (j - 0.5), -self.near))
    }
}

/// An [`Eye`] steered by Euler angles `(pitch, yaw, roll)`.
///
/// Assigning angles clamps pitch to `[-π/2, π/2]`, wraps yaw to `[0, 2π)`,
/// clamps roll to `[-π, π]`, and rebuilds the orthonormal basis; the basis
/// is therefore never stale with respect to the angles.
#[derive(Debug, Clone, Default)]
pub struct EyeAngle {
    eye: Eye,
    angle: Vec3,
}

impl EyeAngle {
    pub fn eye(&self) -> &Eye {
        &self.eye
    }

    /// `(pitch, yaw, roll)` currently applied.
    pub fn angle(&self) -> Vec3 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: Vec3) {
        self.angle = Vec3::new(
            angle.x.clamp(-FRAC_PI_2, FRAC_PI_2),
            angle.y.rem_euclid(TAU),
            angle.z.clamp(-PI, PI),
        );

        let (sin_p, cos_p) = self.angle.x.sin_cos();
        let (sin_y, cos_y) = self.angle.y.sin_cos();
        let (sin_r, cos_r) = self.angle.z.sin_cos();

        let x = Vec3::new(cos_y * cos_r, cos_y * sin_r, -sin_y);
        let z = Vec3::new(cos_p * sin_y, -sin_p, cos_p * cos_y);
        self.eye.set_axes(x, z.cross(x), z);
    }

    pub fn position(&self) -> Point3 {
        self.eye.position()
    }

    pub fn set_position(&mut self, p: Point3) {
        self.eye.set_position(p);
    }

    pub fn move_axis(&mut self, axis: usize, factor: f32) {
        self.eye.move_axis(axis, factor);
    }

    pub fn perspective(&mut self, theta: f32, aspect_ratio: f32, near: f32) {
        self.eye.perspective(theta, aspect_ratio, near);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_basis_projects_straight_ahead() {
        let mut eye = Eye::default();
        eye.perspective(FRAC_PI_2, 1.0, 0.1);
        let center = eye.film_of(0.5, 0.5);
        // Film center sits one near-distance down the -z axis.
        assert!((center - Point3::new(0.0, 0.0, -0.1)).length() < 1e-6);

        // tan(π/4) = 1, so the film half-extent equals the near distance.
        let corner = eye.film_of(1.0, 0.0);
        assert!((corner - Point3::new(0.05, 0.05, -0.1)).length() < 1e-6);
    }

    #[test]
    fn look_builds_orthonormal_basis() {
        let mut eye = Eye::default();
        eye.look(Vec3::new(0.0, 0.0, -1.0), Vec3::unit_y());
        assert!((eye.axis(0) - Vec3::unit_x()).length() < 1e-6);
        assert!((eye.axis(1) - Vec3::unit_y()).length() < 1e-6);
        assert!((eye.axis(2) - Vec3::unit_z()).length() < 1e-6);
    }

    #[test]
    fn zero_angles_give_identity_basis() {
        let mut cam = EyeAngle::default();
        cam.set_angle(Vec3::zero());
        assert!((cam.eye().axis(0) - Vec3::unit_x()).length() < 1e-6);
        assert!((cam.eye().axis(1) - Vec3::unit_y()).length() < 1e-6);
        assert!((cam.eye().axis(2) - Vec3::unit_z()).length() < 1e-6);
    }

    #[test]
    fn angles_are_clamped_and_wrapped() {
        let mut cam = EyeAngle::default();
        cam.set_angle(Vec3::new(3.0, -0.5, 9.0));
        let a = cam.angle();
        assert!((a.x - FRAC_PI_2).abs() < 1e-6);
        assert!(a.y >= 0.0 && a.y < TAU);
        assert!((a.y - (TAU - 0.5)).abs() < 1e-5);
        assert!((a.z - PI).abs() < 1e-6);
    }

    #[test]
    fn basis_stays_orthonormal_under_rotation() {
        let mut cam = EyeAngle::default();
        cam.set_angle(Vec3::new(-0.3, 1.2, 0.15));
        let (x, y, z) = (cam.eye().axis(0), cam.eye().axis(1), cam.eye().axis(2));
        assert!(x.dot(y).abs() < 1e-5);
        assert!(y.dot(z).abs() < 1e-5);
        assert!(z.dot(x).abs() < 1e-5);
        assert!((x.length() - 1.0).abs() < 1e-5);
        assert!((y.length() - 1.0).abs() < 1e-5);
        assert!((z.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn move_axis_tracks_rotated_frame() {
        let mut cam = EyeAngle::default();
        cam.set_angle(Vec3::new(0.0, FRAC_PI_2, 0.0));
        cam.move_axis(2, 1.0);
        // After a quarter yaw the backward axis points along +x.
        assert!((cam.position() - Point3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }
}
