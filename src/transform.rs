//! Model, view, projection and normal matrices for a point in time.

use glam::{Mat3, Mat4, Vec3};

use crate::app::Viewport;
use crate::scene::Camera;

pub const Y_DEGREES_PER_SECOND: f64 = 45.0;
pub const X_DEGREES_PER_SECOND: f64 = 80.5;

pub const FIELD_OF_VIEW_DEGREES: f32 = 50.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;

const Y_ROTATION_AXIS: Vec3 = Vec3::new(0.0, 0.5, 0.0);
const X_ROTATION_AXIS: Vec3 = Vec3::new(0.5, 0.0, 0.0);

/// Matrices uploaded for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSet {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub normal_to_world: Mat3,
}

impl TransformSet {
    /// Builds every matrix from scratch for `elapsed` seconds since start.
    pub fn at(elapsed: f64, camera: &Camera, viewport: Viewport) -> Self {
        let model = model_matrix(elapsed);
        Self {
            model,
            view: view_matrix(camera),
            projection: projection_matrix(viewport),
            normal_to_world: normal_matrix(model),
        }
    }
}

/// Rotation angles in degrees `(about_y, about_x)` after `elapsed` seconds,
/// reduced to `[0, 360)` before narrowing to f32.
pub fn rotation_degrees(elapsed: f64) -> (f32, f32) {
    (
        (elapsed * Y_DEGREES_PER_SECOND).rem_euclid(360.0) as f32,
        (elapsed * X_DEGREES_PER_SECOND).rem_euclid(360.0) as f32,
    )
}

/// Identity rotated about Y, then about X.
pub fn model_matrix(elapsed: f64) -> Mat4 {
    let (about_y, about_x) = rotation_degrees(elapsed);
    Mat4::IDENTITY
        * Mat4::from_axis_angle(Y_ROTATION_AXIS.normalize(), about_y.to_radians())
        * Mat4::from_axis_angle(X_ROTATION_AXIS.normalize(), about_x.to_radians())
}

pub fn view_matrix(camera: &Camera) -> Mat4 {
    Mat4::look_at_rh(camera.position, camera.target, camera.up)
}

/// Perspective projection with wgpu's `[0, 1]` depth range.
pub fn projection_matrix(viewport: Viewport) -> Mat4 {
    Mat4::perspective_rh(
        FIELD_OF_VIEW_DEGREES.to_radians(),
        viewport.aspect(),
        Z_NEAR,
        Z_FAR,
    )
}

/// Maps object-space normals to world space; correct under non-uniform scale.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    Mat3::from_mat4(model).inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn model_is_identity_at_start() {
        assert!(model_matrix(0.0).abs_diff_eq(Mat4::IDENTITY, EPSILON));
    }

    #[test]
    fn rotates_y_then_x() {
        let expected = Mat4::from_rotation_y(45.0_f32.to_radians())
            * Mat4::from_rotation_x(80.5_f32.to_radians());
        assert!(model_matrix(1.0).abs_diff_eq(expected, EPSILON));

        let expected = Mat4::from_rotation_y(90.0_f32.to_radians())
            * Mat4::from_rotation_x(161.0_f32.to_radians());
        assert!(model_matrix(2.0).abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn angles_wrap_at_full_turn() {
        assert_eq!(rotation_degrees(8.0), (0.0, 284.0));
        let (about_y, about_x) = rotation_degrees(10_000.5);
        assert!((0.0..360.0).contains(&about_y));
        assert!((0.0..360.0).contains(&about_x));
        assert!((about_y - 22.5).abs() < 1e-3);
    }

    #[test]
    fn view_matches_look_at_with_unnormalized_up() {
        let view = view_matrix(&Camera::default());
        let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        assert!(view.abs_diff_eq(expected, EPSILON));
        assert!(view
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), EPSILON));
    }

    #[test]
    fn projection_tracks_viewport_aspect() {
        for (width, height) in [(640, 480), (1920, 1080), (300, 900)] {
            let projection = projection_matrix(Viewport::new(width, height));
            let aspect = projection.y_axis.y / projection.x_axis.x;
            assert!((aspect - width as f32 / height as f32).abs() < EPSILON);
        }
    }

    #[test]
    fn normal_matrix_is_inverse_transpose() {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 0.5, 3.0),
            glam::Quat::from_rotation_z(0.7),
            Vec3::new(1.0, -2.0, 4.0),
        );
        let upper = Mat3::from_mat4(model);
        let normal = normal_matrix(model);
        assert!(normal.abs_diff_eq(upper.inverse().transpose(), EPSILON));
        assert!((normal.transpose() * upper).abs_diff_eq(Mat3::IDENTITY, EPSILON));
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let model = model_matrix(3.7);
        assert!(normal_matrix(model).abs_diff_eq(Mat3::from_mat4(model), EPSILON));
    }

    #[test]
    fn uniform_scale_keeps_normal_directions() {
        let rotation = model_matrix(1.3);
        let scaled = rotation * Mat4::from_scale(Vec3::splat(4.0));
        let normal = Vec3::new(0.3, -0.2, 0.9);
        let expected = (normal_matrix(rotation) * normal).normalize();
        let actual = (normal_matrix(scaled) * normal).normalize();
        assert!(actual.abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn non_uniform_scale_keeps_normals_perpendicular() {
        let model = Mat4::from_scale(Vec3::new(1.0, 4.0, 1.0));
        // Surface tangent and normal of the plane x + y = 0.
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let normal = Vec3::new(1.0, 1.0, 0.0);
        let world_tangent = Mat3::from_mat4(model) * tangent;
        let world_normal = normal_matrix(model) * normal;
        assert!(world_tangent.dot(world_normal).abs() < EPSILON);
        assert!((Mat3::from_mat4(model) * normal).dot(world_tangent).abs() > 1.0);
    }
}
