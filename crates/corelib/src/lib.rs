//! Core types: math re-exports, Transform, Camera.

pub use glam::{EulerRot, Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod transform;

pub use camera::Camera;
pub use transform::Transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(
            vec3(1.0, 2.0, 3.0),
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 2.0, 2.0),
        );
        // Last column = translation, diagonal = scale (with zero rotation).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn yaw_transform_rotates_x_toward_minus_z() {
        let t = Transform::from_yaw(90f32.to_radians());
        let rotated = t.matrix().transform_point3(vec3(1.0, 0.0, 0.0));
        assert!(rotated.x.abs() < 1e-6);
        assert!((rotated.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::new_perspective(
            vec3(0.0, 0.0, 4.0),
            vec3(0.0, 0.0, 0.0),
            Vec3::Y,
            60f32.to_radians(),
            0.1,
            100.0,
            16.0 / 9.0,
        );
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn zero_yaw_camera_looks_down_minus_z() {
        let cam = Camera::from_eye_yaw(
            vec3(0.0, 0.0, 8.0),
            0.0,
            45f32.to_radians(),
            0.1,
            100.0,
            16.0 / 9.0,
        );
        let dir = (cam.target - cam.eye).normalize();
        assert!((dir.z + 1.0).abs() < 1e-6);
        // The origin projects onto the view axis in front of the camera.
        let viewed = cam.view().transform_point3(Vec3::ZERO);
        assert!(viewed.z < 0.0);
    }

    #[test]
    fn yawed_camera_turns_toward_minus_x() {
        let cam = Camera::from_eye_yaw(
            vec3(0.0, 0.0, 8.0),
            25f32.to_radians(),
            45f32.to_radians(),
            0.1,
            100.0,
            1.0,
        );
        let dir = (cam.target - cam.eye).normalize();
        assert!(dir.x < 0.0);
        assert!(dir.z < 0.0);
    }
}
