use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Vertical FOV boost the game applies while flying in spectator mode.
pub const DYNAMIC_FOV_FACTOR: f32 = 1.1;

/// How game-world axes (Y up) map onto scene axes (Z up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConvention {
    /// Matches the orientation of worlds exported with Mineways.
    #[default]
    NegY,
    PosY,
}

impl AxisConvention {
    pub fn remap(self, position: [f32; 3]) -> Vec3 {
        let [x, y, z] = position;
        match self {
            AxisConvention::NegY => Vec3::new(x, -z, y),
            AxisConvention::PosY => Vec3::new(x, z, y),
        }
    }
}

/// Lens focal length reproducing the game's vertical field of view on a
/// vertically fitted sensor.
pub fn focal_length(fov_degrees: f32, dynamic_fov: bool, sensor_height: f32) -> f32 {
    let factor = if dynamic_fov { DYNAMIC_FOV_FACTOR } else { 1.0 };
    0.5 / (factor * fov_degrees.to_radians() / 2.0).tan() * sensor_height
}

/// Inverse of [`focal_length`] without the dynamic FOV boost.
pub fn fov_for_focal_length(focal_length: f32, sensor_height: f32) -> f32 {
    2.0 * (0.5 / focal_length * sensor_height).atan().to_degrees()
}

/// Static tilt and roll of the camera, from `angle[3]` (pitch) and `angle[2]` (roll).
pub fn camera_delta_euler(angle: [f32; 4]) -> Vec3 {
    Vec3::new((90.0 - angle[3]).to_radians(), 0.0, (-angle[2] - 180.0).to_radians())
}

/// Animated heading of the camera, from `angle[1]` (yaw).
pub fn camera_euler(angle: [f32; 4]) -> Vec3 {
    Vec3::new(0.0, 0.0, -angle[1].to_radians())
}

/// Body orientation of a tracked entity. `rotation[0]` is not used.
pub fn body_delta_euler(rotation: [f32; 3]) -> Vec3 {
    Vec3::new((90.0 - rotation[2]).to_radians(), 0.0, -rotation[1].to_radians())
}

/// XYZ euler angles (X applied first) to a rotation matrix.
pub fn euler_xyz_to_mat3(euler: Vec3) -> Mat3 {
    Mat3::from_rotation_z(euler.z) * Mat3::from_rotation_y(euler.y) * Mat3::from_rotation_x(euler.x)
}

/// Rotation matrix to XYZ euler angles. Gimbal-locked matrices put the whole
/// heading into X.
pub fn mat3_to_euler_xyz(m: Mat3) -> Vec3 {
    let sin_y = (-m.x_axis.z).clamp(-1.0, 1.0);
    let y = sin_y.asin();
    if y.cos() > 1e-6 {
        let x = m.y_axis.z.atan2(m.z_axis.z);
        let z = m.x_axis.y.atan2(m.x_axis.x);
        Vec3::new(x, y, z)
    } else {
        let x = (-m.z_axis.y).atan2(m.y_axis.y);
        Vec3::new(x, y, 0.0)
    }
}

/// Rotation block of a morph sample. Column `j` holds source row `j`, copied
/// coordinate by coordinate.
pub fn morph_rotation_matrix(rows: [[f32; 3]; 3]) -> Mat4 {
    Mat4::from_cols_array_2d(&[
        [rows[0][0], rows[0][1], rows[0][2], 0.0],
        [rows[1][0], rows[1][1], rows[1][2], 0.0],
        [rows[2][0], rows[2][1], rows[2][2], 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// World transform of a morph sample: `T · (Rx(90°) · R) · S`.
/// The translation stays outermost: the position is already in scene axes
/// and must not pass through the axis correction a second time.
pub fn morph_world_matrix(
    rotation: [[f32; 3]; 3],
    position: [f32; 3],
    scale: [f32; 3],
    axis: AxisConvention,
) -> Mat4 {
    let axis_correction = Mat4::from_rotation_x(90f32.to_radians());
    let rotation = axis_correction * morph_rotation_matrix(rotation);
    let translation = Mat4::from_translation(axis.remap(position));
    let scale = Mat4::from_scale(Vec3::from_array(scale));
    translation * rotation * scale
}

/// Location, XYZ euler rotation and scale of an affine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

pub fn decompose(matrix: Mat4) -> Decomposed {
    let (scale, rotation, location) = matrix.to_scale_rotation_translation();
    Decomposed { location, rotation: mat3_to_euler_xyz(Mat3::from_quat(rotation)), scale }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4
    }

    fn approx_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).length() <= 1e-4
    }

    #[test]
    fn remap_swaps_up_axis() {
        for p in [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-4.5, 0.25, 1e6]] {
            assert_eq!(AxisConvention::NegY.remap(p), Vec3::new(p[0], -p[2], p[1]));
            assert_eq!(AxisConvention::PosY.remap(p), Vec3::new(p[0], p[2], p[1]));
        }
    }

    #[test]
    fn focal_length_round_trips_fov() {
        let sensor = 24.0;
        for focal in [12.0f32, 17.5, 35.0, 50.0, 135.0] {
            let fov = fov_for_focal_length(focal, sensor);
            let restored = focal_length(fov, false, sensor);
            assert!((restored - focal).abs() / focal < 1e-4, "{focal} -> {fov} -> {restored}");
        }
    }

    #[test]
    fn focal_length_matches_reference_values() {
        let expected = 0.5 / (70f32.to_radians() / 2.0).tan() * 24.0;
        assert!(approx(focal_length(70.0, false, 24.0), expected));
        let boosted = 0.5 / (1.1 * 70f32.to_radians() / 2.0).tan() * 24.0;
        assert!(approx(focal_length(70.0, true, 24.0), boosted));
        assert!(focal_length(70.0, true, 24.0) < focal_length(70.0, false, 24.0));
    }

    #[test]
    fn camera_angles_split_into_layers() {
        let angle = [70.0, 45.0, 10.0, 30.0];
        assert!(approx_vec3(
            camera_delta_euler(angle),
            Vec3::new(60f32.to_radians(), 0.0, (-190f32).to_radians())
        ));
        assert!(approx_vec3(camera_euler(angle), Vec3::new(0.0, 0.0, -45f32.to_radians())));
        assert!(approx_vec3(
            body_delta_euler([99.0, 20.0, 10.0]),
            Vec3::new(80f32.to_radians(), 0.0, -20f32.to_radians())
        ));
    }

    #[test]
    fn euler_conversion_round_trips() {
        for euler in [Vec3::new(0.3, -0.7, 1.2), Vec3::new(-2.0, 0.4, -3.0), Vec3::new(FRAC_PI_2, 0.0, 0.0)] {
            let restored = mat3_to_euler_xyz(euler_xyz_to_mat3(euler));
            let a = euler_xyz_to_mat3(euler);
            let b = euler_xyz_to_mat3(restored);
            assert!(a.abs_diff_eq(b, 1e-4), "{euler:?} -> {restored:?}");
        }
    }

    #[test]
    fn identity_morph_only_carries_axis_correction() {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let world = morph_world_matrix(identity, [0.0; 3], [1.0; 3], AxisConvention::NegY);
        let parts = decompose(world);
        assert!(approx_vec3(parts.location, Vec3::ZERO));
        assert!(approx_vec3(parts.rotation, Vec3::new(FRAC_PI_2, 0.0, 0.0)));
        assert!(approx_vec3(parts.scale, Vec3::ONE));
    }

    #[test]
    fn morph_translation_is_not_rotated() {
        // quarter turn around the game's up axis
        let rows = [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]];
        let world = morph_world_matrix(rows, [1.0, 2.0, 3.0], [2.0, 2.0, 2.0], AxisConvention::NegY);
        let parts = decompose(world);
        assert!(approx_vec3(parts.location, Vec3::new(1.0, -3.0, 2.0)));
        assert!(approx_vec3(parts.scale, Vec3::splat(2.0)));
    }

    #[test]
    fn morph_rotation_copies_rows_into_columns() {
        let rows = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let m = morph_rotation_matrix(rows);
        assert_eq!(m.x_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.z_axis.truncate(), Vec3::new(7.0, 8.0, 9.0));
        assert_eq!(m.w_axis, glam::Vec4::W);
    }
}
