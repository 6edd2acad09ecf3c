//! 旋转矩阵的 RQ 分解
//!
//! 依次用绕 x、y、z 轴的 Givens 旋转把矩阵化为上三角，三个 Givens 因子
//! 的角度即为 (pitch, yaw, roll)。对 R = Rz(roll)·Ry(yaw)·Rx(pitch)，
//! 角度都在 (-90°, 90°) 内时分解结果与输入角度一致。

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// 头部姿态（度）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl PoseEstimate {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn from_rotation(rotation: &Rotation3<f64>) -> Self {
        rq_decompose(rotation.matrix()).angles
    }

    /// Rz(roll) · Ry(yaw) · Rx(pitch)
    pub fn to_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.roll.to_radians())
            * Rotation3::from_axis_angle(&Vector3::y_axis(), self.yaw.to_radians())
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.pitch.to_radians())
    }

    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// M · Qx · Qy · Qz = R, R upper triangular
#[derive(Debug, Clone, PartialEq)]
pub struct RqDecomposition {
    pub angles: PoseEstimate,
    pub upper: Matrix3<f64>,
    pub qx: Matrix3<f64>,
    pub qy: Matrix3<f64>,
    pub qz: Matrix3<f64>,
}

pub fn rq_decompose(m: &Matrix3<f64>) -> RqDecomposition {
    // Qx 消去 (2,1)
    let (s, c) = givens(m[(2, 1)], m[(2, 2)]);
    let mut qx = Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c);
    let r = m * qx;

    // Qy 消去 (2,0)
    let (s, c) = givens(-r[(2, 0)], r[(2, 2)]);
    let mut qy = Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c);
    let r = r * qy;

    // Qz 消去 (1,0)
    let (s, c) = givens(r[(1, 0)], r[(1, 1)]);
    let mut qz = Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0);
    let mut upper = r * qz;

    // 180° 歧义：让上三角因子前两个对角元为正
    if upper[(0, 0)] < 0.0 {
        if upper[(1, 1)] < 0.0 {
            let dz = Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0));
            upper *= dz;
            qz *= dz;
        } else {
            let dy = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0));
            upper *= dy;
            qz = qz.transpose();
            qy *= dy;
        }
    } else if upper[(1, 1)] < 0.0 {
        let dx = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0));
        upper *= dx;
        qz = qz.transpose();
        qy = qy.transpose();
        qx *= dx;
    }

    let angles = PoseEstimate {
        pitch: signed_angle(qx[(1, 1)], qx[(1, 2)]),
        yaw: signed_angle(qy[(0, 0)], qy[(2, 0)]),
        roll: signed_angle(qz[(0, 0)], qz[(0, 1)]),
    };

    RqDecomposition {
        angles,
        upper,
        qx,
        qy,
        qz,
    }
}

/// (sin, cos) of the rotation that zeroes `s_raw` against `c_raw`.
fn givens(s_raw: f64, c_raw: f64) -> (f64, f64) {
    let norm = (s_raw * s_raw + c_raw * c_raw).sqrt();
    if norm <= f64::EPSILON {
        return (0.0, 1.0);
    }
    (s_raw / norm, c_raw / norm)
}

fn signed_angle(cos: f64, sin_sign: f64) -> f64 {
    let angle = cos.clamp(-1.0, 1.0).acos().to_degrees();
    if sin_sign >= 0.0 {
        angle
    } else {
        -angle
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn identity_has_zero_angles() {
        let angles = PoseEstimate::from_rotation(&Rotation3::identity());
        assert_eq!(angles, PoseEstimate::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn single_axis_rotations_map_to_their_angle() {
        let pitch = PoseEstimate::new(30.0, 0.0, 0.0).to_rotation();
        assert_relative_eq!(PoseEstimate::from_rotation(&pitch).pitch, 30.0, epsilon = 1e-9);

        let yaw = PoseEstimate::new(0.0, -25.0, 0.0).to_rotation();
        assert_relative_eq!(PoseEstimate::from_rotation(&yaw).yaw, -25.0, epsilon = 1e-9);

        let roll = PoseEstimate::new(0.0, 0.0, 12.5).to_rotation();
        assert_relative_eq!(PoseEstimate::from_rotation(&roll).roll, 12.5, epsilon = 1e-9);
    }

    #[test]
    fn composite_rotation_round_trips() {
        let pose = PoseEstimate::new(-20.0, 35.0, 10.0);
        let back = PoseEstimate::from_rotation(&pose.to_rotation());
        assert_relative_eq!(back.pitch, pose.pitch, epsilon = 1e-9);
        assert_relative_eq!(back.yaw, pose.yaw, epsilon = 1e-9);
        assert_relative_eq!(back.roll, pose.roll, epsilon = 1e-9);
    }

    #[test]
    fn factorisation_reconstructs_matrix() {
        let m = *PoseEstimate::new(170.0, -30.0, 95.0).to_rotation().matrix();
        let d = rq_decompose(&m);
        let q = (d.qx * d.qy * d.qz).transpose();
        assert_relative_eq!(d.upper * q, m, epsilon = 1e-9);
        assert!(d.upper[(0, 0)] > 0.0);
        assert!(d.upper[(1, 1)] > 0.0);
    }

    #[test]
    fn face_turned_upside_down_reads_as_half_turn_pitch() {
        let flipped = Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI);
        let angles = PoseEstimate::from_rotation(&flipped);
        assert_relative_eq!(angles.pitch.abs(), 180.0, epsilon = 1e-6);
        assert_relative_eq!(angles.yaw, 0.0, epsilon = 1e-6);
        assert_relative_eq!(angles.roll, 0.0, epsilon = 1e-6);
    }
}
