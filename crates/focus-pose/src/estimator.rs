//! 由人脸关键点估计头部姿态

use nalgebra::{Point2, Vector3};
use serde::Serialize;

use crate::constants::SYNTHETIC_FACE_DEPTH_MM;
use crate::error::PoseError;
use crate::euler::PoseEstimate;
use crate::landmarks::{index, LandmarkPoint, LandmarkSet};
use crate::model::{CameraIntrinsics, FaceModel};
use crate::pnp::solve_pnp;

/// 虹膜相对鼻梁的水平偏移（像素）
///
/// 目前只作为辅助信号输出，不参与专注度判定。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IrisOffsets {
    pub left: f64,
    pub right: f64,
}

impl IrisOffsets {
    pub fn mean(&self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

/// 单帧姿态估计结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseObservation {
    pub pose: PoseEstimate,
    pub iris: IrisOffsets,
    /// 旋转向量（弧度）
    pub rotation_vector: [f64; 3],
    /// 平移（毫米，相机坐标系）
    pub translation: [f64; 3],
    pub reprojection_rms: f64,
}

/// 姿态估计器，无内部可变状态，可在多个会话间共享
#[derive(Debug, Clone, Default)]
pub struct PoseEstimator {
    model: FaceModel,
}

impl PoseEstimator {
    pub fn new(model: FaceModel) -> Self {
        Self { model }
    }

    /// 估计一帧的头部姿态
    ///
    /// # 参数
    /// - `landmarks`: 归一化关键点
    /// - `width`/`height`: 图像像素尺寸，用于还原像素坐标与构造相机
    pub fn estimate(
        &self,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) -> Result<PoseObservation, PoseError> {
        let camera = CameraIntrinsics::for_image(width, height)?;
        let w = f64::from(width);
        let h = f64::from(height);

        let image_points = landmarks.pose_points(w, h)?;
        let solution = solve_pnp(self.model.points(), &image_points, &camera)?;

        let pose = PoseEstimate::from_rotation(&solution.rotation);
        if !pose.is_finite() {
            return Err(PoseError::NotConverged("non-finite euler angles"));
        }

        let iris = iris_offsets(landmarks, w, h)?;
        let rvec = solution.rotation_vector();

        Ok(PoseObservation {
            pose,
            iris,
            rotation_vector: [rvec.x, rvec.y, rvec.z],
            translation: [
                solution.translation.x,
                solution.translation.y,
                solution.translation.z,
            ],
            reprojection_rms: solution.rms_error,
        })
    }

    /// 按给定姿态渲染一张完整的 face-mesh 关键点集合
    ///
    /// 模型正对相机、鼻梁在画面中心、距离固定。非姿态点都放在鼻梁处，
    /// 虹膜放在眼外角向鼻梁方向三成的位置。人脸落到相机后方时返回 `None`。
    pub fn synthesize(&self, pose: PoseEstimate, width: u32, height: u32) -> Option<LandmarkSet> {
        let camera = CameraIntrinsics::for_image(width, height).ok()?;
        let w = f64::from(width);
        let h = f64::from(height);

        let pixels = self.model.render(
            &camera,
            &pose.to_rotation(),
            &Vector3::new(0.0, 0.0, SYNTHETIC_FACE_DEPTH_MM),
        )?;
        let normalize = |p: Point2<f64>| LandmarkPoint::new(p.x / w, p.y / h);

        let nose = normalize(pixels[0]);
        let mut points = vec![nose; index::FACE_MESH_POINTS];
        for (slot, pixel) in index::POSE_POINTS.iter().zip(pixels) {
            points[*slot] = normalize(pixel);
        }

        let toward_nose = |corner: LandmarkPoint| {
            LandmarkPoint::new(
                corner.x + (nose.x - corner.x) * 0.3,
                corner.y + (nose.y - corner.y) * 0.3,
            )
        };
        points[index::LEFT_IRIS] = toward_nose(points[index::LEFT_EYE_OUTER]);
        points[index::RIGHT_IRIS] = toward_nose(points[index::RIGHT_EYE_OUTER]);

        Some(LandmarkSet::new(points))
    }
}

fn iris_offsets(landmarks: &LandmarkSet, w: f64, h: f64) -> Result<IrisOffsets, PoseError> {
    let at = |idx: usize| {
        landmarks
            .get(idx)
            .map(|p| p.to_pixels(w, h).x)
            .ok_or(PoseError::InsufficientLandmarks {
                found: landmarks.len(),
                required: LandmarkSet::REQUIRED_POINTS,
            })
    };
    let nose = at(index::NOSE_BRIDGE)?;
    Ok(IrisOffsets {
        left: at(index::LEFT_IRIS)? - nose,
        right: at(index::RIGHT_IRIS)? - nose,
    })
}
