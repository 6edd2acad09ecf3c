//! 人脸关键点集合
//!
//! 坐标按图像宽高归一化到 [0, 1]，索引遵循 478 点的 refined face-mesh 拓扑。

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::PoseError;

/// face-mesh 中姿态求解与虹膜跟踪用到的关键点索引
pub mod index {
    pub const NOSE_BRIDGE: usize = 1;
    pub const CHIN: usize = 152;
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const RIGHT_EYE_OUTER: usize = 263;
    pub const MOUTH_LEFT: usize = 61;
    pub const MOUTH_RIGHT: usize = 291;
    pub const LEFT_IRIS: usize = 468;
    pub const RIGHT_IRIS: usize = 473;

    /// 与参考模型点一一对应的 6 个关键点
    pub const POSE_POINTS: [usize; 6] = [
        NOSE_BRIDGE,
        CHIN,
        LEFT_EYE_OUTER,
        RIGHT_EYE_OUTER,
        MOUTH_LEFT,
        MOUTH_RIGHT,
    ];

    /// 完整 refined face-mesh 的点数
    pub const FACE_MESH_POINTS: usize = 478;
}

/// 单个归一化关键点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 按图像尺寸换算为像素坐标
    pub fn to_pixels(self, width: f64, height: f64) -> Point2<f64> {
        Point2::new(self.x * width, self.y * height)
    }
}

/// 一张人脸的关键点，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<LandmarkPoint>,
}

impl LandmarkSet {
    /// Smallest set that still holds every index the estimator reads.
    pub const REQUIRED_POINTS: usize = index::RIGHT_IRIS + 1;

    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<LandmarkPoint> {
        self.points.get(idx).copied()
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    /// Fails unless every index used for pose and iris tracking is present.
    pub fn ensure_complete(&self) -> Result<(), PoseError> {
        if self.points.len() < Self::REQUIRED_POINTS {
            return Err(PoseError::InsufficientLandmarks {
                found: self.points.len(),
                required: Self::REQUIRED_POINTS,
            });
        }
        Ok(())
    }

    /// The six pose correspondences in pixel space, in reference-model order.
    pub fn pose_points(&self, width: f64, height: f64) -> Result<[Point2<f64>; 6], PoseError> {
        self.ensure_complete()?;
        Ok(index::POSE_POINTS.map(|idx| self.points[idx].to_pixels(width, height)))
    }
}

impl FromIterator<LandmarkPoint> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = LandmarkPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
