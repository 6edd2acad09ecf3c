//! 头部姿态与专注度判定核心库
//!
//! 本库不做任何 I/O，只负责把一帧人脸关键点变成稳定的 pitch/yaw/roll，
//! 并在每个连接内完成基线校准与专注度分类。
//!
//! ## 模块
//! - `landmarks`: 归一化人脸关键点集合与 face-mesh 索引
//! - `model`: 3D 参考人脸模型与针孔相机
//! - `pnp`: 透视 n 点求解 (DLT 初值 + Levenberg-Marquardt)
//! - `euler`: 旋转矩阵的 RQ 分解，得到欧拉角
//! - `estimator`: 由关键点到姿态估计的完整流程
//! - `session`: 校准 / 分类状态机

pub mod constants;
pub mod error;
pub mod estimator;
pub mod euler;
pub mod landmarks;
pub mod model;
pub mod pnp;
pub mod session;

// 重新导出核心类型，方便外部使用
pub use error::PoseError;
pub use estimator::{IrisOffsets, PoseEstimator, PoseObservation};
pub use euler::PoseEstimate;
pub use landmarks::{LandmarkPoint, LandmarkSet};
pub use model::{CameraIntrinsics, FaceModel};
pub use session::{Baseline, CalibrationSession, FocusStatus, SessionConfig, SessionPhase};
