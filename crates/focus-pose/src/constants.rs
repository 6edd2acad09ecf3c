/// 计算基线所需的成功姿态帧数
pub const DEFAULT_CALIBRATION_FRAMES: usize = 10;

/// 专注判定阈值（度），三个轴的偏差都必须严格小于该值
pub const DEFAULT_FOCUS_THRESHOLD_DEG: f64 = 40.0;

/// 3D 参考人脸模型（毫米），顺序：鼻梁、下巴、左眼外角、右眼外角、左嘴角、右嘴角
pub const REFERENCE_FACE_MM: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -63.6, -12.5],
    [-43.3, 32.7, -26.0],
    [43.3, 32.7, -26.0],
    [-28.9, -28.9, -24.1],
    [28.9, -28.9, -24.1],
];

/// LM 迭代上限
pub const PNP_MAX_ITERATIONS: usize = 50;

/// 参数增量的相对收敛阈值
pub const PNP_STEP_EPSILON: f64 = 1e-10;

/// 合成人脸默认距离相机的深度（毫米）
pub const SYNTHETIC_FACE_DEPTH_MM: f64 = 600.0;
