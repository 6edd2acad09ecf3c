//! 校准 / 专注度分类状态机
//!
//! 每个连接一个实例。前 N 次成功的姿态估计取平均作为基线，之后每帧与
//! 基线比较：三个轴的绝对偏差都严格小于阈值为 "Focused"，否则 "Not Focused"。
//! 检测失败不会消耗校准名额，由调用方直接回复状态，不经过本状态机。

use std::fmt;

use serde::Serialize;

use crate::constants::{DEFAULT_CALIBRATION_FRAMES, DEFAULT_FOCUS_THRESHOLD_DEG};
use crate::euler::PoseEstimate;

/// 每帧回复给客户端的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusStatus {
    PoseNotDetected,
    Calibrating,
    Focused,
    NotFocused,
    /// 输入格式错误，内容为 "Error: " 之后的描述
    Error(String),
}

impl FocusStatus {
    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error(detail.into())
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Self::Focused | Self::NotFocused)
    }
}

impl fmt::Display for FocusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoseNotDetected => f.write_str("Pose Not Detected"),
            Self::Calibrating => f.write_str("Calculating Face Angles"),
            Self::Focused => f.write_str("Focused"),
            Self::NotFocused => f.write_str("Not Focused"),
            Self::Error(detail) => write!(f, "Error: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub calibration_frames: usize,
    pub threshold_deg: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            calibration_frames: DEFAULT_CALIBRATION_FRAMES,
            threshold_deg: DEFAULT_FOCUS_THRESHOLD_DEG,
        }
    }
}

/// 个人化的中立头部姿态，计算后不再改变
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Baseline {
    /// 逐分量算术平均，采用增量形式：相同样本的均值与样本完全相等
    pub fn from_samples(samples: &[PoseEstimate]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut mean = PoseEstimate::default();
        for (i, s) in samples.iter().enumerate() {
            let k = (i + 1) as f64;
            mean.pitch += (s.pitch - mean.pitch) / k;
            mean.yaw += (s.yaw - mean.yaw) / k;
            mean.roll += (s.roll - mean.roll) / k;
        }
        Some(Self {
            pitch: mean.pitch,
            yaw: mean.yaw,
            roll: mean.roll,
        })
    }

    /// 各轴绝对偏差（度）
    pub fn deviation(&self, pose: &PoseEstimate) -> PoseEstimate {
        PoseEstimate {
            pitch: (pose.pitch - self.pitch).abs(),
            yaw: (pose.yaw - self.yaw).abs(),
            roll: (pose.roll - self.roll).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Calibrating { remaining: usize },
    Calibrated,
}

#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: SessionConfig,
    remaining: usize,
    samples: Vec<PoseEstimate>,
    baseline: Option<Baseline>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl CalibrationSession {
    pub fn new(config: SessionConfig) -> Self {
        let frames = config.calibration_frames.max(1);
        Self {
            config: SessionConfig {
                calibration_frames: frames,
                ..config
            },
            remaining: frames,
            samples: Vec::with_capacity(frames),
            baseline: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn samples(&self) -> &[PoseEstimate] {
        &self.samples
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.baseline.is_some() {
            SessionPhase::Calibrated
        } else {
            SessionPhase::Calibrating {
                remaining: self.remaining,
            }
        }
    }

    /// 处理一次成功的姿态估计
    ///
    /// 校准阶段返回 `Calibrating`（包括刚好凑满样本、生成基线的那一帧），
    /// 之后返回分类结果。
    pub fn observe(&mut self, pose: PoseEstimate) -> FocusStatus {
        if let Some(status) = self.classify(&pose) {
            return status;
        }

        self.remaining -= 1;
        self.samples.push(pose);
        if self.remaining == 0 {
            self.baseline = Baseline::from_samples(&self.samples);
            self.samples.clear();
        }
        FocusStatus::Calibrating
    }

    /// 与基线比较；基线尚未建立时返回 `None`
    pub fn classify(&self, pose: &PoseEstimate) -> Option<FocusStatus> {
        let baseline = self.baseline.as_ref()?;
        let dev = baseline.deviation(pose);
        let limit = self.config.threshold_deg;
        if dev.pitch < limit && dev.yaw < limit && dev.roll < limit {
            Some(FocusStatus::Focused)
        } else {
            Some(FocusStatus::NotFocused)
        }
    }
}
