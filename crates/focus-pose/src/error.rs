use thiserror::Error;

/// Reasons a landmark set could not be turned into a head pose.
///
/// Every variant collapses to "Pose Not Detected" at the session level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    #[error("landmark set has {found} points, need at least {required}")]
    InsufficientLandmarks { found: usize, required: usize },

    #[error("image size {width}x{height} cannot back a camera model")]
    InvalidImageSize { width: u32, height: u32 },

    #[error("point correspondences are degenerate: {0}")]
    Degenerate(&'static str),

    #[error("pose solver did not converge: {0}")]
    NotConverged(&'static str),
}
