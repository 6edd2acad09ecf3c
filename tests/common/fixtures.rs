use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use focus_pose::PoseEstimate;
use image::{ImageFormat, RgbImage};

/// A blank PNG camera frame, base64 encoded.
pub fn png_frame(width: u32, height: u32) -> String {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    STANDARD.encode(buf.into_inner())
}

pub fn data_url_frame(width: u32, height: u32) -> String {
    format!("data:image/png;base64,{}", png_frame(width, height))
}

pub fn pose(pitch: f64, yaw: f64, roll: f64) -> Option<PoseEstimate> {
    Some(PoseEstimate::new(pitch, yaw, roll))
}
