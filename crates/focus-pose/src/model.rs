//! 3D 参考人脸模型与针孔相机模型

use nalgebra::{Point2, Point3, Rotation3, Vector3};

use crate::constants::REFERENCE_FACE_MM;
use crate::error::PoseError;

/// 以鼻梁为原点的人脸坐标系中的 6 个参考点（毫米）
#[derive(Debug, Clone, PartialEq)]
pub struct FaceModel {
    points: [Point3<f64>; 6],
}

impl Default for FaceModel {
    fn default() -> Self {
        Self::new(REFERENCE_FACE_MM)
    }
}

impl FaceModel {
    pub fn new(points: [[f64; 3]; 6]) -> Self {
        Self {
            points: points.map(|[x, y, z]| Point3::new(x, y, z)),
        }
    }

    pub fn points(&self) -> &[Point3<f64>; 6] {
        &self.points
    }

    /// 把模型放到相机坐标系中并投影为像素坐标
    ///
    /// 任一点落在相机后方时返回 `None`。
    pub fn render(
        &self,
        camera: &CameraIntrinsics,
        rotation: &Rotation3<f64>,
        translation: &Vector3<f64>,
    ) -> Option<[Point2<f64>; 6]> {
        let mut out = [Point2::origin(); 6];
        for (slot, point) in out.iter_mut().zip(self.points.iter()) {
            *slot = camera.project(&(rotation.transform_point(point) + *translation))?;
        }
        Some(out)
    }
}

/// Pinhole camera with zero skew and no lens distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Focal length equals the image width, principal point at the centre.
    pub fn for_image(width: u32, height: u32) -> Result<Self, PoseError> {
        if width == 0 || height == 0 {
            return Err(PoseError::InvalidImageSize { width, height });
        }
        let w = f64::from(width);
        let h = f64::from(height);
        Ok(Self {
            fx: w,
            fy: w,
            cx: w / 2.0,
            cy: h / 2.0,
        })
    }

    pub fn project(&self, camera_point: &Point3<f64>) -> Option<Point2<f64>> {
        if camera_point.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx * camera_point.x / camera_point.z + self.cx,
            self.fy * camera_point.y / camera_point.z + self.cy,
        ))
    }

    /// Pixel to normalised image-plane coordinates (inverse of the intrinsics).
    pub fn normalize(&self, pixel: &Point2<f64>) -> Point2<f64> {
        Point2::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn camera_uses_width_as_focal_length() {
        let cam = CameraIntrinsics::for_image(640, 480).unwrap();
        assert_eq!(cam.fx, 640.0);
        assert_eq!(cam.fy, 640.0);
        assert_eq!(cam.cx, 320.0);
        assert_eq!(cam.cy, 240.0);
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        assert!(matches!(
            CameraIntrinsics::for_image(0, 480),
            Err(PoseError::InvalidImageSize { .. })
        ));
    }

    #[test]
    fn nose_projects_to_principal_point_when_centred() {
        let cam = CameraIntrinsics::for_image(640, 480).unwrap();
        let model = FaceModel::default();
        let pixels = model
            .render(&cam, &Rotation3::identity(), &Vector3::new(0.0, 0.0, 600.0))
            .unwrap();
        assert_relative_eq!(pixels[0].x, 320.0);
        assert_relative_eq!(pixels[0].y, 240.0);
        // model y points up, image y points down
        assert!(pixels[1].y < pixels[0].y);
    }

    #[test]
    fn points_behind_camera_do_not_render() {
        let cam = CameraIntrinsics::for_image(640, 480).unwrap();
        let model = FaceModel::default();
        assert!(model
            .render(&cam, &Rotation3::identity(), &Vector3::new(0.0, 0.0, -600.0))
            .is_none());
    }

    #[test]
    fn normalize_inverts_projection() {
        let cam = CameraIntrinsics::for_image(800, 600).unwrap();
        let p = cam.project(&Point3::new(12.0, -7.0, 500.0)).unwrap();
        let n = cam.normalize(&p);
        assert_relative_eq!(n.x, 12.0 / 500.0, epsilon = 1e-12);
        assert_relative_eq!(n.y, -7.0 / 500.0, epsilon = 1e-12);
    }
}
