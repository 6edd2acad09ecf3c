//! 透视 n 点 (PnP) 求解
//!
//! 非共面参考点先用归一化 DLT 求出 [R|t] 初值，再以 Levenberg-Marquardt
//! 最小化像素重投影误差。参数化为旋转向量 (Rodrigues) 加平移。

use nalgebra::{
    DMatrix, DVector, Dyn, Matrix3, Matrix3x4, Matrix4, Matrix6, OMatrix, Point2, Point3, Rotation3,
    Vector3, Vector6, U6,
};

use crate::constants::{PNP_MAX_ITERATIONS, PNP_STEP_EPSILON};
use crate::error::PoseError;
use crate::model::CameraIntrinsics;

const MIN_CORRESPONDENCES: usize = 6;
const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING_RETRIES: usize = 10;

/// Rigid transform taking model coordinates into the camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PnpSolution {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
    /// Root-mean-square reprojection error in pixels.
    pub rms_error: f64,
    pub iterations: usize,
}

impl PnpSolution {
    /// Rotation as an axis-angle vector, radians.
    pub fn rotation_vector(&self) -> Vector3<f64> {
        self.rotation.scaled_axis()
    }
}

pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraIntrinsics,
) -> Result<PnpSolution, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::Degenerate("object and image point counts differ"));
    }
    if object.len() < MIN_CORRESPONDENCES {
        return Err(PoseError::Degenerate("fewer than six correspondences"));
    }
    let frame = ObjectFrame::of(object)?;
    let first = image[0];
    if image
        .iter()
        .all(|p| (*p - first).norm() <= f64::EPSILON)
    {
        return Err(PoseError::Degenerate("image points coincide"));
    }

    let starts = match dlt_initial_pose(object, image, camera, &frame) {
        Ok(pose) => vec![pose],
        Err(_) => frontal_priors(image, camera, &frame),
    };

    let mut best: Option<PnpSolution> = None;
    let mut last_err = PoseError::NotConverged("no usable starting pose");
    for (rotation, translation) in starts {
        match refine(object, image, camera, rotation, translation) {
            Ok(solution) => {
                if best
                    .as_ref()
                    .map_or(true, |b| solution.rms_error < b.rms_error)
                {
                    best = Some(solution);
                }
            }
            Err(e) => last_err = e,
        }
    }
    best.ok_or(last_err)
}

/// Centroid and spread of the object points.
struct ObjectFrame {
    centroid: Vector3<f64>,
    mean_dist: f64,
    span: f64,
}

impl ObjectFrame {
    fn of(object: &[Point3<f64>]) -> Result<Self, PoseError> {
        let count = object.len() as f64;
        let centroid = object
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / count;
        let mean_dist = object
            .iter()
            .map(|p| (p.coords - centroid).norm())
            .sum::<f64>()
            / count;
        if mean_dist.is_nan() || mean_dist <= f64::EPSILON {
            return Err(PoseError::Degenerate("object points coincide"));
        }
        let span = object
            .iter()
            .map(|p| (p.coords - centroid).norm())
            .fold(0.0_f64, f64::max);
        Ok(Self {
            centroid,
            mean_dist,
            span,
        })
    }
}

/// Weak-perspective starting poses for when DLT has no usable answer: the
/// face seen upright and seen with the model's y axis flipped onto image y.
fn frontal_priors(
    image: &[Point2<f64>],
    camera: &CameraIntrinsics,
    frame: &ObjectFrame,
) -> Vec<(Rotation3<f64>, Vector3<f64>)> {
    let count = image.len() as f64;
    let centre = image
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p.x, p.y, 0.0))
        / count;
    let image_span = image
        .iter()
        .map(|p| (Vector3::new(p.x, p.y, 0.0) - centre).norm())
        .fold(0.0_f64, f64::max);
    if image_span.is_nan() || image_span <= f64::EPSILON {
        return Vec::new();
    }

    let depth = camera.fx * frame.span / image_span;
    let anchor = camera.normalize(&Point2::new(centre.x, centre.y));
    let target = Vector3::new(anchor.x * depth, anchor.y * depth, depth);

    [
        Rotation3::identity(),
        Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI),
    ]
    .into_iter()
    .map(|r| (r, target - r * frame.centroid))
    .collect()
}

fn dlt_initial_pose(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraIntrinsics,
    frame: &ObjectFrame,
) -> Result<(Rotation3<f64>, Vector3<f64>), PoseError> {
    let n = object.len();
    let centroid = frame.centroid;
    let scale = 3.0_f64.sqrt() / frame.mean_dist;

    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (obj, px)) in object.iter().zip(image).enumerate() {
        let x = (obj.coords - centroid) * scale;
        let h = [x.x, x.y, x.z, 1.0];
        let uv = camera.normalize(px);
        for (k, &hk) in h.iter().enumerate() {
            a[(2 * i, k)] = hk;
            a[(2 * i, 8 + k)] = -uv.x * hk;
            a[(2 * i + 1, 4 + k)] = hk;
            a[(2 * i + 1, 8 + k)] = -uv.y * hk;
        }
    }

    let eigen = a.tr_mul(&a).symmetric_eigen();
    let null = eigen.eigenvectors.column(eigen.eigenvalues.imin());
    let normalized = Matrix3x4::from_fn(|r, c| null[r * 4 + c]);

    // undo the Hartley normalisation of the object points
    let mut denorm = Matrix4::<f64>::identity() * scale;
    denorm[(3, 3)] = 1.0;
    denorm[(0, 3)] = -scale * centroid.x;
    denorm[(1, 3)] = -scale * centroid.y;
    denorm[(2, 3)] = -scale * centroid.z;
    let projection = normalized * denorm;

    let mut m: Matrix3<f64> = projection.fixed_view::<3, 3>(0, 0).into_owned();
    let mut t: Vector3<f64> = projection.column(3).into_owned();

    let depth_sum: f64 = object.iter().map(|o| (m * o.coords + t).z).sum();
    if !depth_sum.is_finite() || depth_sum == 0.0 {
        return Err(PoseError::Degenerate("DLT projection has no depth"));
    }
    if depth_sum < 0.0 {
        m = -m;
        t = -t;
    }

    let svd = m.svd(true, true);
    let u = svd.u.ok_or(PoseError::Degenerate("SVD of DLT rotation failed"))?;
    let v_t = svd
        .v_t
        .ok_or(PoseError::Degenerate("SVD of DLT rotation failed"))?;
    let r = u * v_t;
    if r.determinant() < 0.0 {
        return Err(PoseError::Degenerate("DLT rotation is a reflection"));
    }
    let s = svd.singular_values.mean();
    if s.is_nan() || s <= f64::EPSILON {
        return Err(PoseError::Degenerate("DLT rotation has zero scale"));
    }

    Ok((Rotation3::from_matrix_unchecked(r), t / s))
}

fn refine(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraIntrinsics,
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
) -> Result<PnpSolution, PoseError> {
    let problem = Reprojection {
        object,
        image,
        camera,
    };

    let mut params = pack(&rotation, &translation);
    let mut residual = problem
        .residuals(&params)
        .ok_or(PoseError::NotConverged("initial pose puts the face behind the camera"))?;
    let mut cost = residual.norm_squared();
    let mut lambda = INITIAL_DAMPING;
    let mut iterations = 0;

    while iterations < PNP_MAX_ITERATIONS {
        iterations += 1;

        let jac = problem
            .jacobian(&params)
            .ok_or(PoseError::NotConverged("jacobian left the valid region"))?;
        let jtj: Matrix6<f64> = jac.tr_mul(&jac);
        let gradient: Vector6<f64> = jac.tr_mul(&residual);
        if gradient.amax() < f64::EPSILON {
            break;
        }

        let mut step = None;
        for _ in 0..MAX_DAMPING_RETRIES {
            let mut damped = jtj;
            for d in 0..6 {
                damped[(d, d)] += lambda * jtj[(d, d)].max(f64::EPSILON);
            }
            if let Some(chol) = damped.cholesky() {
                let delta = chol.solve(&(-gradient));
                let candidate = params + delta;
                if let Some(r) = problem.residuals(&candidate) {
                    let candidate_cost = r.norm_squared();
                    if candidate_cost < cost {
                        params = candidate;
                        residual = r;
                        cost = candidate_cost;
                        lambda = (lambda / 10.0).max(1e-12);
                        step = Some(delta.norm());
                        break;
                    }
                }
            }
            lambda *= 10.0;
        }

        match step {
            Some(norm) if norm > PNP_STEP_EPSILON * (params.norm() + PNP_STEP_EPSILON) => {}
            _ => break,
        }
    }

    if !params.iter().all(|v| v.is_finite()) || !cost.is_finite() {
        return Err(PoseError::NotConverged("non-finite pose"));
    }

    let (rotation, translation) = unpack(&params);
    Ok(PnpSolution {
        rotation,
        translation,
        rms_error: (cost / object.len() as f64).sqrt(),
        iterations,
    })
}

struct Reprojection<'a> {
    object: &'a [Point3<f64>],
    image: &'a [Point2<f64>],
    camera: &'a CameraIntrinsics,
}

impl Reprojection<'_> {
    /// Stacked (u, v) pixel residuals; `None` once any point falls behind the camera.
    fn residuals(&self, params: &Vector6<f64>) -> Option<DVector<f64>> {
        let (rotation, translation) = unpack(params);
        let mut out = DVector::zeros(2 * self.object.len());
        for (i, (obj, px)) in self.object.iter().zip(self.image).enumerate() {
            let projected = self
                .camera
                .project(&(rotation.transform_point(obj) + translation))?;
            out[2 * i] = projected.x - px.x;
            out[2 * i + 1] = projected.y - px.y;
        }
        Some(out)
    }

    /// Central-difference jacobian of the residuals.
    fn jacobian(&self, params: &Vector6<f64>) -> Option<OMatrix<f64, Dyn, U6>> {
        let mut jac = OMatrix::<f64, Dyn, U6>::zeros(2 * self.object.len());
        for k in 0..6 {
            let h = 1e-6 * params[k].abs().max(1.0);
            let mut forward = *params;
            forward[k] += h;
            let mut backward = *params;
            backward[k] -= h;
            let column = (self.residuals(&forward)? - self.residuals(&backward)?) / (2.0 * h);
            jac.set_column(k, &column);
        }
        Some(jac)
    }
}

fn pack(rotation: &Rotation3<f64>, translation: &Vector3<f64>) -> Vector6<f64> {
    let rvec = rotation.scaled_axis();
    Vector6::new(
        rvec.x,
        rvec.y,
        rvec.z,
        translation.x,
        translation.y,
        translation.z,
    )
}

fn unpack(params: &Vector6<f64>) -> (Rotation3<f64>, Vector3<f64>) {
    (
        Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2])),
        Vector3::new(params[3], params[4], params[5]),
    )
}
