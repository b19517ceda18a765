use crate::kernel::rotation_matrix;
use crate::pose::Pose;

/// Closed-form least-squares similarity transform mapping `src` onto `dst`.
///
/// Both point sets are centered, the rotation comes from the cross terms of
/// the centered covariance, and the isotropic scale from projecting the
/// rotated source onto the destination. Equivalent to the Procrustes/SVD
/// solution in two dimensions. Returns `None` for fewer than two pairs or a
/// degenerate source cloud.
pub fn fit_similarity(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Pose> {
    if src.len() < 2 || src.len() != dst.len() {
        return None;
    }
    let n = src.len() as f64;

    let mut src_mean = [0.0, 0.0];
    let mut dst_mean = [0.0, 0.0];
    for (a, b) in src.iter().zip(dst) {
        src_mean[0] += a[0];
        src_mean[1] += a[1];
        dst_mean[0] += b[0];
        dst_mean[1] += b[1];
    }
    src_mean = [src_mean[0] / n, src_mean[1] / n];
    dst_mean = [dst_mean[0] / n, dst_mean[1] / n];

    // With R = [[cos, sin], [-sin, cos]], maximizing sum(b . R a) over theta
    // gives theta = atan2(sum(ay*bx - ax*by), sum(a . b)).
    let mut dot = 0.0;
    let mut cross = 0.0;
    let mut src_norm = 0.0;
    for (a, b) in src.iter().zip(dst) {
        let ar = a[0] - src_mean[0];
        let ac = a[1] - src_mean[1];
        let br = b[0] - dst_mean[0];
        let bc = b[1] - dst_mean[1];
        dot += ar * br + ac * bc;
        cross += ac * br - ar * bc;
        src_norm += ar * ar + ac * ac;
    }
    if src_norm <= f64::EPSILON {
        return None;
    }

    let theta = cross.atan2(dot).to_degrees();
    let scale = (dot * theta.to_radians().cos() + cross * theta.to_radians().sin()) / src_norm;
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }

    let m = rotation_matrix(theta);
    let offset = [
        dst_mean[0] - scale * (m[0][0] * src_mean[0] + m[0][1] * src_mean[1]),
        dst_mean[1] - scale * (m[1][0] * src_mean[0] + m[1][1] * src_mean[1]),
    ];
    Some(Pose::new(theta, scale, offset))
}
