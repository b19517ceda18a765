use crate::kernel::rotation_matrix;

/// Similarity transform from sequencer (r, c) coordinates to image pixels:
/// `q = scale * R(theta) * p + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Rotation in degrees.
    pub theta: f64,
    /// Isotropic scale, pixels per sequencer unit.
    pub scale: f64,
    /// Translation in (r, c) pixels.
    pub offset: [f64; 2],
}

impl Pose {
    pub fn new(theta: f64, scale: f64, offset: [f64; 2]) -> Self {
        Self {
            theta,
            scale,
            offset,
        }
    }

    /// Map a sequencer-space point into image pixels.
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        let m = rotation_matrix(self.theta);
        [
            self.scale * (m[0][0] * p[0] + m[0][1] * p[1]) + self.offset[0],
            self.scale * (m[1][0] * p[0] + m[1][1] * p[1]) + self.offset[1],
        ]
    }

    /// Map an image-pixel point back into sequencer space.
    pub fn invert(&self, q: [f64; 2]) -> [f64; 2] {
        let m = rotation_matrix(self.theta);
        let dr = (q[0] - self.offset[0]) / self.scale;
        let dc = (q[1] - self.offset[1]) / self.scale;
        // Transpose of an orthonormal matrix is its inverse.
        [m[0][0] * dr + m[1][0] * dc, m[0][1] * dr + m[1][1] * dc]
    }
}
