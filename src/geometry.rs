//! Geometric feature extraction.
//!
//! Converts tuples of particle positions into the scalar feature a custom
//! force's formula is evaluated against (distance, angle, dihedral), plus
//! the analytic gradient of that feature with respect to each involved
//! position. Degenerate geometries (zero-length edges, colinear triples)
//! are not corrected; the resulting NaN/Inf propagates to the caller.

use ultraviolet::DVec3;

/// Euclidean distance between two particles and its gradient: the unit
/// separation vector, opposite sign at each end.
pub fn bond(p0: DVec3, p1: DVec3) -> (f64, [DVec3; 2]) {
    let d = p1 - p0;
    let r = d.mag();
    let unit = d / r;
    (r, [-unit, unit])
}

/// Angle at `p1` between the edges to `p0` and `p2`, with the standard
/// perpendicular-to-edge gradient formulas. The cosine is clamped to
/// [-1, 1] against roundoff only; genuinely degenerate edges yield NaN.
pub fn angle(p0: DVec3, p1: DVec3, p2: DVec3) -> (f64, [DVec3; 3]) {
    let u = p0 - p1;
    let v = p2 - p1;
    let cos_theta = (u.dot(v) / (u.mag() * v.mag())).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();

    let c = u.cross(v);
    let c_mag = c.mag();
    let g0 = u.cross(c) / (u.mag_sq() * c_mag);
    let g2 = c.cross(v) / (v.mag_sq() * c_mag);
    let g1 = -(g0 + g2);
    (theta, [g0, g1, g2])
}

/// Signed dihedral angle about the middle bond `p1-p2`, quadrant resolved
/// by the signed cross-product test, with the four-site gradient formulas.
/// The gradients sum to zero, and so do their torques.
pub fn dihedral(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3) -> (f64, [DVec3; 4]) {
    let b1 = p1 - p0;
    let b2 = p2 - p1;
    let b3 = p3 - p2;
    let n1 = b1.cross(b2);
    let n2 = b2.cross(b3);
    let b2_mag = b2.mag();

    let phi = (n1.cross(n2).dot(b2) / b2_mag).atan2(n1.dot(n2));

    let g0 = n1 * (-b2_mag / n1.mag_sq());
    let g3 = n2 * (b2_mag / n2.mag_sq());
    let ca = b1.dot(b2) / b2.mag_sq();
    let cb = b3.dot(b2) / b2.mag_sq();
    let g1 = g0 * (ca - 1.0) - g3 * cb;
    let g2 = g3 * (cb - 1.0) - g0 * ca;
    (phi, [g0, g1, g2, g3])
}
