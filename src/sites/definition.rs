// sites/definition.rs
// The four position-construction variants and their force adjoints

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use ultraviolet::{DMat3, DVec3};

/// How a massless particle's position is derived from 2–3 defining real
/// particles. The variant set is closed: it is fixed by the
/// position-construction algebra, and force redistribution is the exact
/// adjoint (transposed Jacobian) of each formula.
///
/// No variant asserts anything about its weights. Averaging weights usually
/// sum to one and frame weights to zero, but that is a property of how a
/// caller chooses to use the formula, not an invariant of the formula
/// itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum VirtualSite {
    /// position = w1·p1 + w2·p2
    TwoParticleAverage {
        p1: usize,
        p2: usize,
        w1: f64,
        w2: f64,
    },
    /// position = w1·p1 + w2·p2 + w3·p3
    ThreeParticleAverage {
        p1: usize,
        p2: usize,
        p3: usize,
        w1: f64,
        w2: f64,
        w3: f64,
    },
    /// With e12 = p2−p1 and e13 = p3−p1:
    /// position = p1 + w12·e12 + w13·e13 + wcross·(e12 × e13)
    OutOfPlane {
        p1: usize,
        p2: usize,
        p3: usize,
        w12: f64,
        w13: f64,
        wcross: f64,
    },
    /// An orthonormal right-handed frame built from the three particles:
    /// origin from `origin_weights`, x axis from the normalized
    /// `x_weights` combination, z axis normal to it and the raw
    /// `y_weights` combination, y axis closing the frame. The site sits at
    /// `local_position` in that frame.
    LocalCoordinates {
        p1: usize,
        p2: usize,
        p3: usize,
        origin_weights: [f64; 3],
        x_weights: [f64; 3],
        y_weights: [f64; 3],
        local_position: DVec3,
    },
}

impl VirtualSite {
    pub fn defining_particles(&self) -> SmallVec<[usize; 3]> {
        match *self {
            VirtualSite::TwoParticleAverage { p1, p2, .. } => SmallVec::from_slice(&[p1, p2]),
            VirtualSite::ThreeParticleAverage { p1, p2, p3, .. }
            | VirtualSite::OutOfPlane { p1, p2, p3, .. }
            | VirtualSite::LocalCoordinates { p1, p2, p3, .. } => {
                SmallVec::from_slice(&[p1, p2, p3])
            }
        }
    }

    /// Construct the site's position from the defining particles' current
    /// positions. Degenerate defining geometry (a singular frame for
    /// `LocalCoordinates`) yields whatever the formula yields, NaN included.
    pub fn position(&self, positions: &[DVec3]) -> DVec3 {
        match *self {
            VirtualSite::TwoParticleAverage { p1, p2, w1, w2 } => {
                positions[p1] * w1 + positions[p2] * w2
            }
            VirtualSite::ThreeParticleAverage {
                p1,
                p2,
                p3,
                w1,
                w2,
                w3,
            } => positions[p1] * w1 + positions[p2] * w2 + positions[p3] * w3,
            VirtualSite::OutOfPlane {
                p1,
                p2,
                p3,
                w12,
                w13,
                wcross,
            } => {
                let e12 = positions[p2] - positions[p1];
                let e13 = positions[p3] - positions[p1];
                positions[p1] + e12 * w12 + e13 * w13 + e12.cross(e13) * wcross
            }
            VirtualSite::LocalCoordinates {
                p1,
                p2,
                p3,
                origin_weights: ow,
                x_weights: xw,
                y_weights: yw,
                local_position: lp,
            } => {
                let (r1, r2, r3) = (positions[p1], positions[p2], positions[p3]);
                let origin = r1 * ow[0] + r2 * ow[1] + r3 * ow[2];
                let xdir = r1 * xw[0] + r2 * xw[1] + r3 * xw[2];
                let ydir = r1 * yw[0] + r2 * yw[1] + r3 * yw[2];
                let xhat = xdir.normalized();
                let zhat = xdir.cross(ydir).normalized();
                let yhat = zhat.cross(xhat);
                origin + xhat * lp.x + yhat * lp.y + zhat * lp.z
            }
        }
    }

    /// Scatter a force acting on the site onto the defining particles via
    /// the transpose of the position Jacobian. Conserves total force and
    /// torque about any reference point (for the frame-based variants,
    /// under the usual weight conventions).
    pub fn distribute_force(&self, positions: &[DVec3], force: DVec3, forces: &mut [DVec3]) {
        match *self {
            VirtualSite::TwoParticleAverage { p1, p2, w1, w2 } => {
                forces[p1] += force * w1;
                forces[p2] += force * w2;
            }
            VirtualSite::ThreeParticleAverage {
                p1,
                p2,
                p3,
                w1,
                w2,
                w3,
            } => {
                forces[p1] += force * w1;
                forces[p2] += force * w2;
                forces[p3] += force * w3;
            }
            VirtualSite::OutOfPlane {
                p1,
                p2,
                p3,
                w12,
                w13,
                wcross,
            } => {
                let e12 = positions[p2] - positions[p1];
                let e13 = positions[p3] - positions[p1];
                // Adjoint of position = p1 + w12·e12 + w13·e13 + wc·(e12×e13):
                // d(e12×e13)/de12 = −[e13]× transposes to +[e13]×, and
                // d(e12×e13)/de13 = +[e12]× transposes to −[e12]×.
                let f2 = force * w12 + e13.cross(force) * wcross;
                let f3 = force * w13 - e12.cross(force) * wcross;
                forces[p1] += force - f2 - f3;
                forces[p2] += f2;
                forces[p3] += f3;
            }
            VirtualSite::LocalCoordinates {
                p1,
                p2,
                p3,
                origin_weights: ow,
                x_weights: xw,
                y_weights: yw,
                local_position: lp,
            } => {
                let (r1, r2, r3) = (positions[p1], positions[p2], positions[p3]);
                let xdir = r1 * xw[0] + r2 * xw[1] + r3 * xw[2];
                let ydir = r1 * yw[0] + r2 * yw[1] + r3 * yw[2];
                let zdir = xdir.cross(ydir);
                let xhat = xdir.normalized();
                let zhat = zdir.normalized();

                let dnx = normalize_jacobian(xdir);
                let dnz = normalize_jacobian(zdir);

                // Transposed chain rule through ŷ = ẑ × x̂ and
                // ẑ = normalize(xdir × ydir). All products below apply a
                // transposed Jacobian to a vector; dN is symmetric, and
                // [v]×ᵀ u = −v × u.
                let x_cross_f = xhat.cross(force);
                let z_cross_f = zhat.cross(force);

                // (∂ẑ/∂xdir)ᵀ u = ydir × (dNz·u); (∂ẑ/∂ydir)ᵀ u = −xdir × (dNz·u)
                let dz_t_f = dnz * force;
                let dz_t_xf = dnz * x_cross_f;

                // (∂pos/∂xdir)ᵀ f
                let a = dnx * force * lp.x
                    + (ydir.cross(dz_t_xf) - dnx * z_cross_f) * lp.y
                    + ydir.cross(dz_t_f) * lp.z;
                // (∂pos/∂ydir)ᵀ f
                let b = -(xdir.cross(dz_t_xf)) * lp.y - xdir.cross(dz_t_f) * lp.z;

                forces[p1] += force * ow[0] + a * xw[0] + b * yw[0];
                forces[p2] += force * ow[1] + a * xw[1] + b * yw[1];
                forces[p3] += force * ow[2] + a * xw[2] + b * yw[2];
            }
        }
    }
}

/// d(normalize(v))/dv = (I − v̂v̂ᵀ)/|v|, built column by column.
fn normalize_jacobian(v: DVec3) -> DMat3 {
    let inv = 1.0 / v.mag();
    let vh = v * inv;
    DMat3::new(
        (DVec3::unit_x() - vh * vh.x) * inv,
        (DVec3::unit_y() - vh * vh.y) * inv,
        (DVec3::unit_z() - vh * vh.z) * inv,
    )
}
