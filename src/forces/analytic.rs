// forces/analytic.rs
// Dedicated closed-form potentials. These exist both as fast paths for the
// common functional forms and as independent references the custom-force
// evaluator is checked against.

use smallvec::SmallVec;
use ultraviolet::DVec3;

use super::ForceProvider;
use crate::geometry;
use crate::partition;

/// E = 0.5 * k * (r - r0)^2 over particle pairs.
pub struct HarmonicBondForce {
    terms: Vec<(usize, usize, f64, f64)>,
}

impl HarmonicBondForce {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn add_bond(&mut self, i: usize, j: usize, r0: f64, k: f64) {
        self.terms.push((i, j, r0, k));
    }
}

impl Default for HarmonicBondForce {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceProvider for HarmonicBondForce {
    fn evaluate(&self, positions: &[DVec3], forces: &mut [DVec3], workers: usize) -> f64 {
        let (energy, partial) =
            partition::evaluate_terms(positions.len(), self.terms.len(), workers, |t, local| {
                let (i, j, r0, k) = self.terms[t];
                let (r, grad) = geometry::bond(positions[i], positions[j]);
                let dedr = k * (r - r0);
                local[i] -= grad[0] * dedr;
                local[j] -= grad[1] * dedr;
                0.5 * k * (r - r0) * (r - r0)
            });
        for (total, contribution) in forces.iter_mut().zip(partial) {
            *total += contribution;
        }
        energy
    }
}

/// E = 0.5 * k * (theta - theta0)^2 over particle triples.
pub struct HarmonicAngleForce {
    terms: Vec<(SmallVec<[usize; 3]>, f64, f64)>,
}

impl HarmonicAngleForce {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn add_angle(&mut self, i: usize, j: usize, k: usize, theta0: f64, stiffness: f64) {
        self.terms
            .push((SmallVec::from_slice(&[i, j, k]), theta0, stiffness));
    }
}

impl Default for HarmonicAngleForce {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceProvider for HarmonicAngleForce {
    fn evaluate(&self, positions: &[DVec3], forces: &mut [DVec3], workers: usize) -> f64 {
        let (energy, partial) =
            partition::evaluate_terms(positions.len(), self.terms.len(), workers, |t, local| {
                let (ref p, theta0, k) = self.terms[t];
                let (theta, grad) = geometry::angle(positions[p[0]], positions[p[1]], positions[p[2]]);
                let dedt = k * (theta - theta0);
                local[p[0]] -= grad[0] * dedt;
                local[p[1]] -= grad[1] * dedt;
                local[p[2]] -= grad[2] * dedt;
                0.5 * k * (theta - theta0) * (theta - theta0)
            });
        for (total, contribution) in forces.iter_mut().zip(partial) {
            *total += contribution;
        }
        energy
    }
}

/// E = k * (1 + cos(n*phi - phi0)) over particle quadruples.
pub struct PeriodicTorsionForce {
    terms: Vec<(SmallVec<[usize; 4]>, i32, f64, f64)>,
}

impl PeriodicTorsionForce {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn add_torsion(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        l: usize,
        periodicity: i32,
        phi0: f64,
        barrier: f64,
    ) {
        self.terms
            .push((SmallVec::from_slice(&[i, j, k, l]), periodicity, phi0, barrier));
    }
}

impl Default for PeriodicTorsionForce {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceProvider for PeriodicTorsionForce {
    fn evaluate(&self, positions: &[DVec3], forces: &mut [DVec3], workers: usize) -> f64 {
        let (energy, partial) =
            partition::evaluate_terms(positions.len(), self.terms.len(), workers, |t, local| {
                let (ref p, n, phi0, k) = self.terms[t];
                let (phi, grad) = geometry::dihedral(
                    positions[p[0]],
                    positions[p[1]],
                    positions[p[2]],
                    positions[p[3]],
                );
                let dedphi = -k * (n as f64) * (n as f64 * phi - phi0).sin();
                for (idx, g) in p.iter().zip(grad.iter()) {
                    local[*idx] -= *g * dedphi;
                }
                k * (1.0 + (n as f64 * phi - phi0).cos())
            });
        for (total, contribution) in forces.iter_mut().zip(partial) {
            *total += contribution;
        }
        energy
    }
}
