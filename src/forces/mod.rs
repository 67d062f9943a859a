// forces/mod.rs
// Re-exports for the force evaluation module

mod analytic;
mod custom;

pub use analytic::{HarmonicAngleForce, HarmonicBondForce, PeriodicTorsionForce};
pub use custom::{CustomForce, ForceTerm, GeometryKind};

use ultraviolet::DVec3;

/// A contributor of potential energy and per-particle forces. The
/// surrounding engine hands every provider the same position array and a
/// shared force accumulator; providers add their contribution and return
/// their energy. Implementations must not retain interior mutability —
/// evaluation is a pure, synchronous pass.
pub trait ForceProvider: Send + Sync {
    fn evaluate(&self, positions: &[DVec3], forces: &mut [DVec3], workers: usize) -> f64;
}

#[cfg(test)]
#[path = "tests/analytic_equivalence.rs"]
mod analytic_equivalence;
#[cfg(test)]
#[path = "tests/parameter_commit.rs"]
mod parameter_commit;
#[cfg(test)]
#[path = "tests/parallel_invariance.rs"]
mod parallel_invariance;
