// body/types.rs
// Contains the Body struct and related methods

use serde::{Deserialize, Serialize};
use ultraviolet::DVec3;

use std::sync::atomic::{AtomicU64, Ordering};
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A single particle: position, velocity, force accumulator, mass.
///
/// Mass is zero exactly when the particle is a virtual site — the
/// simulation rejects a virtual-site definition on any body with
/// nonzero mass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Body {
    pub pos: DVec3,
    pub vel: DVec3,
    pub force: DVec3,
    pub mass: f64,
    pub id: u64,
}

impl Body {
    pub fn new(pos: DVec3, vel: DVec3, mass: f64) -> Self {
        Self {
            pos,
            vel,
            force: DVec3::zero(),
            mass,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Create a massless body to be used as a virtual site. Its position is
    /// overwritten by the site engine before any force evaluation.
    pub fn massless(pos: DVec3) -> Self {
        Self::new(pos, DVec3::zero(), 0.0)
    }

    /// Inverse mass, zero for massless bodies. Integrators use this so that
    /// virtual sites never acquire velocity of their own.
    pub fn inv_mass(&self) -> f64 {
        if self.mass == 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    pub fn is_massless(&self) -> bool {
        self.mass == 0.0
    }
}
