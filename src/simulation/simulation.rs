// simulation/simulation.rs
// Contains the Simulation struct and the force evaluation pipeline

use ultraviolet::DVec3;

use crate::body::Body;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::forces::{CustomForce, ForceProvider};
use crate::profile_scope;
use crate::sites::{SiteRegistry, VirtualSite};

/// The particle system plus everything that contributes forces to it.
///
/// One call to [`compute_forces`](Self::compute_forces) runs the full
/// pipeline the surrounding integrator expects: dependent (virtual-site)
/// positions are constructed, every force provider accumulates energy and
/// forces over all particles including virtual ones, and virtual-particle
/// forces are redistributed onto their defining particles. Velocities are
/// never touched here.
pub struct Simulation {
    pub bodies: Vec<Body>,
    pub forces: Vec<Box<dyn ForceProvider>>,
    pub sites: SiteRegistry,
    pub config: SimConfig,
    /// Total potential energy of the last evaluation pass.
    pub potential_energy: f64,
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            bodies: Vec::new(),
            forces: Vec::new(),
            sites: SiteRegistry::new(),
            config,
            potential_energy: 0.0,
        }
    }

    pub fn add_body(&mut self, body: Body) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    pub fn add_force(&mut self, force: Box<dyn ForceProvider>) {
        self.forces.push(force);
    }

    /// Add a custom force after checking its terms against the particle
    /// count, so a bad index fails here instead of inside an evaluation.
    pub fn add_custom_force(&mut self, force: CustomForce) -> Result<(), ConfigError> {
        if let Some(max) = force.max_particle_index() {
            if max >= self.bodies.len() {
                return Err(ConfigError::ParticleIndex(max));
            }
        }
        self.forces.push(Box::new(force));
        Ok(())
    }

    /// Attach a virtual-site definition to `particle`. One-time and
    /// immutable thereafter. Fails on a massive particle, an out-of-range
    /// index, a duplicate definition, or a cyclic dependency.
    pub fn attach_virtual_site(
        &mut self,
        particle: usize,
        site: VirtualSite,
    ) -> Result<(), ConfigError> {
        if particle >= self.bodies.len() {
            return Err(ConfigError::ParticleIndex(particle));
        }
        if !self.bodies[particle].is_massless() {
            return Err(ConfigError::MassiveVirtualSite(particle));
        }
        if let Some(&bad) = site
            .defining_particles()
            .iter()
            .find(|&&p| p >= self.bodies.len())
        {
            return Err(ConfigError::ParticleIndex(bad));
        }
        self.sites.attach(particle, site)
    }

    /// Run one full evaluation pass and return the total potential energy.
    /// Every body's force accumulator is overwritten.
    pub fn compute_forces(&mut self) -> f64 {
        profile_scope!("compute_forces");

        // Phase 1: dependent positions, defining particles first.
        let mut positions: Vec<DVec3> = self.bodies.iter().map(|b| b.pos).collect();
        self.sites.update_positions(&mut positions);
        for (body, &p) in self.bodies.iter_mut().zip(&positions) {
            body.pos = p;
        }

        // Phase 2: force accumulation over all particles, virtual included.
        let mut forces = vec![DVec3::zero(); self.bodies.len()];
        let mut energy = 0.0;
        for force in &self.forces {
            energy += force.evaluate(&positions, &mut forces, self.config.num_workers);
        }

        // Phase 3: move virtual-particle forces onto the defining real
        // particles. Site accumulators end at zero, so nothing massless is
        // ever handed to the integrator.
        self.sites.distribute_forces(&positions, &mut forces);

        for (body, f) in self.bodies.iter_mut().zip(forces) {
            body.force = f;
        }
        self.potential_energy = energy;
        energy
    }

    /// Count bodies whose force accumulator contains a non-finite
    /// component. Evaluation never raises on numerical singularities;
    /// this is the caller's check for invalid simulation state.
    pub fn non_finite_forces(&self) -> usize {
        self.bodies
            .iter()
            .filter(|b| {
                !(b.force.x.is_finite() && b.force.y.is_finite() && b.force.z.is_finite())
            })
            .count()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.bodies
            .iter()
            .map(|b| 0.5 * b.mass * b.vel.mag_sq())
            .sum()
    }

    pub fn linear_momentum(&self) -> DVec3 {
        self.bodies
            .iter()
            .fold(DVec3::zero(), |acc, b| acc + b.vel * b.mass)
    }

    pub fn angular_momentum(&self) -> DVec3 {
        self.bodies
            .iter()
            .fold(DVec3::zero(), |acc, b| acc + b.pos.cross(b.vel) * b.mass)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
