// sites/registry.rs
// Attachment, dependency ordering, and the two-phase update protocol

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ultraviolet::DVec3;

use super::definition::VirtualSite;
use crate::error::ConfigError;

/// All virtual-site definitions of a simulation, with the evaluation order
/// for nested sites precomputed at attach time.
///
/// The protocol is strictly two-phase: `update_positions` before any force
/// evaluation, `distribute_forces` once after all force contributions are
/// summed. Redistribution drains each site's accumulator completely, so no
/// virtual-particle force ever reaches the integrator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SiteRegistry {
    sites: Vec<(usize, VirtualSite)>,
    by_particle: HashMap<usize, usize>,
    /// Indices into `sites`, defining particles before dependents.
    order: Vec<usize>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn site_for(&self, particle: usize) -> Option<&VirtualSite> {
        self.by_particle.get(&particle).map(|&i| &self.sites[i].1)
    }

    /// Attach a definition to `particle`. One-time: a particle's definition
    /// is immutable once attached. Rejects definitions whose defining-
    /// particle graph would contain a cycle.
    pub fn attach(&mut self, particle: usize, site: VirtualSite) -> Result<(), ConfigError> {
        if self.by_particle.contains_key(&particle) {
            return Err(ConfigError::DuplicateVirtualSite(particle));
        }
        if self.depends_on(&site, particle) {
            return Err(ConfigError::CyclicVirtualSite(particle));
        }
        self.by_particle.insert(particle, self.sites.len());
        self.sites.push((particle, site));
        self.recompute_order();
        Ok(())
    }

    /// Whether `site`'s defining particles reach `target` through the
    /// existing definition graph. The graph is acyclic, so the walk
    /// terminates.
    fn depends_on(&self, site: &VirtualSite, target: usize) -> bool {
        site.defining_particles().iter().any(|&p| {
            p == target
                || self
                    .site_for(p)
                    .map(|nested| self.depends_on(nested, target))
                    .unwrap_or(false)
        })
    }

    fn recompute_order(&mut self) {
        let mut indices: Vec<usize> = (0..self.sites.len()).collect();
        let depths: Vec<usize> = self
            .sites
            .iter()
            .map(|(_, site)| self.depth(site))
            .collect();
        // Stable: insertion order is kept among sites of equal depth.
        indices.sort_by_key(|&i| depths[i]);
        self.order = indices;
    }

    /// Nesting depth of a definition: 1 past the deepest defining site.
    fn depth(&self, site: &VirtualSite) -> usize {
        site.defining_particles()
            .iter()
            .filter_map(|&p| self.site_for(p).map(|nested| self.depth(nested) + 1))
            .max()
            .unwrap_or(0)
    }

    /// Phase 1: overwrite every virtual particle's position with its
    /// constructed value, defining particles first.
    pub fn update_positions(&self, positions: &mut [DVec3]) {
        for &i in &self.order {
            let (particle, ref site) = self.sites[i];
            positions[particle] = site.position(positions);
        }
    }

    /// Phase 2: move every virtual particle's accumulated force onto its
    /// defining particles, dependents first so nested contributions cascade
    /// down to real particles. Each site's own accumulator ends at zero.
    pub fn distribute_forces(&self, positions: &[DVec3], forces: &mut [DVec3]) {
        for &i in self.order.iter().rev() {
            let (particle, ref site) = self.sites[i];
            let force = forces[particle];
            forces[particle] = DVec3::zero();
            site.distribute_force(positions, force, forces);
        }
    }
}
