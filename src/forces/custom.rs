// forces/custom.rs
// Expression-driven force collections: one compiled formula applied over a
// sequence of terms, each contributing energy and chain-rule forces.

use std::sync::Arc;

use smallvec::SmallVec;
use ultraviolet::DVec3;

use super::ForceProvider;
use crate::error::ConfigError;
use crate::expr::{compile, CompiledExpression};
use crate::geometry;
use crate::partition;

/// The closed set of geometries a custom force can be declared over. The
/// kind fixes how many particles a term names and which feature variables
/// the formula may reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    /// Two particles; the formula sees the distance `r`.
    Bond,
    /// Three particles; the formula sees the angle `theta` at the middle one.
    Angle,
    /// Four particles; the formula sees the dihedral `theta` about the
    /// middle bond.
    Dihedral,
    /// One particle; the formula sees its coordinates `x`, `y`, `z` directly.
    External,
}

impl GeometryKind {
    pub fn arity(&self) -> usize {
        match self {
            GeometryKind::Bond => 2,
            GeometryKind::Angle => 3,
            GeometryKind::Dihedral => 4,
            GeometryKind::External => 1,
        }
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            GeometryKind::Bond => &["r"],
            GeometryKind::Angle | GeometryKind::Dihedral => &["theta"],
            GeometryKind::External => &["x", "y", "z"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GeometryKind::Bond => "bond",
            GeometryKind::Angle => "angle",
            GeometryKind::Dihedral => "dihedral",
            GeometryKind::External => "external",
        }
    }
}

/// One term of a collection: the particle tuple plus its parameter values,
/// ordered to match the declared per-term parameter names.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceTerm {
    pub particles: SmallVec<[usize; 4]>,
    pub params: SmallVec<[f64; 4]>,
}

/// A force collection driven by a user-supplied formula.
///
/// The formula is compiled (and symbolically differentiated) once at
/// construction; parameter-value changes never recompile. Term appends are
/// setup operations and take effect immediately. `set_term_params` and
/// `set_global` stage new values that become visible to evaluation only
/// after `commit()` — an evaluation between a staged write and the commit
/// sees the previous values.
pub struct CustomForce {
    kind: GeometryKind,
    compiled: Arc<CompiledExpression>,
    term_param_names: Vec<String>,
    global_param_names: Vec<String>,
    staged_terms: Vec<ForceTerm>,
    staged_globals: Vec<f64>,
    active_terms: Vec<ForceTerm>,
    active_globals: Vec<f64>,
}

impl CustomForce {
    /// Compile `formula` against the geometry's feature variables plus the
    /// declared per-term and global parameter names. Fails fast on syntax
    /// errors or references to undeclared symbols.
    pub fn new(
        kind: GeometryKind,
        formula: &str,
        term_param_names: &[&str],
        globals: &[(&str, f64)],
    ) -> Result<Self, ConfigError> {
        let term_param_names: Vec<String> =
            term_param_names.iter().map(|s| s.to_string()).collect();
        let global_param_names: Vec<String> = globals.iter().map(|(n, _)| n.to_string()).collect();
        let global_values: Vec<f64> = globals.iter().map(|(_, v)| *v).collect();
        let compiled = compile(
            formula,
            kind.feature_names(),
            &term_param_names,
            &global_param_names,
        )?;
        Ok(Self {
            kind,
            compiled,
            term_param_names,
            global_param_names,
            staged_terms: Vec::new(),
            staged_globals: global_values.clone(),
            active_terms: Vec::new(),
            active_globals: global_values,
        })
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn formula(&self) -> &str {
        self.compiled.formula()
    }

    pub fn num_terms(&self) -> usize {
        self.staged_terms.len()
    }

    pub fn term(&self, index: usize) -> Option<&ForceTerm> {
        self.staged_terms.get(index)
    }

    /// Append a term. Takes effect immediately; no commit needed.
    pub fn add_term(&mut self, particles: &[usize], params: &[f64]) -> Result<usize, ConfigError> {
        let index = self.staged_terms.len();
        if particles.len() != self.kind.arity() {
            return Err(ConfigError::ParticleCount {
                term: index,
                kind: self.kind.label(),
                expected: self.kind.arity(),
                got: particles.len(),
            });
        }
        if params.len() != self.term_param_names.len() {
            return Err(ConfigError::ParameterCount {
                term: index,
                expected: self.term_param_names.len(),
                got: params.len(),
            });
        }
        let term = ForceTerm {
            particles: SmallVec::from_slice(particles),
            params: SmallVec::from_slice(params),
        };
        self.staged_terms.push(term.clone());
        self.active_terms.push(term);
        Ok(index)
    }

    /// Replace a term's parameter values. Staged until `commit()`.
    pub fn set_term_params(&mut self, index: usize, params: &[f64]) -> Result<(), ConfigError> {
        if params.len() != self.term_param_names.len() {
            return Err(ConfigError::ParameterCount {
                term: index,
                expected: self.term_param_names.len(),
                got: params.len(),
            });
        }
        let term = self
            .staged_terms
            .get_mut(index)
            .ok_or(ConfigError::TermIndex(index))?;
        term.params = SmallVec::from_slice(params);
        Ok(())
    }

    /// Set a global parameter's value by name. Staged until `commit()`.
    pub fn set_global(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        let index = self
            .global_param_names
            .iter()
            .position(|g| g == name)
            .ok_or_else(|| ConfigError::UnknownGlobal(name.to_string()))?;
        self.staged_globals[index] = value;
        Ok(())
    }

    /// The staged value of a global parameter.
    pub fn global(&self, name: &str) -> Option<f64> {
        self.global_param_names
            .iter()
            .position(|g| g == name)
            .map(|i| self.staged_globals[i])
    }

    /// Make every staged parameter change visible to subsequent
    /// evaluations. Atomic: the next pass sees all staged values or, if
    /// never called, none of them.
    pub fn commit(&mut self) {
        self.active_terms.clone_from(&self.staged_terms);
        self.active_globals.clone_from(&self.staged_globals);
    }

    /// Largest particle index any term references, for validation against
    /// the particle array before evaluation.
    pub fn max_particle_index(&self) -> Option<usize> {
        self.staged_terms
            .iter()
            .flat_map(|t| t.particles.iter().copied())
            .max()
    }

    fn term_energy(&self, term: &ForceTerm, positions: &[DVec3], local: &mut [DVec3]) -> f64 {
        let globals = &self.active_globals;
        match self.kind {
            GeometryKind::Bond => {
                let (i, j) = (term.particles[0], term.particles[1]);
                let (r, grad) = geometry::bond(positions[i], positions[j]);
                let mut dedr = [0.0];
                let energy =
                    self.compiled
                        .evaluate_with_gradient(&[r], &term.params, globals, &mut dedr);
                local[i] -= grad[0] * dedr[0];
                local[j] -= grad[1] * dedr[0];
                energy
            }
            GeometryKind::Angle => {
                let (i, j, k) = (term.particles[0], term.particles[1], term.particles[2]);
                let (theta, grad) = geometry::angle(positions[i], positions[j], positions[k]);
                let mut dedt = [0.0];
                let energy =
                    self.compiled
                        .evaluate_with_gradient(&[theta], &term.params, globals, &mut dedt);
                local[i] -= grad[0] * dedt[0];
                local[j] -= grad[1] * dedt[0];
                local[k] -= grad[2] * dedt[0];
                energy
            }
            GeometryKind::Dihedral => {
                let (i, j, k, l) = (
                    term.particles[0],
                    term.particles[1],
                    term.particles[2],
                    term.particles[3],
                );
                let (phi, grad) =
                    geometry::dihedral(positions[i], positions[j], positions[k], positions[l]);
                let mut dedp = [0.0];
                let energy =
                    self.compiled
                        .evaluate_with_gradient(&[phi], &term.params, globals, &mut dedp);
                local[i] -= grad[0] * dedp[0];
                local[j] -= grad[1] * dedp[0];
                local[k] -= grad[2] * dedp[0];
                local[l] -= grad[3] * dedp[0];
                energy
            }
            GeometryKind::External => {
                let i = term.particles[0];
                let p = positions[i];
                let mut g = [0.0; 3];
                let energy = self.compiled.evaluate_with_gradient(
                    &[p.x, p.y, p.z],
                    &term.params,
                    globals,
                    &mut g,
                );
                local[i] -= DVec3::new(g[0], g[1], g[2]);
                energy
            }
        }
    }
}

impl ForceProvider for CustomForce {
    fn evaluate(&self, positions: &[DVec3], forces: &mut [DVec3], workers: usize) -> f64 {
        let (energy, partial) = partition::evaluate_terms(
            positions.len(),
            self.active_terms.len(),
            workers,
            |t, local| self.term_energy(&self.active_terms[t], positions, local),
        );
        for (total, contribution) in forces.iter_mut().zip(partial) {
            *total += contribution;
        }
        energy
    }
}
