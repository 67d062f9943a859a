// Long-trajectory conservation: all four site types, pairwise nonbonded
// interactions, and holonomic bond constraints. The integrator, constraint
// solver, and nonbonded force below are test-local stand-ins for the
// collaborators that own those jobs in production.
#[cfg(test)]
mod conservation {
    use crate::body::Body;
    use crate::forces::ForceProvider;
    use crate::simulation::Simulation;
    use crate::sites::VirtualSite;
    use std::collections::HashSet;
    use ultraviolet::DVec3;

    /// All-pairs Lennard-Jones with an exclusion list, the stand-in for the
    /// neighbor-list nonbonded engine.
    struct LennardJones {
        sigma: f64,
        epsilon: f64,
        exclusions: HashSet<(usize, usize)>,
    }

    impl LennardJones {
        fn new(sigma: f64, epsilon: f64) -> Self {
            Self {
                sigma,
                epsilon,
                exclusions: HashSet::new(),
            }
        }

        fn exclude(&mut self, i: usize, j: usize) {
            self.exclusions.insert((i.min(j), i.max(j)));
        }

        fn exclude_group(&mut self, group: &[usize]) {
            for (a, &i) in group.iter().enumerate() {
                for &j in &group[a + 1..] {
                    self.exclude(i, j);
                }
            }
        }
    }

    impl ForceProvider for LennardJones {
        fn evaluate(&self, positions: &[DVec3], forces: &mut [DVec3], _workers: usize) -> f64 {
            let n = positions.len();
            let mut energy = 0.0;
            for i in 0..n {
                for j in i + 1..n {
                    if self.exclusions.contains(&(i, j)) {
                        continue;
                    }
                    let d = positions[j] - positions[i];
                    let r2 = d.mag_sq();
                    let sr6 = (self.sigma * self.sigma / r2).powi(3);
                    energy += 4.0 * self.epsilon * (sr6 * sr6 - sr6);
                    let f_over_r2 = 24.0 * self.epsilon * (2.0 * sr6 * sr6 - sr6) / r2;
                    let f = d * f_over_r2;
                    forces[i] -= f;
                    forces[j] += f;
                }
            }
            energy
        }
    }

    struct Constraint {
        i: usize,
        j: usize,
        distance: f64,
    }

    /// SHAKE-style iterative position projection. Corrections are
    /// mass-weighted and central, so they conserve linear and angular
    /// momentum; the matching velocity correction keeps the half-step
    /// velocities consistent with the projected positions.
    fn project_positions(sim: &mut Simulation, constraints: &[Constraint], dt: f64) {
        for _ in 0..500 {
            let mut converged = true;
            for c in constraints {
                let delta = sim.bodies[c.i].pos - sim.bodies[c.j].pos;
                let diff = delta.mag_sq() - c.distance * c.distance;
                if diff.abs() > 1e-12 {
                    converged = false;
                    let wi = sim.bodies[c.i].inv_mass();
                    let wj = sim.bodies[c.j].inv_mass();
                    let g = diff / (2.0 * delta.mag_sq() * (wi + wj));
                    let shift_i = delta * (g * wi);
                    let shift_j = delta * (g * wj);
                    sim.bodies[c.i].pos -= shift_i;
                    sim.bodies[c.j].pos += shift_j;
                    sim.bodies[c.i].vel -= shift_i / dt;
                    sim.bodies[c.j].vel += shift_j / dt;
                }
            }
            if converged {
                break;
            }
        }
    }

    /// RATTLE velocity stage: remove relative velocity along each
    /// constraint so kinetic energy is measured on the constraint manifold.
    fn project_velocities(sim: &mut Simulation, constraints: &[Constraint]) {
        for _ in 0..500 {
            let mut converged = true;
            for c in constraints {
                let delta = sim.bodies[c.i].pos - sim.bodies[c.j].pos;
                let vrel = sim.bodies[c.i].vel - sim.bodies[c.j].vel;
                let dot = delta.dot(vrel);
                if dot.abs() > 1e-12 {
                    converged = false;
                    let wi = sim.bodies[c.i].inv_mass();
                    let wj = sim.bodies[c.j].inv_mass();
                    let k = dot / (delta.mag_sq() * (wi + wj));
                    sim.bodies[c.i].vel -= delta * (k * wi);
                    sim.bodies[c.j].vel += delta * (k * wj);
                }
            }
            if converged {
                break;
            }
        }
    }

    /// Four molecules, one per virtual-site type, rigid under distance
    /// constraints, interacting only through Lennard-Jones.
    fn build_system() -> (Simulation, Vec<Constraint>) {
        let mut sim = Simulation::new();
        let mut lj = LennardJones::new(1.0, 10.0);
        let mut constraints = Vec::new();
        let root2 = 2.0_f64.sqrt();

        // Linear molecule with a TwoParticleAverage site.
        sim.add_body(Body::new(DVec3::zero(), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(2.0, 0.0, 0.0), DVec3::zero(), 1.0));
        sim.add_body(Body::massless(DVec3::zero()));
        sim.attach_virtual_site(
            2,
            VirtualSite::TwoParticleAverage {
                p1: 0,
                p2: 1,
                w1: 0.4,
                w2: 0.6,
            },
        )
        .unwrap();
        constraints.push(Constraint {
            i: 0,
            j: 1,
            distance: 2.0,
        });
        lj.exclude_group(&[0, 1, 2]);

        // Planar molecule with a ThreeParticleAverage site.
        sim.add_body(Body::new(DVec3::new(0.0, 0.0, 1.0), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(1.0, 0.0, 1.0), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(0.0, 1.0, 1.0), DVec3::zero(), 1.0));
        sim.add_body(Body::massless(DVec3::zero()));
        sim.attach_virtual_site(
            6,
            VirtualSite::ThreeParticleAverage {
                p1: 3,
                p2: 4,
                p3: 5,
                w1: 0.3,
                w2: 0.5,
                w3: 0.2,
            },
        )
        .unwrap();
        for (i, j, d) in [(3, 4, 1.0), (3, 5, 1.0), (4, 5, root2)] {
            constraints.push(Constraint { i, j, distance: d });
        }
        lj.exclude_group(&[3, 4, 5, 6]);

        // Tetrahedral molecule with an OutOfPlane site.
        sim.add_body(Body::new(DVec3::new(1.0, 0.0, -1.0), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(2.0, 0.0, -1.0), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(1.0, 1.0, -1.0), DVec3::zero(), 1.0));
        sim.add_body(Body::massless(DVec3::zero()));
        sim.attach_virtual_site(
            10,
            VirtualSite::OutOfPlane {
                p1: 7,
                p2: 8,
                p3: 9,
                w12: 0.3,
                w13: 0.5,
                wcross: 0.2,
            },
        )
        .unwrap();
        for (i, j, d) in [(7, 8, 1.0), (7, 9, 1.0), (8, 9, root2)] {
            constraints.push(Constraint { i, j, distance: d });
        }
        lj.exclude_group(&[7, 8, 9, 10]);

        // Molecule carrying a LocalCoordinates site.
        sim.add_body(Body::new(DVec3::new(1.0, 2.0, 0.0), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(2.0, 2.0, 0.0), DVec3::zero(), 1.0));
        sim.add_body(Body::new(DVec3::new(1.0, 3.0, 0.0), DVec3::zero(), 1.0));
        sim.add_body(Body::massless(DVec3::zero()));
        sim.attach_virtual_site(
            14,
            VirtualSite::LocalCoordinates {
                p1: 11,
                p2: 12,
                p3: 13,
                origin_weights: [0.3, 0.3, 0.4],
                x_weights: [1.0, -0.5, -0.5],
                y_weights: [0.0, -1.0, 1.0],
                local_position: DVec3::new(0.2, 0.2, 1.0),
            },
        )
        .unwrap();
        for (i, j, d) in [(11, 12, 1.0), (11, 13, 1.0), (12, 13, root2)] {
            constraints.push(Constraint { i, j, distance: d });
        }
        lj.exclude_group(&[11, 12, 13, 14]);

        sim.add_force(Box::new(lj));
        (sim, constraints)
    }

    #[test]
    fn energy_and_momenta_are_conserved_over_1000_steps() {
        let (mut sim, constraints) = build_system();
        let dt = 0.002;

        sim.compute_forces();
        let initial_energy = sim.potential_energy + sim.kinetic_energy();

        for step in 0..1000 {
            let energy = sim.potential_energy + sim.kinetic_energy();
            let scale = initial_energy.abs().max(1.0);
            assert!(
                (energy - initial_energy).abs() <= 0.01 * scale,
                "step {}: energy drifted from {} to {}",
                step,
                initial_energy,
                energy
            );
            if step % 100 == 0 {
                assert!(
                    sim.linear_momentum().mag() < 1e-10,
                    "step {}: linear momentum {:?}",
                    step,
                    sim.linear_momentum()
                );
                assert!(
                    sim.angular_momentum().mag() < 1e-10,
                    "step {}: angular momentum {:?}",
                    step,
                    sim.angular_momentum()
                );
            }

            // Velocity Verlet with RATTLE, the stand-in integrator.
            for body in &mut sim.bodies {
                let half_kick = body.force * (0.5 * dt * body.inv_mass());
                body.vel += half_kick;
                if !body.is_massless() {
                    let drift = body.vel * dt;
                    body.pos += drift;
                }
            }
            project_positions(&mut sim, &constraints, dt);
            sim.compute_forces();
            for body in &mut sim.bodies {
                body.vel += body.force * (0.5 * dt * body.inv_mass());
            }
            project_velocities(&mut sim, &constraints);

            assert_eq!(sim.non_finite_forces(), 0, "step {}: non-finite forces", step);
        }

        assert!(sim.linear_momentum().mag() < 1e-10);
        assert!(sim.angular_momentum().mag() < 1e-10);
    }

    #[test]
    fn constraints_hold_through_site_redistribution() {
        let (mut sim, constraints) = build_system();
        let dt = 0.002;
        sim.compute_forces();
        for _ in 0..100 {
            for body in &mut sim.bodies {
                let half_kick = body.force * (0.5 * dt * body.inv_mass());
                body.vel += half_kick;
                if !body.is_massless() {
                    let drift = body.vel * dt;
                    body.pos += drift;
                }
            }
            project_positions(&mut sim, &constraints, dt);
            sim.compute_forces();
            for body in &mut sim.bodies {
                body.vel += body.force * (0.5 * dt * body.inv_mass());
            }
            project_velocities(&mut sim, &constraints);
        }
        for c in &constraints {
            let d = (sim.bodies[c.i].pos - sim.bodies[c.j].pos).mag();
            assert!(
                (d - c.distance).abs() < 1e-5,
                "constraint {}-{}: {} vs {}",
                c.i,
                c.j,
                d,
                c.distance
            );
        }
    }
}
