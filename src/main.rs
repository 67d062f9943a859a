// Demo binary: a water-like molecule with an averaged charge site, driven
// by custom bond/angle forces and a harmonic external well. The integrator
// here is a stand-in for the production stepper, which lives upstream.

use particle_forces::body::Body;
use particle_forces::config::SimConfig;
use particle_forces::forces::{CustomForce, GeometryKind};
use particle_forces::simulation::Simulation;
use particle_forces::sites::VirtualSite;
use ultraviolet::DVec3;

fn main() {
    let config = match SimConfig::load_toml("sim_config.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {}", e);
            std::process::exit(1);
        }
    };
    let dt = config.dt;
    let steps = config.steps;

    let mut sim = Simulation::with_config(config);

    // O at the origin, two H at the equilibrium geometry, slightly compressed
    // bonds so something happens.
    let o = sim.add_body(Body::new(DVec3::zero(), DVec3::zero(), 15.999));
    let h1 = sim.add_body(Body::new(DVec3::new(0.09, 0.02, 0.0), DVec3::zero(), 1.008));
    let h2 = sim.add_body(Body::new(DVec3::new(-0.03, 0.09, 0.0), DVec3::zero(), 1.008));
    let m = sim.add_body(Body::massless(DVec3::zero()));
    sim.attach_virtual_site(
        m,
        VirtualSite::ThreeParticleAverage {
            p1: o,
            p2: h1,
            p3: h2,
            w1: 0.8,
            w2: 0.1,
            w3: 0.1,
        },
    )
    .expect("site definition");

    let mut bonds = CustomForce::new(
        GeometryKind::Bond,
        "0.5*k*(r-r0)^2",
        &["r0", "k"],
        &[],
    )
    .expect("bond formula");
    bonds.add_term(&[o, h1], &[0.09572, 1000.0]).unwrap();
    bonds.add_term(&[o, h2], &[0.09572, 1000.0]).unwrap();
    sim.add_custom_force(bonds).unwrap();

    let mut angles = CustomForce::new(
        GeometryKind::Angle,
        "0.5*k*(theta-theta0)^2",
        &["theta0", "k"],
        &[],
    )
    .expect("angle formula");
    angles.add_term(&[h1, o, h2], &[1.82421813, 100.0]).unwrap();
    sim.add_custom_force(angles).unwrap();

    // A weak harmonic well acting on the charge site pins the molecule.
    let mut well = CustomForce::new(
        GeometryKind::External,
        "0.5*kwell*(x^2+y^2+z^2)",
        &[],
        &[("kwell", 100.0)],
    )
    .expect("well formula");
    well.add_term(&[m], &[]).unwrap();
    sim.add_custom_force(well).unwrap();

    sim.compute_forces();
    let e0 = sim.potential_energy + sim.kinetic_energy();
    println!("step {:>6}  E = {:.6} kJ/mol", 0, e0);

    for step in 1..=steps {
        // Velocity Verlet over the massive particles; site positions and
        // force redistribution happen inside compute_forces.
        for body in &mut sim.bodies {
            let half_kick = body.force * (0.5 * dt * body.inv_mass());
            body.vel += half_kick;
            if !body.is_massless() {
                let drift = body.vel * dt;
                body.pos += drift;
            }
        }
        sim.compute_forces();
        for body in &mut sim.bodies {
            body.vel += body.force * (0.5 * dt * body.inv_mass());
        }

        if step % 100 == 0 || step == steps {
            let total = sim.potential_energy + sim.kinetic_energy();
            println!(
                "step {:>6}  E = {:.6} kJ/mol  drift = {:+.3e}",
                step,
                total,
                total - e0
            );
        }
    }

    if sim.non_finite_forces() > 0 {
        eprintln!("warning: non-finite forces detected");
        std::process::exit(1);
    }
}
