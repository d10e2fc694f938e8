//! Find the time-periodic scattered wave around a square obstacle.
//!
//! By default the mesh is a generated lattice.
//! A gmsh mesh can be given instead with
//! `cargo run --example scatterer_control -- <file.msh> <inner tag> <outer tag>`.

use std::f64::consts::PI;

use wavecontrol::{
    control_energy, eased_initial_state, reference_forward_energies, solve, ControlParams,
    StepContext,
};
use wavecontrol_dec::{gmsh::load_scatterer_mesh, lattice::square_with_hole, SimplicialMesh};

fn load_mesh() -> Result<SimplicialMesh, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(square_with_hole(2. * PI, PI / 3., PI / 6.)?),
        [path, inner, outer] => {
            let bytes = std::fs::read(path)?;
            Ok(load_scatterer_mesh(&bytes, inner.parse()?, outer.parse()?)?)
        }
        _ => Err("expected no arguments or <file.msh> <inner tag> <outer tag>".into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mesh = load_mesh()?;
    log::info!(
        "Mesh with {} triangles and {} edges",
        mesh.simplex_count::<2>(),
        mesh.simplex_count::<1>()
    );

    let params = ControlParams::default();
    let ctx = StepContext::new(&mesh, params)?;

    log::info!("Easing in the incoming wave.");
    let seed = eased_initial_state(&ctx);
    let seed_energy = control_energy(&ctx, &seed);

    log::info!("Solving for the periodic state.");
    let solution = solve(&ctx, seed.clone());

    for (i, ((energy, resid), conj)) in solution
        .trace
        .control_energy
        .iter()
        .zip(&solution.trace.residual_norm)
        .zip(&solution.trace.conjugacy)
        .enumerate()
    {
        log::info!("{i:3}: energy {energy:.6e}, residual {resid:.6e}, conjugacy {conj:.3e}");
    }

    let final_energy = control_energy(&ctx, &solution.state);
    log::info!(
        "Control energy {seed_energy:.6e} -> {final_energy:.6e} ({:.3}% of initial) in {} iterations",
        100. * final_energy / seed_energy,
        solution.iterations,
    );

    // plain simulation for the same number of periods as gradient evaluations
    let baseline = reference_forward_energies(&ctx, &seed, solution.iterations + 1);
    for (period, energy) in baseline.iter().enumerate() {
        log::info!("Forward simulation, period {period:3}: energy {energy:.6e}");
    }

    Ok(())
}
