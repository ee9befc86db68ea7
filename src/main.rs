use std::{process::ExitCode, time::Instant};

use log::{error, info};

use vtsp_core::{
    Result, SolveConfig, Solver, SolverOptions,
    arena::OpMem,
    geometry::tour_length,
    logging,
    problem::{read_problem, tour_file, write_tour},
};
use vtsp_kernels::Kernels;

fn main() -> ExitCode {
    let options = match SolverOptions::from_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logger(&options) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} {e}", e.status());
            ExitCode::FAILURE
        }
    }
}

fn run(options: &SolverOptions) -> Result<()> {
    let now = Instant::now();
    info!("options:\n{options}");

    let problem = read_problem(options)?;
    info!("input: {} ({} points)", problem.name, problem.points.len());

    let kernels = Kernels::from_options(options);
    let deps = kernels.dependencies();
    let solver = Solver::new(SolveConfig::from(options));

    let bytes = solver.sizeof_opmem(problem.points.len(), &deps);
    info!("operational memory: {bytes} bytes");
    let mut opmem = OpMem::new(bytes);

    let mut order = vec![0u32; problem.points.len()];
    solver.solve(&problem.points, &mut order, &deps, &mut opmem)?;

    let length = tour_length(&problem.points, &order);
    write_tour(options, &tour_file(&problem.name, &order, length))?;

    info!(
        "output: n={} length={length:.3} time={:.2}s",
        order.len(),
        now.elapsed().as_secs_f32()
    );
    Ok(())
}
