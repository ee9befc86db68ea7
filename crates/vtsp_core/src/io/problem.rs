use std::io::{Read, Write};

use tsplib::{problem::TsplibProblem, tour::TsplibTour};

use crate::{Error, Result, geometry::Point, options::SolverOptions};

/// A problem loaded for solving.
#[derive(Clone, Debug)]
pub struct LoadedProblem {
    pub name: String,
    pub points: Vec<Point>,
}

/// Reads the TSPLIB problem named by `--input`, or stdin.
pub fn read_problem(options: &SolverOptions) -> Result<LoadedProblem> {
    let problem = match options.input_path() {
        Some(path) => TsplibProblem::from_file(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            TsplibProblem::from_text(&text)?
        }
    };
    problem_points(&problem)
}

pub fn problem_points(problem: &TsplibProblem) -> Result<LoadedProblem> {
    let points: Vec<Point> = problem
        .coordinates()?
        .into_iter()
        .map(|(x, y)| Point::new(x, y))
        .collect();
    if points.is_empty() {
        return Err(Error::invalid_input("problem has no coordinates"));
    }

    Ok(LoadedProblem {
        name: match problem.name.trim() {
            "" => "vtsp".to_string(),
            name => name.to_string(),
        },
        points,
    })
}

/// Builds the `.tour` model for `order`, carrying the closed length as a comment.
pub fn tour_file(name: &str, order: &[u32], length: f64) -> TsplibTour {
    let mut tour = TsplibTour::from_zero_based(format!("{name}.tour"), order);
    tour.comment_lines.push(format!("Length = {length:.3}"));
    tour
}

/// Writes the tour to `--output`, or stdout.
pub fn write_tour(options: &SolverOptions, tour: &TsplibTour) -> Result<()> {
    match options.output_path() {
        Some(path) => tour.write_to_file(path)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{tour}")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
