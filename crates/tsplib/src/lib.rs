//! `tsplib` reads and writes the small TSPLIB subset used by vtsp:
//! `TYPE : TSP` problems with `EDGE_WEIGHT_TYPE : EUC_2D`, and `.tour` files.
//!
//! Parsing is strict. Node ids are validated against `DIMENSION` (range,
//! duplicates, count and checksum), so a tour that parses is a permutation.
//!
//! # Quickstart
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tsplib::{problem::TsplibProblem, tour::TsplibTour};
//!
//! fn main() -> tsplib::TsplibResult<()> {
//!     let problem = TsplibProblem::from_file(Path::new("berlin52.tsp"))?;
//!     let points = problem.coordinates()?;
//!
//!     let order: Vec<u32> = (0..points.len() as u32).collect();
//!     TsplibTour::from_zero_based("berlin52.tour", &order)
//!         .write_to_file(Path::new("berlin52.tour"))?;
//!     Ok(())
//! }
//! ```

pub mod problem;
pub mod tour;

mod error;
mod header;
mod ids;
mod writer;

pub use error::{TsplibError, TsplibResult};
