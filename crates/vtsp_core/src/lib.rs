//! Diffusion-guided insertion heuristic for the planar Euclidean TSP.
//!
//! The partial tour is treated as a heat-absorbing boundary on a mesh of the
//! point set's convex region. Each iteration solves a steady diffusion field
//! and splices the hottest unvisited point into the cheapest tour edge.
//!
//! Geometry and numerics are collaborators behind the traits in [`depend`];
//! every algorithmic stage runs inside one caller-supplied [`arena::OpMem`].

pub mod arena;
pub mod depend;
mod error;
pub mod geometry;
mod io;
pub mod logging;
pub mod solve;

pub use error::{Error, Result, SolveStatus};
pub use io::{options, problem};
pub use options::SolverOptions;
pub use solve::{SolveConfig, Solver};
