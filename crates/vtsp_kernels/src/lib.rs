//! Reference collaborators for [`vtsp_core::Solver`]: convex hull, Delaunay
//! mesher, finite-element heat solver, path integrals and a PNG drawer.
//!
//! [`Kernels`] owns one of each, configured from
//! [`SolverOptions`](vtsp_core::SolverOptions), and lends them out as
//! [`Dependencies`](vtsp_core::depend::Dependencies).

pub mod delaunay;
pub mod drawer;
pub mod envelope;
pub mod heat;
pub mod integral;
pub mod predicates;

mod bundle;

pub use bundle::Kernels;
pub use delaunay::DelaunayMesher;
pub use drawer::PngDrawer;
pub use envelope::MonotoneChainEnvelope;
pub use heat::FemHeatSolver;
pub use integral::{GeodesicIntegral, SegmentIntegral};
pub use predicates::{MaxAreaSplit, NeverSplit};
