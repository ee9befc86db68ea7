//! Collaborator contracts the solver calls into.
//!
//! Algorithmic collaborators follow the operational-memory contract: a pure
//! `sizeof_opmem` followed by one operation that may only use the scratch
//! [`Arena`] it is handed. Observers may allocate and their failures are
//! non-fatal unless the solve is configured otherwise.

use std::cell::Cell;

use log::Level;

use crate::{
    Result,
    arena::{Arena, OpMemSize},
    geometry::{Mesh, Point, ScalarField, Tour},
};

/// Convex hull of a point set.
pub trait Envelope {
    fn sizeof_opmem(&self, point_count: usize) -> OpMemSize;

    /// Writes the hull vertex indices in counter-clockwise order into `hull`.
    fn hull(&self, points: &[Point], hull: &mut Tour<'_>, arena: &mut Arena<'_>) -> Result<()>;
}

/// Triangulation of the region bounded by `boundary`, optionally refined.
pub trait Mesher {
    fn sizeof_opmem(&self, point_count: usize, node_budget: usize) -> OpMemSize;

    /// Fills `mesh` (cleared on entry). Never grows past `node_budget` nodes.
    fn mesh(
        &self,
        points: &[Point],
        boundary: &[u32],
        node_budget: usize,
        split: Option<&dyn SplitPredicate>,
        mesh: &mut Mesh<'_>,
        arena: &mut Arena<'_>,
    ) -> Result<()>;
}

/// Steady-state diffusion with fixed-value nodes.
pub trait HeatSolver {
    fn sizeof_opmem(&self, node_capacity: usize, triangle_capacity: usize) -> OpMemSize;

    /// Fills `field` with one value per mesh node. Nodes listed in
    /// `dirichlet` are pinned to `value`.
    fn solve(
        &self,
        mesh: &Mesh<'_>,
        dirichlet: &[u32],
        value: f64,
        field: &mut ScalarField<'_>,
        arena: &mut Arena<'_>,
    ) -> Result<()>;
}

/// Cost of travelling between two mesh nodes under a field.
pub trait PathIntegral {
    fn sizeof_opmem(&self, node_capacity: usize, triangle_capacity: usize) -> OpMemSize;

    fn integral(
        &self,
        mesh: &Mesh<'_>,
        field: &[f64],
        from: u32,
        to: u32,
        arena: &mut Arena<'_>,
    ) -> Result<f64>;
}

/// What a split predicate sees about one triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleContext {
    pub index: usize,
    pub node_count: usize,
    pub vertices: [Point; 3],
    /// `boundary[i]` is set when the edge opposite vertex `i` lies on the
    /// region boundary.
    pub boundary: [bool; 3],
}

impl TriangleContext {
    pub fn area(&self) -> f64 {
        let [a, b, c] = self.vertices;
        0.5 * crate::geometry::orient2d(a, b, c).abs()
    }

    pub fn centroid(&self) -> Point {
        let [a, b, c] = self.vertices;
        Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }
}

/// Decides whether a Steiner node goes into a triangle during refinement.
pub trait SplitPredicate {
    fn split(&self, triangle: &TriangleContext) -> bool;
}

pub trait Logger {
    fn log(&self, level: Level, message: &str) -> Result<()>;
}

/// Tour growth, reported after seeding and after every insertion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Progress {
    pub in_tour: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.in_tour as f64 / self.total as f64
    }
}

pub trait Reporter {
    fn report(&self, progress: Progress) -> Result<()>;
}

/// Diagnostic state handed to a [`Drawer`].
pub struct Snapshot<'s> {
    /// 0 for the initial field, then the insertion count.
    pub ordinal: usize,
    pub points: &'s [Point],
    pub mesh: &'s Mesh<'s>,
    pub field: &'s [f64],
    pub tour: &'s [u32],
}

pub trait Drawer {
    fn draw(&self, snapshot: &Snapshot<'_>) -> Result<()>;
}

/// Collaborator bindings for one solve call.
#[derive(Clone, Copy)]
pub struct Dependencies<'d> {
    pub logger: &'d dyn Logger,
    pub reporter: &'d dyn Reporter,
    pub drawer: &'d dyn Drawer,
    pub envelope: &'d dyn Envelope,
    pub mesher: &'d dyn Mesher,
    pub heat: &'d dyn HeatSolver,
    pub integral: &'d dyn PathIntegral,
    pub split: Option<&'d dyn SplitPredicate>,
}

/// Forwards to the `log` facade under the `vtsp` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, level: Level, message: &str) -> Result<()> {
        log::log!(target: "vtsp", level, "{message}");
        Ok(())
    }
}

/// Logs progress at info level every `step` percent.
#[derive(Debug)]
pub struct LogReporter {
    step: usize,
    next: Cell<usize>,
}

impl LogReporter {
    pub fn new(step_percent: usize) -> Self {
        Self {
            step: step_percent.clamp(1, 100),
            next: Cell::new(0),
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Reporter for LogReporter {
    fn report(&self, progress: Progress) -> Result<()> {
        let percent = (progress.fraction() * 100.0).floor() as usize;
        if percent >= self.next.get() || progress.in_tour == progress.total {
            log::info!(
                "progress: {}/{} ({percent}%)",
                progress.in_tour,
                progress.total
            );
            self.next.set((percent / self.step + 1) * self.step);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDrawer;

impl Drawer for NoopDrawer {
    fn draw(&self, _snapshot: &Snapshot<'_>) -> Result<()> {
        Ok(())
    }
}
