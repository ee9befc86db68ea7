//! Solve orchestration: validation, hull seeding, meshing, diffusion and the
//! insertion loop, all inside one caller-supplied [`OpMem`].

pub mod insertion;

use std::fmt::{Display, Formatter};

use log::Level;

use crate::{
    Error, Result,
    arena::{Arena, OpMem, OpMemSize},
    depend::{Dependencies, Progress, Snapshot},
    geometry::{Mesh, Point, ScalarField, Tour},
    options::SolverOptions,
};

use self::insertion::{best_insertion, select_point};

pub const DEFAULT_MAX_POINTS: usize = 10_000_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolveState {
    Validating,
    Enveloping,
    Meshing,
    ConditionsSet,
    Diffusing,
    Inserting,
    Done,
}

impl SolveState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Enveloping => "enveloping",
            Self::Meshing => "meshing",
            Self::ConditionsSet => "conditions-set",
            Self::Diffusing => "diffusing",
            Self::Inserting => "inserting",
            Self::Done => "done",
        }
    }

    /// Debug line sent to the logger on entering this state.
    fn entered(self) -> &'static str {
        match self {
            Self::Validating => "state -> validating",
            Self::Enveloping => "state -> enveloping",
            Self::Meshing => "state -> meshing",
            Self::ConditionsSet => "state -> conditions-set",
            Self::Diffusing => "state -> diffusing",
            Self::Inserting => "state -> inserting",
            Self::Done => "state -> done",
        }
    }
}

impl Display for SolveState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveConfig {
    /// Largest accepted point count.
    pub max_points: usize,
    /// Extra mesh nodes allowed per input point during refinement.
    pub steiner_ratio: f64,
    /// Value the tour nodes are pinned to.
    pub boundary_value: f64,
    /// Draw every n-th insertion; 0 disables drawing.
    pub draw_every: usize,
    pub propagate_observer_errors: bool,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            steiner_ratio: 0.5,
            boundary_value: 0.0,
            draw_every: 0,
            propagate_observer_errors: false,
        }
    }
}

impl From<&SolverOptions> for SolveConfig {
    fn from(options: &SolverOptions) -> Self {
        Self {
            max_points: options.max_points,
            steiner_ratio: options.steiner_ratio,
            boundary_value: options.boundary_value,
            draw_every: if options.draw_dir_path().is_some() {
                options.draw_every
            } else {
                0
            },
            propagate_observer_errors: false,
        }
    }
}

impl SolveConfig {
    /// Mesh node capacity for `n` input points.
    pub fn node_budget(&self, n: usize) -> usize {
        let ratio = if self.steiner_ratio.is_finite() {
            self.steiner_ratio.max(0.0)
        } else {
            0.0
        };
        n.saturating_add((n as f64 * ratio).floor() as usize)
    }
}

pub struct Solver {
    config: SolveConfig,
}

impl Solver {
    pub fn new(config: SolveConfig) -> Self {
        Self { config }
    }

    /// Bytes of operational memory [`Solver::solve`] needs for `count` points.
    /// Depends on `count` only.
    pub fn sizeof_opmem(&self, count: usize, deps: &Dependencies<'_>) -> usize {
        self.persistent_size(count)
            .and(self.scratch_size(count, deps))
            .bytes()
    }

    fn persistent_size(&self, count: usize) -> OpMemSize {
        let budget = self.config.node_budget(count);
        OpMemSize::new()
            .slice::<u32>(count) // tour
            .slice::<u8>(count) // in-tour flags
            .and(Mesh::sizeof(count, budget))
            .slice::<u32>(count) // dirichlet nodes
            .slice::<f64>(budget) // field
    }

    fn scratch_size(&self, count: usize, deps: &Dependencies<'_>) -> OpMemSize {
        let budget = self.config.node_budget(count);
        let triangles = Mesh::triangle_capacity(budget);
        deps.envelope
            .sizeof_opmem(count)
            .or(deps.mesher.sizeof_opmem(count, budget))
            .or(OpMemSize::new().slice::<u8>(budget)) // mesh check
            .or(deps.heat.sizeof_opmem(budget, triangles))
            .or(deps.integral.sizeof_opmem(budget, triangles))
    }

    /// Computes a tour over `points` into `output`.
    ///
    /// `output` is written only on success. Fails with
    /// [`Error::MalformedInput`] when the point count is out of bounds.
    pub fn solve(
        &self,
        points: &[Point],
        output: &mut [u32],
        deps: &Dependencies<'_>,
        opmem: &mut OpMem,
    ) -> Result<()> {
        let mut run = Run {
            config: &self.config,
            deps,
            state: SolveState::Validating,
        };
        run.trace("solve started")?;
        run.validate(points, output)?;

        let required = self.sizeof_opmem(points.len(), deps);
        if opmem.len() < required {
            return Err(Error::invalid_input(format!(
                "operational memory holds {} bytes, {required} required",
                opmem.len()
            )));
        }

        let mut arena = opmem.arena();
        run.execute(points, output, &mut arena)
    }
}

struct Run<'r, 'd> {
    config: &'r SolveConfig,
    deps: &'r Dependencies<'d>,
    state: SolveState,
}

impl Run<'_, '_> {
    fn enter(&mut self, state: SolveState) -> Result<()> {
        self.state = state;
        self.trace(state.entered())
    }

    fn fail(&self, source: Error) -> Error {
        Error::stage(self.state, source)
    }

    fn observe(&self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if self.config.propagate_observer_errors => Err(self.fail(e)),
            Err(e) => {
                log::warn!("observer failed during {}: {e}", self.state);
                Ok(())
            }
        }
    }

    fn trace(&self, message: &str) -> Result<()> {
        self.observe(self.deps.logger.log(Level::Debug, message))
    }

    fn validate(&mut self, points: &[Point], output: &[u32]) -> Result<()> {
        let n = points.len();
        if n < 3 || n > self.config.max_points {
            let message = format!(
                "point count {n} outside the accepted range 3..={}",
                self.config.max_points
            );
            self.observe(self.deps.logger.log(Level::Error, &message))?;
            return Err(Error::malformed_input(message));
        }
        if u32::try_from(n).is_err() {
            return Err(Error::invalid_input(format!(
                "point count {n} does not fit u32 indices"
            )));
        }
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(Error::invalid_input(format!(
                "point {idx} has a non-finite coordinate"
            )));
        }
        if output.len() != n {
            return Err(Error::invalid_input(format!(
                "output holds {} entries for {n} points",
                output.len()
            )));
        }
        Ok(())
    }

    fn execute<'a>(
        &mut self,
        points: &[Point],
        output: &mut [u32],
        arena: &mut Arena<'a>,
    ) -> Result<()> {
        let n = points.len();
        let budget = self.config.node_budget(n);
        let deps = *self.deps;

        self.enter(SolveState::Enveloping)?;
        let mut tour: Tour<'a> = arena.buffer(n)?;
        let in_tour = arena.alloc::<u8>(n)?;
        deps.envelope
            .hull(points, &mut tour, &mut arena.scratch())
            .map_err(|e| self.fail(e))?;
        check_hull(n, &tour, in_tour).map_err(|e| self.fail(e))?;
        log::debug!("hull: {} of {n} points", tour.len());

        self.enter(SolveState::Meshing)?;
        let mut mesh = Mesh::alloc(arena, n, budget)?;
        deps.mesher
            .mesh(
                points,
                tour.as_slice(),
                budget,
                deps.split,
                &mut mesh,
                &mut arena.scratch(),
            )
            .map_err(|e| self.fail(e))?;
        check_mesh(n, budget, &mesh, &mut arena.scratch()).map_err(|e| self.fail(e))?;
        log::debug!(
            "mesh: {} nodes, {} triangles",
            mesh.nodes.len(),
            mesh.triangles.len()
        );
        log::debug!(
            "opmem: {} bytes held by the tour and mesh, {} left for stages",
            arena.used(),
            arena.available()
        );

        self.enter(SolveState::ConditionsSet)?;
        let mut dirichlet = arena.buffer::<u32>(n)?;
        for &point in tour.iter() {
            dirichlet.push(mesh.map_vtx[point as usize])?;
        }

        self.enter(SolveState::Diffusing)?;
        let mut field: ScalarField<'a> = arena.buffer(budget)?;
        self.diffuse(&mesh, &dirichlet, &mut field, arena)?;
        self.progress(tour.len(), n)?;
        self.draw(0, points, &mesh, &field, &tour)?;

        self.enter(SolveState::Inserting)?;
        let mut ordinal = 0;
        while let Some(point) = select_point(in_tour, &mesh.map_vtx, &field) {
            let found = best_insertion(&tour, point, |a, b| {
                let cost = deps.integral.integral(
                    &mesh,
                    &field,
                    mesh.map_vtx[a as usize],
                    mesh.map_vtx[b as usize],
                    &mut arena.scratch(),
                )?;
                if cost.is_finite() {
                    Ok(cost)
                } else {
                    Err(Error::collaborator(format!(
                        "path integral ({a}, {b}) is not finite"
                    )))
                }
            })
            .map_err(|e| self.fail(e))?;

            tour.insert(found.position + 1, point)?;
            in_tour[point as usize] = 1;
            dirichlet.push(mesh.map_vtx[point as usize])?;
            ordinal += 1;
            log::trace!(
                "inserted {point} after position {} (delta {:.6})",
                found.position,
                found.delta
            );
            self.progress(tour.len(), n)?;

            let complete = tour.len() == n;
            if !complete {
                self.diffuse(&mesh, &dirichlet, &mut field, arena)?;
            }
            let every = self.config.draw_every;
            if every > 0 && (ordinal % every == 0 || complete) {
                self.draw(ordinal, points, &mesh, &field, &tour)?;
            }
        }

        if tour.len() != n {
            return Err(self.fail(Error::invalid_data(format!(
                "tour holds {} of {n} points after insertion",
                tour.len()
            ))));
        }

        self.enter(SolveState::Done)?;
        output.copy_from_slice(&tour);
        Ok(())
    }

    fn diffuse(
        &self,
        mesh: &Mesh<'_>,
        dirichlet: &[u32],
        field: &mut ScalarField<'_>,
        arena: &mut Arena<'_>,
    ) -> Result<()> {
        field.clear();
        self.deps
            .heat
            .solve(
                mesh,
                dirichlet,
                self.config.boundary_value,
                field,
                &mut arena.scratch(),
            )
            .map_err(|e| self.fail(e))?;

        if field.len() != mesh.nodes.len() {
            return Err(self.fail(Error::collaborator(format!(
                "field has {} values for {} mesh nodes",
                field.len(),
                mesh.nodes.len()
            ))));
        }
        if let Some(node) = field.iter().position(|v| !v.is_finite()) {
            return Err(self.fail(Error::collaborator(format!(
                "field value at node {node} is not finite"
            ))));
        }
        Ok(())
    }

    fn progress(&self, in_tour: usize, total: usize) -> Result<()> {
        self.observe(self.deps.reporter.report(Progress { in_tour, total }))
    }

    fn draw(
        &self,
        ordinal: usize,
        points: &[Point],
        mesh: &Mesh<'_>,
        field: &[f64],
        tour: &[u32],
    ) -> Result<()> {
        if self.config.draw_every == 0 {
            return Ok(());
        }
        let snapshot = Snapshot {
            ordinal,
            points,
            mesh,
            field,
            tour,
        };
        self.observe(self.deps.drawer.draw(&snapshot))
    }
}

/// Hull must be at least a triangle of distinct, in-range indices. Marks the
/// hull points in `in_tour`.
fn check_hull(n: usize, hull: &[u32], in_tour: &mut [u8]) -> Result<()> {
    if hull.len() < 3 {
        return Err(Error::collaborator(format!(
            "hull has {} vertices, need at least 3",
            hull.len()
        )));
    }
    for &idx in hull {
        let Some(flag) = in_tour.get_mut(idx as usize) else {
            return Err(Error::collaborator(format!(
                "hull index {idx} outside 0..{n}"
            )));
        };
        if *flag != 0 {
            return Err(Error::collaborator(format!("hull repeats index {idx}")));
        }
        *flag = 1;
    }
    Ok(())
}

/// `map_vtx` must be total and injective, triangles must reference nodes.
fn check_mesh(n: usize, budget: usize, mesh: &Mesh<'_>, arena: &mut Arena<'_>) -> Result<()> {
    let nodes = mesh.nodes.len();
    if nodes > budget {
        return Err(Error::collaborator(format!(
            "mesh has {nodes} nodes, budget is {budget}"
        )));
    }
    if mesh.map_vtx.len() != n {
        return Err(Error::collaborator(format!(
            "map_vtx has {} entries for {n} points",
            mesh.map_vtx.len()
        )));
    }
    if mesh.triangles.is_empty() {
        return Err(Error::collaborator("mesh has no triangles"));
    }

    let used = arena.alloc::<u8>(nodes)?;
    for (point, &node) in mesh.map_vtx.iter().enumerate() {
        let Some(flag) = used.get_mut(node as usize) else {
            return Err(Error::collaborator(format!(
                "point {point} maps to node {node} outside 0..{nodes}"
            )));
        };
        if *flag != 0 {
            return Err(Error::collaborator(format!(
                "node {node} carries more than one input point"
            )));
        }
        *flag = 1;
    }

    if let Some(tri) = mesh
        .triangles
        .iter()
        .find(|tri| tri.v.iter().any(|&v| v as usize >= nodes))
    {
        return Err(Error::collaborator(format!(
            "triangle {:?} references a node outside 0..{nodes}",
            tri.v
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use log::Level;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::{SolveConfig, SolveState, Solver};
    use crate::{
        Error, Result, SolveStatus,
        arena::{Arena, OpMem, OpMemSize},
        depend::{
            Dependencies, Drawer, Envelope, HeatSolver, Logger, Mesher, PathIntegral, Progress,
            Reporter, Snapshot, SplitPredicate,
        },
        geometry::{Mesh, Point, ScalarField, Triangle, Tour},
    };

    #[derive(Default)]
    struct RecordingLogger {
        lines: RefCell<Vec<(Level, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: Level, message: &str) -> Result<()> {
            self.lines.borrow_mut().push((level, message.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        seen: RefCell<Vec<Progress>>,
        fail: bool,
    }

    impl Reporter for RecordingReporter {
        fn report(&self, progress: Progress) -> Result<()> {
            self.seen.borrow_mut().push(progress);
            if self.fail {
                return Err(Error::other("reporter offline"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDrawer {
        ordinals: RefCell<Vec<usize>>,
    }

    impl Drawer for RecordingDrawer {
        fn draw(&self, snapshot: &Snapshot<'_>) -> Result<()> {
            self.ordinals.borrow_mut().push(snapshot.ordinal);
            Ok(())
        }
    }

    /// Hands back a fixed index list.
    struct FixedEnvelope {
        hull: Vec<u32>,
        calls: Cell<usize>,
    }

    impl FixedEnvelope {
        fn new(hull: &[u32]) -> Self {
            Self {
                hull: hull.to_vec(),
                calls: Cell::new(0),
            }
        }
    }

    impl Envelope for FixedEnvelope {
        fn sizeof_opmem(&self, point_count: usize) -> OpMemSize {
            OpMemSize::new().slice::<u32>(point_count)
        }

        fn hull(&self, points: &[Point], hull: &mut Tour<'_>, arena: &mut Arena<'_>) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            arena.alloc::<u32>(points.len())?;
            if self.hull.is_empty() {
                return Err(Error::collaborator("degenerate input"));
            }
            hull.extend_from_slice(&self.hull)
        }
    }

    /// Identity node map and a fan over the boundary.
    #[derive(Default)]
    struct FanMesher {
        calls: Cell<usize>,
    }

    impl Mesher for FanMesher {
        fn sizeof_opmem(&self, _point_count: usize, _node_budget: usize) -> OpMemSize {
            OpMemSize::new()
        }

        fn mesh(
            &self,
            points: &[Point],
            boundary: &[u32],
            node_budget: usize,
            _split: Option<&dyn SplitPredicate>,
            mesh: &mut Mesh<'_>,
            _arena: &mut Arena<'_>,
        ) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            assert!(node_budget >= points.len());
            for (idx, &p) in points.iter().enumerate() {
                mesh.nodes.push(p)?;
                mesh.map_vtx.push(idx as u32)?;
            }
            for pair in boundary[1..].windows(2) {
                mesh.triangles
                    .push(Triangle::new(boundary[0], pair[0], pair[1]))?;
            }
            Ok(())
        }
    }

    /// Distance to the nearest pinned node, offset by the pinned value.
    #[derive(Default)]
    struct DistanceHeat {
        calls: Cell<usize>,
    }

    impl HeatSolver for DistanceHeat {
        fn sizeof_opmem(&self, node_capacity: usize, _triangle_capacity: usize) -> OpMemSize {
            OpMemSize::new().slice::<f64>(node_capacity)
        }

        fn solve(
            &self,
            mesh: &Mesh<'_>,
            dirichlet: &[u32],
            value: f64,
            field: &mut ScalarField<'_>,
            arena: &mut Arena<'_>,
        ) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            let scratch = arena.alloc::<f64>(mesh.nodes.len())?;
            for (node, slot) in scratch.iter_mut().enumerate() {
                let here = mesh.nodes[node];
                *slot = value
                    + dirichlet
                        .iter()
                        .map(|&d| here.dist(mesh.nodes[d as usize]))
                        .fold(f64::INFINITY, f64::min);
            }
            field.extend_from_slice(scratch)
        }
    }

    struct EuclidIntegral;

    impl PathIntegral for EuclidIntegral {
        fn sizeof_opmem(&self, _node_capacity: usize, _triangle_capacity: usize) -> OpMemSize {
            OpMemSize::new()
        }

        fn integral(
            &self,
            mesh: &Mesh<'_>,
            _field: &[f64],
            from: u32,
            to: u32,
            _arena: &mut Arena<'_>,
        ) -> Result<f64> {
            Ok(mesh.nodes[from as usize].dist(mesh.nodes[to as usize]))
        }
    }

    struct Harness {
        logger: RecordingLogger,
        reporter: RecordingReporter,
        drawer: RecordingDrawer,
        envelope: FixedEnvelope,
        mesher: FanMesher,
        heat: DistanceHeat,
    }

    impl Harness {
        fn new(hull: &[u32]) -> Self {
            Self {
                logger: RecordingLogger::default(),
                reporter: RecordingReporter::default(),
                drawer: RecordingDrawer::default(),
                envelope: FixedEnvelope::new(hull),
                mesher: FanMesher::default(),
                heat: DistanceHeat::default(),
            }
        }

        fn deps(&self) -> Dependencies<'_> {
            Dependencies {
                logger: &self.logger,
                reporter: &self.reporter,
                drawer: &self.drawer,
                envelope: &self.envelope,
                mesher: &self.mesher,
                heat: &self.heat,
                integral: &EuclidIntegral,
                split: None,
            }
        }

        fn solve(&self, solver: &Solver, points: &[Point]) -> (Result<()>, Vec<u32>) {
            let deps = self.deps();
            let mut opmem = OpMem::new(solver.sizeof_opmem(points.len(), &deps));
            let mut output = vec![u32::MAX; points.len()];
            let result = solver.solve(points, &mut output, &deps, &mut opmem);
            (result, output)
        }
    }

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    /// Corners of a 100x100 square first, then random interior points.
    fn square_with_interior(rng: &mut StdRng, interior: usize) -> Vec<Point> {
        let mut points = square()
            .into_iter()
            .map(|p| Point::new(p.x * 100.0, p.y * 100.0))
            .collect::<Vec<_>>();
        for _ in 0..interior {
            points.push(Point::new(
                rng.random_range(1.0..99.0),
                rng.random_range(1.0..99.0),
            ));
        }
        points
    }

    fn is_cyclic_subsequence(sub: &[u32], tour: &[u32]) -> bool {
        let Some(start) = tour.iter().position(|&v| v == sub[0]) else {
            return false;
        };
        let mut next = 0;
        for offset in 0..tour.len() {
            if next < sub.len() && tour[(start + offset) % tour.len()] == sub[next] {
                next += 1;
            }
        }
        next == sub.len()
    }

    #[test]
    fn fewer_than_three_points_is_malformed_and_calls_only_the_logger() {
        let harness = Harness::new(&[0, 1]);
        let solver = Solver::new(SolveConfig::default());

        let (result, output) = harness.solve(&solver, &square()[..2]);

        let err = result.expect_err("two points must be rejected");
        assert_eq!(err.status(), SolveStatus::MalformedInput);
        assert_eq!(output, vec![u32::MAX; 2]);
        assert_eq!(harness.envelope.calls.get(), 0);
        assert_eq!(harness.mesher.calls.get(), 0);
        assert_eq!(harness.heat.calls.get(), 0);
        assert!(harness.reporter.seen.borrow().is_empty());
        assert!(
            harness
                .logger
                .lines
                .borrow()
                .iter()
                .any(|(level, line)| *level == Level::Error && line.contains("point count 2"))
        );
    }

    #[test]
    fn point_count_above_ceiling_is_malformed() {
        let harness = Harness::new(&[0, 1, 2, 3]);
        let solver = Solver::new(SolveConfig {
            max_points: 3,
            ..SolveConfig::default()
        });

        let (result, _) = harness.solve(&solver, &square());

        assert_eq!(
            result.expect_err("4 > 3").status(),
            SolveStatus::MalformedInput
        );
        assert_eq!(harness.envelope.calls.get(), 0);
    }

    #[test]
    fn square_needs_no_insertions() {
        let harness = Harness::new(&[0, 1, 2, 3]);
        let solver = Solver::new(SolveConfig::default());

        let (result, output) = harness.solve(&solver, &square());

        result.expect("square solves");
        assert_eq!(output, vec![0, 1, 2, 3]);
        assert_eq!(harness.heat.calls.get(), 1);
        assert_eq!(
            *harness.reporter.seen.borrow(),
            vec![Progress {
                in_tour: 4,
                total: 4
            }]
        );
    }

    #[test]
    fn random_inputs_yield_permutations_containing_the_hull_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let solver = Solver::new(SolveConfig::default());

        for interior in [1, 5, 40] {
            let points = square_with_interior(&mut rng, interior);
            let harness = Harness::new(&[0, 1, 2, 3]);

            let (result, output) = harness.solve(&solver, &points);
            result.expect("solve");

            let mut sorted = output.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..points.len() as u32).collect::<Vec<_>>());
            assert!(is_cyclic_subsequence(&[0, 1, 2, 3], &output));

            // one solve for the seed field, one after every insertion but the last
            assert_eq!(harness.heat.calls.get(), interior);
            assert_eq!(harness.mesher.calls.get(), 1);
            assert_eq!(harness.reporter.seen.borrow().len(), interior + 1);
        }
    }

    #[test]
    fn state_transitions_are_logged_in_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = square_with_interior(&mut rng, 2);
        let harness = Harness::new(&[0, 1, 2, 3]);
        let solver = Solver::new(SolveConfig::default());

        harness.solve(&solver, &points).0.expect("solve");

        let transitions = harness
            .logger
            .lines
            .borrow()
            .iter()
            .filter_map(|(_, line)| line.strip_prefix("state -> ").map(str::to_string))
            .collect::<Vec<_>>();
        let expected = [
            SolveState::Enveloping,
            SolveState::Meshing,
            SolveState::ConditionsSet,
            SolveState::Diffusing,
            SolveState::Inserting,
            SolveState::Done,
        ]
        .map(|s| s.to_string());
        assert_eq!(transitions, expected);
    }

    #[test]
    fn transition_lines_name_every_state() {
        for state in [
            SolveState::Validating,
            SolveState::Enveloping,
            SolveState::Meshing,
            SolveState::ConditionsSet,
            SolveState::Diffusing,
            SolveState::Inserting,
            SolveState::Done,
        ] {
            assert_eq!(state.entered(), format!("state -> {state}"));
        }
    }

    #[test]
    fn envelope_failure_is_an_error_and_leaves_output_untouched() {
        let harness = Harness::new(&[]);
        let solver = Solver::new(SolveConfig::default());
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ];

        let (result, output) = harness.solve(&solver, &points);

        let err = result.expect_err("degenerate hull");
        assert_eq!(err.status(), SolveStatus::Error);
        assert!(matches!(
            err,
            Error::Stage {
                stage: SolveState::Enveloping,
                ..
            }
        ));
        assert_eq!(output, vec![u32::MAX; 3]);
        assert_eq!(harness.mesher.calls.get(), 0);
    }

    #[test]
    fn repeated_hull_index_is_rejected() {
        let harness = Harness::new(&[0, 1, 1, 2]);
        let solver = Solver::new(SolveConfig::default());

        let (result, _) = harness.solve(&solver, &square());

        let err = result.expect_err("repeated hull index");
        assert!(err.to_string().contains("repeats index 1"));
        assert_eq!(harness.mesher.calls.get(), 0);
    }

    #[test]
    fn out_of_range_hull_index_is_rejected() {
        let harness = Harness::new(&[0, 1, 7]);
        let solver = Solver::new(SolveConfig::default());

        let (result, _) = harness.solve(&solver, &square());

        assert_eq!(result.expect_err("index 7").status(), SolveStatus::Error);
    }

    #[test]
    fn non_finite_coordinates_are_errors_not_malformed_input() {
        let harness = Harness::new(&[0, 1, 2, 3]);
        let solver = Solver::new(SolveConfig::default());
        let mut points = square();
        points[2].y = f64::NAN;

        let (result, _) = harness.solve(&solver, &points);

        assert_eq!(result.expect_err("NaN").status(), SolveStatus::Error);
        assert_eq!(harness.envelope.calls.get(), 0);
    }

    #[test]
    fn undersized_opmem_is_rejected_before_any_stage() {
        let harness = Harness::new(&[0, 1, 2, 3]);
        let deps = harness.deps();
        let solver = Solver::new(SolveConfig::default());
        let points = square();
        let mut opmem = OpMem::new(solver.sizeof_opmem(points.len(), &deps) / 2);
        let mut output = vec![0; 4];

        let err = solver
            .solve(&points, &mut output, &deps, &mut opmem)
            .expect_err("opmem too small");

        assert!(err.to_string().contains("required"));
        assert_eq!(harness.envelope.calls.get(), 0);
    }

    #[test]
    fn output_length_must_match_point_count() {
        let harness = Harness::new(&[0, 1, 2, 3]);
        let deps = harness.deps();
        let solver = Solver::new(SolveConfig::default());
        let points = square();
        let mut opmem = OpMem::new(solver.sizeof_opmem(points.len(), &deps));
        let mut output = vec![0; 3];

        let err = solver
            .solve(&points, &mut output, &deps, &mut opmem)
            .expect_err("short output");
        assert_eq!(err.status(), SolveStatus::Error);
    }

    #[test]
    fn sizeof_opmem_depends_only_on_count() {
        let harness = Harness::new(&[0, 1, 2, 3]);
        let deps = harness.deps();
        let solver = Solver::new(SolveConfig::default());

        let small = solver.sizeof_opmem(10, &deps);
        assert_eq!(small, solver.sizeof_opmem(10, &deps));
        assert!(solver.sizeof_opmem(11, &deps) > small);
    }

    #[test]
    fn drawer_sees_initial_field_every_nth_insertion_and_final_state() {
        let mut rng = StdRng::seed_from_u64(11);
        let points = square_with_interior(&mut rng, 5);
        let harness = Harness::new(&[0, 1, 2, 3]);
        let solver = Solver::new(SolveConfig {
            draw_every: 2,
            ..SolveConfig::default()
        });

        harness.solve(&solver, &points).0.expect("solve");

        assert_eq!(*harness.drawer.ordinals.borrow(), vec![0, 2, 4, 5]);
    }

    #[test]
    fn drawing_is_off_by_default() {
        let mut rng = StdRng::seed_from_u64(12);
        let points = square_with_interior(&mut rng, 3);
        let harness = Harness::new(&[0, 1, 2, 3]);

        harness
            .solve(&Solver::new(SolveConfig::default()), &points)
            .0
            .expect("solve");

        assert!(harness.drawer.ordinals.borrow().is_empty());
    }

    #[test]
    fn observer_failures_are_non_fatal_unless_propagated() {
        let mut harness = Harness::new(&[0, 1, 2, 3]);
        harness.reporter.fail = true;

        let (result, _) = harness.solve(&Solver::new(SolveConfig::default()), &square());
        result.expect("reporter failure is only logged");

        let strict = Solver::new(SolveConfig {
            propagate_observer_errors: true,
            ..SolveConfig::default()
        });
        let (result, output) = harness.solve(&strict, &square());
        let err = result.expect_err("reporter failure propagates");
        assert!(err.to_string().contains("reporter offline"));
        assert_eq!(output, vec![u32::MAX; 4]);
    }

    #[test]
    fn node_budget_adds_floor_of_steiner_ratio() {
        let config = SolveConfig {
            steiner_ratio: 0.25,
            ..SolveConfig::default()
        };
        assert_eq!(config.node_budget(10), 12);
        assert_eq!(config.node_budget(3), 3);

        let none = SolveConfig {
            steiner_ratio: f64::NAN,
            ..SolveConfig::default()
        };
        assert_eq!(none.node_budget(10), 10);
    }
}
