//! Linear finite elements for `-k Δu = f` with fixed-value nodes.
//!
//! The stiffness matrix is never stored: each conjugate-gradient iteration
//! re-assembles the element contributions while applying it.

use vtsp_core::{
    Error, Result,
    arena::{Arena, OpMemSize},
    depend::HeatSolver,
    geometry::{Mesh, Point, ScalarField, orient2d},
};

const DEGENERATE_EPS: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FemHeatSolver {
    pub diffusion: f64,
    pub source: f64,
    /// Relative residual at which the iteration stops.
    pub tolerance: f64,
    /// 0 picks a bound from the node count.
    pub max_iterations: usize,
}

impl Default for FemHeatSolver {
    fn default() -> Self {
        Self {
            diffusion: 1.0,
            source: 1.0,
            tolerance: 1e-10,
            max_iterations: 0,
        }
    }
}

/// Gradients of the three barycentric hats, scaled by twice the area.
struct Element {
    nodes: [usize; 3],
    area: f64,
    b: [f64; 3],
    c: [f64; 3],
}

impl Element {
    fn new(mesh: &Mesh<'_>, index: usize) -> Result<Self> {
        let tri = mesh.triangles[index];
        let [p0, p1, p2] = mesh.triangle_points(tri);
        let twice = orient2d(p0, p1, p2);
        let longest = longest_edge_sq(p0, p1, p2);
        if !(twice > DEGENERATE_EPS * longest) {
            return Err(Error::collaborator(format!(
                "triangle {index} {:?} is degenerate or clockwise",
                tri.v
            )));
        }
        Ok(Self {
            nodes: tri.v.map(|v| v as usize),
            area: 0.5 * twice,
            b: [p1.y - p2.y, p2.y - p0.y, p0.y - p1.y],
            c: [p2.x - p1.x, p0.x - p2.x, p1.x - p0.x],
        })
    }

    fn stiffness(&self, diffusion: f64, i: usize, j: usize) -> f64 {
        diffusion * (self.b[i] * self.b[j] + self.c[i] * self.c[j]) / (4.0 * self.area)
    }
}

fn longest_edge_sq(a: Point, b: Point, c: Point) -> f64 {
    let sq = |p: Point, q: Point| (p.x - q.x).powi(2) + (p.y - q.y).powi(2);
    sq(a, b).max(sq(b, c)).max(sq(c, a))
}

impl FemHeatSolver {
    fn iteration_cap(&self, free: usize) -> usize {
        match self.max_iterations {
            0 => free.saturating_mul(10).saturating_add(100),
            cap => cap,
        }
    }

    /// `q = K p` restricted to free nodes.
    fn apply(&self, mesh: &Mesh<'_>, pinned: &[u8], p: &[f64], q: &mut [f64]) -> Result<()> {
        q.fill(0.0);
        for t in 0..mesh.triangles.len() {
            let element = Element::new(mesh, t)?;
            for i in 0..3 {
                let vi = element.nodes[i];
                if pinned[vi] != 0 {
                    continue;
                }
                for j in 0..3 {
                    let vj = element.nodes[j];
                    if pinned[vj] == 0 {
                        q[vi] += element.stiffness(self.diffusion, i, j) * p[vj];
                    }
                }
            }
        }
        Ok(())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl HeatSolver for FemHeatSolver {
    fn sizeof_opmem(&self, node_capacity: usize, _triangle_capacity: usize) -> OpMemSize {
        let mut size = OpMemSize::new().slice::<u8>(node_capacity);
        for _ in 0..6 {
            size = size.slice::<f64>(node_capacity);
        }
        size
    }

    fn solve(
        &self,
        mesh: &Mesh<'_>,
        dirichlet: &[u32],
        value: f64,
        field: &mut ScalarField<'_>,
        arena: &mut Arena<'_>,
    ) -> Result<()> {
        field.clear();
        let n = mesh.nodes.len();
        if dirichlet.is_empty() {
            return Err(Error::collaborator("heat solve needs at least one fixed node"));
        }

        let pinned = arena.alloc::<u8>(n)?;
        for &node in dirichlet {
            let Some(flag) = pinned.get_mut(node as usize) else {
                return Err(Error::collaborator(format!(
                    "fixed node {node} outside 0..{n}"
                )));
            };
            *flag = 1;
        }

        let diag = arena.alloc::<f64>(n)?;
        let rhs = arena.alloc::<f64>(n)?;
        for t in 0..mesh.triangles.len() {
            let element = Element::new(mesh, t)?;
            let load = self.source * element.area / 3.0;
            for i in 0..3 {
                let vi = element.nodes[i];
                if pinned[vi] != 0 {
                    continue;
                }
                diag[vi] += element.stiffness(self.diffusion, i, i);
                rhs[vi] += load;
                for j in 0..3 {
                    if pinned[element.nodes[j]] != 0 {
                        rhs[vi] -= element.stiffness(self.diffusion, i, j) * value;
                    }
                }
            }
        }

        let mut free = 0;
        for node in 0..n {
            if pinned[node] != 0 {
                continue;
            }
            if !(diag[node] > 0.0) {
                return Err(Error::collaborator(format!(
                    "node {node} has no stiffness (not covered by a triangle)"
                )));
            }
            free += 1;
        }

        let x = arena.alloc::<f64>(n)?;
        let r = arena.alloc::<f64>(n)?;
        let p = arena.alloc::<f64>(n)?;
        let q = arena.alloc::<f64>(n)?;

        // Jacobi-preconditioned conjugate gradients from x = 0
        let rhs_norm = dot(rhs, rhs).sqrt();
        r.copy_from_slice(rhs);
        let mut rho = 0.0;
        for node in 0..n {
            if pinned[node] == 0 {
                p[node] = r[node] / diag[node];
                rho += r[node] * p[node];
            }
        }

        let cap = self.iteration_cap(free);
        let mut iterations = 0;
        let mut residual = rhs_norm;
        while residual > self.tolerance * rhs_norm {
            if iterations == cap {
                return Err(Error::collaborator(format!(
                    "conjugate gradients did not converge in {cap} iterations (residual {residual:e})"
                )));
            }
            iterations += 1;

            self.apply(mesh, pinned, p, q)?;
            let curvature = dot(p, q);
            if !(curvature > 0.0) {
                return Err(Error::collaborator(format!(
                    "stiffness matrix is not positive definite (p.Kp = {curvature:e})"
                )));
            }
            let alpha = rho / curvature;
            for node in 0..n {
                x[node] += alpha * p[node];
                r[node] -= alpha * q[node];
            }
            residual = dot(r, r).sqrt();

            let mut next_rho = 0.0;
            for node in 0..n {
                if pinned[node] == 0 {
                    next_rho += r[node] * r[node] / diag[node];
                }
            }
            let beta = next_rho / rho;
            rho = next_rho;
            for node in 0..n {
                if pinned[node] == 0 {
                    p[node] = r[node] / diag[node] + beta * p[node];
                }
            }
        }
        log::debug!("heat solve: {free} free nodes, {iterations} iterations, residual {residual:e}");

        for node in 0..n {
            field.push(if pinned[node] != 0 { value } else { x[node] })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vtsp_core::{
        arena::OpMem,
        depend::{Envelope, HeatSolver, Mesher},
        geometry::{Mesh, Point, Triangle},
    };

    use super::FemHeatSolver;
    use crate::{delaunay::DelaunayMesher, envelope::MonotoneChainEnvelope};

    fn square_with_center() -> (Vec<Point>, Vec<Triangle>) {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.5, 0.5),
        ];
        let triangles = vec![
            Triangle::new(4, 0, 1),
            Triangle::new(4, 1, 2),
            Triangle::new(4, 2, 3),
            Triangle::new(4, 3, 0),
        ];
        (points, triangles)
    }

    fn solve_on(
        solver: &FemHeatSolver,
        points: &[Point],
        triangles: &[Triangle],
        dirichlet: &[u32],
        value: f64,
    ) -> vtsp_core::Result<Vec<f64>> {
        let n = points.len();
        let size = Mesh::sizeof(n, n)
            .slice::<f64>(n)
            .and(solver.sizeof_opmem(n, triangles.len()));
        let mut opmem = OpMem::new(size.bytes());
        let mut arena = opmem.arena();
        let mut mesh = Mesh::alloc(&mut arena, n, n)?;
        mesh.nodes.extend_from_slice(points)?;
        mesh.triangles.extend_from_slice(triangles)?;
        let mut field = arena.buffer::<f64>(n)?;

        solver.solve(&mesh, dirichlet, value, &mut field, &mut arena.scratch())?;
        Ok(field.to_vec())
    }

    #[test]
    fn single_free_node_matches_the_hand_solution() {
        let (points, triangles) = square_with_center();
        let field = solve_on(
            &FemHeatSolver::default(),
            &points,
            &triangles,
            &[0, 1, 2, 3],
            0.0,
        )
        .expect("solve");

        assert_eq!(&field[..4], &[0.0; 4]);
        // diagonal 4, load 4 * (1/4) / 3
        assert!((field[4] - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn no_source_reproduces_the_boundary_value() {
        let (points, triangles) = square_with_center();
        let solver = FemHeatSolver {
            source: 0.0,
            ..FemHeatSolver::default()
        };
        let field = solve_on(&solver, &points, &triangles, &[0, 1, 2, 3], 2.5).expect("solve");
        assert!(field.iter().all(|&u| (u - 2.5).abs() < 1e-9));
    }

    #[test]
    fn stronger_diffusion_flattens_the_field() {
        let (points, triangles) = square_with_center();
        let slow = FemHeatSolver::default();
        let fast = FemHeatSolver {
            diffusion: 4.0,
            ..slow
        };
        let a = solve_on(&slow, &points, &triangles, &[0, 1, 2, 3], 0.0).expect("solve");
        let b = solve_on(&fast, &points, &triangles, &[0, 1, 2, 3], 0.0).expect("solve");
        assert!((a[4] - 4.0 * b[4]).abs() < 1e-12);
    }

    #[test]
    fn fixed_nodes_are_required_and_checked() {
        let (points, triangles) = square_with_center();
        let solver = FemHeatSolver::default();

        let none = solve_on(&solver, &points, &triangles, &[], 0.0).expect_err("no fixed nodes");
        assert!(none.to_string().contains("at least one fixed node"));

        let outside =
            solve_on(&solver, &points, &triangles, &[0, 9], 0.0).expect_err("index out of range");
        assert!(outside.to_string().contains("outside"));
    }

    #[test]
    fn uncovered_nodes_are_rejected() {
        let (mut points, triangles) = square_with_center();
        points.push(Point::new(0.25, 0.25));
        let err = solve_on(&FemHeatSolver::default(), &points, &triangles, &[0, 1, 2, 3], 0.0)
            .expect_err("node 5 is in no triangle");
        assert!(err.to_string().contains("node 5"));
    }

    #[test]
    fn clockwise_triangles_are_rejected() {
        let (points, mut triangles) = square_with_center();
        triangles[0] = Triangle::new(4, 1, 0);
        let err = solve_on(&FemHeatSolver::default(), &points, &triangles, &[0, 1, 2, 3], 0.0)
            .expect_err("clockwise");
        assert!(err.to_string().contains("clockwise"));
    }

    #[test]
    fn field_on_a_grid_mesh_is_positive_off_the_hull() {
        let mut points = Vec::new();
        for row in 0..6 {
            for col in 0..6 {
                points.push(Point::new(col as f64, row as f64));
            }
        }
        let n = points.len();
        let solver = FemHeatSolver::default();
        let size = Mesh::sizeof(n, n)
            .slice::<u32>(n)
            .slice::<f64>(n)
            .and(MonotoneChainEnvelope.sizeof_opmem(n))
            .and(DelaunayMesher.sizeof_opmem(n, n))
            .and(solver.sizeof_opmem(n, Mesh::triangle_capacity(n)));
        let mut opmem = OpMem::new(size.bytes());
        let mut arena = opmem.arena();

        let mut hull = arena.buffer::<u32>(n).expect("hull");
        MonotoneChainEnvelope
            .hull(&points, &mut hull, &mut arena.scratch())
            .expect("hull");
        let mut mesh = Mesh::alloc(&mut arena, n, n).expect("mesh");
        DelaunayMesher
            .mesh(&points, &hull, n, None, &mut mesh, &mut arena.scratch())
            .expect("mesh");
        let mut field = arena.buffer::<f64>(n).expect("field");
        solver
            .solve(&mesh, &hull, 0.0, &mut field, &mut arena.scratch())
            .expect("solve");

        for (node, &u) in field.iter().enumerate() {
            if hull.contains(&(node as u32)) {
                assert_eq!(u, 0.0);
            } else {
                assert!(u > 0.0, "node {node} has {u}");
            }
        }
    }
}
