//! Delaunay triangulation of a convex region with centroid refinement.
//!
//! The boundary polygon is fanned from its first vertex and legalised, then
//! every remaining input point is inserted (walk, split, Lawson flips). Edges
//! on the boundary have no neighbour and are never flipped, so the boundary
//! survives every insertion.

use vtsp_core::{
    Error, Result,
    arena::{Arena, OpMemSize},
    depend::{Mesher, SplitPredicate, TriangleContext},
    geometry::{Mesh, Point, Triangle, in_circle, orient2d, ring_area},
};

const NONE: u32 = u32::MAX;
/// Orientation below this fraction of the squared edge length counts as "on the edge".
const ON_EDGE_EPS: f64 = 1e-12;
const COVERAGE_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default)]
pub struct DelaunayMesher;

impl Mesher for DelaunayMesher {
    fn sizeof_opmem(&self, point_count: usize, node_budget: usize) -> OpMemSize {
        let triangles = Mesh::triangle_capacity(node_budget);
        let edges = triangles.saturating_mul(3);
        OpMemSize::new()
            .slice::<[u32; 3]>(triangles)
            .slice::<u8>(edges)
            .slice::<u32>(edges)
            .slice::<u8>(point_count)
    }

    fn mesh(
        &self,
        points: &[Point],
        boundary: &[u32],
        node_budget: usize,
        split: Option<&dyn SplitPredicate>,
        mesh: &mut Mesh<'_>,
        arena: &mut Arena<'_>,
    ) -> Result<()> {
        let n = points.len();
        if node_budget < n {
            return Err(Error::collaborator(format!(
                "node budget {node_budget} is below the point count {n}"
            )));
        }

        let on_boundary = arena.alloc::<u8>(n)?;
        check_boundary(points, boundary, on_boundary)?;

        mesh.nodes.clear();
        mesh.triangles.clear();
        mesh.map_vtx.clear();
        mesh.nodes.extend_from_slice(points)?;
        for idx in 0..n as u32 {
            mesh.map_vtx.push(idx)?;
        }

        let triangles = mesh.triangles.capacity();
        let mut tri = Triangulation {
            adj: arena.alloc(triangles)?,
            pending: arena.alloc(triangles * 3)?,
            stack: arena.alloc(triangles * 3)?,
            top: 0,
            mesh,
        };

        tri.fan(boundary)?;
        let mut hint = 0;
        for idx in 0..n {
            if on_boundary[idx] == 0 {
                hint = tri.insert(idx as u32, hint)?;
            }
        }

        if let Some(split) = split {
            let added = tri.refine(split, node_budget)?;
            log::debug!("refinement added {added} Steiner nodes");
        }

        check_coverage(&*tri.mesh, ring_area(points, boundary))
    }
}

/// Boundary must be a strictly convex counter-clockwise ring of distinct,
/// in-range indices. Marks its vertices in `on_boundary`.
fn check_boundary(points: &[Point], boundary: &[u32], on_boundary: &mut [u8]) -> Result<()> {
    let k = boundary.len();
    if k < 3 {
        return Err(Error::collaborator(format!(
            "boundary has {k} vertices, need at least 3"
        )));
    }
    for &idx in boundary {
        let Some(flag) = on_boundary.get_mut(idx as usize) else {
            return Err(Error::collaborator(format!(
                "boundary index {idx} outside 0..{}",
                points.len()
            )));
        };
        if *flag != 0 {
            return Err(Error::collaborator(format!("boundary repeats index {idx}")));
        }
        *flag = 1;
    }
    for i in 0..k {
        let a = points[boundary[i] as usize];
        let b = points[boundary[(i + 1) % k] as usize];
        let c = points[boundary[(i + 2) % k] as usize];
        if orient2d(a, b, c) <= 0.0 {
            return Err(Error::collaborator(format!(
                "boundary is not a convex counter-clockwise polygon at vertex {}",
                boundary[(i + 1) % k]
            )));
        }
    }
    Ok(())
}

/// Every triangle counter-clockwise and the areas adding up to the region.
fn check_coverage(mesh: &Mesh<'_>, region: f64) -> Result<()> {
    let mut total = 0.0;
    for (idx, &tri) in mesh.triangles.iter().enumerate() {
        let [a, b, c] = mesh.triangle_points(tri);
        let twice = orient2d(a, b, c);
        if twice <= 0.0 {
            return Err(Error::collaborator(format!(
                "triangle {idx} {:?} is degenerate or clockwise",
                tri.v
            )));
        }
        total += 0.5 * twice;
    }
    if (total - region).abs() > COVERAGE_EPS * region.abs().max(f64::MIN_POSITIVE) {
        return Err(Error::collaborator(format!(
            "triangles cover {total}, boundary encloses {region}"
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Location {
    Inside,
    /// On the edge opposite this vertex slot.
    OnEdge(usize),
}

/// Triangles live in `mesh.triangles`; `adj[t][i]` is the triangle across the
/// edge opposite vertex `i` of `t`, or `NONE` on the boundary.
struct Triangulation<'m, 'a, 's> {
    mesh: &'m mut Mesh<'a>,
    adj: &'s mut [[u32; 3]],
    pending: &'s mut [u8],
    stack: &'s mut [u32],
    top: usize,
}

impl Triangulation<'_, '_, '_> {
    fn node(&self, v: u32) -> Point {
        self.mesh.nodes[v as usize]
    }

    fn verts(&self, t: u32) -> [u32; 3] {
        self.mesh.triangles[t as usize].v
    }

    fn set(&mut self, t: u32, v: [u32; 3], adj: [u32; 3]) {
        self.mesh.triangles.as_mut_slice()[t as usize] = Triangle { v };
        self.adj[t as usize] = adj;
    }

    fn add(&mut self, v: [u32; 3], adj: [u32; 3]) -> Result<u32> {
        let t = self.mesh.triangles.len();
        self.mesh.triangles.push(Triangle { v })?;
        self.adj[t] = adj;
        Ok(t as u32)
    }

    /// Points `nb`'s link to `old` at `new` instead.
    fn relink(&mut self, nb: u32, old: u32, new: u32) {
        if nb == NONE {
            return;
        }
        if let Some(slot) = self.adj[nb as usize].iter_mut().find(|slot| **slot == old) {
            *slot = new;
        }
    }

    fn opposite_slot(&self, u: u32, t: u32) -> Result<usize> {
        self.adj[u as usize]
            .iter()
            .position(|&nb| nb == t)
            .ok_or_else(|| Error::collaborator(format!("triangles {t} and {u} disagree on adjacency")))
    }

    fn fan(&mut self, ring: &[u32]) -> Result<()> {
        let k = ring.len();
        for i in 1..k - 1 {
            let t = (i - 1) as u32;
            let next = if i + 1 < k - 1 { t + 1 } else { NONE };
            let prev = if i >= 2 { t - 1 } else { NONE };
            self.add([ring[0], ring[i], ring[i + 1]], [NONE, next, prev])?;
        }
        for t in 0..(k - 3) as u32 {
            self.push_edge(t, 1)?;
        }
        self.legalize()
    }

    /// Inserts node `v`, walking from triangle `hint`. Returns a triangle
    /// touching `v` for the next walk.
    fn insert(&mut self, v: u32, hint: u32) -> Result<u32> {
        let (t, location) = self.locate(self.node(v), hint)?;
        match location {
            Location::Inside => self.split_inside(t, v)?,
            Location::OnEdge(i) => self.split_edge(t, i, v)?,
        }
        self.legalize()?;
        Ok(t)
    }

    fn locate(&self, p: Point, hint: u32) -> Result<(u32, Location)> {
        let count = self.mesh.triangles.len() as u32;
        let mut t = hint.min(count.saturating_sub(1));

        'walk: for _ in 0..count + 3 {
            let v = self.verts(t);
            let mut on_edge = None;
            for i in 0..3 {
                let (b, c) = (self.node(v[(i + 1) % 3]), self.node(v[(i + 2) % 3]));
                let o = orient2d(b, c, p);
                let eps = ON_EDGE_EPS * (b.dist(c) * b.dist(c));
                if o < -eps {
                    let nb = self.adj[t as usize][i];
                    if nb == NONE {
                        return Err(Error::collaborator(format!(
                            "point ({}, {}) lies outside the boundary",
                            p.x, p.y
                        )));
                    }
                    t = nb;
                    continue 'walk;
                }
                if o <= eps {
                    if on_edge.is_some() {
                        return Err(duplicate(p));
                    }
                    on_edge = Some(i);
                }
            }
            return Ok((t, on_edge.map_or(Location::Inside, Location::OnEdge)));
        }

        // the walk cycled on near-degenerate input; fall back to a scan
        for t in 0..count {
            let v = self.verts(t);
            let mut on_edge = None;
            let mut inside = true;
            for i in 0..3 {
                let (b, c) = (self.node(v[(i + 1) % 3]), self.node(v[(i + 2) % 3]));
                let o = orient2d(b, c, p);
                let eps = ON_EDGE_EPS * (b.dist(c) * b.dist(c));
                if o < -eps {
                    inside = false;
                    break;
                }
                if o <= eps {
                    if on_edge.is_some() {
                        return Err(duplicate(p));
                    }
                    on_edge = Some(i);
                }
            }
            if inside {
                return Ok((t, on_edge.map_or(Location::Inside, Location::OnEdge)));
            }
        }
        Err(Error::collaborator(format!(
            "point ({}, {}) is not covered by the triangulation",
            p.x, p.y
        )))
    }

    fn split_inside(&mut self, t: u32, p: u32) -> Result<()> {
        let [a, b, c] = self.verts(t);
        let [ta, tb, tc] = self.adj[t as usize];
        let t1 = self.mesh.triangles.len() as u32;
        let t2 = t1 + 1;

        self.set(t, [p, b, c], [ta, t1, t2]);
        self.add([p, c, a], [tb, t2, t])?;
        self.add([p, a, b], [tc, t, t1])?;
        self.relink(tb, t, t1);
        self.relink(tc, t, t2);

        for tri in [t, t1, t2] {
            self.push_edge(tri, 0)?;
        }
        Ok(())
    }

    fn split_edge(&mut self, t: u32, i: usize, p: u32) -> Result<()> {
        let v = self.verts(t);
        let (a, b, c) = (v[i], v[(i + 1) % 3], v[(i + 2) % 3]);
        let t_adj = self.adj[t as usize];
        let (u, t_ca, t_ab) = (t_adj[i], t_adj[(i + 1) % 3], t_adj[(i + 2) % 3]);
        let t1 = self.mesh.triangles.len() as u32;

        if u == NONE {
            self.set(t, [p, a, b], [t_ab, NONE, t1]);
            self.add([p, c, a], [t_ca, t, NONE])?;
            self.relink(t_ca, t, t1);
            self.push_edge(t, 0)?;
            return self.push_edge(t1, 0);
        }

        let j = self.opposite_slot(u, t)?;
        let uv = self.verts(u);
        let u_adj = self.adj[u as usize];
        let (d, u_bd, u_dc) = (uv[j], u_adj[(j + 1) % 3], u_adj[(j + 2) % 3]);
        let u1 = t1 + 1;

        self.set(t, [p, a, b], [t_ab, u1, t1]);
        self.add([p, c, a], [t_ca, t, u])?;
        self.set(u, [p, d, c], [u_dc, t1, u1]);
        self.add([p, b, d], [u_bd, u, t])?;
        self.relink(t_ca, t, t1);
        self.relink(u_bd, u, u1);

        for tri in [t, t1, u, u1] {
            self.push_edge(tri, 0)?;
        }
        Ok(())
    }

    fn push_edge(&mut self, t: u32, i: usize) -> Result<()> {
        let edge = t as usize * 3 + i;
        if self.pending[edge] != 0 {
            return Ok(());
        }
        if self.top == self.stack.len() {
            return Err(Error::collaborator("edge legalisation stack overflow"));
        }
        self.pending[edge] = 1;
        self.stack[self.top] = edge as u32;
        self.top += 1;
        Ok(())
    }

    /// Lawson flips until every queued edge is locally Delaunay.
    fn legalize(&mut self) -> Result<()> {
        let flip_limit = self.stack.len().saturating_mul(64);
        let mut flips = 0;

        while self.top > 0 {
            self.top -= 1;
            let edge = self.stack[self.top] as usize;
            self.pending[edge] = 0;
            let (t, i) = ((edge / 3) as u32, edge % 3);

            let u = self.adj[t as usize][i];
            if u == NONE {
                continue;
            }
            let j = self.opposite_slot(u, t)?;
            let tv = self.verts(t);
            let (a, b, c) = (tv[i], tv[(i + 1) % 3], tv[(i + 2) % 3]);
            let d = self.verts(u)[j];
            let (pa, pb, pc, pd) = (self.node(a), self.node(b), self.node(c), self.node(d));

            if in_circle(pa, pb, pc, pd) <= 0.0
                || orient2d(pa, pb, pd) <= 0.0
                || orient2d(pa, pd, pc) <= 0.0
            {
                continue;
            }

            flips += 1;
            if flips > flip_limit {
                return Err(Error::collaborator("edge flipping did not converge"));
            }
            self.flip(t, i, u, j)?;
        }
        Ok(())
    }

    /// Replaces edge `bc` shared by `t = (a, b, c)` and `u = (d, c, b)` with `ad`.
    fn flip(&mut self, t: u32, i: usize, u: u32, j: usize) -> Result<()> {
        let tv = self.verts(t);
        let (a, b, c) = (tv[i], tv[(i + 1) % 3], tv[(i + 2) % 3]);
        let d = self.verts(u)[j];
        let t_adj = self.adj[t as usize];
        let u_adj = self.adj[u as usize];
        let (t_ca, t_ab) = (t_adj[(i + 1) % 3], t_adj[(i + 2) % 3]);
        let (u_bd, u_dc) = (u_adj[(j + 1) % 3], u_adj[(j + 2) % 3]);

        self.set(t, [a, b, d], [u_bd, u, t_ab]);
        self.set(u, [a, d, c], [u_dc, t_ca, t]);
        self.relink(u_bd, u, t);
        self.relink(t_ca, t, u);

        self.push_edge(t, 0)?;
        self.push_edge(t, 2)?;
        self.push_edge(u, 0)?;
        self.push_edge(u, 1)
    }

    /// Inserts centroids of accepted triangles while the budget allows.
    fn refine(&mut self, split: &dyn SplitPredicate, node_budget: usize) -> Result<usize> {
        let mut added = 0;
        while self.mesh.nodes.len() < node_budget {
            let node_count = self.mesh.nodes.len();
            let chosen = (0..self.mesh.triangles.len()).find_map(|t| {
                let tri = self.mesh.triangles[t];
                let context = TriangleContext {
                    index: t,
                    node_count,
                    vertices: self.mesh.triangle_points(tri),
                    boundary: self.adj[t].map(|nb| nb == NONE),
                };
                split.split(&context).then(|| (t as u32, context.centroid()))
            });
            let Some((t, centroid)) = chosen else {
                break;
            };

            let v = node_count as u32;
            self.mesh.nodes.push(centroid)?;
            self.split_inside(t, v)?;
            self.legalize()?;
            added += 1;
        }
        Ok(added)
    }
}

fn duplicate(p: Point) -> Error {
    Error::collaborator(format!(
        "point ({}, {}) duplicates an existing mesh node",
        p.x, p.y
    ))
}
