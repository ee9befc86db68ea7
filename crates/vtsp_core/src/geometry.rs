use bytemuck::{Pod, Zeroable};

use crate::{
    Result,
    arena::{Arena, Buffer, OpMemSize},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dist(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Three mesh node indices in counter-clockwise order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub v: [u32; 3],
}

impl Triangle {
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self { v: [a, b, c] }
    }
}

/// Partial or complete cycle of point indices.
pub type Tour<'a> = Buffer<'a, u32>;

/// One value per mesh node.
pub type ScalarField<'a> = Buffer<'a, f64>;

/// Triangulated region. `map_vtx[i]` is the node carrying input point `i`.
pub struct Mesh<'a> {
    pub nodes: Buffer<'a, Point>,
    pub triangles: Buffer<'a, Triangle>,
    pub map_vtx: Buffer<'a, u32>,
}

impl<'a> Mesh<'a> {
    /// Upper bound on triangles for `nodes` nodes of a planar triangulation.
    pub fn triangle_capacity(nodes: usize) -> usize {
        nodes.saturating_mul(2)
    }

    pub fn sizeof(point_count: usize, node_capacity: usize) -> OpMemSize {
        OpMemSize::new()
            .slice::<Point>(node_capacity)
            .slice::<Triangle>(Self::triangle_capacity(node_capacity))
            .slice::<u32>(point_count)
    }

    pub fn alloc(arena: &mut Arena<'a>, point_count: usize, node_capacity: usize) -> Result<Self> {
        Ok(Self {
            nodes: arena.buffer(node_capacity)?,
            triangles: arena.buffer(Self::triangle_capacity(node_capacity))?,
            map_vtx: arena.buffer(point_count)?,
        })
    }

    pub fn triangle_points(&self, tri: Triangle) -> [Point; 3] {
        tri.v.map(|v| self.nodes[v as usize])
    }
}

/// Twice the signed area of `abc`; positive when counter-clockwise.
#[inline]
pub fn orient2d(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Positive when `d` lies strictly inside the circumcircle of CCW `abc`.
#[inline]
pub fn in_circle(a: Point, b: Point, c: Point, d: Point) -> f64 {
    let (adx, ady) = (a.x - d.x, a.y - d.y);
    let (bdx, bdy) = (b.x - d.x, b.y - d.y);
    let (cdx, cdy) = (c.x - d.x, c.y - d.y);
    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;
    adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx) + ad * (bdx * cdy - bdy * cdx)
}

/// Area of the polygon visiting `points[ring[i]]` in order.
pub fn ring_area(points: &[Point], ring: &[u32]) -> f64 {
    let n = ring.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[ring[i] as usize];
        let b = points[ring[(i + 1) % n] as usize];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

/// Closed length of the cycle `tour` over `points`.
pub fn tour_length(points: &[Point], tour: &[u32]) -> f64 {
    let n = tour.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[tour[i] as usize];
        let b = points[tour[(i + 1) % n] as usize];
        sum += a.dist(b);
    }
    sum
}
