//! Field-weighted travel costs between mesh nodes.
//!
//! Both integrals price a straight piece `a → b` as
//! `|ab| * (1 + w * (u(a) + u(b)) / 2)`, the trapezoid rule for
//! `∫ (1 + w u) ds` along the piece.

use std::cmp::Ordering;

use bytemuck::{Pod, Zeroable};
use vtsp_core::{
    Error, Result,
    arena::{Arena, OpMemSize},
    depend::PathIntegral,
    geometry::Mesh,
};

fn check_node(mesh: &Mesh<'_>, field: &[f64], node: u32) -> Result<usize> {
    let idx = node as usize;
    if idx >= mesh.nodes.len() || idx >= field.len() {
        return Err(Error::collaborator(format!(
            "node {node} outside 0..{} (field has {} values)",
            mesh.nodes.len(),
            field.len()
        )));
    }
    Ok(idx)
}

fn piece_cost(mesh: &Mesh<'_>, field: &[f64], weight: f64, a: usize, b: usize) -> f64 {
    let length = mesh.nodes[a].dist(mesh.nodes[b]);
    length * (1.0 + weight * 0.5 * (field[a] + field[b]))
}

/// Straight segment between the two nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentIntegral {
    pub field_weight: f64,
}

impl Default for SegmentIntegral {
    fn default() -> Self {
        Self { field_weight: 1.0 }
    }
}

impl PathIntegral for SegmentIntegral {
    fn sizeof_opmem(&self, _node_capacity: usize, _triangle_capacity: usize) -> OpMemSize {
        OpMemSize::new()
    }

    fn integral(
        &self,
        mesh: &Mesh<'_>,
        field: &[f64],
        from: u32,
        to: u32,
        _arena: &mut Arena<'_>,
    ) -> Result<f64> {
        let a = check_node(mesh, field, from)?;
        let b = check_node(mesh, field, to)?;
        Ok(piece_cost(mesh, field, self.field_weight, a, b))
    }
}

/// Cheapest path along mesh edges (Dijkstra over the triangle edges).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeodesicIntegral {
    pub field_weight: f64,
}

impl Default for GeodesicIntegral {
    fn default() -> Self {
        Self { field_weight: 1.0 }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct HeapEntry {
    cost: f64,
    node: u32,
    _pad: u32,
}

impl HeapEntry {
    fn new(cost: f64, node: u32) -> Self {
        Self {
            cost,
            node,
            _pad: 0,
        }
    }

    /// Cheapest first, then lowest node.
    fn before(&self, other: &Self) -> bool {
        match self.cost.total_cmp(&other.cost) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.node < other.node,
        }
    }
}

/// Binary min-heap over arena storage.
struct MinHeap<'a> {
    slots: &'a mut [HeapEntry],
    len: usize,
}

impl MinHeap<'_> {
    fn push(&mut self, entry: HeapEntry) -> Result<()> {
        if self.len == self.slots.len() {
            return Err(Error::CapacityExceeded {
                capacity: self.slots.len(),
            });
        }
        let mut at = self.len;
        self.slots[at] = entry;
        self.len += 1;
        while at > 0 {
            let parent = (at - 1) / 2;
            if !self.slots[at].before(&self.slots[parent]) {
                break;
            }
            self.slots.swap(at, parent);
            at = parent;
        }
        Ok(())
    }

    fn pop(&mut self) -> Option<HeapEntry> {
        if self.len == 0 {
            return None;
        }
        let top = self.slots[0];
        self.len -= 1;
        self.slots[0] = self.slots[self.len];
        let mut at = 0;
        loop {
            let (left, right) = (2 * at + 1, 2 * at + 2);
            let mut best = at;
            if left < self.len && self.slots[left].before(&self.slots[best]) {
                best = left;
            }
            if right < self.len && self.slots[right].before(&self.slots[best]) {
                best = right;
            }
            if best == at {
                break;
            }
            self.slots.swap(at, best);
            at = best;
        }
        Some(top)
    }
}

impl PathIntegral for GeodesicIntegral {
    fn sizeof_opmem(&self, node_capacity: usize, triangle_capacity: usize) -> OpMemSize {
        let half_edges = triangle_capacity.saturating_mul(6);
        OpMemSize::new()
            .slice::<u32>(node_capacity.saturating_add(1))
            .slice::<u32>(node_capacity)
            .slice::<u32>(half_edges)
            .slice::<f64>(node_capacity)
            .slice::<u8>(node_capacity)
            .slice::<HeapEntry>(half_edges.saturating_add(1))
    }

    fn integral(
        &self,
        mesh: &Mesh<'_>,
        field: &[f64],
        from: u32,
        to: u32,
        arena: &mut Arena<'_>,
    ) -> Result<f64> {
        let source = check_node(mesh, field, from)?;
        let target = check_node(mesh, field, to)?;
        if source == target {
            return Ok(0.0);
        }

        // node adjacency in CSR form; every triangle edge is listed from
        // both ends, once per incident triangle
        let n = mesh.nodes.len();
        let offsets = arena.alloc::<u32>(n + 1)?;
        for tri in mesh.triangles.iter() {
            for &v in &tri.v {
                offsets[v as usize + 1] += 2;
            }
        }
        for idx in 0..n {
            offsets[idx + 1] += offsets[idx];
        }
        let cursor = arena.alloc::<u32>(n)?;
        cursor.copy_from_slice(&offsets[..n]);
        let neighbors = arena.alloc::<u32>(offsets[n] as usize)?;
        for tri in mesh.triangles.iter() {
            for i in 0..3 {
                let v = tri.v[i] as usize;
                for other in [tri.v[(i + 1) % 3], tri.v[(i + 2) % 3]] {
                    neighbors[cursor[v] as usize] = other;
                    cursor[v] += 1;
                }
            }
        }

        let cost = arena.alloc::<f64>(n)?;
        cost.fill(f64::INFINITY);
        let done = arena.alloc::<u8>(n)?;
        let mut heap = MinHeap {
            slots: arena.alloc::<HeapEntry>(neighbors.len() + 1)?,
            len: 0,
        };

        cost[source] = 0.0;
        heap.push(HeapEntry::new(0.0, from))?;
        while let Some(entry) = heap.pop() {
            let node = entry.node as usize;
            if done[node] != 0 {
                continue;
            }
            if node == target {
                return Ok(entry.cost);
            }
            done[node] = 1;

            let (start, end) = (offsets[node] as usize, offsets[node + 1] as usize);
            for &next in &neighbors[start..end] {
                let next_idx = next as usize;
                if done[next_idx] != 0 {
                    continue;
                }
                let candidate =
                    entry.cost + piece_cost(mesh, field, self.field_weight, node, next_idx);
                if candidate < cost[next_idx] {
                    cost[next_idx] = candidate;
                    heap.push(HeapEntry::new(candidate, next))?;
                }
            }
        }

        Err(Error::collaborator(format!(
            "node {to} is unreachable from node {from} along mesh edges"
        )))
    }
}
