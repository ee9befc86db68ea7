use vtsp_core::{
    Error, Result,
    arena::{Arena, OpMemSize},
    depend::Envelope,
    geometry::{Point, Tour, orient2d},
};

/// Andrew's monotone chain. Counter-clockwise, collinear points dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotoneChainEnvelope;

impl Envelope for MonotoneChainEnvelope {
    fn sizeof_opmem(&self, point_count: usize) -> OpMemSize {
        OpMemSize::new()
            .slice::<u32>(point_count)
            .slice::<u32>(point_count.saturating_mul(2).saturating_add(1))
    }

    fn hull(&self, points: &[Point], hull: &mut Tour<'_>, arena: &mut Arena<'_>) -> Result<()> {
        hull.clear();
        let n = points.len();
        if n < 3 {
            return Err(Error::collaborator(format!(
                "convex hull needs at least 3 points, got {n}"
            )));
        }

        let order = arena.alloc::<u32>(n)?;
        for (idx, slot) in order.iter_mut().enumerate() {
            *slot = idx as u32;
        }
        order.sort_unstable_by(|&a, &b| {
            let (pa, pb) = (points[a as usize], points[b as usize]);
            pa.x.total_cmp(&pb.x)
                .then(pa.y.total_cmp(&pb.y))
                .then(a.cmp(&b))
        });

        let chain = arena.alloc::<u32>(2 * n + 1)?;
        let turns_left = |chain: &[u32], k: usize, next: u32| {
            orient2d(
                points[chain[k - 2] as usize],
                points[chain[k - 1] as usize],
                points[next as usize],
            ) > 0.0
        };

        let mut k = 0;
        for &idx in order.iter() {
            while k >= 2 && !turns_left(chain, k, idx) {
                k -= 1;
            }
            chain[k] = idx;
            k += 1;
        }

        let lower_len = k + 1;
        for &idx in order.iter().rev().skip(1) {
            while k >= lower_len && !turns_left(chain, k, idx) {
                k -= 1;
            }
            chain[k] = idx;
            k += 1;
        }

        // the last vertex repeats the first
        let vertices = k.saturating_sub(1);
        if vertices < 3 {
            return Err(Error::collaborator(format!(
                "degenerate point set: hull has {vertices} vertices (collinear or coincident input)"
            )));
        }
        hull.extend_from_slice(&chain[..vertices])
    }
}
