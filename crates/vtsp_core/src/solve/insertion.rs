//! Per-iteration decisions of the insertion loop.

use crate::{Error, Result};

/// Where a point goes: between `tour[position]` and its cyclic successor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Insertion {
    pub position: usize,
    pub delta: f64,
}

/// Unvisited point whose mesh node reads the highest field value.
///
/// Ties go to the lowest point index. `None` once every point is in the tour.
pub fn select_point(in_tour: &[u8], map_vtx: &[u32], field: &[f64]) -> Option<u32> {
    let mut best: Option<(u32, f64)> = None;
    for (point, (&visited, &node)) in in_tour.iter().zip(map_vtx).enumerate() {
        if visited != 0 {
            continue;
        }
        let value = field[node as usize];
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((point as u32, value)),
        }
    }
    best.map(|(point, _)| point)
}

/// Cheapest edge to splice `point` into, by `cost(a, p) + cost(p, b) - cost(a, b)`.
///
/// Ties go to the lowest tour position.
pub fn best_insertion<F>(tour: &[u32], point: u32, mut cost: F) -> Result<Insertion>
where
    F: FnMut(u32, u32) -> Result<f64>,
{
    let len = tour.len();
    if len < 2 {
        return Err(Error::invalid_data(format!(
            "cannot insert into a tour of {len} points"
        )));
    }

    let mut best: Option<Insertion> = None;
    for position in 0..len {
        let a = tour[position];
        let b = tour[(position + 1) % len];
        let delta = cost(a, point)? + cost(point, b)? - cost(a, b)?;
        if !delta.is_finite() {
            return Err(Error::invalid_data(format!(
                "insertion cost for edge ({a}, {b}) is not finite"
            )));
        }
        match best {
            Some(current) if delta >= current.delta => {}
            _ => best = Some(Insertion { position, delta }),
        }
    }

    best.ok_or_else(|| Error::other("no insertion edge evaluated"))
}

#[cfg(test)]
mod tests {
    use super::{Insertion, best_insertion, select_point};
    use crate::{Error, geometry::Point};

    #[test]
    fn select_point_takes_highest_unvisited_value() {
        let in_tour = [1, 0, 0, 0];
        let map_vtx = [0, 1, 2, 3];
        let field = [9.0, 0.5, 2.0, 1.0];
        assert_eq!(select_point(&in_tour, &map_vtx, &field), Some(2));
    }

    #[test]
    fn select_point_breaks_ties_by_lowest_index() {
        let in_tour = [0, 1, 0, 0];
        let map_vtx = [3, 2, 1, 0];
        let field = [1.0, 1.0, 9.0, 1.0];
        assert_eq!(select_point(&in_tour, &map_vtx, &field), Some(0));
    }

    #[test]
    fn select_point_reads_through_the_vertex_map() {
        let in_tour = [0, 0, 1];
        let map_vtx = [4, 1, 0];
        let field = [0.0, 3.0, 0.0, 0.0, 5.0];
        assert_eq!(select_point(&in_tour, &map_vtx, &field), Some(0));
    }

    #[test]
    fn select_point_is_none_when_tour_is_complete() {
        assert_eq!(select_point(&[1, 1], &[0, 1], &[0.0, 0.0]), None);
    }

    #[test]
    fn best_insertion_minimizes_detour() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
            Point::new(3.5, 2.0),
        ];
        let dist = |a: u32, b: u32| Ok(points[a as usize].dist(points[b as usize]));

        let found = best_insertion(&[0, 1, 2, 3], 4, dist).expect("insertion");
        assert_eq!(found.position, 1);
        assert!(found.delta > 0.0);
    }

    #[test]
    fn best_insertion_breaks_ties_by_lowest_position() {
        let found = best_insertion(&[0, 1, 2, 3], 4, |_, _| Ok(1.0)).expect("insertion");
        assert_eq!(
            found,
            Insertion {
                position: 0,
                delta: 1.0
            }
        );
    }

    #[test]
    fn best_insertion_considers_the_closing_edge() {
        let cost = |a: u32, b: u32| {
            Ok(match (a.min(b), a.max(b)) {
                (2, 9) | (0, 9) => 0.1,
                _ => 1.0,
            })
        };
        let found = best_insertion(&[0, 1, 2], 9, cost).expect("insertion");
        assert_eq!(found.position, 2);
    }

    #[test]
    fn best_insertion_propagates_cost_errors() {
        let err = best_insertion(&[0, 1, 2], 3, |_, _| Err(Error::collaborator("out of range")))
            .expect_err("cost failure");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn best_insertion_rejects_short_tours() {
        assert!(best_insertion(&[0], 1, |_, _| Ok(1.0)).is_err());
    }
}
