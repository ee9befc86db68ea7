use std::{fs, path::PathBuf};

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use vtsp_core::{
    Error, Result,
    depend::{Drawer, Snapshot},
    geometry::Point,
};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const MESH_EDGE: Rgb<u8> = Rgb([190, 190, 190]);
const TOUR_EDGE: Rgb<u8> = Rgb([20, 40, 160]);
const POINT: Rgb<u8> = Rgb([0, 0, 0]);
const MARGIN: f64 = 0.05;

/// Writes `<dir>/draw-NNNNN.png` per snapshot, numbered by ordinal.
#[derive(Clone, Debug)]
pub struct PngDrawer {
    dir: PathBuf,
    width: u32,
    height: u32,
}

impl PngDrawer {
    pub fn new(dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            dir: dir.into(),
            width: width.max(16),
            height: height.max(16),
        }
    }

    pub fn frame_path(&self, ordinal: usize) -> PathBuf {
        self.dir.join(format!("draw-{ordinal:05}.png"))
    }
}

/// Maps problem coordinates onto the pixel grid, y pointing up.
struct Viewport {
    min: Point,
    scale: f64,
    offset: (f64, f64),
    height: u32,
}

impl Viewport {
    fn fit(nodes: &[Point], width: u32, height: u32) -> Self {
        let (mut min, mut max) = (
            Point::new(f64::INFINITY, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        );
        for p in nodes {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        if nodes.is_empty() {
            min = Point::new(0.0, 0.0);
            max = Point::new(1.0, 1.0);
        }

        let usable_w = width as f64 * (1.0 - 2.0 * MARGIN);
        let usable_h = height as f64 * (1.0 - 2.0 * MARGIN);
        let span_x = (max.x - min.x).max(f64::MIN_POSITIVE);
        let span_y = (max.y - min.y).max(f64::MIN_POSITIVE);
        let scale = (usable_w / span_x).min(usable_h / span_y);
        let offset = (
            (width as f64 - span_x * scale) / 2.0,
            (height as f64 - span_y * scale) / 2.0,
        );

        Self {
            min,
            scale,
            offset,
            height,
        }
    }

    fn pixel(&self, p: Point) -> (f64, f64) {
        let x = self.offset.0 + (p.x - self.min.x) * self.scale;
        let y = self.offset.1 + (p.y - self.min.y) * self.scale;
        (x, self.height as f64 - 1.0 - y)
    }
}

/// Blue (cold) to red (hot).
fn ramp(t: f64) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([
        channel(0.35 + 0.65 * t),
        channel(0.9 - 0.5 * (2.0 * t - 1.0).abs()),
        channel(1.0 - 0.65 * t),
    ])
}

fn put(image: &mut RgbImage, x: i64, y: i64, colour: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, colour);
    }
}

/// Bresenham between two pixel positions.
fn line(image: &mut RgbImage, from: (f64, f64), to: (f64, f64), colour: Rgb<u8>) {
    let (mut x0, mut y0) = (from.0.round() as i64, from.1.round() as i64);
    let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
    let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
    let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
    let mut err = dx + dy;
    loop {
        put(image, x0, y0, colour);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Paints the part of a pixel-space triangle that falls on row `y`.
fn fill_row(row: &mut [u8], y: usize, corners: &[(f64, f64); 3], colour: Rgb<u8>) {
    let [a, b, c] = *corners;
    let py = y as f64;
    if py < a.1.min(b.1).min(c.1).floor() || py > a.1.max(b.1).max(c.1).ceil() {
        return;
    }
    let area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
    if area.abs() < f64::EPSILON {
        return;
    }

    let width = row.len() / 3;
    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as usize;
    let max_x = (a.0.max(b.0).max(c.0).ceil().max(0.0) as usize).min(width.saturating_sub(1));
    let edge = |p: (f64, f64), q: (f64, f64), x: f64| {
        ((q.0 - p.0) * (py - p.1) - (q.1 - p.1) * (x - p.0)) / area
    };
    for x in min_x..=max_x {
        let px = x as f64;
        if edge(b, c, px) >= 0.0 && edge(c, a, px) >= 0.0 && edge(a, b, px) >= 0.0 {
            row[x * 3..x * 3 + 3].copy_from_slice(&colour.0);
        }
    }
}

impl Drawer for PngDrawer {
    fn draw(&self, snapshot: &Snapshot<'_>) -> Result<()> {
        let mesh = snapshot.mesh;
        let view = Viewport::fit(&mesh.nodes, self.width, self.height);
        let mut image = RgbImage::from_pixel(self.width, self.height, BACKGROUND);

        let (lo, hi) = snapshot
            .field
            .iter()
            .filter(|u| u.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &u| {
                (lo.min(u), hi.max(u))
            });
        let span = if hi > lo { hi - lo } else { 1.0 };

        let shaded = mesh
            .triangles
            .iter()
            .map(|tri| {
                let corners = mesh.triangle_points(*tri).map(|p| view.pixel(p));
                let mean = tri
                    .v
                    .iter()
                    .map(|&v| snapshot.field.get(v as usize).copied().unwrap_or(lo))
                    .sum::<f64>()
                    / 3.0;
                (corners, ramp((mean - lo) / span))
            })
            .collect::<Vec<_>>();
        let stride = self.width as usize * 3;
        image
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                for (corners, colour) in &shaded {
                    fill_row(row, y, corners, *colour);
                }
            });

        for tri in mesh.triangles.iter() {
            let corners = mesh.triangle_points(*tri).map(|p| view.pixel(p));
            for i in 0..3 {
                line(&mut image, corners[i], corners[(i + 1) % 3], MESH_EDGE);
            }
        }

        let tour = snapshot.tour;
        for i in 0..tour.len() {
            let a = snapshot.points[tour[i] as usize];
            let b = snapshot.points[tour[(i + 1) % tour.len()] as usize];
            line(&mut image, view.pixel(a), view.pixel(b), TOUR_EDGE);
        }
        for &p in snapshot.points {
            let (x, y) = view.pixel(p);
            let (x, y) = (x.round() as i64, y.round() as i64);
            for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
                put(&mut image, x + dx, y + dy, POINT);
            }
        }

        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::other(format!("cannot create draw dir {}: {e}", self.dir.display()))
        })?;
        let path = self.frame_path(snapshot.ordinal);
        image
            .save(&path)
            .map_err(|e| Error::other(format!("cannot write {}: {e}", path.display())))?;
        log::debug!("drew snapshot {} to {}", snapshot.ordinal, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use vtsp_core::{
        arena::OpMem,
        depend::{Drawer, Snapshot},
        geometry::{Mesh, Point, Triangle},
    };

    use super::{PngDrawer, ramp};

    fn unique_temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("vtsp-kernels-{name}-{nanos}"))
    }

    #[test]
    fn ramp_runs_from_blue_to_red() {
        let cold = ramp(0.0);
        let hot = ramp(1.0);
        assert!(cold.0[2] > cold.0[0]);
        assert!(hot.0[0] > hot.0[2]);
        assert_eq!(ramp(f64::NAN), cold);
    }

    #[test]
    fn draw_writes_a_png_named_by_ordinal() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let mut opmem = OpMem::new(Mesh::sizeof(4, 4).bytes());
        let mut arena = opmem.arena();
        let mut mesh = Mesh::alloc(&mut arena, 4, 4).expect("mesh");
        mesh.nodes.extend_from_slice(&points).expect("nodes");
        mesh.triangles
            .extend_from_slice(&[Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)])
            .expect("triangles");

        let dir = unique_temp_dir("draw");
        let drawer = PngDrawer::new(&dir, 64, 48);
        drawer
            .draw(&Snapshot {
                ordinal: 7,
                points: &points,
                mesh: &mesh,
                field: &[0.0, 0.5, 1.0, 0.25],
                tour: &[0, 1, 3],
            })
            .expect("draw");

        let image = image::open(drawer.frame_path(7)).expect("png").to_rgb8();
        assert_eq!(image.dimensions(), (64, 48));
        assert!(dir.join("draw-00007.png").exists());

        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }
}
