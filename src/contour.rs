use image::GrayImage;

use crate::skeleton::{skeletonize, Mask};

/// Neighbour offsets in clockwise order (y-down): E, SE, S, SW, W, NW, N, NE.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// A stroke traced from a glyph skeleton, in glyph-local pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Points in pixel coordinates (y=0 is top of the glyph canvas).
    pub points: Vec<(i32, i32)>,
    /// Whether the last point touches the first.
    pub closed: bool,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Extract pen strokes from a binary glyph mask: thin, then trace.
pub fn extract(mask: &GrayImage) -> Vec<Contour> {
    let skeleton = skeletonize(&Mask::from_gray(mask));
    if skeleton.is_empty() {
        return Vec::new();
    }
    log::trace!("skeleton: {} pixels", skeleton.count());
    trace(&skeleton)
}

/// Trace connected paths through a skeleton.
///
/// Scans row-major. From each unvisited ink pixel, walks to the first
/// unvisited 8-neighbour in clockwise order starting from the current
/// heading, until no neighbour is left. Paths of 2 points or fewer are
/// dropped.
pub fn trace(skeleton: &Mask) -> Vec<Contour> {
    let (w, h) = (skeleton.width(), skeleton.height());
    let mut visited = vec![false; (w.max(0) * h.max(0)) as usize];
    let idx = |x: i32, y: i32| (y * w + x) as usize;
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if !skeleton.get(x, y) || visited[idx(x, y)] {
                continue;
            }
            visited[idx(x, y)] = true;

            let mut points = vec![(x, y)];
            let (mut cx, mut cy) = (x, y);
            let mut heading = 0usize;
            'walk: loop {
                for turn in 0..DIRECTIONS.len() {
                    let dir = (heading + turn) % DIRECTIONS.len();
                    let (dx, dy) = DIRECTIONS[dir];
                    let (nx, ny) = (cx + dx, cy + dy);
                    if skeleton.get(nx, ny) && !visited[idx(nx, ny)] {
                        visited[idx(nx, ny)] = true;
                        points.push((nx, ny));
                        (cx, cy, heading) = (nx, ny, dir);
                        continue 'walk;
                    }
                }
                break;
            }

            if points.len() > 2 {
                let (fx, fy) = points[0];
                let closed = points.len() > 3 && (cx - fx).abs() <= 1 && (cy - fy).abs() <= 1;
                contours.push(Contour { points, closed });
            }
        }
    }

    contours
}
