//! Thinning of a binary glyph mask down to 1-pixel-wide strokes.
//!
//! Iterative 3×3 neighbourhood erosion (Zhang–Suen): each pass peels
//! boundary pixels from one side, then the other, and stops once a pass
//! removes nothing. Stroke ends and pixels that hold a stroke together are
//! never removed, so the mask shrinks to a centerline but never empties.

use image::GrayImage;

/// Binary bitmap for thinning and tracing.
///
/// Stores the image as a flat boolean array, row-major, y-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Vec<bool>,
    width: i32,
    height: i32,
}

impl Mask {
    /// Create from a binary GrayImage (non-zero = ink).
    pub fn from_gray(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Mask {
            data: img.pixels().map(|p| p.0[0] > 0).collect(),
            width: w as i32,
            height: h as i32,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Get pixel at (x, y). Out-of-bounds = false.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        self.data[(y * self.width + x) as usize]
    }

    fn clear(&mut self, x: i32, y: i32) {
        self.data[(y * self.width + x) as usize] = false;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&b| b)
    }

    /// The 8 neighbours P2..P9, clockwise from north.
    fn neighbours(&self, x: i32, y: i32) -> [bool; 8] {
        [
            self.get(x, y - 1),
            self.get(x + 1, y - 1),
            self.get(x + 1, y),
            self.get(x + 1, y + 1),
            self.get(x, y + 1),
            self.get(x - 1, y + 1),
            self.get(x - 1, y),
            self.get(x - 1, y - 1),
        ]
    }
}

/// Thin `mask` to a 1-pixel-wide skeleton.
pub fn skeletonize(mask: &Mask) -> Mask {
    let mut skeleton = mask.clone();
    let mut marked: Vec<(i32, i32)> = Vec::new();

    loop {
        let mut changed = false;
        for first_pass in [true, false] {
            marked.clear();
            for y in 0..skeleton.height {
                for x in 0..skeleton.width {
                    if skeleton.get(x, y) && erodable(&skeleton.neighbours(x, y), first_pass) {
                        marked.push((x, y));
                    }
                }
            }
            for &(x, y) in &marked {
                skeleton.clear(x, y);
            }
            changed |= !marked.is_empty();
        }
        if !changed {
            return skeleton;
        }
    }
}

/// Zhang–Suen deletion rule for one pixel given its neighbours P2..P9.
fn erodable(n: &[bool; 8], first_pass: bool) -> bool {
    let filled = n.iter().filter(|&&b| b).count();
    if !(2..=6).contains(&filled) {
        return false;
    }

    // Exactly one background→ink transition around the ring means the pixel
    // sits on a simple boundary and removing it keeps the stroke connected.
    let transitions = (0..8).filter(|&i| !n[i] && n[(i + 1) % 8]).count();
    if transitions != 1 {
        return false;
    }

    let [p2, _, p4, _, p6, _, p8, _] = *n;
    if first_pass {
        !(p2 && p4 && p6) && !(p4 && p6 && p8)
    } else {
        !(p2 && p4 && p8) && !(p2 && p6 && p8)
    }
}
