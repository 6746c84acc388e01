//! Pen commands and the contour → command encoder.
//!
//! Layout works in page millimetres with the origin at the top-left corner
//! and y growing downward. Commands are emitted in machine coordinates:
//! origin at the page centre, y growing upward.

use kurbo::{Affine, Point};

use crate::config::{LayoutConfig, GLYPH_PX_PER_MM};
use crate::contour::Contour;

/// One step of a page program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Travel with the pen lifted.
    MoveUp(Point),
    /// Draw a line to the target (pen must be down to leave ink).
    MoveDown(Point),
    PenDown,
    PenUp,
}

impl Command {
    /// Target of a move, if this is one.
    pub fn target(&self) -> Option<Point> {
        match *self {
            Command::MoveUp(p) | Command::MoveDown(p) => Some(p),
            Command::PenDown | Command::PenUp => None,
        }
    }
}

/// Round to 3 decimal places of a millimetre.
pub fn round_mm(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Page geometry needed to move between layout and machine coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub width: f64,
    pub height: f64,
}

impl PageFrame {
    pub fn new(config: &LayoutConfig) -> Self {
        let (width, height) = config.paper.dimensions_mm();
        PageFrame { width, height }
    }

    /// Layout mm (top-left origin, y down) → machine mm (centre origin, y up).
    pub fn to_machine(&self) -> Affine {
        Affine::new([1.0, 0.0, 0.0, -1.0, -self.width / 2.0, self.height / 2.0])
    }

    /// Machine mm → layout mm. The map is its own inverse up to the frame size.
    pub fn to_layout(&self) -> Affine {
        self.to_machine().inverse()
    }

    /// Convert and round a layout point.
    pub fn machine_point(&self, layout: Point) -> Point {
        let p = self.to_machine() * layout;
        Point::new(round_mm(p.x), round_mm(p.y))
    }
}

/// Calibration lines: count, spacing and length (mm), and the distance of
/// their top ends below the top edge of the page.
const PATTERN_LINES: i32 = 5;
const PATTERN_SPACING_MM: f64 = 10.0;
const PATTERN_LENGTH_MM: f64 = 20.0;
const PATTERN_TOP_MM: f64 = 50.0;

/// Plotter calibration program: five vertical lines around the page's
/// centre line, drawn top to bottom, each with its own pen drop.
pub fn test_pattern(frame: &PageFrame) -> Vec<Command> {
    let mut commands = vec![Command::PenUp];
    let half = PATTERN_LINES / 2;
    for i in -half..=half {
        let x = frame.width / 2.0 + i as f64 * PATTERN_SPACING_MM;
        commands.extend([
            Command::MoveUp(frame.machine_point(Point::new(x, PATTERN_TOP_MM))),
            Command::PenDown,
            Command::MoveDown(frame.machine_point(Point::new(x, PATTERN_TOP_MM + PATTERN_LENGTH_MM))),
            Command::PenUp,
        ]);
    }
    commands
}

/// Turns glyph contours into pen commands for one page frame.
#[derive(Debug, Clone, Copy)]
pub struct ToolpathEncoder {
    frame: PageFrame,
    px_per_mm: f64,
}

impl ToolpathEncoder {
    pub fn new(frame: PageFrame) -> Self {
        ToolpathEncoder {
            frame,
            px_per_mm: GLYPH_PX_PER_MM,
        }
    }

    pub fn frame(&self) -> &PageFrame {
        &self.frame
    }

    /// Encode one stroke placed with its glyph canvas corner at `origin`
    /// (layout mm), shifted down by `vertical_jitter` mm.
    ///
    /// Emits: travel to the first point, pen down, a line to every other
    /// point, pen up. Contours with fewer than 2 points encode to nothing.
    pub fn encode(&self, contour: &Contour, origin: Point, vertical_jitter: f64) -> Vec<Command> {
        if contour.points.len() < 2 {
            return Vec::new();
        }

        let place = |&(px, py): &(i32, i32)| {
            self.frame.machine_point(Point::new(
                origin.x + px as f64 / self.px_per_mm,
                origin.y + py as f64 / self.px_per_mm + vertical_jitter,
            ))
        };

        let mut commands = Vec::with_capacity(contour.points.len() + 2);
        let mut points = contour.points.iter();
        if let Some(first) = points.next() {
            commands.push(Command::MoveUp(place(first)));
            commands.push(Command::PenDown);
        }
        commands.extend(points.map(|p| Command::MoveDown(place(p))));
        commands.push(Command::PenUp);
        commands
    }
}
