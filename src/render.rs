//! Raster previews of page programs.
//!
//! Replays pen commands into kurbo poly-lines and strokes them onto a
//! tiny-skia pixmap the size of the paper at the preview DPI.

use kurbo::{BezPath, PathEl, Point};

use crate::config::LayoutConfig;
use crate::error::HandwriteError;
use crate::toolpath::{Command, PageFrame};

const MM_PER_INCH: f64 = 25.4;

/// Pen tip width drawn in previews.
const PEN_WIDTH_MM: f64 = 0.3;

/// Margin band shade.
const MARGIN_GRAY: u8 = 240;

/// Size in pixels of `mm` at `dpi`.
pub fn mm_to_px(mm: f64, dpi: f64) -> u32 {
    (mm * dpi / MM_PER_INCH).round().max(1.0) as u32
}

/// Group pen-down moves into poly-lines, in machine coordinates.
///
/// A poly-line starts where the pen goes down and ends where it comes up.
/// Moves with the pen up only relocate the pen.
pub fn strokes(commands: &[Command]) -> BezPath {
    let mut path = BezPath::new();
    let mut position: Option<Point> = None;
    let mut pen_down = false;
    let mut started = false;

    for command in commands {
        match *command {
            Command::PenDown => {
                pen_down = true;
                started = false;
            }
            Command::PenUp => {
                pen_down = false;
                started = false;
            }
            Command::MoveUp(p) => {
                position = Some(p);
                started = false;
            }
            Command::MoveDown(p) => {
                if pen_down {
                    if !started {
                        if let Some(from) = position {
                            path.move_to(from);
                            started = true;
                        }
                    }
                    if started {
                        path.line_to(p);
                    }
                }
                position = Some(p);
            }
        }
    }
    path
}

/// Convert stroke poly-lines to a `tiny_skia::Path` in pixel space.
///
/// [`strokes`] only produces move and line elements; curves and closes
/// are not part of a pen program.
fn polylines_to_tinyskia(bezpath: &BezPath, transform: tiny_skia::Transform) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for el in bezpath.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                let (x, y) = transform_point(p.x, p.y, transform);
                pb.move_to(x, y);
            }
            PathEl::LineTo(p) => {
                let (x, y) = transform_point(p.x, p.y, transform);
                pb.line_to(x, y);
            }
            PathEl::QuadTo(..) | PathEl::CurveTo(..) | PathEl::ClosePath => {}
        }
    }
    pb.finish()
}

/// Apply transform manually to a point (f64 → f32).
fn transform_point(x: f64, y: f64, t: tiny_skia::Transform) -> (f32, f32) {
    let x = x as f32;
    let y = y as f32;
    (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
}

/// Machine mm → preview pixels: undo the centre origin, flip Y, scale.
fn machine_to_pixels(frame: &PageFrame, dpi: f64) -> tiny_skia::Transform {
    let s = (dpi / MM_PER_INCH) as f32;
    tiny_skia::Transform {
        sx: s,
        kx: 0.0,
        ky: 0.0,
        sy: -s, // flip Y
        tx: s * (frame.width / 2.0) as f32,
        ty: s * (frame.height / 2.0) as f32,
    }
}

/// Render a page program onto a paper-sized canvas.
///
/// No randomness: the same commands and config always give the same pixels.
pub fn render(commands: &[Command], config: &LayoutConfig) -> Result<tiny_skia::Pixmap, HandwriteError> {
    let frame = PageFrame::new(config);
    let dpi = config.preview_dpi;
    let (width_px, height_px) = (mm_to_px(frame.width, dpi), mm_to_px(frame.height, dpi));
    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or_else(|| {
        HandwriteError::Encode(format!("cannot allocate {width_px}x{height_px} preview"))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);

    // ── Margin bands ──
    let mut gray = tiny_skia::Paint::default();
    gray.set_color_rgba8(MARGIN_GRAY, MARGIN_GRAY, MARGIN_GRAY, 255);
    let (w, h) = (width_px as f32, height_px as f32);
    let px = |mm: f64| (mm * dpi / MM_PER_INCH) as f32;
    let m = &config.margins;
    let bands = [
        tiny_skia::Rect::from_xywh(0.0, 0.0, w, px(m.top)),
        tiny_skia::Rect::from_xywh(0.0, h - px(m.bottom), w, px(m.bottom)),
        tiny_skia::Rect::from_xywh(0.0, 0.0, px(m.left), h),
        tiny_skia::Rect::from_xywh(w - px(m.right), 0.0, px(m.right), h),
    ];
    for band in bands.into_iter().flatten() {
        pixmap.fill_rect(band, &gray, tiny_skia::Transform::identity(), None);
    }

    // ── Strokes ──
    let transform = machine_to_pixels(&frame, dpi);
    if let Some(sk_path) = polylines_to_tinyskia(&strokes(commands), transform) {
        let mut ink = tiny_skia::Paint::default();
        ink.set_color_rgba8(20, 30, 120, 255);
        ink.anti_alias = true;
        let stroke = tiny_skia::Stroke {
            width: px(PEN_WIDTH_MM).max(1.0),
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..tiny_skia::Stroke::default()
        };
        pixmap.stroke_path(&sk_path, &ink, &stroke, tiny_skia::Transform::identity(), None);
    }

    Ok(pixmap)
}

/// Encode a pixmap to PNG bytes.
pub fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, HandwriteError> {
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| HandwriteError::Encode(e.to_string()))?;
    writer
        .write_image_data(pixmap.data())
        .map_err(|e| HandwriteError::Encode(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| HandwriteError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Render and encode in one step.
pub fn render_png(commands: &[Command], config: &LayoutConfig) -> Result<Vec<u8>, HandwriteError> {
    encode_png(&render(commands, config)?)
}
