use ab_glyph::{point, Font, PxScale};
use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};

use crate::error::GlyphError;
use crate::font::{builtin_rows, FontSource};

/// Luminance at or above this is paper, below it is ink.
const INK_THRESHOLD: u8 = 128;

/// Largest canvas side we agree to allocate for one glyph.
const MAX_CANVAS: u32 = 4096;

/// Render one character into a binary mask.
///
/// The glyph is centered by its ink bounding box in a square canvas of side
/// `2 * pixel_size`. Foreground (ink) pixels are 255, background pixels are 0.
/// Characters without an outline (spaces, controls) produce an empty mask.
pub fn rasterize(ch: char, font: &FontSource, pixel_size: u32) -> Result<GrayImage, GlyphError> {
    let side = pixel_size.max(1).saturating_mul(2);
    if side > MAX_CANVAS {
        return Err(GlyphError::CanvasSize(side));
    }
    let mut canvas = GrayImage::from_pixel(side, side, Luma([255]));

    match font {
        FontSource::Loaded(outline_font) if outline_font.glyph_id(ch).0 != 0 => {
            draw_outline(&mut canvas, outline_font, ch, pixel_size);
        }
        _ if ch.is_whitespace() || ch.is_control() => {}
        _ => {
            let rows = builtin_rows(ch).ok_or(GlyphError::Unsupported(ch))?;
            draw_builtin(&mut canvas, &rows, pixel_size);
        }
    }

    // threshold() maps values > t to 0 and the rest to 255 when inverted.
    Ok(threshold(&canvas, INK_THRESHOLD - 1, ThresholdType::BinaryInverted))
}

/// Draw a glyph from an outline font, coverage mapped to dark luminance.
fn draw_outline<F: Font>(canvas: &mut GrayImage, font: &F, ch: char, pixel_size: u32) {
    let glyph = font
        .glyph_id(ch)
        .with_scale_and_position(PxScale::from(pixel_size as f32), point(0.0, 0.0));
    let Some(outlined) = font.outline_glyph(glyph) else {
        return;
    };

    let bounds = outlined.px_bounds();
    let side = canvas.width() as i32;
    let off_x = (side - bounds.width().ceil() as i32) / 2;
    let off_y = (side - bounds.height().ceil() as i32) / 2;

    outlined.draw(|x, y, coverage| {
        let px = x as i32 + off_x;
        let py = y as i32 + off_y;
        if px < 0 || py < 0 || px >= side || py >= side {
            return;
        }
        let luma = 255 - (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let pixel = canvas.get_pixel_mut(px as u32, py as u32);
        pixel.0[0] = pixel.0[0].min(luma);
    });
}

/// Draw an 8×8 bitmap glyph, each cell scaled to a square block so the glyph
/// spans roughly `pixel_size` pixels.
fn draw_builtin(canvas: &mut GrayImage, rows: &[u8; 8], pixel_size: u32) {
    let cell = (pixel_size / 8).max(1);
    let offset = (canvas.width().saturating_sub(cell * 8)) / 2;
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..8u32 {
            if bits & (1 << col) == 0 {
                continue;
            }
            let x0 = offset + col * cell;
            let y0 = offset + row as u32 * cell;
            for y in y0..y0 + cell {
                for x in x0..x0 + cell {
                    canvas.put_pixel(x, y, Luma([0]));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == 255).count()
    }

    #[test]
    fn builtin_glyph_is_binary_and_sized() {
        let mask = rasterize('A', &FontSource::Builtin, 40).unwrap();
        assert_eq!(mask.dimensions(), (80, 80));
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert!(ink(&mask) > 0);
    }

    #[test]
    fn builtin_glyph_is_centered() {
        // '█' fills the whole 8×8 cell.
        let mask = rasterize('█', &FontSource::Builtin, 16).unwrap();
        assert_eq!(ink(&mask), 16 * 16);
        assert_eq!(mask.get_pixel(8, 8).0[0], 255);
        assert_eq!(mask.get_pixel(23, 23).0[0], 255);
        assert_eq!(mask.get_pixel(7, 7).0[0], 0);
        assert_eq!(mask.get_pixel(24, 24).0[0], 0);
    }

    #[test]
    fn space_is_empty() {
        let mask = rasterize(' ', &FontSource::Builtin, 40).unwrap();
        assert_eq!(ink(&mask), 0);
    }

    #[test]
    fn unknown_char_is_a_glyph_error() {
        assert_eq!(
            rasterize('漢', &FontSource::Builtin, 40),
            Err(GlyphError::Unsupported('漢'))
        );
    }

    #[test]
    fn oversized_canvas_is_refused() {
        assert_eq!(
            rasterize('A', &FontSource::Builtin, 5000),
            Err(GlyphError::CanvasSize(10000))
        );
    }
}
