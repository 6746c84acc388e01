//! Layout parameters: paper, margins, hand style and pen settings.

use std::fmt;
use std::str::FromStr;

use crate::error::HandwriteError;

/// Glyph raster resolution. A glyph for `font_size` mm is rendered at
/// `font_size * GLYPH_PX_PER_MM` pixels, and contour pixels map back to
/// millimetres by dividing by the same constant.
pub const GLYPH_PX_PER_MM: f64 = 10.0;

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperSize {
    #[default]
    A4,
    A5,
    B5,
}

impl PaperSize {
    /// (width, height) in millimetres, portrait.
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::B5 => (176.0, 250.0),
        }
    }
}

impl FromStr for PaperSize {
    type Err = HandwriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A4" => Ok(PaperSize::A4),
            "A5" => Ok(PaperSize::A5),
            "B5" => Ok(PaperSize::B5),
            _ => Err(HandwriteError::UnknownPaperSize(s.to_string())),
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaperSize::A4 => "A4",
            PaperSize::A5 => "A5",
            PaperSize::B5 => "B5",
        };
        f.write_str(name)
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 35.0,
            bottom: 25.0,
            left: 30.0,
            right: 30.0,
        }
    }
}

/// Randomization and spacing of the simulated hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandStyle {
    /// Line height as a multiple of the character size.
    pub line_spacing: f64,
    /// Lower bound of the random gap after a character, as a fraction of its width.
    pub spacing_ratio_min: f64,
    /// Upper bound of the random gap after a character.
    pub spacing_ratio_max: f64,
    /// Width of a space as a fraction of the character width (before the random gap).
    pub space_ratio: f64,
    /// Vertical wobble amplitude in mm; each stroke is shifted by a value
    /// drawn from `[-wobble_mm, wobble_mm]`.
    pub wobble_mm: f64,
}

impl Default for HandStyle {
    fn default() -> Self {
        Self {
            line_spacing: 1.5,
            spacing_ratio_min: 0.06,
            spacing_ratio_max: 0.12,
            space_ratio: 0.5,
            wobble_mm: 0.2,
        }
    }
}

/// Pen heights and feed rates written into the G-code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenSettings {
    /// Z height with the pen lifted (mm).
    pub up_z: f64,
    /// Z height with the pen on paper (mm).
    pub down_z: f64,
    /// Feed rate for XY moves (mm/min).
    pub move_speed: u32,
    /// Feed rate for pen lifts and drops (mm/min).
    pub pen_speed: u32,
}

impl PenSettings {
    /// Z values below this are treated as "pen down" when reading G-code.
    pub fn z_midpoint(&self) -> f64 {
        (self.up_z + self.down_z) / 2.0
    }
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            up_z: 0.0,
            down_z: -7.0,
            move_speed: 20_000,
            pen_speed: 20_000,
        }
    }
}

/// All layout parameters in one struct.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Nominal character size in mm (also the glyph advance before spacing).
    pub font_size: f64,
    pub margins: Margins,
    pub paper: PaperSize,
    pub style: HandStyle,
    pub pen: PenSettings,
    /// Resolution of the page previews.
    pub preview_dpi: f64,
    /// Layout stops after this many pages.
    pub max_pages: usize,
    /// Seed for spacing and wobble. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Let closing punctuation hang past the right margin instead of wrapping.
    pub hanging_punctuation: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size: 8.0,
            margins: Margins::default(),
            paper: PaperSize::A4,
            style: HandStyle::default(),
            pen: PenSettings::default(),
            preview_dpi: 150.0,
            max_pages: 100,
            seed: None,
            hanging_punctuation: false,
        }
    }
}

impl LayoutConfig {
    pub fn page_width(&self) -> f64 {
        self.paper.dimensions_mm().0
    }

    pub fn page_height(&self) -> f64 {
        self.paper.dimensions_mm().1
    }

    pub fn writing_width(&self) -> f64 {
        self.page_width() - self.margins.left - self.margins.right
    }

    pub fn writing_height(&self) -> f64 {
        self.page_height() - self.margins.top - self.margins.bottom
    }

    pub fn line_height(&self) -> f64 {
        self.font_size * self.style.line_spacing
    }

    /// Glyph raster size in pixels for the configured font size.
    pub fn glyph_pixel_size(&self) -> u32 {
        (self.font_size * GLYPH_PX_PER_MM).round().max(1.0) as u32
    }

    /// Reject configurations the layout engine cannot work with.
    pub fn validate(&self) -> Result<(), HandwriteError> {
        let m = &self.margins;
        for (name, value) in [
            ("marginTop", m.top),
            ("marginBottom", m.bottom),
            ("marginLeft", m.left),
            ("marginRight", m.right),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HandwriteError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let (width, height) = (self.writing_width(), self.writing_height());
        if width <= 0.0 || height <= 0.0 {
            return Err(HandwriteError::WritingArea { width, height });
        }

        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(HandwriteError::InvalidConfig(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if self.glyph_pixel_size() > 2048 {
            return Err(HandwriteError::InvalidConfig(format!(
                "font size {} is too large",
                self.font_size
            )));
        }

        let s = &self.style;
        for (name, value) in [
            ("line spacing", s.line_spacing),
            ("minimum spacing ratio", s.spacing_ratio_min),
            ("maximum spacing ratio", s.spacing_ratio_max),
            ("space ratio", s.space_ratio),
            ("wobble", s.wobble_mm),
        ] {
            if !value.is_finite() {
                return Err(HandwriteError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if !(s.line_spacing > 0.0) {
            return Err(HandwriteError::InvalidConfig("line spacing must be positive".into()));
        }
        if !(0.0 <= s.spacing_ratio_min && s.spacing_ratio_min <= s.spacing_ratio_max) {
            return Err(HandwriteError::InvalidConfig(format!(
                "spacing ratios must satisfy 0 <= min <= max, got {}..{}",
                s.spacing_ratio_min, s.spacing_ratio_max
            )));
        }
        if !(s.space_ratio >= 0.0) || !(s.wobble_mm >= 0.0) {
            return Err(HandwriteError::InvalidConfig(
                "space ratio and wobble must be non-negative".into(),
            ));
        }

        if !(self.preview_dpi.is_finite() && self.preview_dpi > 0.0 && self.preview_dpi <= 1200.0) {
            return Err(HandwriteError::InvalidConfig(format!(
                "preview dpi must be in (0, 1200], got {}",
                self.preview_dpi
            )));
        }
        if self.max_pages == 0 {
            return Err(HandwriteError::InvalidConfig("max pages must be at least 1".into()));
        }
        Ok(())
    }
}
