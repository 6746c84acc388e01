//! handscript: text → pen-plotter handwriting.
//!
//! Each character is rendered from a font, thinned to a centerline,
//! traced into strokes and encoded as pen moves. The layout engine places
//! the strokes line by line with a little random spacing and wobble, breaks
//! pages at the margins, and renders a PNG preview of every page.
//!
//! # Example
//!
//! ```no_run
//! use handscript::{write_pages, FontSource, LayoutConfig};
//! use std::path::Path;
//!
//! let font = FontSource::load_or_builtin(Some(Path::new("fonts/hand.ttf")));
//! let pages = write_pages("Dear diary,\ntoday was fine.", LayoutConfig::default(), font)?;
//! for artifact in &pages.pages {
//!     let program = handscript::gcode::serialize(&artifact.page.commands, &Default::default());
//!     println!("page {}: {} lines of g-code", artifact.page.index, program.lines().count());
//! }
//! # Ok::<(), handscript::HandwriteError>(())
//! ```

#![forbid(unsafe_code)]

mod bitmap;
mod config;
mod contour;
mod skeleton;

pub mod error;
pub mod font;
pub mod gcode;
pub mod layout;
pub mod render;
pub mod request;
pub mod toolpath;

// Re-export kurbo so downstream users get the same Point type used by Command.
pub use kurbo;

pub use bitmap::rasterize;
pub use config::{HandStyle, LayoutConfig, Margins, PaperSize, PenSettings, GLYPH_PX_PER_MM};
pub use contour::{extract, Contour};
pub use error::{GlyphError, HandwriteError};
pub use font::FontSource;
pub use layout::{LayoutPhase, LayoutState, Page, PageArtifact, PageArtifactSet, PageLayoutEngine};
pub use toolpath::{Command, ToolpathEncoder};

/// Full pipeline: text → closed pages with previews.
///
/// Rejects empty text and invalid configurations before any layout work.
pub fn write_pages(
    text: &str,
    config: LayoutConfig,
    font: FontSource,
) -> Result<PageArtifactSet, HandwriteError> {
    if text.trim().is_empty() {
        return Err(HandwriteError::EmptyText);
    }
    let mut engine = PageLayoutEngine::new(config, font)?;
    engine.layout(text)
}

/// Character → strokes, for callers that want contours without layout.
pub fn glyph_contours(
    ch: char,
    font: &FontSource,
    pixel_size: u32,
) -> Result<Vec<Contour>, GlyphError> {
    let mask = rasterize(ch, font, pixel_size)?;
    Ok(extract(&mask))
}
