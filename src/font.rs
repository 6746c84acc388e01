//! Where glyph shapes come from: a font file, or the built-in 8×8 bitmap font.

use std::fmt;
use std::path::Path;

use ab_glyph::FontVec;
use font8x8::UnicodeFonts;

use crate::error::HandwriteError;

/// Font capability selected once per layout run.
pub enum FontSource {
    /// An outline font (TrueType/OpenType) loaded from disk or memory.
    Loaded(FontVec),
    /// The built-in 8×8 bitmap font. Always available.
    Builtin,
}

impl FontSource {
    /// Parse an outline font from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, HandwriteError> {
        FontVec::try_from_vec(data)
            .map(FontSource::Loaded)
            .map_err(|e| HandwriteError::FontLoad(e.to_string()))
    }

    /// Load an outline font from a file.
    pub fn load(path: &Path) -> Result<Self, HandwriteError> {
        let data = std::fs::read(path)
            .map_err(|e| HandwriteError::FontLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }

    /// Load `path` if given, falling back to the built-in font when the file
    /// is missing or unreadable. Never fails.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load(path) {
                Ok(font) => {
                    log::info!("using font {}", path.display());
                    font
                }
                Err(e) => {
                    log::warn!("{e}; falling back to the built-in font");
                    FontSource::Builtin
                }
            },
            None => FontSource::Builtin,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FontSource::Builtin)
    }
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::Loaded(_) => f.write_str("FontSource::Loaded"),
            FontSource::Builtin => f.write_str("FontSource::Builtin"),
        }
    }
}

/// Look up the 8×8 bitmap for `ch` across the built-in tables.
///
/// Each byte is one row, top to bottom; bit `n` is column `n` from the left.
pub(crate) fn builtin_rows(ch: char) -> Option<[u8; 8]> {
    font8x8::BASIC_FONTS
        .get(ch)
        .or_else(|| font8x8::LATIN_FONTS.get(ch))
        .or_else(|| font8x8::GREEK_FONTS.get(ch))
        .or_else(|| font8x8::HIRAGANA_FONTS.get(ch))
        .or_else(|| font8x8::BOX_FONTS.get(ch))
        .or_else(|| font8x8::BLOCK_FONTS.get(ch))
        .or_else(|| font8x8::MISC_FONTS.get(ch))
}
