use thiserror::Error;

/// Errors that can occur while turning text into pages.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandwriteError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("unsupported paper size: {0}")]
    UnknownPaperSize(String),

    #[error("margins leave no writing area ({width:.1}mm x {height:.1}mm)")]
    WritingArea { width: f64, height: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load font: {0}")]
    FontLoad(String),

    #[error("failed to encode preview: {0}")]
    Encode(String),

    #[error("g-code line {line}: {message}")]
    GcodeParse { line: usize, message: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HandwriteError {
    /// HTTP-style status for the request boundary: caller mistakes are 400,
    /// everything else 500.
    pub fn status_code(&self) -> u16 {
        match self {
            HandwriteError::EmptyText
            | HandwriteError::UnknownPaperSize(_)
            | HandwriteError::WritingArea { .. }
            | HandwriteError::InvalidConfig(_)
            | HandwriteError::GcodeParse { .. }
            | HandwriteError::Json(_) => 400,
            _ => 500,
        }
    }
}

/// Failure to turn one character into contours.
///
/// The layout engine logs these and skips the character.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GlyphError {
    #[error("no glyph for {0:?} in the loaded or built-in font")]
    Unsupported(char),

    #[error("glyph canvas of {0}px is too large")]
    CanvasSize(u32),
}
