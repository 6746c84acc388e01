//! Request/response envelope around the layout engine.
//!
//! Field names follow the web front-end's camelCase JSON. Every failure is
//! turned into an error payload with a status code; nothing panics past
//! [`handle`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{LayoutConfig, Margins, PaperSize};
use crate::error::HandwriteError;
use crate::font::FontSource;
use crate::gcode;
use crate::layout::{PageArtifactSet, PageLayoutEngine};

/// Inbound generation request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_margin_top")]
    pub margin_top: f64,
    #[serde(default = "default_margin_bottom")]
    pub margin_bottom: f64,
    #[serde(default = "default_margin_side")]
    pub margin_left: f64,
    #[serde(default = "default_margin_side")]
    pub margin_right: f64,
    #[serde(default = "default_paper_size")]
    pub paper_size: String,
    /// Fixes spacing and wobble for reproducible output.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_font_size() -> f64 {
    8.0
}

fn default_margin_top() -> f64 {
    Margins::default().top
}

fn default_margin_bottom() -> f64 {
    Margins::default().bottom
}

fn default_margin_side() -> f64 {
    Margins::default().left
}

fn default_paper_size() -> String {
    PaperSize::default().to_string()
}

impl GenerateRequest {
    /// A request for `text` with every other field at its default.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: default_font_size(),
            margin_top: default_margin_top(),
            margin_bottom: default_margin_bottom(),
            margin_left: default_margin_side(),
            margin_right: default_margin_side(),
            paper_size: default_paper_size(),
            seed: None,
        }
    }

    /// Apply the request's fields on top of `base`.
    pub fn layout_config(&self, base: LayoutConfig) -> Result<LayoutConfig, HandwriteError> {
        let config = LayoutConfig {
            font_size: self.font_size,
            margins: Margins {
                top: self.margin_top,
                bottom: self.margin_bottom,
                left: self.margin_left,
                right: self.margin_right,
            },
            paper: self.paper_size.parse()?,
            seed: self.seed.or(base.seed),
            ..base
        };
        config.validate()?;
        Ok(config)
    }
}

/// Outbound response: either all pages, or an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        success: bool,
        preview_base64: Vec<String>,
        gcode_content: Vec<String>,
        session_id: String,
    },
    Failure {
        error: String,
        #[serde(skip)]
        status: u16,
    },
}

impl GenerateResponse {
    /// HTTP-style status of this response.
    pub fn status(&self) -> u16 {
        match self {
            GenerateResponse::Success { .. } => 200,
            GenerateResponse::Failure { status, .. } => *status,
        }
    }

    fn from_artifacts(set: &PageArtifactSet, config: &LayoutConfig) -> Self {
        GenerateResponse::Success {
            success: true,
            preview_base64: set
                .pages
                .iter()
                .map(|artifact| STANDARD.encode(&artifact.preview_png))
                .collect(),
            gcode_content: set
                .pages
                .iter()
                .map(|artifact| gcode::serialize(&artifact.page.commands, &config.pen))
                .collect(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    fn from_error(err: &HandwriteError) -> Self {
        GenerateResponse::Failure {
            error: err.to_string(),
            status: err.status_code(),
        }
    }
}

/// Validate the request and run the full pipeline.
pub fn generate(
    request: &GenerateRequest,
    base: LayoutConfig,
    font: FontSource,
) -> Result<(PageArtifactSet, LayoutConfig), HandwriteError> {
    if request.text.trim().is_empty() {
        return Err(HandwriteError::EmptyText);
    }
    let config = request.layout_config(base)?;
    let mut engine = PageLayoutEngine::new(config.clone(), font)?;
    let set = engine.layout(&request.text)?;
    Ok((set, config))
}

/// Request boundary: run [`generate`] and package the result or the error.
pub fn handle(request: &GenerateRequest, base: LayoutConfig, font: FontSource) -> GenerateResponse {
    match generate(request, base, font) {
        Ok((set, config)) => GenerateResponse::from_artifacts(&set, &config),
        Err(err) => {
            log::warn!("request rejected: {err}");
            GenerateResponse::from_error(&err)
        }
    }
}

/// Parse a JSON request body and handle it.
pub fn handle_json(body: &str, base: LayoutConfig, font: FontSource) -> GenerateResponse {
    match serde_json::from_str::<GenerateRequest>(body) {
        Ok(request) => handle(&request, base, font),
        Err(err) => GenerateResponse::from_error(&HandwriteError::from(err)),
    }
}
