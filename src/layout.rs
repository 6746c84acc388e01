//! Page layout: places glyph strokes line by line and splits them into pages.
//!
//! The engine owns the font, the RNG and a per-run glyph cache. Everything
//! that changes while text is consumed (cursor, page number, the open page's
//! commands) lives in a [`LayoutState`] value that each step takes and
//! returns.

use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use kurbo::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bitmap::rasterize;
use crate::config::{LayoutConfig, GLYPH_PX_PER_MM};
use crate::contour::{extract, Contour};
use crate::error::{GlyphError, HandwriteError};
use crate::font::FontSource;
use crate::render::render_png;
use crate::toolpath::{Command, PageFrame, ToolpathEncoder};

/// Closing punctuation that may hang past the right margin.
const HANGING_PUNCTUATION: &[char] = &[
    '、', '。', '，', '．', '」', '』', '）', '｝', '］', ',', '.', ')', '}', ']', '!', '?', '！',
    '？',
];

/// Where the layout state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    WritingLine,
    LineBreak,
    PageBreak,
    Done,
}

/// Mutable layout state for the page being written.
#[derive(Debug, Clone)]
pub struct LayoutState {
    /// Pen position in layout mm (top-left origin).
    pub cursor: Point,
    /// 1-based page number.
    pub page_index: usize,
    /// Commands of the open page, header included.
    pub commands: Vec<Command>,
    pub phase: LayoutPhase,
    header_len: usize,
    span_start: usize,
    line_has_content: bool,
}

impl LayoutState {
    /// Whether anything beyond the page header has been written.
    pub fn has_content(&self) -> bool {
        self.commands.len() > self.header_len
    }
}

/// A closed page program.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub index: usize,
    pub commands: Vec<Command>,
    /// Byte range of the input text laid out on this page.
    pub text_span: Range<usize>,
}

/// A page and its PNG preview.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    pub page: Page,
    pub preview_png: Vec<u8>,
}

/// Everything a layout run produces.
#[derive(Debug, Clone, Default)]
pub struct PageArtifactSet {
    pub pages: Vec<PageArtifact>,
    /// Layout stopped at the page limit with text left over.
    pub truncated: bool,
}

/// Lays text out into page programs.
pub struct PageLayoutEngine {
    config: LayoutConfig,
    font: FontSource,
    encoder: ToolpathEncoder,
    rng: StdRng,
    glyphs: HashMap<char, Rc<[Contour]>>,
}

impl PageLayoutEngine {
    /// Build an engine, rejecting invalid configurations up front.
    pub fn new(config: LayoutConfig, font: FontSource) -> Result<Self, HandwriteError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            encoder: ToolpathEncoder::new(PageFrame::new(&config)),
            config,
            font,
            rng,
            glyphs: HashMap::new(),
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Top-left corner of the writing area.
    fn start_point(&self) -> Point {
        Point::new(self.config.margins.left, self.config.margins.top)
    }

    fn right_edge(&self) -> f64 {
        self.config.margins.left + self.config.writing_width()
    }

    fn bottom_edge(&self) -> f64 {
        self.config.margins.top + self.config.writing_height()
    }

    /// Commands every page starts with: lift the pen, travel to the start.
    pub fn page_header(&self) -> Vec<Command> {
        vec![
            Command::PenUp,
            Command::MoveUp(self.encoder.frame().machine_point(self.start_point())),
        ]
    }

    fn open_page(&self, page_index: usize, span_start: usize) -> LayoutState {
        let commands = self.page_header();
        LayoutState {
            cursor: self.start_point(),
            page_index,
            header_len: commands.len(),
            commands,
            phase: LayoutPhase::WritingLine,
            span_start,
            line_has_content: false,
        }
    }

    /// Contours for `ch`, computed once per run.
    fn glyph(&mut self, ch: char) -> Result<Rc<[Contour]>, GlyphError> {
        if let Some(contours) = self.glyphs.get(&ch) {
            return Ok(Rc::clone(contours));
        }
        let mask = rasterize(ch, &self.font, self.config.glyph_pixel_size())?;
        let contours: Rc<[Contour]> = extract(&mask).into();
        log::debug!("glyph {:?}: {} strokes", ch, contours.len());
        self.glyphs.insert(ch, Rc::clone(&contours));
        Ok(contours)
    }

    /// Width a character occupies before the random gap.
    fn glyph_advance(&self, ch: char) -> f64 {
        let width = self.config.font_size;
        if ch == ' ' {
            width * self.config.style.space_ratio
        } else {
            width
        }
    }

    /// Whether `ch` must start a new line.
    fn wraps_before(&self, state: &LayoutState, ch: char) -> bool {
        if !state.line_has_content {
            return false;
        }
        if self.config.hanging_punctuation && HANGING_PUNCTUATION.contains(&ch) {
            return false;
        }
        state.cursor.x + self.glyph_advance(ch) > self.right_edge()
    }

    /// Lay out `text` and return the closed pages with their previews.
    pub fn layout(&mut self, text: &str) -> Result<PageArtifactSet, HandwriteError> {
        let mut out = PageArtifactSet::default();
        let mut state = self.open_page(1, 0);
        let mut offset = 0;

        for raw_line in text.split('\n') {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            let next_line = (offset + raw_line.len() + 1).min(text.len());

            if !line.trim().is_empty() {
                for (i, ch) in line.char_indices() {
                    state = self.write_char(state, ch, offset + i, &mut out)?;
                    if state.phase == LayoutPhase::Done {
                        break;
                    }
                }
            }
            if state.phase != LayoutPhase::Done {
                // Blank lines advance too, and may break the page.
                state = self.line_break(state, next_line, &mut out)?;
            }
            if state.phase == LayoutPhase::Done {
                break;
            }
            offset = next_line;
        }

        if state.phase == LayoutPhase::Done {
            if text[state.span_start..].trim().is_empty() {
                out.truncated = false;
            }
        } else if state.has_content() {
            self.close_page(state, text.len(), &mut out)?;
        }

        log::info!(
            "laid out {} chars on {} page(s){}",
            text.chars().count(),
            out.pages.len(),
            if out.truncated { " (truncated)" } else { "" }
        );
        Ok(out)
    }

    fn write_char(
        &mut self,
        mut state: LayoutState,
        ch: char,
        pos: usize,
        out: &mut PageArtifactSet,
    ) -> Result<LayoutState, HandwriteError> {
        state.phase = LayoutPhase::WritingLine;
        let contours = match self.glyph(ch) {
            Ok(contours) => contours,
            Err(e) => {
                log::warn!("skipping character at byte {pos}: {e}");
                return Ok(state);
            }
        };

        if self.wraps_before(&state, ch) {
            state = self.line_break(state, pos, out)?;
            if state.phase == LayoutPhase::Done {
                return Ok(state);
            }
        }

        self.draw_glyph(&mut state, &contours);

        let style = &self.config.style;
        let gap = self.rng.gen_range(style.spacing_ratio_min..=style.spacing_ratio_max);
        state.cursor.x += self.glyph_advance(ch) + gap * self.config.font_size;
        state.line_has_content = true;
        Ok(state)
    }

    /// Top-left corner of the glyph canvas for a glyph cell at `cursor`.
    fn glyph_origin(&self, cursor: Point) -> Point {
        // The glyph canvas is twice the glyph size; centre it on the glyph cell.
        let half_canvas = self.config.glyph_pixel_size() as f64 / GLYPH_PX_PER_MM;
        let half_cell = self.config.font_size / 2.0;
        Point::new(
            cursor.x + half_cell - half_canvas,
            cursor.y + half_cell - half_canvas,
        )
    }

    /// Encode every stroke of a glyph at the cursor, one wobble per stroke.
    fn draw_glyph(&mut self, state: &mut LayoutState, contours: &[Contour]) {
        let origin = self.glyph_origin(state.cursor);
        let wobble = self.config.style.wobble_mm;
        for contour in contours {
            let jitter = self.rng.gen_range(-wobble..=wobble);
            state
                .commands
                .extend(self.encoder.encode(contour, origin, jitter));
        }
    }

    /// Return to the left margin one line lower, breaking the page on overflow.
    fn line_break(
        &mut self,
        mut state: LayoutState,
        pos: usize,
        out: &mut PageArtifactSet,
    ) -> Result<LayoutState, HandwriteError> {
        state.phase = LayoutPhase::LineBreak;
        let line_height = self.config.line_height();
        state.cursor = Point::new(self.config.margins.left, state.cursor.y + line_height);
        state.line_has_content = false;

        if state.cursor.y + line_height > self.bottom_edge() {
            state = self.page_break(state, pos, out)?;
        }
        if state.phase != LayoutPhase::Done {
            state.phase = LayoutPhase::WritingLine;
        }
        Ok(state)
    }

    /// Close the open page and start the next one, or stop at the page limit.
    fn page_break(
        &mut self,
        mut state: LayoutState,
        pos: usize,
        out: &mut PageArtifactSet,
    ) -> Result<LayoutState, HandwriteError> {
        state.phase = LayoutPhase::PageBreak;
        let index = state.page_index;
        self.close_page(state, pos, out)?;

        let mut next = self.open_page(index + 1, pos);
        if index >= self.config.max_pages {
            log::warn!("page limit of {} reached, stopping", self.config.max_pages);
            out.truncated = true;
            next.phase = LayoutPhase::Done;
        }
        Ok(next)
    }

    fn close_page(
        &self,
        state: LayoutState,
        end: usize,
        out: &mut PageArtifactSet,
    ) -> Result<(), HandwriteError> {
        let page = Page {
            index: state.page_index,
            commands: state.commands,
            text_span: state.span_start..end.max(state.span_start),
        };
        let preview_png = render_png(&page.commands, &self.config)?;
        log::info!(
            "page {}: {} commands, preview {} bytes",
            page.index,
            page.commands.len(),
            preview_png.len()
        );
        out.pages.push(PageArtifact { page, preview_png });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn config() -> LayoutConfig {
        LayoutConfig {
            preview_dpi: 10.0,
            seed: Some(7),
            ..LayoutConfig::default()
        }
    }

    fn engine(config: LayoutConfig) -> PageLayoutEngine {
        PageLayoutEngine::new(config, FontSource::Builtin).unwrap()
    }

    /// Distinct travel-move heights after the page header, in microns.
    fn stroke_start_heights(page: &Page) -> BTreeSet<i64> {
        page.commands[2..]
            .iter()
            .filter_map(|c| match c {
                Command::MoveUp(p) => Some((p.y * 1000.0).round() as i64),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_page_starts_at_margin_corner() {
        let engine = engine(config());
        assert_eq!(
            engine.page_header(),
            vec![Command::PenUp, Command::MoveUp(Point::new(-75.0, 113.5))]
        );
    }

    #[test]
    fn single_char_gives_one_page_with_strokes() {
        let set = engine(config()).layout("A").unwrap();
        assert_eq!(set.pages.len(), 1);
        assert!(!set.truncated);
        let page = &set.pages[0].page;
        assert_eq!(page.index, 1);
        assert_eq!(page.text_span, 0..1);
        assert!(page.commands.contains(&Command::PenDown));
        assert_eq!(page.commands.last(), Some(&Command::PenUp));
    }

    #[test]
    fn wrapped_line_moves_down_one_line_height() {
        let mut cfg = config();
        cfg.style.wobble_mm = 0.0;
        let line_height = (cfg.line_height() * 1000.0).round() as i64;

        let short = engine(cfg.clone()).layout("IIIII").unwrap();
        let one_line = stroke_start_heights(&short.pages[0].page);

        let long = engine(cfg).layout(&"I".repeat(25)).unwrap();
        assert_eq!(long.pages.len(), 1);
        let wrapped = stroke_start_heights(&long.pages[0].page);

        let mut expected = one_line.clone();
        expected.extend(one_line.iter().map(|y| y - line_height));
        assert_eq!(wrapped, expected);
    }

    #[test]
    fn wrapping_keeps_strokes_inside_the_writing_width() {
        let mut cfg = config();
        cfg.style.wobble_mm = 0.0;
        let set = engine(cfg.clone()).layout(&"H".repeat(60)).unwrap();
        let frame = PageFrame::new(&cfg);
        let right = cfg.margins.left + cfg.writing_width();
        for command in &set.pages[0].page.commands {
            if let Some(p) = command.target() {
                let layout = frame.to_layout() * p;
                assert!(layout.x <= right + 1e-6, "stroke at x={} past {}", layout.x, right);
            }
        }
    }

    #[test]
    fn blank_line_near_bottom_breaks_the_page() {
        // 18 lines fill the page to y = 251mm; the blank line pushes past 272mm.
        let text = format!("{}\n\nI", vec!["I"; 18].join("\n"));
        let mut engine = engine(config());
        let header = engine.page_header();
        let set = engine.layout(&text).unwrap();
        assert_eq!(set.pages.len(), 2);
        let second = &set.pages[1].page;
        assert_eq!(second.index, 2);
        assert_eq!(&second.commands[..2], header.as_slice());
        assert!(second.commands[2..].contains(&Command::PenDown));
        assert_eq!(&text[second.text_span.clone()], "I");
    }

    #[test]
    fn trailing_blank_line_opens_a_page_that_is_never_emitted() {
        let text = format!("{}\n", vec!["I"; 18].join("\n"));
        let set = engine(config()).layout(&text).unwrap();
        assert_eq!(set.pages.len(), 1);
    }

    #[test]
    fn nineteen_lines_per_default_page() {
        let text = vec!["I"; 20].join("\n");
        let set = engine(config()).layout(&text).unwrap();
        assert_eq!(set.pages.len(), 2);
        let second = &set.pages[1].page;
        assert_eq!(second.text_span, 38..39);
    }

    #[test]
    fn unsupported_characters_are_skipped() {
        let plain = engine(config()).layout("I").unwrap();
        let mixed = engine(config()).layout("漢I").unwrap();
        assert_eq!(plain.pages[0].page.commands, mixed.pages[0].page.commands);
    }

    #[test]
    fn page_limit_truncates() {
        let mut cfg = config();
        cfg.max_pages = 2;
        let text = vec!["I"; 60].join("\n");
        let set = engine(cfg).layout(&text).unwrap();
        assert_eq!(set.pages.len(), 2);
        assert!(set.truncated);
    }

    #[test]
    fn page_limit_is_not_truncation_when_only_whitespace_remains() {
        let mut cfg = config();
        cfg.max_pages = 1;
        let text = format!("{}\n\n\n", vec!["I"; 19].join("\n"));
        let set = engine(cfg).layout(&text).unwrap();
        assert_eq!(set.pages.len(), 1);
        assert!(!set.truncated);
    }

    #[test]
    fn closing_punctuation_can_hang() {
        let mut cfg = config();
        let mut state = engine(cfg.clone()).open_page(1, 0);
        state.cursor.x = 175.0;
        state.line_has_content = true;

        assert!(engine(cfg.clone()).wraps_before(&state, ','));
        cfg.hanging_punctuation = true;
        let hanging = engine(cfg);
        assert!(hanging.wraps_before(&state, 'I'));
        assert!(!hanging.wraps_before(&state, ','));
        assert!(!hanging.wraps_before(&state, '。'));
    }

    #[test]
    fn first_char_of_a_line_never_wraps() {
        let mut cfg = config();
        cfg.margins.left = 100.0;
        cfg.margins.right = 105.0;
        // Writing width of 5mm is narrower than one 8mm glyph.
        let set = engine(cfg).layout("II").unwrap();
        assert_eq!(set.pages.len(), 1);
        let heights: BTreeSet<i64> = stroke_start_heights(&set.pages[0].page);
        assert!(!heights.is_empty());
    }

    #[test]
    fn non_finite_style_is_refused_before_layout() {
        let mut cfg = config();
        cfg.style.wobble_mm = f64::INFINITY;
        assert!(matches!(
            PageLayoutEngine::new(cfg, FontSource::Builtin),
            Err(HandwriteError::InvalidConfig(_))
        ));
    }

    #[test]
    fn each_glyph_advances_by_its_width_plus_a_random_gap() {
        let mut cfg = config();
        cfg.style.wobble_mm = 0.0;
        let mut writer = engine(cfg.clone());
        assert_eq!(writer.config().font_size, 8.0);
        let count = 12;
        let set = writer.layout(&"I".repeat(count)).unwrap();
        let body = &set.pages[0].page.commands[2..];

        // Identical glyphs without wobble encode to equal-length blocks.
        assert_eq!(body.len() % count, 0);
        let xs: Vec<f64> = body
            .chunks(body.len() / count)
            .map(|glyph| glyph[0].target().unwrap().x)
            .collect();
        let (low, high) = (cfg.font_size * 1.06, cfg.font_size * 1.12);
        for step in xs.windows(2).map(|w| w[1] - w[0]) {
            assert!(
                step >= low - 2e-3 && step <= high + 2e-3,
                "step {step} outside {low}..{high}"
            );
        }
    }

    #[test]
    fn wobble_is_one_offset_per_stroke() {
        let cfg = config();
        let mut engine = engine(cfg.clone());
        let contours = engine.glyph('I').unwrap();
        assert!(contours.len() > 1);

        let mut state = engine.open_page(1, 0);
        state.cursor = Point::new(60.0, 80.0);
        let origin = engine.glyph_origin(state.cursor);
        let start = state.commands.len();
        engine.draw_glyph(&mut state, &contours);
        let drawn = &state.commands[start..];

        let mut offsets = Vec::new();
        let mut at = 0;
        for contour in contours.iter() {
            let still = engine.encoder.encode(contour, origin, 0.0);
            let shaken = &drawn[at..at + still.len()];
            at += still.len();
            let deltas: Vec<f64> = still
                .iter()
                .zip(shaken)
                .filter_map(|(a, b)| Some(a.target()?.y - b.target()?.y))
                .collect();
            let Some(&first) = deltas.first() else {
                continue;
            };
            assert!(first.abs() <= cfg.style.wobble_mm + 1e-3);
            assert!(deltas.iter().all(|d| (d - first).abs() <= 2e-3), "{deltas:?}");
            offsets.push(first);
        }
        assert_eq!(at, drawn.len());
        assert!(offsets.windows(2).any(|w| (w[0] - w[1]).abs() > 2e-3), "{offsets:?}");
    }

    #[test]
    fn same_seed_same_program() {
        let a = engine(config()).layout("Hello, world").unwrap();
        let b = engine(config()).layout("Hello, world").unwrap();
        assert_eq!(a.pages[0].page, b.pages[0].page);
    }
}
