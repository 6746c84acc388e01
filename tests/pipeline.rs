use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use handscript::request::{self, GenerateRequest, GenerateResponse};
use handscript::{
    gcode, glyph_contours, render, write_pages, Command, FontSource, GlyphError, HandwriteError,
    LayoutConfig,
};

fn low_res(seed: u64) -> LayoutConfig {
    LayoutConfig {
        preview_dpi: 10.0,
        seed: Some(seed),
        ..LayoutConfig::default()
    }
}

fn lines_of_i(n: usize) -> String {
    vec!["I"; n].join("\n")
}

#[test]
fn single_letter_at_default_settings() {
    let config = LayoutConfig {
        seed: Some(1),
        ..LayoutConfig::default()
    };
    let set = write_pages("A", config, FontSource::Builtin).unwrap();
    assert_eq!(set.pages.len(), 1);
    assert!(!set.truncated);

    let commands = &set.pages[0].page.commands;
    let down = commands.iter().position(|c| *c == Command::PenDown).unwrap();
    assert!(commands[down..].contains(&Command::PenUp));

    let preview = image::load_from_memory(&set.pages[0].preview_png).unwrap();
    assert_eq!((preview.width(), preview.height()), (1240, 1754));
}

#[test]
fn empty_text_is_rejected_without_pages() {
    let err = write_pages("", low_res(1), FontSource::Builtin).unwrap_err();
    assert!(matches!(err, HandwriteError::EmptyText));
    assert_eq!(err.status_code(), 400);

    let response = request::handle(&GenerateRequest::new(" \n\t"), low_res(1), FontSource::Builtin);
    assert_eq!(response.status(), 400);
}

#[test]
fn unknown_paper_size_is_rejected() {
    let body = r#"{"text": "hello", "paperSize": "Legal"}"#;
    let response = request::handle_json(body, low_res(1), FontSource::Builtin);
    assert_eq!(response.status(), 400);
    assert!(matches!(response, GenerateResponse::Failure { .. }));
}

#[test]
fn long_line_wraps_within_one_page() {
    let set = write_pages(&"I".repeat(40), low_res(2), FontSource::Builtin).unwrap();
    assert_eq!(set.pages.len(), 1);
    // 150mm of writing width holds fewer than 40 glyphs of 8mm, so strokes
    // start on at least two distinct lines, 12mm apart.
    let mut starts: Vec<f64> = set.pages[0].page.commands[2..]
        .iter()
        .filter_map(|c| match c {
            Command::MoveUp(p) => Some(p.y),
            _ => None,
        })
        .collect();
    starts.sort_by(|a, b| b.total_cmp(a));
    let spread = starts[0] - starts[starts.len() - 1];
    assert!(spread > 10.0, "strokes span only {spread}mm vertically");
}

#[test]
fn blank_line_at_the_bottom_starts_a_new_page() {
    let text = format!("{}\n\nI", lines_of_i(18));
    let set = write_pages(&text, low_res(3), FontSource::Builtin).unwrap();
    assert_eq!(set.pages.len(), 2);
    let second = &set.pages[1].page;
    assert_eq!(second.index, 2);
    assert_eq!(second.commands[0], Command::PenUp);
    assert!(second.commands.contains(&Command::PenDown));
}

#[test]
fn page_count_never_shrinks_as_text_grows() {
    let counts: Vec<usize> = [1, 10, 19, 20, 38, 40]
        .iter()
        .map(|&n| {
            write_pages(&lines_of_i(n), low_res(4), FontSource::Builtin)
                .unwrap()
                .pages
                .len()
        })
        .collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    assert_eq!(counts.first(), Some(&1));
    assert_eq!(counts.last(), Some(&3));
}

#[test]
fn successful_response_carries_every_page() {
    let mut req = GenerateRequest::new(lines_of_i(20));
    req.seed = Some(5);
    let response = request::handle(&req, low_res(5), FontSource::Builtin);
    let (preview_base64, gcode_content) = match response {
        GenerateResponse::Success {
            success,
            preview_base64,
            gcode_content,
            ..
        } => {
            assert!(success);
            (preview_base64, gcode_content)
        }
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(preview_base64.len(), 2);
    assert_eq!(gcode_content.len(), 2);
    for encoded in &preview_base64 {
        let png = STANDARD.decode(encoded).unwrap();
        assert!(image::load_from_memory(&png).is_ok());
    }
    for program in &gcode_content {
        assert!(program.starts_with("G21 ; unit = millimeters\n"));
        assert!(program.trim_end().ends_with("; park"));
    }
}

#[test]
fn exported_program_previews_like_the_page() {
    let config = low_res(6);
    let set = write_pages("Hi", config.clone(), FontSource::Builtin).unwrap();
    let page = &set.pages[0].page;

    let text = gcode::serialize(&page.commands, &config.pen);
    let parsed = gcode::parse(&text, &config.pen).unwrap();
    let drops = |cmds: &[Command]| cmds.iter().filter(|c| **c == Command::PenDown).count();
    assert_eq!(drops(&parsed), drops(&page.commands));

    let a = render::render(&page.commands, &config).unwrap();
    let b = render::render(&parsed, &config).unwrap();
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));
}

#[test]
fn previews_are_reproducible() {
    let config = low_res(8);
    let set = write_pages("abc", config.clone(), FontSource::Builtin).unwrap();
    let page = &set.pages[0];
    let again = render::render_png(&page.page.commands, &config).unwrap();
    assert_eq!(again, page.preview_png);
}

#[test]
fn glyph_strokes_without_layout() {
    let strokes = glyph_contours('A', &FontSource::Builtin, 80).unwrap();
    assert!(!strokes.is_empty());
    // Every stroke stays on the 160px glyph canvas.
    for stroke in &strokes {
        assert!(stroke.len() > 2);
        assert!(stroke.points.iter().all(|&(x, y)| (0..160).contains(&x) && (0..160).contains(&y)));
    }
    assert!(glyph_contours(' ', &FontSource::Builtin, 80).unwrap().is_empty());
    assert_eq!(
        glyph_contours('漢', &FontSource::Builtin, 80),
        Err(GlyphError::Unsupported('漢'))
    );
}
