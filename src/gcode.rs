//! Text form of page programs.
//!
//! Commands stay structured everywhere inside the crate; G-code is produced
//! only when a page leaves the pipeline, and parsed only when an external
//! program is brought in for previewing.

use std::fmt::Write as _;

use kurbo::Point;

use crate::config::PenSettings;
use crate::error::HandwriteError;
use crate::toolpath::{test_pattern, Command, PageFrame};

/// Serialize one page program.
///
/// The fixed preamble sets units, absolute mode and the origin; the page's
/// own header commands (pen up, travel to start) follow. The program ends
/// with a pen raise and a park move to the page centre.
pub fn serialize(commands: &[Command], pen: &PenSettings) -> String {
    let mut out = String::with_capacity(commands.len() * 28 + 128);
    out.push_str("G21 ; unit = millimeters\n");
    out.push_str("G90 ; absolute positioning\n");
    out.push_str("G92 X0 Y0 Z0 ; define origin\n");
    let has_header = matches!(commands, [Command::PenUp, Command::MoveUp(_), ..]);
    for (i, command) in commands.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = match command {
            Command::MoveUp(p) => {
                write!(out, "G0 X{:.3} Y{:.3} F{}", p.x, p.y, pen.move_speed)
            }
            Command::MoveDown(p) => {
                write!(out, "G1 X{:.3} Y{:.3} F{}", p.x, p.y, pen.move_speed)
            }
            Command::PenDown => write!(out, "G1 Z{:.3} F{}", pen.down_z, pen.pen_speed),
            Command::PenUp => write!(out, "G1 Z{:.3} F{}", pen.up_z, pen.pen_speed),
        };
        match (has_header, i) {
            (true, 0) => out.push_str(" ; raise pen\n"),
            (true, 1) => out.push_str(" ; move to start\n"),
            _ => out.push('\n'),
        }
    }
    let _ = writeln!(out, "G1 Z{:.3} F{} ; raise pen", pen.up_z, pen.pen_speed);
    let _ = writeln!(out, "G0 X0.000 Y0.000 F{} ; park", pen.move_speed);
    out
}

/// Calibration program for `frame`, ended with `M2`.
pub fn test_pattern_program(frame: &PageFrame, pen: &PenSettings) -> String {
    let mut out = serialize(&test_pattern(frame), pen);
    out.push_str("M2 ; end of program\n");
    out
}

/// Parse G-code text into pen commands.
///
/// Understands `G0`/`G1` moves with any of `X`, `Y`, `Z`, `F` words, in any
/// order, with or without spaces between words (`G1G90 Z-7F20000` works).
/// A `Z` below the midpoint of the pen heights is a pen drop, anything else
/// a lift. XY moves under `G1` draw while the pen is down; `G0` always
/// travels. Modal setup (`G21`, `G90`, `G92`), `M` codes and comments after
/// `;` or in parentheses are ignored, and so are `%` delimiter lines.
pub fn parse(text: &str, pen: &PenSettings) -> Result<Vec<Command>, HandwriteError> {
    let mut commands = Vec::new();
    let mut position = Point::ZERO;
    let mut pen_down = false;
    let mut rapid = true;

    for (line_no, raw) in text.lines().enumerate() {
        let line = strip_comments(raw);
        // Program delimiter.
        if line.trim() == "%" {
            continue;
        }
        let words = split_words(line).map_err(|message| HandwriteError::GcodeParse {
            line: line_no + 1,
            message,
        })?;

        let mut x = None;
        let mut y = None;
        let mut z = None;
        let mut is_define_origin = false;
        for (letter, value) in words {
            match letter {
                'G' => match value as i64 {
                    0 => rapid = true,
                    1 => rapid = false,
                    92 => is_define_origin = true,
                    _ => {}
                },
                'X' => x = Some(value),
                'Y' => y = Some(value),
                'Z' => z = Some(value),
                _ => {}
            }
        }
        if is_define_origin {
            continue;
        }

        if let Some(z) = z {
            let down = z < pen.z_midpoint();
            if down != pen_down {
                commands.push(if down { Command::PenDown } else { Command::PenUp });
                pen_down = down;
            }
        }
        if x.is_some() || y.is_some() {
            position = Point::new(x.unwrap_or(position.x), y.unwrap_or(position.y));
            commands.push(if rapid || !pen_down {
                Command::MoveUp(position)
            } else {
                Command::MoveDown(position)
            });
        }
    }

    Ok(commands)
}

fn strip_comments(line: &str) -> String {
    let line = line.split(';').next().unwrap_or("");
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Split a line into (letter, number) words.
fn split_words(line: String) -> Result<Vec<(char, f64)>, String> {
    let mut words = Vec::new();
    let mut chars = line.chars().filter(|c| !c.is_whitespace()).peekable();
    while let Some(letter) = chars.next() {
        if !letter.is_ascii_alphabetic() {
            return Err(format!("unexpected character {letter:?}"));
        }
        let mut number = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
                number.push(c);
                chars.next();
            } else {
                break;
            }
        }
        let value = number
            .parse::<f64>()
            .map_err(|_| format!("bad number {number:?} after {letter}"))?;
        words.push((letter.to_ascii_uppercase(), value));
    }
    Ok(words)
}
