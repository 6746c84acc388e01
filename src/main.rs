use clap::{Args, Parser, Subcommand};
use handscript::request::{self, GenerateRequest};
use handscript::toolpath::{self, PageFrame};
use handscript::{gcode, render, FontSource, LayoutConfig};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "handscript", about = "Text to pen-plotter handwriting")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lay out text and write one G-code program and preview per page
    Write(WriteArgs),
    /// Render an existing G-code program to a PNG preview
    Preview(PreviewArgs),
    /// Write the plotter calibration program and its preview
    TestPattern(TestPatternArgs),
}

#[derive(Args)]
struct WriteArgs {
    /// Text to write (reads --input, or stdin, when omitted)
    #[arg(short, long)]
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Read a JSON request body instead of text and layout flags
    #[arg(long, conflicts_with_all = ["text", "input"])]
    request: Option<PathBuf>,

    /// TrueType/OpenType handwriting font (built-in bitmap font if omitted)
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Character size in mm
    #[arg(long, default_value = "8")]
    font_size: f64,

    /// Top margin in mm
    #[arg(long, default_value = "35")]
    margin_top: f64,

    /// Bottom margin in mm
    #[arg(long, default_value = "25")]
    margin_bottom: f64,

    /// Left margin in mm
    #[arg(long, default_value = "30")]
    margin_left: f64,

    /// Right margin in mm
    #[arg(long, default_value = "30")]
    margin_right: f64,

    /// Paper size: A4, A5 or B5
    #[arg(long, default_value = "A4")]
    paper: String,

    /// Seed for spacing and wobble (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Preview resolution
    #[arg(long, default_value = "150")]
    dpi: f64,

    /// Stop after this many pages
    #[arg(long, default_value = "100")]
    max_pages: usize,

    /// Let closing punctuation hang past the right margin
    #[arg(long)]
    hanging_punctuation: bool,

    /// Output directory for page_NNN.gcode and page_NNN_preview.png
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Print the JSON response to stdout instead of writing files
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PreviewArgs {
    /// G-code program to render
    input: PathBuf,

    /// Output PNG path (defaults to <input>_preview.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Paper size the program was written for
    #[arg(long, default_value = "A4")]
    paper: String,

    /// Preview resolution
    #[arg(long, default_value = "150")]
    dpi: f64,
}

#[derive(Args)]
struct TestPatternArgs {
    /// Output G-code path
    #[arg(short, long, default_value = "test_pattern.gcode")]
    output: PathBuf,

    /// Paper size to centre the pattern on
    #[arg(long, default_value = "A4")]
    paper: String,

    /// Preview resolution
    #[arg(long, default_value = "150")]
    dpi: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Write(args) => write(args),
        Command::Preview(args) => preview(args),
        Command::TestPattern(args) => test_pattern(args),
    }
}

fn write(args: WriteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = LayoutConfig {
        preview_dpi: args.dpi,
        max_pages: args.max_pages,
        seed: args.seed,
        hanging_punctuation: args.hanging_punctuation,
        ..LayoutConfig::default()
    };
    let font = FontSource::load_or_builtin(args.font.as_deref());

    let req = match &args.request {
        Some(path) => serde_json::from_str::<GenerateRequest>(&std::fs::read_to_string(path)?)?,
        None => GenerateRequest {
            font_size: args.font_size,
            margin_top: args.margin_top,
            margin_bottom: args.margin_bottom,
            margin_left: args.margin_left,
            margin_right: args.margin_right,
            paper_size: args.paper.clone(),
            seed: args.seed,
            ..GenerateRequest::new(read_text(&args)?)
        },
    };

    if args.json {
        let response = request::handle(&req, base, font);
        println!("{}", serde_json::to_string_pretty(&response)?);
        if response.status() != 200 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let (set, config) = request::generate(&req, base, font)?;

    eprintln!();
    eprintln!(
        "  handscript \u{00b7} {} page(s), {}mm on {}",
        set.pages.len(),
        config.font_size,
        config.paper
    );
    eprintln!();

    std::fs::create_dir_all(&args.output)?;
    for artifact in &set.pages {
        let stem = format!("page_{:03}", artifact.page.index);
        let gcode_path = args.output.join(format!("{stem}.gcode"));
        let png_path = args.output.join(format!("{stem}_preview.png"));
        std::fs::write(&gcode_path, gcode::serialize(&artifact.page.commands, &config.pen))?;
        std::fs::write(&png_path, &artifact.preview_png)?;
        eprintln!("  \u{2713} {}", gcode_path.display());
        eprintln!("  \u{2713} {}", png_path.display());
    }
    if set.truncated {
        eprintln!();
        eprintln!("  stopped at {} pages, text left over", config.max_pages);
    }
    eprintln!();

    Ok(())
}

fn read_text(args: &WriteArgs) -> Result<String, std::io::Error> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.input {
        return std::fs::read_to_string(path);
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

fn preview(args: PreviewArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = LayoutConfig {
        paper: args.paper.parse()?,
        preview_dpi: args.dpi,
        ..LayoutConfig::default()
    };
    config.validate()?;

    let text = std::fs::read_to_string(&args.input)?;
    let commands = gcode::parse(&text, &config.pen)?;
    let png = render::render_png(&commands, &config)?;

    let output = args.output.unwrap_or_else(|| default_preview_path(&args.input));
    std::fs::write(&output, png)?;
    log::info!("{} commands rendered", commands.len());
    eprintln!("  \u{2713} {}", output.display());
    Ok(())
}

fn test_pattern(args: TestPatternArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = LayoutConfig {
        paper: args.paper.parse()?,
        preview_dpi: args.dpi,
        ..LayoutConfig::default()
    };
    config.validate()?;

    let frame = PageFrame::new(&config);
    std::fs::write(&args.output, gcode::test_pattern_program(&frame, &config.pen))?;
    let png_path = default_preview_path(&args.output);
    std::fs::write(&png_path, render::render_png(&toolpath::test_pattern(&frame), &config)?)?;

    eprintln!("  \u{2713} {}", args.output.display());
    eprintln!("  \u{2713} {}", png_path.display());
    Ok(())
}

fn default_preview_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    input.with_file_name(format!("{stem}_preview.png"))
}
