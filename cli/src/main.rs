//! structpdf CLI - document structuring tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use structpdf::render::{from_middle_json, render_markdown, to_text};
use structpdf::{
    classify, AnalyzeResult, ClassifierConfig, Document, FileWriter, MarkdownMode, PageSelection,
    ParseMode, PipelineConfig, RenderOptions, Severity, TableFallback,
};

#[derive(Parser)]
#[command(name = "structpdf")]
#[command(version)]
#[command(
    about = "Structure parsed PDF pages into Markdown, content lists, and middle JSON",
    long_about = None
)]
struct Cli {
    /// Input page JSON file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Structure a document and write every artifact
    Convert {
        /// Input page JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Pipeline configuration JSON file
        #[arg(short, long, value_name = "FILE", env = "STRUCTPDF_CONFIG")]
        config: Option<PathBuf>,

        /// Extraction mode
        #[arg(long, value_enum, default_value = "auto")]
        mode: ModeArg,

        /// Table rendering fallback
        #[arg(long, value_enum, default_value = "image")]
        table_fallback: TableFallbackArg,

        /// Omit images from the Markdown output
        #[arg(long)]
        text_only: bool,

        /// Process pages one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Decide whether a document needs OCR
    Classify {
        /// Input page JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Number of pages to sample
        #[arg(long, default_value = "10")]
        sample_size: usize,
    },

    /// Render Markdown from a middle JSON file
    #[command(alias = "md")]
    Markdown {
        /// Input middle JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory prefix for image links
        #[arg(long, default_value = "images")]
        image_dir: String,

        /// Omit images
        #[arg(long)]
        text_only: bool,

        /// Maximum heading level (1-6)
        #[arg(long, default_value = "6")]
        max_heading: u8,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Render plain text from a middle JSON file
    Text {
        /// Input middle JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Classify the document
    Auto,
    /// Native text layer
    Txt,
    /// OCR detections
    Ocr,
}

impl ModeArg {
    fn forced(self) -> Option<ParseMode> {
        match self {
            ModeArg::Auto => None,
            ModeArg::Txt => Some(ParseMode::Text),
            ModeArg::Ocr => Some(ParseMode::Ocr),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TableFallbackArg {
    /// Link the cropped table image
    Image,
    /// Emit the raw table text
    RawText,
}

impl From<TableFallbackArg> for TableFallback {
    fn from(arg: TableFallbackArg) -> Self {
        match arg {
            TableFallbackArg::Image => TableFallback::Image,
            TableFallbackArg::RawText => TableFallback::RawText,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            config,
            mode,
            table_fallback,
            text_only,
            sequential,
        }) => {
            let options = ConvertArgs {
                config,
                mode,
                table_fallback,
                text_only,
                sequential,
            };
            cmd_convert(&input, output.as_deref(), &options)
        }
        Some(Commands::Classify { input, sample_size }) => cmd_classify(&input, sample_size),
        Some(Commands::Markdown {
            input,
            output,
            image_dir,
            text_only,
            max_heading,
            pages,
        }) => cmd_markdown(
            &input,
            output.as_deref(),
            &image_dir,
            text_only,
            max_heading,
            pages.as_deref(),
        ),
        Some(Commands::Text {
            input,
            output,
            pages,
        }) => cmd_text(&input, output.as_deref(), pages.as_deref()),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &ConvertArgs::default())
            } else {
                println!("{}", "Usage: structpdf <FILE> [OUTPUT]".yellow());
                println!("       structpdf --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

struct ConvertArgs {
    config: Option<PathBuf>,
    mode: ModeArg,
    table_fallback: TableFallbackArg,
    text_only: bool,
    sequential: bool,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            config: None,
            mode: ModeArg::Auto,
            table_fallback: TableFallbackArg::Image,
            text_only: false,
            sequential: false,
        }
    }
}

/// Load a page JSON file; rasters resolve relative to the file.
fn load_document(input: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(input)?;
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    Ok(Document::from_json(&json)?.load_rasters(base_dir))
}

fn parse_pages(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    args: &ConvertArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let stem = input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(format!("{}_output", stem)));
    fs::create_dir_all(&output_dir)?;
    let writer = FileWriter::new(&output_dir);

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    if args.sequential {
        config = config.sequential();
    }
    let mut render_options = RenderOptions::new().with_table_fallback(args.table_fallback.into());
    if args.text_only {
        render_options = render_options.with_markdown_mode(MarkdownMode::TextOnly);
    }

    let pb = ProgressBar::new(5);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Loading pages...");
    let document = load_document(input)?;
    pb.inc(1);

    pb.set_message("Classifying...");
    let mode = match args.mode.forced() {
        Some(mode) => mode,
        None => classify(&document, &ClassifierConfig::default())?,
    };
    let analyzed = AnalyzeResult::from_document(document);
    analyzed.draw_model(&writer, &format!("{}_model.pdf", stem))?;
    pb.inc(1);

    pb.set_message("Structuring pages...");
    let result = match mode {
        ParseMode::Text => analyzed.pipe_txt_mode(&config),
        ParseMode::Ocr => analyzed.pipe_ocr_mode(&config),
    }
    .with_render_options(render_options);
    pb.inc(1);

    pb.set_message("Writing assets and overlays...");
    let assets = result.write_assets(&writer, "images")?;
    result.draw_layout(&writer, &format!("{}_layout.pdf", stem))?;
    result.draw_span(&writer, &format!("{}_spans.pdf", stem))?;
    pb.inc(1);

    pb.set_message("Rendering...");
    result.dump_md(&writer, &format!("{}.md", stem), "images")?;
    result.dump_content_list(&writer, &format!("{}_content_list.json", stem), "images")?;
    result.dump_middle_json(&writer, &format!("{}_middle.json", stem))?;
    pb.inc(1);

    pb.finish_with_message("Done!");

    println!(
        "\n{} {} ({} pages, {} mode)",
        "Structured".green().bold(),
        input.display(),
        result.middle().page_count(),
        mode.as_str()
    );
    print_diagnostics(result.diagnostics());

    println!("\n{}", "Output files:".green().bold());
    println!("  {} {}.md", "├─".dimmed(), stem);
    println!("  {} {}_content_list.json", "├─".dimmed(), stem);
    println!("  {} {}_middle.json", "├─".dimmed(), stem);
    println!("  {} {}_model.pdf", "├─".dimmed(), stem);
    println!("  {} {}_layout.pdf", "├─".dimmed(), stem);
    println!("  {} {}_spans.pdf", "├─".dimmed(), stem);
    println!("  {} images/ ({} assets)", "└─".dimmed(), assets);

    Ok(())
}

fn print_diagnostics(diagnostics: &[structpdf::Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let pages = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::PageDegraded)
        .count();
    println!(
        "{} {} page-level, {} block-level",
        "Degraded:".yellow().bold(),
        pages,
        diagnostics.len() - pages
    );
    for d in diagnostics {
        let location = match d.block_idx {
            Some(b) => format!("page {} block {}", d.page_idx, b),
            None => format!("page {}", d.page_idx),
        };
        log::info!("{}: {:?}: {}", location, d.kind, d.message);
    }
}

fn cmd_classify(input: &Path, sample_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let document = load_document(input)?;
    let config = ClassifierConfig::new().with_sample_size(sample_size);
    let mode = classify(&document, &config)?;

    println!("{}", "Classification".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), document.page_count());
    println!("{}: {}", "Mode".bold(), mode.as_str());

    Ok(())
}

fn cmd_markdown(
    input: &Path,
    output: Option<&Path>,
    image_dir: &str,
    text_only: bool,
    max_heading: u8,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = from_middle_json(&fs::read_to_string(input)?)?;

    let mut render_options = RenderOptions::new()
        .with_max_heading(max_heading)
        .with_pages(parse_pages(pages)?);
    if text_only {
        render_options = render_options.text_only();
    }

    let markdown = render_markdown(&doc, image_dir, &render_options)?;

    if let Some(path) = output {
        fs::write(path, &markdown)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", markdown);
    }

    Ok(())
}

fn cmd_text(
    input: &Path,
    output: Option<&Path>,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = from_middle_json(&fs::read_to_string(input)?)?;
    let render_options = RenderOptions::new().with_pages(parse_pages(pages)?);
    let text = to_text(&doc, &render_options);

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "structpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document structuring tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGES: &str = r#"{
        "pages": [{
            "width": 600, "height": 800,
            "text_runs": [
                {"text": "Report", "bbox": [60, 45, 300, 75], "font_size": 24},
                {"text": "First paragraph.", "bbox": [60, 110, 500, 130], "font_size": 10}
            ],
            "layout_blocks": [
                {"bbox": [50, 40, 550, 80], "category": "title"},
                {"bbox": [50, 100, 550, 300], "category": "plain_text"}
            ]
        }]
    }"#;

    #[test]
    fn test_convert_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.json");
        fs::write(&input, PAGES).unwrap();
        let out = dir.path().join("out");

        cmd_convert(&input, Some(&out), &ConvertArgs::default()).unwrap();

        for name in [
            "report.md",
            "report_content_list.json",
            "report_middle.json",
            "report_model.pdf",
            "report_layout.pdf",
            "report_spans.pdf",
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        let md = fs::read_to_string(out.join("report.md")).unwrap();
        assert_eq!(md, "# Report\n\nFirst paragraph.");
    }

    #[test]
    fn test_markdown_from_middle_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.json");
        fs::write(&input, PAGES).unwrap();
        let out = dir.path().join("out");
        cmd_convert(&input, Some(&out), &ConvertArgs::default()).unwrap();

        let md_path = dir.path().join("again.md");
        cmd_markdown(
            &out.join("doc_middle.json"),
            Some(&md_path),
            "images",
            false,
            6,
            None,
        ).unwrap();
        assert_eq!(
            fs::read_to_string(md_path).unwrap(),
            fs::read_to_string(out.join("doc.md")).unwrap()
        );
    }

    #[test]
    fn test_parse_pages() {
        assert_eq!(parse_pages(None).unwrap(), PageSelection::All);
        assert!(parse_pages(Some("x-y")).is_err());
    }
}
