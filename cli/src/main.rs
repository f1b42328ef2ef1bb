//! ordersplit CLI - split PDFs into per-page files named by order number

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use ordersplit::document::TextGranularity;
use ordersplit::ocr::{command_available, TesseractEngine};
use ordersplit::split::{CancellationToken, SplitOptions};
use ordersplit::{
    DirectorySink, ExtractionSource, JsonFormat, NumberFinder, OrderSplit, PageSource,
    PdfDocument, SplitReport, SystemOcrConfig,
};

/// Exit code for inputs that are not readable PDFs.
const EXIT_INPUT_FORMAT: i32 = 2;

#[derive(Parser)]
#[command(name = "ordersplit")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Split PDFs into single pages named by their order numbers", long_about = None)]
struct Cli {
    /// Input PDF file
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
    /// Split a PDF into one file per page
    Split {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory (default: <FILE stem>_split)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Write a ZIP archive instead of a directory
        #[arg(long, value_name = "FILE", conflicts_with = "output")]
        zip: Option<PathBuf>,

        #[command(flatten)]
        split: SplitArgs,

        /// Write the run report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Find the order number in a text file or stdin
    Find {
        /// Text file (stdin if not specified)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Show document information and the numbers found in native text
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        ocr: OcrArgs,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Skip the OCR fallback
    #[arg(long)]
    no_ocr: bool,

    /// OCR language(s), e.g. "eng" or "eng+kor"
    #[arg(long, env = "ORDERSPLIT_OCR_LANG", default_value = "eng")]
    lang: String,

    /// Render scale for OCR (1.0 = 72 DPI)
    #[arg(long, env = "ORDERSPLIT_SCALE", default_value = "1.2")]
    scale: f32,

    /// Extract pages in parallel
    #[arg(long)]
    parallel: bool,

    #[command(flatten)]
    ocr: OcrArgs,
}

#[derive(clap::Args)]
struct OcrArgs {
    /// tesseract executable
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: PathBuf,

    /// pdftoppm executable
    #[arg(long, env = "PDFTOPPM_CMD", default_value = "pdftoppm")]
    pdftoppm_cmd: PathBuf,
}

impl OcrArgs {
    fn config(&self) -> SystemOcrConfig {
        SystemOcrConfig::new()
            .with_tesseract(&self.tesseract_cmd)
            .with_pdftoppm(&self.pdftoppm_cmd)
    }
}

impl SplitArgs {
    fn builder(&self) -> OrderSplit {
        let options = SplitOptions::new()
            .with_ocr(!self.no_ocr)
            .with_language(&self.lang)
            .with_render_scale(self.scale)
            .with_parallel(self.parallel);
        OrderSplit::new()
            .with_options(options)
            .with_ocr_config(self.ocr.config())
    }

    /// Defaults for the bare `ordersplit <FILE>` form, honoring env vars.
    fn parse_defaults() -> Self {
        #[derive(Parser)]
        struct Defaults {
            #[command(flatten)]
            split: SplitArgs,
        }
        Defaults::parse_from(["ordersplit"]).split
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Split {
            input,
            output,
            zip,
            split,
            report,
            compact,
            quiet,
        }) => cmd_split(
            &input,
            output.as_deref(),
            zip.as_deref(),
            &split,
            report.as_deref(),
            compact,
            quiet,
        ),
        Some(Commands::Find { input }) => cmd_find(input.as_deref()),
        Some(Commands::Info { input, ocr }) => cmd_info(&input, &ocr),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: split if input is provided
            if let Some(input) = cli.input {
                let split = SplitArgs::parse_defaults();
                cmd_split(&input, cli.output.as_deref(), None, &split, None, false, false)
            } else {
                println!("{}", "Usage: ordersplit <FILE> [OUTPUT]".yellow());
                println!("       ordersplit --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(exit_code(e.as_ref()));
    }
}

fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<ordersplit::Error>() {
        Some(e) if e.is_input_format() => EXIT_INPUT_FORMAT,
        _ => 1,
    }
}

fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    PathBuf::from(format!("{}_split", stem))
}

fn progress_bar(total: u32, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn cmd_split(
    input: &Path,
    output: Option<&Path>,
    zip: Option<&Path>,
    args: &SplitArgs,
    report_path: Option<&Path>,
    compact: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = PdfDocument::open(input)?;
    let splitter = args.builder().build();
    if !args.no_ocr && !splitter.ocr_enabled() {
        eprintln!(
            "{} OCR tools not found; scanned pages will get positional names",
            "Warning:".yellow().bold()
        );
    }

    let pb = progress_bar(doc.page_count(), quiet);
    let mut progress = |done: u32, _total: u32, source: ExtractionSource| {
        pb.set_position(done as u64);
        pb.set_message(source.to_string());
    };
    let cancel = stop_on_interrupt()?;

    let (report, destination) = match zip {
        Some(zip_path) => {
            let report = split_to_zip(&splitter, &doc, zip_path, &mut progress, &cancel)?;
            (report, zip_path.to_path_buf())
        }
        None => {
            let dir = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_output_dir(input));
            let mut sink = DirectorySink::new(&dir)?;
            let report = splitter.split_with(&doc, &mut sink, &mut progress, &cancel)?;
            (report, dir)
        }
    };
    pb.finish_and_clear();

    print_summary(&report, &destination);
    if report.cancelled {
        eprintln!(
            "{} stopped after {} of {} pages",
            "Interrupted:".yellow().bold(),
            report.stats.processed,
            report.stats.total_pages
        );
    }

    if let Some(path) = report_path {
        let format = if compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        };
        fs::write(path, report.to_json(format)?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }

    Ok(())
}

/// Exit code for a second interrupt, which stops without finishing the page.
const EXIT_INTERRUPTED: i32 = 130;

/// A token cancelled by the first Ctrl-C.
///
/// The page in flight is still written and the summary printed; a second
/// Ctrl-C exits immediately.
fn stop_on_interrupt() -> Result<CancellationToken, ctrlc::Error> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("\n{} finishing the current page", "Stopping:".yellow().bold());
        token.cancel();
    })?;
    Ok(cancel)
}

#[cfg(feature = "archive")]
fn split_to_zip(
    splitter: &ordersplit::PageSplitter,
    doc: &PdfDocument,
    zip_path: &Path,
    progress: &mut dyn ordersplit::ProgressSink,
    cancel: &CancellationToken,
) -> Result<SplitReport, Box<dyn std::error::Error>> {
    let mut sink = ordersplit::ZipSink::create(zip_path)?;
    let report = splitter.split_with(doc, &mut sink, progress, cancel)?;
    sink.finish()?;
    Ok(report)
}

#[cfg(not(feature = "archive"))]
fn split_to_zip(
    _splitter: &ordersplit::PageSplitter,
    _doc: &PdfDocument,
    _zip_path: &Path,
    _progress: &mut dyn ordersplit::ProgressSink,
    _cancel: &CancellationToken,
) -> Result<SplitReport, Box<dyn std::error::Error>> {
    Err("ZIP output requires the `archive` feature".into())
}

fn print_summary(report: &SplitReport, destination: &Path) {
    let stats = &report.stats;

    println!("\n{}", "Split Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Pages".bold(), stats.total_pages);
    println!("{}: {}", "Written".bold(), stats.processed);
    println!("{}: {}", "Native text".bold(), stats.native_text);
    println!("{}: {}", "OCR".bold(), stats.ocr);
    println!("{}: {}", "Unmatched".bold(), stats.unmatched);
    if stats.ocr_failures > 0 {
        println!("{}: {}", "OCR failures".bold(), stats.ocr_failures.to_string().red());
    }
    if stats.skipped > 0 {
        println!("{}: {}", "Skipped".bold(), stats.skipped.to_string().yellow());
    }
    println!("{}: {:.1}%", "Success rate".bold(), stats.success_rate());
    println!(
        "{}: {:.2}s ({:.1} pages/s)",
        "Time".bold(),
        stats.elapsed().as_secs_f64(),
        stats.pages_per_second()
    );

    let review: Vec<_> = report.needs_review().collect();
    if !review.is_empty() {
        println!("\n{}", "Check these OCR-named files:".yellow().bold());
        for (i, file) in review.iter().enumerate() {
            let branch = if i + 1 == review.len() { "└─" } else { "├─" };
            println!(
                "  {} {} (page {})",
                branch.dimmed(),
                file.assigned_name,
                file.page_number()
            );
        }
    }

    println!("\n{} {}", "Saved to".green(), destination.display());
}

fn cmd_find(input: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let text = match input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    match NumberFinder::new().find_match(&text) {
        Some(m) => {
            println!("{}", m.number);
            log::info!("Matched by {} at byte {}", m.kind, m.offset);
        }
        None => {
            eprintln!("{}", "No order number found".yellow());
            std::process::exit(1);
        }
    }

    Ok(())
}

fn cmd_info(input: &Path, ocr: &OcrArgs) -> Result<(), Box<dyn std::error::Error>> {
    let doc = PdfDocument::open(input)?;
    let finder = NumberFinder::new();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.version());
    println!("{}: {}", "Pages".bold(), doc.page_count());

    println!();
    println!("{}", "OCR Tools".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    let config = ocr.config();
    for command in [&config.pdftoppm_command, &config.tesseract_command] {
        let status = if command_available(command) {
            "found".green()
        } else {
            "missing".red()
        };
        println!("{}: {}", command.display().to_string().bold(), status);
    }
    if let Ok(languages) = TesseractEngine::new(config).languages() {
        println!("{}: {}", "Languages".bold(), languages.join(", "));
    }

    println!();
    println!("{}", "Native Text Numbers".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for page in 1..=doc.page_count() {
        let text = TextGranularity::ALL
            .iter()
            .filter_map(|&g| doc.page_text(page, g).ok())
            .collect::<Vec<_>>()
            .join(" ");
        match finder.find_match(&text) {
            Some(m) => println!("{:>5}: {} ({})", page, m.number, m.kind.to_string().dimmed()),
            None => println!("{:>5}: {}", page, "-".dimmed()),
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "ordersplit".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Split PDFs into pages named by order number");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/ordersplit".dimmed());
    println!("License: MIT");
}
