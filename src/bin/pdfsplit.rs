//! CLI binary for edgequake-pdfsplit.
//!
//! A thin shim over the library crate that maps CLI flags to `SplitConfig`
//! and either runs the HTTP service or processes a local file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfsplit::{
    inspect, NormalizeProgressCallback, Orientation, PageRange, PdfiumEngine, Pipeline,
    ProgressCallback, ServerConfig, SplitConfig, TesseractConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one line per page showing
/// the detected orientation. Pages complete out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    unknown: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            unknown: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Straightening");
        self.bar.reset_eta();
    }

    fn elapsed_for(&self, page_num: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl NormalizeProgressCallback for CliProgressCallback {
    fn on_normalize_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Checking orientation of {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, orientation: Orientation) {
        let elapsed_ms = self.elapsed_for(page_num);
        let (mark, label) = match orientation {
            Orientation::Detected(angle) if angle.is_identity() => (green("✓"), "upright".to_string()),
            Orientation::Detected(angle) => (cyan("↻"), format!("rotated {angle}")),
            Orientation::Unknown => {
                self.unknown.fetch_add(1, Ordering::SeqCst);
                (yellow("?"), "unknown, kept".to_string())
            }
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<14}  {}",
            mark,
            page_num,
            total,
            label,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_normalize_complete(&self, total_pages: usize, rotated_pages: usize) {
        self.bar.finish_and_clear();
        let unknown = self.unknown.load(Ordering::SeqCst);
        eprintln!(
            "{} {} pages checked, {} rotated{}",
            green("✔"),
            bold(&total_pages.to_string()),
            rotated_pages,
            if unknown > 0 {
                format!(", {} undetected", yellow(&unknown.to_string()))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on $PORT (default 8080)
  pdfsplit serve

  # Straighten a scan and cut it into two documents
  pdfsplit split scan.pdf --range 1-3 --range 4-10 -o parts/

  # Straighten only
  pdfsplit rotate scan.pdf -o upright.pdf

  # Show metadata
  pdfsplit inspect scan.pdf --json

ENVIRONMENT VARIABLES:
  PORT                 Listening port for `serve` (default 8080)
  PDFIUM_LIB_PATH      Path to libpdfium
  TESSERACT_BIN        Path to the tesseract binary
  RUST_LOG             Log filter override (e.g. edgequake_pdfsplit=debug)
  PDFSPLIT_*           Fallbacks for the flags below
"#;

/// Straighten PDF pages with OCR orientation detection and split them into ranges.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Auto-rotate PDF pages and split them into page ranges",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Interface to bind.
        #[arg(long, env = "PDFSPLIT_HOST", default_value = "0.0.0.0")]
        host: String,

        /// TCP port. Default: `$PORT`, else 8080.
        #[arg(long)]
        port: Option<u16>,

        /// Per-request time budget in seconds.
        #[arg(long, env = "PDFSPLIT_REQUEST_TIMEOUT", default_value_t = 300)]
        request_timeout: u64,

        /// Largest accepted document, in MiB.
        #[arg(long, env = "PDFSPLIT_MAX_INPUT_MB", default_value_t = 64)]
        max_input_mb: usize,
    },

    /// Straighten a local PDF and write one file per range.
    Split {
        /// Input PDF.
        input: PathBuf,

        /// Page range, 1-based inclusive: `3-7` or `5`. Repeatable.
        #[arg(short, long = "range", required = true)]
        ranges: Vec<PageRange>,

        /// Directory for `<stem>_part<N>.pdf` files.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Print a JSON report instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Straighten a local PDF without splitting it.
    Rotate {
        /// Input PDF.
        input: PathBuf,

        /// Output PDF.
        #[arg(short, long)]
        output: PathBuf,

        /// Print a JSON report instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Print PDF metadata without rendering anything.
    Inspect {
        /// Input PDF.
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

impl Command {
    fn json(&self) -> bool {
        match self {
            Command::Serve { .. } => false,
            Command::Split { json, .. } | Command::Rotate { json, .. } | Command::Inspect { json, .. } => *json,
        }
    }
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Rasterisation DPI (72–600).
    #[arg(long, global = true, env = "PDFSPLIT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Pages processed at once. Default: number of CPU cores.
    #[arg(short, long, global = true, env = "PDFSPLIT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Reject documents with more pages than this.
    #[arg(long, global = true, env = "PDFSPLIT_MAX_PAGES", default_value_t = 500)]
    max_pages: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFSPLIT_PASSWORD")]
    password: Option<String>,

    /// Tesseract binary.
    #[arg(long, global = true, env = "TESSERACT_BIN", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Tesseract language for OSD (`-l`).
    #[arg(long, global = true, env = "PDFSPLIT_TESSERACT_LANG", default_value = "osd")]
    tesseract_lang: String,

    /// Treat OSD results below this orientation confidence as unknown.
    #[arg(long, global = true, env = "PDFSPLIT_MIN_CONFIDENCE")]
    min_confidence: Option<f32>,

    /// Path to libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSPLIT_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFSPLIT_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    let serving = matches!(cli.command, Command::Serve { .. });
    let show_progress = !serving && !common.quiet && !common.no_progress && !cli.command.json();
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn NormalizeProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Serve {
            host,
            port,
            request_timeout,
            max_input_mb,
        } => {
            let config = build_config(common, None, |b| {
                b.request_timeout_secs(*request_timeout)
                    .max_input_bytes(max_input_mb.saturating_mul(1024 * 1024))
            })?;
            let pipeline = Pipeline::with_pdfium(config).context("Failed to start pipeline")?;
            let mut server = ServerConfig::from_env();
            server.host = host.clone();
            if let Some(port) = port {
                server.port = *port;
            }
            edgequake_pdfsplit::server::run(server, pipeline)
                .await
                .context("HTTP server failed")?;
        }

        Command::Split {
            input,
            ranges,
            out_dir,
            json,
        } => {
            let config = build_config(common, progress_cb, |b| b)?;
            let pipeline = Pipeline::with_pdfium(config).context("Failed to start pipeline")?;
            let (output, written) = pipeline
                .split_file_to_dir(input, ranges, out_dir)
                .await
                .with_context(|| format!("Failed to split {}", input.display()))?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "output": output,
                        "files": written,
                    }))
                    .context("Failed to serialise output")?
                );
            } else if !common.quiet {
                for (part, path) in output.parts.iter().zip(&written) {
                    eprintln!(
                        "  {} pages {:<9} {}  {}",
                        green("✓"),
                        part.range.to_string(),
                        dim(&format!("({} pages)", part.page_count)),
                        bold(&path.display().to_string()),
                    );
                }
                let s = &output.stats;
                eprintln!(
                    "{}  {}/{} ranges  {}ms",
                    if s.skipped_ranges == 0 { green("✔") } else { yellow("⚠") },
                    s.emitted_ranges,
                    s.requested_ranges,
                    s.total_duration_ms,
                );
            }
        }

        Command::Rotate {
            input,
            output,
            json,
        } => {
            let config = build_config(common, progress_cb, |b| b)?;
            let pipeline = Pipeline::with_pdfium(config).context("Failed to start pipeline")?;
            let normalized = pipeline
                .rotate_file(input, output)
                .await
                .with_context(|| format!("Failed to straighten {}", input.display()))?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&normalized).context("Failed to serialise output")?
                );
            } else if !common.quiet {
                eprintln!(
                    "{}  {} pages  {}ms  →  {}",
                    green("✔"),
                    normalized.pages.len(),
                    normalized.duration_ms,
                    bold(&output.display().to_string()),
                );
            }
        }

        Command::Inspect { input, json } => {
            let engine = PdfiumEngine::bind(common.pdfium_lib.as_deref(), common.password.clone())
                .context("Failed to load pdfium")?;
            let meta = inspect(
                Arc::new(engine),
                input,
                edgequake_pdfsplit::config::DEFAULT_MAX_INPUT_BYTES,
            )
            .await
            .context("Failed to inspect PDF")?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
                );
            } else {
                print_metadata(input, &meta);
            }
        }
    }

    Ok(())
}

fn print_metadata(input: &Path, meta: &edgequake_pdfsplit::DocumentMetadata) {
    println!("File:         {}", input.display());
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    if let Some(ref s) = meta.subject {
        println!("Subject:      {}", s);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    println!("Size:         {} bytes", meta.byte_len);
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
}

/// Map CLI args to `SplitConfig`. `extra` applies subcommand-specific settings.
fn build_config(
    common: &CommonArgs,
    progress: Option<ProgressCallback>,
    extra: impl FnOnce(edgequake_pdfsplit::SplitConfigBuilder) -> edgequake_pdfsplit::SplitConfigBuilder,
) -> Result<SplitConfig> {
    let tesseract = TesseractConfig {
        binary: common.tesseract.clone(),
        lang: Some(common.tesseract_lang.clone()).filter(|l| !l.is_empty()),
        min_confidence: common.min_confidence,
    };

    let mut builder = SplitConfig::builder()
        .dpi(common.dpi)
        .max_pages(common.max_pages)
        .tesseract(tesseract);

    if let Some(n) = common.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref pwd) = common.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = common.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    extra(builder).build().context("Invalid configuration")
}
