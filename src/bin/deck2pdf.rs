//! CLI binary for deck2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExportConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use deck2pdf::pipeline::input::is_url;
use deck2pdf::{
    export, inspect, renumber_file, resolve_deck, ExportConfig, ExportProgressCallback,
    ExportStats, PageSize, ProgressCallback, SettleMode, StalePolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

/// Terminal progress callback: a live bar plus one log line per slide.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the slide currently being rendered.
    slide_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Start as a spinner; `on_export_start` sets the real length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Launching Chromium…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            slide_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_slides: usize) {
        self.activate_bar(total_slides);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Exporting {total_slides} slides…"))
        ));
    }

    fn on_slide_start(&self, slide: usize, _total: usize) {
        if let Ok(mut started) = self.slide_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("slide {slide}"));
    }

    fn on_slide_rendered(&self, slide: usize, total: usize, pdf_bytes: usize) {
        let elapsed_ms = self
            .slide_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            slide,
            total,
            dim(&format!("{:>6} KiB", pdf_bytes.div_ceil(1024))),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_merge_start(&self, _total: usize) {
        self.bar.set_prefix("Merging");
        self.bar.set_message("combining pages…");
    }

    fn on_export_complete(&self, _stats: &ExportStats) {
        // `main` prints the summary once the output is in place.
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export next to the deck (presentation.pdf)
  deck2pdf presentation.html

  # Explicit output path and 4:3 page size
  deck2pdf talk.html -o out/talk.pdf --width 1024 --height 768

  # Fixed waits for decks with custom animation code
  deck2pdf --settle fixed --transition-settle-ms 1500 talk.html

  # A deck with its own navigation names
  deck2pdf --slide-selector section --show-slide-fn goTo --current-slide-var none deck.html

  # Count slides without rendering
  deck2pdf --inspect-only --json talk.html

  # Fix numbering after inserting a slide marked data-slide="x"
  deck2pdf --renumber-only talk.html

  # Inside a container
  deck2pdf --no-sandbox --chrome /usr/bin/chromium talk.html

DECK REQUIREMENTS:
  One element per slide             (default selector: .slide)
  A global function showing slide N (default: showSlide)
  A global current-slide variable   (default: currentSlide; 'none' to skip)

WORKING AREA:
  Page artifacts (slide_01.pdf, slide_02.pdf, …) are written to temp_pdfs/
  beside the output and removed after a successful run. Leftovers from an
  interrupted run are cleared first unless --on-stale fail is given.

ENVIRONMENT VARIABLES:
  Every flag can be set through DECK2PDF_<FLAG>, e.g. DECK2PDF_NO_SANDBOX=true.
  RUST_LOG overrides the log filter.
"#;

/// Export HTML slide decks to one-page-per-slide PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "deck2pdf",
    version,
    about = "Export HTML slide decks to one-page-per-slide PDFs via headless Chromium",
    long_about = "Load an HTML slide deck in headless Chromium, show each slide in turn, \
print it as one fixed-size page and merge the pages into a single PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file path or HTTP/HTTPS URL.
    input: String,

    /// Output PDF. Default: the input path with a .pdf extension.
    #[arg(short, long, env = "DECK2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Page and viewport width in CSS pixels.
    #[arg(long, env = "DECK2PDF_WIDTH", default_value_t = 1920)]
    width: u32,

    /// Page and viewport height in CSS pixels.
    #[arg(long, env = "DECK2PDF_HEIGHT", default_value_t = 1080)]
    height: u32,

    /// Upper bound on the wait after the deck loads, in ms.
    #[arg(long, env = "DECK2PDF_LOAD_SETTLE_MS", default_value_t = 2000)]
    load_settle_ms: u64,

    /// Upper bound on the wait after each slide change, in ms.
    #[arg(long, env = "DECK2PDF_TRANSITION_SETTLE_MS", default_value_t = 3000)]
    transition_settle_ms: u64,

    /// How settle time is spent: fixed sleeps, or readiness signals.
    #[arg(long, env = "DECK2PDF_SETTLE", value_enum, default_value = "readiness")]
    settle: SettleArg,

    /// CSS selector matching one element per slide.
    #[arg(long, env = "DECK2PDF_SLIDE_SELECTOR", default_value = ".slide")]
    slide_selector: String,

    /// Global function the deck uses to show slide N.
    #[arg(long, env = "DECK2PDF_SHOW_SLIDE_FN", default_value = "showSlide")]
    show_slide_fn: String,

    /// Global current-slide variable set before each call ('none' to skip).
    #[arg(long, env = "DECK2PDF_CURRENT_SLIDE_VAR", default_value = "currentSlide")]
    current_slide_var: String,

    /// Working directory for page artifacts. Default: temp_pdfs beside the output.
    #[arg(long, env = "DECK2PDF_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// What to do with page artifacts left by an earlier run.
    #[arg(long, env = "DECK2PDF_ON_STALE", value_enum, default_value = "clear")]
    on_stale: StaleArg,

    /// Chrome/Chromium executable. Default: auto-detected.
    #[arg(long, env = "DECK2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Launch Chromium without its sandbox (needed in most containers).
    #[arg(long, env = "DECK2PDF_NO_SANDBOX")]
    no_sandbox: bool,

    /// Print slide count and title only, no export.
    #[arg(long)]
    inspect_only: bool,

    /// Renumber slides around a data-slide="x" placeholder, no export.
    #[arg(long, conflicts_with = "inspect_only")]
    renumber_only: bool,

    /// Print results as JSON on stdout.
    #[arg(long, env = "DECK2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DECK2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DECK2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DECK2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SettleArg {
    Fixed,
    Readiness,
}

impl From<SettleArg> for SettleMode {
    fn from(v: SettleArg) -> Self {
        match v {
            SettleArg::Fixed => SettleMode::Fixed,
            SettleArg::Readiness => SettleMode::Readiness,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StaleArg {
    Clear,
    Fail,
}

impl From<StaleArg> for StalePolicy {
    fn from(v: StaleArg) -> Self {
        match v {
            StaleArg::Clear => StalePolicy::Clear,
            StaleArg::Fail => StalePolicy::Fail,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only && !cli.renumber_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Renumber-only mode ───────────────────────────────────────────────
    if cli.renumber_only {
        let deck = resolve_deck(&cli.input).context("Failed to open deck")?;
        let Some(path) = deck.path() else {
            anyhow::bail!("--renumber-only needs a local file, got URL '{}'", cli.input);
        };
        let outcome = renumber_file(path)
            .await
            .context("Failed to renumber slides")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to serialise result")?
            );
        } else if !cli.quiet {
            match outcome {
                Some(o) => eprintln!(
                    "{} Placeholder is slide {} of {}  {}",
                    green("✔"),
                    bold(&o.position.to_string()),
                    o.total,
                    dim(&format!(
                        "({} attributes, {} counters updated)",
                        o.attributes_updated, o.counters_updated
                    )),
                ),
                None => eprintln!("No data-slide=\"x\" placeholder found; file unchanged"),
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExportProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect deck")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise deck info")?
            );
        } else {
            println!("Source:   {}", info.source);
            if let Some(ref t) = info.title {
                println!("Title:    {}", t);
            }
            println!("Slides:   {}", info.slide_count);
        }
        return Ok(());
    }

    // ── Run export ───────────────────────────────────────────────────────
    let output_path = match cli.output {
        Some(ref p) => p.clone(),
        None => default_output(&cli.input),
    };

    let stats = export(&cli.input, &output_path, &config)
        .await
        .context("Export failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!("{}", summary(&stats));
    }

    Ok(())
}

/// The success report printed after an export.
fn summary(stats: &ExportStats) -> String {
    format!(
        "{}  {} pages  {}ms  →  {}\n   {} render  /  {} merge  /  {} KiB",
        green("✔"),
        stats.page_count,
        stats.total_duration_ms,
        bold(&stats.output_path.display().to_string()),
        dim(&format!("{}ms", stats.render_duration_ms)),
        dim(&format!("{}ms", stats.merge_duration_ms)),
        dim(&stats.output_bytes.div_ceil(1024).to_string()),
    )
}

/// Map CLI args to `ExportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExportConfig> {
    let current_slide_var = match cli.current_slide_var.trim() {
        "" | "none" => None,
        name => Some(name.to_string()),
    };

    let mut builder = ExportConfig::builder()
        .page_size(PageSize::new(cli.width, cli.height))
        .load_settle_ms(cli.load_settle_ms)
        .transition_settle_ms(cli.transition_settle_ms)
        .settle_mode(cli.settle.into())
        .slide_selector(cli.slide_selector.clone())
        .show_slide_fn(cli.show_slide_fn.clone())
        .current_slide_var(current_slide_var)
        .stale_policy(cli.on_stale.into())
        .no_sandbox(cli.no_sandbox);

    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `talk.html` → `talk.pdf`; a URL's last path segment lands in the
/// current directory.
fn default_output(input: &str) -> PathBuf {
    if is_url(input) {
        let name = input
            .split(['?', '#'])
            .next()
            .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("slides");
        return Path::new(name).with_extension("pdf");
    }
    Path::new(input).with_extension("pdf")
}
