//! `drawer-scan`: read drawer labels from a photo of a storage case.
//!
//! ```text
//! drawer-scan --layout "8x8" case.jpg
//! drawer-scan --layout "10164" --api-url http://localhost:3000 -o out photo.jpg
//! drawer-scan --list-layouts
//! ```

use clap::Parser;
use drawer_scan::{
    describe_layout, select_layout, DrawerScanner, FileCatalog, HttpCatalog, LayoutCatalog,
    LayoutTemplate, OcrBackend, ScanConfig, ScanError, ScanOutcome,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "drawer-scan",
    version,
    about = "Detect drawer labels using ArUco markers and OCR"
)]
struct Cli {
    /// Input image file.
    image: Option<PathBuf>,

    /// Layout template name (partial match, case-insensitive).
    #[arg(short, long)]
    layout: Option<String>,

    /// Catalog API base URL.
    #[arg(long, env = "DRAWER_SCAN_API_URL", default_value = "http://localhost:3002")]
    api_url: String,

    /// Read layouts and drawer sizes from a JSON snapshot instead of the API.
    #[arg(long)]
    catalog_file: Option<PathBuf>,

    /// List available layout templates and exit.
    #[arg(long)]
    list_layouts: bool,

    /// Output directory for results.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON scan configuration; command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Text extraction backend.
    #[arg(long, value_enum)]
    ocr: Option<OcrBackend>,

    #[arg(long, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    #[arg(long, env = "OLLAMA_MODEL")]
    ollama_model: Option<String>,

    #[arg(long, env = "OLLAMA_PROMPT")]
    ollama_prompt: Option<String>,

    /// Path to the tesseract executable.
    #[arg(long)]
    tesseract_bin: Option<String>,

    /// Per-label text extraction timeout; the config file value otherwise.
    #[arg(long)]
    ocr_timeout_secs: Option<u64>,

    /// One of off, error, warn, info, debug, trace. `RUST_LOG` takes
    /// precedence in `tracing` builds.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    #[cfg(feature = "tracing")]
    drawer_scan::init_tracing(false, &cli.log_level);
    #[cfg(not(feature = "tracing"))]
    {
        let level = cli.log_level.parse().unwrap_or(log::LevelFilter::Info);
        let _ = drawer_scan::init_with_level(level);
    }

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, ScanError> {
    let config = build_config(&cli)?;

    let catalog: Box<dyn LayoutCatalog> = match &cli.catalog_file {
        Some(path) => {
            info!("reading layout catalog from {}", path.display());
            Box::new(FileCatalog::load(path)?)
        }
        None => {
            info!("fetching layout templates from {}", cli.api_url);
            Box::new(HttpCatalog::new(&cli.api_url, Duration::from_secs(10))?)
        }
    };
    let templates = catalog.layout_templates()?;
    let sizes = catalog.size_classes()?;

    if cli.list_layouts {
        println!("Available layout templates:");
        for t in &templates {
            println!("  - {}", describe_layout(t));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(selector) = cli.layout.as_deref() else {
        eprintln!("error: --layout is required");
        print_layouts(&templates);
        return Ok(ExitCode::FAILURE);
    };
    let Some(layout) = select_layout(&templates, selector) else {
        eprintln!("error: no matching layout for '{selector}'");
        print_layouts(&templates);
        return Ok(ExitCode::FAILURE);
    };
    let Some(image_path) = cli.image.as_ref() else {
        eprintln!("error: image file is required");
        return Ok(ExitCode::FAILURE);
    };

    let image = image::open(image_path)?.to_rgb8();
    println!("Layout: {}", describe_layout(layout));
    println!("Image size: {} x {}", image.width(), image.height());

    let extractor = config.text_extractor()?;
    let scanner = DrawerScanner::new(config, extractor)?;
    let outcome = scanner.scan(&image, layout, &sizes, Some(&cli.output_dir))?;

    print_results(&outcome);
    println!("{}", outcome.summary_line());
    Ok(ExitCode::SUCCESS)
}

fn build_config(cli: &Cli) -> Result<ScanConfig, ScanError> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::load_json(path)?,
        None => ScanConfig::default(),
    };
    if let Some(ocr) = cli.ocr {
        config.ocr = ocr;
    }
    if let Some(url) = &cli.ollama_url {
        config.ollama.url = url.clone();
    }
    if let Some(model) = &cli.ollama_model {
        config.ollama.model = model.clone();
    }
    if let Some(prompt) = &cli.ollama_prompt {
        config.ollama.prompt = prompt.clone();
    }
    if let Some(bin) = &cli.tesseract_bin {
        config.tesseract.binary = bin.clone();
    }
    if let Some(secs) = cli.ocr_timeout_secs {
        config.ollama.timeout_secs = secs;
        config.tesseract.timeout_secs = secs;
    }
    Ok(config)
}

fn print_layouts(templates: &[LayoutTemplate]) {
    eprintln!("Available layout templates:");
    for t in templates {
        eprintln!("  - {}", describe_layout(t));
    }
}

fn print_results(outcome: &ScanOutcome) {
    for r in outcome.results() {
        if r.has_text() {
            println!("Row {}, Col {}: '{}'", r.row, r.col, r.text);
        } else {
            println!("Row {}, Col {}: [no text]", r.row, r.col);
        }
    }
}
