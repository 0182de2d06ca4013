use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fieldplan_core::{
    export_page, load_page_file, BlankPageSource, EngineConfig, ExportFormat, ImagePageSource,
    Page, PageSource, ScaleSource,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "fieldplan-cli")]
#[command(about = "Field plan measurement CLI")]
pub struct Cli {
    /// Engine configuration file (TOML).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a machine-readable summary of a saved page.
    Info {
        #[arg(value_name = "PAGE")]
        file: PathBuf,
    },
    /// Composite a saved page's annotations over its background.
    Export {
        #[arg(value_name = "PAGE")]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Png)]
        format: Format,
        /// Directory receiving the artifact; defaults to the page's directory.
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Raster plan used as background, overriding the page's own.
        #[arg(long, value_name = "IMAGE")]
        background: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Png,
    Pdf,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => ExportFormat::Png,
            Format::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    page_index: usize,
    native_size: SizeOutput,
    display_size: SizeOutput,
    pixels_per_meter: Option<f32>,
    drawing_ratio: Option<f32>,
    scale_source: Option<ScaleSource>,
    annotations: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Serialize)]
struct SizeOutput {
    width: u32,
    height: u32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging();

    match cli.command {
        Commands::Info { file } => {
            let config = load_config(cli.config.as_deref())?;
            run_info(&file, &config)
        }
        Commands::Export { file, format, output, background } => {
            let config = load_config(cli.config.as_deref())?;
            run_export(&file, format.into(), output.as_deref(), background.as_deref(), &config)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Log to stderr so stdout stays machine-readable
fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    // a subscriber may already be installed when run from tests
    let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?
            .apply_env()?,
        None => EngineConfig::from_env()?,
    };
    Ok(config)
}

fn read_page(file: &Path) -> Result<Page> {
    ensure_file_exists(file)?;
    load_page_file(file).with_context(|| format!("failed to read page {}", file.display()))
}

fn run_info(file: &Path, config: &EngineConfig) -> Result<()> {
    let page = read_page(file)?;
    let background = page.background();
    let scale = page.scale();

    let payload = InfoOutput {
        page_index: page.index(),
        native_size: SizeOutput {
            width: background.native_width,
            height: background.native_height,
        },
        display_size: SizeOutput {
            width: background.display_width,
            height: background.display_height,
        },
        pixels_per_meter: scale.pixels_per_meter(),
        drawing_ratio: scale.drawing_ratio(config.render_scale).map(f32::round),
        scale_source: scale.source(),
        annotations: page.counts_by_kind(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}

fn run_export(
    file: &Path,
    format: ExportFormat,
    output: Option<&Path>,
    background: Option<&Path>,
    config: &EngineConfig,
) -> Result<()> {
    let page = read_page(file)?;
    let page_dir = file.parent().unwrap_or_else(|| Path::new("."));

    // relative plan paths stored in a page resolve against the page file
    let plan = background
        .map(Path::to_path_buf)
        .or_else(|| page.background().source.as_ref().map(|p| page_dir.join(p)));
    let source: Box<dyn PageSource> = match plan {
        Some(plan) => {
            ensure_file_exists(&plan)?;
            Box::new(ImagePageSource::open(&plan).context("failed to open background")?)
        }
        None => {
            debug!("no background plan, exporting over white");
            Box::new(BlankPageSource)
        }
    };

    let dir = output.unwrap_or(page_dir);
    info!(page = page.index(), format = format.extension(), "exporting");
    let path = export_page(
        &page,
        source.as_ref(),
        format,
        dir,
        &config.artifact_prefix,
        config.export_dpi,
    )
    .context("export failed")?;

    println!("{}", path.display());
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
