use crate::config::load_config;
use crate::document::{FlowDocument, load_document, parse_document};
use crate::edge::SmoothStepRouter;
use crate::geometry_dump::{GeometryDump, write_geometry_dump};
use crate::render::{render_document_svg, write_output_svg};
use crate::tooltip::PlainTextRenderer;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `AFEDGE_LOG=debug`.
const LOG_ENV: &str = "AFEDGE_LOG";

#[derive(Parser, Debug)]
#[command(name = "afedge", version, about = "Render agent message-flow connections to SVG")]
pub struct Args {
    /// Input flow document (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, selfLoop, smoothStep, tooltip)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width used when rasterizing
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height used when rasterizing
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    /// Resolved geometry and tooltip models as JSON
    Json,
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let document = read_document(args.input.as_deref())?;
    tracing::info!(edges = document.edges.len(), "rendering flow document");

    let router = SmoothStepRouter::new(config.edge.smooth_step.clone());
    let renderer = PlainTextRenderer;

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_document_svg(&document, &config, &router, &renderer);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Json => {
            let dump = GeometryDump::from_document(&document, &config.edge, &router, &renderer);
            write_geometry_dump(args.output.as_deref(), &dump)?;
        }
        OutputFormat::Png => write_png(&document, &config, &router, &renderer, &args.output)?,
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(
    document: &FlowDocument,
    config: &crate::config::Config,
    router: &SmoothStepRouter,
    renderer: &PlainTextRenderer,
    output: &Option<PathBuf>,
) -> Result<()> {
    let output = ensure_output(output, "png")?;
    let svg = render_document_svg(document, config, router, renderer);
    crate::render::write_output_png(&svg, &output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(
    _document: &FlowDocument,
    _config: &crate::config::Config,
    _router: &SmoothStepRouter,
    _renderer: &PlainTextRenderer,
    _output: &Option<PathBuf>,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_document(path: Option<&Path>) -> Result<FlowDocument> {
    match path {
        Some(path) if path != Path::new("-") => Ok(load_document(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(parse_document(&buf)?)
        }
    }
}

#[cfg_attr(not(feature = "png"), allow(dead_code))]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
