use crate::chart::{StackedArea, encode_image_source};
use crate::config::{DateValue, RawSettings, parse_settings};
use crate::dump::write_geometry_dump;
use crate::render::write_output_svg;
use crate::surface::Surface;
use crate::telemetry::init_default_tracing;
use crate::text_metrics::FontMeasure;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "sarea", version, about = "Stacked area (cumulative flow) chart renderer")]
pub struct Args {
    /// Settings file (.json or .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and data URIs.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Write computed domains, ticks and bands as JSON
    #[arg(long = "dumpGeometry")]
    pub dump_geometry: Option<PathBuf>,

    /// Chart width, overrides the settings file
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Chart height, overrides the settings file
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// First visible day (YYYY-MM-DD)
    #[arg(long = "from")]
    pub from: Option<String>,

    /// Last visible day (YYYY-MM-DD)
    #[arg(long = "to")]
    pub to: Option<String>,

    /// Curve type, e.g. linear, basis, monotone-x, step-after
    #[arg(long = "curve")]
    pub curve: Option<String>,

    #[arg(long = "title")]
    pub title: Option<String>,

    /// Skip system font measurement; label backgrounds stay unsized
    #[arg(long = "noMeasure")]
    pub no_measure: bool,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Uri,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let _ = init_default_tracing(if args.verbose { "debug" } else { "info" });

    let input = read_input(args.input.as_deref())?;
    let raw = apply_overrides(parse_settings(&input)?, &args);
    let surface = if args.no_measure {
        Surface::svg()
    } else {
        Surface::svg_with_measure(Arc::new(FontMeasure))
    };

    let mut chart = StackedArea::new(Some(raw.with_svg(surface)));
    chart.draw()?;

    if let Some(path) = args.dump_geometry.as_deref() {
        if let (Some(settings), Some(state)) = (chart.settings(), chart.render_state()) {
            write_geometry_dump(path, settings, state)?;
            debug!(path = %path.display(), "wrote geometry dump");
        }
    }

    let svg = chart
        .surface()
        .map(Surface::to_svg_string)
        .unwrap_or_default();
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Uri => write_output_svg(&encode_image_source(&svg), args.output.as_deref())?,
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let (width, height) = chart
                .settings()
                .map(|settings| (settings.width, settings.height))
                .unwrap_or((crate::config::DEFAULT_WIDTH, crate::config::DEFAULT_HEIGHT));
            write_png(&svg, &output, width, height)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, width: f64, height: f64) -> Result<()> {
    crate::render::write_output_png(svg, output, width, height)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _width: f64, _height: f64) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// Command line flags win over the settings file.
fn apply_overrides(mut raw: RawSettings, args: &Args) -> RawSettings {
    if let Some(width) = args.width {
        raw.width = Some(width);
    }
    if let Some(height) = args.height {
        raw.height = Some(height);
    }
    if let Some(from) = &args.from {
        raw.from_date = Some(DateValue::from(from.as_str()));
    }
    if let Some(to) = &args.to {
        raw.to_date = Some(DateValue::from(to.as_str()));
    }
    if let Some(curve) = &args.curve {
        raw.curve.get_or_insert_with(Default::default).kind = Some(curve.clone());
    }
    if let Some(title) = &args.title {
        raw.title = Some(title.clone());
    }
    raw
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    output
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Output path required for {ext} output"))
}
