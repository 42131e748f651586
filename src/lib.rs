pub mod chart;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod curve;
pub mod data;
pub mod dump;
pub mod error;
pub mod focus;
pub mod range;
pub mod render;
pub mod scale;
pub mod stack;
pub mod style;
pub mod surface;
pub mod telemetry;
pub mod text_metrics;

pub use chart::StackedArea;
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{DateValue, DrawOption, RawData, RawSettings, Settings, normalize, parse_settings};
pub use curve::Curve;
pub use error::{ConfigError, ConfigResult};
pub use focus::FocusReadout;
pub use surface::{NoMeasure, Surface, TextMeasure};
pub use text_metrics::FontMeasure;

/// Renders settings text (JSON or JSON5) to SVG markup on a headless surface.
pub fn render_settings_svg(settings: &str) -> anyhow::Result<String> {
    let raw = parse_settings(settings)?.with_svg(Surface::svg());
    let mut chart = StackedArea::new(Some(raw));
    Ok(chart.svg_source()?)
}
