use crate::curve::Curve;
use crate::data::{Dataset, date_from_millis, format_date, parse_date};
use crate::error::{ConfigError, ConfigResult};
use crate::style::{AxisStyle, MarkerStyle, SeriesStyle, Style};
use crate::surface::Surface;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_WIDTH: f64 = 800.0;
pub const DEFAULT_HEIGHT: f64 = 400.0;
pub const DEFAULT_MARGIN: f64 = 50.0;

/// Chart configuration as supplied by the caller. Every field is optional so that
/// validation can report exactly what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    /// Target surface. Never part of a settings file; callers attach it in code.
    #[serde(skip)]
    pub svg: Option<Surface>,
    pub data: Option<RawData>,
    pub title: Option<String>,
    pub legend_title: Option<String>,
    pub margin: Option<RawMargin>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub from_date: Option<DateValue>,
    pub to_date: Option<DateValue>,
    pub markers: Option<Vec<RawMarker>>,
    pub draw_options: Option<Vec<DrawOption>>,
    pub style: Option<RawStyle>,
    pub curve: Option<RawCurve>,
}

impl RawSettings {
    pub fn with_svg(mut self, svg: Surface) -> Self {
        self.svg = Some(svg);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawData {
    pub keys: Option<Vec<String>>,
    /// Kept untyped so a non-sequence can be reported as such.
    pub entries: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawMargin {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyle {
    pub font_size: Option<NumberOrString>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub axis: Option<RawAxisStyle>,
    pub markers: Option<RawMarkerStyle>,
    /// Any other key is a per-series override, e.g. `"Done": {"color": "green"}`.
    #[serde(flatten)]
    pub series: BTreeMap<String, SeriesStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAxisStyle {
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarkerStyle {
    pub color: Option<String>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCurve {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tension: Option<f64>,
    pub alpha: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMarker {
    pub date: DateValue,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f64>().ok(),
        }
    }
}

/// A date as it appears in settings: epoch milliseconds, an ISO-8601 string, or a
/// calendar day supplied from code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Millis(f64),
    Text(String),
    #[serde(skip)]
    Day(NaiveDate),
}

impl DateValue {
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Millis(ms) if ms.is_finite() => date_from_millis(*ms as i64),
            DateValue::Millis(_) => None,
            DateValue::Text(text) => parse_date(text),
            DateValue::Day(day) => Some(*day),
        }
    }

    fn resolve(&self, context: &str) -> ConfigResult<NaiveDate> {
        self.to_date().ok_or_else(|| ConfigError::InvalidDate {
            value: match self {
                DateValue::Millis(ms) => ms.to_string(),
                DateValue::Text(text) => text.clone(),
                DateValue::Day(day) => format_date(*day),
            },
            context: context.to_string(),
        })
    }
}

impl From<NaiveDate> for DateValue {
    fn from(day: NaiveDate) -> Self {
        DateValue::Day(day)
    }
}

impl From<&str> for DateValue {
    fn from(text: &str) -> Self {
        DateValue::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawOption {
    Title,
    Axis,
    Legend,
    Markers,
    Focus,
}

impl DrawOption {
    pub const ALL: [DrawOption; 5] = [
        DrawOption::Title,
        DrawOption::Axis,
        DrawOption::Legend,
        DrawOption::Markers,
        DrawOption::Focus,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: DEFAULT_MARGIN,
            right: DEFAULT_MARGIN,
            bottom: DEFAULT_MARGIN,
            left: DEFAULT_MARGIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub date: NaiveDate,
    pub label: Option<String>,
}

impl Marker {
    /// Custom label, or the marker date as `YYYY-MM-DD`.
    pub fn label_text(&self) -> String {
        self.label.clone().unwrap_or_else(|| format_date(self.date))
    }
}

/// Fully resolved configuration. Produced once per draw by [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data: Dataset,
    pub title: Option<String>,
    pub legend_title: Option<String>,
    pub margin: Margin,
    pub width: f64,
    pub height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub markers: Vec<Marker>,
    pub draw_options: Vec<DrawOption>,
    pub style: Style,
    pub curve: Curve,
}

impl Settings {
    pub fn draws(&self, option: DrawOption) -> bool {
        self.draw_options.contains(&option)
    }
}

/// Validates `raw` and fills every absent field with its default.
///
/// Checks run in a fixed order so the first problem found is the one reported: settings,
/// target surface, data, entries, keys.
pub fn normalize(raw: Option<&RawSettings>) -> ConfigResult<Settings> {
    let raw = raw.ok_or(ConfigError::MissingConfig)?;
    match &raw.svg {
        Some(svg) if svg.is_svg() => {}
        _ => return Err(ConfigError::InvalidTarget),
    }
    let data = raw.data.as_ref().ok_or(ConfigError::MissingData)?;
    let entries = data.entries.as_ref().ok_or(ConfigError::MissingEntries)?;
    let entries = entries
        .as_array()
        .ok_or(ConfigError::EntriesNotASequence)?;
    if entries.is_empty() {
        return Err(ConfigError::EmptyEntries);
    }
    let keys = data.keys.clone().ok_or(ConfigError::MissingKeys)?;
    if keys.is_empty() {
        return Err(ConfigError::EmptyKeys);
    }
    let dataset = Dataset::from_entries(keys, entries)?;

    let margin = resolve_margin(raw.margin.as_ref());
    let width = raw.width.unwrap_or(DEFAULT_WIDTH);
    let height = raw.height.unwrap_or(DEFAULT_HEIGHT);

    let from_date = raw
        .from_date
        .as_ref()
        .map(|value| value.resolve("fromDate"))
        .transpose()?;
    let to_date = raw
        .to_date
        .as_ref()
        .map(|value| value.resolve("toDate"))
        .transpose()?;

    let markers = raw
        .markers
        .iter()
        .flatten()
        .enumerate()
        .map(|(idx, marker)| {
            Ok(Marker {
                date: marker.date.resolve(&format!("marker {idx}"))?,
                label: marker.label.clone(),
            })
        })
        .collect::<ConfigResult<Vec<_>>>()?;

    let curve = match &raw.curve {
        Some(curve) => Curve::from_name(
            curve.kind.as_deref().unwrap_or("linear"),
            curve.tension,
            curve.alpha,
        )?,
        None => Curve::Linear,
    };

    let settings = Settings {
        data: dataset,
        title: raw.title.clone(),
        legend_title: raw.legend_title.clone(),
        margin,
        width,
        height,
        inner_width: width - margin.left - margin.right,
        inner_height: height - margin.top - margin.bottom,
        from_date,
        to_date,
        markers,
        draw_options: raw
            .draw_options
            .clone()
            .unwrap_or_else(|| DrawOption::ALL.to_vec()),
        style: resolve_style(raw.style.as_ref()),
        curve,
    };
    debug!(
        keys = settings.data.keys.len(),
        entries = settings.data.records.len(),
        width = settings.width,
        height = settings.height,
        curve = %settings.curve,
        "normalized settings"
    );
    Ok(settings)
}

fn resolve_margin(raw: Option<&RawMargin>) -> Margin {
    let raw = raw.copied().unwrap_or_default();
    Margin {
        top: raw.top.unwrap_or(DEFAULT_MARGIN),
        right: raw.right.unwrap_or(DEFAULT_MARGIN),
        bottom: raw.bottom.unwrap_or(DEFAULT_MARGIN),
        left: raw.left.unwrap_or(DEFAULT_MARGIN),
    }
}

fn resolve_style(raw: Option<&RawStyle>) -> Style {
    let mut style = Style::default();
    let Some(raw) = raw else {
        return style;
    };
    if let Some(size) = raw.font_size.as_ref().and_then(NumberOrString::as_f64) {
        style.font_size = size;
    }
    if let Some(family) = &raw.font_family {
        style.font_family = family.clone();
    }
    if let Some(color) = &raw.color {
        style.color = color.clone();
    }
    if let Some(background) = &raw.background_color {
        style.background_color = background.clone();
    }
    style.axis = AxisStyle {
        color: raw
            .axis
            .as_ref()
            .and_then(|axis| axis.color.clone())
            .unwrap_or_else(|| style.color.clone()),
    };
    let markers = raw.markers.clone().unwrap_or_default();
    style.markers = MarkerStyle {
        color: markers.color.unwrap_or_else(|| style.color.clone()),
        background_color: markers
            .background_color
            .unwrap_or_else(|| style.background_color.clone()),
    };
    style.series = raw.series.clone();
    style
}

/// Parses settings text as strict JSON first, then as JSON5.
pub fn parse_settings(contents: &str) -> anyhow::Result<RawSettings> {
    match serde_json::from_str(contents) {
        Ok(settings) => Ok(settings),
        Err(json_err) => json5::from_str(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid settings: {json5_err} (as JSON: {json_err})")
        }),
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<RawSettings> {
    let contents = std::fs::read_to_string(path)?;
    parse_settings(&contents)
}
