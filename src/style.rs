use serde::Deserialize;
use std::collections::BTreeMap;

/// Fallback series fills, indexed by a key's position in the reversed key list.
pub const DEFAULT_COLORS: [&str; 4] = ["#222", "#555", "#888", "#bbb"];

pub const DEFAULT_FONT_SIZE: f64 = 12.0;
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
pub const DEFAULT_COLOR: &str = "#222";
pub const DEFAULT_BACKGROUND: &str = "#fff";

#[derive(Debug, Clone, PartialEq)]
pub struct AxisStyle {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub color: String,
    pub background_color: String,
}

/// Per-key overrides; unset fields fall back to the palette and the background.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesStyle {
    pub color: Option<String>,
    pub stroke: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub background_color: String,
    pub axis: AxisStyle,
    pub markers: MarkerStyle,
    pub series: BTreeMap<String, SeriesStyle>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            color: DEFAULT_COLOR.to_string(),
            background_color: DEFAULT_BACKGROUND.to_string(),
            axis: AxisStyle {
                color: DEFAULT_COLOR.to_string(),
            },
            markers: MarkerStyle {
                color: DEFAULT_COLOR.to_string(),
                background_color: DEFAULT_BACKGROUND.to_string(),
            },
            series: BTreeMap::new(),
        }
    }
}

impl Style {
    pub fn fill_for(&self, key: &str, reverse_keys: &[String]) -> String {
        if let Some(color) = self.series.get(key).and_then(|s| s.color.clone()) {
            return color;
        }
        let index = reverse_keys.iter().position(|k| k == key).unwrap_or(0);
        DEFAULT_COLORS[index % DEFAULT_COLORS.len()].to_string()
    }

    pub fn stroke_for(&self, key: &str) -> String {
        self.series
            .get(key)
            .and_then(|s| s.stroke.clone())
            .unwrap_or_else(|| self.background_color.clone())
    }

    /// Vertical text offset used by every label, `fontSize / 3` in px.
    pub fn dy(&self) -> String {
        format!("{}px", crate::surface::fmt_num(self.font_size / 3.0))
    }

    pub fn font_size_px(&self) -> String {
        format!("{}px", crate::surface::fmt_num(self.font_size))
    }
}
