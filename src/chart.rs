use crate::config::{RawSettings, Settings, normalize};
use crate::error::{ConfigError, ConfigResult};
use crate::focus::{FocusReadout, resolve_focus};
use crate::render::{RenderState, render_chart};
use crate::surface::Surface;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

pub const IMAGE_SOURCE_PREFIX: &str = "data:image/svg+xml;base64,";

/// Wraps serialized SVG into a base64 `data:` URI.
pub fn encode_image_source(svg: &str) -> String {
    format!("{IMAGE_SOURCE_PREFIX}{}", STANDARD.encode(svg))
}

#[derive(Debug, Clone)]
enum ChartState {
    Unrendered,
    Rendered {
        settings: Box<Settings>,
        render: RenderState,
    },
}

/// A stacked area chart bound to its settings and target surface.
///
/// ```
/// use serde_json::json;
/// use stacked_area_renderer::{RawData, RawSettings, StackedArea, Surface};
///
/// let raw = RawSettings {
///     data: Some(RawData {
///         keys: Some(vec!["Open".into(), "Done".into()]),
///         entries: Some(json!([["2018-09-01", 3, 1], ["2018-09-02", 2, 4]])),
///     }),
///     ..RawSettings::default()
/// }
/// .with_svg(Surface::svg());
/// let mut chart = StackedArea::new(Some(raw));
/// let svg = chart.svg_source().unwrap();
/// assert!(svg.starts_with("<svg"));
/// ```
#[derive(Debug, Clone)]
pub struct StackedArea {
    raw: Option<RawSettings>,
    state: ChartState,
}

impl StackedArea {
    pub fn new(raw: Option<RawSettings>) -> Self {
        Self {
            raw,
            state: ChartState::Unrendered,
        }
    }

    /// Validates the settings, then rebuilds the chart from scratch. On error the surface
    /// is left untouched.
    pub fn draw(&mut self) -> ConfigResult<()> {
        let settings = normalize(self.raw.as_ref())?;
        self.remove();
        let surface = self
            .raw
            .as_mut()
            .and_then(|raw| raw.svg.as_mut())
            .ok_or(ConfigError::InvalidTarget)?;
        debug!(
            keys = settings.data.keys.len(),
            entries = settings.data.records.len(),
            "drawing chart"
        );
        let render = render_chart(surface, &settings);
        self.state = ChartState::Rendered {
            settings: Box::new(settings),
            render,
        };
        Ok(())
    }

    /// Detaches everything drawn so far.
    pub fn remove(&mut self) {
        if let Some(surface) = self.raw.as_mut().and_then(|raw| raw.svg.as_mut()) {
            surface.clear();
        }
        self.state = ChartState::Unrendered;
    }

    pub fn svg_source(&mut self) -> ConfigResult<String> {
        self.draw()?;
        Ok(self.surface().map(Surface::to_svg_string).unwrap_or_default())
    }

    /// The drawn chart as a `data:` URI, usable as an image `src`.
    pub fn image_source(&mut self) -> ConfigResult<String> {
        let svg = self.svg_source()?;
        Ok(encode_image_source(&svg))
    }

    /// Pointer moved to `x`, measured from the left edge of the plot area.
    ///
    /// Shows the focus overlay and returns its readout, or hides it when fewer than two
    /// keys are positive at the resolved date.
    pub fn pointer_move(&mut self, x: f64) -> Option<FocusReadout> {
        let ChartState::Rendered { settings, render } = &self.state else {
            return None;
        };
        let overlay = render.focus.as_ref()?;
        let surface = self.raw.as_mut()?.svg.as_mut()?;
        match resolve_focus(x, settings, &render.scales, surface) {
            Some(readout) => {
                overlay.show(surface, &readout, settings);
                Some(readout)
            }
            None => {
                overlay.hide(surface);
                None
            }
        }
    }

    pub fn pointer_out(&mut self) {
        let ChartState::Rendered { render, .. } = &self.state else {
            return;
        };
        if let (Some(overlay), Some(surface)) = (
            render.focus.as_ref(),
            self.raw.as_mut().and_then(|raw| raw.svg.as_mut()),
        ) {
            overlay.hide(surface);
        }
    }

    /// Resolved settings of the last successful draw.
    pub fn settings(&self) -> Option<&Settings> {
        match &self.state {
            ChartState::Rendered { settings, .. } => Some(settings.as_ref()),
            ChartState::Unrendered => None,
        }
    }

    pub fn render_state(&self) -> Option<&RenderState> {
        match &self.state {
            ChartState::Rendered { render, .. } => Some(render),
            ChartState::Unrendered => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.state, ChartState::Rendered { .. })
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.raw.as_ref().and_then(|raw| raw.svg.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawData;
    use base64::Engine as _;
    use serde_json::json;

    fn chart() -> StackedArea {
        let raw = RawSettings {
            data: Some(RawData {
                keys: Some(vec!["A".into(), "B".into()]),
                entries: Some(json!([
                    {"date": "2018-09-01", "A": 1, "B": 1},
                    {"date": "2018-09-02", "A": 2, "B": 0},
                ])),
            }),
            ..RawSettings::default()
        }
        .with_svg(Surface::svg());
        StackedArea::new(Some(raw))
    }

    #[test]
    fn draw_is_idempotent() {
        let mut chart = chart();
        let first = chart.svg_source().unwrap();
        let second = chart.svg_source().unwrap();
        assert_eq!(first, second);
        assert!(chart.is_rendered());
    }

    #[test]
    fn remove_returns_to_unrendered() {
        let mut chart = chart();
        chart.draw().unwrap();
        chart.remove();
        assert!(!chart.is_rendered());
        assert_eq!(chart.surface().map(Surface::descendant_count), Some(0));
        assert!(chart.settings().is_none());
    }

    #[test]
    fn failed_draw_leaves_the_surface_alone() {
        let mut chart = chart();
        chart.draw().unwrap();
        let drawn = chart.surface().map(Surface::descendant_count);
        if let Some(raw) = chart.raw.as_mut() {
            raw.data = None;
        }
        assert_eq!(chart.draw(), Err(ConfigError::MissingData));
        assert_eq!(chart.surface().map(Surface::descendant_count), drawn);
    }

    #[test]
    fn image_source_is_a_base64_data_uri() {
        let mut chart = chart();
        let uri = chart.image_source().unwrap();
        let encoded = uri.strip_prefix(IMAGE_SOURCE_PREFIX).unwrap();
        let decoded = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(decoded.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    }

    #[test]
    fn pointer_events_toggle_the_overlay() {
        let mut chart = chart();
        assert_eq!(chart.pointer_move(0.0), None);
        chart.draw().unwrap();
        let readout = chart.pointer_move(10.0).unwrap();
        assert_eq!(readout.rows.len(), 2);
        // Second entry has a single positive key.
        assert_eq!(chart.pointer_move(690.0), None);
        chart.pointer_out();
        let svg = chart.surface().map(Surface::to_svg_string).unwrap_or_default();
        assert!(svg.contains("class=\"focus\" style=\"display: none;\""));
    }

    #[test]
    fn far_pointer_positions_snap_to_the_edge_entries() {
        let mut chart = chart();
        chart.draw().unwrap();
        assert_eq!(chart.pointer_move(1e20), None);
        let readout = chart.pointer_move(-1e20).unwrap();
        assert_eq!(readout.x, 0.0);
        assert_eq!(readout.lines(), vec!["1 B", "1 A", "2018-09-01"]);
    }
}
