use crate::config::Settings;
use crate::render::RenderState;
use crate::scale::TimeScale;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Computed chart geometry, for debugging layouts outside a browser.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryDump {
    pub width: f64,
    pub height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
    pub curve: String,
    pub x_domain: [NaiveDate; 2],
    pub y_domain: [f64; 2],
    pub visible_range: [NaiveDate; 2],
    pub x_ticks: Vec<TickDump>,
    pub y_ticks: Vec<TickDump>,
    pub bands: Vec<BandDump>,
}

#[derive(Debug, Serialize)]
pub struct TickDump {
    pub label: String,
    pub position: f64,
}

#[derive(Debug, Serialize)]
pub struct BandDump {
    pub key: String,
    pub fill: String,
    /// `[x, y_low, y_high]` in plot pixels, one per visible entry.
    pub points: Vec<[f64; 3]>,
}

impl GeometryDump {
    pub fn from_state(settings: &Settings, state: &RenderState) -> Self {
        let scales = &state.scales;
        let x_count = (settings.inner_width / 100.0).floor().max(0.0) as usize;
        let y_count = (settings.inner_height / 50.0).floor().max(0.0) as usize;
        let (x0, x1) = scales.x.domain();
        let (y0, y1) = scales.y.domain();

        let bands = state
            .bands
            .iter()
            .map(|band| BandDump {
                key: band.key.clone(),
                fill: settings
                    .style
                    .fill_for(&band.key, &settings.data.reverse_keys),
                points: band
                    .points
                    .iter()
                    .map(|point| {
                        [
                            scales.x.map(point.date),
                            scales.y.map(point.low),
                            scales.y.map(point.high),
                        ]
                    })
                    .collect(),
            })
            .collect();

        Self {
            width: settings.width,
            height: settings.height,
            inner_width: settings.inner_width,
            inner_height: settings.inner_height,
            curve: settings.curve.to_string(),
            x_domain: [x0, x1],
            y_domain: [y0, y1],
            visible_range: [state.range.from, state.range.to],
            x_ticks: scales
                .x
                .ticks(x_count)
                .into_iter()
                .map(|date| TickDump {
                    label: TimeScale::tick_format(date),
                    position: scales.x.map(date),
                })
                .collect(),
            y_ticks: scales
                .y
                .ticks(y_count)
                .into_iter()
                .map(|value| TickDump {
                    label: scales.y.tick_format(y_count, value),
                    position: scales.y.map(value),
                })
                .collect(),
            bands,
        }
    }
}

pub fn write_geometry_dump(path: &Path, settings: &Settings, state: &RenderState) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = GeometryDump::from_state(settings, state);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
