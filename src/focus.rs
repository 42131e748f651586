//! Hover readout: pointer x to the closest entry, and the overlay that shows it.

use crate::config::Settings;
use crate::data::{Record, format_date};
use crate::scale::Scales;
use crate::surface::{ElementId, Surface, fmt_num};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::trace;

/// Horizontal gap between the focus line and its box.
const BOX_OFFSET: f64 = 10.0;
/// Advance estimate per character when the surface cannot measure text.
const CHAR_WIDTH_RATIO: f64 = 0.56;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusRow {
    pub key: String,
    pub value: f64,
}

impl FocusRow {
    pub fn label(&self) -> String {
        format!("{} {}", fmt_num(self.value), self.key)
    }
}

/// Everything the overlay shows for one pointer position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusReadout {
    pub date: NaiveDate,
    /// Plot x of the focused entry.
    pub x: f64,
    /// Positive keys, top of the stack first.
    pub rows: Vec<FocusRow>,
    pub frame: FocusFrame,
}

impl FocusReadout {
    /// Text lines in display order: one per row, then the date.
    pub fn lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(FocusRow::label)
            .chain(std::iter::once(format_date(self.date)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Box was placed left of the line because it would overflow the plot.
    pub flipped: bool,
}

/// Resolves pointer `px` (plot coordinates) to a readout.
///
/// The pointer date is clamped to the entry date range and snapped to the closest entry.
/// Returns `None` unless at least two keys are positive there.
pub fn resolve_focus(
    px: f64,
    settings: &Settings,
    scales: &Scales,
    surface: &Surface,
) -> Option<FocusReadout> {
    let data = &settings.data;
    let (min, max) = data.extent()?;
    let date = scales.x.invert(px).clamp(min, max);
    let record = closest_record(&data.records, date)?;

    let rows: Vec<FocusRow> = data
        .reverse_keys
        .iter()
        .filter_map(|key| {
            let value = record.value(data.key_index(key)?);
            (value > 0.0).then(|| FocusRow {
                key: key.clone(),
                value,
            })
        })
        .collect();
    if rows.len() < 2 {
        trace!(date = %record.date, positive = rows.len(), "focus suppressed");
        return None;
    }

    let x = scales.x.map(record.date);
    let mut readout = FocusReadout {
        date: record.date,
        x,
        rows,
        frame: FocusFrame {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            flipped: false,
        },
    };
    readout.frame = place_frame(&readout.lines(), x, settings, surface);
    trace!(date = %readout.date, rows = readout.rows.len(), flipped = readout.frame.flipped, "focus resolved");
    Some(readout)
}

fn closest_record(records: &[Record], date: NaiveDate) -> Option<&Record> {
    records
        .iter()
        .min_by_key(|record| ((record.date - date).num_days().abs(), record.date))
}

fn place_frame(lines: &[String], x: f64, settings: &Settings, surface: &Surface) -> FocusFrame {
    let style = &settings.style;
    let line_height = style.font_size;
    let text_width = lines
        .iter()
        .map(|line| {
            surface
                .measure_text(line, style.font_size, &style.font_family)
                .unwrap_or_else(|| line.chars().count() as f64 * style.font_size * CHAR_WIDTH_RATIO)
        })
        .fold(0.0_f64, f64::max);
    let width = text_width + line_height;
    let height = (lines.len() as f64 + 0.5) * line_height;
    let right = x + BOX_OFFSET;
    let flipped = right + width > settings.inner_width;
    FocusFrame {
        x: if flipped { x - BOX_OFFSET - width } else { right },
        y: line_height,
        width,
        height,
        flipped,
    }
}

/// Element handles of the hover overlay, built hidden once per draw.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusOverlay {
    pub group: ElementId,
    pub line: ElementId,
    pub frame: ElementId,
    pub labels: Vec<ElementId>,
    pub hit_region: ElementId,
}

impl FocusOverlay {
    pub fn draw(surface: &mut Surface, canvas: ElementId, settings: &Settings) -> Self {
        let style = &settings.style;
        let group = surface.append(canvas, "g");
        surface.attr(group, "class", "focus").style(group, "display", "none");

        let line = surface.append(group, "line");
        surface
            .attr(line, "class", "focus-line")
            .attr_num(line, "y1", settings.inner_height)
            .attr_num(line, "y2", 0.0)
            .style(line, "stroke-width", "1")
            .style(line, "stroke", style.markers.color.clone());

        let frame = surface.append(group, "rect");
        surface
            .attr(frame, "class", "focus-box")
            .style(frame, "fill", style.background_color.clone())
            .style(frame, "stroke", style.color.clone());

        // One slot per key plus the date line.
        let labels = (0..=settings.data.keys.len())
            .map(|_| {
                let text = surface.append(group, "text");
                surface
                    .attr(text, "dy", style.dy())
                    .attr(text, "font-size", style.font_size_px())
                    .attr(text, "font-family", style.font_family.clone())
                    .style(text, "fill", style.color.clone())
                    .style(text, "text-anchor", "start");
                text
            })
            .collect();

        let hit_region = surface.append(canvas, "rect");
        surface
            .attr(hit_region, "class", "focus-hit")
            .attr_num(hit_region, "width", settings.inner_width)
            .attr_num(hit_region, "height", settings.inner_height)
            .style(hit_region, "fill", "none")
            .style(hit_region, "pointer-events", "all");
        surface.listen(hit_region);

        Self {
            group,
            line,
            frame,
            labels,
            hit_region,
        }
    }

    /// Overwrites the overlay primitives with `readout`.
    pub fn show(&self, surface: &mut Surface, readout: &FocusReadout, settings: &Settings) {
        let line_height = settings.style.font_size;
        let frame = readout.frame;
        surface.style(self.group, "display", "inline");
        surface
            .attr_num(self.line, "x1", readout.x)
            .attr_num(self.line, "x2", readout.x);
        surface
            .attr_num(self.frame, "x", frame.x)
            .attr_num(self.frame, "y", frame.y)
            .attr_num(self.frame, "width", frame.width)
            .attr_num(self.frame, "height", frame.height);

        let lines = readout.lines();
        for (idx, label) in self.labels.iter().enumerate() {
            match lines.get(idx) {
                Some(text) => {
                    surface
                        .attr_num(*label, "x", frame.x + line_height / 2.0)
                        .attr_num(*label, "y", frame.y + (idx as f64 + 0.75) * line_height)
                        .style(*label, "display", "inline")
                        .set_text(*label, text.clone());
                }
                None => {
                    surface.style(*label, "display", "none").set_text(*label, "");
                }
            }
        }
    }

    pub fn hide(&self, surface: &mut Surface) {
        surface.style(self.group, "display", "none");
    }
}
