use crate::config::{DrawOption, Settings};
use crate::curve::area_path;
use crate::focus::FocusOverlay;
use crate::range::DateRange;
use crate::scale::{Scales, TimeScale};
use crate::stack::{Band, stack_bands};
use crate::surface::{ElementId, Surface, fmt_num};
use anyhow::Result;
use std::path::Path;
use tracing::debug;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;
const LEGEND_X: f64 = 10.0;
const LEGEND_Y: f64 = 2.5;
const TITLE_Y: f64 = -35.0;
const MARKER_LABEL_Y: f64 = -15.0;

/// What a draw leaves behind for pointer handling and inspection.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub scales: Scales,
    pub range: DateRange,
    pub bands: Vec<Band>,
    pub canvas: ElementId,
    pub focus: Option<FocusOverlay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// Draws the whole chart into an already cleared surface.
///
/// Order matters for z-stacking: layers, axis, markers, title and legend, focus overlay.
pub fn render_chart(surface: &mut Surface, settings: &Settings) -> RenderState {
    let scales = Scales::build(settings);
    let range = DateRange::from_settings(settings);
    let canvas = prepare_surface(surface, settings);

    let visible = range.filter(&settings.data.records);
    debug!(
        visible = visible.len(),
        total = settings.data.records.len(),
        from = %range.from,
        to = %range.to,
        "filtered entries"
    );
    let bands = stack_bands(&settings.data.keys, &visible);

    draw_layers(surface, canvas, settings, &scales, &bands);
    if settings.draws(DrawOption::Axis) {
        draw_time_axis(surface, canvas, settings, &scales);
        draw_value_axis(surface, canvas, settings, &scales);
    }
    if settings.draws(DrawOption::Markers) {
        draw_markers(surface, canvas, settings, &scales, &range);
    }
    draw_title(surface, canvas, settings);
    if settings.draws(DrawOption::Legend) {
        draw_legend(surface, canvas, settings);
    }
    let focus = settings
        .draws(DrawOption::Focus)
        .then(|| FocusOverlay::draw(surface, canvas, settings));

    RenderState {
        scales,
        range,
        bands,
        canvas,
        focus,
    }
}

fn prepare_surface(surface: &mut Surface, settings: &Settings) -> ElementId {
    let root = surface.root();
    surface
        .attr(root, "xmlns", SVG_NS)
        .attr_num(root, "width", settings.width)
        .attr_num(root, "height", settings.height);
    let canvas = surface.append(root, "g");
    let margin = settings.margin;
    if margin.left != 0.0 || margin.top != 0.0 {
        surface.attr(
            canvas,
            "transform",
            format!("translate({},{})", fmt_num(margin.left), fmt_num(margin.top)),
        );
    }
    canvas
}

fn draw_layers(
    surface: &mut Surface,
    canvas: ElementId,
    settings: &Settings,
    scales: &Scales,
    bands: &[Band],
) {
    let style = &settings.style;
    for band in bands {
        let (lower, upper) = band.edges(scales);
        let layer = surface.append(canvas, "g");
        surface.attr(layer, "class", "layer");
        let path = surface.append(layer, "path");
        surface
            .attr(path, "class", "area")
            .attr(path, "d", area_path(settings.curve, &lower, &upper))
            .style(path, "fill", style.fill_for(&band.key, &settings.data.reverse_keys))
            .style(path, "stroke", style.stroke_for(&band.key))
            .style(path, "stroke-width", ".5");
    }
}

fn tick_count(extent: f64, spacing: f64) -> usize {
    (extent / spacing).floor().max(0.0) as usize
}

fn axis_group(
    surface: &mut Surface,
    canvas: ElementId,
    class: &str,
    transform: String,
    anchor: TextAnchor,
    domain: String,
    settings: &Settings,
) -> ElementId {
    let group = surface.append(canvas, "g");
    surface
        .attr(group, "class", class)
        .attr(group, "transform", transform)
        .attr(group, "fill", "none")
        .attr(group, "font-size", "10")
        .attr(group, "font-family", "sans-serif")
        .attr(group, "text-anchor", anchor.as_str());
    let path = surface.append(group, "path");
    surface
        .attr(path, "class", "domain")
        .attr(path, "d", domain)
        .style(path, "stroke", settings.style.axis.color.clone());
    group
}

fn axis_tick(
    surface: &mut Surface,
    group: ElementId,
    transform: String,
    label: String,
    horizontal: bool,
    settings: &Settings,
) {
    let style = &settings.style;
    let tick = surface.append(group, "g");
    surface
        .attr(tick, "class", "tick")
        .attr(tick, "opacity", "1")
        .attr(tick, "transform", transform);
    let line = surface.append(tick, "line");
    let text = surface.append(tick, "text");
    if horizontal {
        surface.attr_num(line, "y2", TICK_SIZE);
        surface
            .attr_num(text, "y", TICK_SIZE + TICK_PADDING)
            .attr(text, "dy", "0.71em");
    } else {
        surface.attr_num(line, "x2", TICK_SIZE);
        surface
            .attr_num(text, "x", TICK_SIZE + TICK_PADDING)
            .attr(text, "dy", "0.32em");
    }
    surface.style(line, "stroke", style.axis.color.clone());
    surface
        .attr(text, "font-size", style.font_size_px())
        .attr(text, "font-family", style.font_family.clone())
        .style(text, "fill", style.axis.color.clone())
        .set_text(text, label);
}

fn draw_time_axis(surface: &mut Surface, canvas: ElementId, settings: &Settings, scales: &Scales) {
    let (r0, r1) = scales.x.range();
    let domain = format!(
        "M{},{}V0.5H{}V{}",
        fmt_num(r0 + 0.5),
        fmt_num(TICK_SIZE),
        fmt_num(r1 + 0.5),
        fmt_num(TICK_SIZE)
    );
    let group = axis_group(
        surface,
        canvas,
        "axis axis--x",
        format!("translate(0,{})", fmt_num(settings.inner_height)),
        TextAnchor::Middle,
        domain,
        settings,
    );
    for date in scales.x.ticks(tick_count(settings.inner_width, 100.0)) {
        let x = scales.x.map(date) + 0.5;
        axis_tick(
            surface,
            group,
            format!("translate({},0)", fmt_num(x)),
            TimeScale::tick_format(date),
            true,
            settings,
        );
    }
}

fn draw_value_axis(surface: &mut Surface, canvas: ElementId, settings: &Settings, scales: &Scales) {
    let (r0, r1) = scales.y.range();
    let domain = format!(
        "M{},{}H0.5V{}H{}",
        fmt_num(TICK_SIZE),
        fmt_num(r0 + 0.5),
        fmt_num(r1 + 0.5),
        fmt_num(TICK_SIZE)
    );
    let group = axis_group(
        surface,
        canvas,
        "axis axis--y",
        format!("translate({},0)", fmt_num(settings.inner_width)),
        TextAnchor::Start,
        domain,
        settings,
    );
    let count = tick_count(settings.inner_height, 50.0);
    for value in scales.y.ticks(count) {
        let y = scales.y.map(value) + 0.5;
        axis_tick(
            surface,
            group,
            format!("translate(0,{})", fmt_num(y)),
            scales.y.tick_format(count, value),
            false,
            settings,
        );
    }
}

fn guide_line(surface: &mut Surface, canvas: ElementId, x: f64, height: f64, width: &str, color: &str) {
    let line = surface.append(canvas, "line");
    surface
        .attr(line, "class", "marker")
        .attr_num(line, "x1", x)
        .attr_num(line, "y1", height)
        .attr_num(line, "x2", x)
        .attr_num(line, "y2", 0.0)
        .style(line, "stroke-width", width)
        .style(line, "stroke", color);
}

fn draw_markers(
    surface: &mut Surface,
    canvas: ElementId,
    settings: &Settings,
    scales: &Scales,
    range: &DateRange,
) {
    let style = &settings.style;
    let axis_end = scales.x.domain().1;
    for marker in &settings.markers {
        if !range.contains(marker.date) {
            debug!(date = %marker.date, "marker outside visible range, skipped");
            continue;
        }
        // Left-edge markers sit on the half pixel so the 1px line stays crisp.
        let x = scales.x.map(marker.date).max(0.5);
        let on_axis = settings.draws(DrawOption::Axis) && marker.date == axis_end;
        if x > 0.5 && !on_axis {
            guide_line(
                surface,
                canvas,
                x,
                settings.inner_height,
                "3",
                &style.markers.background_color,
            );
        }
        guide_line(surface, canvas, x, settings.inner_height, "1", &style.markers.color);
        draw_text_with_background(
            surface,
            canvas,
            settings,
            &marker.label_text(),
            (x, MARKER_LABEL_Y),
            &style.markers.color,
            TextAnchor::Middle,
        );
    }
}

fn text(
    surface: &mut Surface,
    parent: ElementId,
    settings: &Settings,
    content: &str,
    (x, y): (f64, f64),
    fill: &str,
    anchor: TextAnchor,
) -> ElementId {
    let style = &settings.style;
    let node = surface.append(parent, "text");
    surface
        .attr_num(node, "x", x)
        .attr_num(node, "y", y)
        .attr(node, "dy", style.dy())
        .attr(node, "font-size", style.font_size_px())
        .attr(node, "font-family", style.font_family.clone())
        .style(node, "fill", fill)
        .style(node, "text-anchor", anchor.as_str())
        .set_text(node, content);
    node
}

/// Label over an opaque rectangle one font size tall. The rectangle keeps no geometry when
/// the surface cannot measure text.
pub fn draw_text_with_background(
    surface: &mut Surface,
    parent: ElementId,
    settings: &Settings,
    content: &str,
    (x, y): (f64, f64),
    fill: &str,
    anchor: TextAnchor,
) -> ElementId {
    let style = &settings.style;
    let background = surface.append(parent, "rect");
    surface.style(background, "fill", style.background_color.clone());
    let label = text(surface, parent, settings, content, (x, y), fill, anchor);
    match surface.bbox(label) {
        Some(bbox) => {
            let left = match anchor {
                TextAnchor::Start => x,
                TextAnchor::Middle => x - bbox.width / 2.0,
                TextAnchor::End => x - bbox.width,
            };
            surface
                .attr_num(background, "x", left)
                .attr_num(background, "y", y - style.font_size / 2.0)
                .attr_num(background, "width", bbox.width)
                .attr_num(background, "height", style.font_size);
        }
        None => debug!(text = content, "text measurement unavailable, label background left unsized"),
    }
    label
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|text| !text.is_empty())
}

fn draw_title(surface: &mut Surface, canvas: ElementId, settings: &Settings) {
    if !settings.draws(DrawOption::Title) {
        return;
    }
    if let Some(title) = non_empty(&settings.title) {
        let node = text(
            surface,
            canvas,
            settings,
            title,
            (LEGEND_X - 3.0, TITLE_Y),
            &settings.style.color,
            TextAnchor::Start,
        );
        surface.attr(node, "class", "title");
    }
}

fn rect(
    surface: &mut Surface,
    parent: ElementId,
    class: &str,
    (x, y): (f64, f64),
    (width, height): (f64, f64),
    fill: &str,
    stroke: &str,
) -> ElementId {
    let node = surface.append(parent, "rect");
    surface
        .attr(node, "class", class)
        .attr_num(node, "x", x)
        .attr_num(node, "y", y)
        .attr_num(node, "width", width)
        .attr_num(node, "height", height)
        .style(node, "fill", fill)
        .style(node, "stroke", stroke);
    node
}

/// Legend box listing keys top of the stack first, sized to the widest measured label.
fn draw_legend(surface: &mut Surface, canvas: ElementId, settings: &Settings) {
    let style = &settings.style;
    let line_height = style.font_size;
    let legend_title = non_empty(&settings.legend_title);
    let (row_offset, text_offset) = match legend_title {
        Some(_) => (2.0, 2.5),
        None => (0.5, 1.0),
    };
    let keys = &settings.data.reverse_keys;

    let background = rect(
        surface,
        canvas,
        "legend",
        (LEGEND_X - 3.0, LEGEND_Y + line_height / 2.0 - 3.0),
        (
            style.font_size * 6.0,
            (row_offset + keys.len() as f64) * line_height,
        ),
        &style.background_color,
        &style.color,
    );

    if let Some(title) = legend_title {
        let node = text(
            surface,
            canvas,
            settings,
            title,
            (LEGEND_X, LEGEND_Y + line_height),
            &style.color,
            TextAnchor::Start,
        );
        surface.attr(node, "class", "legend-title");
    }

    let mut widest: Option<f64> = None;
    for (idx, key) in keys.iter().enumerate() {
        let row = idx as f64;
        rect(
            surface,
            canvas,
            "legend-swatch",
            (LEGEND_X, LEGEND_Y + (row_offset + row) * line_height),
            (line_height, line_height),
            &style.fill_for(key, keys),
            &style.background_color,
        );
        let label = text(
            surface,
            canvas,
            settings,
            key,
            (
                LEGEND_X + line_height * 1.62,
                LEGEND_Y + (text_offset + row) * line_height,
            ),
            &style.color,
            TextAnchor::Start,
        );
        surface.attr(label, "class", "legend-label");
        if let Some(bbox) = surface.bbox(label) {
            widest = Some(widest.map_or(bbox.width, |w| w.max(bbox.width)));
        }
    }
    if let Some(width) = widest {
        surface.attr_num(background, "width", width + 2.2 * line_height);
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, width: f64, height: f64) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = crate::style::DEFAULT_FONT_FAMILY.to_string();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(width as f32, height as f32)
        .or_else(|| usvg::Size::from_wh(800.0, 400.0))
        .ok_or_else(|| anyhow::anyhow!("invalid output size {width}x{height}"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawData, RawMarker, RawSettings, normalize};
    use crate::surface::TextMeasure;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FixedWidth;

    impl TextMeasure for FixedWidth {
        fn text_width(&self, text: &str, font_size: f64, _font_family: &str) -> Option<f64> {
            Some(text.chars().count() as f64 * font_size / 2.0)
        }
    }

    fn raw() -> RawSettings {
        RawSettings {
            data: Some(RawData {
                keys: Some(vec!["Low".into(), "High".into()]),
                entries: Some(json!([
                    {"date": "2018-09-01", "Low": 1, "High": 2},
                    {"date": "2018-09-02", "Low": 0, "High": 3},
                ])),
            }),
            ..RawSettings::default()
        }
    }

    fn render(raw: RawSettings, mut surface: Surface) -> (Surface, RenderState) {
        let raw = raw.with_svg(surface.clone());
        let settings = normalize(Some(&raw)).unwrap();
        let state = render_chart(&mut surface, &settings);
        (surface, state)
    }

    #[test]
    fn root_and_canvas_are_prepared() {
        let (surface, state) = render(raw(), Surface::svg());
        let root = surface.root();
        assert_eq!(surface.attr_value(root, "xmlns"), Some(SVG_NS));
        assert_eq!(surface.attr_value(root, "width"), Some("800"));
        assert_eq!(surface.attr_value(state.canvas, "transform"), Some("translate(50,50)"));
    }

    #[test]
    fn zero_margin_skips_the_transform() {
        let mut raw = raw();
        raw.margin = Some(crate::config::RawMargin {
            top: Some(0.0),
            left: Some(0.0),
            ..Default::default()
        });
        let (surface, state) = render(raw, Surface::svg());
        assert_eq!(surface.attr_value(state.canvas, "transform"), None);
    }

    #[test]
    fn layers_stack_in_key_order() {
        let (surface, state) = render(raw(), Surface::svg());
        let areas = surface.find_by_class("area");
        assert_eq!(areas.len(), 2);
        assert_eq!(state.bands[0].key, "Low");
        // Low: baseline at y=300, top at 1/3 and 0 of the way up.
        assert_eq!(surface.attr_value(areas[0], "d"), Some("M0,300L700,300L700,300L0,200Z"));
        assert_eq!(surface.style_value(areas[0], "fill"), Some("#555"));
        assert_eq!(surface.style_value(areas[1], "fill"), Some("#222"));
        assert_eq!(surface.style_value(areas[0], "stroke-width"), Some(".5"));
    }

    #[test]
    fn axis_ticks_follow_the_plot_size() {
        let (surface, _) = render(raw(), Surface::svg());
        let axes = surface.find_by_class("axis");
        assert_eq!(axes.len(), 2);
        let value_ticks = surface
            .children(axes[1])
            .iter()
            .filter(|id| surface.tag(**id) == "g")
            .count();
        assert_eq!(value_ticks, 7);
        assert_eq!(
            surface.attr_value(axes[1], "transform"),
            Some("translate(700,0)")
        );
    }

    #[test]
    fn marker_on_the_axis_has_no_background_line() {
        let mut raw = raw();
        raw.markers = Some(vec![
            RawMarker {
                date: "2018-09-02".into(),
                label: Some("end".into()),
            },
            RawMarker {
                date: "2018-09-01".into(),
                label: None,
            },
            RawMarker {
                date: "2018-10-01".into(),
                label: None,
            },
        ]);
        let (surface, _) = render(raw, Surface::svg());
        let lines = surface.find_by_class("marker");
        // One foreground line each for the two visible markers, no backgrounds.
        assert_eq!(lines.len(), 2);
        assert_eq!(surface.attr_value(lines[0], "x1"), Some("700"));
        assert_eq!(surface.attr_value(lines[1], "x1"), Some("0.5"));
        let labels: Vec<_> = surface
            .find_by_tag("text")
            .into_iter()
            .filter_map(|id| surface.text(id))
            .collect();
        assert!(labels.contains(&"end"));
        assert!(labels.contains(&"2018-09-01"));
    }

    fn background_before(surface: &Surface, parent: ElementId, label: ElementId) -> ElementId {
        let children = surface.children(parent);
        let idx = children.iter().position(|id| *id == label).unwrap();
        children[idx - 1]
    }

    #[test]
    fn measured_marker_label_gets_a_sized_background() {
        let mut raw = raw();
        raw.data = Some(RawData {
            keys: Some(vec!["Low".into(), "High".into()]),
            entries: Some(json!([
                {"date": "2018-09-01", "Low": 1, "High": 2},
                {"date": "2018-09-02", "Low": 0, "High": 3},
                {"date": "2018-09-03", "Low": 1, "High": 1},
            ])),
        });
        raw.markers = Some(vec![RawMarker {
            date: "2018-09-02".into(),
            label: Some("abcd".into()),
        }]);
        let (surface, state) = render(raw, Surface::svg_with_measure(Arc::new(FixedWidth)));
        let label = surface
            .find_by_tag("text")
            .into_iter()
            .find(|id| surface.text(*id) == Some("abcd"))
            .unwrap();
        assert_eq!(surface.attr_value(label, "x"), Some("350"));
        let background = background_before(&surface, state.canvas, label);
        assert_eq!(surface.tag(background), "rect");
        // 4 chars at 6px, centered on x=350, one font size tall around y=-15.
        assert_eq!(surface.attr_value(background, "x"), Some("338"));
        assert_eq!(surface.attr_value(background, "y"), Some("-21"));
        assert_eq!(surface.attr_value(background, "width"), Some("24"));
        assert_eq!(surface.attr_value(background, "height"), Some("12"));
        assert_eq!(surface.style_value(background, "fill"), Some("#fff"));
    }

    #[test]
    fn text_background_follows_the_anchor() {
        let raw = raw().with_svg(Surface::svg());
        let settings = normalize(Some(&raw)).unwrap();
        let mut surface = Surface::svg_with_measure(Arc::new(FixedWidth));
        let root = surface.root();
        for (anchor, left) in [
            (TextAnchor::Start, "100"),
            (TextAnchor::Middle, "88"),
            (TextAnchor::End, "76"),
        ] {
            let label = draw_text_with_background(
                &mut surface,
                root,
                &settings,
                "wxyz",
                (100.0, 40.0),
                "#222",
                anchor,
            );
            let background = background_before(&surface, root, label);
            assert_eq!(surface.style_value(label, "text-anchor"), Some(anchor.as_str()));
            assert_eq!(surface.attr_value(background, "x"), Some(left));
            assert_eq!(surface.attr_value(background, "y"), Some("34"));
            assert_eq!(surface.attr_value(background, "width"), Some("24"));
        }

        let mut unmeasured = Surface::svg();
        let root = unmeasured.root();
        let label = draw_text_with_background(
            &mut unmeasured,
            root,
            &settings,
            "wxyz",
            (100.0, 40.0),
            "#222",
            TextAnchor::End,
        );
        let background = background_before(&unmeasured, root, label);
        assert_eq!(unmeasured.attr_value(background, "width"), None);
    }

    #[test]
    fn legend_lists_reverse_keys_and_sizes_to_measured_text() {
        let mut raw = raw();
        raw.legend_title = Some("Work".into());
        let (surface, _) = render(raw, Surface::svg_with_measure(Arc::new(FixedWidth)));
        let labels: Vec<_> = surface
            .find_by_class("legend-label")
            .into_iter()
            .filter_map(|id| surface.text(id))
            .collect();
        assert_eq!(labels, vec!["High", "Low"]);
        let background = surface.find_by_class("legend")[0];
        // "High" is 4 * 6px wide.
        assert_eq!(surface.attr_value(background, "width"), Some("50.4"));
        assert_eq!(surface.attr_value(background, "height"), Some("48"));
    }

    #[test]
    fn unmeasured_legend_keeps_the_fallback_width() {
        let (surface, _) = render(raw(), Surface::svg());
        let background = surface.find_by_class("legend")[0];
        assert_eq!(surface.attr_value(background, "width"), Some("72"));
        assert_eq!(surface.attr_value(background, "height"), Some("30"));
    }

    #[test]
    fn draw_options_gate_decorations() {
        let mut raw = raw();
        raw.title = Some("Flow".into());
        raw.draw_options = Some(vec![]);
        let (surface, state) = render(raw, Surface::svg());
        assert!(surface.find_by_class("axis").is_empty());
        assert!(surface.find_by_class("legend").is_empty());
        assert!(surface.find_by_class("title").is_empty());
        assert!(state.focus.is_none());
        assert_eq!(surface.find_by_class("area").len(), 2);
    }
}
