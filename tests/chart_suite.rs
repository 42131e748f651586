use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use stacked_area_renderer::config::load_settings;
use stacked_area_renderer::dump::write_geometry_dump;
use stacked_area_renderer::{
    ConfigError, RawSettings, StackedArea, Surface, normalize, parse_settings,
    render_settings_svg,
};

static AREA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<path class="area" d="([^"]*)""#).unwrap());
static LEGEND_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<text [^>]*class="legend-label"[^>]*>([^<]*)</text>"#).unwrap());
static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<line class="marker""#).unwrap());
static X_TICK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<g class="tick" opacity="1" transform="translate\([^,]*,0\)"><line [^>]*/><text [^>]*>([^<]*)</text>"#)
        .unwrap()
});

fn fixture_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel)
}

fn fixture(rel: &str) -> RawSettings {
    load_settings(&fixture_path(rel))
        .expect("fixture should parse")
        .with_svg(Surface::svg())
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn legend_labels(svg: &str) -> Vec<String> {
    LEGEND_LABEL_RE
        .captures_iter(svg)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new fixtures are added intentionally.
    let candidates = [
        ("low_high.json5", 2),
        ("cfd.json5", 3),
        ("positional.json5", 2),
        ("step.json5", 5),
    ];
    for (rel, keys) in candidates {
        let mut chart = StackedArea::new(Some(fixture(rel)));
        let svg = chart.svg_source().unwrap_or_else(|err| panic!("{rel}: {err}"));
        assert!(svg.starts_with("<svg"), "{rel}: missing <svg tag");
        assert!(svg.ends_with("</svg>"), "{rel}: missing </svg tag");
        assert_eq!(AREA_RE.captures_iter(&svg).count(), keys, "{rel}: one area per key");
    }
}

#[test]
fn invalid_fixtures_report_their_problem() {
    let cases = [
        ("invalid/no_keys.json5", "No keys defined"),
        ("invalid/entries_object.json5", "Data entries not an array"),
        ("invalid/empty_entries.json5", "Empty data entries"),
        ("invalid/unknown_curve.json5", "unknown curve type: bumpX"),
    ];
    for (rel, message) in cases {
        let raw = fixture(rel);
        let err = normalize(Some(&raw)).unwrap_err();
        assert_eq!(err.to_string(), message, "{rel}");
    }
    let raw = fixture("invalid/bad_value.json5");
    assert!(matches!(
        normalize(Some(&raw)),
        Err(ConfigError::InvalidValue { ref key, entry: 0, .. }) if key == "A"
    ));
}

#[test]
fn validation_happens_before_the_target_is_touched() {
    let mut chart = StackedArea::new(Some(fixture("invalid/no_keys.json5")));
    assert_eq!(chart.draw(), Err(ConfigError::MissingKeys));
    assert_eq!(chart.surface().map(Surface::to_svg_string).as_deref(), Some("<svg/>"));

    let mut detached = StackedArea::new(Some(RawSettings::default()));
    assert_eq!(detached.draw(), Err(ConfigError::InvalidTarget));
    assert_eq!(StackedArea::new(None).draw(), Err(ConfigError::MissingConfig));
}

#[test]
fn low_high_scenario() {
    let mut chart = StackedArea::new(Some(fixture("low_high.json5")));
    let svg = chart.svg_source().unwrap();
    let state = chart.render_state().unwrap();
    assert_eq!(state.scales.x.domain(), (day(2018, 9, 1), day(2018, 9, 2)));
    assert_eq!(state.scales.y.domain(), (0.0, 3.0));

    let paths: Vec<String> = AREA_RE
        .captures_iter(&svg)
        .map(|caps| caps[1].to_string())
        .collect();
    assert_eq!(paths.len(), 2);
    // Low is drawn first and sits on the baseline.
    assert_eq!(paths[0], "M0,300L700,300L700,300L0,200Z");
    assert_eq!(paths[1], "M0,200L700,300L700,0L0,0Z");
    assert_eq!(legend_labels(&svg), vec!["High", "Low"]);
}

#[test]
fn defaults_apply_with_only_data_and_target() {
    let mut chart = StackedArea::new(Some(fixture("low_high.json5")));
    chart.draw().unwrap();
    let settings = chart.settings().unwrap();
    assert_eq!((settings.width, settings.height), (800.0, 400.0));
    assert_eq!((settings.inner_width, settings.inner_height), (700.0, 300.0));
    assert_eq!(settings.style.font_size, 12.0);
    assert_eq!(settings.style.color, "#222");
    assert_eq!(settings.curve.name(), "linear");
    assert_eq!(settings.draw_options.len(), 5);
}

#[test]
fn partial_margin_keeps_default_sides() {
    let raw = parse_settings(
        r#"{"margin": {"top": 10}, "data": {"keys": ["A"], "entries": [["2018-09-01", 1]]}}"#,
    )
    .unwrap()
    .with_svg(Surface::svg());
    let settings = normalize(Some(&raw)).unwrap();
    assert_eq!(settings.margin.top, 10.0);
    assert_eq!(
        (settings.margin.right, settings.margin.bottom, settings.margin.left),
        (50.0, 50.0, 50.0)
    );
    assert_eq!(settings.inner_height, 340.0);
}

#[test]
fn date_window_filters_entries_and_markers() {
    let mut chart = StackedArea::new(Some(fixture("cfd.json5")));
    let svg = chart.svg_source().unwrap();
    let state = chart.render_state().unwrap();
    assert_eq!(state.range.from, day(2018, 9, 3));
    assert_eq!(state.range.to, day(2018, 9, 12));
    assert!(state.bands.iter().all(|band| band.points.len() == 10));
    assert_eq!(state.bands[0].points[0].date, day(2018, 9, 3));

    // Two visible markers, each with a background and a foreground line.
    assert_eq!(MARKER_RE.find_iter(&svg).count(), 4);
    assert!(svg.contains(">Release</text>"));
    assert!(svg.contains(">2018-09-10</text>"));
    assert!(!svg.contains("Kickoff"));

    assert!(svg.contains("transform=\"translate(50,60)\""));
    assert!(svg.contains(">Sprint 42</text>"));
    assert_eq!(legend_labels(&svg), vec!["Todo", "Doing", "Done"]);
    assert!(svg.contains("fill: #2e7d32; stroke: #1b5e20;"));
}

#[test]
fn y_domain_ignores_the_date_window() {
    let mut chart = StackedArea::new(Some(fixture("cfd.json5")));
    chart.draw().unwrap();
    let state = chart.render_state().unwrap();
    assert_eq!(state.scales.y.domain(), (0.0, 11.0));
}

#[test]
fn positional_entries_and_mixed_dates() {
    let mut chart = StackedArea::new(Some(fixture("positional.json5")));
    let svg = chart.svg_source().unwrap();
    let settings = chart.settings().unwrap();
    let dates: Vec<NaiveDate> = settings.data.records.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![day(2018, 9, 1), day(2018, 9, 2), day(2018, 9, 3), day(2018, 9, 4)]
    );
    assert_eq!(settings.data.records[3].values, vec![4.0, 0.0]);
    assert_eq!(settings.data.max_total(), 5.0);
    // No title, markers or focus when not requested.
    assert!(!svg.contains("class=\"focus"));
    assert_eq!(chart.pointer_move(100.0), None);
}

#[test]
fn calendar_ticks_switch_format_at_year_start() {
    let mut chart = StackedArea::new(Some(fixture("step.json5")));
    let svg = chart.svg_source().unwrap();
    assert!(!svg.contains("<g transform="));
    let labels: Vec<String> = X_TICK_RE
        .captures_iter(&svg)
        .map(|caps| caps[1].to_string())
        .collect();
    assert_eq!(labels, vec!["Tue 31", "2020", "Fri 03", "Jan 05"]);
}

#[test]
fn focus_requires_two_positive_keys() {
    let mut chart = StackedArea::new(Some(fixture("low_high.json5")));
    chart.draw().unwrap();
    let readout = chart.pointer_move(0.0).unwrap();
    assert_eq!(readout.lines(), vec!["2 High", "1 Low", "2018-09-01"]);
    assert_eq!(chart.pointer_move(700.0), None);

    let svg = chart.surface().map(Surface::to_svg_string).unwrap_or_default();
    assert!(svg.contains("<g class=\"focus\" style=\"display: none;\">"));
}

#[test]
fn focus_clamps_pointer_to_the_entry_range() {
    let mut chart = StackedArea::new(Some(fixture("cfd.json5")));
    chart.draw().unwrap();
    let readout = chart.pointer_move(-500.0).unwrap();
    assert_eq!(readout.date, day(2018, 9, 1));
    assert_eq!(readout.lines(), vec!["9 Todo", "1 Doing", "2018-09-01"]);
    chart.pointer_out();
    let svg = chart.surface().map(Surface::to_svg_string).unwrap_or_default();
    assert!(svg.contains("<g class=\"focus\" style=\"display: none;\">"));
}

#[test]
fn svg_source_is_stable_across_draws() {
    let mut chart = StackedArea::new(Some(fixture("cfd.json5")));
    let first = chart.svg_source().unwrap();
    chart.pointer_move(300.0);
    let second = chart.svg_source().unwrap();
    assert_eq!(first, second);
    assert!(chart.image_source().unwrap().starts_with("data:image/svg+xml;base64,"));
}

#[test]
fn settings_text_renders_headless() {
    let text = std::fs::read_to_string(fixture_path("low_high.json5")).unwrap();
    let svg = render_settings_svg(&text).unwrap();
    assert_eq!(AREA_RE.captures_iter(&svg).count(), 2);
    let err = render_settings_svg("{ data: { keys: ['A'] } }").unwrap_err();
    assert_eq!(err.to_string(), "No data entries");
}

#[test]
fn geometry_dump_is_written() {
    let mut chart = StackedArea::new(Some(fixture("cfd.json5")));
    chart.draw().unwrap();
    let path = std::env::temp_dir().join(format!("sarea-dump-{}.json", std::process::id()));
    write_geometry_dump(&path, chart.settings().unwrap(), chart.render_state().unwrap()).unwrap();
    let dump: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(dump["visibleRange"], serde_json::json!(["2018-09-03", "2018-09-12"]));
    assert_eq!(dump["curve"], serde_json::json!("monotone-x"));
    assert_eq!(dump["bands"].as_array().map(Vec::len), Some(3));
}
