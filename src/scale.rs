//! Time and linear scales for the plot area.

use crate::config::Settings;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Maps calendar days onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain: (NaiveDate, NaiveDate),
    range: (f64, f64),
}

impl TimeScale {
    pub fn new(start: NaiveDate, end: NaiveDate, range: (f64, f64)) -> Self {
        Self {
            domain: (start, end),
            range,
        }
    }

    pub fn domain(&self) -> (NaiveDate, NaiveDate) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    fn span_days(&self) -> f64 {
        (self.domain.1 - self.domain.0).num_days() as f64
    }

    pub fn map(&self, date: NaiveDate) -> f64 {
        let (r0, r1) = self.range;
        let span = self.span_days();
        if span == 0.0 {
            return (r0 + r1) / 2.0;
        }
        let offset = (date - self.domain.0).num_days() as f64;
        r0 + offset / span * (r1 - r0)
    }

    /// Nearest calendar day for a pixel position, clamped to the domain.
    pub fn invert(&self, px: f64) -> NaiveDate {
        let (r0, r1) = self.range;
        if r1 == r0 || !px.is_finite() {
            return self.domain.0;
        }
        let px = px.clamp(r0.min(r1), r0.max(r1));
        let days = ((px - r0) / (r1 - r0) * self.span_days()).round() as i64;
        Duration::try_days(days)
            .and_then(|delta| self.domain.0.checked_add_signed(delta))
            .unwrap_or(self.domain.0)
    }

    /// Calendar-aligned ticks, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<NaiveDate> {
        if count == 0 {
            return Vec::new();
        }
        let (start, end) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };
        let span = (end - start).num_days() as f64;
        let interval = TickInterval::select(span / count as f64, start, end, count);
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| interval.contains(*day))
            .collect()
    }

    /// Multi-scale label: year at year start, month name at month start, `Mon 03` style
    /// on Sundays and `Tue 04` style otherwise.
    pub fn tick_format(date: NaiveDate) -> String {
        if date.day() == 1 {
            if date.month() == 1 {
                date.format("%Y").to_string()
            } else {
                date.format("%B").to_string()
            }
        } else if date.weekday() == Weekday::Sun {
            date.format("%b %d").to_string()
        } else {
            date.format("%a %d").to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TickInterval {
    Days(u32),
    Week,
    Months(u32),
    Years(i32),
}

impl TickInterval {
    fn select(target_days: f64, start: NaiveDate, end: NaiveDate, count: usize) -> Self {
        const CANDIDATES: [(TickInterval, f64); 6] = [
            (TickInterval::Days(1), 1.0),
            (TickInterval::Days(2), 2.0),
            (TickInterval::Week, 7.0),
            (TickInterval::Months(1), 30.0),
            (TickInterval::Months(3), 90.0),
            (TickInterval::Years(1), 365.0),
        ];
        match CANDIDATES.iter().position(|(_, days)| *days > target_days) {
            None => {
                let step = tick_increment(start.year() as f64, end.year() as f64, count);
                TickInterval::Years((step.round() as i32).max(1))
            }
            Some(0) => TickInterval::Days(1),
            Some(i) => {
                let (lower, lower_days) = CANDIDATES[i - 1];
                let (upper, upper_days) = CANDIDATES[i];
                if target_days / lower_days < upper_days / target_days {
                    lower
                } else {
                    upper
                }
            }
        }
    }

    fn contains(&self, day: NaiveDate) -> bool {
        match *self {
            TickInterval::Days(step) => (day.day() - 1) % step == 0,
            TickInterval::Week => day.weekday() == Weekday::Sun,
            TickInterval::Months(step) => day.day() == 1 && day.month0() % step == 0,
            TickInterval::Years(step) => day.ordinal() == 1 && day.year().rem_euclid(step) == 0,
        }
    }
}

/// Maps values onto a pixel range; the chart uses an inverted range so larger sums draw higher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    /// "Nice" ticks on 1, 2 or 5 times a power of ten.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (d0, d1) = self.domain;
        if count == 0 || !d0.is_finite() || !d1.is_finite() {
            return Vec::new();
        }
        if d0 == d1 {
            return vec![d0];
        }
        let (start, stop) = if d0 < d1 { (d0, d1) } else { (d1, d0) };
        let Some((i1, i2, inc)) = tick_spec(start, stop, count as f64) else {
            return Vec::new();
        };
        let mut ticks: Vec<f64> = (i1..=i2)
            .map(|i| {
                if inc < 0.0 {
                    i as f64 / -inc
                } else {
                    i as f64 * inc
                }
            })
            .collect();
        if d1 < d0 {
            ticks.reverse();
        }
        ticks
    }

    /// Formats ticks with as many decimals as the tick step needs and thousands separators.
    pub fn tick_format(&self, count: usize, value: f64) -> String {
        let (d0, d1) = self.domain;
        let step = tick_increment(d0.min(d1), d0.max(d1), count.max(1));
        let step = if step < 0.0 { -1.0 / step } else { step };
        let decimals = if step > 0.0 && step.is_finite() {
            (-step.abs().log10().floor()).max(0.0) as usize
        } else {
            0
        };
        group_thousands(&format!("{value:.decimals$}"))
    }
}

/// Both scales for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub x: TimeScale,
    pub y: LinearScale,
}

impl Scales {
    /// The x domain spans every entry (explicit date bounds win); the y domain runs from zero
    /// to the largest per-entry total over all entries, so date filtering never rescales y.
    pub fn build(settings: &Settings) -> Self {
        let data = &settings.data;
        let (min, max) = data
            .extent()
            .unwrap_or((NaiveDate::default(), NaiveDate::default()));
        let start = settings.from_date.unwrap_or(min);
        let end = settings.to_date.unwrap_or(max);
        Self {
            x: TimeScale::new(start, end, (0.0, settings.inner_width)),
            y: LinearScale::new((0.0, data.max_total()), (settings.inner_height, 0.0)),
        }
    }
}

fn tick_spec(start: f64, stop: f64, count: f64) -> Option<(i64, i64, f64)> {
    let step = (stop - start) / count.max(0.0);
    if !step.is_finite() || step <= 0.0 {
        return None;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let positive = 10f64.powf(-power) / factor;
        i1 = (start * positive).round() as i64;
        i2 = (stop * positive).round() as i64;
        if (i1 as f64) / positive < start {
            i1 += 1;
        }
        if (i2 as f64) / positive > stop {
            i2 -= 1;
        }
        inc = -positive;
    } else {
        inc = 10f64.powf(power) * factor;
        i1 = (start / inc).round() as i64;
        i2 = (stop / inc).round() as i64;
        if (i1 as f64) * inc < start {
            i1 += 1;
        }
        if (i2 as f64) * inc > stop {
            i2 -= 1;
        }
    }
    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    if i2 < i1 {
        return None;
    }
    Some((i1, i2, inc))
}

/// Tick step; negative values encode `1 / step` for sub-unit steps.
fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    tick_spec(start, stop, count as f64)
        .map(|(_, _, inc)| inc)
        .unwrap_or(1.0)
}

fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (rest, None),
    };
    let mut grouped = String::new();
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
