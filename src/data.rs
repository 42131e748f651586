use crate::error::{ConfigError, ConfigResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());

/// One dated entry with a value per key, aligned with `Dataset::keys`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

impl Record {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn value(&self, key_index: usize) -> f64 {
        self.values.get(key_index).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub keys: Vec<String>,
    pub reverse_keys: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Adapts raw entries into canonical records.
    ///
    /// An entry is either a keyed object (`{"date": .., "A": 1}`) or a positional array
    /// (`[date, a, b, ..]`) whose positions after the date follow `keys`. A missing value
    /// counts as zero.
    pub fn from_entries(keys: Vec<String>, entries: &[Value]) -> ConfigResult<Self> {
        let mut records = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let record = match entry {
                Value::Object(map) => {
                    let date = date_from_json(map.get("date"), idx)?;
                    let values = keys
                        .iter()
                        .map(|key| number_value(map.get(key), key, idx))
                        .collect::<ConfigResult<Vec<_>>>()?;
                    Record { date, values }
                }
                Value::Array(items) => {
                    let date = date_from_json(items.first(), idx)?;
                    let values = keys
                        .iter()
                        .enumerate()
                        .map(|(pos, key)| number_value(items.get(pos + 1), key, idx))
                        .collect::<ConfigResult<Vec<_>>>()?;
                    Record { date, values }
                }
                _ => return Err(ConfigError::InvalidEntry(idx)),
            };
            records.push(record);
        }
        let reverse_keys = keys.iter().rev().cloned().collect();
        Ok(Self {
            keys,
            reverse_keys,
            records,
        })
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|record| record.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|record| record.date)
    }

    /// Earliest and latest date over all records, regardless of their order.
    pub fn extent(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|record| record.date).min()?;
        let max = self.records.iter().map(|record| record.date).max()?;
        Some((min, max))
    }

    pub fn max_total(&self) -> f64 {
        self.records
            .iter()
            .map(Record::total)
            .fold(0.0_f64, f64::max)
    }

    pub fn record_for(&self, date: NaiveDate) -> Option<&Record> {
        self.records.iter().find(|record| record.date == date)
    }

    pub fn key_index(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|candidate| candidate == key)
    }
}

/// Parses a date string down to its calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (the day is taken in the timestamp's own
/// offset), naive `YYYY-MM-DDTHH:MM:SS` and anything else that starts with `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    let caps = DATE_PREFIX_RE.captures(trimmed)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Epoch milliseconds to a UTC calendar day.
pub fn date_from_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn date_from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => parse_date(text),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|ms| ms as i64))
            .and_then(date_from_millis),
        _ => None,
    }
}

fn date_from_json(value: Option<&Value>, entry: usize) -> ConfigResult<NaiveDate> {
    let Some(value) = value else {
        return Err(ConfigError::InvalidDate {
            value: String::new(),
            context: format!("entry {entry} has no date"),
        });
    };
    date_from_value(value).ok_or_else(|| ConfigError::InvalidDate {
        value: value.to_string(),
        context: format!("entry {entry}"),
    })
}

fn number_value(value: Option<&Value>, key: &str, entry: usize) -> ConfigResult<f64> {
    let invalid = |value: &Value| ConfigError::InvalidValue {
        key: key.to_string(),
        entry,
        value: value.to_string(),
    };
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(other @ Value::Number(number)) => number
            .as_f64()
            .filter(|value| value.is_finite())
            .ok_or_else(|| invalid(other)),
        Some(other @ Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| invalid(other)),
        Some(other) => Err(invalid(other)),
    }
}
