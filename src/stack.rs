use crate::data::Record;
use crate::scale::Scales;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StackPoint {
    pub date: NaiveDate,
    pub low: f64,
    pub high: f64,
}

/// One stacked layer: the cumulative span of a key at every visible entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub key: String,
    pub index: usize,
    pub points: Vec<StackPoint>,
}

impl Band {
    /// Baseline and top edges in pixels.
    pub fn edges(&self, scales: &Scales) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        self.points
            .iter()
            .map(|point| {
                let x = scales.x.map(point.date);
                ((x, scales.y.map(point.low)), (x, scales.y.map(point.high)))
            })
            .unzip()
    }
}

/// Cumulative sums in key order: the top of key `i` is the baseline of key `i + 1`.
pub fn stack_bands(keys: &[String], records: &[&Record]) -> Vec<Band> {
    let mut bands: Vec<Band> = keys
        .iter()
        .enumerate()
        .map(|(index, key)| Band {
            key: key.clone(),
            index,
            points: Vec::with_capacity(records.len()),
        })
        .collect();
    for record in records {
        let mut low = 0.0;
        for band in bands.iter_mut() {
            let high = low + record.value(band.index);
            band.points.push(StackPoint {
                date: record.date,
                low,
                high,
            });
            low = high;
        }
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_stack_bottom_up() {
        let keys = vec!["A".to_string(), "B".to_string()];
        let record = Record {
            date: NaiveDate::from_ymd_opt(2018, 9, 1).unwrap(),
            values: vec![2.0, 3.0],
        };
        let bands = stack_bands(&keys, &[&record]);
        assert_eq!(bands.len(), 2);
        assert_eq!((bands[0].points[0].low, bands[0].points[0].high), (0.0, 2.0));
        assert_eq!((bands[1].points[0].low, bands[1].points[0].high), (2.0, 5.0));
    }

    #[test]
    fn no_records_means_empty_bands() {
        let keys = vec!["A".to_string()];
        let bands = stack_bands(&keys, &[]);
        assert_eq!(bands.len(), 1);
        assert!(bands[0].points.is_empty());
    }
}
