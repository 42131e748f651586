use crate::config::Settings;
use crate::data::Record;
use chrono::NaiveDate;

/// Inclusive day window that decides which entries and markers are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Explicit `fromDate`/`toDate` win; otherwise the first and last entry (in the order
    /// given) bound the window.
    pub fn from_settings(settings: &Settings) -> Self {
        let data = &settings.data;
        Self {
            from: settings
                .from_date
                .or_else(|| data.first_date())
                .unwrap_or(NaiveDate::MIN),
            to: settings
                .to_date
                .or_else(|| data.last_date())
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn filter<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records
            .iter()
            .filter(|record| self.contains(record.date))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 9, d).unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = DateRange {
            from: day(2),
            to: day(4),
        };
        assert!(!range.contains(day(1)));
        assert!(range.contains(day(2)));
        assert!(range.contains(day(4)));
        assert!(!range.contains(day(5)));
    }

    #[test]
    fn filter_keeps_entry_order() {
        let range = DateRange {
            from: day(2),
            to: day(3),
        };
        let records: Vec<Record> = [3, 1, 2, 5]
            .into_iter()
            .map(|d| Record {
                date: day(d),
                values: vec![1.0],
            })
            .collect();
        let kept: Vec<_> = range.filter(&records).iter().map(|r| r.date).collect();
        assert_eq!(kept, vec![day(3), day(2)]);
    }
}
