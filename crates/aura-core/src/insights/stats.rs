//! Small numeric helpers shared by the analyzers

use chrono::{DateTime, Duration, Utc};

use crate::models::Record;

/// Days covered by the "recent" window used by the trend and intake analyzers
pub const RECENT_WINDOW_DAYS: i64 = 14;

pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn mean_pain<'a, I>(records: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Record>,
{
    mean(records.into_iter().map(|r| r.pain_level as f64))
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Records whose start falls in `[now - 14d, now]`
pub fn recent<'a>(records: &'a [Record], now: DateTime<Utc>) -> Vec<&'a Record> {
    let from = now - Duration::days(RECENT_WINDOW_DAYS);
    records
        .iter()
        .filter(|r| r.start_date >= from && r.start_date <= now)
        .collect()
}

/// Records whose start falls in `[now - 28d, now - 14d)`
pub fn prior<'a>(records: &'a [Record], now: DateTime<Utc>) -> Vec<&'a Record> {
    let from = now - Duration::days(RECENT_WINDOW_DAYS * 2);
    let to = now - Duration::days(RECENT_WINDOW_DAYS);
    records
        .iter()
        .filter(|r| r.start_date >= from && r.start_date < to)
        .collect()
}

/// Uppercase the first letter of every word, lowercase the rest
pub fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{days_ago, fixed_now};

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![]), None);
        assert_eq!(mean(vec![1.0, 1.1, 1.3, 0.8]).map(|m| round_to(m, 2)), Some(1.05));
    }

    #[test]
    fn test_window_boundaries() {
        let now = fixed_now();
        let records = vec![
            Record::new(1, days_ago(0), 1, 1),
            Record::new(2, days_ago(14), 1, 1),
            Record::new(3, days_ago(14) - Duration::seconds(1), 1, 1),
            Record::new(4, days_ago(28), 1, 1),
            Record::new(5, days_ago(29), 1, 1),
        ];
        let recent_ids: Vec<_> = recent(&records, now).iter().map(|r| r.id).collect();
        let prior_ids: Vec<_> = prior(&records, now).iter().map(|r| r.id).collect();
        assert_eq!(recent_ids, vec![1, 2]);
        assert_eq!(prior_ids, vec![3, 4]);
    }

    #[test]
    fn test_capitalize_words() {
        assert_eq!(capitalize_words("red WINE"), "Red Wine");
        assert_eq!(capitalize_words("  perfume  "), "Perfume");
    }
}
