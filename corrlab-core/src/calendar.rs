//! Business-day calendar: the last N weekdays ending yesterday.
//!
//! No holiday awareness. An exchange holiday is indistinguishable from a day
//! with no data until the fetch for that day comes back empty.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// True for Monday through Friday.
pub fn is_business_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The last `n` business days strictly before `today`, ascending.
///
/// Steps backward one calendar day at a time starting from yesterday,
/// keeping weekdays only. `today` is explicit so callers (and tests)
/// control the boundary.
pub fn last_business_days(n: usize, today: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut d = today - Duration::days(1);
    while days.len() < n {
        if is_business_day(d) {
            days.push(d);
        }
        d = d - Duration::days(1);
    }
    days.reverse();
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn skips_weekend() {
        // 2024-06-10 is a Monday; yesterday is Sunday, so the window ends Friday 06-07.
        let days = last_business_days(3, date(2024, 6, 10));
        assert_eq!(
            days,
            vec![date(2024, 6, 5), date(2024, 6, 6), date(2024, 6, 7)]
        );
    }

    #[test]
    fn ends_yesterday_midweek() {
        let days = last_business_days(2, date(2024, 6, 13));
        assert_eq!(days, vec![date(2024, 6, 11), date(2024, 6, 12)]);
    }

    #[test]
    fn zero_days_is_empty() {
        assert!(last_business_days(0, date(2024, 6, 10)).is_empty());
    }

    proptest! {
        #[test]
        fn n_ascending_weekdays_before_today(
            n in 1usize..=120,
            offset in 0i64..4000,
        ) {
            let today = date(2015, 1, 1) + Duration::days(offset);
            let days = last_business_days(n, today);

            prop_assert_eq!(days.len(), n);
            prop_assert!(days.iter().all(|d| is_business_day(*d)));
            prop_assert!(days.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(*days.last().unwrap() < today);
        }
    }
}
