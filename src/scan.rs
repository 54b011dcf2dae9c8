//! Year scan — every calendar date whose digit number matches the life path.

use chrono::NaiveDate;
use serde::Serialize;

use crate::numerology::{self, NumerologyError};

/// Result of scanning one year for a birth date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// Matching dates in ascending calendar order.
    pub dates: Vec<String>,
    /// The birth date's numerology number under the scan's reduction mode.
    pub number: u64,
    pub meaning: String,
}

/// Number of days in `month` of `year`, leap-aware.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_y, next_m, 1),
    ) {
        (Some(first), Some(next_first)) => (next_first - first).num_days() as u32,
        _ => 0,
    }
}

/// Scan every day of `year` and keep the dates compatible with `birth_date`.
///
/// Both sides of the comparison use the same reduction mode. The nested
/// month/day iteration guarantees ascending output; an empty result is a
/// valid outcome, not an error.
pub fn scan_year(
    birth_date: &str,
    year: i32,
    single_digit: bool,
) -> Result<ScanOutcome, NumerologyError> {
    let number = numerology::life_path(birth_date, single_digit)?;

    let mut dates = Vec::new();
    for month in 1..=12u32 {
        for day in 1..=days_in_month(year, month) {
            let date = format!("{year:04}-{month:02}-{day:02}");
            if numerology::date_number(&date, single_digit)? == number {
                dates.push(date);
            }
        }
    }

    Ok(ScanOutcome {
        dates,
        number,
        meaning: numerology::number_meaning(number).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_lengths_respect_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn scan_results_ascending_without_duplicates() {
        let outcome = scan_year("1990-01-01", 2024, true).unwrap();
        assert!(!outcome.dates.is_empty());
        for pair in outcome.dates.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn every_match_satisfies_the_rule_and_nothing_else_does() {
        let outcome = scan_year("1990-01-01", 2024, true).unwrap();
        assert_eq!(outcome.number, 3);
        for date in &outcome.dates {
            assert_eq!(numerology::date_number(date, true).unwrap(), 3);
        }
        // Spot-check exclusions: 2024-01-01 sums to 10 → 1, not 3.
        assert!(!outcome.dates.contains(&"2024-01-01".to_string()));
        assert!(outcome.dates.contains(&"2024-01-03".to_string())); // 12 → 3
        // Exhaustive complement check for January.
        for day in 1..=31u32 {
            let date = format!("2024-01-{day:02}");
            let matches = numerology::date_number(&date, true).unwrap() == 3;
            assert_eq!(outcome.dates.contains(&date), matches, "{date}");
        }
    }

    #[test]
    fn full_sum_mode_compares_unreduced_sums() {
        let outcome = scan_year("1990-01-01", 2024, false).unwrap();
        assert_eq!(outcome.number, 21);
        for date in &outcome.dates {
            assert_eq!(numerology::date_number(date, false).unwrap(), 21);
        }
        // 2024-09-06 → 2+0+2+4+0+9+0+6 = 23, excluded
        assert!(!outcome.dates.contains(&"2024-09-06".to_string()));
    }

    #[test]
    fn leap_day_only_scanned_in_leap_years() {
        // 2024-02-29 → 2+0+2+4+0+2+2+9 = 21 → 3, matches life path 3
        let leap = scan_year("1990-01-01", 2024, true).unwrap();
        assert!(leap.dates.contains(&"2024-02-29".to_string()));
        let common = scan_year("1990-01-01", 2023, true).unwrap();
        assert!(!common.dates.iter().any(|d| d.ends_with("-02-29")));
    }

    #[test]
    fn meaning_matches_the_number() {
        let outcome = scan_year("1990-01-01", 2024, true).unwrap();
        assert_eq!(outcome.meaning, "Creativity, communication, and self-expression");
        // Full-sum numbers above 9 get the sentinel.
        let unreduced = scan_year("1990-01-01", 2024, false).unwrap();
        assert_eq!(unreduced.meaning, numerology::UNKNOWN_MEANING);
    }

    #[test]
    fn invalid_birth_date_propagates_without_partial_results() {
        let err = scan_year("not-a-date", 2024, true).unwrap_err();
        assert_eq!(err, NumerologyError::InvalidDateFormat("not-a-date".into()));
    }

    #[test]
    fn empty_result_is_valid() {
        // Full-sum target 47 is unreachable in 1902, whose date sums top out
        // at 1+9+0+2 + 0+9 + 2+9 = 32.
        let outcome = scan_year("1989-09-29", 1902, false).unwrap(); // 1+9+8+9+0+9+2+9 = 47
        assert_eq!(outcome.number, 47);
        assert!(outcome.dates.is_empty());
    }
}
