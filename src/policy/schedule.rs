//! Business-hours evaluation

use super::BusinessHours;
use chrono::Timelike;

/// Whether `now` falls inside the half-open window `[start_hour, end_hour)`.
///
/// `now` must already be in the tenant-local clock; no timezone conversion
/// happens here.
pub fn is_within_business_hours<T: Timelike>(window: &BusinessHours, now: &T) -> bool {
    let hour = now.hour();
    window.start_hour <= hour && hour < window.end_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn window(start: u32, end: u32) -> BusinessHours {
        BusinessHours {
            start_hour: start,
            end_hour: end,
            off_hours_replicas: 1,
            business_hours_min_replicas: 2,
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_start_hour_is_inclusive() {
        assert!(is_within_business_hours(&window(8, 20), &at(8, 0)));
    }

    #[test]
    fn test_end_hour_is_exclusive() {
        assert!(is_within_business_hours(&window(8, 20), &at(19, 59)));
        assert!(!is_within_business_hours(&window(8, 20), &at(20, 0)));
    }

    #[test]
    fn test_outside_window() {
        assert!(!is_within_business_hours(&window(8, 20), &at(22, 0)));
        assert!(!is_within_business_hours(&window(8, 20), &at(7, 59)));
    }

    #[test]
    fn test_full_day_window() {
        for hour in 0..24 {
            assert!(is_within_business_hours(&window(0, 24), &at(hour, 30)));
        }
    }

    #[test]
    fn test_accepts_offset_datetimes() {
        let now = chrono::DateTime::parse_from_rfc3339("2024-03-01T09:15:00+01:00").unwrap();
        assert!(is_within_business_hours(&window(8, 20), &now));
    }
}
