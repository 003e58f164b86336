//! Human-readable distance and duration formatting.
//!
//! Durations use the app locale's hour unit ("jam").

/// Formats a distance in meters.
///
/// Under 1 km: whole meters (`"850m"`). Otherwise kilometers to one decimal
/// (`"1.5km"`).
pub fn format_distance(meters: f64) -> String {
    let meters = sanitize(meters);
    if meters < 1000.0 {
        format!("{}m", meters.round() as u64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// Formats a duration in seconds.
///
/// Under a minute: `"<1 min"`. Under an hour: rounded minutes (`"2 min"`).
/// Otherwise hours plus remaining minutes (`"1 jam 30 min"`), with the
/// minutes omitted when zero (`"2 jam"`).
pub fn format_time(seconds: f64) -> String {
    let seconds = sanitize(seconds);
    if seconds < 60.0 {
        return "<1 min".to_string();
    }
    if seconds < 3600.0 {
        return format!("{} min", (seconds / 60.0).round() as u64);
    }

    let mut hours = (seconds / 3600.0).floor() as u64;
    let mut minutes = ((seconds % 3600.0) / 60.0).round() as u64;
    if minutes == 60 {
        hours += 1;
        minutes = 0;
    }

    if minutes == 0 {
        format!("{} jam", hours)
    } else {
        format!("{} jam {} min", hours, minutes)
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance_meters() {
        assert_eq!(format_distance(850.0), "850m");
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(12.4), "12m");
        assert_eq!(format_distance(12.5), "13m");
    }

    #[test]
    fn test_format_distance_kilometers() {
        assert_eq!(format_distance(1500.0), "1.5km");
        assert_eq!(format_distance(1000.0), "1.0km");
        assert_eq!(format_distance(12_345.0), "12.3km");
    }

    #[test]
    fn test_format_distance_garbage_input() {
        assert_eq!(format_distance(-20.0), "0m");
        assert_eq!(format_distance(f64::NAN), "0m");
    }

    #[test]
    fn test_format_time_under_minute() {
        assert_eq!(format_time(45.0), "<1 min");
        assert_eq!(format_time(0.0), "<1 min");
    }

    #[test]
    fn test_format_time_minutes() {
        assert_eq!(format_time(125.0), "2 min");
        assert_eq!(format_time(60.0), "1 min");
        assert_eq!(format_time(90.0), "2 min");
    }

    #[test]
    fn test_format_time_hours() {
        assert_eq!(format_time(5400.0), "1 jam 30 min");
        assert_eq!(format_time(3600.0), "1 jam");
        assert_eq!(format_time(7200.0), "2 jam");
        assert_eq!(format_time(3661.0), "1 jam 1 min");
    }

    #[test]
    fn test_format_time_hour_threshold_uses_raw_seconds() {
        // Just under an hour stays in minutes even when it rounds to 60
        assert_eq!(format_time(3570.0), "60 min");
        assert_eq!(format_time(3590.0), "60 min");
        assert_eq!(format_time(3599.0), "60 min");
    }

    #[test]
    fn test_format_time_minute_rounding_carries_into_hour() {
        // 1 h 59.8 min rounds to 2 h
        assert_eq!(format_time(7188.0), "2 jam");
        assert_eq!(format_time(3630.0), "1 jam 1 min");
    }
}
