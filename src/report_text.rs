// src/report_text.rs
use chrono::{DateTime, NaiveDate, TimeZone};
use std::fmt::Display;

/// Whether the badge shows the one-way distance or the reimbursed round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    #[default]
    OneWay,
    RoundTrip,
}

impl DistanceMode {
    pub fn badge_km(self, one_way_km: f64) -> f64 {
        match self {
            DistanceMode::OneWay => one_way_km,
            DistanceMode::RoundTrip => one_way_km * 2.0,
        }
    }
}

/// Kilometres as the mileage reports print them: `19` for whole numbers, `19.1` otherwise.
pub fn format_km(km: f64) -> String {
    if km.is_finite() && km == km.trunc() {
        format!("{}", km as i64)
    } else {
        format!("{km:.1}")
    }
}

pub fn distance_badge_text(km: f64) -> String {
    format!("{} km", format_km(km))
}

/// Drop the redundant country name and a stray leading `號` left by geocoders.
pub fn clean_address(addr: &str) -> String {
    let cleaned = addr.replace("台灣", "");
    let cleaned = cleaned.trim();
    cleaned.strip_prefix('號').unwrap_or(cleaned).trim().to_string()
}

/// `MM/DD` for a trip date written as `YYYY-MM-DD` or `YYYY/MM/DD`, possibly with a time.
/// Anything else is shown verbatim; a missing date means `today`.
pub fn format_report_date(text: Option<&str>, today: NaiveDate) -> String {
    let Some(raw) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return today.format("%m/%d").to_string();
    };

    let day = raw.split_whitespace().next().unwrap_or(raw);
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .map(|d| d.format("%m/%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Title line shared with the Word report.
pub fn header_text(date: &str, origin: &str, destination: &str, round_trip_km: f64) -> String {
    format!(
        "{date} {origin}至 {destination}往返，核銷 {} 公里。",
        format_km(round_trip_km)
    )
}

pub fn timestamp_text<Tz>(prefix: &str, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = generated_at.format("%Y-%m-%d %H:%M");
    if prefix.is_empty() {
        stamp.to_string()
    } else {
        format!("{prefix} {stamp}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn oct_22() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 22).unwrap()
    }

    #[test]
    fn badge_keeps_one_decimal() {
        assert_eq!(distance_badge_text(19.1), "19.1 km");
    }

    #[test]
    fn badge_drops_trailing_zero() {
        assert_eq!(distance_badge_text(19.0), "19 km");
    }

    #[test]
    fn km_rounds_to_one_decimal() {
        assert_eq!(format_km(9.56), "9.6");
        assert_eq!(format_km(0.0), "0");
    }

    #[test]
    fn round_trip_doubles() {
        assert_eq!(DistanceMode::RoundTrip.badge_km(9.5), 19.0);
        assert_eq!(DistanceMode::OneWay.badge_km(9.5), 9.5);
    }

    #[test]
    fn addresses_lose_country_and_stray_prefix() {
        assert_eq!(clean_address("813台灣高雄市左營區"), "813高雄市左營區");
        assert_eq!(clean_address("號 高雄市鼓山區"), "高雄市鼓山區");
        assert_eq!(clean_address("  "), "");
    }

    #[test]
    fn dates_render_as_month_day() {
        assert_eq!(format_report_date(Some("2025-10-22"), oct_22()), "10/22");
        assert_eq!(format_report_date(Some("2025/03/05 08:30:00"), oct_22()), "03/05");
    }

    #[test]
    fn unparseable_dates_pass_through() {
        assert_eq!(format_report_date(Some("上週三"), oct_22()), "上週三");
    }

    #[test]
    fn missing_date_means_today() {
        assert_eq!(format_report_date(None, oct_22()), "10/22");
        assert_eq!(format_report_date(Some(" "), oct_22()), "10/22");
    }

    #[test]
    fn header_matches_report_title() {
        assert_eq!(
            header_text("10/22", "高雄市苓雅區", "高雄市鼓山區", 19.0),
            "10/22 高雄市苓雅區至 高雄市鼓山區往返，核銷 19 公里。"
        );
    }

    #[test]
    fn timestamp_has_prefix_and_minutes() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 0).unwrap();
        assert_eq!(timestamp_text("Generated", &at), "Generated 2026-10-17 09:05");
        assert_eq!(timestamp_text("", &at), "2026-10-17 09:05");
    }
}
