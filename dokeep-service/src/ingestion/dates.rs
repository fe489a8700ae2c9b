//! Business-date and summary resolution.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::warn;

const USER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Local date-time forms the OCR and LLM services emit, most specific first
const EXTRACTED_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Where the resolved business date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    User,
    Llm,
    Ocr,
    Now,
}

/// Parse a date typed by the owner (`YYYY-MM-DD`)
pub fn parse_user_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), USER_DATE_FORMAT).ok()
}

/// Parse a date reported by a processing stage. Accepts the local
/// date-time form and a bare calendar date.
pub fn parse_extracted_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    EXTRACTED_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(s, USER_DATE_FORMAT).ok())
}

/// Pick the business date: user, then LLM, then OCR, then `now`.
///
/// Empty candidates are ignored; unparseable ones are logged and skipped.
pub fn resolve_created_date(
    user: Option<&str>,
    llm: Option<&str>,
    ocr: Option<&str>,
    now: NaiveDate,
) -> (NaiveDate, DateSource) {
    let candidates: [(Option<&str>, DateSource, fn(&str) -> Option<NaiveDate>); 3] = [
        (user, DateSource::User, parse_user_date),
        (llm, DateSource::Llm, parse_extracted_date),
        (ocr, DateSource::Ocr, parse_extracted_date),
    ];

    for (value, source, parse) in candidates {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        match parse(value) {
            Some(date) => return (date, source),
            None => warn!(value = %value, source = ?source, "Ignoring unparseable date"),
        }
    }

    (now, DateSource::Now)
}

/// Owner's summary if it has any text, otherwise the LLM's
pub fn resolve_summary(user: Option<&str>, llm: Option<&str>) -> Option<String> {
    user.map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| llm.map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_extracted_date_forms() {
        assert_eq!(
            parse_extracted_date("2023-04-17T09:30:00"),
            Some(date(2023, 4, 17))
        );
        assert_eq!(
            parse_extracted_date("2023-04-17T09:30:00.250"),
            Some(date(2023, 4, 17))
        );
        assert_eq!(parse_extracted_date("2023-04-17"), Some(date(2023, 4, 17)));
        assert_eq!(parse_extracted_date("17/04/2023"), None);
    }

    #[test]
    fn test_user_date_requires_calendar_form() {
        assert_eq!(parse_user_date("2022-12-31"), Some(date(2022, 12, 31)));
        assert_eq!(parse_user_date("2022-02-30"), None);
        assert_eq!(parse_user_date("2022-12-31T00:00:00"), None);
    }

    #[test]
    fn test_date_precedence() {
        let now = date(2025, 1, 1);
        let user = Some("2020-01-01");
        let llm = Some("2021-02-02T00:00:00");
        let ocr = Some("2022-03-03T00:00:00");

        assert_eq!(
            resolve_created_date(user, llm, ocr, now),
            (date(2020, 1, 1), DateSource::User)
        );
        assert_eq!(
            resolve_created_date(None, llm, ocr, now),
            (date(2021, 2, 2), DateSource::Llm)
        );
        assert_eq!(
            resolve_created_date(Some(""), None, ocr, now),
            (date(2022, 3, 3), DateSource::Ocr)
        );
        assert_eq!(
            resolve_created_date(None, None, None, now),
            (now, DateSource::Now)
        );
    }

    #[test]
    fn test_unparseable_candidates_fall_through() {
        let now = date(2025, 1, 1);

        assert_eq!(
            resolve_created_date(Some("last tuesday"), Some("unknown"), Some("2019-07-08T10:00:00"), now),
            (date(2019, 7, 8), DateSource::Ocr)
        );
        assert_eq!(
            resolve_created_date(Some("31.12.2020"), None, Some("garbage"), now),
            (now, DateSource::Now)
        );
    }

    #[test]
    fn test_summary_prefers_non_blank_user_text() {
        assert_eq!(
            resolve_summary(Some("  Mine "), Some("LLM says")),
            Some("Mine".to_string())
        );
        assert_eq!(
            resolve_summary(Some("   "), Some("LLM says")),
            Some("LLM says".to_string())
        );
        assert_eq!(resolve_summary(None, Some("")), None);
    }
}
