//! Date-derived names: report subject, lesson plan and menu file names, titles.
//!
//! All take the report day already converted to the configured timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

/// Calendar day of `now` in the report timezone.
pub fn report_day(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Monday of the week containing `day`.
pub fn monday_of_week(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Lower-case three-letter weekday abbreviation, e.g. `"wed"`.
pub fn weekday_abbrev(weekday: Weekday) -> String {
    weekday.to_string().to_lowercase()
}

/// Subject line of the school's daily email, e.g.
/// `"Classroom Report for Monday [19 Oct 2026]"`.
pub fn report_subject(day: NaiveDate) -> String {
    format!(
        "Classroom Report for {} [{}]",
        day.format("%A"),
        day.format("%d %b %Y")
    )
}

/// `"R.C. Lesson Plan MM-DD-YY"`, keyed to this week's Monday.
pub fn lesson_plan_name(day: NaiveDate) -> String {
    format!("R.C. Lesson Plan {}", monday_of_week(day).format("%m-%d-%y"))
}

/// `"{Month} {Year} MAC Menu NV & V PDF.pdf"`.
pub fn meal_plan_name(day: NaiveDate) -> String {
    format!("{} MAC Menu NV & V PDF.pdf", day.format("%B %Y"))
}

/// Title line written at the top of the report document.
pub fn report_title(day: NaiveDate) -> String {
    format!("Daily School Report - {}", long_date(day))
}

/// e.g. `"Monday, October 19, 2026"`.
pub fn long_date(day: NaiveDate) -> String {
    day.format("%A, %B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_report_day_uses_timezone() {
        // 03:00 UTC on the 20th is still the 19th in Los Angeles
        let now = Utc.with_ymd_and_hms(2026, 10, 20, 3, 0, 0).unwrap();
        assert_eq!(report_day(now, chrono_tz::America::Los_Angeles), day(2026, 10, 19));
        assert_eq!(report_day(now, chrono_tz::UTC), day(2026, 10, 20));
    }

    #[test]
    fn test_monday_of_week() {
        assert_eq!(monday_of_week(day(2026, 10, 19)), day(2026, 10, 19));
        assert_eq!(monday_of_week(day(2026, 10, 23)), day(2026, 10, 19));
        assert_eq!(monday_of_week(day(2026, 10, 25)), day(2026, 10, 19));
        // Week spanning a month boundary
        assert_eq!(monday_of_week(day(2026, 11, 1)), day(2026, 10, 26));
    }

    #[test]
    fn test_report_subject() {
        assert_eq!(
            report_subject(day(2026, 10, 19)),
            "Classroom Report for Monday [19 Oct 2026]"
        );
        assert_eq!(
            report_subject(day(2026, 3, 4)),
            "Classroom Report for Wednesday [04 Mar 2026]"
        );
    }

    #[test]
    fn test_file_names() {
        assert_eq!(lesson_plan_name(day(2026, 10, 21)), "R.C. Lesson Plan 10-19-26");
        assert_eq!(
            meal_plan_name(day(2026, 10, 21)),
            "October 2026 MAC Menu NV & V PDF.pdf"
        );
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            report_title(day(2026, 10, 19)),
            "Daily School Report - Monday, October 19, 2026"
        );
        assert_eq!(weekday_abbrev(Weekday::Wed), "wed");
    }
}
