//! Classroom report parser.
//!
//! The school's daily email is a freeform log: a time such as `8:57 AM`
//! followed by what happened, repeated. Each time marker starts a new row;
//! the row's event is everything up to the next marker.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::ReportElement;

/// Attribution line the school's mailer appends to every report.
pub const REPORT_BOILERPLATE: &str = "Powered by NeatSchool - https://www.neatschool.net";

/// How much cleanup to apply to each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    /// Trim and drop the trailing attribution.
    Plain,
    /// Also drop `>` quote markers at line starts and `*` emphasis, as found
    /// in forwarded or quoted copies of the report.
    Quoted,
}

/// One `(time, event)` row of the parsed report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReportRow {
    /// Verbatim marker text, e.g. `"9:15 AM"`.
    pub time: String,
    pub event: String,
}

impl ParsedReportRow {
    pub fn header() -> Self {
        Self {
            time: "Time".to_string(),
            event: "Event".to_string(),
        }
    }

    pub fn into_cells(self) -> Vec<String> {
        vec![self.time, self.event]
    }
}

fn time_marker_regex() -> &'static Regex {
    static TIME_MARKER_RE: OnceLock<Regex> = OnceLock::new();
    TIME_MARKER_RE.get_or_init(|| {
        Regex::new(r"(?i)\d{1,2}:\d{2}\s*(AM|PM)").expect("time marker regex must compile")
    })
}

fn boilerplate_tail_regex() -> &'static Regex {
    static BOILERPLATE_RE: OnceLock<Regex> = OnceLock::new();
    BOILERPLATE_RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\s*{}\s*$", regex::escape(REPORT_BOILERPLATE)))
            .expect("boilerplate regex must compile")
    })
}

fn quote_marker_regex() -> &'static Regex {
    static QUOTE_MARKER_RE: OnceLock<Regex> = OnceLock::new();
    QUOTE_MARKER_RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:[ \t]*>)+[ \t]?").expect("quote marker regex must compile")
    })
}

/// Split a report body into rows. The first row is always the header.
pub fn parse_report(text: &str, mode: CleanMode) -> Vec<ParsedReportRow> {
    let markers: Vec<(usize, usize)> = time_marker_regex()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut rows = Vec::with_capacity(markers.len() + 1);
    rows.push(ParsedReportRow::header());

    for (idx, &(start, end)) in markers.iter().enumerate() {
        let event_end = markers
            .get(idx + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(text.len());
        rows.push(ParsedReportRow {
            time: text[start..end].to_string(),
            event: clean_event(&text[end..event_end], mode),
        });
    }

    rows
}

/// Parse a report body straight into the classroom table element.
pub fn report_table(text: &str, mode: CleanMode) -> ReportElement {
    let rows = parse_report(text, mode)
        .into_iter()
        .map(ParsedReportRow::into_cells)
        .collect();
    ReportElement::table(rows, None, true)
}

fn clean_event(raw: &str, mode: CleanMode) -> String {
    let mut event = raw.trim().to_string();
    if mode == CleanMode::Quoted {
        event = quote_marker_regex().replace_all(&event, "").replace('*', "");
    }
    boilerplate_tail_regex()
        .replace(event.trim(), "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(rows: &[ParsedReportRow]) -> Vec<(&str, &str)> {
        rows.iter()
            .map(|r| (r.time.as_str(), r.event.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_report_strips_boilerplate_from_last_event() {
        let rows = parse_report(
            "8:57 AM Arrived. 9:15 AM Snack. Powered by NeatSchool - https://www.neatschool.net",
            CleanMode::Plain,
        );
        assert_eq!(
            pairs(&rows),
            vec![
                ("Time", "Event"),
                ("8:57 AM", "Arrived."),
                ("9:15 AM", "Snack."),
            ]
        );
    }

    #[test]
    fn test_parse_report_no_markers_is_header_only() {
        let rows = parse_report("Nothing happened today.", CleanMode::Plain);
        assert_eq!(rows, vec![ParsedReportRow::header()]);
        assert_eq!(parse_report("", CleanMode::Quoted).len(), 1);
    }

    #[test]
    fn test_parse_report_row_count_and_verbatim_times() {
        let text = "Intro line\n7:05am Breakfast\n10:30 PM late note\n12:00 pm Lunch";
        let rows = parse_report(text, CleanMode::Plain);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].time, "7:05am");
        assert_eq!(rows[2].time, "10:30 PM");
        assert_eq!(rows[3].time, "12:00 pm");
        assert_eq!(rows[1].event, "Breakfast");
    }

    #[test]
    fn test_parse_report_adjacent_markers_yield_empty_event() {
        let rows = parse_report("9:00 AM 9:05 AM Circle time", CleanMode::Plain);
        assert_eq!(
            pairs(&rows),
            vec![("Time", "Event"), ("9:00 AM", ""), ("9:05 AM", "Circle time")]
        );
    }

    #[test]
    fn test_parse_report_ignores_malformed_times() {
        let rows = parse_report("9:5 AM nope 9:05 maybe 9:05 AM yes", CleanMode::Plain);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].time, "9:05 AM");
        assert_eq!(rows[1].event, "yes");
    }

    #[test]
    fn test_parse_report_boilerplate_case_insensitive() {
        let rows = parse_report(
            "3:00 PM Pickup\npowered by neatschool - HTTPS://WWW.NEATSCHOOL.NET\n",
            CleanMode::Plain,
        );
        assert_eq!(rows[1].event, "Pickup");
    }

    #[test]
    fn test_parse_report_boilerplate_only_removed_at_end() {
        let text = format!("9:00 AM {} then more", REPORT_BOILERPLATE);
        let rows = parse_report(&text, CleanMode::Plain);
        assert!(rows[1].event.ends_with("then more"));
    }

    #[test]
    fn test_quoted_mode_strips_markers_and_emphasis() {
        let text = "> 8:57 AM *Arrived* happy\n> > and ready\n> 9:15 AM **Snack**\n> Powered by NeatSchool - https://www.neatschool.net";
        let quoted = parse_report(text, CleanMode::Quoted);
        assert_eq!(
            pairs(&quoted),
            vec![
                ("Time", "Event"),
                ("8:57 AM", "Arrived happy\nand ready"),
                ("9:15 AM", "Snack"),
            ]
        );

        let plain = parse_report(text, CleanMode::Plain);
        assert!(plain[1].event.contains('*'));
    }

    #[test]
    fn test_report_table_is_flagged_as_classroom() {
        match report_table("9:00 AM Hello", CleanMode::Plain) {
            ReportElement::Table {
                rows,
                highlight_row,
                is_classroom_report,
            } => {
                assert_eq!(rows[0], vec!["Time", "Event"]);
                assert_eq!(rows[1], vec!["9:00 AM", "Hello"]);
                assert_eq!(highlight_row, None);
                assert!(is_classroom_report);
            }
            other => panic!("unexpected element {:?}", other),
        }
    }
}
