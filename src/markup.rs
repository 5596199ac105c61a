//! HTML to plain text, and a small regex-based table extractor.
//!
//! Both are tuned for the school mailer's simple markup. Nested tables are
//! not supported: the first `</table>` closes the outermost table.

use std::sync::OnceLock;

use regex::Regex;

fn line_break_tag_regex() -> &'static Regex {
    static LINE_BREAK_RE: OnceLock<Regex> = OnceLock::new();
    LINE_BREAK_RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|td)\s*>")
            .expect("line break tag regex must compile")
    })
}

fn any_tag_regex() -> &'static Regex {
    static ANY_TAG_RE: OnceLock<Regex> = OnceLock::new();
    ANY_TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex must compile"))
}

fn nbsp_regex() -> &'static Regex {
    static NBSP_RE: OnceLock<Regex> = OnceLock::new();
    NBSP_RE.get_or_init(|| Regex::new(r"(?i)&nbsp;|\x{A0}").expect("nbsp regex must compile"))
}

fn inline_space_run_regex() -> &'static Regex {
    static SPACE_RUN_RE: OnceLock<Regex> = OnceLock::new();
    SPACE_RUN_RE.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("space run regex must compile"))
}

fn newline_run_regex() -> &'static Regex {
    static NEWLINE_RUN_RE: OnceLock<Regex> = OnceLock::new();
    NEWLINE_RUN_RE.get_or_init(|| Regex::new(r"\n{2,}").expect("newline run regex must compile"))
}

fn table_regex() -> &'static Regex {
    static TABLE_RE: OnceLock<Regex> = OnceLock::new();
    TABLE_RE.get_or_init(|| {
        Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").expect("table regex must compile")
    })
}

fn row_regex() -> &'static Regex {
    static ROW_RE: OnceLock<Regex> = OnceLock::new();
    ROW_RE.get_or_init(|| {
        Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("row regex must compile")
    })
}

fn cell_regex() -> &'static Regex {
    static CELL_RE: OnceLock<Regex> = OnceLock::new();
    CELL_RE.get_or_init(|| {
        Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>").expect("cell regex must compile")
    })
}

/// Reduce an HTML fragment to plain text.
///
/// Block-ending tags become newlines, every other tag is dropped, `&nbsp;`
/// becomes a space, and runs of spaces or newlines collapse to one.
pub fn normalize_html(html: &str) -> String {
    let text = line_break_tag_regex().replace_all(html, "\n");
    let text = any_tag_regex().replace_all(&text, "");
    let text = nbsp_regex().replace_all(&text, " ");
    let text = inline_space_run_regex().replace_all(&text, " ");
    let text = newline_run_regex().replace_all(&text, "\n");
    text.trim().to_string()
}

/// Pull the first table out of an HTML body as normalized cell text.
///
/// Rows without cells are skipped. Returns `None` when there is no table or
/// it has no rows with cells.
pub fn extract_html_table(html: &str) -> Option<Vec<Vec<String>>> {
    let table_body = table_regex().captures(html)?.get(1)?.as_str();

    let rows: Vec<Vec<String>> = row_regex()
        .captures_iter(table_body)
        .filter_map(|row| {
            let cells: Vec<String> = cell_regex()
                .captures_iter(row.get(1)?.as_str())
                .filter_map(|cell| cell.get(1).map(|m| normalize_html(m.as_str())))
                .collect();
            if cells.is_empty() {
                None
            } else {
                Some(cells)
            }
        })
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_paragraphs() {
        assert_eq!(normalize_html("<p>A</p><p>B</p>"), "A\nB");
    }

    #[test]
    fn test_normalize_breaks_and_entities() {
        let html = "<div>Snack:&nbsp;&nbsp;apples<br/>Nap<BR>  Outside\u{00A0}play</div>";
        assert_eq!(normalize_html(html), "Snack: apples\nNap\n Outside play");
    }

    #[test]
    fn test_normalize_collapses_newline_runs_and_trims() {
        let html = "\n\n<ul><li>One</li>\n<li>Two</li></ul>\n\n";
        assert_eq!(normalize_html(html), "One\nTwo");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "<p>A</p><p>B</p>",
            "<table><tr><td>x</td><td> y </td></tr></table>",
            "a\t\t b &nbsp; c<br><br><br>d",
            "x < y > z",
            "plain text with  two spaces",
            "<p> \n </p>\n\n<p>end</p>",
        ];
        for sample in samples {
            let once = normalize_html(sample);
            assert_eq!(normalize_html(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_extract_html_table() {
        let html = r#"<p>Intro</p>
            <table class="report">
              <tr><th>Time</th><th>Event</th></tr>
              <tr><td>8:57&nbsp;AM</td><td><b>Arrived</b></td></tr>
              <tr></tr>
            </table>"#;
        let rows = extract_html_table(html).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Time".to_string(), "Event".to_string()],
                vec!["8:57 AM".to_string(), "Arrived".to_string()],
            ]
        );
    }

    #[test]
    fn test_extract_html_table_absent() {
        assert!(extract_html_table("<p>No table</p>").is_none());
        assert!(extract_html_table("<table></table>").is_none());
    }

    #[test]
    fn test_extract_html_table_nested_stops_at_first_close() {
        let html = "<table><tr><td>outer<table><tr><td>inner</td></tr></table></td></tr><tr><td>lost</td></tr></table>";
        let rows = extract_html_table(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows.iter().flatten().any(|cell| cell == "lost"));
    }
}
