use chrono::NaiveDate;

use super::{HIGHLIGHT_COLOR, MENU_HEADING};
use crate::dates::long_date;
use crate::types::ReportElement;
use crate::util::{html_escape, truncate_chars};

/// Longest paragraph rendered in full; longer ones are cut.
pub const MAX_PARAGRAPH_CHARS: usize = 2000;
/// Rows kept per table; the rest are dropped with a note.
pub const MAX_TABLE_ROWS: usize = 40;
pub const ELLIPSIS: &str = "...";
pub const TRUNCATED_NOTE: &str = "(truncated)";

const TABLE_STYLE: &str = "border-collapse:collapse;margin:8px 0;";
const CELL_STYLE: &str = "border:1px solid #cccccc;padding:4px 8px;vertical-align:top;";

/// How the menu appears in the email, resolved before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEmbed {
    Image(String),
    Link(String),
    Omitted,
}

pub fn report_subject(day: NaiveDate) -> String {
    format!("Daily School Report - {}", long_date(day))
}

pub fn failure_subject(day: NaiveDate) -> String {
    format!("Daily School Report FAILED - {}", long_date(day))
}

/// Full HTML body of the daily report email.
pub fn render_report_email(day: NaiveDate, elements: &[ReportElement], menu: &MenuEmbed) -> String {
    let mut html = String::from("<html><body style=\"font-family:Arial,sans-serif;\">");
    html.push_str("<p>Hello,</p>");
    html.push_str("<p>Today's school report has been generated and saved to the report document.</p>");
    html.push_str(&format!("<h1>{}</h1>", html_escape(&long_date(day))));

    for element in elements {
        html.push_str(&render_element(element));
    }

    match menu {
        MenuEmbed::Image(url) => {
            html.push_str(&format!("<h2>{}</h2>", html_escape(MENU_HEADING)));
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\" style=\"max-width:100%;\">",
                html_escape(url),
                html_escape(MENU_HEADING)
            ));
        }
        MenuEmbed::Link(url) => {
            html.push_str(&format!("<h2>{}</h2>", html_escape(MENU_HEADING)));
            html.push_str(&format!(
                "<p><a href=\"{}\">View this month's menu (PDF)</a></p>",
                html_escape(url)
            ));
        }
        MenuEmbed::Omitted => {}
    }

    html.push_str("</body></html>");
    html
}

/// Body of the single email sent when a run fails.
pub fn render_failure_email(day: NaiveDate, error: &str, suggestion: &str) -> String {
    format!(
        "<html><body style=\"font-family:Arial,sans-serif;\">\
         <p>Hello,</p>\
         <p>The school report for {} could not be generated.</p>\
         <p><strong>Error:</strong> {}</p>\
         <p>{}</p>\
         </body></html>",
        html_escape(&long_date(day)),
        html_escape(error),
        html_escape(suggestion)
    )
}

pub fn render_element(element: &ReportElement) -> String {
    match element {
        ReportElement::Heading { text } => format!("<h2>{}</h2>", html_escape(text)),
        ReportElement::Paragraph { text } => {
            let text = truncate_chars(text, MAX_PARAGRAPH_CHARS, ELLIPSIS);
            format!("<p>{}</p>", html_escape(&text).replace('\n', "<br>"))
        }
        ReportElement::ListItem { text } => format!("<p>{}</p>", html_escape(text)),
        ReportElement::Table {
            rows,
            highlight_row,
            is_classroom_report,
        } => render_table(rows, *highlight_row, *is_classroom_report),
    }
}

/// Render at most `MAX_TABLE_ROWS` rows. Column 0 is dropped unless this is
/// the classroom report table.
pub fn render_table(
    rows: &[Vec<String>],
    highlight_row: Option<usize>,
    is_classroom_report: bool,
) -> String {
    let skip_columns = if is_classroom_report { 0 } else { 1 };
    let mut html = format!("<table style=\"{}\">", TABLE_STYLE);

    for (idx, row) in rows.iter().take(MAX_TABLE_ROWS).enumerate() {
        if highlight_row == Some(idx) {
            html.push_str(&format!(
                "<tr style=\"background-color:{};\">",
                HIGHLIGHT_COLOR
            ));
        } else {
            html.push_str("<tr>");
        }
        for cell in row.iter().skip(skip_columns) {
            html.push_str(&format!(
                "<td style=\"{}\">{}</td>",
                CELL_STYLE,
                html_escape(cell).replace('\n', "<br>")
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");

    if rows.len() > MAX_TABLE_ROWS {
        html.push_str(&format!("<p><em>{}</em></p>", TRUNCATED_NOTE));
    }
    html
}
