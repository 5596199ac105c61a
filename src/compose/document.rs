use chrono::NaiveDate;

use super::{HIGHLIGHT_COLOR, MENU_HEADING};
use crate::dates::report_title;
use crate::platform::{DocOp, ParagraphStyle, RowHighlight};
use crate::types::{MealPlan, ReportElement};

const SECTION_HEADING_LEVEL: u8 = 2;

/// Label of the menu link when no thumbnail could be rendered.
pub const MENU_LINK_TEXT: &str = "Today's Menu (PDF)";

/// Build the full rewrite of the report document.
///
/// Existing content is cleared first; the title and a spacer line precede
/// the elements, and the menu (image, else link) follows them.
pub fn document_ops(day: NaiveDate, elements: &[ReportElement], meal: &MealPlan) -> Vec<DocOp> {
    let mut ops = vec![
        DocOp::Clear,
        DocOp::Paragraph {
            text: report_title(day),
            style: ParagraphStyle {
                heading: None,
                bold: true,
                centered: true,
            },
        },
        DocOp::Paragraph {
            text: String::new(),
            style: ParagraphStyle::default(),
        },
    ];

    for element in elements {
        match element {
            ReportElement::Heading { text } => ops.push(heading(text)),
            ReportElement::Paragraph { text } => {
                ops.extend(text.split('\n').map(|line| DocOp::Paragraph {
                    text: line.to_string(),
                    style: ParagraphStyle::default(),
                }));
            }
            ReportElement::Table {
                rows,
                highlight_row,
                ..
            } => ops.push(DocOp::Table {
                rows: rows.clone(),
                highlight: highlight_row.map(|row| RowHighlight {
                    row,
                    color: HIGHLIGHT_COLOR.to_string(),
                }),
            }),
            ReportElement::ListItem { text } => ops.push(DocOp::ListItem { text: text.clone() }),
        }
    }

    match meal {
        MealPlan::Image { image, .. } => {
            ops.push(heading(MENU_HEADING));
            ops.push(DocOp::Image {
                image: image.clone(),
            });
        }
        MealPlan::Url(url) => ops.push(DocOp::Link {
            text: MENU_LINK_TEXT.to_string(),
            url: url.clone(),
        }),
        MealPlan::NotFound => {}
    }

    ops
}

fn heading(text: &str) -> DocOp {
    DocOp::Paragraph {
        text: text.to_string(),
        style: ParagraphStyle {
            heading: Some(SECTION_HEADING_LEVEL),
            bold: false,
            centered: false,
        },
    }
}
