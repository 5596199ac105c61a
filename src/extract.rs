//! Lesson plan document → report elements.

use chrono::Weekday;

use crate::dates::weekday_abbrev;
use crate::platform::{ContentBlock, DocumentStore};
use crate::types::ReportElement;

/// Read a document and map its blocks to report elements.
///
/// Never fails: a read error becomes a single paragraph describing it, so
/// the rest of the report still goes out.
pub async fn extract_document_elements(
    documents: &dyn DocumentStore,
    document_id: &str,
    weekday: Weekday,
) -> Vec<ReportElement> {
    match documents.read_blocks(document_id).await {
        Ok(blocks) => {
            log::debug!(
                "Read {} blocks from document {}",
                blocks.len(),
                document_id
            );
            elements_from_blocks(blocks, weekday)
        }
        Err(e) => {
            log::warn!("Failed to read document {}: {}", document_id, e);
            vec![ReportElement::paragraph(format!(
                "Could not read the lesson plan: {}",
                e
            ))]
        }
    }
}

/// Map blocks in document order. Only `Other` blocks are dropped; empty
/// paragraphs are kept.
pub fn elements_from_blocks(blocks: Vec<ContentBlock>, weekday: Weekday) -> Vec<ReportElement> {
    blocks
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Paragraph(text) => Some(ReportElement::paragraph(text)),
            ContentBlock::Table(rows) => {
                let highlight = weekday_highlight_row(&rows, weekday);
                Some(ReportElement::table(rows, highlight, false))
            }
            ContentBlock::ListItem(text) => Some(ReportElement::list_item(format!("- {}", text))),
            ContentBlock::Other => None,
        })
        .collect()
}

/// Index of the row whose first cell starts with today's weekday
/// abbreviation. When several rows match, the last one wins.
pub fn weekday_highlight_row(rows: &[Vec<String>], weekday: Weekday) -> Option<usize> {
    let abbrev = weekday_abbrev(weekday);
    let mut highlight = None;
    for (idx, row) in rows.iter().enumerate() {
        let matches = row
            .first()
            .map(|cell| cell.trim().to_lowercase().starts_with(&abbrev))
            .unwrap_or(false);
        if matches {
            highlight = Some(idx);
        }
    }
    highlight
}
