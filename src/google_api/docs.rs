//! Docs API v1: read a document's structure and rewrite its body.
//!
//! Docs addresses content by UTF-16 offset. The writer keeps a cursor at
//! the start of the body's final (empty) paragraph and inserts everything
//! there, so most offsets can be computed locally. Tables are the exception:
//! their cell offsets are read back from the document after insertion.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{check_status, GoogleApiError};
use crate::platform::{ContentBlock, DocOp, ParagraphStyle, RowHighlight};
use crate::util::utf16_len;

const DOCS_BASE: &str = "https://docs.googleapis.com/v1/documents";
const BULLET_PRESET: &str = "BULLET_DISC_CIRCLE_SQUARE";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    body: Body,
}

#[derive(Debug, Default, Deserialize)]
struct Body {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuralElement {
    #[serde(default)]
    start_index: i64,
    #[serde(default)]
    end_index: i64,
    #[serde(default)]
    paragraph: Option<Paragraph>,
    #[serde(default)]
    table: Option<Table>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
    #[serde(default)]
    bullet: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphElement {
    #[serde(default)]
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Table {
    #[serde(default)]
    table_rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableRow {
    #[serde(default)]
    table_cells: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

impl Paragraph {
    /// Text without the paragraph's closing newline. Soft line breaks
    /// (vertical tab in the API) become `\n`.
    fn text(&self) -> String {
        let raw: String = self
            .elements
            .iter()
            .filter_map(|e| e.text_run.as_ref())
            .map(|run| run.content.as_str())
            .collect();
        raw.trim_end_matches('\n').replace('\u{000B}', "\n")
    }
}

impl TableCell {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|e| e.paragraph.as_ref())
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

impl Document {
    /// Offset just past the body's last element.
    pub fn end_index(&self) -> i64 {
        self.body.content.last().map(|e| e.end_index).unwrap_or(1)
    }

    /// Top-level blocks in document order.
    pub fn content_blocks(&self) -> Vec<ContentBlock> {
        self.body
            .content
            .iter()
            .map(|element| match (&element.paragraph, &element.table) {
                (Some(p), _) if p.bullet.is_some() => ContentBlock::ListItem(p.text()),
                (Some(p), _) => ContentBlock::Paragraph(p.text()),
                (None, Some(table)) => ContentBlock::Table(
                    table
                        .table_rows
                        .iter()
                        .map(|row| row.table_cells.iter().map(TableCell::text).collect())
                        .collect(),
                ),
                (None, None) => ContentBlock::Other,
            })
            .collect()
    }

    /// The table inserted at `cursor`: Docs puts a newline before it, so it
    /// normally starts at `cursor + 1`.
    fn table_inserted_at(&self, cursor: i64) -> Option<&StructuralElement> {
        let tables = || self.body.content.iter().filter(|e| e.table.is_some());
        tables()
            .find(|e| e.start_index == cursor + 1)
            .or_else(|| tables().find(|e| e.start_index >= cursor))
    }
}

// ============================================================================
// API calls
// ============================================================================

pub async fn get_document(
    client: &reqwest::Client,
    access_token: &str,
    document_id: &str,
) -> Result<Document, GoogleApiError> {
    let resp = client
        .get(format!("{}/{}", DOCS_BASE, document_id))
        .bearer_auth(access_token)
        .send()
        .await?;
    Ok(check_status(resp).await?.json().await?)
}

pub async fn batch_update(
    client: &reqwest::Client,
    access_token: &str,
    document_id: &str,
    requests: Vec<Value>,
) -> Result<(), GoogleApiError> {
    if requests.is_empty() {
        return Ok(());
    }
    log::debug!(
        "Docs batchUpdate on {} with {} requests",
        document_id,
        requests.len()
    );
    let resp = client
        .post(format!("{}/{}:batchUpdate", DOCS_BASE, document_id))
        .bearer_auth(access_token)
        .json(&json!({ "requests": requests }))
        .send()
        .await?;
    check_status(resp).await?;
    Ok(())
}

/// Apply `ops` to the document body in order.
///
/// `image_uris` supplies a publicly readable source for each `DocOp::Image`,
/// in the same order the image ops appear.
pub async fn rewrite_document(
    client: &reqwest::Client,
    access_token: &str,
    document_id: &str,
    ops: &[DocOp],
    image_uris: &[String],
) -> Result<(), GoogleApiError> {
    let mut doc = get_document(client, access_token, document_id).await?;
    let mut cursor = doc.end_index() - 1;
    let mut pending: Vec<Value> = Vec::new();
    let mut uris = image_uris.iter();

    for op in ops {
        match op {
            DocOp::Clear => {
                if !pending.is_empty() {
                    batch_update(client, access_token, document_id, std::mem::take(&mut pending))
                        .await?;
                    doc = get_document(client, access_token, document_id).await?;
                }
                pending.extend(clear_request(doc.end_index()));
                cursor = 1;
            }
            DocOp::Paragraph { text, style } => {
                cursor = push_paragraph(&mut pending, cursor, text, *style);
            }
            DocOp::ListItem { text } => {
                cursor = push_list_item(&mut pending, cursor, text);
            }
            DocOp::Link { text, url } => {
                cursor = push_link(&mut pending, cursor, text, url);
            }
            DocOp::Image { .. } => {
                let uri = uris.next().ok_or_else(|| {
                    GoogleApiError::UnexpectedResponse("image op without a staged image".into())
                })?;
                cursor = push_image(&mut pending, cursor, uri);
            }
            DocOp::Table { rows, highlight } => {
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
                if rows.is_empty() || columns == 0 {
                    continue;
                }
                pending.push(json!({
                    "insertTable": {
                        "rows": rows.len(),
                        "columns": columns,
                        "location": { "index": cursor }
                    }
                }));
                batch_update(client, access_token, document_id, std::mem::take(&mut pending))
                    .await?;

                doc = get_document(client, access_token, document_id).await?;
                let fill = table_fill_requests(&doc, cursor, rows, highlight.as_ref())?;
                batch_update(client, access_token, document_id, fill).await?;

                doc = get_document(client, access_token, document_id).await?;
                cursor = doc.end_index() - 1;
            }
        }
    }

    batch_update(client, access_token, document_id, pending).await
}

// ============================================================================
// Request builders
// ============================================================================

fn range(start: i64, end: i64) -> Value {
    json!({ "startIndex": start, "endIndex": end })
}

/// Delete everything but the body's final newline.
fn clear_request(end_index: i64) -> Option<Value> {
    if end_index - 1 > 1 {
        Some(json!({ "deleteContentRange": { "range": range(1, end_index - 1) } }))
    } else {
        None
    }
}

/// Insert `text` as its own paragraph at `cursor`; returns the new cursor.
fn push_paragraph(requests: &mut Vec<Value>, cursor: i64, text: &str, style: ParagraphStyle) -> i64 {
    let inserted = format!("{}\n", text);
    let len = utf16_len(&inserted);
    let named_style = match style.heading {
        Some(level) => format!("HEADING_{}", level.clamp(1, 6)),
        None => "NORMAL_TEXT".to_string(),
    };

    requests.push(json!({
        "insertText": { "location": { "index": cursor }, "text": inserted }
    }));
    requests.push(json!({
        "updateParagraphStyle": {
            "range": range(cursor, cursor + len),
            "paragraphStyle": {
                "namedStyleType": named_style,
                "alignment": if style.centered { "CENTER" } else { "START" }
            },
            "fields": "namedStyleType,alignment"
        }
    }));
    if len > 1 {
        requests.push(json!({
            "updateTextStyle": {
                "range": range(cursor, cursor + len - 1),
                "textStyle": { "bold": style.bold },
                "fields": "bold"
            }
        }));
    }
    cursor + len
}

fn push_list_item(requests: &mut Vec<Value>, cursor: i64, text: &str) -> i64 {
    let next = push_paragraph(requests, cursor, text, ParagraphStyle::default());
    requests.push(json!({
        "createParagraphBullets": {
            "range": range(cursor, next),
            "bulletPreset": BULLET_PRESET
        }
    }));
    next
}

fn push_link(requests: &mut Vec<Value>, cursor: i64, text: &str, url: &str) -> i64 {
    let next = push_paragraph(requests, cursor, text, ParagraphStyle::default());
    if next - cursor > 1 {
        requests.push(json!({
            "updateTextStyle": {
                "range": range(cursor, next - 1),
                "textStyle": { "link": { "url": url } },
                "fields": "link"
            }
        }));
    }
    next
}

/// An image alone in a new paragraph.
fn push_image(requests: &mut Vec<Value>, cursor: i64, uri: &str) -> i64 {
    requests.push(json!({
        "insertText": { "location": { "index": cursor }, "text": "\n" }
    }));
    requests.push(json!({
        "insertInlineImage": { "location": { "index": cursor }, "uri": uri }
    }));
    cursor + 2
}

/// Cell text and highlight for a freshly inserted, empty table.
///
/// Cell inserts run from the end of the table backwards so earlier offsets
/// stay valid within the batch.
fn table_fill_requests(
    doc: &Document,
    cursor: i64,
    rows: &[Vec<String>],
    highlight: Option<&RowHighlight>,
) -> Result<Vec<Value>, GoogleApiError> {
    let element = doc.table_inserted_at(cursor).ok_or_else(|| {
        GoogleApiError::UnexpectedResponse(format!("inserted table not found after {}", cursor))
    })?;
    let table = element
        .table
        .as_ref()
        .ok_or_else(|| GoogleApiError::UnexpectedResponse("element is not a table".into()))?;

    let mut requests = Vec::new();

    if let Some(highlight) = highlight {
        let columns = table
            .table_rows
            .get(highlight.row)
            .map(|r| r.table_cells.len())
            .unwrap_or(0);
        if let (Some(color), true) = (rgb_color(&highlight.color), columns > 0) {
            requests.push(json!({
                "updateTableCellStyle": {
                    "tableRange": {
                        "tableCellLocation": {
                            "tableStartLocation": { "index": element.start_index },
                            "rowIndex": highlight.row,
                            "columnIndex": 0
                        },
                        "rowSpan": 1,
                        "columnSpan": columns
                    },
                    "tableCellStyle": { "backgroundColor": { "color": { "rgbColor": color } } },
                    "fields": "backgroundColor"
                }
            }));
        }
    }

    let mut inserts: Vec<(i64, &str)> = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let start = table
                .table_rows
                .get(row_idx)
                .and_then(|r| r.table_cells.get(col_idx))
                .and_then(|c| c.content.first())
                .map(|p| p.start_index)
                .ok_or_else(|| {
                    GoogleApiError::UnexpectedResponse(format!(
                        "table cell ({}, {}) missing",
                        row_idx, col_idx
                    ))
                })?;
            inserts.push((start, text.as_str()));
        }
    }
    inserts.sort_by(|a, b| b.0.cmp(&a.0));
    requests.extend(inserts.into_iter().map(|(index, text)| {
        json!({ "insertText": { "location": { "index": index }, "text": text } })
    }));

    Ok(requests)
}

/// `#RRGGBB` → Docs `rgbColor` with 0.0–1.0 channels.
fn rgb_color(hex: &str) -> Option<Value> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 2)?, 16)
            .ok()
            .map(|v| v as f64 / 255.0)
    };
    Some(json!({ "red": channel(0)?, "green": channel(2)?, "blue": channel(4)? }))
}
