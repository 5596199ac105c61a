use serde::{Deserialize, Serialize};

use crate::error::DigestError;

/// Run configuration, loaded from `~/.schooldigest/config.json`.
///
/// IDs are opaque Google Drive/Docs identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Folder holding the weekly "R.C. Lesson Plan MM-DD-YY" documents.
    pub lesson_plan_folder_id: String,
    /// Folder holding the monthly menu PDFs. Searched Drive-wide when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan_folder_id: Option<String>,
    /// Document rewritten by the mail-triggered run.
    pub target_document_id: String,
    /// Document rewritten by a manual run when `--document` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_document_id: Option<String>,
    /// IANA timezone used for "today" and the report subject.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Report recipient. Defaults to the authenticated account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default = "default_search_window_days")]
    pub search_window_days: u32,
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

fn default_search_window_days() -> u32 {
    1
}

impl Config {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz, DigestError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            DigestError::Configuration(format!("Unknown timezone: {}", self.timezone))
        })
    }

    /// Reject configs that cannot possibly produce a report.
    pub fn validate(&self) -> Result<(), DigestError> {
        if self.lesson_plan_folder_id.trim().is_empty() {
            return Err(DigestError::Configuration(
                "lessonPlanFolderId is empty".to_string(),
            ));
        }
        if self.target_document_id.trim().is_empty() {
            return Err(DigestError::Configuration(
                "targetDocumentId is empty".to_string(),
            ));
        }
        if self.search_window_days == 0 {
            return Err(DigestError::Configuration(
                "searchWindowDays must be at least 1".to_string(),
            ));
        }
        self.tz()?;
        Ok(())
    }
}

/// One renderable piece of the report, independent of the output sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportElement {
    Heading {
        text: String,
    },
    /// May contain `\n`; each line is emitted as its own paragraph.
    Paragraph {
        text: String,
    },
    Table {
        rows: Vec<Vec<String>>,
        /// Row drawn with the highlight background. Always a valid index into `rows`.
        highlight_row: Option<usize>,
        /// The classroom report keeps its first (time) column in the email.
        is_classroom_report: bool,
    },
    ListItem {
        text: String,
    },
}

impl ReportElement {
    pub fn heading(text: impl Into<String>) -> Self {
        ReportElement::Heading { text: text.into() }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        ReportElement::Paragraph { text: text.into() }
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        ReportElement::ListItem { text: text.into() }
    }

    /// Build a table element. A highlight index outside `rows` is dropped.
    pub fn table(
        rows: Vec<Vec<String>>,
        highlight_row: Option<usize>,
        is_classroom_report: bool,
    ) -> Self {
        let highlight_row = highlight_row.filter(|&idx| idx < rows.len());
        ReportElement::Table {
            rows,
            highlight_row,
            is_classroom_report,
        }
    }
}

/// Raw image bytes plus the metadata needed to re-upload them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Where today's menu came from, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealPlan {
    /// Rendered thumbnail of the menu PDF, plus the PDF's own link.
    Image { image: ImageBlob, url: String },
    /// Thumbnail unavailable; only the PDF link is known.
    Url(String),
    NotFound,
}

impl MealPlan {
    pub fn url(&self) -> Option<&str> {
        match self {
            MealPlan::Image { url, .. } | MealPlan::Url(url) => Some(url),
            MealPlan::NotFound => None,
        }
    }
}
