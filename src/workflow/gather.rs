//! Inputs of a report run: the classroom email, the lesson plan, the menu.

use chrono::{Datelike, NaiveDate};

use crate::dates::{lesson_plan_name, meal_plan_name};
use crate::error::DigestError;
use crate::extract::extract_document_elements;
use crate::markup::{extract_html_table, normalize_html};
use crate::parser::{report_table, CleanMode};
use crate::platform::{DocumentStore, FileStorage, MailMessage, MailQuery, MailThread, Mailbox, StoredFile};
use crate::types::{ImageBlob, MealPlan, ReportElement};

const PDF_MIME: &str = "application/pdf";

/// The report message for the day, with every message that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMail {
    /// Newest match; its body becomes the report.
    pub message: MailMessage,
    /// All matches, newest first. A mail-triggered run marks each one read.
    pub matching: Vec<MailMessage>,
}

/// Newest message whose subject contains `subject`, plus all other matches.
///
/// Search errors propagate; an empty search is `Ok(None)`.
pub async fn find_report(
    mailbox: &dyn Mailbox,
    subject: &str,
    newer_than_days: u32,
    unread_only: bool,
) -> Result<Option<ReportMail>, DigestError> {
    let query = MailQuery {
        subject: subject.to_string(),
        newer_than_days,
        unread_only,
    };
    let threads = mailbox.search_threads(&query).await?;
    log::debug!("{} threads match {:?}", threads.len(), subject);

    let matching = matching_messages(threads, subject, unread_only);
    Ok(matching.first().cloned().map(|message| ReportMail { message, matching }))
}

/// Matching messages, newest first.
///
/// Threads arrive newest first and hold their messages oldest first.
pub fn matching_messages(
    threads: Vec<MailThread>,
    subject: &str,
    unread_only: bool,
) -> Vec<MailMessage> {
    threads
        .into_iter()
        .flat_map(|thread| thread.messages.into_iter().rev())
        .filter(|m| m.subject.contains(subject) && (!unread_only || m.unread))
        .collect()
}

/// Classroom report table from a message. The plain-text part is preferred;
/// HTML-only messages are flattened first.
pub fn report_element(message: &MailMessage, mode: CleanMode) -> ReportElement {
    if !message.html_body.is_empty() {
        if let Some(rows) = extract_html_table(&message.html_body) {
            log::debug!("Report HTML carries a {}-row table", rows.len());
        }
    }
    let text = if message.plain_body.trim().is_empty() {
        normalize_html(&message.html_body)
    } else {
        message.plain_body.clone()
    };
    report_table(&text, mode)
}

/// This week's lesson plan as report elements.
///
/// Lookup problems become a single explanatory paragraph so the rest of the
/// report still goes out.
pub async fn lesson_plan_elements(
    storage: &dyn FileStorage,
    documents: &dyn DocumentStore,
    folder_id: &str,
    day: NaiveDate,
) -> Vec<ReportElement> {
    let name = lesson_plan_name(day);

    let folder = match storage.folder(folder_id).await {
        Ok(folder) => folder,
        Err(e) => {
            log::warn!("Lesson plan folder {} not accessible: {}", folder_id, e);
            return vec![ReportElement::paragraph(format!(
                "Lesson plan folder is not accessible: {}",
                e
            ))];
        }
    };

    let files = match storage.files_named(&folder, &name).await {
        Ok(files) => files,
        Err(e) => {
            log::warn!("Searching {} for {} failed: {}", folder.name, name, e);
            return vec![ReportElement::paragraph(format!(
                "Could not search \"{}\" for \"{}\": {}",
                folder.name, name, e
            ))];
        }
    };

    match files.first() {
        Some(file) => {
            log::info!("Using lesson plan {} ({})", file.name, file.id);
            extract_document_elements(documents, &file.id, day.weekday()).await
        }
        None => {
            log::warn!("Lesson plan {} not found in {}", name, folder.name);
            vec![ReportElement::paragraph(format!(
                "Lesson plan \"{}\" was not found in \"{}\".",
                name, folder.name
            ))]
        }
    }
}

/// This month's menu: a rendered image when possible, else its link.
///
/// With a menu folder configured, the file is looked up by exact name there
/// and may be an image itself; otherwise Drive is searched for the PDF.
pub async fn meal_plan(
    storage: &dyn FileStorage,
    folder_id: Option<&str>,
    day: NaiveDate,
) -> MealPlan {
    let name = meal_plan_name(day);

    let found = match folder_id {
        Some(id) => match storage.folder(id).await {
            Ok(folder) => storage.files_named(&folder, &name).await,
            Err(e) => Err(e),
        },
        None => storage.find_files(None, &name, PDF_MIME).await,
    };
    let file = match found {
        Ok(files) => match files.into_iter().next() {
            Some(file) => file,
            None => {
                log::info!("Menu {} not found", name);
                return MealPlan::NotFound;
            }
        },
        Err(e) => {
            log::warn!("Menu lookup for {} failed: {}", name, e);
            return MealPlan::NotFound;
        }
    };

    match menu_image(storage, &file).await {
        Some(image) => MealPlan::Image {
            image,
            url: file.url,
        },
        None => MealPlan::Url(file.url),
    }
}

async fn menu_image(storage: &dyn FileStorage, file: &StoredFile) -> Option<ImageBlob> {
    let result = if file.mime_type.starts_with("image/") {
        storage.read_bytes(file).await.map(|bytes| ImageBlob {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            bytes,
        })
    } else {
        storage.pdf_thumbnail(file).await
    };
    match result {
        Ok(image) => Some(image),
        Err(e) => {
            log::debug!("No image for {}, linking instead: {}", file.name, e);
            None
        }
    }
}

/// Paragraph standing in for a menu that could not be found.
pub fn missing_menu_element(day: NaiveDate) -> ReportElement {
    ReportElement::paragraph(format!(
        "Today's menu was not found (looked for \"{}\").",
        meal_plan_name(day)
    ))
}
