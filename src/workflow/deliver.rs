//! Output side of a run: rewrite the report document, send the emails.

use chrono::NaiveDate;

use crate::compose::document::document_ops;
use crate::compose::email::{
    failure_subject, render_failure_email, render_report_email, report_subject, MenuEmbed,
};
use crate::error::DigestError;
use crate::platform::{DocumentStore, FileStorage, MailMessage, Mailbox, Mailer, Platform};
use crate::types::{MealPlan, ReportElement};

/// Replace the document's content with the composed report.
pub async fn write_document(
    documents: &dyn DocumentStore,
    document_id: &str,
    day: NaiveDate,
    elements: &[ReportElement],
    meal: &MealPlan,
) -> Result<(), DigestError> {
    let ops = document_ops(day, elements, meal);
    documents.rewrite(document_id, &ops).await?;
    log::info!("Wrote {} operations to document {}", ops.len(), document_id);
    Ok(())
}

/// Configured recipient, else the account the run acts as.
pub async fn resolve_recipient(
    mailer: &dyn Mailer,
    configured: Option<&str>,
) -> Result<String, DigestError> {
    match configured {
        Some(to) => Ok(to.to_string()),
        None => Ok(mailer.current_user().await?),
    }
}

/// Render and send the report email.
///
/// A menu image is staged as a link-shared file for embedding and the
/// staged copy is deleted as soon as the HTML is rendered. If staging
/// fails the menu is linked instead.
pub async fn send_report_email(
    platform: Platform<'_>,
    to: &str,
    day: NaiveDate,
    elements: &[ReportElement],
    meal: &MealPlan,
) -> Result<(), DigestError> {
    let (menu, staged_id) = menu_embed(platform.storage, meal).await;
    let html = render_report_email(day, elements, &menu);

    if let Some(id) = staged_id {
        if let Err(e) = platform.storage.delete_file(&id).await {
            log::warn!("Failed to delete staged menu image {}: {}", id, e);
        }
    }

    platform
        .mailer
        .send_html(to, &report_subject(day), &html)
        .await?;
    Ok(())
}

/// Mark delivered report messages read. Failures are logged; the report
/// already went out.
pub async fn mark_reports_read(mailbox: &dyn Mailbox, messages: &[MailMessage]) {
    for message in messages {
        match mailbox.mark_read(message).await {
            Ok(()) => log::debug!("Marked report message {} read", message.id),
            Err(e) => log::warn!("Failed to mark report message {} read: {}", message.id, e),
        }
    }
}

/// How the menu is shown in the email, plus the staged file to clean up.
async fn menu_embed(storage: &dyn FileStorage, meal: &MealPlan) -> (MenuEmbed, Option<String>) {
    match meal {
        MealPlan::Image { image, url } => match storage.stage_shared_image(image).await {
            Ok(staged) => (MenuEmbed::Image(staged.url), Some(staged.id)),
            Err(e) => {
                log::warn!("Could not stage menu image, linking instead: {}", e);
                (MenuEmbed::Link(url.clone()), None)
            }
        },
        MealPlan::Url(url) => (MenuEmbed::Link(url.clone()), None),
        MealPlan::NotFound => (MenuEmbed::Omitted, None),
    }
}

/// Send the single failure notification. Returns whether it went out.
pub async fn send_failure_email(
    mailer: &dyn Mailer,
    configured_recipient: Option<&str>,
    day: NaiveDate,
    error: &DigestError,
) -> bool {
    let to = match resolve_recipient(mailer, configured_recipient).await {
        Ok(to) => to,
        Err(e) => {
            log::error!("No recipient for the failure email: {}", e);
            return false;
        }
    };
    let html = render_failure_email(day, &error.to_string(), &error.failure_hint());
    match mailer.send_html(&to, &failure_subject(day), &html).await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to send the failure email: {}", e);
            false
        }
    }
}
