//! Report run orchestration
//!
//! Two variants share one pipeline:
//! - Manual: run on demand against the current document
//! - MailTriggered: run from a mail check against the fixed target document,
//!   only when an unread classroom report has arrived
//!
//! Any error is caught once here and turned into a single failure email.

pub mod deliver;
pub mod gather;

#[cfg(test)]
mod fakes;

use chrono::{DateTime, NaiveDate, Utc};

use crate::dates::{report_day, report_subject};
use crate::error::DigestError;
use crate::parser::CleanMode;
use crate::platform::{MailMessage, Platform};
use crate::types::{Config, MealPlan, ReportElement};

pub const CLASSROOM_HEADING: &str = "Classroom Report";
pub const LESSON_PLAN_HEADING: &str = "Lesson Plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Manual,
    MailTriggered,
}

impl Variant {
    fn clean_mode(self) -> CleanMode {
        match self {
            Variant::Manual => CleanMode::Plain,
            Variant::MailTriggered => CleanMode::Quoted,
        }
    }

    fn unread_only(self) -> bool {
        self == Variant::MailTriggered
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Delivered {
        document_id: String,
        recipient: String,
    },
    /// Mail-triggered run with no unread report; nothing was written or sent.
    NoNewReport,
    Failed {
        error: DigestError,
        /// Whether the failure email went out.
        notified: bool,
    },
}

/// Run against `document_id`, else the configured current document, else
/// the target document.
pub async fn run_manual(
    config: &Config,
    platform: Platform<'_>,
    document_id: Option<&str>,
    now: DateTime<Utc>,
) -> RunOutcome {
    let document_id = document_id
        .or(config.current_document_id.as_deref())
        .unwrap_or(&config.target_document_id)
        .to_string();
    run(config, platform, Variant::Manual, &document_id, now).await
}

/// Run against the target document if an unread report has arrived.
pub async fn run_on_mail(config: &Config, platform: Platform<'_>, now: DateTime<Utc>) -> RunOutcome {
    let document_id = config.target_document_id.clone();
    run(config, platform, Variant::MailTriggered, &document_id, now).await
}

async fn run(
    config: &Config,
    platform: Platform<'_>,
    variant: Variant,
    document_id: &str,
    now: DateTime<Utc>,
) -> RunOutcome {
    log::info!("Starting {:?} report run for document {}", variant, document_id);

    match produce(config, platform, variant, document_id, now).await {
        Ok(Some(recipient)) => RunOutcome::Delivered {
            document_id: document_id.to_string(),
            recipient,
        },
        Ok(None) => {
            log::info!("No new classroom report; nothing to do");
            RunOutcome::NoNewReport
        }
        Err(error) => {
            log::error!("Report run failed: {}", error);
            // the configured timezone may be what failed
            let day = report_day(now, config.tz().unwrap_or(chrono_tz::Tz::UTC));
            let notified = deliver::send_failure_email(
                platform.mailer,
                config.recipient.as_deref(),
                day,
                &error,
            )
            .await;
            RunOutcome::Failed { error, notified }
        }
    }
}

/// The whole pipeline. `Ok(None)` when a mail-triggered run finds no report.
async fn produce(
    config: &Config,
    platform: Platform<'_>,
    variant: Variant,
    document_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, DigestError> {
    let day = report_day(now, config.tz()?);
    let subject = report_subject(day);

    let report = gather::find_report(
        platform.mailbox,
        &subject,
        config.search_window_days,
        variant.unread_only(),
    )
    .await?;
    if report.is_none() && variant == Variant::MailTriggered {
        return Ok(None);
    }

    let meal = gather::meal_plan(platform.storage, config.meal_plan_folder_id.as_deref(), day).await;
    let elements = report_elements(
        config,
        platform,
        variant,
        day,
        &subject,
        report.as_ref().map(|r| &r.message),
        &meal,
    )
    .await;

    deliver::write_document(platform.documents, document_id, day, &elements, &meal).await?;

    let recipient = deliver::resolve_recipient(platform.mailer, config.recipient.as_deref()).await?;
    deliver::send_report_email(platform, &recipient, day, &elements, &meal).await?;

    if let Some(report) = report.as_ref().filter(|_| variant == Variant::MailTriggered) {
        deliver::mark_reports_read(platform.mailbox, &report.matching).await;
    }

    log::info!("Report for {} delivered to {}", day, recipient);
    Ok(Some(recipient))
}

/// Classroom report section, then lesson plan section, then a note when the
/// menu is missing.
async fn report_elements(
    config: &Config,
    platform: Platform<'_>,
    variant: Variant,
    day: NaiveDate,
    subject: &str,
    report: Option<&MailMessage>,
    meal: &MealPlan,
) -> Vec<ReportElement> {
    let mut elements = vec![ReportElement::heading(CLASSROOM_HEADING)];
    match report {
        Some(message) => {
            log::info!("Using classroom report {}", message.id);
            elements.push(gather::report_element(message, variant.clean_mode()));
        }
        None => elements.push(ReportElement::paragraph(format!(
            "No classroom report found for \"{}\".",
            subject
        ))),
    }

    elements.push(ReportElement::heading(LESSON_PLAN_HEADING));
    elements.extend(
        gather::lesson_plan_elements(
            platform.storage,
            platform.documents,
            &config.lesson_plan_folder_id,
            day,
        )
        .await,
    );

    if *meal == MealPlan::NotFound {
        elements.push(gather::missing_menu_element(day));
    }
    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ContentBlock, DocOp};
    use crate::types::ImageBlob;
    use chrono::TimeZone;
    use super::fakes::FakeWorkspace;

    const SUBJECT: &str = "Classroom Report for Monday [19 Oct 2026]";
    const REPORT_BODY: &str = "> 8:57 AM **Arrived** happy\n> 10:30 AM Snack: apples\nPowered by NeatSchool - https://www.neatschool.net";

    fn config() -> Config {
        serde_json::from_str(
            r#"{
                "lessonPlanFolderId": "lp",
                "targetDocumentId": "target-doc",
                "currentDocumentId": "current-doc"
            }"#,
        )
        .unwrap()
    }

    /// Monday 2026-10-19, 09:00 in Los Angeles.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 16, 0, 0).unwrap()
    }

    fn workspace() -> FakeWorkspace {
        let mut ws = FakeWorkspace::new("parent@example.com");
        ws.add_folder("lp", "Lesson Plans");
        ws.add_file(
            "lp",
            "plan-doc",
            "R.C. Lesson Plan 10-19-26",
            "application/vnd.google-apps.document",
        );
        ws.documents.insert(
            "plan-doc".to_string(),
            vec![ContentBlock::Table(vec![
                vec!["Day".to_string(), "Focus".to_string()],
                vec!["Mon".to_string(), "Leaves".to_string()],
            ])],
        );
        ws.add_file(
            "menus",
            "menu-pdf",
            "October 2026 MAC Menu NV & V PDF.pdf",
            "application/pdf",
        );
        ws.thumbnails.insert(
            "menu-pdf".to_string(),
            ImageBlob {
                name: "menu.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![7],
            },
        );
        ws
    }

    #[tokio::test]
    async fn test_mail_run_delivers_and_marks_read() {
        let mut ws = workspace();
        ws.add_message("m1", SUBJECT, REPORT_BODY, true);

        let outcome = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(
            &outcome,
            RunOutcome::Delivered { document_id, recipient }
                if document_id == "target-doc" && recipient == "parent@example.com"
        ));

        let rewrites = ws.rewrites();
        assert_eq!(rewrites.len(), 1);
        let (doc_id, ops) = &rewrites[0];
        assert_eq!(doc_id, "target-doc");
        assert_eq!(ops[0], DocOp::Clear);
        assert!(ops.iter().any(|op| matches!(
            op,
            DocOp::Table { rows, highlight: None }
                if rows[1] == vec!["8:57 AM".to_string(), "Arrived happy".to_string()]
                    && rows[2] == vec!["10:30 AM".to_string(), "Snack: apples".to_string()]
        )));
        assert!(ops.iter().any(|op| matches!(
            op,
            DocOp::Table { highlight: Some(h), .. } if h.row == 1
        )));
        assert!(matches!(ops.last(), Some(DocOp::Image { .. })));

        let sent = ws.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Daily School Report - Monday, October 19, 2026");
        assert_eq!(ws.marked_read(), vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_mail_run_without_unread_report_does_nothing() {
        let mut ws = workspace();
        ws.add_message("m1", SUBJECT, REPORT_BODY, false);

        let outcome = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(outcome, RunOutcome::NoNewReport));
        assert!(ws.rewrites().is_empty());
        assert!(ws.sent().is_empty());
        assert!(ws.marked_read().is_empty());
    }

    #[tokio::test]
    async fn test_manual_run_without_report_still_composes() {
        let ws = workspace();

        let outcome = run_manual(&config(), ws.platform(), None, now()).await;
        assert!(matches!(
            &outcome,
            RunOutcome::Delivered { document_id, .. } if document_id == "current-doc"
        ));

        let (_, ops) = &ws.rewrites()[0];
        assert!(ops.iter().any(|op| matches!(
            op,
            DocOp::Paragraph { text, .. } if text.starts_with("No classroom report found")
        )));
        assert!(ws.marked_read().is_empty());
    }

    #[tokio::test]
    async fn test_manual_run_document_override_keeps_quotes() {
        let mut ws = workspace();
        ws.add_message("m1", SUBJECT, "8:57 AM *Arrived*", false);

        run_manual(&config(), ws.platform(), Some("other-doc"), now()).await;
        let (doc_id, ops) = &ws.rewrites()[0];
        assert_eq!(doc_id, "other-doc");
        assert!(ops.iter().any(|op| matches!(
            op,
            DocOp::Table { rows, .. } if rows.get(1) == Some(&vec!["8:57 AM".to_string(), "*Arrived*".to_string()])
        )));
    }

    #[tokio::test]
    async fn test_missing_menu_adds_note() {
        let mut ws = workspace();
        ws.files.retain(|(_, f)| f.id != "menu-pdf");

        run_manual(&config(), ws.platform(), None, now()).await;
        let (_, ops) = &ws.rewrites()[0];
        assert!(ops.iter().any(|op| matches!(
            op,
            DocOp::Paragraph { text, .. } if text.starts_with("Today's menu was not found")
        )));
        assert!(!ops.iter().any(|op| matches!(op, DocOp::Image { .. } | DocOp::Link { .. })));
    }

    #[tokio::test]
    async fn test_failure_sends_one_email_and_leaves_unread() {
        let mut ws = workspace();
        ws.add_message("m1", SUBJECT, REPORT_BODY, true);
        ws.fail_rewrite = true;

        let outcome = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(
            &outcome,
            RunOutcome::Failed { error: DigestError::NotFound(_), notified: true }
        ));

        let sent = ws.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.starts_with("Daily School Report FAILED"));
        assert!(ws.marked_read().is_empty());
    }

    #[tokio::test]
    async fn test_mail_run_marks_every_unread_report() {
        let mut ws = workspace();
        ws.add_message("older", SUBJECT, "8:00 AM Early drop-off", true);
        ws.add_message("newer", SUBJECT, REPORT_BODY, true);

        let first = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(first, RunOutcome::Delivered { .. }));
        assert_eq!(
            ws.marked_read(),
            vec!["newer".to_string(), "older".to_string()]
        );
        let (_, ops) = &ws.rewrites()[0];
        assert!(!ops.iter().any(|op| matches!(
            op,
            DocOp::Table { rows, .. } if rows.iter().any(|r| r.iter().any(|c| c.contains("Early")))
        )));

        for thread in &mut ws.threads {
            for message in &mut thread.messages {
                message.unread = false;
            }
        }
        let second = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(second, RunOutcome::NoNewReport));
        assert_eq!(ws.rewrites().len(), 1);
        assert_eq!(ws.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_failure_still_delivered() {
        let mut ws = workspace();
        ws.add_message("m1", SUBJECT, REPORT_BODY, true);
        ws.fail_mark_read = true;

        let outcome = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(outcome, RunOutcome::Delivered { .. }));

        let sent = ws.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Daily School Report - Monday, October 19, 2026");
        assert!(ws.marked_read().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_reported() {
        let mut ws = workspace();
        ws.fail_search = true;

        let outcome = run_manual(&config(), ws.platform(), None, now()).await;
        assert!(matches!(outcome, RunOutcome::Failed { notified: true, .. }));
        assert!(ws.rewrites().is_empty());
    }

    #[tokio::test]
    async fn test_unnotified_failure() {
        let mut ws = workspace();
        ws.fail_search = true;
        ws.fail_send = true;

        let outcome = run_on_mail(&config(), ws.platform(), now()).await;
        assert!(matches!(outcome, RunOutcome::Failed { notified: false, .. }));
    }
}
