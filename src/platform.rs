//! Collaborator seams: mailbox, file storage, documents, outbound mail.
//!
//! The report pipeline only talks to these traits. `crate::google` backs
//! them with Gmail, Drive and Docs; tests back them with in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::google_api::GoogleApiError;
use crate::types::ImageBlob;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{0}")]
    Google(#[from] GoogleApiError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

// ============================================================================
// Mail
// ============================================================================

/// Mailbox search: subject substring within a recency window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailQuery {
    pub subject: String,
    pub newer_than_days: u32,
    pub unread_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
    pub unread: bool,
}

/// A conversation; messages are oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailThread {
    pub messages: Vec<MailMessage>,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Matching threads, newest first.
    async fn search_threads(&self, query: &MailQuery) -> Result<Vec<MailThread>, PlatformError>;

    async fn mark_read(&self, message: &MailMessage) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Address of the account the run acts as.
    async fn current_user(&self) -> Result<String, PlatformError>;

    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), PlatformError>;
}

// ============================================================================
// Files
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Browser link to the file.
    pub url: String,
}

/// A temporary, link-shared copy of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub id: String,
    /// Direct URL usable as an `<img src>` or a Docs inline image source.
    pub url: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn folder(&self, folder_id: &str) -> Result<Folder, PlatformError>;

    /// Files in `folder` whose name is exactly `name`.
    async fn files_named(&self, folder: &Folder, name: &str)
        -> Result<Vec<StoredFile>, PlatformError>;

    /// Files with this title and MIME type, inside `folder_id` when given.
    async fn find_files(
        &self,
        folder_id: Option<&str>,
        title: &str,
        mime_type: &str,
    ) -> Result<Vec<StoredFile>, PlatformError>;

    async fn read_bytes(&self, file: &StoredFile) -> Result<Vec<u8>, PlatformError>;

    /// Render the first page of a PDF as an image. May fail for files the
    /// service has not rendered.
    async fn pdf_thumbnail(&self, file: &StoredFile) -> Result<ImageBlob, PlatformError>;

    /// Persist an image and share it with anyone holding the link.
    async fn stage_shared_image(&self, image: &ImageBlob) -> Result<StagedFile, PlatformError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), PlatformError>;
}

// ============================================================================
// Documents
// ============================================================================

/// Top-level block of a rich-text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Paragraph(String),
    /// Cell text, row by row.
    Table(Vec<Vec<String>>),
    ListItem(String),
    /// Section breaks, tables of contents and anything else without text.
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParagraphStyle {
    /// 1-6 for headings, `None` for body text.
    pub heading: Option<u8>,
    pub bold: bool,
    pub centered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHighlight {
    pub row: usize,
    /// `#RRGGBB`.
    pub color: String,
}

/// One step of rewriting a document, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocOp {
    /// Remove all existing body content.
    Clear,
    Paragraph {
        text: String,
        style: ParagraphStyle,
    },
    Table {
        rows: Vec<Vec<String>>,
        highlight: Option<RowHighlight>,
    },
    ListItem {
        text: String,
    },
    Image {
        image: ImageBlob,
    },
    Link {
        text: String,
        url: String,
    },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read_blocks(&self, document_id: &str) -> Result<Vec<ContentBlock>, PlatformError>;

    async fn rewrite(&self, document_id: &str, ops: &[DocOp]) -> Result<(), PlatformError>;
}

/// The four collaborators one run needs.
#[derive(Clone, Copy)]
pub struct Platform<'a> {
    pub mailbox: &'a dyn Mailbox,
    pub storage: &'a dyn FileStorage,
    pub documents: &'a dyn DocumentStore,
    pub mailer: &'a dyn Mailer,
}
