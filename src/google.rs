//! Gmail, Drive and Docs behind the platform traits.
//!
//! One `GoogleWorkspace` holds a single access token for the whole run.
//! Tokens last an hour and a run takes seconds, so it is fetched (and
//! refreshed if needed) once in `connect`.

use async_trait::async_trait;

use crate::google_api::{self, docs, drive, gmail, GoogleApiError};
use crate::platform::{
    ContentBlock, DocOp, DocumentStore, FileStorage, Folder, MailMessage, MailQuery, MailThread,
    Mailbox, Mailer, PlatformError, StagedFile, StoredFile,
};
use crate::types::ImageBlob;

/// Threads fetched per search. A daily report thread is rarely more than one.
const MAX_THREADS: u32 = 10;

pub struct GoogleWorkspace {
    client: reqwest::Client,
    access_token: String,
}

impl GoogleWorkspace {
    /// Load the stored token, refreshing it if it is about to expire.
    pub async fn connect() -> Result<Self, GoogleApiError> {
        let access_token = google_api::get_valid_access_token().await?;
        Ok(Self {
            client: reqwest::Client::new(),
            access_token,
        })
    }
}

/// Turn a 404 into `NotFound(what)`; other errors pass through.
fn not_found_as(err: GoogleApiError, what: impl FnOnce() -> String) -> PlatformError {
    match err {
        GoogleApiError::ApiError { status: 404, .. } => PlatformError::NotFound(what()),
        other => PlatformError::Google(other),
    }
}

impl From<gmail::GmailMessage> for MailMessage {
    fn from(m: gmail::GmailMessage) -> Self {
        MailMessage {
            id: m.id,
            subject: m.subject,
            plain_body: m.plain_body,
            html_body: m.html_body,
            unread: m.unread,
        }
    }
}

impl From<drive::DriveFile> for StoredFile {
    fn from(f: drive::DriveFile) -> Self {
        StoredFile {
            url: f.url(),
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
        }
    }
}

#[async_trait]
impl Mailbox for GoogleWorkspace {
    async fn search_threads(&self, query: &MailQuery) -> Result<Vec<MailThread>, PlatformError> {
        let q = gmail::build_search_query(&query.subject, query.newer_than_days, query.unread_only);
        let threads = gmail::search_threads(&self.client, &self.access_token, &q, MAX_THREADS).await?;
        Ok(threads
            .into_iter()
            .map(|t| MailThread {
                messages: t.messages.into_iter().map(MailMessage::from).collect(),
            })
            .collect())
    }

    async fn mark_read(&self, message: &MailMessage) -> Result<(), PlatformError> {
        gmail::mark_read(&self.client, &self.access_token, &message.id).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for GoogleWorkspace {
    async fn current_user(&self) -> Result<String, PlatformError> {
        Ok(gmail::fetch_profile_email(&self.client, &self.access_token).await?)
    }

    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), PlatformError> {
        gmail::send_html(&self.client, &self.access_token, to, subject, html).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStorage for GoogleWorkspace {
    async fn folder(&self, folder_id: &str) -> Result<Folder, PlatformError> {
        let file = drive::get_file(&self.client, &self.access_token, folder_id)
            .await
            .map_err(|e| not_found_as(e, || format!("Folder {}", folder_id)))?;
        Ok(Folder {
            id: file.id,
            name: file.name,
        })
    }

    async fn files_named(
        &self,
        folder: &Folder,
        name: &str,
    ) -> Result<Vec<StoredFile>, PlatformError> {
        let q = drive::name_in_folder_query(&folder.id, name);
        let files = drive::list_files(&self.client, &self.access_token, &q).await?;
        Ok(files.into_iter().map(StoredFile::from).collect())
    }

    async fn find_files(
        &self,
        folder_id: Option<&str>,
        title: &str,
        mime_type: &str,
    ) -> Result<Vec<StoredFile>, PlatformError> {
        let q = drive::title_and_mime_query(folder_id, title, mime_type);
        let files = drive::list_files(&self.client, &self.access_token, &q).await?;
        Ok(files.into_iter().map(StoredFile::from).collect())
    }

    async fn read_bytes(&self, file: &StoredFile) -> Result<Vec<u8>, PlatformError> {
        drive::download_file(&self.client, &self.access_token, &file.id)
            .await
            .map_err(|e| not_found_as(e, || format!("File {}", file.name)))
    }

    async fn pdf_thumbnail(&self, file: &StoredFile) -> Result<ImageBlob, PlatformError> {
        let meta = drive::get_file(&self.client, &self.access_token, &file.id)
            .await
            .map_err(|e| not_found_as(e, || format!("File {}", file.name)))?;
        if meta.thumbnail_link.is_none() {
            return Err(PlatformError::Unsupported(format!(
                "no rendered preview for {}",
                file.name
            )));
        }
        let (bytes, mime_type) =
            drive::download_thumbnail(&self.client, &self.access_token, &meta).await?;
        let stem = file.name.strip_suffix(".pdf").unwrap_or(&file.name);
        Ok(ImageBlob {
            name: format!("{}.png", stem),
            mime_type,
            bytes,
        })
    }

    async fn stage_shared_image(&self, image: &ImageBlob) -> Result<StagedFile, PlatformError> {
        let id = drive::upload_file(
            &self.client,
            &self.access_token,
            &image.name,
            &image.mime_type,
            &image.bytes,
        )
        .await?;
        if let Err(e) = drive::share_with_link(&self.client, &self.access_token, &id).await {
            // remove the unshared upload
            if let Err(cleanup) = drive::delete_file(&self.client, &self.access_token, &id).await {
                log::warn!("Failed to delete unshared upload {}: {}", id, cleanup);
            }
            return Err(e.into());
        }
        log::debug!("Staged {} as {}", image.name, id);
        Ok(StagedFile {
            url: drive::direct_view_url(&id),
            id,
        })
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), PlatformError> {
        drive::delete_file(&self.client, &self.access_token, file_id).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for GoogleWorkspace {
    async fn read_blocks(&self, document_id: &str) -> Result<Vec<ContentBlock>, PlatformError> {
        let doc = docs::get_document(&self.client, &self.access_token, document_id)
            .await
            .map_err(|e| not_found_as(e, || format!("Document {}", document_id)))?;
        Ok(doc.content_blocks())
    }

    /// Images are inserted by URL, so each one is staged on Drive for the
    /// duration of the rewrite and deleted afterwards.
    async fn rewrite(&self, document_id: &str, ops: &[DocOp]) -> Result<(), PlatformError> {
        let mut staged: Vec<StagedFile> = Vec::new();
        let mut staging_result = Ok(());
        for op in ops {
            if let DocOp::Image { image } = op {
                match self.stage_shared_image(image).await {
                    Ok(file) => staged.push(file),
                    Err(e) => {
                        staging_result = Err(e);
                        break;
                    }
                }
            }
        }

        let result = match staging_result {
            Ok(()) => {
                let uris: Vec<String> = staged.iter().map(|f| f.url.clone()).collect();
                docs::rewrite_document(&self.client, &self.access_token, document_id, ops, &uris)
                    .await
                    .map_err(|e| not_found_as(e, || format!("Document {}", document_id)))
            }
            Err(e) => Err(e),
        };

        for file in &staged {
            if let Err(e) = self.delete_file(&file.id).await {
                log::warn!("Failed to delete staged image {}: {}", file.id, e);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let err = not_found_as(
            GoogleApiError::ApiError {
                status: 404,
                message: "File not found".to_string(),
            },
            || "Folder abc".to_string(),
        );
        assert!(matches!(err, PlatformError::NotFound(what) if what == "Folder abc"));

        let err = not_found_as(GoogleApiError::AuthExpired, || unreachable!());
        assert!(matches!(err, PlatformError::Google(GoogleApiError::AuthExpired)));
    }

    #[test]
    fn test_drive_file_to_stored_file() {
        let stored = StoredFile::from(drive::DriveFile {
            id: "f1".to_string(),
            name: "menu.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            web_view_link: None,
            thumbnail_link: None,
        });
        assert_eq!(stored.url, "https://drive.google.com/open?id=f1");
        assert_eq!(stored.name, "menu.pdf");
    }
}
