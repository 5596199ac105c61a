//! In-memory mailbox, drive, documents and mailer for workflow tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::platform::{
    ContentBlock, DocOp, DocumentStore, FileStorage, Folder, MailMessage, MailQuery, MailThread,
    Mailbox, Mailer, Platform, PlatformError, StagedFile, StoredFile,
};
use crate::types::ImageBlob;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct FakeWorkspace {
    pub user: String,
    pub threads: Vec<MailThread>,
    pub folders: Vec<Folder>,
    /// (folder id, file)
    pub files: Vec<(String, StoredFile)>,
    pub contents: HashMap<String, Vec<u8>>,
    pub thumbnails: HashMap<String, ImageBlob>,
    pub documents: HashMap<String, Vec<ContentBlock>>,
    pub fail_search: bool,
    pub fail_staging: bool,
    pub fail_rewrite: bool,
    pub fail_send: bool,
    pub fail_mark_read: bool,

    pub queries: Mutex<Vec<MailQuery>>,
    pub marked_read: Mutex<Vec<String>>,
    pub rewrites: Mutex<Vec<(String, Vec<DocOp>)>>,
    pub staged: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<SentMail>>,
}

fn unavailable(what: &str) -> PlatformError {
    PlatformError::Unsupported(format!("{} unavailable", what))
}

impl FakeWorkspace {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ..Default::default()
        }
    }

    pub fn platform(&self) -> Platform<'_> {
        Platform {
            mailbox: self,
            storage: self,
            documents: self,
            mailer: self,
        }
    }

    pub fn add_folder(&mut self, id: &str, name: &str) {
        self.folders.push(Folder {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_file(&mut self, folder_id: &str, id: &str, name: &str, mime_type: &str) {
        self.files.push((
            folder_id.to_string(),
            StoredFile {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                url: format!("https://files.test/{}", id),
            },
        ));
    }

    pub fn add_message(&mut self, id: &str, subject: &str, plain_body: &str, unread: bool) {
        self.threads.insert(
            0,
            MailThread {
                messages: vec![MailMessage {
                    id: id.to_string(),
                    subject: subject.to_string(),
                    plain_body: plain_body.to_string(),
                    html_body: String::new(),
                    unread,
                }],
            },
        );
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn rewrites(&self) -> Vec<(String, Vec<DocOp>)> {
        self.rewrites.lock().unwrap().clone()
    }

    pub fn marked_read(&self) -> Vec<String> {
        self.marked_read.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for FakeWorkspace {
    async fn search_threads(&self, query: &MailQuery) -> Result<Vec<MailThread>, PlatformError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_search {
            return Err(unavailable("mailbox"));
        }
        Ok(self
            .threads
            .iter()
            .filter(|t| {
                t.messages.iter().any(|m| {
                    m.subject.contains(&query.subject) && (!query.unread_only || m.unread)
                })
            })
            .cloned()
            .collect())
    }

    async fn mark_read(&self, message: &MailMessage) -> Result<(), PlatformError> {
        if self.fail_mark_read {
            return Err(unavailable("mark read"));
        }
        self.marked_read.lock().unwrap().push(message.id.clone());
        Ok(())
    }
}

#[async_trait]
impl Mailer for FakeWorkspace {
    async fn current_user(&self) -> Result<String, PlatformError> {
        Ok(self.user.clone())
    }

    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), PlatformError> {
        if self.fail_send {
            return Err(unavailable("mailer"));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl FileStorage for FakeWorkspace {
    async fn folder(&self, folder_id: &str) -> Result<Folder, PlatformError> {
        self.folders
            .iter()
            .find(|f| f.id == folder_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("Folder {}", folder_id)))
    }

    async fn files_named(
        &self,
        folder: &Folder,
        name: &str,
    ) -> Result<Vec<StoredFile>, PlatformError> {
        Ok(self
            .files
            .iter()
            .filter(|(parent, file)| *parent == folder.id && file.name == name)
            .map(|(_, file)| file.clone())
            .collect())
    }

    async fn find_files(
        &self,
        folder_id: Option<&str>,
        title: &str,
        mime_type: &str,
    ) -> Result<Vec<StoredFile>, PlatformError> {
        Ok(self
            .files
            .iter()
            .filter(|(parent, file)| {
                folder_id.map_or(true, |id| id == parent.as_str())
                    && file.name == title
                    && file.mime_type == mime_type
            })
            .map(|(_, file)| file.clone())
            .collect())
    }

    async fn read_bytes(&self, file: &StoredFile) -> Result<Vec<u8>, PlatformError> {
        self.contents
            .get(&file.id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("File {}", file.name)))
    }

    async fn pdf_thumbnail(&self, file: &StoredFile) -> Result<ImageBlob, PlatformError> {
        self.thumbnails
            .get(&file.id)
            .cloned()
            .ok_or_else(|| unavailable("thumbnail"))
    }

    async fn stage_shared_image(&self, image: &ImageBlob) -> Result<StagedFile, PlatformError> {
        if self.fail_staging {
            return Err(unavailable("staging"));
        }
        let mut staged = self.staged.lock().unwrap();
        let id = format!("staged-{}", staged.len() + 1);
        staged.push(image.name.clone());
        Ok(StagedFile {
            url: format!("https://images.test/{}", id),
            id,
        })
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), PlatformError> {
        self.deleted.lock().unwrap().push(file_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FakeWorkspace {
    async fn read_blocks(&self, document_id: &str) -> Result<Vec<ContentBlock>, PlatformError> {
        self.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("Document {}", document_id)))
    }

    async fn rewrite(&self, document_id: &str, ops: &[DocOp]) -> Result<(), PlatformError> {
        if self.fail_rewrite {
            return Err(PlatformError::NotFound(format!("Document {}", document_id)));
        }
        self.rewrites
            .lock()
            .unwrap()
            .push((document_id.to_string(), ops.to_vec()));
        Ok(())
    }
}
