//! Drive API v3: file lookup, PDF thumbnails, and temporary shared uploads.

use serde::Deserialize;

use super::{check_status, GoogleApiError};

const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FILE_FIELDS: &str = "id,name,mimeType,webViewLink,thumbnailLink";

/// Drive serves thumbnails at 220px by default; ask for a readable size.
const THUMBNAIL_SIZE: &str = "=s1600";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

impl DriveFile {
    /// Browser link, falling back to the canonical open URL.
    pub fn url(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/open?id={}", self.id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Quote a value for a Drive `q` expression.
pub fn quote_query_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// `q` for files in a folder with an exact name.
pub fn name_in_folder_query(folder_id: &str, name: &str) -> String {
    format!(
        "{} in parents and name = {} and trashed = false",
        quote_query_value(folder_id),
        quote_query_value(name)
    )
}

/// `q` for files with a title and MIME type, optionally inside a folder.
pub fn title_and_mime_query(folder_id: Option<&str>, title: &str, mime_type: &str) -> String {
    let mut query = format!(
        "name = {} and mimeType = {} and trashed = false",
        quote_query_value(title),
        quote_query_value(mime_type)
    );
    if let Some(folder) = folder_id {
        query = format!("{} in parents and {}", quote_query_value(folder), query);
    }
    query
}

/// Link that serves an anyone-with-link image directly.
pub fn direct_view_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=view&id={}", file_id)
}

pub async fn get_file(
    client: &reqwest::Client,
    access_token: &str,
    file_id: &str,
) -> Result<DriveFile, GoogleApiError> {
    let resp = client
        .get(format!("{}/files/{}", DRIVE_BASE, file_id))
        .bearer_auth(access_token)
        .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")])
        .send()
        .await?;
    Ok(check_status(resp).await?.json().await?)
}

pub async fn list_files(
    client: &reqwest::Client,
    access_token: &str,
    query: &str,
) -> Result<Vec<DriveFile>, GoogleApiError> {
    let fields = format!("files({})", FILE_FIELDS);
    let resp = client
        .get(format!("{}/files", DRIVE_BASE))
        .bearer_auth(access_token)
        .query(&[
            ("q", query),
            ("fields", fields.as_str()),
            ("orderBy", "modifiedTime desc"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ])
        .send()
        .await?;
    let list: FileListResponse = check_status(resp).await?.json().await?;
    log::debug!("Drive query {:?} matched {} files", query, list.files.len());
    Ok(list.files)
}

/// Raw content of a binary (non-Google-Docs) file.
pub async fn download_file(
    client: &reqwest::Client,
    access_token: &str,
    file_id: &str,
) -> Result<Vec<u8>, GoogleApiError> {
    let resp = client
        .get(format!("{}/files/{}", DRIVE_BASE, file_id))
        .bearer_auth(access_token)
        .query(&[("alt", "media"), ("supportsAllDrives", "true")])
        .send()
        .await?;
    Ok(check_status(resp).await?.bytes().await?.to_vec())
}

/// Fetch the rendered thumbnail of a file. Returns the bytes and MIME type.
pub async fn download_thumbnail(
    client: &reqwest::Client,
    access_token: &str,
    file: &DriveFile,
) -> Result<(Vec<u8>, String), GoogleApiError> {
    let link = file.thumbnail_link.as_deref().ok_or_else(|| {
        GoogleApiError::UnexpectedResponse(format!("no thumbnail for {}", file.name))
    })?;
    let resp = client
        .get(sized_thumbnail_link(link))
        .bearer_auth(access_token)
        .send()
        .await?;
    let resp = check_status(resp).await?;
    let mime_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .to_string();
    let bytes = resp.bytes().await?.to_vec();
    Ok((bytes, mime_type))
}

fn sized_thumbnail_link(link: &str) -> String {
    match link.rfind("=s") {
        Some(pos) if link[pos + 2..].chars().all(|c| c.is_ascii_digit()) => {
            format!("{}{}", &link[..pos], THUMBNAIL_SIZE)
        }
        _ => link.to_string(),
    }
}

/// Upload bytes as a new file via a multipart request. Returns the file ID.
pub async fn upload_file(
    client: &reqwest::Client,
    access_token: &str,
    name: &str,
    mime_type: &str,
    bytes: &[u8],
) -> Result<String, GoogleApiError> {
    let boundary = format!("schooldigest-{}", uuid::Uuid::new_v4().simple());
    let body = multipart_body(&boundary, name, mime_type, bytes);

    let resp = client
        .post(DRIVE_UPLOAD)
        .bearer_auth(access_token)
        .query(&[("uploadType", "multipart"), ("fields", "id")])
        .header(
            reqwest::header::CONTENT_TYPE,
            format!("multipart/related; boundary={}", boundary),
        )
        .body(body)
        .send()
        .await?;
    let created: DriveFile = check_status(resp).await?.json().await?;
    Ok(created.id)
}

fn multipart_body(boundary: &str, name: &str, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let metadata = serde_json::json!({ "name": name, "mimeType": mime_type });
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n--{}\r\nContent-Type: {}\r\n\r\n",
            boundary, metadata, boundary, mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Let anyone with the link read the file.
pub async fn share_with_link(
    client: &reqwest::Client,
    access_token: &str,
    file_id: &str,
) -> Result<(), GoogleApiError> {
    let resp = client
        .post(format!("{}/files/{}/permissions", DRIVE_BASE, file_id))
        .bearer_auth(access_token)
        .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
        .send()
        .await?;
    check_status(resp).await?;
    Ok(())
}

pub async fn delete_file(
    client: &reqwest::Client,
    access_token: &str,
    file_id: &str,
) -> Result<(), GoogleApiError> {
    let resp = client
        .delete(format!("{}/files/{}", DRIVE_BASE, file_id))
        .bearer_auth(access_token)
        .send()
        .await?;
    check_status(resp).await?;
    Ok(())
}
