use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::{Client, StatusCode};

use crate::{DownloadConfig, DownloadError};

/// Fetches files over HTTP into the configured files directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    config: DownloadConfig,
}

impl Downloader {
    /// Creates a downloader.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Http`] if the HTTP client cannot be built.
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Directory downloads are saved into.
    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.config.files_dir
    }

    /// Downloads `url` and returns where the file was saved.
    ///
    /// # Errors
    ///
    /// Fails on an invalid URL, a non-200 answer, an empty body, or any
    /// network or disk error.
    pub async fn download(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let file_name = file_name_from_url(url)?;
        debug!("downloading {url}");

        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(DownloadError::Empty);
        }

        tokio::fs::create_dir_all(&self.config.files_dir).await?;
        let path = self.config.files_dir.join(file_name);
        tokio::fs::write(&path, &body).await?;
        info!("saved {} bytes to {}", body.len(), path.display());
        Ok(path)
    }
}

/// Name a download of `url` is saved under: its last path segment.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] for blank or non-`http` URLs and
/// URLs without a usable last segment.
pub fn file_name_from_url(url: &str) -> Result<String, DownloadError> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http") {
        return Err(DownloadError::InvalidUrl(url.to_owned()));
    }
    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    match after_scheme.split_once('/').map(|(_, p)| p.rsplit('/').next()) {
        Some(Some(name)) if !name.is_empty() && name != "." && name != ".." => Ok(name.to_owned()),
        _ => Err(DownloadError::InvalidUrl(url.to_owned())),
    }
}

/// Best-guess MIME type from the file extension, `*/*` when unknown.
#[must_use]
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "zip" => "application/zip",
        "apk" => "application/vnd.android.package-archive",
        _ => "*/*",
    }
}
