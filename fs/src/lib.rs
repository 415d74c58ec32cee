//! File downloads for hybrid pages.
//!
//! [`Downloader`] fetches a URL into the app files directory, named after the
//! last path segment. A [`FileOpener`] hands the saved file to whatever app
//! can view it.

#![warn(missing_docs)]

mod download;

pub use download::{Downloader, file_name_from_url, mime_type_for};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Parameters of `downloadAndOpenFile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadRequest {
    /// Absolute `http(s)` URL.
    #[serde(default)]
    pub url: String,
    /// Open the file once saved.
    #[serde(rename = "isOpen", default = "default_open")]
    pub is_open: bool,
}

const fn default_open() -> bool {
    true
}

/// Download settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Directory files are saved into.
    pub files_dir: PathBuf,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for the whole request.
    pub timeout: Duration,
}

impl DownloadConfig {
    /// Default settings saving into `files_dir`.
    #[must_use]
    pub fn with_files_dir(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        let files_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bridgekit")
            .join("files");
        Self {
            files_dir,
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Errors that can occur while downloading.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The URL is blank, not `http(s)`, or has no file name.
    #[error("invalid download url: {0}")]
    InvalidUrl(String),
    /// The server answered with something other than 200.
    #[error("server responded with status {0}")]
    Status(u16),
    /// The server sent no bytes.
    #[error("downloaded file is empty")]
    Empty,
    /// The request failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// Writing the file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// No app could open the file.
    #[error("could not open file: {0}")]
    Open(String),
}

/// Opens saved files in an external viewer.
pub trait FileOpener: Send + Sync {
    /// Opens `path` as `mime`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Open`] if nothing can show the file.
    fn open(&self, path: &Path, mime: &str) -> Result<(), DownloadError>;
}
