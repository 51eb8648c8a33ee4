//! Page archiver
//!
//! Writes the raw HTML of each visited page to a flat directory, one file per
//! normalized URL.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest file stem written as-is; longer names are shortened and hashed
const MAX_STEM_LEN: usize = 200;

/// Characters kept from the URL when deriving a file name
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Failure to persist one page
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Derives the archive file name of a normalized URL
///
/// The scheme is dropped and every path separator or other character that is
/// unsafe in a file name becomes `_`. Very long URLs are cut and suffixed with
/// a digest of the full URL so distinct URLs keep distinct names.
///
/// # Examples
///
/// ```
/// use site_archiver::crawler::archive_file_name;
///
/// assert_eq!(archive_file_name("https://site.test"), "site.test.html");
/// assert_eq!(archive_file_name("https://site.test/docs/a?x=1"), "site.test_docs_a_x_1.html");
/// ```
pub fn archive_file_name(url: &str) -> String {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);

    let mut stem: String = without_scheme
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect();

    if stem.is_empty() {
        stem.push('_');
    }

    if stem.len() > MAX_STEM_LEN {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        stem.truncate(MAX_STEM_LEN - 17);
        stem.push('-');
        stem.push_str(&digest[..16]);
    }

    format!("{}.html", stem)
}

/// Owns the archive directory
#[derive(Debug, Clone)]
pub struct PageArchiver {
    dir: PathBuf,
}

impl PageArchiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the page of `url` is archived at
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(archive_file_name(url))
    }

    /// Writes `content` for `url` and returns the file path
    ///
    /// The directory is created on demand; concurrent callers racing on its
    /// creation all succeed. Archiving the same URL twice overwrites the file.
    pub async fn archive(&self, url: &str, content: &str) -> Result<PathBuf, ArchiveError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ArchiveError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(url);
        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|source| ArchiveError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::trace!("Archived {} to {}", url, path.display());
        Ok(path)
    }
}
