//! Image store: downloads images into a tree mirroring the referring page
//!
//! An image referenced from `https://host/a/b` lands in
//! `<base>/host/a/b/<last segment of the image URL>`. Bodies are streamed
//! to a temporary `.part` file and renamed into place only when complete,
//! so a failed download never leaves a truncated image behind.
//!
//! Deduplication by image URL is the coordinator's job; this module never
//! sees the same URL twice within a crawl.

use crate::config::ImageConfig;
use crate::crawler::fetcher::Fetcher;
use crate::output::ManifestRecord;
use crate::url::extract_host;
use crate::StoreError;
use futures::StreamExt;
use reqwest::Response;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Result of a store attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Written to disk; the record belongs in the manifest
    Stored(ManifestRecord),

    /// Not downloaded because its extension is excluded
    Skipped { extension: String },
}

/// Persists images under a deterministic path
pub struct ImageStore {
    fetcher: Arc<Fetcher>,
    base_dir: PathBuf,
    excluded_extensions: Vec<String>,
    disambiguate_collisions: bool,
    /// Which image URL owns each target path
    claimed: Mutex<HashMap<PathBuf, Url>>,
}

impl ImageStore {
    pub fn new(fetcher: Arc<Fetcher>, base_dir: impl Into<PathBuf>, config: &ImageConfig) -> Self {
        Self {
            fetcher,
            base_dir: base_dir.into(),
            excluded_extensions: config
                .excluded_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            disambiguate_collisions: config.disambiguate_collisions,
            claimed: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the matching excluded extension, if any
    ///
    /// Only the URL path is inspected, so `/logo.svg?v=2` is still excluded.
    pub fn excluded_extension(&self, image_url: &Url) -> Option<&str> {
        let path = image_url.path().to_ascii_lowercase();
        self.excluded_extensions
            .iter()
            .find(|ext| path.ends_with(ext.as_str()))
            .map(String::as_str)
    }

    /// Downloads `image_url` into the directory derived from `page_url`
    ///
    /// # Returns
    ///
    /// * `Ok(StoreOutcome::Stored)` - file written, record ready for the manifest
    /// * `Ok(StoreOutcome::Skipped)` - excluded extension, nothing fetched
    /// * `Err(StoreError)` - transport or filesystem failure; no file is left behind
    pub async fn store(&self, image_url: &Url, page_url: &Url) -> Result<StoreOutcome, StoreError> {
        if let Some(ext) = self.excluded_extension(image_url) {
            return Ok(StoreOutcome::Skipped {
                extension: ext.to_string(),
            });
        }

        let response = self.fetcher.get(image_url).await?;

        let dir = target_dir(&self.base_dir, page_url);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Filesystem {
                path: dir.clone(),
                source,
            })?;

        let path = self.claim_path(&dir, image_url);
        let bytes = write_streamed(response, &path, image_url).await?;

        tracing::debug!("Wrote {} bytes from {} to {}", bytes, image_url, path.display());

        Ok(StoreOutcome::Stored(ManifestRecord {
            image_url: image_url.clone(),
            local_path: path,
            page_url: page_url.clone(),
        }))
    }

    /// Picks the final path for an image and records ownership of it
    ///
    /// With disambiguation on, a path already owned by a different URL is
    /// replaced by `<stem>-<hash><.ext>`; otherwise the later image
    /// overwrites the earlier one.
    fn claim_path(&self, dir: &Path, image_url: &Url) -> PathBuf {
        let name = file_name(image_url);
        let path = dir.join(&name);

        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        match claimed.get(&path) {
            Some(owner) if owner != image_url && self.disambiguate_collisions => {
                let unique = dir.join(disambiguated_name(&name, image_url));
                tracing::debug!(
                    "{} collides with {} at {}, using {}",
                    image_url,
                    owner,
                    path.display(),
                    unique.display()
                );
                claimed.insert(unique.clone(), image_url.clone());
                unique
            }
            Some(owner) if owner != image_url => {
                tracing::warn!(
                    "{} overwrites {} at {}",
                    image_url,
                    owner,
                    path.display()
                );
                claimed.insert(path.clone(), image_url.clone());
                path
            }
            _ => {
                claimed.insert(path.clone(), image_url.clone());
                path
            }
        }
    }
}

/// Directory for images referenced from `page_url`
///
/// `<base>/<host>/<non-empty path segments of the page>`
pub fn target_dir(base_dir: &Path, page_url: &Url) -> PathBuf {
    let mut dir = base_dir.join(extract_host(page_url).unwrap_or_else(|| "unknown-host".to_string()));

    if let Some(segments) = page_url.path_segments() {
        for segment in segments.filter(|s| !s.is_empty() && *s != "." && *s != "..") {
            dir.push(segment);
        }
    }

    dir
}

/// Final non-empty path segment of the image URL, or `index`
pub fn file_name(image_url: &Url) -> String {
    image_url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|s| *s != "." && *s != "..")
        .map(str::to_string)
        .unwrap_or_else(|| "index".to_string())
}

/// First 8 hex characters of the SHA-256 of the full URL
pub fn url_hash(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    hex::encode(&digest[..4])
}

fn disambiguated_name(name: &str, image_url: &Url) -> String {
    let path = Path::new(name);
    let hash = url_hash(image_url);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}-{}.{}",
            stem.to_string_lossy(),
            hash,
            ext.to_string_lossy()
        ),
        _ => format!("{}-{}", name, hash),
    }
}

/// Streams the body into `<path>.<hash>.part`, then renames it to `path`
///
/// The partial file is removed on any failure, including an empty body.
async fn write_streamed(response: Response, path: &Path, image_url: &Url) -> Result<u64, StoreError> {
    let part = part_path(path, image_url);

    let result = match stream_to_file(response, &part, image_url).await {
        Ok(0) => Err(StoreError::EmptyBody {
            url: image_url.to_string(),
        }),
        Ok(bytes) => tokio::fs::rename(&part, path)
            .await
            .map(|_| bytes)
            .map_err(|source| StoreError::Filesystem {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&part).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove partial file {}: {}", part.display(), e);
            }
        }
    }

    result
}

async fn stream_to_file(response: Response, part: &Path, image_url: &Url) -> Result<u64, StoreError> {
    let fs_error = |source| StoreError::Filesystem {
        path: part.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(part).await.map_err(fs_error)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| StoreError::Stream {
            url: image_url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(fs_error)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(fs_error)?;
    Ok(written)
}

fn part_path(path: &Path, image_url: &Url) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.part", url_hash(image_url)));
    path.with_file_name(name)
}
