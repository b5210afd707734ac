//! CSV manifest of stored images
//!
//! The manifest is the durable artifact of a crawl: one row per image that
//! was written to disk, in completion order. The file is truncated and the
//! header written when the writer is created.

use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// Column names, in order
pub const MANIFEST_HEADERS: [&str; 3] = ["image_url", "local_path", "page_url"];

/// One stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    /// Normalized image URL
    pub image_url: Url,

    /// Where the image was written
    pub local_path: PathBuf,

    /// Page that referenced the image (and determined its directory)
    pub page_url: Url,
}

/// Append-only manifest writer
///
/// Owned by the coordinator, which is the only caller, so rows can never
/// interleave even though downloads complete concurrently.
pub struct ManifestWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: u64,
}

impl ManifestWriter {
    /// Creates (or truncates) the manifest and writes the header row
    pub fn create(path: &Path) -> crate::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(MANIFEST_HEADERS)?;
        writer.flush()?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    /// Appends one record and flushes it to disk
    pub fn append(&mut self, record: &ManifestRecord) -> crate::Result<()> {
        let local_path = record.local_path.to_string_lossy();
        self.writer.write_record([
            record.image_url.as_str(),
            local_path.as_ref(),
            record.page_url.as_str(),
        ])?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
