//! Photos and attachments stored beside the database.
//!
//! Records only keep a filename; the bytes live in one flat directory.
//! Filesystem failures never fail the surrounding operation: they are logged
//! and reported as "no file".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::models::AttachmentUpload;

/// Stand-in key when a record has no usable identifier.
const UNKNOWN_KEY: &str = "unknown";

/// What the shell needs to display a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct AssetInfo {
    pub exists: bool,
    pub name: String,
    pub path: Option<String>,
    /// Lower-case extension without the dot
    pub extension: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `file_name` inside the store. Any directory part is dropped.
    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let name = Path::new(file_name).file_name()?;
        Some(self.dir.join(name))
    }

    /// Copy the picture at `source` to `<cin><ext>`, returning the stored name.
    pub fn save_photo(&self, source: &Path, cin: &str) -> Option<String> {
        let name = format!("{}{}", safe_key(cin), extension_of(&source.to_string_lossy()));
        let dest = self.resolve(&name)?;

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::error!(dir = %self.dir.display(), error = %e, "Cannot create asset directory");
            return None;
        }
        match std::fs::copy(source, &dest) {
            Ok(_) => {
                tracing::debug!(file = %name, "Saved photo");
                Some(name)
            }
            Err(e) => {
                tracing::error!(source = %source.display(), error = %e, "Error saving photo");
                None
            }
        }
    }

    /// Write an uploaded attachment to `<key>-<suffix><ext>`.
    ///
    /// The name is deterministic, so a later upload for the same key replaces
    /// the earlier file.
    pub fn store_upload(&self, upload: &AttachmentUpload, key: &str, suffix: &str) -> Option<String> {
        let bytes = match STANDARD.decode(upload.data_base64.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(file = %upload.file_name, error = %e, "Invalid attachment encoding");
                return None;
            }
        };

        let name = format!(
            "{}-{}{}",
            safe_key(key),
            suffix,
            extension_of(&upload.file_name)
        );
        let dest = self.resolve(&name)?;

        let written = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&dest, &bytes));
        match written {
            Ok(()) => {
                tracing::info!(file = %name, bytes = bytes.len(), "Stored attachment");
                Some(name)
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Error storing attachment");
                None
            }
        }
    }

    /// Remove a stored file. A missing file is not an error.
    pub fn delete(&self, file_name: &str) -> bool {
        let Some(path) = self.resolve(file_name) else {
            return false;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(file = %file_name, "Deleted asset");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                tracing::error!(file = %file_name, error = %e, "Failed to delete asset");
                false
            }
        }
    }

    pub fn describe(&self, file_name: &str) -> AssetInfo {
        let missing = AssetInfo {
            exists: false,
            name: file_name.to_string(),
            path: None,
            extension: None,
            size: None,
        };
        let Some(path) = self.resolve(file_name) else {
            return missing;
        };
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => AssetInfo {
                exists: true,
                name: file_name.to_string(),
                path: Some(path.to_string_lossy().into_owned()),
                extension: path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase()),
                size: Some(meta.len()),
            },
            _ => missing,
        }
    }
}

/// Keep ASCII letters, digits, `-` and `_`; everything else becomes `_`.
pub fn safe_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return UNKNOWN_KEY.to_string();
    }
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `.ext` of `file_name`, or an empty string.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
