#![forbid(unsafe_code)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

const PARTIAL_SUFFIX: &str = ".partial";
const DEFAULT_EXTENSION: &str = "jpg";
const MAX_EXTENSION_LEN: usize = 8;
const COPY_BUF_BYTES: usize = 16 * 1024;

/// Path components that mark OS-managed capture locations (picker and camera caches).
pub const DEFAULT_TRANSIENT_MARKERS: &[&str] = &["ImagePicker", "Camera", "cache"];

static NAME_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment source unreadable ({}): {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("attachment storage unavailable ({}): {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AttachmentError {
    fn source_unreadable(path: &Path, source: io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        }
    }

    fn storage_unavailable(path: &Path, source: io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Durable reference to a materialized attachment: a file name under the attachment root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub(crate) fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// A source brought under the attachment root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Materialized {
    pub reference: AttachmentRef,
    /// Original location when the source was moved instead of copied. The stored file is then
    /// the only copy.
    pub moved_from: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct StoredFile {
    pub name: String,
    pub modified: Option<SystemTime>,
}

impl StoredFile {
    /// Temp file of a copy that never completed.
    pub fn is_partial(&self) -> bool {
        self.name.ends_with(PARTIAL_SUFFIX)
    }
}

/// Owns the app-private directory holding attachment files.
#[derive(Clone, Debug)]
pub struct AttachmentStore {
    root: PathBuf,
    transient_markers: Vec<String>,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            transient_markers: DEFAULT_TRANSIENT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    pub fn with_transient_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transient_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, reference: &AttachmentRef) -> PathBuf {
        self.root.join(reference.as_str())
    }

    /// True when any component of `source` names a known transient capture location.
    pub fn is_transient(&self, source: &Path) -> bool {
        source.components().any(|component| {
            let component = component.as_os_str().to_string_lossy();
            self.transient_markers
                .iter()
                .any(|marker| component.eq_ignore_ascii_case(marker))
        })
    }

    /// Copies `source` into the attachment root and returns its durable reference.
    ///
    /// The copy goes to a `.partial` temp name and is renamed into place once synced, so readers
    /// never observe a truncated file. When the source cannot be read and lives in a transient
    /// location, one move is attempted before the error is surfaced.
    pub fn materialize(&self, source: &Path) -> Result<Materialized, AttachmentError> {
        self.materialize_with(source, copy_to_partial)
    }

    pub(crate) fn materialize_with<F>(
        &self,
        source: &Path,
        copy: F,
    ) -> Result<Materialized, AttachmentError>
    where
        F: FnOnce(&Path, &Path) -> Result<u64, AttachmentError>,
    {
        fs::create_dir_all(&self.root)
            .map_err(|err| AttachmentError::storage_unavailable(&self.root, err))?;

        let name = unique_name(source);
        let target = self.root.join(&name);
        let partial = self.root.join(format!("{name}{PARTIAL_SUFFIX}"));

        match copy(source, &partial) {
            Ok(bytes) => {
                if let Err(err) = fs::rename(&partial, &target) {
                    discard_partial(&partial);
                    return Err(AttachmentError::storage_unavailable(&target, err));
                }
                debug!(
                    source = %source.display(),
                    storage_path = %name,
                    bytes,
                    "attachment materialized"
                );
                Ok(Materialized {
                    reference: AttachmentRef(name),
                    moved_from: None,
                })
            }
            Err(err @ AttachmentError::SourceUnreadable { .. }) if self.is_transient(source) => {
                discard_partial(&partial);
                warn!(
                    source = %source.display(),
                    error = %err,
                    "copy from transient source failed; moving instead"
                );
                match fs::rename(source, &target) {
                    Ok(()) => {
                        debug!(source = %source.display(), storage_path = %name, "attachment moved");
                        Ok(Materialized {
                            reference: AttachmentRef(name),
                            moved_from: Some(source.to_path_buf()),
                        })
                    }
                    Err(move_err) => {
                        debug!(source = %source.display(), error = %move_err, "move fallback failed");
                        Err(err)
                    }
                }
            }
            Err(err) => {
                discard_partial(&partial);
                Err(err)
            }
        }
    }

    /// Undoes a `materialize` whose record was never committed: a moved source goes back where it
    /// came from, a copy is deleted.
    pub fn discard(&self, materialized: &Materialized) -> Result<(), AttachmentError> {
        let Some(original) = &materialized.moved_from else {
            return self.delete(&materialized.reference).map(|_| ());
        };
        let stored = self.resolve(&materialized.reference);
        fs::rename(&stored, original)
            .map_err(|err| AttachmentError::storage_unavailable(original, err))?;
        debug!(
            storage_path = %materialized.reference.as_str(),
            source = %original.display(),
            "moved attachment restored"
        );
        Ok(())
    }

    /// Removes the file behind `reference`. Returns `false` when it was already gone.
    pub fn delete(&self, reference: &AttachmentRef) -> Result<bool, AttachmentError> {
        let path = self.resolve(reference);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(storage_path = %reference.as_str(), "attachment deleted");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(storage_path = %reference.as_str(), "attachment already absent");
                Ok(false)
            }
            Err(err) => Err(AttachmentError::storage_unavailable(&path, err)),
        }
    }

    /// Regular files currently under the attachment root, including abandoned temp files.
    pub fn list_files(&self) -> Result<Vec<StoredFile>, AttachmentError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(AttachmentError::storage_unavailable(&self.root, err)),
        };

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| AttachmentError::storage_unavailable(&self.root, err))?;
            let metadata = entry
                .metadata()
                .map_err(|err| AttachmentError::storage_unavailable(&entry.path(), err))?;
            if !metadata.is_file() {
                continue;
            }
            out.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified().ok(),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

fn copy_to_partial(source: &Path, partial: &Path) -> Result<u64, AttachmentError> {
    let mut reader =
        File::open(source).map_err(|err| AttachmentError::source_unreadable(source, err))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(partial)
        .map_err(|err| AttachmentError::storage_unavailable(partial, err))?;

    let mut buf = vec![0u8; COPY_BUF_BYTES];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(AttachmentError::source_unreadable(source, err)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|err| AttachmentError::storage_unavailable(partial, err))?;
        total += n as u64;
    }

    writer
        .sync_all()
        .map_err(|err| AttachmentError::storage_unavailable(partial, err))?;
    Ok(total)
}

fn discard_partial(partial: &Path) {
    if let Err(err) = fs::remove_file(partial)
        && err.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %partial.display(), error = %err, "failed to remove partial attachment");
    }
}

fn unique_name(source: &Path) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let seq = NAME_SEQ.fetch_add(1, Ordering::Relaxed);
    let ext = source
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("att_{millis}_{}_{seq}.{ext}", std::process::id())
}
