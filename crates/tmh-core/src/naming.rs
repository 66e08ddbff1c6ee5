//! Output layout and collision-free file naming.
//!
//! In-flight downloads use `NNN.<ext>` (sequence index, unique within a run);
//! completed files are renamed to `<unix_millis>_NNN.<ext>` so they never clash
//! with leftovers from previous runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;

use crate::{classify::MediaKind, domain::TargetDescriptor, Result};

/// `<out>/<target key>/<sub key>/`, with lazily created image/video subfolders.
#[derive(Clone, Debug)]
pub struct DestinationLayout {
    root: PathBuf,
}

impl DestinationLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_target(out_dir: &Path, target: &TargetDescriptor) -> Self {
        Self::new(out_dir.join(target.username()).join(target.sub_key()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn dir_for(&self, kind: MediaKind) -> PathBuf {
        match kind.subfolder() {
            Some(sub) => self.root.join(sub),
            None => self.root.clone(),
        }
    }

    /// Directory for `kind`, created (idempotently) if missing.
    pub fn ensure_dir(&self, kind: MediaKind) -> Result<PathBuf> {
        let dir = self.dir_for(kind);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

pub fn temp_file_name(index: usize, extension: &str) -> String {
    format!("{index:03}.{extension}")
}

pub fn final_file_name(timestamp_millis: i64, temp_name: &str) -> String {
    format!("{timestamp_millis}_{temp_name}")
}

/// Rename a finished temp file to its timestamped final name; returns the new path.
pub fn finalize(temp_path: &Path) -> Result<PathBuf> {
    finalize_at(temp_path, Utc::now().timestamp_millis())
}

pub fn finalize_at(temp_path: &Path, timestamp_millis: i64) -> Result<PathBuf> {
    let temp_name = temp_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let final_path = temp_path.with_file_name(final_file_name(timestamp_millis, &temp_name));
    fs::rename(temp_path, &final_path)?;
    Ok(final_path)
}
