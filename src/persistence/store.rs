//! On-disk project store.
//!
//! Each project is a `<id>.recolor` record plus a `<id>.meta` listing entry
//! in one directory. Files are written to a temp file in the same directory
//! and renamed into place, so readers never see a half-written record.

use super::record::{RecolorMeta, RecolorRecord};
use crate::constants::{META_EXTENSION, PROJECT_EXTENSION};
use crate::error::{RecolorError, RecolorResult};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A listed project
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectEntry {
    pub id: String,
    pub meta: RecolorMeta,
}

#[derive(Clone, Debug)]
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/recolor/projects`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("recolor").join("projects"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `id`. Ids that could name a path outside the store are rejected.
    fn path(&self, id: &str, extension: &str) -> RecolorResult<PathBuf> {
        if !is_valid_id(id) {
            return Err(RecolorError::InvalidProjectId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.{extension}")))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> RecolorResult<()> {
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Write both files; the meta goes last so listings only show complete projects
    pub fn save(&self, id: &str, record: &RecolorRecord, meta: &RecolorMeta) -> RecolorResult<()> {
        let record_path = self.path(id, PROJECT_EXTENSION)?;
        let meta_path = self.path(id, META_EXTENSION)?;
        fs::create_dir_all(&self.dir)?;
        self.write_atomic(&record_path, &record.encode())?;
        self.write_atomic(&meta_path, &meta.encode())?;
        debug!(id, dir = %self.dir.display(), "Saved project");
        Ok(())
    }

    pub fn load_record(&self, id: &str) -> RecolorResult<RecolorRecord> {
        let bytes = fs::read(self.path(id, PROJECT_EXTENSION)?)?;
        RecolorRecord::decode(&bytes)
    }

    pub fn load_meta(&self, id: &str) -> RecolorResult<RecolorMeta> {
        let bytes = fs::read(self.path(id, META_EXTENSION)?)?;
        RecolorMeta::decode(&bytes)
    }

    /// Every readable project, newest first. Corrupt metas are skipped.
    pub fn list(&self) -> RecolorResult<Vec<ProjectEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load_meta(id) {
                Ok(meta) => projects.push(ProjectEntry {
                    id: id.to_string(),
                    meta,
                }),
                Err(e) => warn!(id, "Skipping unreadable project meta: {e}"),
            }
        }
        projects.sort_by(|a, b| {
            b.meta
                .timestamp
                .cmp(&a.meta.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(projects)
    }

    /// Remove both files; a missing file is not an error
    pub fn delete(&self, id: &str) -> RecolorResult<()> {
        for extension in [PROJECT_EXTENSION, META_EXTENSION] {
            match fs::remove_file(self.path(id, extension)?) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(id, "Deleted project");
        Ok(())
    }
}

/// A single plain file name component
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\', '\0']) && !id.contains("..")
}
