//! Local draft storage
//!
//! A draft is one [`EditSession`] serialized as pretty JSON, stored as
//! `<draft_dir>/<name>.json`. Writes replace the file atomically so an
//! interrupted save never leaves a truncated draft behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::EditSession;
use crate::infrastructure::traits::FileSystem;

const DRAFT_EXTENSION: &str = "json";

/// Draft persistence under a single directory.
pub struct DraftStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl DraftStore {
    /// Create a new draft store rooted at `dir`.
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the draft `name`. Path separators in the name are
    /// replaced so a draft can never escape the draft directory.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_stem: String = name
            .trim()
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.{}", file_stem, DRAFT_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.fs.is_file(&self.path_for(name))
    }

    /// Save a session that must not overwrite an existing draft.
    pub fn create(&self, session: &EditSession) -> ApplicationResult<PathBuf> {
        let path = self.path_for(&session.name);
        if self.fs.exists(&path) {
            return Err(ApplicationError::DraftExists(path));
        }
        self.save(session)
    }

    /// Write `session`, replacing any previous draft of the same name.
    pub fn save(&self, session: &EditSession) -> ApplicationResult<PathBuf> {
        let path = self.path_for(&session.name);
        let content =
            serde_json::to_string_pretty(session).with_path_context("serialize draft", &path)?;
        self.fs
            .ensure_parent(&path)
            .with_path_context("create draft directory", &path)?;
        self.fs
            .write(&path, &content)
            .with_path_context("write draft", &path)?;
        debug!("saved draft {}", path.display());
        Ok(path)
    }

    /// Read the draft `name` back, rejecting a tree or history snapshot with an
    /// invalid shape.
    pub fn load(&self, name: &str) -> ApplicationResult<EditSession> {
        let path = self.path_for(name);
        if !self.fs.is_file(&path) {
            return Err(ApplicationError::DraftNotFound(name.to_string()));
        }
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read draft", &path)?;
        let session: EditSession =
            serde_json::from_str(&content).with_path_context("parse draft", &path)?;
        session.editor.check_shape()?;
        Ok(session)
    }

    /// Names of all drafts, sorted.
    pub fn list(&self) -> ApplicationResult<Vec<String>> {
        if !self.fs.exists(&self.dir) {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == DRAFT_EXTENSION)
            })
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> ApplicationResult<()> {
        let path = self.path_for(name);
        if !self.fs.is_file(&path) {
            return Err(ApplicationError::DraftNotFound(name.to_string()));
        }
        self.fs
            .remove_file(&path)
            .with_path_context("delete draft", &path)?;
        debug!("deleted draft {}", path.display());
        Ok(())
    }
}
