//! On-disk workspace holding the pipeline artifacts.
//!
//! A workspace is one directory with a fixed file per [`Slot`]. Writes go
//! through a temporary file in the same directory and are renamed into
//! place, so a slot is either absent or complete.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOCK_FILE: &str = ".retimbre.lock";
const TEMP_PREFIX: &str = ".retimbre-";

/// A named artifact in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Transcribed (and, after a render, rewritten) score
    Score,
    /// Recording the user uploaded, as WAV
    Reference,
    /// Normalized render, full length
    Original,
    /// Render trimmed to the reference, or its transposition
    Adjusted,
    /// Output of the last concatenation
    Merged,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::Score,
        Slot::Reference,
        Slot::Original,
        Slot::Adjusted,
        Slot::Merged,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Slot::Score => "score.mid",
            Slot::Reference => "reference.wav",
            Slot::Original => "original.wav",
            Slot::Adjusted => "adjusted.wav",
            Slot::Merged => "merged.wav",
        }
    }

    /// Human-readable description used in errors.
    pub fn describe(self) -> &'static str {
        match self {
            Slot::Score => "score",
            Slot::Reference => "reference recording",
            Slot::Original => "original render",
            Slot::Adjusted => "adjusted render",
            Slot::Merged => "merged audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        debug!("Opened workspace {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, slot: Slot) -> PathBuf {
        self.root.join(slot.file_name())
    }

    pub fn exists(&self, slot: Slot) -> bool {
        self.path(slot).is_file()
    }

    /// Path of `slot`, or `NotFound` if it has not been written.
    pub fn require(&self, slot: Slot) -> Result<PathBuf> {
        let path = self.path(slot);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::not_found(slot.describe(), path))
        }
    }

    pub fn read(&self, slot: Slot) -> Result<Vec<u8>> {
        let path = self.require(slot)?;
        Ok(std::fs::read(path)?)
    }

    /// Atomically replace `slot` with `bytes`.
    pub fn write(&self, slot: Slot, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.path(slot);
        write_atomic(&target, bytes)?;
        debug!("Wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(target)
    }

    /// Move staged files into their slots as one unit.
    ///
    /// Files must be on the workspace's filesystem. Replaced slots are moved
    /// aside first; if any rename fails, every slot already touched is put
    /// back the way it was.
    pub fn commit(&self, staged: &[(Slot, &Path)]) -> Result<Vec<PathBuf>> {
        let backups = self.scratch_dir()?;
        let mut done: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(staged.len());

        for &(slot, file) in staged {
            let target = self.path(slot);
            match replace(&target, file, backups.path()) {
                Ok(backup) => done.push((target, backup)),
                Err(e) => {
                    warn!("Commit failed at {}: {}", target.display(), e);
                    rollback(done);
                    return Err(e.into());
                }
            }
        }

        let installed: Vec<PathBuf> = done.into_iter().map(|(target, _)| target).collect();
        debug!("Committed {} slots", installed.len());
        Ok(installed)
    }

    /// Scratch directory inside the workspace, removed on drop.
    pub fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        Ok(tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(&self.root)?)
    }

    /// Block until this process holds the workspace lock.
    pub fn lock(&self) -> Result<File> {
        let file = self.lock_file()?;
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Take the workspace lock, or fail with `Locked` if another session holds it.
    pub fn try_lock(&self) -> Result<File> {
        let file = self.lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(file),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(Error::Locked(self.root.clone()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn lock_file(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(LOCK_FILE))?)
    }
}

/// Rename `file` over `target`, keeping any previous `target` in `backups`.
fn replace(target: &Path, file: &Path, backups: &Path) -> std::io::Result<Option<PathBuf>> {
    let backup = match target.file_name() {
        Some(name) if target.is_file() => {
            let backup = backups.join(name);
            std::fs::rename(target, &backup)?;
            Some(backup)
        }
        _ => None,
    };

    if let Err(e) = std::fs::rename(file, target) {
        if let Some(backup) = &backup {
            restore(target, backup);
        }
        return Err(e);
    }
    Ok(backup)
}

fn rollback(done: Vec<(PathBuf, Option<PathBuf>)>) {
    for (target, backup) in done.into_iter().rev() {
        match backup {
            Some(backup) => restore(&target, &backup),
            None => {
                if let Err(e) = std::fs::remove_file(&target) {
                    warn!("Could not remove {}: {}", target.display(), e);
                }
            }
        }
    }
}

fn restore(target: &Path, backup: &Path) {
    if let Err(e) = std::fs::rename(backup, target) {
        warn!("Could not restore {}: {}", target.display(), e);
    }
}

/// Write `bytes` to a sibling temporary file, then rename it over `target`.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
