//! Workspace replacement: delete stale entries, write the new snapshot.
//!
//! ## `sync` — 4-step protocol
//!
//! 1. Validate every snapshot path against the root (whole sync rejected on
//!    the first unsafe path, before anything touches disk).
//! 2. Delete every existing file whose relative path is not under a
//!    protected path; prune directories left empty.
//! 3. Write each snapshot file to `<root>/<path>` via `<path>.vigil.tmp` +
//!    rename (atomic on POSIX), creating parent directories as needed.
//! 4. Report written / deleted / preserved paths.
//!
//! Deletion strictly precedes writing so a completed sync equals the
//! snapshot union the protected set, with no stale files from a previous
//! commit.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use vigil_core::types::FileEntry;

use crate::error::{io_err, SyncError};

const TMP_SUFFIX: &str = ".vigil.tmp";

// ---------------------------------------------------------------------------
// Sync report
// ---------------------------------------------------------------------------

/// Outcome of one workspace sync. All paths are workspace-relative.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Files written from the snapshot.
    pub written: Vec<PathBuf>,
    /// Pre-existing files deleted as stale.
    pub deleted: Vec<PathBuf>,
    /// Pre-existing files kept because they sit under a protected path.
    pub preserved: Vec<PathBuf>,
    /// Snapshot entries withheld because they target a protected path.
    pub withheld: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

/// Reconcile `root` against `entries`, never touching `protected` paths.
pub fn sync(
    root: &Path,
    protected: &BTreeSet<PathBuf>,
    entries: &[FileEntry],
) -> Result<SyncReport, SyncError> {
    // Step 1: reject the entire snapshot on the first escaping path.
    for entry in entries {
        validate_relative(&entry.path)?;
    }

    if !root.exists() {
        fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    }

    let mut report = SyncReport::default();

    // Step 2: deletion before write.
    for rel in existing_files(root)? {
        if is_protected(&rel, protected) {
            report.preserved.push(rel);
            continue;
        }
        let absolute = root.join(&rel);
        fs::remove_file(&absolute).map_err(|e| io_err(&absolute, e))?;
        report.deleted.push(rel);
    }
    prune_empty_dirs(root)?;

    // Step 3: write the snapshot.
    for entry in entries {
        if is_protected(&entry.path, protected) {
            tracing::debug!(path = %entry.path.display(), "withholding write to protected path");
            report.withheld.push(entry.path.clone());
            continue;
        }
        write_file(root, &entry.path, &entry.content)?;
        report.written.push(entry.path.clone());
    }

    tracing::info!(
        written = report.written.len(),
        deleted = report.deleted.len(),
        preserved = report.preserved.len(),
        "workspace synchronized",
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Path safety
// ---------------------------------------------------------------------------

/// A snapshot path must stay strictly inside the root: relative, non-empty,
/// and free of `..` components.
fn validate_relative(path: &Path) -> Result<(), SyncError> {
    let mut saw_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => saw_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SyncError::Unsafe {
                    path: path.to_path_buf(),
                });
            }
        }
    }
    if !saw_normal {
        return Err(SyncError::Unsafe {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn is_protected(rel: &Path, protected: &BTreeSet<PathBuf>) -> bool {
    protected.iter().any(|prefix| rel.starts_with(prefix))
}

// ---------------------------------------------------------------------------
// Filesystem passes
// ---------------------------------------------------------------------------

/// All files currently under `root`, as sorted relative paths.
fn existing_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    let mut cursor = 0;
    while cursor < dirs.len() {
        let current = dirs[cursor].clone();
        cursor += 1;
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&current, err)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&current, e))?;
            let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if ty.is_dir() {
                dirs.push(entry.path());
            } else {
                let rel = entry
                    .path()
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| entry.path());
                files.push(rel);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Remove directories emptied by the deletion pass, deepest first. A
/// directory still holding protected files is simply left in place.
fn prune_empty_dirs(root: &Path) -> Result<(), SyncError> {
    let mut dirs = Vec::new();
    let mut queue = vec![root.to_path_buf()];
    let mut cursor = 0;
    while cursor < queue.len() {
        let current = queue[cursor].clone();
        cursor += 1;
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&current, err)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&current, e))?;
            let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if ty.is_dir() {
                queue.push(entry.path());
                dirs.push(entry.path());
            }
        }
    }
    for dir in dirs.into_iter().rev() {
        // Fails when non-empty; that is the signal to keep it.
        let _ = fs::remove_dir(&dir);
    }
    Ok(())
}

/// Write one snapshot file via tmp + rename, creating parents as needed.
fn write_file(root: &Path, rel: &Path, content: &[u8]) -> Result<(), SyncError> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
