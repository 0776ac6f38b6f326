//! File removal before and after a run.
//!
//! The driver fails loudly on removal errors. `NotFound` is not an error: the
//! file is gone either way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifacts::{BITCODE_SUFFIX, IR_SUFFIX};
use crate::error::DriverError;

/// What gets removed before the first stage runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanPolicy {
    /// Every `*.ll` / `*.bc` in the working directory, whatever produced it.
    #[default]
    Directory,
    /// Only this run's derived artifacts.
    Derived,
    /// Nothing.
    #[serde(rename = "none")]
    Skip,
}

/// Suffixes swept by [`CleanPolicy::Directory`].
pub const SWEPT_SUFFIXES: [&str; 2] = [IR_SUFFIX, BITCODE_SUFFIX];

/// Removes every regular file in `dir` whose name ends in one of `suffixes`.
/// Returns the removed paths, sorted.
pub fn sweep_dir(dir: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>, DriverError> {
    let read_dir_err = |source| DriverError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    };

    let mut doomed = Vec::new();
    for ent in fs::read_dir(dir).map_err(read_dir_err)? {
        let ent = ent.map_err(read_dir_err)?;
        let Ok(ft) = ent.file_type() else { continue };
        if ft.is_dir() {
            continue;
        }
        let name = ent.file_name();
        let Some(name) = name.to_str() else { continue };
        if suffixes.iter().any(|s| name.ends_with(s)) {
            doomed.push(ent.path());
        }
    }
    doomed.sort();

    remove_paths(doomed)
}

/// Removes each path, skipping ones that do not exist. Returns what was removed.
pub fn remove_paths<I>(paths: I) -> Result<Vec<PathBuf>, DriverError>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut removed = Vec::new();
    for p in paths {
        if remove_file(&p)? {
            removed.push(p);
        }
    }
    Ok(removed)
}

fn remove_file(path: &Path) -> Result<bool, DriverError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(DriverError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_removes_matching_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["a.ll", "b.bc", "keep.c", "notes.llx"] {
            fs::write(dir.path().join(f), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.ll")).unwrap();

        let removed = sweep_dir(dir.path(), &SWEPT_SUFFIXES).unwrap();

        assert_eq!(
            removed,
            vec![dir.path().join("a.ll"), dir.path().join("b.bc")]
        );
        assert!(dir.path().join("keep.c").exists());
        assert!(dir.path().join("notes.llx").exists());
        assert!(dir.path().join("sub.ll").is_dir());
    }

    #[test]
    fn missing_paths_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let removed = remove_paths([dir.path().join("ghost.ll")]).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn sweeping_a_missing_dir_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let err = sweep_dir(&dir.path().join("nope"), &SWEPT_SUFFIXES).unwrap_err();
        assert!(matches!(err, DriverError::ReadDir { .. }));
    }

    #[test]
    fn policy_names_in_config() {
        #[derive(Deserialize)]
        struct Wrap {
            clean: CleanPolicy,
        }
        let w: Wrap = serde_json::from_str(r#"{"clean":"none"}"#).unwrap();
        assert_eq!(w.clean, CleanPolicy::Skip);
        let w: Wrap = serde_json::from_str(r#"{"clean":"derived"}"#).unwrap();
        assert_eq!(w.clean, CleanPolicy::Derived);
    }
}
