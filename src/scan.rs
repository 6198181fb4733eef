//! Reconciliation: find installed entries the order file does not list yet.
//!
//! # How it works
//!
//! Every entry lives in its own directory, and entries of all four groups
//! share a small set of parent directories (the workshop roots).  The scanner:
//!
//! 1. collects the directory of every entry already in the order file,
//! 2. derives the roots as the parents of those directories, plus any
//!    explicitly configured roots,
//! 3. lists one directory level under each root,
//! 4. appends every directory not seen in step 1 to the group named by its
//!    descriptor's `type` field.
//!
//! A candidate that cannot be typed (no descriptor, unknown type code) is
//! skipped and reported; it never aborts the scan.  Running the scan again
//! against an unchanged filesystem adds nothing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::entry::{Entry, EntryError};
use crate::group::GroupKind;
use crate::order::OrderFile;

/// Outcome of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Roots that were listed.
    pub roots:   Vec<PathBuf>,
    /// Entries appended, with the group they went to.
    pub added:   Vec<(GroupKind, Entry)>,
    /// Candidates that could not be placed.
    pub skipped: Vec<(PathBuf, EntryError)>,
}

impl ScanReport {
    pub fn added_to(&self, kind: GroupKind) -> impl Iterator<Item = &Entry> {
        self.added.iter().filter(move |(k, _)| *k == kind).map(|(_, e)| e)
    }

    pub fn summary(&self) -> String {
        format!(
            "scanned {} root(s): {} new entr{} added, {} skipped",
            self.roots.len(),
            self.added.len(),
            if self.added.len() == 1 { "y" } else { "ies" },
            self.skipped.len(),
        )
    }
}

/// Append newly discovered entries to `order`.
pub fn reconcile_new_entries(order: &mut OrderFile, extra_roots: &[PathBuf]) -> ScanReport {
    let known: BTreeSet<PathBuf> = order.groups().entries().map(Entry::directory).collect();

    let mut roots: BTreeSet<PathBuf> = known
        .iter()
        .filter_map(|dir| dir.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect();
    roots.extend(extra_roots.iter().cloned());

    let on_disk: BTreeSet<PathBuf> = roots.iter().flat_map(|root| list_entry_dirs(root)).collect();

    let mut report = ScanReport { roots: roots.into_iter().collect(), ..ScanReport::default() };
    for dir in on_disk.difference(&known) {
        let entry = Entry::from_path(dir);
        match entry.category_type() {
            Ok(kind) => {
                info!("adding new entry {} to {kind}", dir.display());
                order.group_mut(kind).push(entry.clone());
                report.added.push((kind, entry));
            }
            Err(e) => {
                warn!("skipping {}: {e}", dir.display());
                report.skipped.push((dir.clone(), e));
            }
        }
    }
    debug!("{}", report.summary());
    report
}

/// Immediate subdirectories of `root`.  Unreadable roots yield nothing.
fn list_entry_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|res| match res {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("cannot list {}: {err}", root.display());
                None
            }
        })
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Groups;
    use std::fs;

    fn install(root: &Path, id: &str, type_code: Option<&str>) -> PathBuf {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        if let Some(code) = type_code {
            fs::write(
                dir.join("config.ini"),
                format!("[general]\nname=\"{id}\"\nauthor=\"t\"\ntype=\"{code}\"\n"),
            )
            .unwrap();
        }
        dir
    }

    #[test]
    fn finds_new_entries_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let known = install(root, "100", Some("0"));
        install(root, "200", Some("2"));
        install(root, "300", Some("1"));
        install(root, "400", None);
        fs::write(root.join("stray.txt"), b"not a dir").unwrap();

        let mut groups = Groups::default();
        groups[GroupKind::Characters].push(Entry::from_path(&known));
        let mut order = OrderFile::new(groups);

        let report = reconcile_new_entries(&mut order, &[]);
        assert_eq!(report.roots, [root.to_path_buf()]);
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(order.group(GroupKind::Stages)[0].id(), "200");
        assert_eq!(order.group(GroupKind::Buddies)[0].id(), "300");
        assert_eq!(order.characters().len(), 1);
        assert!(order.is_dirty());

        let again = reconcile_new_entries(&mut order, &[]);
        assert!(again.added.is_empty());
        assert_eq!(again.skipped.len(), 1);
        assert_eq!(order.groups().total_len(), 3);
    }

    #[test]
    fn extra_roots_are_listed() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "500", Some("3"));
        let mut order = OrderFile::default();

        let report = reconcile_new_entries(&mut order, &[tmp.path().to_path_buf()]);
        assert_eq!(report.added_to(GroupKind::Skins).count(), 1);
        assert_eq!(report.summary(), "scanned 1 root(s): 1 new entry added, 0 skipped");
    }

    #[test]
    fn missing_root_is_not_fatal() {
        let mut order = OrderFile::default();
        let report = reconcile_new_entries(&mut order, &[PathBuf::from("/definitely/not/here")]);
        assert!(report.added.is_empty());
    }
}
