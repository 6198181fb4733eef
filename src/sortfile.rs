//! Human-editable sort file.
//!
//! A JSON array of categories, each listing entries by their
//! [`Entry::repr`] string, in the order they should be written back:
//!
//! ```json
//! [
//!   { "label": "Favourites", "entries": ["<\"Kragg\" 1865 by \"Dan\">"] },
//!   { "label": "unsorted",   "entries": [] }
//! ]
//! ```
//!
//! The file is the editable mirror of the `characters` group.  [`SortFile::sync`]
//! brings it up to date with the order file, and [`SortFile::resolve`] turns
//! it back into a [`NestedView`] that can be flattened.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::entry::Entry;
use crate::view::{LabelOrder, LabelWarning, NestedView, REMOVED};

/// Category that receives entries missing from the sort file.
pub const UNSORTED_LABEL: &str = "unsorted";

#[derive(Error, Debug)]
pub enum SortFileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid sort file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCategory {
    pub label:   String,
    #[serde(default)]
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortFile {
    pub categories: Vec<SortCategory>,
}

/// What [`SortFile::sync`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub duplicates_removed: Vec<String>,
    pub moved_to_removed:   Vec<String>,
    pub added_to_unsorted:  Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.duplicates_removed.is_empty()
            && self.moved_to_removed.is_empty()
            && self.added_to_unsorted.is_empty()
    }
}

impl SortFile {
    pub fn from_view(view: &NestedView, order: &LabelOrder) -> Self {
        let categories = order
            .as_slice()
            .iter()
            .filter_map(|label| {
                view.get(label).map(|entries| SortCategory {
                    label:   label.clone(),
                    entries: entries.iter().map(Entry::repr).collect(),
                })
            })
            .collect();
        SortFile { categories }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, SortFileError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SortFileError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SortFileError> {
        Self::from_json(&fs::read(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SortFileError> {
        info!("writing {}", path.display());
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn category(&self, label: &str) -> Option<&SortCategory> {
        self.categories.iter().find(|c| c.label == label)
    }

    fn category_mut(&mut self, label: &str) -> &mut SortCategory {
        let i = match self.categories.iter().position(|c| c.label == label) {
            Some(i) => i,
            None => {
                self.categories.push(SortCategory { label: label.to_owned(), entries: Vec::new() });
                self.categories.len() - 1
            }
        };
        &mut self.categories[i]
    }

    /// Bring the file in line with `characters`:
    /// 1. drop repeated keys (first occurrence wins; `_removed` is exempt),
    /// 2. move keys with no matching entry into `_removed`,
    /// 3. append entries that appear nowhere to `unsorted`.
    pub fn sync(&mut self, characters: &[Entry]) -> SyncReport {
        let mut report = SyncReport::default();
        let known: HashSet<String> = characters.iter().map(Entry::repr).collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut stale: Vec<String> = Vec::new();
        for cat in self.categories.iter_mut().filter(|c| c.label != REMOVED) {
            let mut kept = Vec::with_capacity(cat.entries.len());
            for key in cat.entries.drain(..) {
                if !seen.insert(key.clone()) {
                    warn!("{key} appears twice; removing duplicate");
                    report.duplicates_removed.push(key);
                } else if !known.contains(&key) {
                    warn!("{key} no longer installed; moving to {REMOVED}");
                    stale.push(key);
                } else {
                    kept.push(key);
                }
            }
            cat.entries = kept;
        }
        if !stale.is_empty() {
            self.category_mut(REMOVED).entries.extend(stale.iter().cloned());
            report.moved_to_removed = stale;
        }

        let listed: HashSet<&String> = self.categories.iter().flat_map(|c| &c.entries).collect();
        let mut missing: Vec<String> = characters
            .iter()
            .map(Entry::repr)
            .filter(|r| !listed.contains(r))
            .collect();
        missing.dedup();
        for key in &missing {
            info!("{key} not in sort file; adding to {UNSORTED_LABEL}");
        }
        self.category_mut(UNSORTED_LABEL).entries.extend(missing.iter().cloned());
        report.added_to_unsorted = missing;
        report
    }

    /// Look every key up in `characters` and build the view to flatten.
    ///
    /// Unknown keys are skipped with a warning, except under `_removed`
    /// where they are expected and dropped silently.  Characters the file
    /// never lists are appended to `unsorted` with a warning, so flattening
    /// the result never loses an installed entry.
    pub fn resolve(&self, characters: &[Entry]) -> (NestedView, LabelOrder, Vec<LabelWarning>) {
        let by_key: HashMap<String, &Entry> = characters.iter().map(|e| (e.repr(), e)).collect();

        let mut view     = NestedView::new();
        let mut order    = LabelOrder::default();
        let mut warnings = Vec::new();

        for cat in &self.categories {
            if order.contains(&cat.label) {
                warn!("label {:?} listed twice in sort file; merging", cat.label);
                warnings.push(LabelWarning::RepeatedLabel(cat.label.clone()));
            } else {
                order.push(cat.label.clone());
            }
            let bucket = view.bucket_mut(&cat.label);
            for key in &cat.entries {
                match by_key.get(key) {
                    Some(entry) => bucket.push((*entry).clone()),
                    None if cat.label == REMOVED => {}
                    None => {
                        warn!("couldn't find {key} among installed entries; skipped");
                        warnings.push(LabelWarning::UnknownEntry {
                            label: cat.label.clone(),
                            key:   key.clone(),
                        });
                    }
                }
            }
        }

        let mut seen: HashSet<&Entry> = view.buckets().iter().flat_map(|b| &b.entries).collect();
        let unlisted: Vec<Entry> = characters.iter().filter(|e| seen.insert(*e)).cloned().collect();
        if !unlisted.is_empty() && !order.contains(UNSORTED_LABEL) {
            order.push(UNSORTED_LABEL);
        }
        for entry in unlisted {
            let key = entry.repr();
            warn!("{key} is not listed in the sort file; adding to {UNSORTED_LABEL}");
            warnings.push(LabelWarning::UnlistedEntry { key });
            view.push(UNSORTED_LABEL, entry);
        }
        (view, order, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Descriptor;
    use crate::categories::Category;
    use crate::view::{unzip, zip_characters};

    fn entry(id: &str, name: &str) -> Entry {
        Entry::new(format!("/w/{id}").into_bytes())
            .with_descriptor(Descriptor::from_pairs([("name", format!("\"{name}\"")), ("author", "\"Dan\"".to_owned())]))
    }

    fn cat(label: &str, entries: &[&Entry]) -> SortCategory {
        SortCategory { label: label.into(), entries: entries.iter().map(|e| e.repr()).collect() }
    }

    #[test]
    fn json_shape_is_an_ordered_array() {
        let a = entry("1", "Kragg");
        let file = SortFile { categories: vec![cat("zeta", &[&a]), cat("alpha", &[])] };
        let json = String::from_utf8(file.to_json().unwrap()).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
        assert_eq!(SortFile::from_json(json.as_bytes()).unwrap(), file);
    }

    #[test]
    fn sync_dedupes_moves_stale_and_adds_missing() {
        let (a, b, c, gone) = (entry("1", "A"), entry("2", "B"), entry("3", "C"), entry("9", "Gone"));
        let mut file = SortFile {
            categories: vec![cat("x", &[&a, &gone]), cat("y", &[&a, &b])],
        };
        let report = file.sync(&[a.clone(), b.clone(), c.clone()]);

        assert_eq!(report.duplicates_removed, [a.repr()]);
        assert_eq!(report.moved_to_removed, [gone.repr()]);
        assert_eq!(report.added_to_unsorted, [c.repr()]);
        assert_eq!(file.category("x").unwrap().entries, [a.repr()]);
        assert_eq!(file.category("y").unwrap().entries, [b.repr()]);
        assert_eq!(file.category(REMOVED).unwrap().entries, [gone.repr()]);
        assert_eq!(file.category(UNSORTED_LABEL).unwrap().entries, [c.repr()]);

        let again = file.sync(&[a, b, c]);
        assert!(again.is_empty());
    }

    #[test]
    fn resolve_skips_unknown_keys_silently_under_removed() {
        let (a, b, gone) = (entry("1", "A"), entry("2", "B"), entry("9", "Gone"));
        let file = SortFile {
            categories: vec![
                cat("x", &[&b, &gone]),
                cat(REMOVED, &[&gone]),
                cat("empty", &[]),
                cat("y", &[&a]),
            ],
        };
        let (view, order, warnings) = file.resolve(&[a.clone(), b.clone()]);
        assert_eq!(view.get("x").unwrap(), [b.clone()]);
        assert!(view.get(REMOVED).unwrap().is_empty());
        assert_eq!(
            warnings,
            [LabelWarning::UnknownEntry { label: "x".into(), key: gone.repr() }]
        );

        let out = unzip(&view, &order).unwrap();
        assert_eq!(out.characters, [b, a]);
        assert_eq!(out.categories.len(), 2);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn from_view_round_trip_through_resolve() {
        let (a, b) = (entry("1", "A"), entry("2", "B"));
        let mut view = NestedView::new();
        view.push("x", a.clone());
        view.push("y", b.clone());
        let order = LabelOrder::from_iter(["y", "x"]);
        let file = SortFile::from_view(&view, &order);
        let (back, back_order, warnings) = file.resolve(&[a, b]);
        assert!(warnings.is_empty());
        assert_eq!(back_order, order);
        assert_eq!(back.get("x"), view.get("x"));
    }

    #[test]
    fn unlisted_characters_are_kept_in_unsorted() {
        let (a, b) = (entry("1", "A"), entry("2", "B"));
        let mut view = NestedView::new();
        view.push("x", a.clone());
        let file = SortFile::from_view(&view, &LabelOrder::of(&view));

        let (back, order, warnings) = file.resolve(&[a.clone(), b.clone(), b.clone()]);
        assert_eq!(warnings, [LabelWarning::UnlistedEntry { key: b.repr() }]);
        assert_eq!(order.as_slice(), ["x", UNSORTED_LABEL]);

        let out = unzip(&back, &order).unwrap();
        assert_eq!(out.characters, [a, b]);
        assert_eq!(out.categories[1].label, UNSORTED_LABEL.as_bytes());
    }

    #[test]
    fn real_unsorted_category_keeps_its_name() {
        let (a, b, c) = (entry("1", "A"), entry("2", "B"), entry("3", "C"));
        let chars = [a, b, c];
        let cats = [Category::new(0, "Fire"), Category::new(1, UNSORTED_LABEL)];
        let view = zip_characters(&chars, &cats);

        let mut file = SortFile::from_view(&view, &LabelOrder::of(&view));
        assert!(file.sync(&chars).is_empty());
        let (back, order, warnings) = file.resolve(&chars);
        assert!(warnings.is_empty());

        let out = unzip(&back, &order).unwrap();
        assert_eq!(out.categories, cats);
        assert_eq!(out.characters, chars);
    }
}
