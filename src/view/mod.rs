//! Projection between the flat on-disk form and the nested label view.
//!
//! On disk, `characters` is one flat list and `categories.roa` holds the
//! positions where each named segment starts.  Everything that edits
//! categories works on a [`NestedView`] instead: label → ordered entries.
//!
//! - [`zip`] walks the flat list once and buckets entries by the most recent
//!   boundary.  Entries before the first boundary go to the unsorted label `""`.
//! - [`unzip`] flattens buckets in an explicit [`LabelOrder`] and recomputes
//!   boundaries.  Empty buckets produce no boundary, so they do not survive a
//!   save/load cycle.

pub mod session;

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::categories::{CategoriesFile, Category};
use crate::entry::Entry;
use crate::group::GroupKind;
use crate::order::OrderFile;

pub use session::{CategoryStats, Direction, EditError, Session};

/// Label of the implicit segment before the first boundary.
pub const UNSORTED: &str = "";
/// Bucket for entries that no longer exist; lookup misses under it are silent.
pub const REMOVED: &str = "_removed";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("category {label:?} starts at position {position}, past the 16-bit index limit")]
    CountOverflow { label: String, position: usize },
}

/// Non-fatal problems found while flattening or resolving labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelWarning {
    /// Named in the label order but absent from the view.
    MissingLabel(String),
    /// Named more than once in the label order; later occurrences are skipped.
    RepeatedLabel(String),
    /// Present in the view but not in the label order; appended at the end.
    UnreferencedLabel(String),
    /// Entry already placed under an earlier label; skipped.
    DuplicateEntry { label: String, entry: String },
    /// Sort-file key that matched no entry in the order file; skipped.
    UnknownEntry { label: String, key: String },
    /// Installed entry the sort file never lists; appended to `unsorted`.
    UnlistedEntry { key: String },
}

// ── NestedView ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    pub label:   String,
    pub entries: Vec<Entry>,
    /// On-disk bytes when `label` is a lossy rendering of them.
    raw:         Option<Vec<u8>>,
}

impl Bucket {
    /// Bytes to write back for this label.
    pub fn raw_label(&self) -> &[u8] {
        self.raw.as_deref().unwrap_or(self.label.as_bytes())
    }
}

/// Ordered label → entries mapping.  Labels are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedView {
    buckets: Vec<Bucket>,
}

impl NestedView {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.buckets.len() }

    pub fn is_empty(&self) -> bool { self.buckets.is_empty() }

    pub fn buckets(&self) -> &[Bucket] { &self.buckets }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.label.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    pub fn get(&self, label: &str) -> Option<&[Entry]> {
        self.buckets.iter().find(|b| b.label == label).map(|b| b.entries.as_slice())
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Vec<Entry>> {
        self.buckets.iter_mut().find(|b| b.label == label).map(|b| &mut b.entries)
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.buckets.iter().position(|b| b.label == label)
    }

    /// Bucket for `label`, created empty at the end if needed.
    pub fn bucket_mut(&mut self, label: &str) -> &mut Vec<Entry> {
        let i = match self.position(label) {
            Some(i) => i,
            None => {
                self.buckets.push(Bucket { label: label.to_owned(), entries: Vec::new(), raw: None });
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[i].entries
    }

    pub fn push(&mut self, label: &str, entry: Entry) {
        self.bucket_mut(label).push(entry);
    }

    pub fn remove(&mut self, label: &str) -> Option<Vec<Entry>> {
        self.position(label).map(|i| self.buckets.remove(i).entries)
    }

    /// Rename in place.  Returns `false` when `from` is absent or `to` exists.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if self.contains(to) {
            return false;
        }
        match self.buckets.iter_mut().find(|b| b.label == from) {
            Some(b) => {
                b.label = to.to_owned();
                b.raw = None;
                true
            }
            None => false,
        }
    }

    /// Bytes `unzip` writes for `label`.
    pub fn raw_label<'a>(&'a self, label: &'a str) -> &'a [u8] {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map_or(label.as_bytes(), Bucket::raw_label)
    }

    fn keep_raw_label(&mut self, label: &str, raw: &[u8]) {
        if let Some(b) = self.buckets.iter_mut().find(|b| b.label == label) {
            b.raw = Some(raw.to_vec());
        }
    }

    /// Same view without empty buckets.
    pub fn non_empty(&self) -> NestedView {
        NestedView {
            buckets: self.buckets.iter().filter(|b| !b.entries.is_empty()).cloned().collect(),
        }
    }
}

// ── LabelOrder ───────────────────────────────────────────────────────────────

/// Caller-owned order in which labels are written back to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOrder(Vec<String>);

impl LabelOrder {
    pub fn new(labels: Vec<String>) -> Self { LabelOrder(labels) }

    /// The view's own first-seen order.
    pub fn of(view: &NestedView) -> Self {
        LabelOrder(view.labels().map(str::to_owned).collect())
    }

    pub fn as_slice(&self) -> &[String] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool { self.position(label).is_some() }

    pub fn push(&mut self, label: impl Into<String>) { self.0.push(label.into()) }

    pub fn remove(&mut self, label: &str) -> bool {
        match self.position(label) {
            Some(i) => {
                self.0.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn rename(&mut self, from: &str, to: &str) {
        for l in self.0.iter_mut().filter(|l| l.as_str() == from) {
            *l = to.to_owned();
        }
    }

    pub fn swap(&mut self, a: usize, b: usize) { self.0.swap(a, b) }
}

impl<S: Into<String>> FromIterator<S> for LabelOrder {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LabelOrder(iter.into_iter().map(Into::into).collect())
    }
}

// ── zip ──────────────────────────────────────────────────────────────────────

pub fn zip(order: &OrderFile, categories: &CategoriesFile) -> NestedView {
    zip_characters(order.group(GroupKind::Characters), categories.categories())
}

/// Single pass over `characters`, consuming boundaries in file order.
///
/// Several boundaries at the same index: the last one names the segment.
/// A boundary whose index is already behind the cursor, or past the end of
/// the list, never names anything and is logged.
pub fn zip_characters(characters: &[Entry], boundaries: &[Category]) -> NestedView {
    let mut view    = NestedView::new();
    let mut label   = String::from(UNSORTED);
    let mut raw: Option<&[u8]> = None;
    let mut pending = boundaries.iter().peekable();

    for (i, entry) in characters.iter().enumerate() {
        while let Some(&b) = pending.peek() {
            let index = b.index as usize;
            if index > i {
                break;
            }
            if index == i {
                label = b.label_str().into_owned();
                raw = (label.as_bytes() != b.label.as_slice()).then_some(b.label.as_slice());
                if raw.is_some() {
                    warn!("category label {} is not valid UTF-8; shown as {label:?}", hex::encode(&b.label));
                }
            } else {
                warn!("category {:?} at index {} is out of order; ignored", b.label_str(), index);
            }
            pending.next();
        }
        view.push(&label, entry.clone());
        if let Some(bytes) = raw.take() {
            view.keep_raw_label(&label, bytes);
        }
    }

    for b in pending {
        debug!("category {:?} at index {} is past the end of the list", b.label_str(), b.index);
    }
    view
}

// ── unzip ────────────────────────────────────────────────────────────────────

/// Flattened form ready to be written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unzipped {
    pub characters: Vec<Entry>,
    pub categories: Vec<Category>,
    pub warnings:   Vec<LabelWarning>,
}

impl Unzipped {
    /// Replace the `characters` group and the category list.
    pub fn apply(self, order: &mut OrderFile, categories: &mut CategoriesFile) -> Vec<LabelWarning> {
        order.set_group(GroupKind::Characters, self.characters);
        categories.replace(self.categories);
        self.warnings
    }
}

pub fn unzip(view: &NestedView, label_order: &LabelOrder) -> Result<Unzipped, ViewError> {
    let mut out = Unzipped::default();
    let mut seen_labels: HashSet<&str> = HashSet::new();
    let mut placed: HashSet<&Entry> = HashSet::new();

    let mut sequence: Vec<&str> = Vec::with_capacity(label_order.len());
    for label in label_order.as_slice() {
        if !seen_labels.insert(label.as_str()) {
            warn!("label {label:?} repeated in label order; skipped");
            out.warnings.push(LabelWarning::RepeatedLabel(label.clone()));
        } else if !view.contains(label) {
            if label != REMOVED {
                warn!("label {label:?} not found in view; skipped");
                out.warnings.push(LabelWarning::MissingLabel(label.clone()));
            }
        } else {
            sequence.push(label);
        }
    }
    for label in view.labels() {
        if !seen_labels.contains(label) && view.get(label).is_some_and(|e| !e.is_empty()) {
            warn!("label {label:?} missing from label order; appended");
            out.warnings.push(LabelWarning::UnreferencedLabel(label.to_owned()));
            sequence.push(label);
        }
    }

    for label in sequence {
        let entries = view.get(label).unwrap_or_default();
        let start = out.characters.len();
        let mut opened = false;
        for entry in entries {
            if !placed.insert(entry) {
                warn!("{entry:?} already placed; duplicate under {label:?} skipped");
                out.warnings.push(LabelWarning::DuplicateEntry {
                    label: label.to_owned(),
                    entry: String::from_utf8_lossy(entry.value()).into_owned(),
                });
                continue;
            }
            if !opened {
                let index = u16::try_from(start).map_err(|_| ViewError::CountOverflow {
                    label:    label.to_owned(),
                    position: start,
                })?;
                out.categories.push(Category::new(index, view.raw_label(label)));
                opened = true;
            }
            out.characters.push(entry.clone());
        }
    }
    Ok(out)
}
