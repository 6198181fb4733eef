//! The four fixed top-level groups of the order file.
//!
//! Group order is frozen: `characters`, `buddies`, `stages`, `skins`.  The
//! order file stores them positionally, and the descriptor `type` field uses
//! the same numbering (`0..=3`).

use std::ops::{Index, IndexMut};

use crate::entry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    Characters,
    Buddies,
    Stages,
    Skins,
}

impl GroupKind {
    /// All groups in on-disk order.
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Characters,
        GroupKind::Buddies,
        GroupKind::Stages,
        GroupKind::Skins,
    ];

    #[inline]
    pub fn position(self) -> usize {
        match self {
            GroupKind::Characters => 0,
            GroupKind::Buddies    => 1,
            GroupKind::Stages     => 2,
            GroupKind::Skins      => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupKind::Characters => "characters",
            GroupKind::Buddies    => "buddies",
            GroupKind::Stages     => "stages",
            GroupKind::Skins      => "skins",
        }
    }

    /// Parse a group name as typed on the command line.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "characters" => Some(GroupKind::Characters),
            "buddies"    => Some(GroupKind::Buddies),
            "stages"     => Some(GroupKind::Stages),
            "skins"      => Some(GroupKind::Skins),
            _            => None,
        }
    }

    /// Map the descriptor's numeric `type` field.
    pub fn from_type_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(GroupKind::Characters),
            "1" => Some(GroupKind::Buddies),
            "2" => Some(GroupKind::Stages),
            "3" => Some(GroupKind::Skins),
            _   => None,
        }
    }

    /// Preview image shipped inside each entry directory.
    pub fn image_file(self) -> &'static str {
        match self {
            GroupKind::Characters | GroupKind::Skins => "result_small.png",
            GroupKind::Buddies                       => "icon.png",
            GroupKind::Stages                        => "thumb.png",
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Groups ───────────────────────────────────────────────────────────────────

/// Exactly four entry lists, addressed by [`GroupKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups([Vec<Entry>; 4]);

impl Groups {
    pub fn new(lists: [Vec<Entry>; 4]) -> Self {
        Groups(lists)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupKind, &[Entry])> {
        GroupKind::ALL.into_iter().map(move |k| (k, self[k].as_slice()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.0.iter().flatten()
    }

    pub fn total_len(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }
}

impl Index<GroupKind> for Groups {
    type Output = Vec<Entry>;
    fn index(&self, kind: GroupKind) -> &Vec<Entry> { &self.0[kind.position()] }
}

impl IndexMut<GroupKind> for Groups {
    fn index_mut(&mut self, kind: GroupKind) -> &mut Vec<Entry> { &mut self.0[kind.position()] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_disk_order() {
        for (i, k) in GroupKind::ALL.iter().enumerate() {
            assert_eq!(k.position(), i);
            assert_eq!(GroupKind::from_type_code(&i.to_string()), Some(*k));
            assert_eq!(GroupKind::from_label(k.label()), Some(*k));
        }
        assert_eq!(GroupKind::from_type_code("4"), None);
    }

    #[test]
    fn groups_index_by_kind() {
        let mut g = Groups::default();
        g[GroupKind::Stages].push(Entry::new(b"/w/stage".to_vec()));
        assert_eq!(g[GroupKind::Stages].len(), 1);
        assert_eq!(g.total_len(), 1);
        assert!(g[GroupKind::Characters].is_empty());
    }
}
