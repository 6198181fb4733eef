//! Category editing on top of a [`NestedView`].
//!
//! A [`Session`] pairs the view with the label order that will be used when
//! it is flattened again, and keeps the two consistent: every label in the
//! view appears exactly once in the order.

use thiserror::Error;

use super::{unzip, LabelOrder, NestedView, Unzipped, ViewError};
use crate::entry::Entry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("no category named {0:?}")]
    NoSuchCategory(String),
    #[error("a category named {0:?} already exists")]
    CategoryExists(String),
    #[error("category {label:?} still holds {len} entries")]
    NotEmpty { label: String, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Per-category summary for list displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    pub name:   String,
    pub length: usize,
}

impl CategoryStats {
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.length)
    }

    /// Empty cells left in the last row of a `columns`-wide grid.  The first
    /// category shares its row with the game's random-pick slot.
    pub fn slot_waste(&self, position: usize, columns: usize) -> usize {
        if columns == 0 {
            return 0;
        }
        let occupied = self.length + usize::from(position == 0);
        (columns - occupied % columns) % columns
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    view:  NestedView,
    order: LabelOrder,
}

impl Session {
    pub fn new(view: NestedView) -> Self {
        let order = LabelOrder::of(&view);
        Self { view, order }
    }

    pub fn view(&self) -> &NestedView { &self.view }

    pub fn label_order(&self) -> &LabelOrder { &self.order }

    pub fn entries(&self, label: &str) -> Result<&[Entry], EditError> {
        self.view.get(label).ok_or_else(|| EditError::NoSuchCategory(label.to_owned()))
    }

    /// Labels with their bucket sizes, in label order.
    pub fn category_stats(&self) -> Vec<CategoryStats> {
        self.order
            .as_slice()
            .iter()
            .map(|name| CategoryStats {
                name:   name.clone(),
                length: self.view.get(name).map_or(0, <[Entry]>::len),
            })
            .collect()
    }

    pub fn add_category(&mut self, label: &str) -> Result<(), EditError> {
        if self.view.contains(label) {
            return Err(EditError::CategoryExists(label.to_owned()));
        }
        self.view.bucket_mut(label);
        self.order.push(label);
        Ok(())
    }

    pub fn rename_category(&mut self, from: &str, to: &str) -> Result<(), EditError> {
        if !self.view.contains(from) {
            return Err(EditError::NoSuchCategory(from.to_owned()));
        }
        if from == to {
            return Ok(());
        }
        if !self.view.rename(from, to) {
            return Err(EditError::CategoryExists(to.to_owned()));
        }
        self.order.rename(from, to);
        Ok(())
    }

    /// Only empty categories can be deleted.
    pub fn delete_category(&mut self, label: &str) -> Result<(), EditError> {
        let len = self.entries(label)?.len();
        if len > 0 {
            return Err(EditError::NotEmpty { label: label.to_owned(), len });
        }
        self.view.remove(label);
        self.order.remove(label);
        Ok(())
    }

    /// Swap with the neighbour in label order.  Returns `false` at the edges.
    pub fn move_category(&mut self, label: &str, direction: Direction) -> Result<bool, EditError> {
        let i = self
            .order
            .position(label)
            .ok_or_else(|| EditError::NoSuchCategory(label.to_owned()))?;
        let j = match direction {
            Direction::Up if i > 0                      => i - 1,
            Direction::Down if i + 1 < self.order.len() => i + 1,
            _                                           => return Ok(false),
        };
        self.order.swap(i, j);
        Ok(true)
    }

    /// Move `entries` from `src` to the end of `dst`.  Entries not in `src`
    /// are left alone.  Returns how many moved.
    pub fn move_entries(&mut self, src: &str, dst: &str, entries: &[Entry]) -> Result<usize, EditError> {
        if !self.view.contains(dst) {
            return Err(EditError::NoSuchCategory(dst.to_owned()));
        }
        let from = self
            .view
            .get_mut(src)
            .ok_or_else(|| EditError::NoSuchCategory(src.to_owned()))?;

        let mut moved = Vec::new();
        for entry in entries {
            if let Some(i) = from.iter().position(|e| e == entry) {
                moved.push(from.remove(i));
            }
        }
        let count = moved.len();
        self.view.bucket_mut(dst).extend(moved);
        Ok(count)
    }

    /// Shift each selected entry one place within its category.  Entries at
    /// the edge stay where they are.
    pub fn shift_entries(&mut self, label: &str, entries: &[Entry], direction: Direction) -> Result<(), EditError> {
        let list = self
            .view
            .get_mut(label)
            .ok_or_else(|| EditError::NoSuchCategory(label.to_owned()))?;

        let mut selected: Vec<&Entry> = entries.iter().collect();
        if direction == Direction::Down {
            selected.reverse();
        }
        for entry in selected {
            let Some(i) = list.iter().position(|e| e == entry) else { continue };
            match direction {
                Direction::Up if i > 0               => list.swap(i, i - 1),
                Direction::Down if i + 1 < list.len() => list.swap(i, i + 1),
                _                                    => {}
            }
        }
        Ok(())
    }

    /// Stable sort of one category.
    pub fn sort_category_by<K, F>(&mut self, label: &str, key: F) -> Result<(), EditError>
    where
        K: Ord,
        F: FnMut(&Entry) -> K,
    {
        self.view
            .get_mut(label)
            .ok_or_else(|| EditError::NoSuchCategory(label.to_owned()))?
            .sort_by_key(key);
        Ok(())
    }

    pub fn unzip(&self) -> Result<Unzipped, ViewError> {
        unzip(&self.view, &self.order)
    }
}

impl From<NestedView> for Session {
    fn from(view: NestedView) -> Self { Session::new(view) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::Category;
    use crate::view::zip_characters;

    fn entry(id: &str) -> Entry {
        Entry::new(format!("/w/{id}").into_bytes())
    }

    fn ids(s: &Session, label: &str) -> Vec<String> {
        s.entries(label).unwrap().iter().map(Entry::id).collect()
    }

    fn session() -> Session {
        let chars: Vec<Entry> = ["A", "B", "C", "D"].into_iter().map(entry).collect();
        Session::new(zip_characters(&chars, &[Category::new(0, "x"), Category::new(2, "y")]))
    }

    #[test]
    fn add_rename_delete() {
        let mut s = session();
        s.add_category("z").unwrap();
        assert_eq!(s.add_category("z"), Err(EditError::CategoryExists("z".into())));
        s.rename_category("z", "w").unwrap();
        assert_eq!(s.rename_category("w", "x"), Err(EditError::CategoryExists("x".into())));
        assert_eq!(s.label_order().as_slice(), ["x", "y", "w"]);

        assert_eq!(
            s.delete_category("x"),
            Err(EditError::NotEmpty { label: "x".into(), len: 2 })
        );
        s.delete_category("w").unwrap();
        assert!(!s.view().contains("w"));
        assert_eq!(s.label_order().as_slice(), ["x", "y"]);
    }

    #[test]
    fn move_category_respects_edges() {
        let mut s = session();
        assert!(!s.move_category("x", Direction::Up).unwrap());
        assert!(s.move_category("x", Direction::Down).unwrap());
        assert_eq!(s.label_order().as_slice(), ["y", "x"]);
        assert_eq!(s.move_category("nope", Direction::Up), Err(EditError::NoSuchCategory("nope".into())));
    }

    #[test]
    fn move_entries_between_categories() {
        let mut s = session();
        let moved = s.move_entries("x", "y", &[entry("A"), entry("C")]).unwrap();
        assert_eq!(moved, 1);
        assert_eq!(ids(&s, "x"), ["B"]);
        assert_eq!(ids(&s, "y"), ["C", "D", "A"]);
    }

    #[test]
    fn shift_entries_block_moves_together() {
        let mut s = session();
        s.move_entries("y", "x", &[entry("C"), entry("D")]).unwrap();
        s.shift_entries("x", &[entry("C"), entry("D")], Direction::Up).unwrap();
        assert_eq!(ids(&s, "x"), ["A", "C", "D", "B"]);
        s.shift_entries("x", &[entry("C"), entry("D")], Direction::Down).unwrap();
        assert_eq!(ids(&s, "x"), ["A", "B", "C", "D"]);
        s.shift_entries("x", &[entry("D")], Direction::Down).unwrap();
        assert_eq!(ids(&s, "x"), ["A", "B", "C", "D"]);
    }

    #[test]
    fn sort_and_unzip() {
        let mut s = session();
        s.sort_category_by("y", |e| std::cmp::Reverse(e.id())).unwrap();
        s.move_category("y", Direction::Up).unwrap();
        let out = s.unzip().unwrap();
        let flat: Vec<String> = out.characters.iter().map(Entry::id).collect();
        assert_eq!(flat, ["D", "C", "A", "B"]);
        assert_eq!(out.categories, [Category::new(0, "y"), Category::new(2, "x")]);
    }

    #[test]
    fn stats_and_slot_waste() {
        let s = session();
        let stats = s.category_stats();
        assert_eq!(stats[0].label(), "x (2)");
        assert_eq!(stats[0].slot_waste(0, 4), 1);
        assert_eq!(stats[1].slot_waste(1, 4), 2);
        assert_eq!(stats[1].slot_waste(1, 16), 14);
    }
}
