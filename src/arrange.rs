//! Bulk reordering helpers.

use crate::categories::Category;
use crate::entry::Entry;
use crate::group::GroupKind;
use crate::order::OrderFile;
use crate::view::ViewError;

/// Sort every group except `characters` by upper-cased display name.
/// `characters` is ordered through categories instead.
pub fn alphabetize_groups(order: &mut OrderFile) {
    for kind in GroupKind::ALL.into_iter().filter(|k| *k != GroupKind::Characters) {
        order.group_mut(kind).sort_by_cached_key(Entry::sort_name);
    }
}

/// One category per run of entries whose names share a first letter.
pub fn categories_by_initial(characters: &[Entry]) -> Result<Vec<Category>, ViewError> {
    let mut categories: Vec<Category> = Vec::new();
    let mut previous: Option<String> = None;

    for (i, entry) in characters.iter().enumerate() {
        let initial: String = entry.sort_name().chars().take(1).collect();
        if previous.as_deref() == Some(initial.as_str()) {
            continue;
        }
        let index = u16::try_from(i).map_err(|_| ViewError::CountOverflow {
            label:    initial.clone(),
            position: i,
        })?;
        categories.push(Category::new(index, initial.as_bytes()));
        previous = Some(initial);
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Descriptor;
    use crate::group::Groups;

    fn named(id: &str, name: &str) -> Entry {
        Entry::new(format!("/w/{id}").into_bytes()).with_descriptor(Descriptor::from_pairs([("name", name)]))
    }

    #[test]
    fn alphabetize_skips_characters() {
        let mut groups = Groups::default();
        groups[GroupKind::Characters] = vec![named("1", "zed"), named("2", "Abe")];
        groups[GroupKind::Stages] = vec![named("3", "tower"), named("4", "Arena"), named("5", "beach")];
        let mut order = OrderFile::new(groups);

        alphabetize_groups(&mut order);
        let stages: Vec<String> = order.group(GroupKind::Stages).iter().map(Entry::name).collect();
        assert_eq!(stages, ["Arena", "beach", "tower"]);
        assert_eq!(order.characters()[0].name(), "zed");
    }

    #[test]
    fn initial_runs() {
        let chars = [named("1", "abe"), named("2", "Ann"), named("3", "bo"), named("4", "Cy"), named("5", "carl")];
        let cats = categories_by_initial(&chars).unwrap();
        assert_eq!(cats, [Category::new(0, "A"), Category::new(2, "B"), Category::new(3, "C")]);
    }
}
