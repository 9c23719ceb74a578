use crate::asset::Handle;

use super::model::Model;
use super::nugget::NuggetKey;
use super::sort_key::SortKey;

/// One draw in the working set of a pass: which instance, which nugget,
/// and the fully-composed ordering key. Plain data; rebuilt every time
/// the instance set changes and discarded with the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawlistEntry {
    pub instance: hecs::Entity,
    pub model: Handle<Model>,
    pub nugget: NuggetKey,
    pub key: SortKey,
}

/// Append-then-sort working set for one render step.
///
/// Sorting is amortized: the list remembers whether anything was appended
/// since the last sort and `sort_if_needed` is a no-op otherwise, so a
/// steady-state scene pays no per-frame sort cost.
#[derive(Default)]
pub struct Drawlist {
    entries: Vec<DrawlistEntry>,
    dirty: bool,
    sorts: u64,
}

impl Drawlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DrawlistEntry) {
        self.entries.push(entry);
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty = false;
    }

    /// Stable sort by raw key value, at most once per rebuild. Stability
    /// keeps equal-key entries in insertion order, which the contiguity
    /// guarantees rely on.
    pub fn sort_if_needed(&mut self) {
        if !self.dirty {
            return;
        }
        self.entries.sort_by_key(|entry| entry.key.value());
        self.sorts += 1;
        self.dirty = false;
    }

    pub fn entries(&self) -> &[DrawlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total sorts performed since creation. Instrumentation for stats
    /// logging and the sort-amortization tests.
    pub fn sort_count(&self) -> u64 {
        self.sorts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::sort_key::SortGroup;

    fn entry(key: SortKey) -> DrawlistEntry {
        DrawlistEntry {
            instance: hecs::World::new().spawn(()),
            model: Handle::new(0),
            nugget: NuggetKey::default(),
            key,
        }
    }

    #[test]
    fn sorts_by_raw_key_value() {
        let mut list = Drawlist::new();
        list.push(entry(SortKey::default().with_group(SortGroup::ALPHA_FRONT)));
        list.push(entry(SortKey::default().with_group(SortGroup::OPAQUE)));
        list.push(entry(SortKey::default().with_group(SortGroup::ALPHA_BACK)));

        list.sort_if_needed();

        let groups: Vec<_> = list.entries().iter().map(|e| e.key.group()).collect();
        assert_eq!(
            groups,
            vec![SortGroup::OPAQUE, SortGroup::ALPHA_BACK, SortGroup::ALPHA_FRONT]
        );
    }

    #[test]
    fn sort_is_skipped_when_nothing_was_appended() {
        let mut list = Drawlist::new();
        list.push(entry(SortKey::default()));
        list.push(entry(SortKey::default().with_group(SortGroup::SKYBOX)));

        list.sort_if_needed();
        assert_eq!(list.sort_count(), 1);

        // Frames with an unchanged entry set pay no sort cost.
        list.sort_if_needed();
        list.sort_if_needed();
        assert_eq!(list.sort_count(), 1);

        list.push(entry(SortKey::default()));
        list.sort_if_needed();
        assert_eq!(list.sort_count(), 2);
    }

    #[test]
    fn clear_resets_the_dirty_flag() {
        let mut list = Drawlist::new();
        list.push(entry(SortKey::default()));
        list.clear();
        list.sort_if_needed();
        assert_eq!(list.sort_count(), 0);
        assert!(list.is_empty());
    }
}
