use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::Item;
use crate::id_set::IdSetStore;
use crate::known::KnownItems;
use crate::scheduler::{ScheduleStore, Scheduler};
use crate::tags::SelectedTags;

/// Landing-screen counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    /// Items left after the tag filter.
    pub items: usize,
    /// Filtered items neither scheduled nor known.
    pub new_available: usize,
    pub due_today: usize,
    pub selected_tags: usize,
    pub known: usize,
}

impl Overview {
    pub fn compute<S, K, T>(
        catalog: &[Item],
        scheduler: &Scheduler<S>,
        known: &KnownItems<K>,
        tags: &SelectedTags<T>,
        as_of: NaiveDate,
    ) -> Self
    where
        S: ScheduleStore,
        K: IdSetStore,
        T: IdSetStore,
    {
        let filtered = tags.filter().apply(catalog);
        let new_available = filtered
            .iter()
            .filter(|i| !scheduler.contains(&i.id) && !known.contains(&i.id))
            .count();

        Self {
            items: filtered.len(),
            new_available,
            due_today: scheduler.due_items(as_of).len(),
            selected_tags: tags.tags().len(),
            known: known.len(),
        }
    }
}
