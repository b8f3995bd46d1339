//! Tag selection for narrowing the catalog.
//!
//! Tags are namespaced as `namespace:value` (`topic:food`, `pos:noun`,
//! `list:top500`). Selected values within one namespace are alternatives;
//! namespaces must all match. A namespace with nothing selected does not
//! filter at all.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Item;
use crate::id_set::IdSetStore;
use crate::store::Result;

pub const SELECTED_TAGS_SLOT: &str = "selected_tags.json";

pub struct SelectedTags<S: IdSetStore> {
    store: S,
    tags: BTreeSet<String>,
}

impl<S: IdSetStore> SelectedTags<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tags: BTreeSet::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        self.tags = self.store.load()?;
        Ok(())
    }

    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.tags)
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Replaces the selection and persists it. The in-memory selection is kept
    /// even if the write fails.
    pub fn set(&mut self, tags: BTreeSet<String>) -> Result<()> {
        self.tags = tags;
        self.persist()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.set(BTreeSet::new())
    }

    pub fn filter(&self) -> TagFilter {
        TagFilter::new(&self.tags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    by_namespace: BTreeMap<String, BTreeSet<String>>,
}

impl TagFilter {
    pub fn new<'a>(selected: impl IntoIterator<Item = &'a String>) -> Self {
        let mut by_namespace: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for tag in selected {
            by_namespace
                .entry(namespace(tag).to_string())
                .or_default()
                .insert(tag.clone());
        }
        Self { by_namespace }
    }

    pub fn is_empty(&self) -> bool {
        self.by_namespace.is_empty()
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.by_namespace
            .values()
            .all(|wanted| item.tags.iter().any(|t| wanted.contains(t)))
    }

    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|i| self.matches(i)).collect()
    }
}

fn namespace(tag: &str) -> &str {
    tag.split_once(':').map(|(ns, _)| ns).unwrap_or("")
}
