use std::collections::BTreeSet;

use crate::id_set::IdSetStore;
use crate::store::Result;

pub const KNOWN_SLOT: &str = "known_words.json";

/// Items the learner said they already know. These never enter a learning
/// session.
pub struct KnownItems<S: IdSetStore> {
    store: S,
    ids: BTreeSet<String>,
}

impl<S: IdSetStore> KnownItems<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ids: BTreeSet::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        self.ids = self.store.load()?;
        Ok(())
    }

    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.ids)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.ids.contains(item_id)
    }

    /// Returns false if the id was already known.
    pub fn add(&mut self, item_id: &str) -> bool {
        self.ids.insert(item_id.to_string())
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
