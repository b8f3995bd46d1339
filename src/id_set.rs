use std::collections::BTreeSet;

use crate::store::{Envelope, FileStore, Result};

pub const ID_SET_SCHEMA_VERSION: u32 = 1;

/// Persistence for a flat set of string ids.
pub trait IdSetStore {
    fn load(&self) -> Result<BTreeSet<String>>;
    fn save(&self, ids: &BTreeSet<String>) -> Result<()>;
}

/// An id set kept in one slot of a [`FileStore`], written as a sorted array.
/// Older files holding a bare array are migrated on load.
pub struct IdSetFile {
    store: FileStore,
    slot: &'static str,
}

impl IdSetFile {
    pub fn new(store: FileStore, slot: &'static str) -> Self {
        Self { store, slot }
    }
}

impl IdSetStore for IdSetFile {
    fn load(&self) -> Result<BTreeSet<String>> {
        if !self.store.exists(self.slot) {
            return Ok(BTreeSet::new());
        }
        let envelope = self
            .store
            .read_envelope_or_legacy::<Vec<String>>(self.slot, ID_SET_SCHEMA_VERSION)?;
        Ok(envelope.payload.into_iter().collect())
    }

    fn save(&self, ids: &BTreeSet<String>) -> Result<()> {
        let payload: Vec<&String> = ids.iter().collect();
        self.store
            .write_atomic(self.slot, &Envelope::new(ID_SET_SCHEMA_VERSION, payload))
    }
}
