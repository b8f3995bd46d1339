use chrono::NaiveDate;

use crate::catalog::{FallbackCatalog, Item, ItemCatalog, JsonFileCatalog};
use crate::config::Config;
use crate::error::Result;
use crate::id_set::IdSetFile;
use crate::known::{KnownItems, KNOWN_SLOT};
use crate::overview::Overview;
use crate::scheduler::{FileScheduleStore, Scheduler, SCHEDULE_SLOT};
use crate::store::FileStore;
use crate::tags::{SelectedTags, SELECTED_TAGS_SLOT};

/// Everything one process needs, loaded from a single data directory.
pub struct App {
    pub config: Config,
    pub store: FileStore,
    pub scheduler: Scheduler<FileScheduleStore>,
    pub known: KnownItems<IdSetFile>,
    pub tags: SelectedTags<IdSetFile>,
    catalog: Box<dyn ItemCatalog>,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let store = FileStore::open(&config.data_dir)?;

        let mut scheduler = Scheduler::new(FileScheduleStore::new(store.clone()));
        scheduler.load()?;
        let mut known = KnownItems::new(IdSetFile::new(store.clone(), KNOWN_SLOT));
        known.load()?;
        let mut tags = SelectedTags::new(IdSetFile::new(store.clone(), SELECTED_TAGS_SLOT));
        tags.load()?;

        let fallback = JsonFileCatalog::new(config.catalog_fallback_path());
        let catalog: Box<dyn ItemCatalog> = match &config.catalog_path {
            Some(path) => Box::new(FallbackCatalog::new(JsonFileCatalog::new(path), fallback)),
            None => Box::new(fallback),
        };

        log::debug!(
            "opened {}: {} scheduled, {} known, {} tags selected",
            config.data_dir.display(),
            scheduler.len(),
            known.len(),
            tags.tags().len()
        );

        Ok(Self {
            config,
            store,
            scheduler,
            known,
            tags,
            catalog,
        })
    }

    /// Writes every state slot that is not on disk yet. Existing slots are
    /// left alone. Returns the slots that were created.
    pub fn init_slots(&self) -> Result<Vec<&'static str>> {
        let mut created = Vec::new();
        if !self.store.exists(SCHEDULE_SLOT) {
            self.scheduler.persist()?;
            created.push(SCHEDULE_SLOT);
        }
        if !self.store.exists(KNOWN_SLOT) {
            self.known.persist()?;
            created.push(KNOWN_SLOT);
        }
        if !self.store.exists(SELECTED_TAGS_SLOT) {
            self.tags.persist()?;
            created.push(SELECTED_TAGS_SLOT);
        }
        Ok(created)
    }

    pub fn items(&self) -> Result<Vec<Item>> {
        Ok(self.catalog.load_items()?)
    }

    /// Catalog items matching the selected tags.
    pub fn filtered_items(&self) -> Result<Vec<Item>> {
        let items = self.items()?;
        let filter = self.tags.filter();
        Ok(items.into_iter().filter(|i| filter.matches(i)).collect())
    }

    pub fn find_item(&self, item_id: &str) -> Result<Option<Item>> {
        Ok(self.items()?.into_iter().find(|i| i.id == item_id))
    }

    pub fn overview(&self, as_of: NaiveDate) -> Result<Overview> {
        let items = self.items()?;
        Ok(Overview::compute(
            &items,
            &self.scheduler,
            &self.known,
            &self.tags,
            as_of,
        ))
    }
}
