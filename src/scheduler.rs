//! SM-2 scheduling over the full set of tracked items.
//!
//! The set is loaded once, mutated in memory and written back with
//! [`Scheduler::persist`]. Operations on ids the scheduler does not track are
//! silent no-ops.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Rating, ScheduleItem, MIN_EASE_FACTOR};
use crate::store::{Envelope, FileStore, Result};

pub const SCHEDULE_SLOT: &str = "srs_items.json";
pub const SCHEDULE_SCHEMA_VERSION: u32 = 1;

/// Where the scheduler keeps its items between runs.
pub trait ScheduleStore {
    fn load(&self) -> Result<Vec<ScheduleItem>>;
    fn save(&self, items: &[ScheduleItem]) -> Result<()>;
}

pub struct FileScheduleStore {
    store: FileStore,
}

impl FileScheduleStore {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }
}

impl ScheduleStore for FileScheduleStore {
    fn load(&self) -> Result<Vec<ScheduleItem>> {
        if !self.store.exists(SCHEDULE_SLOT) {
            return Ok(Vec::new());
        }
        let envelope = self
            .store
            .read_envelope_or_legacy::<Vec<ScheduleItem>>(SCHEDULE_SLOT, SCHEDULE_SCHEMA_VERSION)?;
        Ok(envelope.payload)
    }

    fn save(&self, items: &[ScheduleItem]) -> Result<()> {
        self.store.write_atomic(
            SCHEDULE_SLOT,
            &Envelope::new(SCHEDULE_SCHEMA_VERSION, items),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub tracked: usize,
    pub due: usize,
    pub reviewed: usize,
    pub total_lapses: u32,
    pub avg_ease: f64,
}

pub struct Scheduler<S: ScheduleStore> {
    store: S,
    items: Vec<ScheduleItem>,
}

impl<S: ScheduleStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            items: Vec::new(),
        }
    }

    /// Replaces the in-memory set with what the store holds.
    pub fn load(&mut self) -> Result<()> {
        self.items = self.store.load()?;
        log::debug!("loaded {} schedule items", self.items.len());
        Ok(())
    }

    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.items)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.position(item_id).is_some()
    }

    pub fn get(&self, item_id: &str) -> Option<&ScheduleItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.item_id.as_str())
    }

    /// Items due on or before `as_of`, in storage order.
    pub fn due_items(&self, as_of: NaiveDate) -> Vec<&ScheduleItem> {
        self.items.iter().filter(|i| i.is_due(as_of)).collect()
    }

    /// Starts tracking `item_id`. Returns false if it was already tracked.
    pub fn register(&mut self, item_id: &str, as_of: NaiveDate, start_tomorrow: bool) -> bool {
        if self.contains(item_id) {
            return false;
        }
        let due = if start_tomorrow {
            next_day(as_of)
        } else {
            as_of
        };
        self.items.push(ScheduleItem::new(item_id, due));
        true
    }

    /// Applies one review outcome. Returns the updated item, or None if the
    /// id is not tracked.
    pub fn apply_outcome(
        &mut self,
        item_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Option<&ScheduleItem> {
        let idx = self.position(item_id)?;
        let item = &mut self.items[idx];
        apply_sm2(item, rating.quality(), now);
        Some(item)
    }

    /// Pushes an item to tomorrow without touching its SM-2 state.
    pub fn snooze_to_tomorrow(&mut self, item_id: &str, now: DateTime<Utc>) -> bool {
        let Some(idx) = self.position(item_id) else {
            return false;
        };
        let item = &mut self.items[idx];
        item.last_reviewed_at = Some(now);
        item.due_date = next_day(now.date_naive());
        true
    }

    pub fn stats(&self, as_of: NaiveDate) -> Stats {
        let tracked = self.items.len();
        let avg_ease = if tracked == 0 {
            0.0
        } else {
            self.items.iter().map(|i| i.ease_factor).sum::<f64>() / tracked as f64
        };
        Stats {
            tracked,
            due: self.items.iter().filter(|i| i.is_due(as_of)).count(),
            reviewed: self
                .items
                .iter()
                .filter(|i| i.last_reviewed_at.is_some())
                .count(),
            total_lapses: self.items.iter().map(|i| i.lapses).sum(),
            avg_ease,
        }
    }

    fn position(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.item_id == item_id)
    }
}

// Canonical SM-2. Quality below 3 is a lapse; the first two successes use
// fixed 1 and 6 day intervals.
fn apply_sm2(item: &mut ScheduleItem, quality: u8, now: DateTime<Utc>) {
    if quality < 3 {
        item.repetitions = 0;
        item.interval_days = 1;
        item.lapses += 1;
    } else {
        item.repetitions += 1;
        item.interval_days = match item.repetitions {
            1 => 1,
            2 => 6,
            _ => ((item.interval_days as f64 * item.ease_factor).round() as u32).max(1),
        };

        let dq = (5 - quality) as f64;
        let ease = item.ease_factor + (0.1 - dq * (0.08 + dq * 0.02));
        item.ease_factor = ease.max(MIN_EASE_FACTOR);
    }

    let today = now.date_naive();
    item.last_reviewed_at = Some(now);
    item.due_date = today
        .checked_add_days(Days::new(item.interval_days as u64))
        .unwrap_or(NaiveDate::MAX);
}

fn next_day(day: NaiveDate) -> NaiveDate {
    day.succ_opt().unwrap_or(day)
}
