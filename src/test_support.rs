use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::catalog::Item;
use crate::id_set::IdSetStore;
use crate::models::ScheduleItem;
use crate::scheduler::ScheduleStore;
use crate::store::{Result, StoreError};

fn disk_full(slot: &str) -> StoreError {
    StoreError::Replace {
        path: slot.into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    }
}

#[derive(Default)]
pub struct MemoryScheduleStore {
    pub items: RefCell<Vec<ScheduleItem>>,
    pub fail_saves: Cell<bool>,
    pub saves: Cell<usize>,
}

impl ScheduleStore for MemoryScheduleStore {
    fn load(&self) -> Result<Vec<ScheduleItem>> {
        Ok(self.items.borrow().clone())
    }

    fn save(&self, items: &[ScheduleItem]) -> Result<()> {
        if self.fail_saves.get() {
            return Err(disk_full("schedule"));
        }
        self.saves.set(self.saves.get() + 1);
        *self.items.borrow_mut() = items.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryIdSet {
    pub ids: RefCell<BTreeSet<String>>,
    pub fail_saves: Cell<bool>,
}

impl IdSetStore for MemoryIdSet {
    fn load(&self) -> Result<BTreeSet<String>> {
        Ok(self.ids.borrow().clone())
    }

    fn save(&self, ids: &BTreeSet<String>) -> Result<()> {
        if self.fail_saves.get() {
            return Err(disk_full("ids"));
        }
        *self.ids.borrow_mut() = ids.clone();
        Ok(())
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 30, 0).unwrap())
}

pub fn items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| Item::new(format!("w{}", i), format!("term{}", i), format!("meaning{}", i)))
        .collect()
}
