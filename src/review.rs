//! Due-review session: walk today's due items and rate each one.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::catalog::{item_id, Item};
use crate::models::{Rating, ScheduleItem};
use crate::queue::SessionQueue;
use crate::scheduler::{ScheduleStore, Scheduler};
use crate::store::Result;

pub struct ReviewSession {
    queue: SessionQueue<Item>,
    reviewed: usize,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            queue: SessionQueue::new(item_id),
            reviewed: 0,
        }
    }

    /// Queues every item due on `as_of`, in the scheduler's order. Due ids the
    /// catalog no longer has are skipped.
    pub fn start<S: ScheduleStore>(
        &mut self,
        catalog: &[Item],
        scheduler: &Scheduler<S>,
        as_of: NaiveDate,
    ) {
        let by_id: HashMap<&str, &Item> = catalog.iter().map(|i| (i.id.as_str(), i)).collect();
        let due: Vec<&ScheduleItem> = scheduler.due_items(as_of);
        let missing = due
            .iter()
            .filter(|d| !by_id.contains_key(d.item_id.as_str()))
            .count();
        if missing > 0 {
            log::warn!("{} due items are missing from the catalog", missing);
        }

        self.queue.set_items(
            due.into_iter()
                .filter_map(|d| by_id.get(d.item_id.as_str()).map(|i| (*i).clone())),
        );
        self.reviewed = 0;
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.queue.current()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn reviewed(&self) -> usize {
        self.reviewed
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Rates the current item and persists the schedule. The item leaves the
    /// queue even if the write fails.
    pub fn rate<S: ScheduleStore>(
        &mut self,
        rating: Rating,
        scheduler: &mut Scheduler<S>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(item) = self.queue.pop_current() else {
            return Ok(false);
        };
        scheduler.apply_outcome(&item.id, rating, now);
        self.reviewed += 1;
        scheduler.persist()?;
        Ok(true)
    }

    /// Not now: bring the current item back after a few others.
    pub fn show_later<R: Rng + ?Sized>(&mut self, window: usize, rng: &mut R) -> bool {
        if self.queue.len() <= 1 {
            return false;
        }
        self.queue.move_current_near_end(window, rng);
        true
    }

    /// Not today: push the current item to tomorrow without rating it.
    pub fn snooze<S: ScheduleStore>(
        &mut self,
        scheduler: &mut Scheduler<S>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(item) = self.queue.pop_current() else {
            return Ok(false);
        };
        scheduler.snooze_to_tomorrow(&item.id, now);
        scheduler.persist()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, day, items, MemoryScheduleStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup_scheduler(ids: &[&str], due: NaiveDate) -> Scheduler<MemoryScheduleStore> {
        let mut s = Scheduler::new(MemoryScheduleStore::default());
        for id in ids {
            s.register(id, due, false);
        }
        s
    }

    #[test]
    fn start_queues_due_items_in_storage_order() {
        let d = day(2024, 5, 10);
        let mut s = setup_scheduler(&["w2", "w0"], d);
        s.register("w1", day(2024, 5, 20), false);

        let mut review = ReviewSession::new();
        review.start(&items(3), &s, d);

        assert_eq!(review.remaining(), 2);
        assert_eq!(review.current_item().unwrap().id, "w2");
    }

    #[test]
    fn start_skips_ids_missing_from_catalog() {
        let d = day(2024, 5, 10);
        let s = setup_scheduler(&["gone", "w0"], d);

        let mut review = ReviewSession::new();
        review.start(&items(1), &s, d);
        assert_eq!(review.remaining(), 1);
        assert_eq!(review.current_item().unwrap().id, "w0");
    }

    #[test]
    fn rate_applies_outcome_and_persists() {
        let d = day(2024, 5, 10);
        let mut s = setup_scheduler(&["w0", "w1"], d);
        let mut review = ReviewSession::new();
        review.start(&items(2), &s, d);

        assert!(review.rate(Rating::Easy, &mut s, at(d, 9)).unwrap());
        assert_eq!(review.reviewed(), 1);
        assert_eq!(review.remaining(), 1);
        assert_eq!(s.get("w0").unwrap().repetitions, 1);
        assert_eq!(s.store().saves.get(), 1);
        assert!(s.due_items(d).iter().all(|i| i.item_id != "w0"));
    }

    #[test]
    fn rate_hard_counts_lapse() {
        let d = day(2024, 5, 10);
        let mut s = setup_scheduler(&["w0"], d);
        let mut review = ReviewSession::new();
        review.start(&items(1), &s, d);

        review.rate(Rating::Hard, &mut s, at(d, 9)).unwrap();
        assert!(review.is_finished());
        assert_eq!(s.get("w0").unwrap().lapses, 1);
    }

    #[test]
    fn rate_on_empty_queue_is_noop() {
        let d = day(2024, 5, 10);
        let mut s = setup_scheduler(&[], d);
        let mut review = ReviewSession::new();
        review.start(&items(2), &s, d);

        assert!(review.is_finished());
        assert!(!review.rate(Rating::Easy, &mut s, at(d, 9)).unwrap());
        assert_eq!(s.store().saves.get(), 0);
    }

    #[test]
    fn show_later_keeps_all_items() {
        let d = day(2024, 5, 10);
        let s = setup_scheduler(&["w0", "w1", "w2"], d);
        let mut review = ReviewSession::new();
        review.start(&items(3), &s, d);
        let mut rng = StdRng::seed_from_u64(4);

        assert!(review.show_later(1, &mut rng));
        assert_eq!(review.remaining(), 3);
        assert_ne!(review.current_item().unwrap().id, "w0");
    }

    #[test]
    fn snooze_moves_item_to_tomorrow() {
        let d = day(2024, 5, 10);
        let mut s = setup_scheduler(&["w0"], d);
        let mut review = ReviewSession::new();
        review.start(&items(1), &s, d);

        assert!(review.snooze(&mut s, at(d, 20)).unwrap());
        assert!(review.is_finished());
        assert_eq!(review.reviewed(), 0);
        assert_eq!(s.get("w0").unwrap().due_date, day(2024, 5, 11));
        assert_eq!(s.get("w0").unwrap().repetitions, 0);
    }

    #[test]
    fn failed_persist_still_advances() {
        let d = day(2024, 5, 10);
        let mut s = setup_scheduler(&["w0", "w1"], d);
        let mut review = ReviewSession::new();
        review.start(&items(2), &s, d);
        s.store().fail_saves.set(true);

        assert!(review.rate(Rating::Normal, &mut s, at(d, 9)).is_err());
        assert_eq!(review.remaining(), 1);
        assert_eq!(s.get("w0").unwrap().repetitions, 1);
    }
}
