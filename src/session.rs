//! Bounded "learn N new items" session.
//!
//! A session starts in [`Phase::Selecting`]: fresh items are offered one at a
//! time and the learner either marks them as already known or starts learning
//! them. Once enough items are being learned the session moves to
//! [`Phase::Practicing`], drops the remaining fresh items and drills the
//! learning ones until each is mastered. Mastered items are handed to the
//! scheduler.
//!
//! `goal` is only ever lowered: when the catalog runs out of unseen items the
//! session settles for what was actually committed.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::catalog::Item;
use crate::id_set::IdSetStore;
use crate::known::KnownItems;
use crate::queue::SessionQueue;
use crate::scheduler::{ScheduleStore, Scheduler};
use crate::store::Result;

pub const DEFAULT_DEFER_WINDOW: usize = 3;
pub const DEFAULT_SEED_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Selecting,
    Practicing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Fresh,
    Learning,
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub item: Item,
    pub state: EntryState,
}

fn entry_id(entry: &SessionEntry) -> &str {
    &entry.item.id
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub defer_window: usize,
    pub seed_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            defer_window: DEFAULT_DEFER_WINDOW,
            seed_size: DEFAULT_SEED_SIZE,
        }
    }
}

pub struct LearnSession<R: Rng> {
    queue: SessionQueue<SessionEntry>,
    pool: VecDeque<Item>,
    goal: usize,
    mastered: usize,
    phase: Phase,
    learning_ids: HashSet<String>,
    start_tomorrow: bool,
    options: SessionOptions,
    rng: R,
}

impl<R: Rng> LearnSession<R> {
    pub fn new(options: SessionOptions, rng: R) -> Self {
        Self {
            queue: SessionQueue::new(entry_id),
            pool: VecDeque::new(),
            goal: 0,
            mastered: 0,
            phase: Phase::Selecting,
            learning_ids: HashSet::new(),
            start_tomorrow: true,
            options: SessionOptions {
                defer_window: options.defer_window.max(1),
                seed_size: options.seed_size.max(1),
            },
            rng,
        }
    }

    /// Starts a session over `items`, skipping anything already scheduled or
    /// known. Ends immediately when nothing is left to learn.
    pub fn start<S, K>(
        &mut self,
        items: &[Item],
        session_size: usize,
        start_tomorrow: bool,
        scheduler: &Scheduler<S>,
        known: &KnownItems<K>,
    ) where
        S: ScheduleStore,
        K: IdSetStore,
    {
        let tracked: HashSet<&str> = scheduler.item_ids().collect();
        let mut unseen: Vec<Item> = items
            .iter()
            .filter(|i| !tracked.contains(i.id.as_str()) && !known.contains(&i.id))
            .cloned()
            .collect();
        unseen.shuffle(&mut self.rng);

        self.goal = session_size.min(unseen.len());
        self.mastered = 0;
        self.phase = Phase::Selecting;
        self.learning_ids.clear();
        self.start_tomorrow = start_tomorrow;
        self.queue.clear();
        self.pool.clear();

        if self.goal == 0 {
            log::info!("no unseen items, learn session ends immediately");
            return;
        }

        let mut unseen: VecDeque<Item> = unseen.into();
        let seed = self.goal.min(self.options.seed_size);
        self.queue
            .set_items(unseen.drain(..seed).map(|item| SessionEntry {
                item,
                state: EntryState::Fresh,
            }));
        self.pool = unseen;
        log::info!(
            "learn session started: goal {}, {} queued, {} in pool",
            self.goal,
            self.queue.len(),
            self.pool.len()
        );
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.queue.current().map(|e| &e.item)
    }

    pub fn current_state(&self) -> Option<EntryState> {
        self.queue.current().map(|e| e.state)
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    pub fn mastered_count(&self) -> usize {
        self.mastered
    }

    pub fn learning_count(&self) -> usize {
        self.learning_ids.len()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Share of the goal mastered so far, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.goal == 0 {
            return 0.0;
        }
        (self.mastered as f64 / self.goal as f64).min(1.0)
    }

    /// The current fresh item is already known: drop it from the session and
    /// remember it. The session state is updated before the known set is
    /// written, so a failed write leaves the session usable.
    pub fn mark_already_known<K: IdSetStore>(&mut self, known: &mut KnownItems<K>) -> Result<bool> {
        if self.current_state() != Some(EntryState::Fresh) {
            return Ok(false);
        }
        let Some(entry) = self.queue.pop_current() else {
            return Ok(false);
        };
        known.add(&entry.item.id);
        self.settle();
        known.persist()?;
        Ok(true)
    }

    /// Commits to learning the current fresh item and moves it out of the way.
    pub fn start_learning(&mut self) -> bool {
        let Some(entry) = self.queue.current_mut() else {
            return false;
        };
        if entry.state != EntryState::Fresh {
            return false;
        }
        entry.state = EntryState::Learning;
        self.learning_ids.insert(entry.item.id.clone());
        self.queue
            .move_current_near_end(self.options.defer_window, &mut self.rng);
        self.settle();
        true
    }

    /// Shows the current learning item again a little later.
    pub fn show_later(&mut self) -> bool {
        if self.current_state() != Some(EntryState::Learning) {
            return false;
        }
        self.queue
            .move_current_near_end(self.options.defer_window, &mut self.rng);
        true
    }

    /// The current learning item is learned: schedule it for review. As with
    /// [`mark_already_known`](Self::mark_already_known) the write happens last.
    pub fn mark_mastered<S: ScheduleStore>(
        &mut self,
        scheduler: &mut Scheduler<S>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if self.current_state() != Some(EntryState::Learning) {
            return Ok(false);
        }
        let Some(entry) = self.queue.pop_current() else {
            return Ok(false);
        };
        scheduler.register(&entry.item.id, now.date_naive(), self.start_tomorrow);
        self.learning_ids.remove(&entry.item.id);
        self.mastered += 1;
        self.settle();
        scheduler.persist()?;
        Ok(true)
    }

    // Items committed this session, whether still learning or mastered.
    fn committed(&self) -> usize {
        self.learning_ids.len() + self.mastered
    }

    fn has_fresh(&self) -> bool {
        self.queue.iter().any(|e| e.state == EntryState::Fresh)
    }

    fn settle(&mut self) {
        if self.phase == Phase::Selecting {
            self.refill();
            if self.pool.is_empty() && !self.has_fresh() && self.committed() < self.goal {
                self.lower_goal(self.committed());
            }
            if self.goal > 0 && self.committed() >= self.goal {
                self.enter_practice();
            }
        } else if self.queue.is_empty() && self.mastered < self.goal {
            self.lower_goal(self.mastered);
        }

        if self.mastered >= self.goal {
            self.finish();
        }
    }

    fn refill(&mut self) {
        let target = self.goal.min(self.options.seed_size);
        while self.committed() < self.goal && self.queue.len() < target {
            let Some(item) = self.pool.pop_front() else {
                break;
            };
            self.queue.push_back(SessionEntry {
                item,
                state: EntryState::Fresh,
            });
        }
    }

    fn enter_practice(&mut self) {
        self.phase = Phase::Practicing;
        let mut learning: Vec<SessionEntry> = std::mem::replace(
            &mut self.queue,
            SessionQueue::new(entry_id),
        )
        .into_vec()
        .into_iter()
        .filter(|e| e.state == EntryState::Learning)
        .collect();
        learning.shuffle(&mut self.rng);
        self.queue.set_items(learning);
        self.pool.clear();
        log::info!(
            "learn session practicing {} items toward goal {}",
            self.queue.len(),
            self.goal
        );
    }

    fn lower_goal(&mut self, to: usize) {
        if to < self.goal {
            log::info!("not enough unseen items, goal lowered {} -> {}", self.goal, to);
            self.goal = to;
        }
    }

    fn finish(&mut self) {
        self.queue.clear();
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, day, items, MemoryIdSet, MemoryScheduleStore};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        scheduler: Scheduler<MemoryScheduleStore>,
        known: KnownItems<MemoryIdSet>,
        session: LearnSession<StdRng>,
    }

    fn setup(seed: u64) -> Fixture {
        Fixture {
            scheduler: Scheduler::new(MemoryScheduleStore::default()),
            known: KnownItems::new(MemoryIdSet::default()),
            session: LearnSession::new(SessionOptions::default(), StdRng::seed_from_u64(seed)),
        }
    }

    impl Fixture {
        fn start(&mut self, catalog: &[Item], size: usize) {
            self.session
                .start(catalog, size, true, &self.scheduler, &self.known);
        }

        fn mark_known(&mut self) -> bool {
            self.session.mark_already_known(&mut self.known).unwrap()
        }

        fn master(&mut self) -> bool {
            self.session
                .mark_mastered(&mut self.scheduler, at(day(2024, 5, 10), 9))
                .unwrap()
        }

        fn queued_states(&self) -> Vec<EntryState> {
            self.session.queue.iter().map(|e| e.state).collect()
        }
    }

    mod start_tests {
        use super::*;

        #[test]
        fn goal_is_capped_by_unseen_items() {
            let mut f = setup(1);
            f.start(&items(3), 10);
            assert_eq!(f.session.goal(), 3);
            assert_eq!(f.session.queue_len(), 3);
            assert_eq!(f.session.pool_len(), 0);
            assert_eq!(f.session.phase(), Phase::Selecting);
        }

        #[test]
        fn seeds_at_most_five() {
            let mut f = setup(1);
            f.start(&items(20), 8);
            assert_eq!(f.session.goal(), 8);
            assert_eq!(f.session.queue_len(), 5);
            assert_eq!(f.session.pool_len(), 15);
            assert!(f.queued_states().iter().all(|s| *s == EntryState::Fresh));
        }

        #[test]
        fn skips_scheduled_and_known_items() {
            let mut f = setup(1);
            f.scheduler.register("w0", day(2024, 5, 1), false);
            f.known.add("w1");
            f.start(&items(3), 10);

            assert_eq!(f.session.goal(), 1);
            assert_eq!(f.session.current_item().unwrap().id, "w2");
        }

        #[test]
        fn nothing_unseen_finishes_immediately() {
            let mut f = setup(1);
            f.known.add("w0");
            f.start(&items(1), 5);
            assert_eq!(f.session.goal(), 0);
            assert!(f.session.is_finished());
            assert!(f.session.current_item().is_none());
            assert_eq!(f.session.progress(), 0.0);
        }

        #[test]
        fn zero_session_size_finishes_immediately() {
            let mut f = setup(1);
            f.start(&items(4), 0);
            assert!(f.session.is_finished());
        }
    }

    mod selecting_tests {
        use super::*;

        #[test]
        fn start_learning_defers_item() {
            let mut f = setup(2);
            f.start(&items(10), 5);
            let first = f.session.current_item().unwrap().id.clone();

            assert!(f.session.start_learning());
            assert_eq!(f.session.learning_count(), 1);
            assert_ne!(f.session.current_item().unwrap().id, first);
            assert!(f.session.queue.contains_id(&first));
        }

        #[test]
        fn start_learning_on_learning_item_is_noop() {
            let mut f = setup(2);
            f.start(&items(1), 1);
            // One item, goal one: learning it moves straight to practice.
            assert!(f.session.start_learning());
            assert_eq!(f.session.phase(), Phase::Practicing);
            assert!(!f.session.start_learning());
            assert_eq!(f.session.learning_count(), 1);
        }

        #[test]
        fn mark_known_refills_from_pool() {
            let mut f = setup(3);
            f.start(&items(10), 3);
            assert_eq!(f.session.queue_len(), 3);

            let id = f.session.current_item().unwrap().id.clone();
            assert!(f.mark_known());
            assert!(f.known.contains(&id));
            assert_eq!(f.session.queue_len(), 3);
            assert_eq!(f.session.pool_len(), 6);
            assert_eq!(f.session.goal(), 3);
        }

        #[test]
        fn mark_known_on_learning_item_is_noop() {
            let mut f = setup(3);
            f.start(&items(1), 1);
            f.session.start_learning();
            assert!(!f.mark_known());
            assert!(f.known.is_empty());
        }

        #[test]
        fn exhausted_pool_lowers_goal() {
            let mut f = setup(4);
            f.start(&items(3), 3);
            f.session.start_learning();
            // Two fresh items left, both already known.
            while f.session.current_state() == Some(EntryState::Learning) {
                f.session.show_later();
            }
            assert!(f.mark_known());
            assert_eq!(f.session.goal(), 3);
            while f.session.current_state() == Some(EntryState::Learning) {
                f.session.show_later();
            }
            assert!(f.mark_known());

            assert_eq!(f.session.goal(), 1);
            assert_eq!(f.session.phase(), Phase::Practicing);
            assert_eq!(f.session.queue_len(), 1);
        }

        #[test]
        fn everything_known_ends_session() {
            let mut f = setup(5);
            f.start(&items(2), 2);
            assert!(f.mark_known());
            assert!(f.mark_known());
            assert_eq!(f.session.goal(), 0);
            assert!(f.session.is_finished());
            assert_eq!(f.known.len(), 2);
        }

        #[test]
        fn reaching_goal_enters_practice() {
            let mut f = setup(6);
            f.start(&items(10), 2);
            assert_eq!(f.session.queue_len(), 2);

            f.session.start_learning();
            assert_eq!(f.session.phase(), Phase::Selecting);
            // Only one fresh item can be current after the deferral.
            while f.session.current_state() != Some(EntryState::Fresh) {
                f.session.show_later();
            }
            f.session.start_learning();

            assert_eq!(f.session.phase(), Phase::Practicing);
            assert_eq!(f.session.pool_len(), 0);
            assert!(f
                .queued_states()
                .iter()
                .all(|s| *s == EntryState::Learning));
            assert_eq!(f.session.queue_len(), 2);
        }

        #[test]
        fn show_later_ignores_fresh_items() {
            let mut f = setup(7);
            f.start(&items(5), 5);
            let id = f.session.current_item().unwrap().id.clone();
            assert!(!f.session.show_later());
            assert_eq!(f.session.current_item().unwrap().id, id);
        }
    }

    mod mastering_tests {
        use super::*;

        #[test]
        fn mastering_registers_and_persists() {
            let mut f = setup(8);
            f.start(&items(1), 1);
            f.session.start_learning();
            let id = f.session.current_item().unwrap().id.clone();

            assert!(f.master());
            assert_eq!(f.session.mastered_count(), 1);
            assert!(f.session.is_finished());
            assert_eq!(f.session.progress(), 1.0);

            let item = f.scheduler.get(&id).unwrap();
            assert_eq!(item.due_date, day(2024, 5, 11));
            assert_eq!(f.scheduler.store().saves.get(), 1);
        }

        #[test]
        fn start_today_registers_due_today() {
            let mut f = setup(8);
            f.session
                .start(&items(1), 1, false, &f.scheduler, &f.known);
            f.session.start_learning();
            f.master();
            assert_eq!(f.scheduler.get("w0").unwrap().due_date, day(2024, 5, 10));
        }

        #[test]
        fn mastering_fresh_item_is_noop() {
            let mut f = setup(9);
            f.start(&items(3), 3);
            assert!(!f.master());
            assert!(f.scheduler.is_empty());
        }

        #[test]
        fn master_during_selecting_keeps_goal_reachable() {
            let mut f = setup(10);
            f.start(&items(10), 3);

            f.session.start_learning();
            while f.session.current_state() != Some(EntryState::Learning) {
                f.session.start_learning();
            }
            // Whatever is current is learning; master it while still selecting.
            let phase_before = f.session.phase();
            assert!(f.master());
            assert!(f.session.mastered_count() <= f.session.goal());
            if phase_before == Phase::Selecting {
                assert_eq!(f.session.goal(), 3);
            }
        }

        #[test]
        fn full_session_masters_goal() {
            let mut f = setup(11);
            f.start(&items(12), 4);

            let mut steps = 0;
            while !f.session.is_finished() {
                match f.session.current_state() {
                    Some(EntryState::Fresh) => {
                        f.session.start_learning();
                    }
                    Some(EntryState::Learning) => {
                        f.master();
                    }
                    None => break,
                }
                steps += 1;
                assert!(steps < 100);
            }

            assert_eq!(f.session.goal(), 4);
            assert_eq!(f.session.mastered_count(), 4);
            assert_eq!(f.scheduler.len(), 4);
        }

        #[test]
        fn failed_persist_keeps_session_progress() {
            let mut f = setup(12);
            f.start(&items(2), 2);
            f.session.start_learning();
            while f.session.current_state() != Some(EntryState::Learning) {
                f.session.start_learning();
            }
            f.scheduler.store().fail_saves.set(true);

            let result = f
                .session
                .mark_mastered(&mut f.scheduler, at(day(2024, 5, 10), 9));
            assert!(result.is_err());
            assert_eq!(f.session.mastered_count(), 1);
            assert_eq!(f.scheduler.len(), 1);
        }

        #[test]
        fn failed_known_write_keeps_session_progress() {
            let mut f = setup(13);
            f.start(&items(3), 3);
            f.known.store().fail_saves.set(true);

            let result = f.session.mark_already_known(&mut f.known);
            assert!(result.is_err());
            assert_eq!(f.session.queue_len(), 2);
            assert_eq!(f.known.len(), 1);
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Action {
        Known,
        Learn,
        Later,
        Master,
    }

    fn action_strategy() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Known),
            Just(Action::Learn),
            Just(Action::Later),
            Just(Action::Master),
        ]
    }

    proptest! {
        #[test]
        fn goal_never_rises_and_bounds_mastered(
            catalog_size in 0usize..15,
            session_size in 0usize..10,
            actions in prop::collection::vec(action_strategy(), 0..120),
            seed in any::<u64>(),
        ) {
            let mut f = setup(seed);
            f.start(&items(catalog_size), session_size);
            let mut last_goal = f.session.goal();
            prop_assert!(last_goal <= session_size);

            for action in actions {
                match action {
                    Action::Known => { f.mark_known(); }
                    Action::Learn => { f.session.start_learning(); }
                    Action::Later => { f.session.show_later(); }
                    Action::Master => { f.master(); }
                }
                let goal = f.session.goal();
                prop_assert!(goal <= last_goal);
                prop_assert!(f.session.mastered_count() <= goal);
                last_goal = goal;
            }
        }

        #[test]
        fn progressing_actions_always_terminate(
            catalog_size in 0usize..25,
            session_size in 0usize..12,
            choices in prop::collection::vec(any::<bool>(), 200),
            seed in any::<u64>(),
        ) {
            let mut f = setup(seed);
            f.start(&items(catalog_size), session_size);

            for learn in choices {
                if f.session.is_finished() {
                    break;
                }
                match f.session.current_state() {
                    Some(EntryState::Fresh) if learn => { f.session.start_learning(); }
                    Some(EntryState::Fresh) => { f.mark_known(); }
                    Some(EntryState::Learning) => { f.master(); }
                    None => {}
                }
            }

            prop_assert!(f.session.is_finished());
            prop_assert_eq!(f.session.mastered_count(), f.session.goal());
        }
    }
}
