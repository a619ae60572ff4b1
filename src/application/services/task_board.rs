//! Board state shared by the four task views.
//!
//! The board keeps one canonical record per task and an ordered membership
//! list per view. Fetch results, optimistic local mutations and pushed
//! deletions all flow through here, so the views can never disagree about a
//! task's category or show a task that was deleted.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::domain::entities::{Category, Task, TaskId};

/// One of the four board columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardView {
    /// Every task regardless of category.
    All,
    /// Tasks in a single category.
    Category(Category),
}

impl BoardView {
    /// Views in display order.
    pub const ALL: [Self; 4] = [
        Self::All,
        Self::Category(Category::ToDo),
        Self::Category(Category::InProgress),
        Self::Category(Category::Done),
    ];

    /// Position of the view in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::All => 0,
            Self::Category(Category::ToDo) => 1,
            Self::Category(Category::InProgress) => 2,
            Self::Category(Category::Done) => 3,
        }
    }

    /// Column heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::All => "All Tasks",
            Self::Category(category) => category.as_str(),
        }
    }

    /// Category shown by this view, if it is a category view.
    #[must_use]
    pub const fn category(self) -> Option<Category> {
        match self {
            Self::All => None,
            Self::Category(category) => Some(category),
        }
    }

    /// View to the right, clamped at the last column.
    #[must_use]
    pub const fn next(self) -> Self {
        let index = self.index();
        if index + 1 < Self::ALL.len() {
            Self::ALL[index + 1]
        } else {
            self
        }
    }

    /// View to the left, clamped at the first column.
    #[must_use]
    pub const fn previous(self) -> Self {
        let index = self.index();
        if index > 0 { Self::ALL[index - 1] } else { self }
    }

    fn admits(self, task: &Task) -> bool {
        self.category().is_none_or(|c| c == task.category())
    }
}

impl std::fmt::Display for BoardView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Loading state of a single view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Never requested.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The latest fetch succeeded.
    Loaded,
    /// The latest fetch failed.
    Failed(String),
}

/// Handle for an in-flight fetch, returned by [`TaskBoard::begin_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    view: BoardView,
    generation: u64,
    issued_at: u64,
}

impl FetchTicket {
    /// View the fetch was issued for.
    #[must_use]
    pub const fn view(&self) -> BoardView {
        self.view
    }
}

/// Identifier of a pending optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutationId(u64);

/// What an optimistic mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Task removed.
    Delete,
    /// Fields replaced.
    Edit,
    /// Category changed by drag-and-drop.
    Move {
        /// Category before the move.
        from: Category,
        /// Category after the move.
        to: Category,
    },
}

/// Result of [`TaskBoard::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The previous state was put back.
    Restored,
    /// A newer mutation on the same task is still pending and now owns the
    /// previous state.
    HandedOver,
    /// Nothing to restore; the mutation was unknown or its task was deleted
    /// remotely.
    Discarded,
}

#[derive(Debug, Clone)]
struct Snapshot {
    task: Task,
    positions: [Option<usize>; 4],
}

#[derive(Debug, Clone)]
struct PendingMutation {
    task_id: TaskId,
    kind: MutationKind,
    snapshot: Snapshot,
    applied_at: u64,
    inherited_failure: bool,
}

#[derive(Debug, Clone)]
struct Record {
    task: Task,
    stamp: u64,
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    order: Vec<TaskId>,
    load: LoadState,
    generation: u64,
}

/// Canonical task store with per-view ordering.
#[derive(Debug, Default)]
pub struct TaskBoard {
    records: HashMap<TaskId, Record>,
    views: [ViewState; 4],
    tombstones: HashSet<TaskId>,
    pending: BTreeMap<MutationId, PendingMutation>,
    clock: u64,
    next_mutation: u64,
    resync_requested: bool,
}

impl TaskBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch for `view`, superseding any fetch still in flight.
    pub fn begin_fetch(&mut self, view: BoardView) -> FetchTicket {
        let state = &mut self.views[view.index()];
        state.generation += 1;
        state.load = LoadState::Loading;

        trace!(view = %view, generation = state.generation, "Fetch started");

        FetchTicket {
            view,
            generation: state.generation,
            issued_at: self.clock,
        }
    }

    /// Merges a fetch result.
    ///
    /// Returns `false` when the ticket was superseded and the result ignored.
    pub fn apply_fetch(&mut self, ticket: &FetchTicket, tasks: Vec<Task>) -> bool {
        if !self.is_current(ticket) {
            debug!(view = %ticket.view, generation = ticket.generation, "Ignoring stale fetch");
            return false;
        }

        let view = ticket.view;
        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = task.id().clone();
            if self.tombstones.contains(&id) {
                trace!(task_id = %id, "Dropping tombstoned task from fetch");
                continue;
            }
            if !view.admits(&task) {
                warn!(
                    task_id = %id,
                    view = %view,
                    category = %task.category(),
                    "Dropping task listed under the wrong category"
                );
                continue;
            }
            if !seen.insert(id.clone()) {
                continue;
            }

            if !self.is_protected(&id, ticket.issued_at) {
                self.records.insert(
                    id.clone(),
                    Record {
                        task,
                        stamp: ticket.issued_at,
                    },
                );
            }
            order.push(id);
        }

        let missing: Vec<TaskId> = self
            .records
            .iter()
            .filter(|(id, record)| view.admits(&record.task) && !seen.contains(*id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in missing {
            if !self.is_protected(&id, ticket.issued_at) {
                trace!(task_id = %id, "Task no longer listed by server");
                self.records.remove(&id);
            }
        }

        let state = &mut self.views[view.index()];
        state.order = order;
        state.load = LoadState::Loaded;

        self.normalize();
        debug!(view = %view, count = self.views[view.index()].order.len(), "Fetch applied");
        true
    }

    /// Marks the view as failed if the ticket is still current.
    ///
    /// Returns `false` for a stale ticket.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket, message: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.views[ticket.view.index()].load = LoadState::Failed(message.into());
        true
    }

    /// Removes a task ahead of the server confirming the delete.
    ///
    /// Returns `None` when the task is not on the board.
    pub fn delete_local(&mut self, id: &TaskId) -> Option<MutationId> {
        let snapshot = self.snapshot(id)?;
        let stamp = self.tick();

        self.tombstones.insert(id.clone());
        self.records.remove(id);
        self.remove_from_views(id);

        Some(self.push_pending(id.clone(), MutationKind::Delete, snapshot, stamp))
    }

    /// Replaces a task's fields ahead of the server confirming the edit.
    ///
    /// Returns `None` when the task is not on the board.
    pub fn edit_local(&mut self, task: Task) -> Option<MutationId> {
        let id = task.id().clone();
        let snapshot = self.snapshot(&id)?;
        let stamp = self.tick();

        let old_category = snapshot.task.category();
        let new_category = task.category();
        self.records.insert(id.clone(), Record { task, stamp });
        if old_category != new_category {
            self.relocate(&id, old_category, new_category);
        }

        Some(self.push_pending(id, MutationKind::Edit, snapshot, stamp))
    }

    /// Changes a task's category ahead of the server confirming it.
    ///
    /// Returns `None` when the task is unknown or already in `category`.
    pub fn move_local(&mut self, id: &TaskId, category: Category) -> Option<MutationId> {
        let snapshot = self.snapshot(id)?;
        let from = snapshot.task.category();
        if from == category {
            return None;
        }

        let stamp = self.tick();
        let task = snapshot.task.clone().with_category(category);
        self.records.insert(id.clone(), Record { task, stamp });
        self.relocate(id, from, category);

        Some(self.push_pending(
            id.clone(),
            MutationKind::Move { from, to: category },
            snapshot,
            stamp,
        ))
    }

    /// Forgets a mutation the server accepted.
    ///
    /// Returns `false` for unknown mutations.
    pub fn confirm(&mut self, mutation: MutationId) -> bool {
        let Some(pending) = self.pending.remove(&mutation) else {
            return false;
        };

        let stamp = self.tick();
        if let Some(record) = self.records.get_mut(&pending.task_id) {
            record.stamp = if pending.inherited_failure { 0 } else { stamp };
        }
        if pending.inherited_failure {
            debug!(
                task_id = %pending.task_id,
                "Confirmed on top of a failed change, resync needed"
            );
            self.resync_requested = true;
        }
        true
    }

    /// Undoes a mutation the server rejected.
    pub fn rollback(&mut self, mutation: MutationId) -> RollbackOutcome {
        let Some(pending) = self.pending.remove(&mutation) else {
            debug!(?mutation, "Nothing to roll back");
            return RollbackOutcome::Discarded;
        };

        let newer = self
            .pending
            .range_mut(mutation..)
            .find(|(_, other)| other.task_id == pending.task_id);
        if let Some((_, newer)) = newer {
            debug!(task_id = %pending.task_id, "Handing snapshot to newer mutation");
            newer.snapshot = pending.snapshot;
            newer.inherited_failure = true;
            return RollbackOutcome::HandedOver;
        }

        let id = pending.task_id;
        let later_change = self
            .records
            .get(&id)
            .is_some_and(|record| record.stamp > pending.applied_at);
        if later_change {
            self.resync_requested = true;
        }

        let stamp = self.tick();
        self.tombstones.remove(&id);
        self.remove_from_views(&id);
        let Snapshot { task, positions } = pending.snapshot;
        let category = task.category();
        self.records.insert(id.clone(), Record { task, stamp });

        for view in [BoardView::All, BoardView::Category(category)] {
            if let Some(position) = positions[view.index()] {
                let order = &mut self.views[view.index()].order;
                order.insert(position.min(order.len()), id.clone());
            }
        }
        self.normalize();

        debug!(task_id = %id, kind = ?pending.kind, "Rolled back");
        RollbackOutcome::Restored
    }

    /// Applies a deletion pushed by the server.
    ///
    /// Safe to call before any fetch has completed; the tombstone keeps the
    /// task out of later results.
    pub fn apply_remote_delete(&mut self, id: &TaskId) {
        self.tombstones.insert(id.clone());
        let existed = self.records.remove(id).is_some();
        self.remove_from_views(id);

        let before = self.pending.len();
        self.pending.retain(|_, pending| &pending.task_id != id);
        let dropped = before - self.pending.len();

        debug!(task_id = %id, existed, dropped_mutations = dropped, "Remote delete applied");
    }

    /// Adds a task the server has just created.
    ///
    /// Returns `false` if the id was already deleted.
    pub fn insert_created(&mut self, task: Task) -> bool {
        let id = task.id().clone();
        if self.tombstones.contains(&id) {
            return false;
        }

        let stamp = self.tick();
        let category = task.category();
        self.remove_from_views(&id);
        self.records.insert(id.clone(), Record { task, stamp });
        self.views[BoardView::All.index()].order.push(id.clone());
        self.views[BoardView::Category(category).index()]
            .order
            .push(id);
        true
    }

    /// Tasks of a view in display order.
    #[must_use]
    pub fn view(&self, view: BoardView) -> Vec<&Task> {
        self.views[view.index()]
            .order
            .iter()
            .filter_map(|id| self.records.get(id).map(|record| &record.task))
            .collect()
    }

    /// Number of tasks in a view.
    #[must_use]
    pub fn len(&self, view: BoardView) -> usize {
        self.views[view.index()].order.len()
    }

    /// Returns `true` if no task is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.records.get(id).map(|record| &record.task)
    }

    #[must_use]
    pub fn load_state(&self, view: BoardView) -> &LoadState {
        &self.views[view.index()].load
    }

    /// Returns whether a mutation on the task awaits the server.
    #[must_use]
    pub fn has_pending(&self, id: &TaskId) -> bool {
        self.pending.values().any(|pending| &pending.task_id == id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns and clears the flag raised when local state may have drifted
    /// from the server.
    pub fn take_resync_request(&mut self) -> bool {
        std::mem::take(&mut self.resync_requested)
    }

    /// Drops everything, including tombstones. Used on logout.
    ///
    /// Fetch generations and the mutation counter survive, so results of
    /// requests issued before the clear can never match new tickets.
    pub fn clear(&mut self) {
        let generations = self.views.each_ref().map(|view| view.generation);
        let next_mutation = self.next_mutation;
        *self = Self::default();
        for (view, generation) in self.views.iter_mut().zip(generations) {
            view.generation = generation;
        }
        self.next_mutation = next_mutation;
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.views[ticket.view.index()].generation == ticket.generation
    }

    fn is_protected(&self, id: &TaskId, issued_at: u64) -> bool {
        self.has_pending(id)
            || self
                .records
                .get(id)
                .is_some_and(|record| record.stamp > issued_at)
    }

    const fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn snapshot(&self, id: &TaskId) -> Option<Snapshot> {
        let task = self.records.get(id)?.task.clone();
        let positions =
            std::array::from_fn(|i| self.views[i].order.iter().position(|other| other == id));
        Some(Snapshot { task, positions })
    }

    fn push_pending(
        &mut self,
        task_id: TaskId,
        kind: MutationKind,
        snapshot: Snapshot,
        applied_at: u64,
    ) -> MutationId {
        self.next_mutation += 1;
        let id = MutationId(self.next_mutation);
        trace!(task_id = %task_id, ?kind, mutation = ?id, "Optimistic mutation applied");
        self.pending.insert(
            id,
            PendingMutation {
                task_id,
                kind,
                snapshot,
                applied_at,
                inherited_failure: false,
            },
        );
        id
    }

    fn remove_from_views(&mut self, id: &TaskId) {
        for state in &mut self.views {
            state.order.retain(|other| other != id);
        }
    }

    fn relocate(&mut self, id: &TaskId, from: Category, to: Category) {
        self.views[BoardView::Category(from).index()]
            .order
            .retain(|other| other != id);
        let target = &mut self.views[BoardView::Category(to).index()].order;
        if !target.contains(id) {
            target.push(id.clone());
        }
    }

    /// Restores the view invariants: every view lists each known task of its
    /// scope exactly once and nothing else.
    fn normalize(&mut self) {
        for view in BoardView::ALL {
            let records = &self.records;
            let mut seen = HashSet::new();
            self.views[view.index()].order.retain(|id| {
                records.get(id).is_some_and(|record| view.admits(&record.task))
                    && seen.insert(id.clone())
            });
        }

        let all_index = BoardView::All.index();
        let listed: HashSet<TaskId> = self.views[all_index].order.iter().cloned().collect();
        let mut unlisted: Vec<&Record> = self
            .records
            .iter()
            .filter(|(id, _)| !listed.contains(*id))
            .map(|(_, record)| record)
            .collect();
        unlisted.sort_by(|a, b| {
            (a.task.created_at(), a.task.id()).cmp(&(b.task.created_at(), b.task.id()))
        });
        let unlisted: Vec<TaskId> = unlisted.iter().map(|r| r.task.id().clone()).collect();
        self.views[all_index].order.extend(unlisted);

        for category in Category::ALL {
            let view = BoardView::Category(category);
            let listed: HashSet<TaskId> =
                self.views[view.index()].order.iter().cloned().collect();
            let missing: Vec<TaskId> = self.views[all_index]
                .order
                .iter()
                .filter(|id| {
                    !listed.contains(*id)
                        && self
                            .records
                            .get(*id)
                            .is_some_and(|record| record.task.category() == category)
                })
                .cloned()
                .collect();
            self.views[view.index()].order.extend(missing);
        }
    }
}
