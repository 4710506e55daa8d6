use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::calendar::CalendarService;
use crate::model::color::Color;
use crate::model::task::{Task, TaskId};

/// What changed, for observers. Structural covers anything that can alter
/// row count, order, or the visibility projection; Cell is a single task's
/// scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Structural,
    Cell { actual_index: usize },
}

/// A performed block relocation. Inverting it is `move_block(to, size, from)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMove {
    pub from: usize,
    pub size: usize,
    pub to: usize,
}

pub type Observer = Box<dyn Fn(StoreChange)>;

/// Owns the flat, ordered task sequence and the visibility projection
/// derived from it.
///
/// Layout invariant: every parent's subtasks occupy a contiguous run
/// immediately after it, and a subtask's `parent` is the nearest preceding
/// non-subtask. `rebind_parents` re-establishes the id links after any
/// structural edit, so the flat order is the single source of truth.
pub struct TaskStore {
    tasks: Vec<Task>,
    /// visible index → actual index
    visible: Vec<usize>,
    /// actual index → visible index (None while hidden under a collapsed parent)
    to_visible: Vec<Option<usize>>,
    next_id: u64,
    observers: Vec<Observer>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore {
            tasks: Vec::new(),
            visible: Vec::new(),
            to_visible: Vec::new(),
            next_id: 0,
            observers: Vec::new(),
        }
    }

    /// Adopt an already-ordered task list (load path). Parent links are
    /// re-anchored and the projection rebuilt.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id.0 + 1).max().unwrap_or(0);
        let mut store = TaskStore {
            tasks,
            visible: Vec::new(),
            to_visible: Vec::new(),
            next_id,
            observers: Vec::new(),
        };
        store.rebind_parents();
        store.recompute_visible();
        store
    }

    pub fn alloc_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, actual_index: usize) -> Option<&Task> {
        self.tasks.get(actual_index)
    }

    pub fn index_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Size of the block starting at `actual_index`: 1 for a subtask, the
    /// task plus its contiguous subtask run for a parent.
    pub fn block_size(&self, actual_index: usize) -> usize {
        match self.tasks.get(actual_index) {
            None => 0,
            Some(t) if t.is_subtask => 1,
            Some(_) => 1 + self.subtask_count(actual_index),
        }
    }

    /// Number of subtasks in the run following a task (0 for subtasks).
    pub fn subtask_count(&self, actual_index: usize) -> usize {
        if self
            .tasks
            .get(actual_index)
            .is_none_or(|t| t.is_subtask)
        {
            return 0;
        }
        self.tasks[actual_index + 1..]
            .iter()
            .take_while(|t| t.is_subtask)
            .count()
    }

    pub fn has_subtasks(&self, actual_index: usize) -> bool {
        self.subtask_count(actual_index) > 0
    }

    /// The run a parent owns, as a slice (empty for subtasks and leaves).
    pub fn subtasks_of(&self, actual_index: usize) -> &[Task] {
        let count = self.subtask_count(actual_index);
        if count == 0 {
            return &[];
        }
        &self.tasks[actual_index + 1..actual_index + 1 + count]
    }

    /// Actual index of the owning parent, for subtasks.
    pub fn parent_index_of(&self, actual_index: usize) -> Option<usize> {
        if !self.tasks.get(actual_index)?.is_subtask {
            return None;
        }
        self.tasks[..actual_index]
            .iter()
            .rposition(|t| !t.is_subtask)
    }

    /// Earliest start and latest end over all tasks.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.tasks.iter().map(|t| t.start_date).min()?;
        let max = self.tasks.iter().map(|t| t.end_date).max()?;
        Some((min, max))
    }

    // -----------------------------------------------------------------------
    // Visibility projection
    // -----------------------------------------------------------------------

    /// Rebuild the visible sequence and both index maps in one walk.
    /// Subtask runs under a collapsed parent get no visible index at all.
    pub fn recompute_visible(&mut self) {
        self.visible.clear();
        self.to_visible = vec![None; self.tasks.len()];
        let mut i = 0;
        while i < self.tasks.len() {
            let task = &self.tasks[i];
            self.to_visible[i] = Some(self.visible.len());
            self.visible.push(i);
            if !task.is_subtask && task.collapsed {
                i += 1;
                while i < self.tasks.len() && self.tasks[i].is_subtask {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// visible index → actual index
    pub fn visible_to_actual(&self, visible_index: usize) -> Option<usize> {
        self.visible.get(visible_index).copied()
    }

    /// actual index → visible index; None while hidden
    pub fn actual_to_visible(&self, actual_index: usize) -> Option<usize> {
        self.to_visible.get(actual_index).copied().flatten()
    }

    pub fn visible_tasks(&self) -> impl Iterator<Item = &Task> {
        self.visible.iter().map(|&i| &self.tasks[i])
    }

    // -----------------------------------------------------------------------
    // Structural operations
    // -----------------------------------------------------------------------

    /// Insert a task; appends when `at` is None. A non-subtask landing inside
    /// a subtask run is snapped forward to the end of that run so no block is
    /// ever split.
    pub fn insert(&mut self, task: Task, at: Option<usize>) -> usize {
        let mut index = at.unwrap_or(self.tasks.len()).min(self.tasks.len());
        if !task.is_subtask {
            while index < self.tasks.len() && self.tasks[index].is_subtask {
                index += 1;
            }
        }
        self.tasks.insert(index, task);
        self.structural_changed();
        index
    }

    /// Splice a previously removed block back in, exactly where it was.
    pub fn insert_block(&mut self, at: usize, block: Vec<Task>) {
        let at = at.min(self.tasks.len());
        self.tasks.splice(at..at, block);
        self.structural_changed();
    }

    pub fn remove(&mut self, actual_index: usize) -> Option<Task> {
        if actual_index >= self.tasks.len() {
            return None;
        }
        let task = self.tasks.remove(actual_index);
        self.structural_changed();
        Some(task)
    }

    /// Remove a contiguous block. Out-of-range input removes nothing.
    pub fn remove_block(&mut self, actual_index: usize, block_size: usize) -> Vec<Task> {
        if actual_index + block_size > self.tasks.len() || block_size == 0 {
            return Vec::new();
        }
        let block: Vec<Task> = self
            .tasks
            .drain(actual_index..actual_index + block_size)
            .collect();
        self.structural_changed();
        block
    }

    /// Remove exactly the tasks with the given ids, wherever they now sit.
    pub fn remove_by_ids(&mut self, ids: &[TaskId]) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !ids.contains(&t.id));
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.structural_changed();
        }
        removed
    }

    /// Atomically relocate a contiguous block, preserving its internal order.
    /// `to` is the block's new start index in the sequence with the block
    /// removed. Invalid moves (splitting a block, or carrying a subtask out
    /// of its parent's run) are rejected as no-ops.
    pub fn move_block(&mut self, from: usize, size: usize, to: usize) -> bool {
        if size == 0 || from + size > self.tasks.len() || to > self.tasks.len() - size {
            return false;
        }
        // Only whole blocks move.
        let moving_subtask = self.tasks[from].is_subtask;
        let expected = if moving_subtask { 1 } else { self.block_size(from) };
        if size != expected {
            return false;
        }

        // The sequence as it will look with the block removed.
        let rest: Vec<&Task> = self.tasks[..from]
            .iter()
            .chain(self.tasks[from + size..].iter())
            .collect();
        if moving_subtask {
            // Destination must keep the subtask inside its own parent's run:
            // the nearest non-subtask above the insertion point has to be
            // the same parent.
            let parent = self.tasks[from].parent;
            let anchor = rest[..to].iter().rfind(|t| !t.is_subtask).map(|t| t.id);
            if anchor != parent {
                return false;
            }
        } else {
            // A parent block may not land inside someone else's run.
            if rest.get(to).is_some_and(|t| t.is_subtask) {
                return false;
            }
        }

        let block: Vec<Task> = self.tasks.drain(from..from + size).collect();
        self.tasks.splice(to..to, block);
        self.structural_changed();
        true
    }

    /// Swap a block with the one above it. Subtasks stay inside their
    /// parent's run; the first subtask of a run has nothing above it.
    pub fn move_up(&mut self, actual_index: usize) -> Option<BlockMove> {
        let task = self.tasks.get(actual_index)?;
        let mv = if task.is_subtask {
            if actual_index == 0 || !self.tasks[actual_index - 1].is_subtask {
                return None;
            }
            BlockMove {
                from: actual_index,
                size: 1,
                to: actual_index - 1,
            }
        } else {
            if actual_index == 0 {
                return None;
            }
            let mut prev = actual_index - 1;
            if self.tasks[prev].is_subtask {
                prev = self.parent_index_of(prev)?;
            }
            BlockMove {
                from: actual_index,
                size: self.block_size(actual_index),
                to: prev,
            }
        };
        self.move_block(mv.from, mv.size, mv.to).then_some(mv)
    }

    /// Swap a block with the one below it.
    pub fn move_down(&mut self, actual_index: usize) -> Option<BlockMove> {
        let task = self.tasks.get(actual_index)?;
        let mv = if task.is_subtask {
            let next = actual_index + 1;
            if next >= self.tasks.len() || !self.tasks[next].is_subtask {
                return None;
            }
            BlockMove {
                from: actual_index,
                size: 1,
                to: actual_index + 1,
            }
        } else {
            let size = self.block_size(actual_index);
            let next = actual_index + size;
            if next >= self.tasks.len() {
                return None;
            }
            BlockMove {
                from: actual_index,
                size,
                to: actual_index + self.block_size(next),
            }
        };
        self.move_block(mv.from, mv.size, mv.to).then_some(mv)
    }

    /// Duplicate the block at `actual_index` with fresh ids, inserted right
    /// after the source. Returns the clones (as inserted) and the insertion
    /// index, so a caller can later remove exactly those ids.
    pub fn duplicate(&mut self, actual_index: usize) -> Option<(Vec<Task>, usize)> {
        if actual_index >= self.tasks.len() {
            return None;
        }
        let size = self.block_size(actual_index);
        let mut clones: Vec<Task> =
            self.tasks[actual_index..actual_index + size].to_vec();
        let first_id = self.alloc_id();
        clones[0].id = first_id;
        if !clones[0].is_subtask {
            for clone in &mut clones[1..] {
                clone.id = self.alloc_id();
                clone.parent = Some(first_id);
            }
        }
        let at = actual_index + size;
        self.insert_block(at, clones.clone());
        Some((clones, at))
    }

    /// Subtask → top-level task. The rest of the old run re-anchors to the
    /// promoted task (nearest-preceding-parent rule).
    pub fn promote(&mut self, actual_index: usize) -> bool {
        match self.tasks.get(actual_index) {
            Some(t) if t.is_subtask => {}
            _ => return false,
        }
        self.tasks[actual_index].is_subtask = false;
        self.tasks[actual_index].parent = None;
        self.structural_changed();
        true
    }

    /// Top-level task → subtask of whatever precedes it. Its own former
    /// subtasks join the same run. The first task has no possible parent,
    /// so demoting it is a no-op.
    pub fn demote(&mut self, actual_index: usize) -> bool {
        match self.tasks.get(actual_index) {
            Some(t) if !t.is_subtask && actual_index > 0 => {}
            _ => return false,
        }
        self.tasks[actual_index].is_subtask = true;
        self.tasks[actual_index].collapsed = false;
        self.structural_changed();
        true
    }

    /// Wholesale state restore (structural undo). Allocated ids stay ahead
    /// of anything in the snapshot.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let max_id = tasks.iter().map(|t| t.id.0 + 1).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id);
        self.tasks = tasks;
        self.structural_changed();
    }

    pub fn set_collapsed(&mut self, actual_index: usize, collapsed: bool) {
        if !self.has_subtasks(actual_index) {
            return;
        }
        self.tasks[actual_index].collapsed = collapsed;
        self.recompute_visible();
        self.notify(StoreChange::Structural);
    }

    // -----------------------------------------------------------------------
    // Field setters — schedule coupling lives here
    // -----------------------------------------------------------------------

    pub fn set_name(&mut self, actual_index: usize, name: String) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.name = name;
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    /// Moving the start clamps the end up to it if needed, then recomputes
    /// the duration. Date edits always win over the stored duration.
    pub fn set_start_date(
        &mut self,
        actual_index: usize,
        date: NaiveDate,
        calendar: &CalendarService,
    ) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.start_date = date;
            if task.end_date < task.start_date {
                task.end_date = task.start_date;
            }
            task.duration = calendar.working_days_between(task.start_date, task.end_date);
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    /// An end before the start is clamped to the start.
    pub fn set_end_date(
        &mut self,
        actual_index: usize,
        date: NaiveDate,
        calendar: &CalendarService,
    ) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.end_date = date.max(task.start_date);
            task.duration = calendar.working_days_between(task.start_date, task.end_date);
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    /// Duration edits recompute the end date; the start never moves.
    pub fn set_duration(
        &mut self,
        actual_index: usize,
        duration: i64,
        calendar: &CalendarService,
    ) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.duration = duration.max(1);
            task.end_date = calendar.end_date_from_duration(task.start_date, task.duration);
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    /// Exact schedule restore for undo, bypassing recomputation.
    pub fn restore_schedule(
        &mut self,
        actual_index: usize,
        start: NaiveDate,
        end: NaiveDate,
        duration: i64,
    ) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.start_date = start;
            task.end_date = end;
            task.duration = duration;
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    pub fn set_dedication(&mut self, actual_index: usize, dedication: u8) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.dedication = dedication.min(100);
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    pub fn set_color(&mut self, actual_index: usize, color: Color) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.color = color;
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    pub fn set_notes(
        &mut self,
        actual_index: usize,
        notes: String,
        notes_rich: String,
        file_links: IndexMap<String, String>,
    ) {
        if let Some(task) = self.tasks.get_mut(actual_index) {
            task.notes = notes;
            task.notes_rich = notes_rich;
            task.file_links = file_links;
            self.notify(StoreChange::Cell { actual_index });
        }
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn notify(&self, change: StoreChange) {
        for observer in &self.observers {
            observer(change);
        }
    }

    /// Restore invariants and the projection after any structural edit,
    /// then tell observers.
    fn structural_changed(&mut self) {
        self.rebind_parents();
        self.recompute_visible();
        self.notify(StoreChange::Structural);
    }

    /// Re-anchor every subtask to the nearest preceding non-subtask. A
    /// subtask with nothing above it is an orphan and reverts to top level.
    fn rebind_parents(&mut self) {
        let mut current_parent: Option<TaskId> = None;
        for task in &mut self.tasks {
            if task.is_subtask {
                match current_parent {
                    Some(pid) => task.parent = Some(pid),
                    None => {
                        task.is_subtask = false;
                        task.parent = None;
                        current_parent = Some(task.id);
                    }
                }
            } else {
                task.parent = None;
                current_parent = Some(task.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Parent "A" with subtasks "A.1".."A.<n>", then appended via the store.
    fn store_with_family(subtasks: usize) -> TaskStore {
        let mut store = TaskStore::new();
        let id = store.alloc_id();
        store.insert(
            Task::new(id, "A", d(2024, 1, 1), d(2024, 1, 5)),
            None,
        );
        for i in 0..subtasks {
            let sid = store.alloc_id();
            let mut sub = Task::new(sid, format!("A.{}", i + 1), d(2024, 1, 1), d(2024, 1, 2));
            sub.is_subtask = true;
            store.insert(sub, None);
        }
        store
    }

    #[test]
    fn test_identity_projection_when_nothing_collapsed() {
        let store = store_with_family(2);
        assert_eq!(store.visible_count(), store.len());
        for i in 0..store.len() {
            assert_eq!(store.actual_to_visible(i), Some(i));
            assert_eq!(store.visible_to_actual(i), Some(i));
        }
    }

    #[test]
    fn test_collapse_hides_subtask_run() {
        let mut store = store_with_family(1);
        store.set_collapsed(0, true);
        assert_eq!(store.visible_count(), 1);
        assert_eq!(store.visible_to_actual(0), Some(0));
        assert_eq!(store.actual_to_visible(0), Some(0));
        assert_eq!(store.actual_to_visible(1), None);

        store.set_collapsed(0, false);
        assert_eq!(store.visible_count(), 2);
        assert_eq!(store.actual_to_visible(1), Some(1));
    }

    #[test]
    fn test_collapsed_length_formula() {
        let mut store = store_with_family(3);
        let id = store.alloc_id();
        store.insert(Task::new(id, "B", d(2024, 2, 1), d(2024, 2, 2)), None);
        let sid = store.alloc_id();
        let mut sub = Task::new(sid, "B.1", d(2024, 2, 1), d(2024, 2, 1));
        sub.is_subtask = true;
        store.insert(sub, None);

        store.set_collapsed(0, true);
        store.set_collapsed(4, true);
        assert_eq!(store.visible_count(), store.len() - 3 - 1);
    }

    #[test]
    fn test_parent_rebinding_after_insert() {
        let mut store = store_with_family(2);
        let parent_id = store.tasks()[0].id;
        assert_eq!(store.tasks()[1].parent, Some(parent_id));
        assert_eq!(store.tasks()[2].parent, Some(parent_id));
        assert_eq!(store.parent_index_of(2), Some(0));
        assert_eq!(store.block_size(0), 3);
        assert_eq!(store.subtask_count(0), 2);
    }

    #[test]
    fn test_orphan_subtask_reverts_to_top_level() {
        let mut sub = Task::new(TaskId(0), "orphan", d(2024, 1, 1), d(2024, 1, 1));
        sub.is_subtask = true;
        let store = TaskStore::from_tasks(vec![sub]);
        assert!(!store.tasks()[0].is_subtask);
        assert_eq!(store.tasks()[0].parent, None);
    }

    #[test]
    fn test_insert_snaps_out_of_subtask_run() {
        let mut store = store_with_family(2);
        let id = store.alloc_id();
        let index = store.insert(Task::new(id, "B", d(2024, 1, 8), d(2024, 1, 9)), Some(1));
        // Would have split A's run; snapped past it instead.
        assert_eq!(index, 3);
        assert_eq!(store.block_size(0), 3);
    }

    #[test]
    fn test_move_subtask_within_run() {
        let mut store = store_with_family(2);
        let mv = store.move_down(1).unwrap();
        assert_eq!(mv, BlockMove { from: 1, size: 1, to: 2 });
        assert_eq!(store.tasks()[1].name, "A.2");
        assert_eq!(store.tasks()[2].name, "A.1");

        // Inverse restores the original order.
        assert!(store.move_block(mv.to, mv.size, mv.from));
        assert_eq!(store.tasks()[1].name, "A.1");
    }

    #[test]
    fn test_move_subtask_out_of_run_rejected() {
        let mut store = store_with_family(1);
        let id = store.alloc_id();
        store.insert(Task::new(id, "B", d(2024, 1, 8), d(2024, 1, 9)), None);
        let sid = store.alloc_id();
        let mut sub = Task::new(sid, "B.1", d(2024, 1, 8), d(2024, 1, 8));
        sub.is_subtask = true;
        store.insert(sub, None);

        // A.1 (index 1) past B's parent boundary
        assert!(!store.move_block(1, 1, 2));
        assert!(!store.move_block(1, 1, 3));
        // first subtask of a run has nothing above it
        assert!(store.move_up(1).is_none());
        // last subtask of a run has nothing below it
        assert!(store.move_down(3).is_none());
        assert_eq!(store.tasks()[1].name, "A.1");
    }

    #[test]
    fn test_move_parent_block_swaps_whole_runs() {
        let mut store = store_with_family(2);
        let id = store.alloc_id();
        store.insert(Task::new(id, "B", d(2024, 1, 8), d(2024, 1, 9)), None);

        let mv = store.move_up(3).unwrap();
        assert_eq!(mv, BlockMove { from: 3, size: 1, to: 0 });
        let names: Vec<_> = store.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["B", "A", "A.1", "A.2"]);
        // Subtasks still belong to A.
        let a_id = store.tasks()[1].id;
        assert_eq!(store.tasks()[2].parent, Some(a_id));
    }

    #[test]
    fn test_move_parent_into_foreign_run_rejected() {
        let mut store = store_with_family(2);
        let id = store.alloc_id();
        store.insert(Task::new(id, "B", d(2024, 1, 8), d(2024, 1, 9)), None);
        // B (index 3) into the middle of A's run
        assert!(!store.move_block(3, 1, 1));
        assert!(!store.move_block(3, 1, 2));
        assert!(store.move_block(3, 1, 0));
    }

    #[test]
    fn test_remove_block_out_of_range_is_noop() {
        let mut store = store_with_family(1);
        assert!(store.remove_block(1, 5).is_empty());
        assert_eq!(store.len(), 2);
        assert!(store.remove(7).is_none());
    }

    #[test]
    fn test_duplicate_parent_block() {
        let mut store = store_with_family(2);
        let (clones, at) = store.duplicate(0).unwrap();
        assert_eq!(at, 3);
        assert_eq!(clones.len(), 3);
        assert_eq!(store.len(), 6);
        // Fresh ids, cloned subtasks re-parented to the clone.
        assert_ne!(clones[0].id, store.tasks()[0].id);
        assert_eq!(store.tasks()[4].parent, Some(clones[0].id));
        let ids: Vec<_> = clones.iter().map(|t| t.id).collect();
        assert_eq!(store.remove_by_ids(&ids), 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_promote_middle_subtask_reanchors_rest() {
        let mut store = store_with_family(3);
        assert!(store.promote(2));
        let promoted_id = store.tasks()[2].id;
        assert!(!store.tasks()[2].is_subtask);
        // A.3 now belongs to the promoted A.2.
        assert_eq!(store.tasks()[3].parent, Some(promoted_id));
        assert_eq!(store.subtask_count(0), 1);
        assert_eq!(store.subtask_count(2), 1);
    }

    #[test]
    fn test_demote_first_task_rejected() {
        let mut store = store_with_family(0);
        assert!(!store.demote(0));
        assert!(!store.tasks()[0].is_subtask);
    }

    #[test]
    fn test_demote_merges_run_into_predecessor() {
        let mut store = store_with_family(1);
        let id = store.alloc_id();
        store.insert(Task::new(id, "B", d(2024, 1, 8), d(2024, 1, 9)), None);
        let sid = store.alloc_id();
        let mut sub = Task::new(sid, "B.1", d(2024, 1, 8), d(2024, 1, 8));
        sub.is_subtask = true;
        store.insert(sub, None);

        assert!(store.demote(2));
        let a_id = store.tasks()[0].id;
        assert!(store.tasks()[2].is_subtask);
        assert_eq!(store.tasks()[2].parent, Some(a_id));
        assert_eq!(store.tasks()[3].parent, Some(a_id));
        assert_eq!(store.block_size(0), 4);
    }

    #[test]
    fn test_schedule_coupling() {
        let cal = CalendarService::default();
        let mut store = TaskStore::new();
        let id = store.alloc_id();
        // Mon Jan 1 .. Fri Jan 5
        store.insert(Task::new(id, "A", d(2024, 1, 1), d(2024, 1, 5)), None);
        store.set_start_date(0, d(2024, 1, 1), &cal);
        assert_eq!(store.tasks()[0].duration, 5);

        // Duration edit recomputes the end, start untouched.
        store.set_duration(0, 6, &cal);
        assert_eq!(store.tasks()[0].start_date, d(2024, 1, 1));
        assert_eq!(store.tasks()[0].end_date, d(2024, 1, 8));

        // End before start clamps.
        store.set_end_date(0, d(2023, 12, 1), &cal);
        assert_eq!(store.tasks()[0].end_date, d(2024, 1, 1));
        assert_eq!(store.tasks()[0].duration, 1);

        // Start past end drags the end along.
        store.set_start_date(0, d(2024, 2, 1), &cal);
        assert_eq!(store.tasks()[0].end_date, d(2024, 2, 1));
    }

    #[test]
    fn test_no_op_date_edit_keeps_duration() {
        let cal = CalendarService::default();
        let mut store = store_with_family(0);
        store.set_start_date(0, d(2024, 1, 1), &cal);
        let before = store.tasks()[0].duration;
        store.set_start_date(0, store.tasks()[0].start_date, &cal);
        store.set_end_date(0, store.tasks()[0].end_date, &cal);
        assert_eq!(store.tasks()[0].duration, before);
    }

    #[test]
    fn test_observers_see_changes() {
        let seen: Rc<RefCell<Vec<StoreChange>>> = Rc::new(RefCell::new(Vec::new()));
        let mut store = TaskStore::new();
        let sink = Rc::clone(&seen);
        store.subscribe(Box::new(move |change| sink.borrow_mut().push(change)));

        let id = store.alloc_id();
        store.insert(Task::new(id, "A", d(2024, 1, 1), d(2024, 1, 2)), None);
        store.set_name(0, "renamed".to_string());

        let seen = seen.borrow();
        assert_eq!(seen[0], StoreChange::Structural);
        assert_eq!(seen[1], StoreChange::Cell { actual_index: 0 });
    }
}
