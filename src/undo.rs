use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::calendar::CalendarService;
use crate::model::color::Color;
use crate::model::task::{Task, TaskId};
use crate::store::{BlockMove, TaskStore};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// The narrow world a command runs against: the store it mutates and the
/// calendar that keeps the schedule invariants. Commands never see anything
/// wider than this.
pub struct CommandContext<'a> {
    pub store: &'a mut TaskStore,
    pub calendar: &'a CalendarService,
}

/// A task's schedule triple, captured whole because the three fields are
/// coupled: restoring only the edited one would let recomputation change
/// the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: i64,
}

impl Schedule {
    pub fn of(task: &Task) -> Schedule {
        Schedule {
            start: task.start_date,
            end: task.end_date,
            duration: task.duration,
        }
    }
}

/// One scalar field edit with its old value captured before mutation.
#[derive(Debug, Clone)]
pub enum FieldEdit {
    Name { old: String, new: String },
    StartDate { old: Schedule, new: NaiveDate },
    EndDate { old: Schedule, new: NaiveDate },
    Duration { old: Schedule, new: i64 },
    Dedication { old: u8, new: u8 },
}

/// Notes + rich text + file links move together.
#[derive(Debug, Clone)]
pub struct NotesState {
    pub notes: String,
    pub notes_rich: String,
    pub file_links: IndexMap<String, String>,
}

impl NotesState {
    pub fn of(task: &Task) -> NotesState {
        NotesState {
            notes: task.notes.clone(),
            notes_rich: task.notes_rich.clone(),
            file_links: task.file_links.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertDirection {
    /// subtask → top-level task
    Promote,
    /// top-level task → subtask of its predecessor
    Demote,
}

/// An insertion as it actually happened: the exact tasks (ids included) and
/// where they landed. Redo replays this verbatim; undo removes it.
#[derive(Debug, Clone)]
pub struct InsertedBlock {
    pub tasks: Vec<Task>,
    pub index: usize,
}

impl InsertedBlock {
    fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }
}

/// A reified, undoable mutation. Each variant captures enough pre-state to
/// invert itself; captures happen lazily on first `execute`, except where
/// the old value has to be read before mutating (field, color, and notes
/// edits capture it in their constructor).
#[derive(Debug, Clone)]
pub enum Command {
    AddTask {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
        color: Color,
        inserted: Option<InsertedBlock>,
    },
    InsertTask {
        at: usize,
        name: String,
        start: NaiveDate,
        end: NaiveDate,
        color: Color,
        inserted: Option<InsertedBlock>,
    },
    AddSubtask {
        parent_index: usize,
        name: String,
        inserted: Option<InsertedBlock>,
    },
    /// Deletes the whole block (parent + subtask run) as one undo step.
    DeleteTask {
        index: usize,
        removed: Option<InsertedBlock>,
    },
    MoveTaskUp {
        index: usize,
        performed: Option<BlockMove>,
    },
    MoveTaskDown {
        index: usize,
        performed: Option<BlockMove>,
    },
    EditField {
        index: usize,
        edit: FieldEdit,
    },
    ChangeColor {
        index: usize,
        old: Color,
        new: Color,
    },
    /// Remembers the identity of every node it created, so undo removes
    /// exactly those — a parent duplication inserts a variable number of
    /// subtasks.
    DuplicateTask {
        index: usize,
        created: Option<InsertedBlock>,
    },
    /// A structural rewrite, so the full prior sequence is snapshotted.
    ConvertHierarchyLevel {
        index: usize,
        direction: ConvertDirection,
        prior: Option<Vec<Task>>,
    },
    ResetColors {
        color: Color,
        prior: Option<Vec<(TaskId, Color)>>,
    },
    EditNotes {
        index: usize,
        old: NotesState,
        new: NotesState,
    },
}

impl Command {
    pub fn add_task(name: impl Into<String>, start: NaiveDate, end: NaiveDate, color: Color) -> Command {
        Command::AddTask {
            name: name.into(),
            start,
            end,
            color,
            inserted: None,
        }
    }

    pub fn insert_task(
        at: usize,
        name: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        color: Color,
    ) -> Command {
        Command::InsertTask {
            at,
            name: name.into(),
            start,
            end,
            color,
            inserted: None,
        }
    }

    pub fn add_subtask(parent_index: usize, name: impl Into<String>) -> Command {
        Command::AddSubtask {
            parent_index,
            name: name.into(),
            inserted: None,
        }
    }

    pub fn delete_task(index: usize) -> Command {
        Command::DeleteTask {
            index,
            removed: None,
        }
    }

    pub fn move_up(index: usize) -> Command {
        Command::MoveTaskUp {
            index,
            performed: None,
        }
    }

    pub fn move_down(index: usize) -> Command {
        Command::MoveTaskDown {
            index,
            performed: None,
        }
    }

    pub fn edit_name(store: &TaskStore, index: usize, new: impl Into<String>) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::EditField {
            index,
            edit: FieldEdit::Name {
                old: task.name.clone(),
                new: new.into(),
            },
        })
    }

    pub fn edit_start_date(store: &TaskStore, index: usize, new: NaiveDate) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::EditField {
            index,
            edit: FieldEdit::StartDate {
                old: Schedule::of(task),
                new,
            },
        })
    }

    pub fn edit_end_date(store: &TaskStore, index: usize, new: NaiveDate) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::EditField {
            index,
            edit: FieldEdit::EndDate {
                old: Schedule::of(task),
                new,
            },
        })
    }

    pub fn edit_duration(store: &TaskStore, index: usize, new: i64) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::EditField {
            index,
            edit: FieldEdit::Duration {
                old: Schedule::of(task),
                new,
            },
        })
    }

    pub fn edit_dedication(store: &TaskStore, index: usize, new: u8) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::EditField {
            index,
            edit: FieldEdit::Dedication {
                old: task.dedication,
                new,
            },
        })
    }

    pub fn change_color(store: &TaskStore, index: usize, new: Color) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::ChangeColor {
            index,
            old: task.color,
            new,
        })
    }

    pub fn duplicate(index: usize) -> Command {
        Command::DuplicateTask {
            index,
            created: None,
        }
    }

    pub fn convert(index: usize, direction: ConvertDirection) -> Command {
        Command::ConvertHierarchyLevel {
            index,
            direction,
            prior: None,
        }
    }

    pub fn reset_colors(color: Color) -> Command {
        Command::ResetColors { color, prior: None }
    }

    pub fn edit_notes(
        store: &TaskStore,
        index: usize,
        notes: impl Into<String>,
        notes_rich: impl Into<String>,
        file_links: IndexMap<String, String>,
    ) -> Option<Command> {
        let task = store.task(index)?;
        Some(Command::EditNotes {
            index,
            old: NotesState::of(task),
            new: NotesState {
                notes: notes.into(),
                notes_rich: notes_rich.into(),
                file_links,
            },
        })
    }

    /// Apply the command. Safe to call twice in a row (create, then redo):
    /// both runs produce the same resulting state.
    pub fn execute(&mut self, ctx: &mut CommandContext) {
        match self {
            Command::AddTask {
                name,
                start,
                end,
                color,
                inserted,
            } => {
                if inserted.is_none() {
                    let task = build_task(ctx, name, *start, *end, *color);
                    *inserted = Some(InsertedBlock {
                        index: ctx.store.len(),
                        tasks: vec![task],
                    });
                }
                if let Some(block) = inserted {
                    ctx.store.insert_block(block.index, block.tasks.clone());
                }
            }
            Command::InsertTask {
                at,
                name,
                start,
                end,
                color,
                inserted,
            } => {
                match inserted {
                    None => {
                        let task = build_task(ctx, name, *start, *end, *color);
                        // The store may snap the index out of a subtask run;
                        // capture where the task actually landed.
                        let index = ctx.store.insert(task.clone(), Some(*at));
                        *inserted = Some(InsertedBlock {
                            tasks: vec![task],
                            index,
                        });
                    }
                    Some(block) => ctx.store.insert_block(block.index, block.tasks.clone()),
                }
            }
            Command::AddSubtask {
                parent_index,
                name,
                inserted,
            } => {
                if inserted.is_none() {
                    let Some(parent) = ctx.store.task(*parent_index) else {
                        return;
                    };
                    if parent.is_subtask {
                        return;
                    }
                    let mut sub = Task::new(
                        TaskId(0),
                        name.clone(),
                        parent.start_date,
                        parent.end_date,
                    );
                    sub.duration = parent.duration;
                    sub.color = parent.color;
                    sub.parent = Some(parent.id);
                    sub.is_subtask = true;
                    sub.id = ctx.store.alloc_id();
                    *inserted = Some(InsertedBlock {
                        index: *parent_index + ctx.store.block_size(*parent_index),
                        tasks: vec![sub],
                    });
                }
                if let Some(block) = inserted {
                    ctx.store.insert_block(block.index, block.tasks.clone());
                }
            }
            Command::DeleteTask { index, removed } => {
                let size = ctx.store.block_size(*index);
                let tasks = ctx.store.remove_block(*index, size);
                if removed.is_none() && !tasks.is_empty() {
                    *removed = Some(InsertedBlock {
                        tasks,
                        index: *index,
                    });
                }
            }
            Command::MoveTaskUp { index, performed } => {
                *performed = ctx.store.move_up(*index);
            }
            Command::MoveTaskDown { index, performed } => {
                *performed = ctx.store.move_down(*index);
            }
            Command::EditField { index, edit } => match edit {
                FieldEdit::Name { new, .. } => ctx.store.set_name(*index, new.clone()),
                FieldEdit::StartDate { new, .. } => {
                    ctx.store.set_start_date(*index, *new, ctx.calendar)
                }
                FieldEdit::EndDate { new, .. } => {
                    ctx.store.set_end_date(*index, *new, ctx.calendar)
                }
                FieldEdit::Duration { new, .. } => {
                    ctx.store.set_duration(*index, *new, ctx.calendar)
                }
                FieldEdit::Dedication { new, .. } => ctx.store.set_dedication(*index, *new),
            },
            Command::ChangeColor { index, new, .. } => ctx.store.set_color(*index, *new),
            Command::DuplicateTask { index, created } => match created {
                None => {
                    if let Some((tasks, at)) = ctx.store.duplicate(*index) {
                        *created = Some(InsertedBlock { tasks, index: at });
                    }
                }
                Some(block) => ctx.store.insert_block(block.index, block.tasks.clone()),
            },
            Command::ConvertHierarchyLevel {
                index,
                direction,
                prior,
            } => {
                if prior.is_none() {
                    *prior = Some(ctx.store.tasks().to_vec());
                }
                match direction {
                    ConvertDirection::Promote => ctx.store.promote(*index),
                    ConvertDirection::Demote => ctx.store.demote(*index),
                };
            }
            Command::ResetColors { color, prior } => {
                if prior.is_none() {
                    *prior = Some(
                        ctx.store
                            .tasks()
                            .iter()
                            .map(|t| (t.id, t.color))
                            .collect(),
                    );
                }
                for index in 0..ctx.store.len() {
                    ctx.store.set_color(index, *color);
                }
            }
            Command::EditNotes { index, new, .. } => {
                ctx.store.set_notes(
                    *index,
                    new.notes.clone(),
                    new.notes_rich.clone(),
                    new.file_links.clone(),
                );
            }
        }
    }

    /// Invert the command. Called only with the store in the exact state
    /// `execute` left it in (linear history).
    pub fn undo(&mut self, ctx: &mut CommandContext) {
        match self {
            Command::AddTask { inserted, .. }
            | Command::InsertTask { inserted, .. }
            | Command::AddSubtask { inserted, .. } => {
                if let Some(block) = inserted {
                    ctx.store.remove_block(block.index, block.tasks.len());
                }
            }
            Command::DeleteTask { removed, .. } => {
                if let Some(block) = removed {
                    ctx.store.insert_block(block.index, block.tasks.clone());
                }
            }
            Command::MoveTaskUp { performed, .. } | Command::MoveTaskDown { performed, .. } => {
                if let Some(mv) = performed {
                    ctx.store.move_block(mv.to, mv.size, mv.from);
                }
            }
            Command::EditField { index, edit } => match edit {
                FieldEdit::Name { old, .. } => ctx.store.set_name(*index, old.clone()),
                FieldEdit::StartDate { old, .. }
                | FieldEdit::EndDate { old, .. }
                | FieldEdit::Duration { old, .. } => {
                    ctx.store
                        .restore_schedule(*index, old.start, old.end, old.duration)
                }
                FieldEdit::Dedication { old, .. } => ctx.store.set_dedication(*index, *old),
            },
            Command::ChangeColor { index, old, .. } => ctx.store.set_color(*index, *old),
            Command::DuplicateTask { created, .. } => {
                if let Some(block) = created {
                    ctx.store.remove_by_ids(&block.ids());
                }
            }
            Command::ConvertHierarchyLevel { prior, .. } => {
                if let Some(snapshot) = prior {
                    ctx.store.replace_all(snapshot.clone());
                }
            }
            Command::ResetColors { prior, .. } => {
                if let Some(colors) = prior {
                    for (id, color) in colors.iter() {
                        if let Some(index) = ctx.store.index_of(*id) {
                            ctx.store.set_color(index, *color);
                        }
                    }
                }
            }
            Command::EditNotes { index, old, .. } => {
                ctx.store.set_notes(
                    *index,
                    old.notes.clone(),
                    old.notes_rich.clone(),
                    old.file_links.clone(),
                );
            }
        }
    }
}

fn build_task(
    ctx: &mut CommandContext,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
    color: Color,
) -> Task {
    let id = ctx.store.alloc_id();
    let mut task = Task::new(id, name, start, end);
    task.color = color;
    task.duration = ctx
        .calendar
        .working_days_between(task.start_date, task.end_date);
    task
}

/// Bounded linear undo history with a single cursor. `history[..cursor]` is
/// applied; everything past the cursor is redoable until a fresh command
/// truncates it.
pub struct CommandManager {
    history: Vec<Command>,
    cursor: usize,
    capacity: usize,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CommandManager {
            history: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Run a command and push it onto the history, discarding any stale redo
    /// tail and evicting the oldest entry past capacity.
    pub fn execute_command(&mut self, mut command: Command, ctx: &mut CommandContext) {
        command.execute(ctx);
        self.history.truncate(self.cursor);
        self.history.push(command);
        self.cursor += 1;
        if self.history.len() > self.capacity {
            self.history.remove(0);
            self.cursor -= 1;
        }
    }

    /// Undo the most recent command. False with nothing to undo.
    pub fn undo(&mut self, ctx: &mut CommandContext) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.history[self.cursor].undo(ctx);
        true
    }

    /// Re-apply the most recently undone command. False with nothing to redo.
    pub fn redo(&mut self, ctx: &mut CommandContext) -> bool {
        if self.cursor >= self.history.len() {
            return false;
        }
        self.history[self.cursor].execute(ctx);
        self.cursor += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.cursor = 0;
    }
}
