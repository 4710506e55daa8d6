use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use trellis::calendar::CalendarService;
use trellis::model::color::Color;
use trellis::store::TaskStore;
use trellis::undo::{Command, CommandContext, CommandManager, ConvertDirection};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

struct Plan {
    store: TaskStore,
    calendar: CalendarService,
    manager: CommandManager,
}

impl Plan {
    fn new() -> Plan {
        Plan {
            store: TaskStore::new(),
            calendar: CalendarService::default(),
            manager: CommandManager::new(),
        }
    }

    fn run(&mut self, command: Command) {
        let mut ctx = CommandContext {
            store: &mut self.store,
            calendar: &self.calendar,
        };
        self.manager.execute_command(command, &mut ctx);
    }

    fn undo(&mut self) -> bool {
        let mut ctx = CommandContext {
            store: &mut self.store,
            calendar: &self.calendar,
        };
        self.manager.undo(&mut ctx)
    }

    fn redo(&mut self) -> bool {
        let mut ctx = CommandContext {
            store: &mut self.store,
            calendar: &self.calendar,
        };
        self.manager.redo(&mut ctx)
    }
}

/// One parent "A" (01/01/2024–05/01/2024) with one subtask "A.1".
fn parent_with_one_subtask() -> Plan {
    let mut plan = Plan::new();
    plan.run(Command::add_task(
        "A",
        d(2024, 1, 1),
        d(2024, 1, 5),
        Color::default(),
    ));
    plan.run(Command::add_subtask(0, "A.1"));
    plan
}

#[test]
fn collapse_projects_parent_only_and_expand_restores() {
    let mut plan = parent_with_one_subtask();
    let store = &mut plan.store;

    store.set_collapsed(0, true);
    let visible_names: Vec<_> = store.visible_tasks().map(|t| t.name.clone()).collect();
    assert_eq!(visible_names, ["A"]);
    assert_eq!(store.actual_to_visible(0), Some(0));
    assert_eq!(store.actual_to_visible(1), None);
    assert_eq!(store.visible_to_actual(0), Some(0));
    assert_eq!(store.visible_to_actual(1), None);

    store.set_collapsed(0, false);
    let visible_names: Vec<_> = store.visible_tasks().map(|t| t.name.clone()).collect();
    assert_eq!(visible_names, ["A", "A.1"]);
    assert_eq!(store.actual_to_visible(1), Some(1));
}

#[test]
fn delete_parent_with_two_subtasks_is_one_undo_step() {
    let mut plan = parent_with_one_subtask();
    plan.run(Command::add_subtask(0, "A.2"));
    plan.run(Command::add_task(
        "B",
        d(2024, 1, 8),
        d(2024, 1, 9),
        Color::default(),
    ));
    let before = plan.store.tasks().to_vec();
    assert_eq!(plan.store.len(), 4);

    plan.run(Command::delete_task(0));
    assert_eq!(plan.store.len(), 1);
    assert_eq!(plan.store.tasks()[0].name, "B");

    assert!(plan.undo());
    assert_eq!(plan.store.tasks(), &before[..]);
    let parent_id = plan.store.tasks()[0].id;
    assert_eq!(plan.store.tasks()[1].parent, Some(parent_id));
    assert_eq!(plan.store.tasks()[2].parent, Some(parent_id));
}

/// Execute, undo, redo: the store must land exactly where execute left it,
/// and undo must land exactly where it started.
fn check_round_trip(plan: &mut Plan, command: Command) {
    let before = plan.store.tasks().to_vec();
    plan.run(command);
    let after = plan.store.tasks().to_vec();

    assert!(plan.undo());
    assert_eq!(plan.store.tasks(), &before[..], "undo mismatch");
    assert!(plan.redo());
    assert_eq!(plan.store.tasks(), &after[..], "redo mismatch");
}

#[test]
fn every_command_type_survives_undo_redo() {
    let mut plan = parent_with_one_subtask();
    plan.run(Command::add_task(
        "B",
        d(2024, 1, 8),
        d(2024, 1, 12),
        Color::default(),
    ));

    // Commands that capture old values read the store as it is when they
    // are built, so each is constructed right before it runs.
    check_round_trip(
        &mut plan,
        Command::insert_task(0, "Zero", d(2024, 1, 1), d(2024, 1, 2), Color::default()),
    );
    check_round_trip(&mut plan, Command::add_subtask(1, "A.2"));
    let cmd = Command::edit_name(&plan.store, 0, "Zero renamed").unwrap();
    check_round_trip(&mut plan, cmd);
    let cmd = Command::edit_start_date(&plan.store, 0, d(2024, 1, 3)).unwrap();
    check_round_trip(&mut plan, cmd);
    let cmd = Command::edit_end_date(&plan.store, 0, d(2024, 1, 10)).unwrap();
    check_round_trip(&mut plan, cmd);
    let cmd = Command::edit_duration(&plan.store, 0, 3).unwrap();
    check_round_trip(&mut plan, cmd);
    let cmd = Command::edit_dedication(&plan.store, 0, 40).unwrap();
    check_round_trip(&mut plan, cmd);
    let cmd = Command::change_color(&plan.store, 0, Color::rgb(9, 9, 9)).unwrap();
    check_round_trip(&mut plan, cmd);
    let cmd = Command::edit_notes(&plan.store, 0, "n", "<p>n</p>", Default::default()).unwrap();
    check_round_trip(&mut plan, cmd);
    check_round_trip(&mut plan, Command::duplicate(1));
    check_round_trip(&mut plan, Command::move_down(0));
    // First subtask of a run: rejected move, still a clean no-op through
    // undo and redo.
    check_round_trip(&mut plan, Command::move_up(1));
    check_round_trip(&mut plan, Command::convert(2, ConvertDirection::Promote));
    check_round_trip(&mut plan, Command::convert(3, ConvertDirection::Demote));
    check_round_trip(&mut plan, Command::delete_task(0));
    check_round_trip(&mut plan, Command::reset_colors(Color::default()));
}

#[test]
fn n_commands_then_n_undos_restores_pristine_state() {
    let mut plan = parent_with_one_subtask();
    let pristine = plan.store.tasks().to_vec();

    let mut executed = 0;
    plan.run(Command::add_task(
        "B",
        d(2024, 2, 1),
        d(2024, 2, 9),
        Color::default(),
    ));
    executed += 1;
    plan.run(Command::add_subtask(2, "B.1"));
    executed += 1;
    let rename = Command::edit_name(&plan.store, 3, "B.1 renamed").unwrap();
    plan.run(rename);
    executed += 1;
    plan.run(Command::duplicate(2));
    executed += 1;
    plan.run(Command::move_up(2));
    executed += 1;
    let recolor = Command::change_color(&plan.store, 0, Color::rgb(0, 0, 0)).unwrap();
    plan.run(recolor);
    executed += 1;
    plan.run(Command::convert(1, ConvertDirection::Promote));
    executed += 1;
    plan.run(Command::delete_task(0));
    executed += 1;

    for _ in 0..executed {
        assert!(plan.undo());
    }
    assert!(!plan.manager.can_undo());
    assert_eq!(plan.store.tasks(), &pristine[..]);
}

#[test]
fn undo_and_redo_report_availability() {
    let mut plan = Plan::new();
    assert!(!plan.manager.can_undo());
    assert!(!plan.manager.can_redo());
    assert!(!plan.undo());
    assert!(!plan.redo());

    plan.run(Command::add_task(
        "A",
        d(2024, 1, 1),
        d(2024, 1, 2),
        Color::default(),
    ));
    assert!(plan.manager.can_undo());
    assert!(!plan.manager.can_redo());

    assert!(plan.undo());
    assert!(plan.manager.can_redo());
    assert!(!plan.manager.can_undo());
}
