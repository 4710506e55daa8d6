use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::calendar::CalendarService;
use crate::model::color::Color;
use crate::model::task::{Task, TaskId};
use crate::parse::DATE_FORMAT;

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z_]+):\s*(.*)$").expect("field regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

/// Result of parsing a project file. Malformed values never fail the parse;
/// they are defaulted and reported here.
#[derive(Debug)]
pub struct ParseOutcome {
    pub tasks: Vec<Task>,
    pub warnings: Vec<String>,
}

/// Fields collected for one `[TASK]` record before it becomes a Task.
#[derive(Default)]
struct RecordDraft {
    name: String,
    parent_name: String,
    start: Option<String>,
    end: Option<String>,
    dedication: Option<String>,
    color: Option<String>,
    collapsed: Option<String>,
    notes_html: Vec<String>,
    links: Vec<(String, String)>,
}

enum Section {
    Fields,
    Notes,
    Links,
}

/// Parse a project file. Record order defines the task sequence; `PARENT`
/// is resolved against previously-seen names (first match wins). A parent
/// that is missing, not yet seen, or not the immediately preceding
/// non-subtask leaves the task at top level with a warning.
pub fn parse_project(
    source: &str,
    calendar: &CalendarService,
    default_color: Color,
    today: NaiveDate,
) -> ParseOutcome {
    let mut tasks: Vec<Task> = Vec::new();
    let mut warnings = Vec::new();

    let mut draft: Option<RecordDraft> = None;
    let mut section = Section::Fields;

    for line in source.lines() {
        // Record terminator first: it releases the draft.
        if matches!(section, Section::Fields) && line.trim() == "[/TASK]" {
            match draft.take() {
                Some(record) => finish_record(
                    record,
                    &mut tasks,
                    &mut warnings,
                    calendar,
                    default_color,
                    today,
                ),
                None => warnings.push("dropped line outside any record: [/TASK]".to_string()),
            }
            continue;
        }

        let Some(record) = draft.as_mut() else {
            match line.trim() {
                "" => {}
                "[TASK]" => {
                    draft = Some(RecordDraft::default());
                    section = Section::Fields;
                }
                other => warnings.push(format!("dropped line outside any record: {}", other)),
            }
            continue;
        };

        match section {
            Section::Notes => {
                if line.trim() == "NOTES_HTML_END" {
                    section = Section::Fields;
                } else {
                    record.notes_html.push(line.to_string());
                }
            }
            Section::Links => {
                if line.trim() == "FILE_LINKS_END" {
                    section = Section::Fields;
                } else if let Some((label, path)) = line.split_once(" -> ") {
                    record
                        .links
                        .push((label.trim().to_string(), path.trim().to_string()));
                } else if !line.trim().is_empty() {
                    warnings.push(format!("malformed file link dropped: {}", line.trim()));
                }
            }
            Section::Fields => match line.trim() {
                "NOTES_HTML_BEGIN" => section = Section::Notes,
                "FILE_LINKS_BEGIN" => section = Section::Links,
                "" => {}
                trimmed => {
                    if let Some(caps) = FIELD_RE.captures(trimmed) {
                        let value = caps[2].to_string();
                        match &caps[1] {
                            "NAME" => record.name = value,
                            "PARENT" => record.parent_name = value,
                            "START" => record.start = Some(value),
                            "END" => record.end = Some(value),
                            // The stored duration is advisory; it is always
                            // recomputed from the dates on load.
                            "DURATION" => {}
                            "DEDICATION" => record.dedication = Some(value),
                            "COLOR" => record.color = Some(value),
                            "COLLAPSED" => record.collapsed = Some(value),
                            key => {
                                warnings.push(format!("unknown field dropped: {}", key));
                            }
                        }
                    } else {
                        warnings.push(format!("dropped line inside record: {}", trimmed));
                    }
                }
            },
        }
    }

    if draft.is_some() {
        warnings.push("unterminated [TASK] record dropped".to_string());
    }

    ParseOutcome { tasks, warnings }
}

fn finish_record(
    record: RecordDraft,
    tasks: &mut Vec<Task>,
    warnings: &mut Vec<String>,
    calendar: &CalendarService,
    default_color: Color,
    today: NaiveDate,
) {
    let name = record.name;
    let start = parse_date(record.start.as_deref(), &name, "START", today, warnings);
    let mut end = parse_date(record.end.as_deref(), &name, "END", today, warnings);
    if end < start {
        end = start;
    }

    let id = TaskId(tasks.len() as u64);
    let mut task = Task::new(id, name.clone(), start, end);
    task.duration = calendar.working_days_between(start, end);

    task.dedication = match record.dedication.as_deref() {
        None => 100,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(value) => value.clamp(0, 100) as u8,
            Err(_) => {
                warnings.push(format!("task '{}': bad DEDICATION '{}', using 100", name, raw));
                100
            }
        },
    };

    task.color = match record.color.as_deref() {
        None => default_color,
        Some(raw) => Color::parse_hex(raw).unwrap_or_else(|| {
            warnings.push(format!("task '{}': bad COLOR '{}', using default", name, raw));
            default_color
        }),
    };

    task.collapsed = matches!(record.collapsed.as_deref(), Some("True"));

    task.notes_rich = record.notes_html.join("\n");
    task.notes = strip_html(&task.notes_rich);
    for (label, path) in record.links {
        task.file_links.insert(label, path);
    }

    // Parent linkage: first previously-seen task with this name.
    if !record.parent_name.is_empty() {
        match tasks.iter().position(|t| t.name == record.parent_name) {
            None => warnings.push(format!(
                "task '{}': parent '{}' not found, keeping at top level",
                name, record.parent_name
            )),
            Some(parent_index) => {
                let anchor = tasks.iter().rposition(|t| !t.is_subtask);
                if anchor == Some(parent_index) {
                    task.is_subtask = true;
                    task.parent = Some(tasks[parent_index].id);
                } else {
                    warnings.push(format!(
                        "task '{}': parent '{}' is not the preceding task, keeping at top level",
                        name, record.parent_name
                    ));
                }
            }
        }
    }

    tasks.push(task);
}

fn parse_date(
    raw: Option<&str>,
    task_name: &str,
    field: &str,
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> NaiveDate {
    match raw {
        None => {
            warnings.push(format!("task '{}': missing {}, using today", task_name, field));
            today
        }
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).unwrap_or_else(|_| {
            warnings.push(format!(
                "task '{}': bad {} '{}', using today",
                task_name, field, raw
            ));
            today
        }),
    }
}

/// Plain-text rendering of a rich-text block: tags stripped, the handful of
/// entities the editor emits decoded.
pub fn strip_html(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
