use chrono::NaiveDate;
use serde::Deserialize;

use crate::calendar::CalendarService;
use crate::model::color::Color;
use crate::model::task::{Task, TaskId};
use crate::store::TaskStore;

/// Date shapes the sniffer tries, in order.
pub const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d.%m.%Y"];

/// The hand-off contract with the PDF/MPP/XLSX adapters: plain records with
/// free-form date strings, one optional level of children. Adapters run on
/// their own worker thread and deliver a finished list exactly once; by the
/// time records reach this module everything is synchronous again.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedRecord {
    pub name: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub children: Vec<ImportedRecord>,
}

/// What an import did, for the caller's status line.
#[derive(Debug)]
pub struct ImportReport {
    /// Tasks appended, children included.
    pub appended: usize,
    pub warnings: Vec<String>,
}

/// Parse an adapter's JSON payload into records.
pub fn records_from_json(json: &str) -> Result<Vec<ImportedRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Try each known format against a free-form date string.
pub fn sniff_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Append imported records to the store. Dates are normalized by the
/// sniffer (falling back to `today`), `end` is clamped to `start`, and the
/// duration is always recomputed through the calendar — import files
/// routinely carry durations that disagree with their own dates. Hierarchy
/// deeper than one level is flattened into the parent's run.
pub fn import_records(
    store: &mut TaskStore,
    records: &[ImportedRecord],
    calendar: &CalendarService,
    default_color: Color,
    today: NaiveDate,
) -> ImportReport {
    let mut report = ImportReport {
        appended: 0,
        warnings: Vec::new(),
    };
    for record in records {
        let parent_index = append_record(store, record, None, calendar, default_color, today, &mut report);
        let parent_id = store.tasks()[parent_index].id;
        for child in &record.children {
            if !child.children.is_empty() {
                report.warnings.push(format!(
                    "'{}': children below subtask level flattened into '{}'",
                    child.name, record.name
                ));
            }
            append_record(store, child, Some(parent_id), calendar, default_color, today, &mut report);
            for grandchild in &child.children {
                append_record(store, grandchild, Some(parent_id), calendar, default_color, today, &mut report);
            }
        }
    }
    report
}

fn append_record(
    store: &mut TaskStore,
    record: &ImportedRecord,
    subtask_of: Option<TaskId>,
    calendar: &CalendarService,
    default_color: Color,
    today: NaiveDate,
    report: &mut ImportReport,
) -> usize {
    let start = sniff_date(&record.start).unwrap_or_else(|| {
        report.warnings.push(format!(
            "'{}': unparseable start '{}', using today",
            record.name, record.start
        ));
        today
    });
    let end = sniff_date(&record.end)
        .unwrap_or_else(|| {
            report.warnings.push(format!(
                "'{}': unparseable end '{}', using today",
                record.name, record.end
            ));
            today
        })
        .max(start);

    let id = store.alloc_id();
    let mut task = Task::new(id, record.name.clone(), start, end);
    task.color = default_color;
    task.duration = calendar.working_days_between(start, end);
    if let Some(parent_id) = subtask_of {
        task.is_subtask = true;
        task.parent = Some(parent_id);
    }
    let index = store.insert(task, None);
    report.appended += 1;
    index
}
