use crate::model::task::Task;
use crate::parse::DATE_FORMAT;

/// Serialize the flat task sequence to the project-file format: one
/// `[TASK]` record per task, blank line between records. `PARENT` is the
/// owning task's name, resolved by id.
pub fn serialize_project(tasks: &[Task]) -> String {
    let mut out = String::new();
    for (i, task) in tasks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        serialize_task(task, tasks, &mut out);
    }
    out
}

fn serialize_task(task: &Task, all: &[Task], out: &mut String) {
    let parent_name = task
        .parent
        .and_then(|pid| all.iter().find(|t| t.id == pid))
        .map(|t| t.name.as_str())
        .unwrap_or("");

    out.push_str("[TASK]\n");
    out.push_str(&format!("NAME: {}\n", task.name));
    if parent_name.is_empty() {
        out.push_str("PARENT:\n");
    } else {
        out.push_str(&format!("PARENT: {}\n", parent_name));
    }
    out.push_str(&format!("START: {}\n", task.start_date.format(DATE_FORMAT)));
    out.push_str(&format!("END: {}\n", task.end_date.format(DATE_FORMAT)));
    out.push_str(&format!("DURATION: {}\n", task.duration));
    out.push_str(&format!("DEDICATION: {}\n", task.dedication));
    out.push_str(&format!("COLOR: {}\n", task.color.to_hex()));
    out.push_str(&format!(
        "COLLAPSED: {}\n",
        if task.collapsed { "True" } else { "False" }
    ));
    out.push_str("NOTES_HTML_BEGIN\n");
    if !task.notes_rich.is_empty() {
        out.push_str(&task.notes_rich);
        out.push('\n');
    }
    out.push_str("NOTES_HTML_END\n");
    out.push_str("FILE_LINKS_BEGIN\n");
    for (label, path) in &task.file_links {
        out.push_str(&format!("{} -> {}\n", label, path));
    }
    out.push_str("FILE_LINKS_END\n");
    out.push_str("[/TASK]\n");
}
