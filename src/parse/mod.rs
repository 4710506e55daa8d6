pub mod project_parser;
pub mod project_serializer;

pub use project_parser::{ParseOutcome, parse_project, strip_html};
pub use project_serializer::serialize_project;

/// Date format used in project files.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
