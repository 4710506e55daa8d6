use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::color::{Color, DEFAULT_TASK_COLOR};

/// Configuration from trellis.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Which days count as non-working. Day names are parsed leniently
/// ("sat", "saturday", "Sat" all work); unknown names are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_weekend")]
    pub weekend: Vec<String>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            weekend: default_weekend(),
            holidays: Vec::new(),
        }
    }
}

fn default_weekend() -> Vec<String> {
    vec!["saturday".to_string(), "sunday".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_color")]
    pub default_color: Color,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            default_color: DEFAULT_TASK_COLOR,
        }
    }
}

fn default_color() -> Color {
    DEFAULT_TASK_COLOR
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Undo history cap. Oldest entries are evicted past this.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    50
}
