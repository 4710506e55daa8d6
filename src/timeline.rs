use chrono::{Duration, NaiveDate};

use crate::model::task::Task;

/// Scale floor so a huge span in a narrow canvas still renders.
pub const MIN_PIXELS_PER_DAY: f64 = 0.1;

/// Discrete zoom ladder: complete → year → six months → three months → one
/// month. Zooming past either end is absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Complete,
    Year,
    SixMonth,
    ThreeMonth,
    OneMonth,
}

impl ViewMode {
    /// One step toward OneMonth.
    pub fn zoom_in(self) -> ViewMode {
        match self {
            ViewMode::Complete => ViewMode::Year,
            ViewMode::Year => ViewMode::SixMonth,
            ViewMode::SixMonth => ViewMode::ThreeMonth,
            ViewMode::ThreeMonth => ViewMode::OneMonth,
            ViewMode::OneMonth => ViewMode::OneMonth,
        }
    }

    /// One step toward Complete.
    pub fn zoom_out(self) -> ViewMode {
        match self {
            ViewMode::Complete => ViewMode::Complete,
            ViewMode::Year => ViewMode::Complete,
            ViewMode::SixMonth => ViewMode::Year,
            ViewMode::ThreeMonth => ViewMode::SixMonth,
            ViewMode::OneMonth => ViewMode::ThreeMonth,
        }
    }

    /// Window length for the fixed-window modes.
    fn window_days(self) -> Option<i64> {
        match self {
            ViewMode::Complete => None,
            ViewMode::Year => Some(365),
            ViewMode::SixMonth => Some(182),
            ViewMode::ThreeMonth => Some(91),
            ViewMode::OneMonth => Some(30),
        }
    }

    /// How far behind "today" the window starts, so today is not flush
    /// against the left edge. One month uses a fixed week.
    fn lookback_days(self) -> i64 {
        match self {
            ViewMode::OneMonth => 7,
            mode => mode.window_days().unwrap_or(0) / 8,
        }
    }
}

/// The computed date window plus the scale any renderer needs to place bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub view_mode: ViewMode,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub pixels_per_day: f64,
}

impl Timeline {
    /// Compute the visible window for the given tasks and mode.
    ///
    /// Complete mode spans all task dates and is padded out to a full year
    /// when the plan is shorter (tasks stay left-aligned in a year canvas).
    /// Fixed-window modes anchor near `today` with their look-back margin.
    pub fn compute(
        tasks: &[Task],
        view_mode: ViewMode,
        available_width: f64,
        today: NaiveDate,
    ) -> Timeline {
        let (min_date, mut max_date) = match view_mode.window_days() {
            None => {
                let min = tasks.iter().map(|t| t.start_date).min().unwrap_or(today);
                let mut max = tasks.iter().map(|t| t.end_date).max().unwrap_or(today);
                if (max - min).num_days() < 365 {
                    max = min + Duration::days(365);
                }
                (min, max)
            }
            Some(window) => {
                let min = today - Duration::days(view_mode.lookback_days());
                (min, min + Duration::days(window))
            }
        };
        // A single-point window is disallowed.
        if min_date == max_date {
            max_date += Duration::days(1);
        }
        let days = (max_date - min_date).num_days() + 1;
        let pixels_per_day = (available_width / days as f64).max(MIN_PIXELS_PER_DAY);
        Timeline {
            view_mode,
            min_date,
            max_date,
            pixels_per_day,
        }
    }

    /// Inclusive day count of the window.
    pub fn day_count(&self) -> i64 {
        (self.max_date - self.min_date).num_days() + 1
    }

    /// Horizontal position of a date's left edge.
    pub fn x_for_date(&self, date: NaiveDate) -> f64 {
        (date - self.min_date).num_days() as f64 * self.pixels_per_day
    }

    /// The date under a pixel offset, clamped to the window.
    pub fn date_at_x(&self, x: f64) -> NaiveDate {
        let days = (x / self.pixels_per_day).floor() as i64;
        (self.min_date + Duration::days(days)).clamp(self.min_date, self.max_date)
    }
}
