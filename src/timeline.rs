//! Gantt layout for projects.
//!
//! Project date strings are resolved into concrete intervals, the intervals
//! are wrapped in a padded window, and every date of interest is mapped onto
//! a 0-100% horizontal axis across that window. Everything here is a pure
//! function of the projects and the supplied `now`.

use crate::model::{Project, ProjectStatus, RecordId};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

/// Span given to a project that has a start date but no end date.
pub const DEFAULT_SPAN_DAYS: i64 = 30;
/// Padding before the earliest start.
pub const LEAD_IN_DAYS: i64 = 15;
/// Padding after the latest end, leaves room for labels.
pub const TRAIL_OUT_DAYS: i64 = 45;
/// Narrowest bar that still renders.
pub const MIN_BAR_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("range ends ({end}) before it starts ({start})")]
    ReversedInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("timeline window collapsed to a non-positive span")]
    CollapsedWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineBounds {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
    pub total: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridMonth {
    pub label: String,
    pub position_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub start_percent: f64,
    pub end_percent: f64,
    pub width_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBar {
    pub project_id: RecordId,
    pub name: String,
    pub status: ProjectStatus,
    pub interval: DateInterval,
    pub geometry: BarGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedProject {
    pub project_id: RecordId,
    pub name: String,
    pub error: TimelineError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayout {
    pub bounds: TimelineBounds,
    pub gridlines: Vec<GridMonth>,
    pub bars: Vec<ProjectBar>,
    /// Position of `now`, absent when it falls outside the window.
    pub today_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    /// `None` when no project carries a date.
    pub layout: Option<TimelineLayout>,
    pub rejected: Vec<RejectedProject>,
}

impl DateInterval {
    /// Resolves optional start/end strings. A missing start is `now`, a
    /// missing end is start plus [`DEFAULT_SPAN_DAYS`]. Reversed ranges are
    /// reported, never swapped.
    pub fn normalize(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, TimelineError> {
        let start = start.and_then(parse_date).unwrap_or(now);
        let end = match end.and_then(parse_date) {
            Some(end) => end,
            None => start
                .checked_add_signed(Duration::days(DEFAULT_SPAN_DAYS))
                .unwrap_or(start),
        };
        if end < start {
            return Err(TimelineError::ReversedInterval { start, end });
        }
        Ok(DateInterval { start, end })
    }

    pub fn of_project(project: &Project, now: DateTime<Utc>) -> Result<Self, TimelineError> {
        Self::normalize(
            project.start_date.as_deref(),
            project.end_date.as_deref(),
            now,
        )
    }
}

impl TimelineBounds {
    /// Padded window around all intervals. `Ok(None)` for an empty input.
    pub fn from_intervals(intervals: &[DateInterval]) -> Result<Option<Self>, TimelineError> {
        let Some((min, max)) = span(intervals) else {
            return Ok(None);
        };
        let min = min
            .checked_sub_signed(Duration::days(LEAD_IN_DAYS))
            .ok_or(TimelineError::CollapsedWindow)?;
        let max = max
            .checked_add_signed(Duration::days(TRAIL_OUT_DAYS))
            .ok_or(TimelineError::CollapsedWindow)?;
        let total = max - min;
        if total.num_milliseconds() <= 0 {
            return Err(TimelineError::CollapsedWindow);
        }
        Ok(Some(TimelineBounds { min, max, total }))
    }

    pub fn total_ms(&self) -> i64 {
        self.total.num_milliseconds()
    }

    /// Unclamped offset of `at`; negative before the window, above 100 after.
    pub fn raw_percent(&self, at: DateTime<Utc>) -> f64 {
        (at - self.min).num_milliseconds() as f64 / self.total_ms() as f64 * 100.0
    }

    /// Offset of `at` when it lies inside the window.
    pub fn percent(&self, at: DateTime<Utc>) -> Option<f64> {
        let p = self.raw_percent(at);
        (0.0..=100.0).contains(&p).then_some(p)
    }

    pub fn clamped_percent(&self, at: DateTime<Utc>) -> f64 {
        self.raw_percent(at).clamp(0.0, 100.0)
    }

    /// Each edge is clamped on its own, then the width floor applies.
    pub fn bar(&self, interval: &DateInterval) -> BarGeometry {
        let start_percent = self.clamped_percent(interval.start);
        let end_percent = self.clamped_percent(interval.end);
        BarGeometry {
            start_percent,
            end_percent,
            width_percent: (end_percent - start_percent).max(MIN_BAR_WIDTH),
        }
    }

    /// One gridline per first-of-month inside the window, left to right.
    pub fn gridlines(&self) -> Vec<GridMonth> {
        let mut lines: Vec<GridMonth> = Vec::new();
        let Some(mut cursor) = month_start(self.min) else {
            return lines;
        };
        while cursor <= self.max {
            if cursor >= self.min {
                if let Some(position_percent) = self.percent(cursor) {
                    let increasing = lines
                        .last()
                        .map_or(true, |last| position_percent > last.position_percent);
                    if increasing {
                        lines.push(GridMonth {
                            label: cursor.format("%b %y").to_string(),
                            position_percent,
                        });
                    }
                }
            }
            cursor = match cursor.checked_add_months(Months::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        lines
    }
}

/// Lays out every project with at least one date set.
pub fn layout_projects(projects: &[Project], now: DateTime<Utc>) -> Result<Timeline, TimelineError> {
    let mut placed = Vec::new();
    let mut rejected = Vec::new();
    for project in projects
        .iter()
        .filter(|p| p.start_date.is_some() || p.end_date.is_some())
    {
        match DateInterval::of_project(project, now) {
            Ok(interval) => placed.push((project, interval)),
            Err(error) => {
                warn!(project = %project.id, %error, "project left off the timeline");
                rejected.push(RejectedProject {
                    project_id: project.id.clone(),
                    name: project.name.clone(),
                    error,
                });
            }
        }
    }

    let intervals: Vec<DateInterval> = placed.iter().map(|(_, i)| *i).collect();
    let Some(bounds) = TimelineBounds::from_intervals(&intervals)? else {
        debug!("no dated projects, timeline absent");
        return Ok(Timeline {
            layout: None,
            rejected,
        });
    };

    let bars = placed
        .into_iter()
        .map(|(project, interval)| ProjectBar {
            project_id: project.id.clone(),
            name: project.name.clone(),
            status: project.status,
            geometry: bounds.bar(&interval),
            interval,
        })
        .collect();
    debug!(
        min = %bounds.min,
        max = %bounds.max,
        "timeline laid out"
    );
    Ok(Timeline {
        layout: Some(TimelineLayout {
            gridlines: bounds.gridlines(),
            today_percent: bounds.percent(now),
            bounds,
            bars,
        }),
        rejected,
    })
}

/// Earliest start and latest end, unpadded.
pub fn span(intervals: &[DateInterval]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let min = intervals.iter().map(|i| i.start).min()?;
    let max = intervals.iter().map(|i| i.end).max()?;
    Some((min, max))
}

/// Accepts `YYYY-MM-DD` (midnight UTC), RFC 3339 and `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    debug!(raw, "unparseable date treated as absent");
    None
}

fn month_start(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}
