use crate::filter::{within_week, Filterable};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::ValueEnum;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub type RecordId = String;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Tracker {
    pub name: String,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub reports: Vec<MonthlyReport>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LogCategory {
    Development,
    Meeting,
    Learning,
    Documentation,
    Research,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Reviewed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Planned,
    InProgress,
    Completed,
    OnHold,
}

/// One day's attendance/activity record.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub id: RecordId,
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    pub category: LogCategory,
    pub hours: f32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub learnings: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonthlyReport {
    pub id: RecordId,
    /// Calendar month in `YYYY-MM` form.
    pub month: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub achievements: Option<String>,
    #[serde(default)]
    pub challenges: Option<String>,
    #[serde(default)]
    pub next_steps: Option<String>,
    pub status: ReportStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deliverable tracked on the timeline. Dates are kept as entered (ISO
/// strings) and only resolved when the timeline is laid out.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TrackerError {
    #[error("log entry not found: {0}")]
    LogNotFound(String),
    #[error("report not found: {0}")]
    ReportNotFound(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("hours must be a non-negative number, got {0}")]
    InvalidHours(f32),
    #[error("invalid month {0:?} (use YYYY-MM)")]
    InvalidMonth(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerStats {
    pub total_logs: usize,
    pub total_hours: f32,
    pub week_logs: usize,
    pub week_hours: f32,
    pub reports: Vec<(ReportStatus, usize)>,
    pub projects: Vec<(ProjectStatus, usize)>,
}

trait Record {
    fn id(&self) -> &str;
    fn touch(&mut self);
}

impl Tracker {
    pub fn named(name: impl Into<String>) -> Self {
        Tracker {
            name: name.into(),
            ..Tracker::default()
        }
    }

    /// Random six character id not used by any record in the tracker.
    pub fn fresh_id(&self) -> RecordId {
        loop {
            let id = generate_id();
            if !self.contains_id(&id) {
                return id;
            }
        }
    }

    fn contains_id(&self, id: &str) -> bool {
        self.logs.iter().any(|l| l.id == id)
            || self.reports.iter().any(|r| r.id == id)
            || self.projects.iter().any(|p| p.id == id)
    }

    pub fn add_log(&mut self, entry: LogEntry) -> Result<(), TrackerError> {
        validate_hours(entry.hours)?;
        self.logs.push(entry);
        Ok(())
    }

    pub fn update_log<F>(&mut self, id: &str, f: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut LogEntry),
    {
        let entry = find_mut(&mut self.logs, id)
            .ok_or_else(|| TrackerError::LogNotFound(id.to_string()))?;
        let mut edited = entry.clone();
        f(&mut edited);
        validate_hours(edited.hours)?;
        edited.touch();
        *entry = edited;
        Ok(())
    }

    pub fn remove_log(&mut self, id: &str) -> Result<LogEntry, TrackerError> {
        remove(&mut self.logs, id).ok_or_else(|| TrackerError::LogNotFound(id.to_string()))
    }

    pub fn add_report(&mut self, report: MonthlyReport) -> Result<(), TrackerError> {
        parse_month(&report.month)?;
        self.reports.push(report);
        Ok(())
    }

    pub fn update_report<F>(&mut self, id: &str, f: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut MonthlyReport),
    {
        let report = find_mut(&mut self.reports, id)
            .ok_or_else(|| TrackerError::ReportNotFound(id.to_string()))?;
        let mut edited = report.clone();
        f(&mut edited);
        parse_month(&edited.month)?;
        edited.touch();
        *report = edited;
        Ok(())
    }

    pub fn remove_report(&mut self, id: &str) -> Result<MonthlyReport, TrackerError> {
        remove(&mut self.reports, id).ok_or_else(|| TrackerError::ReportNotFound(id.to_string()))
    }

    pub fn add_project(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub fn update_project<F>(&mut self, id: &str, f: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut Project),
    {
        let project = find_mut(&mut self.projects, id)
            .ok_or_else(|| TrackerError::ProjectNotFound(id.to_string()))?;
        f(project);
        project.touch();
        Ok(())
    }

    pub fn remove_project(&mut self, id: &str) -> Result<Project, TrackerError> {
        remove(&mut self.projects, id).ok_or_else(|| TrackerError::ProjectNotFound(id.to_string()))
    }

    pub fn log(&self, id: &str) -> Option<&LogEntry> {
        self.logs.iter().find(|l| l.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn logs_in_month(&self, month: &str) -> Result<Vec<&LogEntry>, TrackerError> {
        let first = parse_month(month)?;
        Ok(self
            .logs
            .iter()
            .filter(|l| l.date.year() == first.year() && l.date.month() == first.month())
            .collect())
    }

    pub fn stats(&self, today: NaiveDate) -> TrackerStats {
        let week: Vec<&LogEntry> = self
            .logs
            .iter()
            .filter(|l| within_week(l.date, today))
            .collect();
        let reports = ReportStatus::value_variants()
            .iter()
            .map(|s| (*s, self.reports.iter().filter(|r| r.status == *s).count()))
            .collect();
        let projects = ProjectStatus::value_variants()
            .iter()
            .map(|s| (*s, self.projects.iter().filter(|p| p.status == *s).count()))
            .collect();
        TrackerStats {
            total_logs: self.logs.len(),
            total_hours: self.logs.iter().map(|l| l.hours).sum(),
            week_logs: week.len(),
            week_hours: week.iter().map(|l| l.hours).sum(),
            reports,
            projects,
        }
    }
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Development => "development",
            LogCategory::Meeting => "meeting",
            LogCategory::Learning => "learning",
            LogCategory::Documentation => "documentation",
            LogCategory::Research => "research",
            LogCategory::Other => "other",
        }
    }
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Reviewed => "reviewed",
        }
    }
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planned",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on-hold",
        }
    }
}

impl LogEntry {
    pub fn new(
        id: RecordId,
        date: NaiveDate,
        title: String,
        description: String,
        category: LogCategory,
        hours: f32,
        tags: Vec<String>,
        learnings: Option<String>,
    ) -> Self {
        let now = Utc::now();
        LogEntry {
            id,
            date,
            title,
            description,
            category,
            hours,
            tags,
            learnings,
            created_at: now,
            updated_at: now,
        }
    }
}

impl MonthlyReport {
    pub fn new(id: RecordId, month: String, title: String, summary: String) -> Self {
        let now = Utc::now();
        MonthlyReport {
            id,
            month,
            title,
            summary,
            achievements: None,
            challenges: None,
            next_steps: None,
            status: ReportStatus::Draft,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Project {
    pub fn new(
        id: RecordId,
        name: String,
        status: ProjectStatus,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Project {
            id,
            name,
            description: None,
            status,
            start_date,
            end_date,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for LogEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Record for MonthlyReport {
    fn id(&self) -> &str {
        &self.id
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Record for Project {
    fn id(&self) -> &str {
        &self.id
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Filterable for LogEntry {
    fn search_text(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        if let Some(learnings) = &self.learnings {
            fields.push(learnings);
        }
        fields
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Filterable for MonthlyReport {
    fn search_text(&self) -> Vec<&str> {
        [
            Some(self.title.as_str()),
            Some(self.summary.as_str()),
            self.achievements.as_deref(),
            self.challenges.as_deref(),
            self.next_steps.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn category(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Filterable for Project {
    fn search_text(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        if let Some(description) = &self.description {
            fields.push(description);
        }
        fields
    }

    fn category(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// First day of a `YYYY-MM` month.
pub fn parse_month(month: &str) -> Result<NaiveDate, TrackerError> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| TrackerError::InvalidMonth(month.to_string()))
}

fn validate_hours(hours: f32) -> Result<(), TrackerError> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidHours(hours))
    }
}

fn find_mut<'a, T: Record>(items: &'a mut [T], id: &str) -> Option<&'a mut T> {
    items.iter_mut().find(|item| item.id() == id)
}

fn remove<T: Record>(items: &mut Vec<T>, id: &str) -> Option<T> {
    let idx = items.iter().position(|item| item.id() == id)?;
    Some(items.remove(idx))
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn log(tracker: &Tracker, day: &str, hours: f32) -> LogEntry {
        LogEntry::new(
            tracker.fresh_id(),
            date(day),
            "Standup".into(),
            "Daily sync".into(),
            LogCategory::Meeting,
            hours,
            vec![],
            None,
        )
    }

    #[test]
    fn add_and_remove_log() {
        let mut tracker = Tracker::named("intern");
        let entry = log(&tracker, "2024-06-10", 2.0);
        let id = entry.id.clone();
        tracker.add_log(entry).unwrap();
        assert!(tracker.log(&id).is_some());
        let removed = tracker.remove_log(&id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(
            tracker.remove_log(&id).unwrap_err(),
            TrackerError::LogNotFound(id.clone())
        );
    }

    #[test]
    fn rejects_negative_hours() {
        let mut tracker = Tracker::named("intern");
        let entry = log(&tracker, "2024-06-10", -1.0);
        assert_eq!(tracker.add_log(entry), Err(TrackerError::InvalidHours(-1.0)));
    }

    #[test]
    fn failed_update_leaves_entry_untouched() {
        let mut tracker = Tracker::named("intern");
        let entry = log(&tracker, "2024-06-10", 3.0);
        let id = entry.id.clone();
        tracker.add_log(entry).unwrap();
        let err = tracker.update_log(&id, |l| l.hours = f32::NAN).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidHours(_)));
        assert_eq!(tracker.log(&id).unwrap().hours, 3.0);
    }

    #[test]
    fn update_project_bumps_timestamp() {
        let mut tracker = Tracker::named("intern");
        let project = Project::new(
            tracker.fresh_id(),
            "API".into(),
            ProjectStatus::Planned,
            None,
            None,
        );
        let id = project.id.clone();
        let before = project.updated_at;
        tracker.add_project(project);
        tracker
            .update_project(&id, |p| p.status = ProjectStatus::InProgress)
            .unwrap();
        let updated = tracker.project(&id).unwrap();
        assert_eq!(updated.status, ProjectStatus::InProgress);
        assert!(updated.updated_at >= before);
    }

    #[test]
    fn report_month_must_be_valid() {
        let mut tracker = Tracker::named("intern");
        let report = MonthlyReport::new(
            tracker.fresh_id(),
            "2024-13".into(),
            "June".into(),
            String::new(),
        );
        assert_eq!(
            tracker.add_report(report),
            Err(TrackerError::InvalidMonth("2024-13".into()))
        );
    }

    #[test]
    fn logs_in_month_selects_calendar_month() {
        let mut tracker = Tracker::named("intern");
        for day in ["2024-05-31", "2024-06-01", "2024-06-30", "2024-07-01"] {
            let entry = log(&tracker, day, 1.0);
            tracker.add_log(entry).unwrap();
        }
        let june = tracker.logs_in_month("2024-06").unwrap();
        let dates: Vec<_> = june.iter().map(|l| l.date).collect();
        assert_eq!(dates, vec![date("2024-06-01"), date("2024-06-30")]);
    }

    #[test]
    fn stats_count_this_week() {
        let mut tracker = Tracker::named("intern");
        for (day, hours) in [("2024-06-01", 8.0), ("2024-06-10", 6.0), ("2024-06-15", 4.0)] {
            let entry = log(&tracker, day, hours);
            tracker.add_log(entry).unwrap();
        }
        let stats = tracker.stats(date("2024-06-15"));
        assert_eq!(stats.total_logs, 3);
        assert_eq!(stats.total_hours, 18.0);
        assert_eq!(stats.week_logs, 2);
        assert_eq!(stats.week_hours, 10.0);
        assert!(stats.projects.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn fresh_ids_are_unique() {
        let mut tracker = Tracker::named("intern");
        for _ in 0..50 {
            let entry = log(&tracker, "2024-06-10", 1.0);
            tracker.add_log(entry).unwrap();
        }
        let mut ids: Vec<_> = tracker.logs.iter().map(|l| l.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }
}
