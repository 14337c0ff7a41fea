use crate::model::Tracker;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TRACKER_DIR: &str = ".internlog";
pub const TRACKER_FILE: &str = "tracker.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct TrackerLocation {
    pub path: PathBuf,
    pub scope: TrackerScope,
}

impl TrackerScope {
    pub fn label(&self) -> &'static str {
        match self {
            TrackerScope::Project => "project",
            TrackerScope::Global => "global",
        }
    }
}

pub fn init_project_tracker(dir: &Path, name: Option<String>) -> Result<TrackerLocation> {
    let tracker_dir = dir.join(TRACKER_DIR);
    fs::create_dir_all(&tracker_dir)
        .with_context(|| format!("failed to create {:?}", tracker_dir))?;
    let location = TrackerLocation {
        path: tracker_dir.join(TRACKER_FILE),
        scope: TrackerScope::Project,
    };
    if !location.path.exists() {
        let tracker_name = name.unwrap_or_else(|| dir_name(dir));
        save_tracker(&location, &Tracker::named(tracker_name))?;
        info!(path = %location.path.display(), "initialized tracker");
    }
    Ok(location)
}

pub fn locate_tracker(start: &Path) -> Result<TrackerLocation> {
    if let Some(project_path) = find_project_tracker(start) {
        return Ok(TrackerLocation {
            path: project_path,
            scope: TrackerScope::Project,
        });
    }
    Ok(TrackerLocation {
        path: global_tracker_path()?,
        scope: TrackerScope::Global,
    })
}

/// Reads the snapshot, writing a fresh one first when none exists.
pub fn load_tracker(location: &TrackerLocation) -> Result<Tracker> {
    if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let tracker: Tracker = serde_yaml::from_str(&data).context("parsing tracker file")?;
        debug!(
            path = %location.path.display(),
            logs = tracker.logs.len(),
            reports = tracker.reports.len(),
            projects = tracker.projects.len(),
            "loaded tracker"
        );
        Ok(tracker)
    } else {
        let fallback_name = match location.scope {
            TrackerScope::Project => location
                .path
                .parent()
                .and_then(|p| p.parent())
                .map(dir_name)
                .unwrap_or_else(|| "internship".to_string()),
            TrackerScope::Global => "internship".to_string(),
        };
        let tracker = Tracker::named(fallback_name);
        save_tracker(location, &tracker)?;
        Ok(tracker)
    }
}

pub fn save_tracker(location: &TrackerLocation, tracker: &Tracker) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(tracker).context("serializing tracker")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    debug!(path = %location.path.display(), "saved tracker");
    Ok(())
}

/// Platform data directory, also home to the log files.
pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "internlog").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn find_project_tracker(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(TRACKER_DIR).join(TRACKER_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_tracker_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(TRACKER_FILE))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("internship")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogCategory, LogEntry, Project, ProjectStatus};
    use chrono::NaiveDate;

    #[test]
    fn init_then_locate_from_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        let location = init_project_tracker(tmp.path(), Some("summer".into())).unwrap();
        assert_eq!(location.scope, TrackerScope::Project);

        let nested = tmp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        let found = locate_tracker(&nested).unwrap();
        assert_eq!(found.scope, TrackerScope::Project);
        assert_eq!(found.path, location.path);
        assert_eq!(load_tracker(&found).unwrap().name, "summer");
    }

    #[test]
    fn init_keeps_existing_tracker() {
        let tmp = tempfile::tempdir().unwrap();
        let location = init_project_tracker(tmp.path(), Some("first".into())).unwrap();
        init_project_tracker(tmp.path(), Some("second".into())).unwrap();
        assert_eq!(load_tracker(&location).unwrap().name, "first");
    }

    #[test]
    fn round_trips_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let location = TrackerLocation {
            path: tmp.path().join("nested").join(TRACKER_FILE),
            scope: TrackerScope::Global,
        };
        let mut tracker = Tracker::named("intern");
        let id = tracker.fresh_id();
        tracker
            .add_log(LogEntry::new(
                id.clone(),
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                "Onboarding".into(),
                "Set up laptop".into(),
                LogCategory::Learning,
                7.5,
                vec!["setup".into()],
                Some("VPN quirks".into()),
            ))
            .unwrap();
        tracker.add_project(Project::new(
            tracker.fresh_id(),
            "Dashboard".into(),
            ProjectStatus::Planned,
            Some("2024-06-01".into()),
            None,
        ));
        save_tracker(&location, &tracker).unwrap();

        let loaded = load_tracker(&location).unwrap();
        assert_eq!(loaded.logs.len(), 1);
        assert_eq!(loaded.logs[0].id, id);
        assert_eq!(loaded.logs[0].learnings.as_deref(), Some("VPN quirks"));
        assert_eq!(loaded.projects[0].start_date.as_deref(), Some("2024-06-01"));
        assert_eq!(loaded.projects[0].end_date, None);
    }

    #[test]
    fn missing_file_is_created_with_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("acme-internship");
        let location = TrackerLocation {
            path: project_dir.join(TRACKER_DIR).join(TRACKER_FILE),
            scope: TrackerScope::Project,
        };
        let tracker = load_tracker(&location).unwrap();
        assert_eq!(tracker.name, "acme-internship");
        assert!(location.path.exists());
    }

    #[test]
    fn older_snapshots_without_collections_still_load() {
        let tmp = tempfile::tempdir().unwrap();
        let location = TrackerLocation {
            path: tmp.path().join(TRACKER_FILE),
            scope: TrackerScope::Global,
        };
        fs::write(&location.path, "name: legacy\n").unwrap();
        let tracker = load_tracker(&location).unwrap();
        assert_eq!(tracker.name, "legacy");
        assert!(tracker.logs.is_empty() && tracker.projects.is_empty());
    }
}
