use crate::assist::{TextAssistant, NOTHING_TO_SUMMARIZE, SUMMARY_FAILURE};
use crate::cli::{FilterArgs, LogCommand, LogField, ProjectCommand, ReportCommand};
use crate::config::{Config, API_KEY_ENV};
use crate::filter::RecordFilter;
use crate::model::{LogEntry, MonthlyReport, Project, Tracker};
use crate::storage::{init_project_tracker, load_tracker, locate_tracker, save_tracker, TrackerLocation};
use crate::timeline::{layout_projects, DateInterval, TimelineLayout};
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use std::env;
use tracing::{info, warn};

pub fn init(name: Option<String>) -> Result<()> {
    let cwd = env::current_dir()?;
    let location = init_project_tracker(&cwd, name)?;
    println!("Initialized tracker at {}", location.path.display());
    Ok(())
}

pub fn log(command: LogCommand, config: &Config) -> Result<()> {
    let (mut tracker, location) = load_current_tracker()?;
    match command {
        LogCommand::Add {
            title,
            date,
            description,
            category,
            hours,
            tags,
            learnings,
        } => {
            let date = parse_day(date.as_deref())?.unwrap_or_else(today);
            let id = tracker.fresh_id();
            let entry = LogEntry::new(
                id.clone(),
                date,
                title,
                description,
                category,
                hours,
                tags,
                learnings,
            );
            tracker.add_log(entry).context("adding log entry")?;
            save_tracker(&location, &tracker)?;
            info!(%id, %date, "log entry added");
            println!("Added log {} for {}", id, date);
        }
        LogCommand::List {
            filter,
            category,
            week,
        } => {
            let filter = RecordFilter {
                category: category.map(|c| c.as_str().to_string()),
                week_ending: week.then(today),
                ..record_filter(filter)
            };
            let logs = filter.apply(&tracker.logs);
            if logs.is_empty() {
                println!("{}", empty_message(&filter, "log entries"));
            }
            for entry in logs {
                print_log(entry);
            }
        }
        LogCommand::Edit {
            id,
            title,
            date,
            description,
            category,
            hours,
            tags,
            clear_tags,
            learnings,
        } => {
            let date = parse_day(date.as_deref())?;
            tracker
                .update_log(&id, |entry| {
                    if let Some(t) = title {
                        entry.title = t;
                    }
                    if let Some(d) = date {
                        entry.date = d;
                    }
                    if let Some(d) = description {
                        entry.description = d;
                    }
                    if let Some(c) = category {
                        entry.category = c;
                    }
                    if let Some(h) = hours {
                        entry.hours = h;
                    }
                    if clear_tags {
                        entry.tags.clear();
                    }
                    if !tags.is_empty() {
                        entry.tags = tags;
                    }
                    if let Some(l) = learnings {
                        entry.learnings = Some(l);
                    }
                })
                .with_context(|| format!("editing log {}", id))?;
            save_tracker(&location, &tracker)?;
            println!("Updated log {}", id);
        }
        LogCommand::Remove { id } => {
            let removed = tracker.remove_log(&id)?;
            save_tracker(&location, &tracker)?;
            println!("Removed log {} ({})", removed.id, removed.title);
        }
        LogCommand::Improve { id, field, dry_run } => {
            let assistant = TextAssistant::from_config(&config.assist);
            if !assistant.is_enabled() {
                bail!(
                    "text assistant is not configured (set {} or [assist].api_key)",
                    API_KEY_ENV
                );
            }
            let entry = tracker
                .log(&id)
                .ok_or_else(|| anyhow!("log entry not found: {}", id))?;
            let (draft, context) = match field {
                LogField::Description => (
                    entry.description.clone(),
                    format!("description of a daily internship log titled {:?}", entry.title),
                ),
                LogField::Learnings => (
                    entry.learnings.clone().unwrap_or_default(),
                    format!("key learnings from a daily internship log titled {:?}", entry.title),
                ),
            };
            let improved = assistant.improve_text(&draft, &context);
            println!("{}", improved);
            if dry_run || improved == draft {
                return Ok(());
            }
            tracker.update_log(&id, |entry| match field {
                LogField::Description => entry.description = improved,
                LogField::Learnings => entry.learnings = Some(improved),
            })?;
            save_tracker(&location, &tracker)?;
            println!("Saved improved text to log {}", id);
        }
    }
    Ok(())
}

pub fn report(command: ReportCommand, config: &Config) -> Result<()> {
    let (mut tracker, location) = load_current_tracker()?;
    match command {
        ReportCommand::Add {
            month,
            title,
            summary,
            achievements,
            challenges,
            next_steps,
            tags,
            generate,
        } => {
            let summary = if generate {
                let logs = tracker.logs_in_month(&month)?;
                let assistant = TextAssistant::from_config(&config.assist);
                report_summary(&assistant, &logs, summary)
            } else {
                summary
            };
            let id = tracker.fresh_id();
            let mut report = MonthlyReport::new(id.clone(), month, title, summary);
            report.achievements = achievements;
            report.challenges = challenges;
            report.next_steps = next_steps;
            report.tags = tags;
            tracker.add_report(report).context("adding report")?;
            save_tracker(&location, &tracker)?;
            println!("Added report {}", id);
        }
        ReportCommand::List { filter, status } => {
            let filter = RecordFilter {
                category: status.map(|s| s.as_str().to_string()),
                ..record_filter(filter)
            };
            let reports = filter.apply(&tracker.reports);
            if reports.is_empty() {
                println!("{}", empty_message(&filter, "reports"));
            }
            for report in reports {
                print_report(report);
            }
        }
        ReportCommand::Edit {
            id,
            title,
            month,
            summary,
            achievements,
            challenges,
            next_steps,
            status,
            tags,
            clear_tags,
        } => {
            tracker
                .update_report(&id, |report| {
                    if let Some(t) = title {
                        report.title = t;
                    }
                    if let Some(m) = month {
                        report.month = m;
                    }
                    if let Some(s) = summary {
                        report.summary = s;
                    }
                    if achievements.is_some() {
                        report.achievements = achievements;
                    }
                    if challenges.is_some() {
                        report.challenges = challenges;
                    }
                    if next_steps.is_some() {
                        report.next_steps = next_steps;
                    }
                    if let Some(s) = status {
                        report.status = s;
                    }
                    if clear_tags {
                        report.tags.clear();
                    }
                    if !tags.is_empty() {
                        report.tags = tags;
                    }
                })
                .with_context(|| format!("editing report {}", id))?;
            save_tracker(&location, &tracker)?;
            println!("Updated report {}", id);
        }
        ReportCommand::Remove { id } => {
            let removed = tracker.remove_report(&id)?;
            save_tracker(&location, &tracker)?;
            println!("Removed report {} ({})", removed.id, removed.title);
        }
    }
    Ok(())
}

pub fn project(command: ProjectCommand) -> Result<()> {
    let (mut tracker, location) = load_current_tracker()?;
    match command {
        ProjectCommand::Add {
            name,
            description,
            status,
            start,
            end,
            tags,
        } => {
            let start = canonical_date(start.as_deref())?;
            let end = canonical_date(end.as_deref())?;
            check_range(start.as_deref(), end.as_deref())?;
            let id = tracker.fresh_id();
            let mut project = Project::new(id.clone(), name, status, start, end);
            project.description = description;
            project.tags = tags;
            tracker.add_project(project);
            save_tracker(&location, &tracker)?;
            println!("Added project {}", id);
        }
        ProjectCommand::List { filter, status } => {
            let filter = RecordFilter {
                category: status.map(|s| s.as_str().to_string()),
                ..record_filter(filter)
            };
            let projects = filter.apply(&tracker.projects);
            if projects.is_empty() {
                println!("{}", empty_message(&filter, "projects"));
            }
            for project in projects {
                print_project(project);
            }
        }
        ProjectCommand::Edit {
            id,
            name,
            description,
            status,
            start,
            end,
            clear_start,
            clear_end,
            tags,
            clear_tags,
        } => {
            let current = tracker
                .project(&id)
                .ok_or_else(|| anyhow!("project not found: {}", id))?;
            let start = match canonical_date(start.as_deref())? {
                Some(s) => Some(s),
                None if clear_start => None,
                None => current.start_date.clone(),
            };
            let end = match canonical_date(end.as_deref())? {
                Some(e) => Some(e),
                None if clear_end => None,
                None => current.end_date.clone(),
            };
            check_range(start.as_deref(), end.as_deref())?;
            tracker
                .update_project(&id, |project| {
                    if let Some(n) = name {
                        project.name = n;
                    }
                    if description.is_some() {
                        project.description = description;
                    }
                    if let Some(s) = status {
                        project.status = s;
                    }
                    project.start_date = start;
                    project.end_date = end;
                    if clear_tags {
                        project.tags.clear();
                    }
                    if !tags.is_empty() {
                        project.tags = tags;
                    }
                })
                .with_context(|| format!("editing project {}", id))?;
            save_tracker(&location, &tracker)?;
            println!("Updated project {}", id);
        }
        ProjectCommand::Remove { id } => {
            let removed = tracker.remove_project(&id)?;
            save_tracker(&location, &tracker)?;
            println!("Removed project {} ({})", removed.id, removed.name);
        }
    }
    Ok(())
}

pub fn timeline(width: u16) -> Result<()> {
    let (tracker, _) = load_current_tracker()?;
    let timeline = layout_projects(&tracker.projects, Utc::now());
    match timeline {
        Ok(timeline) => {
            match &timeline.layout {
                Some(layout) => print_layout(layout, width),
                None => println!("No timeline available: no project has a start or end date."),
            }
            for rejected in &timeline.rejected {
                println!(
                    "  ! {} ({}) not shown: {}",
                    rejected.name, rejected.project_id, rejected.error
                );
            }
        }
        Err(err) => println!("No timeline available: {}", err),
    }
    Ok(())
}

pub fn summarize(week: bool, month: Option<String>, config: &Config) -> Result<()> {
    let (tracker, _) = load_current_tracker()?;
    let logs: Vec<&LogEntry> = match month {
        Some(month) => tracker.logs_in_month(&month)?,
        None => RecordFilter {
            week_ending: week.then(today),
            ..RecordFilter::default()
        }
        .apply(&tracker.logs),
    };
    let assistant = TextAssistant::from_config(&config.assist);
    println!("{}", assistant.summarize_logs(&logs));
    Ok(())
}

pub fn stats() -> Result<()> {
    let (tracker, location) = load_current_tracker()?;
    let stats = tracker.stats(today());
    println!("Tracker: {} ({})", tracker.name, location.scope.label());
    println!(
        "Logs: {} entries, {:.1}h total; this week {} entries, {:.1}h",
        stats.total_logs, stats.total_hours, stats.week_logs, stats.week_hours
    );
    let reports = stats
        .reports
        .iter()
        .map(|(s, n)| format!("{} {}", n, s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Reports: {}", reports);
    let projects = stats
        .projects
        .iter()
        .map(|(s, n)| format!("{} {}", n, s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Projects: {}", projects);
    Ok(())
}

pub fn tui() -> Result<()> {
    let (tracker, location) = load_current_tracker()?;
    ui::run(tracker, location)
}

fn load_current_tracker() -> Result<(Tracker, TrackerLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_tracker(&cwd)?;
    let tracker = load_tracker(&location)?;
    Ok((tracker, location))
}

/// Generated summary of `logs`, or the user's own `summary` when nothing
/// usable comes back.
fn report_summary(assistant: &TextAssistant, logs: &[&LogEntry], summary: String) -> String {
    if !assistant.is_enabled() {
        warn!("report summary not generated, assistant disabled");
        eprintln!(
            "warning: text assistant is not configured (set {} or [assist].api_key); keeping the given summary",
            API_KEY_ENV
        );
        return summary;
    }
    let generated = assistant.summarize_logs(logs);
    if generated == SUMMARY_FAILURE || generated == NOTHING_TO_SUMMARIZE {
        warn!(entries = logs.len(), "report summary not generated");
        eprintln!("warning: {} Keeping the given summary.", generated);
        return summary;
    }
    generated
}

fn record_filter(args: FilterArgs) -> RecordFilter {
    RecordFilter {
        search: args.search,
        tag: args.tag,
        ..RecordFilter::default()
    }
}

fn empty_message(filter: &RecordFilter, kind: &str) -> String {
    if filter.is_empty() {
        format!("(no {})", kind)
    } else {
        format!("(no matching {})", kind)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_day(input: Option<&str>) -> Result<Option<NaiveDate>> {
    let raw = match input {
        Some(r) => r.trim(),
        None => return Ok(None),
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", raw))?;
    Ok(Some(date))
}

fn canonical_date(input: Option<&str>) -> Result<Option<String>> {
    Ok(parse_day(input)?.map(|d| d.format("%Y-%m-%d").to_string()))
}

fn check_range(start: Option<&str>, end: Option<&str>) -> Result<()> {
    DateInterval::normalize(start, end, Utc::now())
        .map(|_| ())
        .map_err(|err| anyhow!("invalid project dates: {}", err))
}

fn print_log(entry: &LogEntry) {
    println!(
        "  - {} {} [{}] {:.1}h {}",
        entry.id,
        entry.date,
        entry.category.as_str(),
        entry.hours,
        entry.title
    );
    if !entry.description.is_empty() {
        println!("    {}", entry.description);
    }
    if let Some(learnings) = &entry.learnings {
        println!("    learned: {}", learnings);
    }
    if !entry.tags.is_empty() {
        println!("    tags: {}", entry.tags.join(", "));
    }
}

fn print_report(report: &MonthlyReport) {
    println!(
        "  - {} {} [{}] {}",
        report.id,
        report.month,
        report.status.as_str(),
        report.title
    );
    if !report.summary.is_empty() {
        println!("    {}", report.summary);
    }
    for (label, value) in [
        ("achievements", &report.achievements),
        ("challenges", &report.challenges),
        ("next steps", &report.next_steps),
    ] {
        if let Some(v) = value {
            println!("    {}: {}", label, v);
        }
    }
    if !report.tags.is_empty() {
        println!("    tags: {}", report.tags.join(", "));
    }
}

fn print_project(project: &Project) {
    println!(
        "  - {} [{}] {}",
        project.id,
        project.status.as_str(),
        project.name
    );
    if let Some(description) = &project.description {
        println!("    {}", description);
    }
    if project.start_date.is_some() || project.end_date.is_some() {
        println!(
            "    {} -> {}",
            project.start_date.as_deref().unwrap_or("?"),
            project.end_date.as_deref().unwrap_or("?")
        );
    }
    if !project.tags.is_empty() {
        println!("    tags: {}", project.tags.join(", "));
    }
}

fn print_layout(layout: &TimelineLayout, width: u16) {
    println!(
        "Window: {} -> {}",
        layout.bounds.min.format("%Y-%m-%d"),
        layout.bounds.max.format("%Y-%m-%d")
    );
    let months = layout
        .gridlines
        .iter()
        .map(|g| format!("{} @ {:.1}%", g.label, g.position_percent))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Months: {}", months);
    match layout.today_percent {
        Some(p) => println!("Today: {:.1}%", p),
        None => println!("Today: outside the window"),
    }
    println!("{}", ui::axis_text(layout, width));
    for bar in &layout.bars {
        println!(
            "{} {} ({:.1}% +{:.1}%) {}",
            ui::bar_text(&bar.geometry, width),
            bar.name,
            bar.geometry.start_percent,
            bar.geometry.width_percent,
            bar.project_id
        );
    }
}
