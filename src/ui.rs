use crate::model::{ProjectStatus, Tracker};
use crate::storage::{load_tracker, TrackerLocation};
use crate::timeline::{layout_projects, BarGeometry, Timeline, TimelineLayout};
use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const NAME_COLUMN: u16 = 24;
const BAR_CHAR: char = '█';
const GRID_CHAR: char = '│';
const TODAY_CHAR: char = '┃';

pub fn run(tracker: Tracker, location: TrackerLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(tracker, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    tracker: Tracker,
    location: TrackerLocation,
    timeline: Result<Timeline, String>,
    selected: usize,
    offset: usize,
    last_load: Instant,
    status: String,
}

impl App {
    fn new(tracker: Tracker, location: TrackerLocation) -> Self {
        let status = format!("Loaded tracker from {}", location.path.display());
        let mut app = App {
            tracker,
            location,
            timeline: Ok(Timeline::default()),
            selected: 0,
            offset: 0,
            last_load: Instant::now(),
            status,
        };
        app.relayout();
        app
    }

    fn relayout(&mut self) {
        self.timeline =
            layout_projects(&self.tracker.projects, Utc::now()).map_err(|e| e.to_string());
        let bars = self.bar_count();
        if self.selected >= bars {
            self.selected = bars.saturating_sub(1);
        }
    }

    fn reload(&mut self) {
        match load_tracker(&self.location) {
            Ok(tracker) => {
                self.tracker = tracker;
                self.last_load = Instant::now();
                self.relayout();
                self.status = "Reloaded".into();
                debug!("tracker reloaded in viewer");
            }
            Err(err) => {
                warn!(%err, "reload failed");
                self.status = format!("Reload failed: {:#}", err);
            }
        }
    }

    fn layout(&self) -> Option<&TimelineLayout> {
        self.timeline.as_ref().ok().and_then(|t| t.layout.as_ref())
    }

    fn bar_count(&self) -> usize {
        self.layout().map_or(0, |l| l.bars.len())
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.bar_count() {
                    self.selected += 1;
                }
            }
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = self.bar_count().saturating_sub(1);
            }
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_chart(f, layout[1]);
        self.draw_footer(f, layout[2]);
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "internlog ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                &self.tracker.name,
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("loaded {}", format_elapsed(self.last_load)),
                Style::default().fg(Color::Gray),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_chart(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                "Timeline",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let message = match &self.timeline {
            Err(err) => Some(format!("No timeline available: {}", err)),
            Ok(Timeline { layout: None, .. }) => {
                Some("No timeline available: add a start or end date to a project".to_string())
            }
            Ok(_) => None,
        };
        if let Some(message) = message {
            let msg = Paragraph::new(message)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            f.render_widget(msg, inner);
            return;
        }
        let Some(layout) = self.layout() else {
            return;
        };

        let chart_width = inner.width.saturating_sub(NAME_COLUMN + 1);
        let viewport = inner.height.saturating_sub(1) as usize;
        let offset = adjust_offset(self.selected, self.offset, viewport, 1, layout.bars.len());

        let mut lines = vec![Line::from(vec![
            Span::raw(" ".repeat(NAME_COLUMN as usize + 1)),
            Span::styled(
                axis_text(layout, chart_width),
                Style::default().fg(Color::Gray),
            ),
        ])];
        let gridcols = grid_columns(layout, chart_width);
        let today = layout
            .today_percent
            .map(|p| percent_to_col(p, chart_width));
        for (idx, bar) in layout.bars.iter().enumerate().skip(offset).take(viewport) {
            let selected = idx == self.selected;
            let name_style = if selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightCyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let mut spans = vec![
                Span::styled(pad(&bar.name, NAME_COLUMN as usize), name_style),
                Span::raw(" "),
            ];
            spans.extend(row_spans(
                &bar.geometry,
                chart_width,
                &gridcols,
                today,
                color_for_status(bar.status),
            ));
            lines.push(Line::from(spans));
        }
        f.render_widget(Paragraph::new(lines), inner);
        self.offset = offset;
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help = Line::from(vec![
            Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
            Span::raw(" select  "),
            Span::styled("r", Style::default().fg(Color::LightGreen)),
            Span::raw(" reload  "),
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]);
        let help_bar = Paragraph::new(help).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let mut status = self.status.clone();
        if let Ok(timeline) = &self.timeline {
            if !timeline.rejected.is_empty() {
                let names = timeline
                    .rejected
                    .iter()
                    .map(|r| r.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                status = format!("{}  •  hidden (end before start): {}", status, names);
            }
        }
        let status = Paragraph::new(status).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(status, bottom[0]);

        let detail = Paragraph::new(self.selected_detail())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Project"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn selected_detail(&self) -> Line<'static> {
        let Some(bar) = self.layout().and_then(|l| l.bars.get(self.selected)) else {
            return Line::from("No project selected");
        };
        Line::from(vec![
            Span::styled(
                format!("[{}] ", bar.project_id),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                bar.status.as_str().to_string(),
                Style::default().fg(color_for_status(bar.status)),
            ),
            Span::raw(format!(
                "  {} → {}",
                bar.interval.start.format("%Y-%m-%d"),
                bar.interval.end.format("%Y-%m-%d")
            )),
        ])
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Column of a 0-100 offset on a chart `width` cells wide.
pub fn percent_to_col(percent: f64, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let last = f64::from(width - 1);
    (percent.clamp(0.0, 100.0) / 100.0 * last).round() as u16
}

/// Columns covered by a bar, at least one.
fn bar_columns(geometry: &BarGeometry, width: u16) -> (u16, u16) {
    let start = percent_to_col(geometry.start_percent, width);
    let end = percent_to_col(geometry.end_percent, width);
    (start, end.max(start))
}

/// Month labels placed at their gridline columns.
pub fn axis_text(layout: &TimelineLayout, width: u16) -> String {
    let mut cells = vec![' '; width as usize];
    let mut free_from = 0usize;
    for grid in &layout.gridlines {
        let col = percent_to_col(grid.position_percent, width) as usize;
        if col < free_from {
            continue;
        }
        for (i, ch) in grid.label.chars().enumerate() {
            if let Some(cell) = cells.get_mut(col + i) {
                *cell = ch;
            }
        }
        free_from = col + grid.label.chars().count() + 1;
    }
    cells.into_iter().collect::<String>().trim_end().to_string()
}

/// Plain text bar for non-interactive output.
pub fn bar_text(geometry: &BarGeometry, width: u16) -> String {
    let (start, end) = bar_columns(geometry, width);
    (0..width)
        .map(|col| {
            if col >= start && col <= end {
                BAR_CHAR
            } else {
                '·'
            }
        })
        .collect()
}

fn grid_columns(layout: &TimelineLayout, width: u16) -> Vec<u16> {
    layout
        .gridlines
        .iter()
        .map(|g| percent_to_col(g.position_percent, width))
        .collect()
}

fn row_spans(
    geometry: &BarGeometry,
    width: u16,
    gridcols: &[u16],
    today: Option<u16>,
    accent: Color,
) -> Vec<Span<'static>> {
    let (start, end) = bar_columns(geometry, width);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();
    for col in 0..width {
        let (ch, style) = if col >= start && col <= end {
            (BAR_CHAR, Style::default().fg(accent))
        } else if today == Some(col) {
            (TODAY_CHAR, Style::default().fg(Color::LightRed))
        } else if gridcols.contains(&col) {
            (GRID_CHAR, Style::default().fg(Color::DarkGray))
        } else {
            (' ', Style::default())
        };
        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        run.push(ch);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    spans
}

fn color_for_status(status: ProjectStatus) -> Color {
    match status {
        ProjectStatus::Planned => Color::LightBlue,
        ProjectStatus::InProgress => Color::LightGreen,
        ProjectStatus::Completed => Color::Gray,
        ProjectStatus::OnHold => Color::LightYellow,
    }
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        format!("{}{}", text, " ".repeat(width - count))
    }
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{GridMonth, TimelineBounds};
    use chrono::{Duration, TimeZone};

    fn layout_with(gridlines: Vec<GridMonth>) -> TimelineLayout {
        let min = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TimelineLayout {
            bounds: TimelineBounds {
                min,
                max: min + Duration::days(100),
                total: Duration::days(100),
            },
            gridlines,
            bars: vec![],
            today_percent: None,
        }
    }

    #[test]
    fn percent_maps_to_edges() {
        assert_eq!(percent_to_col(0.0, 11), 0);
        assert_eq!(percent_to_col(50.0, 11), 5);
        assert_eq!(percent_to_col(100.0, 11), 10);
        assert_eq!(percent_to_col(140.0, 11), 10);
        assert_eq!(percent_to_col(50.0, 0), 0);
    }

    #[test]
    fn narrow_bar_still_draws_a_cell() {
        let geometry = BarGeometry {
            start_percent: 40.0,
            end_percent: 40.0,
            width_percent: 1.0,
        };
        let text = bar_text(&geometry, 11);
        assert_eq!(text.chars().filter(|c| *c == BAR_CHAR).count(), 1);
        assert_eq!(text.chars().position(|c| c == BAR_CHAR), Some(4));
    }

    #[test]
    fn bar_spans_start_to_end() {
        let geometry = BarGeometry {
            start_percent: 10.0,
            end_percent: 30.0,
            width_percent: 20.0,
        };
        assert_eq!(bar_columns(&geometry, 11), (1, 3));
        assert_eq!(bar_text(&geometry, 11), "·███·······");
    }

    #[test]
    fn axis_skips_overlapping_labels() {
        let layout = layout_with(vec![
            GridMonth {
                label: "Jan 24".into(),
                position_percent: 0.0,
            },
            GridMonth {
                label: "Feb 24".into(),
                position_percent: 5.0,
            },
            GridMonth {
                label: "Mar 24".into(),
                position_percent: 50.0,
            },
        ]);
        assert_eq!(axis_text(&layout, 21), "Jan 24    Mar 24");
    }

    #[test]
    fn row_marks_today_and_gridlines() {
        let geometry = BarGeometry {
            start_percent: 0.0,
            end_percent: 20.0,
            width_percent: 20.0,
        };
        let spans = row_spans(&geometry, 11, &[5], Some(8), Color::Green);
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text.chars().count(), 11);
        assert_eq!(text.chars().nth(0), Some(BAR_CHAR));
        assert_eq!(text.chars().nth(2), Some(BAR_CHAR));
        assert_eq!(text.chars().nth(5), Some(GRID_CHAR));
        assert_eq!(text.chars().nth(8), Some(TODAY_CHAR));
    }

    #[test]
    fn pad_truncates_long_names() {
        assert_eq!(pad("abc", 5), "abc  ");
        assert_eq!(pad("abcdefgh", 5), "abcd…");
    }
}
