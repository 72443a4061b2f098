use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame, Terminal,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use workoutterm::data::{DashboardData, DashboardOptions, WorkoutCache};
use workoutterm::telemetry::{get_subscriber, init_subscriber, open_log_file};
use workoutterm::{Config, WorkoutAPI};

#[derive(Parser)]
#[command(name = "workoutterm")]
#[command(about = "Workout log statistics dashboard for the terminal")]
#[command(version)]
struct Cli {
    /// Ignore the cache and fetch every workout again
    #[arg(short, long)]
    refresh: bool,

    /// Read workouts from a JSON file instead of the record store
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Print the dashboard as JSON and exit
    #[arg(long, conflicts_with = "test")]
    json: bool,

    /// Compute streaks as of this date (YYYY-MM-DD) instead of today
    #[arg(long, value_name = "DATE")]
    as_of: Option<NaiveDate>,

    /// Months shown in the monthly breakdown (0 for all)
    #[arg(short, long, default_value_t = 6)]
    months: u32,

    /// Number of recent workouts to list
    #[arg(long, default_value_t = 10)]
    recent: usize,

    /// Test record store connectivity
    #[arg(long)]
    test: bool,
}

enum Source {
    File(PathBuf),
    Store,
}

struct App {
    data: Option<DashboardData>,
    api: WorkoutAPI,
    source: Source,
    as_of: NaiveDate,
    options: DashboardOptions,
    error_message: Option<String>,
}

impl App {
    fn new(cli: &Cli, config: Config) -> Result<Self> {
        let source = match &cli.file {
            Some(path) => Source::File(path.clone()),
            None => Source::Store,
        };

        Ok(Self {
            data: None,
            api: WorkoutAPI::new(config)?,
            source,
            as_of: cli.as_of.unwrap_or_else(|| Local::now().date_naive()),
            options: DashboardOptions {
                months: cli.months,
                recent: cli.recent,
            },
            error_message: None,
        })
    }

    async fn fetch(&self, force_refresh: bool) -> Result<DashboardData> {
        let cache = match &self.source {
            Source::File(path) => WorkoutCache {
                records: Config::load_records_file(path)?,
                refreshed_at: None,
            },
            Source::Store if force_refresh => self.api.refresh_records().await?,
            Source::Store => self.api.load_cached_or_refresh().await?,
        };

        Ok(DashboardData::build(
            &cache.records,
            self.as_of,
            self.options,
            cache.refreshed_at,
        ))
    }

    async fn load_data(&mut self, force_refresh: bool) {
        match self.fetch(force_refresh).await {
            Ok(data) => {
                self.data = Some(data);
                self.error_message = None;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load workouts");
                self.error_message = Some(format!("Error: {}", e));
            }
        }
    }
}

fn init_logging(config: &Config, to_stderr: bool) -> Result<()> {
    let default_filter = "workoutterm=info".to_string();
    if to_stderr {
        init_subscriber(get_subscriber(default_filter, std::io::stderr))
    } else {
        let file = open_log_file(&config.log_path()?)?;
        init_subscriber(get_subscriber(default_filter, Mutex::new(file)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(&config, cli.json)?;

    let mut app = App::new(&cli, config)?;

    if cli.json {
        let data = app.fetch(cli.refresh).await?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if cli.test {
        match app.api.test_connection().await {
            Ok(_) => {
                app.error_message = Some("Record store test successful!".to_string());
            }
            Err(e) => {
                app.error_message = Some(format!("Record store test failed: {}", e));
            }
        }
    } else {
        app.load_data(cli.refresh).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut last_tick = std::time::Instant::now();
    let tick_rate = std::time::Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| std::time::Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('r') => app.load_data(true).await,
                    KeyCode::Enter if app.error_message.is_some() => {
                        app.error_message = None;
                    }
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = std::time::Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(2), // Status
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Footer
        ])
        .split(size);

    let header = Paragraph::new("WORKOUT DASHBOARD")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(header, chunks[0]);

    if let Some(data) = &app.data {
        let refreshed = match data.refreshed_at {
            Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            None => "from file".to_string(),
        };
        let mut status = format!("  As of {}  |  Refreshed: {}", data.as_of, refreshed);
        if data.stats.skipped_records > 0 {
            status.push_str(&format!(
                "  |  {} record(s) skipped (bad date)",
                data.stats.skipped_records
            ));
        }
        f.render_widget(
            Paragraph::new(status).style(Style::default().fg(Color::Gray)),
            chunks[1],
        );
    }

    if let Some(message) = &app.error_message {
        let popup = Paragraph::new(message.as_str())
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        let area = centered_rect(60, 20, size);
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
        return;
    }

    if let Some(data) = &app.data {
        render_main_content(f, chunks[2], data);
    }

    let footer = Paragraph::new("[r] Refresh  |  [q] Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[3]);
}

fn render_main_content(f: &mut Frame, area: Rect, data: &DashboardData) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),  // Totals + streaks
            Constraint::Length(13), // Types + months
            Constraint::Min(6),     // Recent workouts
        ])
        .split(area);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    render_totals(f, rows[0], data);
    render_types(f, middle[0], data);
    render_monthly(f, middle[1], data);
    render_recent(f, rows[2], data);
}

fn render_totals(f: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .title(" Overview ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let stats = &data.stats;
    let text = vec![
        Line::from(vec![
            Span::styled("  Workouts: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:<8}", stats.total_workouts),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled("Total time: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:<10}", format_duration(stats.total_duration)),
                Style::default().fg(Color::White),
            ),
            Span::styled("Average: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format_duration(stats.avg_duration),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Current streak: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:<6}", days_label(stats.current_streak)),
                Style::default()
                    .fg(streak_color(stats.current_streak))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("    Longest streak: ", Style::default().fg(Color::Gray)),
            Span::styled(
                days_label(stats.longest_streak),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(text), inner);
}

fn render_types(f: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .title(" Workout Types ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let header_cells = ["Type", "Count", "Share"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let total = data.stats.total_workouts;
    let mut counts: Vec<_> = data.stats.workout_types.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    let rows: Vec<Row> = counts
        .into_iter()
        .map(|(kind, count)| {
            let bar = create_horizontal_bar(u64::from(*count), u64::from(total), 14);
            Row::new(vec![
                Cell::from(format!("{} {}", kind.icon(), kind.label())),
                Cell::from(count.to_string()),
                Cell::from(bar).style(Style::default().fg(Color::Magenta)),
            ])
            .height(1)
        })
        .collect();

    let widths = [
        Constraint::Length(14),
        Constraint::Length(7),
        Constraint::Length(16),
    ];
    let table = Table::new(rows)
        .header(header)
        .block(Block::default())
        .widths(&widths);

    f.render_widget(table, inner);
}

fn render_monthly(f: &mut Frame, area: Rect, data: &DashboardData) {
    let title = if data.monthly.is_empty() {
        " Monthly ".to_string()
    } else {
        format!(" Monthly ({} months) ", data.monthly.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let header_cells = ["Month", "Workouts", "Time", "Graph"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let busiest = data
        .monthly
        .iter()
        .map(|m| m.duration)
        .max()
        .unwrap_or(0);

    // Newest month first so the current one is always visible.
    let rows: Vec<Row> = data
        .monthly
        .iter()
        .rev()
        .map(|month| {
            let bar = create_horizontal_bar(month.duration, busiest, 16);
            Row::new(vec![
                Cell::from(month.month.clone()),
                Cell::from(month.workouts.to_string()),
                Cell::from(format_duration(month.duration)),
                Cell::from(bar).style(Style::default().fg(Color::Cyan)),
            ])
            .height(1)
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Length(18),
    ];
    let table = Table::new(rows)
        .header(header)
        .block(Block::default())
        .widths(&widths);

    f.render_widget(table, inner);
}

fn render_recent(f: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .title(" Recent Workouts ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let header_cells = ["Date", "Activity", "Duration", "Notes"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows: Vec<Row> = data
        .recent_workouts
        .iter()
        .map(|workout| {
            let date = workout
                .date()
                .map(|d| d.to_string())
                .unwrap_or_else(|_| "?".to_string());
            let notes: String = workout
                .notes
                .as_deref()
                .unwrap_or("")
                .chars()
                .take(60)
                .collect();

            Row::new(vec![
                Cell::from(date),
                Cell::from(format!(
                    "{} {}",
                    workout.workout_type.icon(),
                    workout.workout_type.label()
                )),
                Cell::from(format_duration(u64::from(workout.duration_minutes))),
                Cell::from(notes).style(Style::default().fg(Color::DarkGray)),
            ])
            .height(1)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Min(10),
    ];
    let table = Table::new(rows)
        .header(header)
        .block(Block::default())
        .widths(&widths);

    f.render_widget(table, inner);
}

fn create_horizontal_bar(value: u64, max: u64, width: usize) -> String {
    let ratio = if max == 0 {
        0.0
    } else {
        (value as f64 / max as f64).min(1.0)
    };
    let filled = (ratio * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn streak_color(days: u32) -> Color {
    match days {
        0 => Color::Red,
        1..=2 => Color::Yellow,
        _ => Color::Green,
    }
}

fn days_label(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

fn format_duration(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{}h{:02}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
