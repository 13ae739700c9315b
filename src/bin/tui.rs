mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tui_app::{
    format_change, format_time_ms, format_usd, truncate, AppState, ConnectionStatus,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    // Manual refresh waits for a full server cycle, so allow more than the upstream timeout.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);
    app.refresh(&client).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let poll_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = poll_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.last_action = Some("refreshing…".to_string());
                            terminal.draw(|f| render(f, app, table_state))?;
                            app.trigger_refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('c') | KeyCode::Char('C') => {
                            app.clear(client).await;
                            table_state.select(None);
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.view.items.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= poll_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_body(f, app, table_state, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn level_color(level: u8) -> Color {
    match level {
        4 => Color::Red,
        3 => Color::LightRed,
        2 => Color::Yellow,
        1 => Color::Green,
        _ => Color::DarkGray,
    }
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let best = app.view.best_pick.as_ref().map_or("none".to_string(), |b| {
        format!("{} {:.1} (P{})", b.display_name, b.score, b.panic_level)
    });
    let last = app
        .health
        .last_refresh_at_ms
        .map_or("never".to_string(), format_time_ms);

    let hot = app.is_hot();
    let border_color = if hot { Color::Red } else { Color::DarkGray };
    let title = if hot { " PANIC RADAR [HOT]  " } else { " PANIC RADAR  " };

    let spans = vec![
        Span::styled(
            title,
            Style::default()
                .fg(if hot { Color::Red } else { Color::Cyan })
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  best: "),
        Span::styled(best, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} ranked / {} cached", app.view.items.len(), app.health.cached_items),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  last refresh "),
        Span::styled(last, Style::default().fg(Color::White)),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color)),
    );
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    render_radar_table(f, app, table_state, halves[0]);
    render_events(f, app, halves[1]);
}

fn render_radar_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Pair", "Score", "Lvl", "Liq", "Vol 24h", "1h"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .view
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let color = level_color(item.panic_level);
            let name_style = if item.is_preferred_quote {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            let change_color = if item.change_1h >= 0.0 { Color::Green } else { Color::Red };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&item.display_name, 22)).style(name_style),
                Cell::from(format!("{:.1}", item.score)).style(Style::default().fg(color)),
                Cell::from(format!("P{}", item.panic_level)).style(Style::default().fg(color)),
                Cell::from(format_usd(item.liquidity_usd)),
                Cell::from(format_usd(item.volume_24h)),
                Cell::from(format_change(item.change_1h)).style(Style::default().fg(change_color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " RADAR ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_events(f: &mut Frame, app: &AppState, area: Rect) {
    let rows: Vec<Row> = app
        .events
        .iter()
        .map(|e| {
            let color = if e.severity == "warn" { Color::Yellow } else { Color::White };
            Row::new(vec![
                Cell::from(format_time_ms(e.at)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&e.message, 48)).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(8), Constraint::Min(10)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " EVENTS ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[c] ", Style::default().fg(Color::Yellow)),
        Span::raw("clear  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
        Span::styled("auto-poll: 2s", Style::default().fg(Color::DarkGray)),
    ];
    if let Some(action) = &app.last_action {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(action.clone(), Style::default().fg(Color::Cyan)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
