use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Map, MapResolution},
        Block, BorderType, Borders, Cell, Paragraph, Row, Table,
    },
    Frame, Terminal,
};
use tracing::info;

use crate::app::App;
use crate::error::Result;
use crate::locality::{LivenessStatus, LocalityTree};
use crate::simulator::{LocalitiesView, MapView};
use crate::util::{format_count, format_rate};

pub fn run(mut app: App) -> Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!(ticks = app.ticks, "terminal map closed");
    res
}

fn run_app_loop<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(app.tick_ms);

    loop {
        terminal.draw(|f| draw(f, &*app))?;

        // Handle input
        let timeout = tick_rate.checked_sub(app.last_tick.elapsed()).unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') || key.code == KeyCode::Char('c') {
                    return Ok(());
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.on_tick();
            app.last_tick = Instant::now();
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(18), // Map + activity
            Constraint::Min(8),     // Node table
            Constraint::Length(1),  // Status bar
        ])
        .split(f.size());

    match app.simulator.render(&app.props) {
        MapView::Loading => draw_loading(f, main_chunks[0].union(main_chunks[1])),
        MapView::Localities(view) => {
            let top_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(main_chunks[0]);
            draw_map(f, top_chunks[0], &view);
            draw_localities(f, top_chunks[1], app, &view);
            draw_node_table(f, main_chunks[1], app);
        }
    }
    draw_status_bar(f, main_chunks[2], app);
}

fn draw_loading(f: &mut Frame, area: Rect) {
    let text = Paragraph::new(Line::from(Span::styled(
        "Loading cluster data...",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    f.render_widget(text, area);
}

fn draw_map(f: &mut Frame, area: Rect, view: &LocalitiesView) {
    // Top-level localities placed on the world map
    let mut points: Vec<(f64, f64, String, f64, bool)> = Vec::new();
    for child in view.locality_tree.children() {
        if let Some(location) = view.location_tree.locate_nearest(&child.tiers) {
            let rate = view.locality_activity_rate(child);
            let healthy = child
                .all_nodes()
                .iter()
                .all(|n| view.liveness.get(&n.desc.node_id) == Some(&LivenessStatus::Live));
            let label = child.tiers.last().map(|t| t.value.clone()).unwrap_or_default();
            points.push((location.longitude, location.latitude, label, rate, healthy));
        }
    }

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Cluster Map ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .marker(Marker::Braille)
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(|ctx| {
            ctx.draw(&Map { color: Color::DarkGray, resolution: MapResolution::High });
            ctx.layer();
            for (x, y, label, rate, healthy) in &points {
                let color = if *healthy { Color::Green } else { Color::Red };
                ctx.draw(&CanvasLine { x1: *x - 2.0, y1: *y, x2: *x + 2.0, y2: *y, color });
                ctx.draw(&CanvasLine { x1: *x, y1: *y - 2.0, x2: *x, y2: *y + 2.0, color });
                ctx.print(*x + 3.0, *y, Line::from(Span::styled(
                    format!("{} {}", label, format_rate(*rate)),
                    Style::default().fg(Color::White),
                )));
            }
        });
    f.render_widget(canvas, area);
}

fn draw_localities(f: &mut Frame, area: Rect, app: &App, view: &LocalitiesView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    // Cluster activity graph
    let max_activity = app.activity_history.iter().cloned().fold(1.0, f64::max);
    let x_limit = app.activity_history.len() as f64;
    let graph = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(format!(" Activity {} ", format_rate(app.cluster_activity_rate())))
                .title_style(Style::default().fg(Color::Green)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, x_limit])
        .y_bounds([0.0, max_activity])
        .paint(|ctx| {
            for (i, &val) in app.activity_history.iter().enumerate() {
                ctx.draw(&CanvasLine { x1: i as f64, y1: 0.0, x2: i as f64, y2: val, color: Color::Green });
            }
        });
    f.render_widget(graph, chunks[0]);

    let mut lines = Vec::new();
    locality_lines(view, view.locality_tree, 0, &mut lines);
    let tier_keys: Vec<&str> = view.tiers.iter().map(|t| t.key.as_str()).collect();
    let list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(format!(" Localities [{}] ", tier_keys.join(" > "))),
    );
    f.render_widget(list, chunks[1]);
}

fn locality_lines<'a>(view: &LocalitiesView, tree: &LocalityTree, depth: usize, lines: &mut Vec<Line<'a>>) {
    // Only descend as far as the configured display tiers
    if depth >= view.tiers.len() {
        return;
    }
    for child in tree.children() {
        lines.push(Line::from(vec![
            Span::raw(format!("{}{} ", "  ".repeat(depth), child.name())),
            Span::styled(format!("({}) ", child.all_nodes().len()), Style::default().fg(Color::DarkGray)),
            Span::styled(format_rate(view.locality_activity_rate(child)), Style::default().fg(Color::Green)),
        ]));
        locality_lines(view, child, depth + 1, lines);
    }
}

fn draw_node_table(f: &mut Frame, area: Rect, app: &App) {
    let header_cells = ["Node", "Address", "Locality", "Activity", "Total Ops", "Updated", "Liveness"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).style(Style::default().bg(Color::Rgb(40, 40, 40))).height(1);

    let rows = app.node_rows().into_iter().map(|row| {
        let rate_color = if row.activity_rate > 500.0 {
            Color::Red
        } else if row.activity_rate > 100.0 {
            Color::LightYellow
        } else {
            Color::Green
        };
        let liveness_color = match row.liveness {
            LivenessStatus::Live => Color::Green,
            LivenessStatus::Dead | LivenessStatus::Unavailable => Color::Red,
            _ => Color::DarkGray,
        };
        Row::new(vec![
            Cell::from(format!("n{}", row.node_id)),
            Cell::from(row.address),
            Cell::from(row.locality).style(Style::default().fg(Color::Cyan)),
            Cell::from(format_rate(row.activity_rate)).style(Style::default().fg(rate_color)),
            Cell::from(format_count(row.total_ops)),
            Cell::from(row.updated_at.to_local().format("%H:%M:%S").to_string())
                .style(Style::default().fg(Color::DarkGray)),
            Cell::from(row.liveness.label()).style(Style::default().fg(liveness_color)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(15),
            Constraint::Percentage(30),
            Constraint::Percentage(15),
            Constraint::Percentage(12),
            Constraint::Percentage(12),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().title(" Nodes ").borders(Borders::ALL).border_type(BorderType::Rounded));
    f.render_widget(table, area);
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let [nodes, liveness, locations] = app.cluster.request_statuses();
    let flag = |valid: bool| if valid { Color::Green } else { Color::Red };

    let status_content = Line::from(vec![
        Span::styled(" CLUSTER ", Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled("nodes", Style::default().fg(flag(nodes.valid))),
        Span::raw(" "),
        Span::styled("liveness", Style::default().fg(flag(liveness.valid))),
        Span::raw(" "),
        Span::styled("locations", Style::default().fg(flag(locations.valid))),
        Span::raw(" | "),
        Span::styled("PEAK: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(format!("{} ", format_rate(app.peak_activity.0))),
        Span::styled(
            format!("(@{})", app.peak_activity.1.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(format!(" | {} | Press 'q' to quit", app.cluster.clock())),
    ]);

    let status_bar = Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, area);
}
