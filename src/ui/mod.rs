// Terminal dashboard: owns the terminal, reads keys and engine updates, redraws.

pub mod input;
pub mod panels;
pub mod state;

use crate::engine::Engine;
use crate::models::{ActiveContainers, ChartRow, ContainerRecord};
use crate::version;
use anyhow::Context;
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures_util::StreamExt;
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, List, Paragraph};
use state::{Flow, ViewState};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{info, warn};

type Term = Terminal<CrosstermBackend<Stdout>>;

const TITLE_STYLE: Style = Style::new().fg(Color::Green);
const LIST_STYLE: Style = Style::new().fg(Color::Blue);

/// Runs until the user quits or the engine stops publishing. The terminal is restored
/// on every exit path once it has been acquired.
pub async fn run(engine: &mut Engine, redraw_interval: Duration) -> anyhow::Result<()> {
    let mut terminal = setup_terminal().context("acquire terminal")?;
    let result = event_loop(&mut terminal, engine, redraw_interval).await;
    if let Err(e) = restore_terminal(&mut terminal) {
        warn!("Failed to restore terminal: {}", e);
    }
    result
}

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

async fn event_loop(
    terminal: &mut Term,
    engine: &mut Engine,
    redraw_interval: Duration,
) -> anyhow::Result<()> {
    let mut view = ViewState::default();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(redraw_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let containers = engine.containers();
        view.clamp(containers.len());
        terminal.draw(|frame| draw(frame, &view, &containers))?;

        tokio::select! {
            _ = ticker.tick() => {}
            update = engine.updates.recv() => match update {
                Some(event) => view.apply(event),
                None => {
                    warn!("Engine stopped publishing updates");
                    return Ok(());
                }
            },
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    if let Some(action) = input::action(key)
                        && view.handle(action, containers.len()) == Flow::Quit
                    {
                        info!("Quit requested");
                        return Ok(());
                    }
                }
                // Resize and everything else just redraws.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("read terminal events"),
                None => return Ok(()),
            },
        }
    }
}

fn draw(frame: &mut Frame, view: &ViewState, containers: &ActiveContainers) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 12),
            Constraint::Ratio(3, 12),
            Constraint::Ratio(3, 12),
            Constraint::Ratio(5, 12),
        ])
        .split(frame.area());
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(4, 12), Constraint::Ratio(8, 12)])
        .split(rows[3]);

    let records = containers.newest_first();
    let bars = view.chart.from_offset(view.offset);

    frame.render_widget(Paragraph::new(version::title()).style(TITLE_STYLE), top[0]);
    frame.render_widget(
        Paragraph::new(panels::info_bar(containers.len(), view.chart.totals())),
        top[1],
    );
    render_chart(frame, rows[1], "%CPU", bars, |row| row.cpu_percent);
    render_chart(frame, rows[2], "%MEM", bars, |row| row.mem_percent);
    render_lists(frame, bottom[0], bottom[1], view, &records);
}

fn render_chart(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[ChartRow],
    value: impl Fn(&ChartRow) -> f64,
) {
    let bars: Vec<Bar> = rows
        .iter()
        .map(|row| {
            let percent = value(row);
            Bar::default()
                .value(percent.max(0.0).round() as u64)
                .label(Line::from(row.label.clone()))
                .text_value(format!("{percent:02.0}"))
        })
        .collect();
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::styled(title.to_string(), TITLE_STYLE)),
        )
        .data(BarGroup::default().bars(&bars))
        .max(100)
        .bar_width(3)
        .bar_gap(1);
    frame.render_widget(chart, area);
}

fn render_lists(
    frame: &mut Frame,
    names_area: Rect,
    info_area: Rect,
    view: &ViewState,
    records: &[Arc<ContainerRecord>],
) {
    let names = panels::name_rows(records, view.offset, view.inspect);
    let info = panels::info_rows(records, view.offset, view.info_kind, view.inspect);

    let list = |items: Vec<String>, title: &str| {
        List::new(items).style(LIST_STYLE).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::styled(title.to_string(), TITLE_STYLE)),
        )
    };
    frame.render_widget(list(names, "Name"), names_area);
    frame.render_widget(list(info, view.info_kind.header()), info_area);
}
