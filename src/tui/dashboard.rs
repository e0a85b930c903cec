//! Terminal dashboard showing scrape and check progress

use crate::error::Result;
use crate::progress::{Lane, ProgressBoard};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::future::Future;
use std::io;
use tokio::time::{interval, Duration};

/// Redraw interval
const TICK: Duration = Duration::from_millis(100);

/// Drive `work` while drawing `board` in the terminal
///
/// Returns `None` if the user quit with `q`, `Esc` or `Ctrl-C` before `work`
/// finished; `work` is dropped in that case.
pub async fn run_with_dashboard<F: Future>(board: &ProgressBoard, work: F) -> Result<Option<F::Output>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = drive(&mut terminal, board, work).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn drive<B: Backend, F: Future>(
    terminal: &mut Terminal<B>,
    board: &ProgressBoard,
    work: F,
) -> Result<Option<F::Output>> {
    tokio::pin!(work);
    let mut ticker = interval(TICK);

    loop {
        tokio::select! {
            output = &mut work => return Ok(Some(output)),
            _ = ticker.tick() => {
                let lanes = board.lanes();
                terminal.draw(|f| ui(f, &lanes))?;
                if quit_requested()? {
                    return Ok(None);
                }
            }
        }
    }
}

fn quit_requested() -> io::Result<bool> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn ui(f: &mut Frame, lanes: &[Lane]) {
    let mut constraints = vec![Constraint::Length(3)];
    constraints.extend(lanes.iter().map(|_| Constraint::Length(3)));
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(3));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(f.size());

    // Title
    let title = Paragraph::new("Proxy Scraper Checker")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    for (lane, area) in lanes.iter().zip(chunks.iter().skip(1)) {
        let color = if lane.is_finished() {
            Color::Green
        } else {
            Color::Yellow
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(lane.label.clone()))
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .percent(lane.percent())
            .label(format!("{}/{} ({}%)", lane.completed, lane.total, lane.percent()));
        f.render_widget(gauge, *area);
    }

    let status = Paragraph::new("Press 'q' to quit")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[chunks.len() - 1]);
}
