mod scene;
mod socket;
mod state;
mod theme;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use state::{App, DashboardConfig, SocketEvent, COMMAND_QUEUE_CAPACITY, SOCKET_EVENT_CAPACITY};

/// ~30 fps; the scene constants are tuned for this cadence.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[tokio::main]
async fn main() -> Result<()> {
    let config = DashboardConfig::from_env();
    init_logging();

    let url = config.socket_url()?;
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (event_tx, mut event_rx) = mpsc::channel(SOCKET_EVENT_CAPACITY);
    let socket_task = tokio::spawn(socket::socket_loop(url, event_tx, cmd_rx));

    let mut terminal = setup_terminal()?;
    let mut app = App::new(config, cmd_tx);
    let result = run_session(&mut terminal, &mut app, &mut event_rx).await;
    restore_terminal(&mut terminal)?;
    socket_task.abort();
    result
}

/// The whole session is this one loop: draw, then wait for whichever
/// comes first of the next frame tick, a socket event, or a key press.
/// Quitting here is what tears down rendering, the socket task, and the
/// terminal, in that order.
async fn run_session(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::Receiver<SocketEvent>,
) -> Result<()> {
    let mut keys = EventStream::new();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        tokio::select! {
            _ = frames.tick() => app.advance_frame(),
            Some(event) = event_rx.recv() => app.apply_socket_event(event),
            maybe_key = keys.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_key {
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        app.handle_key(key);
                    }
                }
            }
        }
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// The alternate screen owns stdout, so logs go to a sink unless the
/// operator redirects them explicitly.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = matches!(
        std::env::var("HELIO_LOG_STDOUT").ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    );
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}
