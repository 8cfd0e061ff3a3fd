use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use helio_core::{glow_target, speed_multiplier, AgentEvent, AgentSnapshot, ControlCommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::warn;
use url::Url;

use crate::scene::{FrameSignals, Scene};

pub const COMMAND_QUEUE_CAPACITY: usize = 64;
pub const SOCKET_EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub hub_addr: String,
    pub star_seed: u64,
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        let hub_addr = std::env::var("HELIO_HUB_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let star_seed = std::env::var("HELIO_STAR_SEED")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or_else(|| u64::from(std::process::id()));
        Self {
            hub_addr,
            star_seed,
        }
    }

    pub fn socket_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("ws://{}/ws", self.hub_addr))
    }
}

/// What the socket task reports back to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connected,
    Disconnected,
    Event(AgentEvent),
}

/// The one session context: every piece of mutable dashboard state hangs
/// off this, and only the select loop touches it.
pub struct App {
    pub config: DashboardConfig,
    pub snapshot: AgentSnapshot,
    pub connected: bool,
    pub speed_multiplier: f64,
    pub glow_target: f64,
    pub scene: Scene,
    pub should_quit: bool,
    pub commands_dropped: u64,
    cmd_tx: mpsc::Sender<ControlCommand>,
    rng: StdRng,
}

impl App {
    pub fn new(config: DashboardConfig, cmd_tx: mpsc::Sender<ControlCommand>) -> Self {
        let rng = StdRng::seed_from_u64(config.star_seed);
        Self {
            config,
            snapshot: AgentSnapshot::default(),
            connected: false,
            speed_multiplier: 1.0,
            glow_target: 15.0,
            scene: Scene::new(),
            should_quit: false,
            commands_dropped: 0,
            cmd_tx,
            rng,
        }
    }

    /// Fold one socket event into the session state. Events arrive in
    /// connection order; every signal field is last-write-wins.
    pub fn apply_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => self.connected = true,
            SocketEvent::Disconnected => self.connected = false,
            SocketEvent::Event(event) => {
                if let AgentEvent::Audio { level } = event {
                    self.speed_multiplier = speed_multiplier(level);
                    self.glow_target = glow_target(level);
                }
                self.snapshot.apply(&event);
            }
        }
    }

    /// Queue a control command for the socket task. Dropped with a log
    /// when the connection is down; the user already sees the red dot.
    pub fn send_command(&mut self, command: ControlCommand) -> bool {
        if !self.connected {
            self.commands_dropped += 1;
            warn!(event = "command_dropped", command = ?command, reason = "disconnected");
            return false;
        }
        if self.cmd_tx.try_send(command).is_err() {
            self.commands_dropped += 1;
            warn!(event = "command_dropped", command = ?command, reason = "queue_full");
            return false;
        }
        true
    }

    pub fn advance_frame(&mut self) {
        let signals = FrameSignals {
            speaking: self.snapshot.vad_speaking,
            running: self.snapshot.running,
            speed_multiplier: self.speed_multiplier,
            glow_target: self.glow_target,
        };
        self.scene.advance(&signals, &mut self.rng);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('s') => {
                self.send_command(ControlCommand::Start);
            }
            KeyCode::Char('x') => {
                self.send_command(ControlCommand::Stop);
            }
            _ => {}
        }
    }
}
