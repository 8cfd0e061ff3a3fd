mod agent;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use helio_core::{parse_command, AgentEvent, AgentSnapshot, ControlCommand};
use tokio::{
    process::Child,
    sync::{mpsc, Mutex as AsyncMutex, RwLock},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub agent_cmd: Vec<String>,
    pub debug: bool,
}

#[derive(Parser, Debug)]
#[command(name = "helio-hub")]
struct Args {
    #[arg(long, default_value = "")]
    addr: String,
    /// Command line that launches the voice agent, split on whitespace.
    #[arg(long, default_value = "")]
    agent_cmd: String,
    #[arg(long, default_value_t = false)]
    debug: bool,
}

pub struct HubState {
    pub config: Config,
    conn_counter: AtomicU64,
    clients: RwLock<HashMap<u64, mpsc::Sender<Message>>>,
    pub snapshot: RwLock<AgentSnapshot>,
    agent: AsyncMutex<Option<Child>>,
}

impl HubState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            conn_counter: AtomicU64::new(0),
            clients: RwLock::new(HashMap::new()),
            snapshot: RwLock::new(AgentSnapshot::default()),
            agent: AsyncMutex::new(None),
        }
    }

    fn next_conn_id(&self) -> u64 {
        self.conn_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn register_client(&self, conn_id: u64, sender: mpsc::Sender<Message>) {
        self.clients.write().await.insert(conn_id, sender);
        info!(event = "client_connected", conn_id);
    }

    async fn remove_client(&self, conn_id: u64, reason: &str) {
        if self.clients.write().await.remove(&conn_id).is_some() {
            info!(event = "client_disconnected", conn_id, reason);
        }
    }

    /// Fold the event into the shared snapshot, then fan it out. Dead
    /// clients are pruned on send failure.
    pub async fn apply_and_broadcast(&self, event: AgentEvent) {
        self.snapshot.write().await.apply(&event);
        self.broadcast(&event).await;
    }

    async fn broadcast(&self, event: &AgentEvent) {
        let text = match serde_json::to_string(event) {
            Ok(value) => value,
            Err(err) => {
                error!(event = "encode_error", error = %err);
                return;
            }
        };
        let targets: Vec<(u64, mpsc::Sender<Message>)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();
        for (conn_id, sender) in targets {
            if sender.send(Message::Text(text.clone())).await.is_err() {
                warn!(event = "send_error", conn_id);
                self.remove_client(conn_id, "send_error").await;
            }
        }
    }

    /// Launch the agent subprocess; a second start while one is alive is
    /// a no-op.
    pub async fn start_agent(self: &Arc<Self>) {
        let mut slot = self.agent.lock().await;
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                debug!(event = "agent_already_running");
                return;
            }
        }
        let mut child = match agent::spawn_agent(&self.config.agent_cmd) {
            Ok(child) => child,
            Err(err) => {
                error!(event = "agent_spawn_error", error = %err);
                self.apply_and_broadcast(AgentEvent::Status { running: false })
                    .await;
                return;
            }
        };
        info!(event = "agent_started", cmd = ?self.config.agent_cmd);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        *slot = Some(child);
        drop(slot);
        // Status goes out before the readers start so no scraped event can
        // overtake it.
        self.apply_and_broadcast(AgentEvent::Status { running: true })
            .await;
        if let Some(stdout) = stdout {
            tokio::spawn(agent::read_agent_output(self.clone(), stdout, true));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(agent::read_agent_output(self.clone(), stderr, false));
        }
    }

    /// Kill the agent subprocess if one is alive and clear every signal
    /// derived from its audio. Stop while stopped is a no-op.
    pub async fn stop_agent(self: &Arc<Self>) {
        let child = self.agent.lock().await.take();
        if let Some(mut child) = child {
            if let Err(err) = child.kill().await {
                warn!(event = "agent_kill_error", error = %err);
            }
            info!(event = "agent_stopped");
        }
        let state_event = {
            let mut snapshot = self.snapshot.write().await;
            snapshot.clear_for_stop();
            snapshot.state_event()
        };
        self.broadcast(&state_event).await;
    }

    /// The primary output pipe hit EOF: the process is gone, whoever
    /// killed it.
    pub async fn mark_agent_stopped(&self) {
        self.agent.lock().await.take();
        self.apply_and_broadcast(AgentEvent::Status { running: false })
            .await;
    }
}

fn router(state: Arc<HubState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/api/status", get(api_status))
        .route("/api/start", post(api_start))
        .route("/api/stop", post(api_stop))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(hub): State<Arc<HubState>>,
) -> impl IntoResponse {
    if !addr.ip().is_loopback() {
        return axum::http::StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| async move {
        handle_socket(hub, socket).await;
    })
}

async fn handle_socket(hub: Arc<HubState>, socket: WebSocket) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(CLIENT_QUEUE_CAPACITY);
    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // A fresh dashboard paints from this before any live event arrives.
    let snapshot_event = hub.snapshot.read().await.state_event();
    let snapshot_text = match serde_json::to_string(&snapshot_event) {
        Ok(value) => value,
        Err(err) => {
            error!(event = "encode_error", error = %err);
            write_task.abort();
            return;
        }
    };
    if tx.send(Message::Text(snapshot_text)).await.is_err() {
        write_task.abort();
        return;
    }

    let conn_id = hub.next_conn_id();
    hub.register_client(conn_id, tx).await;

    while let Some(result) = ws_receiver.next().await {
        let msg = match result {
            Ok(value) => value,
            Err(err) => {
                warn!(event = "read_error", conn_id, error = %err);
                break;
            }
        };
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        match parse_command(&text) {
            Ok(Some(ControlCommand::Start)) => hub.start_agent().await,
            Ok(Some(ControlCommand::Stop)) => hub.stop_agent().await,
            Ok(None) => debug!(event = "unknown_command_type", conn_id),
            Err(err) => warn!(event = "malformed_command", conn_id, error = %err),
        }
    }

    hub.remove_client(conn_id, "closed").await;
    write_task.abort();
}

async fn api_status(State(hub): State<Arc<HubState>>) -> Json<AgentSnapshot> {
    Json(*hub.snapshot.read().await)
}

async fn api_start(State(hub): State<Arc<HubState>>) -> Json<serde_json::Value> {
    hub.start_agent().await;
    Json(serde_json::json!({ "status": "started" }))
}

async fn api_stop(State(hub): State<Arc<HubState>>) -> Json<serde_json::Value> {
    hub.stop_agent().await;
    Json(serde_json::json!({ "status": "stopped" }))
}

#[tokio::main]
async fn main() {
    let config = load_config();
    init_logging(&config);

    let addr: SocketAddr = match config.addr.parse() {
        Ok(value) => value,
        Err(err) => {
            error!(event = "invalid_addr", addr = %config.addr, error = %err);
            return;
        }
    };
    if !addr.ip().is_loopback() {
        error!(event = "invalid_addr", addr = %config.addr);
        return;
    }

    let hub = Arc::new(HubState::new(config.clone()));
    let app = router(hub.clone());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(value) => value,
        Err(err) => {
            error!(event = "hub_error", error = %err);
            return;
        }
    };

    info!(event = "hub_start", addr = %config.addr);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    {
        error!(event = "hub_error", error = %err);
    }

    // Never leave the agent orphaned behind a dead hub.
    hub.stop_agent().await;
    info!(event = "hub_stopped");
}

fn load_config() -> Config {
    let args = Args::parse();
    let addr = resolve_with_env(&args.addr, "HELIO_HUB_ADDR", "127.0.0.1:8080");
    let agent_cmd = resolve_with_env(&args.agent_cmd, "HELIO_AGENT_CMD", "python3 src/main.py console")
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let debug = args.debug || env_true("HELIO_HUB_DEBUG");
    Config {
        addr,
        agent_cmd,
        debug,
    }
}

fn resolve_with_env(arg: &str, var: &str, default: &str) -> String {
    if !arg.trim().is_empty() {
        return arg.to_string();
    }
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    default.to_string()
}

fn env_true(var: &str) -> bool {
    matches!(
        std::env::var(var).ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn init_logging(config: &Config) {
    let level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
