//! Interactive session driver.
//!
//! Runs both WebSocket channels, pumps their events through the
//! [`Coordinator`], and routes stdin lines: plain lines go to the shell,
//! `/`-prefixed lines are client commands:
//!
//! - `/ai <question>`  ask the assistant
//! - `/run <n>`        execute pending suggestion n (1-based)
//! - `/resize C R`     propagate new viewport dimensions
//! - `/clear`          drop the conversation and pending suggestions
//! - `/quit`           close both sessions and exit

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use nexus_session::{
    AssistantSession, ChatSurface, ConfirmationPolicy, ConfirmationPrompt, ConnectParams,
    Coordinator, DisplaySink, Flow, KeepaliveTimer, Readiness, ReconnectPolicy, TerminalSession,
    WsChannel,
};
use nexus_types::{ChatEntry, ChatRole, CommandSuggestion, NexusConfig};

pub fn run(
    host: &str,
    port: u16,
    username: &str,
    credential_env: &str,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = super::resolve_config(config_path)?;

    let mut params = ConnectParams::new(host, port, username);
    match std::env::var(credential_env) {
        Ok(credential) => params = params.with_credential(credential),
        Err(_) => debug!(var = credential_env, "credential variable not set"),
    }
    params.validate()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(drive(config, params))
}

async fn drive(config: NexusConfig, params: ConnectParams) -> anyhow::Result<()> {
    let policy = || ReconnectPolicy::from_config(&config.reconnect);
    let mut coordinator = Coordinator::new(
        TerminalSession::new(policy()),
        AssistantSession::new(policy()),
    );

    let (ready, waiter) = Readiness::new();
    let mut sink = StdoutSink { ready };
    let mut surface = ConsoleSurface::default();
    let mut confirmer = StdinConfirmer;

    let (term_channel, mut term_rx) = WsChannel::open(&config.terminal_url);
    coordinator
        .terminal_mut()
        .connect(params, Arc::new(term_channel))?;

    let (ai_channel, mut ai_rx) = WsChannel::open(&config.assistant_url);
    coordinator.assistant_mut().connect(Arc::new(ai_channel))?;
    let mut ai_active = true;

    // Stdin pump; held back until the shell is usable so early keystrokes
    // are not silently dropped.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let mut stdin_gate = waiter;
    tokio::spawn(async move {
        stdin_gate.ready().await;
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut keepalive = KeepaliveTimer::new(config.keepalive_interval());
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));

    loop {
        tokio::select! {
            event = term_rx.recv() => {
                let Some(event) = event else { break };
                keepalive.record_activity();
                match coordinator.handle_terminal_event(event, &mut sink) {
                    Flow::Continue => {}
                    Flow::Reconnect { delay } => {
                        eprintln!("[nexus] connection lost, retrying in {}ms", delay.as_millis());
                        tokio::time::sleep(delay).await;
                        let (channel, rx) = WsChannel::open(&config.terminal_url);
                        coordinator.terminal_mut().resume(Arc::new(channel))?;
                        term_rx = rx;
                    }
                    Flow::Stopped => break,
                }
            }
            event = ai_rx.recv(), if ai_active => {
                let Some(event) = event else {
                    ai_active = false;
                    continue;
                };
                keepalive.record_activity();
                match coordinator.handle_assistant_event(event, &mut surface) {
                    Flow::Continue => {}
                    Flow::Reconnect { delay } => {
                        tokio::time::sleep(delay).await;
                        let (channel, rx) = WsChannel::open(&config.assistant_url);
                        coordinator.assistant_mut().resume(Arc::new(channel))?;
                        ai_rx = rx;
                    }
                    Flow::Stopped => {
                        eprintln!("[nexus] assistant unavailable");
                        ai_active = false;
                    }
                }
            }
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                if !handle_line(&line, &mut coordinator, &mut surface, &mut confirmer) {
                    break;
                }
            }
            _ = tick.tick() => {
                if keepalive.poll() {
                    coordinator.terminal().send_ping();
                    coordinator.assistant().send_ping();
                }
            }
        }
    }

    coordinator.assistant_mut().disconnect();
    coordinator.terminal_mut().disconnect();
    Ok(())
}

/// Route one stdin line. Returns `false` when the session should end.
fn handle_line(
    line: &str,
    coordinator: &mut Coordinator,
    surface: &mut ConsoleSurface,
    confirmer: &mut StdinConfirmer,
) -> bool {
    match line.trim_end() {
        "/quit" => return false,
        "/clear" => {
            coordinator.assistant_mut().clear();
            surface.reset();
            println!("[nexus] conversation cleared");
        }
        trimmed if trimmed.starts_with("/ai") => {
            let question = trimmed.trim_start_matches("/ai").trim();
            if let Err(err) = coordinator.assistant_mut().send_message(question, surface) {
                eprintln!("[nexus] {err}");
            }
        }
        trimmed if trimmed.starts_with("/run") => {
            let index = trimmed.trim_start_matches("/run").trim().parse::<usize>();
            let suggestion = index
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|n| coordinator.assistant().pending_commands().get(n).cloned());
            match suggestion {
                Some(suggestion) => run_suggestion(coordinator, &suggestion, confirmer),
                None => eprintln!("[nexus] no such suggestion; usage: /run <n>"),
            }
        }
        trimmed if trimmed.starts_with("/resize") => {
            let mut dims = trimmed.trim_start_matches("/resize").split_whitespace();
            match (
                dims.next().and_then(|v| v.parse::<u16>().ok()),
                dims.next().and_then(|v| v.parse::<u16>().ok()),
            ) {
                (Some(cols), Some(rows)) => {
                    if !coordinator.terminal().send_resize(cols, rows) {
                        eprintln!("[nexus] not connected");
                    }
                }
                _ => eprintln!("[nexus] usage: /resize <cols> <rows>"),
            }
        }
        _ => {
            if !coordinator.terminal().send_input(&format!("{line}\n")) {
                eprintln!("[nexus] not connected");
            }
        }
    }
    true
}

fn run_suggestion(
    coordinator: &mut Coordinator,
    suggestion: &CommandSuggestion,
    confirmer: &mut StdinConfirmer,
) {
    match coordinator.execute_suggestion(suggestion, confirmer) {
        Ok(true) => {}
        Ok(false) => println!("[nexus] declined"),
        Err(err) => eprintln!("[nexus] {err}"),
    }
}

// ---------------------------------------------------------------------------
// Console adapters
// ---------------------------------------------------------------------------

/// Writes shell output straight to stdout and opens the stdin gate once a
/// session is live.
struct StdoutSink {
    ready: Readiness,
}

impl DisplaySink for StdoutSink {
    fn write(&mut self, data: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(data.as_bytes());
        let _ = out.flush();
    }

    fn clear(&mut self) {
        // Clear screen and home the cursor before a fresh shell starts.
        let mut out = io::stdout().lock();
        let _ = out.write_all(b"\x1b[2J\x1b[H");
        let _ = out.flush();
    }

    fn session_live(&mut self, session_id: &str, resumed: bool) {
        if resumed {
            println!("\r\n[nexus] session {session_id} resumed");
        } else {
            println!("[nexus] session {session_id} established");
        }
        self.ready.signal();
    }

    fn session_error(&mut self, message: &str) {
        eprintln!("[nexus] terminal error: {message}");
    }
}

/// Prints the assistant reply as it streams and numbers suggestions for
/// `/run`.
#[derive(Default)]
struct ConsoleSurface {
    /// Bytes of the streaming buffer already printed.
    printed: usize,
    suggestions_seen: usize,
}

impl ConsoleSurface {
    fn reset(&mut self) {
        self.printed = 0;
        self.suggestions_seen = 0;
    }
}

impl ChatSurface for ConsoleSurface {
    fn streaming_update(&mut self, partial: &str) {
        // `printed` always sits on a previous buffer length, so the slice is
        // on a char boundary.
        let Some(delta) = partial.get(self.printed..) else {
            return;
        };
        let mut out = io::stdout().lock();
        if self.printed == 0 {
            let _ = out.write_all(b"[ai] ");
        }
        let _ = out.write_all(delta.as_bytes());
        let _ = out.flush();
        self.printed = partial.len();
    }

    fn entry_added(&mut self, entry: &ChatEntry) {
        if entry.role == ChatRole::Assistant {
            // The streamed text is already on screen; only the case where a
            // reply arrived with no preceding fragments needs printing.
            if self.printed == 0 {
                print!("[ai] {}", entry.content);
            }
            println!();
            self.printed = 0;
        }
    }

    fn command_suggested(&mut self, suggestion: &CommandSuggestion) {
        self.suggestions_seen += 1;
        println!(
            "\n[ai] suggested command {}: `{}` ({}); /run {} to execute",
            self.suggestions_seen, suggestion.command, suggestion.tier, self.suggestions_seen
        );
    }

    fn on_error(&mut self, message: &str) {
        self.printed = 0;
        eprintln!("[nexus] assistant error: {message}");
    }
}

/// Confirmation prompts answered on the controlling terminal.
struct StdinConfirmer;

impl ConfirmationPolicy for StdinConfirmer {
    fn confirm(&mut self, prompt: &ConfirmationPrompt) -> bool {
        print!("{} [y/N] ", prompt.message);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            warn!("failed to read confirmation answer");
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
