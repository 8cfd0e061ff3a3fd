use std::process::Stdio;
use std::sync::Arc;

use helio_core::AgentEvent;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::HubState;

/// Turn one agent log line into the protocol events it implies. The agent
/// prints human-readable markers; `last_score` is the cached verification
/// score reused by the voice-lock lines, which carry no score of their own.
pub fn scrape_line(line: &str, last_score: f64) -> Vec<AgentEvent> {
    let line = line.trim();
    let mut events = Vec::new();

    if line.contains("[Audio]") && line.contains(" dBFS") {
        if let Some(level) = parse_db_level(line) {
            events.push(AgentEvent::Audio { level });
        }
    }
    if line.contains("Speaker VERIFIED") || line.contains('\u{1F3AF}') {
        if let Some(score) = parse_score(line) {
            events.push(AgentEvent::Speaker {
                verified: true,
                score,
            });
        }
    }
    if line.contains("Unknown speaker") || line.contains('\u{1F464}') {
        if let Some(score) = parse_score(line) {
            events.push(AgentEvent::Speaker {
                verified: false,
                score,
            });
        }
    }
    if line.contains("START_OF_SPEECH") || line.contains('\u{1F3A4}') {
        events.push(AgentEvent::Vad { speaking: true });
    }
    if line.contains("END_OF_SPEECH") || line.contains('\u{1F507}') {
        events.push(AgentEvent::Vad { speaking: false });
    }
    if line.contains("VOICE LOCK ACTIVE") || line.contains('\u{1F512}') {
        events.push(AgentEvent::Speaker {
            verified: false,
            score: last_score,
        });
    }
    if line.contains("VOICE LOCK: Speaker verified") || line.contains('\u{1F513}') {
        events.push(AgentEvent::Speaker {
            verified: true,
            score: last_score,
        });
    }
    events
}

/// Level lines look like `[Audio] capture [-42.5 dBFS]`.
fn parse_db_level(line: &str) -> Option<f64> {
    let end = line.find(" dBFS")?;
    let start = line.find("[-")?;
    if start + 1 >= end {
        return None;
    }
    line[start + 1..end].parse().ok()
}

/// Verification lines carry `score=0.87` somewhere in the text.
fn parse_score(line: &str) -> Option<f64> {
    let idx = line.find("score=")?;
    let digits: String = line[idx + 6..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// Spawn the voice-agent subprocess with both output pipes captured; the
/// agent's logger writes markers to either stream.
pub fn spawn_agent(argv: &[String]) -> std::io::Result<Child> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty agent command")
    })?;
    Command::new(program)
        .args(args)
        .env("HELIO_DASHBOARD_MODE", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Follow one output pipe, folding each scraped event into the shared
/// snapshot and broadcasting it. `primary` marks the pipe whose EOF means
/// the agent is gone.
pub async fn read_agent_output<R>(state: Arc<HubState>, pipe: R, primary: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let last_score = state.snapshot.read().await.speaker_score;
                for event in scrape_line(&line, last_score) {
                    state.apply_and_broadcast(event).await;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(event = "agent_read_error", error = %err);
                break;
            }
        }
    }
    if primary {
        info!(event = "agent_exited");
        state.mark_agent_stopped().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_lines_yield_level_events() {
        let events = scrape_line("2026-02-07 [Audio] capture [-42.5 dBFS]", 0.0);
        assert_eq!(events, vec![AgentEvent::Audio { level: -42.5 }]);
    }

    #[test]
    fn verification_lines_yield_speaker_events() {
        let events = scrape_line("INFO Speaker VERIFIED (score=0.87)", 0.0);
        assert_eq!(
            events,
            vec![AgentEvent::Speaker {
                verified: true,
                score: 0.87,
            }]
        );
        let events = scrape_line("INFO Unknown speaker rejected score=0.31 below threshold", 0.0);
        assert_eq!(
            events,
            vec![AgentEvent::Speaker {
                verified: false,
                score: 0.31,
            }]
        );
    }

    #[test]
    fn speech_markers_toggle_vad() {
        assert_eq!(
            scrape_line("vad: START_OF_SPEECH detected", 0.0),
            vec![AgentEvent::Vad { speaking: true }]
        );
        assert_eq!(
            scrape_line("vad: END_OF_SPEECH", 0.0),
            vec![AgentEvent::Vad { speaking: false }]
        );
    }

    #[test]
    fn voice_lock_lines_reuse_the_cached_score() {
        assert_eq!(
            scrape_line("VOICE LOCK ACTIVE: speaker not verified", 0.42),
            vec![AgentEvent::Speaker {
                verified: false,
                score: 0.42,
            }]
        );
        assert_eq!(
            scrape_line("VOICE LOCK: Speaker verified - proceeding", 0.93),
            vec![AgentEvent::Speaker {
                verified: true,
                score: 0.93,
            }]
        );
    }

    #[test]
    fn emoji_markers_work_without_the_text_form() {
        assert_eq!(
            scrape_line("\u{1F3A4} mic hot", 0.0),
            vec![AgentEvent::Vad { speaking: true }]
        );
        assert_eq!(
            scrape_line("\u{1F512} stranger", 0.5),
            vec![AgentEvent::Speaker {
                verified: false,
                score: 0.5,
            }]
        );
    }

    #[test]
    fn unrelated_lines_yield_nothing() {
        assert!(scrape_line("tool call: open_website url=https://example.com", 0.0).is_empty());
        assert!(scrape_line("", 0.0).is_empty());
        // A mangled level is dropped rather than guessed at.
        assert!(scrape_line("[Audio] capture [-x.y dBFS]", 0.0).is_empty());
        assert!(scrape_line("Speaker VERIFIED but the score went missing", 0.0).is_empty());
    }

    #[test]
    fn score_parse_stops_at_the_first_non_numeric_char() {
        let events = scrape_line("Speaker VERIFIED score=0.87, margin=0.2", 0.0);
        assert_eq!(
            events,
            vec![AgentEvent::Speaker {
                verified: true,
                score: 0.87,
            }]
        );
    }
}
