use serde::{Deserialize, Serialize};

use crate::protocol::AgentEvent;

/// Silence floor of the dBFS-like scale the agent reports.
pub const AUDIO_FLOOR_DB: f64 = -80.0;

/// Latest known agent signals. Both the hub (as its broadcast cache) and
/// the dashboard (as the render source) fold events into one of these.
/// All fields are last-write-wins in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub running: bool,
    pub speaker_verified: bool,
    pub speaker_score: f64,
    pub audio_level: f64,
    pub vad_speaking: bool,
}

impl Default for AgentSnapshot {
    fn default() -> Self {
        Self {
            running: false,
            speaker_verified: false,
            speaker_score: 0.0,
            audio_level: AUDIO_FLOOR_DB,
            vad_speaking: false,
        }
    }
}

impl AgentSnapshot {
    pub fn apply(&mut self, event: &AgentEvent) {
        match *event {
            AgentEvent::State {
                running,
                speaker_verified,
                speaker_score,
                vad_speaking,
            } => {
                self.running = running;
                self.speaker_verified = speaker_verified;
                self.speaker_score = speaker_score;
                self.vad_speaking = vad_speaking;
            }
            AgentEvent::Status { running } => self.running = running,
            AgentEvent::Speaker { verified, score } => {
                self.speaker_verified = verified;
                self.speaker_score = score;
            }
            AgentEvent::Vad { speaking } => self.vad_speaking = speaking,
            AgentEvent::Audio { level } => self.audio_level = level,
        }
    }

    /// Full-snapshot event, sent to every freshly connected dashboard.
    pub fn state_event(&self) -> AgentEvent {
        AgentEvent::State {
            running: self.running,
            speaker_verified: self.speaker_verified,
            speaker_score: self.speaker_score,
            vad_speaking: self.vad_speaking,
        }
    }

    /// Stopping the agent invalidates everything derived from its audio.
    pub fn clear_for_stop(&mut self) {
        self.running = false;
        self.speaker_verified = false;
        self.speaker_score = 0.0;
        self.vad_speaking = false;
    }
}

/// Orbital speed factor derived from the audio level: silence idles at
/// 0.5x, a hot signal saturates at 3x.
pub fn speed_multiplier(level: f64) -> f64 {
    ((level + 80.0) / 20.0).clamp(0.5, 3.0)
}

/// Target sun glow radius for the same level, floored at the resting
/// radius of 15 canvas units.
pub fn glow_target(level: f64) -> f64 {
    15.0 + ((level + 60.0) / 3.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_multiplier_clamps_both_ends() {
        assert_eq!(speed_multiplier(-80.0), 0.5);
        assert_eq!(speed_multiplier(-60.0), 1.0);
        assert_eq!(speed_multiplier(0.0), 3.0);
        assert_eq!(speed_multiplier(-120.0), 0.5);
        assert_eq!(speed_multiplier(20.0), 3.0);
    }

    #[test]
    fn glow_target_floors_at_resting_radius() {
        assert_eq!(glow_target(-60.0), 15.0);
        assert_eq!(glow_target(0.0), 35.0);
        assert_eq!(glow_target(-90.0), 15.0);
    }

    #[test]
    fn state_event_overwrites_every_signal_field() {
        let mut snapshot = AgentSnapshot::default();
        snapshot.apply(&AgentEvent::State {
            running: true,
            speaker_verified: true,
            speaker_score: 0.87,
            vad_speaking: true,
        });
        assert!(snapshot.running);
        assert!(snapshot.speaker_verified);
        assert_eq!(snapshot.speaker_score, 0.87);
        assert!(snapshot.vad_speaking);
        // Audio level is owned by audio events, not the snapshot message.
        assert_eq!(snapshot.audio_level, AUDIO_FLOOR_DB);
    }

    #[test]
    fn partial_events_touch_only_their_fields() {
        let mut snapshot = AgentSnapshot {
            running: true,
            speaker_verified: true,
            speaker_score: 0.9,
            audio_level: -30.0,
            vad_speaking: true,
        };
        snapshot.apply(&AgentEvent::Status { running: false });
        assert!(!snapshot.running);
        assert!(snapshot.speaker_verified);

        snapshot.apply(&AgentEvent::Speaker {
            verified: false,
            score: 0.2,
        });
        assert!(!snapshot.speaker_verified);
        assert_eq!(snapshot.speaker_score, 0.2);
        assert!(snapshot.vad_speaking);

        snapshot.apply(&AgentEvent::Vad { speaking: false });
        assert!(!snapshot.vad_speaking);

        snapshot.apply(&AgentEvent::Audio { level: -12.5 });
        assert_eq!(snapshot.audio_level, -12.5);
    }

    #[test]
    fn applying_the_same_state_twice_is_idempotent() {
        let event = AgentEvent::State {
            running: true,
            speaker_verified: false,
            speaker_score: 0.31,
            vad_speaking: false,
        };
        let mut once = AgentSnapshot::default();
        once.apply(&event);
        let mut twice = once;
        twice.apply(&event);
        assert_eq!(once, twice);
    }

    #[test]
    fn snapshot_round_trips_through_its_state_event() {
        let snapshot = AgentSnapshot {
            running: true,
            speaker_verified: true,
            speaker_score: 0.77,
            audio_level: -25.0,
            vad_speaking: false,
        };
        let mut folded = AgentSnapshot {
            audio_level: -25.0,
            ..AgentSnapshot::default()
        };
        folded.apply(&snapshot.state_event());
        assert_eq!(folded, snapshot);
    }

    #[test]
    fn clear_for_stop_keeps_the_audio_floor_semantics() {
        let mut snapshot = AgentSnapshot {
            running: true,
            speaker_verified: true,
            speaker_score: 0.9,
            audio_level: -20.0,
            vad_speaking: true,
        };
        snapshot.clear_for_stop();
        assert!(!snapshot.running);
        assert!(!snapshot.speaker_verified);
        assert_eq!(snapshot.speaker_score, 0.0);
        assert!(!snapshot.vad_speaking);
    }
}
