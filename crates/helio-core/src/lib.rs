pub mod protocol;
pub mod snapshot;

pub use protocol::{parse_command, parse_event, AgentEvent, ControlCommand, ProtocolError};
pub use snapshot::{glow_target, speed_multiplier, AgentSnapshot};
