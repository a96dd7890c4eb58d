use serde::Serialize;

use crate::ir::panasonic::{AcState, Command};

/// Published form of a thermostat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateReport {
    pub mode: &'static str,
    pub temperature: String,
    pub fan: &'static str,
    pub swing: &'static str,
}

impl From<&AcState> for StateReport {
    fn from(state: &AcState) -> Self {
        StateReport {
            mode: if state.power { state.mode.into() } else { "off" },
            temperature: state.temperature.to_string(),
            fan: state.fan.into(),
            swing: state.swing.into(),
        }
    }
}

/// Full states become a JSON object, short commands are published by name.
pub fn serialize_state(command: &Command) -> serde_json::Result<String> {
    match command {
        Command::State(state) => serde_json::to_string(&StateReport::from(state)),
        Command::Short(short) => Ok(short.to_string()),
    }
}
