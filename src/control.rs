use thiserror::Error;

use crate::ir::output::PulseSink;
use crate::ir::panasonic::{Fan, Mode, Swing};
use crate::state::{DeviceState, StateError, StatePublisher};

pub const MODE_TOPIC: &str = "mode/set";
pub const TEMPERATURE_TOPIC: &str = "temperature/set";
pub const FAN_TOPIC: &str = "fan/set";
pub const SWING_TOPIC: &str = "swing/set";

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Unknown control topic {0}")]
    UnknownTopic(String),
    #[error("Unknown mode {0:?}")]
    UnknownMode(String),
    #[error("Unknown fan speed {0:?}")]
    UnknownFan(String),
    #[error("Unknown swing position {0:?}")]
    UnknownSwing(String),
    #[error("Invalid temperature {0:?}")]
    InvalidTemperature(String),
    #[error(transparent)]
    State(#[from] StateError),
}

pub type Result<T> = std::result::Result<T, ControlError>;

/// One inbound control message, mapped onto a device state edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Off,
    Mode(Mode),
    Temperature(i32),
    Fan(Fan),
    Swing(Swing),
}

impl ControlCommand {
    /// Topics are matched on their last two segments, payloads are trimmed and
    /// lower-cased before matching.
    pub fn parse(topic: &str, payload: &str) -> Result<ControlCommand> {
        let value = payload.trim().to_lowercase();
        let suffix = topic_suffix(topic);

        if suffix == MODE_TOPIC {
            if value == "off" {
                return Ok(ControlCommand::Off);
            }
            value
                .parse()
                .map(ControlCommand::Mode)
                .map_err(|_| ControlError::UnknownMode(value))
        } else if suffix == TEMPERATURE_TOPIC {
            value
                .parse()
                .map(ControlCommand::Temperature)
                .map_err(|_| ControlError::InvalidTemperature(value))
        } else if suffix == FAN_TOPIC {
            value
                .parse()
                .map(ControlCommand::Fan)
                .map_err(|_| ControlError::UnknownFan(value))
        } else if suffix == SWING_TOPIC {
            value
                .parse()
                .map(ControlCommand::Swing)
                .map_err(|_| ControlError::UnknownSwing(value))
        } else {
            Err(ControlError::UnknownTopic(topic.to_string()))
        }
    }

    pub fn apply<S: PulseSink, P: StatePublisher>(self, device: &DeviceState<S, P>) -> Result<()> {
        match self {
            ControlCommand::Off => device.set_mode(false, Mode::Auto),
            ControlCommand::Mode(mode) => device.set_mode(true, mode),
            ControlCommand::Temperature(temperature) => device.set_temperature(temperature),
            ControlCommand::Fan(fan) => device.set_fan(fan),
            ControlCommand::Swing(swing) => device.set_swing(swing),
        }?;
        Ok(())
    }
}

fn topic_suffix(topic: &str) -> &str {
    let topic = topic.trim_end_matches('/');
    match topic.rmatch_indices('/').nth(1) {
        Some((index, _)) => &topic[index + 1..],
        None => topic,
    }
}

pub fn state_topic(prefix: &str, device_id: &str) -> String {
    format!("{}/{}", prefix, device_id)
}

/// Every topic the bridge accepts control messages on.
pub fn control_topics(prefix: &str, device_id: &str) -> Vec<String> {
    [MODE_TOPIC, TEMPERATURE_TOPIC, FAN_TOPIC, SWING_TOPIC]
        .iter()
        .map(|suffix| format!("{}/{}", state_topic(prefix, device_id), suffix))
        .collect()
}

/// Parses and applies one control message.
pub fn handle<S: PulseSink, P: StatePublisher>(
    device: &DeviceState<S, P>,
    topic: &str,
    payload: &str,
) -> Result<()> {
    let command = ControlCommand::parse(topic, payload)?;
    info!("{} -> {:?}", topic, command);
    command.apply(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::output;
    use crate::ir::panasonic::{AcState, Command};
    use crate::ir::types::IrSequence;
    use crate::state::PublishError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Counted(Arc<AtomicUsize>);

    impl PulseSink for Counted {
        fn transmit(&mut self, _: &IrSequence) -> output::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Reports(Arc<Mutex<Vec<String>>>);

    impl StatePublisher for Reports {
        fn publish(&mut self, payload: &str) -> std::result::Result<(), PublishError> {
            self.0.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    fn parse(topic: &str, payload: &str) -> Result<ControlCommand> {
        ControlCommand::parse(topic, payload)
    }

    #[test]
    fn mode_payloads() {
        assert_eq!(
            parse("panasonic/bridge/mode/set", " Cool\n").unwrap(),
            ControlCommand::Mode(Mode::Cool)
        );
        assert_eq!(
            parse("panasonic/bridge/mode/set", "fan_only").unwrap(),
            ControlCommand::Mode(Mode::Fan)
        );
        assert_eq!(
            parse("panasonic/bridge/mode/set", "OFF").unwrap(),
            ControlCommand::Off
        );
        assert!(matches!(
            parse("panasonic/bridge/mode/set", "coolish"),
            Err(ControlError::UnknownMode(m)) if m == "coolish"
        ));
        // no prefix matching
        assert!(parse("panasonic/bridge/mode/set", "coo").is_err());
    }

    #[test]
    fn temperature_payloads() {
        assert_eq!(
            parse("panasonic/bridge/temperature/set", "22").unwrap(),
            ControlCommand::Temperature(22)
        );
        assert_eq!(
            parse("panasonic/bridge/temperature/set", "-4").unwrap(),
            ControlCommand::Temperature(-4)
        );
        assert!(matches!(
            parse("panasonic/bridge/temperature/set", "warm"),
            Err(ControlError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn fan_and_swing_payloads() {
        assert_eq!(
            parse("x/fan/set", "Max").unwrap(),
            ControlCommand::Fan(Fan::Max)
        );
        assert_eq!(
            parse("x/swing/set", "middle").unwrap(),
            ControlCommand::Swing(Swing::Middle)
        );
        assert!(matches!(
            parse("x/fan/set", "turbo"),
            Err(ControlError::UnknownFan(_))
        ));
        assert!(matches!(
            parse("x/swing/set", "up"),
            Err(ControlError::UnknownSwing(_))
        ));
    }

    #[test]
    fn unknown_topics() {
        assert!(matches!(
            parse("panasonic/bridge/power/set", "on"),
            Err(ControlError::UnknownTopic(_))
        ));
        assert!(matches!(
            parse("panasonic/bridge/modes/set", "cool"),
            Err(ControlError::UnknownTopic(_))
        ));
        assert!(matches!(
            parse("set", "cool"),
            Err(ControlError::UnknownTopic(_))
        ));
    }

    #[test]
    fn topic_layout() {
        assert_eq!(state_topic("panasonic", "bridge"), "panasonic/bridge");
        assert_eq!(
            control_topics("panasonic", "bridge"),
            vec![
                "panasonic/bridge/mode/set",
                "panasonic/bridge/temperature/set",
                "panasonic/bridge/fan/set",
                "panasonic/bridge/swing/set",
            ]
        );
        assert_eq!(topic_suffix("a/b/mode/set"), "mode/set");
        assert_eq!(topic_suffix("mode/set"), "mode/set");
    }

    #[test]
    fn rejected_messages_change_nothing() {
        let sent = Counted::default();
        let reports = Reports::default();
        let device = DeviceState::new(sent.clone(), reports.clone());
        assert!(handle(&device, "panasonic/bridge/mode/set", "coolish").is_err());
        assert!(handle(&device, "panasonic/bridge/temperature/set", "warm").is_err());
        assert!(handle(&device, "panasonic/bridge/fan/set", "turbo").is_err());
        assert!(handle(&device, "panasonic/bridge/power/set", "on").is_err());

        assert_eq!(device.current().unwrap(), Command::default());
        assert_eq!(device.state().unwrap(), AcState::default());
        assert_eq!(sent.0.load(Ordering::SeqCst), 0);
        assert!(reports.0.lock().unwrap().is_empty());

        handle(&device, "panasonic/bridge/mode/set", "cool").unwrap();
        assert_eq!(sent.0.load(Ordering::SeqCst), 1);
        assert_eq!(reports.0.lock().unwrap().len(), 1);
    }
}
