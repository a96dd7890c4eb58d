pub mod report;

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::ir::format::{IrFormat, Panasonic};
use crate::ir::output::{IrOutError, PulseSink};
use crate::ir::panasonic::types::MAX_TEMPERATURE;
use crate::ir::panasonic::{encode, AcState, Command, EncodeError, Fan, Mode, Swing};
use crate::ir::types::hex;
use report::serialize_state;

#[derive(Error, Debug, Clone)]
#[error("Could not publish state: {0}")]
pub struct PublishError(pub String);

/// Where state reports go after every change.
pub trait StatePublisher {
    fn publish(&mut self, payload: &str) -> std::result::Result<(), PublishError>;
}

impl<P: StatePublisher + ?Sized> StatePublisher for Box<P> {
    fn publish(&mut self, payload: &str) -> std::result::Result<(), PublishError> {
        (**self).publish(payload)
    }
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Could not acquire device state lock")]
    Lock,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Transmit(#[from] IrOutError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("Could not serialize state report")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StateError>;

struct Inner<S, P> {
    current: Command,
    /// Last full state, the base for field edits even after a short command.
    state: AcState,
    sink: S,
    publisher: P,
}

/// The single authoritative device state.
///
/// Every change holds the lock from reading the current state through encoding,
/// the blocking IR transmit and the publish, so concurrent edits each see the
/// other's result and their transmits and reports never interleave. A transmit
/// takes a few hundred milliseconds; call from `spawn_blocking` when on a runtime.
///
/// A failed encode leaves the state untouched. A failed transmit is reported
/// after the new state has been committed and published, so subscribers never
/// lag behind [`DeviceState::current`].
pub struct DeviceState<S: PulseSink, P: StatePublisher> {
    inner: Mutex<Inner<S, P>>,
}

impl<S: PulseSink, P: StatePublisher> DeviceState<S, P> {
    pub fn new(sink: S, publisher: P) -> Self {
        Self::build(AcState::default(), sink, publisher)
    }

    /// Starts from `state` instead of the default. Fails if the state could not
    /// be encoded, since every later field edit builds on it.
    pub fn with_state(state: AcState, sink: S, publisher: P) -> Result<Self> {
        let state = state.normalized();
        encode(&Command::State(state.clone()))?;
        Ok(Self::build(state, sink, publisher))
    }

    fn build(state: AcState, sink: S, publisher: P) -> Self {
        DeviceState {
            inner: Mutex::new(Inner {
                current: Command::State(state.clone()),
                state,
                sink,
                publisher,
            }),
        }
    }

    pub fn current(&self) -> Result<Command> {
        Ok(self.lock()?.current.clone())
    }

    /// Last full thermostat state, ignoring any short command sent since.
    pub fn state(&self) -> Result<AcState> {
        Ok(self.lock()?.state.clone())
    }

    /// Replaces the whole state, then transmits and publishes it.
    pub fn replace_state(&self, command: Command) -> Result<()> {
        self.lock()?.apply(command)
    }

    /// Replaces the state unless `command` is already current. Returns whether it did.
    ///
    /// Lets a receiver that hears the bridge's own transmissions ignore them.
    /// A second press of a toggle like `Quiet` or `Powerful` looks the same as
    /// an echo, so it is dropped too.
    pub fn replace_if_changed(&self, command: Command) -> Result<bool> {
        let mut inner = self.lock()?;
        let command = canonical(command);
        if inner.current == command {
            return Ok(false);
        }
        inner.apply(command)?;
        Ok(true)
    }

    /// Clamped to what the frame can carry.
    pub fn set_temperature(&self, temperature: i32) -> Result<()> {
        let temperature = temperature.clamp(0, MAX_TEMPERATURE as i32) as u8;
        self.edit(|state| state.temperature = temperature)
    }

    pub fn set_mode(&self, power: bool, mode: Mode) -> Result<()> {
        self.edit(|state| {
            state.power = power;
            state.mode = mode;
        })
    }

    pub fn set_power(&self, power: bool) -> Result<()> {
        self.edit(|state| state.power = power)
    }

    pub fn set_fan(&self, fan: Fan) -> Result<()> {
        self.edit(|state| state.fan = fan)
    }

    pub fn set_swing(&self, swing: Swing) -> Result<()> {
        self.edit(|state| state.swing = swing)
    }

    fn edit<F: FnOnce(&mut AcState)>(&self, change: F) -> Result<()> {
        let mut inner = self.lock()?;
        let mut next = inner.state.clone();
        change(&mut next);
        // field edits never carry a timer schedule
        next.no_time = true;
        inner.apply(Command::State(next))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S, P>>> {
        self.inner.lock().map_err(|_| StateError::Lock)
    }
}

impl<S: PulseSink, P: StatePublisher> Inner<S, P> {
    fn apply(&mut self, command: Command) -> Result<()> {
        let command = canonical(command);
        let frame = encode(&command)?;
        let payload = serialize_state(&command)?;

        if let Command::State(state) = &command {
            self.state = state.clone();
        }
        self.current = command;

        info!("XMT {}", hex(&frame));
        let transmitted = self.sink.transmit(&Panasonic::encode(&frame));
        if let Err(e) = &transmitted {
            error!("transmit failed, publishing anyway: {}", e);
        }
        debug!("publishing {}", payload);
        let published = self.publisher.publish(&payload);
        transmitted?;
        published?;
        Ok(())
    }
}

fn canonical(command: Command) -> Command {
    match command {
        Command::State(state) => Command::State(state.normalized()),
        short => short,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::output;
    use crate::ir::panasonic::{Field, ShortCommand};
    use crate::ir::types::IrSequence;

    #[derive(Default)]
    struct CountingSink {
        sent: usize,
        fail: bool,
    }

    impl PulseSink for CountingSink {
        fn transmit(&mut self, _: &IrSequence) -> output::Result<()> {
            if self.fail {
                return Err(IrOutError::Send);
            }
            self.sent += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Published(Vec<String>);

    impl StatePublisher for Published {
        fn publish(&mut self, payload: &str) -> std::result::Result<(), PublishError> {
            self.0.push(payload.to_string());
            Ok(())
        }
    }

    fn device() -> DeviceState<CountingSink, Published> {
        DeviceState::new(CountingSink::default(), Published::default())
    }

    fn published(device: &DeviceState<CountingSink, Published>) -> Vec<String> {
        device.lock().unwrap().publisher.0.clone()
    }

    #[test]
    fn starts_from_default_state() {
        assert_eq!(device().current().unwrap(), Command::default());
    }

    #[test]
    fn temperature_is_clamped() {
        let device = device();
        device.set_temperature(45).unwrap();
        assert_eq!(device.state().unwrap().temperature, MAX_TEMPERATURE);
        device.set_temperature(-3).unwrap();
        assert_eq!(device.state().unwrap().temperature, 0);
        assert_eq!(device.lock().unwrap().sink.sent, 2);
    }

    #[test]
    fn every_edit_transmits_and_publishes() {
        let device = device();
        device.set_mode(true, Mode::Cool).unwrap();
        device.set_fan(Fan::Low).unwrap();
        device.set_swing(Swing::Down).unwrap();
        device.set_power(false).unwrap();
        assert_eq!(device.lock().unwrap().sink.sent, 4);
        assert_eq!(
            published(&device),
            vec![
                r#"{"mode":"cool","temperature":"25","fan":"auto","swing":"auto"}"#,
                r#"{"mode":"cool","temperature":"25","fan":"low","swing":"auto"}"#,
                r#"{"mode":"cool","temperature":"25","fan":"low","swing":"down"}"#,
                r#"{"mode":"off","temperature":"25","fan":"low","swing":"down"}"#,
            ]
        );
    }

    #[test]
    fn edits_clear_timers() {
        let device = device();
        device
            .replace_state(Command::State(AcState {
                on_timer: true,
                on_time: 90,
                off_time: 300,
                time: 600,
                no_time: false,
                ..AcState::default()
            }))
            .unwrap();
        assert!(!device.state().unwrap().no_time);

        device.set_temperature(20).unwrap();
        let state = device.state().unwrap();
        assert!(state.no_time);
        assert_eq!(state, state.normalized());
    }

    #[test]
    fn short_command_keeps_last_full_state() {
        let device = device();
        device.set_mode(true, Mode::Heat).unwrap();
        device
            .replace_state(Command::Short(ShortCommand::Powerful))
            .unwrap();
        assert_eq!(
            device.current().unwrap(),
            Command::Short(ShortCommand::Powerful)
        );
        assert_eq!(published(&device).last().unwrap(), "Powerful");

        device.set_temperature(27).unwrap();
        let state = device.state().unwrap();
        assert!(state.power);
        assert_eq!(state.mode, Mode::Heat);
        assert_eq!(state.temperature, 27);
        assert_eq!(device.current().unwrap(), Command::State(state));
    }

    #[test]
    fn unchanged_command_is_not_resent() {
        let device = device();
        device.set_mode(true, Mode::Dry).unwrap();
        let current = device.current().unwrap();
        assert!(!device.replace_if_changed(current).unwrap());
        assert!(device
            .replace_if_changed(Command::Short(ShortCommand::Quiet))
            .unwrap());
        assert_eq!(device.lock().unwrap().sink.sent, 2);
        assert_eq!(published(&device).len(), 2);
    }

    #[test]
    fn encode_failure_leaves_state_untouched() {
        let device = device();
        let result = device.replace_state(Command::State(AcState {
            temperature: 40,
            ..AcState::default()
        }));
        assert!(matches!(result, Err(StateError::Encode(_))));
        assert_eq!(device.current().unwrap(), Command::default());
        assert_eq!(device.lock().unwrap().sink.sent, 0);
        assert!(published(&device).is_empty());
    }

    #[test]
    fn transmit_failure_still_commits() {
        let device = DeviceState::new(
            CountingSink {
                sent: 0,
                fail: true,
            },
            Published::default(),
        );
        let result = device.set_temperature(18);
        assert!(matches!(result, Err(StateError::Transmit(IrOutError::Send))));
        assert_eq!(device.state().unwrap().temperature, 18);
        assert_eq!(
            published(&device),
            vec![r#"{"mode":"off","temperature":"18","fan":"auto","swing":"auto"}"#]
        );
    }

    #[test]
    fn initial_state_must_encode() {
        let result = DeviceState::with_state(
            AcState {
                temperature: 40,
                ..AcState::default()
            },
            CountingSink::default(),
            Published::default(),
        );
        assert!(matches!(
            result,
            Err(StateError::Encode(EncodeError::FieldOutOfRange {
                field: Field::Temperature,
                value: 40
            }))
        ));

        let device = DeviceState::with_state(
            AcState {
                power: true,
                mode: Mode::Heat,
                temperature: 23,
                ..AcState::default()
            },
            CountingSink::default(),
            Published::default(),
        )
        .unwrap();
        device.set_fan(Fan::Low).unwrap();
        let state = device.state().unwrap();
        assert_eq!(state.temperature, 23);
        assert_eq!(state.mode, Mode::Heat);
        assert_eq!(device.lock().unwrap().sink.sent, 1);
    }

    #[test]
    fn repeated_toggle_is_dropped_once_current() {
        let device = device();
        let quiet = Command::Short(ShortCommand::Quiet);
        assert!(device.replace_if_changed(quiet.clone()).unwrap());
        assert!(!device.replace_if_changed(quiet).unwrap());
        assert_eq!(device.lock().unwrap().sink.sent, 1);
        assert_eq!(published(&device), vec!["Quiet"]);
    }
}
