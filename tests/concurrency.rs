use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use panasonic_ir_bridge::ir::output::{self, PulseSink};
use panasonic_ir_bridge::ir::panasonic::{Command, DecodedFrame, Mode};
use panasonic_ir_bridge::ir::receiver::FrameDecoder;
use panasonic_ir_bridge::ir::types::IrSequence;
use panasonic_ir_bridge::state::report::serialize_state;
use panasonic_ir_bridge::state::{DeviceState, PublishError, StatePublisher};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    Transmit(Command),
    Publish(String),
}

type Log = Arc<Mutex<Vec<Effect>>>;

/// Decodes what it is asked to send and takes its time doing it.
struct RecordingSink(Log);

impl PulseSink for RecordingSink {
    fn transmit(&mut self, pulses: &IrSequence) -> output::Result<()> {
        let mut decoded = FrameDecoder::new().decode_pulses(pulses);
        assert_eq!(decoded.len(), 1);
        let command = match decoded.remove(0) {
            Ok(DecodedFrame::Command(command)) => command,
            other => panic!("transmitted something undecodable: {:?}", other),
        };
        self.0.lock().unwrap().push(Effect::Transmit(command));
        thread::sleep(Duration::from_millis(30));
        Ok(())
    }
}

struct RecordingPublisher(Log);

impl StatePublisher for RecordingPublisher {
    fn publish(&mut self, payload: &str) -> Result<(), PublishError> {
        self.0
            .lock()
            .unwrap()
            .push(Effect::Publish(payload.to_string()));
        Ok(())
    }
}

#[test]
fn concurrent_edits_do_not_interleave() {
    let log: Log = Arc::default();
    let device = Arc::new(DeviceState::new(
        RecordingSink(log.clone()),
        RecordingPublisher(log.clone()),
    ));
    let barrier = Arc::new(Barrier::new(2));

    let temperature = {
        let device = device.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            device.set_temperature(20).unwrap();
        })
    };
    let mode = {
        let device = device.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            device.set_mode(true, Mode::Cool).unwrap();
        })
    };
    temperature.join().unwrap();
    mode.join().unwrap();

    let state = device.state().unwrap();
    assert_eq!(state.temperature, 20);
    assert!(state.power);
    assert_eq!(state.mode, Mode::Cool);

    let log = log.lock().unwrap().clone();
    assert_eq!(log.len(), 4);
    for pair in log.chunks(2) {
        match pair {
            [Effect::Transmit(command), Effect::Publish(payload)] => {
                assert_eq!(*payload, serialize_state(command).unwrap());
            }
            other => panic!("effects interleaved: {:?}", other),
        }
    }
    assert_eq!(log[2], Effect::Transmit(Command::State(state)));
}

#[test]
fn many_writers_all_land() {
    let log: Log = Arc::default();
    let device = Arc::new(DeviceState::new(
        RecordingSink(log.clone()),
        RecordingPublisher(log.clone()),
    ));

    let handles: Vec<_> = (10..16)
        .map(|temperature| {
            let device = device.clone();
            thread::spawn(move || device.set_temperature(temperature).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let log = log.lock().unwrap().clone();
    assert_eq!(log.len(), 12);
    let last_sent = match &log[10] {
        Effect::Transmit(command) => command.clone(),
        other => panic!("expected a transmit, got {:?}", other),
    };
    assert_eq!(device.current().unwrap(), last_sent);
}
