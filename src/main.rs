extern crate pretty_env_logger;
#[macro_use]
extern crate log;

use std::io::Write;
use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use eyre::Result;
use itertools::Itertools;
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::spawn_blocking;

use panasonic_ir_bridge::config::{EncodeOpt, Opt, RunOpt};
use panasonic_ir_bridge::control;
use panasonic_ir_bridge::ir::format::{IrFormat, Panasonic};
use panasonic_ir_bridge::ir::input::PulseSource;
use panasonic_ir_bridge::ir::loopback::loopback;
use panasonic_ir_bridge::ir::output::PulseSink;
use panasonic_ir_bridge::ir::panasonic::{decode, encode, AcState, Command, DecodedFrame};
use panasonic_ir_bridge::ir::receiver::IrReceiver;
use panasonic_ir_bridge::ir::types::hex;
use panasonic_ir_bridge::state::report::serialize_state;
use panasonic_ir_bridge::state::{DeviceState, PublishError, StatePublisher};

type Sink = Box<dyn PulseSink + Send>;
type Source = Box<dyn PulseSource + Send>;
type Device = DeviceState<Sink, StdoutPublisher>;

/// Writes state reports to stdout as `<topic> <payload>` lines.
struct StdoutPublisher {
    topic: String,
}

impl StatePublisher for StdoutPublisher {
    fn publish(&mut self, payload: &str) -> Result<(), PublishError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{} {}", self.topic, payload).map_err(|e| PublishError(e.to_string()))
    }
}

fn loopback_pair() -> (Sink, Source) {
    let (sink, source) = loopback();
    (Box::new(sink), Box::new(source))
}

#[cfg(feature = "rpi")]
fn ir_pair(opt: &RunOpt) -> Result<(Sink, Source)> {
    use panasonic_ir_bridge::ir::input::IrIn;
    use panasonic_ir_bridge::ir::output::IrOut;

    if opt.loopback {
        return Ok(loopback_pair());
    }
    let sink = IrOut::start(opt.output_pin)
        .wrap_err_with(|| format!("Could not start ir output on pin {}", opt.output_pin))?;
    let source = IrIn::start(opt.input_pin, opt.idle_threshold())
        .wrap_err_with(|| format!("Could not start ir input on pin {}", opt.input_pin))?;
    Ok((Box::new(sink), Box::new(source)))
}

#[cfg(not(feature = "rpi"))]
fn ir_pair(opt: &RunOpt) -> Result<(Sink, Source)> {
    if !opt.loopback {
        warn!("built without gpio support, running on the loopback pair");
    }
    Ok(loopback_pair())
}

async fn run(opt: RunOpt) -> Result<()> {
    let (sink, source) = ir_pair(&opt)?;
    let publisher = StdoutPublisher {
        topic: control::state_topic(&opt.topic_prefix, &opt.device_id),
    };
    let device: Arc<Device> = Arc::new(
        DeviceState::with_state(AcState::from(&opt.initial_state), sink, publisher)
            .wrap_err("Invalid initial state")?,
    );

    let mut receiver = {
        let device = device.clone();
        IrReceiver::start(source, opt.receive_timeout(), move |command| {
            match device.replace_if_changed(command) {
                Ok(true) => {}
                Ok(false) => debug!("received command matches current state, ignoring"),
                Err(e) => error!("could not apply received command: {}", e),
            }
        })
    };

    for topic in control::control_topics(&opt.topic_prefix, &opt.device_id) {
        info!("accepting control messages on {}", topic);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .wrap_err("Could not read control input")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (topic, payload) = match line.split_once(char::is_whitespace) {
            Some((topic, payload)) => (topic.to_string(), payload.to_string()),
            None => {
                warn!("expected `<topic> <payload>`, got {:?}", line);
                continue;
            }
        };

        let device = device.clone();
        let handled = spawn_blocking(move || control::handle(&*device, &topic, &payload))
            .await
            .wrap_err("Control handler panicked")?;
        if let Err(e) = handled {
            warn!("rejected control message: {}", e);
        }
    }

    info!("control input closed, stopping");
    receiver
        .stop()
        .await
        .wrap_err("Could not stop ir receiver")
}

fn print_encoded(command: Command) -> Result<()> {
    let frame = encode(&command).wrap_err("Could not encode command")?;
    let pulses = Panasonic::encode(&frame);
    println!("{}", command);
    println!("frame: {}", hex(&frame));
    println!(
        "pulses ({}): {}",
        pulses.len(),
        pulses
            .as_ref()
            .iter()
            .map(|p| format!("{}/{}", p.mark, p.space))
            .join(" ")
    );
    Ok(())
}

fn print_decoded(bytes: &[u8]) -> Result<()> {
    match decode(bytes).wrap_err_with(|| format!("Could not decode {}", hex(bytes)))? {
        DecodedFrame::HeaderProbe => println!("header probe"),
        DecodedFrame::Command(command) => {
            println!("{}", command);
            println!(
                "{}",
                serialize_state(&command).wrap_err("Could not serialize command")?
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let opts = Opt::from_args();

    debug!("opts: {:?}", opts);

    match opts {
        Opt::Run(run_opts) => run(run_opts).await?,
        Opt::Encode(EncodeOpt::State(state)) => {
            print_encoded(Command::State(AcState::from(&state)))?
        }
        Opt::Encode(EncodeOpt::Short { command }) => print_encoded(Command::Short(command))?,
        Opt::Decode { bytes } => print_decoded(&bytes)?,
    }

    Ok(())
}
