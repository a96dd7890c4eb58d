use std::num::ParseIntError;
use std::time::Duration;

use structopt::StructOpt;

use crate::ir::input::IR_INPUT_PIN;
use crate::ir::output::IR_OUTPUT_PIN;
use crate::ir::panasonic::types::DEFAULT_TEMPERATURE;
use crate::ir::panasonic::{AcState, Fan, Mode, ShortCommand, Swing};

fn parse_hex_byte(src: &str) -> Result<u8, ParseIntError> {
    u8::from_str_radix(src.trim_start_matches("0x"), 16)
}

#[derive(StructOpt, Debug)]
#[structopt(about = "Panasonic air conditioner IR bridge")]
pub enum Opt {
    /// Run the bridge: receive loop plus control messages read from stdin
    Run(RunOpt),
    /// Print the frame and pulses for a command
    Encode(EncodeOpt),
    /// Decode raw frame bytes
    Decode {
        /// Frame bytes in hex
        #[structopt(parse(try_from_str = parse_hex_byte), required = true)]
        bytes: Vec<u8>,
    },
}

#[derive(StructOpt, Debug)]
pub struct RunOpt {
    /// GPIO pin of the IR receiver
    #[structopt(long, default_value = "4")]
    pub input_pin: u8,

    /// GPIO pin of the IR LED
    #[structopt(long, default_value = "13")]
    pub output_pin: u8,

    /// How long the receive loop waits for pulses before checking for shutdown
    #[structopt(long, default_value = "1000")]
    pub receive_timeout_ms: u64,

    /// Silence that ends a captured pulse burst
    #[structopt(long, default_value = "4000")]
    pub idle_threshold_us: u64,

    #[structopt(long, default_value = "panasonic")]
    pub topic_prefix: String,

    #[structopt(long, default_value = "bridge")]
    pub device_id: String,

    /// Feed transmitted pulses back into the receiver instead of using GPIO
    #[structopt(long)]
    pub loopback: bool,

    #[structopt(flatten)]
    pub initial_state: AcStateOpt,
}

impl RunOpt {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_micros(self.idle_threshold_us)
    }
}

impl Default for RunOpt {
    fn default() -> Self {
        RunOpt {
            input_pin: IR_INPUT_PIN,
            output_pin: IR_OUTPUT_PIN,
            receive_timeout_ms: 1000,
            idle_threshold_us: 4000,
            topic_prefix: "panasonic".to_string(),
            device_id: "bridge".to_string(),
            loopback: false,
            initial_state: AcStateOpt::default(),
        }
    }
}

#[derive(StructOpt, Debug)]
pub enum EncodeOpt {
    /// A full thermostat state
    State(AcStateOpt),
    /// One of the auxiliary commands, e.g. e_ion, quiet, ac_reset
    Short { command: ShortCommand },
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq)]
pub struct AcStateOpt {
    #[structopt(long)]
    pub off: bool,
    #[structopt(short, long, default_value = "auto")]
    pub mode: Mode,
    #[structopt(short, long, default_value = "25")]
    pub temperature: u8,
    #[structopt(short, long, default_value = "auto")]
    pub fan: Fan,
    #[structopt(short, long, default_value = "auto")]
    pub swing: Swing,
}

impl Default for AcStateOpt {
    fn default() -> Self {
        AcStateOpt {
            off: false,
            mode: Mode::default(),
            temperature: DEFAULT_TEMPERATURE,
            fan: Fan::default(),
            swing: Swing::default(),
        }
    }
}

impl From<&AcStateOpt> for AcState {
    fn from(opt: &AcStateOpt) -> Self {
        AcState {
            power: !opt.off,
            mode: opt.mode,
            temperature: opt.temperature,
            fan: opt.fan,
            swing: opt.swing,
            ..AcState::default()
        }
    }
}
