use thiserror::Error;

use crate::ir::types::IrSequence;
use crate::GpioError;

pub const IR_OUTPUT_PIN: u8 = 13;

#[derive(Error, Clone, Debug)]
pub enum IrOutError {
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("Could not send ir sequence, the receiving end is gone")]
    Send,
}

pub type Result<T> = std::result::Result<T, IrOutError>;

/// Transmit side of the IR hardware.
pub trait PulseSink {
    /// Puts the whole sequence on the wire, returning once the last pulse is out.
    fn transmit(&mut self, pulses: &IrSequence) -> Result<()>;
}

impl<S: PulseSink + ?Sized> PulseSink for Box<S> {
    fn transmit(&mut self, pulses: &IrSequence) -> Result<()> {
        (**self).transmit(pulses)
    }
}

#[cfg(feature = "rpi")]
pub use gpio::IrOut;

#[cfg(feature = "rpi")]
mod gpio {
    use std::time::{Duration, Instant};

    use rppal::gpio::{Gpio, OutputPin};

    use super::{PulseSink, Result, IR_OUTPUT_PIN};
    use crate::ir::types::IrSequence;
    use crate::GpioError;

    const CARRIER_HZ: f64 = 38_000.0;
    const CARRIER_DUTY: f64 = 0.5;

    /// IR LED driver. Marks are a 38 kHz carrier, spaces hold the pin low.
    pub struct IrOut {
        pin: OutputPin,
        number: u8,
    }

    impl IrOut {
        pub fn start(number: u8) -> Result<IrOut> {
            let mut pin = Gpio::new()
                .map_err(|_| GpioError::Initialization)?
                .get(number)
                .map_err(|_| GpioError::Pin(number))?
                .into_output();
            pin.set_low();
            Ok(IrOut { pin, number })
        }

        pub fn default_pin() -> Result<Self> {
            Self::start(IR_OUTPUT_PIN)
        }

        fn carrier_on(&mut self) -> Result<()> {
            self.pin
                .set_pwm_frequency(CARRIER_HZ, CARRIER_DUTY)
                .map_err(|_| GpioError::Output(self.number).into())
        }

        fn carrier_off(&mut self) -> Result<()> {
            self.pin
                .clear_pwm()
                .map_err(|_| GpioError::Output(self.number))?;
            self.pin.set_low();
            Ok(())
        }
    }

    /// Sleeping overshoots by far more than a bit period, so spin instead.
    fn hold(micros: u32) {
        let until = Instant::now() + Duration::from_micros(micros as u64);
        while Instant::now() < until {
            std::hint::spin_loop();
        }
    }

    impl PulseSink for IrOut {
        fn transmit(&mut self, pulses: &IrSequence) -> Result<()> {
            for pulse in pulses.as_ref() {
                if pulse.mark > 0 {
                    self.carrier_on()?;
                    hold(pulse.mark);
                    self.carrier_off()?;
                }
                hold(pulse.space);
            }
            trace!("sent {} pulses on pin {}", pulses.len(), self.number);
            Ok(())
        }
    }

    impl Drop for IrOut {
        fn drop(&mut self) {
            if let Err(e) = self.carrier_off() {
                error!("could not turn off ir carrier: {}", e);
            }
        }
    }
}
