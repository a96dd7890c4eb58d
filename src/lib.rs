#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

use thiserror::Error;

pub mod config;
pub mod control;
pub mod ir;
pub mod state;

#[derive(Error, Clone, Debug)]
pub enum GpioError {
    #[error("Could not initialize gpio")]
    Initialization,
    #[error("Could not get pin {0}")]
    Pin(u8),
    #[error("Could not set up interrupt on pin {0}")]
    Interrupt(u8),
    #[error("Could not drive output pin {0}")]
    Output(u8),
}
