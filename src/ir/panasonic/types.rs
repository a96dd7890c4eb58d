use std::convert::TryFrom;
use std::fmt;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/// Written to both timer fields whenever timers are disabled.
pub const NO_TIME_SENTINEL: u16 = 0x600;
/// Timer fields are 11 bits wide on the wire.
pub const TIMER_MAX: u16 = 0x7FF;
/// The temperature field is 5 bits wide on the wire.
pub const MAX_TEMPERATURE: u8 = 31;
pub const DEFAULT_TEMPERATURE: u8 = 25;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Mode,
    Swing,
    Fan,
    Temperature,
    OnTime,
    OffTime,
}

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("Invalid {field} code {value:#x}")]
pub struct InvalidCode {
    pub field: Field,
    pub value: u8,
}

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    Auto = 0,
    Dry = 2,
    Cool = 3,
    Heat = 4,
    #[strum(serialize = "fan_only")]
    Fan = 6,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Auto
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        mode as u8
    }
}

impl TryFrom<u8> for Mode {
    type Error = InvalidCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Auto),
            2 => Ok(Mode::Dry),
            3 => Ok(Mode::Cool),
            4 => Ok(Mode::Heat),
            6 => Ok(Mode::Fan),
            _ => Err(InvalidCode {
                field: Field::Mode,
                value,
            }),
        }
    }
}

/// Vane position. `Forward` is the most horizontal, `Down` the most vertical.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Swing {
    Auto = 0xF,
    Forward = 1,
    High = 2,
    Middle = 3,
    Low = 4,
    Down = 5,
}

impl Default for Swing {
    fn default() -> Self {
        Swing::Auto
    }
}

impl From<Swing> for u8 {
    fn from(swing: Swing) -> Self {
        swing as u8
    }
}

impl TryFrom<u8> for Swing {
    type Error = InvalidCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xF => Ok(Swing::Auto),
            1 => Ok(Swing::Forward),
            2 => Ok(Swing::High),
            3 => Ok(Swing::Middle),
            4 => Ok(Swing::Low),
            5 => Ok(Swing::Down),
            _ => Err(InvalidCode {
                field: Field::Swing,
                value,
            }),
        }
    }
}

/// Fan speed, `Min` through `Max` being levels 1 to 5.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Fan {
    Auto = 0xA,
    Min = 3,
    Low = 4,
    Medium = 5,
    High = 6,
    Max = 7,
}

impl Default for Fan {
    fn default() -> Self {
        Fan::Auto
    }
}

impl From<Fan> for u8 {
    fn from(fan: Fan) -> Self {
        fan as u8
    }
}

impl TryFrom<u8> for Fan {
    type Error = InvalidCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xA => Ok(Fan::Auto),
            3 => Ok(Fan::Min),
            4 => Ok(Fan::Low),
            5 => Ok(Fan::Medium),
            6 => Ok(Fan::High),
            7 => Ok(Fan::Max),
            _ => Err(InvalidCode {
                field: Field::Fan,
                value,
            }),
        }
    }
}

/// Auxiliary functions sent as 8-byte frames instead of a full state.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, EnumIter)]
pub enum ShortCommand {
    #[strum(to_string = "E-ion", serialize = "e_ion")]
    EIon = 0x3361,
    #[strum(to_string = "Patrol", serialize = "patrol")]
    Patrol = 0x3363,
    #[strum(to_string = "Quiet", serialize = "quiet")]
    Quiet = 0x3381,
    #[strum(to_string = "Powerful", serialize = "powerful")]
    Powerful = 0x3586,
    #[strum(to_string = "Check", serialize = "check")]
    Check = 0x3293,
    #[strum(to_string = "Set_Air_1", serialize = "set_air_1")]
    SetAir1 = 0x328D,
    #[strum(to_string = "Set_Air_2", serialize = "set_air_2")]
    SetAir2 = 0x328E,
    #[strum(to_string = "Set_Air_3", serialize = "set_air_3")]
    SetAir3 = 0x328F,
    #[strum(to_string = "AC_Reset", serialize = "ac_reset")]
    AcReset = 0x9D32,
}

impl From<ShortCommand> for u16 {
    fn from(command: ShortCommand) -> Self {
        command as u16
    }
}

impl TryFrom<u16> for ShortCommand {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use ShortCommand::*;
        match value {
            0x3361 => Ok(EIon),
            0x3363 => Ok(Patrol),
            0x3381 => Ok(Quiet),
            0x3586 => Ok(Powerful),
            0x3293 => Ok(Check),
            0x328D => Ok(SetAir1),
            0x328E => Ok(SetAir2),
            0x328F => Ok(SetAir3),
            0x9D32 => Ok(AcReset),
            _ => Err(value),
        }
    }
}

/// Full thermostat state as carried by a 19-byte frame.
///
/// The timer fields are raw wire values (minutes) and are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcState {
    pub power: bool,
    pub mode: Mode,
    pub swing: Swing,
    pub fan: Fan,
    pub temperature: u8,
    pub on_timer: bool,
    pub off_timer: bool,
    pub on_time: u16,
    pub off_time: u16,
    pub time: u16,
    pub no_time: bool,
}

impl Default for AcState {
    fn default() -> Self {
        AcState {
            power: false,
            mode: Mode::default(),
            swing: Swing::default(),
            fan: Fan::default(),
            temperature: DEFAULT_TEMPERATURE,
            on_timer: false,
            off_timer: false,
            on_time: NO_TIME_SENTINEL,
            off_time: NO_TIME_SENTINEL,
            time: 0,
            no_time: true,
        }
    }
}

impl AcState {
    /// The state as it will look once it has been on the wire.
    ///
    /// With timers disabled (`no_time`, or a zero `time`) both timer fields
    /// collapse to [`NO_TIME_SENTINEL`] and `time` to zero; the previous
    /// values are not recoverable.
    pub fn normalized(&self) -> AcState {
        if self.no_time || self.time == 0 {
            AcState {
                on_time: NO_TIME_SENTINEL,
                off_time: NO_TIME_SENTINEL,
                time: 0,
                no_time: true,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for AcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}C fan {} swing {}",
            if self.power { "on" } else { "off" },
            self.mode,
            self.temperature,
            self.fan,
            self.swing
        )?;
        if !self.no_time {
            write!(
                f,
                " timers on={}@{} off={}@{} time={}",
                self.on_timer, self.on_time, self.off_timer, self.off_time, self.time
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    State(AcState),
    Short(ShortCommand),
}

impl Default for Command {
    fn default() -> Self {
        Command::State(AcState::default())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::State(state) => write!(f, "state [{}]", state),
            Command::Short(command) => write!(f, "command {}", command),
        }
    }
}
