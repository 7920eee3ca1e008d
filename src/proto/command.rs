use std::{fmt, str::FromStr};

use clap::{builder::PossibleValue, ValueEnum};

use super::ProtoError;

/// Number of programmable parameter slots (`:PAR1` .. `:PAR4`).
pub const PARAMETER_SLOTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `*TRG`
    Trigger,
    /// `*RST`
    ResetAll,
    /// `:PRES`, reset current measurement settings
    Preset,
    SetTriggerExternal(bool),
    SetMode(Mode),
    SetMeasureOutputAuto(bool),
    SetDisplay(bool),
    SetSpeed(Speed),
    SetFrequency(f64),
    // All four slots go out in one line
    SetParameters([ParameterCode; PARAMETER_SLOTS]),
    /// Slot number, 1-based
    GetParameter(usize),
    GetFrequency,
    GetMonitor,
    GetMeasurement,
    Raw(String),
}

fn on_off(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "OFF"
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Trigger => f.write_str("*TRG"),
            Command::ResetAll => f.write_str("*RST"),
            Command::Preset => f.write_str(":PRES"),
            Command::SetTriggerExternal(true) => f.write_str(":TRIG EXT"),
            Command::SetTriggerExternal(false) => f.write_str(":TRIG INT"),
            Command::SetMode(mode) => write!(f, ":MODE {}", mode.token()),
            Command::SetMeasureOutputAuto(state) => write!(f, ":MEAS:OUTP:AUTO {}", on_off(*state)),
            Command::SetDisplay(state) => write!(f, ":DISP {}", on_off(*state)),
            Command::SetSpeed(speed) => write!(f, ":SPEE {}", speed.token()),
            Command::SetFrequency(hz) => write!(f, ":FREQ {}", hz),
            Command::SetParameters(codes) => {
                for (i, code) in codes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, ":PAR{} {}", i + 1, code.token())?;
                }
                Ok(())
            }
            Command::GetParameter(slot) => write!(f, ":PAR{}?", slot),
            Command::GetFrequency => f.write_str(":FREQ?"),
            Command::GetMonitor => f.write_str(":MONI?"),
            Command::GetMeasurement => f.write_str("MEAS?"),
            Command::Raw(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lcr,
    Continuous,
}

impl Mode {
    pub fn token(&self) -> &'static str {
        match self {
            Mode::Lcr => "LCR",
            Mode::Continuous => "CONT",
        }
    }
}

impl FromStr for Mode {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LCR" => Ok(Mode::Lcr),
            "CONTINUOUS" | "CONT" => Ok(Mode::Continuous),
            _ => Err(ProtoError::UnknownMode(s.to_string())),
        }
    }
}

impl ValueEnum for Mode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Mode::Lcr, Mode::Continuous]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Mode::Lcr => PossibleValue::new("lcr").help("LCR measurement"),
            Mode::Continuous => {
                PossibleValue::new("continuous").help("Continuous measurement of saved panels")
            }
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Lcr => f.write_str("LCR"),
            Mode::Continuous => f.write_str("CONTINUOUS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Fast,
    Medium,
    Slow,
    Slow2,
}

impl Speed {
    pub fn token(&self) -> &'static str {
        match self {
            Speed::Fast => "FAST",
            Speed::Medium => "MED",
            Speed::Slow => "SLOW",
            Speed::Slow2 => "SLOW2",
        }
    }
}

/// Accepts the setting names `FAST`, `MEDIUM`, `SLOW` and `SLOW2`.
impl FromStr for Speed {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FAST" => Ok(Speed::Fast),
            "MEDIUM" => Ok(Speed::Medium),
            "SLOW" => Ok(Speed::Slow),
            "SLOW2" => Ok(Speed::Slow2),
            _ => Err(ProtoError::UnknownSpeed(s.to_string())),
        }
    }
}

impl ValueEnum for Speed {
    fn value_variants<'a>() -> &'a [Self] {
        &[Speed::Fast, Speed::Medium, Speed::Slow, Speed::Slow2]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Speed::Fast => PossibleValue::new("fast"),
            Speed::Medium => PossibleValue::new("medium"),
            Speed::Slow => PossibleValue::new("slow"),
            Speed::Slow2 => PossibleValue::new("slow2"),
        })
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::Fast => f.write_str("FAST"),
            Speed::Medium => f.write_str("MEDIUM"),
            Speed::Slow => f.write_str("SLOW"),
            Speed::Slow2 => f.write_str("SLOW2"),
        }
    }
}

/// Quantity assigned to a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterCode {
    Off,
    Z,
    Y,
    Phase,
    X,
    G,
    B,
    Q,
    Rdc,
    Rs,
    Rp,
    Ls,
    Lp,
    Cs,
    Cp,
    D,
    S,
    E,
}

impl ParameterCode {
    pub const ALL: [ParameterCode; 18] = [
        ParameterCode::Off,
        ParameterCode::Z,
        ParameterCode::Y,
        ParameterCode::Phase,
        ParameterCode::X,
        ParameterCode::G,
        ParameterCode::B,
        ParameterCode::Q,
        ParameterCode::Rdc,
        ParameterCode::Rs,
        ParameterCode::Rp,
        ParameterCode::Ls,
        ParameterCode::Lp,
        ParameterCode::Cs,
        ParameterCode::Cp,
        ParameterCode::D,
        ParameterCode::S,
        ParameterCode::E,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            ParameterCode::Off => "OFF",
            ParameterCode::Z => "Z",
            ParameterCode::Y => "Y",
            ParameterCode::Phase => "PHASE",
            ParameterCode::X => "X",
            ParameterCode::G => "G",
            ParameterCode::B => "B",
            ParameterCode::Q => "Q",
            ParameterCode::Rdc => "RDC",
            ParameterCode::Rs => "RS",
            ParameterCode::Rp => "RP",
            ParameterCode::Ls => "LS",
            ParameterCode::Lp => "LP",
            ParameterCode::Cs => "CS",
            ParameterCode::Cp => "CP",
            ParameterCode::D => "D",
            ParameterCode::S => "S",
            ParameterCode::E => "E",
        }
    }

    /// Unit of the quantity. `Off`, and the dimensionless ones, have none.
    pub fn unit(&self) -> &'static str {
        match self {
            ParameterCode::Off => "",
            ParameterCode::Z => "Ω",
            ParameterCode::Y => "S",
            ParameterCode::Phase => "°",
            ParameterCode::X => "Ω",
            ParameterCode::G => "S",
            ParameterCode::B => "S",
            ParameterCode::Q => "",
            ParameterCode::Rdc => "Ω",
            ParameterCode::Rs => "Ω",
            ParameterCode::Rp => "Ω",
            ParameterCode::Ls => "H",
            ParameterCode::Lp => "H",
            ParameterCode::Cs => "F",
            ParameterCode::Cp => "F",
            ParameterCode::D => "",
            ParameterCode::S => "",
            ParameterCode::E => "",
        }
    }

    pub fn label(&self) -> &'static str {
        PARAMETER_LABELS
            .iter()
            .find(|(_, code)| code == self)
            .map(|(label, _)| *label)
            .unwrap_or("OFF")
    }

    pub fn from_label(label: &str) -> Result<Self, ProtoError> {
        PARAMETER_LABELS
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, code)| *code)
            .ok_or_else(|| ProtoError::UnknownLabel(label.to_string()))
    }

    pub fn is_off(&self) -> bool {
        *self == ParameterCode::Off
    }
}

/// Parses the token the instrument answers to `:PARn?`.
impl FromStr for ParameterCode {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        ParameterCode::ALL
            .iter()
            .find(|code| code.token().eq_ignore_ascii_case(token))
            .copied()
            .ok_or_else(|| ProtoError::UnknownParameter(s.to_string()))
    }
}

impl fmt::Display for ParameterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Display labels offered for parameter selection, in menu order.
pub static PARAMETER_LABELS: [(&str, ParameterCode); 18] = [
    ("OFF", ParameterCode::Off),
    ("Z    (Impedance)", ParameterCode::Z),
    ("Y    (Admittance)", ParameterCode::Y),
    ("θ    (Phase angle)", ParameterCode::Phase),
    ("X    (Reactance)", ParameterCode::X),
    ("G    (Conductance)", ParameterCode::G),
    ("B    (Susceptance)", ParameterCode::B),
    ("Q    (Q-factor)", ParameterCode::Q),
    ("Rdc  (DC resistance)", ParameterCode::Rdc),
    ("Rs   (Equivalent series resistance)", ParameterCode::Rs),
    ("Rp   (Equivalent parallel resistance)", ParameterCode::Rp),
    ("Ls   (Equivalent series inductance)", ParameterCode::Ls),
    ("Lp   (Equivalent parallel inductance)", ParameterCode::Lp),
    ("Cs   (Equivalent series Capacitance)", ParameterCode::Cs),
    ("Cp   (Equivalent parallel capacitance)", ParameterCode::Cp),
    ("D    (Loss factor tanδ)", ParameterCode::D),
    ("σ    (Conductivity)", ParameterCode::S),
    ("ε    (Permittivity)", ParameterCode::E),
];

/// Voltage and current monitor readings, reported by `:MONI?` in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorChannel {
    AcVoltage,
    AcCurrent,
    DcVoltage,
    DcCurrent,
}

impl MonitorChannel {
    pub const ALL: [MonitorChannel; 4] = [
        MonitorChannel::AcVoltage,
        MonitorChannel::AcCurrent,
        MonitorChannel::DcVoltage,
        MonitorChannel::DcCurrent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MonitorChannel::AcVoltage => "AC V monitor",
            MonitorChannel::AcCurrent => "AC I monitor",
            MonitorChannel::DcVoltage => "DC V monitor",
            MonitorChannel::DcCurrent => "DC I monitor",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MonitorChannel::AcVoltage | MonitorChannel::DcVoltage => "V",
            MonitorChannel::AcCurrent | MonitorChannel::DcCurrent => "A",
        }
    }
}

impl fmt::Display for MonitorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
