use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::proto::command::{ParameterCode, Speed, PARAMETER_SLOTS};
use crate::proto::{ProtoError, Result};
use crate::{DEFAULT_BAUDRATE, DEFAULT_TTY};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "im3536.toml";

/// Frequency range accepted by the instrument, in Hz.
pub const FREQUENCY_RANGE: RangeInclusive<f64> = 4.0..=8_000_000.0;

/// Rejects frequencies the instrument cannot set, including NaN and infinity.
pub fn check_frequency(frequency: f64) -> Result<()> {
    if FREQUENCY_RANGE.contains(&frequency) {
        Ok(())
    } else {
        Err(ProtoError::InvalidSetting(format!(
            "frequency {} Hz outside {:?}",
            frequency, FREQUENCY_RANGE
        )))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    pub port: String,
    pub baudrate: u32,
    pub im3536: Im3536Settings,
}

/// Measurement settings, as chosen on the settings panel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Im3536Settings {
    /// One of `FAST`, `MEDIUM`, `SLOW`, `SLOW2`.
    pub connecting_speed: String,
    /// Parameter labels for slots 1 to 4.
    pub parameters: Vec<String>,
    pub frequency: f64,
    pub acquire_monitor: bool,
    pub display_monitor: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_TTY.to_string(),
            baudrate: DEFAULT_BAUDRATE,
            im3536: Im3536Settings::default(),
        }
    }
}

impl Default for Im3536Settings {
    fn default() -> Self {
        Self {
            connecting_speed: "MEDIUM".to_string(),
            parameters: vec![
                ParameterCode::Rs.label().to_string(),
                ParameterCode::Off.label().to_string(),
                ParameterCode::Off.label().to_string(),
                ParameterCode::Off.label().to_string(),
            ],
            frequency: 200_000.0,
            acquire_monitor: true,
            display_monitor: true,
        }
    }
}

impl Settings {
    pub fn speed(&self) -> Result<Speed> {
        self.im3536.connecting_speed.parse()
    }

    /// Resolves the configured labels into slot codes.
    pub fn parameter_codes(&self) -> Result<[ParameterCode; PARAMETER_SLOTS]> {
        let labels = &self.im3536.parameters;
        if labels.len() != PARAMETER_SLOTS {
            return Err(ProtoError::InvalidSetting(format!(
                "expected {} parameters, got {}",
                PARAMETER_SLOTS,
                labels.len()
            )));
        }
        let mut codes = [ParameterCode::Off; PARAMETER_SLOTS];
        for (code, label) in codes.iter_mut().zip(labels) {
            *code = ParameterCode::from_label(label)?;
        }
        Ok(codes)
    }

    pub fn validate(&self) -> Result<()> {
        self.speed()?;
        let codes = self.parameter_codes()?;
        if codes[0].is_off() {
            return Err(ProtoError::InvalidSetting(
                "parameter 1 must not be OFF".to_string(),
            ));
        }
        check_frequency(self.im3536.frequency)
    }
}

/// Load settings from defaults, a TOML file and `IM3536_*` environment variables.
///
/// Nested keys use `__`, e.g. `IM3536_IM3536__CONNECTING_SPEED=SLOW`.
///
/// An explicit `config_path` must exist. Without one, `im3536.toml` in the
/// working directory is used if present.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ProtoError::InvalidSetting(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
    }

    builder = builder.add_source(
        Environment::with_prefix("IM3536")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("im3536.parameters"),
    );

    let settings = builder.build()?.try_deserialize::<Settings>()?;
    log::debug!("Loaded settings: {:?}", settings);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.speed().unwrap(), Speed::Medium);
        assert_eq!(
            settings.parameter_codes().unwrap(),
            [
                ParameterCode::Rs,
                ParameterCode::Off,
                ParameterCode::Off,
                ParameterCode::Off
            ]
        );
    }

    #[test]
    fn first_parameter_must_be_set() {
        let mut settings = Settings::default();
        settings.im3536.parameters[0] = "OFF".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ProtoError::InvalidSetting(_))
        ));
    }

    #[test]
    fn rejects_bad_values() {
        let mut settings = Settings::default();
        settings.im3536.frequency = 1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.im3536.connecting_speed = "TURBO".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ProtoError::UnknownSpeed(_))
        ));

        let mut settings = Settings::default();
        settings.im3536.parameters.pop();
        assert!(matches!(
            settings.parameter_codes(),
            Err(ProtoError::InvalidSetting(_))
        ));

        let mut settings = Settings::default();
        settings.im3536.parameters[1] = "Capacitance".to_string();
        assert!(matches!(
            settings.parameter_codes(),
            Err(ProtoError::UnknownLabel(_))
        ));
    }

    #[test]
    fn frequency_bounds() {
        assert!(check_frequency(4.0).is_ok());
        assert!(check_frequency(8_000_000.0).is_ok());
        for hz in [3.9, 8_000_001.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                check_frequency(hz),
                Err(ProtoError::InvalidSetting(_))
            ));
        }
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = "/dev/ttyACM3"

[im3536]
connecting_speed = "SLOW2"
frequency = 1000.0
parameters = ["Cp   (Equivalent parallel capacitance)", "D    (Loss factor tanδ)", "OFF", "OFF"]
"#
        )
        .unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.port, "/dev/ttyACM3");
        assert_eq!(settings.baudrate, DEFAULT_BAUDRATE);
        assert_eq!(settings.speed().unwrap(), Speed::Slow2);
        assert_eq!(settings.im3536.frequency, 1000.0);
        assert!(settings.im3536.acquire_monitor);
        assert_eq!(
            settings.parameter_codes().unwrap()[..2],
            [ParameterCode::Cp, ParameterCode::D]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_settings(Some(Path::new("/nonexistent/im3536.toml"))).is_err());
    }
}
