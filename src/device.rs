use log::{info, warn};
use std::time::Duration;

use crate::config::Settings;
use crate::measurement::{Measurement, ParameterUnits, Quantity};
use crate::proto::command::{
    Command, Mode, MonitorChannel, ParameterCode, Speed, PARAMETER_SLOTS,
};
use crate::proto::transport::{SerialLink, Transport};
use crate::proto::{parse_value, parse_values, Result};

/// Read timeout once the port is open.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Where the reply to a trigger comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Auto output is on; the instrument sends the reply by itself.
    Pushed,
    /// The reply has to be requested with `MEAS?`.
    Queried,
}

/// Hioki IM3536 LCR meter.
///
/// The driver mirrors a few instrument settings locally. The list of active
/// parameter labels is cached after the first query and reused for every
/// measurement; [`Device::set_parameters`] does not refresh it, call
/// [`Device::parameters`] after reassigning slots.
pub struct Device {
    com: String,
    baudrate: u32,
    transport: Transport,
    output_auto: bool,
    is_monitor: bool,
    cached_parameters: Vec<Quantity>,
}

impl Device {
    pub fn new(com: impl AsRef<str>, baudrate: u32) -> Self {
        Self {
            com: com.as_ref().to_string(),
            baudrate,
            transport: Transport::new(),
            output_auto: false,
            is_monitor: false,
            cached_parameters: Vec::new(),
        }
    }

    /// Opens the port and puts the instrument under external trigger.
    pub async fn open(&mut self) -> Result<()> {
        self.transport.open(&self.com, self.baudrate, READ_TIMEOUT)?;
        self.after_open().await
    }

    /// Like [`Device::open`], over an already opened link.
    pub async fn open_with(&mut self, link: Box<dyn SerialLink>) -> Result<()> {
        self.transport.attach(link, READ_TIMEOUT)?;
        self.after_open().await
    }

    async fn after_open(&mut self) -> Result<()> {
        info!("Opened {} at {} baud", self.com, self.baudrate);
        self.set_trigger_external(true).await
    }

    /// Hands the instrument back to local operation and closes the port.
    ///
    /// All three restore commands are sent even if one fails; the first
    /// error is returned after the port is closed. Does nothing if the
    /// port is not open.
    pub async fn close(&mut self) -> Result<()> {
        if !self.transport.is_open() {
            return Ok(());
        }
        let results = [
            self.set_trigger_external(false).await,
            self.set_measure_output_auto(false).await,
            self.set_display_monitor(true).await,
        ];
        self.transport.close();
        info!("Closed {}", self.com);
        results.into_iter().collect()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn reset_buffer(&mut self) -> Result<()> {
        self.transport.reset_buffer()
    }

    /// Sends a raw command line.
    pub async fn send(&mut self, message: impl Into<String>) -> Result<()> {
        self.transport.send(Command::Raw(message.into())).await
    }

    /// Reads one raw line; empty if nothing arrived in time.
    pub async fn receive(&mut self) -> Result<String> {
        self.transport.receive().await
    }

    pub fn set_monitor_value_enabled(&mut self, enable: bool) {
        self.is_monitor = enable;
    }

    pub fn is_monitor_value_enabled(&self) -> bool {
        self.is_monitor
    }

    pub fn is_output_auto(&self) -> bool {
        self.output_auto
    }

    pub fn cached_parameters(&self) -> &[Quantity] {
        &self.cached_parameters
    }

    pub async fn set_trigger_external(&mut self, enable: bool) -> Result<()> {
        self.transport
            .send(Command::SetTriggerExternal(enable))
            .await
    }

    pub async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.transport.send(Command::SetMode(mode)).await
    }

    pub async fn set_measure_output_auto(&mut self, enable: bool) -> Result<()> {
        self.transport
            .send(Command::SetMeasureOutputAuto(enable))
            .await?;
        self.output_auto = enable;
        Ok(())
    }

    pub async fn set_display_monitor(&mut self, enable: bool) -> Result<()> {
        self.transport.send(Command::SetDisplay(enable)).await
    }

    pub async fn set_speed(&mut self, speed: Speed) -> Result<()> {
        self.transport.send(Command::SetSpeed(speed)).await
    }

    pub async fn set_frequency(&mut self, frequency: f64) -> Result<()> {
        self.transport.send(Command::SetFrequency(frequency)).await
    }

    pub async fn frequency(&mut self) -> Result<f64> {
        let reply = self.transport.send_and_receive(Command::GetFrequency).await?;
        parse_value(&reply)
    }

    /// Assigns all four parameter slots in a single line.
    pub async fn set_parameters(
        &mut self,
        parameters: [ParameterCode; PARAMETER_SLOTS],
    ) -> Result<()> {
        self.transport
            .send(Command::SetParameters(parameters))
            .await
    }

    /// Queries the slot assignment and refreshes the label cache.
    ///
    /// Unused (`OFF`) slots are left out and a quantity assigned twice is
    /// listed once. With monitor values enabled, the four monitor channels
    /// follow the parameters.
    pub async fn parameters(&mut self) -> Result<ParameterUnits> {
        let mut units = ParameterUnits::new();
        for slot in 1..=PARAMETER_SLOTS {
            let reply = self
                .transport
                .send_and_receive(Command::GetParameter(slot))
                .await?;
            let code: ParameterCode = reply.parse()?;
            units.insert(code.into());
        }
        if self.is_monitor {
            for channel in MonitorChannel::ALL {
                units.insert(channel.into());
            }
        }
        units.remove(&ParameterCode::Off.into());
        self.cached_parameters = units.quantities().collect();
        Ok(units)
    }

    pub async fn trigger(&mut self) -> Result<()> {
        self.transport.send(Command::Trigger).await
    }

    pub async fn monitor_values(&mut self) -> Result<Vec<f64>> {
        let reply = self.transport.send_and_receive(Command::GetMonitor).await?;
        parse_values(&reply)
    }

    pub fn read_strategy(&self) -> ReadStrategy {
        if self.output_auto {
            ReadStrategy::Pushed
        } else {
            ReadStrategy::Queried
        }
    }

    async fn read_reply(&mut self, strategy: ReadStrategy) -> Result<String> {
        match strategy {
            ReadStrategy::Pushed => self.transport.receive().await,
            ReadStrategy::Queried => {
                self.transport
                    .send_and_receive(Command::GetMeasurement)
                    .await
            }
        }
    }

    /// Triggers one measurement and labels the values.
    ///
    /// Values are paired with the cached labels by position. If the cache
    /// is stale, because slots were reassigned without a following
    /// [`Device::parameters`] call, the labels are wrong.
    pub async fn measure(&mut self) -> Result<Measurement> {
        self.trigger().await?;
        let reply = self.read_reply(self.read_strategy()).await?;
        let mut values = parse_values(&reply)?;
        if self.is_monitor {
            values.extend(self.monitor_values().await?);
        }
        if self.cached_parameters.is_empty() {
            self.parameters().await?;
        }
        if values.len() != self.cached_parameters.len() {
            warn!(
                "Got {} values for {} labels, pairing by position",
                values.len(),
                self.cached_parameters.len()
            );
        }
        Ok(Measurement::pair(&self.cached_parameters, &values))
    }

    /// `:PRES`
    pub async fn reset_current_settings(&mut self) -> Result<()> {
        self.transport.send(Command::Preset).await
    }

    /// `*RST`
    pub async fn reset_all(&mut self) -> Result<()> {
        self.transport.send(Command::ResetAll).await
    }

    /// Applies the measurement settings in the order the settings panel does.
    pub async fn apply_settings(&mut self, settings: &Settings) -> Result<()> {
        let parameters = settings.parameter_codes()?;
        let speed = settings.speed()?;
        self.set_parameters(parameters).await?;
        self.set_display_monitor(settings.im3536.display_monitor)
            .await?;
        self.set_measure_output_auto(true).await?;
        self.set_mode(Mode::Lcr).await?;
        self.set_speed(speed).await?;
        self.set_frequency(settings.im3536.frequency).await?;
        self.set_monitor_value_enabled(settings.im3536.acquire_monitor);
        Ok(())
    }

    /// Assigns the configured parameters and reads back what is active.
    pub async fn select_parameters(&mut self, settings: &Settings) -> Result<ParameterUnits> {
        let parameters = settings.parameter_codes()?;
        self.set_monitor_value_enabled(settings.im3536.acquire_monitor);
        self.set_parameters(parameters).await?;
        self.parameters().await
    }
}
