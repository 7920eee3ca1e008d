//!
//! This library provides communication with a Hioki IM3536 LCR meter.
//!
//! <br>
//!
//! # Details
//!
//! - The instrument is connected over RS-232 or its USB virtual COM port.
//!   Commands and replies are ASCII lines terminated by CR LF.
//!
//! - Basic setup and a single measurement
//!
//!   ```no_run
//!   use im3536ctrl::{Device, DEFAULT_BAUDRATE};
//!   use im3536ctrl::proto::command::{ParameterCode, Speed};
//!   #[tokio::main]
//!   async fn main() -> im3536ctrl::Result<()> {
//!       let mut device = Device::new("/dev/ttyUSB0", DEFAULT_BAUDRATE);
//!       device.open().await?;
//!       device.set_parameters([
//!           ParameterCode::Rs,
//!           ParameterCode::Cp,
//!           ParameterCode::Off,
//!           ParameterCode::Off,
//!       ]).await?;
//!       device.set_speed(Speed::Medium).await?;
//!       device.parameters().await?;
//!       println!("{}", device.measure().await?);
//!       device.close().await
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * Hioki IM3536
//!

pub mod config;
pub mod device;
pub mod measurement;
pub mod proto;

pub use device::Device;
pub use proto::Result;

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default RS-232 baudrate of the IM3536.
pub const DEFAULT_BAUDRATE: u32 = 9600;
