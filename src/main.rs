#![deny(clippy::unwrap_used)]

use chrono::Local;
use clap::{arg, command, value_parser};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use im3536ctrl::config::{check_frequency, load_settings, Settings};
use im3536ctrl::proto::command::{Mode, MonitorChannel, Speed};
use im3536ctrl::proto::{self, Result};
use im3536ctrl::Device;

#[tokio::main]
async fn main() {
    let matches = command!() // requires `cargo` feature
        .arg(
            arg!(
                -p --device <PORT> "Port for USB adapter [default: from config]"
            )
            .required(false),
        )
        .arg(
            arg!(
                -b --baudrate <BAUDRATE> "Baudrate [default: from config]"
            )
            .required(false)
            .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(
                -c --config <FILE> "Settings file (TOML)"
            )
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(
            -d --debug ... "Turn debugging information on"
        ))
        .subcommand(clap::Command::new("apply").about("Apply the measurement settings"))
        .subcommand(clap::Command::new("parameters").about("Active parameters and units"))
        .subcommand(
            clap::Command::new("frequency")
                .about("Measurement frequency")
                .arg(arg!([hz] "Set frequency in Hz").value_parser(value_parser!(f64))),
        )
        .subcommand(
            clap::Command::new("speed")
                .about("Measurement speed")
                .arg(arg!(<speed> "Set speed").value_parser(value_parser!(Speed))),
        )
        .subcommand(
            clap::Command::new("mode")
                .about("Measurement mode")
                .arg(arg!(<mode> "Set mode").value_parser(value_parser!(Mode))),
        )
        .subcommand(clap::Command::new("monitor").about("Voltage and current monitor values"))
        .subcommand(
            clap::Command::new("measure")
                .about("Trigger measurements")
                .arg(
                    arg!(-n --count <COUNT> "Number of measurements")
                        .default_value("1")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    arg!(-i --interval <MS> "Pause between measurements in milliseconds")
                        .default_value("0")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            clap::Command::new("reset")
                .about("Reset measurement settings")
                .arg(arg!(--all "Full instrument reset (*RST)")),
        )
        .subcommand_required(true)
        .get_matches();

    let level = match matches.get_count("debug") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = match load_settings(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))
    {
        Ok(mut settings) => {
            if let Some(port) = matches.get_one::<String>("device") {
                settings.port = port.clone();
            }
            if let Some(baudrate) = matches.get_one::<u32>("baudrate") {
                settings.baudrate = *baudrate;
            }
            settings
        }
        Err(e) => {
            eprintln!("{}", e);
            exit(-1);
        }
    };

    if let Err(e) = handle_args(&matches, &settings).await {
        match e {
            proto::ProtoError::Serial(err) => {
                if err.kind() == tokio_serial::ErrorKind::NoDevice
                    || matches!(err.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
                {
                    eprintln!("{}: File not found", settings.port);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", err, settings.port);
                }
            }
            proto::ProtoError::Io(err) => {
                if err.kind() == ErrorKind::NotFound {
                    eprintln!("{}: File not found", settings.port);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", err, settings.port);
                }
            }
            proto::ProtoError::ParseFloat { text, .. } => {
                if text.is_empty() {
                    eprintln!("No reply from device, is it connected and powered on?");
                } else {
                    eprintln!("Received an unexpected response from device: {:?}", text);
                }
            }
            proto::ProtoError::Abort | proto::ProtoError::NotOpen => {
                eprintln!("Failed to communicate with device, aborting!");
            }
            err => {
                eprintln!("{}", err);
            }
        }
        exit(-1);
    }
}

async fn handle_args(matches: &clap::ArgMatches, settings: &Settings) -> Result<()> {
    let mut device = Device::new(&settings.port, settings.baudrate);
    device.open().await?;
    eprintln!("Connected to: {}\n", settings.port);

    let result = run(&mut device, matches, settings).await;
    let closed = device.close().await;
    result.and(closed)
}

async fn run(device: &mut Device, matches: &clap::ArgMatches, settings: &Settings) -> Result<()> {
    match matches.subcommand() {
        Some(("apply", _args)) => {
            settings.validate()?;
            device.apply_settings(settings).await?;
            println!("OK");
        }
        Some(("parameters", _args)) => {
            device.set_monitor_value_enabled(settings.im3536.acquire_monitor);
            let units = device.parameters().await?;
            for (quantity, unit) in units.iter() {
                if unit.is_empty() {
                    println!("{}", quantity);
                } else {
                    println!("{} [{}]", quantity, unit);
                }
            }
        }
        Some(("frequency", args)) => {
            if let Some(hz) = args.get_one::<f64>("hz") {
                // Write value
                check_frequency(*hz)?;
                device.set_frequency(*hz).await?;
                println!("OK");
            } else {
                // Read value
                println!("Frequency: {} Hz", device.frequency().await?);
            }
        }
        Some(("speed", args)) => {
            if let Some(speed) = args.get_one::<Speed>("speed") {
                device.set_speed(*speed).await?;
                println!("OK");
            }
        }
        Some(("mode", args)) => {
            if let Some(mode) = args.get_one::<Mode>("mode") {
                device.set_mode(*mode).await?;
                println!("OK");
            }
        }
        Some(("monitor", _args)) => {
            let values = device.monitor_values().await?;
            for (channel, value) in MonitorChannel::ALL.iter().zip(values) {
                println!("{}: {} {}", channel, value, channel.unit());
            }
        }
        Some(("measure", args)) => {
            let count = args.get_one::<u32>("count").copied().unwrap_or(1);
            let interval =
                Duration::from_millis(args.get_one::<u64>("interval").copied().unwrap_or(0));
            device.set_monitor_value_enabled(settings.im3536.acquire_monitor);
            device.reset_buffer()?;
            for i in 0..count {
                if i > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                let mea = device.measure().await?;
                println!("{}  {}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"), mea);
            }
        }
        Some(("reset", args)) => {
            if args.get_flag("all") {
                device.reset_all().await?;
            } else {
                device.reset_current_settings().await?;
            }
            println!("OK");
        }
        _ => {
            unreachable!("subcommand is required")
        }
    }
    Ok(())
}
