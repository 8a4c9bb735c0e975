#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

/*
 * COLDTRACK: cold storage asset tracking.
 * Samples GPS position, temperature and humidity and publishes them over MQTT.
 * This program is shipped under Mozilla Public V2 license.
 */

use env_logger::{Builder, Env, Target};

use log::{error, info, warn};

use tokio::{
    signal,
    sync::mpsc,
    time::sleep,
};

use hifitime::prelude::{Duration, Epoch};

mod cli;
mod device;
mod error;
mod network;
mod nmea;
mod publisher;
mod runtime;
mod sampler;
mod sensor;
mod utils;

use crate::{
    cli::Cli,
    device::Device,
    error::Error,
    network::{local_ip, wait_for_network},
    publisher::{Message, Publisher, report::Report, session::Session},
    runtime::Runtime,
    sampler::{Acquisition, Sampler},
    utils::{round2, to_std_duration},
};

/// Network poll interval
const NETWORK_POLL: std::time::Duration = std::time::Duration::from_secs(5);

/// Dead time between cycles in passive mode
const PASSIVE_DEAD_TIME: std::time::Duration = std::time::Duration::from_millis(50);

fn banner() {
    info!("+---------------------------------------+");
    info!("| 5G Cold Asset Tracking and Monitoring |");
    info!("+---------------------------------------+");
}

#[tokio::main]
pub async fn main() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder
        .target(Target::Stdout)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    if let Err(e) = run().await {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let cfg_precision = Duration::from_seconds(1.0);

    let cli = Cli::new();

    banner();

    // Input interface
    let device = if let Some(serial) = cli.serial_port() {
        // active mode (GPS module)
        Device::open_serial_port(serial, cli.baud_rate())?
    } else {
        // passive mode (input files)
        Device::open_files(&cli.filepaths())?
    };

    let read_only = device.is_read_only();

    let mut hygrometer = cli.hygrometer()?;

    let mqtt_settings = cli.mqtt_settings();

    // network attachment
    info!("waiting for the network to be connected..");

    let remote = tokio::select! {
        addr = wait_for_network(&mqtt_settings.broker, mqtt_settings.port, NETWORK_POLL) => addr,
        _ = signal::ctrl_c() => {
            info!("interrupted");
            return Ok(());
        },
    };

    match local_ip(remote) {
        Ok(ip) => info!("this device's IP address is {}", ip),
        Err(e) => warn!("failed to determine local IP address: {}", e),
    }

    // MQTT session
    info!(
        "connecting to {}:{}..",
        mqtt_settings.broker, mqtt_settings.port
    );

    let session = tokio::select! {
        session = Session::connect(&mqtt_settings, |topic, message| {
            info!("message received - {}: {}", topic, message);
        }) => session?,
        _ = signal::ctrl_c() => {
            info!("interrupted");
            return Ok(());
        },
    };

    let (tx, rx) = mpsc::channel(16);

    let mut publisher = Publisher::new(session, &mqtt_settings.topic, rx);

    let mut publisher_handle = tokio::spawn(async move { publisher.run().await });

    // main task
    let mut sampler = Sampler::new(device, cli.sampler_settings());

    let period = to_std_duration(cli.period());

    let mut rtm = Runtime::new(Epoch::now()?);
    info!("{} - application deployed", rtm.utc_time().round(cfg_precision));

    loop {
        rtm.new_epoch(Epoch::now()?);
        let t = rtm.utc_time().round(cfg_precision);

        let acquisition = tokio::task::block_in_place(|| sampler.acquire());
        rtm.new_cycle(&acquisition);

        if acquisition == Acquisition::EndOfStream {
            info!("{} - consumed all content", t);
            break;
        }

        let temperature = hygrometer.read_temperature();
        let humidity = hygrometer.read_humidity();

        if let Ok(temperature) = &temperature {
            info!("{} - temperature: {} °C", t, round2(*temperature));
        }
        if let Ok(humidity) = &humidity {
            info!("{} - humidity: {} %", t, round2(*humidity));
        }

        match Report::from_cycle(&acquisition, temperature, humidity) {
            Ok(Some(report)) => {
                info!("{} - latitude: {}", t, report.lat);
                info!("{} - longitude: {}", t, report.lon);
                info!("{} - publishing {}", t, report);

                if tx.send(Message::Report(report)).await.is_err() {
                    error!("{} - publisher is gone", t);
                    break;
                }
            },
            Ok(None) => {
                warn!("{} - no GPS fix - not publishing", t);
            },
            Err(e) => {
                error!("{} - failed to read sensor: {} - not publishing", t, e);
            },
        }

        let dead_time = if read_only { PASSIVE_DEAD_TIME } else { period };

        tokio::select! {
            _ = sleep(dead_time) => {},
            _ = signal::ctrl_c() => {
                info!("{} - interrupted", rtm.utc_time().round(cfg_precision));
                break;
            },
            result = &mut publisher_handle => {
                // terminated on its own: fatal error
                return match result {
                    Ok(Err(e)) => Err(e),
                    _ => Err(Error::PublisherStopped),
                };
            },
        }
    }

    info!(
        "{} - {} cycles, {} fixes, uptime {}",
        rtm.utc_time().round(cfg_precision),
        rtm.cycles,
        rtm.fixes,
        rtm.uptime.round(cfg_precision)
    );

    let _ = tx.send(Message::Shutdown).await;

    match publisher_handle.await {
        Ok(result) => result,
        Err(_) => Err(Error::PublisherStopped),
    }
}
