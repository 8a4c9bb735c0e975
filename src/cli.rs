use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command, value_parser};
use hifitime::prelude::Duration;

use crate::{
    error::Error,
    publisher::settings::Settings as MqttSettings,
    sampler::Settings as SamplerSettings,
    sensor::{FixedHygrometer, Hygrometer, IioHygrometer},
    utils::{parse_duration, to_std_duration},
};

use std::path::PathBuf;

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

fn period_parser(s: &str) -> Result<Duration, String> {
    parse_duration(s, Duration::from_seconds(1.0))
}

fn delay_parser(s: &str) -> Result<Duration, String> {
    parse_duration(s, Duration::ZERO)
}

fn keepalive_parser(s: &str) -> Result<Duration, String> {
    parse_duration(s, Duration::from_seconds(5.0))
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    fn from_matches(matches: ArgMatches) -> Self {
        Self { matches }
    }

    fn command() -> Command {
        Command::new("coldtrack")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Cold storage asset tracker: publishes GPS position, temperature and humidity over MQTT")
            .color(ColorChoice::Always)
            .arg_required_else_help(true)
            .next_help_heading("Serial port (Active device, GPS module)")
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .required_unless_present_any(["file"])
                    .conflicts_with("file")
                    .help("Define serial port. Example /dev/ttyUSB0 on Linux"),
            )
            .arg(
                Arg::new("baudrate")
                    .short('b')
                    .long("baud")
                    .value_name("Baudrate (u32)")
                    .value_parser(value_parser!(u32))
                    .default_value("9600")
                    .help("Define serial port baud rate. The port is always configured 8N1."),
            )
            .next_help_heading("File interface (Passive mode)")
            .arg(
                Arg::new("file")
                    .long("file")
                    .short('f')
                    .value_name("FILENAME")
                    .action(ArgAction::Append)
                    .required_unless_present_any(["port"])
                    .help("Replay captured NMEA content. Use as many as needed.
Each file is consumed one after the other. Gzip files are supported but they must be terminated with '.gz'"),
            )
            .next_help_heading("GPS acquisition")
            .arg(
                Arg::new("attempts")
                    .long("attempts")
                    .value_parser(value_parser!(u32).range(1..))
                    .default_value("3")
                    .help("Maximal number of GPS reads per sampling cycle"),
            )
            .arg(
                Arg::new("settle")
                    .long("settle")
                    .value_parser(delay_parser)
                    .default_value("1 s")
                    .help("Dead time between serial port configuration and read"),
            )
            .arg(
                Arg::new("read-timeout")
                    .long("read-timeout")
                    .value_parser(period_parser)
                    .default_value("5 s")
                    .help("Maximal time to wait for GPS data, per read"),
            )
            .next_help_heading("Temperature / Humidity sensor")
            .arg(
                Arg::new("iio")
                    .long("iio")
                    .value_name("DIR")
                    .value_parser(value_parser!(PathBuf))
                    .required_unless_present_all(["temperature", "humidity"])
                    .help("IIO device directory of the sensor. Example /sys/bus/iio/devices/iio:device0"),
            )
            .arg(
                Arg::new("temperature")
                    .long("temperature")
                    .value_parser(value_parser!(f64))
                    .allow_negative_numbers(true)
                    .requires("humidity")
                    .conflicts_with("iio")
                    .help("Report a constant temperature (°C), when no sensor is attached"),
            )
            .arg(
                Arg::new("humidity")
                    .long("humidity")
                    .value_parser(value_parser!(f64))
                    .requires("temperature")
                    .conflicts_with("iio")
                    .help("Report a constant relative humidity (%), when no sensor is attached"),
            )
            .next_help_heading("MQTT")
            .arg(
                Arg::new("broker")
                    .long("broker")
                    .default_value("mqtt.mediumone.com")
                    .help("MQTT broker host"),
            )
            .arg(
                Arg::new("mqtt-port")
                    .long("mqtt-port")
                    .value_parser(value_parser!(u16))
                    .help("MQTT broker port. Default is 1883, 8883 with --tls"),
            )
            .arg(
                Arg::new("client-id")
                    .long("client-id")
                    .default_value("clientID")
                    .help("MQTT client identifier. Should be unique for each device connected."),
            )
            .arg(
                Arg::new("topic")
                    .long("topic")
                    .default_value("cold_storage_asset_tracking")
                    .help("Topic to publish to, and subscribe to"),
            )
            .arg(
                Arg::new("username")
                    .long("username")
                    .help("MQTT user name"),
            )
            .arg(
                Arg::new("password")
                    .long("password")
                    .requires("username")
                    .help("MQTT password"),
            )
            .arg(
                Arg::new("tls")
                    .long("tls")
                    .action(ArgAction::SetTrue)
                    .help("Connect over TLS, using the platform root certificates"),
            )
            .arg(
                Arg::new("keepalive")
                    .long("keepalive")
                    .value_parser(keepalive_parser)
                    .default_value("60 s")
                    .help("MQTT keep alive interval"),
            )
            .arg(
                Arg::new("max-reconnect")
                    .long("max-reconnect")
                    .value_parser(value_parser!(u32))
                    .default_value("8")
                    .help("Give up after this many consecutive failed connection attempts"),
            )
            .next_help_heading("Sampling")
            .arg(
                Arg::new("period")
                    .long("period")
                    .value_parser(period_parser)
                    .default_value("30 s")
                    .help("Sampling period. Default value is 30s."),
            )
    }

    /// Returns User serial port specification
    pub fn serial_port(&self) -> Option<&String> {
        self.matches.get_one::<String>("port")
    }

    /// Input file paths
    pub fn filepaths(&self) -> Vec<String> {
        if let Some(fp) = self.matches.get_many::<String>("file") {
            fp.cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Returns User baud rate specification
    pub fn baud_rate(&self) -> u32 {
        self.matches
            .get_one::<u32>("baudrate")
            .copied()
            .unwrap_or(9600)
    }

    fn duration(&self, id: &str) -> Option<Duration> {
        self.matches.get_one::<Duration>(id).copied()
    }

    /// Sampling period
    pub fn period(&self) -> Duration {
        self.duration("period")
            .unwrap_or(Duration::from_seconds(30.0))
    }

    pub fn sampler_settings(&self) -> SamplerSettings {
        let mut settings = SamplerSettings::default();

        if let Some(attempts) = self.matches.get_one::<u32>("attempts") {
            settings.attempts = *attempts;
        }
        if let Some(settle) = self.duration("settle") {
            settings.settle = to_std_duration(settle);
        }
        if let Some(timeout) = self.duration("read-timeout") {
            settings.read_timeout = to_std_duration(timeout);
        }
        settings
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        let tls = self.matches.get_flag("tls");

        let string = |id: &str| self.matches.get_one::<String>(id).cloned();

        MqttSettings {
            tls,
            broker: string("broker").unwrap_or_else(|| "mqtt.mediumone.com".to_string()),
            port: match self.matches.get_one::<u16>("mqtt-port") {
                Some(port) => *port,
                None if tls => 8883,
                None => 1883,
            },
            client_id: string("client-id").unwrap_or_else(|| "clientID".to_string()),
            topic: string("topic").unwrap_or_else(|| "cold_storage_asset_tracking".to_string()),
            username: string("username"),
            password: string("password"),
            keepalive: to_std_duration(
                self.duration("keepalive")
                    .unwrap_or(Duration::from_seconds(60.0)),
            ),
            max_reconnect: self
                .matches
                .get_one::<u32>("max-reconnect")
                .copied()
                .unwrap_or(8),
        }
    }

    /// Temperature / Humidity sensor
    pub fn hygrometer(&self) -> Result<Box<dyn Hygrometer>, Error> {
        if let Some(path) = self.matches.get_one::<PathBuf>("iio") {
            return Ok(Box::new(IioHygrometer::new(path)?));
        }

        let temperature = self.matches.get_one::<f64>("temperature").copied();
        let humidity = self.matches.get_one::<f64>("humidity").copied();

        match (temperature, humidity) {
            (Some(temperature), Some(humidity)) => Ok(Box::new(FixedHygrometer {
                temperature,
                humidity,
            })),
            _ => Err(Error::Sensor(
                "requires either --iio or --temperature and --humidity".to_string(),
            )),
        }
    }
}
