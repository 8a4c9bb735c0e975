use thiserror::Error;

use crate::nmea::ParsingError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("nmea error: {0}")]
    Nmea(#[from] ParsingError),

    #[error("sensor error: {0}")]
    Sensor(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("system time error: {0}")]
    Time(#[from] hifitime::HifitimeError),

    #[error("mqtt client error: {0}")]
    MqttClient(#[from] rumqttc::ClientError),

    #[error("broker unreachable: gave up after {0} attempts")]
    ReconnectExhausted(u32),

    #[error("mqtt link failed")]
    LinkFailed,

    #[error("publisher stopped")]
    PublisherStopped,
}
