//! Temperature and relative humidity sources.
use log::trace;

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::Error;

/// Temperature (°C) and relative humidity (%) source
pub trait Hygrometer: Send {
    fn read_temperature(&mut self) -> Result<f64, Error>;
    fn read_humidity(&mut self) -> Result<f64, Error>;
}

/// Sensor exposed by a Linux Industrial I/O driver (for example hdc100x),
/// under `/sys/bus/iio/devices/iio:deviceX`.
/// Channels are reported in milli-degrees Celsius and milli-percent.
pub struct IioHygrometer {
    path: PathBuf,
}

impl IioHygrometer {
    pub fn new(path: &Path) -> Result<Self, Error> {
        if !path.is_dir() {
            return Err(Error::Sensor(format!(
                "{}: not an IIO device directory",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn attribute(&self, name: &str) -> Result<Option<f64>, Error> {
        let path = self.path.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;

        let value = content.trim().parse::<f64>().map_err(|e| {
            Error::Sensor(format!("{}: invalid value \"{}\": {}", name, content.trim(), e))
        })?;

        trace!("{} = {}", path.display(), value);
        Ok(Some(value))
    }

    /// Reads a channel, converted to base unit.
    /// Processed `_input` value is preferred, `(raw + offset) * scale` otherwise.
    fn channel(&self, channel: &str) -> Result<f64, Error> {
        if let Some(input) = self.attribute(&format!("in_{}_input", channel))? {
            return Ok(input / 1000.0);
        }

        let raw = self
            .attribute(&format!("in_{}_raw", channel))?
            .ok_or_else(|| Error::Sensor(format!("no {} channel", channel)))?;

        let offset = self
            .attribute(&format!("in_{}_offset", channel))?
            .unwrap_or(0.0);

        let scale = self
            .attribute(&format!("in_{}_scale", channel))?
            .unwrap_or(1.0);

        Ok((raw + offset) * scale / 1000.0)
    }
}

impl Hygrometer for IioHygrometer {
    fn read_temperature(&mut self) -> Result<f64, Error> {
        self.channel("temp")
    }

    fn read_humidity(&mut self) -> Result<f64, Error> {
        self.channel("humidityrelative")
    }
}

/// Constant readings, for bench setups without sensor
pub struct FixedHygrometer {
    pub temperature: f64,
    pub humidity: f64,
}

impl Hygrometer for FixedHygrometer {
    fn read_temperature(&mut self) -> Result<f64, Error> {
        Ok(self.temperature)
    }

    fn read_humidity(&mut self) -> Result<f64, Error> {
        Ok(self.humidity)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn iio_device(name: &str, attributes: &[(&str, &str)]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("coldtrack-iio-{}-{}", std::process::id(), name));

        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).unwrap();

        for (attribute, value) in attributes {
            fs::write(path.join(attribute), format!("{}\n", value)).unwrap();
        }
        path
    }

    #[test]
    fn test_raw_offset_scale() {
        // hdc100x like
        let path = iio_device(
            "raw",
            &[
                ("in_temp_raw", "26214"),
                ("in_temp_offset", "-15887.515151"),
                ("in_temp_scale", "2.517700195"),
                ("in_humidityrelative_raw", "32768"),
                ("in_humidityrelative_scale", "1.525878906"),
            ],
        );

        let mut sensor = IioHygrometer::new(&path).unwrap();

        let temperature = sensor.read_temperature().unwrap();
        let humidity = sensor.read_humidity().unwrap();

        assert!((temperature - 26.0).abs() < 0.01, "{}", temperature);
        assert!((humidity - 50.0).abs() < 0.01, "{}", humidity);
    }

    #[test]
    fn test_processed_input() {
        let path = iio_device(
            "input",
            &[
                ("in_temp_input", "4250"),
                ("in_temp_raw", "0"),
                ("in_humidityrelative_input", "81300"),
            ],
        );

        let mut sensor = IioHygrometer::new(&path).unwrap();
        assert_eq!(sensor.read_temperature().unwrap(), 4.25);
        assert_eq!(sensor.read_humidity().unwrap(), 81.3);
    }

    #[test]
    fn test_missing_or_invalid_channel() {
        let path = iio_device("missing", &[("in_temp_raw", "garbage")]);

        let mut sensor = IioHygrometer::new(&path).unwrap();
        assert!(matches!(sensor.read_temperature(), Err(Error::Sensor(_))));
        assert!(matches!(sensor.read_humidity(), Err(Error::Sensor(_))));

        assert!(IioHygrometer::new(&path.join("nowhere")).is_err());
    }

    #[test]
    fn test_fixed() {
        let mut sensor = FixedHygrometer {
            temperature: 3.5,
            humidity: 60.0,
        };
        assert_eq!(sensor.read_temperature().unwrap(), 3.5);
        assert_eq!(sensor.read_humidity().unwrap(), 60.0);
    }
}
