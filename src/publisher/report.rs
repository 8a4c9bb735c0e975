use serde::Serialize;

use crate::{error::Error, nmea::Position, sampler::Acquisition};

/// One sampling cycle, as published
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Celsius
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize)]
struct Envelope<'a> {
    event_data: &'a Report,
}

impl Report {
    pub fn new(temperature: f64, humidity: f64, position: Position) -> Self {
        Self {
            temperature,
            humidity,
            lat: position.latitude,
            lon: position.longitude,
        }
    }

    /// Decides what to publish at the end of a sampling cycle.
    /// Nothing is published without a fix (`Ok(None)`),
    /// and a sensor failure skips the cycle as well (`Err`).
    pub fn from_cycle(
        acquisition: &Acquisition,
        temperature: Result<f64, Error>,
        humidity: Result<f64, Error>,
    ) -> Result<Option<Self>, Error> {
        let position = match acquisition {
            Acquisition::Fix(position) => *position,
            Acquisition::NoFix | Acquisition::EndOfStream => return Ok(None),
        };

        Ok(Some(Self::new(temperature?, humidity?, position)))
    }

    /// JSON payload
    pub fn to_json(&self) -> Result<String, Error> {
        let payload = serde_json::to_string(&Envelope { event_data: self })?;
        Ok(payload)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "temperature={:.2}°C humidity={:.2}% lat={} lon={}",
            self.temperature, self.humidity, self.lat, self.lon
        )
    }
}

#[cfg(test)]
mod test {
    use super::Report;
    use crate::{error::Error, nmea::Position, sampler::Acquisition};

    const POSITION: Position = Position {
        latitude: 53.361337,
        longitude: -6.505618,
    };

    fn sensor_failure() -> Result<f64, Error> {
        Err(Error::Sensor("in_temp_raw: no such file".to_string()))
    }

    #[test]
    fn test_cycle_publishes_fix() {
        let report = Report::from_cycle(&Acquisition::Fix(POSITION), Ok(4.5), Ok(80.0))
            .unwrap()
            .unwrap();

        assert_eq!(report, Report::new(4.5, 80.0, POSITION));
    }

    #[test]
    fn test_cycle_skipped_without_fix() {
        for acquisition in [Acquisition::NoFix, Acquisition::EndOfStream] {
            assert_eq!(
                Report::from_cycle(&acquisition, Ok(4.5), Ok(80.0)).unwrap(),
                None
            );
            // no fix takes precedence over sensor failures
            assert_eq!(
                Report::from_cycle(&acquisition, sensor_failure(), Ok(80.0)).unwrap(),
                None
            );
        }
    }

    #[test]
    fn test_cycle_skipped_on_sensor_failure() {
        let fix = Acquisition::Fix(POSITION);

        assert!(matches!(
            Report::from_cycle(&fix, sensor_failure(), Ok(80.0)),
            Err(Error::Sensor(_))
        ));
        assert!(matches!(
            Report::from_cycle(&fix, Ok(4.5), sensor_failure()),
            Err(Error::Sensor(_))
        ));
    }

    #[test]
    fn test_payload() {
        let report = Report::new(
            4.25,
            81.3,
            Position {
                latitude: 53.361337,
                longitude: -6.505618,
            },
        );

        assert_eq!(
            report.to_json().unwrap(),
            r#"{"event_data":{"temperature":4.25,"humidity":81.3,"lat":53.361337,"lon":-6.505618}}"#
        );
    }

    #[test]
    fn test_display() {
        let report = Report {
            temperature: -18.456,
            humidity: 40.0,
            lat: 40.5,
            lon: -99.27572,
        };

        assert_eq!(
            report.to_string(),
            "temperature=-18.46°C humidity=40.00% lat=40.5 lon=-99.27572"
        );
    }
}
