use log::{debug, error, trace, warn};

use std::time::Duration;

use crate::{
    device::Device,
    error::Error,
    nmea::{self, Position},
};

#[derive(Debug, Clone)]
pub struct Settings {
    /// Maximal number of GPS reads per cycle
    pub attempts: u32,

    /// Dead time between port configuration and read
    pub settle: Duration,

    /// Dead time between two attempts
    pub retry_delay: Duration,

    /// Maximal time to wait for data, per attempt
    pub read_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of a GPS acquisition
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Acquisition {
    Fix(Position),
    /// No valid fix after all attempts
    NoFix,
    /// Passive input fully consumed
    EndOfStream,
}

pub struct Sampler {
    device: Device,
    settings: Settings,
    buffer: Vec<u8>,
}

impl Sampler {
    pub fn new(device: Device, settings: Settings) -> Self {
        Self {
            device,
            settings,
            buffer: vec![0; 1024],
        }
    }

    /// Attempts to obtain a valid position, up to [Settings::attempts] times.
    /// Blocking.
    pub fn acquire(&mut self) -> Acquisition {
        let read_only = self.device.is_read_only();

        for attempt in 1..=self.settings.attempts {
            debug!(
                "reading GPS data (attempt {}/{})",
                attempt, self.settings.attempts
            );

            match self.attempt() {
                Ok(Acquisition::NoFix) => {
                    warn!("bad GPS signal");
                },
                Ok(acquisition) => return acquisition,
                Err(e) => {
                    error!("problem getting GPS data: {}", e);
                },
            }

            if attempt < self.settings.attempts && !read_only {
                std::thread::sleep(self.settings.retry_delay);
            }
        }

        Acquisition::NoFix
    }

    fn attempt(&mut self) -> Result<Acquisition, Error> {
        self.device.reinit()?;

        if !self.device.is_read_only() {
            std::thread::sleep(self.settings.settle);
        }

        let blob = self
            .device
            .read_blob(&mut self.buffer, self.settings.read_timeout);

        self.device.deinit();

        let blob = match blob? {
            Some(blob) => blob,
            None => return Ok(Acquisition::EndOfStream),
        };

        trace!("received {:?}", blob);

        let fragment = nmea::extract_fragment(&blob);

        let latitude = nmea::decode_latitude(fragment)?;
        let longitude = nmea::decode_longitude(fragment)?;

        debug!(
            "latitude: {} longitude: {}",
            latitude.degrees(),
            longitude.degrees()
        );

        match Position::from_coordinates(latitude, longitude) {
            Some(position) => {
                debug!("fix: {}", position);
                Ok(Acquisition::Fix(position))
            },
            None => Ok(Acquisition::NoFix),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{fs::File, io::Write};

    const NO_FIX: &str = "$GNGGA,092750.000,,,,,0,0,,,M,,M,,*4F\r\n$GNGSA,A,1,,,,,,,,,,,,,,,*00\r\n";
    const FIX: &str = "$GNGGA,092751.000,5321.6802,N,00630.3371,W,1,8,1.03,61.7,M,55.3,M,,*75\r\n$GNGSA,A,3,10,07,05,02,29,04,08,13,,,,,1.72,1.03,1.38*0A\r\n";
    const MALFORMED: &str = "$GNGGA,092751.000,53x1.6802,N,00630.3371,W,1,8*75\r\n$GNGSA,A,3*0A\r\n";

    fn sampler(name: &str, content: &str) -> Sampler {
        let mut path = std::env::temp_dir();
        path.push(format!("coldtrack-sampler-{}-{}", std::process::id(), name));

        let mut fd = File::create(&path).unwrap();
        fd.write_all(content.as_bytes()).unwrap();

        let device = Device::open_files(&[path.to_string_lossy().to_string()]).unwrap();
        Sampler::new(device, Settings::default())
    }

    #[test]
    fn test_fix_on_third_attempt() {
        let content = format!("{}{}{}", NO_FIX, MALFORMED, FIX);
        let mut sampler = sampler("third", &content);

        match sampler.acquire() {
            Acquisition::Fix(position) => {
                assert!((position.latitude - 53.361336667).abs() < 1e-6);
                assert!((position.longitude + 6.505618333).abs() < 1e-6);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_gives_up_after_three_attempts() {
        let content = format!("{}{}{}{}", NO_FIX, NO_FIX, NO_FIX, FIX);
        let mut sampler = sampler("gives-up", &content);

        assert_eq!(sampler.acquire(), Acquisition::NoFix);
        // next cycle picks up where we left
        assert!(matches!(sampler.acquire(), Acquisition::Fix(_)));
        assert_eq!(sampler.acquire(), Acquisition::EndOfStream);
    }

    #[test]
    fn test_end_of_stream() {
        let mut sampler = sampler("empty", "");
        assert_eq!(sampler.acquire(), Acquisition::EndOfStream);
    }
}
