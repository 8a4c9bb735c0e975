use log::{debug, trace};

use serialport::{DataBits, Parity, StopBits};

mod interface;

use interface::Interface;

use std::{
    fs::File,
    io::{Error as IoError, ErrorKind, Read},
    time::{Duration, Instant},
};

use crate::{
    error::Error,
    nmea::{GNGGA_MARK, GNGSA_MARK},
};

/// Upper bound of a single blob. Beyond that, the stream is most likely
/// not carrying the sentences we expect and we hand over what we have.
const MAX_BLOB_SIZE: usize = 16_384;

/// Serial port parameters, reapplied on every reinitialization
#[derive(Debug, Clone)]
struct SerialSettings {
    port: String,
    baud: u32,
}

pub struct Device {
    /// Set when attached to hardware
    serial: Option<SerialSettings>,

    /// Current [Interface], None while a serial port is released
    interface: Option<Interface>,

    /// Bytes received but not yet handed over
    pending: Vec<u8>,
}

impl Device {
    fn serial_interface(settings: &SerialSettings) -> Result<Interface, Error> {
        let port = serialport::new(&settings.port, settings.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(Duration::from_millis(250))
            .open()?;

        Ok(Interface::from_serial_port(port))
    }

    /// Attaches to a GPS receiver (8N1 at given baud rate).
    pub fn open_serial_port(port: &str, baud: u32) -> Result<Self, Error> {
        let serial = SerialSettings {
            port: port.to_string(),
            baud,
        };

        let interface = Self::serial_interface(&serial)?;
        debug!("opened {} ({} bauds, 8N1)", port, baud);

        Ok(Self {
            serial: Some(serial),
            interface: Some(interface),
            pending: Vec::with_capacity(MAX_BLOB_SIZE),
        })
    }

    /// Opens captured NMEA files (passive mode), consumed in order.
    /// Files terminated by ".gz" are decompressed on the fly.
    pub fn open_files(fullpaths: &[String]) -> Result<Self, Error> {
        let (first, others) = fullpaths.split_first().ok_or_else(|| {
            IoError::new(ErrorKind::InvalidInput, "requires at least one input file")
        })?;

        let handle = File::open(first)?;

        let mut interface = if first.ends_with(".gz") {
            Interface::from_gzip_file_handle(handle)
        } else {
            Interface::from_file_handle(handle)
        };

        for fullpath in others {
            let handle = File::open(fullpath)?;

            if fullpath.ends_with(".gz") {
                interface.stack_gzip_file_handle(handle);
            } else {
                interface.stack_file_handle(handle);
            }
        }

        Ok(Self {
            serial: None,
            interface: Some(interface),
            pending: Vec::with_capacity(MAX_BLOB_SIZE),
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.serial.is_none()
    }

    /// Reconfigures the serial port, discarding everything received so far.
    /// No effect in passive mode.
    pub fn reinit(&mut self) -> Result<(), Error> {
        if let Some(serial) = &self.serial {
            self.interface = None;
            self.pending.clear();
            self.interface = Some(Self::serial_interface(serial)?);
            trace!("{} reinitialized", serial.port);
        }
        Ok(())
    }

    /// Releases the serial port until next [Device::reinit].
    /// No effect in passive mode.
    pub fn deinit(&mut self) {
        if self.serial.is_some() {
            self.interface = None;
        }
    }

    /// Reads one blob of text, terminated right after the first `$GNGSA` mark
    /// that follows a `$GNGGA` mark. Remaining bytes are kept for the next call.
    ///
    /// ## Returns
    /// - Ok(Some(blob)) once a blob was gathered. The blob may not contain the marks
    ///   when `timeout` expired or the size limit was reached.
    /// - Ok(None) once all passive content has been consumed
    /// - Err(e) on I/O error, or when nothing was received within `timeout`
    pub fn read_blob(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<String>, Error> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(end) = blob_end(&self.pending) {
                return Ok(Some(self.take(end)));
            }

            if self.pending.len() >= MAX_BLOB_SIZE {
                return Ok(Some(self.take(self.pending.len())));
            }

            let nbytes = self.read_interface(buffer)?;

            if nbytes > 0 {
                self.pending.extend_from_slice(&buffer[..nbytes]);
                continue;
            }

            if self.is_read_only() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take(self.pending.len())));
            }

            if Instant::now() >= deadline {
                if self.pending.is_empty() {
                    return Err(IoError::new(ErrorKind::TimedOut, "no data received").into());
                }
                return Ok(Some(self.take(self.pending.len())));
            }
        }
    }

    fn take(&mut self, size: usize) -> String {
        let blob = self.pending.drain(..size).collect::<Vec<_>>();
        String::from_utf8_lossy(&blob).into_owned()
    }

    /// Reads internal [Interface], converting timeouts into "No Data Received",
    /// which is most convenient when polling a serial port.
    fn read_interface(&mut self, output: &mut [u8]) -> Result<usize, Error> {
        let interface = self
            .interface
            .as_mut()
            .ok_or_else(|| IoError::new(ErrorKind::NotConnected, "interface released"))?;

        match interface.read(output) {
            Ok(b) => Ok(b),
            Err(e) => {
                if e.kind() == ErrorKind::TimedOut {
                    Ok(0)
                } else {
                    Err(e.into())
                }
            },
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Returns the blob length, up to and including the `$GNGSA` mark
/// that follows the first `$GNGGA` mark.
fn blob_end(data: &[u8]) -> Option<usize> {
    let gga = find(data, GNGGA_MARK.as_bytes())?;
    let after_gga = gga + GNGGA_MARK.len();
    let gsa = find(&data[after_gga..], GNGSA_MARK.as_bytes())?;
    Some(after_gga + gsa + GNGSA_MARK.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    const NMEA: &str = "$GNRMC,092751.000,A,5321.6802,N,00630.3371,W,0.06,31.66,280511,,,A*45\r\n\
$GNGGA,092751.000,5321.6802,N,00630.3371,W,1,8,1.03,61.7,M,55.3,M,,*75\r\n\
$GNGSA,A,3,10,07,05,02,29,04,08,13,,,,,1.72,1.03,1.38*0A\r\n\
$GNRMC,092752.000,A,5321.6803,N,00630.3372,W,0.06,31.66,280511,,,A*46\r\n\
$GNGGA,092752.000,5321.6803,N,00630.3372,W,1,8,1.03,61.7,M,55.3,M,,*77\r\n\
$GNGSA,A,3,10,07,05,02,29,04,08,13,,,,,1.72,1.03,1.38*0A\r\n";

    fn fixture(name: &str, content: &[u8], gzip: bool) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("coldtrack-device-{}-{}", std::process::id(), name));

        let fd = File::create(&path).unwrap();

        if gzip {
            let mut encoder = GzEncoder::new(fd, Compression::new(5));
            encoder.write_all(content).unwrap();
            encoder.finish().unwrap();
        } else {
            let mut fd = fd;
            fd.write_all(content).unwrap();
        }

        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_blob_end() {
        assert_eq!(blob_end(b""), None);
        assert_eq!(blob_end(b"$GNGSA,$GNGGA,"), None);
        assert_eq!(blob_end(b"$GNGGA,1$GNGSA,2"), Some(14));
        assert_eq!(blob_end(b"x$GNGSA$GNGGA,1$GNGSA,2"), Some(21));
    }

    #[test]
    fn test_passive_blobs() {
        let path = fixture("plain.nmea", NMEA.as_bytes(), false);
        let mut device = Device::open_files(&[path]).unwrap();
        assert!(device.is_read_only());

        let mut buffer = [0; 64];
        let timeout = Duration::from_millis(10);

        let first = device.read_blob(&mut buffer, timeout).unwrap().unwrap();
        assert!(first.starts_with("$GNRMC,092751.000"));
        assert!(first.ends_with("$GNGSA"));
        assert!(first.contains("$GNGGA,092751.000"));

        let second = device.read_blob(&mut buffer, timeout).unwrap().unwrap();
        assert!(second.starts_with(",A,3,10"));
        assert!(second.contains("$GNGGA,092752.000"));
        assert!(second.ends_with("$GNGSA"));

        // trailer
        let third = device.read_blob(&mut buffer, timeout).unwrap().unwrap();
        assert!(third.starts_with(",A,3,10"));
        assert!(!third.contains(GNGGA_MARK));

        assert!(device.read_blob(&mut buffer, timeout).unwrap().is_none());
    }

    #[test]
    fn test_stacked_gzip_files() {
        let plain = fixture("stack-1.nmea", b"$GNGGA,1,4030.0000,N,", false);
        let gzip = fixture(
            "stack-2.nmea.gz",
            b"00630.0000,E,1$GNGSA,A,3\r\n",
            true,
        );

        let mut device = Device::open_files(&[plain, gzip]).unwrap();
        let mut buffer = [0; 8];

        let blob = device
            .read_blob(&mut buffer, Duration::from_millis(10))
            .unwrap()
            .unwrap();

        assert_eq!(blob, "$GNGGA,1,4030.0000,N,00630.0000,E,1$GNGSA");
    }

    #[test]
    fn test_no_input_files() {
        assert!(Device::open_files(&[]).is_err());
    }

    #[test]
    fn test_reinit_passive_noop() {
        let path = fixture("reinit.nmea", NMEA.as_bytes(), false);
        let mut device = Device::open_files(&[path]).unwrap();
        device.reinit().unwrap();
        device.deinit();

        let mut buffer = [0; 256];
        assert!(device
            .read_blob(&mut buffer, Duration::from_millis(10))
            .unwrap()
            .is_some());
    }
}
