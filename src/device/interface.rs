use flate2::read::GzDecoder;
use serialport::SerialPort;

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, Read},
};

/// [Interface] to the NMEA stream
pub enum Interface {
    /// [Interface::ReadOnly] is dedicated to read only input: captured NMEA files,
    /// consumed one after the other.
    ReadOnly(VecDeque<Box<dyn Read + Send>>),

    /// [Interface::Port] is used to connect to a physical port
    Port(Box<dyn SerialPort>),
}

impl Interface {
    /// Creates a new [SerialPort] interface
    pub fn from_serial_port(port: Box<dyn SerialPort>) -> Self {
        Self::Port(port)
    }

    /// Creates a new Read-Only interface
    pub fn from_file_handle(handle: File) -> Self {
        let mut handles = VecDeque::<Box<dyn Read + Send>>::with_capacity(1);
        handles.push_back(Box::new(BufReader::new(handle)));
        Self::ReadOnly(handles)
    }

    /// Creates a new Read-Only interface from a gzip compressed file
    pub fn from_gzip_file_handle(handle: File) -> Self {
        let mut handles = VecDeque::<Box<dyn Read + Send>>::with_capacity(1);
        handles.push_back(Box::new(GzDecoder::new(BufReader::new(handle))));
        Self::ReadOnly(handles)
    }

    /// Appends a file to a Read-Only interface. No effect on a serial port.
    pub fn stack_file_handle(&mut self, handle: File) {
        if let Self::ReadOnly(handles) = self {
            handles.push_back(Box::new(BufReader::new(handle)));
        }
    }

    /// Appends a gzip compressed file to a Read-Only interface.
    pub fn stack_gzip_file_handle(&mut self, handle: File) {
        if let Self::ReadOnly(handles) = self {
            handles.push_back(Box::new(GzDecoder::new(BufReader::new(handle))));
        }
    }
}

impl std::io::Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::ReadOnly(handles) => {
                // moves on to the next file once the current one is exhausted
                while let Some(handle) = handles.front_mut() {
                    let size = handle.read(buf)?;
                    if size > 0 || buf.is_empty() {
                        return Ok(size);
                    }
                    handles.pop_front();
                }
                Ok(0)
            },
            Self::Port(port) => port.read(buf),
        }
    }
}
