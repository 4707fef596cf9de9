//! Serial port transport
//!
//! Wraps a [`serialport::SerialPort`]. Direction control, when the adapter
//! needs it, is driven on the RTS line.

use std::{
    io::{Read, Write},
    time::Duration,
};

use log::warn;
use serialport::SerialPort;

use crate::{error::TransportError, transport::Transport};

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    rts_drive_enable: bool,
}

impl SerialTransport {
    /// Open `path` at `baud`, 8N1 as the bus requires.
    pub fn open(path: &str, baud: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(100))
            .open()?;
        Ok(Self::new(port))
    }

    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            rts_drive_enable: false,
        }
    }

    /// Toggle RTS around each write, for transceivers wired that way
    pub fn with_rts_drive_enable(mut self) -> Self {
        self.rts_drive_enable = true;
        self
    }
}

impl Transport for SerialTransport {
    fn bytes_available(&mut self) -> usize {
        match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                warn!("Failed to query serial port: {e}");
                0
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.port.read_exact(buf)?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port.flush()?;
        Ok(())
    }

    fn set_drive_enable(&mut self, on: bool) {
        if !self.rts_drive_enable {
            return;
        }
        if let Err(e) = self.port.write_request_to_send(on) {
            warn!("Failed to set RTS: {e}");
        }
    }
}
