//! The byte channel under a [`Node`](crate::Node)
//!
//! The bus is half-duplex: the only collision detection we have is asking
//! whether bytes are waiting before we speak.

use crate::error::TransportError;

#[cfg(feature = "serialport")]
pub mod serial;

pub trait Transport {
    /// Bytes that can be read right now without blocking
    fn bytes_available(&mut self) -> usize;

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    fn flush(&mut self) -> Result<(), TransportError>;

    /// RS-485 driver direction. Asserted right before a write, released
    /// right after the flush.
    fn set_drive_enable(&mut self, _on: bool) {}
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn bytes_available(&mut self) -> usize {
        (**self).bytes_available()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).read_exact(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }

    fn set_drive_enable(&mut self, on: bool) {
        (**self).set_drive_enable(on)
    }
}
