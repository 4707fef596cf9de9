//! In-memory transport and clock for driving a [`Node`](crate::Node)
//! without hardware.
//!
//! Both are cheap handles over shared state: keep a clone, hand the other to
//! the node, and script the bus from the outside.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io::ErrorKind,
    rc::Rc,
};

use log::warn;

use crate::{
    clock::Clock,
    error::TransportError,
    transport::Transport,
    wire_frames::{EncodeError, Frame, Header},
};

#[derive(Default)]
struct MockInner {
    rx: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    drive_log: Vec<bool>,
    busy: bool,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct MockBus {
    inner: Rc<RefCell<MockInner>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes that the node will read, as if sent by a peer
    pub fn inject(&self, bytes: &[u8]) {
        self.inner.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn inject_frame(&self, hdr: Header, payload: &[u8]) -> Result<(), EncodeError> {
        let raw = Frame::new(hdr, payload)?.encode();
        self.inject(&raw);
        Ok(())
    }

    /// Report activity on the line even when nothing is queued
    pub fn set_busy(&self, busy: bool) {
        self.inner.borrow_mut().busy = busy;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Everything written so far, one entry per write
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.inner.borrow_mut().written)
    }

    /// Everything written so far, decoded. Writes that do not decode are
    /// logged and skipped.
    pub fn take_frames(&self) -> Vec<Frame> {
        self.take_written()
            .iter()
            .filter_map(|raw| match Frame::decode(raw) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("Node wrote an invalid frame: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn drive_log(&self) -> Vec<bool> {
        self.inner.borrow().drive_log.clone()
    }

    /// Bytes injected but not yet read by the node
    pub fn unread(&self) -> usize {
        self.inner.borrow().rx.len()
    }
}

impl Transport for MockBus {
    fn bytes_available(&mut self) -> usize {
        let inner = self.inner.borrow();
        if inner.busy {
            inner.rx.len().max(1)
        } else {
            inner.rx.len()
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.borrow_mut();
        let n = buf.len();
        if inner.rx.len() < n {
            return Err(TransportError::Io(ErrorKind::WouldBlock));
        }
        for (slot, b) in buf.iter_mut().zip(inner.rx.drain(..n)) {
            *slot = b;
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(TransportError::Io(ErrorKind::TimedOut));
        }
        inner.written.push(bytes.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_drive_enable(&mut self, on: bool) {
        self.inner.borrow_mut().drive_log.push(on);
    }
}

/// A clock that only moves when told to
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn get(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&mut self) -> u64 {
        self.now.get()
    }
}
