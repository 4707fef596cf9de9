//! Single slot outbound scheduler
//!
//! At most one frame waits to go out. `Normal` frames leave once the bus has
//! been quiet for the minimum silence; `Arbitration` frames wait a random
//! slot delay so peers answering the same broadcast are unlikely to collide.

use log::info;
use rand::Rng;

use crate::wire_frames::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    None,
    Normal,
    Arbitration,
}

pub struct Scheduler {
    mode: QueueMode,
    tx: Option<Frame>,
    slot_delay_ms: u32,
    min_slot_delay_ms: u32,
    max_slot_delay_ms: u32,
}

impl Scheduler {
    pub fn new(min_slot_delay_ms: u32, max_slot_delay_ms: u32) -> Self {
        Self {
            mode: QueueMode::None,
            tx: None,
            slot_delay_ms: 0,
            min_slot_delay_ms,
            max_slot_delay_ms,
        }
    }

    /// Buffer `frame` for sending, replacing anything already buffered.
    /// Arbitrated sends draw a fresh slot delay.
    pub fn queue<R: Rng>(&mut self, frame: Frame, arbitrate: bool, rng: &mut R) {
        self.tx = Some(frame);
        if arbitrate {
            self.mode = QueueMode::Arbitration;
            self.slot_delay_ms = rng.gen_range(self.min_slot_delay_ms..=self.max_slot_delay_ms);
            info!("Will arbitrate with slot delay of {}ms", self.slot_delay_ms);
        } else {
            self.mode = QueueMode::Normal;
            self.slot_delay_ms = 0;
        }
    }

    /// Required bus silence before the buffered frame may go out
    pub fn delay_ms(&self) -> u32 {
        match self.mode {
            QueueMode::Arbitration => self.slot_delay_ms,
            _ => self.min_slot_delay_ms,
        }
    }

    /// Whether a buffered frame is due, given how long the bus has been quiet
    pub fn is_due(&self, quiet_ms: u64) -> bool {
        self.mode != QueueMode::None && quiet_ms > u64::from(self.delay_ms())
    }

    /// Take the buffered frame, emptying the slot
    pub fn take(&mut self) -> Option<Frame> {
        self.mode = QueueMode::None;
        self.slot_delay_ms = 0;
        self.tx.take()
    }

    pub fn cancel(&mut self) {
        let _ = self.take();
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn pending(&self) -> Option<&Frame> {
        self.tx.as_ref()
    }
}
