#![cfg_attr(not(any(test, feature = "std")), no_std)]

use core::ops::DerefMut;

/// The call to `push` failed due to overflow
struct Overflow;

/// Where the length byte of a frame lives, and how much framing surrounds
/// the payload it counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Fixed header size, inclusive of the length byte
    pub header_len: usize,
    /// Offset of the single payload length byte within the header
    pub len_offset: usize,
    /// Bytes following the payload (checksum, CRC, ...)
    pub trailer_len: usize,
}

impl FrameLayout {
    pub const fn new(header_len: usize, len_offset: usize, trailer_len: usize) -> Self {
        assert!(len_offset < header_len);
        Self {
            header_len,
            len_offset,
            trailer_len,
        }
    }

    /// Total length of the frame starting at `data`, if the length byte has
    /// been seen yet.
    #[inline]
    pub fn frame_len(&self, data: &[u8]) -> Option<usize> {
        data.get(self.len_offset)
            .map(|&len| self.header_len + len as usize + self.trailer_len)
    }

    /// The largest frame a single length byte can describe
    pub const fn max_frame_len(&self) -> usize {
        self.header_len + u8::MAX as usize + self.trailer_len
    }
}

/// Accumulates bytes from a stream until a complete length-prefixed frame
/// has been seen. No validation happens here: the caller decodes (and
/// checksums) the whole frame once it is complete.
pub struct FrameAccumulator<B: DerefMut<Target = [u8]>> {
    buf: B,
    idx: usize,
    layout: FrameLayout,
}

/// The result of feeding the accumulator.
#[derive(Debug)]
pub enum FeedResult<'input, 'buf> {
    /// Consumed all data, still pending.
    Consumed,

    /// The frame announced a length larger than our storage. The partial
    /// frame has been dropped. Contains remaining section of input, if any.
    OverFull(&'input [u8]),

    /// A complete frame is stored in our storage buffer. The next call to
    /// `feed` starts a new frame.
    Success {
        /// Raw frame bytes, header through trailer.
        data: &'buf [u8],

        /// Remaining data left in the input after this frame.
        remaining: &'input [u8],
    },
}

#[cfg(any(feature = "std", test))]
impl FrameAccumulator<Box<[u8]>> {
    pub fn new_boxslice(layout: FrameLayout) -> Self {
        Self::new(vec![0u8; layout.max_frame_len()].into_boxed_slice(), layout)
    }
}

impl<B: DerefMut<Target = [u8]>> FrameAccumulator<B> {
    /// Create a new accumulator.
    pub fn new(b: B, layout: FrameLayout) -> Self {
        FrameAccumulator {
            buf: b,
            idx: 0,
            layout,
        }
    }

    /// Appends data to the internal buffer, stopping at the end of the first
    /// complete frame.
    pub fn feed<'me, 'input>(&'me mut self, mut input: &'input [u8]) -> FeedResult<'input, 'me> {
        loop {
            // No input? No work!
            if input.is_empty() {
                return FeedResult::Consumed;
            }

            // Until the length byte arrives we only know how much header to take
            let want = self
                .layout
                .frame_len(&self.buf[..self.idx])
                .unwrap_or(self.layout.len_offset + 1);
            let take = (want - self.idx).min(input.len());
            let (head, tail) = input.split_at(take);
            input = tail;

            if self.push(head).is_err() {
                return FeedResult::OverFull(input);
            }

            if self.layout.frame_len(&self.buf[..self.idx]) == Some(self.idx) {
                let used = self.idx;
                self.idx = 0;
                return FeedResult::Success {
                    data: &self.buf[..used],
                    remaining: input,
                };
            }
        }
    }

    /// Drop any partially received frame
    pub fn reset(&mut self) {
        self.idx = 0;
    }

    /// Number of bytes of the current partial frame
    pub fn len(&self) -> usize {
        self.idx
    }

    pub fn is_empty(&self) -> bool {
        self.idx == 0
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    #[inline]
    fn push(&mut self, data: &[u8]) -> Result<(), Overflow> {
        let old_idx = self.idx;
        let new_end = old_idx + data.len();
        if let Some(sli) = self.buf.get_mut(old_idx..new_end) {
            sli.copy_from_slice(data);
            self.idx = new_end;
            Ok(())
        } else {
            self.idx = 0;
            Err(Overflow)
        }
    }

    #[doc(hidden)]
    #[cfg(test)]
    pub fn contents(&self) -> &[u8] {
        &self.buf[..self.idx]
    }
}
