use arrayvec::ArrayVec;

use crate::{IDLE_FILL, MAX_RESPONSE_LEN};

/// Receive buffer for one reply. Idle-fill bytes are dropped on write, so
/// everything kept is a candidate frame byte.
#[derive(Debug, Default)]
pub(crate) struct Buffer {
    data: ArrayVec<u8, MAX_RESPONSE_LEN>,
    overflow: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of non-fill bytes that didn't fit.
    pub fn overflow(&self) -> usize {
        self.overflow
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter().copied().filter(|b| *b != IDLE_FILL) {
            if self.data.try_push(byte).is_err() {
                self.overflow += 1;
            }
        }
    }
}
