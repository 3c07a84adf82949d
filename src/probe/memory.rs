//! Paged memory region used by the capability probe.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::{Error, Result};

/// Size of one page of probe memory.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Whether a region's backing storage can be seen from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Shared,
    Local,
}

/// A paged byte region with a fixed page ceiling.
///
/// Growing reallocates and copies; handles taken before a grow keep pointing
/// at the old storage.
pub struct SharedMemory {
    buffer: Arc<[AtomicU8]>,
    kind: BufferKind,
    maximum: usize,
}

impl SharedMemory {
    pub fn new(initial: usize, maximum: usize, kind: BufferKind) -> Result<Self> {
        if initial > maximum {
            return Err(Error::Capability(format!(
                "initial size {} exceeds maximum {} pages",
                initial, maximum
            )));
        }
        Ok(Self {
            buffer: allocate(initial * PAGE_SIZE)?,
            kind,
            maximum,
        })
    }

    pub fn pages(&self) -> usize {
        self.buffer.len() / PAGE_SIZE
    }

    pub fn maximum(&self) -> usize {
        self.maximum
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn is_cross_thread(&self) -> bool {
        self.kind == BufferKind::Shared
    }

    /// A new reference to the current backing storage.
    pub fn handle(&self) -> Arc<[AtomicU8]> {
        Arc::clone(&self.buffer)
    }

    /// Grow by `delta` pages, returning the previous page count.
    pub fn grow(&mut self, delta: usize) -> Result<usize> {
        let previous = self.pages();
        let wanted = previous + delta;
        if wanted > self.maximum {
            return Err(Error::Capability(format!(
                "cannot grow {} -> {} pages (maximum {})",
                previous, wanted, self.maximum
            )));
        }

        let grown = allocate(wanted * PAGE_SIZE)?;
        for (dst, src) in grown.iter().zip(self.buffer.iter()) {
            dst.store(src.load(Ordering::Acquire), Ordering::Release);
        }
        self.buffer = grown;
        Ok(previous)
    }
}

fn allocate(len: usize) -> Result<Arc<[AtomicU8]>> {
    let mut bytes: Vec<AtomicU8> = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|e| Error::Capability(format!("allocation of {} bytes failed: {}", len, e)))?;
    bytes.extend((0..len).map(|_| AtomicU8::new(0)));
    Ok(Arc::from(bytes))
}
