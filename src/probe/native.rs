//! Probe host backed by the running process.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::{ulog_debug, Error, Result};

use super::memory::{BufferKind, SharedMemory};
use super::Host;

/// How long the probe thread gets to acknowledge the posted region.
const POST_TIMEOUT: Duration = Duration::from_secs(2);

/// Written by the probe thread, read back by the caller.
const SENTINEL: u8 = 0xA5;

const MODULE_MAGIC: &[u8; 4] = b"\0asm";
const MODULE_VERSION: u32 = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHost;

impl NativeHost {
    pub fn new() -> Self {
        Self
    }
}

/// Each step maps onto the running process:
///
/// - module engine: the target has a process loader for native engine
///   binaries, which is fixed at compile time. Whether the configured engine
///   binary exists is checked later, at spawn, by `ProcessSpawner::resolve`.
/// - shared buffer: the host can run more than one thread of control; memory
///   shared between threads is `Arc<[AtomicU8]>`.
/// - atomics: the target has pointer-width atomic operations.
impl Host for NativeHost {
    fn has_module_engine(&self) -> bool {
        cfg!(any(unix, windows))
    }

    fn validate_module(&self, bytes: &[u8]) -> bool {
        let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
            return false;
        };
        let Some((version, _)) = rest.split_first_chunk::<4>() else {
            return false;
        };
        magic == MODULE_MAGIC && u32::from_le_bytes(*version) == MODULE_VERSION
    }

    /// `available_parallelism` fails only where threads cannot be queried,
    /// which is where a cross-thread region has no second thread to reach.
    fn has_shared_buffer(&self) -> bool {
        thread::available_parallelism().is_ok()
    }

    fn has_atomics(&self) -> bool {
        cfg!(target_has_atomic = "ptr")
    }

    fn alloc_shared(&self, initial: usize, maximum: usize) -> Result<SharedMemory> {
        SharedMemory::new(initial, maximum, BufferKind::Shared)
    }

    fn post_to_self(&self, memory: &SharedMemory) -> Result<()> {
        let (region_tx, region_rx) = crossbeam_channel::bounded::<Arc<[AtomicU8]>>(1);
        let (ack_tx, ack_rx) = crossbeam_channel::bounded::<()>(1);

        let receiver = thread::Builder::new()
            .name("ucicon-probe".to_string())
            .spawn(move || {
                if let Ok(region) = region_rx.recv() {
                    if let Some(first) = region.first() {
                        first.store(SENTINEL, Ordering::Release);
                    }
                    let _ = ack_tx.send(());
                }
            })?;

        region_tx
            .send(memory.handle())
            .map_err(|_| Error::Capability("probe thread hung up".to_string()))?;
        ack_rx
            .recv_timeout(POST_TIMEOUT)
            .map_err(|_| Error::Timeout(POST_TIMEOUT))?;
        receiver
            .join()
            .map_err(|_| Error::TaskJoin("probe thread panicked".to_string()))?;

        let seen = memory
            .handle()
            .first()
            .map(|b| b.load(Ordering::Acquire))
            .unwrap_or_default();
        ulog_debug!("Probe region round trip: sentinel={:#x}", seen);
        if seen != SENTINEL {
            return Err(Error::Capability(
                "store from probe thread not visible".to_string(),
            ));
        }
        Ok(())
    }
}
