//! Capability probe for multi-threaded engine execution.
//!
//! Before a worker is spawned, the host is checked for everything a
//! multi-threaded, shared-memory engine needs. The checks run in a fixed order
//! and stop at the first failure:
//!
//! 1. a module engine that accepts the minimal 8-byte module header
//! 2. a cross-thread buffer type
//! 3. atomic memory operations
//! 4. a shared region of 8 pages (max 16) backed by cross-thread storage
//! 5. handing that region to another thread via message passing
//! 6. growing the region by 8 pages (advisory: logged, never gating)
//!
//! Nothing here returns an error. Failures are logged and folded into the
//! verdict.

pub mod memory;
pub mod native;

use serde::Serialize;

use crate::{ulog, ulog_debug, ulog_warn, Result};

pub use memory::{BufferKind, SharedMemory, PAGE_SIZE};
pub use native::NativeHost;

/// The smallest well-formed module: magic `\0asm` followed by version 1.
pub const MODULE_HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

pub const INITIAL_PAGES: usize = 8;
pub const MAXIMUM_PAGES: usize = 16;
pub const GROW_PAGES: usize = 8;

/// What the probe needs from the environment it runs in.
pub trait Host {
    fn has_module_engine(&self) -> bool;

    /// Static validation of a module's bytes.
    fn validate_module(&self, bytes: &[u8]) -> bool;

    fn has_shared_buffer(&self) -> bool;

    fn has_atomics(&self) -> bool;

    fn alloc_shared(&self, initial: usize, maximum: usize) -> Result<SharedMemory>;

    /// Hand `memory` to another thread of control and back.
    fn post_to_self(&self, memory: &SharedMemory) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStep {
    ModuleEngine,
    SharedBuffer,
    Atomics,
    SharedRegion,
    MessagePassing,
    Growth,
}

impl ProbeStep {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeStep::ModuleEngine => "module engine",
            ProbeStep::SharedBuffer => "shared buffer",
            ProbeStep::Atomics => "atomics",
            ProbeStep::SharedRegion => "shared region",
            ProbeStep::MessagePassing => "message passing",
            ProbeStep::Growth => "growth",
        }
    }

    /// Whether a failure of this step changes the verdict.
    pub fn is_gating(&self) -> bool {
        !matches!(self, ProbeStep::Growth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: ProbeStep,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-step record of one probe run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub supported: bool,
    pub steps: Vec<StepOutcome>,
}

impl ProbeReport {
    fn record(&mut self, step: ProbeStep, passed: bool, detail: Option<String>) -> bool {
        if !passed {
            match &detail {
                Some(d) => ulog_warn!("Probe step '{}' failed: {}", step.label(), d),
                None => ulog_warn!("Probe step '{}' failed", step.label()),
            }
        }
        self.steps.push(StepOutcome {
            step,
            passed,
            detail,
        });
        passed
    }

    pub fn outcome(&self, step: ProbeStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// First gating step that failed, if any.
    pub fn failed_step(&self) -> Option<ProbeStep> {
        self.steps
            .iter()
            .find(|s| !s.passed && s.step.is_gating())
            .map(|s| s.step)
    }
}

/// Run every check and keep the per-step outcomes.
pub fn probe_report(host: &dyn Host) -> ProbeReport {
    let mut report = ProbeReport::default();

    let module_ok = host.has_module_engine() && host.validate_module(&MODULE_HEADER);
    if !report.record(ProbeStep::ModuleEngine, module_ok, None) {
        return report;
    }

    if !report.record(ProbeStep::SharedBuffer, host.has_shared_buffer(), None) {
        return report;
    }

    if !report.record(ProbeStep::Atomics, host.has_atomics(), None) {
        return report;
    }

    let mut memory = match host.alloc_shared(INITIAL_PAGES, MAXIMUM_PAGES) {
        Ok(memory) => memory,
        Err(e) => {
            report.record(ProbeStep::SharedRegion, false, Some(e.to_string()));
            return report;
        }
    };
    let shared = memory.is_cross_thread();
    let detail = (!shared).then(|| format!("backing buffer is {:?}", memory.kind()));
    if !report.record(ProbeStep::SharedRegion, shared, detail) {
        return report;
    }

    if let Err(e) = host.post_to_self(&memory) {
        ulog!("Host error {}", e);
        report.record(ProbeStep::MessagePassing, false, Some(e.to_string()));
        return report;
    }
    report.record(ProbeStep::MessagePassing, true, None);

    match memory.grow(GROW_PAGES) {
        Ok(previous) => {
            ulog_debug!("Probe memory grew {} -> {} pages", previous, memory.pages());
            report.record(ProbeStep::Growth, true, None);
        }
        Err(e) => {
            ulog!("Host error {}", e);
            report.record(ProbeStep::Growth, false, Some(e.to_string()));
        }
    }

    report.supported = true;
    report
}

/// Whether the host can run a multi-threaded shared-memory worker.
pub fn probe(host: &dyn Host) -> bool {
    let report = probe_report(host);
    ulog!(
        "Capability probe: supported={} steps={}",
        report.supported,
        report.steps.len()
    );
    report.supported
}
