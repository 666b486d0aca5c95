// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Audit Sink
// ─────────────────────────────────────────────────────────────────────
//! Durable audit trail for accepted violations.
//!
//! Writes happen on a background worker fed by a bounded queue, so the
//! escalation path never waits on storage. Delivery is at-most-once: a
//! failed or panicking write is logged and the record is dropped, and
//! a full queue drops the newest record. Live escalation decisions come
//! from the in-memory violation log, never from this trail.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use proctor_types::{AuditRecord, ProctorError, ProctorResult, ViolationEvent};

/// Persistent storage for audit records.
pub trait AuditStore: Send {
    fn append(&mut self, record: &AuditRecord) -> ProctorResult<()>;
}

impl<T: AuditStore + ?Sized> AuditStore for Box<T> {
    fn append(&mut self, record: &AuditRecord) -> ProctorResult<()> {
        (**self).append(record)
    }
}

/// In-memory store. Clones share the same record list.
#[derive(Clone, Default)]
pub struct InMemoryAudit {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditStore for InMemoryAudit {
    fn append(&mut self, record: &AuditRecord) -> ProctorResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesAudit<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesAudit<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> AuditStore for JsonLinesAudit<W> {
    fn append(&mut self, record: &AuditRecord) -> ProctorResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| ProctorError::Audit(format!("write failed: {e}")))
    }
}

type AppendFn = Box<dyn FnMut(&AuditRecord) -> ProctorResult<()> + Send>;

/// Store that delegates to a closure.
///
/// Used by the FFI layer to hand records to a host-side writer.
pub struct ExternalAudit {
    append_fn: AppendFn,
}

impl ExternalAudit {
    pub fn new(append_fn: impl FnMut(&AuditRecord) -> ProctorResult<()> + Send + 'static) -> Self {
        Self {
            append_fn: Box::new(append_fn),
        }
    }
}

impl AuditStore for ExternalAudit {
    fn append(&mut self, record: &AuditRecord) -> ProctorResult<()> {
        (self.append_fn)(record)
    }
}

/// Delivery counters for the audit worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Non-blocking front end to an `AuditStore`.
pub struct AuditSink {
    sender: Option<SyncSender<ViolationEvent>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl AuditSink {
    /// Start a worker thread that owns `store`.
    pub fn spawn(store: impl AuditStore + 'static, capacity: usize) -> ProctorResult<Self> {
        let (sender, receiver) = mpsc::sync_channel::<ViolationEvent>(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);
        let mut store = store;

        let worker = thread::Builder::new()
            .name("proctor-audit".to_string())
            .spawn(move || {
                for event in receiver {
                    let record = AuditRecord::from_event(&event, Utc::now());
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        store.append(&record)
                    }));
                    match outcome {
                        Ok(Ok(())) => {
                            worker_counters.written.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(Err(e)) => {
                            worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                            log::error!("Error logging violation {} to audit store: {e}", record.event_id);
                        }
                        Err(_) => {
                            worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                            log::error!("Audit store panicked on violation {}; record dropped", record.event_id);
                        }
                    }
                }
            })
            .map_err(|e| ProctorError::Audit(format!("failed to start audit worker: {e}")))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            counters,
        })
    }

    /// A sink with no backing store; submissions are counted as dropped.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            worker: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Queue one event for persistence. Never blocks, never fails.
    pub fn submit(&self, event: &ViolationEvent) {
        let Some(sender) = &self.sender else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        match sender.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Audit queue full; dropping record for violation {}", ev.id);
            }
            Err(TrySendError::Disconnected(ev)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Audit worker gone; dropping record for violation {}", ev.id);
            }
        }
    }

    /// Drain the queue and stop the worker. Idempotent.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Audit worker terminated abnormally");
            }
        }
    }

    /// Move the queue and worker into a new sink. `self` keeps sharing
    /// the counters but drops any further submissions.
    pub fn take(&mut self) -> AuditSink {
        AuditSink {
            sender: self.sender.take(),
            worker: self.worker.take(),
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            written: self.counters.written.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for AuditSink {
    fn drop(&mut self) {
        // Closing the queue lets the worker finish what is already
        // queued and exit on its own; only `shutdown` waits for it.
        self.sender.take();
    }
}
