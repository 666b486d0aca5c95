// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Exam Monitor Runtime
// ─────────────────────────────────────────────────────────────────────
//! Wires capabilities to the pipeline and owns the session's lifetime.
//!
//! Three sources feed one pipeline: the sensing loop (its own thread),
//! and the visibility and fullscreen reports delivered through a
//! `MonitorHandle`. All of them take the same mutex for the duration of
//! one input, so every mutation completes before the next input is
//! seen. Detection itself runs outside the lock; focus reports may
//! interleave with it freely.
//!
//! Teardown (halt the sensing loop, release the camera, detach focus
//! listeners) runs once, either on threshold breach or on `stop()`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use proctor_observers::FocusSignal;
use proctor_types::{
    FaceObservation, MonitorConfig, ProctorError, ProctorResult, SessionIdentity, ViolationEvent,
};

use crate::audit::{AuditSink, AuditStats, AuditStore};
use crate::clock::{Clock, SystemClock};
use crate::host::{FocusSource, HostCallbacks, NoopHost};
use crate::pipeline::{MonitorEvent, MonitorSnapshot, Pipeline};
use crate::sensing::{observe, FaceDetector, FrameSource};

/// Builder for one monitored exam session.
pub struct ExamMonitor {
    config: MonitorConfig,
    identity: SessionIdentity,
    host: Arc<dyn HostCallbacks>,
    clock: Arc<dyn Clock>,
    audit_store: Option<Box<dyn AuditStore>>,
    camera: Option<(Box<dyn FrameSource>, Box<dyn FaceDetector>)>,
    focus_source: Option<Box<dyn FocusSource>>,
}

impl ExamMonitor {
    pub fn new(identity: SessionIdentity) -> Self {
        Self {
            config: MonitorConfig::default(),
            identity,
            host: Arc::new(NoopHost),
            clock: Arc::new(SystemClock::new()),
            audit_store: None,
            camera: None,
            focus_source: None,
        }
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: Arc<dyn HostCallbacks>) -> Self {
        self.host = host;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn audit_store(mut self, store: impl AuditStore + 'static) -> Self {
        self.audit_store = Some(Box::new(store));
        self
    }

    /// Enable the internal sensing loop.
    pub fn camera(
        mut self,
        source: impl FrameSource + 'static,
        detector: impl FaceDetector + 'static,
    ) -> Self {
        self.camera = Some((Box::new(source), Box::new(detector)));
        self
    }

    pub fn focus_source(mut self, source: impl FocusSource + 'static) -> Self {
        self.focus_source = Some(Box::new(source));
        self
    }

    /// Validate, start monitoring, and return the control handle.
    ///
    /// Only configuration errors fail here. Camera, detector, listener
    /// and audit problems are logged and the monitor runs degraded.
    pub fn start(self) -> ProctorResult<MonitorHandle> {
        self.config.validate()?;

        let audit = match self.audit_store {
            Some(store) => AuditSink::spawn(store, self.config.audit_queue_capacity)
                .unwrap_or_else(|e| {
                    log::error!("{e}; audit trail disabled for this session");
                    AuditSink::disabled()
                }),
            None => AuditSink::disabled(),
        };

        let mut pipeline = Pipeline::new(&self.config, self.identity.clone(), audit);
        pipeline.start();
        let sensing = pipeline.engine().sensing_flag();

        let handle = MonitorHandle {
            shared: Arc::new(Shared {
                pipeline: Mutex::new(pipeline),
                host: self.host,
                clock: self.clock,
                sensing: Arc::clone(&sensing),
                listening: AtomicBool::new(true),
                degraded: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
                sensing_thread: Mutex::new(None),
                focus_source: Mutex::new(None),
            }),
        };
        log::info!(
            "Exam monitor started: subject={} session={}",
            self.identity.subject_id,
            self.identity.session_id
        );

        if let Some(mut source) = self.focus_source {
            match source.attach(handle.clone()) {
                Ok(()) => *handle.shared.focus_source.lock() = Some(source),
                Err(e) => log::error!("Failed to register focus listeners: {e}"),
            }
        }

        match self.camera {
            Some((source, detector)) => {
                let weak = Arc::downgrade(&handle.shared);
                let cadence = Cadence {
                    tick: Duration::from_millis(self.config.tick_interval_ms),
                    max_capture_failures: self.config.max_capture_failures,
                };
                let spawned = thread::Builder::new()
                    .name("proctor-sensing".to_string())
                    .spawn(move || sensing_loop(weak, sensing, source, detector, cadence));
                match spawned {
                    Ok(worker) => *handle.shared.sensing_thread.lock() = Some(worker),
                    Err(e) => {
                        log::error!("Failed to start sensing loop: {e}");
                        handle.shared.enter_degraded();
                    }
                }
            }
            None => log::info!("No camera attached; face observations are host-driven"),
        }

        Ok(handle)
    }
}

struct Shared {
    pipeline: Mutex<Pipeline>,
    host: Arc<dyn HostCallbacks>,
    clock: Arc<dyn Clock>,
    sensing: Arc<AtomicBool>,
    listening: AtomicBool,
    degraded: AtomicBool,
    torn_down: AtomicBool,
    sensing_thread: Mutex<Option<JoinHandle<()>>>,
    focus_source: Mutex<Option<Box<dyn FocusSource>>>,
}

impl Shared {
    fn ingest_observation(&self, observation: &FaceObservation) {
        let events = {
            let mut pipeline = self.pipeline.lock();
            let now = self.clock.now_ms();
            pipeline.on_observation(observation, now)
        };
        self.dispatch(events);
    }

    fn ingest_focus(&self, signal: FocusSignal) {
        if !self.listening.load(Ordering::SeqCst) {
            return;
        }
        let events = {
            let mut pipeline = self.pipeline.lock();
            let now = self.clock.now_ms();
            pipeline.on_focus(signal, now)
        };
        self.dispatch(events);
    }

    fn dispatch(&self, events: Vec<MonitorEvent>) {
        for event in events {
            match event {
                MonitorEvent::Violation(violation) => {
                    self.notify(|host| host.on_violation(&violation))
                }
                MonitorEvent::Feedback(duration) => self.notify(|host| host.on_feedback(duration)),
                MonitorEvent::Presence(state) => {
                    self.notify(|host| host.on_presence_change(state))
                }
                MonitorEvent::FaceBox(face) => self.notify(|host| host.on_face_box(face)),
                MonitorEvent::ThresholdBreach => {
                    self.teardown();
                    self.notify(|host| host.on_threshold_breach());
                }
            }
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn HostCallbacks)) {
        let host = self.host.as_ref();
        if catch_unwind(AssertUnwindSafe(|| f(host))).is_err() {
            log::error!("Host callback panicked; continuing to monitor");
        }
    }

    fn enter_degraded(&self) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            log::warn!("Face sensing unavailable; monitoring focus signals only");
        }
    }

    /// Halt sensing, detach listeners, join the sensing loop. Once.
    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sensing.store(false, Ordering::SeqCst);
        self.listening.store(false, Ordering::SeqCst);

        let focus_source = self.focus_source.lock().take();
        if let Some(mut source) = focus_source {
            if let Err(e) = source.detach() {
                log::debug!("Ignoring focus listener teardown error: {e}");
            }
        }

        if let Err(e) = self.join_sensing() {
            log::error!("{e}");
        }
        log::info!("Monitoring torn down");
    }

    fn join_sensing(&self) -> ProctorResult<()> {
        let Some(worker) = self.sensing_thread.lock().take() else {
            return Ok(());
        };
        // Breach raised on the sensing thread itself: the loop sees the
        // cleared flag and exits after this tick.
        if worker.thread().id() == thread::current().id() {
            return Ok(());
        }
        worker
            .join()
            .map_err(|_| ProctorError::Teardown("sensing loop terminated abnormally".to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
struct Cadence {
    tick: Duration,
    max_capture_failures: u32,
}

fn sensing_loop(
    shared: Weak<Shared>,
    sensing: Arc<AtomicBool>,
    mut source: Box<dyn FrameSource>,
    mut detector: Box<dyn FaceDetector>,
    cadence: Cadence,
) {
    if let Err(e) = source.open().and_then(|()| detector.load()) {
        log::error!("Error accessing camera or initializing detector: {e}");
        if let Some(shared) = shared.upgrade() {
            shared.enter_degraded();
        }
        release(source.as_mut());
        return;
    }
    log::info!("Camera stream started");

    let mut capture_failures = 0u32;
    while sensing.load(Ordering::SeqCst) {
        match source.next_frame() {
            Ok(frame) => {
                capture_failures = 0;
                match catch_unwind(AssertUnwindSafe(|| observe(detector.as_mut(), &frame))) {
                    Ok(Ok(observation)) => {
                        let Some(shared) = shared.upgrade() else {
                            break;
                        };
                        shared.ingest_observation(&observation);
                    }
                    Ok(Err(e)) => log::error!("Error estimating faces: {e}"),
                    Err(_) => log::error!("Face detector panicked; frame skipped"),
                }
            }
            Err(e) => {
                capture_failures += 1;
                if capture_failures >= cadence.max_capture_failures {
                    log::error!("Camera lost after {capture_failures} failed captures: {e}");
                    if let Some(shared) = shared.upgrade() {
                        shared.enter_degraded();
                    }
                    break;
                }
                if capture_failures == 1 {
                    log::warn!("Frame capture failed: {e}");
                } else {
                    log::debug!("Frame capture failed ({capture_failures} in a row): {e}");
                }
            }
        }
        thread::sleep(cadence.tick);
    }

    release(source.as_mut());
}

fn release(source: &mut dyn FrameSource) {
    match source.release() {
        Ok(()) => log::info!("Camera stream released"),
        Err(e) => log::debug!("Ignoring camera release error: {e}"),
    }
}

/// Control handle for a running monitor. Cheap to clone.
///
/// Focus listeners report through it; the host uses it to stop the
/// session and read state. Call `stop()` when the exam ends: a focus
/// source holds a handle until it is detached.
#[derive(Clone)]
pub struct MonitorHandle {
    shared: Arc<Shared>,
}

impl MonitorHandle {
    /// Visibility listener entry point.
    pub fn report_visibility(&self, hidden: bool) {
        self.shared.ingest_focus(FocusSignal::Visibility { hidden });
    }

    /// Fullscreen listener entry point.
    pub fn report_fullscreen(&self, active: bool) {
        self.shared.ingest_focus(FocusSignal::Fullscreen { active });
    }

    pub fn report_focus(&self, signal: FocusSignal) {
        self.shared.ingest_focus(signal);
    }

    /// Feed one detector result from a host-side sensing loop.
    pub fn report_observation(&self, observation: &FaceObservation) {
        self.shared.ingest_observation(observation);
    }

    /// Stop monitoring. Idempotent, and a no-op after auto-termination.
    pub fn stop(&self) {
        let stopped = self.shared.pipeline.lock().stop();
        if stopped {
            log::info!("Exam monitor stopped by host");
        }
        self.shared.teardown();
    }

    /// Wait for queued audit writes and stop the audit worker.
    ///
    /// Intended for after the session has ended; violations accepted
    /// later are no longer persisted.
    pub fn drain_audit(&self) -> AuditStats {
        let mut sink = self.shared.pipeline.lock().take_audit();
        sink.shutdown();
        sink.stats()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let degraded = self.shared.degraded.load(Ordering::SeqCst);
        self.shared.pipeline.lock().snapshot(degraded)
    }

    pub fn violations(&self) -> Vec<ViolationEvent> {
        self.shared.pipeline.lock().session().violation_log().to_vec()
    }

    pub fn is_active(&self) -> bool {
        self.shared.pipeline.lock().is_active()
    }

    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::SeqCst)
    }
}
