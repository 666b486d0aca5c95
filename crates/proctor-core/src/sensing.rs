// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Sensing Capabilities
// ─────────────────────────────────────────────────────────────────────
//! Camera and face-detector interfaces.
//!
//! Real capture devices and detection models live behind these traits.
//! The monitor only consumes face counts (and the first box, for the
//! overlay), so tests can substitute scripted observation sequences.

use proctor_types::{FaceBox, FaceObservation, ProctorResult};

/// One captured video frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Exclusive owner of the capture stream for a session.
pub trait FrameSource: Send {
    /// Acquire the device. Failure puts the monitor in degraded mode.
    fn open(&mut self) -> ProctorResult<()>;

    /// Block until the next frame is available.
    fn next_frame(&mut self) -> ProctorResult<Frame>;

    /// Release the device. Must tolerate repeated calls.
    fn release(&mut self) -> ProctorResult<()>;
}

/// Face-detection model.
///
/// Implementations may be stateful (tracking across frames), hence
/// `&mut self`.
pub trait FaceDetector: Send {
    /// Load model weights. Failure puts the monitor in degraded mode.
    fn load(&mut self) -> ProctorResult<()> {
        Ok(())
    }

    fn detect(&mut self, frame: &Frame) -> ProctorResult<Vec<FaceBox>>;
}

/// Run one detection cycle. Degenerate boxes are dropped here.
pub fn observe(detector: &mut dyn FaceDetector, frame: &Frame) -> ProctorResult<FaceObservation> {
    detector.detect(frame).map(FaceObservation::new)
}

type DetectFn = Box<dyn FnMut(&Frame) -> ProctorResult<Vec<FaceBox>> + Send>;

/// Detector that delegates to a closure.
pub struct ExternalDetector {
    detect_fn: DetectFn,
}

impl ExternalDetector {
    pub fn new(
        detect_fn: impl FnMut(&Frame) -> ProctorResult<Vec<FaceBox>> + Send + 'static,
    ) -> Self {
        Self {
            detect_fn: Box::new(detect_fn),
        }
    }
}

impl FaceDetector for ExternalDetector {
    fn detect(&mut self, frame: &Frame) -> ProctorResult<Vec<FaceBox>> {
        (self.detect_fn)(frame)
    }
}

/// Frame source that produces blank frames forever.
///
/// Pairs with detectors that ignore pixel data (synthetic or remote).
#[derive(Debug, Default)]
pub struct BlankFrameSource {
    open: bool,
    sequence: u64,
}

impl BlankFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl FrameSource for BlankFrameSource {
    fn open(&mut self) -> ProctorResult<()> {
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> ProctorResult<Frame> {
        if !self.open {
            return Err(proctor_types::ProctorError::Sensing(
                "frame source not open".to_string(),
            ));
        }
        self.sequence += 1;
        Ok(Frame {
            sequence: self.sequence,
            ..Default::default()
        })
    }

    fn release(&mut self) -> ProctorResult<()> {
        self.open = false;
        Ok(())
    }
}
