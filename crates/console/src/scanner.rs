//! Camera decode loop.
//!
//! [`start`] spawns a task that pulls frames from a [`FrameSource`], decodes
//! them and pushes [`DecodeEvent`]s into an unbounded stream. Identical codes
//! are suppressed by a shared [`DedupGate`] until the gate is reset, so a
//! badge held in front of the camera produces exactly one event.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Raw captured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// One-row frame carrying text, as produced by keyboard-wedge scanners.
    pub fn from_text(text: impl Into<String>) -> Self {
        let data = text.into().into_bytes();
        Self {
            width: u32::try_from(data.len()).unwrap_or(u32::MAX),
            height: 1,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A decoded code with the outline it was found at.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeEvent {
    pub text: String,
    pub polygon: Option<[Point; 4]>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no code in frame")]
    NotFound,

    #[error("decode failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    /// The source has no more frames
    #[error("capture ended")]
    Ended,
}

/// Stream item error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A frame could not be decoded; scanning continues
    #[error("decode failed: {0}")]
    Decode(String),

    /// The capture device is gone; scanning has stopped
    #[error("capture device unavailable: {0}")]
    Capture(String),
}

impl ScanError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::Capture(_))
    }
}

pub type ScanItem = Result<DecodeEvent, ScanError>;

#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the device. Called exactly once by the loop task.
    fn release(&mut self);
}

pub trait CodeDecoder: Send {
    fn decode(&mut self, frame: &Frame) -> Result<DecodeEvent, DecodeError>;
}

pub trait OverlaySurface: Send {
    fn clear(&mut self);

    fn draw_polygon(&mut self, polygon: &[Point; 4]);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DedupState {
    /// Loop not running
    Idle,
    /// Any code will be emitted
    Armed,
    /// `text` was emitted at `since`; identical codes are dropped
    Suppressed { text: String, since: Instant },
}

/// Duplicate suppression for decoded codes.
#[derive(Debug)]
pub struct DedupGate {
    state: DedupState,
    rearm_after: Option<Duration>,
}

impl DedupGate {
    pub fn new(rearm_after: Option<Duration>) -> Self {
        Self {
            state: DedupState::Idle,
            rearm_after,
        }
    }

    pub fn state(&self) -> &DedupState {
        &self.state
    }

    pub fn arm(&mut self) {
        if self.state == DedupState::Idle {
            self.state = DedupState::Armed;
        }
    }

    /// Returns true when `text` should be emitted, and records it.
    pub fn offer(&mut self, text: &str, now: Instant) -> bool {
        let emit = match &self.state {
            DedupState::Idle => false,
            DedupState::Armed => true,
            DedupState::Suppressed { text: last, since } => {
                last != text
                    || self
                        .rearm_after
                        .is_some_and(|window| now.saturating_duration_since(*since) >= window)
            }
        };

        if emit {
            self.state = DedupState::Suppressed {
                text: text.to_string(),
                since: now,
            };
        }
        emit
    }

    /// Lets the last emitted code through again.
    pub fn reset(&mut self) {
        if matches!(self.state, DedupState::Suppressed { .. }) {
            self.state = DedupState::Armed;
        }
    }

    pub fn stop(&mut self) {
        self.state = DedupState::Idle;
    }
}

fn lock(gate: &Mutex<DedupGate>) -> MutexGuard<'_, DedupGate> {
    gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resets the dedup key of a running loop from elsewhere.
#[derive(Debug, Clone)]
pub struct RearmHandle(Arc<Mutex<DedupGate>>);

impl RearmHandle {
    pub fn reset(&self) {
        lock(&self.0).reset();
    }
}

/// Control handle for a running decode loop. Dropping it stops the loop.
pub struct ScanHandle {
    cancel: CancellationToken,
    gate: Arc<Mutex<DedupGate>>,
    task: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Asks the loop to stop. Safe to call repeatedly and from any state.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn reset_key(&self) {
        lock(&self.gate).reset();
    }

    pub fn rearm_handle(&self) -> RearmHandle {
        RearmHandle(Arc::clone(&self.gate))
    }

    pub fn dedup_state(&self) -> DedupState {
        lock(&self.gate).state().clone()
    }

    /// Stops the loop and waits until the capture device is released.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Scanner task panicked");
            }
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts the decode loop.
pub fn start<S, D, O>(
    mut source: S,
    mut decoder: D,
    mut overlay: O,
    rearm_after: Option<Duration>,
) -> (UnboundedReceiverStream<ScanItem>, ScanHandle)
where
    S: FrameSource + 'static,
    D: CodeDecoder + 'static,
    O: OverlaySurface + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let gate = Arc::new(Mutex::new(DedupGate::new(rearm_after)));
    lock(&gate).arm();

    let task = tokio::spawn({
        let cancel = cancel.clone();
        let gate = Arc::clone(&gate);
        async move {
            info!("Scanner started");
            loop {
                let frame = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    frame = source.next_frame() => frame,
                };

                let frame = match frame {
                    Ok(frame) => frame,
                    Err(CaptureError::Ended) => {
                        debug!("Capture source exhausted");
                        break;
                    }
                    Err(CaptureError::Unavailable(reason)) => {
                        error!(reason = %reason, "Capture device unavailable");
                        let _ = tx.send(Err(ScanError::Capture(reason)));
                        break;
                    }
                };

                overlay.clear();

                match decoder.decode(&frame) {
                    Ok(event) => {
                        if let Some(polygon) = &event.polygon {
                            overlay.draw_polygon(polygon);
                        }
                        if cancel.is_cancelled() {
                            break;
                        }
                        if lock(&gate).offer(&event.text, Instant::now()) {
                            debug!(code = %event.text, "Code decoded");
                            if tx.send(Ok(event)).is_err() {
                                break;
                            }
                        } else {
                            trace!(code = %event.text, "Duplicate code suppressed");
                        }
                    }
                    Err(DecodeError::NotFound) => {}
                    Err(DecodeError::Failed(reason)) => {
                        debug!(reason = %reason, "Frame decode failed");
                        if tx.send(Err(ScanError::Decode(reason))).is_err() {
                            break;
                        }
                    }
                }
            }

            source.release();
            lock(&gate).stop();
            info!("Scanner stopped");
        }
    });

    (
        UnboundedReceiverStream::new(rx),
        ScanHandle {
            cancel,
            gate,
            task: Some(task),
        },
    )
}

/// Line-oriented capture source; keyboard-wedge scanners type the code
/// followed by a newline.
pub struct LineFrameSource<R> {
    lines: Lines<R>,
    released: bool,
}

impl<R: AsyncBufRead + Unpin + Send> LineFrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            released: false,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FrameSource for LineFrameSource<R> {
    async fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.released {
            return Err(CaptureError::Unavailable("source released".into()));
        }
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(Frame::from_text(line)),
            Ok(None) => Err(CaptureError::Ended),
            Err(e) => Err(CaptureError::Unavailable(e.to_string())),
        }
    }

    fn release(&mut self) {
        self.released = true;
        debug!("Line source released");
    }
}

/// Treats the frame bytes as the code text.
#[derive(Debug, Default)]
pub struct PlainTextDecoder;

impl CodeDecoder for PlainTextDecoder {
    fn decode(&mut self, frame: &Frame) -> Result<DecodeEvent, DecodeError> {
        let text = std::str::from_utf8(&frame.data)
            .map_err(|e| DecodeError::Failed(e.to_string()))?
            .trim();
        if text.is_empty() {
            return Err(DecodeError::NotFound);
        }

        let (w, h) = (frame.width as f32, frame.height as f32);
        Ok(DecodeEvent {
            text: text.to_string(),
            polygon: Some([
                Point::new(0.0, 0.0),
                Point::new(w, 0.0),
                Point::new(w, h),
                Point::new(0.0, h),
            ]),
        })
    }
}

/// Overlay that only logs what it would draw.
#[derive(Debug, Default)]
pub struct TracingOverlay;

impl OverlaySurface for TracingOverlay {
    fn clear(&mut self) {
        trace!("Overlay cleared");
    }

    fn draw_polygon(&mut self, polygon: &[Point; 4]) {
        trace!(polygon = ?polygon, "Overlay polygon");
    }
}
