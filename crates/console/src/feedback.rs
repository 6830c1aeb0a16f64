//! Audible feedback after a check-in.

use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Affirmative,
    Negative,
}

pub trait Feedback: Send + Sync {
    fn play(&self, cue: Cue);
}

/// Terminal bell: one for success, two for failure.
#[derive(Debug, Default)]
pub struct TerminalFeedback;

impl Feedback for TerminalFeedback {
    fn play(&self, cue: Cue) {
        let bells: &[u8] = match cue {
            Cue::Affirmative => b"\x07",
            Cue::Negative => b"\x07\x07",
        };
        let mut stderr = std::io::stderr();
        if stderr.write_all(bells).and_then(|_| stderr.flush()).is_err() {
            tracing::debug!(cue = ?cue, "Terminal bell unavailable");
        }
    }
}

#[derive(Debug, Default)]
pub struct SilentFeedback;

impl Feedback for SilentFeedback {
    fn play(&self, _cue: Cue) {}
}

/// Keeps every cue played; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    cues: Mutex<Vec<Cue>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues
            .lock()
            .map(|cues| cues.clone())
            .unwrap_or_default()
    }
}

impl Feedback for RecordingFeedback {
    fn play(&self, cue: Cue) {
        if let Ok(mut cues) = self.cues.lock() {
            cues.push(cue);
        }
    }
}
