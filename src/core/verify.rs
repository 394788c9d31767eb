//! Speech verification: deciding whether the user actually spoke their line.
//!
//! Transcript fragments stream in from the client's recognizer; the verifier
//! accumulates them and treats a stretch of silence as the end of the attempt
//! (endpointing by soft timer, not a scheduled callback). The accumulated text
//! is then fuzzy-matched against the expected line, tolerating minor
//! transcription noise.
//!
//! State machine: `Listening → Evaluating → {Matched | Retry → Listening}`.
//! Silence with an empty accumulator never evaluates — absence of speech is
//! "not yet spoken", not a failed attempt.

use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Fuzzy similarity between heard and expected text, in [0, 100].
///
/// Case-insensitive normalized Levenshtein distance scaled to a percentage.
pub fn similarity_score(heard: &str, expected: &str) -> u8 {
    let ratio =
        strsim::normalized_levenshtein(&heard.to_lowercase(), &expected.to_lowercase());
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Mutable transcript buffer scoped to one user-turn attempt.
#[derive(Debug)]
struct TranscriptAccumulator {
    text: String,
    last_update: Instant,
}

impl TranscriptAccumulator {
    fn new(now: Instant) -> Self {
        Self {
            text: String::new(),
            last_update: now,
        }
    }

    fn push(&mut self, fragment: &str, now: Instant) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(fragment);
        self.last_update = now;
    }

    fn is_endpointed(&self, now: Instant, silence_timeout: Duration) -> bool {
        !self.text.is_empty() && now.duration_since(self.last_update) > silence_timeout
    }
}

/// Result of polling the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Still waiting for speech or for the silence window to elapse.
    Listening,
    /// The accumulated text matched the expected line.
    Matched { score: u8 },
    /// The attempt ended below threshold; caller should prompt a retry and
    /// [`SpeechVerifier::reset`] before listening again for the same line.
    Retry { score: u8 },
}

/// Verifies one user turn against its expected script line.
#[derive(Debug)]
pub struct SpeechVerifier {
    expected: String,
    threshold: u8,
    silence_timeout: Duration,
    accumulator: TranscriptAccumulator,
}

impl SpeechVerifier {
    pub fn new(expected: &str, threshold: u8, silence_timeout: Duration, now: Instant) -> Self {
        Self {
            expected: expected.to_string(),
            threshold,
            silence_timeout,
            accumulator: TranscriptAccumulator::new(now),
        }
    }

    /// Feeds one recognized transcript fragment. Empty fragments are ignored.
    pub fn observe_fragment(&mut self, fragment: &str, now: Instant) {
        if !fragment.trim().is_empty() {
            debug!("Heard: {}", fragment.trim());
        }
        self.accumulator.push(fragment, now);
    }

    /// Checks for end-of-turn. Called on every inbound event and on each idle
    /// poll, so detection latency is bounded by the caller's poll granularity.
    pub fn poll(&mut self, now: Instant) -> VerifyOutcome {
        if !self.accumulator.is_endpointed(now, self.silence_timeout) {
            return VerifyOutcome::Listening;
        }

        let score = similarity_score(&self.accumulator.text, &self.expected);
        info!(
            "Match {}% | expected: {} | heard: {}",
            score, self.expected, self.accumulator.text
        );
        if score >= self.threshold {
            VerifyOutcome::Matched { score }
        } else {
            VerifyOutcome::Retry { score }
        }
    }

    /// Starts a fresh listening phase for the same expected line.
    pub fn reset(&mut self, now: Instant) {
        self.accumulator = TranscriptAccumulator::new(now);
    }
}
