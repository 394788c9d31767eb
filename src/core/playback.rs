//! Playback dispatching: ordered speech synthesis over the outbound channel.
//!
//! A session enqueues [`PlaybackRequest`]s as it walks the script; a single
//! worker task drains them one at a time, calls the synthesizer, and emits a
//! `{"tts_text": …}` text frame followed by the raw PCM audio frame. Requests
//! are transmitted strictly in enqueue order — parallel synthesis would let a
//! later line's audio arrive first and break the turn-taking illusion.
//!
//! The drain gate tracks an in-flight counter, not queue depth: a request that
//! has been dequeued but not yet fully transmitted still counts. The counter
//! is incremented on enqueue and decremented only once the worker has finished
//! (or abandoned) the request, so `await_drained` never returns while AI audio
//! is still on its way out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use serde_json::json;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, warn};

use super::tts::SpeechSynthesizer;

/// One synthesized line waiting to be spoken. Consumed exactly once by the
/// dispatcher worker; never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub text: String,
    pub voice_id: String,
}

/// A frame bound for the client socket. The WebSocket sender task is the sole
/// consumer, so frame order on the wire equals send order on this channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// JSON or plain status text.
    Text(String),
    /// Raw PCM s16le audio.
    Audio(Bytes),
}

/// Handle to the playback worker: non-blocking enqueue plus the drain gate.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<PlaybackRequest>,
    in_flight: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl PlaybackHandle {
    /// Appends a request to the tail of the queue and returns immediately.
    pub fn enqueue(&self, request: PlaybackRequest) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(request).is_err() {
            // Worker already gone (connection torn down); undo the count so
            // await_drained cannot hang.
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            warn!("Playback worker stopped, dropping request");
        }
    }

    /// Suspends until the queue is empty and no request is mid-processing.
    pub async fn await_drained(&self) {
        loop {
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            // Re-check after registering as a waiter so a decrement between
            // the first load and registration cannot be missed.
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Spawns the single dispatcher worker for a session and returns its handle.
///
/// The worker is not explicitly cancelled: it exits when the handle side drops
/// the queue. Synthesis and transmission failures are logged and the request
/// is dropped — no retry, no backoff — so one bad line never stalls the rest
/// of the scene.
pub fn spawn_dispatcher(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
) -> PlaybackHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<PlaybackRequest>();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let drained = Arc::new(Notify::new());

    let worker_in_flight = in_flight.clone();
    let worker_drained = drained.clone();
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            process_request(&*synthesizer, &outbound, &request).await;
            if worker_in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                worker_drained.notify_waiters();
            }
        }
        debug!("Playback worker exiting, queue closed");
    });

    PlaybackHandle {
        tx,
        in_flight,
        drained,
    }
}

async fn process_request(
    synthesizer: &dyn SpeechSynthesizer,
    outbound: &mpsc::UnboundedSender<OutboundFrame>,
    request: &PlaybackRequest,
) {
    debug!(
        "Synthesizing ({}): {}",
        request.voice_id, request.text
    );
    let audio = match synthesizer
        .synthesize(&request.text, &request.voice_id)
        .await
    {
        Ok(audio) => audio,
        Err(e) => {
            error!("Synthesis failed, skipping line: {e}");
            return;
        }
    };

    let notice = json!({ "tts_text": request.text }).to_string();
    if outbound.send(OutboundFrame::Text(notice)).is_err()
        || outbound.send(OutboundFrame::Audio(audio)).is_err()
    {
        warn!("Outbound channel closed, dropping synthesized line");
    }
}
