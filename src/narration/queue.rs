//! Narration request queue.
//!
//! One worker thread owns the synthesizer and serves requests one at a
//! time in submission order. Each request is answered over its own oneshot
//! channel, so any number of callers can wait concurrently.

use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::narration::{validate_voice, Narration, NarrationError, Synthesizer};

type Reply = oneshot::Sender<Result<Narration, NarrationError>>;

struct Request {
    text: String,
    voice: String,
    reply: Reply,
}

pub struct NarrationQueue {
    sender: Option<mpsc::UnboundedSender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl NarrationQueue {
    /// Start the worker thread that owns `synthesizer`.
    pub fn spawn<S: Synthesizer>(mut synthesizer: S) -> Result<Self, NarrationError> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Request>();
        let worker = thread::Builder::new()
            .name("narration".to_string())
            .spawn(move || {
                while let Some(request) = receiver.blocking_recv() {
                    debug!(voice = %request.voice, "Synthesizing narration");
                    let result = synthesizer.synthesize(&request.text, &request.voice);
                    if let Err(e) = &result {
                        warn!("Narration synthesis failed: {}", e);
                    }
                    // The caller may have stopped waiting
                    let _ = request.reply.send(result);
                }
                debug!("Narration worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queue a request; the receiver resolves once it has been served.
    pub fn submit(
        &self,
        text: impl Into<String>,
        voice: impl Into<String>,
    ) -> Result<oneshot::Receiver<Result<Narration, NarrationError>>, NarrationError> {
        let voice = voice.into();
        validate_voice(&voice)?;
        let (reply, receiver) = oneshot::channel();
        let sender = self.sender.as_ref().ok_or(NarrationError::QueueClosed)?;
        sender
            .send(Request {
                text: text.into(),
                voice,
                reply,
            })
            .map_err(|_| NarrationError::QueueClosed)?;
        Ok(receiver)
    }

    pub async fn synthesize(
        &self,
        text: impl Into<String>,
        voice: impl Into<String>,
    ) -> Result<Narration, NarrationError> {
        let receiver = self.submit(text, voice)?;
        receiver.await.map_err(|_| NarrationError::QueueClosed)?
    }

    /// Blocking form for callers outside an async runtime.
    pub fn synthesize_blocking(
        &self,
        text: impl Into<String>,
        voice: impl Into<String>,
    ) -> Result<Narration, NarrationError> {
        let receiver = self.submit(text, voice)?;
        receiver
            .blocking_recv()
            .map_err(|_| NarrationError::QueueClosed)?
    }
}

impl Drop for NarrationQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish what is queued and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Narration worker panicked");
            }
        }
    }
}
