//! Background image decoding.
//!
//! A [`DecodeWorker`] owns a single thread that decodes queued files strictly
//! in submission order. Results come back as [`DecodeEvent`]s that the owner
//! of the scene applies itself; the worker never touches scene state.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender, SyncSender, TryRecvError},
    },
    thread::{self, JoinHandle},
};

use log::{debug, trace, warn};

use tachie_core::{bitmap::DecodedImage, identifier::InstanceId, identifier::LayerId};

use crate::error::TachieError;

/// What a decoded image belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeTarget {
    Layer { instance: InstanceId, layer: LayerId },
    Component { instance: InstanceId, name: String },
    Background { name: String },
}

/// Messages sent back by the worker.
#[derive(Debug, Clone)]
pub enum DecodeEvent {
    Decoded {
        target: DecodeTarget,
        image: DecodedImage,
    },
    Failed {
        target: DecodeTarget,
        path: PathBuf,
        reason: String,
    },
    /// Sent right before the result of every finished task
    Progress { completed: usize, total: usize },
}

/// Turns a file into pixels.
pub trait ImageDecoder: Send + 'static {
    fn decode(&self, path: &Path) -> Result<DecodedImage, TachieError>;
}

/// Decodes PNG and JPEG files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, TachieError> {
        let pixels = image::open(path)
            .map_err(|err| TachieError::Decode(format!("{}: {err}", path.display())))?
            .into_rgba8();
        Ok(DecodedImage::new(pixels).with_origin(path))
    }
}

struct DecodeTask {
    target: DecodeTarget,
    path: PathBuf,
}

/// Handle to the decode thread.
///
/// Dropping the handle closes the queue and waits for the thread to finish
/// the tasks already queued.
pub struct DecodeWorker {
    tasks: Option<SyncSender<DecodeTask>>,
    events: Receiver<DecodeEvent>,
    submitted: Arc<AtomicUsize>,
    finished: usize,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Starts the decode thread with a task queue of `queue_capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`TachieError::Io`] if the thread cannot be spawned.
    pub fn spawn(decoder: impl ImageDecoder, queue_capacity: usize) -> Result<Self, TachieError> {
        let (task_tx, task_rx) = mpsc::sync_channel::<DecodeTask>(queue_capacity.max(1));
        let (event_tx, event_rx) = mpsc::channel();
        let submitted = Arc::new(AtomicUsize::new(0));

        let total = Arc::clone(&submitted);
        let handle = thread::Builder::new()
            .name("tachie-decode".to_string())
            .spawn(move || run_worker(decoder, task_rx, event_tx, total))?;

        debug!(queue_capacity = queue_capacity; "Decode worker started");
        Ok(Self {
            tasks: Some(task_tx),
            events: event_rx,
            submitted,
            finished: 0,
            handle: Some(handle),
        })
    }

    /// Queues a file for decoding. Blocks while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`TachieError::Decode`] if the worker thread has stopped.
    pub fn submit(&mut self, target: DecodeTarget, path: impl Into<PathBuf>) -> Result<(), TachieError> {
        let path = path.into();
        let sender = self
            .tasks
            .as_ref()
            .ok_or_else(|| TachieError::Decode("decode worker is shut down".to_string()))?;

        self.submitted.fetch_add(1, Ordering::SeqCst);
        if sender.send(DecodeTask { target, path }).is_err() {
            self.submitted.fetch_sub(1, Ordering::SeqCst);
            return Err(TachieError::Decode("decode worker stopped".to_string()));
        }
        Ok(())
    }

    /// Number of queued or running tasks whose result has not been received.
    pub fn pending(&self) -> usize {
        self.submitted
            .load(Ordering::SeqCst)
            .saturating_sub(self.finished)
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Returns the next event without blocking.
    pub fn try_next(&mut self) -> Option<DecodeEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(self.count(event)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Returns the next event, blocking while results are outstanding.
    ///
    /// Returns `None` once every submitted task has reported back and no
    /// event is left.
    pub fn next_blocking(&mut self) -> Option<DecodeEvent> {
        if self.is_idle() {
            return self.try_next();
        }
        match self.events.recv() {
            Ok(event) => Some(self.count(event)),
            Err(_) => {
                warn!(pending = self.pending(); "Decode worker exited with tasks outstanding");
                self.finished = self.submitted.load(Ordering::SeqCst);
                None
            }
        }
    }

    fn count(&mut self, event: DecodeEvent) -> DecodeEvent {
        if !matches!(event, DecodeEvent::Progress { .. }) {
            self.finished += 1;
        }
        event
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.tasks.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Decode worker panicked");
            }
        }
    }
}

fn run_worker(
    decoder: impl ImageDecoder,
    tasks: Receiver<DecodeTask>,
    events: Sender<DecodeEvent>,
    total: Arc<AtomicUsize>,
) {
    let mut completed = 0;
    for DecodeTask { target, path } in tasks {
        trace!(path:? = path; "Decoding image");
        let event = match decoder.decode(&path) {
            Ok(image) => DecodeEvent::Decoded { target, image },
            Err(err) => DecodeEvent::Failed {
                target,
                path,
                reason: err.to_string(),
            },
        };
        completed += 1;

        let progress = DecodeEvent::Progress {
            completed,
            total: total.load(Ordering::SeqCst),
        };
        // Progress goes first so it is never left behind once the owner is idle
        if events.send(progress).is_err() || events.send(event).is_err() {
            break;
        }
    }
}
