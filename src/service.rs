//! Async capture service: a worker thread owns the page, callers await results by id

use crate::codec::CapturedImage;
use crate::library::new_capture_id;
use crate::{now_millis, restricted, CaptureConfig, CaptureGuard, Error, PageSurface, Result, SegmentCapturer};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// A finished capture, tagged with the correlation id it was requested under
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub id: String,
    pub image: CapturedImage,
    pub url: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Outstanding capture requests keyed by correlation id.
///
/// Each request has exactly one waiter. Cancelling a request removes its
/// entry, so a result arriving afterwards finds nobody and is dropped.
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<HashMap<String, oneshot::Sender<Result<CaptureOutcome>>>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: &str) -> Result<oneshot::Receiver<Result<CaptureOutcome>>> {
        let (tx, rx) = oneshot::channel();
        let mut map = self.lock()?;
        if map.contains_key(id) {
            return Err(Error::Other(format!("duplicate request id {}", id)));
        }
        map.insert(id.to_string(), tx);
        Ok(rx)
    }

    /// Deliver a result; returns false if the request was already cancelled.
    pub fn complete(&self, id: &str, result: Result<CaptureOutcome>) -> bool {
        let waiter = match self.lock() {
            Ok(mut map) => map.remove(id),
            Err(_) => None,
        };
        match waiter {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Forget a request; returns whether it was still pending.
    pub fn cancel(&self, id: &str) -> bool {
        self.lock().map(|mut map| map.remove(id).is_some()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<Result<CaptureOutcome>>>>> {
        self.inner
            .lock()
            .map_err(|_| Error::Other("pending request table poisoned".into()))
    }
}

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    Capture { id: String, guard: CaptureGuard },
    Close(oneshot::Sender<Result<()>>),
}

/// Async front end for capturing a page owned by a dedicated worker thread.
///
/// The worker thread owns the [`PageSurface`] and runs every command
/// sequentially, so callers can use an async interface without the surface
/// being `Send` across tasks. Captures report back through
/// [`PendingRequests`] and are bounded by the configured watchdog.
#[derive(Clone)]
pub struct CaptureService {
    cmd_tx: Sender<Command>,
    capturer: SegmentCapturer,
    pending: PendingRequests,
    current_url: Arc<Mutex<Option<String>>>,
    timeout: Duration,
}

impl CaptureService {
    /// Spawn the worker; `factory` builds the surface on the worker thread.
    pub async fn start<S, F>(config: CaptureConfig, factory: F) -> Result<Self>
    where
        S: PageSurface + 'static,
        F: FnOnce(&CaptureConfig) -> Result<S> + Send + 'static,
    {
        config.validate()?;
        let capturer = SegmentCapturer::new(config.clone());
        let pending = PendingRequests::new();
        let current_url = Arc::new(Mutex::new(None));

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<Option<String>>>();

        let worker_capturer = capturer.clone();
        let worker_pending = pending.clone();
        let worker_url = current_url.clone();
        thread::spawn(move || {
            let mut surface = match factory(worker_capturer.config()) {
                Ok(s) => s,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(surface.url().ok()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let res = surface.navigate(&url);
                        if res.is_ok() {
                            if let Ok(mut current) = worker_url.lock() {
                                *current = surface.url().ok();
                            }
                        }
                        let _ = resp.send(res);
                    }
                    Command::Capture { id, guard } => {
                        let res = worker_capturer.capture_with(&mut surface, &guard).and_then(|image| {
                            Ok(CaptureOutcome {
                                id: id.clone(),
                                image,
                                url: surface.url()?,
                                timestamp: now_millis(),
                            })
                        });
                        drop(guard);
                        if !worker_pending.complete(&id, res) {
                            warn!("capture {} finished after its requester gave up; result dropped", id);
                        }
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
            debug!("capture worker exiting");
        });

        // Wait for the worker to report initialization success or failure
        let initial_url = init_rx
            .await
            .map_err(|e| Error::InitializationError(format!("Worker init canceled: {}", e)))??;
        if let Ok(mut current) = current_url.lock() {
            *current = initial_url;
        }

        Ok(Self {
            cmd_tx,
            timeout: Duration::from_millis(config.timeout_ms),
            capturer,
            pending,
            current_url,
        })
    }

    /// Navigate the page to `url`.
    pub async fn goto(&self, url: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Goto(url.to_string(), tx))?;
        rx.await
            .map_err(|e| Error::TransportError(format!("Goto canceled: {}", e)))?
    }

    /// Capture the full page under a fresh correlation id.
    pub async fn capture(&self) -> Result<CaptureOutcome> {
        self.capture_as(&new_capture_id()).await
    }

    /// Capture the full page, reporting the result under `id`.
    ///
    /// Restricted pages and overlapping captures are rejected before any
    /// command reaches the worker.
    pub async fn capture_as(&self, id: &str) -> Result<CaptureOutcome> {
        if let Some(url) = self.current_url() {
            restricted::ensure_capturable(&url)?;
        }
        let guard = self.capturer.try_begin()?;
        let rx = self.pending.register(id)?;

        if let Err(e) = self.send(Command::Capture { id: id.to_string(), guard }) {
            self.pending.cancel(id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::TransportError(format!("capture {} was abandoned by the worker", id))),
            Err(_) => {
                self.pending.cancel(id);
                warn!("capture {} timed out after {:?}", id, self.timeout);
                Err(Error::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }

    pub fn current_url(&self) -> Option<String> {
        self.current_url.lock().ok().and_then(|u| u.clone())
    }

    pub fn is_capturing(&self) -> bool {
        self.capturer.is_capturing()
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Shut down the worker thread. Commands already queued run first.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::TransportError(format!("Close canceled: {}", e)))?
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::TransportError("capture worker is gone".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str) -> CaptureOutcome {
        CaptureOutcome {
            id: id.to_string(),
            image: CapturedImage {
                data: vec![],
                width: 1,
                height: 1,
                format: crate::ImageFormat::Png,
            },
            url: "https://example.com/".into(),
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn pending_delivers_to_waiter() {
        let p = PendingRequests::new();
        let rx = p.register("canvas_1").unwrap();
        assert_eq!(p.len(), 1);
        assert!(p.complete("canvas_1", Ok(outcome("canvas_1"))));
        assert_eq!(rx.await.unwrap().unwrap().id, "canvas_1");
        assert!(p.is_empty());
    }

    #[test]
    fn cancelled_requests_drop_late_results() {
        let p = PendingRequests::new();
        let _rx = p.register("canvas_2").unwrap();
        assert!(p.cancel("canvas_2"));
        assert!(!p.cancel("canvas_2"));
        assert!(!p.complete("canvas_2", Ok(outcome("canvas_2"))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let p = PendingRequests::new();
        let _rx = p.register("canvas_3").unwrap();
        assert!(p.register("canvas_3").is_err());
    }
}
