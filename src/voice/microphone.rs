//! Audio input port backed by the default capture device
//!
//! `cpal` streams are not `Send`, so each recording owns a dedicated thread
//! that holds the stream until stop is requested.

use std::sync::{Mutex, mpsc};
use std::thread::JoinHandle;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::ports::{AudioInput, RecordedAudio, RecordingHandle};
use crate::{Error, Result};

use super::capture::{AudioCapture, input_device_available, samples_to_wav};

struct ActiveCapture {
    handle: RecordingHandle,
    stop_tx: mpsc::Sender<()>,
    done_rx: oneshot::Receiver<(Vec<f32>, u32)>,
    thread: JoinHandle<()>,
}

/// Records from the default input device, one capture at a time
#[derive(Default)]
pub struct DeviceMicrophone {
    active: Mutex<Option<ActiveCapture>>,
}

impl DeviceMicrophone {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take_active(&self) -> Option<ActiveCapture> {
        self.active.lock().ok().and_then(|mut guard| guard.take())
    }
}

#[async_trait]
impl AudioInput for DeviceMicrophone {
    async fn request_permission(&self) -> bool {
        tokio::task::spawn_blocking(input_device_available)
            .await
            .unwrap_or(false)
    }

    async fn start_recording(&self) -> Result<RecordingHandle> {
        // a stale capture left behind by a dropped caller is discarded
        if let Some(stale) = self.take_active() {
            tracing::debug!(handle = %stale.handle.id(), "discarding stale capture");
            let _ = stale.stop_tx.send(());
        }

        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("herald-capture".to_string())
            .spawn(move || {
                let mut capture = match AudioCapture::new() {
                    Ok(capture) => capture,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = capture.start() {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // sender dropped also ends the capture
                let _ = stop_rx.recv();
                capture.stop();
                let _ = done_tx.send((capture.take_buffer(), capture.sample_rate()));
            })?;

        ready_rx
            .await
            .map_err(|_| Error::Recording("capture thread exited early".to_string()))??;

        let handle = RecordingHandle::new();
        let active = ActiveCapture {
            handle,
            stop_tx,
            done_rx,
            thread,
        };

        let mut guard = self
            .active
            .lock()
            .map_err(|_| Error::Recording("capture state poisoned".to_string()))?;
        *guard = Some(active);

        tracing::debug!(handle = %handle.id(), "recording started");
        Ok(handle)
    }

    async fn stop_recording(&self, handle: RecordingHandle) -> Option<RecordedAudio> {
        let active = self.take_active()?;
        if active.handle != handle {
            tracing::warn!(
                expected = %active.handle.id(),
                got = %handle.id(),
                "stop requested for unknown recording"
            );
        }

        let _ = active.stop_tx.send(());
        let Ok((samples, sample_rate)) = active.done_rx.await else {
            tracing::warn!("capture thread ended without audio");
            return None;
        };
        let _ = active.thread.join();

        tracing::debug!(samples = samples.len(), sample_rate, "recording stopped");

        match samples_to_wav(&samples, sample_rate) {
            Ok(bytes) => Some(RecordedAudio::wav(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode recording");
                None
            }
        }
    }
}

impl std::fmt::Debug for DeviceMicrophone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recording = self.active.lock().map(|g| g.is_some()).unwrap_or(false);
        f.debug_struct("DeviceMicrophone")
            .field("recording", &recording)
            .finish()
    }
}
