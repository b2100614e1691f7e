use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use gatekeep_model::AttendeeId;

use crate::error::ScanError;
use crate::mutation::MutationRequest;
use crate::queue::QueueView;

use super::camera::{CameraCapture, CameraDevice, DecodeSink};

/// Exclusive owner of the camera.
///
/// Each decode ends the capture before it is handed out, so a code can
/// never be processed twice by one capture. The capture is also released
/// when the dispatcher is dropped.
#[derive(Debug)]
pub struct QrScanDispatcher {
    camera: Arc<dyn CameraDevice>,
    active: Option<ActiveCapture>,
}

#[derive(Debug)]
struct ActiveCapture {
    capture: Box<dyn CameraCapture>,
    decodes: mpsc::Receiver<String>,
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        // Close the receiver first so late decodes are refused at the sink.
        self.decodes.close();
        self.capture.close();
    }
}

impl QrScanDispatcher {
    pub fn new(camera: Arc<dyn CameraDevice>) -> Self {
        Self {
            camera,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire the camera. Fails with [`ScanError::CameraBusy`] when this
    /// dispatcher is already capturing.
    pub fn start(&mut self) -> Result<(), ScanError> {
        if self.active.is_some() {
            return Err(ScanError::CameraBusy);
        }

        let (tx, decodes) = mpsc::channel(1);
        let capture = self.camera.open(DecodeSink::new(tx))?;
        self.active = Some(ActiveCapture { capture, decodes });
        info!(target: "gate::scan", "scanner started");
        Ok(())
    }

    /// Release the camera. Safe to call any number of times; returns whether
    /// a capture was running.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active.take().is_some();
        if was_active {
            info!(target: "gate::scan", "scanner stopped");
        }
        was_active
    }

    /// Wait for the next decoded code and stop capturing before returning
    /// it. Returns `None` right away when not capturing, or when the device
    /// went away.
    ///
    /// Cancel safe: dropping the future before it resolves loses no code.
    pub async fn next_decode(&mut self) -> Option<String> {
        let active = self.active.as_mut()?;
        let code = active.decodes.recv().await;
        self.stop();
        code
    }

    /// Match a decoded code against the records currently loaded in `view`.
    /// The mutation follows the queue on display.
    pub fn resolve(
        code: &str,
        view: &QueueView,
    ) -> Result<MutationRequest, ScanError> {
        let id = AttendeeId::from(code.trim());
        let Some(record) = view.find(&id) else {
            debug!(
                target: "gate::scan",
                code,
                queue = %view.kind(),
                "code not in loaded queue"
            );
            return Err(ScanError::NotFound(code.to_string()));
        };

        Ok(MutationRequest::for_queue(
            record.clone(),
            view.kind(),
            view.scope().clone(),
        ))
    }
}

impl Drop for QrScanDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
