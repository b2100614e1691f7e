use std::{fmt::Debug, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::ScanError;

/// A camera that can be opened for one capture session at a time.
pub trait CameraDevice: Send + Sync + Debug {
    /// Start capturing. Decoded codes are pushed into `sink` until the
    /// returned capture is closed.
    fn open(
        &self,
        sink: DecodeSink,
    ) -> Result<Box<dyn CameraCapture>, ScanError>;
}

/// An open capture session. Closing releases the device.
pub trait CameraCapture: Send + Debug {
    fn close(&mut self);
}

/// Where a capture delivers decoded codes. Backed by a single-slot channel:
/// a code offered while the previous one is still unhandled is dropped.
#[derive(Debug, Clone)]
pub struct DecodeSink {
    tx: mpsc::Sender<String>,
}

impl DecodeSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Hand over a decoded code. Returns `false` when it was dropped.
    pub fn offer(&self, code: impl Into<String>) -> bool {
        self.tx.try_send(code.into()).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Software camera whose decodes are injected with [`ChannelCamera::feed`].
/// Clones share the same device.
#[derive(Debug, Clone, Default)]
pub struct ChannelCamera {
    slot: Arc<Mutex<CameraSlot>>,
}

#[derive(Debug, Default)]
struct CameraSlot {
    generation: u64,
    sink: Option<DecodeSink>,
    unavailable: Option<String>,
    opened: usize,
}

impl ChannelCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a device that cannot be acquired.
    pub fn set_unavailable(&self, reason: Option<String>) {
        self.slot.lock().unavailable = reason;
    }

    /// Deliver a decoded code to the open capture, if any.
    pub fn feed(&self, code: impl Into<String>) -> bool {
        let slot = self.slot.lock();
        let delivered = slot
            .sink
            .as_ref()
            .is_some_and(|sink| sink.offer(code));
        trace!(target: "gate::scan", delivered, "fed code to camera");
        delivered
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().sink.is_some()
    }

    /// Number of capture sessions opened so far.
    pub fn open_count(&self) -> usize {
        self.slot.lock().opened
    }
}

impl CameraDevice for ChannelCamera {
    fn open(
        &self,
        sink: DecodeSink,
    ) -> Result<Box<dyn CameraCapture>, ScanError> {
        let mut slot = self.slot.lock();
        if let Some(reason) = &slot.unavailable {
            return Err(ScanError::CameraUnavailable(reason.clone()));
        }
        if slot.sink.is_some() {
            return Err(ScanError::CameraBusy);
        }

        slot.generation += 1;
        slot.opened += 1;
        slot.sink = Some(sink);
        debug!(target: "gate::scan", generation = slot.generation, "camera opened");

        Ok(Box::new(ChannelCapture {
            slot: self.slot.clone(),
            generation: slot.generation,
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct ChannelCapture {
    slot: Arc<Mutex<CameraSlot>>,
    generation: u64,
    closed: bool,
}

impl CameraCapture for ChannelCapture {
    fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        let mut slot = self.slot.lock();
        if slot.generation == self.generation {
            slot.sink = None;
            debug!(
                target: "gate::scan",
                generation = self.generation,
                "camera released"
            );
        }
    }
}

impl Drop for ChannelCapture {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_is_exclusive_until_closed() {
        let camera = ChannelCamera::new();
        let (tx, _rx) = mpsc::channel(1);
        let mut capture = camera.open(DecodeSink::new(tx.clone())).unwrap();

        assert!(matches!(
            camera.open(DecodeSink::new(tx.clone())),
            Err(ScanError::CameraBusy)
        ));

        capture.close();
        capture.close();
        assert!(!camera.is_open());
        assert!(camera.open(DecodeSink::new(tx)).is_ok());
        assert_eq!(camera.open_count(), 2);
    }

    #[test]
    fn single_slot_drops_unhandled_decodes() {
        let camera = ChannelCamera::new();
        let (tx, mut rx) = mpsc::channel(1);
        let _capture = camera.open(DecodeSink::new(tx)).unwrap();

        assert!(camera.feed("42"));
        assert!(!camera.feed("42"));
        assert_eq!(rx.try_recv().unwrap(), "42");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn feeding_a_closed_camera_is_not_delivered() {
        let camera = ChannelCamera::new();
        assert!(!camera.feed("1"));

        camera.set_unavailable(Some("no device".into()));
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(
            camera.open(DecodeSink::new(tx)),
            Err(ScanError::CameraUnavailable(_))
        ));
    }
}
