//! QR scanning: the camera port and the dispatcher that owns it.

pub mod camera;
pub mod dispatcher;

pub use camera::{CameraCapture, CameraDevice, ChannelCamera, DecodeSink};
pub use dispatcher::QrScanDispatcher;
