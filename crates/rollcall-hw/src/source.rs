//! Camera source for the capture widget, backed by a V4L2 device.

use crate::camera::{Camera, CameraError};
use rollcall_core::{CameraSource, MediaStream, Upload};

/// Attempts per still before giving up on finding a non-dark frame.
const STILL_ATTEMPTS: usize = 5;

/// Opens a V4L2 device on demand.
#[derive(Debug, Clone)]
pub struct V4lSource {
    pub device_path: String,
    pub jpeg_quality: u8,
    pub warmup_frames: usize,
}

impl V4lSource {
    pub fn new(device_path: impl Into<String>, jpeg_quality: u8, warmup_frames: usize) -> Self {
        Self {
            device_path: device_path.into(),
            jpeg_quality,
            warmup_frames,
        }
    }
}

impl CameraSource for V4lSource {
    type Stream = V4lStream;
    type Error = CameraError;

    fn acquire(&mut self) -> Result<V4lStream, CameraError> {
        let camera = Camera::open(&self.device_path)?;
        Ok(V4lStream {
            camera: Some(camera),
            jpeg_quality: self.jpeg_quality,
            warmup_frames: self.warmup_frames,
        })
    }
}

/// An open V4L2 device. A V4L2 capture node carries a single video track.
pub struct V4lStream {
    camera: Option<Camera>,
    jpeg_quality: u8,
    warmup_frames: usize,
}

impl V4lStream {
    fn camera(&self) -> Result<&Camera, CameraError> {
        self.camera.as_ref().ok_or(CameraError::Stopped)
    }
}

impl MediaStream for V4lStream {
    type Error = CameraError;

    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.camera()?.warm_up(self.warmup_frames)
    }

    fn grab_still(&mut self) -> Result<Upload, CameraError> {
        let frame = self.camera()?.capture_still(STILL_ATTEMPTS)?;
        tracing::debug!(
            seq = frame.sequence,
            brightness = frame.avg_brightness(),
            dark = frame.is_dark,
            "still frame grabbed"
        );
        Ok(Upload::jpeg_capture(frame.to_jpeg(self.jpeg_quality)?))
    }

    fn stop_tracks(&mut self) {
        if let Some(camera) = self.camera.take() {
            tracing::info!(device = %camera.device_path, "camera closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_not_found() {
        let mut source = V4lSource::new("/dev/rollcall-does-not-exist", 90, 0);
        assert!(matches!(source.acquire(), Err(CameraError::DeviceNotFound(_))));
    }

    #[test]
    fn test_stopped_stream_refuses_stills() {
        let mut stream = V4lStream {
            camera: None,
            jpeg_quality: 90,
            warmup_frames: 0,
        };
        assert!(matches!(stream.grab_still(), Err(CameraError::Stopped)));
        assert!(matches!(stream.start_preview(), Err(CameraError::Stopped)));
        // Idempotent.
        stream.stop_tracks();
        stream.stop_tracks();
    }
}
