//! rollcall-hw: Webcam access for the attendance console.
//!
//! V4L2 capture, pixel conversion and JPEG still encoding, exposed to the
//! capture widget through [`V4lSource`].

pub mod camera;
pub mod frame;
pub mod source;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::Frame;
pub use source::{V4lSource, V4lStream};
