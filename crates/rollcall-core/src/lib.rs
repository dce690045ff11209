//! rollcall-core: Domain types and view-state for the attendance console.
//!
//! Holds the roster, the per-date attendance dashboard and the webcam
//! capture state machine. No I/O happens here: the server is reached through
//! [`AttendanceBackend`] and the camera through [`CameraSource`].

pub mod backend;
pub mod capture;
pub mod dashboard;
pub mod roster;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

pub use backend::AttendanceBackend;
pub use capture::{CameraSource, CaptureError, CaptureState, CaptureWidget, MediaStream};
pub use dashboard::Dashboard;
pub use roster::RosterView;
pub use types::{AttendanceCounts, AttendanceRecord, CheckInResult, Student, StudentId, Upload};
