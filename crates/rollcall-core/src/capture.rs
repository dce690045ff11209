//! Webcam capture widget: owns the camera stream and the check-in result display.
//!
//! The widget knows nothing about the network. It is handed an async callback
//! that turns a captured still into a [`CheckInResult`] and renders whatever
//! comes back.

use crate::types::{CheckInResult, Student, Upload};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// A live camera stream. Dropping the widget stops every track it acquired.
pub trait MediaStream {
    type Error: fmt::Display;

    /// Begin the live preview (discard warm-up frames, start streaming).
    fn start_preview(&mut self) -> Result<(), Self::Error>;

    /// Freeze the current frame into a compressed still.
    fn grab_still(&mut self) -> Result<Upload, Self::Error>;

    /// Stop every track of this stream and release the device.
    fn stop_tracks(&mut self);
}

/// Something that can hand out a camera stream (a V4L2 device, a test fake).
pub trait CameraSource {
    type Stream: MediaStream;
    type Error: fmt::Display;

    fn acquire(&mut self) -> Result<Self::Stream, Self::Error>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("unable to access webcam: {0}")]
    CameraUnavailable(String),
    #[error("{0}")]
    CaptureProcessingFailed(String),
    #[error("could not grab a frame: {0}")]
    FrameUnavailable(String),
}

/// What gets shown for a successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub student: Student,
    pub confidence: Option<f64>,
    pub date: String,
    pub already_checked_in: bool,
    pub checked_in_at: Option<String>,
}

/// Capture widget lifecycle.
///
/// `Succeeded`, `NoMatch` and `Failed` are `Ready` with a result on screen:
/// capturing again is allowed from any of them.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Initializing,
    Ready,
    Capturing,
    AwaitingResult,
    Succeeded(MatchSummary),
    NoMatch { date: String },
    Failed(CaptureError),
    /// Terminal for this widget instance.
    Unavailable(CaptureError),
}

impl CaptureState {
    /// Classify a server verdict. A result only counts as a match when it
    /// also names the student; everything else is a miss and carries no
    /// student details.
    pub fn from_result(result: CheckInResult) -> Self {
        match (result.matched, result.student) {
            (true, Some(student)) => CaptureState::Succeeded(MatchSummary {
                student,
                confidence: result.confidence,
                date: result.date,
                already_checked_in: result.already_checked_in.unwrap_or(false),
                checked_in_at: result.checked_in_at,
            }),
            _ => CaptureState::NoMatch { date: result.date },
        }
    }

    fn shows_result(&self) -> bool {
        matches!(
            self,
            CaptureState::Succeeded(_) | CaptureState::NoMatch { .. } | CaptureState::Failed(_)
        )
    }
}

/// Stops the stream's tracks when dropped, whatever state the widget is in.
struct StreamGuard<S: MediaStream> {
    stream: S,
}

impl<S: MediaStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.stream.stop_tracks();
        tracing::debug!("camera stream released");
    }
}

pub struct CaptureWidget<C: CameraSource> {
    source: C,
    stream: Option<StreamGuard<C::Stream>>,
    state: CaptureState,
    on_pending: Option<Box<dyn FnMut(&CaptureState)>>,
}

impl<C: CameraSource> CaptureWidget<C> {
    pub fn new(source: C) -> Self {
        Self {
            source,
            stream: None,
            state: CaptureState::Initializing,
            on_pending: None,
        }
    }

    /// Call `notice` with the pending state once a still has been grabbed,
    /// before the check-in callback is awaited.
    pub fn on_pending(mut self, notice: impl FnMut(&CaptureState) + 'static) -> Self {
        self.on_pending = Some(Box::new(notice));
        self
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Acquire the camera and start the preview.
    pub fn initialize(&mut self) -> &CaptureState {
        self.acquire_device();
        self.start_preview();
        &self.state
    }

    /// First half of initialization: open the device.
    ///
    /// From here on the stream is owned by the widget and released on drop,
    /// even if the preview never starts.
    pub fn acquire_device(&mut self) {
        if self.state != CaptureState::Initializing || self.stream.is_some() {
            return;
        }
        match self.source.acquire() {
            Ok(stream) => self.stream = Some(StreamGuard { stream }),
            Err(e) => {
                tracing::warn!(error = %e, "camera unavailable");
                self.state = CaptureState::Unavailable(CaptureError::CameraUnavailable(e.to_string()));
            }
        }
    }

    /// Second half of initialization: start the live preview.
    pub fn start_preview(&mut self) {
        if self.state != CaptureState::Initializing {
            return;
        }
        let Some(guard) = self.stream.as_mut() else {
            return;
        };
        match guard.stream.start_preview() {
            Ok(()) => {
                tracing::info!("camera ready");
                self.state = CaptureState::Ready;
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera preview failed");
                self.stream = None;
                self.state = CaptureState::Unavailable(CaptureError::CameraUnavailable(e.to_string()));
            }
        }
    }

    pub fn can_capture(&self) -> bool {
        self.stream.is_some() && (self.state == CaptureState::Ready || self.state.shows_result())
    }

    /// Grab a still, hand it to `on_capture` and display the outcome.
    ///
    /// A no-op unless the widget is ready.
    pub async fn capture<F, Fut, E>(&mut self, on_capture: F) -> &CaptureState
    where
        F: FnOnce(Upload) -> Fut,
        Fut: Future<Output = Result<CheckInResult, E>>,
        E: fmt::Display,
    {
        if !self.can_capture() {
            tracing::debug!(state = ?self.state, "capture ignored; widget not ready");
            return &self.state;
        }
        let Some(guard) = self.stream.as_mut() else {
            return &self.state;
        };

        self.state = CaptureState::Capturing;
        let still = match guard.stream.grab_still() {
            Ok(still) => still,
            Err(e) => {
                tracing::warn!(error = %e, "failed to grab still");
                self.state = CaptureState::Failed(CaptureError::FrameUnavailable(e.to_string()));
                return &self.state;
            }
        };
        tracing::debug!(bytes = still.bytes.len(), "still captured");

        self.state = CaptureState::AwaitingResult;
        if let Some(notice) = self.on_pending.as_mut() {
            notice(&self.state);
        }
        self.state = match on_capture(still).await {
            Ok(result) => CaptureState::from_result(result),
            Err(e) => {
                tracing::warn!(error = %e, "check-in failed");
                CaptureState::Failed(CaptureError::CaptureProcessingFailed(e.to_string()))
            }
        };
        &self.state
    }

    /// Close the result panel.
    pub fn dismiss(&mut self) {
        if self.state.shows_result() {
            self.state = CaptureState::Ready;
        }
    }

    /// Tear the widget down and release the camera.
    pub fn unmount(self) {
        tracing::debug!(state = ?self.state, "capture widget unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{student, FakeCamera};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn matched(name: &str) -> CheckInResult {
        CheckInResult {
            matched: true,
            student: Some(student(7, name)),
            confidence: Some(0.87),
            date: "2024-01-01".into(),
            already_checked_in: Some(false),
            checked_in_at: Some("2024-01-01T09:00:00Z".into()),
        }
    }

    #[tokio::test]
    async fn test_initialize_then_drop_stops_tracks() {
        let camera = FakeCamera::new(2);
        let log = camera.log();
        let mut widget = CaptureWidget::new(camera);
        assert_eq!(widget.initialize(), &CaptureState::Ready);
        assert!(log.borrow().stopped.is_empty());

        drop(widget);
        assert!(log.borrow().all_tracks_stopped_once());
        assert_eq!(log.borrow().stopped.len(), 2);
    }

    #[test]
    fn test_acquire_failure_is_terminal() {
        let camera = FakeCamera::denied();
        let log = camera.log();
        let mut widget = CaptureWidget::new(camera);
        widget.initialize();

        assert!(matches!(
            widget.state(),
            CaptureState::Unavailable(CaptureError::CameraUnavailable(_))
        ));
        assert!(!widget.can_capture());
        widget.dismiss();
        assert!(matches!(widget.state(), CaptureState::Unavailable(_)));
        assert!(log.borrow().acquired.is_empty());
    }

    #[tokio::test]
    async fn test_capture_ignored_when_unavailable() {
        let mut widget = CaptureWidget::new(FakeCamera::denied());
        widget.initialize();
        let mut called = false;
        widget
            .capture(|_| {
                called = true;
                async { Ok::<_, String>(matched("Ann")) }
            })
            .await;
        assert!(!called);
    }

    #[test]
    fn test_preview_failure_releases_camera() {
        let camera = FakeCamera::new(1).failing_preview();
        let log = camera.log();
        let mut widget = CaptureWidget::new(camera);
        widget.initialize();

        assert!(matches!(widget.state(), CaptureState::Unavailable(_)));
        // Released right away, not only at teardown.
        assert!(log.borrow().all_tracks_stopped_once());
        drop(widget);
        assert!(log.borrow().all_tracks_stopped_once());
    }

    #[test]
    fn test_drop_mid_initialization_stops_tracks() {
        let camera = FakeCamera::new(3);
        let log = camera.log();
        let mut widget = CaptureWidget::new(camera);
        widget.acquire_device();
        assert_eq!(widget.state(), &CaptureState::Initializing);
        assert_eq!(log.borrow().acquired.len(), 3);

        drop(widget);
        assert!(log.borrow().all_tracks_stopped_once());
    }

    #[test]
    fn test_unmount_before_initialize_acquires_nothing() {
        let camera = FakeCamera::new(1);
        let log = camera.log();
        CaptureWidget::new(camera).unmount();
        assert!(log.borrow().acquired.is_empty());
        assert!(log.borrow().stopped.is_empty());
    }

    #[tokio::test]
    async fn test_capture_match_succeeds() {
        let mut widget = CaptureWidget::new(FakeCamera::new(1));
        widget.initialize();

        let mut seen = None;
        let state = widget
            .capture(|still| {
                seen = Some(still);
                async { Ok::<_, String>(matched("Ann")) }
            })
            .await;

        let CaptureState::Succeeded(summary) = state else {
            panic!("expected a match, got {state:?}");
        };
        assert_eq!(summary.student.name, "Ann");
        assert_eq!(summary.confidence, Some(0.87));
        assert!(!summary.already_checked_in);

        let still = seen.unwrap();
        assert_eq!(still.file_name, "capture.jpg");
        assert_eq!(still.content_type, "image/jpeg");
        assert!(!still.bytes.is_empty());
    }

    #[tokio::test]
    async fn test_no_match_drops_student_details() {
        let mut widget = CaptureWidget::new(FakeCamera::new(1));
        widget.initialize();

        let mut odd = matched("Ann");
        odd.matched = false;
        let state = widget.capture(|_| async { Ok::<_, String>(odd) }).await;
        assert_eq!(state, &CaptureState::NoMatch { date: "2024-01-01".into() });
    }

    #[tokio::test]
    async fn test_match_without_student_is_no_match() {
        let mut widget = CaptureWidget::new(FakeCamera::new(1));
        widget.initialize();

        let mut odd = matched("Ann");
        odd.student = None;
        let state = widget.capture(|_| async { Ok::<_, String>(odd) }).await;
        assert!(matches!(state, CaptureState::NoMatch { .. }));
    }

    #[tokio::test]
    async fn test_callback_failure_then_retry() {
        let mut widget = CaptureWidget::new(FakeCamera::new(1));
        widget.initialize();

        let state = widget
            .capture(|_| async { Err::<CheckInResult, _>("server exploded".to_string()) })
            .await;
        assert_eq!(
            state,
            &CaptureState::Failed(CaptureError::CaptureProcessingFailed("server exploded".into()))
        );
        assert!(widget.can_capture());

        let state = widget.capture(|_| async { Ok::<_, String>(matched("Bo")) }).await;
        assert!(matches!(state, CaptureState::Succeeded(_)));
    }

    #[tokio::test]
    async fn test_frame_failure_reported() {
        let mut widget = CaptureWidget::new(FakeCamera::new(1).without_frames());
        widget.initialize();

        let mut called = false;
        let state = widget
            .capture(|_| {
                called = true;
                async { Ok::<_, String>(matched("Ann")) }
            })
            .await;
        assert!(matches!(
            state,
            CaptureState::Failed(CaptureError::FrameUnavailable(_))
        ));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_pending_notice_before_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let notices = Rc::clone(&seen);
        let mut widget = CaptureWidget::new(FakeCamera::new(1))
            .on_pending(move |state| notices.borrow_mut().push(state.clone()));
        widget.initialize();

        let log = Rc::clone(&seen);
        widget
            .capture(|_| {
                assert_eq!(*log.borrow(), [CaptureState::AwaitingResult]);
                async { Ok::<_, String>(matched("Ann")) }
            })
            .await;
        assert_eq!(*seen.borrow(), [CaptureState::AwaitingResult]);
    }

    #[tokio::test]
    async fn test_no_pending_notice_without_frame() {
        let seen = Rc::new(RefCell::new(0));
        let count = Rc::clone(&seen);
        let mut widget = CaptureWidget::new(FakeCamera::new(1).without_frames())
            .on_pending(move |_| *count.borrow_mut() += 1);
        widget.initialize();

        widget.capture(|_| async { Ok::<_, String>(matched("Ann")) }).await;
        assert_eq!(*seen.borrow(), 0);
    }

    #[tokio::test]
    async fn test_dismiss_returns_to_ready() {
        let mut widget = CaptureWidget::new(FakeCamera::new(1));
        widget.initialize();
        widget.capture(|_| async { Ok::<_, String>(matched("Ann")) }).await;

        widget.dismiss();
        assert_eq!(widget.state(), &CaptureState::Ready);
    }
}
