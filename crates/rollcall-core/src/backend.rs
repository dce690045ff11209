//! Seam between the view-state machines and the attendance server.

use crate::types::{AttendanceRecord, CheckInResult, Student, StudentId, Upload};
use chrono::NaiveDate;
use std::fmt;
use std::future::Future;

/// Operations the dashboard needs from the attendance server.
///
/// Every call is a single round trip: no retries, no caching.
pub trait AttendanceBackend {
    type Error: fmt::Display;

    /// Full roster.
    fn list_students(&self) -> impl Future<Output = Result<Vec<Student>, Self::Error>>;

    /// Register a student with an optional reference photo.
    fn create_student(
        &self,
        name: &str,
        photo: Option<Upload>,
    ) -> impl Future<Output = Result<Student, Self::Error>>;

    fn delete_student(&self, id: &StudentId) -> impl Future<Output = Result<(), Self::Error>>;

    /// Submit a captured still to be matched for `date`.
    fn check_in(
        &self,
        photo: Upload,
        date: NaiveDate,
    ) -> impl Future<Output = Result<CheckInResult, Self::Error>>;

    /// Attendance list for `date`.
    fn attendance_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>>;
}
