//! Attendance dashboard: roster plus the attendance snapshot for one date.

use crate::backend::AttendanceBackend;
use crate::capture::{CameraSource, CaptureWidget};
use crate::roster::RosterView;
use crate::types::{AttendanceCounts, AttendanceRecord, StudentId};
use crate::view::{CardStatus, StudentCard};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;

pub struct Dashboard<B: AttendanceBackend> {
    backend: B,
    image_base: String,
    date: NaiveDate,
    roster: RosterView,
    attendance: Vec<AttendanceRecord>,
}

impl<B: AttendanceBackend> Dashboard<B> {
    /// Dashboard for today's local date.
    pub fn new(backend: B, image_base: impl Into<String>) -> Self {
        Self::with_date(backend, image_base, Local::now().date_naive())
    }

    pub fn with_date(backend: B, image_base: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            backend,
            image_base: image_base.into(),
            date,
            roster: RosterView::default(),
            attendance: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn roster(&self) -> &RosterView {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut RosterView {
        &mut self.roster
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    /// Initial load: roster and attendance are fetched independently.
    pub async fn mount(&mut self) {
        self.roster.load(&self.backend).await;
        self.refresh_attendance().await;
    }

    /// Select another date. Only the attendance list depends on it.
    pub async fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.refresh_attendance().await;
    }

    pub async fn refresh_roster(&mut self) -> bool {
        self.roster.load(&self.backend).await
    }

    /// Replace the attendance snapshot for the selected date.
    ///
    /// Attendance is best-effort: a failed fetch shows as an empty list.
    pub async fn refresh_attendance(&mut self) {
        match self.backend.attendance_for(self.date).await {
            Ok(records) => {
                tracing::debug!(date = %self.date, count = records.len(), "attendance loaded");
                self.attendance = records;
            }
            Err(e) => {
                tracing::warn!(date = %self.date, error = %e, "failed to fetch attendance");
                self.attendance = Vec::new();
            }
        }
    }

    pub async fn add_student(&mut self) -> bool {
        self.roster.submit(&self.backend).await
    }

    pub async fn remove_student(&mut self, id: &StudentId) -> bool {
        self.roster.remove(&self.backend, id).await
    }

    pub fn counts(&self) -> AttendanceCounts {
        AttendanceCounts::tally(&self.attendance)
    }

    /// Roster joined with the attendance snapshot. Students missing from the
    /// snapshot are absent.
    pub fn cards(&self) -> Vec<StudentCard<'_>> {
        let by_id: HashMap<&StudentId, &AttendanceRecord> = self
            .attendance
            .iter()
            .map(|r| (&r.student.id, r))
            .collect();

        self.roster
            .students()
            .iter()
            .map(|student| StudentCard {
                student,
                status: Some(
                    by_id
                        .get(&student.id)
                        .map(|r| CardStatus::from_record(r))
                        .unwrap_or(CardStatus::ABSENT),
                ),
                image_base: &self.image_base,
            })
            .collect()
    }

    /// Run one capture through `widget`, checking in for the selected date.
    ///
    /// Whenever the server reports a match the whole attendance list is
    /// refreshed, even if the widget has no student to show for it.
    pub async fn check_in<C: CameraSource>(&mut self, widget: &mut CaptureWidget<C>) -> bool {
        let date = self.date;
        let backend = &self.backend;
        let mut matched = false;
        let verdict = &mut matched;
        widget
            .capture(move |photo| async move {
                let result = backend.check_in(photo, date).await;
                if let Ok(result) = &result {
                    *verdict = result.matched;
                }
                result
            })
            .await;

        if matched {
            self.refresh_attendance().await;
        }
        matched
    }
}
