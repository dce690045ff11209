//! Plain-text rendering of cards, counts and capture results.

use crate::capture::{CaptureError, CaptureState, MatchSummary};
use crate::types::{AttendanceCounts, AttendanceRecord, Student};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt;

/// Resolve a photo URL returned by the server against the API origin.
pub fn resolve_image_url(base: &str, url: &str) -> String {
    if url.starts_with("http") {
        return url.to_string();
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

/// Render a server timestamp as local `HH:MM`.
pub fn format_clock_time(raw: &str) -> String {
    format_clock_time_in(raw, &Local)
}

/// Render a server timestamp as `HH:MM` in `tz`.
///
/// Timestamps without an offset are taken to already be in `tz`.
/// Anything unparseable is returned verbatim.
pub fn format_clock_time_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    format_timestamp_in(raw, tz, "%H:%M")
}

/// Render a server timestamp as a local `YYYY-MM-DD` day.
pub fn format_day(raw: &str) -> String {
    format_timestamp_in(raw, &Local, "%Y-%m-%d")
}

fn format_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz, out: &str) -> String
where
    Tz::Offset: fmt::Display,
{
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(tz).format(out).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
                return dt.format(out).to_string();
            }
        }
    }
    raw.to_string()
}

/// Attendance status attached to a student card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardStatus<'a> {
    pub present: bool,
    pub confidence: Option<f64>,
    pub checked_in_at: Option<&'a str>,
}

impl<'a> CardStatus<'a> {
    pub const ABSENT: CardStatus<'static> = CardStatus {
        present: false,
        confidence: None,
        checked_in_at: None,
    };

    pub fn from_record(record: &'a AttendanceRecord) -> Self {
        Self {
            present: record.present,
            confidence: record.confidence,
            checked_in_at: record.checked_in_at.as_deref(),
        }
    }
}

/// One roster entry as shown to the operator.
#[derive(Debug, Clone, Copy)]
pub struct StudentCard<'a> {
    pub student: &'a Student,
    /// `None` outside the dashboard, where no date is selected.
    pub status: Option<CardStatus<'a>>,
    pub image_base: &'a str,
}

impl StudentCard<'_> {
    pub fn photo(&self) -> Option<String> {
        self.student
            .image_url
            .as_deref()
            .map(|url| resolve_image_url(self.image_base, url))
    }
}

impl fmt::Display for StudentCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = &self.status {
            let badge = if status.present { "Present" } else { "Absent" };
            write!(f, "[{badge}] ")?;
        }
        writeln!(f, "{} (ID: {})", self.student.name, self.student.id)?;
        match self.photo() {
            Some(url) => writeln!(f, "    Photo: {url}")?,
            None => writeln!(f, "    No Photo")?,
        }
        if self.status.is_none() {
            if let Some(created) = self.student.created_at.as_deref() {
                writeln!(f, "    Registered: {}", format_day(created))?;
            }
        }
        if let Some(status) = self.status.filter(|s| s.present) {
            if let Some(confidence) = status.confidence {
                writeln!(f, "    Confidence: {:.0}%", confidence * 100.0)?;
            }
            if let Some(at) = status.checked_in_at {
                writeln!(f, "    Checked in: {}", format_clock_time(at))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for AttendanceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Present: {}  Absent: {}  Total: {}",
            self.present, self.absent, self.total
        )
    }
}

/// The capture widget's result area.
pub struct CaptureView<'a>(pub &'a CaptureState);

impl fmt::Display for CaptureView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            CaptureState::Initializing => writeln!(f, "Starting camera..."),
            CaptureState::Ready => writeln!(f, "Camera ready."),
            CaptureState::Capturing | CaptureState::AwaitingResult => writeln!(f, "Checking..."),
            CaptureState::Succeeded(summary) => write_match(f, summary),
            CaptureState::NoMatch { .. } => writeln!(f, "No match found."),
            CaptureState::Failed(e) => writeln!(f, "{e}"),
            CaptureState::Unavailable(CaptureError::CameraUnavailable(_)) => {
                writeln!(f, "Unable to access webcam")
            }
            CaptureState::Unavailable(e) => writeln!(f, "{e}"),
        }
    }
}

fn write_match(f: &mut fmt::Formatter<'_>, summary: &MatchSummary) -> fmt::Result {
    writeln!(f, "Present: {}", summary.student.name)?;
    if let Some(confidence) = summary.confidence {
        writeln!(f, "Confidence: {:.1}%", confidence * 100.0)?;
    }
    writeln!(f, "Date: {}", summary.date)?;
    let at = summary.checked_in_at.as_deref().map(format_clock_time);
    match (summary.already_checked_in, at) {
        (true, Some(at)) => writeln!(f, "Already checked in at {at}"),
        (true, None) => writeln!(f, "Already checked in"),
        (false, Some(at)) => writeln!(f, "Checked in at {at}"),
        (false, None) => Ok(()),
    }
}
