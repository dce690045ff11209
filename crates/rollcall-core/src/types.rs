use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque student identifier as handed out by the attendance server.
///
/// The server is not consistent about whether ids are numbers or strings,
/// so equality and hashing go through the string form: `7 == "7"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudentId {
    Number(i64),
    Text(String),
}

impl StudentId {
    /// String-normalized form used for comparisons and URL paths.
    pub fn normalized(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentId::Number(n) => write!(f, "{n}"),
            StudentId::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for StudentId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StudentId::Number(a), StudentId::Number(b)) => a == b,
            _ => self.normalized() == other.normalized(),
        }
    }
}

impl Eq for StudentId {}

impl Hash for StudentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl From<i64> for StudentId {
    fn from(n: i64) -> Self {
        StudentId::Number(n)
    }
}

impl From<&str> for StudentId {
    fn from(s: &str) -> Self {
        StudentId::Text(s.to_string())
    }
}

impl From<String> for StudentId {
    fn from(s: String) -> Self {
        StudentId::Text(s)
    }
}

/// A registered student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Reference photo, absolute or relative to the API origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Attendance status of one student for the queried date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student: Student,
    pub present: bool,
    /// Match score in [0, 1].
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub checked_in_at: Option<String>,
}

/// Server verdict for a single captured still.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInResult {
    pub matched: bool,
    #[serde(default)]
    pub student: Option<Student>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Day the check-in was recorded for (`YYYY-MM-DD`).
    pub date: String,
    #[serde(default)]
    pub already_checked_in: Option<bool>,
    #[serde(default)]
    pub checked_in_at: Option<String>,
}

/// A file part for a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// A still frame grabbed from the camera, JPEG encoded.
    pub fn jpeg_capture(bytes: Vec<u8>) -> Self {
        Self {
            file_name: "capture.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes,
        }
    }
}

/// Present/absent tally for one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceCounts {
    pub present: usize,
    pub absent: usize,
    pub total: usize,
}

impl AttendanceCounts {
    /// Reduce an attendance list into counts.
    pub fn tally(records: &[AttendanceRecord]) -> Self {
        let present = records.iter().filter(|r| r.present).count();
        Self {
            present,
            absent: records.len() - present,
            total: records.len(),
        }
    }
}
