//! In-memory fakes shared by the unit tests.

use crate::backend::AttendanceBackend;
use crate::capture::{CameraSource, MediaStream};
use crate::types::{AttendanceRecord, CheckInResult, Student, StudentId, Upload};
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub fn student(id: i64, name: &str) -> Student {
    Student {
        id: StudentId::Number(id),
        name: name.to_string(),
        image_url: None,
        created_at: None,
    }
}

pub fn record(student: Student, present: bool, confidence: Option<f64>) -> AttendanceRecord {
    AttendanceRecord {
        student,
        present,
        confidence,
        checked_in_at: None,
    }
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[derive(Debug, Default)]
pub struct TrackLog {
    pub acquired: Vec<usize>,
    pub stopped: Vec<usize>,
}

impl TrackLog {
    /// Every acquired track was stopped exactly once.
    pub fn all_tracks_stopped_once(&self) -> bool {
        let mut acquired = self.acquired.clone();
        let mut stopped = self.stopped.clone();
        acquired.sort_unstable();
        stopped.sort_unstable();
        !acquired.is_empty() && acquired == stopped
    }
}

pub struct FakeCamera {
    tracks: usize,
    deny: bool,
    fail_preview: bool,
    frames: bool,
    log: Rc<RefCell<TrackLog>>,
}

impl FakeCamera {
    pub fn new(tracks: usize) -> Self {
        Self {
            tracks,
            deny: false,
            fail_preview: false,
            frames: true,
            log: Rc::default(),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new(1)
        }
    }

    pub fn failing_preview(mut self) -> Self {
        self.fail_preview = true;
        self
    }

    pub fn without_frames(mut self) -> Self {
        self.frames = false;
        self
    }

    pub fn log(&self) -> Rc<RefCell<TrackLog>> {
        Rc::clone(&self.log)
    }
}

pub struct FakeStream {
    tracks: Vec<usize>,
    live: bool,
    fail_preview: bool,
    frames: bool,
    log: Rc<RefCell<TrackLog>>,
}

impl CameraSource for FakeCamera {
    type Stream = FakeStream;
    type Error = String;

    fn acquire(&mut self) -> Result<FakeStream, String> {
        if self.deny {
            return Err("permission denied".into());
        }
        let mut log = self.log.borrow_mut();
        let first = log.acquired.len();
        let tracks: Vec<usize> = (first..first + self.tracks).collect();
        log.acquired.extend(&tracks);
        Ok(FakeStream {
            tracks,
            live: true,
            fail_preview: self.fail_preview,
            frames: self.frames,
            log: Rc::clone(&self.log),
        })
    }
}

impl MediaStream for FakeStream {
    type Error = String;

    fn start_preview(&mut self) -> Result<(), String> {
        if self.fail_preview {
            Err("device stopped responding".into())
        } else {
            Ok(())
        }
    }

    fn grab_still(&mut self) -> Result<Upload, String> {
        if !self.live || !self.frames {
            return Err("no frame available".into());
        }
        Ok(Upload::jpeg_capture(vec![0xFF, 0xD8, 0xFF, 0xD9]))
    }

    fn stop_tracks(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.log.borrow_mut().stopped.extend(&self.tracks);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListStudents,
    CreateStudent { name: String, with_photo: bool },
    DeleteStudent(String),
    CheckIn(NaiveDate),
    Attendance(NaiveDate),
}

/// Scripted attendance server.
#[derive(Default)]
pub struct FakeBackend {
    pub students: RefCell<Vec<Student>>,
    pub attendance: RefCell<HashMap<NaiveDate, Vec<AttendanceRecord>>>,
    pub check_in_result: RefCell<Option<CheckInResult>>,
    /// Operation names (`list`, `create`, `delete`, `check_in`, `attendance`) that fail.
    pub failing: RefCell<HashSet<&'static str>>,
    pub calls: RefCell<Vec<Call>>,
    next_id: Cell<i64>,
}

impl FakeBackend {
    pub fn fail(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn attendance_calls(&self) -> Vec<NaiveDate> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Attendance(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    fn check(&self, op: &'static str) -> Result<(), String> {
        if self.failing.borrow().contains(op) {
            Err(format!("{op} failed"))
        } else {
            Ok(())
        }
    }
}

impl AttendanceBackend for FakeBackend {
    type Error = String;

    async fn list_students(&self) -> Result<Vec<Student>, String> {
        self.calls.borrow_mut().push(Call::ListStudents);
        self.check("list")?;
        Ok(self.students.borrow().clone())
    }

    async fn create_student(&self, name: &str, photo: Option<Upload>) -> Result<Student, String> {
        self.calls.borrow_mut().push(Call::CreateStudent {
            name: name.to_string(),
            with_photo: photo.is_some(),
        });
        self.check("create")?;
        let id = self.next_id.get() + 100;
        self.next_id.set(self.next_id.get() + 1);
        Ok(Student {
            image_url: photo.map(|p| format!("/uploads/{}", p.file_name)),
            ..student(id, name)
        })
    }

    async fn delete_student(&self, id: &StudentId) -> Result<(), String> {
        self.calls.borrow_mut().push(Call::DeleteStudent(id.normalized()));
        self.check("delete")
    }

    async fn check_in(&self, _photo: Upload, date: NaiveDate) -> Result<CheckInResult, String> {
        self.calls.borrow_mut().push(Call::CheckIn(date));
        self.check("check_in")?;
        self.check_in_result
            .borrow()
            .clone()
            .ok_or_else(|| "no scripted result".to_string())
    }

    async fn attendance_for(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, String> {
        self.calls.borrow_mut().push(Call::Attendance(date));
        self.check("attendance")?;
        Ok(self.attendance.borrow().get(&date).cloned().unwrap_or_default())
    }
}
