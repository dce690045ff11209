//! Student roster: list, add, remove.
//!
//! The local list is a cache of the server's roster. `load` replaces it
//! wholesale; `submit` and `remove` patch it only after the server confirmed
//! the change, and the next `load` discards those patches.

use crate::backend::AttendanceBackend;
use crate::types::{Student, StudentId, Upload};

/// The "Add Student" form.
#[derive(Debug, Default)]
pub struct AddStudentForm {
    pub name: String,
    pub photo: Option<Upload>,
    submitting: bool,
}

impl AddStudentForm {
    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.name.trim().is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    fn clear(&mut self) {
        self.name.clear();
        self.photo = None;
    }
}

#[derive(Debug, Default)]
pub struct RosterView {
    students: Vec<Student>,
    pub form: AddStudentForm,
    error: Option<String>,
}

impl RosterView {
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// Last failure message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch the full roster. On failure the current list is kept.
    pub async fn load<B: AttendanceBackend>(&mut self, backend: &B) -> bool {
        self.error = None;
        match backend.list_students().await {
            Ok(students) => {
                tracing::debug!(count = students.len(), "roster loaded");
                self.students = students;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load students");
                self.error = Some(e.to_string());
                false
            }
        }
    }

    /// Submit the add form. The created student goes to the head of the list.
    pub async fn submit<B: AttendanceBackend>(&mut self, backend: &B) -> bool {
        if !self.form.can_submit() {
            return false;
        }
        self.form.submitting = true;
        self.error = None;

        let name = self.form.name.trim().to_string();
        let result = backend.create_student(&name, self.form.photo.clone()).await;
        self.form.submitting = false;

        match result {
            Ok(created) => {
                tracing::info!(id = %created.id, name = %created.name, "student added");
                self.students.insert(0, created);
                self.form.clear();
                true
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "failed to add student");
                self.error = Some(e.to_string());
                false
            }
        }
    }

    /// Delete a student. The local list only changes once the server agreed.
    pub async fn remove<B: AttendanceBackend>(&mut self, backend: &B, id: &StudentId) -> bool {
        match backend.delete_student(id).await {
            Ok(()) => {
                tracing::info!(id = %id, "student removed");
                self.students.retain(|s| s.id != *id);
                true
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "failed to remove student");
                self.error = Some(e.to_string());
                false
            }
        }
    }
}
