//! The attendance server's REST endpoints.

use crate::client::ApiClient;
use crate::error::ApiError;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use rollcall_core::{AttendanceBackend, AttendanceRecord, CheckInResult, Student, StudentId, Upload};
use serde_json::Value;

fn file_part(upload: Upload) -> Result<Part, ApiError> {
    Ok(Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&upload.content_type)?)
}

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl AttendanceBackend for ApiClient {
    type Error = ApiError;

    async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        self.get("/students").await
    }

    async fn create_student(&self, name: &str, photo: Option<Upload>) -> Result<Student, ApiError> {
        let mut form = Form::new().text("name", name.to_string());
        if let Some(photo) = photo {
            form = form.part("image", file_part(photo)?);
        }
        self.post("/students", form).await
    }

    async fn delete_student(&self, id: &StudentId) -> Result<(), ApiError> {
        let _: Value = self.del(&format!("/students/{id}")).await?;
        Ok(())
    }

    async fn check_in(&self, photo: Upload, date: NaiveDate) -> Result<CheckInResult, ApiError> {
        let form = Form::new()
            .part("photo", file_part(photo)?)
            .text("date", date_param(date));
        let result: CheckInResult = self.post("/attendance/check-in", form).await?;
        tracing::info!(
            matched = result.matched,
            student = result.student.as_ref().map(|s| s.name.as_str()),
            date = %result.date,
            "check-in answered"
        );
        Ok(result)
    }

    async fn attendance_for(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, ApiError> {
        self.get(&format!("/attendance/status/{}", date_param(date))).await
    }
}
