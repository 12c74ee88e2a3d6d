//! Database models
//!
//! `*Row` types mirror table columns (ids as TEXT); the plain types are what
//! the rest of the code works with.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendance::{AttendanceStatus, RecordedLocation};
use crate::face::DESCRIPTOR_LEN;
use crate::slot::Slot;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Corrupt id '{}': {}", raw, e)))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub student_code: String,
    pub roll_number: String,
    pub course: String,
    pub year: String,
    pub face_descriptor: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub student_code: String,
    pub roll_number: String,
    pub course: String,
    pub year: String,
    pub face_descriptor: Option<Vec<f64>>,
    pub created_at: NaiveDateTime,
}

impl Student {
    /// Stored descriptor is present with the full 128 components
    pub fn has_face_descriptor(&self) -> bool {
        self.face_descriptor
            .as_ref()
            .is_some_and(|d| d.len() == DESCRIPTOR_LEN)
    }
}

impl TryFrom<StudentRow> for Student {
    type Error = Error;

    fn try_from(row: StudentRow) -> Result<Self> {
        // An unreadable descriptor is treated as no descriptor
        let face_descriptor = row
            .face_descriptor
            .as_deref()
            .and_then(|json| serde_json::from_str::<Vec<f64>>(json).ok());
        Ok(Self {
            id: parse_id(&row.id)?,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            student_code: row.student_code,
            roll_number: row.roll_number,
            course: row.course,
            year: row.year,
            face_descriptor,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeacherRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub department: String,
    pub employee_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub department: String,
    pub employee_id: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<TeacherRow> for Teacher {
    type Error = Error;

    fn try_from(row: TeacherRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id)?,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            department: row.department,
            employee_id: row.employee_id,
            created_at: row.created_at,
        })
    }
}

/// Attendance row joined with the owning student's identity
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: String,
    pub student_id: String,
    pub calendar_date: NaiveDate,
    pub slot: String,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub face_verified: bool,
    pub marked_at: NaiveDateTime,
    pub student_name: Option<String>,
    pub roll_number: Option<String>,
    pub year: Option<String>,
    pub email: Option<String>,
}

/// Attendance event as reported back to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub slot: Slot,
    pub status: AttendanceStatus,
    pub location: RecordedLocation,
    pub face_verified: bool,
    pub marked_at: NaiveDateTime,
    #[serde(skip)]
    pub student: Option<StudentSummary>,
}

/// Identity fields shown next to an attendance record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub name: String,
    pub roll_number: String,
    pub year: String,
    pub email: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = Error;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        let student = match (row.student_name, row.roll_number, row.year, row.email) {
            (Some(name), Some(roll_number), Some(year), Some(email)) => Some(StudentSummary {
                name,
                roll_number,
                year,
                email,
            }),
            _ => None,
        };
        Ok(Self {
            id: parse_id(&row.id)?,
            student_id: parse_id(&row.student_id)?,
            date: row.calendar_date,
            slot: row
                .slot
                .parse()
                .map_err(|_| Error::Internal(format!("Corrupt slot '{}'", row.slot)))?,
            status: row
                .status
                .parse()
                .map_err(|_| Error::Internal(format!("Corrupt status '{}'", row.status)))?,
            location: RecordedLocation {
                address: row
                    .address
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| format!("{:.5}, {:.5}", row.latitude, row.longitude)),
                latitude: row.latitude,
                longitude: row.longitude,
            },
            face_verified: row.face_verified,
            marked_at: row.marked_at,
            student,
        })
    }
}

/// Mark sheet header without its entries
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MarkSheetSummary {
    pub id: String,
    pub subject: String,
    pub total_students: i64,
    pub average_mark: f64,
    pub highest_mark: i64,
    pub lowest_mark: i64,
    pub saved_at: NaiveDateTime,
}
