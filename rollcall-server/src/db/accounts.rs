//! Student and teacher accounts

use chrono::NaiveDateTime;
use rollcall_common::db::{Student, StudentRow, Teacher, TeacherRow};
use rollcall_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::{fold_case, unique_violation};

pub const DUPLICATE_EMAIL: &str = "An account with this email already exists";
pub const DUPLICATE_ROLL_NUMBER: &str = "This roll number is already registered";
pub const DUPLICATE_EMPLOYEE_ID: &str = "This Employee ID is already registered";

const STUDENT_COLUMNS: &str = "id, name, email, password_hash, student_code, roll_number, course, year, face_descriptor, created_at";
const TEACHER_COLUMNS: &str = "id, name, email, password_hash, department, employee_id, created_at";

/// Registration data after normalization
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roll_number: String,
    pub year: String,
}

impl NewStudent {
    /// `STU-` followed by the roll number without whitespace
    pub fn student_code(&self) -> String {
        let compact: String = self.roll_number.split_whitespace().collect();
        format!("STU-{}", compact.to_uppercase())
    }
}

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub department: String,
    pub employee_id: String,
}

// ========================================
// Students
// ========================================

pub async fn insert_student(pool: &SqlitePool, new: &NewStudent, now: NaiveDateTime) -> Result<Student> {
    if find_student_by_email(pool, &new.email).await?.is_some() {
        return Err(Error::Conflict(DUPLICATE_EMAIL.to_string()));
    }
    let roll_taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE roll_number = ?")
        .bind(&new.roll_number)
        .fetch_one(pool)
        .await?;
    if roll_taken > 0 {
        return Err(Error::Conflict(DUPLICATE_ROLL_NUMBER.to_string()));
    }

    let id = Uuid::new_v4();
    let result = sqlx::query(
        r#"
        INSERT INTO students (id, name, email, password_hash, student_code, roll_number, course, year, created_at,
                              name_folded, roll_number_folded)
        VALUES (?, ?, ?, ?, ?, ?, 'N/A', ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(new.student_code())
    .bind(&new.roll_number)
    .bind(&new.year)
    .bind(now)
    .bind(fold_case(&new.name))
    .bind(fold_case(&new.roll_number))
    .execute(pool)
    .await;

    // A concurrent registration can still win the race past the checks above
    if let Err(e) = &result {
        if let Some(msg) = unique_violation(e) {
            let taken = if msg.contains("email") { DUPLICATE_EMAIL } else { DUPLICATE_ROLL_NUMBER };
            return Err(Error::Conflict(taken.to_string()));
        }
    }
    result?;

    info!("Registered student {} ({})", new.roll_number, id);
    find_student(pool, id)
        .await?
        .ok_or_else(|| Error::Internal("Student vanished after insert".to_string()))
}

pub async fn find_student(pool: &SqlitePool, id: Uuid) -> Result<Option<Student>> {
    let row: Option<StudentRow> = sqlx::query_as(&format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(Student::try_from).transpose()
}

pub async fn find_student_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Student>> {
    let row: Option<StudentRow> = sqlx::query_as(&format!("SELECT {} FROM students WHERE email = ?", STUDENT_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    row.map(Student::try_from).transpose()
}

/// Replace the stored face descriptor; false when the student is gone
pub async fn set_face_descriptor(pool: &SqlitePool, id: Uuid, descriptor: &[f64]) -> Result<bool> {
    let json = serde_json::to_string(descriptor)
        .map_err(|e| Error::Internal(format!("Descriptor encoding failed: {}", e)))?;
    let updated = sqlx::query("UPDATE students SET face_descriptor = ? WHERE id = ?")
        .bind(json)
        .bind(id.to_string())
        .execute(pool)
        .await?
        .rows_affected();
    Ok(updated > 0)
}

/// Registered student names in alphabetical order
pub async fn roster(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM students ORDER BY name COLLATE NOCASE, name")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

pub async fn count_students(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ========================================
// Teachers
// ========================================

pub async fn insert_teacher(pool: &SqlitePool, new: &NewTeacher, now: NaiveDateTime) -> Result<Teacher> {
    if find_teacher_by_email(pool, &new.email).await?.is_some() {
        return Err(Error::Conflict(DUPLICATE_EMAIL.to_string()));
    }
    let id_taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers WHERE employee_id = ?")
        .bind(&new.employee_id)
        .fetch_one(pool)
        .await?;
    if id_taken > 0 {
        return Err(Error::Conflict(DUPLICATE_EMPLOYEE_ID.to_string()));
    }

    let id = Uuid::new_v4();
    let result = sqlx::query(
        r#"
        INSERT INTO teachers (id, name, email, password_hash, department, employee_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.department)
    .bind(&new.employee_id)
    .bind(now)
    .execute(pool)
    .await;

    if let Err(e) = &result {
        if let Some(msg) = unique_violation(e) {
            let taken = if msg.contains("email") { DUPLICATE_EMAIL } else { DUPLICATE_EMPLOYEE_ID };
            return Err(Error::Conflict(taken.to_string()));
        }
    }
    result?;

    info!("Registered teacher {} ({})", new.employee_id, id);
    find_teacher(pool, id)
        .await?
        .ok_or_else(|| Error::Internal("Teacher vanished after insert".to_string()))
}

pub async fn find_teacher(pool: &SqlitePool, id: Uuid) -> Result<Option<Teacher>> {
    let row: Option<TeacherRow> = sqlx::query_as(&format!("SELECT {} FROM teachers WHERE id = ?", TEACHER_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(Teacher::try_from).transpose()
}

pub async fn find_teacher_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Teacher>> {
    let row: Option<TeacherRow> = sqlx::query_as(&format!("SELECT {} FROM teachers WHERE email = ?", TEACHER_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    row.map(Teacher::try_from).transpose()
}

pub async fn update_teacher_password(pool: &SqlitePool, id: Uuid, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE teachers SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}
