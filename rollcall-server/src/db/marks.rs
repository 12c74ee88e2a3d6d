//! Saved mark sheets, always scoped to the owning teacher

use chrono::NaiveDateTime;
use rollcall_common::db::MarkSheetSummary;
use rollcall_common::marks::{MarkEntry, MarkSheet};
use rollcall_common::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Store header and entries in one transaction
pub async fn save_sheet(pool: &SqlitePool, sheet: &MarkSheet) -> Result<()> {
    let stats = sheet.stats();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO mark_sheets (id, teacher_id, subject, total_students, average_mark, highest_mark, lowest_mark, saved_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sheet.id().to_string())
    .bind(sheet.teacher_id().to_string())
    .bind(sheet.subject())
    .bind(stats.total_students as i64)
    .bind(stats.average_mark)
    .bind(stats.highest_mark as i64)
    .bind(stats.lowest_mark as i64)
    .bind(sheet.saved_at())
    .execute(&mut *tx)
    .await?;

    for (position, entry) in sheet.entries().iter().enumerate() {
        sqlx::query("INSERT INTO mark_sheet_entries (sheet_id, position, student_name, mark) VALUES (?, ?, ?, ?)")
            .bind(sheet.id().to_string())
            .bind(position as i64)
            .bind(&entry.name)
            .bind(entry.mark as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(
        "Saved mark sheet {} ({} entries, subject '{}')",
        sheet.id(),
        sheet.entries().len(),
        sheet.subject()
    );
    Ok(())
}

fn subject_clause(subject: Option<&str>) -> (&'static str, Option<String>) {
    match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => (" AND instr(LOWER(subject), ?) > 0", Some(s.to_lowercase())),
        None => ("", None),
    }
}

pub async fn count_sheets(pool: &SqlitePool, teacher_id: Uuid, subject: Option<&str>) -> Result<i64> {
    let (clause, arg) = subject_clause(subject);
    let sql = format!("SELECT COUNT(*) FROM mark_sheets WHERE teacher_id = ?{}", clause);
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(teacher_id.to_string());
    if let Some(arg) = arg {
        query = query.bind(arg);
    }
    Ok(query.fetch_one(pool).await?)
}

/// Headers newest first
pub async fn list_sheets(
    pool: &SqlitePool,
    teacher_id: Uuid,
    subject: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<MarkSheetSummary>> {
    let (clause, arg) = subject_clause(subject);
    let sql = format!(
        r#"
        SELECT id, subject, total_students, average_mark, highest_mark, lowest_mark, saved_at
        FROM mark_sheets
        WHERE teacher_id = ?{}
        ORDER BY saved_at DESC
        LIMIT ? OFFSET ?
        "#,
        clause
    );
    let mut query = sqlx::query_as::<_, MarkSheetSummary>(&sql).bind(teacher_id.to_string());
    if let Some(arg) = arg {
        query = query.bind(arg);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(pool).await?)
}

pub async fn find_sheet(pool: &SqlitePool, teacher_id: Uuid, id: Uuid) -> Result<Option<MarkSheet>> {
    let header: Option<(String, NaiveDateTime)> =
        sqlx::query_as("SELECT subject, saved_at FROM mark_sheets WHERE id = ? AND teacher_id = ?")
            .bind(id.to_string())
            .bind(teacher_id.to_string())
            .fetch_optional(pool)
            .await?;

    let Some((subject, saved_at)) = header else {
        return Ok(None);
    };

    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT student_name, mark FROM mark_sheet_entries WHERE sheet_id = ? ORDER BY position",
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let entries = rows
        .into_iter()
        .map(|(name, mark)| MarkEntry::new(name, mark.clamp(0, 100) as u32))
        .collect();

    Ok(Some(MarkSheet::from_parts(id, teacher_id, subject, entries, saved_at)))
}

/// False when no such sheet belongs to the teacher
pub async fn delete_sheet(pool: &SqlitePool, teacher_id: Uuid, id: Uuid) -> Result<bool> {
    let deleted = sqlx::query("DELETE FROM mark_sheets WHERE id = ? AND teacher_id = ?")
        .bind(id.to_string())
        .bind(teacher_id.to_string())
        .execute(pool)
        .await?
        .rows_affected();
    Ok(deleted > 0)
}
