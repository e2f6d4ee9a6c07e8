//! Read snapshots and inserts over the workspace database.

use crate::model::{
    AttendanceRecord, ContentItem, GradeKind, GradeRecord, GroupRecord, HomeworkRecord,
    HomeworkSubmissionRecord, StudentRecord, TestRecord, TestSubmissionRecord,
};
use crate::rotation::Cadence;
use chrono::NaiveDate;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};

/// The two rotating content lists of the Sense service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    WeeklyIntention,
    DailyQuestion,
}

impl ContentKind {
    fn table(self) -> &'static str {
        match self {
            ContentKind::WeeklyIntention => "weekly_intentions",
            ContentKind::DailyQuestion => "daily_questions",
        }
    }

    pub fn cadence(self) -> Cadence {
        match self {
            ContentKind::WeeklyIntention => Cadence::Weekly,
            ContentKind::DailyQuestion => Cadence::Daily,
        }
    }
}

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

fn id_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        id: r.get(0)?,
        full_name: r.get(1)?,
        group_id: r.get(2)?,
    })
}

fn group_from_row(r: &Row<'_>) -> rusqlite::Result<GroupRecord> {
    Ok(GroupRecord {
        id: r.get(0)?,
        name: r.get(1)?,
        teacher_id: r.get(2)?,
    })
}

fn attendance_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        group_id: r.get(2)?,
        lesson_date: r.get(3)?,
        present: r.get::<_, i64>(4)? != 0,
        program_id: r.get(5)?,
    })
}

fn grade_from_row(r: &Row<'_>) -> rusqlite::Result<GradeRecord> {
    let kind: String = r.get(5)?;
    Ok(GradeRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        group_id: r.get(2)?,
        lesson_date: r.get(3)?,
        value: r.get(4)?,
        kind: GradeKind::parse(&kind),
        comment: r.get(6)?,
        program_id: r.get(7)?,
    })
}

const ATTENDANCE_COLS: &str = "id, student_id, group_id, lesson_date, present, program_id";
const GRADE_COLS: &str = "id, student_id, group_id, lesson_date, value, type, comment, program_id";

pub fn get_student(conn: &Connection, id: i64) -> rusqlite::Result<Option<StudentRecord>> {
    conn.query_row(
        "SELECT id, full_name, group_id FROM students WHERE id = ?",
        [id],
        student_from_row,
    )
    .optional()
}

pub fn get_group(conn: &Connection, id: i64) -> rusqlite::Result<Option<GroupRecord>> {
    conn.query_row(
        "SELECT id, name, teacher_id FROM study_groups WHERE id = ?",
        [id],
        group_from_row,
    )
    .optional()
}

pub fn teacher_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM teachers WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

pub fn program_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM programs WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

pub fn list_groups(conn: &Connection) -> rusqlite::Result<Vec<GroupRecord>> {
    let mut stmt = conn.prepare("SELECT id, name, teacher_id FROM study_groups ORDER BY id")?;
    let rows = stmt.query_map([], group_from_row)?;
    rows.collect()
}

pub fn groups_for_teacher(conn: &Connection, teacher_id: i64) -> rusqlite::Result<Vec<GroupRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, teacher_id FROM study_groups WHERE teacher_id = ? ORDER BY id",
    )?;
    let rows = stmt.query_map([teacher_id], group_from_row)?;
    rows.collect()
}

pub fn students_in_group(conn: &Connection, group_id: i64) -> rusqlite::Result<Vec<StudentRecord>> {
    let mut stmt =
        conn.prepare("SELECT id, full_name, group_id FROM students WHERE group_id = ? ORDER BY id")?;
    let rows = stmt.query_map([group_id], student_from_row)?;
    rows.collect()
}

pub fn attendance_for_student(
    conn: &Connection,
    student_id: i64,
) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance WHERE student_id = ? ORDER BY lesson_date, id",
        ATTENDANCE_COLS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([student_id], attendance_from_row)?;
    rows.collect()
}

pub fn attendance_for_group(
    conn: &Connection,
    group_id: i64,
) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance WHERE group_id = ? ORDER BY lesson_date, id",
        ATTENDANCE_COLS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([group_id], attendance_from_row)?;
    rows.collect()
}

pub fn grades_for_student(conn: &Connection, student_id: i64) -> rusqlite::Result<Vec<GradeRecord>> {
    let sql = format!(
        "SELECT {} FROM grades WHERE student_id = ? ORDER BY id",
        GRADE_COLS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([student_id], grade_from_row)?;
    rows.collect()
}

pub fn grades_for_group(conn: &Connection, group_id: i64) -> rusqlite::Result<Vec<GradeRecord>> {
    let sql = format!("SELECT {} FROM grades WHERE group_id = ? ORDER BY id", GRADE_COLS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([group_id], grade_from_row)?;
    rows.collect()
}

pub fn program_ids_for_group(conn: &Connection, group_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM programs WHERE group_id = ? ORDER BY id")?;
    let rows = stmt.query_map([group_id], |r| r.get::<_, i64>(0))?;
    rows.collect()
}

pub fn homeworks_for_programs(
    conn: &Connection,
    program_ids: &[i64],
) -> rusqlite::Result<Vec<HomeworkRecord>> {
    if program_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id, program_id FROM homeworks WHERE program_id IN ({}) ORDER BY id",
        placeholders(program_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(id_values(program_ids)), |r| {
        Ok(HomeworkRecord {
            id: r.get(0)?,
            program_id: r.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn homework_submissions_for_student(
    conn: &Connection,
    student_id: i64,
) -> rusqlite::Result<Vec<HomeworkSubmissionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT homework_id, student_id FROM homework_submissions
         WHERE student_id = ? ORDER BY id",
    )?;
    let rows = stmt.query_map([student_id], |r| {
        Ok(HomeworkSubmissionRecord {
            homework_id: r.get(0)?,
            student_id: r.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn tests_for_programs(conn: &Connection, program_ids: &[i64]) -> rusqlite::Result<Vec<TestRecord>> {
    if program_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id, program_id FROM tests WHERE program_id IN ({}) ORDER BY id",
        placeholders(program_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(id_values(program_ids)), |r| {
        Ok(TestRecord {
            id: r.get(0)?,
            program_id: r.get(1)?,
        })
    })?;
    rows.collect()
}

/// Submissions in insertion order, so "first seen" breaks best-score ties.
pub fn test_submissions_for_student(
    conn: &Connection,
    student_id: i64,
) -> rusqlite::Result<Vec<TestSubmissionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, test_id, student_id, score, max_score, is_approved_for_retake
         FROM test_submissions WHERE student_id = ? ORDER BY id",
    )?;
    let rows = stmt.query_map([student_id], |r| {
        Ok(TestSubmissionRecord {
            id: r.get(0)?,
            test_id: r.get(1)?,
            student_id: r.get(2)?,
            score: r.get(3)?,
            max_score: r.get(4)?,
            is_approved_for_retake: r.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn list_content(conn: &Connection, kind: ContentKind) -> rusqlite::Result<Vec<ContentItem>> {
    let sql = format!(
        "SELECT id, text, sort_order FROM {} ORDER BY sort_order, id",
        kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |r| {
        Ok(ContentItem {
            id: r.get(0)?,
            text: r.get(1)?,
            order: r.get(2)?,
        })
    })?;
    rows.collect()
}

/// Replaces the whole list. Blank items are dropped; `order` is the submitted position.
pub fn replace_content(
    conn: &Connection,
    kind: ContentKind,
    items: &[String],
) -> rusqlite::Result<Vec<ContentItem>> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(&format!("DELETE FROM {}", kind.table()), [])?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {}(text, sort_order) VALUES(?, ?)",
            kind.table()
        ))?;
        for (i, raw) in items.iter().enumerate() {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            insert.execute((text, i as i64))?;
        }
    }
    tx.commit()?;
    list_content(conn, kind)
}

pub fn insert_teacher(conn: &Connection, full_name: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT INTO teachers(full_name) VALUES(?)", [full_name])?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_group(conn: &Connection, name: &str, teacher_id: Option<i64>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO study_groups(name, teacher_id) VALUES(?, ?)",
        (name, teacher_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_student(conn: &Connection, full_name: &str, group_id: Option<i64>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO students(full_name, group_id) VALUES(?, ?)",
        (full_name, group_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_program(conn: &Connection, group_id: i64, title: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO programs(group_id, title) VALUES(?, ?)",
        (group_id, title),
    )?;
    Ok(conn.last_insert_rowid())
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub student_id: i64,
    pub group_id: i64,
    pub lesson_date: NaiveDate,
    pub present: bool,
    pub program_id: Option<i64>,
}

pub fn insert_attendance(conn: &Connection, a: &NewAttendance) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO attendance(student_id, group_id, lesson_date, present, program_id)
         VALUES(?, ?, ?, ?, ?)",
        (
            a.student_id,
            a.group_id,
            a.lesson_date,
            a.present as i64,
            a.program_id,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns `false` when no row has that id.
pub fn update_attendance(
    conn: &Connection,
    id: i64,
    present: Option<bool>,
    program_id: Option<i64>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE attendance
         SET present = COALESCE(?, present), program_id = COALESCE(?, program_id)
         WHERE id = ?",
        (present.map(|p| p as i64), program_id, id),
    )?;
    Ok(changed > 0)
}

#[derive(Debug, Clone)]
pub struct NewGrade {
    pub student_id: i64,
    pub group_id: i64,
    pub lesson_date: Option<NaiveDate>,
    pub value: i64,
    pub kind: GradeKind,
    pub comment: Option<String>,
    pub program_id: Option<i64>,
}

pub fn insert_grade(conn: &Connection, g: &NewGrade) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO grades(student_id, group_id, lesson_date, value, type, comment, program_id)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            g.student_id,
            g.group_id,
            g.lesson_date,
            g.value,
            g.kind.as_str(),
            g.comment.as_deref(),
            g.program_id,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_homework(conn: &Connection, program_id: i64, title: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO homeworks(program_id, title) VALUES(?, ?)",
        (program_id, title),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_homework_submission(
    conn: &Connection,
    homework_id: i64,
    student_id: i64,
    answer_text: Option<&str>,
    grade: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO homework_submissions(homework_id, student_id, answer_text, grade)
         VALUES(?, ?, ?, ?)",
        (homework_id, student_id, answer_text, grade),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_test(conn: &Connection, program_id: i64, title: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tests(program_id, title) VALUES(?, ?)",
        (program_id, title),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_test_submission(
    conn: &Connection,
    test_id: i64,
    student_id: i64,
    score: Option<i64>,
    max_score: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO test_submissions(test_id, student_id, score, max_score)
         VALUES(?, ?, ?, ?)",
        (test_id, student_id, score, max_score),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns `false` when no submission has that id.
pub fn approve_retake(conn: &Connection, submission_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE test_submissions SET is_approved_for_retake = 1 WHERE id = ?",
        [submission_id],
    )?;
    Ok(changed > 0)
}

pub fn homework_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM homeworks WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

pub fn test_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM tests WHERE id = ?", [id], |r| r.get::<_, i64>(0))
        .optional()
        .map(|v| v.is_some())
}
